//! Human-readable end-of-run summary

use crate::types::PipelineReport;
use std::fmt::Write;

const RULE: &str = "========================================";

/// Render the summary printed at the end of every run
pub fn render_summary(report: &PipelineReport) -> String {
    let mut out = String::new();
    // Writing into a String cannot fail
    let _ = write_summary(&mut out, report);
    out
}

fn write_summary(out: &mut String, report: &PipelineReport) -> std::fmt::Result {
    writeln!(out)?;
    writeln!(out, "{}", RULE)?;
    writeln!(out, "  Knowledge Pipeline - Run Report")?;
    writeln!(out, "{}", RULE)?;
    writeln!(out, "  Builds processed : {}", report.builds_processed)?;
    writeln!(out, "  Builds failed    : {}", report.builds_failed.len())?;
    for failure in &report.builds_failed {
        writeln!(out, "    x {}: {}", failure.build, failure.reason)?;
    }
    writeln!(out, "  Sources accepted : {}", report.sources_accepted)?;
    writeln!(out, "  Sources rejected : {}", report.sources_rejected.len())?;
    for rejection in &report.sources_rejected {
        writeln!(out, "    x {}: {}", rejection.source_id, rejection.reason)?;
    }
    writeln!(out, "  Low confidence   : {}", report.low_confidence_builds.len())?;
    for slug in &report.low_confidence_builds {
        writeln!(out, "    ! {}", slug)?;
    }
    if !report.high_spread_affixes.is_empty() {
        writeln!(out, "  High spread      : {}", report.high_spread_affixes.len())?;
        for affix in &report.high_spread_affixes {
            writeln!(
                out,
                "    ~ {} affix {} ({}): {:.2}",
                affix.build, affix.affix_id, affix.phase, affix.spread
            )?;
        }
    }
    if !report.filter_signals.is_empty() {
        writeln!(out, "  Filter sources   : {}", report.filter_signals.len())?;
    }
    writeln!(out, "  Duration         : {:.1}s", report.duration_seconds)?;
    writeln!(out, "{}", RULE)?;
    Ok(())
}
