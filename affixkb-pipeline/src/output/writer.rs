//! Knowledge base writer

use super::{KNOWLEDGE_BASE_FILE, META_FILE, REPORT_FILE};
use crate::config::PipelineConfig;
use crate::types::{
    round_to, AffixWeight, BuildFailure, BuildKnowledgeProfile, ConfidenceLabel,
    FilterStructureSignals, HighSpreadAffix, LayerKind, Phase, PipelineReport, SourceRejection,
};
use affixkb_common::fs::StagedWrite;
use affixkb_common::hash::sha256_hex;
use affixkb_common::time::{format_timestamp, now};
use affixkb_common::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::PathBuf;
use tracing::info;

// ============================================================================
// Document shapes
// ============================================================================

#[derive(Serialize)]
struct KnowledgeBaseDocument<'a> {
    version: &'a str,
    generated_at: &'a str,
    patch_version: &'a str,
    builds: BTreeMap<&'a str, BuildEntry<'a>>,
}

#[derive(Serialize)]
struct BuildEntry<'a> {
    mastery: &'a str,
    damage_type: &'a str,
    damage_types: &'a [String],
    specificity_score: f64,
    source_count: usize,
    confidence: ConfidenceLabel,
    data_source_layer: LayerKind,
    phases: BTreeMap<Phase, PhaseEntry<'a>>,
}

#[derive(Serialize)]
struct PhaseEntry<'a> {
    affixes: &'a [AffixWeight],
}

#[derive(Serialize)]
struct MetaDocument<'a> {
    generated_at: &'a str,
    patch_version: &'a str,
    build_count: usize,
    checksum: String,
}

#[derive(Serialize)]
struct ReportDocument<'a> {
    generated_at: &'a str,
    patch_version: &'a str,
    builds_processed: usize,
    builds_failed: &'a [BuildFailure],
    sources_accepted: usize,
    sources_rejected: &'a [SourceRejection],
    low_confidence_builds: &'a [String],
    high_spread_affixes: &'a [HighSpreadAffix],
    filter_signals: &'a [FilterStructureSignals],
    duration_seconds: f64,
}

impl<'a> BuildEntry<'a> {
    fn from_profile(profile: &'a BuildKnowledgeProfile) -> Self {
        Self {
            mastery: &profile.mastery,
            damage_type: &profile.damage_type,
            damage_types: &profile.damage_types,
            specificity_score: profile.specificity_score,
            source_count: profile.source_count,
            confidence: profile.confidence,
            data_source_layer: profile.data_source_layer,
            phases: Phase::ALL
                .iter()
                .map(|phase| {
                    let affixes = profile.phases.get(phase).map_or(&[][..], Vec::as_slice);
                    (*phase, PhaseEntry { affixes })
                })
                .collect(),
        }
    }
}

// ============================================================================
// Writer
// ============================================================================

/// Paths and checksum of one completed write
#[derive(Debug, Clone, PartialEq)]
pub struct WrittenArtifacts {
    pub knowledge_base: PathBuf,
    pub meta: PathBuf,
    pub report: PathBuf,
    /// `sha256:<hex>` of the knowledge base bytes
    pub checksum: String,
}

/// Writes the run's artifacts into one output directory
#[derive(Debug, Clone)]
pub struct KnowledgeBaseWriter {
    output_dir: PathBuf,
    patch_version: String,
    version: String,
}

impl KnowledgeBaseWriter {
    pub fn new(
        output_dir: impl Into<PathBuf>,
        patch_version: impl Into<String>,
        version: impl Into<String>,
    ) -> Self {
        Self {
            output_dir: output_dir.into(),
            patch_version: patch_version.into(),
            version: version.into(),
        }
    }

    pub fn from_config(config: &PipelineConfig) -> Self {
        Self::new(
            config.paths.output_path(),
            config.output.patch_version.clone(),
            config.output.version.clone(),
        )
    }

    /// Write all artifacts stamped with the current time
    pub fn write(
        &self,
        profiles: &[BuildKnowledgeProfile],
        report: &PipelineReport,
    ) -> Result<WrittenArtifacts> {
        self.write_at(profiles, report, now())
    }

    /// Write all artifacts stamped with `generated_at`. Builds are keyed and
    /// sorted by slug. All three files are staged before any is renamed into
    /// place; on error the previous artifacts are left untouched.
    pub fn write_at(
        &self,
        profiles: &[BuildKnowledgeProfile],
        report: &PipelineReport,
        generated_at: DateTime<Utc>,
    ) -> Result<WrittenArtifacts> {
        let timestamp = format_timestamp(generated_at);
        let mut staged = StagedWrite::new();

        let document = KnowledgeBaseDocument {
            version: &self.version,
            generated_at: &timestamp,
            patch_version: &self.patch_version,
            builds: profiles
                .iter()
                .map(|p| (p.build_slug.as_str(), BuildEntry::from_profile(p)))
                .collect(),
        };
        let kb_path = self.output_dir.join(KNOWLEDGE_BASE_FILE);
        let kb_bytes = staged.stage_json(&kb_path, &document)?;
        let checksum = format!("sha256:{}", sha256_hex(&kb_bytes));

        let meta = MetaDocument {
            generated_at: &timestamp,
            patch_version: &self.patch_version,
            build_count: document.builds.len(),
            checksum: checksum.clone(),
        };
        let meta_path = self.output_dir.join(META_FILE);
        staged.stage_json(&meta_path, &meta)?;

        let report_doc = ReportDocument {
            generated_at: &timestamp,
            patch_version: &self.patch_version,
            builds_processed: report.builds_processed,
            builds_failed: &report.builds_failed,
            sources_accepted: report.sources_accepted,
            sources_rejected: &report.sources_rejected,
            low_confidence_builds: &report.low_confidence_builds,
            high_spread_affixes: &report.high_spread_affixes,
            filter_signals: &report.filter_signals,
            duration_seconds: round_to(report.duration_seconds, 2),
        };
        let report_path = self.output_dir.join(REPORT_FILE);
        staged.stage_json(&report_path, &report_doc)?;

        staged.commit()?;
        info!(
            dir = %self.output_dir.display(),
            builds = document.builds.len(),
            checksum = %checksum,
            "Wrote knowledge base, metadata and pipeline report"
        );

        Ok(WrittenArtifacts {
            knowledge_base: kb_path,
            meta: meta_path,
            report: report_path,
            checksum,
        })
    }
}
