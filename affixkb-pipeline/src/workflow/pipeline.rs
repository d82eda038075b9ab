//! Pipeline Orchestrator
//!
//! Runs every discovered build through the full chain, one build at a time:
//!
//! 1. Ingest every source file of the build
//! 2. Validate each source (run-wide duplicate detection)
//! 3. Extract weights from accepted sources
//! 4. Merge via the consensus engine, clamped against inherited weights
//! 5. Resolve inheritance and graph propagation into a profile
//!
//! # Error Handling
//! - A file that cannot be ingested becomes a rejected-source entry
//! - A build that cannot be processed is recorded and skipped
//! - Missing static data (catalog, game constants) is fatal at load time
//! - A failed artifact write is recorded on the outcome next to the report
//!
//! # Example
//! ```rust,ignore
//! let pipeline = Pipeline::load(PipelineConfig::default())?;
//! let outcome = pipeline.run(&RunOptions::default());
//! println!("{}", render_summary(&outcome.report));
//! ```

use crate::config::{PipelineConfig, RunOptions};
use crate::error::{PipelineError, PipelineResult};
use crate::extractors::{FilterWeightExtractor, PlannerWeightExtractor, WeightExtractor};
use crate::fusion::{group_by_phase, ConsensusEngine};
use crate::ingest::ingest_file;
use crate::inheritance::{BuildIdentity, InheritanceResolver};
use crate::output::{KnowledgeBaseWriter, WrittenArtifacts};
use crate::services::{discover_builds, AffixResolver, BuildSources, GameConstants};
use crate::types::{
    BuildFailure, BuildKnowledgeProfile, HighSpreadAffix, PipelineReport, RawSource,
    SourceKind, SourceRejection,
};
use crate::validators::SourceValidator;
use affixkb_common::Result;
use std::collections::{BTreeMap, HashSet};
use std::path::PathBuf;
use std::time::Instant;
use tracing::{debug, error, info, warn};

/// Result of one run
#[derive(Debug, Clone)]
pub struct PipelineOutcome {
    pub report: PipelineReport,
    /// Sorted by build slug
    pub profiles: Vec<BuildKnowledgeProfile>,
    /// `None` when nothing was written
    pub written: Option<WrittenArtifacts>,
    /// Set when the artifact write failed; previous artifacts are untouched
    pub write_error: Option<String>,
}

impl PipelineOutcome {
    /// At least one build failed and none succeeded
    pub fn is_failure(&self) -> bool {
        !self.report.builds_failed.is_empty() && self.report.builds_processed == 0
    }
}

/// Owns all static context for a run
pub struct Pipeline {
    config: PipelineConfig,
    affixes: AffixResolver,
    validator: SourceValidator,
    consensus: ConsensusEngine,
    planner_extractor: PlannerWeightExtractor,
    filter_extractor: FilterWeightExtractor,
    inheritance: InheritanceResolver,
    writer: KnowledgeBaseWriter,
}

impl Pipeline {
    /// Load game constants, the affix catalog and the graph
    pub fn load(config: PipelineConfig) -> Result<Self> {
        let constants = GameConstants::load(&config.paths.game_constants_path())?;
        let affixes = AffixResolver::load(
            &config.paths.affixes_path(),
            Some(&constants),
            config.thresholds.fuzzy_match_threshold,
        )?;
        let validator = SourceValidator::from_config(affixes.known_ids(), &config);
        let inheritance = InheritanceResolver::new(constants, &affixes, &config);
        info!(
            affixes = affixes.definition_count(),
            edges = inheritance.graph().edge_count(),
            "Pipeline static data loaded"
        );

        Ok(Self {
            consensus: ConsensusEngine::from_config(&config),
            planner_extractor: PlannerWeightExtractor::new(
                config.tier_weights.clone(),
                config.phase_multipliers.clone(),
            ),
            filter_extractor: FilterWeightExtractor,
            writer: KnowledgeBaseWriter::from_config(&config),
            config,
            affixes,
            validator,
            inheritance,
        })
    }

    /// Discover builds, restricted to `only_build` when set
    fn select_builds(&self, options: &RunOptions) -> BuildSources {
        let planners = self.config.paths.planners_path();
        let filters = self.config.paths.filters_path();
        let mut builds = discover_builds(&planners, &filters);

        if let Some(only) = &options.only_build {
            match builds.remove(only) {
                Some(files) => builds = BTreeMap::from([(only.clone(), files)]),
                None => {
                    error!(build = %only, dir = %planners.display(), "Build not found");
                    builds.clear();
                }
            }
        }

        if builds.is_empty() {
            info!(dir = %planners.display(), "No builds found");
        } else {
            info!(builds = builds.len(), "Found builds to process");
        }
        builds
    }

    /// Process every selected build and write the artifacts per the run options
    pub fn run(&self, options: &RunOptions) -> PipelineOutcome {
        let started = Instant::now();
        let mut report = PipelineReport::default();
        let mut seen_checksums: HashSet<String> = HashSet::new();
        let mut profiles = Vec::new();

        info!("Knowledge pipeline starting");
        for (slug, files) in self.select_builds(options) {
            info!(build = %slug, sources = files.len(), "Processing build");
            match self.process_build(&slug, &files, &mut seen_checksums, &mut report) {
                Ok(profile) => {
                    report.builds_processed += 1;
                    if profile.specificity_score
                        < self.config.thresholds.low_confidence_specificity_threshold
                        || profile.source_count < self.config.thresholds.low_confidence_source_count
                    {
                        report.low_confidence_builds.push(slug.clone());
                    }
                    info!(
                        build = %slug,
                        layer = profile.data_source_layer.as_str(),
                        confidence = profile.confidence.as_str(),
                        sources = profile.source_count,
                        "Build resolved"
                    );
                    profiles.push(profile);
                }
                Err(e) => {
                    error!(build = %slug, reason = %e, "Build failed");
                    report.builds_failed.push(BuildFailure {
                        build: slug.clone(),
                        reason: e.to_string(),
                    });
                }
            }
        }

        report.duration_seconds = started.elapsed().as_secs_f64();

        let mut written = None;
        let mut write_error = None;
        if options.dry_run {
            info!("Dry run, skipping output write");
        } else if profiles.is_empty() && !options.force {
            warn!("No profiles produced, skipping output write (use --force to write anyway)");
        } else {
            match self.writer.write(&profiles, &report) {
                Ok(artifacts) => written = Some(artifacts),
                Err(e) => {
                    error!(dir = %self.config.paths.output_path().display(), error = %e, "Failed to write artifacts");
                    write_error = Some(e.to_string());
                }
            }
        }

        PipelineOutcome {
            report,
            profiles,
            written,
            write_error,
        }
    }

    /// Full chain for one build
    fn process_build(
        &self,
        slug: &str,
        files: &[PathBuf],
        seen_checksums: &mut HashSet<String>,
        report: &mut PipelineReport,
    ) -> PipelineResult<BuildKnowledgeProfile> {
        let raw_sources = self.ingest_sources(slug, files, report);
        if raw_sources.is_empty() {
            return Err(PipelineError::NoSources);
        }

        let mut accepted: Vec<&RawSource> = Vec::new();
        let mut quality: BTreeMap<String, f64> = BTreeMap::new();
        for source in &raw_sources {
            match self.validator.validate(source, seen_checksums) {
                Ok(score) => {
                    seen_checksums.insert(source.checksum.clone());
                    quality.insert(source.source_id.clone(), score.overall);
                    report.sources_accepted += 1;
                    accepted.push(source);
                }
                Err(rejection) => report.sources_rejected.push(SourceRejection {
                    source_id: source.source_id.clone(),
                    build: slug.to_string(),
                    reason: rejection.to_string(),
                }),
            }
        }

        let identity = if accepted.is_empty() {
            BuildIdentity::from_sources(slug, &raw_sources)
        } else {
            BuildIdentity::from_sources(slug, accepted.iter().copied())
        }
        .ok_or(PipelineError::NoSources)?;

        if accepted.is_empty() {
            warn!(build = %slug, "No accepted sources, generating inheritance-only profile");
            return Ok(self.inheritance.resolve(&identity, None, 0));
        }

        let extractors: [&dyn WeightExtractor; 2] =
            [&self.planner_extractor, &self.filter_extractor];
        let mut extracted = Vec::new();
        for source in &accepted {
            for extractor in extractors {
                let weights = extractor.extract(source, &self.affixes);
                if !weights.is_empty() {
                    debug!(
                        build = %slug,
                        source_id = %source.source_id,
                        extractor = extractor.name(),
                        weights = weights.len(),
                        "Extracted"
                    );
                }
                extracted.extend(weights);
            }
            if source.kind() == SourceKind::Filter {
                if let Some(signals) = self.filter_extractor.rule_structure_signals(source) {
                    report.filter_signals.push(signals);
                }
            }
        }

        let baseline = self.inheritance.inherited_weights(&identity);
        let consensus = self.consensus.merge(&extracted, &quality, Some(&baseline));

        for cw in &consensus {
            if cw.consensus_spread >= self.config.thresholds.high_spread_threshold {
                report.high_spread_affixes.push(HighSpreadAffix {
                    build: slug.to_string(),
                    affix_id: cw.affix_id,
                    phase: cw.phase,
                    spread: cw.consensus_spread,
                });
            }
        }

        let by_phase = group_by_phase(&consensus);
        let consensus_ref = (!consensus.is_empty()).then_some(&by_phase);
        Ok(self
            .inheritance
            .resolve(&identity, consensus_ref, accepted.len()))
    }

    /// Ingest each file; failures become rejected-source entries
    fn ingest_sources(
        &self,
        slug: &str,
        files: &[PathBuf],
        report: &mut PipelineReport,
    ) -> Vec<RawSource> {
        let mut sources = Vec::with_capacity(files.len());
        for path in files {
            match ingest_file(path) {
                Ok(source) => {
                    debug!(build = %slug, source_id = %source.source_id, kind = %source.kind(), "Ingested");
                    sources.push(source);
                }
                Err(e) => {
                    warn!(build = %slug, file = %path.display(), error = %e, "Failed to ingest source");
                    let file_name = path
                        .file_name()
                        .map(|n| n.to_string_lossy().into_owned())
                        .unwrap_or_default();
                    report.sources_rejected.push(SourceRejection {
                        source_id: file_name,
                        build: slug.to_string(),
                        reason: format!("Ingestion error: {}", e),
                    });
                }
            }
        }
        sources
    }
}
