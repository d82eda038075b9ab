//! Pipeline configuration
//!
//! Loaded from TOML via `affixkb_common::config`. Every field has a
//! built-in default, so a partial (or absent) file is valid. CLI flags are
//! applied on top by `main.rs`.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Complete pipeline configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub paths: PathsConfig,
    pub thresholds: ThresholdsConfig,
    pub quality_weights: QualityWeights,
    pub tier_weights: TierWeightRanges,
    pub phase_multipliers: PhaseMultipliers,
    pub graph: GraphConfig,
    pub consensus: ConsensusConfig,
    pub inheritance: InheritanceConfig,
    pub output: OutputConfig,
}

// ============================================================================
// Paths
// ============================================================================

/// Input/output locations. Relative paths resolve against `data_dir`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    pub data_dir: PathBuf,
    pub affixes_file: PathBuf,
    pub game_constants_file: PathBuf,
    pub planners_dir: PathBuf,
    pub filters_dir: PathBuf,
    pub output_dir: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            affixes_file: PathBuf::from("mappings/affixes.json"),
            game_constants_file: PathBuf::from("mappings/game-constants.json"),
            planners_dir: PathBuf::from("sources/planners/normalized"),
            filters_dir: PathBuf::from("sources/filters"),
            output_dir: PathBuf::from("weights"),
        }
    }
}

impl PathsConfig {
    fn under_data_dir(&self, p: &Path) -> PathBuf {
        if p.is_absolute() {
            p.to_path_buf()
        } else {
            self.data_dir.join(p)
        }
    }

    pub fn affixes_path(&self) -> PathBuf {
        self.under_data_dir(&self.affixes_file)
    }

    pub fn game_constants_path(&self) -> PathBuf {
        self.under_data_dir(&self.game_constants_file)
    }

    pub fn planners_path(&self) -> PathBuf {
        self.under_data_dir(&self.planners_dir)
    }

    pub fn filters_path(&self) -> PathBuf {
        self.under_data_dir(&self.filters_dir)
    }

    pub fn output_path(&self) -> PathBuf {
        self.under_data_dir(&self.output_dir)
    }
}

// ============================================================================
// Thresholds and Weights
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThresholdsConfig {
    /// Sources with fewer distinct affix IDs are rejected
    pub min_unique_affixes: usize,
    /// Below this many surviving observations, consensus blends toward baseline
    pub min_sources_for_override: usize,
    /// Sources scoring below this are supplementary
    pub supplementary_quality_threshold: f64,
    pub low_confidence_specificity_threshold: f64,
    pub low_confidence_source_count: usize,
    /// 0-1 similarity required for a fuzzy name match
    pub fuzzy_match_threshold: f64,
    /// Consensus spread at or above this is reported
    pub high_spread_threshold: f64,
}

impl Default for ThresholdsConfig {
    fn default() -> Self {
        Self {
            min_unique_affixes: 15,
            min_sources_for_override: 3,
            supplementary_quality_threshold: 0.4,
            low_confidence_specificity_threshold: 0.5,
            low_confidence_source_count: 3,
            fuzzy_match_threshold: 0.85,
            high_spread_threshold: 0.5,
        }
    }
}

/// Weights of the five quality dimensions (normalized by their sum)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QualityWeights {
    pub specificity: f64,
    pub affix_coverage: f64,
    pub phase_coverage: f64,
    pub recency: f64,
    pub consensus_alignment: f64,
}

impl Default for QualityWeights {
    fn default() -> Self {
        Self {
            specificity: 0.30,
            affix_coverage: 0.25,
            phase_coverage: 0.20,
            recency: 0.15,
            consensus_alignment: 0.10,
        }
    }
}

/// Inclusive weight range; its midpoint is the translated weight
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WeightRange {
    pub min: f64,
    pub max: f64,
}

impl WeightRange {
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    pub fn midpoint(&self) -> f64 {
        (self.min + self.max) / 2.0
    }
}

/// Band for tiers without a configured range
pub const DEFAULT_TIER_RANGE: WeightRange = WeightRange::new(15.0, 35.0);

/// Planner tier → weight bands
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TierWeightRanges {
    pub tier_7: WeightRange,
    pub tier_5_6: WeightRange,
    pub tier_3_4: WeightRange,
    pub tier_1_2: WeightRange,
}

impl Default for TierWeightRanges {
    fn default() -> Self {
        Self {
            tier_7: WeightRange::new(90.0, 100.0),
            tier_5_6: WeightRange::new(65.0, 85.0),
            tier_3_4: WeightRange::new(40.0, 60.0),
            tier_1_2: WeightRange::new(15.0, 35.0),
        }
    }
}

impl TierWeightRanges {
    /// Tiers outside 1-7 get the default band
    pub fn range_for(&self, tier: u8) -> WeightRange {
        match tier {
            7 => self.tier_7,
            5 | 6 => self.tier_5_6,
            3 | 4 => self.tier_3_4,
            1 | 2 => self.tier_1_2,
            _ => DEFAULT_TIER_RANGE,
        }
    }
}

/// Multipliers per phase-presence pattern
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhaseMultipliers {
    pub all_phases: f64,
    pub bis_only: f64,
    pub starter_only: f64,
    pub middle_only: f64,
}

impl Default for PhaseMultipliers {
    fn default() -> Self {
        Self {
            all_phases: 1.0,
            bis_only: 1.0,
            starter_only: 0.8,
            middle_only: 0.85,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphConfig {
    /// Synergy edges fire only from affixes weighted above this
    pub synergy_trigger: f64,
    pub synergy_boost_per_strength: f64,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            synergy_trigger: 60.0,
            synergy_boost_per_strength: 15.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsensusConfig {
    pub outlier_std_dev_threshold: f64,
}

impl Default for ConsensusConfig {
    fn default() -> Self {
        Self {
            outlier_std_dev_threshold: 2.0,
        }
    }
}

/// Static weights assigned by the inheritance layers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InheritanceConfig {
    /// Baseline key (e.g. `added_health`) → weight
    pub universal_baseline_weights: BTreeMap<String, f64>,
    pub damage_primary_weight: f64,
    pub damage_synergy_weight: f64,
    pub mastery_primary_weight: f64,
}

impl Default for InheritanceConfig {
    fn default() -> Self {
        Self {
            universal_baseline_weights: BTreeMap::from([
                ("added_health".to_string(), 70.0),
                ("added_vitality".to_string(), 65.0),
                ("movement_speed".to_string(), 60.0),
            ]),
            damage_primary_weight: 75.0,
            damage_synergy_weight: 55.0,
            mastery_primary_weight: 85.0,
        }
    }
}

/// Version tags embedded in the artifacts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub patch_version: String,
    pub version: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            patch_version: "1.3.5".to_string(),
            version: "1.0.0".to_string(),
        }
    }
}

// ============================================================================
// Per-invocation options
// ============================================================================

/// Flags for a single run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunOptions {
    /// Restrict the run to one build slug
    pub only_build: Option<String>,
    /// Validate and report, write nothing
    pub dry_run: bool,
    /// Write output even when no profile was produced
    pub force: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = PipelineConfig::default();
        assert_eq!(cfg.thresholds.min_unique_affixes, 15);
        assert_eq!(cfg.thresholds.fuzzy_match_threshold, 0.85);
        assert_eq!(cfg.output.patch_version, "1.3.5");
        assert_eq!(cfg.inheritance.universal_baseline_weights.len(), 3);
        assert_eq!(cfg.tier_weights.range_for(7).midpoint(), 95.0);
        assert_eq!(cfg.tier_weights.range_for(6).midpoint(), 75.0);
        assert_eq!(cfg.tier_weights.range_for(4).midpoint(), 50.0);
        assert_eq!(cfg.tier_weights.range_for(1).midpoint(), 25.0);
    }

    #[test]
    fn test_unlisted_tiers_use_default_band() {
        let mut ranges = TierWeightRanges::default();
        ranges.tier_1_2 = WeightRange::new(5.0, 15.0);

        assert_eq!(ranges.range_for(0), DEFAULT_TIER_RANGE);
        assert_eq!(ranges.range_for(9), DEFAULT_TIER_RANGE);
        assert_eq!(ranges.range_for(255).midpoint(), 25.0);
        assert_eq!(ranges.range_for(2).midpoint(), 10.0);
    }

    #[test]
    fn test_partial_toml_keeps_other_defaults() {
        let cfg: PipelineConfig = toml::from_str(
            r#"
            [thresholds]
            min_unique_affixes = 5

            [output]
            patch_version = "1.4.0"
            "#,
        )
        .unwrap();

        assert_eq!(cfg.thresholds.min_unique_affixes, 5);
        assert_eq!(cfg.thresholds.min_sources_for_override, 3);
        assert_eq!(cfg.output.patch_version, "1.4.0");
        assert_eq!(cfg.output.version, "1.0.0");
        assert_eq!(cfg.graph.synergy_trigger, 60.0);
    }

    #[test]
    fn test_relative_paths_resolve_under_data_dir() {
        let paths = PathsConfig {
            data_dir: PathBuf::from("/srv/kb"),
            output_dir: PathBuf::from("/tmp/out"),
            ..Default::default()
        };
        assert_eq!(
            paths.affixes_path(),
            PathBuf::from("/srv/kb/mappings/affixes.json")
        );
        assert_eq!(paths.output_path(), PathBuf::from("/tmp/out"));
    }
}
