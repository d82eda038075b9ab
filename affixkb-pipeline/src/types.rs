//! Core domain types for the knowledge pipeline
//!
//! Plain data records passed between stages:
//! - **Ingest:** `RawSource` (one file, normalized)
//! - **Validate:** `SourceQualityScore`
//! - **Extract:** `ExtractedWeight` (one observation)
//! - **Merge:** `ConsensusWeight` (one per affix/phase)
//! - **Resolve:** `BuildKnowledgeProfile` of `AffixWeight`s
//!
//! # Determinism
//! Every map that can influence output order is a `BTreeMap`/`BTreeSet`.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Numeric affix identifier from the game catalog
pub type AffixId = u32;

/// Affix → weight map (0-100 scale)
pub type WeightMap = BTreeMap<AffixId, f64>;

// ============================================================================
// Catalog
// ============================================================================

/// Immutable catalog entry for one affix
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AffixDefinition {
    pub affix_id: AffixId,
    /// Internal name
    pub name: String,
    pub display_name: String,
    /// Equip slots the affix can roll on
    pub valid_slots: Vec<u32>,
    pub is_class_gated: bool,
    /// `None` = relevant regardless of damage type
    pub damage_type: Option<String>,
}

impl AffixDefinition {
    pub fn is_damage_locked(&self) -> bool {
        self.damage_type.is_some()
    }
}

// ============================================================================
// Enumerations
// ============================================================================

/// Build progression phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Starter,
    Endgame,
    Aspirational,
}

impl Phase {
    pub const ALL: [Phase; 3] = [Phase::Starter, Phase::Endgame, Phase::Aspirational];

    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Starter => "starter",
            Phase::Endgame => "endgame",
            Phase::Aspirational => "aspirational",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Loot-filter strictness, declared most → least restrictive
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strictness {
    UberStrict,
    VeryStrict,
    Strict,
    Relaxed,
    ShowAll,
}

impl Strictness {
    /// Most restrictive first
    pub const ORDERED: [Strictness; 5] = [
        Strictness::UberStrict,
        Strictness::VeryStrict,
        Strictness::Strict,
        Strictness::Relaxed,
        Strictness::ShowAll,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Strictness::UberStrict => "uber_strict",
            Strictness::VeryStrict => "very_strict",
            Strictness::Strict => "strict",
            Strictness::Relaxed => "relaxed",
            Strictness::ShowAll => "show_all",
        }
    }

    /// Canonicalize a free-form strictness label.
    ///
    /// Lower-cases, maps spaces and hyphens to `_`, and folds known
    /// spellings. Unknown labels fall back to `Relaxed`.
    pub fn canonicalize(raw: &str) -> Strictness {
        let key = raw.trim().to_lowercase().replace([' ', '-'], "_");
        match key.as_str() {
            "uber_strict" | "uberstrict" => Strictness::UberStrict,
            "very_strict" | "verystrict" => Strictness::VeryStrict,
            "strict" => Strictness::Strict,
            "relaxed" | "normal" => Strictness::Relaxed,
            "show_all" | "lax" | "all" => Strictness::ShowAll,
            _ => Strictness::Relaxed,
        }
    }
}

impl fmt::Display for Strictness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Importance band, declared highest priority first
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Essential,
    Strong,
    Useful,
    Filler,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Essential => "essential",
            Category::Strong => "strong",
            Category::Useful => "useful",
            Category::Filler => "filler",
        }
    }

    /// Category from a planner tier (1-7)
    pub fn from_tier(tier: u8) -> Category {
        match tier {
            t if t >= 7 => Category::Essential,
            t if t >= 5 => Category::Strong,
            t if t >= 3 => Category::Useful,
            _ => Category::Filler,
        }
    }

    /// Category from a final weight (0-100)
    pub fn from_weight(weight: f64) -> Category {
        if weight >= 75.0 {
            Category::Essential
        } else if weight >= 55.0 {
            Category::Strong
        } else if weight >= 35.0 {
            Category::Useful
        } else {
            Category::Filler
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How an observation was derived
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DerivationMethod {
    TierTranslation,
    StrictnessSurvival,
}

/// Source file format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    Planner,
    Filter,
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SourceKind::Planner => "planner",
            SourceKind::Filter => "filter",
        })
    }
}

/// Breadth of a source, from the number of masteries it covers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceScope {
    Specific,
    MultiMastery,
    MultiClass,
    Universal,
}

impl SourceScope {
    pub fn from_mastery_count(count: usize) -> SourceScope {
        match count {
            1 => SourceScope::Specific,
            0..=3 => SourceScope::MultiMastery,
            4..=9 => SourceScope::MultiClass,
            _ => SourceScope::Universal,
        }
    }
}

/// Inheritance layer an output rests on, least → most specific
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LayerKind {
    Baseline,
    DamageType,
    Class,
    Mastery,
    Specific,
}

impl LayerKind {
    pub fn specificity(&self) -> f64 {
        match self {
            LayerKind::Baseline => 0.0,
            LayerKind::DamageType => 0.2,
            LayerKind::Class => 0.4,
            LayerKind::Mastery => 0.7,
            LayerKind::Specific => 1.0,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LayerKind::Baseline => "baseline",
            LayerKind::DamageType => "damage_type",
            LayerKind::Class => "class",
            LayerKind::Mastery => "mastery",
            LayerKind::Specific => "specific",
        }
    }
}

/// Coarse confidence of a build profile
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfidenceLabel {
    High,
    Medium,
    Low,
}

impl ConfidenceLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConfidenceLabel::High => "high",
            ConfidenceLabel::Medium => "medium",
            ConfidenceLabel::Low => "low",
        }
    }
}

// ============================================================================
// Ingested Sources
// ============================================================================

/// One planner entry: affix at a tier
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TierEntry {
    pub affix_id: AffixId,
    pub tier: u8,
}

/// Strictness → affix IDs present at that level
pub type StrictnessMap = BTreeMap<Strictness, BTreeSet<AffixId>>;

/// Format-specific per-phase data. Every phase key is always present.
#[derive(Debug, Clone, PartialEq)]
pub enum SourcePayload {
    Planner {
        phases: BTreeMap<Phase, Vec<TierEntry>>,
        /// Integer affix IDs outside the `u32` range (negative, oversized)
        out_of_range_ids: BTreeSet<i64>,
    },
    Filter {
        phases: BTreeMap<Phase, StrictnessMap>,
    },
}

impl SourcePayload {
    /// Distinct affix IDs referenced anywhere in the payload
    pub fn referenced_ids(&self) -> BTreeSet<AffixId> {
        match self {
            SourcePayload::Planner { phases, .. } => phases
                .values()
                .flat_map(|entries| entries.iter().map(|e| e.affix_id))
                .collect(),
            SourcePayload::Filter { phases } => phases
                .values()
                .flat_map(|levels| levels.values().flatten().copied())
                .collect(),
        }
    }

    /// Affix IDs that cannot name any catalog entry
    pub fn out_of_range_ids(&self) -> BTreeSet<i64> {
        match self {
            SourcePayload::Planner {
                out_of_range_ids, ..
            } => out_of_range_ids.clone(),
            SourcePayload::Filter { .. } => BTreeSet::new(),
        }
    }

    /// Number of phases holding any affix data
    pub fn phases_with_data(&self) -> usize {
        match self {
            SourcePayload::Planner { phases, .. } => {
                phases.values().filter(|entries| !entries.is_empty()).count()
            }
            SourcePayload::Filter { phases } => phases
                .values()
                .filter(|levels| levels.values().any(|ids| !ids.is_empty()))
                .count(),
        }
    }
}

/// Build-context value: a single string or a list of strings
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContextValue {
    Scalar(String),
    List(Vec<String>),
}

/// Ordered key → value map describing a build for condition evaluation
pub type BuildContext = BTreeMap<String, ContextValue>;

/// One ingested file, normalized. Lives only for the current run.
#[derive(Debug, Clone)]
pub struct RawSource {
    /// `planner:<stem>` or `filter:<stem>`
    pub source_id: String,
    pub build_slug: String,
    pub mastery: String,
    pub damage_types: Vec<String>,
    pub archetype: String,
    pub payload: SourcePayload,
    /// Hex SHA-256 of the raw file bytes
    pub checksum: String,
    pub covered_masteries: Vec<String>,
    /// Free-form; always contains `source_file`
    pub metadata: serde_json::Map<String, serde_json::Value>,
    /// Optional equipment/style flags
    pub context: BuildContext,
}

impl RawSource {
    pub fn kind(&self) -> SourceKind {
        match self.payload {
            SourcePayload::Planner { .. } => SourceKind::Planner,
            SourcePayload::Filter { .. } => SourceKind::Filter,
        }
    }

    pub fn scope(&self) -> SourceScope {
        SourceScope::from_mastery_count(self.covered_masteries.len())
    }
}

// ============================================================================
// Stage Outputs
// ============================================================================

/// Validator verdict for an accepted source
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SourceQualityScore {
    pub source_id: String,
    pub specificity: f64,
    pub affix_coverage: f64,
    pub phase_coverage: f64,
    pub recency: f64,
    pub consensus_alignment: f64,
    pub overall: f64,
    pub is_supplementary: bool,
}

/// One (affix, phase) observation from one source
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExtractedWeight {
    pub affix_id: AffixId,
    pub phase: Phase,
    pub weight: f64,
    pub min_tier: Option<u8>,
    pub category: Category,
    pub derivation: DerivationMethod,
    pub source_id: String,
}

/// Merged result for one (affix, phase) across a build's sources
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConsensusWeight {
    pub affix_id: AffixId,
    pub phase: Phase,
    pub weight: f64,
    pub category: Category,
    pub min_tier: Option<u8>,
    pub consensus_spread: f64,
    pub confidence: f64,
    pub source_count: usize,
}

/// Phase → consensus weights for that phase
pub type ConsensusByPhase = BTreeMap<Phase, Vec<ConsensusWeight>>;

/// Relationship type between two affixes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EdgeType {
    Synergy,
    Prerequisite,
}

/// Static directed relationship between affixes
#[derive(Debug, Clone, PartialEq)]
pub struct AffixEdge {
    pub from_id: AffixId,
    pub to_id: AffixId,
    pub edge_type: EdgeType,
    /// 0-1; used by synergy edges
    pub strength: f64,
    /// Prerequisite predicate, e.g. `attack_type == melee`
    pub condition: Option<String>,
}

/// Final output entry
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AffixWeight {
    pub id: AffixId,
    pub weight: f64,
    pub category: Category,
    pub min_tier: u8,
    pub consensus_spread: f64,
    pub confidence: f64,
}

/// Complete per-build artifact
#[derive(Debug, Clone, PartialEq)]
pub struct BuildKnowledgeProfile {
    pub build_slug: String,
    pub mastery: String,
    /// Primary damage type, empty when unknown
    pub damage_type: String,
    pub damage_types: Vec<String>,
    pub specificity_score: f64,
    pub source_count: usize,
    pub confidence: ConfidenceLabel,
    pub data_source_layer: LayerKind,
    /// All three phases always present
    pub phases: BTreeMap<Phase, Vec<AffixWeight>>,
}

// ============================================================================
// Run Report
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BuildFailure {
    pub build: String,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SourceRejection {
    pub source_id: String,
    pub build: String,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HighSpreadAffix {
    pub build: String,
    pub affix_id: AffixId,
    pub phase: Phase,
    pub spread: f64,
}

/// Rule-structure summary of one filter source
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FilterStructureSignals {
    pub source_id: String,
    pub essential_count: usize,
    pub strong_count: usize,
    pub useful_count: usize,
    pub filler_count: usize,
    pub strictness_levels: Vec<Strictness>,
}

/// Run-level summary, built incrementally
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PipelineReport {
    pub builds_processed: usize,
    pub builds_failed: Vec<BuildFailure>,
    pub sources_accepted: usize,
    pub sources_rejected: Vec<SourceRejection>,
    pub low_confidence_builds: Vec<String>,
    pub high_spread_affixes: Vec<HighSpreadAffix>,
    pub filter_signals: Vec<FilterStructureSignals>,
    pub duration_seconds: f64,
}

/// Round to `places` decimal places
pub fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scope_from_mastery_count() {
        assert_eq!(SourceScope::from_mastery_count(0), SourceScope::MultiMastery);
        assert_eq!(SourceScope::from_mastery_count(1), SourceScope::Specific);
        assert_eq!(SourceScope::from_mastery_count(3), SourceScope::MultiMastery);
        assert_eq!(SourceScope::from_mastery_count(4), SourceScope::MultiClass);
        assert_eq!(SourceScope::from_mastery_count(9), SourceScope::MultiClass);
        assert_eq!(SourceScope::from_mastery_count(10), SourceScope::Universal);
    }

    #[test]
    fn test_strictness_canonicalize() {
        assert_eq!(Strictness::canonicalize("Uber Strict"), Strictness::UberStrict);
        assert_eq!(Strictness::canonicalize("very-strict"), Strictness::VeryStrict);
        assert_eq!(Strictness::canonicalize("VERYSTRICT"), Strictness::VeryStrict);
        assert_eq!(Strictness::canonicalize("normal"), Strictness::Relaxed);
        assert_eq!(Strictness::canonicalize("lax"), Strictness::ShowAll);
        assert_eq!(Strictness::canonicalize("all"), Strictness::ShowAll);
        assert_eq!(Strictness::canonicalize("giga"), Strictness::Relaxed);
    }

    #[test]
    fn test_category_boundaries() {
        assert_eq!(Category::from_tier(7), Category::Essential);
        assert_eq!(Category::from_tier(6), Category::Strong);
        assert_eq!(Category::from_tier(3), Category::Useful);
        assert_eq!(Category::from_tier(2), Category::Filler);
        assert_eq!(Category::from_weight(75.0), Category::Essential);
        assert_eq!(Category::from_weight(74.99), Category::Strong);
        assert_eq!(Category::from_weight(35.0), Category::Useful);
        assert_eq!(Category::from_weight(34.0), Category::Filler);
    }

    #[test]
    fn test_orderings_match_priority() {
        assert!(Category::Essential < Category::Filler);
        assert!(Strictness::UberStrict < Strictness::ShowAll);
        assert!(LayerKind::Baseline < LayerKind::Specific);
        assert_eq!(LayerKind::Mastery.specificity(), 0.7);
    }

    #[test]
    fn test_filter_payload_phase_counting() {
        let mut levels = StrictnessMap::new();
        levels.insert(Strictness::Strict, BTreeSet::from([1, 2]));
        let phases = Phase::ALL.iter().map(|p| (*p, levels.clone())).collect();
        let payload = SourcePayload::Filter { phases };

        assert_eq!(payload.phases_with_data(), 3);
        assert_eq!(payload.referenced_ids(), BTreeSet::from([1, 2]));
    }
}
