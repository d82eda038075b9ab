//! Source quality gate
//!
//! Every ingested source passes through here before extraction.
//!
//! # Hard rejection (checked in order)
//! 1. Too few distinct affix IDs
//! 2. Any affix ID missing from the catalog
//! 3. No phase differentiation
//! 4. Checksum already accepted earlier in the run
//!
//! # Soft scoring
//! Five 0-1 dimensions combined by a weighted average. Sources scoring
//! below the supplementary threshold are still accepted; their lower
//! quality only reduces their pull in the consensus average.

use crate::config::{PipelineConfig, QualityWeights};
use crate::error::Rejection;
use crate::types::{round_to, AffixId, RawSource, SourceKind, SourceQualityScore, SourceScope};
use std::collections::{BTreeSet, HashSet};
use tracing::{debug, info};

/// Unknown IDs listed in a rejection reason
const UNKNOWN_SAMPLE_SIZE: usize = 5;

/// Validates sources against the catalog
#[derive(Debug, Clone)]
pub struct SourceValidator {
    known_ids: BTreeSet<AffixId>,
    weights: QualityWeights,
    min_unique_affixes: usize,
    supplementary_threshold: f64,
}

impl SourceValidator {
    pub fn new(
        known_ids: BTreeSet<AffixId>,
        weights: QualityWeights,
        min_unique_affixes: usize,
        supplementary_threshold: f64,
    ) -> Self {
        Self {
            known_ids,
            weights,
            min_unique_affixes,
            supplementary_threshold,
        }
    }

    pub fn from_config(known_ids: BTreeSet<AffixId>, config: &PipelineConfig) -> Self {
        Self::new(
            known_ids,
            config.quality_weights.clone(),
            config.thresholds.min_unique_affixes,
            config.thresholds.supplementary_quality_threshold,
        )
    }

    /// Accept with a quality score, or reject with a reason.
    ///
    /// Does not record the checksum; the caller adds it on acceptance.
    pub fn validate(
        &self,
        source: &RawSource,
        seen_checksums: &HashSet<String>,
    ) -> Result<SourceQualityScore, Rejection> {
        match self.check(source, seen_checksums) {
            Ok(score) => {
                debug!(
                    source_id = %source.source_id,
                    overall = score.overall,
                    specificity = score.specificity,
                    phase_coverage = score.phase_coverage,
                    supplementary = score.is_supplementary,
                    "Source accepted"
                );
                Ok(score)
            }
            Err(rejection) => {
                info!(source_id = %source.source_id, reason = %rejection, "Source rejected");
                Err(rejection)
            }
        }
    }

    fn check(
        &self,
        source: &RawSource,
        seen_checksums: &HashSet<String>,
    ) -> Result<SourceQualityScore, Rejection> {
        let all_ids = source.payload.referenced_ids();
        let out_of_range = source.payload.out_of_range_ids();
        let unique_count = all_ids.len() + out_of_range.len();

        if unique_count < self.min_unique_affixes {
            return Err(Rejection::TooSparse {
                count: unique_count,
                minimum: self.min_unique_affixes,
            });
        }

        let unknown: BTreeSet<i64> = all_ids
            .difference(&self.known_ids)
            .map(|&id| i64::from(id))
            .chain(out_of_range)
            .collect();
        if !unknown.is_empty() {
            return Err(Rejection::UnknownAffixes {
                count: unknown.len(),
                sample: unknown.into_iter().take(UNKNOWN_SAMPLE_SIZE).collect(),
            });
        }

        let phases_with_data = source.payload.phases_with_data();
        match source.kind() {
            SourceKind::Planner if phases_with_data < 2 => {
                return Err(Rejection::NoPhaseDifferentiation(format!(
                    "planner has affix data in {} of 3 phases",
                    phases_with_data
                )));
            }
            SourceKind::Filter if phases_with_data == 0 => {
                return Err(Rejection::NoPhaseDifferentiation(
                    "filter has no strictness levels with affixes".to_string(),
                ));
            }
            _ => {}
        }

        if seen_checksums.contains(&source.checksum) {
            return Err(Rejection::Duplicate(source.checksum.clone()));
        }

        let specificity = specificity(source);
        let known_present = all_ids.intersection(&self.known_ids).count();
        let affix_coverage = if unique_count == 0 {
            0.0
        } else {
            known_present as f64 / unique_count as f64
        };
        let phase_coverage = (phases_with_data as f64 / 3.0).min(1.0);
        let recency = 1.0;
        let consensus_alignment = 1.0;

        let overall = self.overall(
            specificity,
            affix_coverage,
            phase_coverage,
            recency,
            consensus_alignment,
        );

        Ok(SourceQualityScore {
            source_id: source.source_id.clone(),
            specificity: round_to(specificity, 4),
            affix_coverage: round_to(affix_coverage, 4),
            phase_coverage: round_to(phase_coverage, 4),
            recency: round_to(recency, 4),
            consensus_alignment: round_to(consensus_alignment, 4),
            overall: round_to(overall, 4),
            is_supplementary: overall < self.supplementary_threshold,
        })
    }

    fn overall(
        &self,
        specificity: f64,
        affix_coverage: f64,
        phase_coverage: f64,
        recency: f64,
        consensus_alignment: f64,
    ) -> f64 {
        let w = &self.weights;
        let total = w.specificity + w.affix_coverage + w.phase_coverage + w.recency + w.consensus_alignment;
        if total <= 0.0 {
            return 0.0;
        }
        (specificity * w.specificity
            + affix_coverage * w.affix_coverage
            + phase_coverage * w.phase_coverage
            + recency * w.recency
            + consensus_alignment * w.consensus_alignment)
            / total
    }
}

/// 1.0 for single-mastery sources, diluted by mastery count otherwise
fn specificity(source: &RawSource) -> f64 {
    if source.scope() == SourceScope::Specific {
        return 1.0;
    }
    match source.covered_masteries.len() {
        0 => 0.1,
        n => (1.0 / n as f64).min(1.0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{filter_source, planner_source};
    use crate::types::{Phase, SourcePayload, Strictness};

    fn validator() -> SourceValidator {
        SourceValidator::new((1..=100).collect(), QualityWeights::default(), 15, 0.4)
    }

    fn entries(range: std::ops::RangeInclusive<u32>) -> Vec<(u32, u8)> {
        range.map(|id| (id, 5)).collect()
    }

    #[test]
    fn test_sparse_source_rejected_with_count() {
        let source = planner_source(
            "planner:sparse",
            &[(Phase::Starter, entries(1..=9)), (Phase::Endgame, entries(1..=9))],
        );
        let err = validator().validate(&source, &HashSet::new()).unwrap_err();
        assert!(matches!(err, Rejection::TooSparse { count: 9, .. }));
        assert!(err.to_string().contains('9'));
    }

    #[test]
    fn test_unknown_ids_rejected_even_with_known_majority() {
        let mut ids = entries(1..=20);
        ids.push((5000, 3));
        let source = planner_source(
            "planner:unknown",
            &[(Phase::Starter, ids.clone()), (Phase::Endgame, ids)],
        );
        let err = validator().validate(&source, &HashSet::new()).unwrap_err();
        assert_eq!(
            err,
            Rejection::UnknownAffixes {
                count: 1,
                sample: vec![5000]
            }
        );
    }

    #[test]
    fn test_negative_id_rejected_as_unknown() {
        let mut source = planner_source(
            "planner:negative",
            &[(Phase::Starter, entries(1..=20)), (Phase::Endgame, entries(1..=20))],
        );
        if let SourcePayload::Planner {
            out_of_range_ids, ..
        } = &mut source.payload
        {
            out_of_range_ids.insert(-4);
        }

        let err = validator().validate(&source, &HashSet::new()).unwrap_err();
        assert_eq!(err.to_string(), "Contains 1 unknown affix ID(s): [-4]");
    }

    #[test]
    fn test_single_phase_planner_rejected() {
        let source = planner_source("planner:flat", &[(Phase::Endgame, entries(1..=20))]);
        let err = validator().validate(&source, &HashSet::new()).unwrap_err();
        assert!(matches!(err, Rejection::NoPhaseDifferentiation(_)));
    }

    #[test]
    fn test_duplicate_checksum_rejected() {
        let source = planner_source(
            "planner:a",
            &[(Phase::Starter, entries(1..=20)), (Phase::Endgame, entries(1..=20))],
        );
        let v = validator();
        let mut seen = HashSet::new();
        assert!(v.validate(&source, &seen).is_ok());

        seen.insert(source.checksum.clone());
        assert!(matches!(
            v.validate(&source, &seen),
            Err(Rejection::Duplicate(_))
        ));
    }

    #[test]
    fn test_scores_for_two_phase_specific_planner() {
        let source = planner_source(
            "planner:a",
            &[(Phase::Starter, entries(1..=20)), (Phase::Endgame, entries(1..=20))],
        );
        let score = validator().validate(&source, &HashSet::new()).unwrap();

        assert_eq!(score.specificity, 1.0);
        assert_eq!(score.affix_coverage, 1.0);
        assert_eq!(score.phase_coverage, 0.6667);
        // 0.30 + 0.25 + 0.20 * 2/3 + 0.15 + 0.10
        assert_eq!(score.overall, 0.9333);
        assert!(!score.is_supplementary);
    }

    #[test]
    fn test_multi_mastery_filter_diluted() {
        let mut source = filter_source("filter:wide", &[(Strictness::Strict, (1..=20).collect())]);
        source.covered_masteries = vec!["a".into(), "b".into(), "c".into(), "d".into()];

        let score = validator().validate(&source, &HashSet::new()).unwrap();

        assert_eq!(score.specificity, 0.25);
        assert_eq!(score.phase_coverage, 1.0);
    }

    #[test]
    fn test_no_masteries_specificity_floor() {
        let mut source = filter_source("filter:none", &[(Strictness::Strict, (1..=20).collect())]);
        source.covered_masteries.clear();

        let score = validator().validate(&source, &HashSet::new()).unwrap();
        assert_eq!(score.specificity, 0.1);
    }

    #[test]
    fn test_low_overall_marks_supplementary() {
        let weights = QualityWeights {
            specificity: 1.0,
            affix_coverage: 0.0,
            phase_coverage: 0.0,
            recency: 0.0,
            consensus_alignment: 0.0,
        };
        let v = SourceValidator::new((1..=100).collect(), weights, 15, 0.4);
        let mut source = filter_source("filter:wide", &[(Strictness::Strict, (1..=20).collect())]);
        source.covered_masteries = (0..10).map(|i| format!("m{}", i)).collect();

        let score = v.validate(&source, &HashSet::new()).unwrap();
        assert_eq!(score.overall, 0.1);
        assert!(score.is_supplementary);
    }
}
