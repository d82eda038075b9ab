//! Consensus Engine - merge weight observations across sources
//!
//! One call per build, covering every observation from every accepted
//! source. Observations are grouped by `(affix_id, phase)` and each group
//! yields one `ConsensusWeight`:
//!
//! 1. Outlier test (≥3 observations, leave-one-out): low-quality outliers
//!    are dropped, higher-quality ones kept with a spread penalty
//! 2. Quality-weighted mean `Σ(w·q)/Σq`
//! 3. Blend 50/50 toward the inherited baseline when few observations survive
//! 4. Spread from the sample standard deviation, confidence from quality,
//!    spread and observation count
//! 5. Category by majority vote, min tier by minimum

use crate::config::PipelineConfig;
use crate::types::{
    round_to, AffixId, Category, ConsensusByPhase, ConsensusWeight, ExtractedWeight, Phase,
    WeightMap,
};
use std::collections::BTreeMap;
use tracing::debug;

/// Quality used for observations whose source has no score
pub const DEFAULT_SOURCE_QUALITY: f64 = 0.5;

/// Spread penalty when an outlier is kept
const OUTLIER_SPREAD_PENALTY: f64 = 0.1;

/// Floor for the leave-one-out deviation in the outlier test
const MIN_OUTLIER_STD_DEV: f64 = 1.0;

/// Blend factor toward the baseline for thin consensus
const BASELINE_CLAMP_FACTOR: f64 = 0.5;

/// One observation inside a group
#[derive(Debug, Clone)]
struct Observation<'a> {
    weight: f64,
    quality: f64,
    min_tier: Option<u8>,
    category: Category,
    source_id: &'a str,
}

/// Merges extracted weights into consensus weights
#[derive(Debug, Clone)]
pub struct ConsensusEngine {
    outlier_std_dev_threshold: f64,
    supplementary_threshold: f64,
    min_sources_for_override: usize,
}

impl Default for ConsensusEngine {
    fn default() -> Self {
        Self::from_config(&PipelineConfig::default())
    }
}

impl ConsensusEngine {
    pub fn from_config(config: &PipelineConfig) -> Self {
        Self {
            outlier_std_dev_threshold: config.consensus.outlier_std_dev_threshold,
            supplementary_threshold: config.thresholds.supplementary_quality_threshold,
            min_sources_for_override: config.thresholds.min_sources_for_override,
        }
    }

    /// Merge all observations for one build.
    ///
    /// `quality_by_source` maps source ID → overall quality; `baseline` is the
    /// inherited weight map used to clamp thinly supported groups. Output is
    /// ordered by `(affix_id, phase)`.
    pub fn merge(
        &self,
        weights: &[ExtractedWeight],
        quality_by_source: &BTreeMap<String, f64>,
        baseline: Option<&WeightMap>,
    ) -> Vec<ConsensusWeight> {
        let mut groups: BTreeMap<(AffixId, Phase), Vec<Observation<'_>>> = BTreeMap::new();
        for ew in weights {
            let quality = quality_by_source
                .get(&ew.source_id)
                .copied()
                .unwrap_or(DEFAULT_SOURCE_QUALITY);
            groups
                .entry((ew.affix_id, ew.phase))
                .or_default()
                .push(Observation {
                    weight: ew.weight,
                    quality,
                    min_tier: ew.min_tier,
                    category: ew.category,
                    source_id: &ew.source_id,
                });
        }

        groups
            .iter()
            .map(|(&(affix_id, phase), observations)| {
                self.merge_group(affix_id, phase, observations, baseline)
            })
            .collect()
    }

    fn merge_group(
        &self,
        affix_id: AffixId,
        phase: Phase,
        observations: &[Observation<'_>],
        baseline: Option<&WeightMap>,
    ) -> ConsensusWeight {
        let (survivors, outlier_kept) = self.filter_outliers(affix_id, phase, observations);

        let survivor_weights: Vec<f64> = survivors.iter().map(|o| o.weight).collect();
        let survivor_qualities: Vec<f64> = survivors.iter().map(|o| o.quality).collect();
        let source_count = survivors.len();

        let mut weight = weighted_average(&survivor_weights, &survivor_qualities);
        let quality_avg = if source_count > 0 {
            survivor_qualities.iter().sum::<f64>() / source_count as f64
        } else {
            0.0
        };

        if source_count < self.min_sources_for_override {
            if let Some(&base) = baseline.and_then(|b| b.get(&affix_id)) {
                if base > 0.0 {
                    let blended = weight * (1.0 - BASELINE_CLAMP_FACTOR) + base * BASELINE_CLAMP_FACTOR;
                    debug!(
                        affix_id,
                        phase = %phase,
                        sources = source_count,
                        from = weight,
                        to = blended,
                        "Clamping toward baseline"
                    );
                    weight = blended;
                }
            }
        }

        let mut spread = if source_count >= 2 {
            (sample_std_dev(&survivor_weights) / 50.0).min(1.0)
        } else {
            0.0
        };
        if outlier_kept {
            spread = (spread + OUTLIER_SPREAD_PENALTY).min(1.0);
        }

        ConsensusWeight {
            affix_id,
            phase,
            weight: round_to(weight.clamp(0.0, 100.0), 2),
            category: majority_category(observations),
            min_tier: observations.iter().filter_map(|o| o.min_tier).min(),
            consensus_spread: round_to(spread, 4),
            confidence: confidence(spread, source_count, quality_avg),
            source_count,
        }
    }

    /// Returns the surviving observations and whether an outlier was kept.
    ///
    /// Each observation is compared against the mean and sample standard
    /// deviation of the *other* observations, so a single extreme value
    /// cannot mask itself by inflating the deviation. The deviation is
    /// floored at `MIN_OUTLIER_STD_DEV`.
    fn filter_outliers<'o, 'a>(
        &self,
        affix_id: AffixId,
        phase: Phase,
        observations: &'o [Observation<'a>],
    ) -> (Vec<&'o Observation<'a>>, bool) {
        if observations.len() < 3 {
            return (observations.iter().collect(), false);
        }

        let weights: Vec<f64> = observations.iter().map(|o| o.weight).collect();
        let mut survivors = Vec::with_capacity(observations.len());
        let mut outlier_kept = false;

        for (i, obs) in observations.iter().enumerate() {
            let others: Vec<f64> = weights
                .iter()
                .enumerate()
                .filter(|(j, _)| *j != i)
                .map(|(_, w)| *w)
                .collect();
            let mean = others.iter().sum::<f64>() / others.len() as f64;
            let sd = sample_std_dev(&others).max(MIN_OUTLIER_STD_DEV);

            if (obs.weight - mean).abs() > self.outlier_std_dev_threshold * sd {
                if obs.quality < self.supplementary_threshold {
                    debug!(
                        affix_id,
                        phase = %phase,
                        weight = obs.weight,
                        quality = obs.quality,
                        source_id = obs.source_id,
                        "Excluding low-quality outlier"
                    );
                    continue;
                }
                outlier_kept = true;
            }
            survivors.push(obs);
        }

        if survivors.is_empty() {
            return (observations.iter().collect(), false);
        }
        (survivors, outlier_kept)
    }
}

/// Split merged weights per phase, each list in ascending affix order
pub fn group_by_phase(weights: &[ConsensusWeight]) -> ConsensusByPhase {
    let mut by_phase: ConsensusByPhase = BTreeMap::new();
    for cw in weights {
        by_phase.entry(cw.phase).or_default().push(cw.clone());
    }
    by_phase
}

/// `Σ(w·q)/Σq`, or the plain mean when total quality is zero
fn weighted_average(weights: &[f64], qualities: &[f64]) -> f64 {
    if weights.is_empty() {
        return 0.0;
    }
    let total_quality: f64 = qualities.iter().sum();
    if total_quality == 0.0 {
        return weights.iter().sum::<f64>() / weights.len() as f64;
    }
    weights
        .iter()
        .zip(qualities)
        .map(|(w, q)| w * q)
        .sum::<f64>()
        / total_quality
}

/// Sample standard deviation (n − 1); zero for fewer than two values
fn sample_std_dev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let mean = values.iter().sum::<f64>() / values.len() as f64;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    variance.sqrt()
}

fn confidence(spread: f64, source_count: usize, quality_avg: f64) -> f64 {
    let source_factor = (source_count as f64 / 5.0).min(1.0);
    let spread_factor = (1.0 - spread).max(0.0);
    let value = quality_avg * 0.4 + spread_factor * 0.4 + source_factor * 0.2;
    round_to(value.clamp(0.0, 1.0), 4)
}

/// Most common category; ties go to the higher-priority category
fn majority_category(observations: &[Observation<'_>]) -> Category {
    let mut votes: BTreeMap<Category, usize> = BTreeMap::new();
    for o in observations {
        *votes.entry(o.category).or_default() += 1;
    }
    // BTreeMap iterates essential → filler; keep the first maximum
    votes
        .iter()
        .fold(None, |best: Option<(Category, usize)>, (cat, count)| match best {
            Some((_, best_count)) if best_count >= *count => best,
            _ => Some((*cat, *count)),
        })
        .map(|(cat, _)| cat)
        .unwrap_or(Category::Filler)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::DerivationMethod;

    fn obs(affix_id: AffixId, weight: f64, source: &str, category: Category) -> ExtractedWeight {
        ExtractedWeight {
            affix_id,
            phase: Phase::Endgame,
            weight,
            min_tier: None,
            category,
            derivation: DerivationMethod::TierTranslation,
            source_id: source.to_string(),
        }
    }

    fn qualities(pairs: &[(&str, f64)]) -> BTreeMap<String, f64> {
        pairs.iter().map(|(s, q)| (s.to_string(), *q)).collect()
    }

    #[test]
    fn test_zero_quality_observation_contributes_nothing() {
        let weights = vec![
            obs(1, 80.0, "a", Category::Essential),
            obs(1, 40.0, "b", Category::Useful),
        ];
        let result = ConsensusEngine::default().merge(
            &weights,
            &qualities(&[("a", 1.0), ("b", 0.0)]),
            None,
        );

        assert_eq!(result.len(), 1);
        assert_eq!(result[0].weight, 80.0);
        assert_eq!(result[0].source_count, 2);
    }

    #[test]
    fn test_all_zero_quality_falls_back_to_mean() {
        let weights = vec![obs(1, 80.0, "a", Category::Essential), obs(1, 40.0, "b", Category::Useful)];
        let result = ConsensusEngine::default().merge(
            &weights,
            &qualities(&[("a", 0.0), ("b", 0.0)]),
            None,
        );
        assert_eq!(result[0].weight, 60.0);
    }

    #[test]
    fn test_high_quality_outlier_retained_with_spread_penalty() {
        let values = [50.0, 52.0, 48.0, 51.0, 95.0];
        let weights: Vec<_> = values
            .iter()
            .enumerate()
            .map(|(i, w)| obs(1, *w, &format!("s{}", i), Category::Strong))
            .collect();
        let q: BTreeMap<String, f64> = (0..5).map(|i| (format!("s{}", i), 0.9)).collect();

        let result = ConsensusEngine::default().merge(&weights, &q, None);
        let cw = &result[0];

        assert_eq!(cw.source_count, 5);
        assert_eq!(cw.weight, 59.2);
        // sample stdev 20.067 / 50 + 0.1
        assert_eq!(cw.consensus_spread, 0.5013);
        assert_eq!(cw.confidence, 0.7595);
    }

    #[test]
    fn test_low_quality_outlier_dropped() {
        let weights = vec![
            obs(1, 50.0, "a", Category::Strong),
            obs(1, 52.0, "b", Category::Strong),
            obs(1, 48.0, "c", Category::Strong),
            obs(1, 95.0, "junk", Category::Essential),
        ];
        let q = qualities(&[("a", 0.9), ("b", 0.9), ("c", 0.9), ("junk", 0.2)]);

        let cw = &ConsensusEngine::default().merge(&weights, &q, None)[0];

        assert_eq!(cw.source_count, 3);
        assert_eq!(cw.weight, 50.0);
        // stdev of [50, 52, 48] = 2 → 0.04, no penalty
        assert_eq!(cw.consensus_spread, 0.04);
    }

    #[test]
    fn test_small_deviation_from_equal_pair_not_outlier() {
        let weights = vec![
            obs(1, 50.0, "a", Category::Useful),
            obs(1, 50.0, "b", Category::Useful),
            obs(1, 51.0, "c", Category::Useful),
        ];
        let q = qualities(&[("a", 0.9), ("b", 0.9), ("c", 0.9)]);

        let cw = &ConsensusEngine::default().merge(&weights, &q, None)[0];

        assert_eq!(cw.source_count, 3);
        // stdev 0.577 / 50, no outlier penalty
        assert_eq!(cw.consensus_spread, 0.0115);
    }

    #[test]
    fn test_thin_consensus_clamped_toward_baseline() {
        let weights = vec![obs(7, 95.0, "a", Category::Essential)];
        let baseline: WeightMap = [(7, 75.0)].into_iter().collect();

        let cw = &ConsensusEngine::default().merge(&weights, &qualities(&[("a", 1.0)]), Some(&baseline))[0];

        assert_eq!(cw.weight, 85.0);
        assert_eq!(cw.consensus_spread, 0.0);
        // 1.0*0.4 + 1.0*0.4 + 0.2*0.2
        assert_eq!(cw.confidence, 0.84);
    }

    #[test]
    fn test_no_clamp_without_baseline_entry() {
        let weights = vec![obs(7, 95.0, "a", Category::Essential)];
        let baseline: WeightMap = [(8, 75.0)].into_iter().collect();

        let cw = &ConsensusEngine::default().merge(&weights, &qualities(&[("a", 1.0)]), Some(&baseline))[0];
        assert_eq!(cw.weight, 95.0);
    }

    #[test]
    fn test_category_vote_tie_prefers_priority() {
        let weights = vec![
            obs(1, 25.0, "a", Category::Filler),
            obs(1, 95.0, "b", Category::Essential),
        ];
        let cw = &ConsensusEngine::default().merge(&weights, &BTreeMap::new(), None)[0];
        assert_eq!(cw.category, Category::Essential);

        let weights = vec![
            obs(1, 25.0, "a", Category::Filler),
            obs(1, 25.0, "b", Category::Filler),
            obs(1, 95.0, "c", Category::Essential),
        ];
        let cw = &ConsensusEngine::default().merge(&weights, &BTreeMap::new(), None)[0];
        assert_eq!(cw.category, Category::Filler);
    }

    #[test]
    fn test_min_tier_and_grouping() {
        let mut a = obs(1, 75.0, "a", Category::Strong);
        a.min_tier = Some(5);
        let mut b = obs(1, 95.0, "b", Category::Essential);
        b.min_tier = Some(7);
        let c = obs(1, 50.0, "c", Category::Useful);
        let mut d = obs(2, 50.0, "a", Category::Useful);
        d.phase = Phase::Starter;

        let result = ConsensusEngine::default().merge(&[a, b, c, d], &BTreeMap::new(), None);

        assert_eq!(result.len(), 2);
        assert_eq!(result[0].affix_id, 1);
        assert_eq!(result[0].min_tier, Some(5));
        let by_phase = group_by_phase(&result);
        assert_eq!(by_phase[&Phase::Starter].len(), 1);
        assert_eq!(by_phase[&Phase::Endgame].len(), 1);
    }

    #[test]
    fn test_unknown_source_gets_default_quality() {
        let weights = vec![obs(1, 60.0, "unscored", Category::Strong)];
        let cw = &ConsensusEngine::default().merge(&weights, &BTreeMap::new(), None)[0];
        // 0.5*0.4 + 1.0*0.4 + 0.2*0.2
        assert_eq!(cw.confidence, 0.64);
    }
}
