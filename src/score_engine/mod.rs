//! ScoreEngine - Hazard Scoring and Spike Classification
//!
//! ## Responsibilities
//!
//! - Convert hazard indicators into a numeric score (fixed policy weights)
//! - Classify a score against a location's historical baseline

use crate::tag_analyzer::HazardIndicators;
use serde::{Deserialize, Serialize};

/// Policy weights. Fixed constants, not derived.
const WEIGHT_PERSON_LAYING: f64 = 80.0;
const WEIGHT_ACCIDENT: f64 = 100.0;
const WEIGHT_FALLEN_TREE: f64 = 60.0;
const WEIGHT_CONES: f64 = 10.0;
const WEIGHT_PER_DEBRIS_ITEM: f64 = 5.0;
const WEIGHT_PER_PEDESTRIAN: f64 = 0.5;

/// Relative threshold: delta must exceed this fraction of the baseline.
const SPIKE_BASELINE_RATIO: f64 = 0.2;
/// Absolute floor: a score at or below this never spikes. With a zero
/// baseline the relative term vanishes, so this floor alone gates the very
/// first observations at a new location.
const SPIKE_SCORE_FLOOR: f64 = 10.0;

/// Scored evaluation relative to the location's baseline
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HazardScore {
    pub current: f64,
    pub baseline: f64,
    pub delta: f64,
    pub is_spike: bool,
}

/// Weighted sum over the indicators. Pure; identical indicators always
/// produce the identical score.
pub fn calculate_score(indicators: &HazardIndicators) -> f64 {
    let mut score = 0.0;
    if indicators.person_laying {
        score += WEIGHT_PERSON_LAYING;
    }
    if indicators.accident {
        score += WEIGHT_ACCIDENT;
    }
    if indicators.fallen_tree {
        score += WEIGHT_FALLEN_TREE;
    }
    if indicators.cones {
        score += WEIGHT_CONES;
    }
    score += indicators.debris_items as f64 * WEIGHT_PER_DEBRIS_ITEM;
    score += indicators.pedestrian_count as f64 * WEIGHT_PER_PEDESTRIAN;
    score
}

/// Classify a current score against the historical baseline.
pub fn classify(current: f64, baseline: f64) -> HazardScore {
    let delta = (current - baseline).max(0.0);
    let is_spike = delta > baseline * SPIKE_BASELINE_RATIO && current > SPIKE_SCORE_FLOOR;

    HazardScore {
        current,
        baseline,
        delta,
        is_spike,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_indicators_score_zero() {
        assert_eq!(calculate_score(&HazardIndicators::default()), 0.0);
    }

    #[test]
    fn test_weighted_sum() {
        let indicators = HazardIndicators {
            accident: true,
            cones: true,
            debris_items: 2,
            ..Default::default()
        };
        // 100 + 10 + 2*5
        assert_eq!(calculate_score(&indicators), 120.0);
    }

    #[test]
    fn test_pedestrians_weigh_half_point() {
        let indicators = HazardIndicators {
            pedestrian_count: 4,
            ..Default::default()
        };
        assert_eq!(calculate_score(&indicators), 2.0);
    }

    #[test]
    fn test_all_indicators() {
        let indicators = HazardIndicators {
            person_laying: true,
            cones: true,
            accident: true,
            debris_items: 1,
            pedestrian_count: 2,
            fallen_tree: true,
            raw_tags: vec![],
        };
        // 80 + 100 + 60 + 10 + 5 + 1
        assert_eq!(calculate_score(&indicators), 256.0);
    }

    #[test]
    fn test_score_is_pure() {
        let indicators = HazardIndicators {
            cones: true,
            debris_items: 1,
            ..Default::default()
        };
        assert_eq!(calculate_score(&indicators), calculate_score(&indicators));
    }

    #[test]
    fn test_spike_zero_baseline_above_floor() {
        let score = classify(15.0, 0.0);
        assert_eq!(score.delta, 15.0);
        assert!(score.is_spike);
    }

    #[test]
    fn test_no_spike_zero_baseline_below_floor() {
        let score = classify(9.0, 0.0);
        assert!(!score.is_spike);
    }

    #[test]
    fn test_no_spike_below_baseline() {
        let score = classify(50.0, 100.0);
        assert_eq!(score.delta, 0.0);
        assert!(!score.is_spike);
    }

    #[test]
    fn test_spike_above_relative_threshold() {
        let score = classify(130.0, 100.0);
        assert_eq!(score.delta, 30.0);
        assert!(score.is_spike);
    }

    #[test]
    fn test_no_spike_within_relative_threshold() {
        // delta 15 <= 100 * 0.2
        let score = classify(115.0, 100.0);
        assert!(!score.is_spike);
    }

    #[test]
    fn test_small_score_over_small_baseline() {
        // delta 5 > 10*0.2 and 15 > 10
        let score = classify(15.0, 10.0);
        assert!(score.is_spike);
    }
}
