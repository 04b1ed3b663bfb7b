//! TagAnalyzer - Detection Label Classification
//!
//! ## Responsibilities
//!
//! - Fold a raw detection list into semantic hazard indicators
//! - Keep the original label sequence for audit
//!
//! Indicator derivation is a pure function of one evaluation's detections;
//! nothing here carries state across evaluations.

use crate::detection_client::DetectionTag;
use serde::{Deserialize, Serialize};

/// Semantic hazard indicators derived from one image's detections
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HazardIndicators {
    pub person_laying: bool,
    pub cones: bool,
    pub accident: bool,
    #[serde(rename = "numberOfDebrisItems")]
    pub debris_items: u32,
    #[serde(rename = "pedestrianAmount")]
    pub pedestrian_count: u32,
    pub fallen_tree: bool,
    /// Original ordered label sequence, kept for audit
    pub raw_tags: Vec<String>,
}

/// Derive hazard indicators from a detection list.
///
/// Each label is scanned once (lowercased, substring match). Checks are
/// independent; a single label can set several indicators. Accumulation is
/// commutative, so input order only affects `raw_tags`.
pub fn analyze_tags(detections: &[DetectionTag]) -> HazardIndicators {
    let mut indicators = HazardIndicators {
        raw_tags: detections.iter().map(|d| d.label.clone()).collect(),
        ..Default::default()
    };

    for detection in detections {
        let label = detection.label.to_lowercase();

        if label.contains("person") && label.contains("lay") {
            indicators.person_laying = true;
        }
        if label.contains("cone") {
            indicators.cones = true;
        }
        if label.contains("debris") {
            indicators.debris_items += 1;
        }
        if label.contains("person") && !label.contains("lay") {
            indicators.pedestrian_count += 1;
        }
        if label.contains("tree") {
            indicators.fallen_tree = true;
        }
        if label.contains("crash") || label.contains("accident") || label.contains("wreck") {
            indicators.accident = true;
        }
    }

    indicators
}
