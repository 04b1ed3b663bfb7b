//! Shared wire models
//!
//! Message shapes exchanged with WebSocket/REST clients. Outbound field names
//! are part of the client protocol and must not drift; structs here carry the
//! serde renames that pin them.

use crate::tag_analyzer::HazardIndicators;
use serde::{Deserialize, Serialize};

/// Inbound subscription message
///
/// Each message wholesale-replaces the sending session's watch list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatchRequest {
    pub locations: Vec<String>,
}

/// Geographic coordinates of a camera
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lng: f64,
}

/// Outbound per-location evaluation result
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HazardUpdate {
    pub id: String,
    pub location_string: String,
    pub coords: Coordinates,
    pub score: f64,
    pub avg: f64,
    pub delta: f64,
    pub spike: bool,
    pub description: String,
    /// ISO-8601 / RFC 3339
    pub timestamp: String,
    /// data:image/jpeg;base64 URI of the evaluated frame
    pub image_ref: String,
    pub info: HazardIndicators,
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub connections: u64,
    pub watched_locations: usize,
}

/// Camera directory listing entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocationSummary {
    pub name: String,
    pub map_id: String,
    pub coords: Coordinates,
}
