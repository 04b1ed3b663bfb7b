//! CameraDirectory - Monitored Camera Metadata
//!
//! ## Responsibilities
//!
//! - Load the camera list (name, page URL, map id, coordinates) from JSON
//! - Case-insensitive lookup by name or map id
//! - Coordinate fallback for cameras with no geo point

use crate::error::{Error, Result};
use crate::models::{Coordinates, LocationSummary};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

/// Fallback when a location is unknown or has no geo point (city centre).
const DEFAULT_COORDS: Coordinates = Coordinates {
    lat: 49.2827,
    lng: -123.1207,
};

/// One monitored camera
#[derive(Debug, Clone)]
pub struct CameraInfo {
    pub name: String,
    pub page_url: String,
    pub map_id: String,
    pub lat: f64,
    pub lng: f64,
}

/// Raw JSON record shape of the camera data file
#[derive(Debug, Deserialize)]
struct CameraRecord {
    name: String,
    url: String,
    mapid: String,
    geo_point_2d: Option<GeoPoint>,
}

#[derive(Debug, Deserialize)]
struct GeoPoint {
    lat: f64,
    lon: f64,
}

/// CameraDirectory instance
///
/// Built once at startup and read-only afterwards, so lookups need no lock.
pub struct CameraDirectory {
    cameras: HashMap<String, CameraInfo>,
}

impl CameraDirectory {
    /// Load the directory from a JSON file
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("camera data file {}: {}", path.display(), e))
        })?;
        let records: Vec<CameraRecord> = serde_json::from_str(&raw)?;
        let directory = Self::from_records(records);

        tracing::info!(
            path = %path.display(),
            cameras = directory.len(),
            "Camera directory loaded"
        );
        Ok(directory)
    }

    /// Build a directory from already-parsed entries
    pub fn from_cameras(cameras: Vec<CameraInfo>) -> Self {
        let mut map = HashMap::new();
        for camera in cameras {
            map.insert(camera.name.to_lowercase(), camera.clone());
            map.insert(camera.map_id.to_lowercase(), camera);
        }
        Self { cameras: map }
    }

    fn from_records(records: Vec<CameraRecord>) -> Self {
        let cameras = records
            .into_iter()
            .map(|r| {
                let (lat, lng) = r
                    .geo_point_2d
                    .map(|g| (g.lat, g.lon))
                    .unwrap_or((DEFAULT_COORDS.lat, DEFAULT_COORDS.lng));
                CameraInfo {
                    name: r.name,
                    page_url: r.url,
                    map_id: r.mapid,
                    lat,
                    lng,
                }
            })
            .collect();
        Self::from_cameras(cameras)
    }

    /// Look up a camera by name or map id, case-insensitive
    pub fn lookup(&self, location_id: &str) -> Option<&CameraInfo> {
        self.cameras.get(&location_id.to_lowercase())
    }

    /// Coordinates for a location, falling back to the city centre
    pub fn coordinates(&self, location_id: &str) -> Coordinates {
        self.lookup(location_id)
            .map(|c| Coordinates {
                lat: c.lat,
                lng: c.lng,
            })
            .unwrap_or(DEFAULT_COORDS)
    }

    /// Distinct cameras, one entry each, for the listing endpoint
    pub fn summaries(&self) -> Vec<LocationSummary> {
        let mut seen: Vec<LocationSummary> = Vec::new();
        for camera in self.cameras.values() {
            if seen.iter().any(|s| s.map_id == camera.map_id) {
                continue;
            }
            seen.push(LocationSummary {
                name: camera.name.clone(),
                map_id: camera.map_id.clone(),
                coords: Coordinates {
                    lat: camera.lat,
                    lng: camera.lng,
                },
            });
        }
        seen.sort_by(|a, b| a.name.cmp(&b.name));
        seen
    }

    /// Number of index entries (each camera is indexed under two keys)
    pub fn len(&self) -> usize {
        self.cameras.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cameras.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> CameraDirectory {
        CameraDirectory::from_cameras(vec![
            CameraInfo {
                name: "Main St at 1st Ave".to_string(),
                page_url: "https://cams.example/main1st.html".to_string(),
                map_id: "CAM001".to_string(),
                lat: 49.27,
                lng: -123.10,
            },
            CameraInfo {
                name: "Georgia at Denman".to_string(),
                page_url: "https://cams.example/georgia.html".to_string(),
                map_id: "CAM002".to_string(),
                lat: 49.29,
                lng: -123.13,
            },
        ])
    }

    #[test]
    fn test_lookup_is_case_insensitive() {
        let directory = sample();
        assert!(directory.lookup("main st at 1st ave").is_some());
        assert!(directory.lookup("MAIN ST AT 1ST AVE").is_some());
        assert!(directory.lookup("cam001").is_some());
        assert!(directory.lookup("CAM001").is_some());
        assert!(directory.lookup("nowhere").is_none());
    }

    #[test]
    fn test_coordinates_fallback() {
        let directory = sample();
        let known = directory.coordinates("cam002");
        assert_eq!(known.lat, 49.29);

        let unknown = directory.coordinates("nowhere");
        assert_eq!(unknown, DEFAULT_COORDS);
    }

    #[test]
    fn test_records_without_geo_point_use_fallback() {
        let records = vec![CameraRecord {
            name: "No Geo".to_string(),
            url: "https://cams.example/nogeo.html".to_string(),
            mapid: "CAM009".to_string(),
            geo_point_2d: None,
        }];
        let directory = CameraDirectory::from_records(records);
        assert_eq!(directory.coordinates("cam009"), DEFAULT_COORDS);
    }

    #[test]
    fn test_summaries_deduplicate_cameras() {
        let directory = sample();
        let summaries = directory.summaries();
        assert_eq!(summaries.len(), 2);
        assert_eq!(summaries[0].name, "Georgia at Denman");
    }
}
