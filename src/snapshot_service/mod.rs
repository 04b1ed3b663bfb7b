//! SnapshotService - Image Capture from Traffic Cameras
//!
//! ## Responsibilities
//!
//! - Fetch a camera's public page over HTTP
//! - Scrape image URLs out of the page markup
//! - Download the freshest frame for evaluation
//!
//! "No image available" is a normal condition here, not a fault: every
//! failure mode short-circuits to `Ok(None)` so the caller skips the tick
//! for that location.

use crate::camera_directory::CameraInfo;
use crate::error::Result;
use async_trait::async_trait;
use regex::Regex;
use reqwest::Url;
use std::time::Duration;

/// Capability of producing at most one raw frame per location per tick
#[async_trait]
pub trait ImageSource: Send + Sync {
    /// Returns `None` when no image is currently available
    async fn fetch(&self, camera: &CameraInfo) -> Result<Option<Vec<u8>>>;
}

/// SnapshotService instance
pub struct SnapshotService {
    client: reqwest::Client,
    img_tag: Regex,
    /// Download attempts per page before giving up
    max_candidates: usize,
}

impl SnapshotService {
    /// Create a new SnapshotService
    pub fn new() -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            img_tag: Regex::new(r#"<img[^>]+src=["']([^"']+)["']"#)
                .expect("invalid img tag pattern"),
            max_candidates: 4,
        }
    }

    /// Pull image URLs out of the page markup, resolved against the page URL.
    ///
    /// Only jpg/jpeg/png sources qualify; anything else on the page (icons,
    /// trackers, svg sprites) is skipped.
    fn extract_image_urls(&self, html: &str, page_url: &str) -> Vec<String> {
        let base = match Url::parse(page_url) {
            Ok(base) => base,
            Err(e) => {
                tracing::warn!(page_url = %page_url, error = %e, "Unparseable camera page URL");
                return Vec::new();
            }
        };

        self.img_tag
            .captures_iter(html)
            .filter_map(|cap| {
                let src = cap.get(1)?.as_str();
                let lower = src.to_lowercase();
                if !(lower.ends_with(".jpg") || lower.ends_with(".jpeg") || lower.ends_with(".png"))
                {
                    return None;
                }
                base.join(src).ok().map(|url| url.to_string())
            })
            .collect()
    }

    async fn download(&self, url: &str) -> Option<Vec<u8>> {
        let resp = match self.client.get(url).send().await {
            Ok(resp) => resp,
            Err(e) => {
                tracing::warn!(url = %url, error = %e, "Image download failed");
                return None;
            }
        };
        if !resp.status().is_success() {
            tracing::warn!(url = %url, status = %resp.status(), "Image download rejected");
            return None;
        }
        match resp.bytes().await {
            Ok(bytes) if !bytes.is_empty() => Some(bytes.to_vec()),
            Ok(_) => None,
            Err(e) => {
                tracing::warn!(url = %url, error = %e, "Image body read failed");
                None
            }
        }
    }
}

impl Default for SnapshotService {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ImageSource for SnapshotService {
    async fn fetch(&self, camera: &CameraInfo) -> Result<Option<Vec<u8>>> {
        let html = match self.client.get(&camera.page_url).send().await {
            Ok(resp) if resp.status().is_success() => match resp.text().await {
                Ok(html) => html,
                Err(e) => {
                    tracing::warn!(camera = %camera.name, error = %e, "Camera page body read failed");
                    return Ok(None);
                }
            },
            Ok(resp) => {
                tracing::warn!(
                    camera = %camera.name,
                    status = %resp.status(),
                    "Camera page fetch rejected"
                );
                return Ok(None);
            }
            Err(e) => {
                tracing::warn!(camera = %camera.name, error = %e, "Camera page fetch failed");
                return Ok(None);
            }
        };

        let candidates = self.extract_image_urls(&html, &camera.page_url);
        if candidates.is_empty() {
            tracing::info!(camera = %camera.name, "No image URLs on camera page");
            return Ok(None);
        }

        for url in candidates.iter().take(self.max_candidates) {
            if let Some(data) = self.download(url).await {
                tracing::debug!(
                    camera = %camera.name,
                    url = %url,
                    size = data.len(),
                    "Snapshot captured"
                );
                return Ok(Some(data));
            }
        }

        tracing::info!(camera = %camera.name, "No downloadable image for camera");
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE_URL: &str = "https://cams.example/views/main1st.html";

    #[test]
    fn test_extract_absolute_and_relative_urls() {
        let service = SnapshotService::new();
        let html = r#"
            <img src="https://cdn.example/frames/a.jpg">
            <img class="frame" src="b.jpeg" alt="camera">
            <img src='/frames/c.png'>
        "#;
        let urls = service.extract_image_urls(html, PAGE_URL);
        assert_eq!(
            urls,
            vec![
                "https://cdn.example/frames/a.jpg",
                "https://cams.example/views/b.jpeg",
                "https://cams.example/frames/c.png",
            ]
        );
    }

    #[test]
    fn test_extract_skips_non_image_sources() {
        let service = SnapshotService::new();
        let html = r#"
            <img src="sprite.svg">
            <img src="pixel.gif">
            <img src="frame.JPG">
        "#;
        let urls = service.extract_image_urls(html, PAGE_URL);
        assert_eq!(urls, vec!["https://cams.example/views/frame.JPG"]);
    }

    #[test]
    fn test_extract_empty_markup() {
        let service = SnapshotService::new();
        assert!(service
            .extract_image_urls("<html><body>offline</body></html>", PAGE_URL)
            .is_empty());
    }

    #[test]
    fn test_extract_with_bad_page_url() {
        let service = SnapshotService::new();
        assert!(service
            .extract_image_urls(r#"<img src="a.jpg">"#, "not a url")
            .is_empty());
    }
}
