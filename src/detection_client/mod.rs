//! DetectionClient - Asynchronous Object Detection Adapter
//!
//! ## Responsibilities
//!
//! - Submit camera frames to the external detection service
//! - Poll job results at a fixed interval with a bounded attempt count
//! - Decode label/confidence lists across the backend's naming schemes
//!
//! The service is asynchronous: a submission returns an opaque job handle and
//! results are fetched by polling that handle. Handles are never reused. The
//! client never errors past its boundary; callers always get a (possibly
//! empty) tag list plus an explicit status.

use crate::error::{Error, Result};
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

/// Candidate field names per concept, tried in priority order.
const JOB_ID_KEYS: [&str; 4] = ["job_id", "id", "event_id", "task_id"];
const LABEL_KEYS: [&str; 3] = ["label", "class", "name"];
const CONFIDENCE_KEYS: [&str; 3] = ["confidence", "score", "probability"];
const LIST_KEYS: [&str; 4] = ["detections", "predictions", "results", "data"];

/// One detected object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionTag {
    pub label: String,
    /// Clamped to [0, 1]
    pub confidence: f64,
}

/// State of a submitted job as reported by one poll
#[derive(Debug, Clone, PartialEq)]
pub enum PollStatus {
    /// Job not finished yet; keep polling
    Pending,
    /// Job finished; zero or more detections
    Complete(Vec<DetectionTag>),
    /// Job terminally failed; never poll this handle again
    Failed(String),
}

/// Transport seam under the client. Production is HTTP; tests script it.
#[async_trait]
pub trait DetectionBackend: Send + Sync {
    /// Submit an image, returning an opaque job handle
    async fn submit(&self, image: Vec<u8>) -> Result<String>;

    /// Fetch the current state of a submitted job
    async fn poll(&self, job_id: &str) -> Result<PollStatus>;
}

/// How a detection round ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetectionStatus {
    /// Backend completed the job (possibly with zero detections)
    Completed,
    /// Poll budget exhausted before completion
    TimedOut,
    /// Submit or poll failed terminally
    Failed,
}

/// Outcome of one detection round
#[derive(Debug, Clone, PartialEq)]
pub struct DetectionResult {
    pub tags: Vec<DetectionTag>,
    pub status: DetectionStatus,
}

impl DetectionResult {
    fn completed(tags: Vec<DetectionTag>) -> Self {
        Self {
            tags,
            status: DetectionStatus::Completed,
        }
    }

    fn empty(status: DetectionStatus) -> Self {
        Self {
            tags: Vec::new(),
            status,
        }
    }

    /// True when the pipeline got nothing because the backend gave nothing,
    /// as opposed to a clean zero-detection frame.
    pub fn is_degraded(&self) -> bool {
        self.status != DetectionStatus::Completed
    }
}

/// DetectionClient instance
pub struct DetectionClient {
    backend: Arc<dyn DetectionBackend>,
    poll_interval: Duration,
    max_polls: u32,
}

impl DetectionClient {
    /// Create a client with the default poll policy (1 s interval, 10 polls)
    pub fn new(backend: Arc<dyn DetectionBackend>) -> Self {
        Self {
            backend,
            poll_interval: Duration::from_secs(1),
            max_polls: 10,
        }
    }

    /// Override the poll policy
    pub fn with_poll_policy(mut self, interval: Duration, max_polls: u32) -> Self {
        self.poll_interval = interval;
        self.max_polls = max_polls.max(1);
        self
    }

    /// Run one full submit-then-poll round for an image.
    ///
    /// Stops at the first completion, the first terminal failure, or after
    /// `max_polls` attempts, whichever comes first.
    pub async fn detect(&self, image: Vec<u8>) -> DetectionResult {
        let job_id = match self.backend.submit(image).await {
            Ok(id) => id,
            Err(e) => {
                tracing::warn!(error = %e, "Detection submit failed");
                return DetectionResult::empty(DetectionStatus::Failed);
            }
        };

        for attempt in 1..=self.max_polls {
            match self.backend.poll(&job_id).await {
                Ok(PollStatus::Complete(tags)) => {
                    tracing::debug!(
                        job_id = %job_id,
                        attempt = attempt,
                        detections = tags.len(),
                        "Detection job completed"
                    );
                    return DetectionResult::completed(tags);
                }
                Ok(PollStatus::Failed(reason)) => {
                    tracing::warn!(job_id = %job_id, reason = %reason, "Detection job failed");
                    return DetectionResult::empty(DetectionStatus::Failed);
                }
                Ok(PollStatus::Pending) => {
                    if attempt < self.max_polls {
                        tokio::time::sleep(self.poll_interval).await;
                    }
                }
                Err(e) => {
                    tracing::warn!(job_id = %job_id, error = %e, "Detection poll failed");
                    return DetectionResult::empty(DetectionStatus::Failed);
                }
            }
        }

        tracing::warn!(
            job_id = %job_id,
            max_polls = self.max_polls,
            "Detection job did not complete within the poll budget"
        );
        DetectionResult::empty(DetectionStatus::TimedOut)
    }
}

/// HTTP implementation of the detection backend
pub struct HttpDetectionBackend {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl HttpDetectionBackend {
    /// Create a new HTTP backend
    pub fn new(base_url: String) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            base_url,
            token: None,
        }
    }

    /// Attach a bearer token for authenticated backends
    pub fn with_token(mut self, token: Option<String>) -> Self {
        self.token = token;
        self
    }

    fn authorize(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.token {
            Some(token) => req.bearer_auth(token),
            None => req,
        }
    }
}

#[async_trait]
impl DetectionBackend for HttpDetectionBackend {
    async fn submit(&self, image: Vec<u8>) -> Result<String> {
        let url = format!("{}/v1/detections", self.base_url);

        let form = Form::new().part(
            "image",
            Part::bytes(image)
                .file_name("snapshot.jpg")
                .mime_str("image/jpeg")?,
        );

        let resp = self
            .authorize(self.client.post(&url))
            .multipart(form)
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(Error::Detection(format!(
                "submit failed: {}",
                resp.status()
            )));
        }

        let body: Value = resp.json().await?;
        first_string(&body, &JOB_ID_KEYS)
            .ok_or_else(|| Error::Detection("submit response carried no job id".to_string()))
    }

    async fn poll(&self, job_id: &str) -> Result<PollStatus> {
        let url = format!("{}/v1/detections/{}", self.base_url, job_id);
        let resp = self.authorize(self.client.get(&url)).send().await?;

        let status = resp.status();
        if !status.is_success() {
            // The job handle is single-use; an error status here is terminal.
            return Ok(PollStatus::Failed(format!("poll returned {status}")));
        }

        let body: Value = resp.json().await.unwrap_or(Value::Null);
        Ok(decode_poll_response(&body))
    }
}

/// Interpret one poll response body.
///
/// An explicit status string wins; a body with no status is read as a
/// completed result. Unrecognized shapes decode to zero detections rather
/// than an error.
pub(crate) fn decode_poll_response(body: &Value) -> PollStatus {
    if let Some(status) = body.get("status").and_then(Value::as_str) {
        return match status.to_lowercase().as_str() {
            "pending" | "queued" | "running" | "processing" | "in_progress" => PollStatus::Pending,
            "failed" | "error" | "failure" | "cancelled" => {
                let reason = first_string(body, &["error", "message", "detail"])
                    .unwrap_or_else(|| status.to_string());
                PollStatus::Failed(reason)
            }
            _ => PollStatus::Complete(decode_tags(body)),
        };
    }

    if let Some(error) = body.get("error").and_then(Value::as_str) {
        return PollStatus::Failed(error.to_string());
    }

    PollStatus::Complete(decode_tags(body))
}

/// Extract detection tags from a completed response body.
pub(crate) fn decode_tags(body: &Value) -> Vec<DetectionTag> {
    let items = match body {
        Value::Array(items) => items.as_slice(),
        Value::Object(_) => match LIST_KEYS
            .iter()
            .find_map(|key| body.get(*key).and_then(Value::as_array))
        {
            Some(items) => items.as_slice(),
            None => return Vec::new(),
        },
        _ => return Vec::new(),
    };

    items
        .iter()
        .filter_map(|item| {
            let label = first_string(item, &LABEL_KEYS)?;
            let confidence = first_number(item, &CONFIDENCE_KEYS)
                .unwrap_or(0.0)
                .clamp(0.0, 1.0);
            Some(DetectionTag { label, confidence })
        })
        .collect()
}

fn first_string(value: &Value, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| match value.get(*key) {
        Some(Value::String(s)) if !s.is_empty() => Some(s.clone()),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

fn first_number(value: &Value, keys: &[&str]) -> Option<f64> {
    keys.iter()
        .find_map(|key| value.get(*key).and_then(Value::as_f64))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;

    /// Backend that replays a fixed poll script and counts calls
    struct ScriptedBackend {
        submit_ok: bool,
        script: Mutex<Vec<PollStatus>>,
        polls: AtomicU32,
    }

    impl ScriptedBackend {
        fn new(script: Vec<PollStatus>) -> Self {
            Self {
                submit_ok: true,
                script: Mutex::new(script),
                polls: AtomicU32::new(0),
            }
        }

        fn failing_submit() -> Self {
            Self {
                submit_ok: false,
                script: Mutex::new(Vec::new()),
                polls: AtomicU32::new(0),
            }
        }

        fn poll_count(&self) -> u32 {
            self.polls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl DetectionBackend for ScriptedBackend {
        async fn submit(&self, _image: Vec<u8>) -> Result<String> {
            if self.submit_ok {
                Ok("job-1".to_string())
            } else {
                Err(Error::Detection("submit refused".to_string()))
            }
        }

        async fn poll(&self, _job_id: &str) -> Result<PollStatus> {
            self.polls.fetch_add(1, Ordering::SeqCst);
            let mut script = self.script.lock().unwrap();
            if script.is_empty() {
                Ok(PollStatus::Pending)
            } else {
                Ok(script.remove(0))
            }
        }
    }

    fn fast_client(backend: Arc<ScriptedBackend>, max_polls: u32) -> DetectionClient {
        DetectionClient::new(backend).with_poll_policy(Duration::from_millis(1), max_polls)
    }

    fn two_tags() -> Vec<DetectionTag> {
        vec![
            DetectionTag {
                label: "cone".to_string(),
                confidence: 0.91,
            },
            DetectionTag {
                label: "debris".to_string(),
                confidence: 0.47,
            },
        ]
    }

    #[tokio::test]
    async fn test_pending_then_complete() {
        let backend = Arc::new(ScriptedBackend::new(vec![
            PollStatus::Pending,
            PollStatus::Pending,
            PollStatus::Pending,
            PollStatus::Complete(two_tags()),
        ]));
        let client = fast_client(backend.clone(), 10);

        let result = client.detect(vec![1, 2, 3]).await;
        assert_eq!(result.status, DetectionStatus::Completed);
        assert_eq!(result.tags, two_tags());
        assert_eq!(backend.poll_count(), 4);
    }

    #[tokio::test]
    async fn test_never_completes_stops_at_budget() {
        let backend = Arc::new(ScriptedBackend::new(Vec::new()));
        let client = fast_client(backend.clone(), 10);

        let result = client.detect(vec![0]).await;
        assert_eq!(result.status, DetectionStatus::TimedOut);
        assert!(result.tags.is_empty());
        assert!(result.is_degraded());
        assert_eq!(backend.poll_count(), 10);
    }

    #[tokio::test]
    async fn test_terminal_failure_stops_polling() {
        let backend = Arc::new(ScriptedBackend::new(vec![
            PollStatus::Pending,
            PollStatus::Failed("model crashed".to_string()),
        ]));
        let client = fast_client(backend.clone(), 10);

        let result = client.detect(vec![0]).await;
        assert_eq!(result.status, DetectionStatus::Failed);
        assert!(result.tags.is_empty());
        assert_eq!(backend.poll_count(), 2);
    }

    #[tokio::test]
    async fn test_submit_failure_never_polls() {
        let backend = Arc::new(ScriptedBackend::failing_submit());
        let client = fast_client(backend.clone(), 10);

        let result = client.detect(vec![0]).await;
        assert_eq!(result.status, DetectionStatus::Failed);
        assert_eq!(backend.poll_count(), 0);
    }

    #[tokio::test]
    async fn test_complete_with_zero_detections_is_not_degraded() {
        let backend = Arc::new(ScriptedBackend::new(vec![PollStatus::Complete(Vec::new())]));
        let client = fast_client(backend, 10);

        let result = client.detect(vec![0]).await;
        assert_eq!(result.status, DetectionStatus::Completed);
        assert!(!result.is_degraded());
    }

    #[test]
    fn test_decode_label_key_variants() {
        for key in ["label", "class", "name"] {
            let body = json!({ "detections": [{ key: "cone", "confidence": 0.8 }] });
            let tags = decode_tags(&body);
            assert_eq!(tags.len(), 1, "key {key}");
            assert_eq!(tags[0].label, "cone");
        }
    }

    #[test]
    fn test_decode_confidence_key_variants() {
        for key in ["confidence", "score", "probability"] {
            let body = json!({ "detections": [{ "label": "cone", key: 0.8 }] });
            let tags = decode_tags(&body);
            assert_eq!(tags[0].confidence, 0.8, "key {key}");
        }
    }

    #[test]
    fn test_decode_list_key_variants_and_bare_array() {
        for key in ["detections", "predictions", "results", "data"] {
            let body = json!({ key: [{ "label": "cone" }] });
            assert_eq!(decode_tags(&body).len(), 1, "key {key}");
        }
        let bare = json!([{ "label": "cone", "score": 0.5 }]);
        assert_eq!(decode_tags(&bare).len(), 1);
    }

    #[test]
    fn test_decode_confidence_clamped_and_defaulted() {
        let body = json!({ "detections": [
            { "label": "a", "confidence": 1.7 },
            { "label": "b", "confidence": -0.3 },
            { "label": "c" }
        ]});
        let tags = decode_tags(&body);
        assert_eq!(tags[0].confidence, 1.0);
        assert_eq!(tags[1].confidence, 0.0);
        assert_eq!(tags[2].confidence, 0.0);
    }

    #[test]
    fn test_decode_unrecognized_shape_is_empty() {
        assert!(decode_tags(&json!({ "weird": true })).is_empty());
        assert!(decode_tags(&json!("text")).is_empty());
        assert!(decode_tags(&Value::Null).is_empty());
    }

    #[test]
    fn test_decode_items_without_label_are_skipped() {
        let body = json!({ "detections": [{ "confidence": 0.9 }, { "label": "cone" }] });
        assert_eq!(decode_tags(&body).len(), 1);
    }

    #[test]
    fn test_poll_response_status_variants() {
        assert_eq!(
            decode_poll_response(&json!({ "status": "pending" })),
            PollStatus::Pending
        );
        assert_eq!(
            decode_poll_response(&json!({ "status": "processing" })),
            PollStatus::Pending
        );
        assert!(matches!(
            decode_poll_response(&json!({ "status": "failed", "error": "oom" })),
            PollStatus::Failed(reason) if reason == "oom"
        ));
        assert_eq!(
            decode_poll_response(&json!({
                "status": "complete",
                "detections": [{ "label": "cone" }]
            })),
            PollStatus::Complete(vec![DetectionTag {
                label: "cone".to_string(),
                confidence: 0.0
            }])
        );
    }

    #[test]
    fn test_poll_response_without_status_is_complete() {
        let body = json!({ "results": [{ "name": "tree", "probability": 0.6 }] });
        match decode_poll_response(&body) {
            PollStatus::Complete(tags) => {
                assert_eq!(tags[0].label, "tree");
                assert_eq!(tags[0].confidence, 0.6);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_poll_response_bare_error_is_failed() {
        assert!(matches!(
            decode_poll_response(&json!({ "error": "bad image" })),
            PollStatus::Failed(reason) if reason == "bad image"
        ));
    }
}
