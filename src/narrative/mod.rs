//! NarrativeGenerator - Human-Readable Condition Summaries
//!
//! ## Responsibilities
//!
//! - Turn a tag summary plus score/spike flag into 2-3 sentences of text
//! - Surface failures to the caller; the pipeline substitutes the fixed
//!   placeholder so score delivery never waits on narrative generation

use crate::detection_client::DetectionTag;
use crate::error::{Error, Result};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::time::Duration;

/// Non-empty placeholder used whenever narrative generation fails
pub const FALLBACK_NARRATIVE: &str = "AI analysis unavailable.";

/// Capability of describing one evaluation's conditions
#[async_trait]
pub trait NarrativeGenerator: Send + Sync {
    async fn describe(&self, tags: &[DetectionTag], is_spike: bool, score: f64) -> Result<String>;
}

/// Chat-completions backed narrative generator
pub struct LlmNarrativeGenerator {
    client: reqwest::Client,
    url: String,
    token: Option<String>,
    model: String,
}

impl LlmNarrativeGenerator {
    /// Create a new generator against an OpenAI-style chat endpoint
    pub fn new(url: String, token: Option<String>, model: String) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(20))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            url,
            token,
            model,
        }
    }
}

#[async_trait]
impl NarrativeGenerator for LlmNarrativeGenerator {
    async fn describe(&self, tags: &[DetectionTag], is_spike: bool, score: f64) -> Result<String> {
        let prompt = build_prompt(&tag_summary(tags), is_spike, score);

        let body = json!({
            "messages": [{ "role": "user", "content": prompt }],
            "model": self.model,
            "max_tokens": 150,
        });

        let mut req = self.client.post(&self.url).json(&body);
        if let Some(token) = &self.token {
            req = req.bearer_auth(token);
        }

        let resp = req.send().await?;
        if !resp.status().is_success() {
            return Err(Error::Narrative(format!(
                "completion failed: {}",
                resp.status()
            )));
        }

        let payload: Value = resp.json().await?;
        let content = payload["choices"][0]["message"]["content"]
            .as_str()
            .map(str::trim)
            .unwrap_or_default();

        if content.is_empty() {
            return Err(Error::Narrative("empty completion".to_string()));
        }
        Ok(content.to_string())
    }
}

/// "label (0.87), label (0.42)" or the no-hazard placeholder
fn tag_summary(tags: &[DetectionTag]) -> String {
    if tags.is_empty() {
        return "No specific hazards".to_string();
    }
    tags.iter()
        .map(|t| format!("{} ({:.2})", t.label, t.confidence))
        .collect::<Vec<_>>()
        .join(", ")
}

fn build_prompt(tag_summary: &str, is_spike: bool, score: f64) -> String {
    if is_spike {
        format!(
            "A significant spike in traffic hazards detected. Tags: {tag_summary}. \
             Score: {score:.2}. Identify the cause and impact concisely (2-3 sentences)."
        )
    } else {
        format!(
            "Factual summary of traffic conditions. Tags: {tag_summary}. \
             Score: {score:.2}. Describe the situation in 2-3 sentences."
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tag_summary_formats_confidence() {
        let tags = vec![
            DetectionTag {
                label: "cone".to_string(),
                confidence: 0.875,
            },
            DetectionTag {
                label: "debris".to_string(),
                confidence: 0.4,
            },
        ];
        assert_eq!(tag_summary(&tags), "cone (0.88), debris (0.40)");
    }

    #[test]
    fn test_tag_summary_empty() {
        assert_eq!(tag_summary(&[]), "No specific hazards");
    }

    #[test]
    fn test_prompt_wording_follows_spike_flag() {
        let spike = build_prompt("cone (0.90)", true, 42.0);
        assert!(spike.contains("spike"));
        assert!(spike.contains("42.00"));

        let routine = build_prompt("cone (0.90)", false, 3.5);
        assert!(routine.contains("Factual summary"));
        assert!(!routine.contains("spike"));
    }
}
