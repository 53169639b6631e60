// src/analysis_client.rs
//
// HTTP client for the external motion-comparison service.
//
// Sends both FrameSets (as JPEG data URLs) with their absolute
// timestamps and receives a per-phase verdict. The service is a black
// box, so its response is parsed defensively:
//
//   - `summary` and `comparison` are required, and `comparison` must name
//     at least one known phase; anything less is rejected, never coerced
//     into an empty result
//   - everything else (strengths, weaknesses, scores, recommendations)
//     is optional and defaulted later by the normalizer

use crate::comparison::Phase;
use crate::error::AnalysisServiceError;
use crate::media::FrameSet;
use crate::types::AnalysisConfig;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, error, info, warn};

// ============================================================================
// REQUEST TYPES (field names are part of the service contract)
// ============================================================================

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ComparisonRequest {
    pub reference_frames: Vec<String>,
    pub reference_timestamps: Vec<f64>,
    pub subject_frames: Vec<String>,
    pub subject_timestamps: Vec<f64>,
}

impl ComparisonRequest {
    pub fn new(reference: &FrameSet, subject: &FrameSet) -> Self {
        Self {
            reference_frames: reference.frames().iter().map(|f| f.to_data_url()).collect(),
            reference_timestamps: reference.timestamps(),
            subject_frames: subject.frames().iter().map(|f| f.to_data_url()).collect(),
            subject_timestamps: subject.timestamps(),
        }
    }
}

// ============================================================================
// RESPONSE TYPES
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawComparisonResponse {
    pub summary: String,
    #[serde(default)]
    pub overall_score_for_subject: Option<f64>,
    pub comparison: HashMap<String, RawPhaseComparison>,
    #[serde(default)]
    pub recommendations_for_subject: Option<Vec<RawRecommendation>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawPhaseComparison {
    #[serde(default)]
    pub reference: Option<RawActorAnalysis>,
    #[serde(default)]
    pub subject: Option<RawActorAnalysis>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawActorAnalysis {
    #[serde(default)]
    pub timestamp: Option<f64>,
    #[serde(default)]
    pub analysis: Option<String>,
    #[serde(default)]
    pub strengths: Option<Vec<String>>,
    #[serde(default)]
    pub weaknesses: Option<Vec<String>>,
    #[serde(default)]
    pub score: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawRecommendation {
    #[serde(default)]
    pub recommendation: Option<String>,
    #[serde(default)]
    pub drill: Option<RawDrill>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawDrill {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    /// Services send either a count or a free-text prescription
    #[serde(default)]
    pub practice_sets: Option<Value>,
}

/// Validate and decode a response body.
pub fn parse_response(body: &str) -> Result<RawComparisonResponse, AnalysisServiceError> {
    let value: Value = serde_json::from_str(body).map_err(|e| {
        AnalysisServiceError::MalformedResponse(format!("{} (body: {})", e, preview(body)))
    })?;

    let obj = value.as_object().ok_or_else(|| {
        AnalysisServiceError::MalformedResponse("response is not a JSON object".to_string())
    })?;

    match obj.get("summary") {
        None | Some(Value::Null) => return Err(AnalysisServiceError::MissingField("summary")),
        Some(Value::String(_)) => {}
        Some(_) => {
            return Err(AnalysisServiceError::MalformedResponse(
                "`summary` is not a string".to_string(),
            ))
        }
    }

    match obj.get("comparison") {
        None | Some(Value::Null) => return Err(AnalysisServiceError::MissingField("comparison")),
        Some(Value::Object(phases)) if phases.is_empty() => {
            return Err(AnalysisServiceError::MalformedResponse(
                "`comparison` contains no phases".to_string(),
            ))
        }
        Some(Value::Object(phases))
            if !phases.keys().any(|k| Phase::from_key(k).is_some()) =>
        {
            return Err(AnalysisServiceError::MalformedResponse(format!(
                "`comparison` has no known phases (got {:?})",
                phases.keys().collect::<Vec<_>>()
            )))
        }
        Some(Value::Object(_)) => {}
        Some(_) => {
            return Err(AnalysisServiceError::MalformedResponse(
                "`comparison` is not an object".to_string(),
            ))
        }
    }

    serde_json::from_value(value)
        .map_err(|e| AnalysisServiceError::MalformedResponse(e.to_string()))
}

fn preview(body: &str) -> String {
    const MAX: usize = 200;
    match body.char_indices().nth(MAX) {
        Some((idx, _)) => format!("{}…", &body[..idx]),
        None => body.to_string(),
    }
}

// ============================================================================
// CLIENT
// ============================================================================

#[async_trait]
pub trait AnalysisClient: Send + Sync {
    async fn analyze(
        &self,
        request: &ComparisonRequest,
    ) -> Result<RawComparisonResponse, AnalysisServiceError>;
}

#[async_trait]
impl<T: AnalysisClient + ?Sized> AnalysisClient for std::sync::Arc<T> {
    async fn analyze(
        &self,
        request: &ComparisonRequest,
    ) -> Result<RawComparisonResponse, AnalysisServiceError> {
        (**self).analyze(request).await
    }
}

pub struct HttpAnalysisClient {
    http_client: reqwest::Client,
    url: String,
    /// When set, every request body is written here before sending.
    save_dir: Option<PathBuf>,
}

impl HttpAnalysisClient {
    pub fn new(config: &AnalysisConfig, output_dir: &Path) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("Failed to build HTTP client")?;

        let url = format!(
            "{}/{}",
            config.server_url.trim_end_matches('/'),
            config.endpoint.trim_start_matches('/')
        );

        Ok(Self {
            http_client,
            url,
            save_dir: config.save_requests.then(|| output_dir.to_path_buf()),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    fn save_request(&self, request: &ComparisonRequest, request_id: &str) -> Result<PathBuf> {
        let dir = match &self.save_dir {
            Some(dir) => dir,
            None => anyhow::bail!("request saving is disabled"),
        };
        std::fs::create_dir_all(dir)?;
        let path = dir.join(format!(
            "request_{}_{}.json",
            chrono::Utc::now().format("%Y%m%d_%H%M%S"),
            request_id
        ));
        let json = serde_json::to_string_pretty(request)?;
        std::fs::write(&path, json).with_context(|| format!("writing {}", path.display()))?;
        Ok(path)
    }
}

#[async_trait]
impl AnalysisClient for HttpAnalysisClient {
    async fn analyze(
        &self,
        request: &ComparisonRequest,
    ) -> Result<RawComparisonResponse, AnalysisServiceError> {
        let request_id = uuid::Uuid::new_v4().to_string();

        if self.save_dir.is_some() {
            match self.save_request(request, &request_id) {
                Ok(path) => debug!("Saved request body to {}", path.display()),
                Err(e) => warn!("Could not save request body: {:#}", e),
            }
        }

        info!(
            "🌐 Sending comparison request {} ({} reference + {} subject frames) to {}",
            request_id,
            request.reference_frames.len(),
            request.subject_frames.len(),
            self.url,
        );

        let response = self
            .http_client
            .post(&self.url)
            .header("X-Request-Id", &request_id)
            .json(request)
            .send()
            .await
            .map_err(|e| {
                error!("🌐 Failed to reach analysis service: {}", e);
                AnalysisServiceError::from(e)
            })?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            warn!("🌐 Analysis service error {}: {}", status, preview(&body));
            return Err(AnalysisServiceError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let parsed = parse_response(&body).map_err(|e| {
            warn!("🌐 Rejected analysis response {}: {}", request_id, e);
            e
        })?;

        info!(
            "🌐 Analysis response {}: {} phases, overall score {:?}",
            request_id,
            parsed.comparison.len(),
            parsed.overall_score_for_subject
        );
        Ok(parsed)
    }
}
