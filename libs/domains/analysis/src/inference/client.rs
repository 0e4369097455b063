use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use super::config::InferenceConfig;
use super::error::{InferenceError, InferenceResult};
use super::retry::with_fixed_retry;
use crate::models::{truncate_chars, AnalysisResponse, SummaryResult};

/// Upstream error bodies are kept for diagnostics, but only this much
const MAX_ERROR_BODY: usize = 1_000;

/// A document submitted for analysis
#[derive(Debug, Clone, PartialEq)]
pub struct AnalyzeRequest {
    pub file_name: String,
    pub content_type: String,
    /// Hint for the model, e.g. "general"
    pub document_type: String,
    pub bytes: Vec<u8>,
}

/// Operations offered by the AI inference service
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait InferenceApi: Send + Sync {
    async fn summarize(&self, text: &str) -> InferenceResult<SummaryResult>;

    async fn analyze(&self, request: AnalyzeRequest) -> InferenceResult<AnalysisResponse>;

    /// Embed `text`, or let the service pick its input when `None`
    async fn embed(&self, text: Option<String>) -> InferenceResult<Vec<f32>>;

    /// Reachability probe; never retries and never fails
    async fn healthy(&self) -> bool;
}

#[derive(Debug, Serialize)]
struct TextRequest<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct EmbedResponse {
    #[serde(default)]
    embedding: Option<Vec<Option<f32>>>,
    #[serde(default)]
    model_used: Option<String>,
}

/// HTTP client for the inference service
#[derive(Clone)]
pub struct InferenceClient {
    http: Client,
    config: InferenceConfig,
}

impl InferenceClient {
    pub fn new(config: InferenceConfig) -> InferenceResult<Self> {
        let http = Client::builder()
            .user_agent(concat!("legal-analysis/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { http, config })
    }

    pub fn config(&self) -> &InferenceConfig {
        &self.config
    }

    async fn post_summarize(&self, text: &str) -> InferenceResult<SummaryResult> {
        let response = self
            .http
            .post(self.config.url("summarize"))
            .json(&TextRequest { text })
            .send()
            .await?;

        let result: SummaryResult = read_json(response).await?;
        if result.summary.trim().is_empty() {
            return Err(InferenceError::Malformed("empty summary".to_string()));
        }
        Ok(result)
    }

    async fn post_analyze(&self, request: &AnalyzeRequest) -> InferenceResult<AnalysisResponse> {
        let file = Part::bytes(request.bytes.clone()).file_name(request.file_name.clone());
        let file = match file.mime_str(&request.content_type) {
            Ok(part) => part,
            Err(_) => {
                debug!(content_type = %request.content_type, "Unrecognised content type, sending as octet-stream");
                Part::bytes(request.bytes.clone()).file_name(request.file_name.clone())
            }
        };
        let form = Form::new()
            .part("file", file)
            .text("document_type", request.document_type.clone());

        let response = self
            .http
            .post(self.config.url("analyze"))
            .multipart(form)
            .send()
            .await?;

        let analysis: AnalysisResponse = read_json(response).await?;
        match analysis.summary.as_deref() {
            Some(summary) if !summary.trim().is_empty() => Ok(analysis),
            _ => Err(InferenceError::Malformed(
                "analysis response has no summary".to_string(),
            )),
        }
    }

    async fn post_embed(&self, text: Option<&str>) -> InferenceResult<Vec<f32>> {
        let mut request = self.http.post(self.config.url("embed"));
        if let Some(text) = text {
            request = request.json(&TextRequest { text });
        }

        let payload: EmbedResponse = read_json(request.send().await?).await?;
        let vector = validate_embedding(payload.embedding, self.config.embedding_dimension)?;

        debug!(
            model = payload.model_used.as_deref().unwrap_or("unknown"),
            dimension = vector.len(),
            head = ?&vector[..vector.len().min(5)],
            "Received embedding"
        );
        Ok(vector)
    }
}

#[async_trait]
impl InferenceApi for InferenceClient {
    #[instrument(skip(self, text), fields(text_len = text.len()))]
    async fn summarize(&self, text: &str) -> InferenceResult<SummaryResult> {
        with_fixed_retry("summarize", &self.config.summarize, || self.post_summarize(text)).await
    }

    #[instrument(
        skip(self, request),
        fields(file_name = %request.file_name, bytes = request.bytes.len())
    )]
    async fn analyze(&self, request: AnalyzeRequest) -> InferenceResult<AnalysisResponse> {
        let analysis =
            with_fixed_retry("analyze", &self.config.analyze, || self.post_analyze(&request)).await?;

        info!(
            risks = analysis.risks.len(),
            clauses = analysis.clauses.len(),
            key_terms = analysis.key_terms.len(),
            action_items = analysis.action_items.len(),
            financial_items = analysis.financial_impact.len(),
            compliance_items = analysis.compliance_items.len(),
            confidence = ?analysis.confidence_score,
            "Document analyzed"
        );
        Ok(analysis)
    }

    #[instrument(skip(self, text), fields(has_text = text.is_some()))]
    async fn embed(&self, text: Option<String>) -> InferenceResult<Vec<f32>> {
        with_fixed_retry("embed", &self.config.embed, || self.post_embed(text.as_deref())).await
    }

    async fn healthy(&self) -> bool {
        let probe = async {
            let response = self.http.get(self.config.url("health")).send().await?;
            let status = response.status();
            let body = response.text().await?;
            Ok::<_, reqwest::Error>((status, body))
        };

        match tokio::time::timeout(self.config.health_timeout, probe).await {
            Ok(Ok((status, body))) => {
                let body = body.to_ascii_lowercase();
                status.is_success() && body.contains("healthy") && !body.contains("unhealthy")
            }
            Ok(Err(e)) => {
                warn!(error = %e, "Inference health check failed");
                false
            }
            Err(_) => {
                warn!(
                    timeout_ms = self.config.health_timeout.as_millis() as u64,
                    "Inference health check timed out"
                );
                false
            }
        }
    }
}

async fn read_json<T: DeserializeOwned>(response: Response) -> InferenceResult<T> {
    let status = response.status();
    let body = response.text().await?;

    if !status.is_success() {
        return Err(InferenceError::Status {
            status: status.as_u16(),
            body: truncate_chars(&body, MAX_ERROR_BODY),
        });
    }

    Ok(serde_json::from_str(&body)?)
}

fn validate_embedding(
    embedding: Option<Vec<Option<f32>>>,
    dimension: usize,
) -> InferenceResult<Vec<f32>> {
    let values = match embedding {
        Some(values) if !values.is_empty() => values,
        _ => return Err(InferenceError::Malformed("empty embedding".to_string())),
    };

    let vector: Vec<f32> = values
        .into_iter()
        .collect::<Option<Vec<f32>>>()
        .ok_or_else(|| InferenceError::Malformed("embedding contains null values".to_string()))?;

    if vector.len() != dimension {
        return Err(InferenceError::Malformed(format!(
            "embedding has {} dimensions, expected {}",
            vector.len(),
            dimension
        )));
    }
    if vector.iter().any(|v| !v.is_finite()) {
        return Err(InferenceError::Malformed(
            "embedding contains non-finite values".to_string(),
        ));
    }

    Ok(vector)
}
