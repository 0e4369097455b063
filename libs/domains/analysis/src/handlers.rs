//! HTTP surface: registration, analysis trigger, results, summaries and health

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use crate::dispatcher::AnalysisDispatcher;
use crate::error::{AnalysisError, AnalysisResult};
use crate::inference::InferenceApi;
use crate::models::{AnalysisRecord, Document, NewDocument, ProcessingStats, SummaryResult};
use crate::repository::{BlobStore, DocumentRepository, EmbeddingRepository, ResultStore};
use crate::text::extract_text;

#[derive(Clone)]
pub struct AppState {
    pub dispatcher: AnalysisDispatcher,
    pub documents: Arc<dyn DocumentRepository>,
    pub results: Arc<dyn ResultStore>,
    pub embeddings: Arc<dyn EmbeddingRepository>,
    pub blobs: Arc<dyn BlobStore>,
    pub inference: Arc<dyn InferenceApi>,
}

/// Body of a 202 returned by the trigger endpoint
#[derive(Debug, Serialize)]
pub struct AnalysisAccepted {
    pub document_id: Uuid,
    pub status: &'static str,
}

/// Processing state of a document together with its stored analysis
#[derive(Debug, Serialize)]
pub struct DocumentAnalysisView {
    pub document: Document,
    pub analysis: Option<AnalysisRecord>,
    pub has_embedding: bool,
}

fn parse_id(id: &str) -> AnalysisResult<Uuid> {
    Uuid::parse_str(id).map_err(|_| AnalysisError::Validation("Invalid document ID".to_string()))
}

/// Register an uploaded file so it can be analyzed
pub async fn register_document(
    State(state): State<AppState>,
    Json(input): Json<NewDocument>,
) -> AnalysisResult<impl IntoResponse> {
    if input.file_name.trim().is_empty() || input.file_path.trim().is_empty() {
        return Err(AnalysisError::Validation(
            "file_name and file_path are required".to_string(),
        ));
    }

    let document = state.documents.create(input).await?;
    Ok((StatusCode::CREATED, Json(document)))
}

/// Start analysis of a document in the background
pub async fn trigger_analysis(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AnalysisResult<impl IntoResponse> {
    let document_id = parse_id(&id)?;

    let document = state
        .documents
        .get_by_id(document_id)
        .await?
        .ok_or(AnalysisError::NotFound(document_id))?;
    if !document.processing_status.is_claimable() {
        return Err(AnalysisError::AlreadyProcessing(document_id));
    }

    // the run claims the document itself; the handle is not needed here
    drop(state.dispatcher.submit_analysis(document_id));
    info!(document_id = %document_id, "Analysis submitted");

    Ok((
        StatusCode::ACCEPTED,
        Json(AnalysisAccepted {
            document_id,
            status: "accepted",
        }),
    ))
}

pub async fn get_analysis(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AnalysisResult<Json<DocumentAnalysisView>> {
    let document_id = parse_id(&id)?;

    let document = state
        .documents
        .get_by_id(document_id)
        .await?
        .ok_or(AnalysisError::NotFound(document_id))?;
    let analysis = state.results.get_by_document(document_id).await?;
    let has_embedding = state.embeddings.get_by_document(document_id).await?.is_some();

    Ok(Json(DocumentAnalysisView {
        document,
        analysis,
        has_embedding,
    }))
}

/// Summarize a text upload and return the summary without storing it
pub async fn summarize_document(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AnalysisResult<Json<SummaryResult>> {
    let document_id = parse_id(&id)?;

    let document = state
        .documents
        .get_by_id(document_id)
        .await?
        .ok_or(AnalysisError::NotFound(document_id))?;
    let bytes = state.blobs.read(&document.file_path).await?;
    let text = extract_text(&document.content_type, bytes)?;

    let summary = state.inference.summarize(&text).await?;
    info!(
        document_id = %document_id,
        text_len = text.len(),
        summary_len = summary.summary.len(),
        "Generated summary"
    );
    Ok(Json(summary))
}

pub async fn get_stats(State(state): State<AppState>) -> AnalysisResult<Json<ProcessingStats>> {
    Ok(Json(state.documents.stats().await?))
}

pub async fn health() -> impl IntoResponse {
    (StatusCode::OK, Json(json!({ "status": "healthy" })))
}

/// 200 when the inference service reports healthy, 503 otherwise
pub async fn inference_health(State(state): State<AppState>) -> impl IntoResponse {
    if state.inference.healthy().await {
        (StatusCode::OK, Json(json!({ "status": "healthy" })))
    } else {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "status": "unhealthy" })),
        )
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/health/inference", get(inference_health))
        .route("/stats", get(get_stats))
        .route("/documents", post(register_document))
        .route(
            "/documents/{id}/analysis",
            get(get_analysis).post(trigger_analysis),
        )
        .route("/documents/{id}/summary", post(summarize_document))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::SignalBus;
    use crate::inference::{InferenceError, MockInferenceApi};
    use crate::memory::{
        InMemoryBlobStore, InMemoryDocumentRepository, InMemoryEmbeddingRepository,
        InMemoryResultStore,
    };
    use crate::models::{AnalysisResponse, ProcessingStatus, Risk, RiskLevel};
    use crate::orchestrator::AnalysisOrchestrator;
    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use serde_json::Value;
    use std::time::Duration;
    use tower::ServiceExt;

    struct TestApp {
        router: Router,
        documents: InMemoryDocumentRepository,
        blobs: InMemoryBlobStore,
    }

    fn app(inference: MockInferenceApi) -> TestApp {
        let documents = InMemoryDocumentRepository::new();
        let results = InMemoryResultStore::new(documents.clone());
        let blobs = InMemoryBlobStore::new();
        let inference: Arc<dyn InferenceApi> = Arc::new(inference);

        let orchestrator = AnalysisOrchestrator::new(
            Arc::new(documents.clone()),
            Arc::new(results.clone()),
            Arc::new(blobs.clone()),
            Arc::clone(&inference),
            SignalBus::new(),
        );
        let state = AppState {
            dispatcher: AnalysisDispatcher::new(Arc::new(orchestrator), 2),
            documents: Arc::new(documents.clone()),
            results: Arc::new(results),
            embeddings: Arc::new(InMemoryEmbeddingRepository::new()),
            blobs: Arc::new(blobs.clone()),
            inference,
        };

        TestApp {
            router: router(state),
            documents,
            blobs,
        }
    }

    async fn json_body(response: axum::response::Response) -> Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn request(method: &str, uri: &str) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::empty())
            .unwrap()
    }

    async fn register(test: &TestApp) -> Uuid {
        test.blobs.put("docs/msa.pdf", b"%PDF".to_vec()).await;
        let response = test
            .router
            .clone()
            .oneshot(post_json(
                "/documents",
                json!({
                    "file_name": "msa.pdf",
                    "file_path": "docs/msa.pdf",
                    "file_size": 4,
                    "content_type": "application/pdf"
                }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let body = json_body(response).await;
        assert_eq!(body["processing_status"], "PENDING");
        body["id"].as_str().unwrap().parse().unwrap()
    }

    async fn wait_for_status(documents: &InMemoryDocumentRepository, id: Uuid, status: ProcessingStatus) {
        tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                let doc = documents.get_by_id(id).await.unwrap().unwrap();
                if doc.processing_status == status {
                    break;
                }
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn test_trigger_returns_202_and_completes_in_background() {
        let mut inference = MockInferenceApi::new();
        inference.expect_analyze().times(1).returning(|_| {
            Ok(AnalysisResponse {
                summary: Some("Master services agreement".to_string()),
                risks: vec![Risk {
                    level: Some("HIGH".to_string()),
                    ..Default::default()
                }],
                ..Default::default()
            })
        });
        let test = app(inference);
        let id = register(&test).await;

        let response = test
            .router
            .clone()
            .oneshot(request("POST", &format!("/documents/{id}/analysis")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::ACCEPTED);
        assert_eq!(json_body(response).await["status"], "accepted");

        wait_for_status(&test.documents, id, ProcessingStatus::Completed).await;

        let response = test
            .router
            .clone()
            .oneshot(request("GET", &format!("/documents/{id}/analysis")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let view = json_body(response).await;
        assert_eq!(view["document"]["summary"], "Master services agreement");
        assert_eq!(view["document"]["risk_level"], json!(RiskLevel::High));
        assert_eq!(view["analysis"]["risk_count"], 1);
        assert_eq!(view["has_embedding"], false);
    }

    #[tokio::test]
    async fn test_trigger_unknown_document_is_404() {
        let test = app(MockInferenceApi::new());

        let response = test
            .router
            .oneshot(request(
                "POST",
                &format!("/documents/{}/analysis", Uuid::now_v7()),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(json_body(response).await["error"], "not_found");
    }

    #[tokio::test]
    async fn test_trigger_processing_document_is_409() {
        let test = app(MockInferenceApi::new());
        let id = register(&test).await;
        test.documents.try_claim(id).await.unwrap();

        let response = test
            .router
            .oneshot(request("POST", &format!("/documents/{id}/analysis")))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn test_invalid_id_is_400() {
        let test = app(MockInferenceApi::new());

        let response = test
            .router
            .oneshot(request("GET", "/documents/not-a-uuid/analysis"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_register_rejects_empty_path() {
        let test = app(MockInferenceApi::new());

        let response = test
            .router
            .oneshot(post_json(
                "/documents",
                json!({
                    "file_name": "a.pdf",
                    "file_path": " ",
                    "file_size": 1,
                    "content_type": "application/pdf"
                }),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_stats_counts_statuses() {
        let test = app(MockInferenceApi::new());
        register(&test).await;
        let claimed = register(&test).await;
        test.documents.try_claim(claimed).await.unwrap();

        let response = test.router.oneshot(request("GET", "/stats")).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let stats = json_body(response).await;
        assert_eq!(stats["pending"], 1);
        assert_eq!(stats["processing"], 1);
        assert_eq!(stats["completed"], 0);
    }

    #[tokio::test]
    async fn test_inference_health_reflects_upstream() {
        let mut inference = MockInferenceApi::new();
        inference.expect_healthy().times(1).returning(|| false);
        let test = app(inference);

        let response = test
            .router
            .clone()
            .oneshot(request("GET", "/health/inference"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

        let response = test.router.oneshot(request("GET", "/health")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    async fn upload(test: &TestApp, name: &str, content_type: &str, bytes: &[u8]) -> Uuid {
        let path = format!("docs/{name}");
        test.blobs.put(path.clone(), bytes.to_vec()).await;
        test.documents
            .create(NewDocument {
                file_name: name.to_string(),
                file_path: path,
                file_size: bytes.len() as i64,
                content_type: content_type.to_string(),
            })
            .await
            .unwrap()
            .id
    }

    #[tokio::test]
    async fn test_summary_of_text_upload() {
        let mut inference = MockInferenceApi::new();
        inference
            .expect_summarize()
            .withf(|text| text == "Mutual NDA between\nAcme and Globex.")
            .times(1)
            .returning(|_| {
                Ok(SummaryResult {
                    summary: "Two-way NDA".to_string(),
                    original_length: Some(35),
                    summary_length: Some(11),
                    compression_ratio: Some(0.31),
                })
            });
        let test = app(inference);
        let id = upload(
            &test,
            "nda.txt",
            "text/plain; charset=utf-8",
            b"CONFIDENTIAL\nMutual NDA   between\nAcme and Globex.\nPage 1 of 1",
        )
        .await;

        let response = test
            .router
            .clone()
            .oneshot(request("POST", &format!("/documents/{id}/summary")))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["summary"], "Two-way NDA");
        assert_eq!(body["summary_length"], 11);

        // nothing is persisted by a synchronous summary
        let doc = test.documents.get_by_id(id).await.unwrap().unwrap();
        assert_eq!(doc.processing_status, ProcessingStatus::Pending);
        assert!(doc.summary.is_none());
    }

    #[tokio::test]
    async fn test_summary_rejects_binary_and_invalid_text() {
        let mut inference = MockInferenceApi::new();
        inference.expect_summarize().never();
        let test = app(inference);
        let pdf = upload(&test, "msa.pdf", "application/pdf", b"%PDF-1.7").await;
        let garbled = upload(&test, "notes.txt", "text/plain", &[0xc3, 0x28, 0xff]).await;

        for id in [pdf, garbled] {
            let response = test
                .router
                .clone()
                .oneshot(request("POST", &format!("/documents/{id}/summary")))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::BAD_REQUEST);
            assert_eq!(json_body(response).await["error"], "validation");
        }
    }

    #[tokio::test]
    async fn test_summary_unknown_document_is_404() {
        let test = app(MockInferenceApi::new());

        let response = test
            .router
            .oneshot(request("POST", &format!("/documents/{}/summary", Uuid::now_v7())))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_summary_upstream_failure_is_502() {
        let mut inference = MockInferenceApi::new();
        inference.expect_summarize().times(1).returning(|_| {
            Err(InferenceError::Status {
                status: 503,
                body: "model loading".to_string(),
            })
        });
        let test = app(inference);
        let id = upload(&test, "memo.md", "text/markdown", b"# Memo\nTerm ends in May.").await;

        let response = test
            .router
            .oneshot(request("POST", &format!("/documents/{id}/summary")))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    }
}
