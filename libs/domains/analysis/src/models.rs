use chrono::{DateTime, Utc};
use sea_orm::{DeriveActiveEnum, EnumIter};
use serde::{Deserialize, Deserializer, Serialize};
use strum::{Display, EnumString};
use uuid::Uuid;

/// Width of every stored embedding vector
pub const EMBEDDING_DIMENSION: usize = 768;

/// Longest `processing_error` kept on a document, in characters
pub const MAX_ERROR_LENGTH: usize = 500;

/// Document type hint sent with every analysis request
pub const DEFAULT_DOCUMENT_TYPE: &str = "general";

/// Lifecycle of a document through the analysis pipeline
///
/// ```text
/// PENDING ──► PROCESSING ──► COMPLETED
///    ▲            │
///    │            ▼
///    └──────── FAILED   (re-submission claims FAILED again)
/// ```
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    Default,
    DeriveActiveEnum,
    EnumIter,
)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE")]
pub enum ProcessingStatus {
    #[default]
    #[sea_orm(string_value = "PENDING")]
    Pending,
    #[sea_orm(string_value = "PROCESSING")]
    Processing,
    #[sea_orm(string_value = "COMPLETED")]
    Completed,
    #[sea_orm(string_value = "FAILED")]
    Failed,
}

impl ProcessingStatus {
    /// States from which a new analysis run may claim the document
    pub const CLAIMABLE: [ProcessingStatus; 2] = [ProcessingStatus::Pending, ProcessingStatus::Failed];

    pub fn is_claimable(self) -> bool {
        Self::CLAIMABLE.contains(&self)
    }
}

/// Overall risk of a document, derived from its extracted risks
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    DeriveActiveEnum,
    EnumIter,
)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE")]
pub enum RiskLevel {
    #[sea_orm(string_value = "LOW")]
    Low,
    #[sea_orm(string_value = "MEDIUM")]
    Medium,
    #[sea_orm(string_value = "HIGH")]
    High,
}

impl RiskLevel {
    /// HIGH if any risk is "high", else MEDIUM if any is "medium", else LOW.
    ///
    /// Levels are trimmed and compared case-insensitively, so " HIGH " counts
    /// as high. Anything else counts as neither.
    pub fn from_risks(risks: &[Risk]) -> Self {
        risks
            .iter()
            .filter_map(|risk| risk.level.as_deref())
            .filter_map(|level| match level.trim().to_ascii_lowercase().as_str() {
                "high" => Some(RiskLevel::High),
                "medium" => Some(RiskLevel::Medium),
                _ => None,
            })
            .max()
            .unwrap_or(RiskLevel::Low)
    }
}

/// A document tracked by the pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: Uuid,
    pub file_name: String,
    /// Blob storage locator of the original upload
    pub file_path: String,
    pub file_size: i64,
    pub content_type: String,
    pub processing_status: ProcessingStatus,
    pub summary: Option<String>,
    pub summary_generated_at: Option<DateTime<Utc>>,
    pub analysis_confidence: Option<f64>,
    pub risk_level: Option<RiskLevel>,
    pub processing_error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Document {
    pub fn reference(&self) -> DocumentRef {
        DocumentRef {
            id: self.id,
            file_name: self.file_name.clone(),
            summary: self.summary.clone(),
        }
    }
}

/// Registration of an uploaded document
#[derive(Debug, Clone, Deserialize)]
pub struct NewDocument {
    pub file_name: String,
    pub file_path: String,
    #[serde(default)]
    pub file_size: i64,
    pub content_type: String,
}

/// Fields written to a document when its analysis completes
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentCompletion {
    pub summary: Option<String>,
    pub summary_generated_at: DateTime<Utc>,
    pub analysis_confidence: Option<f64>,
    pub risk_level: RiskLevel,
}

impl Document {
    /// Apply a completion in place; used by the in-memory store and tests
    pub fn complete(&mut self, completion: &DocumentCompletion) {
        self.summary = completion.summary.clone();
        self.summary_generated_at = Some(completion.summary_generated_at);
        self.analysis_confidence = completion.analysis_confidence;
        self.risk_level = Some(completion.risk_level);
        self.processing_status = ProcessingStatus::Completed;
        self.processing_error = None;
        self.updated_at = Utc::now();
    }

    /// Apply a failure in place; the message is cut to [`MAX_ERROR_LENGTH`]
    pub fn fail(&mut self, message: &str) {
        self.processing_status = ProcessingStatus::Failed;
        self.processing_error = Some(truncate_chars(message, MAX_ERROR_LENGTH));
        self.updated_at = Utc::now();
    }
}

/// Lightweight document reference carried by completion signals
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentRef {
    pub id: Uuid,
    pub file_name: String,
    pub summary: Option<String>,
}

/// Persisted outcome of one successful analysis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisRecord {
    pub id: Uuid,
    pub document_id: Uuid,
    pub summary: Option<String>,
    pub confidence_score: Option<f64>,
    pub risk_count: i32,
    pub clause_count: i32,
    pub key_term_count: i32,
    pub action_item_count: i32,
    pub financial_item_count: i32,
    pub risks_json: Option<String>,
    pub clauses_json: Option<String>,
    pub key_terms_json: Option<String>,
    pub action_items_json: Option<String>,
    pub financial_items_json: Option<String>,
    pub recommendations_json: Option<String>,
    pub analyzed_at: DateTime<Utc>,
}

/// Vector representation of a document for semantic search
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Embedding {
    pub id: Uuid,
    pub document_id: Uuid,
    pub vector: Vec<f32>,
    pub created_at: DateTime<Utc>,
}

/// Document counts per processing status
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessingStats {
    pub pending: u64,
    pub processing: u64,
    pub completed: u64,
    pub failed: u64,
}

impl ProcessingStats {
    pub fn record(&mut self, status: ProcessingStatus, count: u64) {
        match status {
            ProcessingStatus::Pending => self.pending += count,
            ProcessingStatus::Processing => self.processing += count,
            ProcessingStatus::Completed => self.completed += count,
            ProcessingStatus::Failed => self.failed += count,
        }
    }

    pub fn total(&self) -> u64 {
        self.pending + self.processing + self.completed + self.failed
    }
}

/// Analysis payload returned by the inference service.
///
/// Every list is optional on the wire; absent or `null` lists become empty.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResponse {
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub risks: Vec<Risk>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub clauses: Vec<Clause>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub key_terms: Vec<KeyTerm>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub action_items: Vec<ActionItem>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub financial_impact: Vec<FinancialItem>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub recommendations: Vec<String>,
    #[serde(
        default,
        alias = "compliance_item",
        deserialize_with = "null_as_default"
    )]
    pub compliance_items: Vec<ComplianceItem>,
    #[serde(default)]
    pub confidence_score: Option<f64>,
}

impl AnalysisResponse {
    pub fn risk_level(&self) -> RiskLevel {
        RiskLevel::from_risks(&self.risks)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Risk {
    pub level: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub confidence: Option<f64>,
    pub category: Option<String>,
    pub severity_score: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Clause {
    #[serde(rename = "type")]
    pub clause_type: Option<String>,
    pub title: Option<String>,
    pub content: Option<String>,
    pub significance: Option<String>,
    pub location: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeyTerm {
    pub term: Option<String>,
    pub definition: Option<String>,
    pub category: Option<String>,
    pub context: Option<String>,
    pub importance: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ActionItem {
    #[serde(deserialize_with = "string_or_number")]
    pub id: Option<String>,
    pub task: Option<String>,
    pub deadline: Option<String>,
    pub priority: Option<String>,
    pub status: Option<String>,
    pub description: Option<String>,
    pub assigned_to: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FinancialItem {
    #[serde(rename = "type")]
    pub item_type: Option<String>,
    pub description: Option<String>,
    /// Kept as text; models emit "$1,200" as often as 1200
    #[serde(deserialize_with = "string_or_number")]
    pub amount: Option<String>,
    pub frequency: Option<String>,
    pub due_date: Option<String>,
    pub currency: Option<String>,
    pub is_recurring: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ComplianceItem {
    pub requirement: Option<String>,
    pub status: Option<String>,
    pub deadline: Option<String>,
    pub responsible_party: Option<String>,
    pub consequences: Option<String>,
}

/// Result of a plain-text summarization
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryResult {
    pub summary: String,
    #[serde(default)]
    pub original_length: Option<u64>,
    #[serde(default)]
    pub summary_length: Option<u64>,
    #[serde(default)]
    pub compression_ratio: Option<f64>,
}

/// Cut `value` to at most `max_chars` characters without splitting a char
pub fn truncate_chars(value: &str, max_chars: usize) -> String {
    match value.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => value[..byte_idx].to_string(),
        None => value.to_string(),
    }
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<serde_json::Value>::deserialize(deserializer)? {
        None | Some(serde_json::Value::Null) => None,
        Some(serde_json::Value::String(s)) => Some(s),
        Some(other) => Some(other.to_string()),
    })
}
