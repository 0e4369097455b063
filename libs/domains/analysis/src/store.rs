//! Shaping of an [`AnalysisResponse`] into what gets persisted.
//!
//! Both [`crate::PgResultStore`] and [`crate::InMemoryResultStore`] build
//! their writes here so the per-field serialization rules live in one place.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::warn;
use uuid::Uuid;

use crate::models::{AnalysisRecord, AnalysisResponse, DocumentCompletion};

/// The six list fields stored as JSON text.
///
/// Each is serialized on its own; a field that fails is left `None` and the
/// rest are unaffected.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct JsonColumns {
    pub risks: Option<String>,
    pub clauses: Option<String>,
    pub key_terms: Option<String>,
    pub action_items: Option<String>,
    pub financial_items: Option<String>,
    pub recommendations: Option<String>,
}

impl JsonColumns {
    pub fn encode(response: &AnalysisResponse) -> Self {
        Self::encode_with(&JsonText, response)
    }

    /// Encode every field through `encoder`
    pub fn encode_with<E: FieldEncoder>(encoder: &E, response: &AnalysisResponse) -> Self {
        Self {
            risks: column(encoder, "risks", &response.risks),
            clauses: column(encoder, "clauses", &response.clauses),
            key_terms: column(encoder, "key_terms", &response.key_terms),
            action_items: column(encoder, "action_items", &response.action_items),
            financial_items: column(encoder, "financial_items", &response.financial_impact),
            recommendations: column(encoder, "recommendations", &response.recommendations),
        }
    }
}

/// Serializes one list field of an analysis to JSON text
pub trait FieldEncoder {
    fn encode<T: Serialize + ?Sized>(&self, field: &'static str, value: &T) -> serde_json::Result<String>;
}

/// Plain `serde_json` encoding
pub struct JsonText;

impl FieldEncoder for JsonText {
    fn encode<T: Serialize + ?Sized>(&self, _field: &'static str, value: &T) -> serde_json::Result<String> {
        serde_json::to_string(value)
    }
}

fn column<E: FieldEncoder, T: Serialize + ?Sized>(encoder: &E, field: &'static str, value: &T) -> Option<String> {
    encode_field(field, encoder.encode(field, value))
}

fn encode_field(field: &'static str, encoded: serde_json::Result<String>) -> Option<String> {
    match encoded {
        Ok(json) => Some(json),
        Err(e) => {
            warn!(field, error = %e, "Failed to serialize analysis field, storing null");
            None
        }
    }
}

/// Build the analysis record for `document_id`. Counts are list lengths.
pub fn build_record(
    document_id: Uuid,
    response: &AnalysisResponse,
    analyzed_at: DateTime<Utc>,
) -> AnalysisRecord {
    let json = JsonColumns::encode(response);

    AnalysisRecord {
        id: Uuid::now_v7(),
        document_id,
        summary: response.summary.clone(),
        confidence_score: response.confidence_score,
        risk_count: count(response.risks.len()),
        clause_count: count(response.clauses.len()),
        key_term_count: count(response.key_terms.len()),
        action_item_count: count(response.action_items.len()),
        financial_item_count: count(response.financial_impact.len()),
        risks_json: json.risks,
        clauses_json: json.clauses,
        key_terms_json: json.key_terms,
        action_items_json: json.action_items,
        financial_items_json: json.financial_items,
        recommendations_json: json.recommendations,
        analyzed_at,
    }
}

/// Fields the document receives once the analysis is stored
pub fn build_completion(response: &AnalysisResponse, at: DateTime<Utc>) -> DocumentCompletion {
    DocumentCompletion {
        summary: response.summary.clone(),
        summary_generated_at: at,
        analysis_confidence: response.confidence_score.map(|c| c.clamp(0.0, 1.0)),
        risk_level: response.risk_level(),
    }
}

fn count(len: usize) -> i32 {
    i32::try_from(len).unwrap_or(i32::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Clause, Risk, RiskLevel};
    use std::collections::HashMap;

    fn response() -> AnalysisResponse {
        AnalysisResponse {
            summary: Some("S".to_string()),
            risks: vec![
                Risk {
                    level: Some("high".to_string()),
                    ..Default::default()
                },
                Risk {
                    level: Some("low".to_string()),
                    ..Default::default()
                },
            ],
            clauses: vec![Clause::default()],
            recommendations: vec!["Renegotiate clause 4".to_string()],
            confidence_score: Some(0.9),
            ..Default::default()
        }
    }

    #[test]
    fn test_build_record_counts_and_json() {
        let at = Utc::now();
        let doc_id = Uuid::now_v7();
        let record = build_record(doc_id, &response(), at);

        assert_eq!(record.document_id, doc_id);
        assert_eq!(record.risk_count, 2);
        assert_eq!(record.clause_count, 1);
        assert_eq!(record.key_term_count, 0);
        assert_eq!(record.action_item_count, 0);
        assert_eq!(record.financial_item_count, 0);
        assert_eq!(record.analyzed_at, at);
        assert_eq!(record.key_terms_json.as_deref(), Some("[]"));
        assert_eq!(
            record.recommendations_json.as_deref(),
            Some(r#"["Renegotiate clause 4"]"#)
        );

        let risks: Vec<Risk> = serde_json::from_str(record.risks_json.as_deref().unwrap()).unwrap();
        assert_eq!(risks.len(), 2);
    }

    #[test]
    fn test_encode_field_failure_yields_none() {
        // Non-string map keys cannot be represented in JSON
        let mut bad = HashMap::new();
        bad.insert((1, 2), "x");

        assert_eq!(encode_field("risks", JsonText.encode("risks", &bad)), None);
        assert_eq!(
            encode_field("clauses", JsonText.encode("clauses", &vec![1, 2])),
            Some("[1,2]".to_string())
        );
    }

    /// Fails on one named field and encodes the rest normally
    struct FailingOn(&'static str);

    impl FieldEncoder for FailingOn {
        fn encode<T: Serialize + ?Sized>(&self, field: &'static str, value: &T) -> serde_json::Result<String> {
            if field == self.0 {
                Err(serde::ser::Error::custom("unrepresentable value"))
            } else {
                JsonText.encode(field, value)
            }
        }
    }

    #[test]
    fn test_one_failing_field_leaves_others_intact() {
        let columns = JsonColumns::encode_with(&FailingOn("clauses"), &response());

        assert!(columns.clauses.is_none());
        assert_eq!(columns, JsonColumns {
            clauses: None,
            ..JsonColumns::encode(&response())
        });
        assert!(columns.risks.is_some());
        assert_eq!(columns.recommendations.as_deref(), Some(r#"["Renegotiate clause 4"]"#));
    }

    #[test]
    fn test_build_completion() {
        let at = Utc::now();
        let completion = build_completion(&response(), at);

        assert_eq!(completion.summary.as_deref(), Some("S"));
        assert_eq!(completion.summary_generated_at, at);
        assert_eq!(completion.analysis_confidence, Some(0.9));
        assert_eq!(completion.risk_level, RiskLevel::High);
    }

    #[test]
    fn test_build_completion_clamps_confidence() {
        let mut r = response();
        r.confidence_score = Some(1.7);
        assert_eq!(build_completion(&r, Utc::now()).analysis_confidence, Some(1.0));
    }
}
