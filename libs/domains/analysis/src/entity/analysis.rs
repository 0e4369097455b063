use crate::models::AnalysisRecord;
use sea_orm::ActiveValue::Set;
use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "document_analysis")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub document_id: Uuid,
    #[sea_orm(column_type = "Text", nullable)]
    pub summary: Option<String>,
    #[sea_orm(column_type = "Double", nullable)]
    pub confidence_score: Option<f64>,
    pub risk_count: i32,
    pub clause_count: i32,
    pub key_term_count: i32,
    pub action_item_count: i32,
    pub financial_item_count: i32,
    #[sea_orm(column_type = "Text", nullable)]
    pub risks_json: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub clauses_json: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub key_terms_json: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub action_items_json: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub financial_items_json: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub recommendations_json: Option<String>,
    pub analyzed_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::document::Entity",
        from = "Column::DocumentId",
        to = "super::document::Column::Id",
        on_delete = "Cascade"
    )]
    Document,
}

impl Related<super::document::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Document.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for AnalysisRecord {
    fn from(model: Model) -> Self {
        Self {
            id: model.id,
            document_id: model.document_id,
            summary: model.summary,
            confidence_score: model.confidence_score,
            risk_count: model.risk_count,
            clause_count: model.clause_count,
            key_term_count: model.key_term_count,
            action_item_count: model.action_item_count,
            financial_item_count: model.financial_item_count,
            risks_json: model.risks_json,
            clauses_json: model.clauses_json,
            key_terms_json: model.key_terms_json,
            action_items_json: model.action_items_json,
            financial_items_json: model.financial_items_json,
            recommendations_json: model.recommendations_json,
            analyzed_at: model.analyzed_at.into(),
        }
    }
}

impl From<AnalysisRecord> for ActiveModel {
    fn from(record: AnalysisRecord) -> Self {
        ActiveModel {
            id: Set(record.id),
            document_id: Set(record.document_id),
            summary: Set(record.summary),
            confidence_score: Set(record.confidence_score),
            risk_count: Set(record.risk_count),
            clause_count: Set(record.clause_count),
            key_term_count: Set(record.key_term_count),
            action_item_count: Set(record.action_item_count),
            financial_item_count: Set(record.financial_item_count),
            risks_json: Set(record.risks_json),
            clauses_json: Set(record.clauses_json),
            key_terms_json: Set(record.key_terms_json),
            action_items_json: Set(record.action_items_json),
            financial_items_json: Set(record.financial_items_json),
            recommendations_json: Set(record.recommendations_json),
            analyzed_at: Set(record.analyzed_at.into()),
        }
    }
}
