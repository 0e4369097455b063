use crate::models::{NewDocument, ProcessingStatus, RiskLevel};
use sea_orm::ActiveValue::Set;
use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "documents")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub file_name: String,
    pub file_path: String,
    pub file_size: i64,
    pub content_type: String,
    pub processing_status: ProcessingStatus,
    #[sea_orm(column_type = "Text", nullable)]
    pub summary: Option<String>,
    pub summary_generated_at: Option<DateTimeWithTimeZone>,
    #[sea_orm(column_type = "Double", nullable)]
    pub analysis_confidence: Option<f64>,
    pub risk_level: Option<RiskLevel>,
    pub processing_error: Option<String>,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_one = "super::analysis::Entity")]
    Analysis,
    #[sea_orm(has_one = "super::embedding::Entity")]
    Embedding,
}

impl Related<super::analysis::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Analysis.def()
    }
}

impl Related<super::embedding::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Embedding.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for crate::models::Document {
    fn from(model: Model) -> Self {
        Self {
            id: model.id,
            file_name: model.file_name,
            file_path: model.file_path,
            file_size: model.file_size,
            content_type: model.content_type,
            processing_status: model.processing_status,
            summary: model.summary,
            summary_generated_at: model.summary_generated_at.map(Into::into),
            analysis_confidence: model.analysis_confidence,
            risk_level: model.risk_level,
            processing_error: model.processing_error,
            created_at: model.created_at.into(),
            updated_at: model.updated_at.into(),
        }
    }
}

impl From<NewDocument> for ActiveModel {
    fn from(input: NewDocument) -> Self {
        let now = chrono::Utc::now();
        ActiveModel {
            id: Set(Uuid::now_v7()),
            file_name: Set(input.file_name),
            file_path: Set(input.file_path),
            file_size: Set(input.file_size),
            content_type: Set(input.content_type),
            processing_status: Set(ProcessingStatus::Pending),
            summary: Set(None),
            summary_generated_at: Set(None),
            analysis_confidence: Set(None),
            risk_level: Set(None),
            processing_error: Set(None),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        }
    }
}
