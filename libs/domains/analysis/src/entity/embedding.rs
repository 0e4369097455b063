use crate::models::Embedding;
use sea_orm::ActiveValue::Set;
use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "document_embeddings")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub document_id: Uuid,
    /// `real[]`, constrained to 768 elements by the migration
    pub embedding: Vec<f32>,
    pub created_at: DateTimeWithTimeZone,
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

impl From<Model> for Embedding {
    fn from(model: Model) -> Self {
        Self {
            id: model.id,
            document_id: model.document_id,
            vector: model.embedding,
            created_at: model.created_at.into(),
        }
    }
}

impl From<Embedding> for ActiveModel {
    fn from(embedding: Embedding) -> Self {
        ActiveModel {
            id: Set(embedding.id),
            document_id: Set(embedding.document_id),
            embedding: Set(embedding.vector),
            created_at: Set(embedding.created_at.into()),
        }
    }
}
