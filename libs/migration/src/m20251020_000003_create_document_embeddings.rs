use sea_orm_migration::{prelude::*, schema::*};

use crate::m20251020_000001_create_documents::Documents;

/// Width of the stored vectors; must match the embedding model
const EMBEDDING_DIMENSION: usize = 768;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(DocumentEmbeddings::Table)
                    .if_not_exists()
                    .col(pk_uuid(DocumentEmbeddings::Id))
                    .col(uuid_uniq(DocumentEmbeddings::DocumentId))
                    .col(
                        ColumnDef::new(DocumentEmbeddings::Embedding)
                            .array(ColumnType::Float)
                            .not_null(),
                    )
                    .col(
                        timestamp_with_time_zone(DocumentEmbeddings::CreatedAt)
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_document_embeddings_document_id")
                            .from(DocumentEmbeddings::Table, DocumentEmbeddings::DocumentId)
                            .to(Documents::Table, Documents::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .get_connection()
            .execute_unprepared(&format!(
                "ALTER TABLE document_embeddings \
                 ADD CONSTRAINT chk_document_embeddings_dimension \
                 CHECK (cardinality(embedding) = {EMBEDDING_DIMENSION})"
            ))
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(DocumentEmbeddings::Table).to_owned())
            .await?;

        Ok(())
    }
}

#[derive(DeriveIden)]
enum DocumentEmbeddings {
    Table,
    Id,
    DocumentId,
    Embedding,
    CreatedAt,
}
