use sea_orm_migration::{prelude::*, schema::*};

use crate::m20251020_000001_create_documents::Documents;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(DocumentAnalysis::Table)
                    .if_not_exists()
                    .col(pk_uuid(DocumentAnalysis::Id))
                    .col(uuid_uniq(DocumentAnalysis::DocumentId))
                    .col(text_null(DocumentAnalysis::Summary))
                    .col(double_null(DocumentAnalysis::ConfidenceScore))
                    .col(integer(DocumentAnalysis::RiskCount).default(0))
                    .col(integer(DocumentAnalysis::ClauseCount).default(0))
                    .col(integer(DocumentAnalysis::KeyTermCount).default(0))
                    .col(integer(DocumentAnalysis::ActionItemCount).default(0))
                    .col(integer(DocumentAnalysis::FinancialItemCount).default(0))
                    .col(text_null(DocumentAnalysis::RisksJson))
                    .col(text_null(DocumentAnalysis::ClausesJson))
                    .col(text_null(DocumentAnalysis::KeyTermsJson))
                    .col(text_null(DocumentAnalysis::ActionItemsJson))
                    .col(text_null(DocumentAnalysis::FinancialItemsJson))
                    .col(text_null(DocumentAnalysis::RecommendationsJson))
                    .col(
                        timestamp_with_time_zone(DocumentAnalysis::AnalyzedAt)
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_document_analysis_document_id")
                            .from(DocumentAnalysis::Table, DocumentAnalysis::DocumentId)
                            .to(Documents::Table, Documents::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(DocumentAnalysis::Table).to_owned())
            .await?;

        Ok(())
    }
}

#[derive(DeriveIden)]
enum DocumentAnalysis {
    Table,
    Id,
    DocumentId,
    Summary,
    ConfidenceScore,
    RiskCount,
    ClauseCount,
    KeyTermCount,
    ActionItemCount,
    FinancialItemCount,
    RisksJson,
    ClausesJson,
    KeyTermsJson,
    ActionItemsJson,
    FinancialItemsJson,
    RecommendationsJson,
    AnalyzedAt,
}
