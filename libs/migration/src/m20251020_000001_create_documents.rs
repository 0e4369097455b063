use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Documents::Table)
                    .if_not_exists()
                    .col(pk_uuid(Documents::Id))
                    .col(string(Documents::FileName))
                    .col(string(Documents::FilePath))
                    .col(big_integer(Documents::FileSize).default(0))
                    .col(string_len(Documents::ContentType, 255))
                    .col(string_len(Documents::ProcessingStatus, 16).default("PENDING"))
                    .col(text_null(Documents::Summary))
                    .col(timestamp_with_time_zone_null(Documents::SummaryGeneratedAt))
                    .col(double_null(Documents::AnalysisConfidence))
                    .col(string_len_null(Documents::RiskLevel, 8))
                    .col(string_len_null(Documents::ProcessingError, 500))
                    .col(
                        timestamp_with_time_zone(Documents::CreatedAt)
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        timestamp_with_time_zone(Documents::UpdatedAt)
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        let db = manager.get_connection();

        db.execute_unprepared(
            r#"
            ALTER TABLE documents
                ADD CONSTRAINT chk_documents_processing_status
                    CHECK (processing_status IN ('PENDING', 'PROCESSING', 'COMPLETED', 'FAILED')),
                ADD CONSTRAINT chk_documents_risk_level
                    CHECK (risk_level IS NULL OR risk_level IN ('LOW', 'MEDIUM', 'HIGH')),
                ADD CONSTRAINT chk_documents_analysis_confidence
                    CHECK (analysis_confidence IS NULL OR analysis_confidence BETWEEN 0 AND 1)
            "#,
        )
        .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_documents_processing_status")
                    .table(Documents::Table)
                    .col(Documents::ProcessingStatus)
                    .to_owned(),
            )
            .await?;

        db.execute_unprepared(
            r#"
            CREATE TRIGGER documents_touch_updated_at
                BEFORE UPDATE ON documents
                FOR EACH ROW
                EXECUTE FUNCTION util.touch_updated_at()
            "#,
        )
        .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .get_connection()
            .execute_unprepared("DROP TRIGGER IF EXISTS documents_touch_updated_at ON documents")
            .await?;

        manager
            .drop_table(Table::drop().table(Documents::Table).to_owned())
            .await?;

        Ok(())
    }
}

#[derive(DeriveIden)]
pub(crate) enum Documents {
    Table,
    Id,
    FileName,
    FilePath,
    FileSize,
    ContentType,
    ProcessingStatus,
    Summary,
    SummaryGeneratedAt,
    AnalysisConfidence,
    RiskLevel,
    ProcessingError,
    CreatedAt,
    UpdatedAt,
}
