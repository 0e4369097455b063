use async_trait::async_trait;
use chrono::Utc;
use sea_orm::ActiveValue::Set;
use sea_orm::sea_query::{Expr, OnConflict, Query};
use sea_orm::{
    ActiveEnum, ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DbErr,
    EntityTrait, IntoActiveModel, QueryFilter, QuerySelect, TransactionSession, TransactionTrait,
};
use std::str::FromStr;
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    entity::{analysis, document, embedding},
    error::{AnalysisError, AnalysisResult},
    models::{
        truncate_chars, AnalysisRecord, AnalysisResponse, Document, DocumentRef, Embedding,
        NewDocument, ProcessingStats, ProcessingStatus, MAX_ERROR_LENGTH,
    },
    repository::{DocumentRepository, EmbeddingRepository, ResultStore},
    store::{build_completion, build_record},
};

pub struct PgDocumentRepository {
    db: DatabaseConnection,
}

impl PgDocumentRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl DocumentRepository for PgDocumentRepository {
    async fn create(&self, input: NewDocument) -> AnalysisResult<Document> {
        let active_model: document::ActiveModel = input.into();
        let model = active_model.insert(&self.db).await?;

        info!(document_id = %model.id, "Registered document");
        Ok(model.into())
    }

    async fn get_by_id(&self, id: Uuid) -> AnalysisResult<Option<Document>> {
        let model = document::Entity::find_by_id(id).one(&self.db).await?;
        Ok(model.map(Into::into))
    }

    async fn try_claim(&self, id: Uuid) -> AnalysisResult<bool> {
        // single conditional UPDATE, so two racing claims cannot both win
        let result = document::Entity::update_many()
            .col_expr(
                document::Column::ProcessingStatus,
                Expr::value(ProcessingStatus::Processing.to_value()),
            )
            .col_expr(
                document::Column::ProcessingError,
                Expr::value(Option::<String>::None),
            )
            .filter(document::Column::Id.eq(id))
            .filter(
                document::Column::ProcessingStatus
                    .is_in(ProcessingStatus::CLAIMABLE.map(|s| s.to_value())),
            )
            .exec(&self.db)
            .await?;

        Ok(result.rows_affected == 1)
    }

    async fn mark_failed(&self, id: Uuid, message: &str) -> AnalysisResult<bool> {
        let Some(model) = document::Entity::find_by_id(id).one(&self.db).await? else {
            return Ok(false);
        };

        let mut active_model = model.into_active_model();
        active_model.processing_status = Set(ProcessingStatus::Failed);
        active_model.processing_error = Set(Some(truncate_chars(message, MAX_ERROR_LENGTH)));
        active_model.updated_at = Set(Utc::now().into());
        active_model.update(&self.db).await?;

        Ok(true)
    }

    async fn fail_stale(&self, message: &str) -> AnalysisResult<u64> {
        let result = document::Entity::update_many()
            .col_expr(
                document::Column::ProcessingStatus,
                Expr::value(ProcessingStatus::Failed.to_value()),
            )
            .col_expr(
                document::Column::ProcessingError,
                Expr::value(truncate_chars(message, MAX_ERROR_LENGTH)),
            )
            .filter(document::Column::ProcessingStatus.eq(ProcessingStatus::Processing.to_value()))
            .exec(&self.db)
            .await?;

        Ok(result.rows_affected)
    }

    async fn stats(&self) -> AnalysisResult<ProcessingStats> {
        let rows: Vec<(String, i64)> = document::Entity::find()
            .select_only()
            .column(document::Column::ProcessingStatus)
            .column_as(document::Column::Id.count(), "count")
            .group_by(document::Column::ProcessingStatus)
            .into_tuple()
            .all(&self.db)
            .await?;

        let mut stats = ProcessingStats::default();
        for (status, count) in rows {
            match ProcessingStatus::from_str(&status) {
                Ok(status) => stats.record(status, count.max(0) as u64),
                Err(_) => warn!(status = %status, "Ignoring unknown processing status"),
            }
        }
        Ok(stats)
    }

    async fn completed_without_embedding(&self) -> AnalysisResult<Vec<DocumentRef>> {
        let models = document::Entity::find()
            .filter(document::Column::ProcessingStatus.eq(ProcessingStatus::Completed.to_value()))
            .filter(
                document::Column::Id.not_in_subquery(
                    Query::select()
                        .column(embedding::Column::DocumentId)
                        .from(embedding::Entity)
                        .to_owned(),
                ),
            )
            .all(&self.db)
            .await?;

        Ok(models
            .into_iter()
            .map(|model| Document::from(model).reference())
            .collect())
    }
}

pub struct PgResultStore {
    db: DatabaseConnection,
}

impl PgResultStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

/// Replace the analysis record of its document inside a savepoint of `conn`
async fn replace_record<C: TransactionTrait>(conn: &C, record: AnalysisRecord) -> Result<(), DbErr> {
    let savepoint = conn.begin().await?;

    let written = async {
        analysis::Entity::delete_many()
            .filter(analysis::Column::DocumentId.eq(record.document_id))
            .exec(&savepoint)
            .await?;
        analysis::Entity::insert(analysis::ActiveModel::from(record))
            .exec(&savepoint)
            .await?;
        Ok::<_, DbErr>(())
    }
    .await;

    match written {
        Ok(()) => savepoint.commit().await,
        Err(e) => {
            savepoint.rollback().await?;
            Err(e)
        }
    }
}

fn persistence(document_id: Uuid) -> impl Fn(DbErr) -> AnalysisError {
    move |e| AnalysisError::Persistence(format!("document {document_id}: {e}"))
}

#[async_trait]
impl ResultStore for PgResultStore {
    async fn save(
        &self,
        document: &Document,
        response: &AnalysisResponse,
    ) -> AnalysisResult<Document> {
        let now = Utc::now();
        let txn = self.db.begin().await.map_err(persistence(document.id))?;

        if let Err(e) = replace_record(&txn, build_record(document.id, response, now)).await {
            warn!(
                document_id = %document.id,
                error = %e,
                "Failed to save analysis record, continuing with document update"
            );
        }

        let model = document::Entity::find_by_id(document.id)
            .one(&txn)
            .await
            .map_err(persistence(document.id))?
            .ok_or_else(|| {
                AnalysisError::Persistence(format!("document {} no longer exists", document.id))
            })?;

        let completion = build_completion(response, now);
        let mut active_model = model.into_active_model();
        active_model.summary = Set(completion.summary);
        active_model.summary_generated_at = Set(Some(completion.summary_generated_at.into()));
        active_model.analysis_confidence = Set(completion.analysis_confidence);
        active_model.risk_level = Set(Some(completion.risk_level));
        active_model.processing_status = Set(ProcessingStatus::Completed);
        active_model.processing_error = Set(None);
        active_model.updated_at = Set(now.into());

        let updated = active_model
            .update(&txn)
            .await
            .map_err(persistence(document.id))?;
        txn.commit().await.map_err(persistence(document.id))?;

        info!(
            document_id = %document.id,
            risk_level = %completion.risk_level,
            "Saved analysis results"
        );
        Ok(updated.into())
    }

    async fn get_by_document(&self, document_id: Uuid) -> AnalysisResult<Option<AnalysisRecord>> {
        let model = analysis::Entity::find()
            .filter(analysis::Column::DocumentId.eq(document_id))
            .one(&self.db)
            .await?;
        Ok(model.map(Into::into))
    }
}

pub struct PgEmbeddingRepository {
    db: DatabaseConnection,
}

impl PgEmbeddingRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    async fn find<C: ConnectionTrait>(conn: &C, document_id: Uuid) -> Result<Option<embedding::Model>, DbErr> {
        embedding::Entity::find()
            .filter(embedding::Column::DocumentId.eq(document_id))
            .one(conn)
            .await
    }
}

#[async_trait]
impl EmbeddingRepository for PgEmbeddingRepository {
    async fn upsert(&self, document_id: Uuid, vector: Vec<f32>) -> AnalysisResult<Embedding> {
        let active_model = embedding::ActiveModel::from(Embedding {
            id: Uuid::now_v7(),
            document_id,
            vector,
            created_at: Utc::now(),
        });

        embedding::Entity::insert(active_model)
            .on_conflict(
                OnConflict::column(embedding::Column::DocumentId)
                    .update_columns([embedding::Column::Embedding, embedding::Column::CreatedAt])
                    .to_owned(),
            )
            .exec(&self.db)
            .await?;

        let stored = Self::find(&self.db, document_id).await?.ok_or_else(|| {
            AnalysisError::Internal(format!("embedding for {document_id} missing after upsert"))
        })?;
        Ok(stored.into())
    }

    async fn get_by_document(&self, document_id: Uuid) -> AnalysisResult<Option<Embedding>> {
        Ok(Self::find(&self.db, document_id).await?.map(Into::into))
    }
}
