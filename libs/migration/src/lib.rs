pub use sea_orm_migration::prelude::*;

mod m20251020_000000_bootstrap;
mod m20251020_000001_create_documents;
mod m20251020_000002_create_document_analysis;
mod m20251020_000003_create_document_embeddings;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20251020_000000_bootstrap::Migration),
            Box::new(m20251020_000001_create_documents::Migration),
            Box::new(m20251020_000002_create_document_analysis::Migration),
            Box::new(m20251020_000003_create_document_embeddings::Migration),
        ]
    }
}
