//! Schema migration CLI for the document tables
//!
//! `DATABASE_URL=... cargo run -p migration -- up` applies pending migrations,
//! `status` lists them and `down` reverts the latest one.

use migration::Migrator;
use sea_orm_migration::cli;

#[tokio::main]
async fn main() {
    cli::run_cli(Migrator).await;
}
