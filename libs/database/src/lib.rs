//! PostgreSQL connectivity for the analysis services
//!
//! Connection pool settings come from [`postgres::PostgresConfig`] (loadable
//! through `core_config::FromEnv`), startup connects are retried with
//! exponential backoff, and [`postgres::check_health`] backs readiness probes.
//!
//! ```ignore
//! use core_config::FromEnv;
//! use database::postgres::{PostgresConfig, connect_from_config_with_retry, run_migrations};
//!
//! let db = connect_from_config_with_retry(PostgresConfig::from_env()?, None).await?;
//! run_migrations::<migration::Migrator>(&db, "analysis-worker").await?;
//! ```

pub mod common;
pub mod postgres;

pub use common::{DatabaseError, DatabaseResult};
