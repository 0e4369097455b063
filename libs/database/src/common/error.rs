/// Error type for connection management
#[derive(Debug, thiserror::Error)]
pub enum DatabaseError {
    #[error("PostgreSQL error: {0}")]
    Postgres(#[from] sea_orm::DbErr),

    #[error("Health check failed: {0}")]
    HealthCheckFailed(String),

    #[error("Configuration error: {0}")]
    Config(#[from] core_config::ConfigError),
}

pub type DatabaseResult<T> = Result<T, DatabaseError>;
