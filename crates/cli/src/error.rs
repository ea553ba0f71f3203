use connectors::{error::AdapterError, sql::base::error::ConnectorError};
use engine_processing::error::SyncError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CliError {
    #[error("Failed to read file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to serialize data to JSON: {0}")]
    JsonSerialize(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    /// Neither the flag nor the environment variable supplied a URL.
    #[error("No {role} connection string: pass --{role} or set {var}")]
    MissingConnection { role: &'static str, var: &'static str },

    #[error(transparent)]
    Sync(#[from] SyncError),

    #[error(transparent)]
    Adapter(#[from] AdapterError),

    #[error(transparent)]
    Connector(#[from] ConnectorError),

    /// MySQL driver error.
    #[error("MySQL error: {0}")]
    MySql(#[from] mysql_async::Error),

    /// PostgreSQL driver error.
    #[error("PostgreSQL error: {0}")]
    Postgres(#[from] tokio_postgres::Error),

    #[error("Unexpected error: {0}")]
    Unexpected(String),
}
