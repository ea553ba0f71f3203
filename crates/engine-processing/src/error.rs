use connectors::sql::base::error::DbError;
use model::core::value::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SyncError {
    /// Rejected before any I/O.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error(
        "Columns of '{source_table}' {source_columns:?} differ from '{destination_table}' \
         {destination_columns:?}; use if_exists=drop to replace the destination"
    )]
    SchemaMismatch {
        source_table: String,
        destination_table: String,
        source_columns: Vec<String>,
        destination_columns: Vec<String>,
    },

    #[error("Data integrity violation: {0}")]
    DataIntegrity(#[from] DataIntegrityViolation),

    /// A connector call failed; after a chunk's retries run out this is the
    /// error of the final attempt.
    #[error(transparent)]
    Connector(#[from] DbError),
}

#[derive(Debug, Error, PartialEq)]
pub enum DataIntegrityViolation {
    #[error("primary key '{primary_key}' is not distinct in '{table}'")]
    NonDistinctKey { table: String, primary_key: String },

    #[error(
        "destination '{table}' is ahead of source: max({primary_key}) is {destination_max} \
         in destination but {source_max} in source"
    )]
    DestinationAhead {
        table: String,
        primary_key: String,
        source_max: Value,
        destination_max: Value,
    },

    #[error(
        "cannot compare watermarks on '{primary_key}': source {source_max}, \
         destination {destination_max}"
    )]
    IncomparableWatermarks {
        primary_key: String,
        source_max: Value,
        destination_max: Value,
    },
}
