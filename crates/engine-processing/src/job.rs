use crate::error::SyncError;
use connectors::connector::WriteOptions;
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

pub const DEFAULT_CHUNK_SIZE: usize = 100_000;
pub const DEFAULT_RETRIES: usize = 1;

/// What a full sync does with a destination table that already exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", try_from = "String")]
pub enum IfExists {
    /// Drop the table; the first append recreates it from the source rows.
    Drop,
    /// Keep the table and its schema, remove its rows. Columns must match.
    Truncate,
    /// Truncate when the columns match, otherwise drop.
    DropIfNeeded,
}

impl FromStr for IfExists {
    type Err = SyncError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "drop" => Ok(IfExists::Drop),
            "truncate" => Ok(IfExists::Truncate),
            "drop_if_needed" => Ok(IfExists::DropIfNeeded),
            other => Err(SyncError::InvalidArgument(format!(
                "if_exists must be one of drop, truncate, drop_if_needed; got '{other}'"
            ))),
        }
    }
}

impl TryFrom<String> for IfExists {
    type Error = SyncError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl fmt::Display for IfExists {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IfExists::Drop => write!(f, "drop"),
            IfExists::Truncate => write!(f, "truncate"),
            IfExists::DropIfNeeded => write!(f, "drop_if_needed"),
        }
    }
}

/// Tuning shared by both sync modes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncOptions {
    /// Rows per fetch+append cycle.
    pub chunk_size: usize,
    /// Attempts per chunk, counting the first one.
    pub retries: usize,
    /// Compare source and destination row counts once the copy finishes.
    pub verify_row_count: bool,
    /// Passed through to every bulk append.
    pub write: WriteOptions,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            retries: DEFAULT_RETRIES,
            verify_row_count: true,
            write: WriteOptions::append(),
        }
    }
}

impl SyncOptions {
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    pub fn with_retries(mut self, retries: usize) -> Self {
        self.retries = retries;
        self
    }

    pub fn with_verify_row_count(mut self, verify: bool) -> Self {
        self.verify_row_count = verify;
        self
    }

    pub fn with_write_options(mut self, write: WriteOptions) -> Self {
        self.write = write;
        self
    }

    pub fn validate(&self) -> Result<(), SyncError> {
        if self.chunk_size == 0 {
            return Err(SyncError::InvalidArgument(
                "chunk_size must be greater than zero".into(),
            ));
        }
        if self.retries == 0 {
            return Err(SyncError::InvalidArgument(
                "retries must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum SyncMode {
    Full {
        if_exists: IfExists,
        #[serde(default)]
        order_by: Option<String>,
    },
    Incremental {
        primary_key: String,
        #[serde(default = "default_distinct_check")]
        distinct_check: bool,
    },
}

fn default_distinct_check() -> bool {
    true
}

/// One replication run, as stored in a job file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncJob {
    pub source_table: String,
    pub destination_table: String,
    #[serde(flatten)]
    pub mode: SyncMode,
    #[serde(default)]
    pub options: SyncOptions,
}

impl SyncJob {
    pub fn full(source_table: &str, destination_table: &str, if_exists: IfExists) -> Self {
        Self {
            source_table: source_table.to_string(),
            destination_table: destination_table.to_string(),
            mode: SyncMode::Full {
                if_exists,
                order_by: None,
            },
            options: SyncOptions::default(),
        }
    }

    pub fn incremental(source_table: &str, destination_table: &str, primary_key: &str) -> Self {
        Self {
            source_table: source_table.to_string(),
            destination_table: destination_table.to_string(),
            mode: SyncMode::Incremental {
                primary_key: primary_key.to_string(),
                distinct_check: true,
            },
            options: SyncOptions::default(),
        }
    }

    pub fn with_options(mut self, options: SyncOptions) -> Self {
        self.options = options;
        self
    }

    pub fn from_json(json: &str) -> Result<Self, SyncError> {
        serde_json::from_str(json).map_err(|e| SyncError::InvalidArgument(e.to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncKind {
    Full,
    Incremental,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncOutcome {
    /// Rows were copied (possibly zero if the source shrank mid-run).
    Copied,
    /// The source had no rows; nothing was read.
    EmptySource,
    /// Destination and source watermarks already matched.
    AlreadyInSync,
}

/// Summary of a finished sync call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    pub kind: SyncKind,
    pub source_table: String,
    pub destination_table: String,
    pub outcome: SyncOutcome,
    pub rows_copied: u64,
    pub chunks: u64,
    pub retries: u64,
    /// `None` when verification was switched off.
    pub row_count_match: Option<bool>,
}

impl SyncReport {
    pub fn new(kind: SyncKind, source_table: &str, destination_table: &str) -> Self {
        Self {
            kind,
            source_table: source_table.to_string(),
            destination_table: destination_table.to_string(),
            outcome: SyncOutcome::Copied,
            rows_copied: 0,
            chunks: 0,
            retries: 0,
            row_count_match: None,
        }
    }

    pub fn with_outcome(mut self, outcome: SyncOutcome) -> Self {
        self.outcome = outcome;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_if_exists_parse() {
        assert_eq!("drop".parse::<IfExists>().unwrap(), IfExists::Drop);
        assert_eq!(
            "drop_if_needed".parse::<IfExists>().unwrap(),
            IfExists::DropIfNeeded
        );
        assert!(matches!(
            "replace".parse::<IfExists>(),
            Err(SyncError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_options_validation() {
        assert!(SyncOptions::default().validate().is_ok());
        assert!(SyncOptions::default().with_chunk_size(0).validate().is_err());
        assert!(SyncOptions::default().with_retries(0).validate().is_err());
    }

    #[test]
    fn test_job_from_json() {
        let job = SyncJob::from_json(
            r#"{
                "source_table": "public.orders",
                "destination_table": "orders_copy",
                "mode": "incremental",
                "primary_key": "id",
                "options": { "chunk_size": 500, "retries": 3 }
            }"#,
        )
        .unwrap();

        assert_eq!(
            job.mode,
            SyncMode::Incremental {
                primary_key: "id".into(),
                distinct_check: true
            }
        );
        assert_eq!(job.options.chunk_size, 500);
        assert_eq!(job.options.retries, 3);
        assert!(job.options.verify_row_count);
    }

    #[test]
    fn test_job_rejects_unknown_policy() {
        let err = SyncJob::from_json(
            r#"{"source_table": "a", "destination_table": "b", "mode": "full", "if_exists": "merge"}"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("if_exists"));
    }
}
