use crate::sql::base::error::DbError;
use async_trait::async_trait;
use model::{
    core::value::Value, execution::properties::Properties, pagination::cursor::Cursor,
    records::row::RowData,
};
use serde::{Deserialize, Serialize};

/// Property key: create the destination table from the incoming rows when missing.
pub const PROP_CREATE_TABLE: &str = "create_table";
/// Property key: rows per INSERT statement for SQL backends.
pub const PROP_INSERT_BATCH_SIZE: &str = "insert_batch_size";

pub const DEFAULT_INSERT_BATCH_SIZE: usize = 1000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DatabaseKind {
    MySql,
    Postgres,
    Memory,
}

/// What a bulk append does when the destination table already exists.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WriteMode {
    #[default]
    Append,
    Fail,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WriteOptions {
    #[serde(default)]
    pub mode: WriteMode,
    #[serde(default)]
    pub properties: Properties,
}

impl WriteOptions {
    pub fn append() -> Self {
        Self::default()
    }

    pub fn with_mode(mut self, mode: WriteMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_property(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.properties.insert(key.to_string(), value.into());
        self
    }

    pub fn create_table(&self) -> bool {
        self.properties.get_bool(PROP_CREATE_TABLE).unwrap_or(true)
    }

    pub fn insert_batch_size(&self) -> usize {
        self.properties
            .get_usize(PROP_INSERT_BATCH_SIZE)
            .filter(|n| *n > 0)
            .unwrap_or(DEFAULT_INSERT_BATCH_SIZE)
    }
}

/// Capability set a backend offers to the sync engine.
///
/// Every method addresses a table by name; `TableHandle` wraps a name and a
/// connector reference for call sites that work on one table at a time.
#[async_trait]
pub trait DataStoreConnector: Send + Sync {
    fn kind(&self) -> DatabaseKind;

    async fn table_exists(&self, table: &str) -> Result<bool, DbError>;
    async fn drop_table(&self, table: &str) -> Result<(), DbError>;
    async fn truncate_table(&self, table: &str) -> Result<(), DbError>;

    /// Column names in declaration order.
    async fn columns(&self, table: &str) -> Result<Vec<String>, DbError>;
    async fn row_count(&self, table: &str) -> Result<u64, DbError>;

    async fn get_rows(
        &self,
        table: &str,
        offset: usize,
        chunk_size: usize,
        order_by: Option<&str>,
    ) -> Result<Vec<RowData>, DbError>;

    /// Rows with `primary_key > cutoff` ordered by `primary_key`. A `None`
    /// cutoff reads from the beginning of the table.
    async fn get_new_rows(
        &self,
        table: &str,
        primary_key: &str,
        cutoff: Option<&Value>,
        offset: usize,
        chunk_size: usize,
    ) -> Result<Vec<RowData>, DbError>;

    async fn new_rows_count(
        &self,
        table: &str,
        primary_key: &str,
        cutoff: Option<&Value>,
    ) -> Result<u64, DbError>;

    /// `None` when the table is empty or the column holds only NULLs.
    async fn max_primary_key(&self, table: &str, primary_key: &str)
    -> Result<Option<Value>, DbError>;

    async fn distinct_primary_key(&self, table: &str, primary_key: &str) -> Result<bool, DbError>;

    /// Appends `rows` to `table`, returning the number of rows written.
    async fn bulk_append(
        &self,
        table: &str,
        rows: &[RowData],
        options: &WriteOptions,
    ) -> Result<u64, DbError>;

    fn table<'c>(&'c self, name: &str) -> TableHandle<'c, Self>
    where
        Self: Sized,
    {
        TableHandle::new(self, name)
    }
}

/// Borrowed view of a single table on a connector.
pub struct TableHandle<'c, C: DataStoreConnector + ?Sized> {
    connector: &'c C,
    name: String,
}

impl<'c, C: DataStoreConnector + ?Sized> TableHandle<'c, C> {
    pub fn new(connector: &'c C, name: &str) -> Self {
        Self {
            connector,
            name: name.to_string(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn connector(&self) -> &'c C {
        self.connector
    }

    pub async fn exists(&self) -> Result<bool, DbError> {
        self.connector.table_exists(&self.name).await
    }

    pub async fn drop_table(&self) -> Result<(), DbError> {
        self.connector.drop_table(&self.name).await
    }

    pub async fn truncate(&self) -> Result<(), DbError> {
        self.connector.truncate_table(&self.name).await
    }

    pub async fn columns(&self) -> Result<Vec<String>, DbError> {
        self.connector.columns(&self.name).await
    }

    pub async fn num_rows(&self) -> Result<u64, DbError> {
        self.connector.row_count(&self.name).await
    }

    pub async fn new_rows_count(
        &self,
        primary_key: &str,
        cutoff: Option<&Value>,
    ) -> Result<u64, DbError> {
        self.connector
            .new_rows_count(&self.name, primary_key, cutoff)
            .await
    }

    pub async fn max_primary_key(&self, primary_key: &str) -> Result<Option<Value>, DbError> {
        self.connector.max_primary_key(&self.name, primary_key).await
    }

    pub async fn distinct_primary_key(&self, primary_key: &str) -> Result<bool, DbError> {
        self.connector
            .distinct_primary_key(&self.name, primary_key)
            .await
    }

    /// Reads the window described by `cursor`, at most `limit` rows.
    pub async fn fetch(&self, cursor: &Cursor, limit: usize) -> Result<Vec<RowData>, DbError> {
        match cursor {
            Cursor::Offset { offset, order_by } => {
                self.connector
                    .get_rows(&self.name, *offset, limit, order_by.as_deref())
                    .await
            }
            Cursor::Watermark {
                column,
                after,
                offset,
            } => {
                self.connector
                    .get_new_rows(&self.name, column, after.as_ref(), *offset, limit)
                    .await
            }
        }
    }

    pub async fn append(&self, rows: &[RowData], options: &WriteOptions) -> Result<u64, DbError> {
        self.connector.bulk_append(&self.name, rows, options).await
    }
}
