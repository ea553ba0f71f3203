use crate::{
    connector::{DataStoreConnector, DatabaseKind, WriteOptions},
    error::AdapterError,
    memory::MemoryConnector,
    sql::{
        base::error::DbError, mysql::adapter::MySqlConnector, postgres::adapter::PgConnector,
    },
};
use async_trait::async_trait;
use model::{core::value::Value, records::row::RowData};
use std::{fmt::Display, str::FromStr};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataFormat {
    MySql,
    Postgres,
}

impl DataFormat {
    /// Infers the format from a connection URL scheme.
    pub fn from_url(url: &str) -> Result<Self, AdapterError> {
        let scheme = url.split("://").next().unwrap_or_default();
        scheme.parse()
    }
}

impl FromStr for DataFormat {
    type Err = AdapterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "mysql" | "mariadb" => Ok(DataFormat::MySql),
            "pg" | "postgres" | "postgresql" => Ok(DataFormat::Postgres),
            other => Err(AdapterError::UnsupportedFormat(other.to_string())),
        }
    }
}

impl Display for DataFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DataFormat::MySql => write!(f, "MySQL"),
            DataFormat::Postgres => write!(f, "Postgres"),
        }
    }
}

/// A connector chosen at runtime.
#[derive(Clone)]
pub enum Adapter {
    MySql(MySqlConnector),
    Postgres(PgConnector),
    Memory(MemoryConnector),
}

impl Adapter {
    pub async fn connect(format: DataFormat, url: &str) -> Result<Self, AdapterError> {
        match format {
            DataFormat::MySql => Ok(Adapter::MySql(MySqlConnector::connect(url).await?)),
            DataFormat::Postgres => Ok(Adapter::Postgres(PgConnector::connect(url).await?)),
        }
    }

    pub async fn from_url(url: &str) -> Result<Self, AdapterError> {
        Self::connect(DataFormat::from_url(url)?, url).await
    }

    pub fn inner(&self) -> &dyn DataStoreConnector {
        match self {
            Adapter::MySql(connector) => connector,
            Adapter::Postgres(connector) => connector,
            Adapter::Memory(connector) => connector,
        }
    }
}

#[async_trait]
impl DataStoreConnector for Adapter {
    fn kind(&self) -> DatabaseKind {
        self.inner().kind()
    }

    async fn table_exists(&self, table: &str) -> Result<bool, DbError> {
        self.inner().table_exists(table).await
    }

    async fn drop_table(&self, table: &str) -> Result<(), DbError> {
        self.inner().drop_table(table).await
    }

    async fn truncate_table(&self, table: &str) -> Result<(), DbError> {
        self.inner().truncate_table(table).await
    }

    async fn columns(&self, table: &str) -> Result<Vec<String>, DbError> {
        self.inner().columns(table).await
    }

    async fn row_count(&self, table: &str) -> Result<u64, DbError> {
        self.inner().row_count(table).await
    }

    async fn get_rows(
        &self,
        table: &str,
        offset: usize,
        chunk_size: usize,
        order_by: Option<&str>,
    ) -> Result<Vec<RowData>, DbError> {
        self.inner()
            .get_rows(table, offset, chunk_size, order_by)
            .await
    }

    async fn get_new_rows(
        &self,
        table: &str,
        primary_key: &str,
        cutoff: Option<&Value>,
        offset: usize,
        chunk_size: usize,
    ) -> Result<Vec<RowData>, DbError> {
        self.inner()
            .get_new_rows(table, primary_key, cutoff, offset, chunk_size)
            .await
    }

    async fn new_rows_count(
        &self,
        table: &str,
        primary_key: &str,
        cutoff: Option<&Value>,
    ) -> Result<u64, DbError> {
        self.inner()
            .new_rows_count(table, primary_key, cutoff)
            .await
    }

    async fn max_primary_key(
        &self,
        table: &str,
        primary_key: &str,
    ) -> Result<Option<Value>, DbError> {
        self.inner().max_primary_key(table, primary_key).await
    }

    async fn distinct_primary_key(&self, table: &str, primary_key: &str) -> Result<bool, DbError> {
        self.inner().distinct_primary_key(table, primary_key).await
    }

    async fn bulk_append(
        &self,
        table: &str,
        rows: &[RowData],
        options: &WriteOptions,
    ) -> Result<u64, DbError> {
        self.inner().bulk_append(table, rows, options).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_from_url() {
        assert_eq!(
            DataFormat::from_url("postgresql://u:p@localhost/db").unwrap(),
            DataFormat::Postgres
        );
        assert_eq!(
            DataFormat::from_url("mysql://u:p@localhost:3306/db").unwrap(),
            DataFormat::MySql
        );
        assert!(matches!(
            DataFormat::from_url("ftp://host/file"),
            Err(AdapterError::UnsupportedFormat(_))
        ));
    }

    #[tokio::test]
    async fn test_memory_adapter_delegates() {
        let memory = MemoryConnector::new();
        memory.create_table("t", &["id"]).await;
        let adapter = Adapter::Memory(memory);
        assert_eq!(adapter.kind(), DatabaseKind::Memory);
        assert!(adapter.table_exists("t").await.unwrap());
    }
}
