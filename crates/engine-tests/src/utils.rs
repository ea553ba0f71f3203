#![allow(dead_code)]

use async_trait::async_trait;
use connectors::{
    connector::{DataStoreConnector, DatabaseKind, WriteOptions},
    memory::MemoryConnector,
    sql::base::error::DbError,
};
use model::{core::value::Value, records::row::RowData};
use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};

/// Source table name used across tests.
pub const SOURCE: &str = "src";
/// Destination table name used across tests.
pub const DEST: &str = "dst";

/// Row with an integer `pk` and a text `v`.
pub fn row(pk: i64, v: &str) -> RowData {
    RowData::from_pairs(SOURCE, [("pk", Value::Int(pk)), ("v", Value::from(v))])
}

/// Rows `pk = 1..=n` with `v = "v{pk}"`.
pub fn rows(n: i64) -> Vec<RowData> {
    (1..=n).map(|pk| row(pk, &format!("v{pk}"))).collect()
}

pub async fn memory_with(table: &str, data: Vec<RowData>) -> MemoryConnector {
    let connector = MemoryConnector::new();
    connector.insert_rows(table, data).await.unwrap();
    connector
}

/// `(pk, v)` pairs of a table in storage order; empty when the table is absent.
pub async fn contents(connector: &MemoryConnector, table: &str) -> Vec<(Value, Value)> {
    connector
        .rows(table)
        .await
        .unwrap_or_default()
        .iter()
        .map(|r| (r.get_value("pk"), r.get_value("v")))
        .collect()
}

/// Wraps a `MemoryConnector` and fails a set number of calls before
/// delegating. Also counts every call it receives.
#[derive(Clone)]
pub struct FlakyConnector {
    inner: MemoryConnector,
    failing_appends: Arc<AtomicUsize>,
    failing_fetches: Arc<AtomicUsize>,
    extra_row_count: u64,
    calls: Arc<AtomicUsize>,
}

impl FlakyConnector {
    pub fn new(inner: MemoryConnector) -> Self {
        Self {
            inner,
            failing_appends: Arc::new(AtomicUsize::new(0)),
            failing_fetches: Arc::new(AtomicUsize::new(0)),
            extra_row_count: 0,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// The next `k` bulk appends fail.
    pub fn fail_appends(self, k: usize) -> Self {
        self.failing_appends.store(k, Ordering::SeqCst);
        self
    }

    /// The next `k` row fetches fail.
    pub fn fail_fetches(self, k: usize) -> Self {
        self.failing_fetches.store(k, Ordering::SeqCst);
        self
    }

    /// `row_count` reports `extra` more rows than the table holds.
    pub fn overstate_row_count(mut self, extra: u64) -> Self {
        self.extra_row_count = extra;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn inner(&self) -> &MemoryConnector {
        &self.inner
    }

    fn record(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }

    fn injected(budget: &AtomicUsize, what: &str) -> Result<(), DbError> {
        let remaining = budget.load(Ordering::SeqCst);
        if remaining > 0 {
            budget.store(remaining - 1, Ordering::SeqCst);
            return Err(DbError::Write(format!("injected {what} failure")));
        }
        Ok(())
    }
}

#[async_trait]
impl DataStoreConnector for FlakyConnector {
    fn kind(&self) -> DatabaseKind {
        DatabaseKind::Memory
    }

    async fn table_exists(&self, table: &str) -> Result<bool, DbError> {
        self.record();
        self.inner.table_exists(table).await
    }

    async fn drop_table(&self, table: &str) -> Result<(), DbError> {
        self.record();
        self.inner.drop_table(table).await
    }

    async fn truncate_table(&self, table: &str) -> Result<(), DbError> {
        self.record();
        self.inner.truncate_table(table).await
    }

    async fn columns(&self, table: &str) -> Result<Vec<String>, DbError> {
        self.record();
        self.inner.columns(table).await
    }

    async fn row_count(&self, table: &str) -> Result<u64, DbError> {
        self.record();
        Ok(self.inner.row_count(table).await? + self.extra_row_count)
    }

    async fn get_rows(
        &self,
        table: &str,
        offset: usize,
        chunk_size: usize,
        order_by: Option<&str>,
    ) -> Result<Vec<RowData>, DbError> {
        self.record();
        Self::injected(&self.failing_fetches, "fetch")?;
        self.inner
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
        self.record();
        Self::injected(&self.failing_fetches, "fetch")?;
        self.inner
            .get_new_rows(table, primary_key, cutoff, offset, chunk_size)
            .await
    }

    async fn new_rows_count(
        &self,
        table: &str,
        primary_key: &str,
        cutoff: Option<&Value>,
    ) -> Result<u64, DbError> {
        self.record();
        self.inner.new_rows_count(table, primary_key, cutoff).await
    }

    async fn max_primary_key(
        &self,
        table: &str,
        primary_key: &str,
    ) -> Result<Option<Value>, DbError> {
        self.record();
        self.inner.max_primary_key(table, primary_key).await
    }

    async fn distinct_primary_key(&self, table: &str, primary_key: &str) -> Result<bool, DbError> {
        self.record();
        self.inner.distinct_primary_key(table, primary_key).await
    }

    async fn bulk_append(
        &self,
        table: &str,
        rows: &[RowData],
        options: &WriteOptions,
    ) -> Result<u64, DbError> {
        self.record();
        Self::injected(&self.failing_appends, "append")?;
        self.inner.bulk_append(table, rows, options).await
    }
}
