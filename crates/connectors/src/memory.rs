use crate::{
    connector::{DataStoreConnector, DatabaseKind, WriteOptions},
    sql::base::{error::DbError, utils::prepare_append},
};
use async_trait::async_trait;
use model::{
    core::value::{FieldValue, Value},
    records::row::RowData,
};
use std::{
    cmp::Ordering,
    collections::{HashMap, HashSet},
    sync::Arc,
};
use tokio::sync::RwLock;
use tracing::debug;

#[derive(Debug, Clone, Default)]
pub struct MemoryTable {
    pub columns: Vec<String>,
    pub rows: Vec<RowData>,
}

/// Process-local tables. Clones share the same storage.
#[derive(Debug, Clone, Default)]
pub struct MemoryConnector {
    tables: Arc<RwLock<HashMap<String, MemoryTable>>>,
}

impl MemoryConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates (or replaces) an empty table with the given columns.
    pub async fn create_table(&self, name: &str, columns: &[&str]) {
        let table = MemoryTable {
            columns: columns.iter().map(|c| c.to_string()).collect(),
            rows: Vec::new(),
        };
        self.tables.write().await.insert(name.to_string(), table);
    }

    /// Appends rows, creating the table from the first row when missing.
    pub async fn insert_rows(&self, name: &str, rows: Vec<RowData>) -> Result<(), DbError> {
        let mut tables = self.tables.write().await;
        let table = tables.entry(name.to_string()).or_insert_with(|| MemoryTable {
            columns: rows.first().map(RowData::columns).unwrap_or_default(),
            rows: Vec::new(),
        });
        let projected = rows
            .iter()
            .map(|row| project(name, &table.columns, row))
            .collect::<Result<Vec<_>, _>>()?;
        table.rows.extend(projected);
        Ok(())
    }

    /// Snapshot of a table's rows in storage order.
    pub async fn rows(&self, name: &str) -> Option<Vec<RowData>> {
        self.tables.read().await.get(name).map(|t| t.rows.clone())
    }

    async fn with_table<T>(
        &self,
        name: &str,
        f: impl FnOnce(&MemoryTable) -> T,
    ) -> Result<T, DbError> {
        let tables = self.tables.read().await;
        tables
            .get(name)
            .map(f)
            .ok_or_else(|| DbError::TableNotFound(name.to_string()))
    }
}

/// Reorders a row onto the table's columns. Missing fields become NULL;
/// fields the table lacks are rejected like a SQL backend would.
fn project(table: &str, columns: &[String], row: &RowData) -> Result<RowData, DbError> {
    if let Some(unknown) = row
        .field_values
        .iter()
        .find(|f| !columns.iter().any(|c| c.eq_ignore_ascii_case(&f.name)))
    {
        return Err(DbError::Write(format!(
            "column {} does not exist in {table}",
            unknown.name
        )));
    }

    let field_values = columns
        .iter()
        .map(|column| match row.get(column) {
            Some(field) => FieldValue {
                name: column.clone(),
                ..field.clone()
            },
            None => FieldValue::new(column.clone(), Value::Null),
        })
        .collect();
    Ok(RowData::new(table, field_values))
}

/// Ascending order with NULLs last, as Postgres sorts by default.
/// Values of unrelated kinds keep their relative order.
fn ascending(a: &Value, b: &Value) -> Ordering {
    match (a.is_null(), b.is_null()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => a.compare(b).unwrap_or(Ordering::Equal),
    }
}

fn window(rows: Vec<RowData>, offset: usize, limit: usize) -> Vec<RowData> {
    rows.into_iter().skip(offset).take(limit).collect()
}

fn is_newer(row: &RowData, primary_key: &str, cutoff: Option<&Value>) -> bool {
    match cutoff {
        Some(cutoff) => row.get_value(primary_key).compare(cutoff) == Some(Ordering::Greater),
        None => true,
    }
}

#[async_trait]
impl DataStoreConnector for MemoryConnector {
    fn kind(&self) -> DatabaseKind {
        DatabaseKind::Memory
    }

    async fn table_exists(&self, table: &str) -> Result<bool, DbError> {
        Ok(self.tables.read().await.contains_key(table))
    }

    async fn drop_table(&self, table: &str) -> Result<(), DbError> {
        self.tables.write().await.remove(table);
        Ok(())
    }

    async fn truncate_table(&self, table: &str) -> Result<(), DbError> {
        let mut tables = self.tables.write().await;
        let entry = tables
            .get_mut(table)
            .ok_or_else(|| DbError::TableNotFound(table.to_string()))?;
        entry.rows.clear();
        Ok(())
    }

    async fn columns(&self, table: &str) -> Result<Vec<String>, DbError> {
        self.with_table(table, |t| t.columns.clone()).await
    }

    async fn row_count(&self, table: &str) -> Result<u64, DbError> {
        self.with_table(table, |t| t.rows.len() as u64).await
    }

    async fn get_rows(
        &self,
        table: &str,
        offset: usize,
        chunk_size: usize,
        order_by: Option<&str>,
    ) -> Result<Vec<RowData>, DbError> {
        let mut rows = self.with_table(table, |t| t.rows.clone()).await?;
        if let Some(column) = order_by {
            rows.sort_by(|a, b| ascending(&a.get_value(column), &b.get_value(column)));
        }
        Ok(window(rows, offset, chunk_size))
    }

    async fn get_new_rows(
        &self,
        table: &str,
        primary_key: &str,
        cutoff: Option<&Value>,
        offset: usize,
        chunk_size: usize,
    ) -> Result<Vec<RowData>, DbError> {
        let mut rows = self
            .with_table(table, |t| {
                t.rows
                    .iter()
                    .filter(|row| is_newer(row, primary_key, cutoff))
                    .cloned()
                    .collect::<Vec<_>>()
            })
            .await?;
        rows.sort_by(|a, b| ascending(&a.get_value(primary_key), &b.get_value(primary_key)));
        Ok(window(rows, offset, chunk_size))
    }

    async fn new_rows_count(
        &self,
        table: &str,
        primary_key: &str,
        cutoff: Option<&Value>,
    ) -> Result<u64, DbError> {
        self.with_table(table, |t| {
            t.rows
                .iter()
                .filter(|row| is_newer(row, primary_key, cutoff))
                .count() as u64
        })
        .await
    }

    async fn max_primary_key(
        &self,
        table: &str,
        primary_key: &str,
    ) -> Result<Option<Value>, DbError> {
        self.with_table(table, |t| {
            t.rows
                .iter()
                .map(|row| row.get_value(primary_key))
                .filter(|v| !v.is_null())
                .max_by(ascending)
        })
        .await
    }

    async fn distinct_primary_key(&self, table: &str, primary_key: &str) -> Result<bool, DbError> {
        self.with_table(table, |t| {
            // NULL keys never count as distinct, matching COUNT(DISTINCT col).
            let distinct = t
                .rows
                .iter()
                .map(|row| row.get_value(primary_key))
                .filter(|v| !v.is_null())
                .collect::<HashSet<_>>();
            distinct.len() == t.rows.len()
        })
        .await
    }

    async fn bulk_append(
        &self,
        table: &str,
        rows: &[RowData],
        options: &WriteOptions,
    ) -> Result<u64, DbError> {
        let exists = self.table_exists(table).await?;
        let create = prepare_append(table, exists, options)?;
        if rows.is_empty() {
            return Ok(0);
        }
        if create {
            let columns = rows[0].columns();
            let columns = columns.iter().map(String::as_str).collect::<Vec<_>>();
            self.create_table(table, &columns).await;
        }

        self.insert_rows(table, rows.to_vec()).await?;
        debug!(table, rows = rows.len(), "Appended rows");
        Ok(rows.len() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connector::{PROP_CREATE_TABLE, WriteMode};

    fn row(id: i64, name: &str) -> RowData {
        RowData::from_pairs("t", [("id", Value::Int(id)), ("name", Value::from(name))])
    }

    async fn seeded() -> MemoryConnector {
        let connector = MemoryConnector::new();
        connector
            .insert_rows("t", vec![row(3, "c"), row(1, "a"), row(2, "b")])
            .await
            .unwrap();
        connector
    }

    #[tokio::test]
    async fn test_get_rows_ordered_window() {
        let connector = seeded().await;
        let rows = connector.get_rows("t", 1, 5, Some("id")).await.unwrap();
        let ids = rows.iter().map(|r| r.get_value("id")).collect::<Vec<_>>();
        assert_eq!(ids, vec![Value::Int(2), Value::Int(3)]);
    }

    #[tokio::test]
    async fn test_get_new_rows_respects_cutoff() {
        let connector = seeded().await;
        let rows = connector
            .get_new_rows("t", "id", Some(&Value::Int(1)), 0, 10)
            .await
            .unwrap();
        let ids = rows.iter().map(|r| r.get_value("id")).collect::<Vec<_>>();
        assert_eq!(ids, vec![Value::Int(2), Value::Int(3)]);
        assert_eq!(
            connector.new_rows_count("t", "id", None).await.unwrap(),
            3
        );
    }

    #[tokio::test]
    async fn test_max_and_distinct() {
        let connector = seeded().await;
        assert_eq!(
            connector.max_primary_key("t", "id").await.unwrap(),
            Some(Value::Int(3))
        );
        assert!(connector.distinct_primary_key("t", "id").await.unwrap());

        connector.insert_rows("t", vec![row(3, "dup")]).await.unwrap();
        assert!(!connector.distinct_primary_key("t", "id").await.unwrap());
    }

    #[tokio::test]
    async fn test_max_of_empty_table() {
        let connector = MemoryConnector::new();
        connector.create_table("t", &["id"]).await;
        assert_eq!(connector.max_primary_key("t", "id").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_bulk_append_creates_and_projects() {
        let connector = MemoryConnector::new();
        let written = connector
            .bulk_append("dst", &[row(1, "a")], &WriteOptions::append())
            .await
            .unwrap();
        assert_eq!(written, 1);
        assert_eq!(connector.columns("dst").await.unwrap(), vec!["id", "name"]);

        let partial = RowData::from_pairs("src", [("id", Value::Int(2))]);
        connector
            .bulk_append("dst", &[partial], &WriteOptions::append())
            .await
            .unwrap();
        let rows = connector.rows("dst").await.unwrap();
        assert_eq!(rows[1].get_value("name"), Value::Null);
        assert_eq!(rows[1].entity, "dst");
    }

    #[tokio::test]
    async fn test_bulk_append_modes() {
        let connector = seeded().await;
        let fail = WriteOptions::append().with_mode(WriteMode::Fail);
        assert!(matches!(
            connector.bulk_append("t", &[row(9, "z")], &fail).await,
            Err(DbError::TableExists(_))
        ));

        let no_create = WriteOptions::append().with_property(PROP_CREATE_TABLE, false);
        assert!(matches!(
            connector.bulk_append("missing", &[row(9, "z")], &no_create).await,
            Err(DbError::TableNotFound(_))
        ));

        let extra = RowData::from_pairs("t", [("id", Value::Int(4)), ("other", Value::Int(0))]);
        assert!(matches!(
            connector.bulk_append("t", &[extra], &WriteOptions::append()).await,
            Err(DbError::Write(_))
        ));
    }

    #[tokio::test]
    async fn test_truncate_and_drop() {
        let connector = seeded().await;
        connector.truncate_table("t").await.unwrap();
        assert_eq!(connector.row_count("t").await.unwrap(), 0);
        assert_eq!(connector.columns("t").await.unwrap().len(), 2);

        connector.drop_table("t").await.unwrap();
        assert!(!connector.table_exists("t").await.unwrap());
        assert!(connector.truncate_table("t").await.is_err());
    }
}
