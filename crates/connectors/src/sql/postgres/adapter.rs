use crate::{
    connector::{DataStoreConnector, DatabaseKind, WriteOptions},
    sql::{
        base::{
            dialect::{Postgres, TableName},
            error::{ConnectorError, DbError},
            query::generator::QueryGenerator,
            requests::FetchRowsRequestBuilder,
            utils::{infer_columns, prepare_append},
        },
        postgres::{
            params::PgParamStore,
            row::{decode, first_count, to_row_data},
            utils::connect_client,
        },
    },
};
use async_trait::async_trait;
use model::{core::value::Value, pagination::cursor::Cursor, records::row::RowData};
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio_postgres::{Client, Row};
use tracing::{debug, info};

#[derive(Clone)]
pub struct PgConnector {
    client: Arc<RwLock<Client>>,
    dialect: Postgres,
}

impl PgConnector {
    pub async fn connect(url: &str) -> Result<Self, ConnectorError> {
        let client = Arc::new(RwLock::new(connect_client(url).await?));
        Ok(PgConnector {
            client,
            dialect: Postgres,
        })
    }

    fn generator(&self) -> QueryGenerator<'_> {
        QueryGenerator::new(&self.dialect)
    }

    /// Prepares `sql` so each value can be bound as its placeholder's type.
    async fn query(&self, sql: &str, params: &[Value]) -> Result<Vec<Row>, DbError> {
        debug!(sql, "Postgres query");
        let client = self.client.read().await;
        let statement = client.prepare(sql).await?;
        let bindings = PgParamStore::coerce(params, statement.params())?;
        Ok(client.query(&statement, &bindings.as_refs()).await?)
    }

    async fn execute(&self, sql: &str) -> Result<(), DbError> {
        debug!(sql, "Postgres execute");
        let client = self.client.read().await;
        client.batch_execute(sql).await?;
        Ok(())
    }

    async fn fetch(&self, table: &str, cursor: Cursor, limit: usize) -> Result<Vec<RowData>, DbError> {
        let request = FetchRowsRequestBuilder::new(TableName::parse(table)?)
            .cursor(cursor)
            .limit(limit)
            .build();
        let (sql, params) = self.generator().select(&request);
        let rows = self.query(&sql, &params).await?;
        rows.iter().map(|row| to_row_data(row, table)).collect()
    }
}

#[async_trait]
impl DataStoreConnector for PgConnector {
    fn kind(&self) -> DatabaseKind {
        DatabaseKind::Postgres
    }

    async fn table_exists(&self, table: &str) -> Result<bool, DbError> {
        let (sql, params) = self.generator().table_exists(&TableName::parse(table)?);
        let rows = self.query(&sql, &params).await?;
        Ok(first_count(&rows)? > 0)
    }

    async fn drop_table(&self, table: &str) -> Result<(), DbError> {
        let sql = self.generator().drop_table(&TableName::parse(table)?);
        self.execute(&sql).await
    }

    async fn truncate_table(&self, table: &str) -> Result<(), DbError> {
        let sql = self.generator().truncate_table(&TableName::parse(table)?);
        self.execute(&sql).await
    }

    async fn columns(&self, table: &str) -> Result<Vec<String>, DbError> {
        let (sql, params) = self.generator().columns(&TableName::parse(table)?);
        let rows = self.query(&sql, &params).await?;
        let columns = rows
            .iter()
            .map(|row| row.try_get::<_, String>(0))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(columns)
    }

    async fn row_count(&self, table: &str) -> Result<u64, DbError> {
        let (sql, params) = self.generator().count(&TableName::parse(table)?, None, None);
        first_count(&self.query(&sql, &params).await?)
    }

    async fn get_rows(
        &self,
        table: &str,
        offset: usize,
        chunk_size: usize,
        order_by: Option<&str>,
    ) -> Result<Vec<RowData>, DbError> {
        let cursor = Cursor::Offset {
            offset,
            order_by: order_by.map(str::to_string),
        };
        self.fetch(table, cursor, chunk_size).await
    }

    async fn get_new_rows(
        &self,
        table: &str,
        primary_key: &str,
        cutoff: Option<&Value>,
        offset: usize,
        chunk_size: usize,
    ) -> Result<Vec<RowData>, DbError> {
        let cursor = Cursor::Watermark {
            column: primary_key.to_string(),
            after: cutoff.cloned(),
            offset,
        };
        self.fetch(table, cursor, chunk_size).await
    }

    async fn new_rows_count(
        &self,
        table: &str,
        primary_key: &str,
        cutoff: Option<&Value>,
    ) -> Result<u64, DbError> {
        let name = TableName::parse(table)?;
        let (sql, params) = self.generator().count(&name, Some(primary_key), cutoff);
        first_count(&self.query(&sql, &params).await?)
    }

    async fn max_primary_key(
        &self,
        table: &str,
        primary_key: &str,
    ) -> Result<Option<Value>, DbError> {
        let sql = self.generator().max(&TableName::parse(table)?, primary_key);
        let rows = self.query(&sql, &[]).await?;
        let Some(row) = rows.first() else {
            return Ok(None);
        };
        match row.columns().first() {
            Some(column) => decode(row, 0, column.type_()),
            None => Ok(None),
        }
    }

    async fn distinct_primary_key(&self, table: &str, primary_key: &str) -> Result<bool, DbError> {
        let sql = self
            .generator()
            .distinct_counts(&TableName::parse(table)?, primary_key);
        let rows = self.query(&sql, &[]).await?;
        let row = rows
            .first()
            .ok_or_else(|| DbError::Decode("distinct query returned no rows".into()))?;
        let total: i64 = row.try_get(0)?;
        let distinct: i64 = row.try_get(1)?;
        Ok(total == distinct)
    }

    async fn bulk_append(
        &self,
        table: &str,
        rows: &[RowData],
        options: &WriteOptions,
    ) -> Result<u64, DbError> {
        let name = TableName::parse(table)?;
        let exists = self.table_exists(table).await?;
        let create = prepare_append(table, exists, options)?;
        if rows.is_empty() {
            return Ok(0);
        }

        let generator = self.generator();
        let columns = infer_columns(rows);
        let names = columns.iter().map(|(n, _)| n.clone()).collect::<Vec<_>>();
        let per_statement = generator.rows_per_insert(names.len(), options.insert_batch_size());

        let mut client = self.client.write().await;
        let tx = client.transaction().await?;

        if create {
            let ddl = generator.create_table(&name, &columns);
            info!(table, "Creating destination table");
            tx.batch_execute(&ddl).await?;
        }

        for batch in rows.chunks(per_statement) {
            let (sql, params) = generator.insert_batch(&name, &names, batch);
            let statement = tx.prepare(&sql).await?;
            let bindings = PgParamStore::coerce(&params, statement.params())?;
            tx.execute(&statement, &bindings.as_refs()).await?;
        }

        tx.commit().await?;
        debug!(table, rows = rows.len(), "Appended rows");
        Ok(rows.len() as u64)
    }
}
