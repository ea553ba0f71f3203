use crate::{
    connector::{DataStoreConnector, DatabaseKind, WriteOptions},
    sql::{
        base::{
            dialect::{MySql, TableName},
            error::{ConnectorError, DbError},
            query::generator::QueryGenerator,
            requests::FetchRowsRequestBuilder,
            utils::{infer_columns, prepare_append},
        },
        mysql::{
            params::MySqlParamStore,
            row::{count_at, first_value, to_row_data, value_at},
        },
    },
};
use async_trait::async_trait;
use model::{core::value::Value, pagination::cursor::Cursor, records::row::RowData};
use mysql_async::{Pool, Row, TxOpts, prelude::Queryable};
use tracing::{debug, info};

#[derive(Clone)]
pub struct MySqlConnector {
    pool: Pool,
    dialect: MySql,
}

impl MySqlConnector {
    pub async fn connect(url: &str) -> Result<Self, ConnectorError> {
        let pool = Pool::from_url(url)?;
        // Fail fast on bad credentials instead of at the first query.
        pool.get_conn().await?;
        Ok(MySqlConnector {
            pool,
            dialect: MySql,
        })
    }

    fn generator(&self) -> QueryGenerator<'_> {
        QueryGenerator::new(&self.dialect)
    }

    /// Runs `sql` over the binary protocol so values keep their column types.
    async fn query(&self, sql: &str, params: &[Value]) -> Result<Vec<Row>, DbError> {
        debug!(sql, "MySQL query");
        let mut conn = self.pool.get_conn().await?;
        let bindings = MySqlParamStore::from_values(params);
        Ok(conn.exec::<Row, _, _>(sql, bindings.params()).await?)
    }

    async fn execute(&self, sql: &str) -> Result<(), DbError> {
        debug!(sql, "MySQL execute");
        let mut conn = self.pool.get_conn().await?;
        conn.query_drop(sql).await?;
        Ok(())
    }

    async fn count(&self, sql: &str, params: &[Value]) -> Result<u64, DbError> {
        let rows = self.query(sql, params).await?;
        match rows.first() {
            Some(row) => count_at(row, 0),
            None => Err(DbError::Decode("count query returned no rows".into())),
        }
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
impl DataStoreConnector for MySqlConnector {
    fn kind(&self) -> DatabaseKind {
        DatabaseKind::MySql
    }

    async fn table_exists(&self, table: &str) -> Result<bool, DbError> {
        let (sql, params) = self.generator().table_exists(&TableName::parse(table)?);
        Ok(self.count(&sql, &params).await? > 0)
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
        rows.iter()
            .map(|row| match value_at(row, 0)? {
                Value::String(name) => Ok(name),
                other => Err(DbError::Decode(format!("unexpected column name {other:?}"))),
            })
            .collect()
    }

    async fn row_count(&self, table: &str) -> Result<u64, DbError> {
        let (sql, params) = self.generator().count(&TableName::parse(table)?, None, None);
        self.count(&sql, &params).await
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
        self.count(&sql, &params).await
    }

    async fn max_primary_key(
        &self,
        table: &str,
        primary_key: &str,
    ) -> Result<Option<Value>, DbError> {
        let sql = self.generator().max(&TableName::parse(table)?, primary_key);
        let value = first_value(&self.query(&sql, &[]).await?)?;
        Ok(if value.is_null() { None } else { Some(value) })
    }

    async fn distinct_primary_key(&self, table: &str, primary_key: &str) -> Result<bool, DbError> {
        let sql = self
            .generator()
            .distinct_counts(&TableName::parse(table)?, primary_key);
        let rows = self.query(&sql, &[]).await?;
        let row = rows
            .first()
            .ok_or_else(|| DbError::Decode("distinct query returned no rows".into()))?;
        Ok(count_at(row, 0)? == count_at(row, 1)?)
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

        let mut conn = self.pool.get_conn().await?;

        // DDL commits implicitly in MySQL, so the table is created up front.
        if create {
            let ddl = generator.create_table(&name, &columns);
            info!(table, "Creating destination table");
            conn.query_drop(ddl).await?;
        }

        let mut tx = conn.start_transaction(TxOpts::default()).await?;
        for batch in rows.chunks(per_statement) {
            let (sql, params) = generator.insert_batch(&name, &names, batch);
            let bindings = MySqlParamStore::from_values(&params);
            tx.exec_drop(sql, bindings.params()).await?;
        }
        tx.commit().await?;

        debug!(table, rows = rows.len(), "Appended rows");
        Ok(rows.len() as u64)
    }
}
