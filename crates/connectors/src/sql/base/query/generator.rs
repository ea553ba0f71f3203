use crate::sql::base::{
    dialect::{Dialect, TableName},
    requests::FetchRowsRequest,
};
use model::{
    core::{data_type::DataType, value::Value},
    pagination::cursor::Cursor,
    records::row::RowData,
};

/// Renders the statements a SQL connector needs, with parameters kept
/// separate from the SQL text.
pub struct QueryGenerator<'a> {
    dialect: &'a dyn Dialect,
}

impl<'a> QueryGenerator<'a> {
    pub fn new(dialect: &'a dyn Dialect) -> Self {
        Self { dialect }
    }

    /// Returns a `COUNT(*)` that is non-zero when the table exists.
    pub fn table_exists(&self, table: &TableName) -> (String, Vec<Value>) {
        let sql = format!(
            "SELECT COUNT(*) FROM information_schema.tables WHERE table_schema = COALESCE({}, {}) AND table_name = {}",
            self.dialect.get_text_placeholder(0),
            self.dialect.current_schema(),
            self.dialect.get_text_placeholder(1),
        );
        (sql, Self::schema_params(table))
    }

    pub fn columns(&self, table: &TableName) -> (String, Vec<Value>) {
        let sql = format!(
            "SELECT {} FROM information_schema.columns WHERE table_schema = COALESCE({}, {}) AND table_name = {} ORDER BY ordinal_position",
            self.dialect.cast_text("column_name"),
            self.dialect.get_text_placeholder(0),
            self.dialect.current_schema(),
            self.dialect.get_text_placeholder(1),
        );
        (sql, Self::schema_params(table))
    }

    pub fn drop_table(&self, table: &TableName) -> String {
        format!("DROP TABLE IF EXISTS {}", table.render(self.dialect))
    }

    pub fn truncate_table(&self, table: &TableName) -> String {
        format!("TRUNCATE TABLE {}", table.render(self.dialect))
    }

    /// Counts all rows, or only those strictly above `cutoff` on `column`.
    pub fn count(
        &self,
        table: &TableName,
        column: Option<&str>,
        cutoff: Option<&Value>,
    ) -> (String, Vec<Value>) {
        let mut sql = format!("SELECT COUNT(*) FROM {}", table.render(self.dialect));
        let mut params = Vec::new();
        if let (Some(column), Some(cutoff)) = (column, cutoff) {
            sql.push_str(&format!(
                " WHERE {} > {}",
                self.dialect.quote_identifier(column),
                self.dialect.get_placeholder(0)
            ));
            params.push(cutoff.clone());
        }
        (sql, params)
    }

    /// Generates a SQL SELECT statement and its parameters.
    pub fn select(&self, request: &FetchRowsRequest) -> (String, Vec<Value>) {
        let mut sql = format!("SELECT * FROM {}", request.table.render(self.dialect));
        let mut params = Vec::new();

        let offset = match &request.cursor {
            Cursor::Offset { offset, order_by } => {
                if let Some(column) = order_by {
                    sql.push_str(&format!(
                        " ORDER BY {}",
                        self.dialect.quote_identifier(column)
                    ));
                }
                *offset
            }
            Cursor::Watermark {
                column,
                after,
                offset,
            } => {
                let column = self.dialect.quote_identifier(column);
                if let Some(after) = after {
                    sql.push_str(&format!(
                        " WHERE {column} > {}",
                        self.dialect.get_placeholder(0)
                    ));
                    params.push(after.clone());
                }
                sql.push_str(&format!(" ORDER BY {column}"));
                *offset
            }
        };

        sql.push_str(&format!(" LIMIT {} OFFSET {}", request.limit, offset));
        (sql, params)
    }

    pub fn max(&self, table: &TableName, column: &str) -> String {
        format!(
            "SELECT MAX({}) FROM {}",
            self.dialect.quote_identifier(column),
            table.render(self.dialect)
        )
    }

    /// Total and distinct counts of `column`; the key is distinct when they match.
    pub fn distinct_counts(&self, table: &TableName, column: &str) -> String {
        format!(
            "SELECT COUNT(*), COUNT(DISTINCT {}) FROM {}",
            self.dialect.quote_identifier(column),
            table.render(self.dialect)
        )
    }

    pub fn create_table(&self, table: &TableName, columns: &[(String, DataType)]) -> String {
        let defs = columns
            .iter()
            .map(|(name, data_type)| {
                format!(
                    "{} {}",
                    self.dialect.quote_identifier(name),
                    data_type.name(self.dialect.sql_dialect())
                )
            })
            .collect::<Vec<_>>()
            .join(", ");
        format!(
            "CREATE TABLE IF NOT EXISTS {} ({defs})",
            table.render(self.dialect)
        )
    }

    /// Multi-row INSERT; values follow `columns`, missing fields become NULL.
    pub fn insert_batch(
        &self,
        table: &TableName,
        columns: &[String],
        rows: &[RowData],
    ) -> (String, Vec<Value>) {
        if rows.is_empty() || columns.is_empty() {
            return (String::new(), Vec::new());
        }

        let col_list = columns
            .iter()
            .map(|c| self.dialect.quote_identifier(c))
            .collect::<Vec<_>>()
            .join(", ");

        let mut params = Vec::with_capacity(rows.len() * columns.len());
        let mut tuples = Vec::with_capacity(rows.len());
        for row in rows {
            let placeholders = columns
                .iter()
                .map(|col| {
                    let placeholder = self.dialect.get_placeholder(params.len());
                    params.push(row.get_value(col));
                    placeholder
                })
                .collect::<Vec<_>>()
                .join(", ");
            tuples.push(format!("({placeholders})"));
        }

        let sql = format!(
            "INSERT INTO {} ({col_list}) VALUES {}",
            table.render(self.dialect),
            tuples.join(", ")
        );
        (sql, params)
    }

    /// Rows per INSERT so a statement stays under the bind-parameter limit.
    pub fn rows_per_insert(&self, column_count: usize, requested: usize) -> usize {
        let cap = self.dialect.max_bind_params() / column_count.max(1);
        requested.min(cap).max(1)
    }

    fn schema_params(table: &TableName) -> Vec<Value> {
        vec![
            table
                .schema
                .clone()
                .map(Value::String)
                .unwrap_or(Value::Null),
            Value::String(table.name.clone()),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sql::base::{
        dialect::{MySql, Postgres},
        requests::FetchRowsRequestBuilder,
    };

    fn table(name: &str) -> TableName {
        TableName::parse(name).unwrap()
    }

    #[test]
    fn test_select_offset_ordered() {
        let generator = QueryGenerator::new(&Postgres);
        let request = FetchRowsRequestBuilder::new(table("users"))
            .cursor(Cursor::Offset {
                offset: 200,
                order_by: Some("id".into()),
            })
            .limit(100)
            .build();

        let (sql, params) = generator.select(&request);
        assert_eq!(
            sql,
            r#"SELECT * FROM "users" ORDER BY "id" LIMIT 100 OFFSET 200"#
        );
        assert!(params.is_empty());
    }

    #[test]
    fn test_select_watermark() {
        let generator = QueryGenerator::new(&MySql);
        let request = FetchRowsRequestBuilder::new(table("shop.orders"))
            .cursor(Cursor::Watermark {
                column: "id".into(),
                after: Some(Value::Int(42)),
                offset: 10,
            })
            .limit(5)
            .build();

        let (sql, params) = generator.select(&request);
        assert_eq!(
            sql,
            "SELECT * FROM `shop`.`orders` WHERE `id` > ? ORDER BY `id` LIMIT 5 OFFSET 10"
        );
        assert_eq!(params, vec![Value::Int(42)]);
    }

    #[test]
    fn test_select_watermark_without_cutoff() {
        let generator = QueryGenerator::new(&Postgres);
        let request = FetchRowsRequestBuilder::new(table("orders"))
            .cursor(Cursor::Watermark {
                column: "id".into(),
                after: None,
                offset: 0,
            })
            .limit(5)
            .build();

        let (sql, params) = generator.select(&request);
        assert_eq!(sql, r#"SELECT * FROM "orders" ORDER BY "id" LIMIT 5 OFFSET 0"#);
        assert!(params.is_empty());
    }

    #[test]
    fn test_count_with_cutoff() {
        let generator = QueryGenerator::new(&Postgres);
        let (sql, params) = generator.count(&table("orders"), Some("id"), Some(&Value::Int(7)));
        assert_eq!(sql, r#"SELECT COUNT(*) FROM "orders" WHERE "id" > $1"#);
        assert_eq!(params, vec![Value::Int(7)]);

        let (sql, params) = generator.count(&table("orders"), Some("id"), None);
        assert_eq!(sql, r#"SELECT COUNT(*) FROM "orders""#);
        assert!(params.is_empty());
    }

    #[test]
    fn test_table_exists_binds_schema() {
        let generator = QueryGenerator::new(&Postgres);
        let (sql, params) = generator.table_exists(&table("users"));
        assert!(sql.contains("COALESCE($1::text, current_schema())"));
        assert!(sql.contains("table_name = $2::text"));
        assert_eq!(params, vec![Value::Null, Value::String("users".into())]);
    }

    #[test]
    fn test_insert_batch_numbers_placeholders() {
        let generator = QueryGenerator::new(&Postgres);
        let rows = vec![
            RowData::from_pairs("src", [("pk", Value::Int(1)), ("v", Value::from("a"))]),
            RowData::from_pairs("src", [("pk", Value::Int(2))]),
        ];
        let columns = vec!["pk".to_string(), "v".to_string()];

        let (sql, params) = generator.insert_batch(&table("dst"), &columns, &rows);
        assert_eq!(
            sql,
            r#"INSERT INTO "dst" ("pk", "v") VALUES ($1, $2), ($3, $4)"#
        );
        assert_eq!(
            params,
            vec![Value::Int(1), Value::from("a"), Value::Int(2), Value::Null]
        );
    }

    #[test]
    fn test_create_table_uses_dialect_types() {
        let generator = QueryGenerator::new(&MySql);
        let sql = generator.create_table(
            &table("dst"),
            &[
                ("pk".to_string(), DataType::Long),
                ("payload".to_string(), DataType::Json),
            ],
        );
        assert_eq!(
            sql,
            "CREATE TABLE IF NOT EXISTS `dst` (`pk` BIGINT, `payload` JSON)"
        );
    }

    #[test]
    fn test_rows_per_insert_caps_params() {
        let generator = QueryGenerator::new(&Postgres);
        assert_eq!(generator.rows_per_insert(10, 1000), 1000);
        assert_eq!(generator.rows_per_insert(100, 1000), 655);
        assert_eq!(generator.rows_per_insert(0, 0), 1);
    }
}
