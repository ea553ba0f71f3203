//! Database-specific SQL syntax.

use crate::sql::base::error::DbError;
use model::core::data_type::SqlDialect;

pub trait Dialect: Send + Sync {
    /// Wraps an identifier (like a table or column name) in the correct
    /// quotation marks for the dialect, doubling any embedded quote.
    ///
    /// - PostgreSQL uses double quotes: `"my_column"`
    /// - MySQL uses backticks: `` `my_column` ``
    fn quote_identifier(&self, ident: &str) -> String;

    /// Returns the placeholder for the zero-based parameter `index`.
    ///
    /// - PostgreSQL uses `$1`, `$2`, etc.
    /// - MySQL uses `?`
    fn get_placeholder(&self, index: usize) -> String;

    /// Placeholder whose parameter is always bound as text.
    fn get_text_placeholder(&self, index: usize) -> String {
        self.get_placeholder(index)
    }

    /// Casts `expr` to the dialect's plain text type.
    fn cast_text(&self, expr: &str) -> String;

    /// SQL expression yielding the schema unqualified names resolve to.
    fn current_schema(&self) -> &'static str;

    /// Upper bound on bind parameters in a single statement.
    fn max_bind_params(&self) -> usize;

    fn sql_dialect(&self) -> SqlDialect;
}

#[derive(Debug, Clone)]
pub struct Postgres;

impl Dialect for Postgres {
    fn quote_identifier(&self, ident: &str) -> String {
        format!(r#""{}""#, ident.replace('"', r#""""#))
    }

    fn get_placeholder(&self, index: usize) -> String {
        format!("${}", index + 1)
    }

    fn get_text_placeholder(&self, index: usize) -> String {
        format!("${}::text", index + 1)
    }

    fn cast_text(&self, expr: &str) -> String {
        format!("{expr}::text")
    }

    fn current_schema(&self) -> &'static str {
        "current_schema()"
    }

    fn max_bind_params(&self) -> usize {
        u16::MAX as usize
    }

    fn sql_dialect(&self) -> SqlDialect {
        SqlDialect::Postgres
    }
}

#[derive(Debug, Clone)]
pub struct MySql;

impl Dialect for MySql {
    fn quote_identifier(&self, ident: &str) -> String {
        format!("`{}`", ident.replace('`', "``"))
    }

    fn get_placeholder(&self, _index: usize) -> String {
        "?".into()
    }

    fn cast_text(&self, expr: &str) -> String {
        format!("CAST({expr} AS CHAR)")
    }

    fn current_schema(&self) -> &'static str {
        "DATABASE()"
    }

    fn max_bind_params(&self) -> usize {
        u16::MAX as usize
    }

    fn sql_dialect(&self) -> SqlDialect {
        SqlDialect::MySql
    }
}

/// A possibly schema-qualified table name, parsed from `schema.table`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableName {
    pub schema: Option<String>,
    pub name: String,
}

impl TableName {
    pub fn parse(raw: &str) -> Result<Self, DbError> {
        let parts: Vec<&str> = raw.split('.').map(str::trim).collect();
        match parts.as_slice() {
            [name] if !name.is_empty() => Ok(TableName {
                schema: None,
                name: name.to_string(),
            }),
            [schema, name] if !schema.is_empty() && !name.is_empty() => Ok(TableName {
                schema: Some(schema.to_string()),
                name: name.to_string(),
            }),
            _ => Err(DbError::InvalidIdentifier(raw.to_string())),
        }
    }

    pub fn render(&self, dialect: &dyn Dialect) -> String {
        match &self.schema {
            Some(schema) => format!(
                "{}.{}",
                dialect.quote_identifier(schema),
                dialect.quote_identifier(&self.name)
            ),
            None => dialect.quote_identifier(&self.name),
        }
    }
}
