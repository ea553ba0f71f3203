use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};
use std::{borrow::Cow, collections::HashMap, fmt};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum DataType {
    Short,
    Int,
    Long,
    LongUnsigned,
    Float,
    Double,
    Decimal,
    Boolean,
    Char,
    VarChar,
    String,
    Json,
    Uuid,
    Bytea,
    Date,
    Time,
    Timestamp,
    TimestampTz,
    Null,
    Custom(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SqlDialect {
    MySql,
    Postgres,
}

lazy_static! {
    static ref POSTGRES_TYPE_MAP: HashMap<&'static str, DataType> = build_postgres_type_map();
}

impl DataType {
    pub fn from_postgres_type(type_name: &str) -> Result<Self, String> {
        let normalized = Self::normalize_type_name(type_name);
        POSTGRES_TYPE_MAP
            .get(normalized.as_str())
            .cloned()
            .ok_or_else(|| format!("Unknown Postgres column type: {type_name}"))
    }

    pub fn mysql_name(&self) -> Cow<'_, str> {
        match self {
            DataType::Short => Cow::Borrowed("SMALLINT"),
            DataType::Int => Cow::Borrowed("INT"),
            DataType::Long => Cow::Borrowed("BIGINT"),
            DataType::LongUnsigned => Cow::Borrowed("BIGINT UNSIGNED"),
            DataType::Float => Cow::Borrowed("FLOAT"),
            DataType::Double => Cow::Borrowed("DOUBLE"),
            DataType::Decimal => Cow::Borrowed("DECIMAL(65, 30)"),
            DataType::Boolean => Cow::Borrowed("BOOLEAN"),
            // Source lengths are not carried on the row, so text stays unbounded.
            DataType::Char | DataType::VarChar => Cow::Borrowed("TEXT"),
            DataType::String => Cow::Borrowed("TEXT"),
            DataType::Json => Cow::Borrowed("JSON"),
            DataType::Uuid => Cow::Borrowed("CHAR(36)"),
            DataType::Bytea => Cow::Borrowed("BLOB"),
            DataType::Date => Cow::Borrowed("DATE"),
            DataType::Time => Cow::Borrowed("TIME"),
            DataType::Timestamp | DataType::TimestampTz => Cow::Borrowed("DATETIME(6)"),
            // A column whose first value is NULL has no better guess.
            DataType::Null => Cow::Borrowed("TEXT"),
            DataType::Custom(name) => Cow::Borrowed(name),
        }
    }

    pub fn postgres_name(&self) -> Cow<'_, str> {
        match self {
            DataType::Short => Cow::Borrowed("SMALLINT"),
            DataType::Int => Cow::Borrowed("INTEGER"),
            DataType::Long => Cow::Borrowed("BIGINT"),
            DataType::LongUnsigned => Cow::Borrowed("NUMERIC(20, 0)"),
            DataType::Float => Cow::Borrowed("REAL"),
            DataType::Double => Cow::Borrowed("DOUBLE PRECISION"),
            DataType::Decimal => Cow::Borrowed("NUMERIC"),
            DataType::Boolean => Cow::Borrowed("BOOLEAN"),
            DataType::Char => Cow::Borrowed("TEXT"),
            DataType::VarChar => Cow::Borrowed("VARCHAR"),
            DataType::String => Cow::Borrowed("TEXT"),
            DataType::Json => Cow::Borrowed("JSONB"),
            DataType::Uuid => Cow::Borrowed("UUID"),
            DataType::Bytea => Cow::Borrowed("BYTEA"),
            DataType::Date => Cow::Borrowed("DATE"),
            DataType::Time => Cow::Borrowed("TIME"),
            DataType::Timestamp => Cow::Borrowed("TIMESTAMP"),
            DataType::TimestampTz => Cow::Borrowed("TIMESTAMPTZ"),
            DataType::Null => Cow::Borrowed("TEXT"),
            DataType::Custom(name) => Cow::Borrowed(name),
        }
    }

    pub fn name(&self, dialect: SqlDialect) -> Cow<'_, str> {
        match dialect {
            SqlDialect::MySql => self.mysql_name(),
            SqlDialect::Postgres => self.postgres_name(),
        }
    }

    fn normalize_type_name(type_name: &str) -> String {
        type_name.trim().to_uppercase()
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.postgres_name())
    }
}

fn build_postgres_type_map() -> HashMap<&'static str, DataType> {
    use DataType::*;

    let entries = [
        ("BOOL", Boolean),
        ("INT2", Short),
        ("INT4", Int),
        ("INT8", Long),
        ("OID", Long),
        ("FLOAT4", Float),
        ("FLOAT8", Double),
        ("NUMERIC", Decimal),
        ("JSON", Json),
        ("JSONB", Json),
        ("TEXT", String),
        ("NAME", String),
        ("XML", String),
        ("VARCHAR", VarChar),
        ("BPCHAR", Char),
        ("CHAR", Char),
        ("UUID", Uuid),
        ("BYTEA", Bytea),
        ("DATE", Date),
        ("TIME", Time),
        ("TIMESTAMP", Timestamp),
        ("TIMESTAMPTZ", TimestampTz),
    ];

    entries.into_iter().collect()
}
