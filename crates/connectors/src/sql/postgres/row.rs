use crate::sql::base::error::DbError;
use bigdecimal::BigDecimal;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use model::{
    core::{
        data_type::DataType,
        value::{FieldValue, Value},
    },
    records::row::RowData,
};
use rust_decimal::Decimal as RustDecimal;
use std::str::FromStr;
use tokio_postgres::{Row, types::Type};
use uuid::Uuid;

/// Decodes a Postgres row into the shared row model, column by column.
pub fn to_row_data(row: &Row, table: &str) -> Result<RowData, DbError> {
    let field_values = row
        .columns()
        .iter()
        .enumerate()
        .map(|(idx, column)| {
            let ty = column.type_();
            let data_type = DataType::from_postgres_type(ty.name())
                .unwrap_or_else(|_| DataType::Custom(ty.name().to_string()));
            let value = decode(row, idx, ty)?;
            Ok(FieldValue {
                name: column.name().to_string(),
                value: value.filter(|v| !v.is_null()),
                data_type,
            })
        })
        .collect::<Result<Vec<_>, DbError>>()?;

    Ok(RowData::new(table, field_values))
}

/// Reads the first column of the first row as a count.
pub fn first_count(rows: &[Row]) -> Result<u64, DbError> {
    let row = rows
        .first()
        .ok_or_else(|| DbError::Decode("count query returned no rows".into()))?;
    let count: i64 = row.try_get(0)?;
    u64::try_from(count).map_err(|_| DbError::Decode(format!("negative count {count}")))
}

pub fn decode(row: &Row, idx: usize, ty: &Type) -> Result<Option<Value>, DbError> {
    let value = match *ty {
        Type::BOOL => row.try_get::<_, Option<bool>>(idx)?.map(Value::Boolean),
        Type::INT2 => row
            .try_get::<_, Option<i16>>(idx)?
            .map(|v| Value::Int(v.into())),
        Type::INT4 => row
            .try_get::<_, Option<i32>>(idx)?
            .map(|v| Value::Int(v.into())),
        Type::INT8 => row.try_get::<_, Option<i64>>(idx)?.map(Value::Int),
        Type::OID => row
            .try_get::<_, Option<u32>>(idx)?
            .map(|v| Value::Int(v.into())),
        Type::FLOAT4 => row
            .try_get::<_, Option<f32>>(idx)?
            .map(|v| Value::Float(v.into())),
        Type::FLOAT8 => row.try_get::<_, Option<f64>>(idx)?.map(Value::Float),
        Type::NUMERIC => match row.try_get::<_, Option<RustDecimal>>(idx)? {
            Some(v) => Some(Value::Decimal(
                BigDecimal::from_str(&v.to_string()).map_err(|e| DbError::Decode(e.to_string()))?,
            )),
            None => None,
        },
        Type::TEXT | Type::VARCHAR | Type::BPCHAR | Type::NAME | Type::UNKNOWN => {
            row.try_get::<_, Option<String>>(idx)?.map(Value::String)
        }
        Type::JSON | Type::JSONB => row
            .try_get::<_, Option<serde_json::Value>>(idx)?
            .map(Value::Json),
        Type::UUID => row.try_get::<_, Option<Uuid>>(idx)?.map(Value::Uuid),
        Type::BYTEA => row.try_get::<_, Option<Vec<u8>>>(idx)?.map(Value::Bytes),
        Type::DATE => row.try_get::<_, Option<NaiveDate>>(idx)?.map(Value::Date),
        Type::TIME => row.try_get::<_, Option<NaiveTime>>(idx)?.map(Value::Time),
        Type::TIMESTAMP => row
            .try_get::<_, Option<NaiveDateTime>>(idx)?
            .map(Value::TimestampNaive),
        Type::TIMESTAMPTZ => row
            .try_get::<_, Option<DateTime<Utc>>>(idx)?
            .map(Value::Timestamp),
        _ => row
            .try_get::<_, Option<String>>(idx)
            .map_err(|_| DbError::Decode(format!("unsupported Postgres type {}", ty.name())))?
            .map(Value::String),
    };
    Ok(value)
}
