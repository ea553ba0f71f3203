use crate::sql::base::error::DbError;
use bigdecimal::BigDecimal;
use chrono::{NaiveDate, NaiveTime};
use model::{
    core::{
        data_type::DataType,
        value::{FieldValue, Value},
    },
    records::row::RowData,
};
use mysql_async::{
    Column, Row, Value as MySqlValue,
    consts::{ColumnFlags, ColumnType},
};
use std::str::FromStr;

/// Collation id MySQL reports for binary strings.
const BINARY_CHARSET: u16 = 63;

pub fn to_row_data(row: &Row, table: &str) -> Result<RowData, DbError> {
    let field_values = row
        .columns_ref()
        .iter()
        .enumerate()
        .map(|(idx, column)| {
            let value = match row.as_ref(idx) {
                Some(raw) => decode(raw, column)?,
                None => Value::Null,
            };
            Ok(FieldValue {
                name: column.name_str().into_owned(),
                value: if value.is_null() { None } else { Some(value) },
                data_type: column_data_type(column),
            })
        })
        .collect::<Result<Vec<_>, DbError>>()?;

    Ok(RowData::new(table, field_values))
}

/// Value of the first column of the first row, `Null` when there is none.
pub fn first_value(rows: &[Row]) -> Result<Value, DbError> {
    match rows.first() {
        Some(row) => value_at(row, 0),
        None => Ok(Value::Null),
    }
}

pub fn value_at(row: &Row, idx: usize) -> Result<Value, DbError> {
    match (row.as_ref(idx), row.columns_ref().get(idx)) {
        (Some(raw), Some(column)) => decode(raw, column),
        _ => Ok(Value::Null),
    }
}

pub fn count_at(row: &Row, idx: usize) -> Result<u64, DbError> {
    match row.as_ref(idx) {
        Some(MySqlValue::Int(v)) => u64::try_from(*v).map_err(|e| DbError::Decode(e.to_string())),
        Some(MySqlValue::UInt(v)) => Ok(*v),
        Some(MySqlValue::Bytes(b)) => String::from_utf8_lossy(b)
            .parse()
            .map_err(|_| DbError::Decode("count is not a number".into())),
        other => Err(DbError::Decode(format!("unexpected count value {other:?}"))),
    }
}

pub fn decode(raw: &MySqlValue, column: &Column) -> Result<Value, DbError> {
    let column_type = column.column_type();
    let value = match raw {
        MySqlValue::NULL => Value::Null,
        MySqlValue::Int(v) if is_boolean(column) => Value::Boolean(*v != 0),
        MySqlValue::Int(v) => Value::Int(*v),
        MySqlValue::UInt(v) => Value::Uint(*v),
        MySqlValue::Float(v) => Value::Float(f64::from(*v)),
        MySqlValue::Double(v) => Value::Float(*v),
        MySqlValue::Bytes(bytes) => decode_bytes(bytes, column)?,
        MySqlValue::Date(y, m, d, h, mi, s, us) => {
            let date = NaiveDate::from_ymd_opt(i32::from(*y), u32::from(*m), u32::from(*d))
                .ok_or_else(|| DbError::Decode(format!("invalid date {y}-{m}-{d}")))?;
            if column_type == ColumnType::MYSQL_TYPE_DATE {
                Value::Date(date)
            } else {
                let ts = date
                    .and_hms_micro_opt(u32::from(*h), u32::from(*mi), u32::from(*s), *us)
                    .ok_or_else(|| DbError::Decode(format!("invalid time {h}:{mi}:{s}")))?;
                Value::TimestampNaive(ts)
            }
        }
        MySqlValue::Time(negative, days, h, m, s, us) => {
            match (negative, days) {
                (false, 0) => NaiveTime::from_hms_micro_opt(
                    u32::from(*h),
                    u32::from(*m),
                    u32::from(*s),
                    *us,
                )
                .map(Value::Time)
                .ok_or_else(|| DbError::Decode(format!("invalid time {h}:{m}:{s}")))?,
                // Durations outside a day keep MySQL's textual form.
                _ => {
                    let sign = if *negative { "-" } else { "" };
                    let hours = u32::from(*h) + days * 24;
                    Value::String(format!("{sign}{hours:02}:{m:02}:{s:02}.{us:06}"))
                }
            }
        }
    };
    Ok(value)
}

fn decode_bytes(bytes: &[u8], column: &Column) -> Result<Value, DbError> {
    let value = match column.column_type() {
        ColumnType::MYSQL_TYPE_DECIMAL | ColumnType::MYSQL_TYPE_NEWDECIMAL => {
            let text = String::from_utf8_lossy(bytes);
            Value::Decimal(
                BigDecimal::from_str(&text).map_err(|e| DbError::Decode(e.to_string()))?,
            )
        }
        ColumnType::MYSQL_TYPE_JSON => Value::Json(
            serde_json::from_slice(bytes).map_err(|e| DbError::Decode(e.to_string()))?,
        ),
        _ if is_binary(column) => Value::Bytes(bytes.to_vec()),
        _ => match String::from_utf8(bytes.to_vec()) {
            Ok(text) => Value::String(text),
            Err(err) => Value::Bytes(err.into_bytes()),
        },
    };
    Ok(value)
}

fn is_boolean(column: &Column) -> bool {
    column.column_type() == ColumnType::MYSQL_TYPE_TINY && column.column_length() == 1
}

fn is_binary(column: &Column) -> bool {
    column.character_set() == BINARY_CHARSET
        && !matches!(
            column.column_type(),
            ColumnType::MYSQL_TYPE_DECIMAL
                | ColumnType::MYSQL_TYPE_NEWDECIMAL
                | ColumnType::MYSQL_TYPE_JSON
        )
}

pub fn column_data_type(column: &Column) -> DataType {
    let unsigned = column.flags().contains(ColumnFlags::UNSIGNED_FLAG);
    match column.column_type() {
        ColumnType::MYSQL_TYPE_TINY if is_boolean(column) => DataType::Boolean,
        ColumnType::MYSQL_TYPE_TINY | ColumnType::MYSQL_TYPE_SHORT | ColumnType::MYSQL_TYPE_YEAR => {
            DataType::Short
        }
        ColumnType::MYSQL_TYPE_INT24 | ColumnType::MYSQL_TYPE_LONG => DataType::Int,
        ColumnType::MYSQL_TYPE_LONGLONG if unsigned => DataType::LongUnsigned,
        ColumnType::MYSQL_TYPE_LONGLONG => DataType::Long,
        ColumnType::MYSQL_TYPE_FLOAT => DataType::Float,
        ColumnType::MYSQL_TYPE_DOUBLE => DataType::Double,
        ColumnType::MYSQL_TYPE_DECIMAL | ColumnType::MYSQL_TYPE_NEWDECIMAL => DataType::Decimal,
        ColumnType::MYSQL_TYPE_JSON => DataType::Json,
        ColumnType::MYSQL_TYPE_DATE => DataType::Date,
        ColumnType::MYSQL_TYPE_TIME => DataType::Time,
        ColumnType::MYSQL_TYPE_DATETIME | ColumnType::MYSQL_TYPE_TIMESTAMP => DataType::Timestamp,
        ColumnType::MYSQL_TYPE_NULL => DataType::Null,
        _ if is_binary(column) => DataType::Bytea,
        ColumnType::MYSQL_TYPE_VARCHAR | ColumnType::MYSQL_TYPE_VAR_STRING => DataType::VarChar,
        ColumnType::MYSQL_TYPE_STRING => DataType::Char,
        ColumnType::MYSQL_TYPE_TINY_BLOB
        | ColumnType::MYSQL_TYPE_BLOB
        | ColumnType::MYSQL_TYPE_MEDIUM_BLOB
        | ColumnType::MYSQL_TYPE_LONG_BLOB => DataType::String,
        other => DataType::Custom(format!("{other:?}")),
    }
}
