use crate::sql::base::error::DbError;
use bigdecimal::ToPrimitive;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use model::core::value::Value;
use rust_decimal::{Decimal as RustDecimal, prelude::FromPrimitive};
use std::str::FromStr;
use tokio_postgres::types::{Json as PgJson, ToSql, Type};
use uuid::Uuid;

/// A bind parameter converted to the Rust type the server expects for its
/// placeholder. tokio-postgres checks types strictly, so an `i64` cannot be
/// bound to an `int4` column without this step.
pub struct PgParam(Box<dyn ToSql + Sync + Send>);

impl PgParam {
    pub fn coerce(value: &Value, ty: &Type) -> Result<Self, DbError> {
        let param = match *ty {
            Type::BOOL => Self::typed(convert(value, ty, as_bool)?),
            Type::INT2 => Self::typed(convert(value, ty, |v| {
                v.as_i64().and_then(|i| i16::try_from(i).ok())
            })?),
            Type::INT4 => Self::typed(convert(value, ty, |v| {
                v.as_i64().and_then(|i| i32::try_from(i).ok())
            })?),
            Type::INT8 => Self::typed(convert(value, ty, Value::as_i64)?),
            Type::FLOAT4 => Self::typed(convert(value, ty, |v| as_f64(v).map(|f| f as f32))?),
            Type::FLOAT8 => Self::typed(convert(value, ty, as_f64)?),
            Type::NUMERIC => Self::typed(convert(value, ty, as_rust_decimal)?),
            Type::TEXT | Type::VARCHAR | Type::BPCHAR | Type::NAME | Type::UNKNOWN => {
                Self::typed(convert(value, ty, as_text)?)
            }
            Type::JSON | Type::JSONB => Self::typed(convert(value, ty, as_json)?.map(PgJson)),
            Type::UUID => Self::typed(convert(value, ty, as_uuid)?),
            Type::BYTEA => Self::typed(convert(value, ty, as_bytes)?),
            Type::DATE => Self::typed(convert(value, ty, as_date)?),
            Type::TIME => Self::typed(convert(value, ty, as_time)?),
            Type::TIMESTAMP => Self::typed(convert(value, ty, as_naive_timestamp)?),
            Type::TIMESTAMPTZ => Self::typed(convert(value, ty, as_timestamp)?),
            _ => Self::natural(value),
        };
        Ok(param)
    }

    /// Binding for server types without a dedicated conversion.
    fn natural(value: &Value) -> Self {
        match value.clone() {
            Value::Int(v) => Self::typed(Some(v)),
            Value::Uint(v) => Self::typed(i64::try_from(v).ok()),
            Value::Float(v) => Self::typed(Some(v)),
            Value::Decimal(v) => Self::typed(RustDecimal::from_str(&v.to_string()).ok()),
            Value::String(v) => Self::typed(Some(v)),
            Value::Boolean(v) => Self::typed(Some(v)),
            Value::Json(v) => Self::typed(Some(PgJson(v))),
            Value::Uuid(v) => Self::typed(Some(v)),
            Value::Bytes(v) => Self::typed(Some(v)),
            Value::Date(v) => Self::typed(Some(v)),
            Value::Time(v) => Self::typed(Some(v)),
            Value::Timestamp(v) => Self::typed(Some(v)),
            Value::TimestampNaive(v) => Self::typed(Some(v)),
            Value::Null => Self::typed(Option::<String>::None),
        }
    }

    fn typed<T: ToSql + Sync + Send + 'static>(value: Option<T>) -> Self {
        PgParam(Box::new(value))
    }
}

impl AsRef<dyn ToSql + Sync> for PgParam {
    fn as_ref(&self) -> &(dyn ToSql + Sync + 'static) {
        &*self.0
    }
}

pub struct PgParamStore {
    pub params: Vec<PgParam>,
}

impl PgParamStore {
    /// Pairs each value with the type of its prepared-statement placeholder.
    pub fn coerce(values: &[Value], types: &[Type]) -> Result<Self, DbError> {
        if values.len() != types.len() {
            return Err(DbError::Write(format!(
                "statement expects {} parameters, got {}",
                types.len(),
                values.len()
            )));
        }

        let params = values
            .iter()
            .zip(types)
            .map(|(value, ty)| PgParam::coerce(value, ty))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { params })
    }

    pub fn as_refs(&self) -> Vec<&(dyn ToSql + Sync)> {
        self.params
            .iter()
            .map(|param| param.as_ref())
            .collect::<Vec<_>>()
    }
}

/// `Ok(None)` for NULL, otherwise the converted value or a `Write` error.
fn convert<T>(
    value: &Value,
    ty: &Type,
    f: impl FnOnce(&Value) -> Option<T>,
) -> Result<Option<T>, DbError> {
    if value.is_null() {
        return Ok(None);
    }
    f(value)
        .map(Some)
        .ok_or_else(|| DbError::Write(format!("cannot bind {value} as Postgres {ty}")))
}

fn as_bool(value: &Value) -> Option<bool> {
    match value {
        Value::Boolean(v) => Some(*v),
        Value::Int(v) => Some(*v != 0),
        Value::Uint(v) => Some(*v != 0),
        Value::String(v) => match v.to_ascii_lowercase().as_str() {
            "true" | "t" | "1" => Some(true),
            "false" | "f" | "0" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

fn as_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Float(v) => Some(*v),
        Value::Int(v) => Some(*v as f64),
        Value::Uint(v) => Some(*v as f64),
        Value::Decimal(v) => v.to_f64(),
        Value::String(v) => v.parse().ok(),
        _ => None,
    }
}

fn as_rust_decimal(value: &Value) -> Option<RustDecimal> {
    match value {
        Value::Float(v) => RustDecimal::from_f64(*v),
        Value::Int(_) | Value::Uint(_) | Value::Decimal(_) | Value::String(_) => {
            value.as_string().and_then(|s| RustDecimal::from_str(&s).ok())
        }
        _ => None,
    }
}

fn as_text(value: &Value) -> Option<String> {
    match value {
        Value::Bytes(bytes) => Some(String::from_utf8_lossy(bytes).into_owned()),
        other => other.as_string(),
    }
}

fn as_json(value: &Value) -> Option<serde_json::Value> {
    match value {
        Value::Json(v) => Some(v.clone()),
        Value::String(v) => {
            Some(serde_json::from_str(v).unwrap_or_else(|_| serde_json::Value::String(v.clone())))
        }
        Value::Int(v) => Some(serde_json::Value::from(*v)),
        Value::Uint(v) => Some(serde_json::Value::from(*v)),
        Value::Float(v) => Some(serde_json::Value::from(*v)),
        Value::Boolean(v) => Some(serde_json::Value::Bool(*v)),
        _ => None,
    }
}

fn as_uuid(value: &Value) -> Option<Uuid> {
    match value {
        Value::Uuid(v) => Some(*v),
        Value::String(v) => Uuid::parse_str(v).ok(),
        Value::Bytes(v) => Uuid::from_slice(v).ok(),
        _ => None,
    }
}

fn as_bytes(value: &Value) -> Option<Vec<u8>> {
    match value {
        Value::Bytes(v) => Some(v.clone()),
        Value::String(v) => Some(v.clone().into_bytes()),
        _ => None,
    }
}

fn as_date(value: &Value) -> Option<NaiveDate> {
    match value {
        Value::Date(v) => Some(*v),
        Value::TimestampNaive(v) => Some(v.date()),
        Value::Timestamp(v) => Some(v.date_naive()),
        Value::String(v) => NaiveDate::from_str(v).ok(),
        _ => None,
    }
}

fn as_time(value: &Value) -> Option<NaiveTime> {
    match value {
        Value::Time(v) => Some(*v),
        Value::String(v) => NaiveTime::from_str(v).ok(),
        _ => None,
    }
}

fn as_naive_timestamp(value: &Value) -> Option<NaiveDateTime> {
    match value {
        Value::TimestampNaive(v) => Some(*v),
        Value::Timestamp(v) => Some(v.naive_utc()),
        Value::Date(v) => v.and_hms_opt(0, 0, 0),
        Value::String(v) => NaiveDateTime::from_str(v).ok(),
        _ => None,
    }
}

fn as_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::Timestamp(v) => Some(*v),
        Value::TimestampNaive(v) => Some(v.and_utc()),
        Value::Date(v) => v.and_hms_opt(0, 0, 0).map(|dt| dt.and_utc()),
        Value::String(v) => DateTime::parse_from_rfc3339(v)
            .ok()
            .map(|dt| dt.with_timezone(&Utc)),
        _ => None,
    }
}
