//! PostgreSQL row to JSON conversion.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde_json::{json, Value};
use sqlx::postgres::{PgRow, Postgres};
use sqlx::types::Uuid;
use sqlx::{Column, Decode, Row, Type, TypeInfo};

/// All column values of `row`, in column order.
pub(crate) fn row_values(row: &PgRow) -> Vec<Value> {
    (0..row.len()).map(|index| column_value(row, index)).collect()
}

fn column_value(row: &PgRow, index: usize) -> Value {
    let column = &row.columns()[index];
    let type_name = column.type_info().name();

    let value = match type_name {
        "BOOL" => decode::<bool>(row, index).map(Value::Bool),
        "INT2" => decode::<i16>(row, index).map(|v| json!(v)),
        "INT4" => decode::<i32>(row, index).map(|v| json!(v)),
        "INT8" => decode::<i64>(row, index).map(|v| json!(v)),
        "FLOAT4" => decode::<f32>(row, index).map(|v| json!(v)),
        "FLOAT8" => decode::<f64>(row, index).map(|v| json!(v)),
        "TEXT" | "VARCHAR" | "BPCHAR" | "NAME" => {
            decode::<String>(row, index).map(Value::String)
        }
        "TIMESTAMPTZ" => decode::<DateTime<Utc>>(row, index).map(|v| Value::String(v.to_rfc3339())),
        "TIMESTAMP" => decode::<NaiveDateTime>(row, index).map(|v| Value::String(v.to_string())),
        "DATE" => decode::<NaiveDate>(row, index).map(|v| Value::String(v.to_string())),
        "TIME" => decode::<NaiveTime>(row, index).map(|v| Value::String(v.to_string())),
        "UUID" => decode::<Uuid>(row, index).map(|v| Value::String(v.to_string())),
        "JSON" | "JSONB" => decode::<Value>(row, index),
        other => {
            tracing::debug!(
                column = column.name(),
                type_name = other,
                "Unsupported column type, returning null"
            );
            None
        }
    };

    value.unwrap_or(Value::Null)
}

/// Decode a nullable column. SQL NULL and decode failures both yield `None`.
fn decode<'r, T>(row: &'r PgRow, index: usize) -> Option<T>
where
    T: Decode<'r, Postgres> + Type<Postgres>,
{
    match row.try_get::<Option<T>, _>(index) {
        Ok(value) => value,
        Err(e) => {
            tracing::debug!(index, error = %e, "Failed to decode column value");
            None
        }
    }
}
