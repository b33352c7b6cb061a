//! The dynamically typed value that flows across the driver boundary.
//!
//! Grounded on `tank_core::Value`, trimmed to the variants the bridge
//! itself needs to move column values and bind parameters around. Unlike
//! `tank_core::Value`, each variant is not itself `Option`-wrapped: absence
//! is represented by [`Value::Null`] and surfaced to callers through the
//! row adapter's `was_null` flag (spec §4.2), not by matching on `None`
//! inside every variant.

use rust_decimal::Decimal;
use time::{Date, OffsetDateTime, PrimitiveDateTime, Time};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Boolean(bool),
    Int32(i32),
    Int64(i64),
    Float64(f64),
    Decimal(Decimal),
    Varchar(String),
    Blob(Vec<u8>),
    /// Zone-less date. Drivers that only understand JDBC-style temporal
    /// classes are expected to substitute into this local representation
    /// (spec §4.2).
    Date(Date),
    Time(Time),
    Timestamp(PrimitiveDateTime),
    TimestampWithTimezone(OffsetDateTime),
    Uuid(Uuid),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn column_type(&self) -> ColumnType {
        match self {
            Value::Null => ColumnType::Unknown,
            Value::Boolean(..) => ColumnType::Boolean,
            Value::Int32(..) => ColumnType::Int32,
            Value::Int64(..) => ColumnType::Int64,
            Value::Float64(..) => ColumnType::Float64,
            Value::Decimal(..) => ColumnType::Decimal,
            Value::Varchar(..) => ColumnType::Varchar,
            Value::Blob(..) => ColumnType::Blob,
            Value::Date(..) => ColumnType::Date,
            Value::Time(..) => ColumnType::Time,
            Value::Timestamp(..) => ColumnType::Timestamp,
            Value::TimestampWithTimezone(..) => ColumnType::TimestampWithTimezone,
            Value::Uuid(..) => ColumnType::Uuid,
        }
    }
}

/// The inferred column type exposed by row metadata (spec §4.2).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColumnType {
    Boolean,
    Int32,
    Int64,
    Float64,
    Decimal,
    Varchar,
    Blob,
    Date,
    Time,
    Timestamp,
    TimestampWithTimezone,
    Uuid,
    /// Driver exposed no native type name and none could be derived.
    Unknown,
    /// A type name the driver reported but this crate does not model
    /// natively; carried through so dialect-specific renderers can still
    /// make use of it.
    Named(String),
}

impl ColumnType {
    /// The library's own name for this type, used as a fallback when the
    /// driver's metadata does not expose a native descriptor (spec §4.2:
    /// "falls back to a derived data-type name").
    pub fn derived_name(&self) -> &str {
        match self {
            ColumnType::Boolean => "BOOLEAN",
            ColumnType::Int32 => "INTEGER",
            ColumnType::Int64 => "BIGINT",
            ColumnType::Float64 => "DOUBLE",
            ColumnType::Decimal => "DECIMAL",
            ColumnType::Varchar => "VARCHAR",
            ColumnType::Blob => "BLOB",
            ColumnType::Date => "DATE",
            ColumnType::Time => "TIME",
            ColumnType::Timestamp => "TIMESTAMP",
            ColumnType::TimestampWithTimezone => "TIMESTAMP WITH TIME ZONE",
            ColumnType::Uuid => "UUID",
            ColumnType::Unknown => "UNKNOWN",
            ColumnType::Named(name) => name,
        }
    }
}

/// Three-valued nullability, mirroring the driver's `NON_NULL`/`NULLABLE`/
/// `UNKNOWN` convention (spec §4.2).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Nullability {
    NonNull,
    Nullable,
    Unknown,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn column_type_round_trips_through_derived_name() {
        assert_eq!(Value::Int64(42).column_type(), ColumnType::Int64);
        assert_eq!(ColumnType::Int64.derived_name(), "BIGINT");
    }

    #[test]
    fn null_value_has_unknown_column_type() {
        assert_eq!(Value::Null.column_type(), ColumnType::Unknown);
    }
}
