//! Row adapter (spec §4.2).
//!
//! Stateless bridge from a driver row to the typed, 1-based accessors the
//! binding layer expects. "Stateless" except for `was_null`, which tracks
//! only the most recent column read, per the spec's invariant.

use crate::driver::DriverRow;
use crate::value::Value;
use time::{Date, Month, PrimitiveDateTime, Time};
use uuid::Uuid;

/// Epoch sentinel returned by non-nullable temporal accessors when the
/// column was actually NULL (spec §4.2: "return a sentinel zero value for
/// non-nullable accessors").
fn epoch_date() -> Date {
    Date::from_calendar_date(1970, Month::January, 1).expect("1970-01-01 is a valid date")
}

pub struct RowAdapter<'r> {
    row: &'r dyn DriverRow,
    was_null: bool,
}

impl<'r> RowAdapter<'r> {
    pub fn new(row: &'r dyn DriverRow) -> Self {
        Self {
            row,
            was_null: false,
        }
    }

    /// Reflects only the most recent typed column read (spec §3 invariant).
    pub fn was_null(&self) -> bool {
        self.was_null
    }

    fn read(&mut self, index1: usize) -> Value {
        let value = self
            .row
            .get(index1 - 1)
            .unwrap_or(Value::Null);
        self.was_null = value.is_null();
        value
    }

    pub fn get_value(&mut self, index1: usize) -> Value {
        self.read(index1)
    }

    pub fn get_bool(&mut self, index1: usize) -> bool {
        match self.read(index1) {
            Value::Boolean(v) => v,
            _ => false,
        }
    }

    pub fn get_i32(&mut self, index1: usize) -> i32 {
        match self.read(index1) {
            Value::Int32(v) => v,
            Value::Int64(v) => v as i32,
            _ => 0,
        }
    }

    pub fn get_i64(&mut self, index1: usize) -> i64 {
        match self.read(index1) {
            Value::Int64(v) => v,
            Value::Int32(v) => v as i64,
            _ => 0,
        }
    }

    pub fn get_f64(&mut self, index1: usize) -> f64 {
        match self.read(index1) {
            Value::Float64(v) => v,
            _ => 0.0,
        }
    }

    pub fn get_decimal(&mut self, index1: usize) -> rust_decimal::Decimal {
        match self.read(index1) {
            Value::Decimal(v) => v,
            _ => rust_decimal::Decimal::ZERO,
        }
    }

    pub fn get_string(&mut self, index1: usize) -> String {
        match self.read(index1) {
            Value::Varchar(v) => v,
            _ => String::new(),
        }
    }

    pub fn get_blob(&mut self, index1: usize) -> Vec<u8> {
        match self.read(index1) {
            Value::Blob(v) => v,
            _ => Vec::new(),
        }
    }

    pub fn get_uuid(&mut self, index1: usize) -> Uuid {
        match self.read(index1) {
            Value::Uuid(v) => v,
            _ => Uuid::nil(),
        }
    }

    /// Temporal substitution (spec §4.2): whatever the driver handed back,
    /// flatten it to the local (zone-less) date, because the binding layer
    /// speaks local temporal types, not JDBC-style zoned classes.
    pub fn get_date(&mut self, index1: usize) -> Date {
        match self.read(index1) {
            Value::Date(v) => v,
            Value::Timestamp(v) => v.date(),
            Value::TimestampWithTimezone(v) => v.date(),
            _ => epoch_date(),
        }
    }

    pub fn get_time(&mut self, index1: usize) -> Time {
        match self.read(index1) {
            Value::Time(v) => v,
            Value::Timestamp(v) => v.time(),
            Value::TimestampWithTimezone(v) => v.time(),
            _ => Time::MIDNIGHT,
        }
    }

    pub fn get_timestamp(&mut self, index1: usize) -> PrimitiveDateTime {
        match self.read(index1) {
            Value::Timestamp(v) => v,
            Value::TimestampWithTimezone(v) => PrimitiveDateTime::new(v.date(), v.time()),
            Value::Date(v) => PrimitiveDateTime::new(v, Time::MIDNIGHT),
            _ => PrimitiveDateTime::new(epoch_date(), Time::MIDNIGHT),
        }
    }
}
