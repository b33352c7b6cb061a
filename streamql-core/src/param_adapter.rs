//! Parameter adapter (spec §4.2).
//!
//! Bridges the library's 1-based, typed `set(ctx)` binding calls onto the
//! driver's 0-based `bind`/`bind_null`. Also hosts the dialect-switch hook
//! (spec §4.2 / §9 Open Question 2): the switch point is preserved as an
//! extension trait with a no-op default, since the source's branches for it
//! were empty in the revision this was distilled from.

use crate::driver::StatementBinder;
use crate::error::Result;
use crate::value::{ColumnType, Value};
use time::{OffsetDateTime, PrimitiveDateTime};

/// Per-dialect override point for parameter binding (spec §4.2, §9). The
/// default implementation defers to the adapter's ordinary bind/bind_null
/// path; a dialect family that needs e.g. named markers instead of
/// positional ones can override these.
pub trait DialectOverrides: Send + Sync {
    fn bind(&self, statement: &mut dyn StatementBinder, index0: usize, value: Value) -> Result<bool> {
        let _ = (statement, index0, value);
        Ok(false)
    }

    fn bind_null(&self, statement: &mut dyn StatementBinder, index0: usize, ty: ColumnType) -> Result<bool> {
        let _ = (statement, index0, ty);
        Ok(false)
    }
}

/// No dialect-specific behavior; every bind goes straight to the driver.
pub struct NoDialectOverrides;
impl DialectOverrides for NoDialectOverrides {}

pub struct ParamAdapter<'s> {
    statement: &'s mut dyn StatementBinder,
    overrides: &'s dyn DialectOverrides,
}

impl<'s> ParamAdapter<'s> {
    pub fn new(statement: &'s mut dyn StatementBinder, overrides: &'s dyn DialectOverrides) -> Self {
        Self {
            statement,
            overrides,
        }
    }

    fn bind(&mut self, index1: usize, value: Value) -> Result<()> {
        let index0 = index1 - 1;
        if value.is_null() {
            return self.bind_null(index1, ColumnType::Unknown);
        }
        if self.overrides.bind(self.statement, index0, value.clone())? {
            return Ok(());
        }
        self.statement.bind(index0, value)
    }

    fn bind_null(&mut self, index1: usize, ty: ColumnType) -> Result<()> {
        let index0 = index1 - 1;
        if self.overrides.bind_null(self.statement, index0, ty.clone())? {
            return Ok(());
        }
        self.statement.bind_null(index0, ty)
    }

    pub fn set_bool(&mut self, index1: usize, value: Option<bool>) -> Result<()> {
        match value {
            Some(v) => self.bind(index1, Value::Boolean(v)),
            None => self.bind_null(index1, ColumnType::Boolean),
        }
    }

    pub fn set_i32(&mut self, index1: usize, value: Option<i32>) -> Result<()> {
        match value {
            Some(v) => self.bind(index1, Value::Int32(v)),
            None => self.bind_null(index1, ColumnType::Int32),
        }
    }

    pub fn set_i64(&mut self, index1: usize, value: Option<i64>) -> Result<()> {
        match value {
            Some(v) => self.bind(index1, Value::Int64(v)),
            None => self.bind_null(index1, ColumnType::Int64),
        }
    }

    pub fn set_f64(&mut self, index1: usize, value: Option<f64>) -> Result<()> {
        match value {
            Some(v) => self.bind(index1, Value::Float64(v)),
            None => self.bind_null(index1, ColumnType::Float64),
        }
    }

    pub fn set_string(&mut self, index1: usize, value: Option<String>) -> Result<()> {
        match value {
            Some(v) => self.bind(index1, Value::Varchar(v)),
            None => self.bind_null(index1, ColumnType::Varchar),
        }
    }

    pub fn set_blob(&mut self, index1: usize, value: Option<Vec<u8>>) -> Result<()> {
        match value {
            Some(v) => self.bind(index1, Value::Blob(v)),
            None => self.bind_null(index1, ColumnType::Blob),
        }
    }

    /// Temporal substitution mirrored from the row adapter: a zoned
    /// timestamp is flattened to a local one before binding, since the
    /// driver boundary only accepts local-date/local-time/local-datetime.
    pub fn set_timestamp_tz(&mut self, index1: usize, value: Option<OffsetDateTime>) -> Result<()> {
        match value {
            Some(v) => self.bind(
                index1,
                Value::Timestamp(PrimitiveDateTime::new(v.date(), v.time())),
            ),
            None => self.bind_null(index1, ColumnType::Timestamp),
        }
    }

    pub fn set_value(&mut self, index1: usize, value: Value) -> Result<()> {
        self.bind(index1, value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct RecordingStatement {
        bound: Vec<(usize, Value)>,
        nulls: Vec<(usize, ColumnType)>,
    }

    impl StatementBinder for RecordingStatement {
        fn bind(&mut self, index0: usize, value: Value) -> Result<()> {
            self.bound.push((index0, value));
            Ok(())
        }
        fn bind_null(&mut self, index0: usize, ty: ColumnType) -> Result<()> {
            self.nulls.push((index0, ty));
            Ok(())
        }
        fn add(&mut self) -> Result<()> {
            Ok(())
        }
        fn fetch_size(&mut self, _size: usize) {}
        fn return_generated_values(&mut self, _names: &[String]) {}
    }

    #[test]
    fn converts_one_based_to_zero_based_index() {
        let mut statement = RecordingStatement::default();
        let overrides = NoDialectOverrides;
        let mut adapter = ParamAdapter::new(&mut statement, &overrides);
        adapter.set_i64(1, Some(42)).unwrap();
        assert_eq!(statement.bound, vec![(0, Value::Int64(42))]);
    }

    #[test]
    fn none_binds_typed_null() {
        let mut statement = RecordingStatement::default();
        let overrides = NoDialectOverrides;
        let mut adapter = ParamAdapter::new(&mut statement, &overrides);
        adapter.set_string(2, None).unwrap();
        assert_eq!(statement.nulls, vec![(1, ColumnType::Varchar)]);
        assert!(statement.bound.is_empty());
    }

    #[test]
    fn zoned_timestamp_is_substituted_to_local_before_binding() {
        let mut statement = RecordingStatement::default();
        let overrides = NoDialectOverrides;
        let mut adapter = ParamAdapter::new(&mut statement, &overrides);
        let zoned = OffsetDateTime::UNIX_EPOCH;
        adapter.set_timestamp_tz(1, Some(zoned)).unwrap();
        match &statement.bound[0].1 {
            Value::Timestamp(local) => {
                assert_eq!(local.date(), zoned.date());
                assert_eq!(local.time(), zoned.time());
            }
            other => panic!("expected a local Timestamp, got {other:?}"),
        }
    }
}
