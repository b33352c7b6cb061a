//! Reactive-streams execution bridge adapting a synchronous SQL query
//! builder onto a non-blocking database driver.
//!
//! This crate is a thin facade over `streamql-core`: it re-exports the
//! engine's public surface under one name, the way the teacher workspace's
//! root `tank` crate re-exports `tank-core`.

pub use streamql_core::*;

/// Everything most callers need in scope to drive a subscription:
/// `use streamql::prelude::*;`
pub mod prelude {
    pub use streamql_core::{
        BridgeConfig, ColumnType, Driver, DriverBatch, DriverConnection, DriverResultSet, DriverRow,
        DriverRowMetadata, DriverStatement, Error, Nullability, Param, Record, RecordField, RenderedQuery,
        Renderer, Result, StatementBinder, Subscriber, Subscription, Value,
    };
    pub use streamql_core::{
        spawn_multi_statement_batch, spawn_record_query, spawn_row_count_query, spawn_single_statement_batch,
    };

    #[cfg(feature = "blocking")]
    pub use streamql_core::{
        BlockingCursor, BlockingCursorSource, BlockingRecordSubscription, BlockingRowCountSource,
        BlockingRowCountSubscription,
    };
}
