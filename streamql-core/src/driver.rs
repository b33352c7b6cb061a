//! Driver-facing capability traits (spec §6).
//!
//! These are the trait boundary for "the underlying reactive driver
//! itself" — explicitly out of scope to implement concretely here, the
//! same way `tank_core::{Driver, Connection, Prepared}` describe a
//! backend without `tank-core` shipping one. A real backend (analogous to
//! `tank-postgres`/`tank-sqlite`) would live in its own crate and implement
//! these traits; this workspace only ships an in-memory fixture
//! (`streamql-testkit`) used by the bridge's own tests.
//!
//! Each publisher-shaped method returns `impl Stream<..> + Send`, the
//! idiomatic Rust rendition of a reactive-streams `Publisher`: polling a
//! `Stream` already is the pull-based, back-pressured request/emit
//! exchange, so the driver boundary does not need to reinvent it. The
//! explicit `request(n)`/`cancel()` surface lives one layer up, on
//! [`crate::subscription::Subscription`], which drains these streams under
//! its own demand gate.

use crate::{
    error::Result,
    value::{ColumnType, Value},
};
use futures::Stream;
use std::sync::Arc;

/// Object-safe subset of statement binding, shared by [`DriverStatement`]
/// and used directly (as `&mut dyn StatementBinder`) by [`crate::param_adapter::ParamAdapter`]
/// so the external `Param` binding-layer boundary never needs to know the
/// concrete driver type.
pub trait StatementBinder: Send {
    /// Bind a value at 0-based parameter index.
    fn bind(&mut self, index0: usize, value: Value) -> Result<()>;
    /// Bind an explicit SQL NULL of the given type at 0-based index.
    fn bind_null(&mut self, index0: usize, ty: ColumnType) -> Result<()>;
    /// Accumulate the currently bound parameter row for a later batched
    /// execution (spec §4.6, single-statement batch).
    fn add(&mut self) -> Result<()>;
    /// Configure a cursor fetch-size hint, if the statement yields a cursor.
    fn fetch_size(&mut self, size: usize);
    /// Attach the list of field names to be returned as generated values,
    /// for dialects without native `RETURNING` support (spec §4.5 step 5).
    fn return_generated_values(&mut self, names: &[String]);

    /// Validates one row of bind values before it is bound (spec §4.6:
    /// "bind values are validated by the batch's own `checkBindValues`
    /// before rendering"). Default accepts anything; drivers with
    /// positional arity constraints can override.
    fn check_bind_values(&self, _row_len: usize) -> Result<()> {
        Ok(())
    }
}

/// A single execution result: either a row count or a row stream, chosen
/// by whichever of [`rows_updated`](DriverResultSet::rows_updated) or
/// [`rows`](DriverResultSet::rows) the caller invokes (spec §6, mirroring
/// R2DBC's `Result` which exposes both interpretations of one result).
pub trait DriverResultSet: Send + 'static {
    type Row: DriverRow;
    type Metadata: DriverRowMetadata;

    fn rows_updated(self) -> impl Stream<Item = Result<u64>> + Send;

    fn rows(self) -> impl Stream<Item = Result<(Self::Row, Arc<Self::Metadata>)>> + Send;
}

/// A prepared, bindable statement.
pub trait DriverStatement: StatementBinder + Send + 'static {
    type ResultSet: DriverResultSet;

    fn execute(self) -> impl Stream<Item = Result<Self::ResultSet>> + Send;
}

/// A multi-statement batch (spec §4.6, multi-statement flavour).
pub trait DriverBatch: Send + 'static {
    type ResultSet: DriverResultSet;

    /// Appends one fully-inlined statement (no bind phase).
    fn add_sql(&mut self, sql: &str) -> Result<()>;

    fn execute(self) -> impl Stream<Item = Result<Self::ResultSet>> + Send;
}

/// A live connection.
pub trait DriverConnection: Send + 'static {
    type Statement: DriverStatement;
    type Batch: DriverBatch;

    fn create_statement(&mut self, sql: &str) -> Result<Self::Statement>;
    fn create_batch(&mut self) -> Result<Self::Batch>;

    /// Fire-and-forget close publisher (spec §4.5: "subscribed to with an
    /// unbounded request and empty handlers").
    fn close(self) -> impl Stream<Item = Result<()>> + Send;
}

/// The driver's connection factory.
pub trait Driver: Send + Sync + 'static {
    type Connection: DriverConnection;

    /// A single-emission publisher of [`DriverConnection`] (spec §6).
    fn connect(&self) -> impl Stream<Item = Result<Self::Connection>> + Send;
}

/// A single driver-produced row, addressed by 0-based column index.
pub trait DriverRow: Send + 'static {
    fn get(&self, index0: usize) -> Result<Value>;
}

/// Row metadata for one result (spec §4.2).
pub trait DriverRowMetadata: Send + Sync + 'static {
    fn column_count(&self) -> usize;
    fn column_name(&self, index0: usize) -> &str;
    fn precision(&self, index0: usize) -> Option<u32>;
    fn scale(&self, index0: usize) -> Option<u32>;
    fn nullability(&self, index0: usize) -> crate::value::Nullability;

    /// The driver's native column-type descriptor, if its metadata API
    /// exposes one. `None` triggers the derived-name fallback in
    /// [`crate::meta_adapter::MetaAdapter`] (spec §4.2, driver-version
    /// probing).
    fn native_type_name(&self, index0: usize) -> Option<&str> {
        None
    }

    fn column_type(&self, index0: usize) -> ColumnType;
}

/// Type aliases unwinding the associated-type chains above, so downstream
/// modules that are generic over a [`Driver`] don't have to spell out
/// `<<D::Connection as DriverConnection>::Statement as DriverStatement>::ResultSet`
/// at every use site.
pub type ConnOf<D> = <D as Driver>::Connection;
pub type StmtOf<D> = <ConnOf<D> as DriverConnection>::Statement;
pub type BatchOf<D> = <ConnOf<D> as DriverConnection>::Batch;
pub type ResultOf<D> = <StmtOf<D> as DriverStatement>::ResultSet;
pub type BatchResultOf<D> = <BatchOf<D> as DriverBatch>::ResultSet;
pub type RowOf<D> = <ResultOf<D> as DriverResultSet>::Row;
pub type MetaOf<D> = <ResultOf<D> as DriverResultSet>::Metadata;
