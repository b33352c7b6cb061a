//! Core of streamql: the reactive-streams subscription engine bridging a
//! synchronous SQL query builder onto a non-blocking database driver.
//!
//! The crate is organized leaves-first, mirroring the component order it
//! was designed in: the demand counter and adapters at the bottom, the
//! subscription engine built on top of them, and the driver/renderer/
//! binding traits as the seams external collaborators plug into.

mod batch;
mod binding;
mod capability;
mod config;
mod connection_subscriber;
mod demand;
mod driver;
mod error;
mod forwarder;
mod meta_adapter;
mod param_adapter;
mod reactive;
mod renderer;
mod result_subscriber;
mod row_adapter;
mod subscription;
mod url;
mod value;

#[cfg(feature = "blocking")]
mod legacy;

pub use binding::{Param, Record, RecordField};
pub use config::BridgeConfig;
pub use demand::{Demand, PumpGuard, UNBOUNDED};
pub use driver::{
    BatchOf, BatchResultOf, ConnOf, Driver, DriverBatch, DriverConnection, DriverResultSet, DriverRow,
    DriverRowMetadata, DriverStatement, MetaOf, ResultOf, RowOf, StatementBinder, StmtOf,
};
pub use error::{kind_of, Error, ErrorContext, ErrorKind, Result};
pub use meta_adapter::MetaAdapter;
pub use param_adapter::{DialectOverrides, NoDialectOverrides, ParamAdapter};
pub use reactive::{Publisher, Subscriber, Subscription};
pub use renderer::{RenderedQuery, Renderer};
pub use row_adapter::RowAdapter;
pub use subscription::{
    spawn_multi_statement_batch, spawn_record_query, spawn_row_count_query, spawn_single_statement_batch, ParamRow,
    SubscriptionCore,
};
pub use url::{connect_blocking, parse_connection_url, Credentials};
pub use value::{ColumnType, Nullability, Value};

#[cfg(feature = "blocking")]
pub use legacy::{
    BlockingCursor, BlockingCursorSource, BlockingRecordSubscription, BlockingRowCountSource,
    BlockingRowCountSubscription,
};

/// Re-exported for crates that need to name the `futures::Stream` bound
/// returned by driver-facing methods without taking their own dependency
/// on `futures` directly, mirroring the teacher crate's `pub mod stream`.
pub mod stream {
    pub use ::futures::stream::*;
}
