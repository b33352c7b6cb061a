//! The binding layer's trait boundary (spec §1, "OUT OF SCOPE": the binding
//! layer itself is an external collaborator; only the seam it is consumed
//! through lives here).
//!
//! [`Record`]/[`RecordField`] are the "library record factory" and
//! per-column `get(ctx)` capability from spec §4.3. [`Param`] is the
//! per-parameter `set(ctx)` capability from spec §4.2/§4.6. Neither trait
//! prescribes how field lookup or type conversion is implemented — that is
//! left to whatever derive/registry a consumer crate provides, the same
//! way `tank-core`'s `Entity`/`ColumnDef` machinery is a separate layer
//! from its `Executor`/`Connection` engine.

use crate::error::Result;
use crate::param_adapter::ParamAdapter;
use crate::row_adapter::RowAdapter;
use crate::value::ColumnType;

/// A type the bridge can materialize one row into.
pub trait Record: Send + 'static {
    /// Constructs the "empty" record the field bindings then fill in place
    /// (spec §4.3: "constructs an empty record through the library's
    /// record factory").
    fn empty() -> Self;

    /// The ordered field bindings for this record type. Looked up once per
    /// statement and reused for every row (spec §9: "the field list ...
    /// could be cached; it does not change within one query").
    fn fields() -> &'static [&'static dyn RecordField<Self>]
    where
        Self: Sized;
}

/// One field's binding: read its column out of the current row and write
/// it into `record`.
pub trait RecordField<R: ?Sized>: Send + Sync {
    fn get(&self, record: &mut R, ctx: &mut RowAdapter<'_>) -> Result<()>;
}

/// One bind parameter: write its value into the statement at `index1`.
pub trait Param: Send + Sync {
    fn set(&self, ctx: &mut ParamAdapter<'_>, index1: usize) -> Result<()>;

    /// Best-effort type, used to infer bind types for a batch row when no
    /// value (e.g. a `None`) is available to infer from directly (spec
    /// §4.6: "inferring types from the original `Param` list when
    /// available, otherwise from the raw bind values").
    fn column_type(&self) -> ColumnType {
        ColumnType::Unknown
    }
}
