//! The SQL renderer's trait boundary (spec §1 "OUT OF SCOPE", §6
//! "Renderer-facing").
//!
//! Rendering itself — turning a query builder AST into SQL text plus a
//! bind-value list — is an external collaborator. This module only
//! describes the seam: `render(query) -> {sql, bindValues, skipUpdateCounts}`.

use crate::binding::Param;
use crate::error::Result;
use std::sync::Arc;

/// The outcome of rendering one query (spec §6).
pub struct RenderedQuery {
    pub sql: Arc<str>,
    pub bind_values: Vec<Arc<dyn Param>>,
    /// When set, a DML statement's row-count results are not surfaced
    /// downstream (e.g. dialects that only support `RETURNING` and would
    /// otherwise double-report affected rows).
    pub skip_update_counts: bool,
}

impl RenderedQuery {
    pub fn new(sql: impl Into<Arc<str>>, bind_values: Vec<Arc<dyn Param>>) -> Self {
        Self {
            sql: sql.into(),
            bind_values,
            skip_update_counts: false,
        }
    }
}

/// Renders a query of type `Q` against the current dialect configuration.
pub trait Renderer<Q: ?Sized>: Send + Sync {
    fn render(&self, config: &crate::config::BridgeConfig, query: &Q) -> Result<RenderedQuery>;

    /// Renders `query` with every bind value inlined as a SQL literal
    /// instead of a placeholder, used for the multi-statement batch
    /// flavour which has no bind phase (spec §4.6).
    fn render_inline(&self, config: &crate::config::BridgeConfig, query: &Q) -> Result<Arc<str>>;
}
