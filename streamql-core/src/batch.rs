//! Batch execution (spec §4.6).
//!
//! Two flavours, both reduced to plain functions returning a result stream
//! that [`crate::subscription::spawn_multi_statement_batch`]/
//! [`crate::subscription::spawn_single_statement_batch`] wire into a
//! `SubscriptionCore` the same way a single query's statement stream is,
//! since a batch's result is always interpreted as row counts.

use crate::binding::Param;
use crate::config::BridgeConfig;
use crate::driver::{BatchResultOf, ConnOf, Driver, ResultOf};
use crate::error::{ErrorContext, Result};
use crate::param_adapter::{DialectOverrides, ParamAdapter};
use crate::renderer::Renderer;
use futures::Stream;
use std::sync::Arc;

/// Multi-statement batch (spec §4.6): each input query is rendered with
/// its bind values inlined (no bind phase) and appended to a driver batch,
/// which is then executed once.
pub fn execute_multi_statement<D, Q>(
    conn: &mut ConnOf<D>,
    renderer: &dyn Renderer<Q>,
    config: &BridgeConfig,
    queries: &[Q],
) -> Result<impl Stream<Item = Result<BatchResultOf<D>>> + Send + use<D, Q>>
where
    D: Driver,
{
    let mut batch = conn
        .create_batch()
        .context("creating batch")
        .inspect_err(|err| log::error!("{err:#}"))?;
    for (position, query) in queries.iter().enumerate() {
        let sql = renderer
            .render_inline(config, query)
            .with_context(|| format!("rendering inline query at batch position {position}"))
            .inspect_err(|err| log::error!("{err:#}"))?;
        batch
            .add_sql(&sql)
            .with_context(|| format!("appending batch statement at position {position}"))
            .inspect_err(|err| log::error!("{err:#}"))?;
    }
    Ok(batch.execute())
}

/// Single-statement batch (spec §4.6): the underlying prepared statement
/// is rendered once; each row of bind values is validated, bound, and
/// accumulated via `statement.add()` before a single `execute()`. Returns
/// the query's `skip_update_counts` flag alongside the result stream, same
/// as [`crate::connection_subscriber::execute`].
pub fn execute_single_statement<D, Q>(
    conn: &mut ConnOf<D>,
    renderer: &dyn Renderer<Q>,
    overrides: &dyn DialectOverrides,
    config: &BridgeConfig,
    query: &Q,
    rows: &[Vec<Arc<dyn Param>>],
) -> Result<(bool, impl Stream<Item = Result<ResultOf<D>>> + Send + use<D, Q>)>
where
    D: Driver,
{
    let rendered = renderer
        .render(config, query)
        .context("rendering batch statement")
        .inspect_err(|err| log::error!("{err:#}"))?;
    let skip_update_counts = rendered.skip_update_counts;
    let mut statement = conn
        .create_statement(&rendered.sql)
        .context("creating statement for batch")
        .inspect_err(|err| log::error!("{err:#}"))?;

    for (row_index, row) in rows.iter().enumerate() {
        statement
            .check_bind_values(row.len())
            .with_context(|| format!("validating bind values for batch row {row_index}"))
            .inspect_err(|err| log::error!("{err:#}"))?;
        {
            let mut params = ParamAdapter::new(&mut statement, overrides);
            for (index0, param) in row.iter().enumerate() {
                param
                    .set(&mut params, index0 + 1)
                    .with_context(|| format!("binding batch row {row_index}, parameter {}", index0 + 1))
                    .inspect_err(|err| log::error!("{err:#}"))?;
            }
        }
        statement
            .add()
            .with_context(|| format!("accumulating batch row {row_index}"))
            .inspect_err(|err| log::error!("{err:#}"))?;
    }

    Ok((skip_update_counts, statement.execute()))
}
