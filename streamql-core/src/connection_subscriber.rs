//! Connection subscriber (spec §4.5 part 1).
//!
//! Reduced to a single async function rather than an object with
//! `on_subscribe`/`on_next` callbacks: once the connection publisher has
//! yielded its one connection (awaited by the caller in
//! [`crate::subscription`]), the remaining steps — render, create
//! statement, bind, configure fetch size / returning values, execute — are
//! a straight-line sequence with no further signals to wait on, which is
//! exactly what an `async fn` expresses without inventing a bespoke state
//! machine for it.
//!
//! `on_complete` of the connection publisher is deliberately never
//! observed here: the subscription does not terminate on connection-stream
//! completion, only on result-stream completion, so nothing in this module
//! looks past the first emitted connection.

use crate::config::BridgeConfig;
use crate::driver::{ConnOf, Driver, ResultOf, StmtOf};
use crate::error::{ErrorContext, Result};
use crate::param_adapter::{DialectOverrides, ParamAdapter};
use crate::printable_query;
use crate::renderer::Renderer;
use futures::Stream;

/// Renders, prepares, binds and executes `query` against an already-open
/// `conn` (spec §4.5 steps 1-6). Any synchronous failure in steps 1-5 is
/// returned as `Err` rather than panicking or silently dropping the
/// statement, so the caller can route it straight to `on_error`. Plain
/// `fn`, not `async fn`: every step here is synchronous, matching the
/// driver trait's own methods (spec §6) which return `impl Stream` without
/// themselves being `async fn`.
///
/// Returns the query's `skip_update_counts` flag alongside the result
/// stream, so a row-count subscription knows whether to surface what the
/// statement reports or treat it as not worth delivering (spec §6).
pub fn execute<D, Q>(
    conn: &mut ConnOf<D>,
    renderer: &dyn Renderer<Q>,
    overrides: &dyn DialectOverrides,
    config: &BridgeConfig,
    query: &Q,
    fetch_size: Option<usize>,
    returning_fields: &[String],
) -> Result<(bool, impl Stream<Item = Result<ResultOf<D>>> + Send + use<D, Q>)>
where
    D: Driver,
{
    let rendered = renderer.render(config, query).context("rendering query")?;
    let skip_update_counts = rendered.skip_update_counts;

    let mut statement: StmtOf<D> = conn
        .create_statement(&rendered.sql)
        .with_context(|| format!("creating statement for `{}`", printable_query!(rendered.sql)))
        .inspect_err(|err| log::error!("{err:#}"))?;

    {
        let mut params = ParamAdapter::new(&mut statement, overrides);
        for (index0, param) in rendered.bind_values.iter().enumerate() {
            param
                .set(&mut params, index0 + 1)
                .with_context(|| format!("binding parameter {}", index0 + 1))
                .inspect_err(|err| log::error!("{err:#}"))?;
        }
    }

    if let Some(size) = fetch_size.or(config.default_fetch_size) {
        statement.fetch_size(size);
    }
    if !returning_fields.is_empty() {
        statement.return_generated_values(returning_fields);
    }

    Ok((skip_update_counts, statement.execute()))
}
