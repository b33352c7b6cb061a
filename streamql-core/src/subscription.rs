//! Subscription lifecycle (spec §4.5 part 2, §3, §5).
//!
//! [`SubscriptionCore`] is the externally visible `Subscription` object:
//! it owns the demand counter, the re-entrancy guard, the forwarder table,
//! and the lazy-start/termination state machine. It is deliberately
//! driver-agnostic (no `D: Driver` generic parameter) so that a boxed
//! `Arc<dyn Subscription>` can be handed to a downstream subscriber
//! without leaking the concrete driver/query/record types used to build
//! it — those live only in the `tokio::spawn`-ed task built by
//! [`spawn_record_query`]/[`spawn_row_count_query`] and their batch
//! counterparts [`spawn_multi_statement_batch`]/[`spawn_single_statement_batch`].
//!
//! States: `IDLE` (no demand requested yet), `RUNNING` (connection
//! requested or execution in flight), `TERMINATED` (any end state). The
//! `IDLE -> RUNNING` transition happens on the first `request(n > 0)` that
//! wins the `subscribed` compare-and-set; `RUNNING -> TERMINATED` happens
//! on full drain, upstream error, or downstream cancel — whichever wins
//! the `completed` compare-and-set decides whether `on_complete`/
//! `on_error` is delivered at all.

use crate::batch;
use crate::binding::{Param, Record};
use crate::config::BridgeConfig;
use crate::connection_subscriber;
use crate::demand::{Demand, PumpGuard};
use crate::driver::{ConnOf, Driver};
use crate::error::{self, Result};
use crate::param_adapter::DialectOverrides;
use crate::reactive::{Subscriber, Subscription};
use crate::renderer::Renderer;
use crate::result_subscriber;
use futures::StreamExt;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex as StdMutex};
use tokio::sync::Notify;
use tokio::task::JoinSet;

/// The shared, driver-agnostic half of a subscription (spec §3's
/// `Subscription` entity, minus the connection slot, which lives inside
/// the driver-generic task since its type depends on `D`).
pub struct SubscriptionCore {
    completed: AtomicBool,
    subscribed: AtomicBool,
    demand: Demand,
    pump_guard: PumpGuard,
    notify: Notify,
    next_forwarder_index: AtomicU64,
    forwarders: StdMutex<HashSet<u64>>,
    starter: StdMutex<Option<Box<dyn FnOnce() + Send>>>,
    on_invalid_request: StdMutex<Option<Box<dyn Fn(i64) + Send + Sync>>>,
}

impl SubscriptionCore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            completed: AtomicBool::new(false),
            subscribed: AtomicBool::new(false),
            demand: Demand::new(),
            pump_guard: PumpGuard::new(),
            notify: Notify::new(),
            next_forwarder_index: AtomicU64::new(0),
            forwarders: StdMutex::new(HashSet::new()),
            starter: StdMutex::new(None),
            on_invalid_request: StdMutex::new(None),
        })
    }

    /// Registers the closure that lazily spawns the driver-facing task on
    /// the first valid `request`. Called once, before the `Subscription`
    /// handle is returned to the caller.
    pub fn set_starter(&self, f: impl FnOnce() + Send + 'static) {
        *self.starter.lock().unwrap() = Some(Box::new(f));
    }

    /// Registers the closure invoked when `request` is called with `n <= 0`
    /// (spec §4.1, rule 3.9). Delivers `on_error` and terminates the
    /// subscription without ever starting it.
    pub fn set_invalid_request_handler(&self, f: impl Fn(i64) + Send + Sync + 'static) {
        *self.on_invalid_request.lock().unwrap() = Some(Box::new(f));
    }

    pub fn is_completed(&self) -> bool {
        self.completed.load(Ordering::Acquire)
    }

    /// Wins exactly once across the subscription's lifetime; the winner is
    /// responsible for whatever terminal signal (or lack of one, for
    /// cancellation) follows.
    pub fn try_terminate(&self) -> bool {
        !self.completed.swap(true, Ordering::AcqRel)
    }

    pub fn next_forwarder_index(&self) -> u64 {
        self.next_forwarder_index.fetch_add(1, Ordering::AcqRel)
    }

    pub fn register_forwarder(&self, index: u64) {
        self.forwarders.lock().unwrap().insert(index);
    }

    /// Removes `index` from the forwarder table, returning whether the
    /// table is now empty (spec §4.3: "close succeeds only when the
    /// subscriber is complete AND the subscription's forwarder table is
    /// empty").
    pub fn unregister_forwarder(&self, index: u64) -> bool {
        let mut table = self.forwarders.lock().unwrap();
        table.remove(&index);
        table.is_empty()
    }

    /// Blocks until either the subscription is completed or at least one
    /// unit of demand is available to consume.
    pub async fn wait_for_demand(&self) {
        loop {
            if self.is_completed() || self.demand.current() > 0 {
                return;
            }
            self.notify.notified().await;
        }
    }

    /// The only legal way to ask "may I emit one more item?" (spec §4.1).
    pub fn consume_one_if_live(&self) -> bool {
        !self.is_completed() && self.demand.try_consume_one()
    }
}

impl Subscription for SubscriptionCore {
    fn request(&self, n: i64) {
        if self.is_completed() {
            return;
        }
        if n <= 0 {
            if self.try_terminate() {
                if let Some(handler) = self.on_invalid_request.lock().unwrap().as_ref() {
                    handler(n);
                }
            }
            return;
        }
        // `add` cannot fail here since `n > 0` was already checked above.
        let _ = self.demand.add(n);
        // Collapse a synchronously re-entrant `request()` call (one a
        // downstream subscriber makes from inside its own `on_next`) into
        // a single extra wake-up instead of recursing (spec §4.1, §5).
        // `notify_waiters`, not `notify_one`: more than one forwarder can be
        // parked on this `Notify` at once (one genuinely out of demand, one
        // retrying after losing a `consume_one_if_live` race), and waking
        // only one risks picking the wrong one while the other starves.
        self.pump_guard.run(|| self.notify.notify_waiters());
        if !self.subscribed.swap(true, Ordering::AcqRel) {
            if let Some(start) = self.starter.lock().unwrap().take() {
                start();
            }
        }
    }

    fn cancel(&self) {
        if self.try_terminate() {
            self.notify.notify_waiters();
        }
    }
}

/// Subscribes `subscriber` to the record stream produced by executing
/// `query` against a connection from `driver` (spec §4.5, §4.3 record
/// variant). Lazy: nothing happens upstream until the first `request`.
pub fn spawn_record_query<D, Q, Rec>(
    driver: Arc<D>,
    renderer: Arc<dyn Renderer<Q>>,
    overrides: Arc<dyn DialectOverrides>,
    config: BridgeConfig,
    query: Q,
    fetch_size: Option<usize>,
    returning_fields: Vec<String>,
    subscriber: impl Subscriber<Rec> + 'static,
) -> Arc<dyn Subscription>
where
    D: Driver,
    Q: Send + Sync + 'static,
    Rec: Record,
{
    let core = SubscriptionCore::new();
    let handle: Arc<dyn Subscription> = core.clone();
    let subscriber = Arc::new(StdMutex::new(Box::new(subscriber) as Box<dyn Subscriber<Rec>>));
    subscriber.lock().unwrap().on_subscribe(handle.clone());

    let invalid_subscriber = subscriber.clone();
    core.set_invalid_request_handler(move |n| {
        invalid_subscriber
            .lock()
            .unwrap()
            .on_error(error::invalid_argument(format!(
                "request(n) called with n={n}, must be positive"
            )));
    });

    let task_core = core.clone();
    core.set_starter(move || {
        tokio::spawn(drive_record::<D, Q, Rec>(
            task_core,
            driver,
            renderer,
            overrides,
            config,
            query,
            fetch_size,
            returning_fields,
            subscriber,
        ));
    });
    handle
}

/// Subscribes `subscriber` to the row-count stream produced by executing
/// `query` (spec §4.3, row-count variant; used both for plain DML queries
/// and the multi-statement batch's own row-count result subscriber).
pub fn spawn_row_count_query<D, Q>(
    driver: Arc<D>,
    renderer: Arc<dyn Renderer<Q>>,
    overrides: Arc<dyn DialectOverrides>,
    config: BridgeConfig,
    query: Q,
    fetch_size: Option<usize>,
    subscriber: impl Subscriber<u64> + 'static,
) -> Arc<dyn Subscription>
where
    D: Driver,
    Q: Send + Sync + 'static,
{
    let core = SubscriptionCore::new();
    let handle: Arc<dyn Subscription> = core.clone();
    let subscriber = Arc::new(StdMutex::new(Box::new(subscriber) as Box<dyn Subscriber<u64>>));
    subscriber.lock().unwrap().on_subscribe(handle.clone());

    let invalid_subscriber = subscriber.clone();
    core.set_invalid_request_handler(move |n| {
        invalid_subscriber
            .lock()
            .unwrap()
            .on_error(error::invalid_argument(format!(
                "request(n) called with n={n}, must be positive"
            )));
    });

    let task_core = core.clone();
    core.set_starter(move || {
        tokio::spawn(drive_row_count::<D, Q>(
            task_core, driver, renderer, overrides, config, query, fetch_size, subscriber,
        ));
    });
    handle
}

/// Subscribes `subscriber` to the row-count stream produced by executing a
/// multi-statement batch (spec §4.3/§4.6, multi-statement flavour): every
/// query in `queries` is inlined and appended to a single driver batch
/// before one `execute()`, mirroring [`spawn_row_count_query`]'s lifecycle
/// but with no single rendered query to borrow a fetch size or returning
/// fields from.
pub fn spawn_multi_statement_batch<D, Q>(
    driver: Arc<D>,
    renderer: Arc<dyn Renderer<Q>>,
    config: BridgeConfig,
    queries: Vec<Q>,
    subscriber: impl Subscriber<u64> + 'static,
) -> Arc<dyn Subscription>
where
    D: Driver,
    Q: Send + Sync + 'static,
{
    let core = SubscriptionCore::new();
    let handle: Arc<dyn Subscription> = core.clone();
    let subscriber = Arc::new(StdMutex::new(Box::new(subscriber) as Box<dyn Subscriber<u64>>));
    subscriber.lock().unwrap().on_subscribe(handle.clone());

    let invalid_subscriber = subscriber.clone();
    core.set_invalid_request_handler(move |n| {
        invalid_subscriber
            .lock()
            .unwrap()
            .on_error(error::invalid_argument(format!(
                "request(n) called with n={n}, must be positive"
            )));
    });

    let task_core = core.clone();
    core.set_starter(move || {
        tokio::spawn(drive_multi_statement_batch::<D, Q>(
            task_core, driver, renderer, config, queries, subscriber,
        ));
    });
    handle
}

/// Subscribes `subscriber` to the row-count stream produced by executing a
/// single-statement batch (spec §4.3/§4.6, single-statement flavour): one
/// prepared statement is bound once per row of `rows` and accumulated via
/// `statement.add()` before one `execute()`, mirroring
/// [`spawn_row_count_query`]'s lifecycle.
pub fn spawn_single_statement_batch<D, Q>(
    driver: Arc<D>,
    renderer: Arc<dyn Renderer<Q>>,
    overrides: Arc<dyn DialectOverrides>,
    config: BridgeConfig,
    query: Q,
    rows: Vec<ParamRow>,
    subscriber: impl Subscriber<u64> + 'static,
) -> Arc<dyn Subscription>
where
    D: Driver,
    Q: Send + Sync + 'static,
{
    let core = SubscriptionCore::new();
    let handle: Arc<dyn Subscription> = core.clone();
    let subscriber = Arc::new(StdMutex::new(Box::new(subscriber) as Box<dyn Subscriber<u64>>));
    subscriber.lock().unwrap().on_subscribe(handle.clone());

    let invalid_subscriber = subscriber.clone();
    core.set_invalid_request_handler(move |n| {
        invalid_subscriber
            .lock()
            .unwrap()
            .on_error(error::invalid_argument(format!(
                "request(n) called with n={n}, must be positive"
            )));
    });

    let task_core = core.clone();
    core.set_starter(move || {
        tokio::spawn(drive_single_statement_batch::<D, Q>(
            task_core, driver, renderer, overrides, config, query, rows, subscriber,
        ));
    });
    handle
}

/// Fire-and-forget close of a connection: subscribed to with an unbounded
/// request and empty handlers (spec §4.5: "close is implemented by
/// atomically swapping the connection slot to null ... subscribed to with
/// an unbounded request and empty handlers").
async fn close_connection<D: Driver>(connection: ConnOf<D>) {
    let mut close_stream = connection.close();
    while close_stream.next().await.is_some() {}
}

async fn drive_record<D, Q, Rec>(
    core: Arc<SubscriptionCore>,
    driver: Arc<D>,
    renderer: Arc<dyn Renderer<Q>>,
    overrides: Arc<dyn DialectOverrides>,
    config: BridgeConfig,
    query: Q,
    fetch_size: Option<usize>,
    returning_fields: Vec<String>,
    subscriber: Arc<StdMutex<Box<dyn Subscriber<Rec>>>>,
) where
    D: Driver,
    Q: Send + Sync + 'static,
    Rec: Record,
{
    let mut connection: Option<ConnOf<D>> = None;
    let outcome: Result<()> = async {
        let mut connect_stream = driver.connect();
        let conn = match connect_stream.next().await {
            Some(Ok(conn)) => conn,
            Some(Err(err)) => return Err(err),
            None => return Err(error::driver("connection factory completed without a value")),
        };
        connection = Some(conn);

        log::debug!("record query: connection acquired");
        let (_skip_update_counts, result_stream) = connection_subscriber::execute::<D, Q>(
            connection.as_mut().unwrap(),
            renderer.as_ref(),
            overrides.as_ref(),
            &config,
            &query,
            fetch_size,
            &returning_fields,
        )?;
        futures::pin_mut!(result_stream);

        let mut pending = JoinSet::new();
        while let Some(result) = result_stream.next().await {
            if core.is_completed() {
                break;
            }
            let result = result?;
            let index = core.next_forwarder_index();
            pending.spawn(result_subscriber::drain_record::<D, Rec>(
                index,
                result,
                core.clone(),
                subscriber.clone(),
            ));
        }
        while let Some(joined) = pending.join_next().await {
            joined.map_err(|e| error::driver(format!("forwarder task panicked: {e}")))??;
        }
        Ok(())
    }
    .await;

    if let Some(conn) = connection.take() {
        log::debug!("record query: closing connection");
        close_connection::<D>(conn).await;
    }

    match outcome {
        Ok(()) => {
            if core.try_terminate() {
                subscriber.lock().unwrap().on_complete();
            }
        }
        Err(err) => {
            log::warn!("record query failed: {err:#}");
            if core.try_terminate() {
                subscriber.lock().unwrap().on_error(err);
            }
        }
    }
}

async fn drive_row_count<D, Q>(
    core: Arc<SubscriptionCore>,
    driver: Arc<D>,
    renderer: Arc<dyn Renderer<Q>>,
    overrides: Arc<dyn DialectOverrides>,
    config: BridgeConfig,
    query: Q,
    fetch_size: Option<usize>,
    subscriber: Arc<StdMutex<Box<dyn Subscriber<u64>>>>,
) where
    D: Driver,
    Q: Send + Sync + 'static,
{
    let mut connection: Option<ConnOf<D>> = None;
    let outcome: Result<()> = async {
        let mut connect_stream = driver.connect();
        let conn = match connect_stream.next().await {
            Some(Ok(conn)) => conn,
            Some(Err(err)) => return Err(err),
            None => return Err(error::driver("connection factory completed without a value")),
        };
        connection = Some(conn);

        log::debug!("row-count query: connection acquired");
        let (skip_update_counts, result_stream) = connection_subscriber::execute::<D, Q>(
            connection.as_mut().unwrap(),
            renderer.as_ref(),
            overrides.as_ref(),
            &config,
            &query,
            fetch_size,
            &[],
        )?;
        futures::pin_mut!(result_stream);

        let mut pending = JoinSet::new();
        while let Some(result) = result_stream.next().await {
            if core.is_completed() {
                break;
            }
            let result = result?;
            if skip_update_counts {
                continue;
            }
            let index = core.next_forwarder_index();
            pending.spawn(result_subscriber::drain_row_count(
                index,
                result,
                core.clone(),
                subscriber.clone(),
            ));
        }
        while let Some(joined) = pending.join_next().await {
            joined.map_err(|e| error::driver(format!("forwarder task panicked: {e}")))??;
        }
        Ok(())
    }
    .await;

    if let Some(conn) = connection.take() {
        log::debug!("row-count query: closing connection");
        close_connection::<D>(conn).await;
    }

    match outcome {
        Ok(()) => {
            if core.try_terminate() {
                subscriber.lock().unwrap().on_complete();
            }
        }
        Err(err) => {
            log::warn!("row-count query failed: {err:#}");
            if core.try_terminate() {
                subscriber.lock().unwrap().on_error(err);
            }
        }
    }
}

async fn drive_multi_statement_batch<D, Q>(
    core: Arc<SubscriptionCore>,
    driver: Arc<D>,
    renderer: Arc<dyn Renderer<Q>>,
    config: BridgeConfig,
    queries: Vec<Q>,
    subscriber: Arc<StdMutex<Box<dyn Subscriber<u64>>>>,
) where
    D: Driver,
    Q: Send + Sync + 'static,
{
    let mut connection: Option<ConnOf<D>> = None;
    let outcome: Result<()> = async {
        let mut connect_stream = driver.connect();
        let conn = match connect_stream.next().await {
            Some(Ok(conn)) => conn,
            Some(Err(err)) => return Err(err),
            None => return Err(error::driver("connection factory completed without a value")),
        };
        connection = Some(conn);

        log::debug!("multi-statement batch: connection acquired");
        let result_stream =
            batch::execute_multi_statement::<D, Q>(connection.as_mut().unwrap(), renderer.as_ref(), &config, &queries)?;
        futures::pin_mut!(result_stream);

        let mut pending = JoinSet::new();
        while let Some(result) = result_stream.next().await {
            if core.is_completed() {
                break;
            }
            let result = result?;
            let index = core.next_forwarder_index();
            pending.spawn(result_subscriber::drain_row_count(
                index,
                result,
                core.clone(),
                subscriber.clone(),
            ));
        }
        while let Some(joined) = pending.join_next().await {
            joined.map_err(|e| error::driver(format!("forwarder task panicked: {e}")))??;
        }
        Ok(())
    }
    .await;

    if let Some(conn) = connection.take() {
        log::debug!("multi-statement batch: closing connection");
        close_connection::<D>(conn).await;
    }

    match outcome {
        Ok(()) => {
            if core.try_terminate() {
                subscriber.lock().unwrap().on_complete();
            }
        }
        Err(err) => {
            log::warn!("multi-statement batch failed: {err:#}");
            if core.try_terminate() {
                subscriber.lock().unwrap().on_error(err);
            }
        }
    }
}

async fn drive_single_statement_batch<D, Q>(
    core: Arc<SubscriptionCore>,
    driver: Arc<D>,
    renderer: Arc<dyn Renderer<Q>>,
    overrides: Arc<dyn DialectOverrides>,
    config: BridgeConfig,
    query: Q,
    rows: Vec<ParamRow>,
    subscriber: Arc<StdMutex<Box<dyn Subscriber<u64>>>>,
) where
    D: Driver,
    Q: Send + Sync + 'static,
{
    let mut connection: Option<ConnOf<D>> = None;
    let outcome: Result<()> = async {
        let mut connect_stream = driver.connect();
        let conn = match connect_stream.next().await {
            Some(Ok(conn)) => conn,
            Some(Err(err)) => return Err(err),
            None => return Err(error::driver("connection factory completed without a value")),
        };
        connection = Some(conn);

        log::debug!("single-statement batch: connection acquired");
        let (skip_update_counts, result_stream) = batch::execute_single_statement::<D, Q>(
            connection.as_mut().unwrap(),
            renderer.as_ref(),
            overrides.as_ref(),
            &config,
            &query,
            &rows,
        )?;
        futures::pin_mut!(result_stream);

        let mut pending = JoinSet::new();
        while let Some(result) = result_stream.next().await {
            if core.is_completed() {
                break;
            }
            let result = result?;
            if skip_update_counts {
                continue;
            }
            let index = core.next_forwarder_index();
            pending.spawn(result_subscriber::drain_row_count(
                index,
                result,
                core.clone(),
                subscriber.clone(),
            ));
        }
        while let Some(joined) = pending.join_next().await {
            joined.map_err(|e| error::driver(format!("forwarder task panicked: {e}")))??;
        }
        Ok(())
    }
    .await;

    if let Some(conn) = connection.take() {
        log::debug!("single-statement batch: closing connection");
        close_connection::<D>(conn).await;
    }

    match outcome {
        Ok(()) => {
            if core.try_terminate() {
                subscriber.lock().unwrap().on_complete();
            }
        }
        Err(err) => {
            log::warn!("single-statement batch failed: {err:#}");
            if core.try_terminate() {
                subscriber.lock().unwrap().on_error(err);
            }
        }
    }
}

/// A single bind-value row's worth of `Param`s, as consumed by a
/// single-statement batch (spec §4.6). Re-exported here so callers of
/// [`crate::batch`] don't need a separate import for something only ever
/// passed alongside a query.
pub type ParamRow = Vec<Arc<dyn Param>>;

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn invalid_request_terminates_without_starting() {
        let core = SubscriptionCore::new();
        let started = Arc::new(AtomicBool::new(false));
        let started_flag = started.clone();
        core.set_starter(move || {
            started_flag.store(true, Ordering::SeqCst);
        });
        let errored = Arc::new(AtomicBool::new(false));
        let errored_flag = errored.clone();
        core.set_invalid_request_handler(move |_n| {
            errored_flag.store(true, Ordering::SeqCst);
        });

        core.request(0);

        assert!(errored.load(Ordering::SeqCst));
        assert!(!started.load(Ordering::SeqCst));
        assert!(core.is_completed());
    }

    #[tokio::test]
    async fn first_valid_request_starts_exactly_once() {
        let core = SubscriptionCore::new();
        let starts = Arc::new(AtomicU64::new(0));
        let starts_counter = starts.clone();
        core.set_starter(move || {
            starts_counter.fetch_add(1, Ordering::SeqCst);
        });
        core.request(1);
        core.request(1);
        assert_eq!(starts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn cancel_is_idempotent_and_wins_termination_once() {
        let core = SubscriptionCore::new();
        assert!(!core.is_completed());
        core.cancel();
        assert!(core.is_completed());
        // A second cancel (or any terminal race) must not win the CAS again.
        assert!(!core.try_terminate());
    }
}
