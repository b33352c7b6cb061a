//! The consumer-facing reactive-streams protocol (spec §2 item 7, §6).
//!
//! `Subscriber`/`Subscription` are the two roles the rest of this crate's
//! engine implements against: a publisher hands a subscriber a
//! `Subscription` exactly once (`on_subscribe`), after which the
//! subscriber drives flow with `request(n)`/`cancel()` and receives
//! `on_next`/`on_complete`/`on_error` signals subject to the ordering
//! rules in spec §5.

use crate::error::Error;
use std::sync::Arc;

/// The externally visible handle a subscriber uses to pull items and to
/// stop a subscription early. Type-erased so a [`Subscriber`] never needs
/// to know which concrete engine (query vs. batch, which driver) produced
/// it.
pub trait Subscription: Send + Sync {
    /// Requests `n` additional items. `n <= 0` is a protocol violation
    /// (reactive-streams rule 3.9) and is signalled to the subscriber as
    /// an invalid-argument `on_error`, not returned as an error here —
    /// `request` itself never fails to the caller.
    fn request(&self, n: i64);

    /// Cancels the subscription. Idempotent; a second call and any call
    /// after termination are no-ops.
    fn cancel(&self);
}

/// A consumer of one subscription's signals (spec §5 ordering rules).
pub trait Subscriber<T>: Send {
    /// Delivered exactly once, before any other signal.
    fn on_subscribe(&mut self, subscription: Arc<dyn Subscription>);

    /// Delivered zero or more times; never after `on_complete`/`on_error`.
    fn on_next(&mut self, item: T);

    /// Delivered at most once; mutually exclusive with `on_error`.
    fn on_complete(&mut self);

    /// Delivered at most once; mutually exclusive with `on_complete`.
    fn on_error(&mut self, error: Error);
}

/// A one-shot, single-subscriber publisher (spec §1: "supporting
/// multi-subscriber fan-out" is an explicit non-goal).
pub trait Publisher<T> {
    fn subscribe(self, subscriber: impl Subscriber<T> + 'static);
}
