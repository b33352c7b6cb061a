//! The demand counter and re-entrancy guard (spec §4.1).
//!
//! This is the lowest-level primitive of the subscription engine: a
//! saturating 64-bit accumulator plus a guard that collapses a
//! synchronously re-entrant `request()` call (one made by a downstream
//! subscriber from inside its own `on_next`) into a single iterative pump
//! pass instead of recursing.

use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};

/// Once the counter reaches this value it is treated as "unbounded" and is
/// never decremented again (spec §3, §4.1, §8).
pub const UNBOUNDED: i64 = i64::MAX;

/// A saturating, atomic demand accumulator.
#[derive(Default)]
pub struct Demand {
    value: AtomicI64,
}

impl Demand {
    pub const fn new() -> Self {
        Self {
            value: AtomicI64::new(0),
        }
    }

    /// Adds `n` to the counter, saturating at [`UNBOUNDED`]. Returns `Err`
    /// if `n <= 0`; callers must translate that into an invalid-argument
    /// `onError` per reactive-streams rule 3.9, not call `add` at all.
    pub fn add(&self, n: i64) -> Result<(), ()> {
        if n <= 0 {
            return Err(());
        }
        loop {
            let current = self.value.load(Ordering::Acquire);
            if current == UNBOUNDED {
                return Ok(());
            }
            let sum = current.wrapping_add(n);
            // Classical signed-overflow test: a carry happened iff the
            // operands share a sign that differs from the result's.
            let overflowed = ((current ^ sum) & (n ^ sum)) < 0;
            let next = if overflowed { UNBOUNDED } else { sum };
            if self
                .value
                .compare_exchange_weak(current, next, Ordering::AcqRel, Ordering::Acquire)
                .is_ok()
            {
                return Ok(());
            }
        }
    }

    /// Atomically consumes one unit of demand if any is available, leaving
    /// [`UNBOUNDED`] sticky. This is the only legal way to ask "may I emit
    /// one more item?" at the counter level (subscription-level completion
    /// checks layer on top in [`crate::subscription`]).
    pub fn try_consume_one(&self) -> bool {
        loop {
            let current = self.value.load(Ordering::Acquire);
            if current == UNBOUNDED {
                return true;
            }
            if current <= 0 {
                return false;
            }
            let next = current - 1;
            if self
                .value
                .compare_exchange_weak(current, next, Ordering::AcqRel, Ordering::Acquire)
                .is_ok()
            {
                return true;
            }
        }
    }

    pub fn current(&self) -> i64 {
        self.value.load(Ordering::Acquire)
    }

    pub fn is_unbounded(&self) -> bool {
        self.current() == UNBOUNDED
    }
}

/// Collapses re-entrant pump invocations into a single iterative loop.
///
/// A downstream subscriber is allowed to call `request()` synchronously
/// from within `on_next`/`on_subscribe`. If that happens while a pump pass
/// for the same subscription is already running (on this or another
/// thread), the nested call must not recurse into the pump body again —
/// it instead flags that another pass is owed, and the currently running
/// pass picks it up before it exits.
#[derive(Default)]
pub struct PumpGuard {
    in_pump: AtomicBool,
    pump_again: AtomicBool,
}

impl PumpGuard {
    pub const fn new() -> Self {
        Self {
            in_pump: AtomicBool::new(false),
            pump_again: AtomicBool::new(false),
        }
    }

    /// Runs `body` at most once "at a time": if a pump pass is already in
    /// flight, this call only records that another pass is owed and
    /// returns immediately without invoking `body`.
    pub fn run(&self, mut body: impl FnMut()) {
        if self.in_pump.swap(true, Ordering::AcqRel) {
            self.pump_again.store(true, Ordering::Release);
            return;
        }
        loop {
            body();
            if !self.pump_again.swap(false, Ordering::AcqRel) {
                break;
            }
        }
        self.in_pump.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    #[test]
    fn saturating_add_caps_at_unbounded() {
        let demand = Demand::new();
        demand.add(5).unwrap();
        assert_eq!(demand.current(), 5);
        demand.add(i64::MAX).unwrap();
        assert_eq!(demand.current(), UNBOUNDED);
        // Adding to an already-unbounded counter is a no-op, never errors.
        demand.add(1).unwrap();
        assert_eq!(demand.current(), UNBOUNDED);
    }

    #[test]
    fn add_rejects_non_positive() {
        let demand = Demand::new();
        assert_eq!(demand.add(0), Err(()));
        assert_eq!(demand.add(-1), Err(()));
    }

    #[test]
    fn unbounded_decrement_is_sticky() {
        let demand = Demand::new();
        demand.add(UNBOUNDED).unwrap();
        for _ in 0..1000 {
            assert!(demand.try_consume_one());
        }
        assert_eq!(demand.current(), UNBOUNDED);
    }

    #[test]
    fn bounded_decrement_reaches_zero() {
        let demand = Demand::new();
        demand.add(2).unwrap();
        assert!(demand.try_consume_one());
        assert!(demand.try_consume_one());
        assert!(!demand.try_consume_one());
        assert_eq!(demand.current(), 0);
    }

    #[test]
    fn reentrant_calls_collapse_into_one_more_pass() {
        let runs = RefCell::new(0u32);
        let guard = PumpGuard::new();
        let depth = RefCell::new(0u32);
        guard.run(|| {
            *runs.borrow_mut() += 1;
            let mut d = depth.borrow_mut();
            *d += 1;
            if *d == 1 {
                drop(d);
                // Simulate a downstream subscriber synchronously calling
                // `request()` again from inside `on_next`.
                guard.run(|| {
                    *runs.borrow_mut() += 1;
                });
            }
        });
        // The nested call never invoked `body` itself; it only asked the
        // outer, still-running pass to loop once more, so `body` runs
        // exactly twice total rather than recursing.
        assert_eq!(*runs.borrow(), 2);
        assert_eq!(*depth.borrow(), 2);
    }
}
