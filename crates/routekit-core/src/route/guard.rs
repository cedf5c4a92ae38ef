//! Recursion guards for route actions.
//!
//! Two layers: a per-route flag catching an action re-entering its own route,
//! and a per-thread depth counter catching unbounded chains of nested performs.

use std::cell::Cell;
use std::sync::atomic::{AtomicBool, Ordering};

thread_local! {
    static ROUTE_DEPTH: Cell<usize> = const { Cell::new(0) };
}

/// Holds a route's reentrancy flag for the duration of an action.
pub(crate) struct ReentrancyGuard<'a> {
    flag: &'a AtomicBool,
    owned: bool,
}

impl<'a> ReentrancyGuard<'a> {
    /// Set the flag, or return `None` if an action already holds it.
    pub fn try_enter(flag: &'a AtomicBool) -> Option<Self> {
        if flag.swap(true, Ordering::SeqCst) {
            return None;
        }
        Some(Self { flag, owned: true })
    }

    /// Set the flag if clear. The guard only clears a flag it set itself.
    pub fn mark(flag: &'a AtomicBool) -> Self {
        let owned = !flag.swap(true, Ordering::SeqCst);
        Self { flag, owned }
    }
}

impl Drop for ReentrancyGuard<'_> {
    fn drop(&mut self) {
        if self.owned {
            self.flag.store(false, Ordering::SeqCst);
        }
    }
}

/// Counts nested route actions on the current thread.
pub(crate) struct DepthGuard {
    _private: (),
}

impl DepthGuard {
    /// Enter one nesting level, or return `None` once `limit` levels are active.
    pub fn enter(limit: usize) -> Option<Self> {
        ROUTE_DEPTH.with(|depth| {
            if depth.get() >= limit {
                return None;
            }
            depth.set(depth.get() + 1);
            Some(Self { _private: () })
        })
    }

    pub fn current() -> usize {
        ROUTE_DEPTH.with(Cell::get)
    }
}

impl Drop for DepthGuard {
    fn drop(&mut self) {
        ROUTE_DEPTH.with(|depth| depth.set(depth.get().saturating_sub(1)));
    }
}
