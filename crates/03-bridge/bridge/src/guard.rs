//! Reentrancy guard for cross-boundary calls.
//!
//! The target's dispatch loop cannot be entered while it is already inside a
//! dispatch, so a call made from within another call's completion handling
//! (for instance a host callback the target invokes) must be refused rather
//! than queued. The guard tracks one depth counter per bridge context.

use std::cell::Cell;

use log::{trace, warn};

use crate::error::{BridgeError, BridgeResult};

/// Depth counter shared by every cross-boundary call of one bridge context.
#[derive(Debug, Default)]
pub struct ReentrancyGuard {
    depth: Cell<u32>,
}

/// Decrements the depth on drop, so unwinding out of `f` restores the counter too.
struct DepthToken<'a> {
    depth: &'a Cell<u32>,
}

impl Drop for DepthToken<'_> {
    fn drop(&mut self) {
        self.depth.set(self.depth.get() - 1);
    }
}

impl ReentrancyGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of cross-boundary calls currently on the stack (0 or 1).
    pub fn depth(&self) -> u32 {
        self.depth.get()
    }

    pub fn is_idle(&self) -> bool {
        self.depth.get() == 0
    }

    /// Runs `f` as the only cross-boundary call on the stack.
    ///
    /// Fails with [`BridgeError::Reentrancy`] without running `f` when another
    /// guarded call is in flight. The depth returns to its previous value on
    /// every exit path of `f`, including panics.
    pub fn guarded_call<T, F>(&self, op: &str, f: F) -> BridgeResult<T>
    where
        F: FnOnce() -> BridgeResult<T>,
    {
        if self.depth.get() > 0 {
            warn!("guard: rejected reentrant `{op}` (depth={})", self.depth.get());
            return Err(BridgeError::Reentrancy);
        }

        self.depth.set(1);
        let _token = DepthToken { depth: &self.depth };
        trace!("guard: enter `{op}`");
        let result = f();
        trace!("guard: leave `{op}` ok={}", result.is_ok());
        result
    }
}
