//! Single-owner reentrancy detector.
//!
//! The containers in this crate do no locking of their own; serialization
//! across callers is the consumer's job. `Sanity` is the cheap diagnostic
//! that catches the consumer getting it wrong: entering a container a second
//! time before the first call has left is a caller bug, and it panics
//! immediately rather than letting the overlap corrupt the workspace.
//!
//! This is a detector, not a lock. It never blocks, and it is compiled into
//! every build profile; a masked serialization bug in release is still a
//! serialization bug.

use core::cell::Cell;

/// Per-instance busy counter. Embed in a container core and scope every
/// public entry-point with `let _g = self.sanity.enter();`.
#[derive(Debug)]
pub struct Sanity {
    busy: Cell<u32>,
}

impl Sanity {
    /// Create an idle counter. Const so it can be a field initializer.
    pub const fn new() -> Self {
        Self { busy: Cell::new(0) }
    }

    /// Enter a guarded section. Panics if the container is already busy,
    /// which means the caller has not honored the single-owner contract.
    #[inline]
    pub fn enter(&self) -> SanityGuard<'_> {
        let busy = self.busy.get();
        assert!(
            busy == 0,
            "container entered while busy: caller-side serialization is missing"
        );
        self.busy.set(busy + 1);
        SanityGuard { owner: self }
    }

    /// Current busy depth, for diagnostic dumps only.
    pub fn busy(&self) -> u32 {
        self.busy.get()
    }
}

impl Default for Sanity {
    fn default() -> Self {
        Self::new()
    }
}

/// RAII guard returned by [`Sanity::enter`]. Container teardown
/// intentionally leaks its guard: the counter's memory goes away with the
/// container, so there is nothing left to exit.
pub struct SanityGuard<'a> {
    owner: &'a Sanity,
}

impl Drop for SanityGuard<'_> {
    fn drop(&mut self) {
        let busy = self.owner.busy.get();
        debug_assert!(busy > 0);
        self.owner.busy.set(busy - 1);
    }
}
