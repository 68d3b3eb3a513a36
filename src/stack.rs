//! Array-backed LIFO stack behind a fixed-footprint handle.
//!
//! The public [`FixedStack`] is nothing but opaque bytes; the live layout
//! ([`StackCore`]) sits inside a [`Footprint`] and is reached only through
//! typed accessors. The workspace is a boxed slice of slots that grows by
//! doubling when full and shrinks by halving when usage falls below a
//! quarter, always by allocate-move-swap, never in place. Every public
//! operation is scoped by the [`Sanity`] reentrancy detector.

use crate::footprint::{Footprint, FOOTPRINT_BYTES};
use crate::resize::{self, ResizeOp, MIN_ELEMS};
use crate::sanity::Sanity;
use core::cell::Cell;
use core::fmt;
use core::marker::PhantomData;
use core::mem;
use std::collections::TryReserveError;

/// Workspace allocation failed during a resize; the container is left in
/// its prior, consistent state.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OutOfMemory(TryReserveError);

impl fmt::Display for OutOfMemory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("workspace allocation failed")
    }
}

impl std::error::Error for OutOfMemory {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.0)
    }
}

impl From<TryReserveError> for OutOfMemory {
    fn from(err: TryReserveError) -> Self {
        OutOfMemory(err)
    }
}

/// Cumulative usage counters. Diagnostic only; nothing in the container
/// branches on them.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct StackStats {
    pub push: u64,
    pub pop: u64,
    pub peek: u64,
    pub height: usize,
    pub height_max: usize,
}

/// Lifetime resize counters. A failed shrink shows up in `error` without
/// failing the operation that triggered it.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct ResizeStats {
    pub grow: u64,
    pub shrink: u64,
    pub error: u64,
}

/// Private layout behind the handle. `elems_limit` is `workspace.len()`:
/// a boxed slice swaps pointer and capacity together, so no observer can
/// see one without the other.
struct StackCore<T> {
    elems_curr: usize,
    workspace: Box<[Option<T>]>,
    sanity: Sanity,
    // stats.peek is carried in `peeks`; peek() takes &self.
    stats: StackStats,
    peeks: Cell<u64>,
    resize: ResizeStats,
}

/// Resizable LIFO stack with a fixed-size, layout-opaque handle.
///
/// The handle is the same size (128 bytes) for every `T`, so it can live
/// on the caller's stack or inside FFI-stable structs without the internal
/// layout leaking across the API boundary.
///
/// One logical owner at a time: the container detects overlapping calls
/// (and panics) but does not serialize them. `Send` when `T: Send`, never
/// `Sync`.
pub struct FixedStack<T> {
    raw: Footprint<FOOTPRINT_BYTES>,
    // Auto traits and dropck follow the real layout, not the raw bytes.
    _layout: PhantomData<StackCore<T>>,
}

fn empty_workspace<T>(limit: usize) -> Box<[Option<T>]> {
    core::iter::repeat_with(|| None).take(limit).collect()
}

/// Allocate a fresh workspace of `limit_new` slots, move the live prefix
/// over, and swap the owning buffer. The old workspace is released on
/// return; on allocation failure the old workspace is untouched.
fn swap_workspace<T>(
    workspace: &mut Box<[Option<T>]>,
    elems_curr: usize,
    limit_new: usize,
) -> Result<(), OutOfMemory> {
    let mut fresh: Vec<Option<T>> = Vec::new();
    fresh.try_reserve_exact(limit_new)?;
    fresh.extend(workspace[..elems_curr].iter_mut().map(Option::take));
    fresh.resize_with(limit_new, || None);

    *workspace = fresh.into_boxed_slice();
    Ok(())
}

impl<T> FixedStack<T> {
    /// Create a stack with the minimum default capacity (4 slots).
    pub fn new() -> Self {
        Self {
            raw: Footprint::emplace(StackCore::<T> {
                elems_curr: 0,
                workspace: empty_workspace(MIN_ELEMS),
                sanity: Sanity::new(),
                stats: StackStats::default(),
                peeks: Cell::new(0),
                resize: ResizeStats::default(),
            }),
            _layout: PhantomData,
        }
    }

    fn core(&self) -> &StackCore<T> {
        // Safety: emplaced with StackCore<T> in new(); dropped only in Drop.
        unsafe { self.raw.get() }
    }

    fn core_mut(&mut self) -> &mut StackCore<T> {
        // Safety: as in core().
        unsafe { self.raw.get_mut() }
    }

    /// Push a value. Grows the workspace first when it is exactly full; a
    /// failed grow rejects the push and leaves the stack unchanged.
    pub fn push(&mut self, value: T) -> Result<(), OutOfMemory> {
        let core = self.core_mut();
        let _g = core.sanity.enter();

        if core.elems_curr == core.workspace.len() {
            let limit_new = resize::next_limit(core.workspace.len(), ResizeOp::Grow);
            match swap_workspace(&mut core.workspace, core.elems_curr, limit_new) {
                Ok(()) => core.resize.grow += 1,
                Err(err) => {
                    core.resize.error += 1;
                    return Err(err);
                }
            }
        }

        let idx = core.elems_curr;
        core.workspace[idx] = Some(value);
        core.elems_curr += 1;
        core.stats.push += 1;
        core.stats.height += 1;
        core.stats.height_max = core.stats.height_max.max(core.stats.height);
        Ok(())
    }

    /// Pop the most recently pushed value, or `None` on an empty stack.
    /// Popping empty is a defined result, not an error.
    pub fn pop(&mut self) -> Option<T> {
        let core = self.core_mut();
        let _g = core.sanity.enter();

        if core.elems_curr == 0 {
            return None;
        }

        let idx = core.elems_curr - 1;
        let value = core.workspace[idx].take();
        core.elems_curr = idx;
        core.stats.pop += 1;
        core.stats.height -= 1;

        if let Some(limit_new) = resize::shrink_target(core.elems_curr, core.workspace.len()) {
            match swap_workspace(&mut core.workspace, core.elems_curr, limit_new) {
                Ok(()) => core.resize.shrink += 1,
                // Best-effort reclamation; the pop already succeeded.
                Err(_) => core.resize.error += 1,
            }
        }

        value
    }

    /// Borrow the most recently pushed value.
    ///
    /// # Panics
    /// Panics on an empty stack. Emptiness is a precondition; check with
    /// [`FixedStack::is_not_empty`] first.
    pub fn peek(&self) -> &T {
        let core = self.core();
        let _g = core.sanity.enter();

        assert!(core.elems_curr > 0, "peek on an empty stack");
        core.peeks.set(core.peeks.get() + 1);
        match &core.workspace[core.elems_curr - 1] {
            Some(value) => value,
            None => unreachable!("slot below elems_curr is always live"),
        }
    }

    /// Number of live elements.
    pub fn entries(&self) -> usize {
        self.core().elems_curr
    }

    pub fn is_empty(&self) -> bool {
        self.core().elems_curr == 0
    }

    pub fn is_not_empty(&self) -> bool {
        !self.is_empty()
    }

    /// Current workspace capacity (`elems_limit`). Always a power of two at
    /// or above the default minimum once any resize has run.
    pub fn capacity(&self) -> usize {
        self.core().workspace.len()
    }

    /// Snapshot of the usage counters.
    pub fn stats(&self) -> StackStats {
        let core = self.core();
        StackStats {
            peek: core.peeks.get(),
            ..core.stats
        }
    }

    /// Snapshot of the lifetime resize counters.
    pub fn resize_stats(&self) -> ResizeStats {
        self.core().resize
    }

    /// Dump statistics and every live slot to stdout. Output only; no state
    /// change beyond the guard round-trip.
    pub fn display(&self, msg: Option<&str>)
    where
        T: fmt::Debug,
    {
        let core = self.core();
        let _g = core.sanity.enter();
        let stats = StackStats {
            peek: core.peeks.get(),
            ..core.stats
        };

        println!();
        println!("---------------------------------------------------------------");
        if let Some(msg) = msg {
            println!(" Message: {msg:?}");
        }
        println!("stats.push           = {}", stats.push);
        println!("stats.pop            = {}", stats.pop);
        println!("stats.peek           = {}", stats.peek);
        println!("stats.height         = {}", stats.height);
        println!("stats.height_max     = {}", stats.height_max);
        println!("resize.grow          = {}", core.resize.grow);
        println!("resize.shrink        = {}", core.resize.shrink);
        println!("resize.error         = {}", core.resize.error);
        println!("elems_curr           = {}", core.elems_curr);
        println!("elems_limit          = {}", core.workspace.len());
        println!("sanity.busy          = {}", core.sanity.busy());

        for (idx, slot) in core.workspace[..core.elems_curr].iter().enumerate() {
            if let Some(value) = slot {
                println!(
                    "[{idx:4}]  bytes: {:8}  data: {value:?}",
                    mem::size_of::<T>()
                );
            }
        }
    }
}

impl<T> Default for FixedStack<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: fmt::Debug> fmt::Debug for FixedStack<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let core = self.core();
        f.debug_struct("FixedStack")
            .field("elems_curr", &core.elems_curr)
            .field("elems_limit", &core.workspace.len())
            .field("stats", &self.stats())
            .field("resize", &core.resize)
            .finish_non_exhaustive()
    }
}

impl<T> Drop for FixedStack<T> {
    fn drop(&mut self) {
        // Teardown enters the guard and never exits it: the busy counter's
        // memory is released together with the workspace.
        let guard = self.core().sanity.enter();
        mem::forget(guard);
        // Safety: matches the emplace in new(); runs exactly once.
        unsafe { self.raw.drop_in_place::<StackCore<T>>() };
    }
}
