//! fixed-adts: array-backed containers behind fixed-size opaque handles.
//!
//! Internal Design:
//!
//! Summary
//! - Goal: containers whose public handle is a fixed-size byte region, so a
//!   caller can hold one on its own stack (or in an FFI-stable struct)
//!   without heap-allocating the handle and without depending on the
//!   private layout behind it.
//! - Layers:
//!   - Sanity: single-owner reentrancy detector embedded in every
//!     container; panics on overlapping entry, never blocks.
//!   - Footprint: the aligned opaque byte region a private layout is
//!     emplaced into, with a compile-time proof that the layout fits.
//!   - resize: pure power-of-two capacity policy (double on full, halve
//!     below quarter-full, floor at 4 slots).
//!   - FixedStack / FixedHashMap: the array-backed engines; exclusively
//!     owned heap workspaces swapped whole on every resize.
//!   - SyncStack: mutex-serialized capability level for callers that cannot
//!     guarantee a single owner.
//!
//! Constraints
//! - One logical owner per container at a time. The raw containers detect
//!   violations (fail-fast panic) but do not serialize callers; that is the
//!   consumer's job, or `SyncStack`'s.
//! - Handles are `Send` when the element type is, never `Sync`.
//! - Workspaces are reallocated and swapped, never grown in place, so
//!   capacity and backing buffer always change together.
//! - Resize allocation failures are status values (`OutOfMemory`), reported
//!   once and never retried; the container keeps its last consistent state.
//!
//! Why this split?
//! - Localize invariants: each layer has a small, precise contract.
//! - Minimize unsafe: all raw-pointer handling is isolated in `footprint`;
//!   the engines above it are safe code over typed borrows.
//! - The resize policy is pure arithmetic shared by both engines, testable
//!   without touching an allocator.
//!
//! Rehashing invariant
//! - Each hash-map node stores the `u64` hash computed at insert; lookups
//!   and resize both index by the stored hash. Growing or shrinking relinks
//!   every live node into the new bucket array - it never byte-copies
//!   buckets and never re-runs hashing.
//!
//! Notes and non-goals
//! - No persistence, no wire surface, no cross-process behavior.
//! - Pop on empty is a defined `None`; peek on empty and reentrant calls
//!   are caller bugs and panic.
//! - The stack's usage and resize statistics are diagnostic only and never
//!   drive container logic.

mod footprint;
mod hash;
mod resize;
pub mod sanity;
mod stack;
mod sync;

// Public surface
pub use hash::{FixedHashMap, InsertError};
pub use sanity::{Sanity, SanityGuard};
pub use stack::{FixedStack, OutOfMemory, ResizeStats, StackStats};
pub use sync::SyncStack;
