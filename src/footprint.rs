//! Fixed-size opaque storage for container layouts.
//!
//! Callers allocate a container handle without seeing (or depending on) the
//! private layout behind it; the only property a handle guarantees is its
//! byte size. [`Footprint`] is that storage: an aligned byte region a layout
//! type is written into at creation and read back through typed accessors.
//! Each instantiation proves `size_of::<T>() <= BYTES` at compile time, so a
//! layout outgrowing its handle is a build error, not a runtime surprise.
//!
//! All raw-pointer handling in the crate is isolated here.

use core::mem::MaybeUninit;

/// Byte budget shared by every handle in the crate. Sized to hold the
/// largest internal layout a handle may represent, with slack for hasher
/// state carried by generic parameters.
pub(crate) const FOOTPRINT_BYTES: usize = 128;

/// Alignment of the byte region; layouts must not require more.
pub(crate) const FOOTPRINT_ALIGN: usize = 16;

/// Size-erased storage for exactly one value of the layout type it was
/// emplaced with. The payload type is not tracked; callers of the typed
/// accessors must pass the same `T` that was emplaced.
#[repr(C, align(16))]
pub(crate) struct Footprint<const BYTES: usize> {
    bytes: [MaybeUninit<u8>; BYTES],
}

impl<const BYTES: usize> Footprint<BYTES> {
    /// Move `val` into fresh storage. Fails to compile if `T` does not fit
    /// the byte or alignment budget.
    pub(crate) fn emplace<T>(val: T) -> Self {
        const {
            assert!(
                core::mem::size_of::<T>() <= BYTES,
                "internal layout exceeds the handle byte budget"
            );
            assert!(
                core::mem::align_of::<T>() <= FOOTPRINT_ALIGN,
                "internal layout exceeds the handle alignment"
            );
        }

        let mut fp = Self {
            bytes: [MaybeUninit::uninit(); BYTES],
        };
        // Safety: fit and alignment proven above; the region is exclusively
        // owned and uninitialized.
        unsafe { fp.bytes.as_mut_ptr().cast::<T>().write(val) };
        fp
    }

    /// Borrow the emplaced value.
    ///
    /// # Safety
    /// `T` must be the type this footprint was emplaced with, and the value
    /// must not have been dropped in place.
    #[inline]
    pub(crate) unsafe fn get<T>(&self) -> &T {
        &*self.bytes.as_ptr().cast::<T>()
    }

    /// Mutably borrow the emplaced value.
    ///
    /// # Safety
    /// Same contract as [`Footprint::get`].
    #[inline]
    pub(crate) unsafe fn get_mut<T>(&mut self) -> &mut T {
        &mut *self.bytes.as_mut_ptr().cast::<T>()
    }

    /// Drop the emplaced value in place. The storage must not be accessed
    /// as `T` afterward.
    ///
    /// # Safety
    /// Same contract as [`Footprint::get`], and must be called at most once.
    pub(crate) unsafe fn drop_in_place<T>(&mut self) {
        core::ptr::drop_in_place(self.bytes.as_mut_ptr().cast::<T>());
    }
}
