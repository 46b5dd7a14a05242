//! Inline ownership of one erased value in a fixed-capacity buffer.
//!
//! This module encapsulates the fields of [`RawLocal`] so that the buffer
//! contents and the vtable can never be paired incorrectly.

use core::{any::TypeId, cell::UnsafeCell, marker::PhantomData, mem::MaybeUninit, ptr::NonNull};

use crate::{
    util::Erased,
    value::{RawValueMut, RawValueRef, ValueHandler, vtable::ValueVtable},
};

/// The alignment of the buffer inside [`RawLocal`].
///
/// Values with a stricter alignment requirement cannot be stored inline.
pub const LOCAL_ALIGN: usize = 16;

/// Uninitialized bytes aligned to [`LOCAL_ALIGN`].
///
/// The bytes sit in an [`UnsafeCell`] because a value reached through `&self`
/// may still mutate itself, e.g. an atomic counter.
#[repr(C, align(16))]
struct LocalBuffer<const N: usize>(
    /// The raw bytes
    UnsafeCell<MaybeUninit<[u8; N]>>,
);

impl<const N: usize> LocalBuffer<N> {
    /// A buffer with no value in it.
    #[inline]
    fn uninit() -> Self {
        Self(UnsafeCell::new(MaybeUninit::uninit()))
    }

    /// Pointer to the first byte, valid for shared and interior mutable access.
    #[inline]
    fn as_ptr(&self) -> NonNull<Erased> {
        // SAFETY: `UnsafeCell::get` never returns null for a live cell.
        unsafe { NonNull::new_unchecked(self.0.get()) }.cast::<Erased>()
    }

    /// Pointer to the first byte, valid for exclusive access.
    #[inline]
    fn as_mut_ptr(&mut self) -> NonNull<Erased> {
        NonNull::from(self.0.get_mut()).cast::<Erased>()
    }
}

/// Owns a value of some type `V` stored inline in an `N`-byte buffer, though
/// we do not know which actual `V` it is.
///
/// Storing a value that is larger than `N` bytes or aligned to more than
/// [`LOCAL_ALIGN`] bytes fails to compile:
///
/// ```compile_fail
/// use dynpoly_internals::{RawLocal, ValueHandler};
///
/// struct NeverClone;
/// impl<V: 'static> ValueHandler<V> for NeverClone {
///     fn try_clone(_value: &V) -> Option<V> {
///         None
///     }
/// }
///
/// let _local = RawLocal::<4>::new::<u64, NeverClone>(1);
/// ```
pub struct RawLocal<const N: usize> {
    /// Vtable created for `V`
    vtable: &'static ValueVtable,
    /// Storage for the value
    ///
    /// # Safety
    ///
    /// The following safety invariants are guaranteed to be upheld as long as
    /// this struct exists:
    ///
    /// 1. The first `size_of::<V>()` bytes of the buffer hold an initialized
    ///    `V`, where `V` is the type `vtable` was created for.
    /// 2. `V` fits in `N` bytes and its alignment is at most [`LOCAL_ALIGN`].
    buffer: LocalBuffer<N>,
    /// The stored value may not be `Send` or `Sync`
    _marker: PhantomData<NonNull<Erased>>,
}

impl<const N: usize> RawLocal<N> {
    /// Moves `value` into a new inline buffer, cloning it with `H` when
    /// requested.
    #[inline]
    pub fn new<V: 'static, H: ValueHandler<V>>(value: V) -> Self {
        const {
            assert!(
                core::mem::size_of::<V>() <= N,
                "value does not fit in the local storage buffer"
            );
            assert!(
                core::mem::align_of::<V>() <= LOCAL_ALIGN,
                "value is aligned more strictly than the local storage buffer"
            );
        }

        let mut buffer = LocalBuffer::<N>::uninit();
        // SAFETY: The buffer is at least `size_of::<V>()` bytes long and aligned to
        // `LOCAL_ALIGN >= align_of::<V>()`, as checked above.
        unsafe { buffer.as_mut_ptr().cast::<V>().write(value) };

        Self {
            vtable: ValueVtable::new::<V, H>(),
            buffer,
            _marker: PhantomData,
        }
    }

    /// Returns a shared pointer to the stored value.
    #[inline]
    pub fn as_ref(&self) -> RawValueRef<'_> {
        // SAFETY:
        // 1. The buffer holds a `V` matching `vtable`, by our invariants.
        // 2. The value lives as long as `self`, and `&self` prevents mutation.
        unsafe { RawValueRef::new(self.buffer.as_ptr(), self.vtable) }
    }

    /// Returns an exclusive pointer to the stored value.
    #[inline]
    pub fn as_mut(&mut self) -> RawValueMut<'_> {
        let ptr = self.buffer.as_mut_ptr();
        // SAFETY:
        // 1. The buffer holds a `V` matching `vtable`, by our invariants.
        // 2. `&mut self` guarantees exclusivity.
        unsafe { RawValueMut::new(ptr, self.vtable) }
    }

    /// Returns the [`TypeId`] of the stored value.
    #[inline]
    pub fn type_id(&self) -> TypeId {
        self.vtable.type_id()
    }

    /// Returns the [`core::any::type_name`] of the stored value.
    #[inline]
    pub fn type_name(&self) -> &'static str {
        self.vtable.type_name()
    }

    /// Clones the stored value into a new inline buffer.
    ///
    /// Returns `None` when the value was stored with a handler that refuses
    /// to clone.
    pub fn try_clone(&self) -> Option<Self> {
        let mut buffer = LocalBuffer::<N>::uninit();
        let dst = buffer.as_mut_ptr();

        // SAFETY:
        // 1. Our buffer holds a `V` matching `vtable`, by our invariants.
        // 2. The new buffer has the same size and alignment as ours, which hold
        //    a `V` by our invariants.
        let cloned = unsafe { self.vtable.clone_into(self.buffer.as_ptr(), dst) };
        if !cloned {
            return None;
        }

        Some(Self {
            vtable: self.vtable,
            buffer,
            _marker: PhantomData,
        })
    }
}

impl<const N: usize> Drop for RawLocal<N> {
    fn drop(&mut self) {
        let ptr = self.buffer.as_mut_ptr();
        // SAFETY:
        // 1. The buffer holds a `V` matching `vtable`, by our invariants.
        // 2. We are in `Drop`, so the value is never used again.
        unsafe { self.vtable.drop_in_place(ptr) }
    }
}

impl<const N: usize> core::fmt::Debug for RawLocal<N> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("RawLocal")
            .field("capacity", &N)
            .field("type_name", &self.type_name())
            .finish_non_exhaustive()
    }
}
