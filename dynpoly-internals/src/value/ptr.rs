//! Lifetime-bound pointers to an erased value.
//!
//! This module encapsulates the fields of [`RawValueRef`] and
//! [`RawValueMut`]. They can only be created by the storage types of this
//! crate, which pair a pointer to a live value with the vtable created for
//! that value's type. This guarantees the safety invariant: **the `vtable`
//! always describes the type of the value behind `ptr`**.

use core::{any::TypeId, marker::PhantomData, ptr::NonNull};

use crate::{util::Erased, value::vtable::ValueVtable};

/// A lifetime-bound shared pointer to a value of some specific type `V`,
/// though we do not know which actual `V` it is.
///
/// Behaves like a `&'a V`: the value is initialized and not mutated for the
/// whole lifetime `'a`.
#[derive(Clone, Copy)]
pub struct RawValueRef<'a> {
    /// Pointer to the value
    ///
    /// # Safety
    ///
    /// The following safety invariants are guaranteed to be upheld as long as
    /// this struct exists:
    ///
    /// 1. The pointer points to an initialized, properly aligned value of the
    ///    type described by `vtable`.
    /// 2. The pointer is valid for shared access for the lifetime `'a`.
    ptr: NonNull<Erased>,
    /// Vtable created for the type of the value
    vtable: &'static ValueVtable,
    /// Marker to tell the compiler that we should
    /// behave the same as a `&'a Erased`
    _marker: PhantomData<&'a Erased>,
}

impl<'a> RawValueRef<'a> {
    /// Creates a new [`RawValueRef`].
    ///
    /// # Safety
    ///
    /// The caller must ensure:
    ///
    /// 1. `ptr` points to an initialized, properly aligned value of the type
    ///    `vtable` was created for.
    /// 2. `ptr` is valid for shared access for the lifetime `'a`.
    #[inline]
    pub(crate) unsafe fn new(ptr: NonNull<Erased>, vtable: &'static ValueVtable) -> Self {
        Self {
            ptr,
            vtable,
            _marker: PhantomData,
        }
    }

    /// Returns the [`TypeId`] of the value.
    #[inline]
    pub fn type_id(self) -> TypeId {
        self.vtable.type_id()
    }

    /// Returns the [`core::any::type_name`] of the value.
    #[inline]
    pub fn type_name(self) -> &'static str {
        self.vtable.type_name()
    }

    /// Accesses the value as a reference to the specified type.
    ///
    /// # Safety
    ///
    /// The caller must ensure that the type `V` matches the actual type of the
    /// value.
    #[inline]
    pub unsafe fn cast<V: 'static>(self) -> &'a V {
        // Debug assertion to catch type mismatches in case of bugs
        debug_assert_eq!(self.type_id(), TypeId::of::<V>());

        // SAFETY: Converting the NonNull pointer to a reference is sound because:
        // - The pointer is non-null, properly aligned, and dereferenceable (guaranteed
        //   by RawValueRef's type invariants)
        // - The type `V` matches the actual value type (guaranteed by caller)
        // - Shared access is allowed for `'a`
        unsafe { self.ptr.cast::<V>().as_ref() }
    }

    /// Accesses the value as a reference to the specified type, if it has
    /// that type.
    #[inline]
    pub fn downcast<V: 'static>(self) -> Option<&'a V> {
        if self.type_id() == TypeId::of::<V>() {
            // SAFETY: We just checked that the type matches.
            Some(unsafe { self.cast::<V>() })
        } else {
            None
        }
    }
}

/// A lifetime-bound exclusive pointer to a value of some specific type `V`,
/// though we do not know which actual `V` it is.
///
/// Behaves like a `&'a mut V`.
pub struct RawValueMut<'a> {
    /// Pointer to the value
    ///
    /// # Safety
    ///
    /// The following safety invariants are guaranteed to be upheld as long as
    /// this struct exists:
    ///
    /// 1. The pointer points to an initialized, properly aligned value of the
    ///    type described by `vtable`.
    /// 2. The pointer is valid for exclusive access for the lifetime `'a`.
    ptr: NonNull<Erased>,
    /// Vtable created for the type of the value
    vtable: &'static ValueVtable,
    /// Marker to tell the compiler that we should
    /// behave the same as a `&'a mut Erased`
    _marker: PhantomData<&'a mut Erased>,
}

impl<'a> RawValueMut<'a> {
    /// Creates a new [`RawValueMut`].
    ///
    /// # Safety
    ///
    /// The caller must ensure:
    ///
    /// 1. `ptr` points to an initialized, properly aligned value of the type
    ///    `vtable` was created for.
    /// 2. `ptr` is valid for exclusive access for the lifetime `'a`.
    #[inline]
    pub(crate) unsafe fn new(ptr: NonNull<Erased>, vtable: &'static ValueVtable) -> Self {
        Self {
            ptr,
            vtable,
            _marker: PhantomData,
        }
    }

    /// Reborrows the pointer for a shorter lifetime.
    #[inline]
    pub fn reborrow<'b>(&'b mut self) -> RawValueMut<'b> {
        RawValueMut {
            ptr: self.ptr,
            vtable: self.vtable,
            _marker: PhantomData,
        }
    }

    /// Converts into a shared pointer for the same lifetime.
    #[inline]
    pub fn into_ref(self) -> RawValueRef<'a> {
        // SAFETY: Exclusive access for `'a` implies shared access for `'a`, and the
        // vtable still describes the value.
        unsafe { RawValueRef::new(self.ptr, self.vtable) }
    }

    /// Returns the [`TypeId`] of the value.
    #[inline]
    pub fn type_id(&self) -> TypeId {
        self.vtable.type_id()
    }

    /// Returns the [`core::any::type_name`] of the value.
    #[inline]
    pub fn type_name(&self) -> &'static str {
        self.vtable.type_name()
    }

    /// Accesses the value as a mutable reference to the specified type.
    ///
    /// # Safety
    ///
    /// The caller must ensure that the type `V` matches the actual type of the
    /// value.
    #[inline]
    pub unsafe fn cast<V: 'static>(self) -> &'a mut V {
        debug_assert_eq!(self.type_id(), TypeId::of::<V>());

        // SAFETY: Converting the NonNull pointer to a mutable reference is sound
        // because:
        // - The pointer is non-null, properly aligned, and dereferenceable (guaranteed
        //   by RawValueMut's type invariants)
        // - The type `V` matches the actual value type (guaranteed by caller)
        // - We have exclusive access for `'a`, and `self` is consumed
        unsafe { self.ptr.cast::<V>().as_mut() }
    }

    /// Accesses the value as a mutable reference to the specified type, if it
    /// has that type.
    #[inline]
    pub fn downcast<V: 'static>(self) -> Option<&'a mut V> {
        if self.type_id() == TypeId::of::<V>() {
            // SAFETY: We just checked that the type matches.
            Some(unsafe { self.cast::<V>() })
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_send_sync() {
        static_assertions::assert_not_impl_any!(RawValueRef<'_>: Send, Sync);
        static_assertions::assert_not_impl_any!(RawValueMut<'_>: Send, Sync);
    }

    #[test]
    fn test_pointer_sizes() {
        assert_eq!(
            core::mem::size_of::<RawValueRef<'_>>(),
            2 * core::mem::size_of::<usize>()
        );
        assert_eq!(
            core::mem::size_of::<Option<RawValueMut<'_>>>(),
            2 * core::mem::size_of::<usize>()
        );
    }
}
