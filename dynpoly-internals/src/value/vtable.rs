//! Vtable for type-erased value operations.
//!
//! This module contains the [`ValueVtable`] which enables dropping and
//! cloning a stored value when its concrete type `V` has been erased.
//!
//! This module encapsulates the fields of [`ValueVtable`] so they cannot be
//! accessed directly. This visibility restriction guarantees the safety
//! invariant: **the vtable's type parameters match the actual value type
//! behind the pointer it is paired with**.
//!
//! # Safety Invariant
//!
//! This invariant is maintained because vtables are created as `&'static`
//! references via [`ValueVtable::new`], which pairs the function pointers
//! with specific types `V` and `H` at compile time, and because the storage
//! types only pair a vtable with a pointer they created from a `V`.

use alloc::boxed::Box;
use core::{any::TypeId, ptr::NonNull};

use crate::{util::Erased, value::ValueHandler};

/// Vtable for type-erased value operations.
///
/// # Safety Invariant
///
/// The fields `drop_boxed`, `drop_in_place`, `clone_boxed` and `clone_into`
/// are guaranteed to point to the functions defined below instantiated with
/// the value type `V` and handler type `H` that were used to create this
/// [`ValueVtable`].
pub(crate) struct ValueVtable {
    /// Gets the [`TypeId`] of the value type that was used to create this
    /// [`ValueVtable`].
    type_id: fn() -> TypeId,
    /// Gets the [`core::any::type_name`] of the value type.
    type_name: fn() -> &'static str,
    /// Drops the `Box<V>` pointed to by this pointer.
    drop_boxed: unsafe fn(NonNull<Erased>),
    /// Drops the `V` pointed to by this pointer without deallocating.
    drop_in_place: unsafe fn(NonNull<Erased>),
    /// Clones the `V` pointed to into a fresh `Box<V>`.
    clone_boxed: unsafe fn(NonNull<Erased>) -> Option<NonNull<Erased>>,
    /// Clones the `V` pointed to by the first pointer into the uninitialized
    /// memory behind the second one.
    clone_into: unsafe fn(NonNull<Erased>, NonNull<Erased>) -> bool,
}

impl ValueVtable {
    /// Creates a new [`ValueVtable`] for the value type `V` and the handler
    /// type `H`.
    pub(crate) const fn new<V: 'static, H: ValueHandler<V>>() -> &'static Self {
        const {
            &Self {
                type_id: TypeId::of::<V>,
                type_name: core::any::type_name::<V>,
                drop_boxed: drop_boxed::<V>,
                drop_in_place: drop_in_place::<V>,
                clone_boxed: clone_boxed::<V, H>,
                clone_into: clone_into::<V, H>,
            }
        }
    }

    /// Gets the [`TypeId`] of the value type that was used to create this
    /// [`ValueVtable`].
    #[inline]
    pub(crate) fn type_id(&self) -> TypeId {
        (self.type_id)()
    }

    /// Gets the [`core::any::type_name`] of the value type that was used to
    /// create this [`ValueVtable`].
    #[inline]
    pub(crate) fn type_name(&self) -> &'static str {
        (self.type_name)()
    }

    /// Drops the `Box<V>` pointed to by this pointer.
    ///
    /// # Safety
    ///
    /// The caller must ensure:
    ///
    /// 1. The pointer comes from [`Box<V>`] via [`Box::into_raw`]
    /// 2. This [`ValueVtable`] is a vtable for the value type `V`.
    /// 3. This method drops the [`Box<V>`], so the caller must ensure that the
    ///    pointer has not previously been dropped, that it is able to transfer
    ///    ownership of the pointer, and that it will not use the pointer after
    ///    calling this method.
    #[inline]
    pub(crate) unsafe fn drop_boxed(&self, ptr: NonNull<Erased>) {
        // SAFETY: We know that `self.drop_boxed` points to the function
        // `drop_boxed::<V>` below. That function's safety requirements are upheld:
        // 1. Guaranteed by the caller
        // 2. Guaranteed by the caller
        // 3. Guaranteed by the caller
        unsafe {
            (self.drop_boxed)(ptr);
        }
    }

    /// Drops the `V` pointed to by this pointer, leaving the memory in place.
    ///
    /// # Safety
    ///
    /// The caller must ensure:
    ///
    /// 1. The pointer points to an initialized, properly aligned value of the
    ///    type `V` this [`ValueVtable`] was created for.
    /// 2. The value is not used again after this call, other than having its
    ///    memory reused or deallocated.
    #[inline]
    pub(crate) unsafe fn drop_in_place(&self, ptr: NonNull<Erased>) {
        // SAFETY: We know that `self.drop_in_place` points to the function
        // `drop_in_place::<V>` below. That function's safety requirements are upheld:
        // 1. Guaranteed by the caller
        // 2. Guaranteed by the caller
        unsafe {
            (self.drop_in_place)(ptr);
        }
    }

    /// Clones the value pointed to into a new `Box<V>`, returning the pointer
    /// obtained from [`Box::into_raw`], or `None` if the handler refuses to
    /// clone.
    ///
    /// # Safety
    ///
    /// The caller must ensure:
    ///
    /// 1. The pointer points to an initialized value of the type `V` this
    ///    [`ValueVtable`] was created for.
    #[inline]
    pub(crate) unsafe fn clone_boxed(&self, ptr: NonNull<Erased>) -> Option<NonNull<Erased>> {
        // SAFETY: We know that `self.clone_boxed` points to the function
        // `clone_boxed::<V, H>` below. That function's safety requirements are upheld:
        // 1. Guaranteed by the caller
        unsafe { (self.clone_boxed)(ptr) }
    }

    /// Clones the value pointed to by `src` into the memory behind `dst`.
    /// Returns `false`, leaving `dst` untouched, if the handler refuses to
    /// clone.
    ///
    /// # Safety
    ///
    /// The caller must ensure:
    ///
    /// 1. `src` points to an initialized value of the type `V` this
    ///    [`ValueVtable`] was created for.
    /// 2. `dst` is valid for writes of a `V` and properly aligned for it.
    #[inline]
    pub(crate) unsafe fn clone_into(&self, src: NonNull<Erased>, dst: NonNull<Erased>) -> bool {
        // SAFETY: We know that `self.clone_into` points to the function
        // `clone_into::<V, H>` below. That function's safety requirements are upheld:
        // 1. Guaranteed by the caller
        // 2. Guaranteed by the caller
        unsafe { (self.clone_into)(src, dst) }
    }
}

/// Drops the [`Box<V>`] instance pointed to by this pointer.
///
/// # Safety
///
/// The caller must ensure:
///
/// 1. The pointer comes from [`Box<V>`] via [`Box::into_raw`]
/// 2. The type `V` matches the actual value type behind the pointer
/// 3. This method drops the [`Box<V>`], so the caller must ensure that the
///    pointer has not previously been dropped, that it is able to transfer
///    ownership of the pointer, and that it will not use the pointer after
///    calling this method.
unsafe fn drop_boxed<V: 'static>(ptr: NonNull<Erased>) {
    let ptr: *mut V = ptr.cast::<V>().as_ptr();
    // SAFETY: Our pointer has the correct type as guaranteed by the caller, and it
    // came from a call to `Box::into_raw` as also guaranteed by our caller.
    let boxed = unsafe { Box::from_raw(ptr) };
    core::mem::drop(boxed);
}

/// Drops the `V` pointed to by this pointer without deallocating.
///
/// # Safety
///
/// The caller must ensure:
///
/// 1. The pointer points to an initialized, properly aligned `V`
/// 2. The value is not used again after this call
unsafe fn drop_in_place<V: 'static>(ptr: NonNull<Erased>) {
    let ptr: *mut V = ptr.cast::<V>().as_ptr();
    // SAFETY: Guaranteed by the caller
    unsafe { core::ptr::drop_in_place(ptr) }
}

/// Clones the `V` pointed to into a new [`Box<V>`].
///
/// # Safety
///
/// The caller must ensure:
///
/// 1. The pointer points to an initialized, properly aligned `V`
unsafe fn clone_boxed<V: 'static, H: ValueHandler<V>>(
    ptr: NonNull<Erased>,
) -> Option<NonNull<Erased>> {
    // SAFETY: The pointer is valid for shared access to a `V`, as guaranteed by
    // the caller.
    let value: &V = unsafe { ptr.cast::<V>().as_ref() };
    let cloned = Box::new(H::try_clone(value)?);
    Some(NonNull::from(Box::leak(cloned)).cast::<Erased>())
}

/// Clones the `V` behind `src` into the memory behind `dst`.
///
/// # Safety
///
/// The caller must ensure:
///
/// 1. `src` points to an initialized, properly aligned `V`
/// 2. `dst` is valid for writes of a `V` and properly aligned for it
unsafe fn clone_into<V: 'static, H: ValueHandler<V>>(
    src: NonNull<Erased>,
    dst: NonNull<Erased>,
) -> bool {
    // SAFETY: `src` is valid for shared access to a `V`, as guaranteed by the
    // caller.
    let value: &V = unsafe { src.cast::<V>().as_ref() };
    match H::try_clone(value) {
        Some(cloned) => {
            // SAFETY: `dst` is valid for writes and aligned, as guaranteed by the
            // caller.
            unsafe { dst.cast::<V>().write(cloned) };
            true
        }
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use alloc::string::String;

    use super::*;

    struct CloneHandler;
    impl<V: Clone + 'static> ValueHandler<V> for CloneHandler {
        fn try_clone(value: &V) -> Option<V> {
            Some(value.clone())
        }
    }

    struct NoCloneHandler;
    impl<V: 'static> ValueHandler<V> for NoCloneHandler {
        fn try_clone(_value: &V) -> Option<V> {
            None
        }
    }

    #[test]
    fn test_value_vtable_eq() {
        let vtable1 = ValueVtable::new::<i32, CloneHandler>();
        let vtable2 = ValueVtable::new::<i32, CloneHandler>();

        // Both should be the exact same static instance
        assert!(core::ptr::eq(vtable1, vtable2));
    }

    #[test]
    fn test_value_vtable_differs_per_handler() {
        let cloning = ValueVtable::new::<i32, CloneHandler>();
        let not_cloning = ValueVtable::new::<i32, NoCloneHandler>();
        assert!(!core::ptr::eq(cloning, not_cloning));
        assert_eq!(cloning.type_id(), not_cloning.type_id());
    }

    #[test]
    fn test_value_type_id_and_name() {
        let vtable = ValueVtable::new::<String, CloneHandler>();
        assert_eq!(vtable.type_id(), TypeId::of::<String>());
        assert_eq!(vtable.type_name(), core::any::type_name::<String>());
    }

    #[test]
    fn test_clone_boxed_respects_handler() {
        let vtable = ValueVtable::new::<String, NoCloneHandler>();
        let value = Box::new(String::from("kept"));
        let ptr = NonNull::from(Box::leak(value)).cast::<Erased>();

        // SAFETY: The pointer points to a `String`, matching the vtable.
        let cloned = unsafe { vtable.clone_boxed(ptr) };
        assert!(cloned.is_none());

        // SAFETY: The pointer came from `Box::into_raw` (via `Box::leak`) and is not
        // used afterwards.
        unsafe { vtable.drop_boxed(ptr) };
    }
}
