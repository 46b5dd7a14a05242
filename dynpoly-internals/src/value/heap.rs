//! Boxed ownership of one erased value.
//!
//! This module encapsulates the fields of [`RawHeap`] so that the pointer and
//! the vtable can never be paired incorrectly.

use alloc::boxed::Box;
use core::{any::TypeId, ptr::NonNull};

use crate::{
    util::Erased,
    value::{RawValueMut, RawValueRef, ValueHandler, vtable::ValueVtable},
};

/// Owns a heap-allocated value of some type `V`, though we do not know which
/// actual `V` it is.
///
/// Moving a [`RawHeap`] never moves the value itself.
pub struct RawHeap {
    /// Pointer to the boxed value
    ///
    /// # Safety
    ///
    /// The following safety invariants are guaranteed to be upheld as long as
    /// this struct exists:
    ///
    /// 1. The pointer came from [`Box::into_raw`] on a `Box<V>`, where `V` is
    ///    the type `vtable` was created for.
    /// 2. This struct owns the allocation and nothing else accesses it except
    ///    through borrows of this struct.
    ptr: NonNull<Erased>,
    /// Vtable created for `V`
    vtable: &'static ValueVtable,
}

impl RawHeap {
    /// Moves `value` into a new heap allocation, cloning it with `H` when
    /// requested.
    #[inline]
    pub fn new<V: 'static, H: ValueHandler<V>>(value: V) -> Self {
        let boxed = Box::new(value);
        let ptr: *mut V = Box::into_raw(boxed);
        // SAFETY: `Box::into_raw` never returns a null pointer.
        let ptr: NonNull<V> = unsafe { NonNull::new_unchecked(ptr) };

        Self {
            ptr: ptr.cast::<Erased>(),
            vtable: ValueVtable::new::<V, H>(),
        }
    }

    /// Returns a shared pointer to the stored value.
    #[inline]
    pub fn as_ref(&self) -> RawValueRef<'_> {
        // SAFETY:
        // 1. The pointer points to a `V` matching `vtable`, by our invariants.
        // 2. The value lives as long as `self`, and `&self` prevents mutation.
        unsafe { RawValueRef::new(self.ptr, self.vtable) }
    }

    /// Returns an exclusive pointer to the stored value.
    #[inline]
    pub fn as_mut(&mut self) -> RawValueMut<'_> {
        // SAFETY:
        // 1. The pointer points to a `V` matching `vtable`, by our invariants.
        // 2. We own the allocation and `&mut self` guarantees exclusivity.
        unsafe { RawValueMut::new(self.ptr, self.vtable) }
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

    /// Clones the stored value into a new allocation.
    ///
    /// Returns `None` when the value was stored with a handler that refuses
    /// to clone.
    pub fn try_clone(&self) -> Option<Self> {
        // SAFETY:
        // 1. The pointer points to a `V` matching `vtable`, by our invariants.
        let ptr = unsafe { self.vtable.clone_boxed(self.ptr) }?;
        Some(Self {
            ptr,
            vtable: self.vtable,
        })
    }
}

impl Drop for RawHeap {
    fn drop(&mut self) {
        // SAFETY:
        // 1. The pointer came from `Box::into_raw`, by our invariants.
        // 2. The vtable was created for the boxed type, by our invariants.
        // 3. We are in `Drop`, so the pointer is never used again.
        unsafe { self.vtable.drop_boxed(self.ptr) }
    }
}

impl core::fmt::Debug for RawHeap {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("RawHeap")
            .field("type_name", &self.type_name())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use alloc::{rc::Rc, string::String};
    use core::cell::Cell;

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

    struct DropCounter(Rc<Cell<usize>>);
    impl Drop for DropCounter {
        fn drop(&mut self) {
            self.0.set(self.0.get() + 1);
        }
    }

    #[test]
    fn test_raw_heap_send_sync() {
        static_assertions::assert_not_impl_any!(RawHeap: Send, Sync);
    }

    #[test]
    fn test_raw_heap_access() {
        let mut heap = RawHeap::new::<String, CloneHandler>(String::from("hello"));
        assert_eq!(heap.type_id(), TypeId::of::<String>());
        assert_eq!(heap.as_ref().downcast::<String>().unwrap(), "hello");
        assert!(heap.as_ref().downcast::<i32>().is_none());

        heap.as_mut().downcast::<String>().unwrap().push_str(" world");
        assert_eq!(heap.as_ref().downcast::<String>().unwrap(), "hello world");
    }

    #[test]
    fn test_raw_heap_clone_is_independent() {
        let mut original = RawHeap::new::<String, CloneHandler>(String::from("a"));
        let copy = original.try_clone().unwrap();
        original.as_mut().downcast::<String>().unwrap().push('b');

        assert_eq!(original.as_ref().downcast::<String>().unwrap(), "ab");
        assert_eq!(copy.as_ref().downcast::<String>().unwrap(), "a");
    }

    #[test]
    fn test_raw_heap_clone_refused() {
        let heap = RawHeap::new::<String, NoCloneHandler>(String::from("a"));
        assert!(heap.try_clone().is_none());
    }

    #[test]
    fn test_raw_heap_drops_value_once() {
        let drops = Rc::new(Cell::new(0));
        let heap = RawHeap::new::<DropCounter, NoCloneHandler>(DropCounter(drops.clone()));
        assert_eq!(drops.get(), 0);
        drop(heap);
        assert_eq!(drops.get(), 1);
    }
}
