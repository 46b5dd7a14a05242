//! Storage policies deciding where a handle keeps its bound value.
//!
//! - [`HeapStorage`]: the value lives in its own heap allocation. Any value can
//!   be stored. This is the default.
//! - [`LocalStorage<N>`]: the value lives inside the handle, in an `N`-byte
//!   buffer aligned to [`LOCAL_ALIGN`] bytes. Storing a larger or more
//!   strictly aligned value fails to compile.
//!
//! Both policies drop the value exactly once and clone it exactly once per
//! clone of a [`Cloneable`](crate::markers::Cloneable) handle.
//!
//! ```
//! use dynpoly::storage::{HeapStorage, LocalStorage, Storage};
//!
//! let heap = HeapStorage::new_cloneable(String::from("boxed"));
//! let local = LocalStorage::<32>::new(String::from("inline"));
//!
//! assert_eq!(heap.try_clone().unwrap().downcast_ref::<String>().unwrap(), "boxed");
//! assert_eq!(local.downcast_ref::<String>().unwrap(), "inline");
//! assert!(local.try_clone().is_none());
//! ```
//!
//! ```compile_fail
//! use dynpoly::storage::LocalStorage;
//!
//! let _too_big = LocalStorage::<8>::new([0u64; 2]);
//! ```

use core::any::TypeId;

pub use dynpoly_internals::{LOCAL_ALIGN, ValueHandler};
use dynpoly_internals::{RawHeap, RawLocal, RawValueMut, RawValueRef};

use crate::markers::{Cloneable, Uncloneable};

mod sealed_storage {
    pub trait Sealed: 'static {}

    impl Sealed for super::HeapStorage {}
    impl<const N: usize> Sealed for super::LocalStorage<N> {}
}

/// A policy owning exactly one value of an erased concrete type.
///
/// This trait is sealed and implemented for [`HeapStorage`] and
/// [`LocalStorage`].
pub trait Storage: sealed_storage::Sealed + Sized {
    /// Stores `value`, cloning it with `H` whenever the storage is cloned.
    fn store<V: 'static, H: ValueHandler<V>>(value: V) -> Self;

    /// The stored value, erased.
    #[doc(hidden)]
    fn as_raw(&self) -> RawValueRef<'_>;

    /// The stored value, erased.
    #[doc(hidden)]
    fn as_raw_mut(&mut self) -> RawValueMut<'_>;

    /// Clones the stored value into a new storage, or returns `None` if it was
    /// stored with a handler that refuses to clone.
    fn try_clone(&self) -> Option<Self>;

    /// The [`TypeId`] of the stored value.
    fn value_type_id(&self) -> TypeId;

    /// The type name of the stored value.
    fn value_type_name(&self) -> &'static str;

    /// The stored value, if it has type `V`.
    fn downcast_ref<V: 'static>(&self) -> Option<&V> {
        self.as_raw().downcast::<V>()
    }

    /// The stored value, if it has type `V`.
    fn downcast_mut<V: 'static>(&mut self) -> Option<&mut V> {
        self.as_raw_mut().downcast::<V>()
    }
}

/// Stores the value in its own heap allocation.
#[derive(Debug)]
pub struct HeapStorage(RawHeap);

impl HeapStorage {
    /// Boxes `value`. The storage cannot be cloned.
    pub fn new<V: 'static>(value: V) -> Self {
        Self::store::<V, Uncloneable>(value)
    }

    /// Boxes `value`. Cloning the storage clones the value.
    pub fn new_cloneable<V: Clone + 'static>(value: V) -> Self {
        Self::store::<V, Cloneable>(value)
    }
}

impl Storage for HeapStorage {
    #[inline]
    fn store<V: 'static, H: ValueHandler<V>>(value: V) -> Self {
        Self(RawHeap::new::<V, H>(value))
    }

    #[inline]
    fn as_raw(&self) -> RawValueRef<'_> {
        self.0.as_ref()
    }

    #[inline]
    fn as_raw_mut(&mut self) -> RawValueMut<'_> {
        self.0.as_mut()
    }

    fn try_clone(&self) -> Option<Self> {
        self.0.try_clone().map(Self)
    }

    fn value_type_id(&self) -> TypeId {
        self.0.type_id()
    }

    fn value_type_name(&self) -> &'static str {
        self.0.type_name()
    }
}

/// Stores the value inline in an `N`-byte buffer aligned to [`LOCAL_ALIGN`].
#[derive(Debug)]
pub struct LocalStorage<const N: usize>(RawLocal<N>);

impl<const N: usize> LocalStorage<N> {
    /// Moves `value` into the buffer. The storage cannot be cloned.
    pub fn new<V: 'static>(value: V) -> Self {
        Self::store::<V, Uncloneable>(value)
    }

    /// Moves `value` into the buffer. Cloning the storage clones the value.
    pub fn new_cloneable<V: Clone + 'static>(value: V) -> Self {
        Self::store::<V, Cloneable>(value)
    }
}

impl<const N: usize> Storage for LocalStorage<N> {
    #[inline]
    fn store<V: 'static, H: ValueHandler<V>>(value: V) -> Self {
        Self(RawLocal::<N>::new::<V, H>(value))
    }

    #[inline]
    fn as_raw(&self) -> RawValueRef<'_> {
        self.0.as_ref()
    }

    #[inline]
    fn as_raw_mut(&mut self) -> RawValueMut<'_> {
        self.0.as_mut()
    }

    fn try_clone(&self) -> Option<Self> {
        self.0.try_clone().map(Self)
    }

    fn value_type_id(&self) -> TypeId {
        self.0.type_id()
    }

    fn value_type_name(&self) -> &'static str {
        self.0.type_name()
    }
}
