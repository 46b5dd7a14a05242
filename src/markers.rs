//! Marker types and traits for the clone and thread-safety behavior of
//! [`Poly`](crate::Poly) handles.
//!
//! # Ownership Markers
//!
//! - [`Uncloneable`]: The handle owns its value and cannot be cloned. Any
//!   `'static` value can be bound. This is the default.
//! - [`Cloneable`]: The handle implements [`Clone`], deep-cloning the bound
//!   value. Only values implementing [`Clone`] can be bound.
//!
//! # Thread-Safety Markers
//!
//! - [`SendSync`]: The handle is `Send + Sync`, and only values that are
//!   `Send + Sync` can be bound. This is the default.
//! - [`Local`]: The handle is neither `Send` nor `Sync`, and any value can be
//!   bound, including `Rc` and other thread-local data.
//!
//! # Examples
//!
//! ```
//! use std::rc::Rc;
//!
//! use dynpoly::prelude::*;
//!
//! method! {
//!     pub struct Len: fn(&self) -> usize;
//! }
//!
//! struct Measured;
//! impl Capability for Measured {}
//!
//! impl Bind<Rc<str>> for Measured {
//!     fn bind(table: &mut TableBuilder<Self, Rc<str>>) {
//!         table.method::<Len>(|s, ()| s.len());
//!     }
//! }
//!
//! impl Bind<String> for Measured {
//!     fn bind(table: &mut TableBuilder<Self, String>) {
//!         table.method::<Len>(|s, ()| s.len());
//!     }
//! }
//!
//! // `Rc` is not thread-safe, so the handle must be `Local`
//! let local: Poly<Measured, HeapStorage, DynamicTable, markers::Uncloneable, markers::Local> =
//!     Poly::new(Rc::<str>::from("abc"));
//! assert_eq!(local.call::<Len>(()), 3);
//!
//! // `String` is `Clone`, so the handle can be `Cloneable`
//! let cloneable: Poly<Measured, HeapStorage, DynamicTable, markers::Cloneable> =
//!     Poly::new(String::from("abcd"));
//! assert_eq!(cloneable.clone().call::<Len>(()), 4);
//! ```

use dynpoly_internals::ValueHandler;

/// Marker type for handles that cannot be cloned.
///
/// Any `'static` value can be bound to a handle using this marker. This is the
/// default ownership marker of [`Poly`](crate::Poly).
///
/// ```compile_fail
/// use dynpoly::prelude::*;
///
/// struct Empty;
/// impl Capability for Empty {}
/// impl Bind<u8> for Empty {
///     fn bind(_table: &mut TableBuilder<Self, u8>) {}
/// }
///
/// let poly: Poly<Empty> = Poly::new(1u8);
/// let _copy = poly.clone(); // ❌ Won't compile
/// ```
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Debug, Default, Hash)]
pub struct Uncloneable;

/// Marker type for handles implementing [`Clone`].
///
/// Cloning the handle clones the bound value. Binding a value that does not
/// implement [`Clone`] fails to compile:
///
/// ```compile_fail
/// use dynpoly::prelude::*;
///
/// struct NotClone;
///
/// struct Empty;
/// impl Capability for Empty {}
/// impl Bind<NotClone> for Empty {
///     fn bind(_table: &mut TableBuilder<Self, NotClone>) {}
/// }
///
/// let _poly: Poly<Empty, HeapStorage, DynamicTable, markers::Cloneable> = Poly::new(NotClone);
/// ```
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Debug, Default, Hash)]
pub struct Cloneable;

/// Marker type for handles that are `Send + Sync`.
///
/// Only values that are `Send + Sync` can be bound. This is the default
/// thread-safety marker of [`Poly`](crate::Poly).
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Debug, Default, Hash)]
pub struct SendSync;

/// Marker type for handles that are neither `Send` nor `Sync`.
///
/// Any value can be bound, including thread-local data:
///
/// ```compile_fail
/// use std::rc::Rc;
///
/// use dynpoly::prelude::*;
///
/// struct Empty;
/// impl Capability for Empty {}
/// impl Bind<Rc<u8>> for Empty {
///     fn bind(_table: &mut TableBuilder<Self, Rc<u8>>) {}
/// }
///
/// let poly: Poly<Empty, HeapStorage, DynamicTable, markers::Uncloneable, markers::Local> =
///     Poly::new(Rc::new(1u8));
/// std::thread::spawn(move || drop(poly)); // ❌ Won't compile
/// ```
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Debug, Default, Hash)]
pub struct Local;

mod sealed_ownership_marker {
    use super::*;

    pub trait Sealed: 'static {}

    impl Sealed for Uncloneable {}
    impl Sealed for Cloneable {}
}

/// Marker trait for the clone behavior of handles.
///
/// This trait is sealed and implemented for [`Uncloneable`] and
/// [`Cloneable`]. Which values may be bound is decided by
/// [`ValueHandler`], which both markers implement: [`Uncloneable`] for every
/// value, [`Cloneable`] only for values implementing [`Clone`].
pub trait OwnershipMarker: sealed_ownership_marker::Sealed {}

impl OwnershipMarker for Uncloneable {}
impl OwnershipMarker for Cloneable {}

impl<V: 'static> ValueHandler<V> for Uncloneable {
    #[inline]
    fn try_clone(_value: &V) -> Option<V> {
        None
    }
}

impl<V: Clone + 'static> ValueHandler<V> for Cloneable {
    #[inline]
    fn try_clone(value: &V) -> Option<V> {
        Some(value.clone())
    }
}

mod sealed_thread_marker {
    use super::*;

    pub trait Sealed: 'static {}

    impl Sealed for SendSync {}
    impl Sealed for Local {}
}

/// Marker trait for the thread-safety behavior of handles.
///
/// This trait is sealed and implemented for [`SendSync`] and [`Local`].
pub trait ThreadMarker: sealed_thread_marker::Sealed {}

impl ThreadMarker for SendSync {}
impl ThreadMarker for Local {}

/// Marker trait for values that can be bound to a handle with the
/// thread-safety marker `T`.
///
/// # Implementations
///
/// - For `T = Local`: Implemented for all `Sized + 'static` types.
/// - For `T = SendSync`: Implemented only for `Sized + 'static` types that are
///   also `Send + Sync`.
///
/// This trait is used as a bound when binding values, so it is impossible to
/// create a `SendSync` handle around a value that is not thread-safe.
pub trait ObjectMarkerFor<T>: Sized + 'static {}

impl<O: Sized + 'static> ObjectMarkerFor<Local> for O {}

impl<O: Sized + 'static> ObjectMarkerFor<SendSync> for O where O: Send + Sync {}

#[cfg(test)]
mod tests {
    use alloc::{rc::Rc, string::String};

    use super::*;

    #[test]
    fn test_markers_are_zero_sized() {
        static_assertions::assert_eq_size!(Uncloneable, ());
        static_assertions::assert_eq_size!(Cloneable, ());
        static_assertions::assert_eq_size!(SendSync, ());
        static_assertions::assert_eq_size!(Local, ());
    }

    #[test]
    fn test_object_marker_bounds() {
        static_assertions::assert_impl_all!(
            String: ObjectMarkerFor<SendSync>,
            ObjectMarkerFor<Local>
        );
        static_assertions::assert_impl_all!(Rc<u8>: ObjectMarkerFor<Local>);
        static_assertions::assert_not_impl_any!(Rc<u8>: ObjectMarkerFor<SendSync>);
    }

    #[test]
    fn test_value_handlers() {
        let value = String::from("value");
        assert_eq!(<Cloneable as ValueHandler<String>>::try_clone(&value), Some(value.clone()));
        assert_eq!(<Uncloneable as ValueHandler<String>>::try_clone(&value), None);
    }
}
