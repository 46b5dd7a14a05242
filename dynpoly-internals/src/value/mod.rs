//! Type-erased ownership of one concrete value.
//!
//! A value is either boxed ([`RawHeap`]) or embedded in a fixed-capacity
//! buffer ([`RawLocal`]). Both store a `&'static` [`ValueVtable`] created for
//! the concrete type, which is the only way the erased value is ever dropped
//! or cloned.
//!
//! [`ValueVtable`]: vtable::ValueVtable

mod heap;
mod local;
mod ptr;
pub(crate) mod vtable;

pub use self::{
    heap::RawHeap,
    local::{LOCAL_ALIGN, RawLocal},
    ptr::{RawValueMut, RawValueRef},
};

/// Decides the clone behavior of values of type `V`.
///
/// The handler is chosen when a value is stored and is captured in the
/// value's vtable, so later clones of the erased value go through
/// [`try_clone`](ValueHandler::try_clone) without knowing `V`.
///
/// # Examples
///
/// ```
/// use dynpoly_internals::{RawHeap, ValueHandler};
///
/// struct NeverClone;
///
/// impl<V: 'static> ValueHandler<V> for NeverClone {
///     fn try_clone(_value: &V) -> Option<V> {
///         None
///     }
/// }
///
/// let heap = RawHeap::new::<String, NeverClone>(String::from("value"));
/// assert!(heap.try_clone().is_none());
/// ```
pub trait ValueHandler<V>: 'static {
    /// Clones the value, or returns `None` if values stored with this handler
    /// cannot be cloned.
    fn try_clone(value: &V) -> Option<V>;
}
