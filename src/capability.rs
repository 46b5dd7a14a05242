//! Capability sets and how concrete types are bound to them.
//!
//! A capability set is a type naming a group of call shapes. Concrete types
//! join the set through [`Bind`], which registers one implementation per call
//! shape. The concrete types themselves never implement anything:
//!
//! ```
//! use dynpoly::prelude::*;
//!
//! method! {
//!     pub struct Area: fn(&self) -> f64;
//! }
//!
//! pub struct Shape;
//! impl Capability for Shape {}
//!
//! impl Bind<f64> for Shape {
//!     fn bind(table: &mut TableBuilder<Self, f64>) {
//!         table.method::<Area>(|side, ()| side * side);
//!     }
//! }
//!
//! let square: Poly<Shape> = Poly::new(3.0_f64);
//! assert_eq!(square.call::<Area>(()), 9.0);
//! ```
//!
//! A concrete type without a [`Bind`] implementation cannot be bound:
//!
//! ```compile_fail
//! use dynpoly::prelude::*;
//!
//! pub struct Shape;
//! impl Capability for Shape {}
//!
//! let _poly: Poly<Shape> = Poly::new(3u8);
//! ```

use crate::dispatch::TableBuilder;

/// A set of call shapes that concrete types can be bound to.
///
/// The implementing type is only used as a key. Its slot layout is registered
/// the first time a dispatch table is built for it, see
/// [`registry`](crate::registry).
pub trait Capability: 'static {
    /// A human-readable name used in error reports.
    fn name() -> &'static str {
        core::any::type_name::<Self>()
    }
}

/// Binds the concrete type `V` to the capability set `Self`.
///
/// [`bind`](Bind::bind) registers the implementations in slot order. Every
/// concrete type bound to the same capability set must register the same
/// call shapes in the same order, otherwise building its dispatch table fails
/// with [`BindError::LayoutMismatch`](crate::BindError::LayoutMismatch).
///
/// When extending another capability set, call
/// [`extends`](TableBuilder::extends) first: later registrations replace
/// inherited ones.
pub trait Bind<V: 'static>: Capability + Sized {
    /// Registers the implementations of every call shape for `V`.
    fn bind(table: &mut TableBuilder<Self, V>);
}
