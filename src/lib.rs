#![cfg_attr(not(doc), no_std)]
#![deny(
    missing_docs,
    clippy::alloc_instead_of_core,
    clippy::std_instead_of_alloc,
    clippy::std_instead_of_core,
    clippy::missing_safety_doc,
    clippy::undocumented_unsafe_blocks,
    clippy::multiple_unsafe_ops_per_block,
    clippy::as_ptr_cast_mut,
    clippy::ptr_as_ptr,
    rustdoc::invalid_rust_codeblocks,
    rustdoc::broken_intra_doc_links,
    missing_copy_implementations,
    unused_doc_comments
)]
// Extra checks on nightly
#![cfg_attr(nightly_extra_checks, feature(rustdoc_missing_doc_code_examples))]
#![cfg_attr(nightly_extra_checks, forbid(rustdoc::missing_doc_code_examples))]
// Make docs.rs generate better docs
#![cfg_attr(docsrs, feature(doc_cfg))]

//! Non-intrusive runtime polymorphism for Rust.
//!
//! ## Overview
//!
//! This crate lets unrelated concrete types be used through one value-semantic
//! handle without implementing a trait on them and without a `dyn Trait`
//! object. Instead, a *capability set* names a group of *call shapes*, and
//! each concrete type is bound to the set by registering one implementation
//! per call shape. The handle, [`Poly`], owns the value and a dispatch table
//! built from those registrations.
//!
//! Because the binding lives on the capability set rather than on the
//! concrete type, types from other crates can be bound, the same type can be
//! bound differently to different capability sets, and overloads are just
//! distinct call shapes.
//!
//! ## Quick Example
//!
//! ```
//! use dynpoly::prelude::*;
//!
//! method! {
//!     pub struct Draw<'a>: fn(&self, &'a mut String);
//! }
//!
//! pub struct Drawable;
//! impl Capability for Drawable {}
//!
//! struct Square;
//! struct Circle { radius: u32 }
//!
//! impl Bind<Square> for Drawable {
//!     fn bind(table: &mut TableBuilder<Self, Square>) {
//!         table.method::<Draw>(|_, (out,)| out.push_str("Square "));
//!     }
//! }
//!
//! impl Bind<Circle> for Drawable {
//!     fn bind(table: &mut TableBuilder<Self, Circle>) {
//!         table.method::<Draw>(|circle, (out,)| {
//!             out.push_str(&format!("Circle({}) ", circle.radius));
//!         });
//!     }
//! }
//!
//! let shapes: Vec<Poly<Drawable>> = vec![Poly::new(Square), Poly::new(Circle { radius: 2 })];
//!
//! let mut out = String::new();
//! for shape in &shapes {
//!     shape.call::<Draw>((&mut out,));
//! }
//! assert_eq!(out, "Square Circle(2) ");
//! ```
//!
//! ## Core Concepts
//!
//! - A **call shape** is a zero-sized key type implementing [`Method`],
//!   usually declared with [`method!`]. It fixes the receiver (`&self` or
//!   `&mut self`), the argument tuple and the output.
//! - A **capability set** is a type implementing [`Capability`]. Its
//!   [`registry::Layout`] lists its call shapes in slot order and is
//!   registered by the first dispatch table built for it.
//! - A **binding** is an implementation of [`Bind<V>`] for the capability set.
//!   It fills a [`TableBuilder`](dispatch::TableBuilder), optionally starting
//!   from another capability set's entries with
//!   [`extends`](dispatch::TableBuilder::extends).
//! - A **handle** is a [`Poly`]. It owns one value and its table and routes
//!   [`call`](Poly::call) and [`call_mut`](Poly::call_mut) to the registered
//!   implementation.
//!
//! ## Handle Type Parameters
//!
//! [`Poly`] is generic over its storage, dispatch, ownership and thread-safety
//! policies. The defaults box the value, give every handle its own
//! replaceable table, refuse cloning and require thread-safe values:
//!
//! ```
//! use dynpoly::prelude::*;
//!
//! method! {
//!     pub struct Get: fn(&self) -> u64;
//! }
//!
//! pub struct Getter;
//! impl Capability for Getter {}
//! impl Bind<u64> for Getter {
//!     fn bind(table: &mut TableBuilder<Self, u64>) {
//!         table.method::<Get>(|value, ()| *value);
//!     }
//! }
//!
//! type Inline = Poly<Getter, LocalStorage<16>, StaticTable<Getter>, markers::Cloneable>;
//!
//! let a: Poly<Getter> = Poly::new(1u64);
//! let b: Inline = Poly::new(2u64);
//! let c = b.clone();
//! assert_eq!(a.call::<Get>(()) + b.call::<Get>(()) + c.call::<Get>(()), 5);
//! ```
//!
//! ## Calling Through Methods
//!
//! Calling through `call::<M>` can be wrapped in an extension trait, so that
//! handles read like ordinary objects:
//!
//! ```
//! use dynpoly::{dispatch::Dispatch, prelude::*, storage::Storage};
//!
//! method! {
//!     pub struct Area: fn(&self) -> f64;
//! }
//!
//! pub struct Shape;
//! impl Capability for Shape {}
//! impl Bind<f64> for Shape {
//!     fn bind(table: &mut TableBuilder<Self, f64>) {
//!         table.method::<Area>(|side, ()| side * side);
//!     }
//! }
//!
//! pub trait ShapeExt {
//!     fn area(&self) -> f64;
//! }
//!
//! impl<S: Storage, D: Dispatch<Shape>, O, T> ShapeExt for Poly<Shape, S, D, O, T> {
//!     fn area(&self) -> f64 {
//!         self.call::<Area>(())
//!     }
//! }
//!
//! let square: Poly<Shape> = Poly::new(1.5_f64);
//! assert_eq!(square.area(), 2.25);
//! ```
//!
//! ## Errors
//!
//! Mistakes the type system can see fail to compile: binding a type without
//! a [`Bind`] implementation, storing an oversized value inline, cloning a
//! handle around a non-[`Clone`] value, or sending a handle around a
//! non-thread-safe value. The rest are reported at run time as a
//! [`rootcause::Report`] with a [`BindError`] context, see [`error`].
//!
//! ## Features
//!
//! - `std`: Use [`std::sync::RwLock`] for the process-wide registries instead
//!   of a spin lock.
//! - `tracing`: Emit [`tracing`](https://docs.rs/tracing) events when layouts
//!   are registered, static tables are built and dynamic entries are
//!   replaced.
//!
//! For the erased storage and entry types, see the [`dynpoly-internals`]
//! crate.
//!
//! [`dynpoly-internals`]: dynpoly_internals

extern crate alloc;
#[cfg(all(feature = "std", not(doc)))]
extern crate std;

#[macro_use]
mod macros;

pub mod capability;
pub mod dispatch;
pub mod error;
pub mod markers;
pub mod prelude;
pub mod registry;
pub mod storage;

mod poly;

pub use dynpoly_internals::{
    Exclusive, ExclusiveFn, Method, Receiver, ReceiverKind, Shared, SharedFn,
};

pub use self::{
    capability::{Bind, Capability},
    error::BindError,
    poly::Poly,
};
