#![no_std]
#![forbid(
    missing_docs,
    clippy::alloc_instead_of_core,
    clippy::std_instead_of_alloc,
    clippy::std_instead_of_core,
    clippy::missing_safety_doc,
    clippy::missing_docs_in_private_items,
    clippy::undocumented_unsafe_blocks,
    clippy::multiple_unsafe_ops_per_block,
    rustdoc::invalid_rust_codeblocks,
    rustdoc::broken_intra_doc_links,
    missing_copy_implementations,
    unused_doc_comments
)]
#![allow(rustdoc::private_intra_doc_links)]
//! Internal implementation crate for [`dynpoly`].
//!
//! # Overview
//!
//! This crate contains the low-level, type-erased data structures and unsafe
//! operations that power the [`dynpoly`] polymorphism library: erased value
//! storage and erased dispatch entries.
//!
//! **This crate is an implementation detail.** No semantic versioning
//! guarantees are provided. Users should depend on the [`dynpoly`] crate, not
//! this one.
//!
//! # Architecture
//!
//! The crate is organized around two halves that meet at an erased value
//! pointer:
//!
//! - **[`value`]**: Type-erased ownership of one concrete value
//!   - [`RawHeap`]: Owned value with [`Box`]-based allocation
//!   - [`RawLocal`]: Owned value embedded in a fixed-capacity inline buffer
//!   - [`RawValueRef`]/[`RawValueMut`]: Borrowed pointers to an erased value
//!   - [`ValueVtable`]: Function pointers for erased drop and clone
//!
//! - **[`entry`]**: Type-erased dispatch entries
//!   - [`Method`]: A call shape (receiver, arguments, output)
//!   - [`RawEntry`]: One call shape bound to one concrete type, callable
//!     through an erased value pointer
//!
//! # Safety Strategy
//!
//! When we erase a value of type `V` behind a pointer to [`Erased`], every
//! function pointer that later touches the pointer must have been
//! instantiated with that same `V`. This crate maintains that through:
//!
//! - **Module-based encapsulation**: Pointers and vtables are stored in
//!   module-private fields, set together at construction and never changed
//!   separately, so each invariant can be checked within a single file
//! - **Typed constructors**: Every erased value and every entry is created
//!   from a fully typed value or function, pairing it with the matching
//!   vtable or thunk at compile time
//! - **Documented call contracts**: Each unsafe function states exactly which
//!   type relation the caller must guarantee, and debug builds assert it
//!   through [`TypeId`] comparisons
//!
//! [`dynpoly`]: https://docs.rs/dynpoly/latest/dynpoly/
//! [`value`]: crate::value
//! [`entry`]: crate::entry
//! [`ValueVtable`]: value::vtable::ValueVtable
//! [`Erased`]: util::Erased
//! [`Box`]: alloc::boxed::Box
//! [`TypeId`]: core::any::TypeId

extern crate alloc;

pub mod entry;
pub mod method;
pub mod value;
mod util;

pub use entry::RawEntry;
pub use method::{Exclusive, ExclusiveFn, Method, Receiver, ReceiverKind, Shared, SharedFn};
pub use value::{LOCAL_ALIGN, RawHeap, RawLocal, RawValueMut, RawValueRef, ValueHandler};
