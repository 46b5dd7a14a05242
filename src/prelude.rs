//! Commonly used items for convenient importing.
//!
//! ```
//! use dynpoly::prelude::*;
//!
//! method! {
//!     pub struct Len: fn(&self) -> usize;
//! }
//!
//! pub struct Measured;
//! impl Capability for Measured {}
//! impl Bind<Vec<u8>> for Measured {
//!     fn bind(table: &mut TableBuilder<Self, Vec<u8>>) {
//!         table.method::<Len>(|bytes, ()| bytes.len());
//!     }
//! }
//!
//! fn bind(bytes: Vec<u8>) -> Result<Poly<Measured>, Report<BindError>> {
//!     Poly::try_new(bytes)
//! }
//!
//! assert_eq!(bind(vec![1, 2, 3]).unwrap().call::<Len>(()), 3);
//! ```
//!
//! # What's Included
//!
//! - **[`method!`]**, [`Method`], [`Shared`] and [`Exclusive`] for declaring
//!   call shapes
//! - **[`Capability`]**, [`Bind`] and [`TableBuilder`] for binding types
//! - **[`Poly`]** with its storage and dispatch policies and the [`markers`]
//! - **[`BindError`]** and rootcause's [`Report`]

pub use rootcause::Report;

pub use crate::{
    Bind, BindError, Capability, Exclusive, Method, Poly, Shared,
    dispatch::{DynamicTable, StaticTable, TableBuilder},
    markers, method,
    storage::{HeapStorage, LocalStorage},
};
