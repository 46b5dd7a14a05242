//! Errors raised while binding values and building dispatch tables.
//!
//! Every fallible operation in this crate returns a
//! [`Report<BindError>`](rootcause::Report). The report's context says what
//! went wrong; attachments name the capability set and concrete type that were
//! being bound when it happened.
//!
//! ```
//! use dynpoly::prelude::*;
//!
//! method! {
//!     pub struct Name: fn(&self) -> &'static str;
//!     pub struct Missing: fn(&self);
//! }
//!
//! pub struct Named;
//! impl Capability for Named {}
//! impl Bind<u8> for Named {
//!     fn bind(table: &mut TableBuilder<Self, u8>) {
//!         table.method::<Name>(|_, ()| "byte");
//!     }
//! }
//!
//! let poly: Poly<Named> = Poly::new(1u8);
//! let report = poly.try_call::<Missing>(()).unwrap_err();
//! assert!(matches!(report.current_context(), BindError::UnknownMethod { .. }));
//! ```

/// The reasons binding a value or building a dispatch table can fail.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum BindError {
    /// A dispatch table registered its call shapes in a different order, or a
    /// different set of call shapes, than the layout registered first for the
    /// same capability set.
    LayoutMismatch {
        /// The capability set whose layout was violated.
        capability: &'static str,
        /// The first slot at which the call shapes differ.
        slot: usize,
        /// The call shape registered in that slot, if the layout has one.
        registered: Option<&'static str>,
        /// The call shape found in that slot, if the new table has one.
        found: Option<&'static str>,
    },
    /// A call shape is not part of the capability set's layout.
    UnknownMethod {
        /// The capability set that was searched.
        capability: &'static str,
        /// The call shape that was not found.
        method: &'static str,
    },
    /// An entry was replaced with an implementation for a different concrete
    /// type than the one bound to the handle.
    ValueTypeMismatch {
        /// The concrete type bound to the handle.
        expected: &'static str,
        /// The concrete type the replacement was written for.
        found: &'static str,
    },
}

impl core::fmt::Display for BindError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            BindError::LayoutMismatch {
                capability,
                slot,
                registered,
                found,
            } => {
                write!(f, "slot {slot} of `{capability}` ")?;
                match (registered, found) {
                    (Some(registered), Some(found)) => {
                        write!(f, "is registered as `{registered}` but was bound to `{found}`")
                    }
                    (Some(registered), None) => {
                        write!(f, "is registered as `{registered}` but was left unbound")
                    }
                    (None, Some(found)) => {
                        write!(f, "does not exist but was bound to `{found}`")
                    }
                    (None, None) => write!(f, "does not match the registered layout"),
                }
            }
            BindError::UnknownMethod { capability, method } => {
                write!(f, "`{method}` is not a method of `{capability}`")
            }
            BindError::ValueTypeMismatch { expected, found } => {
                write!(
                    f,
                    "an implementation for `{found}` cannot dispatch a handle bound to `{expected}`"
                )
            }
        }
    }
}

impl core::error::Error for BindError {}
