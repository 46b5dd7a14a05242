//! Dispatch tables and the policies that hold them.
//!
//! A [`Table`] holds one erased entry per slot of a capability set's
//! [`Layout`], specialized to one concrete type. Tables are built by running
//! the capability set's [`Bind::bind`] on a [`TableBuilder`].
//!
//! Handles hold their table through a [`Dispatch`] policy:
//!
//! - [`StaticTable`]: one table per (capability set, concrete type) pair,
//!   built at most once and shared by every handle of that pair.
//! - [`DynamicTable`]: a per-handle copy of the static table whose entries
//!   can be replaced without affecting other handles. This is the default.

mod builder;
mod dynamic;
mod static_;

use alloc::vec::Vec;
use core::any::TypeId;

use dynpoly_internals::RawEntry;
use rootcause::Report;

pub use self::{builder::TableBuilder, dynamic::DynamicTable, static_::StaticTable};
use crate::{BindError, Bind, Capability, registry::Layout};

/// The dispatch entries of one capability set for one concrete type.
#[derive(Clone)]
pub struct Table {
    layout: &'static Layout,
    value_type_id: TypeId,
    value_type_name: &'static str,
    entries: Vec<RawEntry>,
}

impl Table {
    /// The slot layout of the capability set.
    pub fn layout(&self) -> &'static Layout {
        self.layout
    }

    /// The number of slots.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the table has no slots.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The [`TypeId`] of the concrete type the table dispatches to.
    pub fn value_type_id(&self) -> TypeId {
        self.value_type_id
    }

    /// The type name of the concrete type the table dispatches to.
    pub fn value_type_name(&self) -> &'static str {
        self.value_type_name
    }

    /// Returns `true` if `slot` of both tables calls the same implementation.
    pub fn same_entry(&self, other: &Table, slot: usize) -> bool {
        match (self.entries.get(slot), other.entries.get(slot)) {
            (Some(ours), Some(theirs)) => ours.same_implementation(theirs),
            _ => false,
        }
    }

    pub(crate) fn entries(&self) -> &[RawEntry] {
        &self.entries
    }

    /// The entry for the call shape with the given [`TypeId`].
    pub(crate) fn entry(&self, method: TypeId) -> Option<&RawEntry> {
        let slot = self.layout.slot_of_id(method)?;
        self.entries.get(slot)
    }
}

impl core::fmt::Debug for Table {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Table")
            .field("capability", &self.layout.capability_name())
            .field("value", &self.value_type_name)
            .field("entries", &self.entries)
            .finish()
    }
}

mod sealed_dispatch {
    pub trait Sealed: 'static {}

    impl Sealed for super::DynamicTable {}
    impl<I: 'static> Sealed for super::StaticTable<I> {}
}

/// How a handle holds the dispatch table of the capability set `I`.
///
/// This trait is sealed and implemented for [`StaticTable`] and
/// [`DynamicTable`].
pub trait Dispatch<I: Capability>: sealed_dispatch::Sealed + Clone {
    /// Obtains the table for the concrete type `V`.
    ///
    /// Fails when the table built for `V` does not match the layout
    /// registered for `I`.
    fn bind<V: 'static>() -> Result<Self, Report<BindError>>
    where
        I: Bind<V>;

    /// The table the handle dispatches through.
    fn table(&self) -> &Table;
}
