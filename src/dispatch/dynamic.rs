use alloc::format;

use dynpoly_internals::RawEntry;
use rootcause::Report;
use triomphe::Arc;

use super::{Dispatch, Table, static_};
use crate::{Bind, BindError, Capability};

/// A dispatch policy holding a per-handle copy of the table.
///
/// The copy starts out identical to the shared [`StaticTable`] of the bound
/// concrete type and is only duplicated when one of its entries is replaced,
/// so replacing an entry of one handle never affects another.
///
/// [`StaticTable`]: super::StaticTable
#[derive(Clone)]
pub struct DynamicTable(Arc<Table>);

impl DynamicTable {
    /// Replaces the entry for the call shape of `entry`.
    ///
    /// The entry must be written for the concrete type this table dispatches
    /// to, and its call shape must be part of the layout.
    pub(crate) fn set_entry(&mut self, entry: RawEntry) -> Result<(), Report<BindError>> {
        let table = &*self.0;
        if entry.value_type_id() != table.value_type_id() {
            return Err(Report::new(BindError::ValueTypeMismatch {
                expected: table.value_type_name(),
                found: entry.value_type_name(),
            }));
        }

        let layout = table.layout();
        let Some(slot) = layout.slot_of_id(entry.method_type_id()) else {
            return Err(Report::new(BindError::UnknownMethod {
                capability: layout.capability_name(),
                method: entry.method_name(),
            }));
        };

        debug_event!(
            capability = layout.capability_name(),
            method = entry.method_name(),
            slot,
            "replaced dynamic dispatch entry"
        );

        Arc::make_mut(&mut self.0).entries[slot] = entry;
        Ok(())
    }

    /// Returns `true` if both tables share the same allocation.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl core::fmt::Debug for DynamicTable {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_tuple("DynamicTable").field(&*self.0).finish()
    }
}

impl<I: Capability> Dispatch<I> for DynamicTable {
    fn bind<V: 'static>() -> Result<Self, Report<BindError>>
    where
        I: Bind<V>,
    {
        let table = static_::table_for::<I, V>()
            .map_err(|report| report.attach(format!("dynamic table of `{}`", I::name())))?;
        Ok(Self(Arc::new(table.clone())))
    }

    fn table(&self) -> &Table {
        &self.0
    }
}
