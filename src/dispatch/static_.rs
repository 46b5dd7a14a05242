use alloc::{boxed::Box, format};
use core::{any::TypeId, marker::PhantomData};

use hashbrown::HashMap;
use rootcause::Report;
use rustc_hash::FxBuildHasher;
use spin::Once;

use super::{Dispatch, Table, builder};
use crate::{Bind, BindError, Capability, registry::lock::GlobalLock};

type TableKey = (TypeId, TypeId);

static TABLES: GlobalLock<HashMap<TableKey, &'static Once<Table>, FxBuildHasher>> =
    GlobalLock::new();

/// Returns the cell holding the table of `I` for `V`, creating it if needed.
fn cell_for<I: 'static, V: 'static>() -> &'static Once<Table> {
    let key = (TypeId::of::<I>(), TypeId::of::<V>());
    let existing = TABLES
        .read()
        .get()
        .and_then(|tables| tables.get(&key).copied());
    if let Some(cell) = existing {
        return cell;
    }

    let mut guard = TABLES.write();
    *guard
        .get_or_default()
        .entry(key)
        .or_insert_with(|| &*Box::leak(Box::new(Once::new())))
}

/// The shared table of `I` for `V`, built on first use.
///
/// Concurrent first uses build the table once. A failed build is not
/// remembered, so the next use builds again.
pub(super) fn table_for<I, V>() -> Result<&'static Table, Report<BindError>>
where
    I: Bind<V>,
    V: 'static,
{
    cell_for::<I, V>().try_call_once(|| {
        let table = builder::build::<I, V>()?;
        debug_event!(
            capability = I::name(),
            value = table.value_type_name(),
            slots = table.len(),
            "built static dispatch table"
        );
        Ok(table)
    })
}

/// A dispatch policy sharing one table per (capability set, concrete type)
/// pair.
///
/// Copying the policy copies a reference. Every handle bound to the same
/// concrete type points to the same table.
///
/// ```
/// use dynpoly::prelude::*;
///
/// method! {
///     pub struct Get: fn(&self) -> u32;
/// }
///
/// pub struct Value;
/// impl Capability for Value {}
/// impl Bind<u32> for Value {
///     fn bind(table: &mut TableBuilder<Self, u32>) {
///         table.method::<Get>(|value, ()| *value);
///     }
/// }
///
/// type StaticValue = Poly<Value, HeapStorage, StaticTable<Value>>;
///
/// let a = StaticValue::new(1);
/// let b = StaticValue::new(2);
/// assert!(std::ptr::eq(a.table(), b.table()));
/// assert_eq!(a.call::<Get>(()) + b.call::<Get>(()), 3);
/// ```
pub struct StaticTable<I> {
    table: &'static Table,
    _marker: PhantomData<fn() -> I>,
}

impl<I> StaticTable<I> {
    /// The shared table.
    pub fn as_static(&self) -> &'static Table {
        self.table
    }
}

impl<I> Clone for StaticTable<I> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<I> Copy for StaticTable<I> {}

impl<I> core::fmt::Debug for StaticTable<I> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_tuple("StaticTable").field(self.table).finish()
    }
}

impl<I: Capability> Dispatch<I> for StaticTable<I> {
    fn bind<V: 'static>() -> Result<Self, Report<BindError>>
    where
        I: Bind<V>,
    {
        let table = table_for::<I, V>()
            .map_err(|report| report.attach(format!("static table of `{}`", I::name())))?;
        Ok(Self {
            table,
            _marker: PhantomData,
        })
    }

    fn table(&self) -> &Table {
        self.table
    }
}

#[cfg(test)]
mod tests {
    use core::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::{Method, Shared, dispatch::TableBuilder};

    struct Peek;
    impl Method for Peek {
        type Receiver = Shared;
        type Args<'a> = ();
        type Output = u64;
    }

    static BUILDS: AtomicUsize = AtomicUsize::new(0);

    struct Counted;
    impl Capability for Counted {}
    impl Bind<u64> for Counted {
        fn bind(table: &mut TableBuilder<Self, u64>) {
            BUILDS.fetch_add(1, Ordering::SeqCst);
            table.method::<Peek>(|value, ()| *value);
        }
    }

    #[test]
    fn test_static_table_built_once() {
        let first = table_for::<Counted, u64>().unwrap();
        let second = table_for::<Counted, u64>().unwrap();
        assert!(core::ptr::eq(first, second));
        assert_eq!(BUILDS.load(Ordering::SeqCst), 1);

        let bound = <StaticTable<Counted> as Dispatch<Counted>>::bind::<u64>().unwrap();
        assert!(core::ptr::eq(bound.as_static(), first));
        assert_eq!(BUILDS.load(Ordering::SeqCst), 1);
    }

    struct Flaky;
    impl Capability for Flaky {}
    impl Bind<u64> for Flaky {
        fn bind(table: &mut TableBuilder<Self, u64>) {
            table.method::<Peek>(|value, ()| *value);
        }
    }
    impl Bind<u32> for Flaky {
        fn bind(_table: &mut TableBuilder<Self, u32>) {}
    }

    #[test]
    fn test_failed_build_is_not_cached() {
        table_for::<Flaky, u64>().unwrap();

        let report = table_for::<Flaky, u32>().unwrap_err();
        assert!(matches!(
            report.current_context(),
            BindError::LayoutMismatch { slot: 0, found: None, .. }
        ));
        assert!(table_for::<Flaky, u32>().is_err());
        assert!(!cell_for::<Flaky, u32>().is_completed());
    }
}
