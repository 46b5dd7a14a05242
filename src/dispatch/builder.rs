use alloc::format;
use core::{any::TypeId, marker::PhantomData};

use dynpoly_internals::RawEntry;
use indexmap::IndexMap;
use rootcause::Report;
use rustc_hash::FxBuildHasher;

use super::{Table, static_};
use crate::{
    Bind, BindError, Capability, Exclusive, ExclusiveFn, Method, Shared, SharedFn,
    registry::{self, Layout},
};

/// Collects the implementations of a capability set's call shapes for one
/// concrete type.
///
/// A builder is handed to [`Bind::bind`]. Slots are assigned in the order
/// call shapes are first registered; registering a call shape again replaces
/// its implementation and keeps its slot.
///
/// # Examples
///
/// ```
/// use dynpoly::prelude::*;
///
/// method! {
///     pub struct Get: fn(&self) -> i32;
///     pub struct Add: fn(&mut self, i32);
/// }
///
/// pub struct Counter;
/// impl Capability for Counter {}
///
/// impl Bind<i32> for Counter {
///     fn bind(table: &mut TableBuilder<Self, i32>) {
///         table
///             .method::<Get>(|value, ()| *value)
///             .method_mut::<Add>(|value, (n,)| *value += n);
///     }
/// }
///
/// let mut counter: Poly<Counter> = Poly::new(40);
/// counter.call_mut::<Add>((2,));
/// assert_eq!(counter.call::<Get>(()), 42);
/// ```
pub struct TableBuilder<I, V> {
    entries: IndexMap<TypeId, RawEntry, FxBuildHasher>,
    error: Option<Report<BindError>>,
    _marker: PhantomData<fn() -> (I, V)>,
}

impl<I: Capability, V: 'static> TableBuilder<I, V> {
    fn new() -> Self {
        Self {
            entries: IndexMap::default(),
            error: None,
            _marker: PhantomData,
        }
    }

    /// Registers the implementation of the call shape `M`, which takes
    /// `&self`.
    pub fn method<M>(&mut self, implementation: SharedFn<V, M>) -> &mut Self
    where
        M: Method<Receiver = Shared>,
    {
        self.insert(RawEntry::shared::<V, M>(implementation));
        self
    }

    /// Registers the implementation of the call shape `M`, which takes
    /// `&mut self`.
    pub fn method_mut<M>(&mut self, implementation: ExclusiveFn<V, M>) -> &mut Self
    where
        M: Method<Receiver = Exclusive>,
    {
        self.insert(RawEntry::exclusive::<V, M>(implementation));
        self
    }

    /// Copies every entry of the capability set `B` for the same concrete
    /// type, in `B`'s slot order.
    ///
    /// Call this before registering any method: registrations made afterwards
    /// replace the inherited entries they redefine and append new slots.
    /// Extending a capability set that directly or indirectly extends `I`
    /// never returns.
    ///
    /// # Examples
    ///
    /// ```
    /// use dynpoly::prelude::*;
    ///
    /// method! {
    ///     pub struct Name: fn(&self) -> String;
    ///     pub struct Shout: fn(&self) -> String;
    /// }
    ///
    /// pub struct Named;
    /// impl Capability for Named {}
    /// impl Bind<&'static str> for Named {
    ///     fn bind(table: &mut TableBuilder<Self, &'static str>) {
    ///         table.method::<Name>(|s, ()| s.to_string());
    ///     }
    /// }
    ///
    /// pub struct Loud;
    /// impl Capability for Loud {}
    /// impl Bind<&'static str> for Loud {
    ///     fn bind(table: &mut TableBuilder<Self, &'static str>) {
    ///         table
    ///             .extends::<Named>()
    ///             .method::<Shout>(|s, ()| s.to_uppercase());
    ///     }
    /// }
    ///
    /// let loud: Poly<Loud> = Poly::new("hey");
    /// assert_eq!(loud.call::<Name>(()), "hey");
    /// assert_eq!(loud.call::<Shout>(()), "HEY");
    /// ```
    pub fn extends<B>(&mut self) -> &mut Self
    where
        B: Bind<V>,
    {
        match static_::table_for::<B, V>() {
            Ok(base) => {
                for entry in base.entries() {
                    self.insert(*entry);
                }
            }
            Err(report) => {
                if self.error.is_none() {
                    self.error = Some(report.attach(format!(
                        "while extending `{}` from `{}`",
                        I::name(),
                        B::name()
                    )));
                }
            }
        }
        self
    }

    fn insert(&mut self, entry: RawEntry) {
        self.entries.insert(entry.method_type_id(), entry);
    }

    /// Registers the layout, or checks the entries against the registered
    /// one, and produces the table.
    fn finish(self) -> Result<Table, Report<BindError>> {
        if let Some(error) = self.error {
            return Err(error);
        }

        let candidate = Layout::from_entries(I::name(), self.entries.values());
        let layout = registry::register::<I>(candidate).map_err(|report| {
            report.attach(format!(
                "while binding `{}` to `{}`",
                core::any::type_name::<V>(),
                I::name()
            ))
        })?;

        Ok(Table {
            layout,
            value_type_id: TypeId::of::<V>(),
            value_type_name: core::any::type_name::<V>(),
            entries: self.entries.into_values().collect(),
        })
    }
}

/// Runs `I`'s [`Bind::bind`] for `V` on a fresh builder.
pub(super) fn build<I, V>() -> Result<Table, Report<BindError>>
where
    I: Bind<V>,
    V: 'static,
{
    let mut builder = TableBuilder::<I, V>::new();
    I::bind(&mut builder);
    builder.finish()
}

impl<I: Capability, V: 'static> core::fmt::Debug for TableBuilder<I, V> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("TableBuilder")
            .field("capability", &I::name())
            .field("value", &core::any::type_name::<V>())
            .field("entries", &self.entries.values())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use alloc::vec::Vec;

    use super::*;

    struct Read;
    impl Method for Read {
        type Receiver = Shared;
        type Args<'a> = ();
        type Output = u8;
    }

    struct Write;
    impl Method for Write {
        type Receiver = Exclusive;
        type Args<'a> = (u8,);
        type Output = ();
    }

    struct Cell;
    impl Capability for Cell {}
    impl Bind<u8> for Cell {
        fn bind(table: &mut TableBuilder<Self, u8>) {
            table
                .method::<Read>(|_, ()| 0)
                .method_mut::<Write>(|value, (new,)| *value = new)
                .method::<Read>(|value, ()| *value);
        }
    }

    #[test]
    fn test_redefinition_keeps_slot() {
        let table = build::<Cell, u8>().unwrap();
        let methods: Vec<TypeId> = table.layout().iter().map(|info| info.type_id()).collect();
        assert_eq!(methods, [TypeId::of::<Read>(), TypeId::of::<Write>()]);
        assert_eq!(table.len(), 2);
        assert_eq!(table.value_type_id(), TypeId::of::<u8>());

        let value = 7u8;
        let entry = table.entry(TypeId::of::<Read>()).unwrap();
        let heap = dynpoly_internals::RawHeap::new::<u8, crate::markers::Uncloneable>(value);
        // SAFETY: The entry was registered for `Read` on `u8` and the heap holds a
        // `u8`.
        let read = unsafe { entry.call::<Read>(heap.as_ref(), ()) };
        assert_eq!(read, 7);
    }

    #[test]
    fn test_builder_debug_names_types() {
        let mut builder = TableBuilder::<Cell, u8>::new();
        builder.method::<Read>(|value, ()| *value);
        let rendered = format!("{builder:?}");
        assert!(rendered.contains("Cell"));
        assert!(rendered.contains("Read"));
    }
}
