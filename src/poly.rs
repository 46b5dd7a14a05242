use alloc::format;
use core::{
    any::{TypeId, type_name},
    marker::PhantomData,
    ptr,
};

use dynpoly_internals::{ExclusiveFn, RawEntry, SharedFn, ValueHandler};
use rootcause::Report;

use crate::{
    Bind, BindError, Capability, Exclusive, Method, Shared,
    dispatch::{Dispatch, DynamicTable, Table},
    markers::{Cloneable, ObjectMarkerFor, SendSync, Uncloneable},
    storage::{HeapStorage, Storage},
};

/// A value-semantic handle to any concrete type bound to the capability set
/// `I`.
///
/// The handle owns exactly one value and the dispatch table that routes the
/// call shapes of `I` to that value's implementations.
///
/// # Type Parameters
///
/// - **Capability set (`I`)**: The [`Capability`] the bound value must
///   implement through [`Bind`].
/// - **Storage (`S`)**: Where the value lives
///   - [`HeapStorage`]: In its own heap allocation (default)
///   - [`LocalStorage<N>`]: Inline, in an `N`-byte buffer
/// - **Dispatch (`D`)**: How the table is held
///   - [`DynamicTable`]: Per-handle copy whose entries can be replaced
///     (default)
///   - [`StaticTable<I>`]: Shared by every handle bound to the same type
/// - **Ownership (`O`)**: Whether the handle can be cloned
///   - [`Uncloneable`]: Cannot be cloned, accepts any value (default)
///   - [`Cloneable`]: Deep-clones the value, requires [`Clone`]
/// - **Thread Safety (`T`)**: Whether the handle can cross threads
///   - [`SendSync`]: `Send + Sync`, requires thread-safe values (default)
///   - [`Local`]: Accepts any value
///
/// # Examples
///
/// ```
/// use dynpoly::prelude::*;
///
/// method! {
///     pub struct Draw<'a>: fn(&self, &'a mut String);
/// }
///
/// pub struct Drawable;
/// impl Capability for Drawable {}
///
/// struct Square;
/// struct Circle;
///
/// impl Bind<Square> for Drawable {
///     fn bind(table: &mut TableBuilder<Self, Square>) {
///         table.method::<Draw>(|_, (out,)| out.push_str("Square "));
///     }
/// }
///
/// impl Bind<Circle> for Drawable {
///     fn bind(table: &mut TableBuilder<Self, Circle>) {
///         table.method::<Draw>(|_, (out,)| out.push_str("Circle "));
///     }
/// }
///
/// let mut out = String::new();
/// let mut shape: Poly<Drawable> = Poly::new(Square);
/// shape.call::<Draw>((&mut out,));
///
/// shape.assign(Circle);
/// shape.call::<Draw>((&mut out,));
///
/// assert_eq!(out, "Square Circle ");
/// ```
///
/// [`LocalStorage<N>`]: crate::storage::LocalStorage
/// [`StaticTable<I>`]: crate::dispatch::StaticTable
/// [`Local`]: crate::markers::Local
pub struct Poly<
    I: 'static,
    S: 'static = HeapStorage,
    D: 'static = DynamicTable,
    O: 'static = Uncloneable,
    T: 'static = SendSync,
> {
    /// # Safety
    ///
    /// The following safety invariants are upheld as long as this struct
    /// exists:
    ///
    /// 1. The table of `dispatch` was built for the type of the value in
    ///    `storage`.
    /// 2. If `T = SendSync`: The value in `storage` is `Send + Sync`.
    /// 3. If `O = Cloneable`: The value in `storage` was stored with the
    ///    [`Cloneable`] handler.
    storage: S,
    dispatch: D,
    _marker: PhantomData<(fn() -> I, O, T)>,
}

impl<I, S, D, O, T> Poly<I, S, D, O, T>
where
    I: Capability,
    S: Storage,
    D: Dispatch<I>,
{
    /// Binds `value` to a new handle.
    ///
    /// # Panics
    ///
    /// Panics with the rendered report if the dispatch table for `V` cannot be
    /// built, see [`Poly::try_new`].
    #[track_caller]
    #[must_use]
    pub fn new<V>(value: V) -> Self
    where
        V: ObjectMarkerFor<T>,
        I: Bind<V>,
        O: ValueHandler<V>,
    {
        match Self::try_new(value) {
            Ok(poly) => poly,
            Err(report) => panic!("{report}"),
        }
    }

    /// Binds `value` to a new handle.
    ///
    /// Fails with [`BindError::LayoutMismatch`] if the call shapes registered
    /// for `V` do not match the layout registered for `I`. The value is
    /// dropped in that case.
    pub fn try_new<V>(value: V) -> Result<Self, Report<BindError>>
    where
        V: ObjectMarkerFor<T>,
        I: Bind<V>,
        O: ValueHandler<V>,
    {
        let dispatch = D::bind::<V>()?;
        Ok(Self {
            storage: S::store::<V, O>(value),
            dispatch,
            _marker: PhantomData,
        })
    }

    /// Drops the bound value and binds `value` in its place.
    ///
    /// # Panics
    ///
    /// Panics with the rendered report if the dispatch table for `V` cannot be
    /// built, see [`Poly::try_assign`].
    #[track_caller]
    pub fn assign<V>(&mut self, value: V)
    where
        V: ObjectMarkerFor<T>,
        I: Bind<V>,
        O: ValueHandler<V>,
    {
        if let Err(report) = self.try_assign(value) {
            panic!("{report}");
        }
    }

    /// Drops the bound value and binds `value` in its place.
    ///
    /// The dispatch table for `V` is obtained first. If that fails, the handle
    /// is left untouched and `value` is dropped. Otherwise the old value is
    /// dropped before the new one is stored.
    pub fn try_assign<V>(&mut self, value: V) -> Result<(), Report<BindError>>
    where
        V: ObjectMarkerFor<T>,
        I: Bind<V>,
        O: ValueHandler<V>,
    {
        let dispatch = D::bind::<V>()?;
        self.dispatch = dispatch;

        let slot: *mut S = &raw mut self.storage;
        let _store = StoreOnDrop::<S, V, O> {
            slot,
            value: Some(value),
            _handler: PhantomData,
        };

        // SAFETY: `slot` points to the initialized storage of `self`, which is
        // not accessed again until `_store` writes the new storage into it when
        // it goes out of scope, including when the old value's `Drop` panics.
        unsafe { ptr::drop_in_place(slot) };

        Ok(())
    }

    /// Calls the call shape `M`, which takes `&self`.
    ///
    /// # Panics
    ///
    /// Panics if `M` is not part of the capability set, see
    /// [`Poly::try_call`].
    #[track_caller]
    pub fn call<'a, M>(&self, args: M::Args<'a>) -> M::Output
    where
        M: Method<Receiver = Shared>,
    {
        match self.try_call::<M>(args) {
            Ok(output) => output,
            Err(report) => panic!("{report}"),
        }
    }

    /// Calls the call shape `M`, which takes `&self`.
    ///
    /// Fails with [`BindError::UnknownMethod`] if `M` is not part of the
    /// capability set.
    pub fn try_call<'a, M>(&self, args: M::Args<'a>) -> Result<M::Output, Report<BindError>>
    where
        M: Method<Receiver = Shared>,
    {
        let entry = self.entry::<M>()?;

        // SAFETY:
        // 1. The entry was found under the `TypeId` of `M`, and entries for
        //    call shapes with a `Shared` receiver are created by
        //    `RawEntry::shared`.
        // 2. Guaranteed by invariant 1 of `Poly`.
        Ok(unsafe { entry.call::<M>(self.storage.as_raw(), args) })
    }

    /// Calls the call shape `M`, which takes `&mut self`.
    ///
    /// # Panics
    ///
    /// Panics if `M` is not part of the capability set, see
    /// [`Poly::try_call_mut`].
    #[track_caller]
    pub fn call_mut<'a, M>(&mut self, args: M::Args<'a>) -> M::Output
    where
        M: Method<Receiver = Exclusive>,
    {
        match self.try_call_mut::<M>(args) {
            Ok(output) => output,
            Err(report) => panic!("{report}"),
        }
    }

    /// Calls the call shape `M`, which takes `&mut self`.
    ///
    /// Fails with [`BindError::UnknownMethod`] if `M` is not part of the
    /// capability set.
    pub fn try_call_mut<'a, M>(&mut self, args: M::Args<'a>) -> Result<M::Output, Report<BindError>>
    where
        M: Method<Receiver = Exclusive>,
    {
        let entry = self.entry::<M>()?;

        // SAFETY:
        // 1. The entry was found under the `TypeId` of `M`, and entries for
        //    call shapes with an `Exclusive` receiver are created by
        //    `RawEntry::exclusive`.
        // 2. Guaranteed by invariant 1 of `Poly`.
        Ok(unsafe { entry.call_mut::<M>(self.storage.as_raw_mut(), args) })
    }

    fn entry<M: Method>(&self) -> Result<RawEntry, Report<BindError>> {
        self.dispatch
            .table()
            .entry(TypeId::of::<M>())
            .copied()
            .ok_or_else(|| {
                Report::new(BindError::UnknownMethod {
                    capability: I::name(),
                    method: type_name::<M>(),
                })
                .attach(format!("calling a handle bound to `{}`", self.value_type_name()))
            })
    }

    /// The [`TypeId`] of the bound value.
    pub fn value_type_id(&self) -> TypeId {
        self.storage.value_type_id()
    }

    /// The type name of the bound value.
    pub fn value_type_name(&self) -> &'static str {
        self.storage.value_type_name()
    }

    /// Returns `true` if the bound value has type `V`.
    pub fn is<V: 'static>(&self) -> bool {
        self.value_type_id() == TypeId::of::<V>()
    }

    /// The bound value, if it has type `V`.
    pub fn downcast_ref<V: 'static>(&self) -> Option<&V> {
        self.storage.downcast_ref::<V>()
    }

    /// The bound value, if it has type `V`.
    pub fn downcast_mut<V: 'static>(&mut self) -> Option<&mut V> {
        self.storage.downcast_mut::<V>()
    }

    /// The dispatch table of the handle.
    pub fn table(&self) -> &Table {
        self.dispatch.table()
    }
}

impl<I, S, O, T> Poly<I, S, DynamicTable, O, T>
where
    I: Capability,
    S: Storage,
{
    /// Replaces this handle's implementation of the call shape `M`, which
    /// takes `&self`.
    ///
    /// Other handles, including clones made before the replacement, keep
    /// their implementation. Fails with [`BindError::ValueTypeMismatch`] if
    /// the bound value does not have type `V`, and with
    /// [`BindError::UnknownMethod`] if `M` is not part of the capability set.
    ///
    /// # Examples
    ///
    /// ```
    /// use dynpoly::prelude::*;
    ///
    /// method! {
    ///     pub struct Greet: fn(&self) -> String;
    /// }
    ///
    /// pub struct Greeter;
    /// impl Capability for Greeter {}
    /// impl Bind<String> for Greeter {
    ///     fn bind(table: &mut TableBuilder<Self, String>) {
    ///         table.method::<Greet>(|name, ()| format!("hello {name}"));
    ///     }
    /// }
    ///
    /// let plain: Poly<Greeter> = Poly::new(String::from("ana"));
    /// let mut loud: Poly<Greeter> = Poly::new(String::from("bo"));
    /// loud.override_method::<String, Greet>(|name, ()| format!("HELLO {name}"))
    ///     .unwrap();
    ///
    /// assert_eq!(plain.call::<Greet>(()), "hello ana");
    /// assert_eq!(loud.call::<Greet>(()), "HELLO bo");
    /// ```
    pub fn override_method<V, M>(
        &mut self,
        implementation: SharedFn<V, M>,
    ) -> Result<(), Report<BindError>>
    where
        V: 'static,
        M: Method<Receiver = Shared>,
    {
        self.dispatch.set_entry(RawEntry::shared::<V, M>(implementation))
    }

    /// Replaces this handle's implementation of the call shape `M`, which
    /// takes `&mut self`.
    ///
    /// See [`Poly::override_method`].
    pub fn override_method_mut<V, M>(
        &mut self,
        implementation: ExclusiveFn<V, M>,
    ) -> Result<(), Report<BindError>>
    where
        V: 'static,
        M: Method<Receiver = Exclusive>,
    {
        self.dispatch.set_entry(RawEntry::exclusive::<V, M>(implementation))
    }
}

/// Writes the new storage into `slot` when dropped.
struct StoreOnDrop<S: Storage, V: 'static, H: ValueHandler<V>> {
    slot: *mut S,
    value: Option<V>,
    _handler: PhantomData<H>,
}

impl<S: Storage, V: 'static, H: ValueHandler<V>> Drop for StoreOnDrop<S, V, H> {
    fn drop(&mut self) {
        if let Some(value) = self.value.take() {
            let storage = S::store::<V, H>(value);
            // SAFETY: `slot` points to storage that was dropped in place and is
            // not accessed by anything else until this write.
            unsafe { ptr::write(self.slot, storage) };
        }
    }
}

impl<I, S, D, T> Clone for Poly<I, S, D, Cloneable, T>
where
    I: Capability,
    S: Storage,
    D: Dispatch<I>,
{
    fn clone(&self) -> Self {
        let Some(storage) = self.storage.try_clone() else {
            unreachable!("values of cloneable handles are stored with the `Cloneable` handler")
        };
        Self {
            storage,
            dispatch: self.dispatch.clone(),
            _marker: PhantomData,
        }
    }
}

impl<I, S, D, O, T> core::fmt::Debug for Poly<I, S, D, O, T>
where
    I: Capability,
    S: Storage,
    D: Dispatch<I>,
{
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Poly")
            .field("capability", &I::name())
            .field("value", &self.value_type_name())
            .field("slots", &self.table().len())
            .finish_non_exhaustive()
    }
}

// SAFETY: The `SendSync` marker guarantees that the bound value is
// `Send + Sync`, and the dispatch policy is required to be `Send + Sync` as
// well. Therefore it is safe to implement `Send` for the handle.
unsafe impl<I, S, D: Send + Sync, O> Send for Poly<I, S, D, O, SendSync> {}

// SAFETY: The `SendSync` marker guarantees that the bound value is
// `Send + Sync`, and the dispatch policy is required to be `Send + Sync` as
// well. Therefore it is safe to implement `Sync` for the handle.
unsafe impl<I, S, D: Send + Sync, O> Sync for Poly<I, S, D, O, SendSync> {}

#[cfg(test)]
mod tests {
    use alloc::{
        rc::Rc,
        string::{String, ToString},
    };
    use core::cell::Cell;

    use super::*;
    use crate::{
        dispatch::{StaticTable, TableBuilder},
        markers::Local,
        storage::LocalStorage,
    };

    method! {
        struct Describe: fn(&self) -> String;
        struct Bump: fn(&mut self);
        struct Unbound: fn(&self);
    }

    struct Described;
    impl Capability for Described {}

    impl Bind<u32> for Described {
        fn bind(table: &mut TableBuilder<Self, u32>) {
            table
                .method::<Describe>(|value, ()| value.to_string())
                .method_mut::<Bump>(|value, ()| *value += 1);
        }
    }

    impl Bind<String> for Described {
        fn bind(table: &mut TableBuilder<Self, String>) {
            table
                .method::<Describe>(|value, ()| value.clone())
                .method_mut::<Bump>(|value, ()| value.push('+'));
        }
    }

    impl Bind<Rc<Cell<u32>>> for Described {
        fn bind(table: &mut TableBuilder<Self, Rc<Cell<u32>>>) {
            table
                .method::<Describe>(|value, ()| value.get().to_string())
                .method_mut::<Bump>(|value, ()| value.set(value.get() + 1));
        }
    }

    #[test]
    fn test_poly_auto_traits() {
        static_assertions::assert_impl_all!(Poly<Described>: Send, Sync);
        static_assertions::assert_impl_all!(
            Poly<Described, LocalStorage<16>, StaticTable<Described>>: Send,
            Sync
        );
        static_assertions::assert_not_impl_any!(
            Poly<Described, HeapStorage, DynamicTable, Uncloneable, Local>: Send,
            Sync
        );
        static_assertions::assert_not_impl_any!(Poly<Described>: Clone);
        static_assertions::assert_impl_all!(
            Poly<Described, HeapStorage, DynamicTable, Cloneable>: Clone
        );
    }

    #[test]
    fn test_call_and_call_mut() {
        let mut poly: Poly<Described> = Poly::new(41u32);
        poly.call_mut::<Bump>(());
        assert_eq!(poly.call::<Describe>(()), "42");
        assert!(poly.is::<u32>());
        assert_eq!(poly.downcast_ref::<u32>(), Some(&42));
    }

    #[test]
    fn test_try_call_unknown_method() {
        let poly: Poly<Described> = Poly::new(String::from("x"));
        let report = poly.try_call::<Unbound>(()).unwrap_err();
        assert_eq!(
            *report.current_context(),
            BindError::UnknownMethod {
                capability: Described::name(),
                method: type_name::<Unbound>(),
            }
        );
    }

    #[test]
    #[should_panic(expected = "is not a method of")]
    fn test_call_unknown_method_panics() {
        let poly: Poly<Described> = Poly::new(1u32);
        poly.call::<Unbound>(());
    }

    #[test]
    fn test_assign_switches_type() {
        let mut poly: Poly<Described> = Poly::new(1u32);
        poly.assign(String::from("s"));
        poly.call_mut::<Bump>(());
        assert_eq!(poly.call::<Describe>(()), "s+");
        assert!(poly.is::<String>());
        assert_eq!(poly.table().value_type_id(), TypeId::of::<String>());
        assert!(poly.downcast_mut::<u32>().is_none());
    }

    #[test]
    fn test_local_handle_accepts_rc() {
        let shared = Rc::new(Cell::new(0));
        let mut poly: Poly<Described, HeapStorage, DynamicTable, Uncloneable, Local> =
            Poly::new(Rc::clone(&shared));
        poly.call_mut::<Bump>(());
        assert_eq!(shared.get(), 1);
        drop(poly);
        assert_eq!(Rc::strong_count(&shared), 1);
    }

    #[test]
    fn test_override_rejects_other_type() {
        let mut poly: Poly<Described> = Poly::new(1u32);
        let report = poly
            .override_method::<String, Describe>(|_, ()| String::new())
            .unwrap_err();
        assert!(matches!(
            report.current_context(),
            BindError::ValueTypeMismatch { .. }
        ));
        assert_eq!(poly.call::<Describe>(()), "1");
    }

    #[test]
    fn test_debug_names_capability_and_value() {
        let poly: Poly<Described> = Poly::new(3u32);
        let rendered = format!("{poly:?}");
        assert!(rendered.contains("Described"));
        assert!(rendered.contains("u32"));
    }
}
