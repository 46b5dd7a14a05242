//! Type-erased dispatch entries.
//!
//! A [`RawEntry`] binds one call shape `M` to an implementation for one
//! concrete value type `V`. Both the implementation and the thunk that
//! downcasts the receiver are stored as erased function pointers, so entries
//! for different `V` and `M` can live side by side in one table.
//!
//! This module encapsulates the fields of [`RawEntry`]. They can only be set
//! by [`RawEntry::shared`] and [`RawEntry::exclusive`], which guarantees the
//! safety invariant: **`thunk` is the thunk instantiated for the same `V` and
//! `M` as `implementation`**.

use core::{any::TypeId, mem::transmute};

use crate::{
    method::{Exclusive, ExclusiveFn, Method, ReceiverKind, Shared, SharedFn},
    util::ErasedFn,
    value::{RawValueMut, RawValueRef},
};

/// Signature of the thunk for shared call shapes, with the lifetimes
/// instantiated at the call site.
type SharedThunk<'s, 'a, M> = unsafe fn(
    RawValueRef<'s>,
    ErasedFn,
    <M as Method>::Args<'a>,
) -> <M as Method>::Output;

/// Signature of the thunk for exclusive call shapes, with the lifetimes
/// instantiated at the call site.
type ExclusiveThunk<'s, 'a, M> = unsafe fn(
    RawValueMut<'s>,
    ErasedFn,
    <M as Method>::Args<'a>,
) -> <M as Method>::Output;

/// One erased implementation of a call shape for a concrete value type.
///
/// # Safety Invariant
///
/// `thunk` was created from `shared_thunk::<V, M>` or
/// `exclusive_thunk::<V, M>` (matching `receiver`), and `implementation` was
/// created from a [`SharedFn<V, M>`] or [`ExclusiveFn<V, M>`] for the same
/// `V` and `M` that `value_type_id` and `method_type_id` describe.
#[derive(Clone, Copy)]
pub struct RawEntry {
    /// Gets the [`TypeId`] of `M`
    method_type_id: fn() -> TypeId,
    /// Gets the type name of `M`
    method_name: fn() -> &'static str,
    /// Gets the [`TypeId`] of `V`
    value_type_id: fn() -> TypeId,
    /// Gets the type name of `V`
    value_type_name: fn() -> &'static str,
    /// The receiver kind of `M`
    receiver: ReceiverKind,
    /// The erased `shared_thunk::<V, M>` or `exclusive_thunk::<V, M>`
    thunk: ErasedFn,
    /// The erased user implementation
    implementation: ErasedFn,
}

impl RawEntry {
    /// Creates an entry for a call shape taking `&self`.
    pub fn shared<V: 'static, M: Method<Receiver = Shared>>(
        implementation: SharedFn<V, M>,
    ) -> Self {
        let thunk: SharedThunk<'static, 'static, M> = shared_thunk::<V, M>;

        Self {
            method_type_id: TypeId::of::<M>,
            method_name: core::any::type_name::<M>,
            value_type_id: TypeId::of::<V>,
            value_type_name: core::any::type_name::<V>,
            receiver: ReceiverKind::Shared,
            // SAFETY: Function pointers have the same layout regardless of their
            // signature. The pointer is only called after being transmuted back to
            // a `SharedThunk<M>` in `call`.
            thunk: unsafe { transmute::<SharedThunk<'static, 'static, M>, ErasedFn>(thunk) },
            // SAFETY: As above; the pointer is transmuted back to `SharedFn<V, M>` in
            // `shared_thunk::<V, M>`.
            implementation: unsafe { transmute::<SharedFn<V, M>, ErasedFn>(implementation) },
        }
    }

    /// Creates an entry for a call shape taking `&mut self`.
    pub fn exclusive<V: 'static, M: Method<Receiver = Exclusive>>(
        implementation: ExclusiveFn<V, M>,
    ) -> Self {
        let thunk: ExclusiveThunk<'static, 'static, M> = exclusive_thunk::<V, M>;

        Self {
            method_type_id: TypeId::of::<M>,
            method_name: core::any::type_name::<M>,
            value_type_id: TypeId::of::<V>,
            value_type_name: core::any::type_name::<V>,
            receiver: ReceiverKind::Exclusive,
            // SAFETY: Function pointers have the same layout regardless of their
            // signature. The pointer is only called after being transmuted back to
            // an `ExclusiveThunk<M>` in `call_mut`.
            thunk: unsafe { transmute::<ExclusiveThunk<'static, 'static, M>, ErasedFn>(thunk) },
            // SAFETY: As above; the pointer is transmuted back to `ExclusiveFn<V, M>`
            // in `exclusive_thunk::<V, M>`.
            implementation: unsafe { transmute::<ExclusiveFn<V, M>, ErasedFn>(implementation) },
        }
    }

    /// Returns the [`TypeId`] of the call shape this entry implements.
    #[inline]
    pub fn method_type_id(&self) -> TypeId {
        (self.method_type_id)()
    }

    /// Returns the [`core::any::type_name`] of the call shape.
    #[inline]
    pub fn method_name(&self) -> &'static str {
        (self.method_name)()
    }

    /// Returns the [`TypeId`] of the value type this entry was created for.
    #[inline]
    pub fn value_type_id(&self) -> TypeId {
        (self.value_type_id)()
    }

    /// Returns the [`core::any::type_name`] of the value type.
    #[inline]
    pub fn value_type_name(&self) -> &'static str {
        (self.value_type_name)()
    }

    /// Returns whether the entry takes `&self` or `&mut self`.
    #[inline]
    pub fn receiver(&self) -> ReceiverKind {
        self.receiver
    }

    /// Returns `true` if both entries call the same implementation.
    #[inline]
    pub fn same_implementation(&self, other: &Self) -> bool {
        core::ptr::fn_addr_eq(self.implementation, other.implementation)
            && self.method_type_id() == other.method_type_id()
            && self.value_type_id() == other.value_type_id()
    }

    /// Calls the entry with a shared receiver.
    ///
    /// # Safety
    ///
    /// The caller must ensure:
    ///
    /// 1. This entry was created by [`RawEntry::shared`] for the call shape
    ///    `M`.
    /// 2. The value behind `this` has the value type this entry was created
    ///    for.
    #[inline]
    pub unsafe fn call<'s, 'a, M: Method>(
        &self,
        this: RawValueRef<'s>,
        args: M::Args<'a>,
    ) -> M::Output {
        debug_assert_eq!(self.method_type_id(), TypeId::of::<M>());
        debug_assert_eq!(self.receiver, ReceiverKind::Shared);
        debug_assert_eq!(this.type_id(), self.value_type_id());

        // SAFETY: `self.thunk` was created from `shared_thunk::<V, M>`, by our
        // invariants and guarantee 1 of the caller. The thunk is generic over the
        // lifetimes, so calling it with `'s` and `'a` is the same function.
        let thunk = unsafe { transmute::<ErasedFn, SharedThunk<'s, 'a, M>>(self.thunk) };

        // SAFETY: The thunk's requirements are upheld:
        // 1. `implementation` is a `SharedFn<V, M>`, by our invariants
        // 2. Guaranteed by the caller
        unsafe { thunk(this, self.implementation, args) }
    }

    /// Calls the entry with an exclusive receiver.
    ///
    /// # Safety
    ///
    /// The caller must ensure:
    ///
    /// 1. This entry was created by [`RawEntry::exclusive`] for the call shape
    ///    `M`.
    /// 2. The value behind `this` has the value type this entry was created
    ///    for.
    #[inline]
    pub unsafe fn call_mut<'s, 'a, M: Method>(
        &self,
        this: RawValueMut<'s>,
        args: M::Args<'a>,
    ) -> M::Output {
        debug_assert_eq!(self.method_type_id(), TypeId::of::<M>());
        debug_assert_eq!(self.receiver, ReceiverKind::Exclusive);
        debug_assert_eq!(this.type_id(), self.value_type_id());

        // SAFETY: `self.thunk` was created from `exclusive_thunk::<V, M>`, by our
        // invariants and guarantee 1 of the caller.
        let thunk = unsafe { transmute::<ErasedFn, ExclusiveThunk<'s, 'a, M>>(self.thunk) };

        // SAFETY: The thunk's requirements are upheld:
        // 1. `implementation` is an `ExclusiveFn<V, M>`, by our invariants
        // 2. Guaranteed by the caller
        unsafe { thunk(this, self.implementation, args) }
    }
}

impl core::fmt::Debug for RawEntry {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("RawEntry")
            .field("method", &self.method_name())
            .field("value", &self.value_type_name())
            .field("receiver", &self.receiver)
            .finish()
    }
}

/// Downcasts the receiver and forwards to the implementation.
///
/// # Safety
///
/// The caller must ensure:
///
/// 1. `implementation` was created from a [`SharedFn<V, M>`]
/// 2. The value behind `this` has type `V`
unsafe fn shared_thunk<'s, 'a, V: 'static, M: Method>(
    this: RawValueRef<'s>,
    implementation: ErasedFn,
    args: M::Args<'a>,
) -> M::Output {
    // SAFETY: Guaranteed by the caller
    let implementation = unsafe { transmute::<ErasedFn, SharedFn<V, M>>(implementation) };
    // SAFETY: Guaranteed by the caller
    let this: &V = unsafe { this.cast::<V>() };
    implementation(this, args)
}

/// Downcasts the receiver and forwards to the implementation.
///
/// # Safety
///
/// The caller must ensure:
///
/// 1. `implementation` was created from an [`ExclusiveFn<V, M>`]
/// 2. The value behind `this` has type `V`
unsafe fn exclusive_thunk<'s, 'a, V: 'static, M: Method>(
    this: RawValueMut<'s>,
    implementation: ErasedFn,
    args: M::Args<'a>,
) -> M::Output {
    // SAFETY: Guaranteed by the caller
    let implementation = unsafe { transmute::<ErasedFn, ExclusiveFn<V, M>>(implementation) };
    // SAFETY: Guaranteed by the caller
    let this: &mut V = unsafe { this.cast::<V>() };
    implementation(this, args)
}

#[cfg(test)]
mod tests {
    use alloc::{format, string::String};

    use super::*;
    use crate::value::{RawHeap, RawLocal, ValueHandler};

    struct NoCloneHandler;
    impl<V: 'static> ValueHandler<V> for NoCloneHandler {
        fn try_clone(_value: &V) -> Option<V> {
            None
        }
    }

    struct Describe;
    impl Method for Describe {
        type Receiver = Shared;
        type Args<'a> = (&'a mut String,);
        type Output = usize;
    }

    struct Bump;
    impl Method for Bump {
        type Receiver = Exclusive;
        type Args<'a> = (i32,);
        type Output = ();
    }

    struct Counter(i32);

    fn describe_counter(counter: &Counter, (out,): (&mut String,)) -> usize {
        let text = format!("counter {}", counter.0);
        out.push_str(&text);
        text.len()
    }

    #[test]
    fn test_entry_send_sync() {
        static_assertions::assert_impl_all!(RawEntry: Copy, Send, Sync);
    }

    #[test]
    fn test_entry_metadata() {
        let entry = RawEntry::shared::<Counter, Describe>(describe_counter);
        assert_eq!(entry.method_type_id(), TypeId::of::<Describe>());
        assert_eq!(entry.value_type_id(), TypeId::of::<Counter>());
        assert_eq!(entry.receiver(), ReceiverKind::Shared);
        assert!(entry.method_name().ends_with("Describe"));
        assert!(entry.value_type_name().ends_with("Counter"));
    }

    #[test]
    fn test_entry_call_shared_with_borrowed_args() {
        let entry = RawEntry::shared::<Counter, Describe>(describe_counter);
        let heap = RawHeap::new::<Counter, NoCloneHandler>(Counter(3));

        let mut out = String::new();
        // SAFETY: The entry is a shared `Describe` entry for `Counter`, and the heap
        // holds a `Counter`.
        let written = unsafe { entry.call::<Describe>(heap.as_ref(), (&mut out,)) };
        assert_eq!(out, "counter 3");
        assert_eq!(written, 9);
    }

    #[test]
    fn test_entry_call_exclusive_from_closure() {
        let entry = RawEntry::exclusive::<Counter, Bump>(|counter, (by,)| counter.0 += by);
        let mut local = RawLocal::<8>::new::<Counter, NoCloneHandler>(Counter(1));

        // SAFETY: The entry is an exclusive `Bump` entry for `Counter`, and the
        // buffer holds a `Counter`.
        unsafe { entry.call_mut::<Bump>(local.as_mut(), (41,)) };
        assert_eq!(local.as_ref().downcast::<Counter>().map(|c| c.0), Some(42));
    }

    #[test]
    fn test_entry_same_implementation() {
        let a = RawEntry::shared::<Counter, Describe>(describe_counter);
        let b = a;
        let c = RawEntry::shared::<Counter, Describe>(|_, _| 0);
        assert!(a.same_implementation(&b));
        assert!(!a.same_implementation(&c));
    }
}
