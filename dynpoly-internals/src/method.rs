//! Call shapes: the receiver, arguments and output of one erased method.
//!
//! A call shape is identified by a zero-sized key type implementing
//! [`Method`]. Overloads of the same operation are distinct call shapes, so
//! `add(i32)` and `add(i32, i32)` are described by two key types.

/// Describes one call shape.
///
/// The implementing type is only used as a key; it is never instantiated by
/// this crate. Arguments are passed as a tuple, which allows borrowed
/// arguments through the lifetime of [`Args`](Method::Args).
///
/// # Examples
///
/// ```
/// use dynpoly_internals::{Method, Shared};
///
/// struct Draw;
///
/// impl Method for Draw {
///     type Receiver = Shared;
///     type Args<'a> = (&'a mut String,);
///     type Output = ();
/// }
/// ```
pub trait Method: 'static {
    /// Whether the method takes `&self` ([`Shared`]) or `&mut self`
    /// ([`Exclusive`]).
    type Receiver: Receiver;

    /// The argument tuple of the method.
    type Args<'a>;

    /// The return type of the method.
    type Output;
}

/// Private module so the [`Receiver`] trait cannot be implemented outside this
/// crate.
mod sealed_receiver {
    use super::*;

    /// Supertrait of [`Receiver`].
    pub trait Sealed: 'static {}

    impl Sealed for Shared {}
    impl Sealed for Exclusive {}
}

/// Marker trait for the two receiver kinds of a [`Method`].
///
/// This trait is sealed and implemented for [`Shared`] and [`Exclusive`] only.
pub trait Receiver: sealed_receiver::Sealed {
    /// The runtime description of this receiver kind.
    const KIND: ReceiverKind;
}

/// Receiver marker for methods taking `&self`.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Debug, Default, Hash)]
pub struct Shared;

/// Receiver marker for methods taking `&mut self`.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Debug, Default, Hash)]
pub struct Exclusive;

impl Receiver for Shared {
    const KIND: ReceiverKind = ReceiverKind::Shared;
}

impl Receiver for Exclusive {
    const KIND: ReceiverKind = ReceiverKind::Exclusive;
}

/// Runtime description of a [`Receiver`].
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Debug, Hash)]
pub enum ReceiverKind {
    /// The method takes `&self`.
    Shared,
    /// The method takes `&mut self`.
    Exclusive,
}

impl core::fmt::Display for ReceiverKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            ReceiverKind::Shared => f.write_str("&self"),
            ReceiverKind::Exclusive => f.write_str("&mut self"),
        }
    }
}

/// Implementation of the shared call shape `M` for the concrete type `V`.
///
/// Non-capturing closures coerce to this type.
pub type SharedFn<V, M> =
    for<'s, 'a> fn(&'s V, <M as Method>::Args<'a>) -> <M as Method>::Output;

/// Implementation of the exclusive call shape `M` for the concrete type `V`.
///
/// Non-capturing closures coerce to this type.
pub type ExclusiveFn<V, M> =
    for<'s, 'a> fn(&'s mut V, <M as Method>::Args<'a>) -> <M as Method>::Output;
