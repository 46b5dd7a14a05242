/// Declares call shapes.
///
/// Each declaration creates a zero-sized key type and implements
/// [`Method`](crate::Method) for it. The receiver is `&self` or `&mut self`;
/// the remaining parameters become the argument tuple passed to
/// [`Poly::call`](crate::Poly::call) and to the implementations registered on
/// a [`TableBuilder`](crate::dispatch::TableBuilder).
///
/// Borrowed arguments need a named lifetime, declared after the type name.
/// Overloads of the same operation are separate declarations.
///
/// # Examples
///
/// ```
/// use dynpoly::prelude::*;
///
/// method! {
///     /// Writes the value into a buffer.
///     pub struct Draw<'a>: fn(&self, &'a mut String);
///
///     pub struct Add1: fn(&mut self, i32);
///     pub struct Add2: fn(&mut self, i32, i32);
///     pub(crate) struct Get: fn(&self) -> i32;
/// }
///
/// fn takes_args(_: <Add2 as Method>::Args<'_>) {}
/// takes_args((1, 2));
///
/// let mut out = String::new();
/// let args: <Draw as Method>::Args<'_> = (&mut out,);
/// # drop(args);
/// ```
#[macro_export]
macro_rules! method {
    (@output) => { () };
    (@output $out:ty) => { $out };

    (@emit [$($attr:tt)*] $vis:vis $name:ident [] $receiver:ident [$($arg:ty),*] [$($out:ty)?]) => {
        $($attr)*
        #[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Debug, Default, Hash)]
        $vis struct $name;

        impl $crate::Method for $name {
            type Receiver = $crate::$receiver;
            type Args<'a> = ($($arg,)*);
            type Output = $crate::method!(@output $($out)?);
        }
    };

    (
        @emit [$($attr:tt)*] $vis:vis $name:ident [$lt:lifetime]
        $receiver:ident [$($arg:ty),*] [$($out:ty)?]
    ) => {
        $($attr)*
        #[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Debug, Default, Hash)]
        $vis struct $name;

        impl $crate::Method for $name {
            type Receiver = $crate::$receiver;
            type Args<$lt> = ($($arg,)*);
            type Output = $crate::method!(@output $($out)?);
        }
    };

    () => {};

    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident $(<$lt:lifetime>)? : fn(&self $(, $arg:ty)*) $(-> $out:ty)?;
        $($rest:tt)*
    ) => {
        $crate::method!(@emit [$(#[$meta])*] $vis $name [$($lt)?] Shared [$($arg),*] [$($out)?]);
        $crate::method!($($rest)*);
    };

    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident $(<$lt:lifetime>)? : fn(&mut self $(, $arg:ty)*) $(-> $out:ty)?;
        $($rest:tt)*
    ) => {
        $crate::method!(@emit [$(#[$meta])*] $vis $name [$($lt)?] Exclusive [$($arg),*] [$($out)?]);
        $crate::method!($($rest)*);
    };
}

/// Emits a `debug` event when the `tracing` feature is enabled.
macro_rules! debug_event {
    ($($arg:tt)*) => {
        #[cfg(feature = "tracing")]
        {
            ::tracing::debug!($($arg)*);
        }
    };
}

/// Emits a `warn` event when the `tracing` feature is enabled.
macro_rules! warn_event {
    ($($arg:tt)*) => {
        #[cfg(feature = "tracing")]
        {
            ::tracing::warn!($($arg)*);
        }
    };
}
