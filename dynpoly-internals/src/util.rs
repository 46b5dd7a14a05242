//! Internal utility types.

/// Marker type used when type-erasing values.
///
/// This zero-sized type serves as the pointee of erased value pointers. A
/// `NonNull<Erased>` points to a value of some concrete type `V` that is
/// unknown at the current scope; only functions instantiated with that `V`
/// may read through it.
///
/// Using a distinct marker type (rather than `()`) makes the intent clearer
/// in type signatures and error messages.
pub(crate) struct Erased;

/// A function pointer with its signature erased.
///
/// Stored function pointers are transmuted to this type when their concrete
/// signature depends on type parameters that are no longer known, and are
/// transmuted back to the exact original signature before being called.
pub(crate) type ErasedFn = unsafe fn();
