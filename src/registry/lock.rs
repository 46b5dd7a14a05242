#[cfg(feature = "std")]
use std::sync as impl_;

#[cfg(not(feature = "std"))]
use spin as impl_;

/// A process-wide reader/writer lock around lazily created state.
#[repr(transparent)]
pub(crate) struct GlobalLock<T: 'static + Send + Sync>(impl_::RwLock<Option<T>>);

#[repr(transparent)]
pub(crate) struct GlobalLockReadGuard<T: 'static + Send + Sync>(
    impl_::RwLockReadGuard<'static, Option<T>>,
);

#[repr(transparent)]
pub(crate) struct GlobalLockWriteGuard<T: 'static + Send + Sync>(
    impl_::RwLockWriteGuard<'static, Option<T>>,
);

impl<T: 'static + Send + Sync> GlobalLock<T> {
    #[must_use]
    pub(crate) const fn new() -> Self {
        Self(impl_::RwLock::new(None))
    }

    #[inline]
    pub(crate) fn read(&'static self) -> GlobalLockReadGuard<T> {
        #[cfg(not(feature = "std"))]
        let guard = self.0.read();

        // A poisoned lock still holds consistent state: every write below is a
        // single insertion.
        #[cfg(feature = "std")]
        let guard = self.0.read().unwrap_or_else(std::sync::PoisonError::into_inner);

        GlobalLockReadGuard(guard)
    }

    #[inline]
    pub(crate) fn write(&'static self) -> GlobalLockWriteGuard<T> {
        #[cfg(not(feature = "std"))]
        let guard = self.0.write();

        #[cfg(feature = "std")]
        let guard = self.0.write().unwrap_or_else(std::sync::PoisonError::into_inner);

        GlobalLockWriteGuard(guard)
    }
}

impl<T: 'static + Send + Sync> GlobalLockReadGuard<T> {
    #[inline]
    pub(crate) fn get(&self) -> Option<&T> {
        self.0.as_ref()
    }
}

impl<T: 'static + Send + Sync + Default> GlobalLockWriteGuard<T> {
    #[inline]
    pub(crate) fn get_or_default(&mut self) -> &mut T {
        self.0.get_or_insert_with(T::default)
    }
}
