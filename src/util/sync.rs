#[cfg(not(loom))]
pub(crate) use parking_lot::MutexGuard;

#[cfg(loom)]
pub(crate) use loom::sync::MutexGuard;

/// Lock over a bucket of ledger rows, backed by loom when model checking.
///
/// A mutex rather than a reader/writer lock: add-and-append is a read-modify-write and needs
/// exclusive access to the row.
#[derive(Debug)]
pub(crate) struct Mutex<T>(
    #[cfg(not(loom))] parking_lot::Mutex<T>,
    #[cfg(loom)] loom::sync::Mutex<T>,
);

impl<T> Mutex<T> {
    pub(crate) fn new(value: T) -> Self {
        #[cfg(not(loom))]
        let lock = parking_lot::Mutex::new(value);
        #[cfg(loom)]
        let lock = loom::sync::Mutex::new(value);

        Self(lock)
    }

    pub(crate) fn lock(&self) -> MutexGuard<'_, T> {
        let guard = self.0.lock();

        #[cfg(loom)]
        let guard = guard.unwrap();

        guard
    }

    #[allow(clippy::let_and_return)]
    pub(crate) fn into_inner(self) -> T {
        let inner = self.0.into_inner();

        #[cfg(loom)]
        let inner = inner.unwrap();

        inner
    }
}
