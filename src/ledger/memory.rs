//! Sharded in-process ledger rows.
//!
//! Rows are spread over a fixed number of buckets, each behind its own lock. An operation on one
//! chat locks only that chat's bucket for the duration of the read-modify-write, which is what
//! makes [`Backend::add_and_append`] atomic. Chats in different buckets never contend.

use super::backend::{Backend, BackendError, TrimSkipped};
use crate::model::{Account, Amount, ChatId, Entry};
use crate::util::sync::Mutex;
use std::collections::hash_map::RandomState;
use std::hash::BuildHasher;

const DEFAULT_CAPACITY: usize = 1_024;

/// A concurrent, in-memory [`Backend`].
///
/// The number of buckets is fixed to 1/16 of the initial capacity. Buckets grow as needed.
#[derive(Debug)]
pub struct MemoryBackend<H = RandomState> {
    buckets: Vec<Mutex<Vec<Account>>>,
    hasher: H,
}

impl MemoryBackend {
    /// Create an empty backend with default capacity and hasher.
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// Create an empty backend with the specified capacity and default hasher.
    pub fn with_capacity(capacity: usize) -> Self {
        Self::with_capacity_and_hasher(capacity, RandomState::new())
    }
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl<H: BuildHasher> MemoryBackend<H> {
    /// Create an empty backend with the specified capacity and hasher.
    ///
    /// # Panics
    ///
    /// The `capacity` is required to be greater than or equal to `256`.
    pub fn with_capacity_and_hasher(capacity: usize, hasher: H) -> Self {
        assert!(capacity >= 256);
        let max_buckets = capacity / 16;
        let max_rows = 16;

        let mut buckets = Vec::with_capacity(max_buckets);
        for _ in 0..max_buckets {
            buckets.push(Mutex::new(Vec::with_capacity(max_rows)));
        }

        Self { buckets, hasher }
    }

    /// A copy of a single row.
    pub fn account(&self, chat_id: ChatId) -> Option<Account> {
        let guard = self.buckets[self.bucket(chat_id)].lock();

        guard
            .iter()
            .find(|account| account.chat_id() == chat_id)
            .cloned()
    }

    /// A copy of every row. Buckets are locked one at a time, so this is not a point-in-time
    /// snapshot across chats, but each row is internally consistent.
    pub fn snapshot(&self) -> Vec<Account> {
        self.buckets
            .iter()
            .flat_map(|bucket| bucket.lock().clone())
            .collect()
    }

    /// Consume the backend, returning every row.
    pub fn into_inner(self) -> Vec<Account> {
        self.buckets
            .into_iter()
            .flat_map(|bucket| bucket.into_inner())
            .collect()
    }

    /// Put a row back to a previously observed state. `None` removes the row.
    pub(crate) fn restore(&self, chat_id: ChatId, account: Option<Account>) {
        let mut guard = self.buckets[self.bucket(chat_id)].lock();
        let position = guard.iter().position(|row| row.chat_id() == chat_id);

        match (position, account) {
            (Some(index), Some(account)) => guard[index] = account,
            (Some(index), None) => {
                guard.swap_remove(index);
            }
            (None, Some(account)) => guard.push(account),
            (None, None) => (),
        }
    }

    /// Return the chat's bucket index.
    fn bucket(&self, chat_id: ChatId) -> usize {
        self.hasher.hash_one(chat_id) as usize % self.buckets.len()
    }
}

impl<H: BuildHasher> Backend for MemoryBackend<H> {
    fn get(&self, chat_id: ChatId) -> Result<Option<Account>, BackendError> {
        Ok(self.account(chat_id))
    }

    fn add_and_append(&self, chat_id: ChatId, entry: Entry) -> Result<Amount, BackendError> {
        let mut guard = self.buckets[self.bucket(chat_id)].lock();

        match guard.iter_mut().find(|account| account.chat_id() == chat_id) {
            Some(account) => account.record(entry).ok_or(BackendError::Overflow(chat_id)),
            None => {
                let account = Account::open(chat_id, entry);
                let balance = account.balance;
                guard.push(account);

                Ok(balance)
            }
        }
    }

    fn trim_history(&self, chat_id: ChatId, limit: usize) -> Result<usize, TrimSkipped> {
        let mut guard = self.buckets[self.bucket(chat_id)].lock();

        match guard.iter_mut().find(|account| account.chat_id() == chat_id) {
            Some(account) if account.history.len() > limit => {
                Ok(account.history.evict_beyond(limit))
            }
            _ => Err(TrimSkipped::WithinLimit),
        }
    }

    fn put(&self, account: Account) -> Result<(), BackendError> {
        self.restore(account.chat_id(), Some(account));

        Ok(())
    }
}

impl FromIterator<Account> for MemoryBackend {
    fn from_iter<T: IntoIterator<Item = Account>>(iter: T) -> Self {
        let backend = Self::new();
        for account in iter {
            backend.restore(account.chat_id(), Some(account));
        }

        backend
    }
}
