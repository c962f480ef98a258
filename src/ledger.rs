//! Per-chat balances with a short window of recent entries.
//!
//! [`LedgerStore`] is the only reader and writer of persisted state. Every mutation is pushed down
//! into a single atomic [`Backend`] primitive, so concurrent updates to the same chat are never
//! lost. The history window is trimmed in a separate best-effort step after each addition.

use crate::model::{Account, Amount, AmountError, ChatId, Entry};
use thiserror::Error;
use tracing::{debug, trace, warn};

pub use self::backend::{Backend, BackendError, TrimSkipped};
pub use self::file::{RonBackend, StoreFileError, STORE_VERSION};
pub use self::memory::MemoryBackend;

mod backend;
mod file;
mod memory;

/// The number of entries retained per chat.
pub const HISTORY_LIMIT: usize = 10;

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("Invalid amount `{0}`")]
    InvalidAmount(String, #[source] AmountError),

    #[error("Storage unavailable")]
    StorageUnavailable(#[source] BackendError),

    #[error("Balance for chat {0} is out of range or precision")]
    Overflow(ChatId),
}

impl From<BackendError> for LedgerError {
    fn from(err: BackendError) -> Self {
        match err {
            BackendError::Overflow(chat_id) => Self::Overflow(chat_id),
            err => Self::StorageUnavailable(err),
        }
    }
}

/// Source of entry timestamps.
pub trait Clock {
    /// Seconds since the Unix epoch.
    fn now(&self) -> i64;
}

/// Wall-clock time.
#[derive(Copy, Clone, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> i64 {
        chrono::Utc::now().timestamp()
    }
}

#[derive(Debug)]
pub struct LedgerStore<B, C = SystemClock> {
    backend: B,
    clock: C,
}

impl<B: Backend> LedgerStore<B> {
    pub fn new(backend: B) -> Self {
        Self::with_clock(backend, SystemClock)
    }
}

impl<B: Backend, C: Clock> LedgerStore<B, C> {
    pub fn with_clock(backend: B, clock: C) -> Self {
        Self { backend, clock }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// The chat's current balance. A chat that was never written has a zero balance.
    pub fn get_balance(&self, chat_id: ChatId) -> Result<Amount, LedgerError> {
        let balance = self
            .backend
            .get(chat_id)
            .map_err(LedgerError::StorageUnavailable)?
            .map_or(Amount::ZERO, |account| account.balance);
        trace!(chat_id, %balance, "Read balance");

        Ok(balance)
    }

    /// Parse `amount` and add it to the chat's balance. Returns the new balance.
    pub fn apply_delta(&self, chat_id: ChatId, amount: &str) -> Result<Amount, LedgerError> {
        self.apply_amount(chat_id, parse_amount(amount)?)
    }

    /// Add `amount` to the chat's balance and record it in the history. Returns the new balance.
    ///
    /// The account is created when missing. Trimming the history afterwards is best-effort: a trim
    /// that does not apply is logged, and the addition still succeeds.
    pub fn apply_amount(&self, chat_id: ChatId, amount: Amount) -> Result<Amount, LedgerError> {
        let entry = Entry {
            timestamp: self.clock.now(),
            amount,
        };
        let balance = self.backend.add_and_append(chat_id, entry)?;
        debug!(chat_id, %amount, %balance, "Applied delta");

        match self.backend.trim_history(chat_id, HISTORY_LIMIT) {
            Ok(evicted) => debug!(chat_id, evicted, "Trimmed history"),
            Err(TrimSkipped::WithinLimit) => debug!(chat_id, "History within limit"),
            Err(err) => warn!(chat_id, ?err, "History trim skipped"),
        }

        Ok(balance)
    }

    /// Parse `new_balance` and replace the chat's row with it, clearing the history.
    pub fn reset_balance(&self, chat_id: ChatId, new_balance: &str) -> Result<(), LedgerError> {
        self.reset_amount(chat_id, parse_amount(new_balance)?)
    }

    /// Replace the chat's row with `balance` and an empty history.
    pub fn reset_amount(&self, chat_id: ChatId, balance: Amount) -> Result<(), LedgerError> {
        self.backend
            .put(Account::new(chat_id, balance))
            .map_err(LedgerError::StorageUnavailable)?;
        debug!(chat_id, %balance, "Reset balance");

        Ok(())
    }

    /// The retained history, oldest first.
    ///
    /// At most [`HISTORY_LIMIT`] of the most recent entries are returned. `count` is how many the
    /// caller intends to show; it is left to the caller to apply.
    pub fn get_history(&self, chat_id: ChatId, count: usize) -> Result<Vec<Entry>, LedgerError> {
        let history = self
            .backend
            .get(chat_id)
            .map_err(LedgerError::StorageUnavailable)?
            .map(|account| account.history.latest(HISTORY_LIMIT).copied().collect())
            .unwrap_or_default();
        trace!(chat_id, count, "Read history");

        Ok(history)
    }
}

fn parse_amount(amount: &str) -> Result<Amount, LedgerError> {
    amount
        .parse()
        .map_err(|err| LedgerError::InvalidAmount(amount.to_string(), err))
}
