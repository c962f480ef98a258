use crate::ledger::file::StoreFileError;
use crate::model::{Account, Amount, ChatId, Entry};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("Balance overflow or rounding for chat {0}")]
    Overflow(ChatId),

    #[error("Unable to persist the ledger")]
    Persist(#[from] StoreFileError),

    #[error("Backend unavailable: {0}")]
    Unavailable(String),
}

/// Reasons the best-effort history trim did not apply.
#[derive(Debug, Error)]
pub enum TrimSkipped {
    #[error("History is within the retention limit")]
    WithinLimit,

    #[error("Backend error while trimming")]
    Backend(#[from] BackendError),
}

/// The persistence layer beneath [`LedgerStore`].
///
/// Every method is a single atomic operation on one chat's row. Implementations must never expose
/// a partially applied `add_and_append` to other callers, and must not lose updates when it is
/// called concurrently for the same chat.
///
/// Exists as a trait so that unit tests can inject failing backends.
///
/// [`LedgerStore`]: crate::ledger::LedgerStore
pub trait Backend {
    /// Fetch a chat's row, if it exists.
    fn get(&self, chat_id: ChatId) -> Result<Option<Account>, BackendError>;

    /// Add `entry.amount` to the balance and append `entry` to the history, creating the row when
    /// missing. Returns the new balance.
    fn add_and_append(&self, chat_id: ChatId, entry: Entry) -> Result<Amount, BackendError>;

    /// Evict the oldest history entries so that at most `limit` remain, on the condition that the
    /// history is currently longer than `limit`. Returns the number of evicted entries.
    fn trim_history(&self, chat_id: ChatId, limit: usize) -> Result<usize, TrimSkipped>;

    /// Replace the row for `account.chat_id()` entirely.
    fn put(&self, account: Account) -> Result<(), BackendError>;
}
