//! Every error type in the crate, in one place.

pub use crate::config::ConfigError;
pub use crate::ledger::{BackendError, LedgerError, StoreFileError, TrimSkipped};
pub use crate::messenger::{MessengerError, TelegramClientError};
pub use crate::model::AmountError;
pub use crate::router::RouterError;
