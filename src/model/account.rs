use crate::model::Amount;
use crate::util::history::History;
use serde::{Deserialize, Serialize};

/// Chats are identified by their Telegram chat ID.
pub type ChatId = i64;

/// One recorded balance change.
#[derive(Copy, Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct Entry {
    /// Seconds since the Unix epoch, taken when the entry was recorded.
    pub timestamp: i64,
    pub amount: Amount,
}

/// The ledger row for a single chat.
///
/// `balance` is the sum of every amount applied since the last reset. `history` is only a display
/// window over the most recent entries, so the two are not expected to agree.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct Account {
    chat_id: ChatId,
    pub balance: Amount,
    pub history: History<Entry>,
}

impl Account {
    /// An account with the given balance and no history.
    pub fn new(chat_id: ChatId, balance: Amount) -> Self {
        Self {
            chat_id,
            balance,
            history: History::new(),
        }
    }

    /// An account created by its first entry.
    pub fn open(chat_id: ChatId, entry: Entry) -> Self {
        Self {
            chat_id,
            balance: entry.amount,
            history: History::from_iter([entry]),
        }
    }

    pub fn chat_id(&self) -> ChatId {
        self.chat_id
    }

    /// Add the entry's amount to the balance and record it.
    ///
    /// Returns the new balance, or `None` without modifying the account if the sum overflows or
    /// would round.
    pub fn record(&mut self, entry: Entry) -> Option<Amount> {
        let balance = self.balance.checked_add(entry.amount)?;
        self.balance = balance;
        self.history.append_back(entry);

        Some(balance)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    fn entry(timestamp: i64, amount: &str) -> Entry {
        Entry {
            timestamp,
            amount: amount.parse().unwrap(),
        }
    }

    #[test]
    fn test_open_and_record() {
        let mut account = Account::open(42, entry(1, "10.50"));
        assert_eq!(account.chat_id(), 42);
        assert_eq!(account.balance.to_string(), "10.50");
        assert_eq!(account.history.len(), 1);

        assert_eq!(account.record(entry(2, "-3.25")).unwrap().to_string(), "7.25");
        assert_eq!(account.balance.to_string(), "7.25");
        assert_eq!(account.history.len(), 2);
        assert_eq!(account.history[1], entry(2, "-3.25"));
    }

    #[test]
    fn test_record_overflow_leaves_account_untouched() {
        let mut account = Account::new(1, Amount::from(Decimal::MAX));
        let before = account.clone();

        assert!(account.record(entry(1, "1")).is_none());
        assert_eq!(account, before);
    }

    #[test]
    fn test_ron_shape() {
        let account = Account::open(42, entry(1_700_000_000, "10.50"));
        let serialized = ron::to_string(&account).unwrap();

        assert_eq!(
            serialized,
            r#"(chat_id:42,balance:"10.50",history:[(timestamp:1700000000,amount:"10.50")])"#
        );
        assert_eq!(ron::from_str::<Account>(&serialized).unwrap(), account);
    }
}
