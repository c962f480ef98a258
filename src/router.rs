//! Turns chat updates into ledger operations and replies.

use crate::ledger::{Backend, Clock, LedgerError, LedgerStore};
use crate::messenger::{Messenger, MessengerError};
use crate::model::{Amount, ChatId, Entry};
use botapi::types::{AnswerCallbackQuery, CallbackQuery, InlineKeyboardButton, Message};
use botapi::types::{ReplyMarkup, SendMessage, Update};
use chrono::{DateTime, FixedOffset};
use thiserror::Error;
use tracing::{debug, trace, warn};

/// Entries shown by `/list` when no count is given.
pub const DEFAULT_LIST_COUNT: usize = 10;

const HOW_MUCH: &str = "How much?";
const DONT_UNDERSTAND: &str = "Don't understand, please try again.";
const DONT_KNOW: &str = "Don't know what you're talking. Try again, or say \"cancel\" to cancel.";
const TRY_AGAIN_LATER: &str = "Sorry, the ledger is unavailable. Please try again later.";
const BALANCE_RESET: &str = "Balance reset";
const REVERT_BUTTON: &str = "⏪";
const TIMESTAMP_FORMAT: &str = "%d/%m/%Y %H:%M:%S";

#[derive(Debug, Error)]
pub enum RouterError {
    #[error("Ledger error in chat {0}")]
    Ledger(ChatId, #[source] LedgerError),

    #[error("Unable to deliver reply")]
    Messenger(#[from] MessengerError),
}

/// A bot command, parsed from message text.
#[derive(Debug, Eq, PartialEq)]
pub enum Command<'a> {
    /// `/add [amount]`, with only the first word of the argument kept.
    Add(Option<&'a str>),

    /// `/list [n]`
    List(usize),

    /// `/balance`
    Balance,

    /// `/reset [v]`, resetting to zero when `v` is absent or not a number.
    Reset(Amount),
}

impl<'a> Command<'a> {
    /// Parse a command. Mentions like `/add@SomeBot` are accepted. Returns `None` for anything that
    /// is not a known command.
    pub fn parse(text: &'a str) -> Option<Self> {
        let (command, args) = text.split_once(' ').unwrap_or((text, ""));
        let command = command.split_once('@').map_or(command, |(command, _bot)| command);

        match command {
            "/add" => Some(Self::Add(args.split_whitespace().next())),
            "/list" => Some(Self::List(
                args.trim()
                    .parse()
                    .ok()
                    .filter(|&count| count > 0)
                    .unwrap_or(DEFAULT_LIST_COUNT),
            )),
            "/balance" => Some(Self::Balance),
            "/reset" => Some(Self::Reset(args.trim().parse().unwrap_or(Amount::ZERO))),
            _ => None,
        }
    }
}

/// Handles one update at a time. Shared between handler threads by reference.
pub struct Router<'a, B, C, M> {
    store: &'a LedgerStore<B, C>,
    messenger: &'a M,
    offset: FixedOffset,
}

impl<'a, B, C, M> Router<'a, B, C, M>
where
    B: Backend,
    C: Clock,
    M: Messenger,
{
    /// `offset` is the time zone used to display entry timestamps.
    pub fn new(store: &'a LedgerStore<B, C>, messenger: &'a M, offset: FixedOffset) -> Self {
        Self {
            store,
            messenger,
            offset,
        }
    }

    /// Handle a single update.
    ///
    /// Ledger failures are reported to the chat on a best-effort basis before being returned.
    pub fn handle(&self, update: &Update) -> Result<(), RouterError> {
        if let Some(query) = &update.callback_query {
            return self.handle_callback(query);
        }

        let Some(message) = &update.message else {
            trace!(update_id = update.update_id, "Ignoring update");
            return Ok(());
        };
        let Some(text) = message.text.as_deref() else {
            trace!(update_id = update.update_id, "Ignoring message without text");
            return Ok(());
        };

        if message.reply_to_message.is_some() {
            return self.handle_reply(message, text);
        }

        match Command::parse(text) {
            Some(command) => self.handle_command(message, command),
            None => Ok(()),
        }
    }

    /// The reversal button under a `/list` entry.
    fn handle_callback(&self, query: &CallbackQuery) -> Result<(), RouterError> {
        let answer = AnswerCallbackQuery::new(query.id.as_str());
        let Some((chat_id, amount)) = query.data.as_deref().and_then(parse_reversal) else {
            warn!(data = ?query.data, "Malformed callback data");
            return Ok(self.messenger.answer_callback_query(&answer)?);
        };

        let origin = query.message.as_ref().map(|message| message.chat.id);
        if origin.is_some_and(|origin| origin != chat_id) {
            warn!(chat_id, ?origin, "Callback data names another chat");
            return Ok(self.messenger.answer_callback_query(&answer)?);
        }

        let balance = match self.store.apply_delta(chat_id, amount) {
            Ok(balance) => balance,
            Err(LedgerError::InvalidAmount(amount, _)) => {
                warn!(chat_id, %amount, "Malformed callback amount");
                return Ok(self.messenger.answer_callback_query(&answer)?);
            }
            Err(err) => return Err(self.fail(chat_id, err)),
        };
        self.messenger.answer_callback_query(&answer)?;

        let user = query.from.username.as_deref().unwrap_or(&query.from.first_name);
        self.send(SendMessage::new(
            chat_id,
            format!("@{user} reverted entry.\n{}", balance_updated(balance)),
        ))
    }

    /// An answer to a "How much?" prompt.
    fn handle_reply(&self, message: &Message, text: &str) -> Result<(), RouterError> {
        let chat_id = message.chat.id;
        if text.trim().eq_ignore_ascii_case("cancel") {
            debug!(chat_id, "Prompt cancelled");
            return Ok(());
        }

        let amount = text.split_whitespace().next().unwrap_or_default();
        match self.store.apply_delta(chat_id, amount) {
            Ok(balance) => self.send(SendMessage::new(chat_id, balance_updated(balance))),
            Err(LedgerError::InvalidAmount(..)) => self.send(
                SendMessage::new(chat_id, DONT_KNOW).force_reply_to(message.message_id),
            ),
            Err(err) => Err(self.fail(chat_id, err)),
        }
    }

    fn handle_command(&self, message: &Message, command: Command<'_>) -> Result<(), RouterError> {
        let chat_id = message.chat.id;
        debug!(chat_id, ?command, "Handling command");

        match command {
            Command::Add(None) => {
                self.send(SendMessage::new(chat_id, HOW_MUCH).force_reply_to(message.message_id))
            }
            Command::Add(Some(amount)) => match self.store.apply_delta(chat_id, amount) {
                Ok(balance) => self.send(SendMessage::new(chat_id, balance_updated(balance))),
                Err(LedgerError::InvalidAmount(..)) => {
                    self.send(SendMessage::new(chat_id, DONT_UNDERSTAND))
                }
                Err(err) => Err(self.fail(chat_id, err)),
            },
            Command::List(count) => {
                let history = self.ledger(chat_id, self.store.get_history(chat_id, count))?;
                let start = history.len().saturating_sub(count);
                for entry in &history[start..] {
                    self.send(self.list_entry(chat_id, entry))?;
                }

                Ok(())
            }
            Command::Balance => {
                let balance = self.ledger(chat_id, self.store.get_balance(chat_id))?;

                self.send(SendMessage::new(chat_id, format!("Current balance: {balance}")))
            }
            Command::Reset(balance) => {
                self.ledger(chat_id, self.store.reset_amount(chat_id, balance))?;

                self.send(SendMessage::new(chat_id, BALANCE_RESET))
            }
        }
    }

    /// One `/list` line, with a button that applies the negated amount.
    fn list_entry(&self, chat_id: ChatId, entry: &Entry) -> SendMessage {
        let time = DateTime::from_timestamp(entry.timestamp, 0).map_or_else(
            || entry.timestamp.to_string(),
            |time| {
                time.with_timezone(&self.offset)
                    .format(TIMESTAMP_FORMAT)
                    .to_string()
            },
        );
        let revert = format!("{chat_id} {}", entry.amount.negate());

        SendMessage::new(chat_id, format!("{} @ {time}", entry.amount))
            .reply_markup(ReplyMarkup::inline(InlineKeyboardButton::callback(
                REVERT_BUTTON,
                revert,
            )))
    }

    fn send(&self, message: SendMessage) -> Result<(), RouterError> {
        Ok(self.messenger.send_message(&message)?)
    }

    fn ledger<T>(&self, chat_id: ChatId, result: Result<T, LedgerError>) -> Result<T, RouterError> {
        result.map_err(|err| self.fail(chat_id, err))
    }

    /// Tell the chat to try again later, and wrap the error for the caller.
    fn fail(&self, chat_id: ChatId, err: LedgerError) -> RouterError {
        if let Err(notice) = self.send(SendMessage::new(chat_id, TRY_AGAIN_LATER)) {
            warn!(chat_id, ?notice, "Unable to send failure notice");
        }

        RouterError::Ledger(chat_id, err)
    }
}

fn balance_updated(balance: Amount) -> String {
    format!("Balance updated. New balance {balance}")
}

/// Callback data is `"<chat_id> <amount>"`.
fn parse_reversal(data: &str) -> Option<(ChatId, &str)> {
    let (chat_id, amount) = data.split_once(' ')?;

    Some((chat_id.parse().ok()?, amount))
}
