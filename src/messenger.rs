use botapi::types::{AnswerCallbackQuery, SendMessage};
use thiserror::Error;

pub use self::telegram::{TelegramClient, TelegramClientError};

mod telegram;

#[derive(Debug, Error)]
pub enum MessengerError {
    #[error("HTTP error")]
    Http(#[from] ureq::Error),

    #[error("Bot API error")]
    Api(#[from] botapi::types::Error),
}

/// Outbound delivery to chats.
///
/// Exists as a trait so that unit tests can record outbound messages.
pub trait Messenger {
    fn send_message(&self, message: &SendMessage) -> Result<(), MessengerError>;

    fn answer_callback_query(&self, answer: &AnswerCallbackQuery) -> Result<(), MessengerError>;
}
