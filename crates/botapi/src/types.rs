//! Bot API wire types.
//!
//! Only the fields needed for text chats with inline keyboards are modeled. Unknown fields are
//! ignored when deserializing.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Update kinds requested by [`GetUpdates::new`].
const ALLOWED_UPDATES: [&str; 2] = ["message", "callback_query"];

#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum Error {
    #[error("Bot API error {code:?}: {description}")]
    Api {
        code: Option<i32>,
        description: String,
    },

    #[error("Bot API response is missing a result")]
    MissingResult,
}

/// The envelope around every Bot API response.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct ApiResponse<T> {
    pub ok: bool,
    pub result: Option<T>,
    pub description: Option<String>,
    pub error_code: Option<i32>,
}

impl<T> ApiResponse<T> {
    /// Unwrap the envelope, turning `ok: false` into an [`Error`].
    pub fn into_result(self) -> Result<T, Error> {
        if !self.ok {
            return Err(Error::Api {
                code: self.error_code,
                description: self.description.unwrap_or_default(),
            });
        }

        self.result.ok_or(Error::MissingResult)
    }
}

/// An incoming update. At most one of the optional fields is present.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct Update {
    pub update_id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<Message>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub callback_query: Option<CallbackQuery>,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct Message {
    pub message_id: i64,
    pub chat: Chat,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<User>,
    #[serde(default)]
    pub date: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reply_to_message: Option<Box<Message>>,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct Chat {
    pub id: i64,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct User {
    pub id: i64,
    #[serde(default)]
    pub is_bot: bool,
    #[serde(default)]
    pub first_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
}

/// Sent when a user presses an inline keyboard button.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct CallbackQuery {
    pub id: String,
    pub from: User,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<Message>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
}

/// Request body for `getUpdates`.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct GetUpdates {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offset: Option<i64>,
    /// Long polling timeout in seconds.
    pub timeout: u64,
    pub allowed_updates: Vec<String>,
}

impl GetUpdates {
    pub fn new(offset: Option<i64>, timeout: u64) -> Self {
        Self {
            offset,
            timeout,
            allowed_updates: ALLOWED_UPDATES.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// Request body for `sendMessage`.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct SendMessage {
    pub chat_id: i64,
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply_parameters: Option<ReplyParameters>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply_markup: Option<ReplyMarkup>,
}

impl SendMessage {
    pub fn new(chat_id: i64, text: impl Into<String>) -> Self {
        Self {
            chat_id,
            text: text.into(),
            reply_parameters: None,
            reply_markup: None,
        }
    }

    /// Quote `message_id` and ask the client to open a reply box for it.
    pub fn force_reply_to(mut self, message_id: i64) -> Self {
        self.reply_parameters = Some(ReplyParameters { message_id });
        self.reply_markup = Some(ReplyMarkup::ForceReply(ForceReply {
            force_reply: true,
            selective: true,
        }));
        self
    }

    pub fn reply_markup(mut self, markup: ReplyMarkup) -> Self {
        self.reply_markup = Some(markup);
        self
    }
}

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct ReplyParameters {
    pub message_id: i64,
}

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ReplyMarkup {
    ForceReply(ForceReply),
    InlineKeyboard(InlineKeyboardMarkup),
}

impl ReplyMarkup {
    /// A keyboard with a single button.
    pub fn inline(button: InlineKeyboardButton) -> Self {
        Self::InlineKeyboard(InlineKeyboardMarkup {
            inline_keyboard: vec![vec![button]],
        })
    }
}

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct ForceReply {
    pub force_reply: bool,
    pub selective: bool,
}

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct InlineKeyboardMarkup {
    pub inline_keyboard: Vec<Vec<InlineKeyboardButton>>,
}

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct InlineKeyboardButton {
    pub text: String,
    pub callback_data: String,
}

impl InlineKeyboardButton {
    pub fn callback(text: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            callback_data: data.into(),
        }
    }
}

/// Request body for `answerCallbackQuery`.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct AnswerCallbackQuery {
    pub callback_query_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

impl AnswerCallbackQuery {
    pub fn new(callback_query_id: impl Into<String>) -> Self {
        Self {
            callback_query_id: callback_query_id.into(),
            text: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_command() {
        let json = r#"{
            "update_id": 10000,
            "message": {
                "message_id": 1365,
                "date": 1441645532,
                "chat": { "id": 1111111, "type": "private", "first_name": "Test" },
                "from": { "id": 1111111, "is_bot": false, "first_name": "Test", "username": "test" },
                "text": "/add@BeanCountBot 12.30 lunch"
            }
        }"#;
        let update: Update = serde_json::from_str(json).unwrap();
        let message = update.message.unwrap();

        assert_eq!(update.update_id, 10000);
        assert!(update.callback_query.is_none());
        assert_eq!(message.chat.id, 1111111);
        assert_eq!(message.text.as_deref(), Some("/add@BeanCountBot 12.30 lunch"));
        assert!(message.reply_to_message.is_none());
        assert_eq!(message.from.unwrap().username.as_deref(), Some("test"));
    }

    #[test]
    fn test_deserialize_reply() {
        let json = r#"{
            "update_id": 10001,
            "message": {
                "message_id": 1367,
                "chat": { "id": -42 },
                "text": "4.5",
                "reply_to_message": {
                    "message_id": 1366,
                    "chat": { "id": -42 },
                    "text": "How much?"
                }
            }
        }"#;
        let update: Update = serde_json::from_str(json).unwrap();
        let message = update.message.unwrap();
        let reply_to = message.reply_to_message.unwrap();

        assert_eq!(message.chat.id, -42);
        assert_eq!(reply_to.message_id, 1366);
        assert_eq!(reply_to.text.as_deref(), Some("How much?"));
    }

    #[test]
    fn test_deserialize_callback_query() {
        let json = r#"{
            "update_id": 10002,
            "callback_query": {
                "id": "4382bfdwdsb323b2d9",
                "from": { "id": 1111111, "is_bot": false, "first_name": "Test", "username": "test" },
                "chat_instance": "-1234",
                "data": "-42 -10.50"
            }
        }"#;
        let update: Update = serde_json::from_str(json).unwrap();
        let query = update.callback_query.unwrap();

        assert!(update.message.is_none());
        assert_eq!(query.id, "4382bfdwdsb323b2d9");
        assert_eq!(query.data.as_deref(), Some("-42 -10.50"));
    }

    #[test]
    fn test_api_response() {
        let ok: ApiResponse<bool> = serde_json::from_str(r#"{"ok":true,"result":true}"#).unwrap();
        assert_eq!(ok.into_result(), Ok(true));

        let err: ApiResponse<bool> = serde_json::from_str(
            r#"{"ok":false,"error_code":401,"description":"Unauthorized"}"#,
        )
        .unwrap();
        assert_eq!(
            err.into_result(),
            Err(Error::Api {
                code: Some(401),
                description: "Unauthorized".to_string(),
            })
        );

        let empty: ApiResponse<bool> = serde_json::from_str(r#"{"ok":true}"#).unwrap();
        assert_eq!(empty.into_result(), Err(Error::MissingResult));
    }

    #[test]
    fn test_api_response_generic_result() {
        // Only `DeserializeOwned` is known about the result, as in a client's request helper.
        fn parse<T: serde::de::DeserializeOwned>(body: &str) -> Result<T, Error> {
            serde_json::from_str::<ApiResponse<T>>(body)
                .unwrap()
                .into_result()
        }

        let message: Message = parse(
            r#"{"ok":true,"result":{"message_id":7,"date":1700000000,"chat":{"id":42,"type":"private"}}}"#,
        )
        .unwrap();
        assert_eq!(message.message_id, 7);
        assert_eq!(message.chat.id, 42);

        assert_eq!(
            parse::<Message>(r#"{"ok":true}"#).unwrap_err(),
            Error::MissingResult
        );
    }
}
