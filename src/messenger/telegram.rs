use super::{Messenger, MessengerError};
use botapi::types::{AnswerCallbackQuery, ApiResponse, GetUpdates, Message, SendMessage, Update};
use botapi::{BotApi, Req};
use serde::de::DeserializeOwned;
use std::time::Duration;
use thiserror::Error;
use tracing::trace;
use ureq::tls::{TlsConfig, TlsProvider};
use ureq::Agent;

/// Added to the long polling timeout for the whole request.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Debug, Error)]
pub enum TelegramClientError {
    #[error("Invalid Bot API URI")]
    BotApiUri(#[from] botapi::http::Error),
}

/// A blocking Bot API client.
///
/// Request URIs carry the bot token, so they are never logged.
pub struct TelegramClient {
    agent: Agent,
    api: BotApi,
}

impl TelegramClient {
    /// Create a client for the Bot API server at `api_server`.
    ///
    /// `poll_timeout` is the longest `getUpdates` call this client will make, and `connections` is
    /// the number of idle connections kept for concurrent handlers.
    pub fn new(
        api_server: &str,
        token: &str,
        poll_timeout: Duration,
        connections: usize,
    ) -> Result<Self, TelegramClientError> {
        let agent = Agent::from(
            Agent::config_builder()
                .max_idle_connections_per_host(connections)
                .timeout_global(Some(poll_timeout + REQUEST_TIMEOUT))
                // Error responses still carry a JSON body with a description.
                .http_status_as_error(false)
                .tls_config(
                    TlsConfig::builder()
                        .provider(TlsProvider::NativeTls)
                        .build(),
                )
                .build(),
        );
        let api = BotApi::new(api_server, token)?;

        Ok(Self { agent, api })
    }

    /// Long poll for updates after `offset`, waiting up to `timeout` seconds.
    pub fn get_updates(
        &self,
        offset: Option<i64>,
        timeout: u64,
    ) -> Result<Vec<Update>, MessengerError> {
        let req = self.api.get_updates(&GetUpdates::new(offset, timeout));
        let updates: Vec<Update> = self.call(req)?;
        trace!(count = updates.len(), "Received updates");

        Ok(updates)
    }

    fn call<T: DeserializeOwned>(&self, req: Req) -> Result<T, MessengerError> {
        let mut resp = self.agent.run(req)?;
        let resp: ApiResponse<T> = resp.body_mut().read_json()?;

        Ok(resp.into_result()?)
    }
}

impl Messenger for TelegramClient {
    fn send_message(&self, message: &SendMessage) -> Result<(), MessengerError> {
        let sent: Message = self.call(self.api.send_message(message))?;
        trace!(chat_id = sent.chat.id, message_id = sent.message_id, "Sent message");

        Ok(())
    }

    fn answer_callback_query(&self, answer: &AnswerCallbackQuery) -> Result<(), MessengerError> {
        let _: bool = self.call(self.api.answer_callback_query(answer))?;

        Ok(())
    }
}
