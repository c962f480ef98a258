//! A [Telegram Bot API] client, [sans I/O]. (Bring your own sync/async HTTP client!)
//!
//! This library handles the protocol-layer aspects of the Bot API, including ser-de and
//! request-response abstractions.
//!
//! [Telegram Bot API]: https://core.telegram.org/bots/api
//! [sans I/O]: https://sans-io.readthedocs.io/how-to-sans-io.html
//!
//! # Sync example with `ureq`
//!
//! ```no_run
//! use botapi::types::{ApiResponse, SendMessage, Message};
//! use botapi::BotApi;
//!
//! fn main() -> anyhow::Result<()> {
//!     let agent = ureq::agent();
//!     let api = BotApi::new("https://api.telegram.org/", "123456:secret-token")?;
//!
//!     let mut resp = agent.run(api.send_message(&SendMessage::new(42, "Hello!")))?;
//!
//!     let sent: ApiResponse<Message> = resp.body_mut().read_json()?;
//!
//!     println!("{:#?}", sent.into_result()?);
//!
//!     Ok(())
//! }
//! ```

#![forbid(unsafe_code)]

pub use http;

use crate::types::{AnswerCallbackQuery, GetUpdates, SendMessage};
use http::header::CONTENT_TYPE;
use http::{Request, Uri};
use serde::Serialize;

pub mod types;

const GET_UPDATES: &str = "getUpdates";
const SEND_MESSAGE: &str = "sendMessage";
const ANSWER_CALLBACK_QUERY: &str = "answerCallbackQuery";

pub type Req = Request<String>;

/// The main Bot API client.
///
/// Every method is sent as a JSON `POST` to `<api>/bot<token>/<method>`.
#[derive(Clone, Debug)]
pub struct BotApi {
    req: Req,
}

impl BotApi {
    /// Bot API client constructor.
    ///
    /// The API endpoint string must be a valid [`Uri`].
    ///
    /// # Example
    ///
    /// ```
    /// # use botapi::BotApi;
    /// # fn main() -> anyhow::Result<()> {
    /// let api = BotApi::new("https://api.telegram.org/", "123456:secret-token")?;
    /// # Ok(())
    /// # }
    /// ```
    ///
    /// # Panics
    ///
    /// This function asserts that the API server URL has both a scheme and host component. This
    /// disallows the use of relative URIs like `/hello/world` and non-network URIs like `data:` and
    /// `mailto:`.
    pub fn new<U>(api: U, token: &str) -> Result<Self, http::Error>
    where
        U: TryInto<Uri>,
        <U as TryInto<Uri>>::Error: Into<http::Error>,
    {
        let mut req = Request::post(api)
            .header(CONTENT_TYPE, "application/json")
            .body(String::new())?;
        assert!(req.uri().scheme().is_some());
        assert!(req.uri().host().is_some());
        append_path(&mut req, &format!("bot{token}"))?;

        Ok(Self { req })
    }

    /// Poll for incoming updates.
    ///
    /// Returns a [`Req`] which can be sent by your preferred HTTP client.
    ///
    /// The response can be deserialized from JSON into an `ApiResponse<Vec<Update>>`.
    ///
    /// [`ApiResponse<Vec<Update>>`]: crate::types::ApiResponse
    pub fn get_updates(&self, params: &GetUpdates) -> Req {
        self.method(GET_UPDATES, params)
    }

    /// Send a text message.
    ///
    /// Returns a [`Req`] which can be sent by your preferred HTTP client.
    ///
    /// The response can be deserialized from JSON into an `ApiResponse<Message>`.
    pub fn send_message(&self, message: &SendMessage) -> Req {
        self.method(SEND_MESSAGE, message)
    }

    /// Acknowledge a callback query so the client stops showing a progress indicator.
    ///
    /// Returns a [`Req`] which can be sent by your preferred HTTP client.
    ///
    /// The response can be deserialized from JSON into an `ApiResponse<bool>`.
    pub fn answer_callback_query(&self, answer: &AnswerCallbackQuery) -> Req {
        self.method(ANSWER_CALLBACK_QUERY, answer)
    }

    fn method<T: Serialize>(&self, method: &str, body: &T) -> Req {
        let mut req = self.req.clone();
        // The base path was already validated in the constructor, and method names are static.
        append_path(&mut req, method).unwrap();
        req.body_mut()
            .push_str(&serde_json::to_string(body).unwrap());

        req
    }
}

/// Append a path segment to the request.
fn append_path(req: &mut Req, segment: &str) -> Result<(), http::Error> {
    // The `http` crate has really bad ergonomics for updating paths.
    // SEE: https://github.com/hyperium/http/issues/594
    let req_uri = req.uri_mut();
    let mut uri_parts = req_uri.clone().into_parts();
    let root = req_uri.path().trim_end_matches('/');
    uri_parts.path_and_query = Some(format!("{root}/{segment}").parse()?);
    *req_uri = Uri::from_parts(uri_parts)?;

    Ok(())
}
