use reqwest::{Client, RequestBuilder, StatusCode};
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum SendError {
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("message rejected ({status}, code {code:?}): {message}")]
    Rejected {
        status: StatusCode,
        code: Option<i64>,
        message: String,
    },
}

/// Twilio Messages API client. Works for SMS and `whatsapp:` addresses.
#[derive(Clone)]
pub struct TwilioClient {
    client: Client,
    base_api: String,
    account_sid: String,
    auth_token: String,
}

impl TwilioClient {
    pub fn new(
        base_api: impl Into<String>,
        account_sid: impl Into<String>,
        auth_token: impl Into<String>,
    ) -> Result<Self, SendError> {
        let client = reqwest::Client::builder().build()?;

        Ok(Self {
            client,
            base_api: base_api.into(),
            account_sid: account_sid.into(),
            auth_token: auth_token.into(),
        })
    }

    /// Send one message and return its sid.
    pub async fn send_message(
        &self,
        from: &str,
        to: &str,
        body: &str,
    ) -> Result<String, SendError> {
        debug!(to, "posting message");

        let res = self.message_request(from, to, body).send().await?;

        let status = res.status();
        let text = res.text().await?;

        parse_send_response(status, &text)
    }

    fn message_request(&self, from: &str, to: &str, body: &str) -> RequestBuilder {
        let url = format!(
            "{}/2010-04-01/Accounts/{}/Messages.json",
            self.base_api.trim_end_matches('/'),
            self.account_sid
        );

        self.client
            .post(url)
            .basic_auth(&self.account_sid, Some(&self.auth_token))
            .form(&[("From", from), ("To", to), ("Body", body)])
    }
}

//
// Match Twilio JSON
// https://www.twilio.com/docs/messaging/api/message-resource#create-a-message-resource
//
#[derive(Debug, Deserialize)]
struct MessageResource {
    sid: String,
}

#[derive(Debug, Deserialize)]
struct TwilioErrorBody {
    code: Option<i64>,
    message: Option<String>,
}

fn parse_send_response(status: StatusCode, body: &str) -> Result<String, SendError> {
    if status.is_success() {
        return match serde_json::from_str::<MessageResource>(body) {
            Ok(msg) => Ok(msg.sid),
            Err(e) => Err(SendError::Rejected {
                status,
                code: None,
                message: format!("unreadable response: {e}"),
            }),
        };
    }

    let (code, message) = match serde_json::from_str::<TwilioErrorBody>(body) {
        Ok(err) => (err.code, err.message.unwrap_or_else(|| body.to_string())),
        Err(_) => (None, body.to_string()),
    };

    Err(SendError::Rejected {
        status,
        code,
        message,
    })
}
