//! Out-of-context broadcast client
//!
//! A channel invoked from a task with no bound session still has to fan
//! out, and it has to do so through the same path a cross-process caller
//! uses: a POST to the application's own broadcast ingress. That keeps
//! fan-out semantics identical no matter where a channel call originates.
//!
//! The call completes when the POST returns; failures surface as
//! [`LoopbackError`].
//!
//! [`LoopbackError`]: crate::core::error::LoopbackError

use crate::config::SocketConfig;
use crate::core::error::{LoopbackError, SocketError};
use crate::server::exposure::ingress::BROADCAST_PATH;
use serde_json::{Value, json};

/// Posts channel invocations back to this application's ingress
pub struct LoopbackBroadcaster {
    client: reqwest::Client,
    url: String,
}

impl LoopbackBroadcaster {
    pub(crate) fn new(config: &SocketConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: format!("http://{}:{}{}", config.host, config.port, BROADCAST_PATH),
        }
    }

    /// The ingress URL this client posts to
    pub fn url(&self) -> &str {
        &self.url
    }

    /// POST `{channel, data}` to the ingress and await the response
    pub async fn post(&self, channel: &str, data: &Value) -> Result<(), SocketError> {
        let response = self
            .client
            .post(&self.url)
            .json(&json!({"channel": channel, "data": data}))
            .send()
            .await
            .map_err(|e| {
                SocketError::from(LoopbackError::Request {
                    url: self.url.clone(),
                    message: e.to_string(),
                })
            })?;

        if !response.status().is_success() {
            return Err(LoopbackError::Status {
                url: self.url.clone(),
                status: response.status().as_u16(),
            }
            .into());
        }
        Ok(())
    }
}
