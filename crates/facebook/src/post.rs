//! Single-message delivery through the Messenger Send API.

use {
    async_trait::async_trait,
    relay_channels::{Error, PostAdapter, PostFailure, PostSuccess, Result},
    relay_common::{
        Params,
        params::{opt_str, require_str},
    },
    secrecy::ExposeSecret,
    serde_json::{Value, json},
    tracing::{debug, warn},
};

use crate::config::FacebookAccountConfig;

/// Sender actions the Send API accepts.
const SENDER_ACTIONS: &[&str] = &["typing_on", "typing_off", "mark_seen"];

/// Posts one message or sender action per call.
pub struct FacebookPoster {
    http: reqwest::Client,
    config: FacebookAccountConfig,
}

impl FacebookPoster {
    pub fn new(config: FacebookAccountConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
        }
    }

    /// Validate params and build the Send API body: a recipient plus either
    /// a `sender_action` or a `message`.
    pub fn build_request(params: &Params) -> Result<Value> {
        let value = Value::Object(params.clone());
        let recipient = require_str(&value, "recipient.id")?;

        let mut body = json!({
            "recipient": {"id": recipient},
            "messaging_type": opt_str(&value, "messaging_type").unwrap_or("RESPONSE"),
        });

        if let Some(action) = opt_str(&value, "sender_action") {
            if !SENDER_ACTIONS.contains(&action) {
                return Err(Error::invalid_input(format!(
                    "unsupported sender_action {action:?}"
                )));
            }
            body["sender_action"] = json!(action);
            return Ok(body);
        }

        let message = params
            .get("message")
            .filter(|m| m.is_object())
            .ok_or_else(|| Error::invalid_input("message or sender_action is required"))?;
        if message.get("text").is_none() && message.get("attachment").is_none() {
            return Err(Error::invalid_input("message.text or message.attachment is required"));
        }
        body["message"] = message.clone();
        Ok(body)
    }

    /// Per-call token override (`page_access_token`), else the configured one.
    fn token<'a>(&'a self, params: &'a Params) -> Result<&'a str> {
        let token = params
            .get("page_access_token")
            .and_then(Value::as_str)
            .unwrap_or_else(|| self.config.page_access_token.expose_secret().as_str());
        if token.is_empty() {
            return Err(Error::unavailable("facebook page access token is not configured"));
        }
        Ok(token)
    }

    async fn deliver(
        &self,
        body: Value,
        token: &str,
    ) -> std::result::Result<PostSuccess, PostFailure> {
        let url = format!("{}/me/messages", self.config.graph_url.trim_end_matches('/'));
        let resp = self
            .http
            .post(url)
            .query(&[("access_token", token)])
            .json(&body)
            .send()
            .await
            .map_err(PostFailure::message)?;

        let status = resp.status();
        let text = resp.text().await.map_err(PostFailure::message)?;
        let response: Value = serde_json::from_str(&text).unwrap_or(Value::String(text));

        if !status.is_success() || response.get("error").is_some() {
            warn!(%status, "facebook send api returned an error");
            let error = response
                .get("error")
                .cloned()
                .unwrap_or_else(|| json!({"status": status.as_u16(), "body": response}));
            return Err(PostFailure::new(error));
        }

        debug!(message_id = opt_str(&response, "message_id"), "facebook message sent");
        Ok(PostSuccess {
            result: response,
            invocation_id: uuid::Uuid::new_v4().to_string(),
        })
    }
}

#[async_trait]
impl PostAdapter for FacebookPoster {
    async fn post(&self, params: Params) -> std::result::Result<PostSuccess, PostFailure> {
        let body = Self::build_request(&params).map_err(PostFailure::message)?;
        let token = self.token(&params).map_err(PostFailure::message)?;
        self.deliver(body, token).await
    }
}
