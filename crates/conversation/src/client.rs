//! Message endpoint of the conversation service.

use {
    relay_common::params::{lookup, require},
    relay_config::ConversationConfig,
    secrecy::ExposeSecret,
    serde_json::{Map, Value, json},
    tracing::{debug, info, warn},
};

use crate::error::{Error, Result};

pub struct ConversationClient {
    http: reqwest::Client,
    config: ConversationConfig,
}

impl ConversationClient {
    pub fn new(config: ConversationConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
        }
    }

    fn url(&self, workspace_id: &str) -> String {
        format!(
            "{}/v1/workspaces/{}/message",
            self.config.url.trim_end_matches('/'),
            urlencoding::encode(workspace_id)
        )
    }

    /// Send `params.conversation.input` (with its optional context). The
    /// service response comes back as `conversation`, next to the
    /// `raw_input_data` carried through from `params`.
    pub async fn message(&self, params: &Value) -> Result<Value> {
        let input = require(params, "conversation.input")?;
        let context = lookup(params, "conversation.context")
            .filter(|c| c.is_object())
            .cloned()
            .unwrap_or_else(|| Value::Object(Map::new()));
        let workspace_id = lookup(params, "conversation.workspace_id")
            .and_then(Value::as_str)
            .unwrap_or(&self.config.workspace_id);
        if workspace_id.is_empty() {
            return Err(Error::validation("conversation.workspace_id is required"));
        }

        debug!(workspace_id, "calling conversation service");
        let resp = self
            .http
            .post(self.url(workspace_id))
            .query(&[("version", self.config.version.as_str())])
            .basic_auth(
                &self.config.username,
                Some(self.config.password.expose_secret()),
            )
            .json(&json!({"input": input, "context": context}))
            .send()
            .await?;

        let status = resp.status();
        let text = resp.text().await?;
        let body: Value = serde_json::from_str(&text).unwrap_or(Value::String(text));
        if !status.is_success() {
            warn!(%status, workspace_id, "conversation service rejected message");
            return Err(Error::Service {
                service: "conversation service",
                status: status.as_u16(),
                body,
            });
        }

        let response = match body {
            Value::Object(response) => response,
            body => {
                return Err(Error::Service {
                    service: "conversation service",
                    status: status.as_u16(),
                    body,
                });
            },
        };
        let outputs = response
            .get("output")
            .and_then(|o| o.get("text"))
            .and_then(Value::as_array)
            .map_or(0, Vec::len);
        info!(workspace_id, outputs, "conversation turn complete");

        let mut result = Map::new();
        result.insert("conversation".into(), Value::Object(response));
        if let Some(raw) = params.get("raw_input_data") {
            result.insert("raw_input_data".into(), raw.clone());
        }
        Ok(Value::Object(result))
    }
}
