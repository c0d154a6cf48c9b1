//! Per-user conversation context kept as one document per context key.

use {
    relay_common::params::{lookup, opt_str, require_str},
    relay_config::CloudantConfig,
    reqwest::StatusCode,
    secrecy::ExposeSecret,
    serde_json::{Map, Value, json},
    tracing::{debug, info},
};

use crate::error::{Error, Result};

/// A loaded context and the document revision it was read at.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredContext {
    pub rev: Option<String>,
    pub context: Value,
}

impl Default for StoredContext {
    fn default() -> Self {
        Self {
            rev: None,
            context: Value::Object(Map::new()),
        }
    }
}

/// Reads and writes context documents in one database.
pub struct ContextStore {
    http: reqwest::Client,
    base_url: String,
    database: String,
    username: String,
    password: secrecy::Secret<String>,
}

impl ContextStore {
    pub fn new(config: &CloudantConfig, database: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: config.url.trim_end_matches('/').to_string(),
            database: database.into(),
            username: config.username.clone(),
            password: config.password.clone(),
        }
    }

    #[must_use]
    pub fn database(&self) -> &str {
        &self.database
    }

    fn doc_url(&self, key: &str) -> String {
        format!(
            "{}/{}/{}",
            self.base_url,
            urlencoding::encode(&self.database),
            urlencoding::encode(key)
        )
    }

    fn authed(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        if self.username.is_empty() {
            request
        } else {
            request.basic_auth(&self.username, Some(self.password.expose_secret()))
        }
    }

    /// Context stored under `key`. A missing document is an empty context.
    pub async fn load(&self, key: &str) -> Result<StoredContext> {
        let resp = self.authed(self.http.get(self.doc_url(key))).send().await?;
        let status = resp.status();
        if status == StatusCode::NOT_FOUND {
            debug!(key, database = %self.database, "no stored context");
            return Ok(StoredContext::default());
        }
        let body = response_body(resp).await?;
        if !status.is_success() {
            return Err(Error::Service {
                service: "context store",
                status: status.as_u16(),
                body,
            });
        }
        Ok(StoredContext {
            rev: opt_str(&body, "_rev").map(str::to_string),
            context: body
                .get("context")
                .filter(|c| c.is_object())
                .cloned()
                .unwrap_or_else(|| Value::Object(Map::new())),
        })
    }

    /// Write `context` under `key`, replacing revision `rev`. Returns the new
    /// revision.
    pub async fn save(&self, key: &str, context: &Value, rev: Option<&str>) -> Result<String> {
        let mut doc = json!({"context": context});
        if let Some(rev) = rev {
            doc["_rev"] = json!(rev);
        }
        let resp = self
            .authed(self.http.put(self.doc_url(key)))
            .json(&doc)
            .send()
            .await?;
        let status = resp.status();
        let body = response_body(resp).await?;
        if !status.is_success() {
            return Err(Error::Service {
                service: "context store",
                status: status.as_u16(),
                body,
            });
        }
        let rev = opt_str(&body, "rev")
            .map(str::to_string)
            .ok_or_else(|| Error::Message {
                message: "context store response has no rev".into(),
            })?;
        info!(key, database = %self.database, %rev, "context saved");
        Ok(rev)
    }
}

/// Response body as JSON, or as a plain string when it is not JSON.
async fn response_body(resp: reqwest::Response) -> Result<Value> {
    let text = resp.text().await?;
    Ok(serde_json::from_str(&text).unwrap_or(Value::String(text)))
}

/// Load the context for `raw_input_data.cloudant_context_key` into
/// `conversation.context` and remember its revision in
/// `raw_input_data.cloudant_rev`.
pub async fn attach_context(store: &ContextStore, mut params: Value) -> Result<Value> {
    let key = require_str(&params, "raw_input_data.cloudant_context_key")?.to_string();
    let stored = store.load(&key).await?;

    let Some(fields) = params.as_object_mut() else {
        return Err(Error::validation("params must be an object"));
    };
    let conversation = fields
        .entry("conversation")
        .or_insert_with(|| Value::Object(Map::new()));
    if let Some(conversation) = conversation.as_object_mut() {
        conversation.insert("context".into(), stored.context);
    }
    if let (Some(rev), Some(raw)) = (
        stored.rev,
        fields.get_mut("raw_input_data").and_then(Value::as_object_mut),
    ) {
        raw.insert("cloudant_rev".into(), Value::String(rev));
    }
    Ok(params)
}

/// Persist `conversation.context` of a conversation response under its
/// context key and update `raw_input_data.cloudant_rev` to the new revision.
pub async fn persist_context(store: &ContextStore, mut params: Value) -> Result<Value> {
    let key = require_str(&params, "raw_input_data.cloudant_context_key")?.to_string();
    let context = lookup(&params, "conversation.context")
        .filter(|c| c.is_object())
        .cloned()
        .ok_or_else(|| Error::validation("conversation.context is required"))?;
    let rev = opt_str(&params, "raw_input_data.cloudant_rev").map(str::to_string);

    let new_rev = store.save(&key, &context, rev.as_deref()).await?;
    if let Some(raw) = params
        .get_mut("raw_input_data")
        .and_then(Value::as_object_mut)
    {
        raw.insert("cloudant_rev".into(), Value::String(new_rev));
    }
    Ok(params)
}
