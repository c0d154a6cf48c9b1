//! Messenger webhook handling.

use {
    hmac::{Hmac, Mac},
    relay_channels::{Error, Result},
    relay_common::params::opt_str,
    secrecy::ExposeSecret,
    serde_json::{Value, json},
    sha2::Sha256,
    tracing::{debug, info, warn},
};

use crate::{PROVIDER, config::FacebookAccountConfig};

type HmacSha256 = Hmac<Sha256>;

/// What a webhook call turned into.
#[derive(Debug, Clone, PartialEq)]
pub enum Receipt {
    /// Answer to the subscription handshake.
    Challenge(String),
    /// Nothing to relay (echoes, receipts, other page objects).
    Ignored(String),
    /// One `{ facebook: <messaging event>, provider }` per user message, in
    /// the order Facebook batched them.
    Inbound(Vec<Value>),
}

impl Receipt {
    /// Action output. A batch of one is returned unwrapped.
    #[must_use]
    pub fn into_value(self) -> Value {
        match self {
            Self::Challenge(challenge) => json!({"code": 200, "challenge": challenge}),
            Self::Ignored(reason) => json!({"code": 200, "message": format!("ignored: {reason}")}),
            Self::Inbound(mut messages) if messages.len() == 1 => messages.remove(0),
            Self::Inbound(messages) => json!({"batched_messages": messages}),
        }
    }
}

/// Verify the webhook signature from Facebook.
///
/// The signature is sent in the `X-Hub-Signature-256` header as `sha256=<hex>`.
pub fn verify_signature(body: &[u8], signature_header: &str, app_secret: &str) -> bool {
    let Some(expected) = signature_header.strip_prefix("sha256=") else {
        warn!("invalid signature header format (missing sha256= prefix)");
        return false;
    };
    let Ok(mut mac) = HmacSha256::new_from_slice(app_secret.as_bytes()) else {
        warn!("failed to create HMAC");
        return false;
    };
    mac.update(body);
    let computed = hex::encode(mac.finalize().into_bytes());
    constant_time_eq(&computed, expected)
}

/// Constant-time string comparison.
fn constant_time_eq(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.bytes()
        .zip(b.bytes())
        .fold(0, |acc, (x, y)| acc | (x ^ y))
        == 0
}

/// Classify a webhook call. `body` is the raw request body; `signature` the
/// `X-Hub-Signature-256` header value, if any.
pub fn receive(
    body: &[u8],
    signature: Option<&str>,
    config: &FacebookAccountConfig,
) -> Result<Receipt> {
    let params: Value = serde_json::from_slice(body)?;

    if params.get("hub.mode").is_some() {
        return subscription(&params, config);
    }

    if let Some(secret) = config
        .app_secret
        .as_ref()
        .map(ExposeSecret::expose_secret)
        .filter(|s| !s.is_empty())
    {
        let header = signature
            .ok_or_else(|| Error::unauthorized("missing X-Hub-Signature-256 header"))?;
        if !verify_signature(body, header, secret) {
            return Err(Error::unauthorized("facebook signature mismatch"));
        }
    }

    page_events(&params)
}

fn subscription(params: &Value, config: &FacebookAccountConfig) -> Result<Receipt> {
    let mode = params.get("hub.mode").and_then(Value::as_str);
    if mode != Some("subscribe") {
        return Err(Error::invalid_input("hub.mode must be subscribe"));
    }
    let token = params.get("hub.verify_token").and_then(Value::as_str);
    let expected = config
        .verification_token
        .as_ref()
        .map(|t| t.expose_secret().as_str());
    if expected.is_none() || token != expected {
        return Err(Error::unauthorized("facebook verify token mismatch"));
    }
    let challenge = params
        .get("hub.challenge")
        .and_then(|c| c.as_str().map(str::to_string).or_else(|| c.as_u64().map(|n| n.to_string())))
        .ok_or_else(|| Error::invalid_input("hub.challenge is required"))?;
    info!("answering facebook subscription handshake");
    Ok(Receipt::Challenge(challenge))
}

fn page_events(params: &Value) -> Result<Receipt> {
    match opt_str(params, "object") {
        Some("page") => {},
        other => {
            return Ok(Receipt::Ignored(format!(
                "webhook object {}",
                other.unwrap_or("<none>")
            )));
        },
    }

    let entries = params
        .get("entry")
        .and_then(Value::as_array)
        .ok_or_else(|| Error::invalid_input("entry is required"))?;

    let mut inbound = Vec::new();
    for entry in entries {
        let events = entry
            .get("messaging")
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or_default();
        for event in events {
            if !is_user_message(event) {
                continue;
            }
            inbound.push(json!({"facebook": event, "provider": PROVIDER}));
        }
    }

    if inbound.is_empty() {
        return Ok(Receipt::Ignored("no user messages".into()));
    }
    debug!(count = inbound.len(), "facebook messaging events");
    Ok(Receipt::Inbound(inbound))
}

/// A text message, quick reply or postback from a user; not an echo or receipt.
fn is_user_message(event: &Value) -> bool {
    if opt_str(event, "sender.id").is_none() {
        return false;
    }
    if let Some(message) = event.get("message") {
        let echo = message
            .get("is_echo")
            .and_then(Value::as_bool)
            .unwrap_or(false);
        return !echo
            && (opt_str(message, "text").is_some()
                || opt_str(message, "quick_reply.payload").is_some());
    }
    opt_str(event, "postback.payload").is_some()
}
