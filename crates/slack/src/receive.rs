//! Inbound Slack callbacks: URL verification, message events, and
//! interactive button payloads.

use {
    relay_channels::{Error, Result},
    relay_common::params::{lookup, opt_str, require_str},
    secrecy::ExposeSecret,
    serde_json::{Value, json},
    tracing::{debug, info},
};

use crate::{PROVIDER, config::SlackAccountConfig};

/// What a callback turned into.
#[derive(Debug, Clone, PartialEq)]
pub enum Receipt {
    /// Answer to Slack's endpoint verification handshake.
    Challenge(String),
    /// Nothing to relay (bot echo, edit, unsupported event).
    Ignored(String),
    /// A user message, as `{ slack: {team_id, event, ...}, provider }`.
    Inbound(Value),
}

impl Receipt {
    /// Action output for this receipt.
    #[must_use]
    pub fn into_value(self) -> Value {
        match self {
            Self::Challenge(challenge) => json!({"code": 200, "challenge": challenge}),
            Self::Ignored(reason) => json!({"code": 200, "message": format!("ignored: {reason}")}),
            Self::Inbound(inbound) => inbound,
        }
    }
}

/// Classify an Events API callback or interactive payload.
pub fn receive(params: &Value, config: &SlackAccountConfig) -> Result<Receipt> {
    if let Some(raw) = params.get("payload").and_then(Value::as_str) {
        let payload: Value = serde_json::from_str(raw)?;
        verify_token(&payload, config)?;
        return interactive(&payload);
    }

    verify_token(params, config)?;

    match opt_str(params, "type") {
        Some("url_verification") => {
            let challenge = require_str(params, "challenge")?;
            info!("answering slack url verification");
            Ok(Receipt::Challenge(challenge.to_string()))
        },
        Some("event_callback") => event_callback(params, config),
        other => Ok(Receipt::Ignored(format!(
            "unsupported callback type {}",
            other.unwrap_or("<none>")
        ))),
    }
}

fn verify_token(body: &Value, config: &SlackAccountConfig) -> Result<()> {
    let Some(expected) = config
        .verification_token
        .as_ref()
        .map(ExposeSecret::expose_secret)
        .filter(|t| !t.is_empty())
    else {
        return Ok(());
    };
    if opt_str(body, "token") == Some(expected.as_str()) {
        Ok(())
    } else {
        Err(Error::unauthorized("slack verification token mismatch"))
    }
}

fn event_callback(params: &Value, config: &SlackAccountConfig) -> Result<Receipt> {
    let event = params
        .get("event")
        .ok_or_else(|| Error::invalid_input("event is required"))?;

    let event_type = opt_str(event, "type").unwrap_or_default();
    if event_type != "message" {
        return Ok(Receipt::Ignored(format!("event type {event_type:?}")));
    }
    if event.get("bot_id").is_some_and(|b| !b.is_null()) {
        return Ok(Receipt::Ignored("bot message".into()));
    }
    if let Some(subtype) = opt_str(event, "subtype") {
        return Ok(Receipt::Ignored(format!("message subtype {subtype}")));
    }
    let user = require_str(event, "user")?;
    if config.bot_user_id.as_deref() == Some(user) {
        return Ok(Receipt::Ignored("own message".into()));
    }
    require_str(event, "channel")?;
    require_str(event, "text")?;
    require_str(params, "team_id")?;

    let mut slack = params.clone();
    if let Some(obj) = slack.as_object_mut() {
        obj.remove("token");
    }
    debug!(user, "slack message event");
    Ok(Receipt::Inbound(json!({"slack": slack, "provider": PROVIDER})))
}

fn interactive(payload: &Value) -> Result<Receipt> {
    let text = opt_str(payload, "actions.0.value")
        .or_else(|| opt_str(payload, "actions.0.selected_options.0.value"))
        .ok_or_else(|| Error::invalid_input("actions.0.value is required"))?;
    let team_id = require_str(payload, "team.id")?;
    let channel = require_str(payload, "channel.id")?;
    let user = require_str(payload, "user.id")?;

    let mut slack = json!({
        "team_id": team_id,
        "event": {
            "type": "message",
            "channel": channel,
            "user": user,
            "text": text,
        },
    });
    if let Some(ts) = opt_str(payload, "message_ts") {
        slack["event"]["ts"] = json!(ts);
    }
    for key in ["callback_id", "response_url"] {
        if let Some(value) = lookup(payload, key) {
            slack[key] = value.clone();
        }
    }
    debug!(user, "slack interactive callback");
    Ok(Receipt::Inbound(json!({"slack": slack, "provider": PROVIDER})))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use {super::*, rstest::rstest, secrecy::Secret};

    fn config() -> SlackAccountConfig {
        SlackAccountConfig {
            verification_token: Some(Secret::new("vtoken".into())),
            bot_user_id: Some("UBOT".into()),
            ..SlackAccountConfig::default()
        }
    }

    fn message_event(event: Value) -> Value {
        json!({
            "token": "vtoken",
            "team_id": "T1",
            "api_app_id": "A1",
            "type": "event_callback",
            "event": event,
        })
    }

    #[test]
    fn answers_url_verification() {
        let params = json!({"token": "vtoken", "type": "url_verification", "challenge": "abc"});
        let receipt = receive(&params, &config()).unwrap();
        assert_eq!(receipt, Receipt::Challenge("abc".into()));
        assert_eq!(
            receipt.into_value(),
            json!({"code": 200, "challenge": "abc"})
        );
    }

    #[test]
    fn rejects_wrong_verification_token() {
        let params = json!({"token": "nope", "type": "url_verification", "challenge": "abc"});
        let err = receive(&params, &config()).unwrap_err();
        assert!(matches!(err, Error::Unauthorized { .. }));
    }

    #[test]
    fn skips_token_check_when_unconfigured() {
        let params = json!({"type": "url_verification", "challenge": "abc"});
        assert!(receive(&params, &SlackAccountConfig::default()).is_ok());
    }

    #[test]
    fn relays_user_message() {
        let params = message_event(json!({
            "type": "message",
            "channel": "D1",
            "user": "U1",
            "text": "hello",
            "ts": "1.2",
        }));
        let Receipt::Inbound(inbound) = receive(&params, &config()).unwrap() else {
            panic!("expected inbound");
        };
        assert_eq!(inbound["provider"], "slack");
        assert_eq!(inbound["slack"]["team_id"], "T1");
        assert_eq!(inbound["slack"]["event"]["text"], "hello");
        assert!(inbound["slack"].get("token").is_none());
    }

    #[rstest]
    #[case(json!({"type": "message", "channel": "C1", "bot_id": "B1", "text": "x"}))]
    #[case(json!({"type": "message", "channel": "C1", "subtype": "message_changed"}))]
    #[case(json!({"type": "message", "channel": "C1", "user": "UBOT", "text": "x"}))]
    #[case(json!({"type": "reaction_added", "user": "U1"}))]
    fn ignores_non_user_messages(#[case] event: Value) {
        let receipt = receive(&message_event(event), &config()).unwrap();
        assert!(matches!(receipt, Receipt::Ignored(_)));
    }

    #[test]
    fn message_without_text_is_invalid() {
        let params = message_event(json!({"type": "message", "channel": "C1", "user": "U1"}));
        let err = receive(&params, &config()).unwrap_err();
        assert_eq!(err.to_string(), "text is required");
    }

    #[test]
    fn relays_button_click() {
        let payload = json!({
            "token": "vtoken",
            "callback_id": "options",
            "team": {"id": "T1"},
            "channel": {"id": "C1"},
            "user": {"id": "U1"},
            "message_ts": "9.9",
            "actions": [{"name": "option", "type": "button", "value": "large pizza"}],
        });
        let params = json!({"payload": payload.to_string()});
        let Receipt::Inbound(inbound) = receive(&params, &config()).unwrap() else {
            panic!("expected inbound");
        };
        assert_eq!(inbound["slack"]["event"]["text"], "large pizza");
        assert_eq!(inbound["slack"]["event"]["channel"], "C1");
        assert_eq!(inbound["slack"]["event"]["ts"], "9.9");
        assert_eq!(inbound["slack"]["callback_id"], "options");
    }

    #[test]
    fn button_click_checks_token_inside_payload() {
        let payload = json!({"token": "bad", "actions": [{"value": "x"}]});
        let params = json!({"payload": payload.to_string()});
        assert!(receive(&params, &config()).is_err());
    }
}
