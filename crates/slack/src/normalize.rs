//! Shape conversion between Slack payloads and the conversation service.

use {
    relay_channels::{Error, Result},
    relay_common::{
        Params,
        params::{opt_str, require, require_str},
    },
    serde_json::{Value, json},
};

use crate::PROVIDER;

/// Inbound Slack message → conversation request.
///
/// The context key scopes stored conversation context to one user in one
/// channel of one team, per conversation workspace.
pub fn slack_to_conversation(params: &Value, workspace_id: &str) -> Result<Value> {
    let slack = require(params, "slack")?;
    let text = require_str(slack, "event.text")?;
    let team = require_str(slack, "team_id")?;
    let user = require_str(slack, "event.user")?;
    let channel = require_str(slack, "event.channel")?;

    Ok(json!({
        "conversation": {"input": {"text": text}},
        "raw_input_data": {
            "slack": slack,
            "provider": PROVIDER,
            "cloudant_context_key": format!("slack_{team}_{workspace_id}_{user}_{channel}"),
        },
    }))
}

/// Conversation response → Slack reply.
///
/// Precedence: a channel-specific `output.slack` payload, then rich
/// `output.generic` responses (as a fragment sequence), then plain
/// `output.text`.
pub fn conversation_to_slack(params: &Value) -> Result<Value> {
    let raw = require(params, "raw_input_data")?;
    let channel = require_str(raw, "slack.event.channel")?;
    let output = require(params, "conversation.output")?;

    let mut reply = Params::new();
    reply.insert("channel".into(), json!(channel));
    if let Some(thread_ts) = opt_str(raw, "slack.event.thread_ts") {
        reply.insert("thread_ts".into(), json!(thread_ts));
    }

    match output.get("slack").filter(|v| !v.is_null()) {
        Some(Value::Array(messages)) => {
            reply.insert("message".into(), Value::Array(messages.clone()));
        },
        Some(Value::Object(custom)) => {
            for (key, value) in custom {
                reply.insert(key.clone(), value.clone());
            }
        },
        Some(_) => return Err(Error::invalid_input("output.slack must be an object or array")),
        None => match generic_fragments(output) {
            Some(fragments) => {
                reply.insert("message".into(), Value::Array(fragments));
            },
            None => {
                reply.insert("text".into(), json!(output_text(output)?));
            },
        },
    }

    reply.insert("raw_input_data".into(), raw.clone());
    Ok(Value::Object(reply))
}

/// Joined `output.text`, which the service sends as a string or list.
fn output_text(output: &Value) -> Result<String> {
    let text = match output.get("text") {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Array(lines)) => lines
            .iter()
            .filter_map(Value::as_str)
            .filter(|l| !l.is_empty())
            .collect::<Vec<_>>()
            .join("\n"),
        _ => String::new(),
    };
    if text.is_empty() {
        return Err(Error::invalid_input("conversation.output.text is required"));
    }
    Ok(text)
}

/// Fragment sequence for rich responses. `None` when the generic list is
/// absent or is a single text entry, which plain text covers.
fn generic_fragments(output: &Value) -> Option<Vec<Value>> {
    let generic = output.get("generic")?.as_array()?;
    let only_text = generic.len() <= 1
        && generic
            .iter()
            .all(|g| opt_str(g, "response_type") == Some("text"));
    if generic.is_empty() || only_text {
        return None;
    }
    Some(generic.iter().filter_map(generic_to_fragment).collect())
}

fn generic_to_fragment(generic: &Value) -> Option<Value> {
    match opt_str(generic, "response_type")? {
        "text" => Some(json!({"text": opt_str(generic, "text")?})),
        "pause" => Some(json!({"time": generic.get("time")?.clone()})),
        "image" => {
            let mut attachment = json!({"image_url": opt_str(generic, "source")?});
            if let Some(title) = opt_str(generic, "title") {
                attachment["title"] = json!(title);
            }
            Some(json!({"attachments": [attachment]}))
        },
        "option" => {
            let buttons: Vec<Value> = generic
                .get("options")?
                .as_array()?
                .iter()
                .filter_map(|option| {
                    let label = opt_str(option, "label")?;
                    let value = opt_str(option, "value.input.text").unwrap_or(label);
                    Some(json!({
                        "name": "option",
                        "text": label,
                        "type": "button",
                        "value": value,
                    }))
                })
                .collect();
            Some(json!({
                "attachments": [{
                    "text": opt_str(generic, "title").unwrap_or_default(),
                    "callback_id": "options",
                    "actions": buttons,
                }]
            }))
        },
        _ => None,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn inbound() -> Value {
        json!({
            "slack": {
                "team_id": "T1",
                "event": {"type": "message", "channel": "C1", "user": "U1", "text": "hi", "ts": "1.0"},
            },
            "provider": "slack",
        })
    }

    fn response(output: Value) -> Value {
        let normalized = slack_to_conversation(&inbound(), "ws-1").unwrap();
        json!({
            "conversation": {"output": output, "context": {"conversation_id": "c-1"}},
            "raw_input_data": normalized["raw_input_data"],
        })
    }

    #[test]
    fn inbound_becomes_conversation_input() {
        let out = slack_to_conversation(&inbound(), "ws-1").unwrap();
        assert_eq!(out["conversation"]["input"]["text"], "hi");
        assert_eq!(out["raw_input_data"]["provider"], "slack");
        assert_eq!(
            out["raw_input_data"]["cloudant_context_key"],
            "slack_T1_ws-1_U1_C1"
        );
        assert_eq!(out["raw_input_data"]["slack"]["event"]["ts"], "1.0");
    }

    #[test]
    fn inbound_requires_text() {
        let err = slack_to_conversation(&json!({"slack": {"team_id": "T1", "event": {}}}), "w")
            .unwrap_err();
        assert_eq!(err.to_string(), "event.text is required");
        assert!(slack_to_conversation(&json!({}), "w").is_err());
    }

    #[test]
    fn plain_text_reply_joins_lines() {
        let out = conversation_to_slack(&response(json!({"text": ["Hello", "", "there"]}))).unwrap();
        assert_eq!(out["channel"], "C1");
        assert_eq!(out["text"], "Hello\nthere");
        assert!(out.get("message").is_none());
        assert_eq!(out["raw_input_data"]["provider"], "slack");
    }

    #[test]
    fn empty_text_is_invalid() {
        assert!(conversation_to_slack(&response(json!({"text": []}))).is_err());
    }

    #[test]
    fn custom_slack_output_is_used_verbatim() {
        let out = conversation_to_slack(&response(json!({
            "text": ["ignored"],
            "slack": {"attachments": [{"text": "card"}]},
        })))
        .unwrap();
        assert_eq!(out["attachments"][0]["text"], "card");
        assert!(out.get("text").is_none());
    }

    #[test]
    fn custom_slack_array_becomes_message_sequence() {
        let out = conversation_to_slack(&response(json!({
            "slack": [{"text": "a"}, {"time": 100}, {"text": "b"}],
        })))
        .unwrap();
        assert_eq!(out["message"].as_array().unwrap().len(), 3);
    }

    #[test]
    fn generic_responses_become_fragments() {
        let out = conversation_to_slack(&response(json!({
            "text": ["one", "two"],
            "generic": [
                {"response_type": "text", "text": "one"},
                {"response_type": "pause", "time": 500, "typing": true},
                {"response_type": "image", "source": "https://img/x.png", "title": "X"},
                {"response_type": "option", "title": "Pick", "options": [
                    {"label": "Small", "value": {"input": {"text": "small"}}},
                    {"label": "Large"},
                ]},
            ],
        })))
        .unwrap();
        let message = out["message"].as_array().unwrap();
        assert_eq!(message.len(), 4);
        assert_eq!(message[0], json!({"text": "one"}));
        assert_eq!(message[1], json!({"time": 500}));
        assert_eq!(message[2]["attachments"][0]["image_url"], "https://img/x.png");
        let actions = message[3]["attachments"][0]["actions"].as_array().unwrap();
        assert_eq!(actions[0]["value"], "small");
        assert_eq!(actions[1]["value"], "Large");
    }

    #[test]
    fn single_generic_text_stays_plain() {
        let out = conversation_to_slack(&response(json!({
            "text": ["only"],
            "generic": [{"response_type": "text", "text": "only"}],
        })))
        .unwrap();
        assert_eq!(out["text"], "only");
    }

    #[test]
    fn thread_replies_keep_thread_ts() {
        let mut params = response(json!({"text": "hi"}));
        params["raw_input_data"]["slack"]["event"]["thread_ts"] = json!("0.5");
        let out = conversation_to_slack(&params).unwrap();
        assert_eq!(out["thread_ts"], "0.5");
    }
}
