//! Shape conversion between Messenger events and the conversation service.

use {
    relay_channels::{Error, Result},
    relay_common::{
        Params,
        params::{opt_str, require, require_str},
    },
    serde_json::{Value, json},
};

use crate::PROVIDER;

/// Messaging event → conversation request.
///
/// Quick-reply and postback payloads take precedence over the displayed text
/// so button presses reach the service as their configured input.
pub fn facebook_to_conversation(params: &Value, workspace_id: &str) -> Result<Value> {
    let facebook = require(params, "facebook")?;
    let sender = require_str(facebook, "sender.id")?;
    let page = require_str(facebook, "recipient.id")?;
    let text = opt_str(facebook, "message.quick_reply.payload")
        .or_else(|| opt_str(facebook, "postback.payload"))
        .or_else(|| opt_str(facebook, "message.text"))
        .ok_or_else(|| Error::invalid_input("message.text is required"))?;

    Ok(json!({
        "conversation": {"input": {"text": text}},
        "raw_input_data": {
            "facebook": facebook,
            "provider": PROVIDER,
            "cloudant_context_key": format!("facebook_{page}_{workspace_id}_{sender}"),
        },
    }))
}

/// Conversation response → Send API reply.
///
/// Precedence: a channel-specific `output.facebook` message (or list of
/// fragments), then rich `output.generic` responses, then plain `output.text`.
pub fn conversation_to_facebook(params: &Value) -> Result<Value> {
    let raw = require(params, "raw_input_data")?;
    let recipient = require_str(raw, "facebook.sender.id")?;
    let output = require(params, "conversation.output")?;

    let message = match output.get("facebook").filter(|v| !v.is_null()) {
        Some(custom @ (Value::Object(_) | Value::Array(_))) => custom.clone(),
        Some(_) => {
            return Err(Error::invalid_input(
                "output.facebook must be an object or array",
            ));
        },
        None => match generic_fragments(output) {
            Some(fragments) => Value::Array(fragments),
            None => json!({"text": output_text(output)?}),
        },
    };

    let mut reply = Params::new();
    reply.insert("recipient".into(), json!({"id": recipient}));
    reply.insert("message".into(), message);
    reply.insert("raw_input_data".into(), raw.clone());
    Ok(Value::Object(reply))
}

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
        "pause" => {
            let time = generic.get("time")?.clone();
            let typing = generic
                .get("typing")
                .and_then(Value::as_bool)
                .unwrap_or(false);
            if typing {
                Some(json!({"sender_action": "typing_on", "time": time}))
            } else {
                Some(json!({"time": time}))
            }
        },
        "image" => Some(json!({
            "attachment": {
                "type": "image",
                "payload": {"url": opt_str(generic, "source")?},
            }
        })),
        "option" => {
            let quick_replies: Vec<Value> = generic
                .get("options")?
                .as_array()?
                .iter()
                .filter_map(|option| {
                    let label = opt_str(option, "label")?;
                    let payload = opt_str(option, "value.input.text").unwrap_or(label);
                    Some(json!({
                        "content_type": "text",
                        "title": label,
                        "payload": payload,
                    }))
                })
                .collect();
            Some(json!({
                "text": opt_str(generic, "title").unwrap_or("Choose an option"),
                "quick_replies": quick_replies,
            }))
        },
        _ => None,
    }
}
