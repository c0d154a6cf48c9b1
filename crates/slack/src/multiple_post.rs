//! Ordered delivery of multi-part Slack replies.

use {
    relay_channels::{
        DeliveryError, DispatchLog, Dispatcher, Fragment, FragmentShaper, PostFailure,
        PostSuccess, ReplyPayload, Step, dispatch::merge_fields,
    },
    relay_common::Params,
    serde::{Deserialize, Serialize},
    serde_json::Value,
};

/// Message content keys that belong to a fragment, never to the reply envelope.
const CONTENT_FIELDS: &[&str] = &["text", "attachments", "blocks"];

/// Slack fragments: a bare `time` is a pause; anything else is a message
/// posted with the reply's routing fields, then followed by its `time`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SlackShaper;

impl FragmentShaper for SlackShaper {
    fn channel(&self) -> &'static str {
        crate::PROVIDER
    }

    fn shape(&self, metadata: &Params, fragment: Fragment) -> Step {
        let delay = fragment.delay();
        if fragment.is_pause()
            && let Some(delay) = delay
        {
            return Step::Sleep(delay);
        }

        let mut base = metadata.clone();
        for key in CONTENT_FIELDS {
            base.remove(*key);
        }
        let params = match fragment.as_object() {
            Some(fields) => {
                let mut fields = fields.clone();
                fields.remove("time");
                merge_fields(&base, &fields)
            },
            None => {
                base.insert("fragment".into(), fragment.into_value());
                base
            },
        };
        Step::Post { params, delay }
    }
}

/// Outcome of a Slack multi-post: successes and the failure, each in
/// attempt order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlackDispatchResult {
    pub successful_posts: Vec<PostSuccess>,
    pub failed_posts: Vec<PostFailure>,
}

impl From<DispatchLog> for SlackDispatchResult {
    fn from(log: DispatchLog) -> Self {
        Self {
            successful_posts: log.successes().cloned().collect(),
            failed_posts: log.failures().cloned().collect(),
        }
    }
}

/// Deliver every fragment of `params.message`; reject if any post failed.
pub async fn multiple_post(
    dispatcher: &Dispatcher<SlackShaper>,
    params: Value,
) -> Result<SlackDispatchResult, DeliveryError<SlackDispatchResult>> {
    let payload = ReplyPayload::from_value(params)?;
    let result = SlackDispatchResult::from(dispatcher.dispatch(payload).await);
    if result.failed_posts.is_empty() {
        Ok(result)
    } else {
        Err(DeliveryError::Undelivered(result))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use std::time::Duration;

    use serde_json::json;

    use super::*;

    fn metadata() -> Params {
        json!({"channel": "C1", "text": "envelope", "raw_input_data": {"provider": "slack"}})
            .as_object()
            .cloned()
            .unwrap()
    }

    #[test]
    fn bare_time_is_sleep_only() {
        let step = SlackShaper.shape(&metadata(), Fragment::new(json!({"time": 500})));
        assert_eq!(step, Step::Sleep(Duration::from_millis(500)));
    }

    #[test]
    fn message_merges_routing_fields() {
        let step = SlackShaper.shape(
            &metadata(),
            Fragment::new(json!({"attachments": [{"text": "card"}], "time": 200})),
        );
        let Step::Post { params, delay } = step else {
            panic!("expected post");
        };
        assert_eq!(delay, Some(Duration::from_millis(200)));
        assert_eq!(params.get("channel"), Some(&json!("C1")));
        assert!(params.get("text").is_none());
        assert!(params.get("time").is_none());
        assert_eq!(params["attachments"][0]["text"], "card");
    }

    #[test]
    fn malformed_fragment_is_still_posted() {
        let step = SlackShaper.shape(&metadata(), Fragment::new(json!("oops")));
        let Step::Post { params, delay } = step else {
            panic!("expected post");
        };
        assert_eq!(delay, None);
        assert_eq!(params.get("fragment"), Some(&json!("oops")));
    }

    #[test]
    fn result_serializes_with_camel_case_lists() {
        let result = SlackDispatchResult {
            successful_posts: vec![PostSuccess {
                result: json!({"ok": true}),
                invocation_id: "a1".into(),
            }],
            failed_posts: vec![PostFailure::message("boom")],
        };
        assert_eq!(
            serde_json::to_value(&result).unwrap(),
            json!({
                "successfulPosts": [{"result": {"ok": true}, "invocationId": "a1"}],
                "failedPosts": [{"error": "boom"}],
            })
        );
    }
}
