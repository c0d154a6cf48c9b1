//! Ordered delivery of multi-part Messenger replies.

use {
    relay_channels::{
        DeliveryError, DispatchLog, Dispatcher, Fragment, FragmentShaper, PostFailure,
        PostOutcome, PostSuccess, ReplyPayload, Step, dispatch::merge_fields,
    },
    relay_common::Params,
    serde::{Deserialize, Serialize},
    serde_json::Value,
};

/// Messenger fragments: a `sender_action` (typing indicator) is posted and
/// then held for its `time`; a bare `time` is a silent pause; anything else
/// is sent as the `message` of a Send API call.
#[derive(Debug, Clone, Copy, Default)]
pub struct FacebookShaper;

impl FragmentShaper for FacebookShaper {
    fn channel(&self) -> &'static str {
        crate::PROVIDER
    }

    fn shape(&self, metadata: &Params, fragment: Fragment) -> Step {
        let delay = fragment.delay();
        let mut base = metadata.clone();
        base.remove("message");
        base.remove("sender_action");

        if fragment.get("sender_action").is_some()
            && let Some(fields) = fragment.as_object()
        {
            let mut fields = fields.clone();
            fields.remove("time");
            return Step::Post {
                params: merge_fields(&base, &fields),
                delay,
            };
        }

        if fragment.is_pause()
            && let Some(delay) = delay
        {
            return Step::Sleep(delay);
        }

        let mut message = fragment.into_value();
        if let Value::Object(fields) = &mut message {
            fields.remove("time");
        }
        base.insert("message".into(), message);
        Step::Post {
            params: base,
            delay,
        }
    }
}

/// One entry of `postResponses`, tagged by `status`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum TaggedOutcome {
    Success(PostSuccess),
    Failure(PostFailure),
}

impl TaggedOutcome {
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }
}

impl From<PostOutcome> for TaggedOutcome {
    fn from(outcome: PostOutcome) -> Self {
        match outcome {
            PostOutcome::Success(s) => Self::Success(s),
            PostOutcome::Failure(f) => Self::Failure(f),
        }
    }
}

/// Outcome of a Messenger multi-post: every attempt in order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FacebookDispatchResult {
    pub post_responses: Vec<TaggedOutcome>,
}

impl FacebookDispatchResult {
    #[must_use]
    pub fn has_failure(&self) -> bool {
        self.post_responses.iter().any(|r| !r.is_success())
    }
}

impl From<DispatchLog> for FacebookDispatchResult {
    fn from(log: DispatchLog) -> Self {
        Self {
            post_responses: log
                .attempts
                .into_iter()
                .map(|a| TaggedOutcome::from(a.outcome))
                .collect(),
        }
    }
}

/// Deliver every fragment of `params.message`; reject if any post failed.
pub async fn multiple_post(
    dispatcher: &Dispatcher<FacebookShaper>,
    params: Value,
) -> Result<FacebookDispatchResult, DeliveryError<FacebookDispatchResult>> {
    let payload = ReplyPayload::from_value(params)?;
    let result = FacebookDispatchResult::from(dispatcher.dispatch(payload).await);
    if result.has_failure() {
        Err(DeliveryError::Undelivered(result))
    } else {
        Ok(result)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use std::time::Duration;

    use serde_json::json;

    use super::*;

    fn metadata() -> Params {
        json!({
            "recipient": {"id": "USER1"},
            "message": [{"text": "whole reply"}],
            "raw_input_data": {"provider": "facebook"},
        })
        .as_object()
        .cloned()
        .unwrap()
    }

    #[test]
    fn typing_indicator_is_posted_then_held() {
        let step = FacebookShaper.shape(
            &metadata(),
            Fragment::new(json!({"sender_action": "typing_on", "time": 1000})),
        );
        let Step::Post { params, delay } = step else {
            panic!("expected post");
        };
        assert_eq!(delay, Some(Duration::from_millis(1000)));
        assert_eq!(params["sender_action"], "typing_on");
        assert_eq!(params["recipient"]["id"], "USER1");
        assert!(params.get("message").is_none());
        assert!(params.get("time").is_none());
    }

    #[test]
    fn bare_time_is_sleep_only() {
        let step = FacebookShaper.shape(&metadata(), Fragment::new(json!({"time": 300})));
        assert_eq!(step, Step::Sleep(Duration::from_millis(300)));
    }

    #[test]
    fn content_is_wrapped_as_message() {
        let step = FacebookShaper.shape(
            &metadata(),
            Fragment::new(json!({"text": "hi", "time": 50})),
        );
        let Step::Post { params, delay } = step else {
            panic!("expected post");
        };
        assert_eq!(delay, Some(Duration::from_millis(50)));
        assert_eq!(params["message"], json!({"text": "hi"}));
        assert_eq!(params["raw_input_data"]["provider"], "facebook");
    }

    #[test]
    fn result_serializes_as_tagged_list() {
        let result = FacebookDispatchResult {
            post_responses: vec![
                TaggedOutcome::Success(PostSuccess {
                    result: json!({"message_id": "m1"}),
                    invocation_id: "a1".into(),
                }),
                TaggedOutcome::Failure(PostFailure::message("boom")),
            ],
        };
        assert!(result.has_failure());
        assert_eq!(
            serde_json::to_value(&result).unwrap(),
            json!({
                "postResponses": [
                    {"status": "success", "result": {"message_id": "m1"}, "invocationId": "a1"},
                    {"status": "failure", "error": "boom"},
                ],
            })
        );
    }
}
