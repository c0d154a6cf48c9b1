//! Single-message delivery through `chat.postMessage`.

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

use crate::config::SlackAccountConfig;

/// Optional `chat.postMessage` arguments copied from params when present.
const PASSTHROUGH_FIELDS: &[&str] = &[
    "thread_ts",
    "reply_broadcast",
    "username",
    "icon_url",
    "icon_emoji",
    "as_user",
    "mrkdwn",
    "unfurl_links",
    "unfurl_media",
];

/// Content fields; at least one must be present.
const CONTENT_FIELDS: &[&str] = &["text", "attachments", "blocks"];

/// Posts one message to Slack per call.
pub struct SlackPoster {
    http: reqwest::Client,
    config: SlackAccountConfig,
}

impl SlackPoster {
    pub fn new(config: SlackAccountConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
        }
    }

    /// Validate params and build the `chat.postMessage` body.
    pub fn build_message(params: &Params) -> Result<Value> {
        let value = Value::Object(params.clone());
        let channel = require_str(&value, "channel")?;

        let mut body = Params::new();
        body.insert("channel".into(), json!(channel));
        for key in CONTENT_FIELDS.iter().chain(PASSTHROUGH_FIELDS) {
            if let Some(v) = params.get(*key).filter(|v| !v.is_null()) {
                body.insert((*key).to_string(), v.clone());
            }
        }
        if !CONTENT_FIELDS.iter().any(|k| body.contains_key(*k)) {
            return Err(Error::invalid_input("text or attachments is required"));
        }
        Ok(Value::Object(body))
    }

    /// Per-call token override (`access_token`), else the configured bot token.
    fn token<'a>(&'a self, params: &'a Params) -> Result<&'a str> {
        let token = params
            .get("access_token")
            .and_then(Value::as_str)
            .unwrap_or_else(|| self.config.bot_access_token.expose_secret().as_str());
        if token.is_empty() {
            return Err(Error::unavailable("slack bot access token is not configured"));
        }
        Ok(token)
    }

    async fn deliver(&self, body: Value, token: &str) -> std::result::Result<PostSuccess, PostFailure> {
        let url = format!("{}/chat.postMessage", self.config.api_url.trim_end_matches('/'));
        let resp = self
            .http
            .post(url)
            .bearer_auth(token)
            .json(&body)
            .send()
            .await
            .map_err(PostFailure::message)?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            warn!(%status, "slack post rejected");
            return Err(PostFailure::new(json!({"status": status.as_u16(), "body": text})));
        }

        let response: Value = resp.json().await.map_err(PostFailure::message)?;
        if response.get("ok").and_then(Value::as_bool) != Some(true) {
            let error = opt_str(&response, "error").unwrap_or("unknown_error");
            warn!(error, "slack api returned an error");
            return Err(PostFailure::new(response));
        }

        debug!(ts = opt_str(&response, "ts"), "slack message posted");
        Ok(PostSuccess {
            result: response,
            invocation_id: uuid::Uuid::new_v4().to_string(),
        })
    }
}

#[async_trait]
impl PostAdapter for SlackPoster {
    async fn post(&self, params: Params) -> std::result::Result<PostSuccess, PostFailure> {
        let body = Self::build_message(&params).map_err(PostFailure::message)?;
        let token = self.token(&params).map_err(PostFailure::message)?;
        self.deliver(body, token).await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use {super::*, secrecy::Secret};

    fn params(value: Value) -> Params {
        value.as_object().cloned().unwrap()
    }

    fn poster(url: String) -> SlackPoster {
        SlackPoster::new(SlackAccountConfig {
            api_url: url,
            bot_access_token: Secret::new("xoxb-test".into()),
            ..SlackAccountConfig::default()
        })
    }

    #[test]
    fn body_keeps_only_slack_fields() {
        let body = SlackPoster::build_message(&params(json!({
            "channel": "C1",
            "text": "hi",
            "thread_ts": "1.0",
            "raw_input_data": {"provider": "slack"},
            "access_token": "secret",
        })))
        .unwrap();
        assert_eq!(body, json!({"channel": "C1", "text": "hi", "thread_ts": "1.0"}));
    }

    #[test]
    fn body_requires_channel_and_content() {
        let err = SlackPoster::build_message(&params(json!({"text": "hi"}))).unwrap_err();
        assert_eq!(err.to_string(), "channel is required");
        let err = SlackPoster::build_message(&params(json!({"channel": "C1"}))).unwrap_err();
        assert_eq!(err.to_string(), "text or attachments is required");
        assert!(SlackPoster::build_message(&params(json!({
            "channel": "C1",
            "attachments": [{"text": "card"}],
        })))
        .is_ok());
    }

    #[tokio::test]
    async fn posts_with_bearer_token() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/chat.postMessage")
            .match_header("authorization", "Bearer xoxb-test")
            .match_body(mockito::Matcher::Json(json!({"channel": "C1", "text": "hi"})))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(json!({"ok": true, "channel": "C1", "ts": "2.0"}).to_string())
            .create_async()
            .await;

        let success = poster(server.url())
            .post(params(json!({"channel": "C1", "text": "hi"})))
            .await
            .unwrap();
        assert_eq!(success.result["ts"], "2.0");
        assert!(!success.invocation_id.is_empty());
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn access_token_param_overrides_config() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/chat.postMessage")
            .match_header("authorization", "Bearer xoxb-tenant")
            .with_status(200)
            .with_body(json!({"ok": true}).to_string())
            .create_async()
            .await;

        poster(server.url())
            .post(params(json!({"channel": "C1", "text": "hi", "access_token": "xoxb-tenant"})))
            .await
            .unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn slack_error_is_a_failure() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/chat.postMessage")
            .with_status(200)
            .with_body(json!({"ok": false, "error": "channel_not_found"}).to_string())
            .create_async()
            .await;

        let failure = poster(server.url())
            .post(params(json!({"channel": "C404", "text": "hi"})))
            .await
            .unwrap_err();
        assert_eq!(failure.error["error"], "channel_not_found");
    }

    #[tokio::test]
    async fn invalid_params_fail_without_network() {
        let failure = poster("http://127.0.0.1:9".into())
            .post(params(json!({"channel": "C1"})))
            .await
            .unwrap_err();
        assert_eq!(failure.error, json!("text or attachments is required"));
    }

    #[tokio::test]
    async fn missing_token_is_a_failure() {
        let failure = SlackPoster::new(SlackAccountConfig::default())
            .post(params(json!({"channel": "C1", "text": "hi"})))
            .await
            .unwrap_err();
        assert!(failure.error.as_str().unwrap().contains("token"));
    }
}
