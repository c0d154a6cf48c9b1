//! Post adapter that runs the deployment's post-sequence action on the host.

use {
    async_trait::async_trait,
    relay_common::{Params, post_sequence_target},
    secrecy::{ExposeSecret, Secret},
    serde::Deserialize,
    serde_json::{Value, json},
    tracing::debug,
};

use crate::{
    adapter::PostAdapter,
    outcome::{PostFailure, PostSuccess},
};

/// Invokes `{deploy}_postsequence` as a blocking action call and reports the
/// host's activation id as the invocation id.
pub struct HostInvoker {
    http: reqwest::Client,
    api_host: String,
    namespace: String,
    target: String,
    api_key: Option<Secret<String>>,
}

#[derive(Debug, Deserialize)]
struct Activation {
    #[serde(rename = "activationId")]
    activation_id: String,
    response: ActivationResponse,
}

#[derive(Debug, Deserialize)]
struct ActivationResponse {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    result: Value,
}

impl HostInvoker {
    /// Invoker for the post-sequence action of `deploy_name`.
    pub fn for_deployment(
        api_host: impl Into<String>,
        namespace: impl Into<String>,
        deploy_name: &str,
        api_key: Option<Secret<String>>,
    ) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_host: api_host.into(),
            namespace: namespace.into(),
            target: post_sequence_target(deploy_name),
            api_key,
        }
    }

    /// Name of the action every post is routed to.
    #[must_use]
    pub fn target(&self) -> &str {
        &self.target
    }

    fn url(&self) -> String {
        format!(
            "{}/api/v1/namespaces/{}/actions/{}?blocking=true",
            self.api_host.trim_end_matches('/'),
            urlencoding::encode(&self.namespace),
            urlencoding::encode(&self.target)
        )
    }
}

#[async_trait]
impl PostAdapter for HostInvoker {
    async fn post(&self, params: Params) -> Result<PostSuccess, PostFailure> {
        let mut request = self.http.post(self.url()).json(&params);
        if let Some(key) = &self.api_key {
            let key = key.expose_secret();
            let (user, pass) = key.split_once(':').unwrap_or((key.as_str(), ""));
            request = request.basic_auth(user, Some(pass));
        }

        let resp = request.send().await.map_err(PostFailure::message)?;
        let status = resp.status();
        let text = resp.text().await.map_err(PostFailure::message)?;
        let body: Value = serde_json::from_str(&text).unwrap_or(Value::String(text));
        debug!(action = %self.target, %status, "host invocation returned");

        match serde_json::from_value::<Activation>(body.clone()) {
            Ok(activation) if status.is_success() && activation.response.success => {
                Ok(PostSuccess {
                    result: activation.response.result,
                    invocation_id: activation.activation_id,
                })
            },
            Ok(activation) => {
                let result = activation.response.result;
                Err(PostFailure::new(
                    result.get("error").cloned().unwrap_or(result),
                ))
            },
            Err(_) => Err(PostFailure::new(json!({
                "status": status.as_u16(),
                "body": body,
            }))),
        }
    }
}
