use std::sync::Arc;

use {
    relay_channels::{DeliveryError, Dispatcher, HostInvoker, PostAdapter, PostFailure, PostSuccess},
    relay_config::RelayConfig,
    relay_facebook::{FacebookAccountConfig, FacebookPoster, FacebookShaper},
    relay_slack::{SlackAccountConfig, SlackPoster, SlackShaper},
    serde::{Serialize, de::DeserializeOwned},
    serde_json::Value,
    tracing::info,
};

use crate::Outcome;

/// Where multi-post deliveries go.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum PostVia {
    /// Call the channel API directly.
    Direct,
    /// Invoke the deployment's post-sequence action on the host.
    Host,
}

fn account<T: DeserializeOwned + Default>(section: Option<&Value>) -> anyhow::Result<T> {
    Ok(section
        .cloned()
        .map(serde_json::from_value)
        .transpose()?
        .unwrap_or_default())
}

fn host_invoker(config: &RelayConfig) -> anyhow::Result<HostInvoker> {
    let deploy = config.deploy.resolve_name()?;
    let invoker = HostInvoker::for_deployment(
        &config.host.api_host,
        &config.host.namespace,
        &deploy,
        config.host.api_key.clone(),
    );
    info!(action = invoker.target(), "posting through host");
    Ok(invoker)
}

pub(crate) fn normalized<E: std::fmt::Display>(result: Result<Value, E>) -> Outcome {
    match result {
        Ok(value) => Outcome::Resolved(value),
        Err(err) => Outcome::rejected(err),
    }
}

async fn post_once(adapter: &dyn PostAdapter, params: Value) -> anyhow::Result<Outcome> {
    let Value::Object(params) = params else {
        return Ok(Outcome::rejected("params must be a JSON object"));
    };
    let outcome: Result<PostSuccess, PostFailure> = adapter.post(params).await;
    Ok(match outcome {
        Ok(success) => Outcome::Resolved(serde_json::to_value(success)?),
        Err(failure) => Outcome::Rejected(serde_json::to_value(failure)?),
    })
}

fn delivered<R: Serialize>(result: Result<R, DeliveryError<R>>) -> anyhow::Result<Outcome> {
    Ok(match result {
        Ok(result) => Outcome::Resolved(serde_json::to_value(result)?),
        Err(DeliveryError::Undelivered(result)) => {
            Outcome::Rejected(serde_json::to_value(result)?)
        },
        Err(DeliveryError::Invalid(err)) => Outcome::rejected(err),
    })
}

// ── Slack ───────────────────────────────────────────────────────────────────

fn slack_account(config: &RelayConfig) -> anyhow::Result<SlackAccountConfig> {
    account(config.channels.slack.as_ref())
}

pub(crate) fn slack_receive(config: &RelayConfig, params: Value) -> anyhow::Result<Outcome> {
    let account = slack_account(config)?;
    Ok(match relay_slack::receive(&params, &account) {
        Ok(receipt) => Outcome::Resolved(receipt.into_value()),
        Err(err) => Outcome::rejected(err),
    })
}

pub(crate) fn slack_normalize_in(config: &RelayConfig, params: Value) -> anyhow::Result<Outcome> {
    Ok(normalized(relay_slack::slack_to_conversation(
        &params,
        &config.conversation.workspace_id,
    )))
}

pub(crate) async fn slack_post(config: &RelayConfig, params: Value) -> anyhow::Result<Outcome> {
    let poster = SlackPoster::new(slack_account(config)?);
    post_once(&poster, params).await
}

pub(crate) async fn slack_multiple_post(
    config: &RelayConfig,
    via: PostVia,
    params: Value,
) -> anyhow::Result<Outcome> {
    let adapter: Arc<dyn PostAdapter> = match via {
        PostVia::Direct => Arc::new(SlackPoster::new(slack_account(config)?)),
        PostVia::Host => Arc::new(host_invoker(config)?),
    };
    let dispatcher = Dispatcher::new(adapter, SlackShaper);
    delivered(relay_slack::multiple_post(&dispatcher, params).await)
}

// ── Facebook ────────────────────────────────────────────────────────────────

fn facebook_account(config: &RelayConfig) -> anyhow::Result<FacebookAccountConfig> {
    account(config.channels.facebook.as_ref())
}

pub(crate) fn facebook_receive(
    config: &RelayConfig,
    body: &[u8],
    signature: Option<&str>,
) -> anyhow::Result<Outcome> {
    let account = facebook_account(config)?;
    Ok(match relay_facebook::receive(body, signature, &account) {
        Ok(receipt) => Outcome::Resolved(receipt.into_value()),
        Err(err) => Outcome::rejected(err),
    })
}

pub(crate) fn facebook_normalize_in(
    config: &RelayConfig,
    params: Value,
) -> anyhow::Result<Outcome> {
    Ok(normalized(relay_facebook::facebook_to_conversation(
        &params,
        &config.conversation.workspace_id,
    )))
}

pub(crate) async fn facebook_post(config: &RelayConfig, params: Value) -> anyhow::Result<Outcome> {
    let poster = FacebookPoster::new(facebook_account(config)?);
    post_once(&poster, params).await
}

pub(crate) async fn facebook_multiple_post(
    config: &RelayConfig,
    via: PostVia,
    params: Value,
) -> anyhow::Result<Outcome> {
    let adapter: Arc<dyn PostAdapter> = match via {
        PostVia::Direct => Arc::new(FacebookPoster::new(facebook_account(config)?)),
        PostVia::Host => Arc::new(host_invoker(config)?),
    };
    let dispatcher = Dispatcher::new(adapter, FacebookShaper);
    delivered(relay_facebook::multiple_post(&dispatcher, params).await)
}
