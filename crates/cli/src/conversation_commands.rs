use {
    relay_config::RelayConfig,
    relay_conversation::{ContextStore, ConversationClient, Error, attach_context, persist_context},
    serde_json::{Value, json},
};

use crate::Outcome;

/// Conversation and context errors reject with a `{code, message}` envelope.
fn settled(result: Result<Value, Error>) -> Outcome {
    match result {
        Ok(value) => Outcome::Resolved(value),
        Err(err) => Outcome::Rejected(json!({
            "code": err.status_code(),
            "message": err.to_string(),
        })),
    }
}

fn context_store(config: &RelayConfig) -> anyhow::Result<ContextStore> {
    let database = if config.cloudant.db_name.is_empty() {
        config.cloudant.database_for(&config.deploy.resolve_name()?)
    } else {
        config.cloudant.db_name.clone()
    };
    Ok(ContextStore::new(&config.cloudant, database))
}

pub(crate) async fn converse(config: &RelayConfig, params: Value) -> anyhow::Result<Outcome> {
    let client = ConversationClient::new(config.conversation.clone());
    Ok(settled(client.message(&params).await))
}

pub(crate) async fn context_load(config: &RelayConfig, params: Value) -> anyhow::Result<Outcome> {
    let store = context_store(config)?;
    Ok(settled(attach_context(&store, params).await))
}

pub(crate) async fn context_save(config: &RelayConfig, params: Value) -> anyhow::Result<Outcome> {
    let store = context_store(config)?;
    Ok(settled(persist_context(&store, params).await))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use {super::*, relay_config::DeployConfig};

    #[test]
    fn store_uses_deploy_database_by_default() {
        let config = RelayConfig {
            deploy: DeployConfig {
                name: None,
                action_name: Some("/org_space/acme_slack/context".into()),
            },
            ..RelayConfig::default()
        };
        assert_eq!(context_store(&config).unwrap().database(), "acme_context");
    }

    #[tokio::test]
    async fn converse_without_input_is_a_400() {
        let outcome = converse(&RelayConfig::default(), json!({})).await.unwrap();
        assert_eq!(
            outcome,
            Outcome::Rejected(json!({"code": 400, "message": "conversation.input is required"}))
        );
    }
}
