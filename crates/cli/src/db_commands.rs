use {
    relay_common::{ActionName, Status},
    relay_config::RelayConfig,
    relay_provision::Provisioner,
    serde_json::json,
};

use crate::Outcome;

fn status(status: Status) -> Outcome {
    let value = json!({"code": status.code, "message": status.message});
    if status.is_success() {
        Outcome::Resolved(value)
    } else {
        Outcome::Rejected(value)
    }
}

pub(crate) async fn provision(config: &RelayConfig, name: Option<String>) -> anyhow::Result<Outcome> {
    let name = match name {
        Some(name) => name,
        None if !config.cloudant.db_name.is_empty() => config.cloudant.db_name.clone(),
        None => match config.deploy.resolve_name() {
            Ok(deploy) => config.cloudant.database_for(&deploy),
            Err(err) => return Ok(status(Status::bad_request(err.to_string()))),
        },
    };
    let provisioner = Provisioner::new(&config.cloudant);
    Ok(match provisioner.create_database(&name).await {
        Ok(ok) => status(ok),
        Err(failed) => status(failed),
    })
}

pub(crate) fn deploy_name(config: &RelayConfig, action_name: Option<String>) -> Outcome {
    let Some(action_name) = action_name.or_else(|| config.deploy.action_name.clone()) else {
        return Outcome::rejected("action name is required");
    };
    let parsed = match ActionName::parse(&action_name) {
        Ok(parsed) => parsed,
        Err(err) => return Outcome::rejected(err),
    };
    match parsed.deploy_name() {
        Ok(deploy) => Outcome::Resolved(json!({
            "deploy_name": deploy,
            "post_sequence": relay_common::post_sequence_target(deploy),
        })),
        Err(err) => Outcome::rejected(err),
    }
}
