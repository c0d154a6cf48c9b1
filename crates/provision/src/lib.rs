//! Per-tenant database provisioning.
//!
//! Creating a database that already exists counts as success. While the
//! service is temporarily unavailable the request is repeated after a fixed
//! delay, up to a configured number of attempts.

use std::time::Duration;

use {
    relay_common::Status,
    relay_config::CloudantConfig,
    reqwest::StatusCode,
    secrecy::{ExposeSecret, Secret},
    serde_json::Value,
    tracing::{debug, info, warn},
};

/// How one create request ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CreateOutcome {
    Created,
    AlreadyExists,
    /// Service unavailable; worth repeating.
    Transient(String),
    Rejected(String),
}

/// Classify a create-database response.
#[must_use]
pub fn classify(status: StatusCode, body: &Value) -> CreateOutcome {
    let error = body.get("error").and_then(Value::as_str);
    let detail = || {
        body.get("reason")
            .and_then(Value::as_str)
            .or(error)
            .map_or_else(|| format!("unexpected status {status}"), str::to_string)
    };

    if status == StatusCode::PRECONDITION_FAILED || error == Some("file_exists") {
        return CreateOutcome::AlreadyExists;
    }
    match status {
        StatusCode::CREATED | StatusCode::ACCEPTED => CreateOutcome::Created,
        StatusCode::SERVICE_UNAVAILABLE => CreateOutcome::Transient(detail()),
        _ => CreateOutcome::Rejected(detail()),
    }
}

/// Creates databases on one document-database account.
pub struct Provisioner {
    http: reqwest::Client,
    url: String,
    username: String,
    password: Secret<String>,
    max_attempts: u32,
    retry_delay: Duration,
}

impl Provisioner {
    pub fn new(config: &CloudantConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            url: config.url.trim_end_matches('/').to_string(),
            username: config.username.clone(),
            password: config.password.clone(),
            max_attempts: config.max_attempts.max(1),
            retry_delay: Duration::from_millis(config.retry_delay_ms),
        }
    }

    async fn attempt(&self, name: &str) -> CreateOutcome {
        let url = format!("{}/{}", self.url, urlencoding::encode(name));
        let resp = match self
            .http
            .put(url)
            .basic_auth(&self.username, Some(self.password.expose_secret()))
            .send()
            .await
        {
            Ok(resp) => resp,
            Err(err) => return CreateOutcome::Rejected(err.to_string()),
        };
        let status = resp.status();
        let body = resp.json::<Value>().await.unwrap_or(Value::Null);
        debug!(database = name, %status, "create database returned");
        classify(status, &body)
    }

    /// Create database `name`. Resolves to `{200, "OK"}` when the database
    /// exists afterwards; otherwise returns the failure envelope: `{400, ..}`
    /// for a rejection, `{503, ..}` when every attempt found the service
    /// unavailable.
    pub async fn create_database(&self, name: &str) -> Result<Status, Status> {
        if self.url.is_empty() {
            return Err(Status::bad_request("cloudant.url is required"));
        }
        if name.is_empty() {
            return Err(Status::bad_request("database name is required"));
        }

        let mut attempt = 0u32;
        loop {
            attempt += 1;
            match self.attempt(name).await {
                CreateOutcome::Created => {
                    info!(database = name, attempt, "database created");
                    return Ok(Status::ok());
                },
                CreateOutcome::AlreadyExists => {
                    info!(database = name, "database already exists");
                    return Ok(Status::ok());
                },
                CreateOutcome::Rejected(message) => {
                    warn!(database = name, %message, "database creation rejected");
                    return Err(Status::bad_request(message));
                },
                CreateOutcome::Transient(message) => {
                    if attempt >= self.max_attempts {
                        warn!(
                            database = name,
                            attempt,
                            max_attempts = self.max_attempts,
                            "database service still unavailable after retries"
                        );
                        return Err(Status::new(503, message));
                    }
                    warn!(
                        database = name,
                        attempt,
                        max_attempts = self.max_attempts,
                        retry_delay_ms = self.retry_delay.as_millis() as u64,
                        "database service unavailable, waiting before retry"
                    );
                    tokio::time::sleep(self.retry_delay).await;
                },
            }
        }
    }
}
