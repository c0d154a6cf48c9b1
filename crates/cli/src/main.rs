mod channel_commands;
mod conversation_commands;
mod db_commands;

use std::{
    io::Read,
    path::{Path, PathBuf},
};

use {
    clap::{Parser, Subcommand},
    relay_config::RelayConfig,
    serde_json::{Map, Value, json},
    tracing::debug,
    tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt},
};

use crate::channel_commands::PostVia;

#[derive(Parser)]
#[command(name = "relay", about = "Relay: chat channel actions for a conversation service")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Output logs as JSON instead of human-readable.
    #[arg(long, global = true, default_value_t = false)]
    json_logs: bool,

    /// Config file (overrides discovery of ./relay.toml and ~/.config/relay/).
    #[arg(long, global = true, env = "RELAY_CONFIG")]
    config: Option<PathBuf>,

    /// JSON params file. Read from stdin when omitted.
    #[arg(long, global = true)]
    params: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Classify a Slack Events API callback or interactive payload.
    SlackReceive,
    /// Slack message → conversation request.
    SlackNormalizeIn,
    /// Conversation response → Slack reply.
    SlackNormalizeOut,
    /// Post one Slack message.
    SlackPost,
    /// Post every fragment of a Slack reply, in order.
    SlackMultiplePost {
        #[arg(long, value_enum, default_value_t = PostVia::Direct)]
        via: PostVia,
    },
    /// Classify a Messenger webhook call (subscription or page event).
    FacebookReceive {
        /// `X-Hub-Signature-256` header value of the request.
        #[arg(long)]
        signature: Option<String>,
    },
    /// Messenger event → conversation request.
    FacebookNormalizeIn,
    /// Conversation response → Messenger reply.
    FacebookNormalizeOut,
    /// Send one Messenger message or sender action.
    FacebookPost,
    /// Send every fragment of a Messenger reply, in order.
    FacebookMultiplePost {
        #[arg(long, value_enum, default_value_t = PostVia::Direct)]
        via: PostVia,
    },
    /// Call the conversation service.
    Converse,
    /// Load stored context into a conversation request.
    ContextLoad,
    /// Store the context of a conversation response.
    ContextSave,
    /// Create the deployment's context database.
    ProvisionDb {
        /// Database name. Defaults to the configured one.
        #[arg(long)]
        name: Option<String>,
    },
    /// Print the deployment name and post-sequence action for an action name.
    DeployName {
        /// Fully qualified action name. Defaults to `deploy.action_name`.
        action_name: Option<String>,
    },
}

/// Final state of one action invocation.
#[derive(Debug, PartialEq)]
pub(crate) enum Outcome {
    Resolved(Value),
    Rejected(Value),
}

impl Outcome {
    /// Rejection carrying a plain error message.
    pub(crate) fn rejected(err: impl std::fmt::Display) -> Self {
        Self::Rejected(json!({"error": err.to_string()}))
    }
}

/// Action params, read on first use.
pub(crate) struct Input {
    path: Option<PathBuf>,
}

impl Input {
    pub(crate) fn bytes(&self) -> anyhow::Result<Vec<u8>> {
        match &self.path {
            Some(path) => Ok(std::fs::read(path)?),
            None => {
                let mut buf = Vec::new();
                std::io::stdin().read_to_end(&mut buf)?;
                Ok(buf)
            },
        }
    }

    pub(crate) fn json(&self) -> anyhow::Result<Value> {
        parse_params(&self.bytes()?)
    }
}

/// Parse params JSON. Empty input is an empty object.
fn parse_params(raw: &[u8]) -> anyhow::Result<Value> {
    if raw.iter().all(u8::is_ascii_whitespace) {
        return Ok(Value::Object(Map::new()));
    }
    Ok(serde_json::from_slice(raw)?)
}

fn load_config(path: Option<&Path>) -> anyhow::Result<RelayConfig> {
    match path {
        Some(path) => Ok(relay_config::load_config(path)?),
        None => Ok(relay_config::discover_and_load()),
    }
}

/// Logs go to stderr; stdout carries only the action result.
fn init_telemetry(cli: &Cli) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));

    let registry = tracing_subscriber::registry().with(filter);

    if cli.json_logs {
        registry
            .with(
                fmt::layer()
                    .json()
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_writer(std::io::stderr),
            )
            .init();
    } else {
        registry
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_thread_ids(false)
                    .with_ansi(true)
                    .with_writer(std::io::stderr),
            )
            .init();
    }
}

async fn run(command: Commands, config: &RelayConfig, input: &Input) -> anyhow::Result<Outcome> {
    match command {
        Commands::SlackReceive => channel_commands::slack_receive(config, input.json()?),
        Commands::SlackNormalizeIn => channel_commands::slack_normalize_in(config, input.json()?),
        Commands::SlackNormalizeOut => Ok(channel_commands::normalized(
            relay_slack::conversation_to_slack(&input.json()?),
        )),
        Commands::SlackPost => channel_commands::slack_post(config, input.json()?).await,
        Commands::SlackMultiplePost { via } => {
            channel_commands::slack_multiple_post(config, via, input.json()?).await
        },
        Commands::FacebookReceive { signature } => {
            channel_commands::facebook_receive(config, &input.bytes()?, signature.as_deref())
        },
        Commands::FacebookNormalizeIn => {
            channel_commands::facebook_normalize_in(config, input.json()?)
        },
        Commands::FacebookNormalizeOut => Ok(channel_commands::normalized(
            relay_facebook::conversation_to_facebook(&input.json()?),
        )),
        Commands::FacebookPost => channel_commands::facebook_post(config, input.json()?).await,
        Commands::FacebookMultiplePost { via } => {
            channel_commands::facebook_multiple_post(config, via, input.json()?).await
        },
        Commands::Converse => conversation_commands::converse(config, input.json()?).await,
        Commands::ContextLoad => conversation_commands::context_load(config, input.json()?).await,
        Commands::ContextSave => conversation_commands::context_save(config, input.json()?).await,
        Commands::ProvisionDb { name } => db_commands::provision(config, name).await,
        Commands::DeployName { action_name } => Ok(db_commands::deploy_name(config, action_name)),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_telemetry(&cli);

    let config = load_config(cli.config.as_deref())?;
    let input = Input {
        path: cli.params.clone(),
    };

    let outcome = run(cli.command, &config, &input).await?;
    let (value, rejected) = match outcome {
        Outcome::Resolved(value) => (value, false),
        Outcome::Rejected(value) => (value, true),
    };
    println!("{}", serde_json::to_string_pretty(&value)?);
    if rejected {
        debug!("action rejected");
        std::process::exit(1);
    }
    Ok(())
}
