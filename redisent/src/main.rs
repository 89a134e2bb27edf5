//! redisent: manage databases on a cluster from the command line.
//!
//! Each subcommand runs one reconciler operation against the management
//! API. Desired values come from flags and are overlaid on the database's
//! current state.

use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use redisent::{
    DatabaseResource, DatabaseState, MutationDecision, ProviderConfig, ProviderMeta, Resource,
    ResourceData, Timeouts,
};
use redisent_client::ShardPlacement;
use serde_json::json;
use tracing::warn;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Database lifecycle tool
#[derive(Parser, Debug)]
#[command(name = "redisent", version, about)]
struct Cli {
    /// Base url of the cluster management API
    #[arg(long, env = "REDISENT_BASE_URL")]
    base_url: String,

    /// Username used to authenticate with the management API
    #[arg(long, env = "REDISENT_USERNAME")]
    username: String,

    /// Password used to authenticate with the management API
    #[arg(long, env = "REDISENT_PASSWORD", hide_env_values = true)]
    password: String,

    /// Accept self-signed cluster certificates
    #[arg(long)]
    insecure: bool,

    /// Status poll interval in seconds
    #[arg(long, default_value = "3")]
    poll_interval: u64,

    /// Timeout in seconds for create, update and delete
    #[arg(long, default_value = "1200")]
    timeout: u64,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Check whether a database exists
    Exists {
        /// Database uid
        id: String,
    },

    /// Show a database
    Get {
        /// Database uid
        id: String,
    },

    /// Create a database and wait until it is active
    Create {
        #[command(flatten)]
        fields: DatabaseArgs,
    },

    /// Show the changes an update would make
    Plan {
        /// Database uid
        id: String,

        #[command(flatten)]
        fields: DatabaseArgs,
    },

    /// Update a database and wait until it is active again
    Update {
        /// Database uid
        id: String,

        #[command(flatten)]
        fields: DatabaseArgs,

        /// Delete and recreate the database if the change cannot be applied in place
        #[arg(long)]
        allow_replace: bool,
    },

    /// Delete a database and wait until it is gone
    Delete {
        /// Database uid
        id: String,
    },
}

#[derive(Args, Debug)]
struct DatabaseArgs {
    #[arg(long)]
    name: Option<String>,

    /// Database type (cannot be changed after creation)
    #[arg(long = "type")]
    db_type: Option<String>,

    #[arg(long)]
    port: Option<i32>,

    /// Memory limit in bytes
    #[arg(long)]
    memory_size: Option<i64>,

    #[arg(long)]
    replication: Option<bool>,

    #[arg(long)]
    sharding: Option<bool>,

    /// Number of shards (1-512)
    #[arg(long)]
    shard_count: Option<i32>,

    /// Shard placement policy: dense or sparse
    #[arg(long)]
    shard_placement: Option<ShardPlacement>,
}

impl DatabaseArgs {
    /// Overlay the given flags on `base`.
    fn apply(&self, mut base: DatabaseState) -> DatabaseState {
        if let Some(v) = &self.name {
            base.name = v.clone();
        }
        if let Some(v) = &self.db_type {
            base.db_type = v.clone();
        }
        if let Some(v) = self.port {
            base.port = v;
        }
        if let Some(v) = self.memory_size {
            base.memory_size = v;
        }
        if let Some(v) = self.replication {
            base.replication = v;
        }
        if let Some(v) = self.sharding {
            base.sharding = v;
        }
        if let Some(v) = self.shard_count {
            base.shard_count = v;
        }
        if let Some(v) = self.shard_placement {
            base.shard_placement = v;
        }
        base
    }
}

fn print_resource(d: &ResourceData) -> Result<()> {
    let out = json!({ "id": d.id(), "state": d.state() });
    println!("{}", serde_json::to_string_pretty(&out)?);
    Ok(())
}

/// Read the current state and build the transition to the flagged values.
async fn load_change(
    resource: &DatabaseResource,
    meta: &ProviderMeta,
    id: &str,
    fields: &DatabaseArgs,
    timeouts: Timeouts,
) -> Result<ResourceData> {
    let mut current = ResourceData::existing(id, DatabaseState::default()).with_timeouts(timeouts);
    resource
        .read(meta, &mut current)
        .await
        .with_context(|| format!("Failed to read database {}", id))?;

    let prior = current.state().clone();
    let desired = fields.apply(prior.clone());
    Ok(ResourceData::with_change(id, prior, desired).with_timeouts(timeouts))
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "redisent=info,redisent_client=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let mut config = ProviderConfig::new(&cli.base_url, &cli.username, &cli.password);
    config.accept_invalid_certs = cli.insecure;
    config.poll_interval = Duration::from_secs(cli.poll_interval);
    let meta = ProviderMeta::configure(&config).context("Failed to configure provider")?;

    let timeouts = Timeouts::all(Duration::from_secs(cli.timeout));
    let resource = DatabaseResource::default();

    match cli.command {
        Commands::Exists { id } => {
            let d = ResourceData::existing(id, DatabaseState::default());
            let exists = resource.exists(&meta, &d).await?;
            println!("{}", exists);
        }

        Commands::Get { id } => {
            let mut d = ResourceData::existing(id, DatabaseState::default());
            resource.read(&meta, &mut d).await?;
            print_resource(&d)?;
        }

        Commands::Create { fields } => {
            let mut d = ResourceData::new(fields.apply(DatabaseState::default()))
                .with_timeouts(timeouts);
            resource.customize_diff(&d)?;
            resource.create(&meta, &mut d).await?;
            print_resource(&d)?;
        }

        Commands::Plan { id, fields } => {
            let d = load_change(&resource, &meta, &id, &fields, timeouts).await?;
            let diff = resource.customize_diff(&d)?;
            if diff.is_empty() {
                println!("No changes.");
            }
            for change in &diff.changes {
                let note = match change.decision {
                    MutationDecision::ForceReplace => " (forces replacement)",
                    _ => "",
                };
                println!("  ~ {}: {} -> {}{}", change.field, change.old, change.new, note);
            }
            if diff.requires_replace {
                println!("Database {} must be replaced.", id);
            }
        }

        Commands::Update {
            id,
            fields,
            allow_replace,
        } => {
            let mut d = load_change(&resource, &meta, &id, &fields, timeouts).await?;
            let diff = resource.customize_diff(&d)?;

            if diff.requires_replace {
                if !allow_replace {
                    bail!(
                        "Database {} cannot be changed in place; rerun with --allow-replace to delete and recreate it",
                        id
                    );
                }
                warn!("Replacing database {}", id);
                let replacement = resource.replace(&meta, &mut d).await?;
                print_resource(&replacement)?;
            } else {
                resource.update(&meta, &mut d).await?;
                print_resource(&d)?;
            }
        }

        Commands::Delete { id } => {
            let mut d = ResourceData::existing(id, DatabaseState::default()).with_timeouts(timeouts);
            resource.delete(&meta, &mut d).await?;
            println!("deleted");
        }
    }

    Ok(())
}
