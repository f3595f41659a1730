use anyhow::Result;
use clap::{Parser, Subcommand};
use group_hub_core::group::GroupInput;
use group_hub_core::repository::{GroupRepository, PAD_PREFIX, USER_PREFIX};
use group_hub_core::store::redis::RedisStore;
use group_hub_core::store::KeyValueStore;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "group-hub", about = "Group entities over a flat key-value store")]
struct Cli {
    /// Redis connection string
    #[arg(long, default_value = "redis://127.0.0.1:6379")]
    redis_url: String,

    /// Per-operation deadline in milliseconds
    #[arg(long, default_value_t = 5000)]
    timeout_ms: u64,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create a group from a JSON input document
    Add { input: String },
    /// Fetch a group by id
    Get { id: String },
    /// Replace a group by id with a JSON input document
    Set { id: String, input: String },
    /// Delete a group and its back-references
    Delete { id: String },
    /// Write a user record so groups can reference it
    SeedUser { id: String },
    /// Write a pad record so groups can reference it
    SeedPad { id: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let store = Arc::new(RedisStore::connect(&cli.redis_url, 4).await?);
    let repo = GroupRepository::new(store.clone())
        .with_timeout(Duration::from_millis(cli.timeout_ms));

    match cli.command {
        Command::Add { input } => {
            let input: GroupInput = serde_json::from_str(&input)?;
            let group = repo.create(&input).await?;
            println!("{}", serde_json::to_string_pretty(&group)?);
        }
        Command::Get { id } => {
            let group = repo.read(&id).await?;
            println!("{}", serde_json::to_string_pretty(&group)?);
        }
        Command::Set { id, input } => {
            let input: GroupInput = serde_json::from_str(&input)?;
            let group = repo.update(&input, &id).await?;
            println!("{}", serde_json::to_string_pretty(&group)?);
        }
        Command::Delete { id } => {
            repo.delete(&id).await?;
            println!("deleted {id}");
        }
        Command::SeedUser { id } => {
            store
                .set(&format!("{USER_PREFIX}{id}"), json!({ "groups": [] }))
                .await?;
            println!("user {id} ready");
        }
        Command::SeedPad { id } => {
            store.set(&format!("{PAD_PREFIX}{id}"), json!({})).await?;
            println!("pad {id} ready");
        }
    }

    Ok(())
}
