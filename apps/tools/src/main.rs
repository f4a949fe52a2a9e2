use std::{sync::Arc, time::Duration};

use anyhow::Result;
use clap::{Parser, Subcommand};
use client_core::{
    api::{DEFAULT_FEED_BASE_URL, DEFAULT_FEED_PATH, DEFAULT_REQUEST_TIMEOUT},
    mapping::{to_feed_items, DEFAULT_THUMBNAIL_PREFIX},
    FeedRepository, HttpFeedApi, Repository,
};
use storage::{Storage, DEFAULT_DATABASE_URL};

#[derive(Parser, Debug)]
struct Cli {
    #[arg(long, default_value = DEFAULT_DATABASE_URL)]
    database_url: String,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Fetch the remote feed and replace the stored items.
    Refresh {
        #[arg(long, default_value = DEFAULT_FEED_BASE_URL)]
        base_url: String,
        #[arg(long, default_value = DEFAULT_FEED_PATH)]
        feed_path: String,
        #[arg(long, default_value_t = DEFAULT_REQUEST_TIMEOUT.as_secs())]
        timeout_secs: u64,
    },
    /// Print the stored items in feed order.
    List {
        #[arg(long, default_value = DEFAULT_THUMBNAIL_PREFIX)]
        thumbnail_prefix: String,
    },
    Count,
    Health,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt().with_env_filter("info").init();
    let cli = Cli::parse();
    let storage = Storage::new(&cli.database_url).await?;

    match cli.command {
        Command::Refresh {
            base_url,
            feed_path,
            timeout_secs,
        } => {
            let api = HttpFeedApi::new(&base_url, &feed_path, Duration::from_secs(timeout_secs))?;
            let repository = FeedRepository::new(Arc::new(api), storage.clone());
            repository.refresh().await?;
            println!("stored {} items", storage.count_feed_items().await?);
        }
        Command::List { thumbnail_prefix } => {
            let rows = storage.list_feed_items().await?;
            for item in to_feed_items(&rows, &thumbnail_prefix) {
                println!(
                    "{}\t{}\t{}",
                    item.id,
                    if item.is_premium { "premium" } else { "free" },
                    item.thumbnail_url
                );
            }
        }
        Command::Count => {
            println!("{}", storage.count_feed_items().await?);
        }
        Command::Health => {
            storage.health_check().await?;
            println!("ok");
        }
    }

    Ok(())
}
