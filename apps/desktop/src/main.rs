use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use client_core::{FeedRepository, FeedState, FeedViewModel, HttpFeedApi};
use storage::Storage;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;
use tracing_subscriber::EnvFilter;

mod config;

use config::{load_settings, normalize_database_url};

/// Terminal feed viewer. Enter refreshes, `q` quits.
#[derive(Parser, Debug)]
struct Args {
    #[arg(long)]
    feed_base_url: Option<String>,
    #[arg(long)]
    feed_path: Option<String>,
    #[arg(long)]
    thumbnail_prefix: Option<String>,
    #[arg(long)]
    database_url: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();
    let args = Args::parse();

    let mut settings = load_settings()?;
    if let Some(v) = args.feed_base_url {
        settings.feed_base_url = v;
    }
    if let Some(v) = args.feed_path {
        settings.feed_path = v;
    }
    if let Some(v) = args.thumbnail_prefix {
        settings.thumbnail_prefix = v;
    }
    if let Some(v) = args.database_url {
        settings.database_url = v;
    }

    let database_url = normalize_database_url(&settings.database_url);
    let storage = Storage::new(&database_url).await?;
    let api = HttpFeedApi::new(
        &settings.feed_base_url,
        &settings.feed_path,
        settings.request_timeout(),
    )?;
    info!(feed_url = %api.feed_url(), database_url = %database_url, "feed client starting");

    let repository = Arc::new(FeedRepository::with_thumbnail_prefix(
        Arc::new(api),
        storage,
        settings.thumbnail_prefix.clone(),
    ));
    let view_model = FeedViewModel::new(repository);

    let mut states = view_model.subscribe();
    let renderer = tokio::spawn(async move {
        loop {
            let state = states.borrow_and_update().clone();
            render(&state);
            if states.changed().await.is_err() {
                break;
            }
        }
    });

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        match line.trim() {
            "q" | "quit" => break,
            _ => {
                if view_model.refresh().is_none() {
                    println!("refresh already in progress");
                }
            }
        }
    }

    renderer.abort();
    Ok(())
}

fn render(state: &FeedState) {
    for message in state.take_network_errors() {
        eprintln!("network error: {message}");
    }

    if state.is_loading {
        println!("loading...");
        return;
    }

    match &state.feed_items {
        None => println!("feed not loaded"),
        Some(items) if items.is_empty() => println!("feed is empty"),
        Some(items) => {
            println!("{} items:", items.len());
            for item in items {
                let badge = if item.is_premium { " [premium]" } else { "" };
                println!("  {}{badge}  {}", item.id, item.thumbnail_url);
            }
        }
    }
}
