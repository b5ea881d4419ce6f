use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};

use product_scout::api::create_router;
use product_scout::config::CONFIG;
use product_scout::coordinator::SearchCoordinator;
use product_scout::data_models::{DEFAULT_MAX_RESULTS, Platform, ProductQuery};
use product_scout::money::Money;

#[derive(Parser)]
#[command(name = "product-scout", version, about = "Search products across marketplaces")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run one search and print the result as JSON
    Search {
        term: String,
        #[arg(long, default_value_t = DEFAULT_MAX_RESULTS)]
        max_results: usize,
        /// Repeat to search several platforms; defaults to all
        #[arg(long = "platform")]
        platforms: Vec<Platform>,
        #[arg(long, value_parser = parse_money)]
        min_price: Option<Money>,
        #[arg(long, value_parser = parse_money)]
        max_price: Option<Money>,
    },
    /// Serve POST /api/search
    Serve {
        #[arg(long)]
        addr: Option<String>,
    },
}

fn parse_money(raw: &str) -> Result<Money, String> {
    Money::parse_decimal(raw).ok_or_else(|| format!("invalid amount: {raw}"))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = &*CONFIG;

    tracing_subscriber::fmt()
        .with_max_level(config.log_level)
        .with_target(true)
        .init();
    for warning in &config.warnings {
        log::warn!("{warning}");
    }

    let coordinator = SearchCoordinator::from_config(config)?;

    match cli.command {
        Command::Search {
            term,
            max_results,
            platforms,
            min_price,
            max_price,
        } => {
            let mut query = ProductQuery::new(term)
                .with_max_results(max_results)
                .with_price_bounds(min_price, max_price);
            if !platforms.is_empty() {
                query = query.with_platforms(platforms);
            }

            let result = coordinator.search(query).await?;
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        Command::Serve { addr } => {
            let addr = addr.unwrap_or_else(|| config.bind_addr.clone());
            let listener = tokio::net::TcpListener::bind(&addr)
                .await
                .with_context(|| format!("failed to bind {addr}"))?;
            log::info!("listening on {addr}");
            axum::serve(listener, create_router(Arc::new(coordinator))).await?;
        }
    }
    Ok(())
}
