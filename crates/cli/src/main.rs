//! StoreLens CLI - migrations, demo data and reports.
//!
//! # Usage
//!
//! ```bash
//! # Create the relational schema and session table
//! storelens migrate
//!
//! # Generate demo data into PostgreSQL and copy it to MongoDB
//! storelens seed --seed 7 --mirror
//!
//! # Re-copy PostgreSQL into MongoDB
//! storelens mirror
//!
//! # Remove all data from both stores
//! storelens cleanup
//!
//! # Print a metric, or compare both stores
//! storelens report abandoned --limit 10
//! storelens report affinity --compare
//! ```
//!
//! # Commands
//!
//! - `migrate` - Run database migrations
//! - `seed` - Generate synthetic data
//! - `mirror` - Copy the relational store into the document store
//! - `cleanup` - Delete all data
//! - `metrics` - List the metric catalog
//! - `report` - Compute a metric

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

use storelens_core::StoreKind;
use storelens_core::seed::SeedConfig;

mod commands;

use commands::CliError;
use commands::report::ReportOptions;
use commands::seed::SeedOptions;

#[derive(Parser)]
#[command(name = "storelens")]
#[command(author, version, about = "StoreLens CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Generate synthetic users, products, orders, reviews and carts
    Seed {
        #[arg(long, default_value_t = 100)]
        users: usize,

        #[arg(long, default_value_t = 50)]
        products: usize,

        #[arg(long, default_value_t = 200)]
        orders: usize,

        #[arg(long, default_value_t = 300)]
        reviews: usize,

        #[arg(long, default_value_t = 150)]
        carts: usize,

        /// RNG seed for reproducible data
        #[arg(long)]
        seed: Option<u64>,

        /// Truncate the relational tables first
        #[arg(long)]
        clear: bool,

        /// Copy the generated data to the document store
        #[arg(long)]
        mirror: bool,
    },
    /// Copy the relational store into the document store
    Mirror,
    /// Delete all StoreLens data
    Cleanup {
        /// Only clean one store (`relational` or `document`)
        #[arg(long, value_parser = parse_store)]
        only: Option<StoreKind>,
    },
    /// List the metric catalog
    Metrics,
    /// Compute a metric and print it as JSON
    Report {
        /// Metric slug (see `storelens metrics`)
        metric: String,

        /// Store to read (`relational` or `document`)
        #[arg(short, long, default_value = "relational", value_parser = parse_store)]
        store: StoreKind,

        /// Row limit (1-100)
        #[arg(short, long)]
        limit: Option<i64>,

        /// Catalog sort (`newest`, `price_low`, `price_high`)
        #[arg(long)]
        sort: Option<String>,

        /// Run against both stores and print the comparison
        #[arg(long, conflicts_with = "store")]
        compare: bool,
    },
}

fn parse_store(value: &str) -> Result<StoreKind, String> {
    value.parse().map_err(|e: storelens_core::Error| e.to_string())
}

#[tokio::main]
async fn main() {
    // Logs go to stderr so report output stays clean JSON
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "storelens_cli=info,storelens_server=info".into()),
        )
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), CliError> {
    match cli.command {
        Commands::Migrate => commands::migrate::run().await?,
        Commands::Seed {
            users,
            products,
            orders,
            reviews,
            carts,
            seed,
            clear,
            mirror,
        } => {
            let volumes = SeedConfig {
                users,
                products,
                orders,
                reviews,
                carts,
                seed,
            };
            commands::seed::run(SeedOptions {
                volumes,
                clear,
                mirror,
            })
            .await?;
        }
        Commands::Mirror => commands::mirror::run().await?,
        Commands::Cleanup { only } => commands::cleanup::run(only).await?,
        Commands::Metrics => commands::report::list()?,
        Commands::Report {
            metric,
            store,
            limit,
            sort,
            compare,
        } => {
            commands::report::run(ReportOptions {
                metric,
                store,
                limit,
                sort,
                compare,
            })
            .await?;
        }
    }
    Ok(())
}
