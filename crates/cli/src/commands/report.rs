//! Compute metrics from the command line.
//!
//! # Usage
//!
//! ```bash
//! # List the metric catalog
//! storelens metrics
//!
//! # One metric from PostgreSQL
//! storelens report top-selling --limit 5
//!
//! # The same metric from MongoDB
//! storelens report top-selling --store document
//!
//! # Both stores side by side
//! storelens report customer-spending --compare
//! ```
//!
//! Results are printed to stdout as pretty JSON, identical to the HTTP payloads.

use std::sync::Arc;

use serde::Serialize;
use tracing::warn;

use storelens_core::StoreKind;
use storelens_core::metrics::{self, CATALOG, MetricRequest, MetricsEngine};
use storelens_server::db::PgStore;

use super::{CliError, connect_document, connect_relational, load_config};

/// Options for the report command.
#[derive(Debug, Clone)]
pub struct ReportOptions {
    pub metric: String,
    pub store: StoreKind,
    pub limit: Option<i64>,
    pub sort: Option<String>,
    pub compare: bool,
}

fn print_json(value: &impl Serialize) -> Result<(), CliError> {
    let rendered = serde_json::to_string_pretty(value)?;
    #[allow(clippy::print_stdout)]
    {
        println!("{rendered}");
    }
    Ok(())
}

/// Print the metric catalog.
///
/// # Errors
///
/// Returns an error only if serialization fails.
pub fn list() -> Result<(), CliError> {
    print_json(&CATALOG.as_slice())
}

/// Compute one metric and print it.
///
/// # Errors
///
/// Returns an error for an unknown metric or bad limit, or if the targeted
/// store is unreachable. With `--compare` store failures are printed in the
/// report instead.
pub async fn run(options: ReportOptions) -> Result<(), CliError> {
    let request = MetricRequest::parse(&options.metric, options.limit, options.sort.as_deref())?;
    let config = load_config()?;

    if options.compare {
        let relational = connect_relational(&config)
            .await
            .map(|pool| MetricsEngine::new(Arc::new(PgStore::new(pool))))
            .inspect_err(|e| warn!(error = %e, "relational store unavailable"))
            .ok();
        let document = connect_document(&config)
            .await
            .map(|store| MetricsEngine::new(Arc::new(store)))
            .inspect_err(|e| warn!(error = %e, "document store unavailable"))
            .ok();

        let comparison = metrics::compare(
            relational.as_ref(),
            document.as_ref(),
            &request,
            config.query_timeout,
        )
        .await;
        return print_json(&comparison);
    }

    let engine = match options.store {
        StoreKind::Relational => {
            let pool = connect_relational(&config).await?;
            MetricsEngine::new(Arc::new(PgStore::new(pool)))
        }
        StoreKind::Document => MetricsEngine::new(Arc::new(connect_document(&config).await?)),
    };
    let output = engine.run(&request).await?;
    print_json(&output)
}
