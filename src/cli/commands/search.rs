//! Search command - search a tenant's index

use crate::cli::output::{colors, emit, print_results, ranked, ResultItem};
use crate::cli::OutputFormat;
use crate::core::services::{SearchEngineService, Services};
use clap::Args;
use serde::Serialize;
use std::sync::Arc;

/// Arguments for the search command
#[derive(Args, Debug)]
pub struct SearchArgs {
    /// Search query; `*` matches every entry
    pub query: String,

    /// Tenant whose index is searched
    #[arg(long, short = 't')]
    pub tenant: i32,

    /// Maximum number of results (defaults to the configured default)
    #[arg(long, short = 'k')]
    pub max: Option<usize>,

    /// Restrict the search to one entry
    #[arg(long, short = 'e')]
    pub entry: Option<i32>,
}

/// Search response
#[derive(Debug, Serialize)]
pub struct SearchResponseOutput {
    pub query: String,
    pub tenant: i32,
    pub total_results: usize,
    pub results: Vec<ResultItem>,
}

/// Execute the search command
pub async fn execute(
    args: SearchArgs,
    services: &Arc<Services>,
    format: OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    let max = args
        .max
        .unwrap_or(services.config.search.default_max)
        .clamp(1, services.config.search.max_results);

    let results = services
        .engine
        .search(&args.query, max, args.tenant, args.entry)
        .await;

    let output = SearchResponseOutput {
        query: args.query.clone(),
        tenant: args.tenant,
        total_results: results.len(),
        results: ranked(results),
    };

    emit(&output, format, |o| {
        if o.results.is_empty() {
            println!(
                "No results found for '{}' in tenant {}",
                colors::label(&o.query),
                colors::index_name(&o.tenant.to_string())
            );
        } else {
            println!(
                "Found {} result(s) in tenant {}:\n",
                colors::number(&o.total_results.to_string()),
                colors::index_name(&o.tenant.to_string())
            );
            print_results(&o.results);
        }
    })?;

    Ok(())
}
