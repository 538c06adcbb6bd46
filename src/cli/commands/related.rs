//! Related command - entries similar to a given entry

use crate::cli::output::{colors, emit, print_results, ranked, ResultItem};
use crate::cli::OutputFormat;
use crate::core::services::{SearchEngineService, Services};
use clap::Args;
use serde::Serialize;
use std::sync::Arc;

/// Arguments for the related command
#[derive(Args, Debug)]
pub struct RelatedArgs {
    /// Entry to find related content for
    pub entry: i32,

    /// Tenant that owns the entry
    #[arg(long, short = 't')]
    pub tenant: i32,

    /// Maximum number of results (defaults to the configured default)
    #[arg(long, short = 'k')]
    pub max: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct RelatedResponse {
    pub entry: i32,
    pub tenant: i32,
    pub results: Vec<ResultItem>,
}

/// Execute the related command
pub async fn execute(
    args: RelatedArgs,
    services: &Arc<Services>,
    format: OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    let max = args
        .max
        .unwrap_or(services.config.search.default_max)
        .clamp(1, services.config.search.max_results);

    let results = services
        .engine
        .related_contents(args.entry, max, args.tenant)
        .await
        .map_err(|e| {
            format!(
                "{e}. Related content needs the remote provider with related_content enabled."
            )
        })?;

    let response = RelatedResponse {
        entry: args.entry,
        tenant: args.tenant,
        results: ranked(results),
    };

    emit(&response, format, |r| {
        if r.results.is_empty() {
            println!(
                "No related entries for entry {}",
                colors::number(&r.entry.to_string())
            );
        } else {
            println!(
                "Entries related to {}:\n",
                colors::number(&r.entry.to_string())
            );
            print_results(&r.results);
        }
    })?;

    Ok(())
}
