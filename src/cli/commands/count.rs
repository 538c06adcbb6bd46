//! Count command - indexed entries per tenant or in total

use crate::cli::output::{colors, emit};
use crate::cli::OutputFormat;
use crate::core::services::{SearchEngineService, Services};
use clap::Args;
use serde::Serialize;
use std::sync::Arc;

/// Arguments for the count command
#[derive(Args, Debug)]
pub struct CountArgs {
    /// Count only this tenant's index
    #[arg(long, short = 't')]
    pub tenant: Option<i32>,
}

#[derive(Debug, Serialize)]
pub struct CountResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tenant: Option<i32>,
    pub count: u64,
}

/// Execute the count command
pub async fn execute(
    args: CountArgs,
    services: &Arc<Services>,
    format: OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    let count = match args.tenant {
        Some(tenant) => services.engine.indexed_entry_count(tenant).await,
        None => services.engine.total_indexed_entry_count().await,
    };

    let response = CountResponse {
        tenant: args.tenant,
        count,
    };
    emit(&response, format, |r| match r.tenant {
        Some(tenant) => println!(
            "Tenant {}: {} entries",
            colors::index_name(&tenant.to_string()),
            colors::number(&r.count.to_string())
        ),
        None => println!(
            "All tenants: {} entries",
            colors::number(&r.count.to_string())
        ),
    })?;

    Ok(())
}
