//! List-indexes command

use crate::cli::output::{colors, emit};
use crate::cli::OutputFormat;
use crate::core::search::document::tenant_from_index_name;
use crate::core::services::Services;
use clap::Args;
use serde::Serialize;
use std::sync::Arc;

/// Arguments for list-indexes
#[derive(Args, Debug)]
pub struct ListIndexesArgs {
    /// Include the document count of each index
    #[arg(long, short = 'c')]
    pub counts: bool,
}

#[derive(Debug, Serialize)]
pub struct IndexListItem {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tenant: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count: Option<u64>,
}

/// Execute the list-indexes command
pub async fn execute(
    args: ListIndexesArgs,
    services: &Arc<Services>,
    format: OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut items = Vec::new();
    for name in services.factory.index_names().await? {
        let count = if args.counts {
            let client = services.factory.search_client_for_index(&name).await?;
            Some(client.count_entries().await?)
        } else {
            None
        };
        items.push(IndexListItem {
            tenant: tenant_from_index_name(&name),
            name,
            count,
        });
    }

    emit(&items, format, |items| {
        if items.is_empty() {
            println!("No indexes found. Index some entries with 'blobsearch index-entries'.");
            return;
        }
        println!("{}", colors::label("Indexes:"));
        for item in items {
            let tenant = item
                .tenant
                .map(|t| format!("tenant {t}"))
                .unwrap_or_else(|| "no tenant".to_string());
            match item.count {
                Some(count) => println!(
                    "  {} ({}, {} entries)",
                    colors::index_name(&item.name),
                    colors::dim(&tenant),
                    colors::number(&count.to_string())
                ),
                None => println!(
                    "  {} ({})",
                    colors::index_name(&item.name),
                    colors::dim(&tenant)
                ),
            }
        }
    })?;

    Ok(())
}
