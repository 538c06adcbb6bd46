//! Remove-entry command

use crate::cli::output::{emit, print_success};
use crate::cli::OutputFormat;
use crate::core::services::{SearchEngineService, Services};
use clap::Args;
use serde::Serialize;
use std::sync::Arc;

/// Arguments for the remove-entry command
#[derive(Args, Debug)]
pub struct RemoveArgs {
    /// Entry id to remove
    pub entry: i32,
}

#[derive(Debug, Serialize)]
pub struct RemoveResponse {
    pub entry: i32,
    pub requested: bool,
}

/// Execute the remove-entry command.
///
/// Removal is best effort; problems are reported through the log.
pub async fn execute(
    args: RemoveArgs,
    services: &Arc<Services>,
    format: OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    services.engine.remove_post(args.entry).await;

    let response = RemoveResponse {
        entry: args.entry,
        requested: true,
    };
    emit(&response, format, |r| {
        print_success(&format!("Removal of entry {} requested", r.entry));
    })?;

    Ok(())
}
