//! CLI adapter for blobsearch
//!
//! Admin commands over the search engine service. Depends on `core/`
//! only; every command goes through [`Services`](crate::core::services::Services).

pub mod commands;
pub mod output;

use clap::{Parser, Subcommand};

/// blobsearch - per-tenant search index administration
///
/// Index entries from JSON files, query tenant indexes and inspect the
/// configured search provider.
#[derive(Parser, Debug)]
#[command(name = "blobsearch")]
#[command(version)]
#[command(about = "Per-tenant search index administration", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output format
    #[arg(long, global = true, default_value = "human")]
    pub format: OutputFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Output format for CLI commands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable output (default)
    #[default]
    Human,
    /// JSON output for scripting
    Json,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Index entries read from a JSON file
    #[command(name = "index-entries")]
    IndexEntries(commands::IndexArgs),

    /// Search a tenant's index
    Search(commands::SearchArgs),

    /// Remove an entry from whichever index holds it
    #[command(name = "remove-entry")]
    RemoveEntry(commands::RemoveArgs),

    /// Count indexed entries for one tenant or all of them
    Count(commands::CountArgs),

    /// Find entries related to an entry
    Related(commands::RelatedArgs),

    /// List all tenant indexes
    #[command(name = "list-indexes")]
    ListIndexes(commands::ListIndexesArgs),

    /// Show current configuration
    #[command(name = "show-config")]
    ShowConfig(commands::ConfigArgs),

    /// Generate shell completion scripts
    ///
    /// Output completion script to stdout. To install:
    ///
    ///   bash:  blobsearch completions bash > ~/.local/share/bash-completion/completions/blobsearch
    ///   zsh:   blobsearch completions zsh > ~/.zfunc/_blobsearch
    ///   fish:  blobsearch completions fish > ~/.config/fish/completions/blobsearch.fish
    Completions(commands::CompletionsArgs),
}

/// Run the CLI with the provided arguments
pub async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    use crate::core::config::Config;
    use crate::core::logging;
    use crate::core::services::Services;
    use crate::core::xdg::XdgDirs;
    use std::sync::Arc;

    // Handle completions command early (doesn't need services)
    if let Commands::Completions(args) = cli.command {
        return commands::completions::execute(args);
    }

    let xdg = XdgDirs::new();
    xdg.ensure_dirs_exist()?;

    let config = Config::load()?;
    logging::init(&config.logging);
    xdg.log_paths();
    config.log_config();

    let services = Arc::new(Services::new(config)?);

    match cli.command {
        Commands::IndexEntries(args) => {
            commands::index::execute(args, &services, cli.format).await
        }
        Commands::Search(args) => commands::search::execute(args, &services, cli.format).await,
        Commands::RemoveEntry(args) => {
            commands::remove::execute(args, &services, cli.format).await
        }
        Commands::Count(args) => commands::count::execute(args, &services, cli.format).await,
        Commands::Related(args) => commands::related::execute(args, &services, cli.format).await,
        Commands::ListIndexes(args) => {
            commands::indexes::execute(args, &services, cli.format).await
        }
        Commands::ShowConfig(args) => commands::config::execute(args, &services, cli.format).await,
        Commands::Completions(_) => unreachable!(), // Handled above
    }
}
