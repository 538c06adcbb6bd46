//! blobsearch CLI - administer per-tenant search indexes
//!
//! # Examples
//!
//! ```bash
//! # Index entries from a JSON file
//! blobsearch index-entries entries.json
//!
//! # Search tenant 3
//! blobsearch search "lifetimes" --tenant 3
//!
//! # Count everything, as JSON
//! blobsearch count --format json
//! ```

use blobsearch::cli::output::print_error;
use blobsearch::cli::{run, Cli};
use clap::Parser;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        print_error(&e.to_string());
        std::process::exit(1);
    }
}
