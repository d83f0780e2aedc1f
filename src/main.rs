//! Jumpstart - dynamic dependency bootstrap loader
//!
//! Resolves a manifest's transitive dependency closure against remote
//! repositories, fetches the artifacts into a local content-addressed cache,
//! and activates the code in dependency order at process startup.

use clap::Parser;

mod bootstrap;
mod cache;
mod cli;
mod commands;
mod domain;
mod error;
mod fetch;
mod hash;
mod loader;
mod manifest;
mod progress;
mod repository;
mod resolver;

#[cfg(test)]
mod test_fixtures;

use cli::{Cli, Commands};

fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Boot(args) => commands::boot::run(cli.cache_dir, cli.verbose, args),
        Commands::Resolve(args) => commands::resolve::run(cli.cache_dir, args),
        Commands::Fetch(args) => commands::fetch::run(cli.cache_dir, cli.verbose, args),
        Commands::Cache(args) => commands::cache::run(cli.cache_dir, args),
        Commands::Version => commands::version::run(),
        Commands::Completions(args) => commands::completions::run(args),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(e.exit_code());
    }
}
