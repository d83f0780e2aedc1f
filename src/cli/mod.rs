//! CLI definitions using clap derive API
//!
//! This module is organized into submodules for each command's argument types:
//! - boot: Boot command arguments
//! - resolve: Resolve command arguments
//! - fetch: Fetch command arguments
//! - cache: Cache command arguments
//! - completions: Completions command arguments

use clap::builder::{Styles, styling::AnsiColor};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

pub mod boot;
pub mod cache;
pub mod completions;
pub mod fetch;
pub mod resolve;

pub use boot::BootArgs;
pub use cache::{CacheArgs, CacheSubcommand};
pub use completions::CompletionsArgs;
pub use fetch::FetchArgs;
pub use resolve::ResolveArgs;

/// Jumpstart - dynamic dependency bootstrap loader
#[derive(Parser, Debug)]
#[command(
    name = "jumpstart",
    author,
    version,
    color = clap::ColorChoice::Always,
    styles = Styles::styled()
        .header(AnsiColor::Green.on_default().bold())
        .usage(AnsiColor::Green.on_default().bold())
        .literal(AnsiColor::Cyan.on_default().bold())
        .placeholder(AnsiColor::Cyan.on_default()),
    about = "Resolve, fetch and activate a manifest's dependency closure at startup",
    long_about = "Jumpstart reads a dependency manifest, resolves the transitive closure \
                  against remote repositories with nearest-wins conflict resolution, fetches \
                  the artifacts into a local content-addressed cache, and activates the code \
                  in dependency order.",
    after_help = "\x1b[1m\x1b[32mExamples:\x1b[0m\n   \
                  jumpstart boot                          \x1b[90m# Boot from ./jumpstart.json\x1b[0m\n   \
                  jumpstart boot app.json --lenient       \x1b[90m# Skip unavailable artifacts\x1b[0m\n   \
                  jumpstart resolve app.json              \x1b[90m# Print the resolved graph\x1b[0m\n   \
                  jumpstart fetch app.json --workers 8    \x1b[90m# Warm the cache, no activation\x1b[0m\n   \
                  jumpstart cache                         \x1b[90m# Show cache statistics\x1b[0m\n\n\
                  "
)]
pub struct Cli {
    /// Cache directory (defaults to the user cache directory)
    #[arg(long, global = true, env = "JUMPSTART_CACHE_DIR")]
    pub cache_dir: Option<PathBuf>,

    /// Enable verbose output
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Resolve, fetch and activate a manifest's dependencies
    Boot(BootArgs),

    /// Resolve a manifest and print the dependency graph
    Resolve(ResolveArgs),

    /// Resolve a manifest and fetch its artifacts without activating
    Fetch(FetchArgs),

    /// Manage the artifact cache
    #[command(name = "cache")]
    Cache(CacheArgs),

    /// Show version information
    #[command(hide = true)]
    Version,

    /// Generate shell completions
    Completions(CompletionsArgs),
}
