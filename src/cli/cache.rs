use clap::{Parser, Subcommand};

/// Arguments for cache command
#[derive(Parser, Debug)]
#[command(after_help = "EXAMPLES:\n  \
                  Show cache statistics:\n    jumpstart cache\n\n\
                  List cached entries:\n    jumpstart cache list\n\n\
                  Re-hash every entry against its recorded checksum:\n    jumpstart cache verify\n\n\
                  Clear the whole cache:\n    jumpstart cache clear\n\n\
                  Remove one coordinate:\n    jumpstart cache clear --only g:widget:1.0")]
pub struct CacheArgs {
    #[command(subcommand)]
    pub command: Option<CacheSubcommand>,
}

/// Cache subcommands
#[derive(Subcommand, Debug)]
pub enum CacheSubcommand {
    /// List cached entries
    List,

    /// Verify cached payloads against their recorded checksums
    Verify,

    /// Clear cached entries
    Clear(ClearCacheArgs),
}

/// Arguments for cache clear command
#[derive(Parser, Debug)]
pub struct ClearCacheArgs {
    /// Remove only a specific coordinate (e.g. g:widget:1.0)
    #[arg(long)]
    pub only: Option<String>,
}
