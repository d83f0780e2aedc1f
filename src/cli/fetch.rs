use clap::Parser;
use std::path::PathBuf;

/// Arguments for fetch command
#[derive(Parser, Debug)]
#[command(after_help = "EXAMPLES:\n  \
                  Warm the cache for a manifest:\n    jumpstart fetch app.json\n\n\
                  Fetch with a larger worker pool:\n    jumpstart fetch app.json --workers 8")]
pub struct FetchArgs {
    /// Manifest file to fetch for
    #[arg(default_value = "jumpstart.json")]
    pub manifest: PathBuf,

    /// Number of concurrent fetch workers (defaults to 2x CPU count)
    #[arg(long)]
    pub workers: Option<usize>,

    /// Transport retry attempts per repository
    #[arg(long, default_value_t = 3)]
    pub retries: u32,

    /// Network timeout in seconds
    #[arg(long, default_value_t = 30)]
    pub timeout: u64,

    /// Skip artifacts that cannot be fetched instead of failing
    #[arg(long)]
    pub lenient: bool,

    /// Suppress the progress bar
    #[arg(long, short = 'q')]
    pub quiet: bool,
}
