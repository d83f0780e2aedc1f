use clap::Parser;
use std::path::PathBuf;

/// Arguments for boot command
#[derive(Parser, Debug)]
#[command(after_help = "EXAMPLES:\n  \
                  Boot from the default manifest:\n    jumpstart boot\n\n\
                  Boot a specific manifest, skipping unavailable artifacts:\n    \
                  jumpstart boot app.json --lenient\n\n\
                  Boot with a larger fetch pool:\n    jumpstart boot --workers 8")]
pub struct BootArgs {
    /// Manifest file to boot from
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
