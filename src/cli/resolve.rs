use clap::Parser;
use std::path::PathBuf;

/// Arguments for resolve command
#[derive(Parser, Debug)]
#[command(after_help = "EXAMPLES:\n  \
                  Print the resolved graph:\n    jumpstart resolve app.json\n\n\
                  Print only the activation order:\n    jumpstart resolve app.json --order")]
pub struct ResolveArgs {
    /// Manifest file to resolve
    #[arg(default_value = "jumpstart.json")]
    pub manifest: PathBuf,

    /// Transport retry attempts per repository
    #[arg(long, default_value_t = 3)]
    pub retries: u32,

    /// Network timeout in seconds
    #[arg(long, default_value_t = 30)]
    pub timeout: u64,

    /// Print only the activation order, one coordinate per line
    #[arg(long)]
    pub order: bool,
}
