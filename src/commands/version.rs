//! Version command implementation

use crate::cache;
use crate::error::Result;
use crate::repository::SUPPORTED_SCHEMA;

/// Print the version plus the protocol and cache facts that matter when
/// debugging a bootstrap against a remote repository.
pub fn run() -> Result<()> {
    println!("jumpstart {}", env!("CARGO_PKG_VERSION"));
    println!();
    println!("  Descriptor schema: {SUPPORTED_SCHEMA}");
    println!("  Cache directory: {}", cache::cache_dir()?.display());

    Ok(())
}
