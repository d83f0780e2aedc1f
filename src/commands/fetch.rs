//! Fetch command: warm the cache without activating anything

use std::path::PathBuf;

use console::Style;

use crate::cli::FetchArgs;
use crate::error::Result;
use crate::fetch::{FetchCoordinator, FetchOptions, default_workers};
use crate::manifest::Manifest;
use crate::resolver::Resolver;

pub fn run(cache_dir: Option<PathBuf>, verbose: bool, args: FetchArgs) -> Result<()> {
    let manifest = Manifest::load(&args.manifest)?;
    let cache = super::open_cache(cache_dir)?;
    let client = super::http_client(args.timeout)?;
    let retry = super::retry_policy(args.retries);

    let mut resolver = Resolver::new(&client, &cache, &manifest.repositories, retry);
    let graph = resolver.resolve(&manifest)?;

    let coordinator = FetchCoordinator::new(
        &client,
        &cache,
        &manifest.repositories,
        FetchOptions {
            workers: args.workers.unwrap_or_else(default_workers),
            retry,
            lenient: args.lenient,
            show_progress: !args.quiet,
        },
    );
    let outcome = coordinator.fetch_all(&graph)?;

    let warn = Style::new().yellow();
    for warning in &outcome.warnings {
        eprintln!("{} {warning}", warn.apply_to("Warning:"));
    }

    println!(
        "{} {} artifacts ({} from cache).",
        Style::new().green().apply_to("Fetched"),
        outcome.artifacts.len(),
        outcome.cached_hits
    );
    if verbose {
        for (coordinate, path) in &outcome.artifacts {
            println!("  {coordinate} -> {}", path.display());
        }
    }

    Ok(())
}
