//! Boot command: the full resolve, fetch and activate sequence

use std::path::PathBuf;

use console::Style;

use crate::bootstrap::{BootOptions, Bootstrap};
use crate::cli::BootArgs;
use crate::error::Result;
use crate::fetch::default_workers;
use crate::loader::LibraryLoader;
use crate::manifest::Manifest;

pub fn run(cache_dir: Option<PathBuf>, verbose: bool, args: BootArgs) -> Result<()> {
    let manifest = Manifest::load(&args.manifest)?;
    let cache = super::open_cache(cache_dir)?;
    let client = super::http_client(args.timeout)?;
    let mut loader = LibraryLoader::new();

    let options = BootOptions {
        workers: args.workers.unwrap_or_else(default_workers),
        retry: super::retry_policy(args.retries),
        lenient: args.lenient,
        show_progress: !args.quiet,
    };

    let mut bootstrap = Bootstrap::new(&client, &cache, &mut loader, options);
    let report = bootstrap.run(&manifest)?;

    let warn = Style::new().yellow();
    for warning in &report.warnings {
        eprintln!("{} {warning}", warn.apply_to("Warning:"));
    }

    println!(
        "{} {} dependencies ({} from cache).",
        Style::new().green().apply_to("Activated"),
        report.activated.len(),
        report.cached_hits
    );
    if verbose {
        for coordinate in &report.activated {
            println!("  {coordinate}");
        }
    }

    Ok(())
}
