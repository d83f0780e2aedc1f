//! Resolve command: print the dependency graph without fetching artifacts

use std::path::PathBuf;

use crate::cli::ResolveArgs;
use crate::error::Result;
use crate::manifest::Manifest;
use crate::resolver::{Resolver, SelectionReason};

pub fn run(cache_dir: Option<PathBuf>, args: ResolveArgs) -> Result<()> {
    let manifest = Manifest::load(&args.manifest)?;
    let cache = super::open_cache(cache_dir)?;
    let client = super::http_client(args.timeout)?;

    let mut resolver = Resolver::new(
        &client,
        &cache,
        &manifest.repositories,
        super::retry_policy(args.retries),
    );
    let graph = resolver.resolve(&manifest)?;
    let order = graph.activation_order()?;

    if args.order {
        for coordinate in &order {
            println!("{coordinate}");
        }
        return Ok(());
    }

    println!("Resolved {} dependencies:", graph.len());
    for (coordinate, node) in &graph.nodes {
        let reason = match node.selected_by {
            SelectionReason::Root { index } => format!("root #{}", index + 1),
            SelectionReason::Nearest { depth } => format!("depth {depth}"),
        };
        println!("  {coordinate} ({reason})");
        for child in &node.children {
            println!("    -> {child}");
        }
    }

    println!("\nActivation order:");
    for coordinate in &order {
        println!("  {coordinate}");
    }

    Ok(())
}
