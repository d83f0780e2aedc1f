//! Cache command: statistics, listing, verification and clearing

use std::path::PathBuf;

use crate::cache::CacheStore;
use crate::cli::{CacheArgs, CacheSubcommand};
use crate::domain::Coordinate;
use crate::error::{JumpstartError, Result};

pub fn run(cache_dir: Option<PathBuf>, args: CacheArgs) -> Result<()> {
    let cache = super::open_cache(cache_dir)?;

    match args.command {
        Some(CacheSubcommand::List) => list_entries(&cache),
        Some(CacheSubcommand::Verify) => verify_entries(&cache),
        Some(CacheSubcommand::Clear(clear)) => match clear.only {
            Some(raw) => clear_one(&cache, &raw),
            None => clear_all(&cache),
        },
        None => show_stats(&cache),
    }
}

fn show_stats(cache: &CacheStore) -> Result<()> {
    let stats = cache.stats()?;

    println!("Cache Statistics:");
    println!("  Location: {}", cache.root().display());
    println!("  Descriptors: {}", stats.descriptors);
    println!("  Artifacts: {}", stats.artifacts);
    println!("  Size: {}", stats.formatted_size());

    if stats.descriptors == 0 && stats.artifacts == 0 {
        println!("\nCache is empty.");
    } else {
        println!("\nRun 'jumpstart cache list' to list cached entries.");
        println!("Run 'jumpstart cache verify' to re-check payload integrity.");
        println!("Run 'jumpstart cache clear' to remove everything from cache.");
    }

    Ok(())
}

fn list_entries(cache: &CacheStore) -> Result<()> {
    let entries = cache.list_entries()?;

    if entries.is_empty() {
        println!("No cached entries.");
        return Ok(());
    }

    println!("Cached entries ({}):", entries.len());
    for entry in &entries {
        println!(
            "  {} [{}] {} bytes",
            entry.coordinate,
            match entry.kind {
                crate::cache::EntryKind::Descriptor => "descriptor",
                crate::cache::EntryKind::Artifact => "artifact",
            },
            entry.size
        );
    }

    Ok(())
}

fn verify_entries(cache: &CacheStore) -> Result<()> {
    let entries = cache.list_entries()?;
    let mut corrupt = Vec::new();

    for entry in &entries {
        if !cache.verify(&entry.coordinate, entry.kind)? {
            corrupt.push(entry);
        }
    }

    if let Some(first) = corrupt.first() {
        for entry in &corrupt {
            eprintln!("Corrupt: {} ({})", entry.coordinate, entry.local_path.display());
        }
        return Err(JumpstartError::CacheCorrupted {
            coordinate: first.coordinate.to_string(),
            reason: format!("{} of {} entries failed verification", corrupt.len(), entries.len()),
        });
    }

    println!("Verified {} entries, all checksums match.", entries.len());
    Ok(())
}

fn clear_all(cache: &CacheStore) -> Result<()> {
    cache.clear()?;
    println!("Cache cleared successfully.");
    Ok(())
}

fn clear_one(cache: &CacheStore, raw: &str) -> Result<()> {
    let coordinate = Coordinate::parse(raw)?;
    cache.invalidate(&coordinate)?;
    println!("Removed cached entries for: {coordinate}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::EntryKind;
    use tempfile::TempDir;

    fn coord(s: &str) -> Coordinate {
        Coordinate::parse(s).unwrap()
    }

    #[test]
    fn test_show_stats_empty() {
        let temp = TempDir::new().unwrap();
        let cache = CacheStore::open(temp.path()).unwrap();
        assert!(show_stats(&cache).is_ok());
    }

    #[test]
    fn test_verify_reports_corruption() {
        let temp = TempDir::new().unwrap();
        let cache = CacheStore::open(temp.path()).unwrap();
        let bytes = b"payload";
        let entry = cache
            .put(
                &coord("g:widget:1.0"),
                EntryKind::Artifact,
                bytes,
                &crate::hash::hash_bytes(bytes),
            )
            .unwrap();
        std::fs::write(&entry.local_path, b"tampered").unwrap();

        let err = verify_entries(&cache).unwrap_err();
        assert!(matches!(err, JumpstartError::CacheCorrupted { .. }));
    }

    #[test]
    fn test_clear_one_removes_coordinate() {
        let temp = TempDir::new().unwrap();
        let cache = CacheStore::open(temp.path()).unwrap();
        let bytes = b"payload";
        cache
            .put(
                &coord("g:widget:1.0"),
                EntryKind::Artifact,
                bytes,
                &crate::hash::hash_bytes(bytes),
            )
            .unwrap();

        clear_one(&cache, "g:widget:1.0").unwrap();
        assert!(
            cache
                .get(&coord("g:widget:1.0"), EntryKind::Artifact)
                .unwrap()
                .is_none()
        );
    }
}
