//! Concurrent, deduplicated artifact acquisition
//!
//! A bounded pool of worker threads pulls coordinates from a shared queue
//! and materializes every resolved artifact into the cache:
//!
//! - A valid cache entry skips the network entirely (the warm-cache path).
//! - At most one fetch per coordinate is ever in flight; a late claimant
//!   waits for the owner's result instead of re-downloading. Not expected
//!   after memoized resolution, but enforced defensively.
//! - Transport failures retry with exponential backoff and jitter; once a
//!   repository's ceiling is exhausted the next repository is tried.
//! - Downloaded bytes are hashed and checked against the checksum published
//!   by the originating descriptor when one exists; otherwise the computed
//!   hash is persisted as the trust baseline (trust-on-first-use).
//!
//! An integrity violation fails fast: the partial file is discarded, never
//! cached, and a cooperative cancellation flag stops the remaining queued
//! and in-flight work. `ArtifactUnavailable` is fatal unless the coordinator
//! is configured lenient, in which case it degrades to a warning.

use std::collections::{BTreeMap, HashSet, VecDeque};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Condvar, Mutex};

use crate::cache::{CacheStore, EntryKind};
use crate::domain::{Coordinate, RepositoryDescriptor};
use crate::error::{JumpstartError, Result};
use crate::hash;
use crate::progress::DownloadProgress;
use crate::repository::retry::{RetryPolicy, with_retries};
use crate::repository::{RepositoryClient, parse_descriptor};
use crate::resolver::ResolvedGraph;

/// Worker pool size: a small multiple of available parallelism.
pub fn default_workers() -> usize {
    let parallelism = std::thread::available_parallelism()
        .map(std::num::NonZeroUsize::get)
        .unwrap_or(4);
    (parallelism * 2).min(16)
}

#[derive(Debug, Clone)]
pub struct FetchOptions {
    pub workers: usize,
    pub retry: RetryPolicy,
    /// Degrade `ArtifactUnavailable` to a warning instead of failing.
    pub lenient: bool,
    pub show_progress: bool,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            retry: RetryPolicy::default(),
            lenient: false,
            show_progress: false,
        }
    }
}

/// Result of a fetch run.
#[derive(Debug, Default)]
pub struct FetchOutcome {
    /// Local path per fetched coordinate.
    pub artifacts: BTreeMap<Coordinate, PathBuf>,
    /// How many artifacts were already cached.
    pub cached_hits: usize,
    /// Lenient-mode warnings (coordinates that could not be fetched).
    pub warnings: Vec<String>,
}

/// State shared between fetch workers.
struct FetchShared {
    queue: Mutex<VecDeque<Coordinate>>,
    in_flight: Mutex<HashSet<Coordinate>>,
    in_flight_done: Condvar,
    results: Mutex<BTreeMap<Coordinate, PathBuf>>,
    cached_hits: Mutex<usize>,
    warnings: Mutex<Vec<String>>,
    failure: Mutex<Option<JumpstartError>>,
    cancelled: AtomicBool,
}

impl FetchShared {
    fn new(coordinates: VecDeque<Coordinate>) -> Self {
        Self {
            queue: Mutex::new(coordinates),
            in_flight: Mutex::new(HashSet::new()),
            in_flight_done: Condvar::new(),
            results: Mutex::new(BTreeMap::new()),
            cached_hits: Mutex::new(0),
            warnings: Mutex::new(Vec::new()),
            failure: Mutex::new(None),
            cancelled: AtomicBool::new(false),
        }
    }

    fn record_failure(&self, error: JumpstartError) {
        let mut failure = self
            .failure
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        if failure.is_none() {
            *failure = Some(error);
        }
        self.cancelled.store(true, Ordering::SeqCst);
    }
}

enum Claim {
    Owner,
    AlreadyDone(PathBuf),
    Abandoned,
}

pub struct FetchCoordinator<'a> {
    client: &'a dyn RepositoryClient,
    cache: &'a CacheStore,
    repositories: &'a [RepositoryDescriptor],
    options: FetchOptions,
}

impl<'a> FetchCoordinator<'a> {
    pub fn new(
        client: &'a dyn RepositoryClient,
        cache: &'a CacheStore,
        repositories: &'a [RepositoryDescriptor],
        options: FetchOptions,
    ) -> Self {
        Self {
            client,
            cache,
            repositories,
            options,
        }
    }

    /// Download the primary artifact for every node in the resolved graph.
    pub fn fetch_all(&self, graph: &ResolvedGraph) -> Result<FetchOutcome> {
        self.fetch_set(graph.nodes.keys().cloned().collect())
    }

    /// Fetch an explicit coordinate set. Duplicates are tolerated; the
    /// in-flight guard collapses them to a single network fetch.
    pub fn fetch_set(&self, coordinates: Vec<Coordinate>) -> Result<FetchOutcome> {
        let total = coordinates.len();
        let shared = FetchShared::new(coordinates.into());
        let progress = DownloadProgress::new(total as u64, self.options.show_progress);
        let workers = self.options.workers.clamp(1, total.max(1));

        std::thread::scope(|scope| {
            for _ in 0..workers {
                scope.spawn(|| self.worker_loop(&shared, &progress));
            }
        });

        let failure = shared
            .failure
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .take();
        if let Some(error) = failure {
            progress.abandon();
            return Err(error);
        }
        progress.finish();

        Ok(FetchOutcome {
            artifacts: shared
                .results
                .into_inner()
                .unwrap_or_else(std::sync::PoisonError::into_inner),
            cached_hits: shared
                .cached_hits
                .into_inner()
                .unwrap_or_else(std::sync::PoisonError::into_inner),
            warnings: shared
                .warnings
                .into_inner()
                .unwrap_or_else(std::sync::PoisonError::into_inner),
        })
    }

    fn worker_loop(&self, shared: &FetchShared, progress: &DownloadProgress) {
        loop {
            if shared.cancelled.load(Ordering::SeqCst) {
                break;
            }
            let coordinate = {
                let mut queue = shared
                    .queue
                    .lock()
                    .unwrap_or_else(std::sync::PoisonError::into_inner);
                queue.pop_front()
            };
            let Some(coordinate) = coordinate else {
                break;
            };

            progress.start(&coordinate.to_string());
            match self.fetch_one(&coordinate, shared) {
                Ok(Some(path)) => {
                    shared
                        .results
                        .lock()
                        .unwrap_or_else(std::sync::PoisonError::into_inner)
                        .insert(coordinate, path);
                }
                // Lenient skip, already recorded as a warning
                Ok(None) => {}
                Err(error) => shared.record_failure(error),
            }
            progress.inc();
        }
    }

    /// Materialize one coordinate. `Ok(None)` means skipped leniently.
    fn fetch_one(&self, coordinate: &Coordinate, shared: &FetchShared) -> Result<Option<PathBuf>> {
        // Trust a valid cache entry ahead of any network re-verification
        if let Some(entry) = self.cache.get(coordinate, EntryKind::Artifact)? {
            *shared
                .cached_hits
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner) += 1;
            return Ok(Some(entry.local_path));
        }

        match self.claim(coordinate, shared) {
            Claim::AlreadyDone(path) => return Ok(Some(path)),
            Claim::Abandoned => return Ok(None),
            Claim::Owner => {}
        }

        // A previous owner writes the cache before releasing its claim, so a
        // waiter that won ownership re-checks the cache before downloading
        match self.cache.get(coordinate, EntryKind::Artifact) {
            Ok(Some(entry)) => {
                self.release(coordinate, shared);
                return Ok(Some(entry.local_path));
            }
            Ok(None) => {}
            Err(error) => {
                self.release(coordinate, shared);
                return Err(error);
            }
        }

        let result = self.download(coordinate);
        self.release(coordinate, shared);

        match result {
            Ok(path) => Ok(Some(path)),
            Err(JumpstartError::ArtifactUnavailable { coordinate }) if self.options.lenient => {
                shared
                    .warnings
                    .lock()
                    .unwrap_or_else(std::sync::PoisonError::into_inner)
                    .push(format!("artifact unavailable, skipped: {coordinate}"));
                Ok(None)
            }
            Err(error) => Err(error),
        }
    }

    /// Try every repository in priority order, with retries per repository.
    fn download(&self, coordinate: &Coordinate) -> Result<PathBuf> {
        let expected = self.published_checksum(coordinate)?;

        for repository in self.repositories {
            let outcome = with_retries(&self.options.retry, |_| {
                self.client.fetch_artifact(coordinate, repository)
            });
            let bytes = match outcome {
                Ok(Some(bytes)) => bytes,
                Ok(None) => continue,
                Err(JumpstartError::TransportExhausted { .. }) => continue,
                Err(other) => return Err(other),
            };

            let actual = hash::hash_bytes(&bytes);
            if let Some(expected) = &expected {
                if !hash::verify_hash(expected, &actual) {
                    // Security-sensitive: not retried, never cached
                    return Err(JumpstartError::IntegrityViolation {
                        coordinate: coordinate.to_string(),
                        expected: expected.clone(),
                        actual,
                    });
                }
            }

            let entry = self
                .cache
                .put(coordinate, EntryKind::Artifact, &bytes, &actual)?;
            return Ok(entry.local_path);
        }

        Err(JumpstartError::ArtifactUnavailable {
            coordinate: coordinate.to_string(),
        })
    }

    /// Checksum published by the descriptor that resolution cached for this
    /// coordinate, if any.
    fn published_checksum(&self, coordinate: &Coordinate) -> Result<Option<String>> {
        let Some(entry) = self.cache.get(coordinate, EntryKind::Descriptor)? else {
            return Ok(None);
        };
        let bytes = std::fs::read(&entry.local_path).map_err(|e| JumpstartError::FileReadFailed {
            path: entry.local_path.display().to_string(),
            reason: e.to_string(),
        })?;
        let descriptor = parse_descriptor(&bytes, coordinate, "cache", "cache").map_err(|e| {
            JumpstartError::CacheCorrupted {
                coordinate: coordinate.to_string(),
                reason: e.to_string(),
            }
        })?;
        Ok(descriptor.artifact_checksum)
    }

    fn claim(&self, coordinate: &Coordinate, shared: &FetchShared) -> Claim {
        let mut in_flight = shared
            .in_flight
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        while in_flight.contains(coordinate) {
            in_flight = shared
                .in_flight_done
                .wait(in_flight)
                .unwrap_or_else(std::sync::PoisonError::into_inner);
        }

        // The previous owner finished: take its result if it succeeded
        if let Some(path) = shared
            .results
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .get(coordinate)
        {
            return Claim::AlreadyDone(path.clone());
        }
        if shared.cancelled.load(Ordering::SeqCst) {
            return Claim::Abandoned;
        }

        in_flight.insert(coordinate.clone());
        Claim::Owner
    }

    fn release(&self, coordinate: &Coordinate, shared: &FetchShared) {
        let mut in_flight = shared
            .in_flight
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        in_flight.remove(coordinate);
        drop(in_flight);
        shared.in_flight_done.notify_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::Manifest;
    use crate::resolver::Resolver;
    use crate::test_fixtures::{FakeRepositoryClient, one_repo};
    use tempfile::TempDir;

    fn coord(s: &str) -> Coordinate {
        Coordinate::parse(s).unwrap()
    }

    fn fast_options(workers: usize) -> FetchOptions {
        FetchOptions {
            workers,
            retry: RetryPolicy {
                max_attempts: 3,
                base_delay: std::time::Duration::from_millis(1),
                max_delay: std::time::Duration::from_millis(2),
            },
            lenient: false,
            show_progress: false,
        }
    }

    fn temp_cache() -> (TempDir, CacheStore) {
        let temp = TempDir::new().unwrap();
        let cache = CacheStore::open(temp.path()).unwrap();
        (temp, cache)
    }

    fn resolve(
        fake: &FakeRepositoryClient,
        cache: &CacheStore,
        roots: &[&str],
    ) -> ResolvedGraph {
        let manifest = Manifest {
            dependencies: roots.iter().map(|r| coord(r)).collect(),
            repositories: one_repo(),
        };
        let repos = manifest.repositories.clone();
        let mut resolver =
            Resolver::new(fake, cache, &repos, RetryPolicy::with_attempts(1));
        resolver.resolve(&manifest).unwrap()
    }

    fn populated_fake() -> FakeRepositoryClient {
        let fake = FakeRepositoryClient::new();
        fake.add_descriptor("central", "g:a:1.0", &["g:b:1.0"]);
        fake.add_descriptor("central", "g:b:1.0", &["g:c:1.0"]);
        fake.add_descriptor("central", "g:c:1.0", &[]);
        fake.add_artifact("central", "g:a:1.0", b"bytes of a");
        fake.add_artifact("central", "g:b:1.0", b"bytes of b");
        fake.add_artifact("central", "g:c:1.0", b"bytes of c");
        fake
    }

    #[test]
    fn test_fetch_all_materializes_every_artifact() {
        let fake = populated_fake();
        let (_t, cache) = temp_cache();
        let graph = resolve(&fake, &cache, &["g:a:1.0"]);

        let repos = one_repo();
        let coordinator = FetchCoordinator::new(&fake, &cache, &repos, fast_options(4));
        let outcome = coordinator.fetch_all(&graph).unwrap();

        assert_eq!(outcome.artifacts.len(), 3);
        for (coordinate, path) in &outcome.artifacts {
            assert!(path.is_file(), "missing artifact for {coordinate}");
        }
        assert_eq!(
            std::fs::read(&outcome.artifacts[&coord("g:b:1.0")]).unwrap(),
            b"bytes of b"
        );
    }

    #[test]
    fn test_warm_cache_performs_zero_network_calls() {
        let fake = populated_fake();
        let (_t, cache) = temp_cache();
        let graph = resolve(&fake, &cache, &["g:a:1.0"]);

        let repos = one_repo();
        let coordinator = FetchCoordinator::new(&fake, &cache, &repos, fast_options(4));
        let first = coordinator.fetch_all(&graph).unwrap();

        // Second run against an empty fake: everything must come from cache
        let empty = FakeRepositoryClient::new();
        let coordinator = FetchCoordinator::new(&empty, &cache, &repos, fast_options(4));
        let second = coordinator.fetch_all(&graph).unwrap();

        assert_eq!(empty.artifact_fetches(), 0);
        assert_eq!(second.cached_hits, 3);
        assert_eq!(first.artifacts, second.artifacts);
    }

    #[test]
    fn test_transient_failures_are_retried() {
        let fake = populated_fake();
        fake.fail_artifact_times("g:c:1.0", 2);
        let (_t, cache) = temp_cache();
        let graph = resolve(&fake, &cache, &["g:a:1.0"]);

        let repos = one_repo();
        let coordinator = FetchCoordinator::new(&fake, &cache, &repos, fast_options(2));
        let outcome = coordinator.fetch_all(&graph).unwrap();

        assert_eq!(outcome.artifacts.len(), 3);
        assert_eq!(fake.artifact_fetches_for("g:c:1.0"), 3);
    }

    #[test]
    fn test_integrity_violation_fails_fast_and_never_caches() {
        let fake = populated_fake();
        fake.corrupt_published_checksum("central", "g:a:1.0");
        let (_t, cache) = temp_cache();
        let graph = resolve(&fake, &cache, &["g:a:1.0"]);

        let repos = one_repo();
        let coordinator = FetchCoordinator::new(&fake, &cache, &repos, fast_options(1));
        let err = coordinator.fetch_all(&graph).unwrap_err();

        assert!(matches!(err, JumpstartError::IntegrityViolation { .. }));
        assert!(cache.get(&coord("g:a:1.0"), EntryKind::Artifact).unwrap().is_none());
    }

    #[test]
    fn test_fatal_error_cancels_remaining_work() {
        // Single worker and sorted queue order: the violation on g:a:1.0
        // comes first, cancellation must stop g:b and g:c from being fetched
        let fake = populated_fake();
        fake.corrupt_published_checksum("central", "g:a:1.0");
        let (_t, cache) = temp_cache();
        let graph = resolve(&fake, &cache, &["g:a:1.0"]);

        let repos = one_repo();
        let coordinator = FetchCoordinator::new(&fake, &cache, &repos, fast_options(1));
        let err = coordinator.fetch_all(&graph).unwrap_err();

        assert!(matches!(err, JumpstartError::IntegrityViolation { .. }));
        assert_eq!(fake.artifact_fetches_for("g:b:1.0"), 0);
        assert_eq!(fake.artifact_fetches_for("g:c:1.0"), 0);
    }

    #[test]
    fn test_unavailable_artifact_is_fatal_by_default() {
        let fake = FakeRepositoryClient::new();
        fake.add_descriptor("central", "g:a:1.0", &[]);
        // No artifact registered
        let (_t, cache) = temp_cache();
        let graph = resolve(&fake, &cache, &["g:a:1.0"]);

        let repos = one_repo();
        let coordinator = FetchCoordinator::new(&fake, &cache, &repos, fast_options(1));
        let err = coordinator.fetch_all(&graph).unwrap_err();
        assert!(matches!(err, JumpstartError::ArtifactUnavailable { .. }));
    }

    #[test]
    fn test_lenient_mode_degrades_unavailable_to_warning() {
        let fake = FakeRepositoryClient::new();
        fake.add_descriptor("central", "g:a:1.0", &["g:b:1.0"]);
        fake.add_descriptor("central", "g:b:1.0", &[]);
        fake.add_artifact("central", "g:a:1.0", b"bytes of a");
        // g:b:1.0 has no artifact anywhere
        let (_t, cache) = temp_cache();
        let graph = resolve(&fake, &cache, &["g:a:1.0"]);

        let repos = one_repo();
        let mut options = fast_options(2);
        options.lenient = true;
        let coordinator = FetchCoordinator::new(&fake, &cache, &repos, options);
        let outcome = coordinator.fetch_all(&graph).unwrap();

        assert_eq!(outcome.artifacts.len(), 1);
        assert_eq!(outcome.warnings.len(), 1);
        assert!(outcome.warnings[0].contains("g:b:1.0"));
    }

    #[test]
    fn test_trust_on_first_use_without_published_checksum() {
        let fake = FakeRepositoryClient::new();
        // Artifact registered before the descriptor, so the descriptor
        // publishes no checksum
        fake.add_artifact("central", "g:a:1.0", b"unattested bytes");
        fake.add_descriptor("central", "g:a:1.0", &[]);
        let (_t, cache) = temp_cache();
        let graph = resolve(&fake, &cache, &["g:a:1.0"]);

        let repos = one_repo();
        let coordinator = FetchCoordinator::new(&fake, &cache, &repos, fast_options(1));
        let outcome = coordinator.fetch_all(&graph).unwrap();

        assert_eq!(outcome.artifacts.len(), 1);
        // The computed hash became the trust baseline in the cache entry
        let entry = cache.get(&coord("g:a:1.0"), EntryKind::Artifact).unwrap().unwrap();
        assert_eq!(entry.checksum, hash::hash_bytes(b"unattested bytes"));
    }

    #[test]
    fn test_duplicate_coordinates_collapse_to_one_fetch() {
        let fake = FakeRepositoryClient::new();
        fake.add_descriptor("central", "g:a:1.0", &[]);
        fake.add_artifact("central", "g:a:1.0", b"bytes");
        let (_t, cache) = temp_cache();
        // Cache the descriptor so published_checksum is available
        resolve(&fake, &cache, &["g:a:1.0"]);

        let repos = one_repo();
        let coordinator = FetchCoordinator::new(&fake, &cache, &repos, fast_options(4));
        let duplicates = vec![coord("g:a:1.0"); 8];
        let outcome = coordinator.fetch_set(duplicates).unwrap();

        assert_eq!(outcome.artifacts.len(), 1);
        // One network fetch; every other claim either waited on the owner
        // or hit the cache entry the owner wrote
        assert_eq!(fake.artifact_fetches_for("g:a:1.0"), 1);
    }

    #[test]
    fn test_concurrent_fetch_of_many_artifacts() {
        let fake = FakeRepositoryClient::new();
        let names: Vec<String> = (0..20).map(|i| format!("g:art{i}:1.0")).collect();
        for name in &names {
            fake.add_descriptor("central", name, &[]);
            fake.add_artifact("central", name, name.as_bytes());
        }
        let roots: Vec<&str> = names.iter().map(String::as_str).collect();
        let (_t, cache) = temp_cache();
        let graph = resolve(&fake, &cache, &roots);

        let repos = one_repo();
        let coordinator = FetchCoordinator::new(&fake, &cache, &repos, fast_options(8));
        let outcome = coordinator.fetch_all(&graph).unwrap();

        assert_eq!(outcome.artifacts.len(), 20);
        assert_eq!(fake.artifact_fetches(), 20);
    }
}
