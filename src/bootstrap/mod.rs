//! Bootstrap orchestration
//!
//! Drives one full boot: resolve the manifest's dependency closure, fetch
//! every selected artifact, then activate the code in dependency order.
//! The lifecycle is a one-way state machine; a failed boot stays failed and
//! a fresh [`Bootstrap`] is needed to try again.

use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::cache::CacheStore;
use crate::domain::Coordinate;
use crate::error::Result;
use crate::fetch::{FetchCoordinator, FetchOptions, default_workers};
use crate::loader::{ActivationUnit, Loader};
use crate::manifest::Manifest;
use crate::repository::RepositoryClient;
use crate::repository::retry::RetryPolicy;
use crate::resolver::Resolver;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Uninitialized,
    Resolving,
    Fetching,
    Activated,
    Failed,
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Phase::Uninitialized => "uninitialized",
            Phase::Resolving => "resolving",
            Phase::Fetching => "fetching",
            Phase::Activated => "activated",
            Phase::Failed => "failed",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone)]
pub struct BootOptions {
    pub workers: usize,
    pub retry: RetryPolicy,
    /// Skip unavailable artifacts instead of failing the boot.
    pub lenient: bool,
    pub show_progress: bool,
}

impl Default for BootOptions {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            retry: RetryPolicy::default(),
            lenient: false,
            show_progress: false,
        }
    }
}

/// What a completed boot did.
#[derive(Debug)]
pub struct BootReport {
    /// Selected coordinates and their local artifact paths.
    pub artifacts: BTreeMap<Coordinate, PathBuf>,
    /// Coordinates activated, in activation order.
    pub activated: Vec<Coordinate>,
    /// Artifacts served from the cache without a network fetch.
    pub cached_hits: usize,
    /// Lenient-mode skips.
    pub warnings: Vec<String>,
}

pub struct Bootstrap<'a> {
    client: &'a dyn RepositoryClient,
    cache: &'a CacheStore,
    loader: &'a mut dyn Loader,
    options: BootOptions,
    phase: Phase,
}

impl<'a> Bootstrap<'a> {
    pub fn new(
        client: &'a dyn RepositoryClient,
        cache: &'a CacheStore,
        loader: &'a mut dyn Loader,
        options: BootOptions,
    ) -> Self {
        Self {
            client,
            cache,
            loader,
            options,
            phase: Phase::Uninitialized,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Run the full boot sequence for `manifest`.
    pub fn run(&mut self, manifest: &Manifest) -> Result<BootReport> {
        match self.execute(manifest) {
            Ok(report) => {
                self.phase = Phase::Activated;
                Ok(report)
            }
            Err(error) => {
                self.phase = Phase::Failed;
                Err(error)
            }
        }
    }

    fn execute(&mut self, manifest: &Manifest) -> Result<BootReport> {
        self.phase = Phase::Resolving;
        let mut resolver = Resolver::new(
            self.client,
            self.cache,
            &manifest.repositories,
            self.options.retry,
        );
        let graph = resolver.resolve(manifest)?;
        let order = graph.activation_order()?;

        self.phase = Phase::Fetching;
        let coordinator = FetchCoordinator::new(
            self.client,
            self.cache,
            &manifest.repositories,
            FetchOptions {
                workers: self.options.workers,
                retry: self.options.retry,
                lenient: self.options.lenient,
                show_progress: self.options.show_progress,
            },
        );
        let outcome = coordinator.fetch_all(&graph)?;

        // Leniently skipped artifacts simply drop out of the activation list
        let units: Vec<ActivationUnit> = order
            .iter()
            .filter_map(|coordinate| {
                outcome
                    .artifacts
                    .get(coordinate)
                    .map(|path| ActivationUnit::new(coordinate.clone(), path.clone()))
            })
            .collect();
        self.loader.activate(&units)?;

        Ok(BootReport {
            activated: units.into_iter().map(|unit| unit.coordinate).collect(),
            artifacts: outcome.artifacts,
            cached_hits: outcome.cached_hits,
            warnings: outcome.warnings,
        })
    }
}
