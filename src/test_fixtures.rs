//! Shared fixtures for unit tests: an in-memory repository client and a
//! recording loader.

#![allow(clippy::unwrap_used)]

use std::collections::HashMap;
use std::sync::Mutex;

use crate::domain::{Coordinate, DependencyDescriptor, RepositoryDescriptor};
use crate::error::{JumpstartError, Result};
use crate::hash;
use crate::loader::{ActivationUnit, Loader};
use crate::repository::RepositoryClient;

#[derive(Clone)]
struct FakeDescriptor {
    dependencies: Vec<Coordinate>,
    checksum: Option<String>,
}

/// In-memory repository serving scripted descriptors and artifacts, with
/// call counting and scripted transport failures.
#[derive(Default)]
pub struct FakeRepositoryClient {
    descriptors: Mutex<HashMap<(String, Coordinate), FakeDescriptor>>,
    artifacts: Mutex<HashMap<(String, Coordinate), Vec<u8>>>,
    /// Remaining transport failures per coordinate before success
    artifact_failures: Mutex<HashMap<Coordinate, u32>>,
    descriptor_failures: Mutex<HashMap<Coordinate, u32>>,
    descriptor_calls: Mutex<Vec<Coordinate>>,
    artifact_calls: Mutex<Vec<Coordinate>>,
}

impl FakeRepositoryClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a descriptor in `repo` for `coordinate`, with the given
    /// direct dependencies.
    pub fn add_descriptor(&self, repo: &str, coordinate: &str, dependencies: &[&str]) {
        let coordinate = Coordinate::parse(coordinate).unwrap();
        let dependencies = dependencies
            .iter()
            .map(|d| Coordinate::parse(d).unwrap())
            .collect();
        self.descriptors.lock().unwrap().insert(
            (repo.to_string(), coordinate),
            FakeDescriptor {
                dependencies,
                checksum: None,
            },
        );
    }

    /// Register artifact bytes in `repo` and publish their checksum in the
    /// coordinate's descriptor.
    pub fn add_artifact(&self, repo: &str, coordinate: &str, bytes: &[u8]) {
        let coordinate = Coordinate::parse(coordinate).unwrap();
        let checksum = hash::hash_bytes(bytes);
        if let Some(descriptor) = self
            .descriptors
            .lock()
            .unwrap()
            .get_mut(&(repo.to_string(), coordinate.clone()))
        {
            descriptor.checksum = Some(checksum);
        }
        self.artifacts
            .lock()
            .unwrap()
            .insert((repo.to_string(), coordinate), bytes.to_vec());
    }

    /// Publish a descriptor checksum that will NOT match the artifact bytes.
    pub fn corrupt_published_checksum(&self, repo: &str, coordinate: &str) {
        let coordinate = Coordinate::parse(coordinate).unwrap();
        if let Some(descriptor) = self
            .descriptors
            .lock()
            .unwrap()
            .get_mut(&(repo.to_string(), coordinate))
        {
            descriptor.checksum = Some("blake3:deadbeef".to_string());
        }
    }

    /// Make the next `times` artifact fetches for `coordinate` fail with a
    /// transport error.
    pub fn fail_artifact_times(&self, coordinate: &str, times: u32) {
        let coordinate = Coordinate::parse(coordinate).unwrap();
        self.artifact_failures
            .lock()
            .unwrap()
            .insert(coordinate, times);
    }

    /// Make the next `times` descriptor fetches for `coordinate` fail with a
    /// transport error.
    pub fn fail_descriptor_times(&self, coordinate: &str, times: u32) {
        let coordinate = Coordinate::parse(coordinate).unwrap();
        self.descriptor_failures
            .lock()
            .unwrap()
            .insert(coordinate, times);
    }

    pub fn descriptor_fetches(&self) -> usize {
        self.descriptor_calls.lock().unwrap().len()
    }

    pub fn artifact_fetches(&self) -> usize {
        self.artifact_calls.lock().unwrap().len()
    }

    pub fn artifact_fetches_for(&self, coordinate: &str) -> usize {
        let coordinate = Coordinate::parse(coordinate).unwrap();
        self.artifact_calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| **c == coordinate)
            .count()
    }

    fn take_failure(
        failures: &Mutex<HashMap<Coordinate, u32>>,
        coordinate: &Coordinate,
    ) -> bool {
        let mut failures = failures.lock().unwrap();
        match failures.get_mut(coordinate) {
            Some(remaining) if *remaining > 0 => {
                *remaining -= 1;
                true
            }
            _ => false,
        }
    }
}

impl RepositoryClient for FakeRepositoryClient {
    fn fetch_descriptor(
        &self,
        coordinate: &Coordinate,
        repository: &RepositoryDescriptor,
    ) -> Result<Option<DependencyDescriptor>> {
        self.descriptor_calls.lock().unwrap().push(coordinate.clone());

        if Self::take_failure(&self.descriptor_failures, coordinate) {
            return Err(JumpstartError::Transport {
                url: format!("fake://{}/{coordinate}", repository.id),
                reason: "scripted failure".to_string(),
            });
        }

        let descriptors = self.descriptors.lock().unwrap();
        Ok(descriptors
            .get(&(repository.id.clone(), coordinate.clone()))
            .map(|fake| DependencyDescriptor {
                coordinate: coordinate.clone(),
                dependencies: fake.dependencies.clone(),
                artifact_checksum: fake.checksum.clone(),
                origin: repository.id.clone(),
            }))
    }

    fn fetch_artifact(
        &self,
        coordinate: &Coordinate,
        repository: &RepositoryDescriptor,
    ) -> Result<Option<Vec<u8>>> {
        self.artifact_calls.lock().unwrap().push(coordinate.clone());

        if Self::take_failure(&self.artifact_failures, coordinate) {
            return Err(JumpstartError::Transport {
                url: format!("fake://{}/{coordinate}", repository.id),
                reason: "scripted failure".to_string(),
            });
        }

        let artifacts = self.artifacts.lock().unwrap();
        Ok(artifacts
            .get(&(repository.id.clone(), coordinate.clone()))
            .cloned())
    }
}

/// Loader that records activation order instead of touching the process.
#[derive(Default)]
pub struct RecordingLoader {
    pub activated: Vec<Coordinate>,
}

impl Loader for RecordingLoader {
    fn activate(&mut self, units: &[ActivationUnit]) -> Result<()> {
        for unit in units {
            self.activated.push(unit.coordinate.clone());
        }
        Ok(())
    }
}

/// Single fake repository descriptor most tests use.
pub fn one_repo() -> Vec<RepositoryDescriptor> {
    vec![RepositoryDescriptor::new("central", "fake://central/")]
}
