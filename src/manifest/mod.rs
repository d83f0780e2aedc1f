//! Dependency manifest parsing
//!
//! The manifest is produced by an external build-time collaborator and
//! consumed once at bootstrap. Expected JSON shape:
//!
//! ```json
//! {
//!   "dependencies": ["com.example:widget:1.2.0"],
//!   "repositories": [{ "id": "central", "url": "https://repo.example.org/" }]
//! }
//! ```
//!
//! Malformed or missing fields fail bootstrap immediately, before any
//! network activity. The manifest is immutable for the duration of one run.

use std::path::Path;

use serde::Deserialize;

use crate::domain::{Coordinate, RepositoryDescriptor};
use crate::error::{JumpstartError, Result};

/// Fallback repository when the manifest declares none, matching the
/// manifest producer's behavior.
pub const DEFAULT_REPOSITORY_ID: &str = "central";
pub const DEFAULT_REPOSITORY_URL: &str = "https://repo.maven.apache.org/maven2/";

/// Raw wire shape; validated into [`Manifest`] after deserialization.
#[derive(Debug, Deserialize)]
struct ManifestDocument {
    dependencies: Vec<String>,
    #[serde(default)]
    repositories: Vec<RepositoryEntry>,
}

#[derive(Debug, Deserialize)]
struct RepositoryEntry {
    id: String,
    url: String,
}

/// The declarative list of root dependencies and repositories.
#[derive(Debug, Clone)]
pub struct Manifest {
    /// Root coordinates, in declaration order (the conflict tie-break order).
    pub dependencies: Vec<Coordinate>,
    /// Repositories in descending lookup priority.
    pub repositories: Vec<RepositoryDescriptor>,
}

impl Manifest {
    /// Load and parse a manifest file.
    pub fn load(path: &Path) -> Result<Self> {
        let content =
            std::fs::read_to_string(path).map_err(|e| JumpstartError::ManifestUnreadable {
                path: path.display().to_string(),
                reason: e.to_string(),
            })?;
        Self::parse(&content, &path.display().to_string())
    }

    /// Parse manifest JSON. `origin` names the source in error messages.
    pub fn parse(json: &str, origin: &str) -> Result<Self> {
        let document: ManifestDocument =
            serde_json::from_str(json).map_err(|e| JumpstartError::ManifestMalformed {
                path: origin.to_string(),
                reason: e.to_string(),
            })?;

        let mut dependencies = Vec::with_capacity(document.dependencies.len());
        for raw in &document.dependencies {
            let coordinate =
                Coordinate::parse(raw).map_err(|_| JumpstartError::ManifestMalformed {
                    path: origin.to_string(),
                    reason: format!("invalid coordinate '{raw}'"),
                })?;
            dependencies.push(coordinate);
        }

        if dependencies.is_empty() {
            return Err(JumpstartError::ManifestMalformed {
                path: origin.to_string(),
                reason: "manifest declares no dependencies".to_string(),
            });
        }

        let mut repositories: Vec<RepositoryDescriptor> = document
            .repositories
            .iter()
            .map(|r| RepositoryDescriptor::new(&r.id, &r.url))
            .collect();

        if repositories.is_empty() {
            repositories.push(RepositoryDescriptor::new(
                DEFAULT_REPOSITORY_ID,
                DEFAULT_REPOSITORY_URL,
            ));
        }

        Ok(Self {
            dependencies,
            repositories,
        })
    }
}
