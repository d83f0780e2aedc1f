//! Core domain types shared across the bootstrap pipeline
//!
//! A [`Coordinate`] uniquely identifies a dependency's descriptor and primary
//! artifact. [`GroupArtifact`] is the conflict-resolution key: the resolver
//! guarantees at most one version per group:artifact in the final graph.

use std::fmt;

use crate::error::{JumpstartError, Result};

/// A (group, artifact, version) triple identifying a dependency.
///
/// Equality, hashing and ordering derive from all three fields. The `Ord`
/// implementation (group, then artifact, then version, all lexical) is what
/// makes activation-order tie-breaking deterministic.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Coordinate {
    pub group: String,
    pub artifact: String,
    pub version: String,
}

impl Coordinate {
    pub fn new(group: &str, artifact: &str, version: &str) -> Self {
        Self {
            group: group.to_string(),
            artifact: artifact.to_string(),
            version: version.to_string(),
        }
    }

    /// Parse a `group:artifact:version` string.
    ///
    /// All three segments must be non-empty and must not contain further
    /// colons (classifier/extension syntax is out of scope). Coordinates map
    /// onto repository URLs and cache paths, so every path component derived
    /// from one (each dot-separated group segment, the artifact, the version)
    /// must be a plain file name: `.`, `..` and path separators are rejected.
    /// Descriptors fetched from the network declare dependency coordinates,
    /// which makes this the trust boundary for cache layout.
    pub fn parse(input: &str) -> Result<Self> {
        let parts: Vec<&str> = input.split(':').collect();
        if let [group, artifact, version] = parts.as_slice() {
            let group_ok = group.split('.').all(is_plain_file_name);
            if group_ok && is_plain_file_name(artifact) && is_plain_file_name(version) {
                return Ok(Self::new(group, artifact, version));
            }
        }
        Err(JumpstartError::InvalidCoordinate {
            input: input.to_string(),
        })
    }

    /// The conflict-resolution key for this coordinate.
    pub fn group_artifact(&self) -> GroupArtifact {
        GroupArtifact {
            group: self.group.clone(),
            artifact: self.artifact.clone(),
        }
    }

    /// Relative repository/cache path for this coordinate's directory.
    ///
    /// Dots in the group are path separators, Maven-layout style:
    /// `com.example:widget:1.2.0` -> `com/example/widget/1.2.0`.
    pub fn relative_dir(&self) -> std::path::PathBuf {
        let mut path = std::path::PathBuf::new();
        for segment in self.group.split('.') {
            path.push(segment);
        }
        path.push(&self.artifact);
        path.push(&self.version);
        path
    }

    /// File stem shared by this coordinate's descriptor and artifact files.
    pub fn file_stem(&self) -> String {
        format!("{}-{}", self.artifact, self.version)
    }
}

fn is_plain_file_name(segment: &str) -> bool {
    !segment.is_empty() && segment != "." && segment != ".." && !segment.contains(['/', '\\'])
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.group, self.artifact, self.version)
    }
}

/// The version-independent identity of a dependency.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GroupArtifact {
    pub group: String,
    pub artifact: String,
}

impl fmt::Display for GroupArtifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.group, self.artifact)
    }
}

/// A remote repository. Lookup priority is declaration order in the manifest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryDescriptor {
    pub id: String,
    pub url: String,
}

impl RepositoryDescriptor {
    pub fn new(id: &str, url: &str) -> Self {
        Self {
            id: id.to_string(),
            url: url.to_string(),
        }
    }
}

/// Metadata document for one coordinate, parsed from a fetched descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyDescriptor {
    pub coordinate: Coordinate,
    /// Direct dependencies, in declared order.
    pub dependencies: Vec<Coordinate>,
    /// Publisher checksum of the artifact bytes, when the repository provides
    /// one. Absent means trust-on-first-use.
    pub artifact_checksum: Option<String>,
    /// Id of the repository that served this descriptor.
    pub origin: String,
}
