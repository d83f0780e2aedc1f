//! Remote repository access
//!
//! A repository serves two document kinds per coordinate, laid out
//! Maven-style under its base URL:
//!
//! ```text
//! <base>/<group as path>/<artifact>/<version>/<artifact>-<version>.json   descriptor
//! <base>/<group as path>/<artifact>/<version>/<artifact>-<version>.bin    artifact
//! ```
//!
//! [`RepositoryClient`] is pure I/O: `Ok(None)` means the repository does not
//! serve the coordinate (the caller tries the next repository in priority
//! order), `Err` is a transport failure (retried by the caller per the
//! backoff policy). No caching, no side effects beyond the network.

pub mod http;
pub mod retry;

use serde::Deserialize;

use crate::domain::{Coordinate, DependencyDescriptor, RepositoryDescriptor};
use crate::error::{JumpstartError, Result};

/// Highest descriptor schema revision this client understands.
pub const SUPPORTED_SCHEMA: u32 = 1;

/// Fetches dependency descriptors and artifact bytes from a remote
/// repository. `Sync` so fetch workers can share one client.
pub trait RepositoryClient: Sync {
    /// Fetch and parse the descriptor for `coordinate` from `repository`.
    fn fetch_descriptor(
        &self,
        coordinate: &Coordinate,
        repository: &RepositoryDescriptor,
    ) -> Result<Option<DependencyDescriptor>>;

    /// Fetch the primary artifact bytes for `coordinate` from `repository`.
    fn fetch_artifact(
        &self,
        coordinate: &Coordinate,
        repository: &RepositoryDescriptor,
    ) -> Result<Option<Vec<u8>>>;
}

/// Wire shape of a descriptor document.
#[derive(Debug, Deserialize)]
struct DescriptorDocument {
    schema: u32,
    coordinate: String,
    #[serde(default)]
    dependencies: Vec<String>,
    #[serde(default)]
    checksum: Option<String>,
}

/// Parse a descriptor document fetched for `coordinate` from the repository
/// identified by `origin`.
///
/// A document naming a different coordinate than the one requested, or a
/// schema revision newer than [`SUPPORTED_SCHEMA`], is treated as a transport
/// failure for that repository rather than a not-found.
pub fn parse_descriptor(
    bytes: &[u8],
    coordinate: &Coordinate,
    origin: &str,
    url: &str,
) -> Result<DependencyDescriptor> {
    let document: DescriptorDocument =
        serde_json::from_slice(bytes).map_err(|e| JumpstartError::Transport {
            url: url.to_string(),
            reason: format!("invalid descriptor document: {e}"),
        })?;

    if document.schema > SUPPORTED_SCHEMA {
        return Err(JumpstartError::Transport {
            url: url.to_string(),
            reason: format!(
                "descriptor schema {} is newer than supported {}",
                document.schema, SUPPORTED_SCHEMA
            ),
        });
    }

    let declared = Coordinate::parse(&document.coordinate)?;
    if &declared != coordinate {
        return Err(JumpstartError::Transport {
            url: url.to_string(),
            reason: format!("descriptor declares {declared}, expected {coordinate}"),
        });
    }

    let mut dependencies = Vec::with_capacity(document.dependencies.len());
    for raw in &document.dependencies {
        dependencies.push(Coordinate::parse(raw)?);
    }

    Ok(DependencyDescriptor {
        coordinate: declared,
        dependencies,
        artifact_checksum: document.checksum,
        origin: origin.to_string(),
    })
}

/// Render a descriptor back into its canonical wire form, used when the
/// resolver writes a freshly fetched descriptor into the cache.
pub fn render_descriptor(descriptor: &DependencyDescriptor) -> Vec<u8> {
    let document = serde_json::json!({
        "schema": SUPPORTED_SCHEMA,
        "coordinate": descriptor.coordinate.to_string(),
        "dependencies": descriptor
            .dependencies
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>(),
        "checksum": descriptor.artifact_checksum,
    });
    document.to_string().into_bytes()
}

/// Build the URL for a coordinate's descriptor or artifact file.
pub fn resource_url(base: &str, coordinate: &Coordinate, extension: &str) -> String {
    let base = base.trim_end_matches('/');
    let group_path = coordinate.group.replace('.', "/");
    format!(
        "{base}/{group_path}/{artifact}/{version}/{stem}.{extension}",
        artifact = coordinate.artifact,
        version = coordinate.version,
        stem = coordinate.file_stem(),
    )
}
