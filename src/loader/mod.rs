//! Dynamic code activation
//!
//! Once artifacts are materialized locally, activation brings their code
//! into the running process in dependency order. [`Loader`] is the seam:
//! the real implementation loads shared libraries, while tests substitute a
//! recording double.
//!
//! One version per `group:artifact` may ever be active in a process.
//! Activating the same coordinate twice is a no-op; activating a different
//! version of an already active `group:artifact` is a hard error, because
//! the process cannot unload the first one safely.

use std::collections::HashMap;
use std::path::PathBuf;

use libloading::Library;

use crate::domain::{Coordinate, GroupArtifact};
use crate::error::{JumpstartError, Result};

/// Optional entry point looked up in each loaded library.
const INIT_SYMBOL: &[u8] = b"jumpstart_init";

/// One artifact ready for activation: its identity and local payload path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivationUnit {
    pub coordinate: Coordinate,
    pub path: PathBuf,
}

impl ActivationUnit {
    pub fn new(coordinate: Coordinate, path: PathBuf) -> Self {
        Self { coordinate, path }
    }
}

/// Activates code units in the order given.
pub trait Loader {
    fn activate(&mut self, units: &[ActivationUnit]) -> Result<()>;
}

/// Loads artifacts as shared libraries and keeps their handles alive for
/// the lifetime of the loader.
#[derive(Default)]
pub struct LibraryLoader {
    libraries: Vec<(Coordinate, Library)>,
    active: HashMap<GroupArtifact, Coordinate>,
}

impl LibraryLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Coordinates currently active, in activation order.
    pub fn active(&self) -> impl Iterator<Item = &Coordinate> {
        self.libraries.iter().map(|(coordinate, _)| coordinate)
    }

    /// Check the whole batch against the one-version-per-`group:artifact`
    /// rule before touching the dynamic linker, so a clash never leaves a
    /// half-activated batch behind.
    fn validate(&self, units: &[ActivationUnit]) -> Result<()> {
        let mut pending: HashMap<GroupArtifact, &Coordinate> = HashMap::new();
        for unit in units {
            let key = unit.coordinate.group_artifact();
            if let Some(active) = self.active.get(&key) {
                if *active != unit.coordinate {
                    return Err(JumpstartError::VersionClash {
                        coordinate: unit.coordinate.to_string(),
                        active: active.to_string(),
                    });
                }
            }
            if let Some(seen) = pending.get(&key) {
                if **seen != unit.coordinate {
                    return Err(JumpstartError::VersionClash {
                        coordinate: unit.coordinate.to_string(),
                        active: seen.to_string(),
                    });
                }
            }
            pending.insert(key, &unit.coordinate);
        }
        Ok(())
    }

    fn load_one(&mut self, unit: &ActivationUnit) -> Result<()> {
        // SAFETY: loading a library runs its initializers; the caller opted
        // into executing this artifact by listing it in the manifest.
        let library = unsafe { Library::new(&unit.path) }.map_err(|e| {
            JumpstartError::ActivationFailure {
                coordinate: unit.coordinate.to_string(),
                reason: e.to_string(),
            }
        })?;

        // SAFETY: the entry point takes no arguments and returns nothing;
        // libraries without one are fine.
        unsafe {
            if let Ok(init) = library.get::<unsafe extern "C" fn()>(INIT_SYMBOL) {
                init();
            }
        }

        self.active
            .insert(unit.coordinate.group_artifact(), unit.coordinate.clone());
        self.libraries.push((unit.coordinate.clone(), library));
        Ok(())
    }
}

impl Loader for LibraryLoader {
    fn activate(&mut self, units: &[ActivationUnit]) -> Result<()> {
        self.validate(units)?;
        for unit in units {
            // Re-activating the exact same coordinate is a no-op
            if self
                .active
                .get(&unit.coordinate.group_artifact())
                .is_some_and(|active| *active == unit.coordinate)
            {
                continue;
            }
            self.load_one(unit)?;
        }
        Ok(())
    }
}
