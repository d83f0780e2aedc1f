//! Transitive dependency resolution
//!
//! Breadth-first traversal from the manifest roots. Descriptors come from
//! the cache first, then from each repository in priority order (with
//! retries), and are written back to the cache on success.
//!
//! Conflict policy: when two versions of the same group:artifact meet, the
//! version nearest to a root wins; at equal depth the first-declared root
//! wins. FIFO breadth-first order makes the first-encountered version exactly
//! that winner, so losers are simply discarded and their parents' edges
//! rewired to the winning coordinate. Losing subtrees are never resolved.
//!
//! Cycle detection is a parent-chain membership test: a child coordinate
//! equal to one of its own ancestors fails resolution with the offending
//! path. Cycles are an error, never silently broken.

pub mod sort;

use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};

use crate::cache::{CacheStore, EntryKind};
use crate::domain::{Coordinate, DependencyDescriptor, GroupArtifact, RepositoryDescriptor};
use crate::error::{JumpstartError, Result};
use crate::hash;
use crate::manifest::Manifest;
use crate::repository::{RepositoryClient, parse_descriptor, render_descriptor};
use crate::repository::retry::{RetryPolicy, with_retries};

/// Why a node's version was selected for its group:artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectionReason {
    /// Declared directly in the manifest (index is manifest order).
    Root { index: usize },
    /// First version of its group:artifact encountered, at this depth.
    Nearest { depth: usize },
}

/// One node of the resolved graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedNode {
    pub coordinate: Coordinate,
    /// Outgoing edges, already rewired to conflict winners.
    pub children: BTreeSet<Coordinate>,
    pub depth: usize,
    pub selected_by: SelectionReason,
}

/// The acyclic, version-deduplicated dependency graph. Built once per
/// bootstrap run, read-only afterward.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedGraph {
    /// Manifest roots (rewired to winners), in declaration order.
    pub roots: Vec<Coordinate>,
    pub nodes: BTreeMap<Coordinate, ResolvedNode>,
}

impl ResolvedGraph {
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Coordinates in activation order: leaves first, lexical tie-break.
    pub fn activation_order(&self) -> Result<Vec<Coordinate>> {
        sort::activation_order(self)
    }
}

struct QueueItem {
    coordinate: Coordinate,
    depth: usize,
    parent: Option<Coordinate>,
}

/// Dependency resolver. Holds the memoization map so each unique coordinate's
/// descriptor is fetched at most once per run, however many parents name it.
pub struct Resolver<'a> {
    client: &'a dyn RepositoryClient,
    cache: &'a CacheStore,
    repositories: &'a [RepositoryDescriptor],
    retry: RetryPolicy,
    memo: HashMap<Coordinate, DependencyDescriptor>,
}

impl<'a> Resolver<'a> {
    pub fn new(
        client: &'a dyn RepositoryClient,
        cache: &'a CacheStore,
        repositories: &'a [RepositoryDescriptor],
        retry: RetryPolicy,
    ) -> Self {
        Self {
            client,
            cache,
            repositories,
            retry,
            memo: HashMap::new(),
        }
    }

    /// Compute the full transitive graph from the manifest roots.
    pub fn resolve(&mut self, manifest: &Manifest) -> Result<ResolvedGraph> {
        let mut nodes: BTreeMap<Coordinate, ResolvedNode> = BTreeMap::new();
        let mut selected: HashMap<GroupArtifact, Coordinate> = HashMap::new();
        // First-discovery parent of each visited coordinate, for cycle paths
        let mut parents: HashMap<Coordinate, Option<Coordinate>> = HashMap::new();
        let mut roots: Vec<Coordinate> = Vec::new();
        let mut queue: VecDeque<QueueItem> = VecDeque::new();

        for coordinate in &manifest.dependencies {
            queue.push_back(QueueItem {
                coordinate: coordinate.clone(),
                depth: 0,
                parent: None,
            });
        }

        let mut root_index = 0;
        while let Some(item) = queue.pop_front() {
            let key = item.coordinate.group_artifact();

            // Cycle check precedes everything: an exact coordinate revisiting
            // its own ancestor chain is a declared cycle
            if let Some(parent) = &item.parent {
                if let Some(path) = find_cycle(&item.coordinate, parent, &parents) {
                    return Err(JumpstartError::DependencyCycle {
                        path: render_path(&path),
                    });
                }
            }

            let winner = match selected.get(&key) {
                Some(winner) => winner.clone(),
                None => {
                    selected.insert(key, item.coordinate.clone());
                    item.coordinate.clone()
                }
            };

            // Rewire the parent's edge to the winning version (a no-op when
            // no conflict occurred)
            if let Some(parent) = &item.parent {
                if let Some(node) = nodes.get_mut(parent) {
                    node.children.insert(winner.clone());
                }
            } else {
                root_index += 1;
                if !roots.contains(&winner) {
                    roots.push(winner.clone());
                }
            }

            // Discarded loser, or an already visited winner: subtree is not
            // (re-)resolved
            if winner != item.coordinate || nodes.contains_key(&item.coordinate) {
                continue;
            }

            let selected_by = if item.parent.is_none() {
                SelectionReason::Root {
                    index: root_index - 1,
                }
            } else {
                SelectionReason::Nearest { depth: item.depth }
            };

            let descriptor = self.descriptor_for(&item.coordinate)?;
            parents.insert(item.coordinate.clone(), item.parent.clone());
            nodes.insert(
                item.coordinate.clone(),
                ResolvedNode {
                    coordinate: item.coordinate.clone(),
                    children: BTreeSet::new(),
                    depth: item.depth,
                    selected_by,
                },
            );

            for child in &descriptor.dependencies {
                queue.push_back(QueueItem {
                    coordinate: child.clone(),
                    depth: item.depth + 1,
                    parent: Some(item.coordinate.clone()),
                });
            }
        }

        // Rewiring a loser's edge to the winning version can close a loop
        // the parent-chain test never sees (the chain only tracks declared
        // edges), so the final edge set is checked for acyclicity too
        if let Some(path) = find_rewired_cycle(&nodes) {
            return Err(JumpstartError::DependencyCycle {
                path: render_path(&path),
            });
        }

        Ok(ResolvedGraph { roots, nodes })
    }

    /// Memoized descriptor lookup: memo, then cache, then each repository in
    /// priority order with retries, writing back to the cache on success.
    fn descriptor_for(&mut self, coordinate: &Coordinate) -> Result<DependencyDescriptor> {
        if let Some(descriptor) = self.memo.get(coordinate) {
            return Ok(descriptor.clone());
        }

        if let Some(entry) = self.cache.get(coordinate, EntryKind::Descriptor)? {
            let bytes = std::fs::read(&entry.local_path).map_err(|e| {
                JumpstartError::FileReadFailed {
                    path: entry.local_path.display().to_string(),
                    reason: e.to_string(),
                }
            })?;
            let descriptor = parse_descriptor(&bytes, coordinate, "cache", "cache")
                .map_err(|e| JumpstartError::CacheCorrupted {
                    coordinate: coordinate.to_string(),
                    reason: e.to_string(),
                })?;
            self.memo.insert(coordinate.clone(), descriptor.clone());
            return Ok(descriptor);
        }

        let mut attempted: Vec<String> = Vec::new();
        for repository in self.repositories {
            let outcome = with_retries(&self.retry, |_| {
                self.client.fetch_descriptor(coordinate, repository)
            });
            match outcome {
                Ok(Some(descriptor)) => {
                    let bytes = render_descriptor(&descriptor);
                    let checksum = hash::hash_bytes(&bytes);
                    self.cache
                        .put(coordinate, EntryKind::Descriptor, &bytes, &checksum)?;
                    self.memo.insert(coordinate.clone(), descriptor.clone());
                    return Ok(descriptor);
                }
                Ok(None) => {
                    attempted.push(format!("{} (not found)", repository.id));
                }
                Err(JumpstartError::TransportExhausted { attempts, .. }) => {
                    attempted.push(format!(
                        "{} (transport exhausted after {attempts} attempts)",
                        repository.id
                    ));
                }
                Err(other) => return Err(other),
            }
        }

        Err(JumpstartError::Unresolvable {
            coordinate: coordinate.to_string(),
            attempted: attempted.join(", "),
        })
    }
}

/// Walk the first-discovery parent chain upward from `parent`; if `child`
/// appears among its own ancestors, return the cycle path
/// `child -> ... -> parent -> child` in dependency direction.
fn find_cycle(
    child: &Coordinate,
    parent: &Coordinate,
    parents: &HashMap<Coordinate, Option<Coordinate>>,
) -> Option<Vec<Coordinate>> {
    // Chain from the immediate parent up toward the root
    let mut upward = vec![parent.clone()];
    let mut current = parent.clone();
    while let Some(Some(next)) = parents.get(&current) {
        upward.push(next.clone());
        current = next.clone();
    }

    let position = upward.iter().position(|ancestor| ancestor == child)?;

    // Ancestors from `child` down to `parent`, then back to `child`
    let mut path: Vec<Coordinate> = upward[..=position].iter().rev().cloned().collect();
    path.push(child.clone());
    Some(path)
}

/// Depth-first search over the final (rewired) edge set. Returns the first
/// cycle found as `start -> ... -> start`, or `None` when the graph is
/// acyclic.
fn find_rewired_cycle(nodes: &BTreeMap<Coordinate, ResolvedNode>) -> Option<Vec<Coordinate>> {
    #[derive(Clone, Copy, PartialEq)]
    enum Mark {
        InProgress,
        Done,
    }

    fn visit(
        coordinate: &Coordinate,
        nodes: &BTreeMap<Coordinate, ResolvedNode>,
        marks: &mut HashMap<Coordinate, Mark>,
        path: &mut Vec<Coordinate>,
    ) -> Option<Vec<Coordinate>> {
        match marks.get(coordinate).copied() {
            Some(Mark::Done) => return None,
            Some(Mark::InProgress) => {
                let start = path.iter().position(|c| c == coordinate)?;
                let mut cycle: Vec<Coordinate> = path[start..].to_vec();
                cycle.push(coordinate.clone());
                return Some(cycle);
            }
            None => {}
        }

        marks.insert(coordinate.clone(), Mark::InProgress);
        path.push(coordinate.clone());
        if let Some(node) = nodes.get(coordinate) {
            for child in &node.children {
                if let Some(cycle) = visit(child, nodes, marks, path) {
                    return Some(cycle);
                }
            }
        }
        path.pop();
        marks.insert(coordinate.clone(), Mark::Done);
        None
    }

    let mut marks = HashMap::new();
    let mut path = Vec::new();
    for coordinate in nodes.keys() {
        if let Some(cycle) = visit(coordinate, nodes, &mut marks, &mut path) {
            return Some(cycle);
        }
    }
    None
}

fn render_path(path: &[Coordinate]) -> String {
    path.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(" -> ")
}
