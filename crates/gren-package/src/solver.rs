//! Dependency resolution
//!
//! Backtracking depth-first search over published versions, newest first.
//! Candidate metadata comes from the local package cache when present and
//! from the registry otherwise. If the registry becomes unreachable the
//! whole search is retried against the cache alone; failing *that* is
//! reported as `NoOfflineSolution`, which renders differently from an
//! ordinary `NoSolution`.

use crate::constraint::Constraint;
use crate::name::PackageName;
use crate::outline::{OutlineError, PkgOutline};
use crate::platform::Platform;
use crate::registry::{PackageCache, Registry, RegistryError};
use crate::version::Version;
use indexmap::IndexMap;
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::{debug, trace};

/// How the solver may talk to the outside world.
#[derive(Clone, Copy)]
pub enum Connection<'a> {
    Online(&'a dyn Registry),
    Offline,
}

/// A complete version assignment covering every transitive dependency.
pub type Solution = BTreeMap<PackageName, Selection>;

/// One selected package: its version and the direct constraints it declared
/// at that version (kept for fingerprinting).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    pub version: Version,
    pub constraints: BTreeMap<PackageName, Constraint>,
}

#[derive(Debug, PartialEq, Eq)]
pub enum Outcome {
    Solved(Solution),
    NoSolution,
    /// The registry was unreachable and the cache alone cannot satisfy the
    /// constraints either.
    NoOfflineSolution,
}

#[derive(Debug, Error)]
pub enum SolverError {
    #[error("the cached gren.json for {package} {version} is unreadable: {source}")]
    BadCachedOutline {
        package: PackageName,
        version: Version,
        source: OutlineError,
    },

    #[error("failed to fetch {package} {version}: {source}")]
    Fetch {
        package: PackageName,
        version: Version,
        source: RegistryError,
    },

    #[error("failed to look up versions of {package}: {source}")]
    Versions {
        package: PackageName,
        source: RegistryError,
    },
}

enum Abort {
    Fatal(SolverError),
    RegistryDown,
}

pub struct Solver<'a> {
    cache: &'a PackageCache,
    connection: Connection<'a>,
    root_platform: Platform,
}

impl<'a> Solver<'a> {
    pub fn new(
        cache: &'a PackageCache,
        connection: Connection<'a>,
        root_platform: Platform,
    ) -> Self {
        Self {
            cache,
            connection,
            root_platform,
        }
    }

    /// Find a complete assignment satisfying `constraints` plus everything
    /// they pull in transitively.
    pub fn verify(
        &self,
        constraints: &BTreeMap<PackageName, Constraint>,
    ) -> Result<Outcome, SolverError> {
        let pending: Pending = constraints
            .iter()
            .map(|(name, constraint)| (name.clone(), *constraint))
            .collect();

        match self.connection {
            Connection::Online(_) => {
                match self.explore(pending.clone(), Solution::new(), false) {
                    Ok(Some(solution)) => Ok(Outcome::Solved(solution)),
                    Ok(None) => Ok(Outcome::NoSolution),
                    Err(Abort::Fatal(err)) => Err(err),
                    Err(Abort::RegistryDown) => {
                        debug!("registry unreachable, retrying against the local cache");
                        match self.explore(pending, Solution::new(), true) {
                            Ok(Some(solution)) => Ok(Outcome::Solved(solution)),
                            Ok(None) => Ok(Outcome::NoOfflineSolution),
                            Err(Abort::Fatal(err)) => Err(err),
                            Err(Abort::RegistryDown) => unreachable!("offline search hit registry"),
                        }
                    }
                }
            }
            Connection::Offline => match self.explore(pending, Solution::new(), true) {
                Ok(Some(solution)) => Ok(Outcome::Solved(solution)),
                Ok(None) => Ok(Outcome::NoOfflineSolution),
                Err(Abort::Fatal(err)) => Err(err),
                Err(Abort::RegistryDown) => unreachable!("offline search hit registry"),
            },
        }
    }

    /// Application entry point: exact pins become single-version ranges so
    /// the search has one admissible candidate per pinned package.
    pub fn verify_exact(
        &self,
        pins: &BTreeMap<PackageName, Version>,
    ) -> Result<Outcome, SolverError> {
        let constraints = pins
            .iter()
            .map(|(name, version)| (name.clone(), Constraint::exactly(*version)))
            .collect();
        self.verify(&constraints)
    }

    fn explore(
        &self,
        mut pending: Pending,
        solved: Solution,
        offline: bool,
    ) -> Result<Option<Solution>, Abort> {
        // Pending constraints are visited in introduction order so that
        // equally-valid solutions come out the same way every run.
        let Some((name, constraint)) = pending.shift_remove_index(0) else {
            return Ok(Some(solved));
        };

        if let Some(selection) = solved.get(&name) {
            if constraint.satisfies(selection.version) {
                return self.explore(pending, solved, offline);
            }
            return Ok(None);
        }

        for version in self.candidate_versions(&name, offline)? {
            if !constraint.satisfies(version) {
                continue;
            }
            let Some(outline) = self.candidate_outline(&name, version, offline)? else {
                continue;
            };
            if !Platform::compatible(self.root_platform, outline.platform) {
                trace!(package = %name, %version, platform = %outline.platform,
                       "skipping platform-incompatible candidate");
                continue;
            }
            if !outline.gren_version.good_gren() {
                trace!(package = %name, %version, "skipping compiler-incompatible candidate");
                continue;
            }

            let Some(next_pending) = merge_constraints(&pending, &solved, &outline) else {
                continue;
            };

            let mut next_solved = solved.clone();
            next_solved.insert(
                name.clone(),
                Selection {
                    version,
                    constraints: outline.dependencies.clone(),
                },
            );

            if let Some(solution) = self.explore(next_pending, next_solved, offline)? {
                debug!(package = %name, %version, "selected");
                return Ok(Some(solution));
            }
        }

        Ok(None)
    }

    /// Published versions of a package, newest first. Online, the registry
    /// listing is merged with whatever the cache already holds; offline the
    /// cache is all there is.
    fn candidate_versions(&self, name: &PackageName, offline: bool) -> Result<Vec<Version>, Abort> {
        let mut versions = self.cache.cached_versions(name);

        if !offline {
            if let Connection::Online(registry) = self.connection {
                match registry.versions(name) {
                    Ok(published) => versions.extend(published),
                    // An unknown package simply has no registry versions;
                    // the cache may still satisfy the constraint.
                    Err(RegistryError::UnknownPackage(_)) => {}
                    Err(err) if err.is_unreachable() => return Err(Abort::RegistryDown),
                    Err(err) => {
                        return Err(Abort::Fatal(SolverError::Versions {
                            package: name.clone(),
                            source: err,
                        }))
                    }
                }
            }
        }

        versions.sort_unstable();
        versions.dedup();
        versions.reverse();
        Ok(versions)
    }

    /// The candidate's gren.json, fetching it into the cache if needed.
    /// Returns `None` when the candidate simply is not available offline.
    fn candidate_outline(
        &self,
        name: &PackageName,
        version: Version,
        offline: bool,
    ) -> Result<Option<PkgOutline>, Abort> {
        if !self.cache.is_populated(name, version) {
            if offline {
                return Ok(None);
            }
            let Connection::Online(registry) = self.connection else {
                return Ok(None);
            };
            match registry.populate(self.cache, name, version) {
                Ok(()) => {}
                Err(err) if err.is_unreachable() => return Err(Abort::RegistryDown),
                Err(err) => {
                    return Err(Abort::Fatal(SolverError::Fetch {
                        package: name.clone(),
                        version,
                        source: err,
                    }))
                }
            }
        }

        match self.cache.outline(name, version) {
            Ok(outline) => Ok(Some(outline)),
            Err(source) => Err(Abort::Fatal(SolverError::BadCachedOutline {
                package: name.clone(),
                version,
                source,
            })),
        }
    }
}

type Pending = IndexMap<PackageName, Constraint>;

/// Fold a candidate's direct constraints into the outstanding set.
/// `None` means the candidate conflicts with what is already decided.
fn merge_constraints(
    pending: &Pending,
    solved: &Solution,
    outline: &PkgOutline,
) -> Option<Pending> {
    let mut next = pending.clone();
    for (dep, dep_constraint) in &outline.dependencies {
        if let Some(selection) = solved.get(dep) {
            if !dep_constraint.satisfies(selection.version) {
                return None;
            }
            continue;
        }
        match next.get_mut(dep) {
            Some(existing) => {
                // Narrowing keeps the dependency's original position in the
                // pending order.
                *existing = existing.intersect(dep_constraint)?;
            }
            None => {
                next.insert(dep.clone(), *dep_constraint);
            }
        }
    }
    Some(next)
}

/// Check a finished solution against the invariants every valid solution
/// must uphold. Used by tests and by `Details` before trusting a solution.
pub fn solution_is_valid(solution: &Solution, root_platform: Platform, cache: &PackageCache) -> bool {
    solution.iter().all(|(name, selection)| {
        let platform_ok = cache
            .outline(name, selection.version)
            .map(|outline| Platform::compatible(root_platform, outline.platform))
            .unwrap_or(false);
        let constraints_ok = selection.constraints.iter().all(|(dep, constraint)| {
            solution
                .get(dep)
                .is_some_and(|dep_selection| constraint.satisfies(dep_selection.version))
        });
        platform_ok && constraints_ok
    })
}
