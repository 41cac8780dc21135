//! Solver behavior against an in-memory registry and a real cache directory.

use gren_package::outline::{Exposed, PkgOutline};
use gren_package::registry::{PackageCache, Registry, RegistryError};
use gren_package::solver::{solution_is_valid, Connection, Outcome, Solver, SolverError};
use gren_package::{Constraint, PackageName, Platform, Version};
use std::collections::BTreeMap;
use std::fs;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use tempfile::TempDir;

fn pkg(name: &str) -> PackageName {
    name.parse().unwrap()
}

fn v(text: &str) -> Version {
    text.parse().unwrap()
}

fn c(text: &str) -> Constraint {
    text.parse().unwrap()
}

fn good_gren() -> Constraint {
    c("0.5.0 <= v < 0.6.0")
}

fn outline(
    name: &str,
    version: &str,
    platform: Platform,
    deps: &[(&str, &str)],
) -> PkgOutline {
    let dependencies: BTreeMap<PackageName, Constraint> = deps
        .iter()
        .map(|(dep, con)| (pkg(dep), c(con)))
        .collect();
    PkgOutline::new(
        pkg(name),
        String::from("test fixture"),
        String::from("MIT"),
        v(version),
        platform,
        Exposed::Flat(vec!["Fixture".parse().unwrap()]),
        good_gren(),
        dependencies,
    )
}

/// In-memory registry; `populate` materializes gren.json into the cache.
#[derive(Default)]
struct MemoryRegistry {
    packages: Mutex<BTreeMap<PackageName, Vec<PkgOutline>>>,
    unreachable: AtomicBool,
}

impl MemoryRegistry {
    fn publish(&self, outline: PkgOutline) {
        self.packages
            .lock()
            .unwrap()
            .entry(outline.name.clone())
            .or_default()
            .push(outline);
    }

    fn go_dark(&self) {
        self.unreachable.store(true, Ordering::SeqCst);
    }
}

impl Registry for MemoryRegistry {
    fn versions(&self, name: &PackageName) -> Result<Vec<Version>, RegistryError> {
        if self.unreachable.load(Ordering::SeqCst) {
            return Err(RegistryError::Unreachable(String::from("network down")));
        }
        let packages = self.packages.lock().unwrap();
        match packages.get(name) {
            Some(outlines) => Ok(outlines.iter().map(|o| o.version).collect()),
            None => Err(RegistryError::UnknownPackage(name.clone())),
        }
    }

    fn populate(
        &self,
        cache: &PackageCache,
        name: &PackageName,
        version: Version,
    ) -> Result<(), RegistryError> {
        if self.unreachable.load(Ordering::SeqCst) {
            return Err(RegistryError::Unreachable(String::from("network down")));
        }
        let packages = self.packages.lock().unwrap();
        let outline = packages
            .get(name)
            .and_then(|outlines| outlines.iter().find(|o| o.version == version))
            .ok_or_else(|| RegistryError::UnknownPackage(name.clone()))?;

        let dir = cache.version_dir(name, version);
        fs::create_dir_all(dir.join("src"))?;
        let json = serde_json::to_string_pretty(outline).unwrap();
        fs::write(dir.join("gren.json"), json)?;
        Ok(())
    }
}

fn constraints(pairs: &[(&str, &str)]) -> BTreeMap<PackageName, Constraint> {
    pairs.iter().map(|(name, con)| (pkg(name), c(con))).collect()
}

#[test]
fn test_solves_transitive_dependencies() {
    let temp = TempDir::new().unwrap();
    let cache = PackageCache::at(temp.path());
    let registry = MemoryRegistry::default();
    registry.publish(outline("a/a", "1.0.0", Platform::Common, &[("b/b", "1.0.0 <= v < 2.0.0")]));
    registry.publish(outline("b/b", "1.0.0", Platform::Common, &[]));
    registry.publish(outline("b/b", "1.4.0", Platform::Common, &[]));

    let solver = Solver::new(&cache, Connection::Online(&registry), Platform::Browser);
    let outcome = solver
        .verify(&constraints(&[("a/a", "1.0.0 <= v < 2.0.0")]))
        .unwrap();

    let Outcome::Solved(solution) = outcome else {
        panic!("expected a solution");
    };
    assert_eq!(solution.len(), 2);
    assert_eq!(solution[&pkg("a/a")].version, v("1.0.0"));
    // Newest admissible version wins.
    assert_eq!(solution[&pkg("b/b")].version, v("1.4.0"));
    assert!(solution_is_valid(&solution, Platform::Browser, &cache));
}

#[test]
fn test_conflicting_transitive_constraints() {
    let temp = TempDir::new().unwrap();
    let cache = PackageCache::at(temp.path());
    let registry = MemoryRegistry::default();
    registry.publish(outline("a/a", "1.0.0", Platform::Common, &[("shared/dep", "1.0.0 <= v < 2.0.0")]));
    registry.publish(outline("b/b", "1.0.0", Platform::Common, &[("shared/dep", "2.0.0 <= v < 3.0.0")]));
    registry.publish(outline("shared/dep", "1.0.0", Platform::Common, &[]));
    registry.publish(outline("shared/dep", "2.0.0", Platform::Common, &[]));

    let solver = Solver::new(&cache, Connection::Online(&registry), Platform::Common);
    let outcome = solver
        .verify(&constraints(&[
            ("a/a", "1.0.0 <= v < 2.0.0"),
            ("b/b", "1.0.0 <= v < 2.0.0"),
        ]))
        .unwrap();

    assert_eq!(outcome, Outcome::NoSolution);
}

#[test]
fn test_backtracks_to_older_version() {
    let temp = TempDir::new().unwrap();
    let cache = PackageCache::at(temp.path());
    let registry = MemoryRegistry::default();
    // a 2.0.0 needs a c that does not exist; a 1.0.0 works.
    registry.publish(outline("a/a", "2.0.0", Platform::Common, &[("c/c", "2.0.0 <= v < 3.0.0")]));
    registry.publish(outline("a/a", "1.0.0", Platform::Common, &[("c/c", "1.0.0 <= v < 2.0.0")]));
    registry.publish(outline("c/c", "1.1.0", Platform::Common, &[]));

    let solver = Solver::new(&cache, Connection::Online(&registry), Platform::Common);
    let outcome = solver
        .verify(&constraints(&[("a/a", "1.0.0 <= v < 3.0.0")]))
        .unwrap();

    let Outcome::Solved(solution) = outcome else {
        panic!("expected a solution");
    };
    assert_eq!(solution[&pkg("a/a")].version, v("1.0.0"));
    assert_eq!(solution[&pkg("c/c")].version, v("1.1.0"));
}

#[test]
fn test_platform_incompatible_candidates_are_skipped() {
    let temp = TempDir::new().unwrap();
    let cache = PackageCache::at(temp.path());
    let registry = MemoryRegistry::default();
    // Newest version went node-only; the older common version still works.
    registry.publish(outline("a/a", "2.0.0", Platform::Node, &[]));
    registry.publish(outline("a/a", "1.0.0", Platform::Common, &[]));

    let solver = Solver::new(&cache, Connection::Online(&registry), Platform::Browser);
    let outcome = solver
        .verify(&constraints(&[("a/a", "1.0.0 <= v < 3.0.0")]))
        .unwrap();

    let Outcome::Solved(solution) = outcome else {
        panic!("expected a solution");
    };
    assert_eq!(solution[&pkg("a/a")].version, v("1.0.0"));
}

#[test]
fn test_offline_with_empty_cache() {
    let temp = TempDir::new().unwrap();
    let cache = PackageCache::at(temp.path());

    let solver = Solver::new(&cache, Connection::Offline, Platform::Common);
    let outcome = solver
        .verify(&constraints(&[("a/a", "1.0.0 <= v < 2.0.0")]))
        .unwrap();

    assert_eq!(outcome, Outcome::NoOfflineSolution);
}

#[test]
fn test_registry_failure_falls_back_to_cache() {
    let temp = TempDir::new().unwrap();
    let cache = PackageCache::at(temp.path());
    let registry = MemoryRegistry::default();
    registry.publish(outline("a/a", "1.0.0", Platform::Common, &[]));

    // Warm the cache while the registry is up.
    let solver = Solver::new(&cache, Connection::Online(&registry), Platform::Common);
    let wanted = constraints(&[("a/a", "1.0.0 <= v < 2.0.0")]);
    assert!(matches!(solver.verify(&wanted).unwrap(), Outcome::Solved(_)));

    // Same query with the network gone: the cache answers.
    registry.go_dark();
    let solver = Solver::new(&cache, Connection::Online(&registry), Platform::Common);
    assert!(matches!(solver.verify(&wanted).unwrap(), Outcome::Solved(_)));

    // A query the cache cannot answer is the offline-specific failure.
    let missing = constraints(&[("z/z", "1.0.0 <= v < 2.0.0")]);
    assert_eq!(solver.verify(&missing).unwrap(), Outcome::NoOfflineSolution);
}

#[test]
fn test_offline_solution_matches_online_solution() {
    let temp = TempDir::new().unwrap();
    let cache = PackageCache::at(temp.path());
    let registry = MemoryRegistry::default();
    registry.publish(outline("a/a", "1.0.0", Platform::Common, &[("b/b", "1.0.0 <= v < 2.0.0")]));
    registry.publish(outline("b/b", "1.2.0", Platform::Common, &[]));

    let wanted = constraints(&[("a/a", "1.0.0 <= v < 2.0.0")]);

    let online = Solver::new(&cache, Connection::Online(&registry), Platform::Common);
    let Outcome::Solved(online_solution) = online.verify(&wanted).unwrap() else {
        panic!("expected an online solution");
    };

    let offline = Solver::new(&cache, Connection::Offline, Platform::Common);
    let Outcome::Solved(offline_solution) = offline.verify(&wanted).unwrap() else {
        panic!("expected an offline solution");
    };

    assert_eq!(online_solution, offline_solution);
}

#[test]
fn test_exact_pins() {
    let temp = TempDir::new().unwrap();
    let cache = PackageCache::at(temp.path());
    let registry = MemoryRegistry::default();
    registry.publish(outline("a/a", "1.0.0", Platform::Common, &[]));
    registry.publish(outline("a/a", "1.1.0", Platform::Common, &[]));

    let solver = Solver::new(&cache, Connection::Online(&registry), Platform::Common);
    let mut pins = BTreeMap::new();
    pins.insert(pkg("a/a"), v("1.0.0"));

    let Outcome::Solved(solution) = solver.verify_exact(&pins).unwrap() else {
        panic!("expected a solution");
    };
    // The pin wins even though a newer version exists.
    assert_eq!(solution[&pkg("a/a")].version, v("1.0.0"));
}

#[test]
fn test_bad_cached_outline_is_fatal_and_names_the_package() {
    let temp = TempDir::new().unwrap();
    let cache = PackageCache::at(temp.path());

    // Hand-corrupt a cached gren.json.
    let dir = cache.version_dir(&pkg("a/a"), v("1.0.0"));
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join("gren.json"), "{ not json").unwrap();

    let solver = Solver::new(&cache, Connection::Offline, Platform::Common);
    let err = solver
        .verify(&constraints(&[("a/a", "1.0.0 <= v < 2.0.0")]))
        .unwrap_err();

    match err {
        SolverError::BadCachedOutline { package, version, .. } => {
            assert_eq!(package, pkg("a/a"));
            assert_eq!(version, v("1.0.0"));
        }
        other => panic!("expected BadCachedOutline, got {other:?}"),
    }
}
