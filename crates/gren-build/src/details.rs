//! Project build state ("Details")
//!
//! `Details` ties a validated outline to a solved dependency set, the
//! per-package artifact caches, the foreign modules visible to user code,
//! and the per-module build records that drive incremental recompilation.
//!
//! Loading is idempotent: when `.gren/details.dat` matches the current
//! `gren.json` modification time, the cached state is reused with the
//! build id bumped by one. Anything else triggers regeneration: solve the
//! dependencies, then verify every package concurrently, reusing each
//! package's `artifacts.dat` whenever its fingerprint matches.

use crate::artifacts::{ArtifactCache, Artifacts, Fingerprint};
use crate::compile::{self, CompileRun};
use crate::crawl::Crawler;
use crate::error::{BuildProblem, DetailsError};
use crate::future::PromiseMap;
use crate::host::Compiler;
use crate::interfaces::{DependencyInterface, Interface};
use crate::objects::GlobalGraph;
use crate::paths;
use gren_codec::file;
use gren_codec::{CodecError, Decode, Encode, Reader};
use gren_package::outline::OUTLINE_FILE;
use gren_package::registry::{PackageCache, RegistryLock};
use gren_package::solver::{Connection, Outcome, Selection, Solution, Solver};
use gren_package::{CanonicalName, ModuleName, Outline, PackageName, COMPILER_VERSION};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::SystemTime;
use tracing::{debug, info};

/// Monotonic per-project build counter, bumped on every load. Module
/// change horizons (`last_change` / `last_compile`) are compared against
/// it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct BuildId(pub u64);

impl BuildId {
    pub fn next(self) -> BuildId {
        BuildId(self.0 + 1)
    }
}

impl Encode for BuildId {
    fn encode(&self, buf: &mut Vec<u8>) {
        self.0.encode(buf);
    }
}

impl Decode for BuildId {
    fn decode(reader: &mut Reader<'_>) -> Result<Self, CodecError> {
        Ok(BuildId(u64::decode(reader)?))
    }
}

/// Per-user-module build record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Local {
    pub path: PathBuf,
    pub time: SystemTime,
    pub imports: Vec<ModuleName>,
    pub main: bool,
    /// Build id of the last build whose emitted interface bytes differed.
    pub last_change: BuildId,
    /// Build id of the last build that compiled this module.
    pub last_compile: BuildId,
}

/// Per-foreign-module record: who owns it, and who else also exposes it.
/// A non-empty `also` means the name is ambiguous; that only becomes an
/// error at an import site that uses it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Foreign {
    pub owner: PackageName,
    pub also: Vec<PackageName>,
}

/// Aggregated build state for one project.
#[derive(Debug)]
pub struct Details {
    pub outline_time: SystemTime,
    pub build_id: BuildId,
    pub outline: Outline,
    pub locals: BTreeMap<ModuleName, Local>,
    pub foreigns: BTreeMap<ModuleName, Foreign>,
    /// Foreign module -> interface, already privatized for non-direct
    /// packages. Ambiguous names are absent.
    pub foreign_interfaces: BTreeMap<ModuleName, DependencyInterface>,
    /// Interfaces of the project's own modules from the previous build.
    pub local_interfaces: BTreeMap<ModuleName, Interface>,
    /// Kernel modules shipped by dependencies, by owning package.
    pub kernel_owners: BTreeMap<ModuleName, PackageName>,
    /// Link-ready object graph: dependency graphs plus previously compiled
    /// project modules.
    pub objects: GlobalGraph,
}

/// What the builder needs from the environment.
pub struct Env<'a> {
    pub cache: &'a PackageCache,
    pub connection: Connection<'a>,
    pub compiler: &'a dyn Compiler,
}

/// The package name user modules are homed under. Applications have no
/// package identity of their own.
pub fn root_package(outline: &Outline) -> PackageName {
    match outline {
        Outline::App(_) => "author/project"
            .parse()
            .expect("the placeholder root name is valid"),
        Outline::Pkg(pkg) => pkg.name.clone(),
    }
}

impl Details {
    /// Load (or regenerate) the project's build state.
    pub fn load(root: &Path, env: &Env<'_>) -> Result<Details, DetailsError> {
        let outline_time = outline_time(root)?;

        if let Some(details) = read_cached(root, outline_time) {
            debug!(build_id = details.build_id.0, "reusing cached details");
            details.store(root)?;
            return Ok(details);
        }

        let outline = Outline::read(root)?;
        let old_build_id = stale_build_id(root);
        let details = generate(env, outline, outline_time, old_build_id)?;
        details.store(root)?;
        Ok(details)
    }

    /// Validate that a proposed outline's dependency set can be built,
    /// without touching `.gren/`.
    pub fn verify_install(env: &Env<'_>, outline: &Outline) -> Result<(), DetailsError> {
        generate(env, outline.clone(), SystemTime::UNIX_EPOCH, BuildId(0)).map(|_| ())
    }

    /// Persist `.gren/{objects,interfaces,details}.dat`, in that order.
    /// Called after load and again after a successful build.
    pub fn store(&self, root: &Path) -> Result<(), DetailsError> {
        let io = |err: gren_codec::file::FileError| DetailsError::Io {
            path: paths::gren_dir(root),
            source: std::io::Error::other(err.to_string()),
        };

        file::write(&paths::objects_path(root), &self.objects).map_err(io)?;
        let interfaces = (self.foreign_interfaces.clone(), self.local_interfaces.clone());
        file::write(&paths::interfaces_path(root), &interfaces).map_err(io)?;

        let saved = SavedDetails {
            outline_time: self.outline_time,
            build_id: self.build_id,
            outline: self.outline.clone(),
            locals: self.locals.clone(),
            foreigns: self.foreigns.clone(),
            kernel_owners: self.kernel_owners.clone(),
        };
        file::write(&paths::details_path(root), &saved).map_err(io)
    }

}

/// The persistent slice of `Details` (the artifact tables live in
/// `interfaces.dat` / `objects.dat`).
struct SavedDetails {
    outline_time: SystemTime,
    build_id: BuildId,
    outline: Outline,
    locals: BTreeMap<ModuleName, Local>,
    foreigns: BTreeMap<ModuleName, Foreign>,
    kernel_owners: BTreeMap<ModuleName, PackageName>,
}

fn outline_time(root: &Path) -> Result<SystemTime, DetailsError> {
    let path = root.join(OUTLINE_FILE);
    match fs::metadata(&path).and_then(|meta| meta.modified()) {
        Ok(time) => Ok(time),
        // Let the outline reader produce the proper "no gren.json" error.
        Err(_) => Err(Outline::read(root)
            .map(|_| DetailsError::Io {
                path,
                source: std::io::Error::other("could not stat gren.json"),
            })
            .unwrap_or_else(DetailsError::Outline)),
    }
}

/// Reuse `.gren/` state when the outline has not changed since it was
/// written. The declared compiler version gates everything: cached bytes
/// from another compiler are never trusted.
fn read_cached(root: &Path, outline_time: SystemTime) -> Option<Details> {
    let saved: SavedDetails = file::read(&paths::details_path(root)).ok()?;
    if saved.outline_time != outline_time {
        return None;
    }
    let compiler_ok = match &saved.outline {
        Outline::App(app) => app.gren_version == COMPILER_VERSION,
        Outline::Pkg(pkg) => pkg.gren_version.good_gren(),
    };
    if !compiler_ok {
        return None;
    }

    let (foreign_interfaces, local_interfaces): (
        BTreeMap<ModuleName, DependencyInterface>,
        BTreeMap<ModuleName, Interface>,
    ) = file::read(&paths::interfaces_path(root)).ok()?;
    let objects: GlobalGraph = file::read(&paths::objects_path(root)).ok()?;

    Some(Details {
        outline_time: saved.outline_time,
        build_id: saved.build_id.next(),
        outline: saved.outline,
        locals: saved.locals,
        foreigns: saved.foreigns,
        foreign_interfaces,
        local_interfaces,
        kernel_owners: saved.kernel_owners,
        objects,
    })
}

/// The build counter survives outline edits even though everything else is
/// regenerated.
fn stale_build_id(root: &Path) -> BuildId {
    file::read::<SavedDetails>(&paths::details_path(root))
        .map(|saved| saved.build_id)
        .unwrap_or_default()
}

fn generate(
    env: &Env<'_>,
    outline: Outline,
    outline_time: SystemTime,
    old_build_id: BuildId,
) -> Result<Details, DetailsError> {
    info!("resolving dependencies");
    let solver = Solver::new(env.cache, env.connection, outline.platform());

    let solution = match &outline {
        Outline::App(app) => {
            let mut pins = app.dependencies.direct.clone();
            pins.extend(
                app.dependencies
                    .indirect
                    .iter()
                    .map(|(name, version)| (name.clone(), *version)),
            );
            let solution = expect_solution(solver.verify_exact(&pins)?)?;
            // The solver may pull in packages the outline never mentioned;
            // that means the dependency lists were edited by hand.
            if solution.len() != pins.len() {
                return Err(DetailsError::HandEditedDependencies);
            }
            solution
        }
        Outline::Pkg(pkg) => expect_solution(solver.verify(&pkg.dependencies)?)?,
    };

    let direct: BTreeSet<PackageName> = match &outline {
        Outline::App(app) => app.dependencies.direct.keys().cloned().collect(),
        Outline::Pkg(pkg) => pkg.dependencies.keys().cloned().collect(),
    };

    let dep_artifacts = verify_dependencies(env, &solution)?;

    // Aggregate the project-wide foreign tables. Direct dependencies stay
    // `Public`; everything else is privatized. A module exposed by more
    // than one package keeps its ambiguity on record and drops out of the
    // interface table.
    let mut foreigns: BTreeMap<ModuleName, Foreign> = BTreeMap::new();
    let mut foreign_interfaces: BTreeMap<ModuleName, DependencyInterface> = BTreeMap::new();
    let mut kernel_owners: BTreeMap<ModuleName, PackageName> = BTreeMap::new();
    let mut objects = GlobalGraph::new();

    for (package, artifacts) in &dep_artifacts {
        let is_direct = direct.contains(package);
        for kernel_module in artifacts.objects.kernels.keys() {
            kernel_owners.insert(kernel_module.clone(), package.clone());
        }
        for (module, interface) in &artifacts.interfaces {
            match foreigns.get_mut(module) {
                None => {
                    foreigns.insert(
                        module.clone(),
                        Foreign {
                            owner: package.clone(),
                            also: Vec::new(),
                        },
                    );
                    let visible = if is_direct {
                        interface.clone()
                    } else {
                        interface.privatized()
                    };
                    foreign_interfaces.insert(module.clone(), visible);
                }
                Some(foreign) => {
                    foreign.also.push(package.clone());
                    foreign_interfaces.remove(module);
                }
            }
        }
        objects.merge(artifacts.objects.clone());
    }

    Ok(Details {
        outline_time,
        build_id: old_build_id.next(),
        outline,
        locals: BTreeMap::new(),
        foreigns,
        foreign_interfaces,
        local_interfaces: BTreeMap::new(),
        kernel_owners,
        objects,
    })
}

fn expect_solution(outcome: Outcome) -> Result<Solution, DetailsError> {
    match outcome {
        Outcome::Solved(solution) => Ok(solution),
        Outcome::NoSolution => Err(DetailsError::NoSolution),
        Outcome::NoOfflineSolution => Err(DetailsError::NoOfflineSolution),
    }
}

type DepResult = Option<Arc<Artifacts>>;

/// Build or reuse artifacts for every package in the solution,
/// concurrently. Dependents block on their direct dependencies through the
/// shared promise map. The whole phase holds the cross-process registry
/// lock, since it may write package artifact caches.
fn verify_dependencies(
    env: &Env<'_>,
    solution: &Solution,
) -> Result<BTreeMap<PackageName, Arc<Artifacts>>, DetailsError> {
    let _lock = RegistryLock::acquire(env.cache)?;

    let promises: PromiseMap<PackageName, DepResult> = PromiseMap::new();
    let failures: Mutex<BTreeMap<PackageName, DetailsError>> = Mutex::new(BTreeMap::new());

    thread::scope(|scope| {
        // Register every package before spawning so dependents can never
        // observe a missing promise.
        let registered: Vec<_> = solution
            .iter()
            .map(|(name, selection)| (name, selection, promises.register(name.clone())))
            .collect();

        for (name, selection, promise) in registered {
            let promises = &promises;
            let failures = &failures;
            scope.spawn(move || {
                let fingerprint: Fingerprint = selection
                    .constraints
                    .keys()
                    .map(|dep| (dep.clone(), solution[dep].version))
                    .collect();

                if let Some(cached) = ArtifactCache::load(env.cache, name, selection.version) {
                    if cached.fingerprints.contains(&fingerprint) {
                        debug!(package = %name, version = %selection.version, "artifact cache hit");
                        promise.fulfill(Some(Arc::new(cached.artifacts)));
                        return;
                    }
                }

                info!(package = %name, version = %selection.version, "building package");
                match build_package(env, solution, name, selection, promises) {
                    Ok(artifacts) => {
                        let mut entry = ArtifactCache::new(fingerprint, artifacts.clone());
                        if let Some(previous) =
                            ArtifactCache::load(env.cache, name, selection.version)
                        {
                            entry.absorb_fingerprints(previous);
                        }
                        if let Err(err) = entry.store(env.cache, name, selection.version) {
                            failures.lock().expect("failures poisoned").insert(
                                name.clone(),
                                DetailsError::Io {
                                    path: env.cache.artifacts_path(name, selection.version),
                                    source: std::io::Error::other(err.to_string()),
                                },
                            );
                            promise.fulfill(None);
                            return;
                        }
                        promise.fulfill(Some(Arc::new(artifacts)));
                    }
                    Err(Some(problems)) => {
                        failures.lock().expect("failures poisoned").insert(
                            name.clone(),
                            DetailsError::BadPackageBuild {
                                package: name.clone(),
                                version: selection.version,
                                fingerprint: selection
                                    .constraints
                                    .keys()
                                    .map(|dep| (dep.clone(), solution[dep].version))
                                    .collect(),
                                problems,
                            },
                        );
                        promise.fulfill(None);
                    }
                    // A failed dependency: its own task already recorded
                    // the root cause.
                    Err(None) => promise.fulfill(None),
                }
            });
        }
    });

    let mut failures = failures.into_inner().expect("failures poisoned");
    if let Some(first) = failures.keys().next().cloned() {
        return Err(failures.remove(&first).expect("key just observed"));
    }

    let mut artifacts = BTreeMap::new();
    for name in solution.keys() {
        let result = promises
            .wait_for(name)
            .flatten()
            .expect("every package task fulfilled its promise");
        artifacts.insert(name.clone(), result);
    }
    Ok(artifacts)
}

/// Build one package from source: wait for its direct dependencies, crawl
/// its exposed modules, compile them, and aggregate interfaces + objects.
///
/// `Err(None)` means a dependency failed (root cause recorded elsewhere);
/// `Err(Some(problems))` is this package's own failure.
fn build_package(
    env: &Env<'_>,
    solution: &Solution,
    name: &PackageName,
    selection: &Selection,
    promises: &PromiseMap<PackageName, DepResult>,
) -> Result<Artifacts, Option<Vec<BuildProblem>>> {
    let version = selection.version;
    let outline = env.cache.outline(name, version).map_err(|err| {
        Some(vec![BuildProblem::BadSyntax {
            path: env.cache.version_dir(name, version).join(OUTLINE_FILE),
            message: err.to_string(),
        }])
    })?;

    // Block until every direct dependency's artifacts exist. Transitive
    // ones are finished by then (each direct dependency waited on its own
    // directs), so the closure reads below never block for long.
    let mut closure = transitive_closure(solution, selection.constraints.keys());
    closure.remove(name);
    let mut closure_artifacts: BTreeMap<PackageName, Arc<Artifacts>> = BTreeMap::new();
    for dep in closure {
        match promises.wait_for(&dep).flatten() {
            Some(artifacts) => {
                closure_artifacts.insert(dep, artifacts);
            }
            None => return Err(None),
        }
    }

    // The foreign world as this package sees it: direct deps public,
    // transitive deps privatized, ambiguity tracked per module name.
    let mut foreigns: BTreeMap<ModuleName, Foreign> = BTreeMap::new();
    let mut foreign_interfaces: BTreeMap<ModuleName, DependencyInterface> = BTreeMap::new();
    let mut foreign_kernels: BTreeMap<ModuleName, PackageName> = BTreeMap::new();

    for (dep, artifacts) in &closure_artifacts {
        let is_direct = selection.constraints.contains_key(dep);
        for (module, interface) in &artifacts.interfaces {
            match foreigns.get_mut(module) {
                None => {
                    foreigns.insert(
                        module.clone(),
                        Foreign {
                            owner: dep.clone(),
                            also: Vec::new(),
                        },
                    );
                    let visible = if is_direct {
                        interface.clone()
                    } else {
                        interface.privatized()
                    };
                    foreign_interfaces.insert(module.clone(), visible);
                }
                Some(foreign) => {
                    foreign.also.push(dep.clone());
                    foreign_interfaces.remove(module);
                }
            }
        }
        for kernel_module in artifacts.objects.kernels.keys() {
            foreign_kernels.insert(kernel_module.clone(), dep.clone());
        }
    }

    let source_dirs = vec![env.cache.source_dir(name, version)];
    let crawler = Crawler {
        source_dirs: &source_dirs,
        foreigns: &foreigns,
        kernel_package: name.is_kernel_privileged().then_some(name),
        foreign_kernels: &foreign_kernels,
    };

    let exposed = outline.exposed_modules();
    let statuses = crawler.crawl_modules(&exposed).map_err(Some)?;

    let output = compile::run(
        CompileRun {
            package: name,
            foreign_interfaces: &foreign_interfaces,
            compiler: env.compiler,
            build_id: BuildId(1),
            old_locals: &BTreeMap::new(),
            old_interfaces: &BTreeMap::new(),
        },
        &statuses,
    );
    if !output.problems.is_empty() {
        return Err(Some(output.problems));
    }

    // Exposed modules expose their interface; internal modules are omitted.
    let mut interfaces: BTreeMap<ModuleName, DependencyInterface> = BTreeMap::new();
    for module in &exposed {
        match output.interfaces.get(module) {
            Some(interface) => {
                interfaces.insert(
                    module.clone(),
                    DependencyInterface::Public(interface.clone()),
                );
            }
            None => {
                return Err(Some(vec![BuildProblem::MissingExposed {
                    module: module.clone(),
                }]))
            }
        }
    }

    let mut objects = GlobalGraph::new();
    for (module, graph) in output.graphs {
        let home = CanonicalName::new(name.clone(), module);
        objects.add_local_graph(&home, graph);
    }
    for (module, kernel) in output.kernels {
        objects.add_kernel(module, kernel);
    }

    Ok(Artifacts {
        interfaces,
        objects,
    })
}

/// Every package reachable from `roots` through the solution's direct-dep
/// edges.
fn transitive_closure<'a>(
    solution: &Solution,
    roots: impl Iterator<Item = &'a PackageName>,
) -> BTreeSet<PackageName> {
    let mut closure: BTreeSet<PackageName> = BTreeSet::new();
    let mut queue: Vec<PackageName> = roots.cloned().collect();
    while let Some(package) = queue.pop() {
        if !closure.insert(package.clone()) {
            continue;
        }
        if let Some(selection) = solution.get(&package) {
            queue.extend(selection.constraints.keys().cloned());
        }
    }
    closure
}

impl Encode for Local {
    fn encode(&self, buf: &mut Vec<u8>) {
        self.path.encode(buf);
        self.time.encode(buf);
        self.imports.encode(buf);
        self.main.encode(buf);
        self.last_change.encode(buf);
        self.last_compile.encode(buf);
    }
}

impl Decode for Local {
    fn decode(reader: &mut Reader<'_>) -> Result<Self, CodecError> {
        Ok(Local {
            path: PathBuf::decode(reader)?,
            time: SystemTime::decode(reader)?,
            imports: Vec::decode(reader)?,
            main: bool::decode(reader)?,
            last_change: BuildId::decode(reader)?,
            last_compile: BuildId::decode(reader)?,
        })
    }
}

impl Encode for Foreign {
    fn encode(&self, buf: &mut Vec<u8>) {
        self.owner.encode(buf);
        self.also.encode(buf);
    }
}

impl Decode for Foreign {
    fn decode(reader: &mut Reader<'_>) -> Result<Self, CodecError> {
        Ok(Foreign {
            owner: PackageName::decode(reader)?,
            also: Vec::decode(reader)?,
        })
    }
}

impl Encode for SavedDetails {
    fn encode(&self, buf: &mut Vec<u8>) {
        self.outline_time.encode(buf);
        self.build_id.encode(buf);
        self.outline.encode(buf);
        self.locals.encode(buf);
        self.foreigns.encode(buf);
        self.kernel_owners.encode(buf);
    }
}

impl Decode for SavedDetails {
    fn decode(reader: &mut Reader<'_>) -> Result<Self, CodecError> {
        Ok(SavedDetails {
            outline_time: SystemTime::decode(reader)?,
            build_id: BuildId::decode(reader)?,
            outline: <Outline as Decode>::decode(reader)?,
            locals: BTreeMap::decode(reader)?,
            foreigns: BTreeMap::decode(reader)?,
            kernel_owners: BTreeMap::decode(reader)?,
        })
    }
}
