//! Import crawling
//!
//! Starting from entry files (`make src/Main.gren`) or a package's exposed
//! modules, resolve every import to exactly one of: a local source file, a
//! foreign module from the dependency solution, or a kernel file
//! (privileged packages only). The crawl produces a `Status` per module and
//! reports every resolution problem it can find in one pass; cycles are
//! detected once the import graph is complete.

use crate::details::Foreign;
use crate::error::BuildProblem;
use crate::host::{self, ParsedModule};
use crate::objects::Kernel;
use gren_package::{ModuleName, PackageName};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// How one module will be obtained.
#[derive(Debug, Clone)]
pub enum Status {
    /// A module found in this project's (or package's) own source tree.
    Local {
        module: ParsedModule,
        time: SystemTime,
    },
    /// A module provided by a dependency package.
    Foreign { owner: PackageName },
    /// A kernel file in this package's own source tree.
    KernelLocal { kernel: Kernel },
    /// A kernel module linked out of a dependency's object graph.
    KernelForeign { owner: PackageName },
}

pub struct Crawler<'a> {
    /// Source directories, in outline order.
    pub source_dirs: &'a [PathBuf],
    /// Importable foreign modules, with ambiguity recorded per module.
    pub foreigns: &'a BTreeMap<ModuleName, Foreign>,
    /// Set when crawling a kernel-privileged package's own sources.
    pub kernel_package: Option<&'a PackageName>,
    /// Kernel modules shipped by dependency packages.
    pub foreign_kernels: &'a BTreeMap<ModuleName, PackageName>,
}

impl<'a> Crawler<'a> {
    /// Crawl from explicit entry files. Returns the statuses and the entry
    /// modules in the order given.
    pub fn crawl_paths(
        &self,
        paths: &[PathBuf],
    ) -> Result<(BTreeMap<ModuleName, Status>, Vec<ModuleName>), Vec<BuildProblem>> {
        let mut problems = Vec::new();
        let mut roots = Vec::new();
        let mut seen_paths = BTreeSet::new();
        let mut seen_modules: BTreeMap<ModuleName, ()> = BTreeMap::new();

        for path in paths {
            if !seen_paths.insert(path.clone()) {
                problems.push(BuildProblem::DuplicateInputPath(path.clone()));
                continue;
            }
            match self.entry_module_name(path) {
                Ok(module) => {
                    if seen_modules.insert(module.clone(), ()).is_some() {
                        problems.push(BuildProblem::ModuleNameClash { module });
                    } else {
                        roots.push(module);
                    }
                }
                Err(problem) => problems.push(problem),
            }
        }

        if !problems.is_empty() {
            return Err(problems);
        }

        let statuses = self.crawl_from(&roots, false)?;
        Ok((statuses, roots))
    }

    /// Crawl from module names (a package build's exposed modules). Roots
    /// that have no source file are `MissingExposed`.
    pub fn crawl_modules(
        &self,
        roots: &[ModuleName],
    ) -> Result<BTreeMap<ModuleName, Status>, Vec<BuildProblem>> {
        self.crawl_from(roots, true)
    }

    fn crawl_from(
        &self,
        roots: &[ModuleName],
        roots_are_exposed: bool,
    ) -> Result<BTreeMap<ModuleName, Status>, Vec<BuildProblem>> {
        let mut statuses: BTreeMap<ModuleName, Status> = BTreeMap::new();
        let mut problems = Vec::new();
        let mut queue: Vec<(ModuleName, Option<ModuleName>)> =
            roots.iter().map(|root| (root.clone(), None)).collect();

        while let Some((name, importer)) = queue.pop() {
            if statuses.contains_key(&name) {
                continue;
            }
            match self.resolve(&name, importer.as_ref(), roots_are_exposed) {
                Ok(status) => {
                    if let Status::Local { module, .. } = &status {
                        for import in &module.imports {
                            queue.push((import.clone(), Some(name.clone())));
                        }
                    }
                    statuses.insert(name, status);
                }
                Err(problem) => {
                    // Keep going: sibling subtrees may have problems too.
                    if !problems.contains(&problem) {
                        problems.push(problem);
                    }
                }
            }
        }

        if problems.is_empty() {
            if let Some(cycle) = find_cycle(&statuses) {
                problems.push(BuildProblem::Cycle(cycle));
            }
        }

        if problems.is_empty() {
            Ok(statuses)
        } else {
            Err(problems)
        }
    }

    fn resolve(
        &self,
        name: &ModuleName,
        importer: Option<&ModuleName>,
        roots_are_exposed: bool,
    ) -> Result<Status, BuildProblem> {
        if let Some(path) = self.locate_local(name)? {
            return self.load_local(name, &path);
        }

        if importer.is_none() && roots_are_exposed {
            return Err(BuildProblem::MissingExposed {
                module: name.clone(),
            });
        }

        if let Some(foreign) = self.foreigns.get(name) {
            if foreign.also.is_empty() {
                return Ok(Status::Foreign {
                    owner: foreign.owner.clone(),
                });
            }
            let mut candidates = vec![foreign.owner.clone()];
            candidates.extend(foreign.also.iter().cloned());
            return Err(BuildProblem::AmbiguousForeign {
                importer: importer
                    .cloned()
                    .unwrap_or_else(|| name.clone()),
                import: name.clone(),
                candidates,
            });
        }

        // Kernel modules resolve only while crawling a privileged package.
        if self.kernel_package.is_some() {
            if let Some(kernel) = self.locate_kernel(name)? {
                return Ok(Status::KernelLocal { kernel });
            }
            if let Some(owner) = self.foreign_kernels.get(name) {
                return Ok(Status::KernelForeign {
                    owner: owner.clone(),
                });
            }
        }

        Err(BuildProblem::ImportNotFound {
            importer: importer.cloned().unwrap_or_else(|| name.clone()),
            import: name.clone(),
        })
    }

    /// Find a module's source file. Two hits across source directories is
    /// an error, not a preference.
    fn locate_local(&self, name: &ModuleName) -> Result<Option<PathBuf>, BuildProblem> {
        let relative = name.to_source_path();
        let mut hits = self
            .source_dirs
            .iter()
            .map(|dir| dir.join(&relative))
            .filter(|path| path.is_file());

        match (hits.next(), hits.next()) {
            (None, _) => Ok(None),
            (Some(only), None) => Ok(Some(only)),
            (Some(first), Some(second)) => Err(BuildProblem::AmbiguousLocal {
                module: name.clone(),
                first,
                second,
            }),
        }
    }

    fn locate_kernel(&self, name: &ModuleName) -> Result<Option<Kernel>, BuildProblem> {
        let relative = name.to_kernel_path();
        for dir in self.source_dirs {
            let path = dir.join(&relative);
            if path.is_file() {
                let source = fs::read_to_string(&path).map_err(|err| BuildProblem::BadSyntax {
                    path,
                    message: err.to_string(),
                })?;
                return Ok(Some(host::parse_kernel(&source)));
            }
        }
        Ok(None)
    }

    fn load_local(&self, name: &ModuleName, path: &Path) -> Result<Status, BuildProblem> {
        let read_problem = |err: std::io::Error| BuildProblem::BadSyntax {
            path: path.to_path_buf(),
            message: err.to_string(),
        };
        let source = fs::read_to_string(path).map_err(read_problem)?;
        let time = fs::metadata(path)
            .and_then(|meta| meta.modified())
            .map_err(read_problem)?;

        let header = host::parse_header(&source).map_err(|message| BuildProblem::BadSyntax {
            path: path.to_path_buf(),
            message,
        })?;

        if let Some(declared) = &header.name {
            if declared != name {
                return Err(BuildProblem::NameMismatch {
                    path: path.to_path_buf(),
                    expected: name.clone(),
                    declared: declared.clone(),
                });
            }
        }

        Ok(Status::Local {
            module: ParsedModule {
                name: name.clone(),
                path: path.to_path_buf(),
                source,
                imports: header.imports,
                exposing: header.exposing,
                has_main: header.has_main,
            },
            time,
        })
    }

    /// Map an entry path to its module name via the source directories.
    fn entry_module_name(&self, path: &Path) -> Result<ModuleName, BuildProblem> {
        if !path.exists() {
            return Err(BuildProblem::UnknownPath(path.to_path_buf()));
        }
        if path.extension().and_then(|ext| ext.to_str()) != Some("gren") {
            return Err(BuildProblem::BadExtension(path.to_path_buf()));
        }

        let relative = self
            .source_dirs
            .iter()
            .find_map(|dir| path.strip_prefix(dir).ok())
            .ok_or_else(|| BuildProblem::OutsideSourceDirs(path.to_path_buf()))?;

        let dotted = relative
            .with_extension("")
            .components()
            .map(|component| component.as_os_str().to_string_lossy().into_owned())
            .collect::<Vec<_>>()
            .join(".");

        dotted
            .parse()
            .map_err(|_| BuildProblem::BadModuleName {
                path: path.to_path_buf(),
            })
    }
}

/// Find one import cycle among the local modules, if any. The cycle is
/// reported in import order starting from the offending module.
fn find_cycle(statuses: &BTreeMap<ModuleName, Status>) -> Option<Vec<ModuleName>> {
    let mut finished: BTreeSet<ModuleName> = BTreeSet::new();

    for start in statuses.keys() {
        let mut stack: Vec<ModuleName> = Vec::new();
        if let Some(cycle) = visit(start, statuses, &mut stack, &mut finished) {
            return Some(cycle);
        }
    }
    None
}

fn visit(
    name: &ModuleName,
    statuses: &BTreeMap<ModuleName, Status>,
    stack: &mut Vec<ModuleName>,
    finished: &mut BTreeSet<ModuleName>,
) -> Option<Vec<ModuleName>> {
    if finished.contains(name) {
        return None;
    }
    if let Some(at) = stack.iter().position(|entry| entry == name) {
        return Some(stack[at..].to_vec());
    }

    let Some(Status::Local { module, .. }) = statuses.get(name) else {
        return None;
    };

    stack.push(name.clone());
    for import in &module.imports {
        if let Some(cycle) = visit(import, statuses, stack, finished) {
            return Some(cycle);
        }
    }
    stack.pop();
    finished.insert(name.clone());
    None
}
