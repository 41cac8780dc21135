//! The `make` pipeline
//!
//! Load `Details`, crawl the requested entry modules, recompile exactly
//! what the staleness rules demand, assemble output, and persist the
//! `.gren/` caches. Everything here is a thin conductor over the crawler,
//! the compile coordinator, and the output assembler.

use crate::compile::{self, CompileRun};
use crate::crawl::{Crawler, Status};
use crate::details::{root_package, Details, Env};
use crate::error::{BuildError, GenerateError};
use crate::generate::{self, Mode, Output, RootModule};
use gren_package::{CanonicalName, ModuleName, Outline};
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use walkdir::WalkDir;

/// The `make` command's knobs.
#[derive(Debug, Clone)]
pub struct Flags {
    pub debug: bool,
    pub optimize: bool,
    pub output: Output,
}

impl Default for Flags {
    fn default() -> Self {
        Self {
            debug: false,
            optimize: false,
            output: Output::Html(PathBuf::from("index.html")),
        }
    }
}

impl Flags {
    fn mode(&self) -> Mode {
        if self.debug {
            Mode::Debug
        } else if self.optimize {
            Mode::Prod
        } else {
            Mode::Dev
        }
    }
}

/// Build the given entry files (or, with none given, a package's exposed
/// modules / every module of an application).
pub fn make(
    root: &Path,
    env: &Env<'_>,
    paths: &[PathBuf],
    flags: &Flags,
) -> Result<(), BuildError> {
    // Rejected before the compiler is ever invoked.
    if flags.debug && flags.optimize {
        return Err(GenerateError::CannotOptimizeAndDebug.into());
    }

    let mut details = Details::load(root, env)?;
    info!(build_id = details.build_id.0, "building");

    let source_dirs = source_dirs(root, &details.outline);
    let crawler = Crawler {
        source_dirs: &source_dirs,
        foreigns: &details.foreigns,
        kernel_package: match &details.outline {
            Outline::Pkg(pkg) if pkg.name.is_kernel_privileged() => Some(&pkg.name),
            _ => None,
        },
        foreign_kernels: &details.kernel_owners,
    };

    let (statuses, roots) = match &details.outline {
        Outline::Pkg(pkg) if paths.is_empty() => {
            let exposed = pkg.exposed_modules();
            let statuses = crawler.crawl_modules(&exposed).map_err(BuildError::Problems)?;
            (statuses, exposed)
        }
        _ => {
            let entry_paths = if paths.is_empty() {
                discover_sources(&source_dirs)
            } else {
                paths.to_vec()
            };
            crawler
                .crawl_paths(&entry_paths)
                .map_err(BuildError::Problems)?
        }
    };
    debug!(modules = statuses.len(), roots = roots.len(), "crawl finished");

    let package = root_package(&details.outline);
    let output = compile::run(
        CompileRun {
            package: &package,
            foreign_interfaces: &details.foreign_interfaces,
            compiler: env.compiler,
            build_id: details.build_id,
            old_locals: &details.locals,
            old_interfaces: &details.local_interfaces,
        },
        &statuses,
    );
    if !output.problems.is_empty() {
        return Err(BuildError::Problems(output.problems));
    }

    // Fold this run into the accumulated build state. Records for modules
    // outside this crawl stay put; multi-entry-point projects build up
    // their Local map across invocations.
    details.locals.extend(output.locals);
    details.local_interfaces.extend(output.interfaces);
    for (module, graph) in output.graphs {
        let home = CanonicalName::new(package.clone(), module);
        details.objects.add_local_graph(&home, graph);
    }
    for (module, kernel) in output.kernels {
        details.objects.add_kernel(module, kernel);
    }

    let root_modules: Vec<RootModule> = roots
        .iter()
        .map(|name| RootModule {
            name: name.clone(),
            has_main: match statuses.get(name) {
                Some(Status::Local { module, .. }) => module.has_main,
                _ => false,
            },
        })
        .collect();

    generate::generate(&details, flags.mode(), &flags.output, &root_modules)?;

    details.store(root)?;
    Ok(())
}

fn source_dirs(root: &Path, outline: &Outline) -> Vec<PathBuf> {
    match outline {
        Outline::App(app) => app
            .source_dirs
            .iter()
            .map(|dir| if dir.is_absolute() { dir.clone() } else { root.join(dir) })
            .collect(),
        Outline::Pkg(_) => vec![root.join("src")],
    }
}

/// Every `.gren` file under the source directories, for `make` with no
/// arguments on an application.
fn discover_sources(source_dirs: &[PathBuf]) -> Vec<PathBuf> {
    let mut sources = Vec::new();
    for dir in source_dirs {
        for entry in WalkDir::new(dir)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|entry| entry.ok())
        {
            if entry.file_type().is_file()
                && entry.path().extension().and_then(|ext| ext.to_str()) == Some("gren")
            {
                sources.push(entry.path().to_path_buf());
            }
        }
    }
    sources
}
