//! Build error taxonomy
//!
//! Errors are plain values. Tasks record them in their futures, the
//! coordinator aggregates, and the command boundary renders them. Lower
//! layers get wrapped with the package/version/fingerprint context they
//! were missing.

use crate::artifacts::Fingerprint;
use crate::host::Diagnostic;
use gren_package::registry::LockError;
use gren_package::{ModuleName, OutlineError, PackageName, SolverError, Version};
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Failures while establishing `Details` (outline + solved dependencies +
/// per-package artifact caches).
#[derive(Debug, Error)]
pub enum DetailsError {
    #[error(transparent)]
    Outline(#[from] OutlineError),

    #[error(transparent)]
    Lock(#[from] LockError),

    #[error(transparent)]
    Solver(#[from] SolverError),

    #[error("no version assignment satisfies the dependency constraints")]
    NoSolution,

    #[error("the registry is unreachable and the local cache cannot satisfy the dependency constraints")]
    NoOfflineSolution,

    #[error("the dependencies in gren.json do not match what they resolve to; they look hand-edited")]
    HandEditedDependencies,

    #[error("failed to build {package} {version} (fingerprint {})", fmt_fingerprint(.fingerprint))]
    BadPackageBuild {
        package: PackageName,
        version: Version,
        fingerprint: Fingerprint,
        problems: Vec<BuildProblem>,
    },

    #[error("io failure at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

fn fmt_fingerprint(fingerprint: &Fingerprint) -> String {
    if fingerprint.is_empty() {
        return String::from("none");
    }
    fingerprint
        .iter()
        .map(|(name, version)| format!("{name} {version}"))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Problems found while crawling or compiling a set of modules. Several can
/// surface from one run; independent modules keep compiling so the user
/// sees everything at once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildProblem {
    /// An entry path that does not exist on disk.
    UnknownPath(PathBuf),
    /// An entry path without the `.gren` extension.
    BadExtension(PathBuf),
    /// An entry path that is not under any source directory.
    OutsideSourceDirs(PathBuf),
    /// The same entry path was given twice.
    DuplicateInputPath(PathBuf),
    /// Two entry paths map to the same module name.
    ModuleNameClash { module: ModuleName },
    /// A path whose relative location does not form a valid module name.
    BadModuleName { path: PathBuf },
    /// The same module name exists under two source directories.
    AmbiguousLocal {
        module: ModuleName,
        first: PathBuf,
        second: PathBuf,
    },
    /// The module header declares a different name than the file location
    /// implies.
    NameMismatch {
        path: PathBuf,
        expected: ModuleName,
        declared: ModuleName,
    },
    /// An import that is neither local, foreign, nor kernel.
    ImportNotFound {
        importer: ModuleName,
        import: ModuleName,
    },
    /// An import exposed by more than one dependency package.
    AmbiguousForeign {
        importer: ModuleName,
        import: ModuleName,
        candidates: Vec<PackageName>,
    },
    /// An import cycle, listed in order starting from the offending module.
    Cycle(Vec<ModuleName>),
    /// A package build could not find the file for an exposed module.
    MissingExposed { module: ModuleName },
    /// The module header could not be parsed at all.
    BadSyntax { path: PathBuf, message: String },
    /// Diagnostics forwarded from the external compiler.
    BadModule {
        module: ModuleName,
        diagnostics: Vec<Diagnostic>,
    },
}

impl fmt::Display for BuildProblem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BuildProblem::UnknownPath(path) => {
                write!(f, "cannot find {}", path.display())
            }
            BuildProblem::BadExtension(path) => {
                write!(f, "{} does not end in .gren", path.display())
            }
            BuildProblem::OutsideSourceDirs(path) => {
                write!(f, "{} is not inside any source directory", path.display())
            }
            BuildProblem::DuplicateInputPath(path) => {
                write!(f, "{} was given more than once", path.display())
            }
            BuildProblem::ModuleNameClash { module } => {
                write!(f, "two entry files both define module {module}")
            }
            BuildProblem::BadModuleName { path } => {
                write!(f, "{} does not correspond to a valid module name", path.display())
            }
            BuildProblem::AmbiguousLocal {
                module,
                first,
                second,
            } => write!(
                f,
                "module {module} exists in two source directories: {} and {}",
                first.display(),
                second.display()
            ),
            BuildProblem::NameMismatch {
                path,
                expected,
                declared,
            } => write!(
                f,
                "{} must define module {expected}, but its header says {declared}",
                path.display()
            ),
            BuildProblem::ImportNotFound { importer, import } => {
                write!(f, "module {importer} imports {import}, which cannot be found")
            }
            BuildProblem::AmbiguousForeign {
                importer,
                import,
                candidates,
            } => write!(
                f,
                "module {importer} imports {import}, which is exposed by multiple packages: {}",
                candidates
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
            BuildProblem::Cycle(modules) => {
                let mut chain = modules
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>();
                if let Some(first) = chain.first().cloned() {
                    chain.push(first);
                }
                write!(f, "import cycle: {}", chain.join(" -> "))
            }
            BuildProblem::MissingExposed { module } => {
                write!(f, "exposed module {module} has no source file")
            }
            BuildProblem::BadSyntax { path, message } => {
                write!(f, "cannot parse {}: {message}", path.display())
            }
            BuildProblem::BadModule { module, diagnostics } => {
                write!(f, "module {module} failed to compile:")?;
                for diagnostic in diagnostics {
                    write!(f, "\n  {}: {}", diagnostic.title, diagnostic.message)?;
                }
                Ok(())
            }
        }
    }
}

/// Failures while assembling output.
#[derive(Debug, Error)]
pub enum GenerateError {
    #[error("--optimize and --debug cannot be used at the same time")]
    CannotOptimizeAndDebug,

    #[error("--optimize cannot be used while Debug is in use; remove Debug from: {}",
        .modules.iter().map(ToString::to_string).collect::<Vec<_>>().join(", "))]
    DebugRemnants { modules: Vec<ModuleName> },

    #[error("an HTML page can hold only one program; make was given more than one input file")]
    MultipleFilesIntoHtml,

    #[error("module {module} has no `main` to build a program from")]
    NoMain { module: ModuleName },

    #[error("the .gren cache is corrupt; delete the .gren directory and rebuild")]
    CorruptCache,

    #[error("failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Everything a `make`-style run can fail with.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error(transparent)]
    Details(#[from] DetailsError),

    #[error("{}", .0.iter().map(ToString::to_string).collect::<Vec<_>>().join("\n"))]
    Problems(Vec<BuildProblem>),

    #[error(transparent)]
    Generate(#[from] GenerateError),
}
