//! Gren package model and dependency resolution
//!
//! The shared data model (names, versions, constraints, platforms, module
//! names), `gren.json` outlines, the backtracking dependency solver, and
//! the on-disk package cache it works against.

pub mod constraint;
pub mod module;
pub mod name;
pub mod outline;
pub mod platform;
pub mod registry;
pub mod solver;
pub mod version;

pub use constraint::{Constraint, ConstraintError};
pub use module::{CanonicalName, ModuleName, ModuleNameError};
pub use name::{NameError, PackageName};
pub use outline::{
    AppOutline, Exposed, Outline, OutlineError, OutlineProblem, PkgOutline, Region, OUTLINE_FILE,
};
pub use platform::{Platform, PlatformError};
pub use registry::{
    CacheError, LockError, PackageCache, Registry, RegistryError, RegistryLock,
};
pub use solver::{Connection, Outcome, Selection, Solution, Solver, SolverError};
pub use version::{Version, VersionError, COMPILER_VERSION};
