//! Gren build orchestration core
//!
//! Turns a project outline plus a set of entry modules into an up-to-date
//! set of compiled artifacts:
//!
//! - `details` establishes the project build state: solved dependencies,
//!   per-package artifact caches, and the foreign-module table.
//! - `crawl` resolves imports to local files, foreign modules, or kernel
//!   files, and finds every project-level problem it can in one pass.
//! - `compile` coordinates concurrent module compilation over one-shot
//!   futures, applying the incremental staleness rules.
//! - `generate` links the object graph and assembles HTML/JS output.
//! - `artifacts` and the `gren-codec` crate persist all of it between
//!   runs.
//!
//! The parser, type checker, optimizer, and code generator are external:
//! the core drives them through the `host::Compiler` trait.

pub mod artifacts;
pub mod builder;
pub mod compile;
pub mod crawl;
pub mod details;
pub mod error;
pub mod future;
pub mod generate;
pub mod host;
pub mod interfaces;
pub mod objects;
pub mod paths;

pub use artifacts::{ArtifactCache, Artifacts, Fingerprint};
pub use builder::{make, Flags};
pub use crawl::{Crawler, Status};
pub use details::{BuildId, Details, Env, Foreign, Local};
pub use error::{BuildError, BuildProblem, DetailsError, GenerateError};
pub use generate::{Mode, Output, RootModule};
pub use host::{Compiled, Compiler, Diagnostic, Exposing, ParsedModule};
pub use interfaces::{Alias, Constructor, DependencyInterface, Interface, Union};
pub use objects::{GlobalGraph, GlobalName, Kernel, LocalGraph, Node};
