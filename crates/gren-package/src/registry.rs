//! Registry abstraction and the on-disk package cache
//!
//! The actual registry client (HTTP, git) lives outside this crate; the
//! solver and builder only see the `Registry` trait. Fetched packages land
//! in a shared per-user cache laid out as
//! `<cache>/<author>/<project>/<version>/{gren.json, src/, artifacts.dat}`.

use crate::name::PackageName;
use crate::outline::{OutlineError, PkgOutline};
use crate::version::{Version, COMPILER_VERSION};
use std::path::{Path, PathBuf};
use std::time::Duration;
use std::{env, fs};
use thiserror::Error;
use tracing::debug;

/// A source of published package versions and their contents.
///
/// `populate` must leave `<cache>/<author>/<project>/<version>/` holding at
/// least `gren.json` and `src/`.
pub trait Registry: Sync {
    fn versions(&self, name: &PackageName) -> Result<Vec<Version>, RegistryError>;

    fn populate(
        &self,
        cache: &PackageCache,
        name: &PackageName,
        version: Version,
    ) -> Result<(), RegistryError>;
}

#[derive(Debug, Error)]
pub enum RegistryError {
    /// The registry cannot be reached at all. Callers fall back to the
    /// local cache when they see this.
    #[error("registry is unreachable: {0}")]
    Unreachable(String),

    #[error("package {0} is not known to the registry")]
    UnknownPackage(PackageName),

    #[error("git failure: {0}")]
    Git(String),

    #[error("io failure: {0}")]
    Io(#[from] std::io::Error),
}

impl RegistryError {
    pub fn is_unreachable(&self) -> bool {
        matches!(self, RegistryError::Unreachable(_))
    }
}

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cannot locate a package cache: set $GREN_HOME or $HOME")]
    NoCacheHome,

    #[error("failed to prepare package cache at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// The shared on-disk package cache.
#[derive(Debug, Clone)]
pub struct PackageCache {
    root: PathBuf,
}

impl PackageCache {
    /// Use an explicit cache root (tests, unusual setups).
    pub fn at(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Resolve the per-user cache root: `$GREN_HOME`, else
    /// `$XDG_CACHE_HOME/gren`, else `$HOME/.cache/gren`, each suffixed with
    /// the compiler version so incompatible artifact formats never meet.
    pub fn resolve() -> Result<Self, CacheError> {
        let base = if let Some(home) = env::var_os("GREN_HOME") {
            PathBuf::from(home)
        } else if let Some(xdg) = env::var_os("XDG_CACHE_HOME") {
            PathBuf::from(xdg).join("gren")
        } else if let Some(home) = env::var_os("HOME") {
            PathBuf::from(home).join(".cache").join("gren")
        } else {
            return Err(CacheError::NoCacheHome);
        };

        let root = base.join(COMPILER_VERSION.to_string()).join("packages");
        fs::create_dir_all(&root).map_err(|source| CacheError::Io {
            path: root.clone(),
            source,
        })?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn package_dir(&self, name: &PackageName) -> PathBuf {
        self.root.join(name.author()).join(name.project())
    }

    pub fn version_dir(&self, name: &PackageName, version: Version) -> PathBuf {
        self.package_dir(name).join(version.to_string())
    }

    pub fn source_dir(&self, name: &PackageName, version: Version) -> PathBuf {
        self.version_dir(name, version).join("src")
    }

    pub fn artifacts_path(&self, name: &PackageName, version: Version) -> PathBuf {
        self.version_dir(name, version).join("artifacts.dat")
    }

    /// Whether a package version's sources have been fetched.
    pub fn is_populated(&self, name: &PackageName, version: Version) -> bool {
        self.version_dir(name, version)
            .join(crate::outline::OUTLINE_FILE)
            .is_file()
    }

    /// All versions of a package present in the cache, ascending.
    /// Entries that do not parse as versions are ignored.
    pub fn cached_versions(&self, name: &PackageName) -> Vec<Version> {
        let mut versions = Vec::new();
        let Ok(entries) = fs::read_dir(self.package_dir(name)) else {
            return versions;
        };
        for entry in entries.flatten() {
            if let Some(dir_name) = entry.file_name().to_str() {
                if let Ok(version) = dir_name.parse::<Version>() {
                    versions.push(version);
                }
            }
        }
        versions.sort_unstable();
        versions
    }

    /// Read a cached package's `gren.json`.
    pub fn outline(
        &self,
        name: &PackageName,
        version: Version,
    ) -> Result<PkgOutline, OutlineError> {
        PkgOutline::read(&self.version_dir(name, version))
    }
}

#[derive(Debug, Error)]
pub enum LockError {
    #[error("another gren process is writing the package cache (lock: {0})")]
    Busy(PathBuf),

    #[error("failed to lock the package cache at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Cross-process lock over the package cache.
///
/// Only one builder per machine may write package artifacts at a time; the
/// lock file is removed on drop. Locks older than ten minutes are treated
/// as leftovers from a killed process and broken.
pub struct RegistryLock {
    path: PathBuf,
}

const LOCK_RETRIES: u32 = 100;
const LOCK_RETRY_DELAY: Duration = Duration::from_millis(100);
const LOCK_STALE_AFTER: Duration = Duration::from_secs(600);

impl RegistryLock {
    pub fn acquire(cache: &PackageCache) -> Result<RegistryLock, LockError> {
        let path = cache.root().join("registry.lock");

        for _ in 0..LOCK_RETRIES {
            match fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&path)
            {
                Ok(_) => {
                    debug!(lock = %path.display(), "acquired registry lock");
                    return Ok(RegistryLock { path });
                }
                Err(err) if err.kind() == std::io::ErrorKind::AlreadyExists => {
                    if lock_is_stale(&path) {
                        debug!(lock = %path.display(), "breaking stale registry lock");
                        let _ = fs::remove_file(&path);
                        continue;
                    }
                    std::thread::sleep(LOCK_RETRY_DELAY);
                }
                Err(source) => return Err(LockError::Io { path, source }),
            }
        }

        Err(LockError::Busy(path))
    }
}

fn lock_is_stale(path: &Path) -> bool {
    fs::metadata(path)
        .and_then(|meta| meta.modified())
        .ok()
        .and_then(|modified| modified.elapsed().ok())
        .map(|age| age > LOCK_STALE_AFTER)
        .unwrap_or(false)
}

impl Drop for RegistryLock {
    fn drop(&mut self) {
        let _ = fs::remove_file(&self.path);
    }
}
