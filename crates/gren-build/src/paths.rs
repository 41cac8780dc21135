//! Project-local cache layout (`<root>/.gren/`)

use std::path::{Path, PathBuf};

pub const GREN_DIR: &str = ".gren";

pub fn gren_dir(root: &Path) -> PathBuf {
    root.join(GREN_DIR)
}

pub fn details_path(root: &Path) -> PathBuf {
    gren_dir(root).join("details.dat")
}

pub fn interfaces_path(root: &Path) -> PathBuf {
    gren_dir(root).join("interfaces.dat")
}

pub fn objects_path(root: &Path) -> PathBuf {
    gren_dir(root).join("objects.dat")
}
