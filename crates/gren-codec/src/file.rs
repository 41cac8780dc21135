//! Reading and writing encoded values on disk
//!
//! Callers treat a `Corrupt` result as "delete the cache and rebuild": the
//! bytes are never partially trusted.

use crate::{CodecError, Decode, Encode};
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FileError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },

    #[error("failed to write {path}: {source}")]
    Write {
        path: String,
        source: std::io::Error,
    },

    #[error("corrupt data in {path}: {source}")]
    Corrupt {
        path: String,
        source: CodecError,
    },
}

impl FileError {
    pub fn is_corrupt(&self) -> bool {
        matches!(self, FileError::Corrupt { .. })
    }
}

/// Decode a complete value from a file.
pub fn read<T: Decode>(path: &Path) -> Result<T, FileError> {
    let bytes = fs::read(path).map_err(|source| FileError::Read {
        path: path.display().to_string(),
        source,
    })?;
    T::from_bytes(&bytes).map_err(|source| FileError::Corrupt {
        path: path.display().to_string(),
        source,
    })
}

/// Encode a value and write it, creating parent directories as needed.
pub fn write<T: Encode>(path: &Path, value: &T) -> Result<(), FileError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|source| FileError::Write {
            path: path.display().to_string(),
            source,
        })?;
    }
    fs::write(path, value.to_bytes()).map_err(|source| FileError::Write {
        path: path.display().to_string(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_write_then_read() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("nested").join("value.dat");

        write(&path, &String::from("payload")).unwrap();
        let back: String = read(&path).unwrap();
        assert_eq!(back, "payload");
    }

    #[test]
    fn test_read_missing_file() {
        let temp = TempDir::new().unwrap();
        let result: Result<String, _> = read(&temp.path().join("absent.dat"));
        assert!(matches!(result, Err(FileError::Read { .. })));
    }

    #[test]
    fn test_flipped_byte_is_corrupt() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("value.dat");
        write(&path, &String::from("payload")).unwrap();

        let mut bytes = fs::read(&path).unwrap();
        bytes[0] ^= 0x40;
        fs::write(&path, bytes).unwrap();

        let result: Result<String, _> = read(&path);
        assert!(result.unwrap_err().is_corrupt());
    }
}
