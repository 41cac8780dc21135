//! Module names

use crate::name::PackageName;
use gren_codec::{CodecError, Decode, Encode, Reader};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use thiserror::Error;

/// A raw module name: dot-separated segments, each starting with an
/// uppercase ASCII letter (`Json.Decode`). Compared as an opaque string.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ModuleName(String);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModuleNameError {
    #[error("module name is empty")]
    Empty,

    #[error("module name segment '{0}' must start with an uppercase letter")]
    BadStart(String),

    #[error("module name segment '{segment}' contains '{bad}'")]
    BadChar { segment: String, bad: char },
}

impl ModuleName {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split('.')
    }

    /// The source file a module is expected to live in, relative to a
    /// source directory (`Json.Decode` -> `Json/Decode.gren`).
    pub fn to_source_path(&self) -> PathBuf {
        let mut path: PathBuf = self.segments().collect();
        path.set_extension("gren");
        path
    }

    /// The kernel file a module is expected to live in, relative to a
    /// source directory.
    pub fn to_kernel_path(&self) -> PathBuf {
        let mut path: PathBuf = self.segments().collect();
        path.set_extension("js");
        path
    }
}

impl FromStr for ModuleName {
    type Err = ModuleNameError;

    fn from_str(s: &str) -> Result<Self, ModuleNameError> {
        if s.is_empty() {
            return Err(ModuleNameError::Empty);
        }
        for segment in s.split('.') {
            let mut chars = segment.chars();
            match chars.next() {
                Some(first) if first.is_ascii_uppercase() => {}
                _ => return Err(ModuleNameError::BadStart(segment.to_owned())),
            }
            if let Some(bad) = chars.find(|c| !(c.is_ascii_alphanumeric() || *c == '_')) {
                return Err(ModuleNameError::BadChar {
                    segment: segment.to_owned(),
                    bad,
                });
            }
        }
        Ok(ModuleName(s.to_owned()))
    }
}

impl fmt::Display for ModuleName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Serialize for ModuleName {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for ModuleName {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(D::Error::custom)
    }
}

impl Encode for ModuleName {
    fn encode(&self, buf: &mut Vec<u8>) {
        self.0.encode(buf);
    }
}

impl Decode for ModuleName {
    fn decode(reader: &mut Reader<'_>) -> Result<Self, CodecError> {
        Ok(ModuleName(String::decode(reader)?))
    }
}

/// A module name qualified by the package that owns it.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CanonicalName {
    pub package: PackageName,
    pub module: ModuleName,
}

impl CanonicalName {
    pub fn new(package: PackageName, module: ModuleName) -> Self {
        Self { package, module }
    }
}

impl fmt::Display for CanonicalName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.package, self.module)
    }
}

impl Encode for CanonicalName {
    fn encode(&self, buf: &mut Vec<u8>) {
        self.package.encode(buf);
        self.module.encode(buf);
    }
}

impl Decode for CanonicalName {
    fn decode(reader: &mut Reader<'_>) -> Result<Self, CodecError> {
        Ok(CanonicalName {
            package: PackageName::decode(reader)?,
            module: ModuleName::decode(reader)?,
        })
    }
}
