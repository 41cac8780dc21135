//! Package versions

use gren_codec::{CodecError, Decode, Encode, Reader};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// A `major.minor.patch` version. Ordering is lexicographic by component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Version {
    pub major: u16,
    pub minor: u16,
    pub patch: u16,
}

/// The version of the compiler this library is built into.
pub const COMPILER_VERSION: Version = Version {
    major: 0,
    minor: 5,
    patch: 2,
};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VersionError {
    #[error("expected three dot-separated components, got '{0}'")]
    BadShape(String),

    #[error("'{0}' is not an unsigned version component")]
    BadComponent(String),
}

impl Version {
    /// The only legal first release of a package.
    pub const ONE: Version = Version {
        major: 1,
        minor: 0,
        patch: 0,
    };

    pub const MAX: Version = Version {
        major: u16::MAX,
        minor: u16::MAX,
        patch: u16::MAX,
    };

    pub fn new(major: u16, minor: u16, patch: u16) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }

    pub fn bump_patch(self) -> Self {
        Self::new(self.major, self.minor, self.patch + 1)
    }

    pub fn bump_minor(self) -> Self {
        Self::new(self.major, self.minor + 1, 0)
    }

    pub fn bump_major(self) -> Self {
        Self::new(self.major + 1, 0, 0)
    }
}

impl FromStr for Version {
    type Err = VersionError;

    fn from_str(s: &str) -> Result<Self, VersionError> {
        let mut parts = s.split('.');
        let mut next = || -> Result<u16, VersionError> {
            let part = parts
                .next()
                .ok_or_else(|| VersionError::BadShape(s.to_owned()))?;
            // Reject signs, whitespace, and leading zeros like "01".
            if part.is_empty()
                || !part.bytes().all(|b| b.is_ascii_digit())
                || (part.len() > 1 && part.starts_with('0'))
            {
                return Err(VersionError::BadComponent(part.to_owned()));
            }
            part.parse()
                .map_err(|_| VersionError::BadComponent(part.to_owned()))
        };

        let version = Version::new(next()?, next()?, next()?);
        if parts.next().is_some() {
            return Err(VersionError::BadShape(s.to_owned()));
        }
        Ok(version)
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

impl Serialize for Version {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Version {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(D::Error::custom)
    }
}

impl Encode for Version {
    fn encode(&self, buf: &mut Vec<u8>) {
        self.major.encode(buf);
        self.minor.encode(buf);
        self.patch.encode(buf);
    }
}

impl Decode for Version {
    fn decode(reader: &mut Reader<'_>) -> Result<Self, CodecError> {
        Ok(Version {
            major: u16::decode(reader)?,
            minor: u16::decode(reader)?,
            patch: u16::decode(reader)?,
        })
    }
}
