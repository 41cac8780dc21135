//! Target platforms

use gren_codec::{CodecError, Decode, Encode, Reader};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Where a project is allowed to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Platform {
    Common,
    Browser,
    Node,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("'{0}' is not a platform (expected common, browser, or node)")]
pub struct PlatformError(String);

impl Platform {
    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Common => "common",
            Platform::Browser => "browser",
            Platform::Node => "node",
        }
    }

    /// A dependency is usable from a root project when it targets the same
    /// platform or the platform-neutral `common`.
    pub fn compatible(root: Platform, dependency: Platform) -> bool {
        root == dependency || dependency == Platform::Common
    }
}

impl FromStr for Platform {
    type Err = PlatformError;

    fn from_str(s: &str) -> Result<Self, PlatformError> {
        match s {
            "common" => Ok(Platform::Common),
            "browser" => Ok(Platform::Browser),
            "node" => Ok(Platform::Node),
            _ => Err(PlatformError(s.to_owned())),
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Platform {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Platform {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(D::Error::custom)
    }
}

impl Encode for Platform {
    fn encode(&self, buf: &mut Vec<u8>) {
        let tag: u8 = match self {
            Platform::Common => 0,
            Platform::Browser => 1,
            Platform::Node => 2,
        };
        tag.encode(buf);
    }
}

impl Decode for Platform {
    fn decode(reader: &mut Reader<'_>) -> Result<Self, CodecError> {
        match reader.u8()? {
            0 => Ok(Platform::Common),
            1 => Ok(Platform::Browser),
            2 => Ok(Platform::Node),
            tag => Err(CodecError::UnknownTag {
                tag,
                what: "Platform",
            }),
        }
    }
}
