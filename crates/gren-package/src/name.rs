//! Package names (`author/project`)

use gren_codec::{CodecError, Decode, Encode, Reader};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Package authors allowed to ship raw-JavaScript kernel modules.
const KERNEL_AUTHORS: &[&str] = &["gren-lang"];

/// An `author/project` package identifier.
///
/// Both halves follow the same rules: lowercase ASCII letters, digits, and
/// hyphens; no leading digit; no leading, trailing, or doubled hyphen.
/// Ordering is lexicographic by author, then project.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PackageName {
    author: String,
    project: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NameError {
    #[error("package name '{0}' is missing the author/project slash")]
    MissingSlash(String),

    #[error("package name '{0}' has more than one slash")]
    ExtraSlash(String),

    #[error("bad {half} in package name: {problem}")]
    BadPart { half: &'static str, problem: NameProblem },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NameProblem {
    #[error("it is empty")]
    Empty,
    #[error("'{0}' is not lowercase ASCII, a digit, or a hyphen")]
    BadChar(char),
    #[error("it starts with a digit")]
    LeadingDigit,
    #[error("it starts or ends with a hyphen")]
    EdgeHyphen,
    #[error("it contains a doubled hyphen")]
    DoubleHyphen,
}

impl PackageName {
    pub fn new(author: &str, project: &str) -> Result<Self, NameError> {
        validate_part(author).map_err(|problem| NameError::BadPart {
            half: "author",
            problem,
        })?;
        validate_part(project).map_err(|problem| NameError::BadPart {
            half: "project",
            problem,
        })?;
        Ok(Self {
            author: author.to_owned(),
            project: project.to_owned(),
        })
    }

    pub fn author(&self) -> &str {
        &self.author
    }

    pub fn project(&self) -> &str {
        &self.project
    }

    /// Whether this package may ship kernel (raw JavaScript) modules.
    pub fn is_kernel_privileged(&self) -> bool {
        KERNEL_AUTHORS.contains(&self.author.as_str())
    }
}

fn validate_part(part: &str) -> Result<(), NameProblem> {
    if part.is_empty() {
        return Err(NameProblem::Empty);
    }
    if let Some(bad) = part
        .chars()
        .find(|c| !(c.is_ascii_lowercase() || c.is_ascii_digit() || *c == '-'))
    {
        return Err(NameProblem::BadChar(bad));
    }
    if part.starts_with(|c: char| c.is_ascii_digit()) {
        return Err(NameProblem::LeadingDigit);
    }
    if part.starts_with('-') || part.ends_with('-') {
        return Err(NameProblem::EdgeHyphen);
    }
    if part.contains("--") {
        return Err(NameProblem::DoubleHyphen);
    }
    Ok(())
}

impl FromStr for PackageName {
    type Err = NameError;

    fn from_str(s: &str) -> Result<Self, NameError> {
        let mut halves = s.splitn(3, '/');
        let author = halves.next().unwrap_or_default();
        let project = halves
            .next()
            .ok_or_else(|| NameError::MissingSlash(s.to_owned()))?;
        if halves.next().is_some() {
            return Err(NameError::ExtraSlash(s.to_owned()));
        }
        PackageName::new(author, project)
    }
}

impl fmt::Display for PackageName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.author, self.project)
    }
}

impl Serialize for PackageName {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for PackageName {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(D::Error::custom)
    }
}

impl Encode for PackageName {
    fn encode(&self, buf: &mut Vec<u8>) {
        self.author.encode(buf);
        self.project.encode(buf);
    }
}

impl Decode for PackageName {
    fn decode(reader: &mut Reader<'_>) -> Result<Self, CodecError> {
        let author = String::decode(reader)?;
        let project = String::decode(reader)?;
        Ok(Self { author, project })
    }
}
