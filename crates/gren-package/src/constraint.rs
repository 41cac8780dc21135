//! Version constraints
//!
//! A constraint is a half-open range `[lo, hi)` written `"1.0.0 <= v < 2.0.0"`.
//! The textual shape is enforced at parse time so manifests stay uniform.

use crate::version::{Version, VersionError, COMPILER_VERSION};
use gren_codec::{CodecError, Decode, Encode, Reader};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Constraint {
    lo: Version,
    hi: Version,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConstraintError {
    #[error("expected the shape 'LOW <= v < HIGH', got '{0}'")]
    BadShape(String),

    #[error("bad version in constraint: {0}")]
    BadVersion(#[from] VersionError),

    #[error("constraint '{0}' has its bounds out of order")]
    BoundsOutOfOrder(String),
}

impl Constraint {
    /// `[lo, hi)`, requiring `lo <= hi`.
    pub fn range(lo: Version, hi: Version) -> Option<Self> {
        if lo <= hi {
            Some(Self { lo, hi })
        } else {
            None
        }
    }

    /// The constraint admitting exactly one version.
    pub fn exactly(version: Version) -> Self {
        Self {
            lo: version,
            hi: version.bump_patch(),
        }
    }

    /// `[v, (v.major + 1).0.0)` — the default constraint when a dependency
    /// is first installed.
    pub fn until_next_major(version: Version) -> Self {
        Self {
            lo: version,
            hi: Version::new(version.major + 1, 0, 0),
        }
    }

    /// The widest constraint; used as the search starting point.
    pub fn anything() -> Self {
        Self {
            lo: Version::new(1, 0, 0),
            hi: Version::MAX,
        }
    }

    pub fn lower_bound(&self) -> Version {
        self.lo
    }

    pub fn upper_bound(&self) -> Version {
        self.hi
    }

    pub fn satisfies(&self, version: Version) -> bool {
        self.lo <= version && version < self.hi
    }

    /// The overlap of two constraints, or `None` when they are disjoint.
    pub fn intersect(&self, other: &Constraint) -> Option<Constraint> {
        let lo = self.lo.max(other.lo);
        let hi = self.hi.min(other.hi);
        if lo < hi {
            Some(Constraint { lo, hi })
        } else {
            None
        }
    }

    /// Whether a package declaring this compiler constraint can be built by
    /// the running compiler.
    pub fn good_gren(&self) -> bool {
        self.satisfies(COMPILER_VERSION)
    }
}

impl FromStr for Constraint {
    type Err = ConstraintError;

    fn from_str(s: &str) -> Result<Self, ConstraintError> {
        let rest = s.trim();
        let (lo_text, rest) = rest
            .split_once("<=")
            .ok_or_else(|| ConstraintError::BadShape(s.to_owned()))?;
        let (v_text, hi_text) = rest
            .split_once('<')
            .ok_or_else(|| ConstraintError::BadShape(s.to_owned()))?;
        if v_text.trim() != "v" {
            return Err(ConstraintError::BadShape(s.to_owned()));
        }

        let lo: Version = lo_text.trim().parse()?;
        let hi: Version = hi_text.trim().parse()?;
        Constraint::range(lo, hi).ok_or_else(|| ConstraintError::BoundsOutOfOrder(s.to_owned()))
    }
}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} <= v < {}", self.lo, self.hi)
    }
}

impl Serialize for Constraint {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Constraint {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(D::Error::custom)
    }
}

impl Encode for Constraint {
    fn encode(&self, buf: &mut Vec<u8>) {
        self.lo.encode(buf);
        self.hi.encode(buf);
    }
}

impl Decode for Constraint {
    fn decode(reader: &mut Reader<'_>) -> Result<Self, CodecError> {
        Ok(Constraint {
            lo: Version::decode(reader)?,
            hi: Version::decode(reader)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(s: &str) -> Version {
        s.parse().unwrap()
    }

    #[test]
    fn test_parse_and_display() {
        let c: Constraint = "1.0.0 <= v < 2.0.0".parse().unwrap();
        assert_eq!(c.lower_bound(), v("1.0.0"));
        assert_eq!(c.upper_bound(), v("2.0.0"));
        assert_eq!(c.to_string(), "1.0.0 <= v < 2.0.0");
    }

    #[test]
    fn test_parse_rejects_other_shapes() {
        assert!("1.0.0".parse::<Constraint>().is_err());
        assert!("1.0.0 < v < 2.0.0".parse::<Constraint>().is_err());
        assert!("1.0.0 <= v <= 2.0.0".parse::<Constraint>().is_err());
        assert!("1.0.0 <= w < 2.0.0".parse::<Constraint>().is_err());
        assert!("2.0.0 <= v < 1.0.0".parse::<Constraint>().is_err());
    }

    #[test]
    fn test_half_open_bounds() {
        let c: Constraint = "1.0.0 <= v < 2.0.0".parse().unwrap();
        assert!(c.satisfies(v("1.0.0")));
        assert!(c.satisfies(v("1.9.9")));
        assert!(!c.satisfies(v("2.0.0")));
        assert!(!c.satisfies(v("0.9.9")));
    }

    #[test]
    fn test_exactly_admits_one_version() {
        let c = Constraint::exactly(v("1.2.3"));
        assert!(c.satisfies(v("1.2.3")));
        assert!(!c.satisfies(v("1.2.4")));
        assert!(!c.satisfies(v("1.2.2")));
    }

    #[test]
    fn test_intersect() {
        let a: Constraint = "1.0.0 <= v < 3.0.0".parse().unwrap();
        let b: Constraint = "2.0.0 <= v < 4.0.0".parse().unwrap();
        let both = a.intersect(&b).unwrap();
        assert_eq!(both.to_string(), "2.0.0 <= v < 3.0.0");

        let c: Constraint = "3.0.0 <= v < 4.0.0".parse().unwrap();
        let d: Constraint = "1.0.0 <= v < 2.0.0".parse().unwrap();
        assert_eq!(c.intersect(&d), None);
    }

    #[test]
    fn test_until_next_major() {
        let c = Constraint::until_next_major(v("1.2.3"));
        assert!(c.satisfies(v("1.2.3")));
        assert!(c.satisfies(v("1.9.0")));
        assert!(!c.satisfies(v("2.0.0")));
    }

    #[test]
    fn test_good_gren() {
        let wide = Constraint::until_next_major(Version::new(COMPILER_VERSION.major, 0, 0));
        assert!(wide.good_gren());

        let old: Constraint = "0.1.0 <= v < 0.2.0".parse().unwrap();
        assert!(!old.good_gren());
    }

    #[test]
    fn test_codec_roundtrip() {
        let c: Constraint = "1.0.0 <= v < 2.0.0".parse().unwrap();
        assert_eq!(Constraint::from_bytes(&c.to_bytes()).unwrap(), c);
    }
}
