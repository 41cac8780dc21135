//! Project manifests (`gren.json`)
//!
//! An outline is the validated, in-memory form of a project's `gren.json`.
//! Applications pin exact versions (direct + indirect); packages declare
//! constraints. Outlines are re-read and re-validated on every load and are
//! never mutated in place.

use crate::constraint::Constraint;
use crate::name::PackageName;
use crate::module::ModuleName;
use crate::platform::Platform;
use crate::version::{Version, COMPILER_VERSION};
use gren_codec::{CodecError, Decode, Encode, Reader};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const OUTLINE_FILE: &str = "gren.json";

const MAX_SUMMARY_BYTES: usize = 80;
const MAX_HEADER_BYTES: usize = 20;

/// SPDX identifiers accepted in the `license` field.
const SPDX_LICENSES: &[&str] = &[
    "AGPL-3.0-only",
    "AGPL-3.0-or-later",
    "Apache-2.0",
    "BSD-2-Clause",
    "BSD-3-Clause",
    "BSL-1.0",
    "CC0-1.0",
    "EPL-2.0",
    "GPL-2.0-only",
    "GPL-2.0-or-later",
    "GPL-3.0-only",
    "GPL-3.0-or-later",
    "ISC",
    "LGPL-2.1-only",
    "LGPL-2.1-or-later",
    "LGPL-3.0-only",
    "LGPL-3.0-or-later",
    "MIT",
    "MPL-2.0",
    "Unlicense",
    "Zlib",
];

/// A 1-based (row, col) position in the manifest, for snippet rendering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Region {
    pub row: usize,
    pub col: usize,
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.row, self.col)
    }
}

#[derive(Debug, Error)]
pub enum OutlineError {
    #[error("could not find {OUTLINE_FILE} in {0}")]
    NotFound(PathBuf),

    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("{OUTLINE_FILE} is not valid JSON at {region}: {message}")]
    Syntax { region: Region, message: String },

    #[error("bad value in {OUTLINE_FILE} at {region}: {message}")]
    Schema { region: Region, message: String },

    #[error("invalid {OUTLINE_FILE}{}: {problem}", fmt_region(.region))]
    Invalid {
        region: Option<Region>,
        problem: OutlineProblem,
    },
}

fn fmt_region(region: &Option<Region>) -> String {
    match region {
        Some(r) => format!(" at {r}"),
        None => String::new(),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OutlineProblem {
    #[error("the \"type\" field must be \"application\" or \"package\", got \"{0}\"")]
    BadType(String),

    #[error("this compiler is {COMPILER_VERSION} but gren-version says {found}")]
    BadCompilerVersion { found: Version },

    #[error("gren-version constraint '{0}' does not accept this compiler ({COMPILER_VERSION})")]
    IncompatibleCompiler(Constraint),

    #[error("source-directories must not be empty")]
    NoSourceDirectories,

    #[error("source directory '{0}' is listed twice")]
    DuplicateSourceDirectory(PathBuf),

    #[error("'{0}' appears in both direct and indirect dependencies")]
    OverlappingDependency(PackageName),

    #[error("exposed-modules must not be empty")]
    NoExposedModules,

    #[error("exposed-modules header '{header}' {reason}")]
    BadHeader {
        header: String,
        reason: &'static str,
    },

    #[error("module '{0}' is exposed more than once")]
    DuplicateExposed(ModuleName),

    #[error("the summary is {0} bytes; it must be under {MAX_SUMMARY_BYTES}")]
    SummaryTooLong(usize),

    #[error("'{0}' is not a known SPDX license identifier")]
    UnknownLicense(String),
}

/// The validated form of `gren.json`.
#[derive(Debug, Clone, PartialEq)]
pub enum Outline {
    App(AppOutline),
    Pkg(PkgOutline),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppOutline {
    #[serde(rename = "type")]
    tag: AppTag,
    pub platform: Platform,
    #[serde(rename = "source-directories")]
    pub source_dirs: Vec<PathBuf>,
    #[serde(rename = "gren-version")]
    pub gren_version: Version,
    pub dependencies: AppDependencies,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppDependencies {
    pub direct: BTreeMap<PackageName, Version>,
    pub indirect: BTreeMap<PackageName, Version>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PkgOutline {
    #[serde(rename = "type")]
    tag: PkgTag,
    pub name: PackageName,
    pub summary: String,
    pub license: String,
    pub version: Version,
    pub platform: Platform,
    #[serde(rename = "exposed-modules")]
    pub exposed: Exposed,
    #[serde(rename = "gren-version")]
    pub gren_version: Constraint,
    pub dependencies: BTreeMap<PackageName, Constraint>,
}

/// Exposed modules: a flat list, or grouped under documentation headers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Exposed {
    Flat(Vec<ModuleName>),
    Headered(BTreeMap<String, Vec<ModuleName>>),
}

impl Exposed {
    pub fn modules(&self) -> Vec<&ModuleName> {
        match self {
            Exposed::Flat(modules) => modules.iter().collect(),
            Exposed::Headered(groups) => groups.values().flatten().collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.modules().is_empty()
    }
}

impl Outline {
    /// Read and validate `<root>/gren.json`.
    pub fn read(root: &Path) -> Result<Outline, OutlineError> {
        let path = root.join(OUTLINE_FILE);
        let source = match fs::read_to_string(&path) {
            Ok(source) => source,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Err(OutlineError::NotFound(root.to_path_buf()))
            }
            Err(source) => return Err(OutlineError::Io { path, source }),
        };
        Outline::decode(&source)
    }

    /// Parse and validate an outline from raw JSON text.
    pub fn decode(source: &str) -> Result<Outline, OutlineError> {
        let outline = match probe_type(source)?.as_str() {
            "application" => Outline::App(from_json(source)?),
            "package" => Outline::Pkg(from_json(source)?),
            other => {
                return Err(OutlineError::Invalid {
                    region: region_of_key(source, "type"),
                    problem: OutlineProblem::BadType(other.to_owned()),
                })
            }
        };
        outline.validate(source)?;
        Ok(outline)
    }

    /// Serialize back to `<root>/gren.json`.
    pub fn write(&self, root: &Path) -> std::io::Result<()> {
        let json = self.to_json_string();
        fs::write(root.join(OUTLINE_FILE), json)
    }

    pub fn to_json_string(&self) -> String {
        let mut json = match self {
            Outline::App(app) => serde_json::to_string_pretty(app),
            Outline::Pkg(pkg) => serde_json::to_string_pretty(pkg),
        }
        .expect("outline serialization is infallible");
        json.push('\n');
        json
    }

    pub fn platform(&self) -> Platform {
        match self {
            Outline::App(app) => app.platform,
            Outline::Pkg(pkg) => pkg.platform,
        }
    }

    fn validate(&self, source: &str) -> Result<(), OutlineError> {
        let invalid = |key: &str, problem: OutlineProblem| OutlineError::Invalid {
            region: region_of_key(source, key),
            problem,
        };

        match self {
            Outline::App(app) => {
                if app.gren_version != COMPILER_VERSION {
                    return Err(invalid(
                        "gren-version",
                        OutlineProblem::BadCompilerVersion {
                            found: app.gren_version,
                        },
                    ));
                }
                if app.source_dirs.is_empty() {
                    return Err(invalid(
                        "source-directories",
                        OutlineProblem::NoSourceDirectories,
                    ));
                }
                let mut seen = BTreeSet::new();
                for dir in &app.source_dirs {
                    if !seen.insert(dir) {
                        return Err(invalid(
                            "source-directories",
                            OutlineProblem::DuplicateSourceDirectory(dir.clone()),
                        ));
                    }
                }
                for name in app.dependencies.direct.keys() {
                    if app.dependencies.indirect.contains_key(name) {
                        return Err(invalid(
                            "indirect",
                            OutlineProblem::OverlappingDependency(name.clone()),
                        ));
                    }
                }
            }
            Outline::Pkg(pkg) => {
                if !pkg.gren_version.good_gren() {
                    return Err(invalid(
                        "gren-version",
                        OutlineProblem::IncompatibleCompiler(pkg.gren_version),
                    ));
                }
                if pkg.summary.len() >= MAX_SUMMARY_BYTES {
                    return Err(invalid(
                        "summary",
                        OutlineProblem::SummaryTooLong(pkg.summary.len()),
                    ));
                }
                if !SPDX_LICENSES.contains(&pkg.license.as_str()) {
                    return Err(invalid(
                        "license",
                        OutlineProblem::UnknownLicense(pkg.license.clone()),
                    ));
                }
                if pkg.exposed.is_empty() {
                    return Err(invalid(
                        "exposed-modules",
                        OutlineProblem::NoExposedModules,
                    ));
                }
                if let Exposed::Headered(groups) = &pkg.exposed {
                    for (header, modules) in groups {
                        if header.is_empty() {
                            return Err(invalid(
                                "exposed-modules",
                                OutlineProblem::BadHeader {
                                    header: header.clone(),
                                    reason: "is empty",
                                },
                            ));
                        }
                        if header.len() > MAX_HEADER_BYTES {
                            return Err(invalid(
                                "exposed-modules",
                                OutlineProblem::BadHeader {
                                    header: header.clone(),
                                    reason: "is longer than 20 bytes",
                                },
                            ));
                        }
                        if modules.is_empty() {
                            return Err(invalid(
                                "exposed-modules",
                                OutlineProblem::BadHeader {
                                    header: header.clone(),
                                    reason: "has no modules",
                                },
                            ));
                        }
                    }
                }
                let mut seen = BTreeSet::new();
                for module in pkg.exposed.modules() {
                    if !seen.insert(module) {
                        return Err(invalid(
                            "exposed-modules",
                            OutlineProblem::DuplicateExposed(module.clone()),
                        ));
                    }
                }
            }
        }
        Ok(())
    }
}

impl PkgOutline {
    /// Parse a dependency's cached `gren.json` without project-root
    /// validation. The solver applies its own admissibility checks
    /// (platform, compiler constraint) per candidate instead of failing.
    pub fn decode(source: &str) -> Result<PkgOutline, OutlineError> {
        let kind = probe_type(source)?;
        if kind != "package" {
            return Err(OutlineError::Invalid {
                region: region_of_key(source, "type"),
                problem: OutlineProblem::BadType(kind),
            });
        }
        from_json(source)
    }

    pub fn read(dir: &Path) -> Result<PkgOutline, OutlineError> {
        let path = dir.join(OUTLINE_FILE);
        let source = match fs::read_to_string(&path) {
            Ok(source) => source,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Err(OutlineError::NotFound(dir.to_path_buf()))
            }
            Err(source) => return Err(OutlineError::Io { path, source }),
        };
        PkgOutline::decode(&source)
    }

    pub fn exposed_modules(&self) -> Vec<ModuleName> {
        self.exposed.modules().into_iter().cloned().collect()
    }
}

#[derive(Deserialize)]
struct Probe {
    #[serde(rename = "type")]
    kind: String,
}

fn probe_type(source: &str) -> Result<String, OutlineError> {
    let probe: Probe = from_json(source)?;
    Ok(probe.kind)
}

fn from_json<'de, T: Deserialize<'de>>(source: &'de str) -> Result<T, OutlineError> {
    serde_json::from_str(source).map_err(|err| {
        let region = Region {
            row: err.line().max(1),
            col: err.column().max(1),
        };
        if err.is_syntax() || err.is_eof() {
            OutlineError::Syntax {
                region,
                message: err.to_string(),
            }
        } else {
            OutlineError::Schema {
                region,
                message: err.to_string(),
            }
        }
    })
}

/// Best-effort region of a top-level key, for validation errors that are
/// only detectable after the whole document parses.
fn region_of_key(source: &str, key: &str) -> Option<Region> {
    let needle = format!("\"{key}\"");
    let offset = source.find(&needle)?;
    let before = &source[..offset];
    let row = before.matches('\n').count() + 1;
    let col = offset - before.rfind('\n').map(|i| i + 1).unwrap_or(0) + 1;
    Some(Region { row, col })
}

// Tag fields: serialize to the fixed discriminant and reject anything else
// on the way in.

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
struct AppTag;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
struct PkgTag;

impl Serialize for AppTag {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str("application")
    }
}

impl<'de> Deserialize<'de> for AppTag {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match String::deserialize(deserializer)?.as_str() {
            "application" => Ok(AppTag),
            other => Err(D::Error::custom(format!(
                "expected \"application\", got \"{other}\""
            ))),
        }
    }
}

impl Serialize for PkgTag {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str("package")
    }
}

impl<'de> Deserialize<'de> for PkgTag {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match String::deserialize(deserializer)?.as_str() {
            "package" => Ok(PkgTag),
            other => Err(D::Error::custom(format!(
                "expected \"package\", got \"{other}\""
            ))),
        }
    }
}

impl AppOutline {
    pub fn new(
        platform: Platform,
        source_dirs: Vec<PathBuf>,
        direct: BTreeMap<PackageName, Version>,
        indirect: BTreeMap<PackageName, Version>,
    ) -> Self {
        Self {
            tag: AppTag,
            platform,
            source_dirs,
            gren_version: COMPILER_VERSION,
            dependencies: AppDependencies { direct, indirect },
        }
    }
}

impl PkgOutline {
    pub fn new(
        name: PackageName,
        summary: String,
        license: String,
        version: Version,
        platform: Platform,
        exposed: Exposed,
        gren_version: Constraint,
        dependencies: BTreeMap<PackageName, Constraint>,
    ) -> Self {
        Self {
            tag: PkgTag,
            name,
            summary,
            license,
            version,
            platform,
            exposed,
            gren_version,
            dependencies,
        }
    }
}

// Binary codec: the outline snapshot is embedded in `details.dat`.

impl Encode for Outline {
    fn encode(&self, buf: &mut Vec<u8>) {
        match self {
            Outline::App(app) => {
                0u8.encode(buf);
                app.encode(buf);
            }
            Outline::Pkg(pkg) => {
                1u8.encode(buf);
                pkg.encode(buf);
            }
        }
    }
}

impl Decode for Outline {
    fn decode(reader: &mut Reader<'_>) -> Result<Self, CodecError> {
        match reader.u8()? {
            0 => Ok(Outline::App(AppOutline::decode(reader)?)),
            1 => Ok(Outline::Pkg(<PkgOutline as Decode>::decode(reader)?)),
            tag => Err(CodecError::UnknownTag {
                tag,
                what: "Outline",
            }),
        }
    }
}

impl Encode for AppOutline {
    fn encode(&self, buf: &mut Vec<u8>) {
        self.platform.encode(buf);
        self.source_dirs.encode(buf);
        self.gren_version.encode(buf);
        self.dependencies.direct.encode(buf);
        self.dependencies.indirect.encode(buf);
    }
}

impl Decode for AppOutline {
    fn decode(reader: &mut Reader<'_>) -> Result<Self, CodecError> {
        Ok(AppOutline {
            tag: AppTag,
            platform: Platform::decode(reader)?,
            source_dirs: Vec::decode(reader)?,
            gren_version: Version::decode(reader)?,
            dependencies: AppDependencies {
                direct: BTreeMap::decode(reader)?,
                indirect: BTreeMap::decode(reader)?,
            },
        })
    }
}

impl Encode for PkgOutline {
    fn encode(&self, buf: &mut Vec<u8>) {
        self.name.encode(buf);
        self.summary.encode(buf);
        self.license.encode(buf);
        self.version.encode(buf);
        self.platform.encode(buf);
        self.exposed.encode(buf);
        self.gren_version.encode(buf);
        self.dependencies.encode(buf);
    }
}

impl Decode for PkgOutline {
    fn decode(reader: &mut Reader<'_>) -> Result<Self, CodecError> {
        Ok(PkgOutline {
            tag: PkgTag,
            name: PackageName::decode(reader)?,
            summary: String::decode(reader)?,
            license: String::decode(reader)?,
            version: Version::decode(reader)?,
            platform: Platform::decode(reader)?,
            exposed: Exposed::decode(reader)?,
            gren_version: Constraint::decode(reader)?,
            dependencies: BTreeMap::decode(reader)?,
        })
    }
}

impl Encode for Exposed {
    fn encode(&self, buf: &mut Vec<u8>) {
        match self {
            Exposed::Flat(modules) => {
                0u8.encode(buf);
                modules.encode(buf);
            }
            Exposed::Headered(groups) => {
                1u8.encode(buf);
                groups.encode(buf);
            }
        }
    }
}

impl Decode for Exposed {
    fn decode(reader: &mut Reader<'_>) -> Result<Self, CodecError> {
        match reader.u8()? {
            0 => Ok(Exposed::Flat(Vec::decode(reader)?)),
            1 => Ok(Exposed::Headered(BTreeMap::decode(reader)?)),
            tag => Err(CodecError::UnknownTag {
                tag,
                what: "Exposed",
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn app_json() -> String {
        format!(
            r#"{{
    "type": "application",
    "platform": "browser",
    "source-directories": ["src"],
    "gren-version": "{COMPILER_VERSION}",
    "dependencies": {{
        "direct": {{ "gren-lang/core": "1.0.0" }},
        "indirect": {{}}
    }}
}}
"#
        )
    }

    fn pkg_json() -> String {
        format!(
            r#"{{
    "type": "package",
    "name": "someone/widgets",
    "summary": "Widgets for everyone",
    "license": "MIT",
    "version": "2.1.0",
    "platform": "common",
    "exposed-modules": ["Widgets", "Widgets.Button"],
    "gren-version": "0.5.0 <= v < 0.6.0",
    "dependencies": {{ "gren-lang/core": "1.0.0 <= v < 2.0.0" }}
}}
"#
        )
    }

    #[test]
    fn test_decode_application() {
        let outline = Outline::decode(&app_json()).unwrap();
        let Outline::App(app) = outline else {
            panic!("expected an application outline");
        };
        assert_eq!(app.platform, Platform::Browser);
        assert_eq!(app.source_dirs, vec![PathBuf::from("src")]);
        assert_eq!(app.dependencies.direct.len(), 1);
    }

    #[test]
    fn test_decode_package() {
        let outline = Outline::decode(&pkg_json()).unwrap();
        let Outline::Pkg(pkg) = outline else {
            panic!("expected a package outline");
        };
        assert_eq!(pkg.name.to_string(), "someone/widgets");
        assert_eq!(pkg.exposed.modules().len(), 2);
    }

    #[test]
    fn test_syntax_error_has_region() {
        let result = Outline::decode("{ \"type\": ");
        match result {
            Err(OutlineError::Syntax { region, .. }) => assert_eq!(region.row, 1),
            other => panic!("expected a syntax error, got {other:?}"),
        }
    }

    #[test]
    fn test_schema_error_has_region() {
        let bad = app_json().replace("\"browser\"", "\"server\"");
        match Outline::decode(&bad) {
            Err(OutlineError::Schema { region, .. }) => assert_eq!(region.row, 3),
            other => panic!("expected a schema error, got {other:?}"),
        }
    }

    #[test]
    fn test_unknown_type() {
        let bad = app_json().replace("application", "library");
        assert!(matches!(
            Outline::decode(&bad),
            Err(OutlineError::Invalid {
                problem: OutlineProblem::BadType(_),
                ..
            })
        ));
    }

    #[test]
    fn test_wrong_compiler_version() {
        let bad = app_json().replace(&COMPILER_VERSION.to_string(), "9.9.9");
        assert!(matches!(
            Outline::decode(&bad),
            Err(OutlineError::Invalid {
                problem: OutlineProblem::BadCompilerVersion { .. },
                ..
            })
        ));
    }

    #[test]
    fn test_overlapping_dependencies() {
        let bad = app_json().replace(
            r#""indirect": {}"#,
            r#""indirect": { "gren-lang/core": "1.0.0" }"#,
        );
        match Outline::decode(&bad) {
            Err(OutlineError::Invalid {
                region,
                problem: OutlineProblem::OverlappingDependency(name),
            }) => {
                assert_eq!(name.to_string(), "gren-lang/core");
                assert!(region.is_some());
            }
            other => panic!("expected an overlap error, got {other:?}"),
        }
    }

    #[test]
    fn test_empty_source_directories() {
        let bad = app_json().replace(r#"["src"]"#, "[]");
        assert!(matches!(
            Outline::decode(&bad),
            Err(OutlineError::Invalid {
                problem: OutlineProblem::NoSourceDirectories,
                ..
            })
        ));
    }

    #[test]
    fn test_package_incompatible_compiler() {
        let bad = pkg_json().replace("0.5.0 <= v < 0.6.0", "0.1.0 <= v < 0.2.0");
        assert!(matches!(
            Outline::decode(&bad),
            Err(OutlineError::Invalid {
                problem: OutlineProblem::IncompatibleCompiler(_),
                ..
            })
        ));
    }

    #[test]
    fn test_package_bad_license() {
        let bad = pkg_json().replace("MIT", "My-Own-License");
        assert!(matches!(
            Outline::decode(&bad),
            Err(OutlineError::Invalid {
                problem: OutlineProblem::UnknownLicense(_),
                ..
            })
        ));
    }

    #[test]
    fn test_package_headered_exposed() {
        let headered = pkg_json().replace(
            r#"["Widgets", "Widgets.Button"]"#,
            r#"{ "Core": ["Widgets"], "Extras": ["Widgets.Button"] }"#,
        );
        let outline = Outline::decode(&headered).unwrap();
        let Outline::Pkg(pkg) = outline else {
            panic!("expected a package outline");
        };
        assert_eq!(pkg.exposed.modules().len(), 2);
    }

    #[test]
    fn test_package_header_too_long() {
        let long_header = "H".repeat(21);
        let bad = pkg_json().replace(
            r#"["Widgets", "Widgets.Button"]"#,
            &format!(r#"{{ "{long_header}": ["Widgets"] }}"#),
        );
        assert!(matches!(
            Outline::decode(&bad),
            Err(OutlineError::Invalid {
                problem: OutlineProblem::BadHeader { .. },
                ..
            })
        ));
    }

    #[test]
    fn test_duplicate_exposed() {
        let bad = pkg_json().replace(
            r#"["Widgets", "Widgets.Button"]"#,
            r#"["Widgets", "Widgets"]"#,
        );
        assert!(matches!(
            Outline::decode(&bad),
            Err(OutlineError::Invalid {
                problem: OutlineProblem::DuplicateExposed(_),
                ..
            })
        ));
    }

    #[test]
    fn test_summary_too_long() {
        let bad = pkg_json().replace("Widgets for everyone", &"x".repeat(80));
        assert!(matches!(
            Outline::decode(&bad),
            Err(OutlineError::Invalid {
                problem: OutlineProblem::SummaryTooLong(80),
                ..
            })
        ));
    }

    #[test]
    fn test_json_roundtrip() {
        let outline = Outline::decode(&pkg_json()).unwrap();
        let rendered = outline.to_json_string();
        let back = Outline::decode(&rendered).unwrap();
        assert_eq!(back, outline);
    }

    #[test]
    fn test_codec_roundtrip() {
        for source in [app_json(), pkg_json()] {
            let outline = Outline::decode(&source).unwrap();
            let back = Outline::from_bytes(&outline.to_bytes()).unwrap();
            assert_eq!(back, outline);
        }
    }

    #[test]
    fn test_region_of_key() {
        let source = "{\n  \"type\": \"application\"\n}";
        let region = region_of_key(source, "type").unwrap();
        assert_eq!(region, Region { row: 2, col: 3 });
    }
}
