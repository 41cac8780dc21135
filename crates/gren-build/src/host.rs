//! Black-box compiler services and module headers
//!
//! Parsing, type checking, optimization, and code generation live outside
//! this crate; the build core drives them through the `Compiler` trait.
//! What the core *does* read itself is the part it needs before any
//! compiler exists: the module header (name, imports, whether `main` is
//! defined), because the crawler walks imports long before type checking,
//! and the shape of kernel files.

use crate::interfaces::{DependencyInterface, Interface};
use crate::objects::{Kernel, LocalGraph};
use gren_package::{ModuleName, PackageName};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// A compiler diagnostic, forwarded verbatim to the error renderer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub title: String,
    pub message: String,
}

impl Diagnostic {
    pub fn new(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            message: message.into(),
        }
    }
}

/// What a module's `exposing` clause admits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Exposing {
    All,
    Explicit(Vec<String>),
}

/// A source module after header parsing, ready to hand to the compiler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedModule {
    pub name: ModuleName,
    pub path: PathBuf,
    pub source: String,
    pub imports: Vec<ModuleName>,
    pub exposing: Exposing,
    pub has_main: bool,
}

/// What the external compiler produces for one module.
#[derive(Debug, Clone)]
pub struct Compiled {
    pub interface: Interface,
    pub objects: LocalGraph,
}

/// The external compiler: parse body, type check against the visible
/// interfaces, optimize. One call per module; calls for independent
/// modules may run on different threads.
pub trait Compiler: Sync {
    fn compile(
        &self,
        package: &PackageName,
        interfaces: &BTreeMap<ModuleName, DependencyInterface>,
        module: &ParsedModule,
    ) -> Result<Compiled, Vec<Diagnostic>>;
}

/// The pieces of a module header the crawler needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    pub name: Option<ModuleName>,
    pub exposing: Exposing,
    pub imports: Vec<ModuleName>,
    pub has_main: bool,
}

/// Scan a module's header: the `module` line, the `import` block, and
/// whether a top-level `main` exists. Comments are skipped; the body is
/// otherwise untouched.
pub fn parse_header(source: &str) -> Result<Header, String> {
    let mut name = None;
    let mut exposing = Exposing::All;
    let mut imports = Vec::new();
    let mut has_main = false;
    let mut block_comment_depth = 0usize;

    for line in source.lines() {
        let trimmed = line.trim_end();

        if block_comment_depth > 0 {
            block_comment_depth += trimmed.matches("{-").count();
            block_comment_depth = block_comment_depth.saturating_sub(trimmed.matches("-}").count());
            continue;
        }
        if trimmed.starts_with("{-") {
            block_comment_depth = trimmed.matches("{-").count() - trimmed.matches("-}").count();
            continue;
        }
        if trimmed.starts_with("--") || trimmed.is_empty() {
            continue;
        }

        if let Some(rest) = trimmed.strip_prefix("module ") {
            let (module_name, clause) = split_module_clause(rest);
            name = Some(
                module_name
                    .parse::<ModuleName>()
                    .map_err(|err| format!("bad module name: {err}"))?,
            );
            exposing = clause;
        } else if let Some(rest) = trimmed.strip_prefix("import ") {
            let import_name = rest
                .split_whitespace()
                .next()
                .ok_or_else(|| String::from("import is missing a module name"))?;
            imports.push(
                import_name
                    .parse::<ModuleName>()
                    .map_err(|err| format!("bad import name: {err}"))?,
            );
        } else if trimmed.starts_with("main ")
            || trimmed.starts_with("main=")
            || trimmed.starts_with("main:")
            || trimmed == "main"
        {
            has_main = true;
        }
    }

    Ok(Header {
        name,
        exposing,
        imports,
        has_main,
    })
}

fn split_module_clause(rest: &str) -> (&str, Exposing) {
    let rest = rest.trim();
    let (module_name, clause) = match rest.find(" exposing") {
        Some(at) => (&rest[..at], &rest[at..]),
        None => (rest, ""),
    };

    let exposing = match clause.find('(').zip(clause.rfind(')')) {
        Some((open, close)) if close > open => {
            let inner = clause[open + 1..close].trim();
            if inner == ".." {
                Exposing::All
            } else {
                Exposing::Explicit(
                    inner
                        .split(',')
                        .map(|item| item.trim().to_owned())
                        .filter(|item| !item.is_empty())
                        .collect(),
                )
            }
        }
        _ => Exposing::All,
    };

    (module_name.trim(), exposing)
}

/// Parse a kernel file into its imports and raw JavaScript chunks. Kernel
/// imports are declared in line comments (`// import Gren.Kernel.Utils`)
/// ahead of the code.
pub fn parse_kernel(source: &str) -> Kernel {
    let mut imports = Vec::new();
    for line in source.lines() {
        let trimmed = line.trim();
        if let Some(rest) = trimmed.strip_prefix("// import ") {
            if let Ok(import) = rest.trim().parse::<ModuleName>() {
                imports.push(import);
            }
        }
    }
    Kernel {
        imports,
        chunks: vec![source.to_owned()],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_header_full() {
        let source = "\
module Page.Home exposing (view, Model)

import Html
import Html.Events exposing (..)
import Json.Decode as Decode

view model =
    Html.text model.title
";
        let header = parse_header(source).unwrap();
        assert_eq!(header.name, Some("Page.Home".parse().unwrap()));
        assert_eq!(
            header.exposing,
            Exposing::Explicit(vec!["view".into(), "Model".into()])
        );
        assert_eq!(
            header.imports,
            vec![
                "Html".parse().unwrap(),
                "Html.Events".parse().unwrap(),
                "Json.Decode".parse().unwrap()
            ]
        );
        assert!(!header.has_main);
    }

    #[test]
    fn test_parse_header_detects_main() {
        let source = "module Main exposing (main)\n\nmain =\n    text \"hi\"\n";
        let header = parse_header(source).unwrap();
        assert!(header.has_main);

        let annotated = "module Main exposing (main)\n\nmain : Html msg\nmain =\n    text \"hi\"\n";
        assert!(parse_header(annotated).unwrap().has_main);
    }

    #[test]
    fn test_parse_header_skips_comments() {
        let source = "\
-- import NotReal
{- import AlsoNotReal
   still a comment
-}
module Thing exposing (..)

import Real
";
        let header = parse_header(source).unwrap();
        assert_eq!(header.name, Some("Thing".parse().unwrap()));
        assert_eq!(header.imports, vec!["Real".parse::<ModuleName>().unwrap()]);
    }

    #[test]
    fn test_parse_header_missing_module_line() {
        let header = parse_header("import Html\n\nx = 1\n").unwrap();
        assert_eq!(header.name, None);
        assert_eq!(header.exposing, Exposing::All);
    }

    #[test]
    fn test_parse_header_bad_import() {
        assert!(parse_header("import lowercase\n").is_err());
    }

    #[test]
    fn test_parse_kernel() {
        let source = "\
// import Gren.Kernel.Utils
// import Basics

function _Scheduler_succeed(value) { return value; }
";
        let kernel = parse_kernel(source);
        assert_eq!(
            kernel.imports,
            vec![
                "Gren.Kernel.Utils".parse::<ModuleName>().unwrap(),
                "Basics".parse().unwrap()
            ]
        );
        assert_eq!(kernel.chunks.len(), 1);
        assert!(kernel.chunks[0].contains("_Scheduler_succeed"));
    }
}
