//! Output assembly
//!
//! After every module compiled, link the object graph from the requested
//! entry points and hand the result to the requested output: a
//! self-contained HTML page, a JavaScript module exposing
//! `Gren.<Module>.init()`, `/dev/stdout`, or nothing at all for
//! `/dev/null` (type-check only).

use crate::details::{root_package, Details};
use crate::error::GenerateError;
use crate::objects::{GlobalName, Node};
use gren_package::{CanonicalName, ModuleName};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Write as _;
use std::fs;
use std::io::Write as _;
use std::path::{Path, PathBuf};
use tracing::info;

/// Where `make` sends its result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Output {
    Html(PathBuf),
    Js(PathBuf),
    DevNull,
    Stdout,
}

impl Output {
    pub fn parse(text: &str) -> Result<Output, String> {
        match text {
            "/dev/null" => return Ok(Output::DevNull),
            "/dev/stdout" => return Ok(Output::Stdout),
            _ => {}
        }
        let path = PathBuf::from(text);
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("html") => Ok(Output::Html(path)),
            Some("js") => Ok(Output::Js(path)),
            _ => Err(format!(
                "--output must end in .html or .js (or be /dev/null or /dev/stdout), got '{text}'"
            )),
        }
    }
}

/// Code generation mode. `--debug` and `--optimize` are mutually
/// exclusive; the caller rejects that combination before compiling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Dev,
    Debug,
    Prod,
}

/// One entry module and whether it defines `main`.
#[derive(Debug, Clone)]
pub struct RootModule {
    pub name: ModuleName,
    pub has_main: bool,
}

pub fn generate(
    details: &Details,
    mode: Mode,
    output: &Output,
    roots: &[RootModule],
) -> Result<(), GenerateError> {
    // Type-check-only runs skip code generation entirely.
    if *output == Output::DevNull || roots.is_empty() {
        return Ok(());
    }

    match output {
        Output::Html(_) => {
            if roots.len() > 1 {
                return Err(GenerateError::MultipleFilesIntoHtml);
            }
            require_main(&roots[0])?;
        }
        Output::Js(_) | Output::Stdout => {
            for root in roots {
                require_main(root)?;
            }
        }
        Output::DevNull => unreachable!("handled above"),
    }

    let package = root_package(&details.outline);
    let mut mains: Vec<(ModuleName, GlobalName)> = Vec::new();
    for root in roots {
        let home = CanonicalName::new(package.clone(), root.name.clone());
        let main = details
            .objects
            .mains
            .get(&home)
            .ok_or(GenerateError::CorruptCache)?;
        mains.push((root.name.clone(), main.clone()));
    }

    let order = link(&details.objects.nodes, mains.iter().map(|(_, main)| main))?;

    if mode == Mode::Prod {
        check_debug_remnants(&details.objects.nodes, &order)?;
    }

    let js = emit_js(details, &order, &mains);
    match output {
        Output::Html(path) => {
            let module = roots[0].name.clone();
            write_output(path, &html_page(&module, &js))?;
            info!(output = %path.display(), "wrote HTML");
        }
        Output::Js(path) => {
            write_output(path, &js)?;
            info!(output = %path.display(), "wrote JavaScript");
        }
        Output::Stdout => {
            let stdout = std::io::stdout();
            let mut handle = stdout.lock();
            handle
                .write_all(js.as_bytes())
                .map_err(|source| GenerateError::Io {
                    path: PathBuf::from("/dev/stdout"),
                    source,
                })?;
        }
        Output::DevNull => unreachable!("handled above"),
    }
    Ok(())
}

fn require_main(root: &RootModule) -> Result<(), GenerateError> {
    if root.has_main {
        Ok(())
    } else {
        Err(GenerateError::NoMain {
            module: root.name.clone(),
        })
    }
}

/// Reachable definitions from the entry mains, in dependency-first order.
fn link<'a>(
    nodes: &BTreeMap<GlobalName, Node>,
    mains: impl Iterator<Item = &'a GlobalName>,
) -> Result<Vec<GlobalName>, GenerateError> {
    let mut order = Vec::new();
    let mut visited = BTreeSet::new();

    for main in mains {
        visit(main, nodes, &mut visited, &mut order)?;
    }
    Ok(order)
}

fn visit(
    name: &GlobalName,
    nodes: &BTreeMap<GlobalName, Node>,
    visited: &mut BTreeSet<GlobalName>,
    order: &mut Vec<GlobalName>,
) -> Result<(), GenerateError> {
    if !visited.insert(name.clone()) {
        return Ok(());
    }
    // A dangling edge means the cached graph lost a definition.
    let node = nodes.get(name).ok_or(GenerateError::CorruptCache)?;
    for dep in &node.deps {
        visit(dep, nodes, visited, order)?;
    }
    order.push(name.clone());
    Ok(())
}

/// `--optimize` erases the metadata Debug operations need, so any
/// reachable Debug use is fatal.
fn check_debug_remnants(
    nodes: &BTreeMap<GlobalName, Node>,
    order: &[GlobalName],
) -> Result<(), GenerateError> {
    let offenders: BTreeSet<ModuleName> = order
        .iter()
        .filter(|name| nodes[*name].uses_debug)
        .map(|name| name.home.module.clone())
        .collect();

    if offenders.is_empty() {
        Ok(())
    } else {
        Err(GenerateError::DebugRemnants {
            modules: offenders.into_iter().collect(),
        })
    }
}

fn emit_js(
    details: &Details,
    order: &[GlobalName],
    mains: &[(ModuleName, GlobalName)],
) -> String {
    let mut js = String::new();
    js.push_str("(function(scope){\n'use strict';\n\n");

    for kernel in details.objects.kernels.values() {
        for chunk in &kernel.chunks {
            js.push_str(chunk);
            js.push('\n');
        }
    }

    for name in order {
        js.push_str(&details.objects.nodes[name].js);
        js.push('\n');
    }

    js.push_str("\nvar Gren = scope['Gren'] = scope['Gren'] || {};\n");
    for (module, main) in mains {
        let _ = writeln!(
            js,
            "Gren['{module}'] = {{ init: function(args) {{ return {}(args); }} }};",
            main.js_symbol()
        );
    }
    js.push_str("})(this);\n");
    js
}

fn html_page(module: &ModuleName, js: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"UTF-8\">\n\
         <title>{module}</title>\n</head>\n<body>\n<div id=\"app\"></div>\n\
         <script>\n{js}</script>\n\
         <script>Gren['{module}'].init({{ node: document.getElementById('app') }});</script>\n\
         </body>\n</html>\n"
    )
}

fn write_output(path: &Path, content: &str) -> Result<(), GenerateError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(|source| GenerateError::Io {
                path: path.to_path_buf(),
                source,
            })?;
        }
    }
    fs::write(path, content).map_err(|source| GenerateError::Io {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use gren_package::CanonicalName;

    #[test]
    fn test_output_parse() {
        assert_eq!(
            Output::parse("index.html").unwrap(),
            Output::Html(PathBuf::from("index.html"))
        );
        assert_eq!(
            Output::parse("dist/app.js").unwrap(),
            Output::Js(PathBuf::from("dist/app.js"))
        );
        assert_eq!(Output::parse("/dev/null").unwrap(), Output::DevNull);
        assert_eq!(Output::parse("/dev/stdout").unwrap(), Output::Stdout);
        assert!(Output::parse("out.wasm").is_err());
        assert!(Output::parse("plain").is_err());
    }

    #[test]
    fn test_link_orders_dependencies_first() {
        let package: gren_package::PackageName = "author/project".parse().unwrap();
        let home = |module: &str| {
            CanonicalName::new(package.clone(), module.parse().unwrap())
        };
        let name = |module: &str, value: &str| GlobalName::new(home(module), value);

        let mut nodes = BTreeMap::new();
        nodes.insert(
            name("Main", "main"),
            Node {
                deps: vec![name("Util", "helper")],
                uses_debug: false,
                js: String::new(),
            },
        );
        nodes.insert(
            name("Util", "helper"),
            Node {
                deps: vec![],
                uses_debug: false,
                js: String::new(),
            },
        );

        let main = name("Main", "main");
        let order = link(&nodes, [&main].into_iter()).unwrap();
        assert_eq!(order, vec![name("Util", "helper"), name("Main", "main")]);
    }

    #[test]
    fn test_link_dangling_edge_is_corrupt() {
        let package: gren_package::PackageName = "author/project".parse().unwrap();
        let main = GlobalName::new(
            CanonicalName::new(package, "Main".parse().unwrap()),
            "main",
        );
        let nodes = BTreeMap::new();
        assert!(matches!(
            link(&nodes, [&main].into_iter()),
            Err(GenerateError::CorruptCache)
        ));
    }
}
