//! Development frontend
//!
//! A placeholder implementation of the build core's `Compiler` seam. It
//! derives a module's interface from its type annotations and emits one
//! object-graph node per module, which is enough for the build pipeline
//! (incremental tracking, linking, visibility, the Debug scan) to run end
//! to end.
//!
//! TODO: swap this out for the real parser/type-checker/optimizer pipeline
//! once those crates land.

use gren_build::host::{Compiled, Compiler, Diagnostic, ParsedModule};
use gren_build::interfaces::{DependencyInterface, Interface};
use gren_build::objects::{GlobalName, LocalGraph, Node};
use gren_package::{CanonicalName, ModuleName, PackageName};
use std::collections::BTreeMap;

pub struct DevCompiler;

impl Compiler for DevCompiler {
    fn compile(
        &self,
        package: &PackageName,
        interfaces: &BTreeMap<ModuleName, DependencyInterface>,
        module: &ParsedModule,
    ) -> Result<Compiled, Vec<Diagnostic>> {
        let mut deps = Vec::new();
        for import in &module.imports {
            match interfaces.get(import) {
                Some(DependencyInterface::Public(interface)) => {
                    deps.push(GlobalName::new(
                        CanonicalName::new(interface.package.clone(), import.clone()),
                        "impl",
                    ));
                }
                Some(DependencyInterface::Private { package: owner, .. }) => {
                    return Err(vec![Diagnostic::new(
                        "IMPORT PRIVATE MODULE",
                        format!(
                            "The {import} module belongs to {owner}, which is not one of \
                             this project's direct dependencies."
                        ),
                    )]);
                }
                // Kernel imports are link-time only.
                None => {}
            }
        }

        let mut interface = Interface::new(package.clone());
        for line in module.source.lines() {
            if let Some((name, tipe)) = line.split_once(" : ") {
                let name = name.trim();
                let starts_lower = name.chars().next().is_some_and(|c| c.is_ascii_lowercase());
                if !name.is_empty() && !name.contains(' ') && starts_lower {
                    interface
                        .values
                        .insert(name.to_owned(), tipe.trim().to_owned());
                }
            }
        }

        let home = CanonicalName::new(package.clone(), module.name.clone());
        let global = GlobalName::new(home, "impl");
        let mut nodes = BTreeMap::new();
        nodes.insert(
            global.clone(),
            Node {
                deps,
                uses_debug: module.source.contains("Debug."),
                js: format!("var {} = /* {} */ {{}};", global.js_symbol(), module.name),
            },
        );

        Ok(Compiled {
            interface,
            objects: LocalGraph {
                main: module.has_main.then(|| global.clone()),
                nodes,
            },
        })
    }
}
