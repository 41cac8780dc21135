//! Shared fixtures: an in-cache registry, a header-driven stub compiler,
//! and project/package builders on top of tempdirs.

use gren_build::details::Env;
use gren_build::host::{Compiled, Compiler, Diagnostic, ParsedModule};
use gren_build::interfaces::{DependencyInterface, Interface};
use gren_build::objects::{GlobalName, LocalGraph, Node};
use gren_package::registry::{PackageCache, Registry, RegistryError};
use gren_package::solver::Connection;
use gren_package::{CanonicalName, ModuleName, PackageName, Version};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::sync::Mutex;

/// A "registry" backed entirely by the local package cache; `versions`
/// lists what is cached and `populate` succeeds only for cached packages.
/// Lets tests exercise the online solver paths without any network.
pub struct CacheRegistry {
    cache: PackageCache,
}

impl CacheRegistry {
    pub fn new(cache_root: &Path) -> Self {
        Self {
            cache: PackageCache::at(cache_root),
        }
    }
}

impl Registry for CacheRegistry {
    fn versions(&self, name: &PackageName) -> Result<Vec<Version>, RegistryError> {
        let versions = self.cache.cached_versions(name);
        if versions.is_empty() {
            return Err(RegistryError::UnknownPackage(name.clone()));
        }
        Ok(versions)
    }

    fn populate(
        &self,
        _cache: &PackageCache,
        name: &PackageName,
        version: Version,
    ) -> Result<(), RegistryError> {
        if self.cache.is_populated(name, version) {
            Ok(())
        } else {
            Err(RegistryError::UnknownPackage(name.clone()))
        }
    }
}

/// A stand-in for the real frontend: the interface is the module's
/// type-annotated declarations, the object graph is one node per module.
/// Enough structure for staleness, linking, visibility, and Debug checks
/// to behave like the real thing.
#[derive(Default)]
pub struct StubCompiler {
    log: Mutex<Vec<(PackageName, ModuleName)>>,
}

impl StubCompiler {
    pub fn new() -> Self {
        Self::default()
    }

    /// How many modules of `package` have been compiled so far.
    pub fn compiles_of(&self, package: &PackageName) -> usize {
        self.log
            .lock()
            .unwrap()
            .iter()
            .filter(|(compiled, _)| compiled == package)
            .count()
    }

    pub fn total_compiles(&self) -> usize {
        self.log.lock().unwrap().len()
    }
}

impl Compiler for StubCompiler {
    fn compile(
        &self,
        package: &PackageName,
        interfaces: &BTreeMap<ModuleName, DependencyInterface>,
        module: &ParsedModule,
    ) -> Result<Compiled, Vec<Diagnostic>> {
        self.log
            .lock()
            .unwrap()
            .push((package.clone(), module.name.clone()));

        if module.source.contains("COMPILE_ERROR") {
            return Err(vec![Diagnostic::new(
                "SYNTAX PROBLEM",
                "this module asked to fail",
            )]);
        }

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
                        format!("{import} belongs to {owner}, which is not a direct dependency"),
                    )]);
                }
                // Kernel imports never type check; they only link.
                None => {}
            }
        }

        let mut interface = Interface::new(package.clone());
        for line in module.source.lines() {
            if let Some((name, tipe)) = line.split_once(" : ") {
                let name = name.trim();
                if !name.is_empty()
                    && !name.contains(' ')
                    && name.chars().next().is_some_and(|c| c.is_ascii_lowercase())
                {
                    interface.values.insert(name.to_owned(), tipe.trim().to_owned());
                }
            }
        }

        let home = CanonicalName::new(package.clone(), module.name.clone());
        let global = GlobalName::new(home, "impl");
        let mut objects = LocalGraph {
            main: module.has_main.then(|| global.clone()),
            nodes: BTreeMap::new(),
        };
        objects.nodes.insert(
            global.clone(),
            Node {
                deps,
                uses_debug: module.source.contains("Debug."),
                js: format!("var {} = '{}';", global.js_symbol(), module.name),
            },
        );

        Ok(Compiled { interface, objects })
    }
}

pub fn module(name: &str) -> ModuleName {
    name.parse().unwrap()
}

pub fn pkg(name: &str) -> PackageName {
    name.parse().unwrap()
}

/// Write a package (gren.json + sources) straight into the cache, as if it
/// had been fetched from the registry.
pub fn publish_package(
    cache_root: &Path,
    name: &str,
    version: &str,
    deps: &[(&str, &str)],
    modules: &[(&str, &str)],
) {
    let cache = PackageCache::at(cache_root);
    let package = pkg(name);
    let dir = cache.version_dir(&package, version.parse().unwrap());
    fs::create_dir_all(dir.join("src")).unwrap();

    let dep_lines = deps
        .iter()
        .map(|(dep, constraint)| format!("        \"{dep}\": \"{constraint}\""))
        .collect::<Vec<_>>()
        .join(",\n");
    let exposed = modules
        .iter()
        .map(|(module, _)| format!("\"{module}\""))
        .collect::<Vec<_>>()
        .join(", ");

    let outline = format!(
        r#"{{
    "type": "package",
    "name": "{name}",
    "summary": "fixture package",
    "license": "MIT",
    "version": "{version}",
    "platform": "common",
    "exposed-modules": [{exposed}],
    "gren-version": "0.5.0 <= v < 0.6.0",
    "dependencies": {{
{dep_lines}
    }}
}}
"#
    );
    fs::write(dir.join("gren.json"), outline).unwrap();

    for (module_name, source) in modules {
        let rel = module(module_name).to_source_path();
        let path = dir.join("src").join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, source).unwrap();
    }
}

/// Write an application outline into `root`.
pub fn write_app_outline(root: &Path, direct: &[(&str, &str)], indirect: &[(&str, &str)]) {
    let render = |deps: &[(&str, &str)]| {
        deps.iter()
            .map(|(name, version)| format!("            \"{name}\": \"{version}\""))
            .collect::<Vec<_>>()
            .join(",\n")
    };

    let outline = format!(
        r#"{{
    "type": "application",
    "platform": "browser",
    "source-directories": ["src"],
    "gren-version": "0.5.2",
    "dependencies": {{
        "direct": {{
{}
        }},
        "indirect": {{
{}
        }}
    }}
}}
"#,
        render(direct),
        render(indirect)
    );
    fs::write(root.join("gren.json"), outline).unwrap();
}

/// Write one source module under `root/src`.
pub fn write_src(root: &Path, name: &str, source: &str) {
    let path = root.join("src").join(module(name).to_source_path());
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, source).unwrap();
}

pub fn offline_env<'a>(cache: &'a PackageCache, compiler: &'a StubCompiler) -> Env<'a> {
    Env {
        cache,
        connection: Connection::Offline,
        compiler,
    }
}

pub fn online_env<'a>(
    cache: &'a PackageCache,
    registry: &'a CacheRegistry,
    compiler: &'a StubCompiler,
) -> Env<'a> {
    Env {
        cache,
        connection: Connection::Online(registry),
        compiler,
    }
}
