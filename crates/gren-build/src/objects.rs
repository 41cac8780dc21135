//! Optimizer object graphs
//!
//! The optimizer hands back one `LocalGraph` per compiled module; linking
//! merges them into a `GlobalGraph` keyed by fully-qualified names. The
//! core never looks inside the generated JavaScript, it only follows the
//! dependency edges (for reachability and for the Debug-remnant scan).

use crate::interfaces::Name;
use gren_codec::{CodecError, Decode, Encode, Reader};
use gren_package::{CanonicalName, ModuleName};
use std::collections::BTreeMap;

/// A fully-qualified value name: the module that defines it plus the
/// top-level name inside that module.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct GlobalName {
    pub home: CanonicalName,
    pub name: Name,
}

impl GlobalName {
    pub fn new(home: CanonicalName, name: impl Into<Name>) -> Self {
        Self {
            home,
            name: name.into(),
        }
    }

    /// The JavaScript identifier this definition is emitted under. Shared
    /// between the code generator and the output assembler so init hooks
    /// can reference compiled definitions.
    pub fn js_symbol(&self) -> String {
        format!(
            "_{}${}${}${}",
            self.home.package.author().replace('-', "_"),
            self.home.package.project().replace('-', "_"),
            self.home.module.as_str().replace('.', "$"),
            self.name
        )
    }
}

/// One linkable definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    pub deps: Vec<GlobalName>,
    pub uses_debug: bool,
    pub js: String,
}

/// Per-module optimizer output.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LocalGraph {
    pub main: Option<GlobalName>,
    pub nodes: BTreeMap<GlobalName, Node>,
}

/// A kernel module: raw JavaScript shipped by a privileged package.
/// Participates in linking but never in type checking.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Kernel {
    pub imports: Vec<ModuleName>,
    pub chunks: Vec<String>,
}

/// The linked, cross-module graph.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GlobalGraph {
    pub nodes: BTreeMap<GlobalName, Node>,
    pub mains: BTreeMap<CanonicalName, GlobalName>,
    pub kernels: BTreeMap<ModuleName, Kernel>,
}

impl GlobalGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge one module's graph in, replacing whatever an earlier build of
    /// the same module contributed.
    pub fn add_local_graph(&mut self, home: &CanonicalName, graph: LocalGraph) {
        self.nodes
            .retain(|global, _| global.home != *home);
        self.mains.remove(home);

        self.nodes.extend(graph.nodes);
        if let Some(main) = graph.main {
            self.mains.insert(home.clone(), main);
        }
    }

    pub fn add_kernel(&mut self, module: ModuleName, kernel: Kernel) {
        self.kernels.insert(module, kernel);
    }

    /// Absorb another graph (used when stacking dependency graphs under the
    /// project's own modules).
    pub fn merge(&mut self, other: GlobalGraph) {
        self.nodes.extend(other.nodes);
        self.mains.extend(other.mains);
        self.kernels.extend(other.kernels);
    }
}

impl Encode for GlobalName {
    fn encode(&self, buf: &mut Vec<u8>) {
        self.home.encode(buf);
        self.name.encode(buf);
    }
}

impl Decode for GlobalName {
    fn decode(reader: &mut Reader<'_>) -> Result<Self, CodecError> {
        Ok(GlobalName {
            home: CanonicalName::decode(reader)?,
            name: Name::decode(reader)?,
        })
    }
}

impl Encode for Node {
    fn encode(&self, buf: &mut Vec<u8>) {
        self.deps.encode(buf);
        self.uses_debug.encode(buf);
        self.js.encode(buf);
    }
}

impl Decode for Node {
    fn decode(reader: &mut Reader<'_>) -> Result<Self, CodecError> {
        Ok(Node {
            deps: Vec::decode(reader)?,
            uses_debug: bool::decode(reader)?,
            js: String::decode(reader)?,
        })
    }
}

impl Encode for LocalGraph {
    fn encode(&self, buf: &mut Vec<u8>) {
        self.main.encode(buf);
        self.nodes.encode(buf);
    }
}

impl Decode for LocalGraph {
    fn decode(reader: &mut Reader<'_>) -> Result<Self, CodecError> {
        Ok(LocalGraph {
            main: Option::decode(reader)?,
            nodes: BTreeMap::decode(reader)?,
        })
    }
}

impl Encode for Kernel {
    fn encode(&self, buf: &mut Vec<u8>) {
        self.imports.encode(buf);
        self.chunks.encode(buf);
    }
}

impl Decode for Kernel {
    fn decode(reader: &mut Reader<'_>) -> Result<Self, CodecError> {
        Ok(Kernel {
            imports: Vec::decode(reader)?,
            chunks: Vec::decode(reader)?,
        })
    }
}

impl Encode for GlobalGraph {
    fn encode(&self, buf: &mut Vec<u8>) {
        self.nodes.encode(buf);
        self.mains.encode(buf);
        self.kernels.encode(buf);
    }
}

impl Decode for GlobalGraph {
    fn decode(reader: &mut Reader<'_>) -> Result<Self, CodecError> {
        Ok(GlobalGraph {
            nodes: BTreeMap::decode(reader)?,
            mains: BTreeMap::decode(reader)?,
            kernels: BTreeMap::decode(reader)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn home(module: &str) -> CanonicalName {
        CanonicalName::new("author/project".parse().unwrap(), module.parse().unwrap())
    }

    fn node(js: &str, deps: Vec<GlobalName>) -> Node {
        Node {
            deps,
            uses_debug: false,
            js: js.to_owned(),
        }
    }

    #[test]
    fn test_add_local_graph_replaces_previous_build() {
        let mut graph = GlobalGraph::new();
        let main_home = home("Main");

        let mut first = LocalGraph::default();
        let old_name = GlobalName::new(main_home.clone(), "old");
        first.nodes.insert(old_name.clone(), node("old", vec![]));
        first.main = Some(old_name);
        graph.add_local_graph(&main_home, first);

        let mut second = LocalGraph::default();
        let new_name = GlobalName::new(main_home.clone(), "main");
        second.nodes.insert(new_name.clone(), node("new", vec![]));
        second.main = Some(new_name.clone());
        graph.add_local_graph(&main_home, second);

        assert_eq!(graph.nodes.len(), 1);
        assert_eq!(graph.mains[&main_home], new_name);
    }

    #[test]
    fn test_replacement_keeps_other_modules() {
        let mut graph = GlobalGraph::new();
        let a = home("A");
        let b = home("B");

        let mut graph_a = LocalGraph::default();
        graph_a
            .nodes
            .insert(GlobalName::new(a.clone(), "x"), node("a", vec![]));
        graph.add_local_graph(&a, graph_a);

        let mut graph_b = LocalGraph::default();
        graph_b
            .nodes
            .insert(GlobalName::new(b.clone(), "y"), node("b", vec![]));
        graph.add_local_graph(&b, graph_b);

        graph.add_local_graph(&a, LocalGraph::default());
        assert_eq!(graph.nodes.len(), 1);
        assert!(graph.nodes.contains_key(&GlobalName::new(b, "y")));
    }

    #[test]
    fn test_codec_roundtrip() {
        let mut graph = GlobalGraph::new();
        let main_home = home("Main");
        let main_name = GlobalName::new(main_home.clone(), "main");

        let mut local = LocalGraph::default();
        local.nodes.insert(
            main_name.clone(),
            Node {
                deps: vec![GlobalName::new(home("Util"), "helper")],
                uses_debug: true,
                js: "var main = helper(1);".into(),
            },
        );
        local.main = Some(main_name);
        graph.add_local_graph(&main_home, local);
        graph.add_kernel(
            "Gren.Kernel.Scheduler".parse().unwrap(),
            Kernel {
                imports: vec!["Basics".parse().unwrap()],
                chunks: vec!["function _Scheduler_succeed() {}".into()],
            },
        );

        assert_eq!(GlobalGraph::from_bytes(&graph.to_bytes()).unwrap(), graph);
    }
}
