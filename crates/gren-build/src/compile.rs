//! Module compile coordination
//!
//! One task per module. Each task blocks on the results of its imports,
//! then either reuses the previous build (when nothing relevant changed)
//! or invokes the external compiler. A failed module fulfills its promise
//! with "no result", which silently aborts its dependents while unrelated
//! modules keep compiling, so one run surfaces as many independent errors
//! as possible.

use crate::crawl::Status;
use crate::details::{BuildId, Local};
use crate::error::BuildProblem;
use crate::future::PromiseMap;
use crate::host::Compiler;
use crate::interfaces::{DependencyInterface, Interface};
use crate::objects::{Kernel, LocalGraph};
use gren_codec::Encode;
use gren_package::{ModuleName, PackageName};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use std::thread;
use tracing::{debug, trace};

/// What a finished module hands to the modules that import it.
#[derive(Clone)]
struct ModuleOutcome {
    interface: Arc<Interface>,
    last_change: BuildId,
}

/// Everything a compile pass needs to know.
pub struct CompileRun<'a> {
    /// The package the modules belong to (the root project uses a synthetic
    /// name).
    pub package: &'a PackageName,
    /// Interfaces of importable foreign modules.
    pub foreign_interfaces: &'a BTreeMap<ModuleName, DependencyInterface>,
    pub compiler: &'a dyn Compiler,
    pub build_id: BuildId,
    /// Build records from the previous run; empty on package builds.
    pub old_locals: &'a BTreeMap<ModuleName, Local>,
    /// Interfaces from the previous run, for reuse and change detection.
    pub old_interfaces: &'a BTreeMap<ModuleName, Interface>,
}

/// The merged result of one compile pass.
#[derive(Default)]
pub struct CompileOutput {
    /// Interface per local module (recompiled or reused).
    pub interfaces: BTreeMap<ModuleName, Interface>,
    /// Object graphs for the modules that actually recompiled.
    pub graphs: BTreeMap<ModuleName, LocalGraph>,
    /// Updated build records for every local module.
    pub locals: BTreeMap<ModuleName, Local>,
    /// Kernel modules picked up during the crawl.
    pub kernels: BTreeMap<ModuleName, Kernel>,
    pub problems: Vec<BuildProblem>,
}

/// Compile every local module in `statuses`, in dependency order, with
/// siblings running concurrently.
pub fn run(run: CompileRun<'_>, statuses: &BTreeMap<ModuleName, Status>) -> CompileOutput {
    let promises: PromiseMap<ModuleName, Option<ModuleOutcome>> = PromiseMap::new();
    let output = Mutex::new(CompileOutput::default());

    // Register every local module before any task starts so no reader can
    // miss its writer.
    let mut tasks = Vec::new();
    for (name, status) in statuses {
        match status {
            Status::Local { module, time } => {
                let promise = promises.register(name.clone());
                tasks.push((name, module, *time, promise));
            }
            Status::KernelLocal { kernel } => {
                let mut locked = output.lock().expect("compile output poisoned");
                locked.kernels.insert(name.clone(), kernel.clone());
            }
            Status::Foreign { .. } | Status::KernelForeign { .. } => {}
        }
    }

    thread::scope(|scope| {
        for (name, module, time, promise) in tasks {
            let promises = &promises;
            let output = &output;
            let run = &run;
            scope.spawn(move || {
                // Wait for every locally-built import first; a missing
                // result means an import failed, so this module quietly
                // becomes "no result" too.
                let mut import_outcomes = Vec::new();
                for import in &module.imports {
                    if matches!(statuses.get(import), Some(Status::Local { .. })) {
                        match promises.wait_for(import).flatten() {
                            Some(outcome) => import_outcomes.push((import, outcome)),
                            None => {
                                trace!(module = %name, %import, "skipped: import failed");
                                promise.fulfill(None);
                                return;
                            }
                        }
                    }
                }

                let old = run.old_locals.get(name);
                let stale = match old {
                    None => true,
                    Some(record) => {
                        record.time != time
                            || !run.old_interfaces.contains_key(name)
                            || import_outcomes
                                .iter()
                                .any(|(_, outcome)| outcome.last_change > record.last_compile)
                    }
                };

                if !stale {
                    let record = old.expect("fresh record cannot be reused").clone();
                    let interface = run.old_interfaces[name].clone();
                    let outcome = ModuleOutcome {
                        interface: Arc::new(interface.clone()),
                        last_change: record.last_change,
                    };
                    let mut locked = output.lock().expect("compile output poisoned");
                    locked.interfaces.insert(name.clone(), interface);
                    locked.locals.insert(name.clone(), record);
                    drop(locked);
                    promise.fulfill(Some(outcome));
                    return;
                }

                // Assemble the interfaces this module may see: its local
                // imports plus whatever the dependency solution exposes.
                let mut visible: BTreeMap<ModuleName, DependencyInterface> = BTreeMap::new();
                for (import, outcome) in &import_outcomes {
                    visible.insert(
                        (*import).clone(),
                        DependencyInterface::Public((*outcome.interface).clone()),
                    );
                }
                for import in &module.imports {
                    if let Some(interface) = run.foreign_interfaces.get(import) {
                        visible.entry(import.clone()).or_insert_with(|| interface.clone());
                    }
                }

                debug!(module = %name, "compiling");
                match run.compiler.compile(run.package, &visible, module) {
                    Ok(compiled) => {
                        let bytes = compiled.interface.to_bytes();
                        let changed = run
                            .old_interfaces
                            .get(name)
                            .map(|previous| previous.to_bytes() != bytes)
                            .unwrap_or(true);
                        let last_change = if changed {
                            run.build_id
                        } else {
                            old.map(|record| record.last_change).unwrap_or(run.build_id)
                        };

                        let record = Local {
                            path: module.path.clone(),
                            time,
                            imports: module.imports.clone(),
                            main: module.has_main,
                            last_change,
                            last_compile: run.build_id,
                        };
                        let outcome = ModuleOutcome {
                            interface: Arc::new(compiled.interface.clone()),
                            last_change,
                        };

                        let mut locked = output.lock().expect("compile output poisoned");
                        locked.interfaces.insert(name.clone(), compiled.interface);
                        locked.graphs.insert(name.clone(), compiled.objects);
                        locked.locals.insert(name.clone(), record);
                        drop(locked);
                        promise.fulfill(Some(outcome));
                    }
                    Err(diagnostics) => {
                        let mut locked = output.lock().expect("compile output poisoned");
                        locked.problems.push(BuildProblem::BadModule {
                            module: name.clone(),
                            diagnostics,
                        });
                        drop(locked);
                        promise.fulfill(None);
                    }
                }
            });
        }
    });

    let mut output = output.into_inner().expect("compile output poisoned");
    // Thread completion order is not deterministic; error order should be.
    output.problems.sort_by_key(problem_sort_key);
    output
}

fn problem_sort_key(problem: &BuildProblem) -> String {
    match problem {
        BuildProblem::BadModule { module, .. } => module.to_string(),
        other => format!("{other}"),
    }
}
