//! Install or add dependencies (gren install)

use crate::frontend::DevCompiler;
use anyhow::{bail, Context, Result};
use gren_build::details::{Details, Env};
use gren_package::outline::{AppOutline, Outline, PkgOutline};
use gren_package::registry::PackageCache;
use gren_package::solver::{Connection, Outcome, Solver};
use gren_package::{Constraint, PackageName, OUTLINE_FILE};
use indicatif::{ProgressBar, ProgressStyle};
use std::collections::BTreeMap;
use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub fn run(package: Option<&str>) -> Result<()> {
    let cwd = env::current_dir().context("cannot read the current directory")?;
    let root = find_project_root(&cwd)?;
    let outline = Outline::read(&root).map_err(|err| anyhow::anyhow!("{err}"))?;

    let cache = PackageCache::resolve().context("cannot prepare the package cache")?;
    let compiler = DevCompiler;
    let env = Env {
        cache: &cache,
        connection: Connection::Offline,
        compiler: &compiler,
    };

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .expect("static spinner template"),
    );
    spinner.enable_steady_tick(Duration::from_millis(80));

    match package {
        None => {
            spinner.set_message("Verifying dependencies...");
            Details::verify_install(&env, &outline).map_err(|err| anyhow::anyhow!("{err}"))?;
            spinner.finish_and_clear();
            println!("Dependencies are ready!");
        }
        Some(name) => {
            let name: PackageName = name
                .parse()
                .context("package names look like author/project")?;

            spinner.set_message(format!("Adding {name}..."));
            let updated = add_dependency(&cache, &env, &outline, &name)?;
            spinner.set_message("Verifying dependencies...");
            Details::verify_install(&env, &updated).map_err(|err| anyhow::anyhow!("{err}"))?;
            updated
                .write(&root)
                .context("failed to update gren.json")?;
            spinner.finish_and_clear();
            println!("Added {name} to {OUTLINE_FILE}.");
        }
    }
    Ok(())
}

/// Re-solve the project's dependencies with one more package and rewrite
/// the outline's dependency tables from the solution.
fn add_dependency(
    cache: &PackageCache,
    env: &Env<'_>,
    outline: &Outline,
    name: &PackageName,
) -> Result<Outline> {
    let solver = Solver::new(cache, env.connection, outline.platform());

    match outline {
        Outline::App(app) => {
            if app.dependencies.direct.contains_key(name) {
                bail!("{name} is already a direct dependency");
            }

            let mut constraints: BTreeMap<PackageName, Constraint> = BTreeMap::new();
            for (dep, version) in &app.dependencies.direct {
                constraints.insert(dep.clone(), Constraint::exactly(*version));
            }
            for (dep, version) in &app.dependencies.indirect {
                constraints.insert(dep.clone(), Constraint::exactly(*version));
            }
            constraints.insert(name.clone(), Constraint::anything());

            let solution = match solver.verify(&constraints).map_err(|err| anyhow::anyhow!("{err}"))? {
                Outcome::Solved(solution) => solution,
                Outcome::NoSolution => bail!("no version of {name} fits this project"),
                Outcome::NoOfflineSolution => {
                    bail!("{name} is not in the local package cache; fetch it first")
                }
            };

            let mut direct = app.dependencies.direct.clone();
            direct.insert(name.clone(), solution[name].version);
            let indirect = solution
                .iter()
                .filter(|(dep, _)| !direct.contains_key(*dep))
                .map(|(dep, selection)| (dep.clone(), selection.version))
                .collect();

            Ok(Outline::App(AppOutline::new(
                app.platform,
                app.source_dirs.clone(),
                direct,
                indirect,
            )))
        }
        Outline::Pkg(pkg) => {
            if pkg.dependencies.contains_key(name) {
                bail!("{name} is already a dependency");
            }

            let mut constraints = pkg.dependencies.clone();
            constraints.insert(name.clone(), Constraint::anything());

            let solution = match solver.verify(&constraints).map_err(|err| anyhow::anyhow!("{err}"))? {
                Outcome::Solved(solution) => solution,
                Outcome::NoSolution => bail!("no version of {name} fits this package"),
                Outcome::NoOfflineSolution => {
                    bail!("{name} is not in the local package cache; fetch it first")
                }
            };

            let mut dependencies = pkg.dependencies.clone();
            dependencies.insert(
                name.clone(),
                Constraint::until_next_major(solution[name].version),
            );

            Ok(Outline::Pkg(PkgOutline::new(
                pkg.name.clone(),
                pkg.summary.clone(),
                pkg.license.clone(),
                pkg.version,
                pkg.platform,
                pkg.exposed.clone(),
                pkg.gren_version,
                dependencies,
            )))
        }
    }
}

fn find_project_root(start: &Path) -> Result<PathBuf> {
    let mut current = start.to_path_buf();
    loop {
        if current.join(OUTLINE_FILE).exists() {
            return Ok(current);
        }
        if !current.pop() {
            bail!(
                "could not find {OUTLINE_FILE} in {} or any parent directory",
                start.display()
            );
        }
    }
}
