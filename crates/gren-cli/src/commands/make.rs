//! Compile a project (gren make)

use crate::frontend::DevCompiler;
use anyhow::{anyhow, bail, Context, Result};
use gren_build::builder::{self, Flags};
use gren_build::details::Env;
use gren_build::error::BuildError;
use gren_build::generate::Output;
use gren_package::registry::PackageCache;
use gren_package::solver::Connection;
use gren_package::OUTLINE_FILE;
use std::env;
use std::path::{Path, PathBuf};

pub fn run(
    files: &[PathBuf],
    debug: bool,
    optimize: bool,
    output: &str,
    report: Option<&str>,
) -> Result<()> {
    let json_report = match report {
        None => false,
        Some("json") => true,
        Some(other) => bail!("--report only understands 'json', got '{other}'"),
    };

    let output = Output::parse(output).map_err(|message| anyhow!(message))?;
    let flags = Flags {
        debug,
        optimize,
        output,
    };

    let cwd = env::current_dir().context("cannot read the current directory")?;
    let root = find_project_root(&cwd)?;
    let entries: Vec<PathBuf> = files
        .iter()
        .map(|file| {
            if file.is_absolute() {
                file.clone()
            } else {
                cwd.join(file)
            }
        })
        .collect();

    let cache = PackageCache::resolve().context("cannot prepare the package cache")?;
    let compiler = DevCompiler;
    let env = Env {
        cache: &cache,
        // Registry fetches are delegated to `gren install`; building works
        // from the local cache.
        connection: Connection::Offline,
        compiler: &compiler,
    };

    match builder::make(&root, &env, &entries, &flags) {
        Ok(()) => Ok(()),
        Err(err) if json_report => {
            println!("{}", render_json(&err));
            std::process::exit(1);
        }
        Err(err) => Err(anyhow!("{err}")),
    }
}

/// gren.json marks the project root; walk upward from the working
/// directory to find it.
fn find_project_root(start: &Path) -> Result<PathBuf> {
    let mut current = start.to_path_buf();
    loop {
        if current.join(OUTLINE_FILE).exists() {
            return Ok(current);
        }
        if !current.pop() {
            bail!(
                "could not find {OUTLINE_FILE} in {} or any parent directory; \
                 run `gren init` to start a project",
                start.display()
            );
        }
    }
}

fn render_json(err: &BuildError) -> String {
    let value = match err {
        BuildError::Problems(problems) => serde_json::json!({
            "type": "compile-errors",
            "errors": problems
                .iter()
                .map(|problem| serde_json::json!({ "message": problem.to_string() }))
                .collect::<Vec<_>>(),
        }),
        other => serde_json::json!({
            "type": "error",
            "message": other.to_string(),
        }),
    };
    value.to_string()
}
