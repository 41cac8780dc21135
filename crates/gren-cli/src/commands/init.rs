//! Start a new project (gren init)

use anyhow::{bail, Context, Result};
use gren_package::{Platform, COMPILER_VERSION, OUTLINE_FILE};
use std::fs;
use std::path::Path;

const APP_MAIN: &str = "\
module Main exposing (main)

main : String
main =
    \"Hello, world!\"
";

const PKG_MODULE: &str = "\
module Example exposing (greeting)

greeting : String
greeting =
    \"Hello from a package!\"
";

pub fn run(package: bool, platform: &str) -> Result<()> {
    let platform: Platform = platform
        .parse()
        .context("--platform must be common, browser, or node")?;

    let root = Path::new(".");
    if root.join(OUTLINE_FILE).exists() {
        bail!("there is already a {OUTLINE_FILE} in this directory");
    }

    let outline = if package {
        package_outline(platform)
    } else {
        application_outline(platform)
    };
    fs::write(root.join(OUTLINE_FILE), outline).context("failed to write gren.json")?;

    fs::create_dir_all(root.join("src")).context("failed to create src/")?;
    let (file, contents) = if package {
        ("Example.gren", PKG_MODULE)
    } else {
        ("Main.gren", APP_MAIN)
    };
    let main_path = root.join("src").join(file);
    if !main_path.exists() {
        fs::write(&main_path, contents).context("failed to write the starter module")?;
    }

    println!("Project initialized! Try `gren make src/{file}` next.");
    Ok(())
}

fn application_outline(platform: Platform) -> String {
    format!(
        r#"{{
    "type": "application",
    "platform": "{platform}",
    "source-directories": ["src"],
    "gren-version": "{COMPILER_VERSION}",
    "dependencies": {{
        "direct": {{}},
        "indirect": {{}}
    }}
}}
"#
    )
}

fn package_outline(platform: Platform) -> String {
    let next_minor = COMPILER_VERSION.bump_minor();
    format!(
        r#"{{
    "type": "package",
    "name": "author/project",
    "summary": "A short description of the package",
    "license": "BSD-3-Clause",
    "version": "1.0.0",
    "platform": "{platform}",
    "exposed-modules": ["Example"],
    "gren-version": "{COMPILER_VERSION} <= v < {next_minor}",
    "dependencies": {{}}
}}
"#
    )
}
