use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;
mod frontend;

#[derive(Parser)]
#[command(name = "gren")]
#[command(about = "Compiler for the Gren programming language", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start a new project in the current directory
    Init {
        /// Create a package instead of an application
        #[arg(long)]
        package: bool,
        /// Target platform
        #[arg(long, default_value = "browser")]
        platform: String,
    },
    /// Compile files and produce runnable output
    Make {
        /// Entry .gren files (a package builds its exposed modules when
        /// none are given)
        files: Vec<PathBuf>,
        /// Generate code with extra runtime checks for development
        #[arg(long)]
        debug: bool,
        /// Generate smaller, faster code (incompatible with --debug)
        #[arg(long)]
        optimize: bool,
        /// Where to put the result (.html, .js, /dev/null, /dev/stdout)
        #[arg(long, default_value = "index.html")]
        output: String,
        /// Error reporting format
        #[arg(long)]
        report: Option<String>,
    },
    /// Install the project dependencies, or add a new one
    Install {
        /// Package to add (author/project)
        package: Option<String>,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_env("GREN_LOG")
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Init { package, platform } => {
            commands::init::run(package, &platform)?;
        }
        Commands::Make {
            files,
            debug,
            optimize,
            output,
            report,
        } => {
            commands::make::run(&files, debug, optimize, &output, report.as_deref())?;
        }
        Commands::Install { package } => {
            commands::install::run(package.as_deref())?;
        }
    }

    Ok(())
}
