//! Resolve the build units of a workspace and print their files.
//!
//! Configs are read from `SRCSET_<NAME>` environment variables, e.g.
//! `SRCSET_FOLLOW_SYMLINKS=1`, logging is controlled by `RUST_LOG`.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use srcset_core::cfgs::default_configs;
use srcset_core::{BuildUnitSources, Workspace};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(about = "Resolve the source sets of a workspace")]
struct Args {
    /// Root directory of the workspace.
    #[arg(default_value = ".")]
    workspace: PathBuf,
    /// Only resolve this unit.
    #[arg(long)]
    unit: Option<String>,
    /// Print paths relative to each source set root.
    #[arg(long)]
    relative: bool,
    /// Print every registered config and exit.
    #[arg(long)]
    configs: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    match run(args).await {
        Ok(code) => code,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> Result<ExitCode, anyhow::Error> {
    let configs = default_configs();
    let num_overrides = configs.apply_env("SRCSET")?;
    tracing::debug!(num_overrides, "applied configs from the environment");
    if args.configs {
        print!("{configs}");
        return Ok(ExitCode::SUCCESS);
    }

    let workspace = Workspace::load(&args.workspace, configs)?;
    let units = match &args.unit {
        Some(unit) => vec![workspace.resolve_unit(unit).await?],
        None => workspace.resolve_all().await?,
    };

    let mut code = ExitCode::SUCCESS;
    for unit in &units {
        if let Some(failure) = print_unit(unit, args.relative) {
            code = failure;
        }
    }
    Ok(code)
}

/// Print every set of `unit`, returning the exit code of the last error.
fn print_unit(unit: &BuildUnitSources, relative: bool) -> Option<ExitCode> {
    let mut failure = None;
    println!("{}", unit.unit());
    for (name, result) in unit.iter() {
        match result {
            Ok(resolved) => {
                println!("  {name} ({} files)", resolved.len());
                let files = if relative {
                    resolved.relative_files()
                } else {
                    resolved.files()
                };
                for file in files {
                    println!("    {}", file.display());
                }
            }
            Err(err) => {
                println!("  {name} error: {err}");
                if let Some(partial) = err.partial() {
                    println!("    {} files resolved before failing", partial.len());
                }
                let code = u8::try_from(err.kind().exit_code()).unwrap_or(1);
                failure = Some(ExitCode::from(code));
            }
        }
    }
    failure
}
