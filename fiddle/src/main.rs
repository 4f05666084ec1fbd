mod cli;
mod dispatch;

use std::process::ExitCode;

use clap::Parser;
use mlua::Lua;
use tracing_subscriber::EnvFilter;

use cli::Cli;
use dispatch::{process_input, Outcome, RunConfig};

fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let lua = Lua::new();
    if let Err(e) = setup_package_path(&lua, cli.include.as_deref()) {
        tracing::error!("failed to set up Lua package.path: {e}");
        return ExitCode::FAILURE;
    }

    let config = RunConfig {
        output_override: cli.output.clone(),
    };

    // Recoverable per-file errors (bad framing, unreadable input, no
    // templates found) are logged where they occur and counted here; they
    // do not affect the process exit code, only a summary line at the end.
    let mut recoverable = 0usize;
    for path in &cli.inputs {
        match process_input(&lua, path, &config) {
            Ok(Outcome::Processed) => {}
            Ok(Outcome::Skipped) => recoverable += 1,
            Err(e) => {
                tracing::error!("{}: {e:#}", path.display());
                return ExitCode::FAILURE;
            }
        }
    }

    if recoverable > 0 {
        tracing::info!("{recoverable} file(s) skipped due to recoverable errors");
    }

    ExitCode::SUCCESS
}

/// Adds the `-I` directory, if given, to the front of Lua's `package.path`
/// so meta-code can `require` helper modules alongside the inputs.
fn setup_package_path(lua: &Lua, include: Option<&std::path::Path>) -> mlua::Result<()> {
    let Some(dir) = include else {
        return Ok(());
    };
    let package: mlua::Table = lua.globals().get("package")?;
    let existing: String = package.get("path")?;
    let addition = format!("{}/?.lua", dir.display());
    package.set("path", format!("{addition};{existing}"))?;
    Ok(())
}
