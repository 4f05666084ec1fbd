use std::path::PathBuf;

use clap::Parser;

/// A source-code template preprocessor: finds `fiddle`/`skub` meta-code
/// regions in the given files, runs them through an embedded Lua
/// interpreter, and writes the results back.
#[derive(Debug, Parser)]
#[command(name = "fiddle", version)]
pub struct Cli {
    /// Adds a directory to Lua's `package.path`, for meta-code that
    /// `require`s helper modules.
    #[arg(short = 'I', long = "include", value_name = "path")]
    pub include: Option<PathBuf>,

    /// Overrides the computed output path for every input file.
    #[arg(short = 'o', long = "output", value_name = "path")]
    pub output: Option<PathBuf>,

    /// Increases log verbosity; repeat for more detail (info, then debug).
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Input files to process.
    #[arg(required = true, trailing_var_arg = true)]
    pub inputs: Vec<PathBuf>,
}
