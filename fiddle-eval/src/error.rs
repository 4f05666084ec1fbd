use std::path::PathBuf;

use thiserror::Error;

/// Errors from loading or running a generated Lua program.
///
/// Both variants are fatal to the whole batch run: the original
/// implementation calls `exit(1)` immediately on either a load failure or a
/// runtime error, rather than skipping just the offending file.
#[derive(Debug, Error)]
pub enum EvalError {
    #[error("failed to compile the generated program for {path}: {source}")]
    Load {
        path: PathBuf,
        #[source]
        source: mlua::Error,
    },
    #[error("error while running the generated program for {path}: {source}")]
    Runtime {
        path: PathBuf,
        #[source]
        source: mlua::Error,
    },
}
