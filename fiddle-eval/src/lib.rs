//! Assembles and runs the Lua programs generated from a parsed template
//! tree, via an embedded `mlua` interpreter shared across an entire batch
//! run.

mod driver;
mod error;

pub use driver::{
    build_embedded_skub_program, build_line_program, build_skub_program, default_output_path,
    run_program, write_dump_sidecar,
};
pub use error::EvalError;
