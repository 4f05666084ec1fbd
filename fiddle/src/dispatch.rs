use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use fiddle_eval::{
    build_embedded_skub_program, build_line_program, build_skub_program, default_output_path,
    run_program, write_dump_sidecar,
};
use fiddle_template::{emit_template, frame_line_style, frame_skub, parse_line_template, parse_skub, parse_skub_range};
use mlua::Lua;

/// Process-wide configuration threaded explicitly through the dispatcher,
/// rather than kept as file-scope globals.
pub struct RunConfig {
    pub output_override: Option<PathBuf>,
}

/// Whether an input was fully processed or skipped after a recoverable
/// error (bad framing, I/O failure opening the file, no templates found).
pub enum Outcome {
    Processed,
    Skipped,
}

/// Processes one input file: reads it, frames it under whichever dialect
/// applies, runs the generated Lua program against the shared interpreter,
/// and writes the result.
///
/// I/O and parse-structural failures are logged and this file is skipped
/// (`Outcome::Skipped`); the function only returns `Err` for failures that
/// should abort the whole batch (a `.md` file, or a Lua load/runtime
/// error).
pub fn process_input(lua: &Lua, path: &Path, config: &RunConfig) -> Result<Outcome> {
    let src = match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::warn!("skipping {}: {e}", path.display());
            return Ok(Outcome::Skipped);
        }
    };

    match path.extension().and_then(|e| e.to_str()) {
        Some("fiddle") => process_whole_file_line(lua, path, &src, config, ".fiddle"),
        Some("skub") => process_whole_file_skub(lua, path, &src, config, ".skub"),
        Some("md") => bail!(
            "{}: literate (.md) mode is not implemented",
            path.display()
        ),
        _ => process_embedded(lua, path, &src, config),
    }
}

fn output_path_for(path: &Path, config: &RunConfig, suffix: &str) -> PathBuf {
    config
        .output_override
        .clone()
        .unwrap_or_else(|| default_output_path(path, suffix))
}

fn process_whole_file_line(
    lua: &Lua,
    path: &Path,
    src: &[u8],
    config: &RunConfig,
    suffix: &str,
) -> Result<Outcome> {
    let nodes = match parse_line_template(src) {
        Ok(nodes) => nodes,
        Err(e) => {
            tracing::error!("{}: {e}", path.display());
            return Ok(Outcome::Skipped);
        }
    };
    // A whole-file `.fiddle` template has no chunk framing: it is a single
    // implicit chunk spanning the entire file, with no previous-output
    // comment to re-emit.
    let mut buf = fiddle_span::GrowBuffer::new();
    buf.push_str("local _RAW, _SPLICE = ...; fiddle_write = _RAW; ");
    emit_template(&mut buf, &nodes, src);
    let program = buf.into_vec();

    write_dump_sidecar(&program);
    let out = run_program(lua, &program, path)?;
    let out_path = output_path_for(path, config, suffix);
    std::fs::write(&out_path, out)
        .with_context(|| format!("writing {}", out_path.display()))?;
    Ok(Outcome::Processed)
}

fn process_whole_file_skub(
    lua: &Lua,
    path: &Path,
    src: &[u8],
    config: &RunConfig,
    suffix: &str,
) -> Result<Outcome> {
    let (root, warnings) = parse_skub(src);
    for w in &warnings {
        tracing::warn!("{}: byte {}: {}", path.display(), w.pos, w.message);
    }
    let program = build_skub_program(&root, src);
    write_dump_sidecar(&program);
    let out = run_program(lua, &program, path)?;
    let out_path = output_path_for(path, config, suffix);
    std::fs::write(&out_path, out)
        .with_context(|| format!("writing {}", out_path.display()))?;
    Ok(Outcome::Processed)
}

fn process_embedded(lua: &Lua, path: &Path, src: &[u8], config: &RunConfig) -> Result<Outcome> {
    match frame_line_style(src) {
        Ok(Some((chunks, tail))) => {
            let program = build_line_program(&chunks, tail.slice(src), src);
            write_dump_sidecar(&program);
            let out = run_program(lua, &program, path)?;
            let out_path = output_path_for(path, config, "");
            std::fs::write(&out_path, out)
                .with_context(|| format!("writing {}", out_path.display()))?;
            return Ok(Outcome::Processed);
        }
        Ok(None) => {}
        Err(e) => {
            tracing::error!("{}: {e}", path.display());
            return Ok(Outcome::Skipped);
        }
    }

    let (skub_chunks, skub_tail) = frame_skub(src);
    if skub_chunks.is_empty() {
        tracing::debug!("{}: no templates found, skipping", path.display());
        return Ok(Outcome::Skipped);
    }
    let parsed: Vec<_> = skub_chunks
        .into_iter()
        .map(|chunk| {
            let (root, warnings) = parse_skub_range(src, chunk.code.start, chunk.code.end);
            for w in &warnings {
                tracing::warn!("{}: byte {}: {}", path.display(), w.pos, w.message);
            }
            (chunk, root)
        })
        .collect();
    let program = build_embedded_skub_program(&parsed, skub_tail.slice(src), src);
    write_dump_sidecar(&program);
    let out = run_program(lua, &program, path)?;
    let out_path = output_path_for(path, config, "");
    std::fs::write(&out_path, out).with_context(|| format!("writing {}", out_path.display()))?;
    Ok(Outcome::Processed)
}
