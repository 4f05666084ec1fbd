use std::cell::RefCell;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use fiddle_span::GrowBuffer;
use fiddle_template::{emit_chunk, emit_raw, emit_skub_chunk, emit_skub_root, Chunk, SkubChunk, SkubNode};
use mlua::{Lua, Value, Variadic};

use crate::error::EvalError;

/// The generated-code prologue for the line-style dialect: binds the two
/// host callbacks to local names and aliases `fiddle_write` to `_RAW` for
/// meta-code that calls it directly, matching the embedded-source
/// contract.
const LINE_PROLOGUE: &str = "local _RAW, _SPLICE = ...; fiddle_write = _RAW; ";

/// The generated-code prologue for the delimited dialect. Defines `_QUOTE`,
/// which temporarily redirects `_RAW`/`_SPLICE` into a string-concatenating
/// sink for the duration of the wrapped thunk, then restores them and
/// returns the captured text.
const SKUB_PROLOGUE: &str = concat!(
    "local _RAW, _SPLICE = ...; ",
    "local function _QUOTE(f) ",
    "local _saved_raw = _RAW; local _saved_splice = _SPLICE; ",
    "local _strs = {}; ",
    "_RAW = function(s) _strs[#_strs + 1] = tostring(s) end; ",
    "_SPLICE = function(s) _strs[#_strs + 1] = tostring(s) end; ",
    "local _ok, _err = pcall(f); ",
    "_RAW = _saved_raw; _SPLICE = _saved_splice; ",
    "if not _ok then error(_err, 0) end; ",
    "return table.concat(_strs); ",
    "end; "
);

/// Assembles the Lua program for a line-style (`.fiddle` or embedded
/// `FIDDLE TEMPLATE`) file from its framed chunks, and the trailing literal
/// text, if any, that followed the last chunk.
pub fn build_line_program(chunks: &[Chunk], tail: &[u8], src: &[u8]) -> Vec<u8> {
    let mut buf = GrowBuffer::new();
    buf.push_str(LINE_PROLOGUE);
    for chunk in chunks {
        emit_chunk(&mut buf, chunk, src);
    }
    emit_raw(&mut buf, tail);
    buf.into_vec()
}

/// Assembles the Lua program for a delimited-dialect (`.skub`) file.
pub fn build_skub_program(root: &SkubNode, src: &[u8]) -> Vec<u8> {
    let mut buf = GrowBuffer::new();
    buf.push_str(SKUB_PROLOGUE);
    emit_skub_root(&mut buf, root, src);
    buf.into_vec()
}

/// Assembles the Lua program for a host file using embedded skub markers
/// (`[[[skub: ...]]] ... [[[end]]]`), plus the trailing literal text, if
/// any, that followed the last chunk's `[[[end]]]`.
pub fn build_embedded_skub_program(chunks: &[(SkubChunk, SkubNode)], tail: &[u8], src: &[u8]) -> Vec<u8> {
    let mut buf = GrowBuffer::new();
    buf.push_str(SKUB_PROLOGUE);
    for (chunk, root) in chunks {
        emit_skub_chunk(&mut buf, chunk, root, src);
    }
    emit_raw(&mut buf, tail);
    buf.into_vec()
}

/// Converts a Lua value to its display bytes, the same way the original
/// host callbacks used `luaL_tolstring` (which invokes `__tostring` where
/// present, falling back to the usual number/string/boolean formatting).
fn lua_display_bytes(lua: &Lua, value: &Value) -> mlua::Result<Vec<u8>> {
    let tostring: mlua::Function = lua.globals().get("tostring")?;
    let s: mlua::String = tostring.call(value.clone())?;
    Ok(s.as_bytes().to_vec())
}

/// Compiles and runs `program` against `lua`, with `_RAW`/`_SPLICE`
/// installed as closures over a freshly created output sink, and returns
/// the collected bytes.
///
/// `lua` is expected to be reused across every file processed in a run
/// (mirroring the single shared interpreter state of the original CLI), but
/// the output sink and its two callbacks are created fresh per call.
pub fn run_program(lua: &Lua, program: &[u8], path: &Path) -> Result<Vec<u8>, EvalError> {
    let sink = Rc::new(RefCell::new(GrowBuffer::new()));

    let raw_sink = Rc::clone(&sink);
    let raw = lua
        .create_function(move |lua, value: Value| -> mlua::Result<()> {
            let bytes = lua_display_bytes(lua, &value)?;
            raw_sink.borrow_mut().push_bytes(&bytes);
            Ok(())
        })
        .map_err(|e| EvalError::Load {
            path: path.to_path_buf(),
            source: e,
        })?;

    let splice_sink = Rc::clone(&sink);
    let splice = lua
        .create_function(move |lua, values: Variadic<Value>| -> mlua::Result<()> {
            for value in values.iter() {
                let bytes = lua_display_bytes(lua, value)?;
                splice_sink.borrow_mut().push_bytes(&bytes);
            }
            Ok(())
        })
        .map_err(|e| EvalError::Load {
            path: path.to_path_buf(),
            source: e,
        })?;

    let chunk = lua.load(program).set_name(format!("@{}", path.display()));

    chunk
        .call::<_, ()>((raw, splice))
        .map_err(|e| EvalError::Runtime {
            path: path.to_path_buf(),
            source: e,
        })?;

    let bytes = sink.borrow().as_bytes().to_vec();
    Ok(bytes)
}

/// Writes the diagnostic sidecar program for a processed file, logging (but
/// not failing the run on) any I/O error.
pub fn write_dump_sidecar(program: &[u8]) {
    if let Err(e) = std::fs::write("dump.lua", program) {
        tracing::warn!("failed to write dump.lua sidecar: {e}");
    }
}

/// Computes the default output path for a `.fiddle`/`.skub` whole-file
/// template, stripping the dialect's suffix.
pub fn default_output_path(input: &Path, suffix: &str) -> PathBuf {
    match input.to_str().and_then(|s| s.strip_suffix(suffix)) {
        Some(stripped) => PathBuf::from(stripped),
        None => input.to_path_buf(),
    }
}
