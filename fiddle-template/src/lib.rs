//! Parsing, chunk framing, and Lua emission for both `fiddle` template
//! dialects: the line-style (`%`/`${...}`) dialect and the delimited
//! (`$(...)`/`` `{...} ``) dialect.

mod chunk;
mod emit;
mod error;
mod line;
mod node;
mod skub;

pub use chunk::{frame_line_style, frame_skub};
pub use emit::{emit_chunk, emit_raw, emit_skub_chunk, emit_skub_node, emit_skub_root, emit_template};
pub use error::{FrameError, FrameWarning, ParseError};
pub use line::parse_line_template;
pub use node::{Chunk, Form, Role, SkubChunk, SkubNode, TemplateNode};
pub use skub::{parse_skub, parse_skub_range};
