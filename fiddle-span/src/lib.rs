//! Byte spans, line reading, and a growable output buffer shared by the
//! `fiddle` template parsers and evaluation driver.

mod buffer;
mod reader;
mod span;

pub use buffer::GrowBuffer;
pub use reader::LineReader;
pub use span::{common_prefix, find_match, ByteSpan, Sliceable};
