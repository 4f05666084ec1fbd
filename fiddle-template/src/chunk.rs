use fiddle_span::{common_prefix, find_match, ByteSpan, LineReader};

use crate::error::FrameError;
use crate::line::parse_line_template;
use crate::node::{Chunk, SkubChunk};

const TAG_TEMPLATE: &str = "FIDDLE TEMPLATE";
const TAG_OUTPUT: &str = "FIDDLE OUTPUT";
const TAG_END: &str = "FIDDLE END";

const MARK_START: &str = "[[[skub:";
const MARK_END_OUTER: &str = "]]]";
const MARK_END: &str = "[[[end]]]";

#[derive(Clone, Copy, PartialEq, Eq)]
enum State {
    Initial,
    Default,
    InTemplateCode,
    InTemplateOutput,
}

/// A chunk whose `FIDDLE TEMPLATE`/`FIDDLE OUTPUT` boundaries have been seen
/// but whose `FIDDLE END` (and therefore `output` span) hasn't yet.
struct InProgress {
    prefix_start: usize,
    prefix_end: usize,
    code_start: usize,
    code_end: usize,
    line_prefix: Vec<u8>,
    output_start: usize,
}

/// Splits a host source file into chunks by scanning for the
/// `FIDDLE TEMPLATE` / `FIDDLE OUTPUT` / `FIDDLE END` marker sequence.
///
/// Returns `Ok(None)` when the file contains no template markers at all
/// (final state `Initial`), matching the "no chunks, skip this file"
/// behavior of the original chunk framer. The trailing literal text after
/// the last `FIDDLE END` (if any) is returned alongside the chunks so the
/// dispatcher can copy it through unchanged.
pub fn frame_line_style(src: &[u8]) -> Result<Option<(Vec<Chunk>, ByteSpan)>, FrameError> {
    let mut state = State::Initial;
    let mut chunks = Vec::new();
    let mut reader = LineReader::new(src);

    let mut segment_start = 0usize;
    let mut current: Option<InProgress> = None;

    while let Some(line_span) = reader.next_line() {
        let line = line_span.slice(src);

        let has_template = find_match(line, TAG_TEMPLATE.as_bytes()).is_some();
        let has_output = find_match(line, TAG_OUTPUT.as_bytes()).is_some();
        let has_end = find_match(line, TAG_END.as_bytes()).is_some();

        match state {
            State::Initial | State::Default => {
                if has_template {
                    current = Some(InProgress {
                        prefix_start: segment_start,
                        prefix_end: reader.pos(),
                        code_start: reader.pos(),
                        code_end: 0,
                        line_prefix: line.to_vec(),
                        output_start: 0,
                    });
                    state = State::InTemplateCode;
                } else if has_output || has_end {
                    return Err(FrameError::UnexpectedTag {
                        tag: if has_output { "FIDDLE OUTPUT" } else { "FIDDLE END" },
                        pos: line_span.start,
                    });
                }
            }
            State::InTemplateCode => {
                let ip = current.as_mut().expect("InTemplateCode without a chunk in progress");
                if has_output {
                    ip.code_end = line_span.start;
                    ip.output_start = reader.pos();
                    let n = common_prefix(&ip.line_prefix, line);
                    ip.line_prefix.truncate(n);
                    state = State::InTemplateOutput;
                } else if has_template || has_end {
                    return Err(FrameError::UnexpectedTag {
                        tag: if has_template { "FIDDLE TEMPLATE" } else { "FIDDLE END" },
                        pos: line_span.start,
                    });
                } else {
                    let n = common_prefix(&ip.line_prefix, line);
                    ip.line_prefix.truncate(n);
                }
            }
            State::InTemplateOutput => {
                if has_end {
                    let ip = current.take().expect("InTemplateOutput without a chunk in progress");
                    let code = ByteSpan::new(ip.code_start, ip.code_end);
                    let output = ByteSpan::new(ip.output_start, line_span.start);
                    let stripped = strip_line_prefix(code.slice(src), &ip.line_prefix);
                    let template = parse_line_template(&stripped).ok();
                    chunks.push(Chunk {
                        prefix: ByteSpan::new(ip.prefix_start, ip.prefix_end),
                        line_prefix: ip.line_prefix,
                        code,
                        template,
                        output,
                    });
                    // The `FIDDLE END` line itself is host-language text, not
                    // part of the previous output; it becomes prefix text for
                    // whatever chunk (or trailing tail) follows it.
                    segment_start = line_span.start;
                    state = State::Default;
                } else if has_template || has_output {
                    return Err(FrameError::UnexpectedTag {
                        tag: if has_template { "FIDDLE TEMPLATE" } else { "FIDDLE OUTPUT" },
                        pos: line_span.start,
                    });
                }
            }
        }
    }

    match state {
        State::Initial => Ok(None),
        State::Default => {
            let tail = ByteSpan::new(segment_start, src.len());
            Ok(Some((chunks, tail)))
        }
        State::InTemplateCode | State::InTemplateOutput => Err(FrameError::UnterminatedChunk {
            start: current.map(|ip| ip.code_start).unwrap_or(0),
        }),
    }
}

/// Strips the shared `line_prefix` from every line of `code` before it's
/// handed to the template parser; lines that don't start with the prefix
/// (shouldn't happen, since it was computed as the common prefix of every
/// line) are passed through unchanged.
fn strip_line_prefix(code: &[u8], prefix: &[u8]) -> Vec<u8> {
    if prefix.is_empty() {
        return code.to_vec();
    }
    let mut out = Vec::with_capacity(code.len());
    let mut reader = LineReader::new(code);
    while let Some(span) = reader.next_line() {
        let line = span.slice(code);
        let had_terminator = span.end != reader.pos();
        out.extend_from_slice(line.strip_prefix(prefix).unwrap_or(line));
        if had_terminator {
            out.push(b'\n');
        }
    }
    out
}

/// Splits a host source file into chunks by scanning for the embedded
/// `[[[skub: ...]]] ... [[[end]]]` marker pair.
///
/// `[[[skub:` through the next `]]]` is the delimited-dialect meta-code to
/// run (`chunk.code`); everything from there through `[[[end]]]` is the
/// previously generated host text, which is discarded wholesale and
/// replaced by whatever the meta-code produces this run. The trailing host
/// text after the last `[[[end]]]` (or the whole file, if no marker pair
/// was found) is returned separately so the caller can copy it through
/// unchanged.
pub fn frame_skub(src: &[u8]) -> (Vec<SkubChunk>, ByteSpan) {
    let mut chunks = Vec::new();
    let mut pos = 0usize;
    let mut prefix_start = 0usize;

    while let Some(open) = find_match(&src[pos..], MARK_START.as_bytes()) {
        let marker_start = pos + open;
        let code_start = marker_start + MARK_START.len();
        let code_end_rel = match find_match(&src[code_start..], MARK_END_OUTER.as_bytes()) {
            Some(rel) => rel,
            None => break,
        };
        let code_end = code_start + code_end_rel;
        let stale_start = code_end + MARK_END_OUTER.len();
        let end_rel = match find_match(&src[stale_start..], MARK_END.as_bytes()) {
            Some(rel) => rel,
            None => break,
        };
        let end_pos = stale_start + end_rel;
        chunks.push(SkubChunk {
            prefix: ByteSpan::new(prefix_start, marker_start),
            code: ByteSpan::new(code_start, code_end),
        });
        pos = end_pos + MARK_END.len();
        prefix_start = pos;
    }

    (chunks, ByteSpan::new(prefix_start, src.len()))
}
