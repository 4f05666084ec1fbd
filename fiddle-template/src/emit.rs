use fiddle_span::GrowBuffer;

use crate::node::{Chunk, Form, Role, SkubChunk, SkubNode, TemplateNode};

/// Wraps literal bytes in a Lua long-bracket raw string passed to `_RAW`.
///
/// Lua's `[==[ ... ]==]` skips a newline immediately following the opening
/// bracket, so a leading CR/LF is peeled off and emitted as an explicit
/// `_RAW("\n")` call first; otherwise that byte would silently vanish from
/// the output.
pub fn emit_raw(buf: &mut GrowBuffer, bytes: &[u8]) {
    if bytes.is_empty() {
        return;
    }
    let mut rest = bytes;
    if rest[0] == b'\n' || rest[0] == b'\r' {
        buf.push_str(" _RAW(\"\\n\"); ");
        rest = &rest[1..];
        if rest.is_empty() {
            return;
        }
    }
    buf.push_str(" _RAW([==[");
    buf.push_bytes(rest);
    buf.push_str("]==]); ");
}

/// Wraps bytes in a Lua long-bracket comment, used to re-emit the previous
/// chunk's generated code and output as a diff-stable trace in the new
/// program text.
fn emit_raw_comment(buf: &mut GrowBuffer, bytes: &[u8]) {
    if bytes.is_empty() {
        return;
    }
    buf.push_str(" --[==[");
    buf.push_bytes(bytes);
    buf.push_str("]==] ");
}

/// Lowers a parsed line-style template tree into Lua source text.
pub fn emit_template(buf: &mut GrowBuffer, nodes: &[TemplateNode], src: &[u8]) {
    for node in nodes {
        match node {
            TemplateNode::Text(span) => emit_raw(buf, span.slice(src)),
            TemplateNode::TextAndNewline(span) => {
                emit_raw(buf, span.slice(src));
                buf.push_str(" _RAW(\"\\n\"); ");
            }
            TemplateNode::Escape(span) => {
                buf.push_bytes(span.slice(src));
                buf.push_str("\n");
            }
            TemplateNode::EscapeExpr(span) => {
                buf.push_str(" _SPLICE(");
                buf.push_bytes(span.slice(src));
                buf.push_str("); ");
            }
        }
    }
}

/// Emits one line-style chunk: the literal prefix, the original code and
/// previous output re-emitted as comments for diff stability, then the
/// generated template body.
pub fn emit_chunk(buf: &mut GrowBuffer, chunk: &Chunk, src: &[u8]) {
    emit_raw(buf, chunk.prefix.slice(src));
    emit_raw_comment(buf, chunk.code.slice(src));
    if let Some(nodes) = &chunk.template {
        emit_template(buf, nodes, src);
    }
    emit_raw_comment(buf, chunk.output.slice(src));
}

#[derive(Clone, Copy)]
enum Mode {
    /// The gap bytes are literal output text, wrapped in `_RAW(...)`.
    Text,
    /// The gap bytes are Lua source, emitted verbatim.
    Code,
}

fn emit_gap(buf: &mut GrowBuffer, bytes: &[u8], mode: Mode) {
    match mode {
        Mode::Text => emit_raw(buf, bytes),
        Mode::Code => buf.push_bytes(bytes),
    }
}

/// Walks a node's body, copying the text between child escapes (in `mode`)
/// and recursively emitting each child.
fn emit_children(buf: &mut GrowBuffer, node: &SkubNode, src: &[u8], mode: Mode) {
    let mut cursor = node.body.start;
    for child in &node.children {
        emit_gap(buf, &src[cursor..child.text.start], mode);
        emit_skub_node(buf, child, src);
        cursor = child.text.end;
    }
    emit_gap(buf, &src[cursor..node.body.end], mode);
}

/// Emits one delimited-dialect escape node.
///
/// - `Splice`/`Expr` (`$(...)`): the body is a bare Lua expression, spliced
///   directly: `_SPLICE(body);`.
/// - `Splice`/`Stmt` (`${...}`/`$:...`): the body is Lua source that runs
///   inline, with any of its own nested escapes re-dispatched in place.
/// - `Quote`/`Expr` (`` `(...) ``): the body is literal text, captured via
///   the `_QUOTE` thunk and left as a bare expression for the surrounding
///   Lua code to use.
/// - `Quote`/`Stmt` (`` `{...} ``): the body is literal text, spliced inline
///   with no isolation (per the original implementation, this form never
///   gets the thunk wrapper).
pub fn emit_skub_node(buf: &mut GrowBuffer, node: &SkubNode, src: &[u8]) {
    match (node.role, node.form) {
        (Role::Splice, Form::Expr) => {
            buf.push_str(" _SPLICE(");
            buf.push_bytes(node.body.slice(src));
            buf.push_str("); ");
        }
        (Role::Splice, Form::Stmt) => emit_children(buf, node, src, Mode::Code),
        (Role::Quote, Form::Expr) => {
            buf.push_str(" _QUOTE(function() ");
            emit_children(buf, node, src, Mode::Text);
            buf.push_str(" end) ");
        }
        (Role::Quote, Form::Stmt) => emit_children(buf, node, src, Mode::Text),
    }
}

/// Emits the root of a parsed delimited-dialect file: a statement/splice
/// node whose children are interleaved with literal text.
pub fn emit_skub_root(buf: &mut GrowBuffer, root: &SkubNode, src: &[u8]) {
    emit_children(buf, root, src, Mode::Text);
}

/// Emits one embedded skub chunk: the literal prefix followed by the parsed
/// body's Lua translation.
pub fn emit_skub_chunk(buf: &mut GrowBuffer, chunk: &SkubChunk, root: &SkubNode, src: &[u8]) {
    emit_raw(buf, chunk.prefix.slice(src));
    emit_skub_root(buf, root, src);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::skub::parse_skub;

    #[test]
    fn emit_plain_text() {
        let mut buf = GrowBuffer::new();
        emit_raw(&mut buf, b"hello");
        assert_eq!(buf.as_bytes(), b" _RAW([==[hello]==]); ");
    }

    #[test]
    fn emit_leading_newline_peeled_off() {
        let mut buf = GrowBuffer::new();
        emit_raw(&mut buf, b"\nhello");
        let text = String::from_utf8(buf.into_vec()).unwrap();
        assert!(text.starts_with(" _RAW(\"\\n\"); "));
        assert!(text.contains("_RAW([==[hello]==]);"));
    }

    #[test]
    fn emit_line_template_round_trips_splice() {
        let src = b"x = ${a + b}\n";
        let nodes = crate::line::parse_line_template(src).unwrap();
        let mut buf = GrowBuffer::new();
        emit_template(&mut buf, &nodes, src);
        let text = String::from_utf8(buf.into_vec()).unwrap();
        assert!(text.contains("_SPLICE(a + b);"));
    }

    #[test]
    fn emit_skub_splice_expr() {
        let src = b"a $(x+y) b";
        let (root, _) = parse_skub(src);
        let mut buf = GrowBuffer::new();
        emit_skub_root(&mut buf, &root, src);
        let text = String::from_utf8(buf.into_vec()).unwrap();
        assert!(text.contains("_SPLICE(x+y);"));
    }

    #[test]
    fn emit_skub_quote_expr_uses_thunk() {
        let src = b"a `(x) b";
        let (root, _) = parse_skub(src);
        let mut buf = GrowBuffer::new();
        emit_skub_root(&mut buf, &root, src);
        let text = String::from_utf8(buf.into_vec()).unwrap();
        assert!(text.contains("_QUOTE(function()"));
        assert!(text.contains("end)"));
    }
}
