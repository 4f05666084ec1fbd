use fiddle_span::ByteSpan;

use crate::error::FrameWarning;
use crate::node::{Form, Role, SkubNode};

/// Parses an entire delimited ("skub") template body into a tree rooted at
/// an implicit statement-form splice that spans the whole input.
///
/// Unlike the line-style parser, this never fails outright: an unclosed
/// delimiter at end of file is recorded as a warning and the tree is
/// truncated there, matching the original implementation's best-effort
/// recovery.
pub fn parse_skub(src: &[u8]) -> (SkubNode, Vec<FrameWarning>) {
    parse_skub_range(src, 0, src.len())
}

/// Parses the sub-range `[start, end)` of `src` as a delimited template
/// body, with every span in the resulting tree expressed as an absolute
/// offset into `src` rather than into the sub-range.
///
/// Used for embedded skub regions, where the body sits at some nonzero
/// offset inside a larger host file and the emitter later needs to slice
/// that same `src` buffer to recover node text.
pub fn parse_skub_range(src: &[u8], start: usize, end: usize) -> (SkubNode, Vec<FrameWarning>) {
    let mut warnings = Vec::new();
    let mut cursor = start;
    let (children, _) = read_node_body(src, &mut cursor, end, None, 0, &mut warnings);
    (SkubNode::root(ByteSpan::new(start, end), children), warnings)
}

/// Scans the body of a node starting at `*cursor`, returning its children
/// and the offset just before the consumed closing delimiter (or the
/// truncation point, at EOF). `delims` is `None` for the implicit root
/// (never closes except at EOF) or `Some((open, close, open_count))` for an
/// explicit `(...)`/`{...}` body, where `open_count` is the number of
/// consecutive opening delimiter characters that were consumed (supporting
/// heredoc-style multi-brace closers like `${{ ... }}`).
fn read_node_body(
    src: &[u8],
    cursor: &mut usize,
    end: usize,
    delims: Option<(u8, u8, u32)>,
    depth: u32,
    warnings: &mut Vec<FrameWarning>,
) -> (Vec<SkubNode>, usize) {
    let mut children = Vec::new();
    let mut nesting: i64 = 0;
    let start = *cursor;

    while *cursor < end {
        let b = src[*cursor];
        match b {
            b'$' | b'`' => {
                let role = if b == b'$' { Role::Splice } else { Role::Quote };
                if let Some(child) = read_child_node(src, cursor, end, role, depth, warnings) {
                    children.push(child);
                } else {
                    *cursor += 1;
                }
            }
            _ => {
                if let Some((open, close, open_count)) = delims {
                    if b == open {
                        nesting += 1;
                        *cursor += 1;
                    } else if b == close {
                        if open_count > 1 {
                            let run_start = *cursor;
                            let mut run_len = 0u32;
                            while *cursor < end && src[*cursor] == close {
                                run_len += 1;
                                *cursor += 1;
                            }
                            if run_len >= open_count {
                                let body_end = run_start;
                                *cursor = run_start + open_count as usize;
                                return (children, body_end);
                            }
                            // Not enough consecutive closers to terminate;
                            // treat the run as ordinary body text.
                        } else if nesting == 0 {
                            let body_end = *cursor;
                            *cursor += 1;
                            return (children, body_end);
                        } else {
                            nesting -= 1;
                            *cursor += 1;
                        }
                    } else {
                        *cursor += 1;
                    }
                } else {
                    *cursor += 1;
                }
            }
        }
    }

    if let Some((_, _, open_count)) = delims {
        if open_count >= 1 {
            warnings.push(FrameWarning {
                pos: start,
                message: "unclosed delimiter at end of file".to_string(),
            });
        }
    }
    (children, *cursor)
}

fn read_child_node(
    src: &[u8],
    cursor: &mut usize,
    end: usize,
    role: Role,
    depth: u32,
    warnings: &mut Vec<FrameWarning>,
) -> Option<SkubNode> {
    let sigil_pos = *cursor;
    if sigil_pos + 1 >= end {
        return None;
    }
    let next = src[sigil_pos + 1];
    match next {
        b'(' => {
            let delim_start = sigil_pos + 1;
            let open_count = count_run(src, delim_start, end, b'(');
            *cursor = delim_start + open_count as usize;
            let body_start = *cursor;
            let (children, body_end) = read_node_body(
                src,
                cursor,
                end,
                Some((b'(', b')', open_count)),
                depth + 1,
                warnings,
            );
            Some(SkubNode {
                role,
                form: Form::Expr,
                text: ByteSpan::new(sigil_pos, *cursor),
                body: ByteSpan::new(body_start, body_end),
                children,
            })
        }
        b'{' => {
            let delim_start = sigil_pos + 1;
            let open_count = count_run(src, delim_start, end, b'{');
            *cursor = delim_start + open_count as usize;
            let body_start = *cursor;
            let (children, body_end) = read_node_body(
                src,
                cursor,
                end,
                Some((b'{', b'}', open_count)),
                depth + 1,
                warnings,
            );
            Some(SkubNode {
                role,
                form: Form::Stmt,
                text: ByteSpan::new(sigil_pos, *cursor),
                body: ByteSpan::new(body_start, body_end),
                children,
            })
        }
        b':' => {
            *cursor = sigil_pos + 2;
            let body_start = *cursor;
            while *cursor < end && src[*cursor] != b'\n' && src[*cursor] != b'\r' {
                *cursor += 1;
            }
            let body_end = *cursor;
            Some(SkubNode {
                role,
                form: Form::Stmt,
                text: ByteSpan::new(sigil_pos, *cursor),
                body: ByteSpan::new(body_start, body_end),
                children: Vec::new(),
            })
        }
        _ => {
            use bstr::ByteSlice;
            warnings.push(FrameWarning {
                pos: sigil_pos,
                message: format!(
                    "sigil not followed by '(', '{{', or ':', found {:?}",
                    [next].as_bstr()
                ),
            });
            None
        }
    }
}

fn count_run(src: &[u8], start: usize, end: usize, b: u8) -> u32 {
    let mut n = 0u32;
    while start + (n as usize) < end && src[start + n as usize] == b {
        n += 1;
    }
    n.max(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn root_with_no_escapes() {
        let (root, warnings) = parse_skub(b"plain text");
        assert!(warnings.is_empty());
        assert!(root.children.is_empty());
        assert_eq!(root.body, ByteSpan::new(0, 10));
    }

    #[test]
    fn simple_splice_expr() {
        let (root, warnings) = parse_skub(b"a $(x+y) b");
        assert!(warnings.is_empty());
        assert_eq!(root.children.len(), 1);
        let child = &root.children[0];
        assert_eq!(child.role, Role::Splice);
        assert_eq!(child.form, Form::Expr);
        assert_eq!(child.body.slice(b"a $(x+y) b"), b"x+y");
    }

    #[test]
    fn simple_quote_stmt_block() {
        let (root, _) = parse_skub(b"`{ print(1) }");
        let child = &root.children[0];
        assert_eq!(child.role, Role::Quote);
        assert_eq!(child.form, Form::Stmt);
        assert_eq!(child.body.slice(b"`{ print(1) }"), b" print(1) ");
    }

    #[test]
    fn line_bounded_stmt() {
        let (root, _) = parse_skub(b"$: local x = 1\nrest");
        let child = &root.children[0];
        assert_eq!(child.form, Form::Stmt);
        assert_eq!(child.body.slice(b"$: local x = 1\nrest"), b" local x = 1");
    }

    #[test]
    fn nested_same_delimiter_does_not_close_early() {
        let src = b"$( f({1,2}) )";
        let (root, warnings) = parse_skub(src);
        assert!(warnings.is_empty());
        let child = &root.children[0];
        assert_eq!(child.body.slice(src), b" f({1,2}) ");
    }

    #[test]
    fn heredoc_style_multi_brace_closer() {
        let src = b"${{ a } still open }}";
        let (root, warnings) = parse_skub(src);
        assert!(warnings.is_empty());
        let child = &root.children[0];
        assert_eq!(child.body.slice(src), b" a } still open ");
    }

    #[test]
    fn unclosed_brace_at_eof_warns_and_truncates() {
        let src = b"${ unterminated";
        let (root, warnings) = parse_skub(src);
        assert_eq!(warnings.len(), 1);
        let child = &root.children[0];
        assert_eq!(child.body.slice(src), b" unterminated");
    }

    #[test]
    fn nested_children() {
        let src = b"$( outer $(inner) tail )";
        let (root, _) = parse_skub(src);
        let outer = &root.children[0];
        assert_eq!(outer.children.len(), 1);
        assert_eq!(outer.children[0].body.slice(src), b"inner");
    }
}
