use fiddle_span::{ByteSpan, LineReader};

use crate::error::ParseError;
use crate::node::TemplateNode;

enum State {
    Default,
    /// Inside an unterminated `${...}` splice. Closes at the first `}`
    /// seen, with no nesting: `${ {1,2,3} }` ends at the first `}`.
    InExpr { start: usize },
}

fn is_escape_line(line: &[u8]) -> Option<usize> {
    let trimmed = line
        .iter()
        .position(|&b| b != b' ' && b != b'\t')
        .unwrap_or(line.len());
    if line.get(trimmed) == Some(&b'%') {
        Some(trimmed)
    } else {
        None
    }
}

/// Parses a line-style ("fiddle") meta-code region into a template tree.
///
/// `src` is expected to already have any shared chunk line-prefix stripped
/// from it by the caller (see `crate::chunk::frame_line_style`).
pub fn parse_line_template(src: &[u8]) -> Result<Vec<TemplateNode>, ParseError> {
    let mut nodes = Vec::new();
    let mut reader = LineReader::new(src);
    let mut state = State::Default;

    while let Some(line_span) = reader.next_line() {
        let had_terminator = !reader.at_eof() || line_span.end != src.len();
        let line = line_span.slice(src);

        if let State::Default = state {
            if let Some(percent) = is_escape_line(line) {
                let body_start = line_span.start + percent + 1;
                nodes.push(TemplateNode::Escape(ByteSpan::new(body_start, line_span.end)));
                continue;
            }
        } else if is_escape_line(line).is_some() {
            return Err(ParseError::EscapeLineInExpr {
                pos: line_span.start,
            });
        }

        let mut i = 0usize;
        let mut text_start = 0usize;
        while i < line.len() {
            match &mut state {
                State::Default => {
                    if line[i] == b'$' && line.get(i + 1) == Some(&b'{') {
                        if i > text_start {
                            nodes.push(TemplateNode::Text(ByteSpan::new(
                                line_span.start + text_start,
                                line_span.start + i,
                            )));
                        }
                        state = State::InExpr {
                            start: line_span.start + i + 2,
                        };
                        i += 2;
                    } else {
                        i += 1;
                    }
                }
                State::InExpr { start } => match line[i] {
                    b'}' => {
                        nodes.push(TemplateNode::EscapeExpr(ByteSpan::new(
                            *start,
                            line_span.start + i,
                        )));
                        state = State::Default;
                        i += 1;
                        text_start = i;
                    }
                    _ => i += 1,
                },
            }
        }

        if let State::Default = state {
            let span = ByteSpan::new(line_span.start + text_start, line_span.end);
            if had_terminator {
                nodes.push(TemplateNode::TextAndNewline(span));
            } else if !span.is_empty() {
                nodes.push(TemplateNode::Text(span));
            }
        }
    }

    if let State::InExpr { start, .. } = state {
        return Err(ParseError::UnterminatedExpr { start });
    }

    Ok(nodes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_input() {
        assert_eq!(parse_line_template(b"").unwrap(), vec![]);
    }

    #[test]
    fn plain_text_no_trailing_newline() {
        let src = b"hello world";
        let nodes = parse_line_template(src).unwrap();
        assert_eq!(nodes, vec![TemplateNode::Text(ByteSpan::new(0, 11))]);
    }

    #[test]
    fn plain_text_with_trailing_newline() {
        let src = b"hello\n";
        let nodes = parse_line_template(src).unwrap();
        assert_eq!(nodes, vec![TemplateNode::TextAndNewline(ByteSpan::new(0, 5))]);
    }

    #[test]
    fn full_line_escape() {
        let src = b"% for i = 1, 3 do\n";
        let nodes = parse_line_template(src).unwrap();
        assert_eq!(nodes, vec![TemplateNode::Escape(ByteSpan::new(1, 17))]);
    }

    #[test]
    fn inline_splice() {
        let src = b"x = ${a + b}\n";
        let nodes = parse_line_template(src).unwrap();
        assert_eq!(
            nodes,
            vec![
                TemplateNode::Text(ByteSpan::new(0, 4)),
                TemplateNode::EscapeExpr(ByteSpan::new(6, 11)),
                TemplateNode::TextAndNewline(ByteSpan::new(12, 12)),
            ]
        );
    }

    #[test]
    fn inline_splice_closes_at_first_brace() {
        // No nesting is tracked: the splice closes at the first `}`, so the
        // trailing `}` is left as ordinary text, matching the original
        // scanner's single-character look-ahead.
        let src = b"${ {1,2,3} }\n";
        let nodes = parse_line_template(src).unwrap();
        assert_eq!(nodes[0], TemplateNode::EscapeExpr(ByteSpan::new(2, 9)));
        assert_eq!(
            nodes[1],
            TemplateNode::TextAndNewline(ByteSpan::new(10, 12))
        );
    }

    #[test]
    fn escape_line_inside_open_expr_is_an_error() {
        let src = b"${ unterminated\n% oops\n";
        let err = parse_line_template(src).unwrap_err();
        assert_eq!(err, ParseError::EscapeLineInExpr { pos: 16 });
    }

    #[test]
    fn unterminated_expr_at_eof() {
        let src = b"${ unterminated";
        let err = parse_line_template(src).unwrap_err();
        assert_eq!(err, ParseError::UnterminatedExpr { start: 2 });
    }
}
