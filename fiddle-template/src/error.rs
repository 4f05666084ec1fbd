use thiserror::Error;

/// Structural errors from the two template parsers.
///
/// These are distinct from delimiter-balance problems (see `FrameWarning`),
/// which are recorded rather than raised: an unclosed `${` at end of file
/// still yields a best-effort tree, but a `%`-line reached while a `${...}`
/// splice is still open can't be recovered from locally, since the line
/// scanner has no well-formed place to resume.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("escape line ('%...') encountered inside an unterminated ${{...}} splice at byte {pos}")]
    EscapeLineInExpr { pos: usize },
    #[error("unterminated ${{...}} splice starting at byte {start}")]
    UnterminatedExpr { start: usize },
}

/// Structural errors from the chunk framers.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FrameError {
    #[error("unexpected {tag} tag at byte {pos}, not valid in the current state")]
    UnexpectedTag { tag: &'static str, pos: usize },
    #[error("unterminated template chunk starting at byte {start}")]
    UnterminatedChunk { start: usize },
}

/// A non-fatal diagnostic recorded while parsing delimited (skub-style)
/// template bodies. The parser always returns a tree even when warnings are
/// present, per the "best-effort, truncate at EOF" behavior of the original
/// implementation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameWarning {
    pub pos: usize,
    pub message: String,
}
