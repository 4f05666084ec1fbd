use fiddle_span::ByteSpan;

/// A node in a line-style ("fiddle") template tree.
///
/// `${...}` splices are not themselves re-parsed for nested escapes: the
/// span between the delimiters is injected verbatim as a Lua expression, so
/// a single span suffices instead of a recursive child list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplateNode {
    /// Plain text with no following line terminator (only possible at the
    /// end of a file or chunk).
    Text(ByteSpan),
    /// Plain text followed by a line terminator in the output.
    TextAndNewline(ByteSpan),
    /// A full `%`-prefixed line of Lua source, emitted verbatim as a
    /// statement.
    Escape(ByteSpan),
    /// An inline `${ expr }` splice; the span covers the raw expression
    /// source between the delimiters.
    EscapeExpr(ByteSpan),
}

/// The two orthogonal axes of a delimited ("skub") escape node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// `$(...)`/`${...}`: splice the result directly into the surrounding
    /// output.
    Splice,
    /// `` `(...) ``/`` `{...} ``: evaluate in an isolated sink and splice
    /// the captured text, via the `_QUOTE` wrapper.
    Quote,
}

/// The syntactic form of a delimited escape node's body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Form {
    /// `(...)`: a single Lua expression.
    Expr,
    /// `{...}` or `:...` (line-bounded): a sequence of Lua statements.
    Stmt,
}

/// A node in a delimited ("skub") template tree.
///
/// Unlike the line-style tree, skub nodes nest: a splice or quote body can
/// itself contain further `$`/`` ` `` escapes, so each node owns its
/// children directly instead of being split into a flat span list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkubNode {
    pub role: Role,
    pub form: Form,
    /// The full span of this escape, sigil and delimiters included, used to
    /// locate where surrounding raw text ends and resumes.
    pub text: ByteSpan,
    /// The span of the body, delimiters excluded.
    pub body: ByteSpan,
    pub children: Vec<SkubNode>,
}

impl SkubNode {
    /// Builds the implicit root node that wraps an entire skub-dialect file:
    /// a statement-form splice whose body never explicitly closes, only
    /// ending at EOF.
    pub fn root(body: ByteSpan, children: Vec<SkubNode>) -> Self {
        SkubNode {
            role: Role::Splice,
            form: Form::Stmt,
            text: body,
            body,
            children,
        }
    }
}

/// One meta-code/output region of a host source file, produced by the
/// line-style chunk framer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    /// Literal host-language text preceding this chunk's template marker,
    /// copied through unchanged.
    pub prefix: ByteSpan,
    /// The common leading whitespace/comment-marker prefix shared by every
    /// line of this chunk's meta-code region, stripped before parsing and
    /// restored verbatim around the generated comment in the emitted Lua.
    pub line_prefix: Vec<u8>,
    /// The raw meta-code region between `FIDDLE TEMPLATE` and
    /// `FIDDLE OUTPUT`.
    pub code: ByteSpan,
    /// The parsed template tree for `code`, once `line_prefix` has been
    /// stripped from every line.
    pub template: Option<Vec<TemplateNode>>,
    /// The previous run's literal output, between `FIDDLE OUTPUT` and
    /// `FIDDLE END`. Kept only to be re-emitted as a comment, for
    /// diff-friendliness across runs.
    pub output: ByteSpan,
}

/// One meta-code/output region of a host source file, produced by the
/// delimited-dialect embedded chunk framer (`[[[skub: ...]]] ... [[[end]]]`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkubChunk {
    pub prefix: ByteSpan,
    /// The delimited-dialect meta-code between `[[[skub:` and `]]]`.
    pub code: ByteSpan,
}
