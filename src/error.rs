//! Error types shared by every stage of the engine.
//!
//! Two things can go wrong: a pattern can be malformed ([`SyntaxError`]), or
//! a pattern/input combination can be too costly under the configured limits
//! ([`ResourceLimitExceeded`]). Not finding a match is not an error.

use thiserror::Error;

/// The reason a pattern was rejected by the scanner or the parser.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SyntaxErrorKind {
    #[error("unterminated character class")]
    UnterminatedClass,
    #[error("dangling escape at end of pattern")]
    DanglingEscape,
    #[error("invalid escape sequence '\\{0}'")]
    InvalidEscape(char),
    #[error("invalid class range '{lo}-{hi}'")]
    InvalidClassRange { lo: char, hi: char },
    #[error("shorthand class cannot be a range endpoint")]
    ClassRangeShorthand,
    #[error("malformed counted repetition")]
    InvalidRepetition,
    #[error("repetition count does not fit in 32 bits")]
    RepetitionCountOverflow,
    #[error("repetition bounds are inverted ({min} > {max})")]
    InvertedRepetition { min: u32, max: u32 },
    #[error("quantifier has nothing to repeat")]
    MissingRepeatOperand,
    #[error("unclosed group")]
    UnclosedGroup,
    #[error("unmatched ')'")]
    UnmatchedGroupClose,
    #[error("unsupported group syntax")]
    UnsupportedGroup,
    #[error("groups nested deeper than {0}")]
    NestLimitExceeded(usize),
    #[error("unexpected token")]
    UnexpectedToken,
}

/// A malformed pattern, with the byte offset where the problem was found.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("syntax error at position {position}: {kind}")]
pub struct SyntaxError {
    position: usize,
    kind: SyntaxErrorKind,
}

impl SyntaxError {
    pub fn new(position: usize, kind: SyntaxErrorKind) -> Self {
        Self { position, kind }
    }

    /// Byte offset into the pattern.
    pub fn position(&self) -> usize {
        self.position
    }

    pub fn kind(&self) -> &SyntaxErrorKind {
        &self.kind
    }

    /// Renders the error together with the pattern and a caret pointing at
    /// the offending character.
    ///
    /// ```text
    /// syntax error at position 3: unclosed group
    ///   ab(c
    ///     ^
    /// ```
    pub fn annotate(&self, pattern: &str) -> String {
        let position = self.position.min(pattern.len());
        let column = pattern
            .char_indices()
            .take_while(|(i, _)| *i < position)
            .count();
        format!("{self}\n  {pattern}\n  {}^", " ".repeat(column))
    }
}

/// A configured ceiling was hit while compiling or matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ResourceLimitExceeded {
    #[error("compiled program exceeds the limit of {limit} instructions")]
    ProgramSize { limit: usize },
    #[error("search exceeded the backtrack limit of {limit}")]
    BacktrackLimit { limit: usize },
}

/// Any error returned while building a [`crate::Regex`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    #[error(transparent)]
    Syntax(#[from] SyntaxError),
    #[error(transparent)]
    ResourceLimitExceeded(#[from] ResourceLimitExceeded),
}
