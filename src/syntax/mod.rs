//! Pattern syntax: scanning, parsing and the resulting tree.

pub mod ast;
pub mod parser;
pub mod scanner;

pub use ast::{Anchor, ClassSet, Node, SyntaxTree};
pub use parser::{DEFAULT_NEST_LIMIT, Parser, parse};
pub use scanner::{Quantifier, Scanner, Token, TokenKind, scan};

/// Escapes every metacharacter in `text`, so the result is a pattern
/// matching exactly `text`.
pub fn escape(text: &str) -> String {
    regex_syntax::escape(text)
}
