//! Recursive descent parser from tokens to [`SyntaxTree`].
//!
//! Grammar, from lowest to highest precedence:
//!
//! ```text
//! Pattern     := Alternation
//! Alternation := Concat ('|' Concat)*
//! Concat      := Repeat*
//! Repeat      := Atom Quantifier?
//! Atom        := Literal | Dot | CharClass | Anchor | '(' Alternation ')'
//! ```
//!
//! A `?` directly after a quantifier makes it lazy. Empty branches and empty
//! groups are accepted and match the empty string.

use super::ast::{ClassSet, Node, SyntaxTree};
use super::scanner::{Quantifier, Scanner, Token, TokenKind};
use crate::error::{SyntaxError, SyntaxErrorKind};

/// Default maximum group nesting depth.
pub const DEFAULT_NEST_LIMIT: usize = 250;

pub struct Parser<I> {
    tokens: I,
    /// The one token of lookahead.
    current: Token,
    /// Position reported if the stream ends without `EndOfInput`.
    end: usize,
    next_capture_index: usize,
    depth: usize,
    nest_limit: usize,
}

impl<I> Parser<I>
where
    I: Iterator<Item = Result<Token, SyntaxError>>,
{
    pub fn new(tokens: I, nest_limit: usize) -> Self {
        Self {
            tokens,
            current: Token {
                kind: TokenKind::EndOfInput,
                position: 0,
            },
            end: 0,
            next_capture_index: 1,
            depth: 0,
            nest_limit,
        }
    }

    /// Parses the whole token stream.
    pub fn parse(mut self) -> Result<SyntaxTree, SyntaxError> {
        self.advance()?;
        let root = self.parse_alternation()?;
        match self.current.kind {
            TokenKind::EndOfInput => Ok(SyntaxTree {
                root,
                capture_count: self.next_capture_index - 1,
            }),
            TokenKind::GroupClose => Err(self.error(SyntaxErrorKind::UnmatchedGroupClose)),
            _ => Err(self.error(SyntaxErrorKind::UnexpectedToken)),
        }
    }

    fn advance(&mut self) -> Result<(), SyntaxError> {
        self.current = match self.tokens.next() {
            Some(token) => token?,
            None => Token {
                kind: TokenKind::EndOfInput,
                position: self.end,
            },
        };
        self.end = self.current.position;
        Ok(())
    }

    fn error(&self, kind: SyntaxErrorKind) -> SyntaxError {
        SyntaxError::new(self.current.position, kind)
    }

    fn parse_alternation(&mut self) -> Result<Node, SyntaxError> {
        let mut branches = vec![self.parse_concat()?];
        while self.current.kind == TokenKind::Alternation {
            self.advance()?;
            branches.push(self.parse_concat()?);
        }
        if branches.len() == 1 {
            Ok(branches.swap_remove(0))
        } else {
            Ok(Node::Alternate(branches))
        }
    }

    fn parse_concat(&mut self) -> Result<Node, SyntaxError> {
        let mut items = Vec::new();
        while !matches!(
            self.current.kind,
            TokenKind::Alternation | TokenKind::GroupClose | TokenKind::EndOfInput
        ) {
            items.push(self.parse_repeat()?);
        }
        if items.len() == 1 {
            Ok(items.swap_remove(0))
        } else {
            Ok(Node::Concat(items))
        }
    }

    fn parse_repeat(&mut self) -> Result<Node, SyntaxError> {
        let atom = self.parse_atom()?;
        let TokenKind::Quantifier(quantifier) = self.current.kind else {
            return Ok(atom);
        };
        let position = self.current.position;
        let (min, max) = match quantifier {
            Quantifier::Star => (0, None),
            Quantifier::Plus => (1, None),
            Quantifier::Question => (0, Some(1)),
            Quantifier::Range(min, Some(max)) if min > max => {
                return Err(SyntaxError::new(
                    position,
                    SyntaxErrorKind::InvertedRepetition { min, max },
                ));
            }
            Quantifier::Range(min, max) => (min, max),
        };
        self.advance()?;
        let greedy = self.current.kind != TokenKind::Quantifier(Quantifier::Question);
        if !greedy {
            self.advance()?;
        }
        Ok(Node::Repeat {
            child: Box::new(atom),
            min,
            max,
            greedy,
        })
    }

    fn parse_atom(&mut self) -> Result<Node, SyntaxError> {
        let node = match self.current.kind {
            TokenKind::Literal(c) => Node::Literal(c),
            TokenKind::Dot => Node::AnyChar,
            TokenKind::Anchor(anchor) => Node::Anchor(anchor),
            TokenKind::ClassOpen { negated } => return self.parse_class(negated),
            TokenKind::GroupOpen { capturing } => return self.parse_group(capturing),
            TokenKind::Quantifier(_) => {
                return Err(self.error(SyntaxErrorKind::MissingRepeatOperand));
            }
            TokenKind::GroupClose => return Err(self.error(SyntaxErrorKind::UnmatchedGroupClose)),
            TokenKind::Alternation
            | TokenKind::ClassClose
            | TokenKind::ClassRange(..)
            | TokenKind::EndOfInput => return Err(self.error(SyntaxErrorKind::UnexpectedToken)),
        };
        self.advance()?;
        Ok(node)
    }

    fn parse_group(&mut self, capturing: bool) -> Result<Node, SyntaxError> {
        let open = self.current.position;
        if self.depth >= self.nest_limit {
            return Err(self.error(SyntaxErrorKind::NestLimitExceeded(self.nest_limit)));
        }
        // Numbered at the opening parenthesis, before anything nested in it.
        let capture_index = capturing.then(|| {
            let index = self.next_capture_index;
            self.next_capture_index += 1;
            index
        });
        log::trace!("group at {open} gets capture index {capture_index:?}");
        self.advance()?;
        self.depth += 1;
        let child = self.parse_alternation()?;
        self.depth -= 1;
        if self.current.kind != TokenKind::GroupClose {
            return Err(SyntaxError::new(open, SyntaxErrorKind::UnclosedGroup));
        }
        self.advance()?;
        Ok(Node::Group {
            child: Box::new(child),
            capture_index,
        })
    }

    fn parse_class(&mut self, negated: bool) -> Result<Node, SyntaxError> {
        self.advance()?;
        let mut ranges = Vec::new();
        loop {
            match self.current.kind {
                TokenKind::ClassRange(lo, hi) => ranges.push((lo, hi)),
                TokenKind::ClassClose => break,
                _ => return Err(self.error(SyntaxErrorKind::UnexpectedToken)),
            }
            self.advance()?;
        }
        self.advance()?;
        Ok(Node::CharClass {
            set: ClassSet::new(ranges),
            negated,
        })
    }
}

/// Scans and parses `pattern`.
pub fn parse(pattern: &str, nest_limit: usize) -> Result<SyntaxTree, SyntaxError> {
    Parser::new(Scanner::new(pattern), nest_limit).parse()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::ast::Anchor;

    fn tree(pattern: &str) -> SyntaxTree {
        parse(pattern, DEFAULT_NEST_LIMIT).unwrap()
    }

    fn root(pattern: &str) -> Node {
        tree(pattern).root
    }

    fn parse_err(pattern: &str) -> SyntaxError {
        parse(pattern, DEFAULT_NEST_LIMIT).unwrap_err()
    }

    fn lit(c: char) -> Node {
        Node::Literal(c)
    }

    fn repeat(child: Node, min: u32, max: Option<u32>, greedy: bool) -> Node {
        Node::Repeat {
            child: Box::new(child),
            min,
            max,
            greedy,
        }
    }

    #[test]
    fn concatenation() {
        assert_eq!(root("abc"), Node::Concat(vec![lit('a'), lit('b'), lit('c')]));
        assert_eq!(root("a"), lit('a'));
        assert_eq!(root(""), Node::empty());
    }

    #[test]
    fn alternation_binds_loosest() {
        assert_eq!(
            root("ab|cd"),
            Node::Alternate(vec![
                Node::Concat(vec![lit('a'), lit('b')]),
                Node::Concat(vec![lit('c'), lit('d')]),
            ])
        );
    }

    #[test]
    fn empty_branches_are_accepted() {
        assert_eq!(
            root("a||b"),
            Node::Alternate(vec![lit('a'), Node::empty(), lit('b')])
        );
        assert_eq!(root("|"), Node::Alternate(vec![Node::empty(), Node::empty()]));
    }

    #[test]
    fn quantifiers_bind_to_single_atom() {
        assert_eq!(
            root("ab*"),
            Node::Concat(vec![lit('a'), repeat(lit('b'), 0, None, true)])
        );
        assert_eq!(root("a+"), repeat(lit('a'), 1, None, true));
        assert_eq!(root("a?"), repeat(lit('a'), 0, Some(1), true));
        assert_eq!(root("a{2,5}"), repeat(lit('a'), 2, Some(5), true));
        assert_eq!(root("a{3}"), repeat(lit('a'), 3, Some(3), true));
        assert_eq!(root("a{3,}"), repeat(lit('a'), 3, None, true));
    }

    #[test]
    fn lazy_quantifiers() {
        assert_eq!(root("a*?"), repeat(lit('a'), 0, None, false));
        assert_eq!(root("a+?"), repeat(lit('a'), 1, None, false));
        assert_eq!(root("a??"), repeat(lit('a'), 0, Some(1), false));
        assert_eq!(root("a{1,2}?"), repeat(lit('a'), 1, Some(2), false));
    }

    #[test]
    fn capture_indices_follow_opening_parens() {
        let tree = tree("((a)(?:b)(c))");
        assert_eq!(tree.capture_count, 3);
        let Node::Group {
            child,
            capture_index: Some(1),
        } = tree.root
        else {
            panic!("outer group should be capture 1");
        };
        let Node::Concat(items) = *child else {
            panic!("expected a concatenation");
        };
        let indices: Vec<_> = items
            .iter()
            .map(|node| match node {
                Node::Group { capture_index, .. } => *capture_index,
                _ => panic!("expected groups"),
            })
            .collect();
        assert_eq!(indices, [Some(2), None, Some(3)]);
    }

    #[test]
    fn classes_are_canonical() {
        assert_eq!(
            root("[c-ea-c]"),
            Node::CharClass {
                set: ClassSet::new([('a', 'e')]),
                negated: false,
            }
        );
        assert_eq!(
            root(r"\D"),
            Node::CharClass {
                set: ClassSet::new([('0', '9')]),
                negated: true,
            }
        );
    }

    #[test]
    fn anchors_and_dot() {
        assert_eq!(
            root("^.$"),
            Node::Concat(vec![
                Node::Anchor(Anchor::Start),
                Node::AnyChar,
                Node::Anchor(Anchor::End),
            ])
        );
        assert_eq!(root("^*"), repeat(Node::Anchor(Anchor::Start), 0, None, true));
    }

    #[test]
    fn quantifier_without_operand() {
        for (pattern, position) in [("*a", 0), ("a|+", 2), ("a**", 2), ("a???", 3)] {
            let err = parse_err(pattern);
            assert_eq!(err.kind(), &SyntaxErrorKind::MissingRepeatOperand, "{pattern}");
            assert_eq!(err.position(), position, "{pattern}");
        }
        assert_eq!(parse_err("(*)").kind(), &SyntaxErrorKind::MissingRepeatOperand);
    }

    #[test]
    fn unbalanced_groups() {
        let err = parse_err("a(b(c)");
        assert_eq!(err.kind(), &SyntaxErrorKind::UnclosedGroup);
        assert_eq!(err.position(), 1);
        let err = parse_err("ab)c");
        assert_eq!(err.kind(), &SyntaxErrorKind::UnmatchedGroupClose);
        assert_eq!(err.position(), 2);
    }

    #[test]
    fn inverted_bounds() {
        let err = parse_err("a{3,2}");
        assert_eq!(
            err.kind(),
            &SyntaxErrorKind::InvertedRepetition { min: 3, max: 2 }
        );
        assert_eq!(err.position(), 1);
    }

    #[test]
    fn nest_limit() {
        let deep = format!("{}a{}", "(".repeat(10), ")".repeat(10));
        assert!(parse(&deep, 10).is_ok());
        let err = parse(&deep, 9).unwrap_err();
        assert_eq!(err.kind(), &SyntaxErrorKind::NestLimitExceeded(9));
        assert_eq!(err.position(), 9);
    }

    #[test]
    fn scanner_errors_propagate() {
        assert_eq!(parse_err("a[b").kind(), &SyntaxErrorKind::UnterminatedClass);
    }
}
