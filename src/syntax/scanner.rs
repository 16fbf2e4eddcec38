//! Turns a pattern string into a stream of [`Token`]s.
//!
//! The scanner only checks that each token is well formed: escapes must be
//! known, character classes must be closed and counted repetitions must be
//! syntactically valid. Whether tokens appear in a legal order is decided by
//! the parser.

use std::collections::VecDeque;

use regex_syntax::is_escapeable_character;

use super::ast::{Anchor, ClassSet};
use crate::error::{SyntaxError, SyntaxErrorKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Quantifier {
    Star,
    Plus,
    Question,
    /// `{m}`, `{m,}` and `{m,n}`. `{m}` is `Range(m, Some(m))`.
    Range(u32, Option<u32>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Literal(char),
    Dot,
    Anchor(Anchor),
    Quantifier(Quantifier),
    GroupOpen { capturing: bool },
    GroupClose,
    Alternation,
    ClassOpen { negated: bool },
    ClassClose,
    ClassRange(char, char),
    EndOfInput,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    /// Byte offset of the first character of the token in the pattern.
    pub position: usize,
}

const DIGIT: &[(char, char)] = &[('0', '9')];
const WORD: &[(char, char)] = &[('0', '9'), ('A', 'Z'), ('_', '_'), ('a', 'z')];
const SPACE: &[(char, char)] = &[('\t', '\r'), (' ', ' ')];

/// `\d`, `\w`, `\s` and their negations.
fn shorthand(c: char) -> Option<(&'static [(char, char)], bool)> {
    match c {
        'd' => Some((DIGIT, false)),
        'D' => Some((DIGIT, true)),
        'w' => Some((WORD, false)),
        'W' => Some((WORD, true)),
        's' => Some((SPACE, false)),
        'S' => Some((SPACE, true)),
        _ => None,
    }
}

enum ClassAtom {
    Char(char),
    Set(Vec<(char, char)>),
}

/// A lazy token stream over one pattern.
///
/// Yields `Ok(Token)` items ending with [`TokenKind::EndOfInput`], or stops
/// right after the first `Err`. The cursor lives in the scanner value, so
/// restarting means creating a new one.
pub struct Scanner<'p> {
    pattern: &'p str,
    current: usize,
    pending: VecDeque<Token>,
    finished: bool,
}

impl<'p> Scanner<'p> {
    pub fn new(pattern: &'p str) -> Self {
        Self {
            pattern,
            current: 0,
            pending: VecDeque::new(),
            finished: false,
        }
    }

    fn peek(&self) -> Option<char> {
        self.pattern[self.current..].chars().next()
    }

    fn peek_second(&self) -> Option<char> {
        let mut chars = self.pattern[self.current..].chars();
        chars.next();
        chars.next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.current += c.len_utf8();
        Some(c)
    }

    fn push(&mut self, kind: TokenKind, position: usize) {
        self.pending.push_back(Token { kind, position });
    }

    fn error(position: usize, kind: SyntaxErrorKind) -> SyntaxError {
        SyntaxError::new(position, kind)
    }

    /// Scans the next lexical unit, pushing one or more tokens.
    fn scan_next(&mut self) -> Result<(), SyntaxError> {
        let start = self.current;
        let Some(c) = self.bump() else {
            self.finished = true;
            self.push(TokenKind::EndOfInput, start);
            return Ok(());
        };
        let kind = match c {
            '.' => TokenKind::Dot,
            '^' => TokenKind::Anchor(Anchor::Start),
            '$' => TokenKind::Anchor(Anchor::End),
            '*' => TokenKind::Quantifier(Quantifier::Star),
            '+' => TokenKind::Quantifier(Quantifier::Plus),
            '?' => TokenKind::Quantifier(Quantifier::Question),
            '{' => TokenKind::Quantifier(self.scan_counted(start)?),
            '(' => {
                if self.peek() == Some('?') {
                    self.bump();
                    if self.bump() != Some(':') {
                        return Err(Self::error(start, SyntaxErrorKind::UnsupportedGroup));
                    }
                    TokenKind::GroupOpen { capturing: false }
                } else {
                    TokenKind::GroupOpen { capturing: true }
                }
            }
            ')' => TokenKind::GroupClose,
            '|' => TokenKind::Alternation,
            '[' => return self.scan_class(start),
            '\\' => return self.scan_escape(start),
            c => TokenKind::Literal(c),
        };
        self.push(kind, start);
        Ok(())
    }

    fn scan_escape(&mut self, start: usize) -> Result<(), SyntaxError> {
        let Some(c) = self.bump() else {
            return Err(Self::error(start, SyntaxErrorKind::DanglingEscape));
        };
        if let Some((ranges, negated)) = shorthand(c) {
            self.push(TokenKind::ClassOpen { negated }, start);
            for &(lo, hi) in ranges {
                self.push(TokenKind::ClassRange(lo, hi), start);
            }
            self.push(TokenKind::ClassClose, start);
        } else {
            let literal = escaped_literal(c, start)?;
            self.push(TokenKind::Literal(literal), start);
        }
        Ok(())
    }

    /// Parses the body of `{m}`, `{m,}` or `{m,n}`; the `{` is consumed.
    fn scan_counted(&mut self, start: usize) -> Result<Quantifier, SyntaxError> {
        let invalid = || Self::error(start, SyntaxErrorKind::InvalidRepetition);
        let min = self.scan_number(start)?.ok_or_else(invalid)?;
        match self.bump() {
            Some('}') => Ok(Quantifier::Range(min, Some(min))),
            Some(',') => {
                if self.peek() == Some('}') {
                    self.bump();
                    return Ok(Quantifier::Range(min, None));
                }
                let max = self.scan_number(start)?.ok_or_else(invalid)?;
                if self.bump() != Some('}') {
                    return Err(invalid());
                }
                Ok(Quantifier::Range(min, Some(max)))
            }
            _ => Err(invalid()),
        }
    }

    fn scan_number(&mut self, start: usize) -> Result<Option<u32>, SyntaxError> {
        let mut value: Option<u32> = None;
        while let Some(digit) = self.peek().and_then(|c| c.to_digit(10)) {
            self.bump();
            let next = value
                .unwrap_or(0)
                .checked_mul(10)
                .and_then(|v| v.checked_add(digit))
                .ok_or_else(|| Self::error(start, SyntaxErrorKind::RepetitionCountOverflow))?;
            value = Some(next);
        }
        Ok(value)
    }

    /// Scans a whole `[...]` class; the `[` is consumed. Nothing is pushed
    /// unless the class is well formed.
    fn scan_class(&mut self, start: usize) -> Result<(), SyntaxError> {
        let negated = self.peek() == Some('^');
        if negated {
            self.bump();
        }
        let mut tokens = vec![Token {
            kind: TokenKind::ClassOpen { negated },
            position: start,
        }];
        let mut first = true;
        loop {
            let item_start = self.current;
            let Some(c) = self.bump() else {
                return Err(Self::error(start, SyntaxErrorKind::UnterminatedClass));
            };
            if c == ']' && !first {
                tokens.push(Token {
                    kind: TokenKind::ClassClose,
                    position: item_start,
                });
                break;
            }
            first = false;

            let lo = match self.class_atom(c, item_start)? {
                ClassAtom::Char(lo) => lo,
                ClassAtom::Set(ranges) => {
                    tokens.extend(ranges.into_iter().map(|(lo, hi)| Token {
                        kind: TokenKind::ClassRange(lo, hi),
                        position: item_start,
                    }));
                    continue;
                }
            };

            let mut hi = lo;
            // A '-' right before the closing ']' is a literal.
            if self.peek() == Some('-') && self.peek_second().is_some_and(|c| c != ']') {
                self.bump();
                let hi_start = self.current;
                let Some(c) = self.bump() else {
                    return Err(Self::error(start, SyntaxErrorKind::UnterminatedClass));
                };
                hi = match self.class_atom(c, hi_start)? {
                    ClassAtom::Char(hi) => hi,
                    ClassAtom::Set(_) => {
                        return Err(Self::error(
                            hi_start,
                            SyntaxErrorKind::ClassRangeShorthand,
                        ));
                    }
                };
                if lo > hi {
                    return Err(Self::error(
                        item_start,
                        SyntaxErrorKind::InvalidClassRange { lo, hi },
                    ));
                }
            }
            tokens.push(Token {
                kind: TokenKind::ClassRange(lo, hi),
                position: item_start,
            });
        }
        self.pending.extend(tokens);
        Ok(())
    }

    fn class_atom(&mut self, c: char, position: usize) -> Result<ClassAtom, SyntaxError> {
        if c != '\\' {
            return Ok(ClassAtom::Char(c));
        }
        let Some(escaped) = self.bump() else {
            return Err(Self::error(position, SyntaxErrorKind::DanglingEscape));
        };
        Ok(match shorthand(escaped) {
            Some((ranges, false)) => ClassAtom::Set(ranges.to_vec()),
            Some((ranges, true)) => {
                ClassAtom::Set(ClassSet::new(ranges.iter().copied()).negate().ranges().to_vec())
            }
            None => ClassAtom::Char(escaped_literal(escaped, position)?),
        })
    }
}

/// The character an escape `\c` stands for, when it is not a shorthand class.
fn escaped_literal(c: char, position: usize) -> Result<char, SyntaxError> {
    match c {
        'n' => Ok('\n'),
        't' => Ok('\t'),
        'r' => Ok('\r'),
        'f' => Ok('\x0C'),
        'v' => Ok('\x0B'),
        c if is_escapeable_character(c) => Ok(c),
        c => Err(SyntaxError::new(position, SyntaxErrorKind::InvalidEscape(c))),
    }
}

impl Iterator for Scanner<'_> {
    type Item = Result<Token, SyntaxError>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(token) = self.pending.pop_front() {
            return Some(Ok(token));
        }
        if self.finished {
            return None;
        }
        match self.scan_next() {
            Ok(()) => self.pending.pop_front().map(Ok),
            Err(err) => {
                self.finished = true;
                self.pending.clear();
                Some(Err(err))
            }
        }
    }
}

/// Scans a whole pattern eagerly.
pub fn scan(pattern: &str) -> Result<Vec<Token>, SyntaxError> {
    Scanner::new(pattern).collect()
}
