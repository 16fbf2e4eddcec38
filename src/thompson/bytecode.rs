//! A Thompson NFA represented in a bytecode format.
//!
//! This module contains the definition of [`Instruction`], a bytecode format
//! that represents a Thompson NFA, and the [`Compiler`] lowering a
//! [`SyntaxTree`] to it. Unbounded repetitions compile to loops, so the size
//! of a program is linear in the size of the pattern, except for counted
//! repetitions which are unrolled. The size limit of [`Config`] bounds that
//! unrolling.
//!
//! Instructions refer to each other by index into [`Program::instructions`].
use std::fmt;

use regex_syntax::hir::Look;

use crate::{
    error::ResourceLimitExceeded,
    regex::Config,
    syntax::{Anchor, ClassSet, Node, SyntaxTree, ast::class_contains},
    util::{char_at, char_before},
};

/// Bytecode
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Instruction {
    Char(char),
    /// Any character; `\n` only when the flag is set.
    AnyChar(bool),
    ClassMatch {
        ranges: Box<[(char, char)]>,
        negated: bool,
    },
    /// Continue at both targets, the first one with higher priority.
    Split(usize, usize),
    Jump(usize),
    /// Record the current offset in a capture slot.
    Save(usize),
    Assertion(Look),
    Match,
}

use Instruction::*;

impl Instruction {
    /// Whether a consuming instruction accepts `c`. Always false for
    /// non-consuming instructions.
    pub fn accepts(&self, c: char) -> bool {
        match self {
            Char(expected) => *expected == c,
            AnyChar(new_line) => *new_line || c != '\n',
            ClassMatch { ranges, negated } => class_contains(ranges, c) != *negated,
            _ => false,
        }
    }
}

/// Whether the assertion holds at byte offset `at` of the whole subject.
pub(crate) fn look_matches(look: Look, subject: &str, at: usize) -> bool {
    match look {
        Look::Start => at == 0,
        Look::End => at == subject.len(),
        Look::StartLF => at == 0 || char_before(subject, at) == Some('\n'),
        Look::EndLF => at == subject.len() || char_at(subject, at) == Some('\n'),
        // Never emitted by the compiler
        _ => false,
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Char(c) => write!(f, "char {c:?}"),
            AnyChar(true) => write!(f, "any"),
            AnyChar(false) => write!(f, "any-except-nl"),
            ClassMatch { ranges, negated } => {
                write!(f, "class ")?;
                if *negated {
                    write!(f, "^")?;
                }
                for (lo, hi) in ranges.iter() {
                    if lo == hi {
                        write!(f, "{lo:?}")?;
                    } else {
                        write!(f, "{lo:?}-{hi:?}")?;
                    }
                }
                Ok(())
            }
            Split(a, b) => write!(f, "split {a}, {b}"),
            Jump(target) => write!(f, "jump {target}"),
            Save(slot) => write!(f, "save {slot}"),
            Assertion(look) => write!(f, "assert {look:?}"),
            Match => write!(f, "match"),
        }
    }
}

/// A compiled pattern.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Program {
    instructions: Vec<Instruction>,
    /// Number of capture groups, including the implicit group 0.
    capture_count: usize,
}

impl Program {
    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }

    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    pub fn capture_count(&self) -> usize {
        self.capture_count
    }

    /// Two slots per group, its start then its end.
    pub fn slot_count(&self) -> usize {
        2 * self.capture_count
    }
}

impl fmt::Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (pc, instruction) in self.instructions.iter().enumerate() {
            writeln!(f, "{pc:04}: {instruction}")?;
        }
        Ok(())
    }
}

/// A compiler from a [`SyntaxTree`] to this bytecode representation.
#[derive(Debug)]
pub struct Compiler<'c> {
    instructions: Vec<Instruction>,
    config: &'c Config,
}

impl<'c> Compiler<'c> {
    /// Compiles the tree, failing only when the program would grow beyond
    /// the size limit of `config`.
    pub fn compile(tree: &SyntaxTree, config: &'c Config) -> Result<Program, ResourceLimitExceeded> {
        let mut compiler = Compiler {
            instructions: Vec::new(),
            config,
        };
        if let Err(err) = compiler.compile_root(&tree.root) {
            log::debug!("compilation aborted: {err}");
            return Err(err);
        }
        let program = Program {
            instructions: compiler.instructions,
            capture_count: tree.capture_count + 1,
        };
        log::debug!(
            "compiled program with {} instructions and {} slots",
            program.len(),
            program.slot_count()
        );
        Ok(program)
    }

    fn compile_root(&mut self, root: &Node) -> Result<(), ResourceLimitExceeded> {
        self.push(Save(0))?;
        self.compile_internal(root)?;
        self.push(Save(1))?;
        self.push(Match)?;
        Ok(())
    }

    fn current_pc(&self) -> usize {
        self.instructions.len()
    }

    fn push(&mut self, instruction: Instruction) -> Result<usize, ResourceLimitExceeded> {
        if self.instructions.len() >= self.config.size_limit {
            return Err(ResourceLimitExceeded::ProgramSize {
                limit: self.config.size_limit,
            });
        }
        self.instructions.push(instruction);
        Ok(self.instructions.len() - 1)
    }

    fn patch(&mut self, pc: usize, instruction: Instruction) {
        self.instructions[pc] = instruction;
    }

    fn fork2(a: usize, b: usize, greedy: bool) -> Instruction {
        if greedy { Split(a, b) } else { Split(b, a) }
    }

    fn compile_internal(&mut self, node: &Node) -> Result<(), ResourceLimitExceeded> {
        match node {
            Node::Literal(c) => {
                let other = if c.is_ascii_uppercase() {
                    c.to_ascii_lowercase()
                } else {
                    c.to_ascii_uppercase()
                };
                if self.config.case_insensitive && other != *c {
                    let set = ClassSet::new([(*c, *c), (other, other)]);
                    self.push(ClassMatch {
                        ranges: set.ranges().into(),
                        negated: false,
                    })?;
                } else {
                    self.push(Char(*c))?;
                }
            }
            Node::AnyChar => {
                self.push(AnyChar(self.config.dot_matches_new_line))?;
            }
            Node::CharClass { set, negated } => {
                let set = if self.config.case_insensitive {
                    set.fold_ascii_case()
                } else {
                    set.clone()
                };
                self.push(ClassMatch {
                    ranges: set.ranges().into(),
                    negated: *negated,
                })?;
            }
            Node::Anchor(anchor) => {
                let look = match (anchor, self.config.multi_line) {
                    (Anchor::Start, false) => Look::Start,
                    (Anchor::End, false) => Look::End,
                    (Anchor::Start, true) => Look::StartLF,
                    (Anchor::End, true) => Look::EndLF,
                };
                self.push(Assertion(look))?;
            }
            Node::Concat(nodes) => {
                for node in nodes {
                    self.compile_internal(node)?;
                }
            }
            Node::Alternate(branches) => self.compile_alternation(branches)?,
            Node::Repeat {
                child,
                min,
                max,
                greedy,
            } => self.compile_repetition(child, *min, *max, *greedy)?,
            Node::Group {
                child,
                capture_index: Some(index),
            } => {
                self.push(Save(index * 2))?;
                self.compile_internal(child)?;
                self.push(Save(index * 2 + 1))?;
            }
            Node::Group {
                child,
                capture_index: None,
            } => self.compile_internal(child)?,
        }
        Ok(())
    }

    /// `split L1, L2; L1: a; jump end; L2: split ...; last; end:`
    fn compile_alternation(&mut self, branches: &[Node]) -> Result<(), ResourceLimitExceeded> {
        let Some((last, rest)) = branches.split_last() else {
            return Ok(());
        };
        let mut jumps = Vec::with_capacity(rest.len());
        for branch in rest {
            // Patched once the start of the next branch is known.
            let split_pc = self.push(Split(0, 0))?;
            self.compile_internal(branch)?;
            jumps.push(self.push(Jump(0))?);
            let next = self.current_pc();
            self.patch(split_pc, Split(split_pc + 1, next));
        }
        self.compile_internal(last)?;
        let end = self.current_pc();
        for pc in jumps {
            self.patch(pc, Jump(end));
        }
        Ok(())
    }

    fn compile_repetition(
        &mut self,
        child: &Node,
        min: u32,
        max: Option<u32>,
        greedy: bool,
    ) -> Result<(), ResourceLimitExceeded> {
        let mut last_iter_start = None;
        for _ in 0..min {
            let start = self.current_pc();
            self.compile_internal(child)?;
            if self.current_pc() == start {
                // Any number of copies of nothing is nothing
                return Ok(());
            }
            last_iter_start = Some(start);
        }
        match max {
            Some(max) => {
                // Every optional copy can bail out to the end of the whole
                // repetition.
                let mut forks_pc = Vec::new();
                for _ in min..max {
                    let fork_pc = self.push(Split(0, 0))?;
                    self.compile_internal(child)?;
                    if self.current_pc() == fork_pc + 1 {
                        self.instructions.truncate(fork_pc);
                        break;
                    }
                    forks_pc.push(fork_pc);
                }
                let end_pc = self.current_pc();
                for fork_pc in forks_pc {
                    self.patch(fork_pc, Self::fork2(fork_pc + 1, end_pc, greedy));
                }
            }
            // The last mandatory copy doubles as the loop body.
            None => match last_iter_start {
                Some(last_iter_start) => {
                    let next = self.current_pc() + 1;
                    self.push(Self::fork2(last_iter_start, next, greedy))?;
                }
                None => self.compile_star(child, greedy)?,
            },
        }
        Ok(())
    }

    /// `L1: split L2, L3; L2: child; jump L1; L3:` when the child always
    /// consumes something, and `(child+)?` otherwise:
    /// `split L2, L3; L2: child; split L2, L3; L3:`.
    ///
    /// A nullable child looping back to `L1` would rank the lower priority
    /// branches of an empty iteration above leaving the loop. Re-entering
    /// `L2` at the same offset is cut by the engines, so an empty iteration
    /// always exits.
    fn compile_star(&mut self, child: &Node, greedy: bool) -> Result<(), ResourceLimitExceeded> {
        let fork_pc = self.push(Split(0, 0))?;
        let body_pc = fork_pc + 1;
        self.compile_internal(child)?;
        if self.current_pc() == body_pc {
            self.instructions.truncate(fork_pc);
            return Ok(());
        }
        if child.is_nullable() {
            let loop_pc = self.push(Split(0, 0))?;
            let end_pc = self.current_pc();
            self.patch(loop_pc, Self::fork2(body_pc, end_pc, greedy));
            self.patch(fork_pc, Self::fork2(body_pc, end_pc, greedy));
        } else {
            self.push(Jump(fork_pc))?;
            let end_pc = self.current_pc();
            self.patch(fork_pc, Self::fork2(body_pc, end_pc, greedy));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::{DEFAULT_NEST_LIMIT, parse};

    fn compile_with(pattern: &str, config: &Config) -> Result<Program, ResourceLimitExceeded> {
        let tree = parse(pattern, DEFAULT_NEST_LIMIT).unwrap();
        Compiler::compile(&tree, config)
    }

    fn compile(pattern: &str) -> Program {
        compile_with(pattern, &Config::default()).unwrap()
    }

    fn assert_targets_in_bounds(program: &Program) {
        let len = program.len();
        for instruction in program.instructions() {
            match instruction {
                Split(a, b) => assert!(*a < len && *b < len, "{program}"),
                Jump(target) => assert!(*target < len, "{program}"),
                _ => (),
            }
        }
        assert_eq!(program.instructions().last(), Some(&Match));
    }

    #[test]
    fn literal() {
        assert_eq!(
            compile("ab").instructions(),
            &[Save(0), Char('a'), Char('b'), Save(1), Match]
        );
    }

    #[test]
    fn alternation() {
        assert_eq!(
            compile("a|b|c").instructions(),
            &[
                Save(0),
                Split(2, 4),
                Char('a'),
                Jump(8),
                Split(5, 7),
                Char('b'),
                Jump(8),
                Char('c'),
                Save(1),
                Match,
            ]
        );
    }

    #[test]
    fn star_greedy_and_lazy() {
        assert_eq!(
            compile("a*").instructions(),
            &[Save(0), Split(2, 4), Char('a'), Jump(1), Save(1), Match]
        );
        assert_eq!(
            compile("a*?").instructions(),
            &[Save(0), Split(4, 2), Char('a'), Jump(1), Save(1), Match]
        );
    }

    #[test]
    fn plus_loops_back_to_last_copy() {
        assert_eq!(
            compile("a+").instructions(),
            &[Save(0), Char('a'), Split(1, 3), Save(1), Match]
        );
        assert_eq!(
            compile("a+?").instructions(),
            &[Save(0), Char('a'), Split(3, 1), Save(1), Match]
        );
    }

    #[test]
    fn counted_repetition() {
        assert_eq!(
            compile("a{2,4}").instructions(),
            &[
                Save(0),
                Char('a'),
                Char('a'),
                Split(4, 7),
                Char('a'),
                Split(6, 7),
                Char('a'),
                Save(1),
                Match,
            ]
        );
        assert_eq!(
            compile("a{0}").instructions(),
            &[Save(0), Save(1), Match]
        );
    }

    #[test]
    fn groups_save_slots() {
        let program = compile("(a)(?:b)(c)");
        assert_eq!(
            program.instructions(),
            &[
                Save(0),
                Save(2),
                Char('a'),
                Save(3),
                Char('b'),
                Save(4),
                Char('c'),
                Save(5),
                Save(1),
                Match,
            ]
        );
        assert_eq!(program.capture_count(), 3);
        assert_eq!(program.slot_count(), 6);
    }

    #[test]
    fn nullable_star_is_an_optional_plus() {
        let program = compile("(a*)*");
        assert_eq!(
            program.instructions(),
            &[
                Save(0),
                Split(2, 8),
                Save(2),
                Split(4, 6),
                Char('a'),
                Jump(3),
                Save(3),
                Split(2, 8),
                Save(1),
                Match,
            ]
        );
        assert_eq!(program.slot_count(), 4);
        assert_eq!(
            compile("(?:a?)*?").instructions(),
            &[Save(0), Split(5, 2), Split(3, 4), Char('a'), Split(5, 2), Save(1), Match]
        );
        assert_eq!(
            compile("(?:a?)+").instructions(),
            &[Save(0), Split(2, 3), Char('a'), Split(1, 4), Save(1), Match]
        );
    }

    #[test]
    fn empty_repetitions_vanish() {
        for pattern in [
            "(?:(?:){4294967295}){4294967295}",
            "(?:a{0}){4294967295,}",
            "(?:){3,}?",
            "(?:)*",
            "(?:(?:)+)?",
        ] {
            assert_eq!(compile(pattern).instructions(), &[Save(0), Save(1), Match], "{pattern}");
        }
        // Saves are not nothing
        assert_eq!(
            compile("(){2}").instructions(),
            &[Save(0), Save(2), Save(3), Save(2), Save(3), Save(1), Match]
        );
        assert!(compile_with("(){4294967295}", &Config::default()).is_err());
    }

    #[test]
    fn anchors_follow_multi_line() {
        let program = compile("^$");
        assert_eq!(program.instructions()[1], Assertion(Look::Start));
        assert_eq!(program.instructions()[2], Assertion(Look::End));

        let config = Config {
            multi_line: true,
            ..Config::default()
        };
        let program = compile_with("^$", &config).unwrap();
        assert_eq!(program.instructions()[1], Assertion(Look::StartLF));
        assert_eq!(program.instructions()[2], Assertion(Look::EndLF));
    }

    #[test]
    fn case_insensitive_literals_and_classes() {
        let config = Config {
            case_insensitive: true,
            ..Config::default()
        };
        let program = compile_with("k[a-c]1", &config).unwrap();
        assert_eq!(
            program.instructions()[1],
            ClassMatch {
                ranges: [('K', 'K'), ('k', 'k')].into(),
                negated: false
            }
        );
        assert_eq!(
            program.instructions()[2],
            ClassMatch {
                ranges: [('A', 'C'), ('a', 'c')].into(),
                negated: false
            }
        );
        assert_eq!(program.instructions()[3], Char('1'));
    }

    #[test]
    fn dot_policy() {
        assert_eq!(compile(".").instructions()[1], AnyChar(false));
        assert!(!AnyChar(false).accepts('\n'));
        assert!(AnyChar(false).accepts('x'));
        let config = Config {
            dot_matches_new_line: true,
            ..Config::default()
        };
        assert_eq!(compile_with(".", &config).unwrap().instructions()[1], AnyChar(true));
        assert!(AnyChar(true).accepts('\n'));
    }

    #[test]
    fn class_acceptance() {
        let class = ClassMatch {
            ranges: [('0', '9')].into(),
            negated: true,
        };
        assert!(!class.accepts('5'));
        assert!(class.accepts('a'));
        assert!(class.accepts('\n'));
        assert!(!Split(0, 0).accepts('a'));
    }

    #[test]
    fn looks() {
        let subject = "ab\ncd";
        assert!(look_matches(Look::Start, subject, 0));
        assert!(!look_matches(Look::Start, subject, 3));
        assert!(look_matches(Look::StartLF, subject, 3));
        assert!(!look_matches(Look::End, subject, 2));
        assert!(look_matches(Look::EndLF, subject, 2));
        assert!(look_matches(Look::End, subject, 5));
        assert!(look_matches(Look::EndLF, subject, 5));
    }

    #[test]
    fn targets_are_in_bounds() {
        for pattern in [
            "",
            "a|",
            "|",
            "(a|b)*c",
            "((a*)+|b{2,3}?)+",
            "x{0,3}y{2,}z*?",
            "(?:)*",
            "^*$+",
            "[^a-z]{1,2}|.+?",
        ] {
            assert_targets_in_bounds(&compile(pattern));
        }
    }

    #[test]
    fn size_limit() {
        let config = Config {
            size_limit: 100,
            ..Config::default()
        };
        assert!(compile_with("a{90}", &config).is_ok());
        assert_eq!(
            compile_with("a{200}", &config),
            Err(ResourceLimitExceeded::ProgramSize { limit: 100 })
        );
        assert!(compile_with("(a{1000}){1000}", &Config::default()).is_err());
    }

    #[test]
    fn dump() {
        let dump = compile("a|[^b-d]").to_string();
        assert_eq!(
            dump,
            "0000: save 0\n\
             0001: split 2, 4\n\
             0002: char 'a'\n\
             0003: jump 5\n\
             0004: class ^'b'-'d'\n\
             0005: save 1\n\
             0006: match\n"
        );
    }
}
