//! Types and API for Regex matching
//!
//! This module defines the [`Regex`] struct, which is
//! a nice wrapper under one of the available [`RegexImpl`].

use crate::error::{Error, ResourceLimitExceeded};
use crate::syntax::{DEFAULT_NEST_LIMIT, parse};
use crate::thompson::backtrack::Backtracker;
use crate::thompson::bytecode::{Compiler, Program};
use crate::thompson::pike_vm::PikeVM;
use crate::util::{Captures, Input, Match, Span};

/// Default bound on the number of compiled instructions.
pub const DEFAULT_SIZE_LIMIT: usize = 100_000;

/// Default bound on the work of a single backtracking search.
pub const DEFAULT_BACKTRACK_LIMIT: usize = 1_000_000;

/// A compiled regular expression
#[derive(Debug, Clone)]
pub struct Regex {
    pattern: String,
    engine: RegexEngine,
}

impl Regex {
    /// Compiles `pattern` with the default configuration, on the Pike VM.
    pub fn new(pattern: &str) -> Result<Self, Error> {
        Builder::new(pattern).pike_vm()
    }

    pub fn pike_vm(pattern: &str) -> Result<Self, Error> {
        Builder::new(pattern).pike_vm()
    }

    pub fn backtracker(pattern: &str) -> Result<Self, Error> {
        Builder::new(pattern).backtracker()
    }

    /// Returns true whenever the input matches the regex or not, without
    /// returning the bounds of the match. This returns true iff find returns
    /// Some(...), but it may be faster in some cases.
    pub fn is_match<'s>(&self, input: impl Into<Input<'s>>) -> Result<bool, ResourceLimitExceeded> {
        let input = input.into().first_match(true);
        match &self.engine {
            RegexEngine::PikeVM(pike_vm) => {
                let mut state = pike_vm.new_state();
                pike_vm.exec(input, &mut state, &mut [])
            }
            RegexEngine::Backtracker(backtracker) => {
                let mut state = backtracker.new_state();
                backtracker.exec(input, &mut state, &mut [])
            }
        }
    }

    /// Match the regex against the input and returns the bounds of the match or
    /// None.
    pub fn find<'s>(
        &self,
        input: impl Into<Input<'s>>,
    ) -> Result<Option<Match<'s>>, ResourceLimitExceeded> {
        let input = input.into();
        let subject = input.subject;
        let mut result = [Span::invalid()];
        let found = match &self.engine {
            RegexEngine::PikeVM(pike_vm) => {
                let mut state = pike_vm.new_state();
                pike_vm.exec(input, &mut state, &mut result)?
            }
            RegexEngine::Backtracker(backtracker) => {
                let mut state = backtracker.new_state();
                backtracker.exec(input, &mut state, &mut result)?
            }
        };
        if !found {
            return Ok(None);
        }
        Ok(Some(Match::new(subject, result[0])))
    }

    /// Returns the first match starting at or after the byte offset `start`.
    /// The text before `start` is still visible to anchors.
    pub fn find_at<'s>(
        &self,
        subject: &'s str,
        start: usize,
    ) -> Result<Option<Match<'s>>, ResourceLimitExceeded> {
        self.find(Input::new(subject).span(start..subject.len()))
    }

    /// Returns an iterator over all non-overlapping match in the input.
    pub fn find_all<'r, 's>(&'r self, input: impl Into<Input<'s>>) -> AllMatch<'r, 's> {
        AllMatch {
            input: input.into(),
            spans: [Span::invalid()],
            imp: self.engine.with_state(),
        }
    }

    /// Match the regex against the input and returns a match with all its
    /// capture groups bounds or None If only the overall match is needed, you
    /// should prefer the use of `find` since it can be faster.
    pub fn find_captures<'s>(
        &self,
        input: impl Into<Input<'s>>,
    ) -> Result<Option<Captures<'s>>, ResourceLimitExceeded> {
        let input = input.into();
        let subject = input.subject;
        let mut spans = vec![Span::invalid(); self.capture_count()].into_boxed_slice();
        let found = match &self.engine {
            RegexEngine::PikeVM(pike_vm) => {
                let mut state = pike_vm.new_state();
                pike_vm.exec(input, &mut state, &mut spans)?
            }
            RegexEngine::Backtracker(backtracker) => {
                let mut state = backtracker.new_state();
                backtracker.exec(input, &mut state, &mut spans)?
            }
        };
        if !found {
            return Ok(None);
        }
        Ok(Some(Captures::new(subject, spans)))
    }

    /// Returns an iterator over all non-overlapping match in the input, with
    /// their capture group bounds. If only the overall match is needed, you
    /// should prefer the use of `find_all` since it can be faster.
    pub fn find_all_captures<'r, 's>(&'r self, input: impl Into<Input<'s>>) -> AllCaptures<'r, 's> {
        AllCaptures {
            input: input.into(),
            spans: vec![Span::invalid(); self.capture_count()].into_boxed_slice(),
            imp: self.engine.with_state(),
        }
    }

    /// The pattern this regex was compiled from.
    pub fn as_str(&self) -> &str {
        &self.pattern
    }

    pub fn program(&self) -> &Program {
        match &self.engine {
            RegexEngine::PikeVM(pike_vm) => pike_vm.program(),
            RegexEngine::Backtracker(backtracker) => backtracker.program(),
        }
    }

    /// Number of capture groups, including the implicit group 0.
    pub fn capture_count(&self) -> usize {
        self.program().capture_count()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// ASCII letters match both cases.
    pub case_insensitive: bool,
    /// `^` and `$` also match right after and right before a `\n`.
    pub multi_line: bool,
    pub dot_matches_new_line: bool,
    /// Maximum depth of nested groups.
    pub nest_limit: usize,
    /// Maximum number of instructions of a compiled program.
    pub size_limit: usize,
    /// Maximum number of (instruction, offset) pairs a backtracking search
    /// may visit.
    pub backtrack_limit: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            case_insensitive: false,
            multi_line: false,
            dot_matches_new_line: false,
            nest_limit: DEFAULT_NEST_LIMIT,
            size_limit: DEFAULT_SIZE_LIMIT,
            backtrack_limit: DEFAULT_BACKTRACK_LIMIT,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Builder<'s> {
    pattern: &'s str,
    config: Config,
}

impl<'s> Builder<'s> {
    pub fn new(pattern: &'s str) -> Self {
        Self {
            pattern,
            config: Config::default(),
        }
    }

    pub fn config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    pub fn case_insensitive(mut self, value: bool) -> Self {
        self.config.case_insensitive = value;
        self
    }

    pub fn multi_line(mut self, value: bool) -> Self {
        self.config.multi_line = value;
        self
    }

    pub fn dot_matches_new_line(mut self, value: bool) -> Self {
        self.config.dot_matches_new_line = value;
        self
    }

    pub fn nest_limit(mut self, value: usize) -> Self {
        self.config.nest_limit = value;
        self
    }

    pub fn size_limit(mut self, value: usize) -> Self {
        self.config.size_limit = value;
        self
    }

    pub fn backtrack_limit(mut self, value: usize) -> Self {
        self.config.backtrack_limit = value;
        self
    }

    fn compile(&self) -> Result<Program, Error> {
        let tree = parse(self.pattern, self.config.nest_limit)?;
        Ok(Compiler::compile(&tree, &self.config)?)
    }

    pub fn pike_vm(self) -> Result<Regex, Error> {
        let program = self.compile()?;
        Ok(Regex {
            pattern: self.pattern.to_owned(),
            engine: RegexEngine::PikeVM(PikeVM::new(program)),
        })
    }

    pub fn backtracker(self) -> Result<Regex, Error> {
        let program = self.compile()?;
        Ok(Regex {
            pattern: self.pattern.to_owned(),
            engine: RegexEngine::Backtracker(Backtracker::new(
                program,
                self.config.backtrack_limit,
            )),
        })
    }
}

/// Iterator over all match in a regex.
///
/// After an error, the iterator yields nothing more.
pub struct AllMatch<'r, 's> {
    input: Input<'s>,
    spans: [Span; 1],
    imp: EngineWithState<'r>,
}

impl<'r, 's> Iterator for AllMatch<'r, 's> {
    type Item = Result<Match<'s>, ResourceLimitExceeded>;

    fn next(&mut self) -> Option<Self::Item> {
        if !self.input.span.valid() {
            return None;
        }
        let found = match self.imp.exec(self.input.clone(), &mut self.spans) {
            Ok(found) => found,
            Err(err) => {
                self.input.span = Span::invalid();
                return Some(Err(err));
            }
        };
        if !found {
            self.input.span = Span::invalid();
            return None;
        }
        let result = Match::new(self.input.subject, self.spans[0]);
        self.input.span.from = result.next_match_start();
        Some(Ok(result))
    }
}

/// Iterator over all match and their capture groups.
///
/// After an error, the iterator yields nothing more.
pub struct AllCaptures<'r, 's> {
    input: Input<'s>,
    spans: Box<[Span]>,
    imp: EngineWithState<'r>,
}

impl<'r, 's> Iterator for AllCaptures<'r, 's> {
    type Item = Result<Captures<'s>, ResourceLimitExceeded>;

    fn next(&mut self) -> Option<Self::Item> {
        if !self.input.span.valid() {
            return None;
        }
        let found = match self.imp.exec(self.input.clone(), &mut self.spans) {
            Ok(found) => found,
            Err(err) => {
                self.input.span = Span::invalid();
                return Some(Err(err));
            }
        };
        if !found {
            self.input.span = Span::invalid();
            return None;
        }
        let result = Captures::new(self.input.subject, self.spans.clone());
        self.input.span.from = result.group0().next_match_start();
        Some(Ok(result))
    }
}

/// A regex implementation. Used to dispatch to
/// the right version at runtime.
#[derive(Debug, Clone)]
pub(crate) enum RegexEngine {
    PikeVM(PikeVM),
    Backtracker(Backtracker),
}

impl RegexEngine {
    fn with_state(&self) -> EngineWithState<'_> {
        match self {
            RegexEngine::PikeVM(pike_vm) => EngineWithState::PikeVM(pike_vm, pike_vm.new_state()),
            RegexEngine::Backtracker(backtracker) => {
                EngineWithState::Backtracker(backtracker, backtracker.new_state())
            }
        }
    }
}

/// A regex implementation, with it's respective state.
/// Used when looking for all match.
pub(crate) enum EngineWithState<'r> {
    PikeVM(&'r PikeVM, <PikeVM as RegexImpl>::State),
    Backtracker(&'r Backtracker, <Backtracker as RegexImpl>::State),
}

impl EngineWithState<'_> {
    fn exec(&mut self, input: Input<'_>, spans: &mut [Span]) -> Result<bool, ResourceLimitExceeded> {
        match self {
            EngineWithState::PikeVM(pike_vm, state) => {
                pike_vm.reset_state(state);
                pike_vm.exec(input, state, spans)
            }
            EngineWithState::Backtracker(backtracker, state) => {
                backtracker.reset_state(state);
                backtracker.exec(input, state, spans)
            }
        }
    }
}

/// The Regex impl trait
///
/// Defines the lower-level api implemented by all regex engines in this crate.
/// For the user-facing one, see [`Regex`] just above. We use static dispatch,
/// this is there to make sure all engines maintain the same API.
pub(crate) trait RegexImpl {
    /// State used by this engine. Every methods take a &mut State,
    /// in order to avoid repeated allocations when matching in a loop.
    type State;

    /// Return a new State for this engine
    fn new_state(&self) -> Self::State;

    /// Reset the state
    fn reset_state(&self, state: &mut Self::State);

    /// Finds the next match, if any, and fill the provided capture group array.
    /// If the given array is of size n, then only the n-first capture groups will be written.
    /// And if n is greater than the number of capture groups, then the remaining slots are not
    /// overwritten.
    /// This method is enough to write all higher-level functionalities of [`crate::Regex`].
    fn exec(
        &self,
        input: Input<'_>,
        state: &mut Self::State,
        captures: &mut [Span],
    ) -> Result<bool, ResourceLimitExceeded>;
}
