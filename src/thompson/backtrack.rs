//! A backtracking interpreter for [`crate::thompson::bytecode`].
//!
//! Alternatives are explored depth first, in priority order, so the first
//! path reaching `Match` is the leftmost-first match. The exploration uses an
//! explicit stack rather than recursion.
//!
//! An instruction is never run twice at the same offset during one search:
//! the first visit already explored everything reachable from there, with a
//! higher priority. This cuts empty loop iterations, and gives the same
//! matches as [`crate::thompson::pike_vm`]. Every visit is counted against the
//! backtrack limit, which bounds both the time and the memory of a search.

use std::collections::HashSet;

use crate::{
    error::ResourceLimitExceeded,
    regex::RegexImpl,
    thompson::bytecode::{Instruction::*, Program, look_matches},
    util::{Input, Span, char_at},
};

#[derive(Debug, Clone)]
pub struct Backtracker {
    program: Program,
    backtrack_limit: usize,
}

#[derive(Debug, Clone, Copy)]
enum Frame {
    /// Resume execution at pc, at the given input offset.
    Step { pc: usize, at: usize },
    /// Undo a write to a slot when unwinding.
    RestoreSlot { slot: usize, offset: Option<usize> },
}

#[derive(Debug)]
pub struct State {
    stack: Vec<Frame>,
    slots: Box<[Option<usize>]>,
    /// `(pc, offset)` pairs already run during this search.
    visited: HashSet<(usize, usize)>,
}

impl State {
    fn reset(&mut self) {
        self.stack.clear();
        self.slots.fill(None);
        self.visited.clear();
    }
}

enum Outcome {
    Matched,
    Failed,
}

impl Backtracker {
    pub fn new(program: Program, backtrack_limit: usize) -> Self {
        Self {
            program,
            backtrack_limit,
        }
    }

    pub fn program(&self) -> &Program {
        &self.program
    }

    /// Runs the program from a single starting offset.
    fn run_from(
        &self,
        state: &mut State,
        subject: &str,
        start: usize,
        end: usize,
    ) -> Result<Outcome, ResourceLimitExceeded> {
        let instructions = self.program.instructions();
        state.slots.fill(None);
        state.stack.push(Frame::Step { pc: 0, at: start });
        while let Some(frame) = state.stack.pop() {
            let (mut pc, mut at) = match frame {
                Frame::Step { pc, at } => (pc, at),
                Frame::RestoreSlot { slot, offset } => {
                    state.slots[slot] = offset;
                    continue;
                }
            };
            while state.visited.insert((pc, at)) {
                if state.visited.len() > self.backtrack_limit {
                    log::warn!(
                        "backtrack limit of {} exceeded at offset {start}",
                        self.backtrack_limit
                    );
                    return Err(ResourceLimitExceeded::BacktrackLimit {
                        limit: self.backtrack_limit,
                    });
                }
                let instruction = &instructions[pc];
                match instruction {
                    Char(_) | AnyChar(_) | ClassMatch { .. } => {
                        match char_at(subject, at).filter(|_| at < end) {
                            Some(c) if instruction.accepts(c) => {
                                pc += 1;
                                at += c.len_utf8();
                            }
                            _ => break,
                        }
                    }
                    Split(a, b) => {
                        state.stack.push(Frame::Step { pc: *b, at });
                        pc = *a;
                    }
                    Jump(target) => pc = *target,
                    Save(slot) => {
                        state.stack.push(Frame::RestoreSlot {
                            slot: *slot,
                            offset: state.slots[*slot],
                        });
                        state.slots[*slot] = Some(at);
                        pc += 1;
                    }
                    Assertion(look) => {
                        if !look_matches(*look, subject, at) {
                            break;
                        }
                        pc += 1;
                    }
                    Match => {
                        state.stack.clear();
                        return Ok(Outcome::Matched);
                    }
                }
            }
        }
        Ok(Outcome::Failed)
    }

    fn write_captures(&self, slots: &[Option<usize>], captures: &mut [Span]) {
        let len = captures.len().min(self.program.capture_count());
        for (group, capture) in captures[..len].iter_mut().enumerate() {
            *capture = match (slots[2 * group], slots[2 * group + 1]) {
                (Some(from), Some(to)) => Span { from, to },
                _ => Span::invalid(),
            };
        }
    }
}

impl RegexImpl for Backtracker {
    type State = State;

    fn new_state(&self) -> Self::State {
        State {
            stack: Vec::new(),
            slots: vec![None; self.program.slot_count()].into_boxed_slice(),
            visited: HashSet::new(),
        }
    }

    fn reset_state(&self, state: &mut Self::State) {
        state.reset();
    }

    fn exec(
        &self,
        input: Input<'_>,
        state: &mut Self::State,
        captures: &mut [Span],
    ) -> Result<bool, ResourceLimitExceeded> {
        if !input.valid() {
            return Ok(false);
        }
        state.reset();

        let Input {
            subject,
            span: Span { from, to },
            anchored,
            ..
        } = input;

        let mut start = from;
        loop {
            if let Outcome::Matched = self.run_from(state, subject, start, to)? {
                self.write_captures(&state.slots, captures);
                return Ok(true);
            }
            if anchored {
                return Ok(false);
            }
            match char_at(subject, start).filter(|_| start < to) {
                Some(c) => start += c.len_utf8(),
                None => return Ok(false),
            }
        }
    }
}
