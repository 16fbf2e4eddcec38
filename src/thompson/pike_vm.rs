//! An interpreter for [`crate::thompson::bytecode`].

use std::mem;

use crate::{
    error::ResourceLimitExceeded,
    regex::RegexImpl,
    thompson::bytecode::{Instruction::*, Program, look_matches},
    util::{Input, Span, char_at},
};

/// A so-called PikeVM.
///
/// This is an interpreter for the bytecode, simulating every thread in
/// lockstep. Since at most one thread per instruction is alive at each
/// position, a search takes time linear in the length of the input times
/// the size of the program.
#[derive(Debug, Clone)]
pub struct PikeVM {
    program: Program,
}

/// A thread currently alive in the bytecode.
#[derive(Debug)]
struct Thread {
    pc: usize,
    slots: Box<[Option<usize>]>,
}

/// Threads waiting on a consuming instruction (or on `Match`) at a given
/// position, in priority order.
#[derive(Debug)]
struct ThreadList {
    threads: Vec<Thread>,
    /// `seen[pc] == generation` iff pc was already reached at this position.
    seen: Box<[u32]>,
    generation: u32,
}

impl ThreadList {
    fn new(len: usize) -> Self {
        Self {
            threads: Vec::with_capacity(len),
            seen: vec![0; len].into_boxed_slice(),
            generation: 1,
        }
    }

    fn clear(&mut self) {
        self.threads.clear();
        self.generation = self.generation.wrapping_add(1);
        if self.generation == 0 {
            self.seen.fill(0);
            self.generation = 1;
        }
    }

    /// Marks pc as seen, returns false if it already was.
    fn insert(&mut self, pc: usize) -> bool {
        if self.seen[pc] == self.generation {
            return false;
        }
        self.seen[pc] = self.generation;
        true
    }
}

/// Pending work of the epsilon closure.
#[derive(Debug, Clone, Copy)]
enum Frame {
    Explore(usize),
    RestoreSlot(usize, Option<usize>),
}

#[derive(Debug)]
pub struct State {
    clist: ThreadList,
    nlist: ThreadList,
    stack: Vec<Frame>,
    scratch: Box<[Option<usize>]>,
    best_match: Option<Box<[Option<usize>]>>,
}

impl State {
    fn new(program: &Program) -> Self {
        Self {
            clist: ThreadList::new(program.len()),
            nlist: ThreadList::new(program.len()),
            stack: Vec::new(),
            scratch: vec![None; program.slot_count()].into_boxed_slice(),
            best_match: None,
        }
    }

    fn reset(&mut self) {
        self.clist.clear();
        self.nlist.clear();
        self.stack.clear();
        self.best_match = None;
    }
}

impl PikeVM {
    pub fn new(program: Program) -> Self {
        Self { program }
    }

    pub fn program(&self) -> &Program {
        &self.program
    }

    /// Follows every epsilon transition from pc at offset `at`, adding the
    /// threads reaching a consuming instruction to `list`. `slots` is used
    /// as scratch space and is restored on return.
    fn add_thread(
        &self,
        list: &mut ThreadList,
        stack: &mut Vec<Frame>,
        slots: &mut [Option<usize>],
        subject: &str,
        pc: usize,
        at: usize,
    ) {
        let instructions = self.program.instructions();
        stack.push(Frame::Explore(pc));
        while let Some(frame) = stack.pop() {
            let mut pc = match frame {
                Frame::Explore(pc) => pc,
                Frame::RestoreSlot(slot, offset) => {
                    slots[slot] = offset;
                    continue;
                }
            };
            while list.insert(pc) {
                match &instructions[pc] {
                    Jump(target) => pc = *target,
                    Split(a, b) => {
                        // b is explored only once everything reachable
                        // from a is in the list.
                        stack.push(Frame::Explore(*b));
                        pc = *a;
                    }
                    Save(slot) => {
                        stack.push(Frame::RestoreSlot(*slot, slots[*slot]));
                        slots[*slot] = Some(at);
                        pc += 1;
                    }
                    Assertion(look) => {
                        if !look_matches(*look, subject, at) {
                            break;
                        }
                        pc += 1;
                    }
                    Char(_) | AnyChar(_) | ClassMatch { .. } | Match => {
                        list.threads.push(Thread {
                            pc,
                            slots: Box::from(&*slots),
                        });
                        break;
                    }
                }
            }
        }
    }

    /// Moves every thread of `clist` over `c` (or over nothing at the end of
    /// the span), stopping at the first thread reaching `Match`.
    fn step(&self, state: &mut State, subject: &str, at: usize, c: Option<char>) {
        let State {
            clist,
            nlist,
            stack,
            scratch,
            best_match,
        } = state;
        let instructions = self.program.instructions();
        for thread in clist.threads.drain(..) {
            let instruction = &instructions[thread.pc];
            if let Match = instruction {
                // Lower priority threads are cut
                *best_match = Some(thread.slots);
                break;
            }
            let Some(c) = c else {
                continue;
            };
            if instruction.accepts(c) {
                scratch.copy_from_slice(&thread.slots);
                self.add_thread(nlist, stack, scratch, subject, thread.pc + 1, at + c.len_utf8());
            }
        }
    }

    fn write_best_match(&self, slots: &[Option<usize>], captures: &mut [Span]) {
        let len = captures.len().min(self.program.capture_count());
        for (group, capture) in captures[..len].iter_mut().enumerate() {
            *capture = match (slots[2 * group], slots[2 * group + 1]) {
                (Some(from), Some(to)) => Span { from, to },
                _ => Span::invalid(),
            };
        }
    }
}

impl RegexImpl for PikeVM {
    type State = State;

    fn new_state(&self) -> Self::State {
        State::new(&self.program)
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
            first_match,
        } = input;

        let mut at = from;
        loop {
            if state.best_match.is_none() && (!anchored || at == from) {
                // A fresh thread has the lowest priority, so that an earlier
                // start always wins.
                state.scratch.fill(None);
                let State {
                    clist,
                    stack,
                    scratch,
                    ..
                } = state;
                self.add_thread(clist, stack, scratch, subject, 0, at);
            }

            let c = if at < to { char_at(subject, at) } else { None };
            self.step(state, subject, at, c);
            if first_match && state.best_match.is_some() {
                break;
            }
            mem::swap(&mut state.clist, &mut state.nlist);
            state.nlist.clear();

            let Some(c) = c else {
                break;
            };
            if state.clist.threads.is_empty() && (state.best_match.is_some() || anchored) {
                break;
            }
            at += c.len_utf8();
        }

        match state.best_match.take() {
            Some(slots) => {
                self.write_best_match(&slots, captures);
                Ok(true)
            }
            None => Ok(false),
        }
    }
}
