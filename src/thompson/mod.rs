//! Thompson NFA bytecode and the two engines executing it.

pub mod backtrack;
pub mod bytecode;
pub mod pike_vm;
