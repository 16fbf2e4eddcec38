//! A small regular expression engine.
//!
//! A pattern goes through a [`syntax::Scanner`] and a recursive descent
//! [`syntax::Parser`], the resulting tree is compiled to a Thompson NFA in
//! [`thompson::bytecode`], and the program is run either by the linear
//! [`thompson::pike_vm::PikeVM`] (the default) or by the budgeted
//! [`thompson::backtrack::Backtracker`].
//!
//! ```
//! let regex = relic::compile(r"(\w+)@(\w+)\.com").unwrap();
//! let captures = regex.find_captures("mail bob@example.com").unwrap().unwrap();
//! assert_eq!(captures.get(1).unwrap().as_str(), "bob");
//! assert_eq!(captures.get(2).unwrap().as_str(), "example");
//! ```

pub mod error;
pub mod regex;
pub mod syntax;
pub mod thompson;
pub mod util;

pub use error::{Error, ResourceLimitExceeded, SyntaxError, SyntaxErrorKind};
pub use regex::{AllCaptures, AllMatch, Builder, Config, Regex};
pub use syntax::escape;
pub use util::{Captures, Input, Match, Span};

/// Compiles `pattern` with the default configuration, on the Pike VM.
pub fn compile(pattern: &str) -> Result<Regex, Error> {
    Regex::new(pattern)
}
