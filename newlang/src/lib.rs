// Library code reports problems through error values, never stderr.
// The nlc binary may print user-facing messages.
#![deny(clippy::print_stderr)]

//! NewLang runtime: value model, type lattice, tree-walking
//! evaluator, comprehensions, iterator protocol and FFI bridge.
//!
//! The front end (lexer, macro expander, parser) lives in the
//! `newlang_parser` crate; this crate walks the `Term` tree it
//! produces and carries every runtime concern.

pub mod api;
pub mod dsl;
pub mod error;
pub mod ffi;
pub mod interp;
pub mod object;
pub mod repl;
pub mod types;

pub use api::{eval_str, new_interpreter, run_file};
pub use error::{NlError, SpannedNlError};
pub use interp::{Interpreter, InterpreterConfig};
pub use object::Object;
pub use types::NlType;
