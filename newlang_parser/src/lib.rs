//! NewLang front end: lexer, macro expander and parser.
//!
//! The pipeline is `source → macro extraction → macro expansion →
//! parse`, producing a single [`term::Term`] tree that the `newlang`
//! runtime crate walks.

// Library code reports problems through error values, never stderr.
#![deny(clippy::print_stderr)]

pub mod error;
pub mod lexer;
pub mod macros;
pub mod parser;
pub mod span;
pub mod term;
pub mod token;

pub use error::{ParseError, ParseResult};
pub use lexer::{Lexer, SpannedToken};
pub use macros::{MacroDef, MacroStore, DEFAULT_EXPANSION_LIMIT};
pub use parser::{parse, parse_with_macros, Parser};
pub use span::{SourceMap, Span};
pub use term::{Term, TermKind, TypeAnnotation};
pub use token::{AssignKind, Associativity, Precedence, Token};
