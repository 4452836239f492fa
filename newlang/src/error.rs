//! Runtime error taxonomy.
//!
//! Return/Break control-flow carriers are *not* errors; they live in
//! [`crate::interp::Unwind`] and never cross the public API.

use newlang_parser::{ParseError, Span};
use thiserror::Error;

/// Everything evaluation can fail with.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum NlError {
    /// Lexical or grammatical failure
    #[error(transparent)]
    Parse(#[from] ParseError),

    /// Evaluation failure: unknown name, wrong arity, bad index
    #[error("RuntimeError: {0}")]
    Runtime(String),

    /// Kind mismatch against a fixed type
    #[error("TypeError: {0}")]
    Type(String),

    /// Numeric overflow, malformed fraction, empty range step
    #[error("ValueError: {0}")]
    Value(String),

    /// An async signal converted into a recoverable error
    #[error("SignalError: {0}")]
    Signal(String),
}

impl NlError {
    pub fn runtime(message: impl Into<String>) -> Self {
        NlError::Runtime(message.into())
    }

    pub fn type_error(message: impl Into<String>) -> Self {
        NlError::Type(message.into())
    }

    pub fn value(message: impl Into<String>) -> Self {
        NlError::Value(message.into())
    }

    /// Short kind label used by the driver and the try-block error object.
    pub fn kind_name(&self) -> &'static str {
        match self {
            NlError::Parse(_) => "ParseError",
            NlError::Runtime(_) => "RuntimeError",
            NlError::Type(_) => "TypeError",
            NlError::Value(_) => "ValueError",
            NlError::Signal(_) => "SignalError",
        }
    }
}

/// An error paired with the span of the term being evaluated when it
/// was raised; produced at the API boundary.
#[derive(Debug, Clone, PartialEq)]
pub struct SpannedNlError {
    pub error: NlError,
    pub span: Option<Span>,
}

impl SpannedNlError {
    pub fn new(error: NlError) -> Self {
        let span = match &error {
            NlError::Parse(parse) => parse.span(),
            _ => None,
        };
        Self { error, span }
    }

    pub fn with_span(error: NlError, span: Span) -> Self {
        Self {
            error,
            span: Some(span),
        }
    }
}

impl From<NlError> for SpannedNlError {
    fn from(error: NlError) -> Self {
        Self::new(error)
    }
}

impl std::fmt::Display for SpannedNlError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.span {
            Some(span) => write!(f, "{} at {}", self.error, span),
            None => write!(f, "{}", self.error),
        }
    }
}

impl std::error::Error for SpannedNlError {}
