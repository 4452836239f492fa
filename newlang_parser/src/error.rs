//! Parse error types.

use crate::span::Span;
use thiserror::Error;

/// Lexical or grammatical failure, carrying the source position.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    #[error("unexpected token '{found}' at {span}, expected {expected}")]
    UnexpectedToken {
        found: String,
        expected: String,
        span: Span,
    },

    #[error("unexpected end of input, expected {expected}")]
    UnexpectedEof { expected: String, span: Span },

    #[error("unterminated string literal starting at {span}")]
    UnterminatedString { span: Span },

    #[error("unterminated template literal starting at {span}")]
    UnterminatedTemplate { span: Span },

    #[error("unterminated block comment starting at {span}")]
    UnterminatedComment { span: Span },

    #[error("unterminated macro definition starting at {span}")]
    UnterminatedMacro { span: Span },

    #[error("unterminated raw source block starting at {span}")]
    UnterminatedSource { span: Span },

    #[error("invalid escape sequence '{sequence}' at {span}")]
    InvalidEscape { sequence: String, span: Span },

    #[error("invalid number literal '{literal}' at {span}")]
    InvalidNumber { literal: String, span: Span },

    #[error("literal {literal} does not fit type {type_name} at {span}")]
    LiteralOutOfRange {
        literal: String,
        type_name: String,
        span: Span,
    },

    #[error("macro '{key}' is already defined with a different body")]
    MacroRedefined { key: String },

    #[error("macro '{key}' argument ${index} is missing (call has {supplied} arguments)")]
    MacroArity {
        key: String,
        index: usize,
        supplied: usize,
    },

    #[error("macro expansion did not terminate after {limit} passes")]
    MacroRunaway { limit: usize },

    #[error("{message} at {span}")]
    InvalidSyntax { message: String, span: Span },

    #[error("unrecognized token at {span}")]
    LexerError { span: Span },
}

impl ParseError {
    pub fn span(&self) -> Option<Span> {
        match self {
            ParseError::UnexpectedToken { span, .. }
            | ParseError::UnexpectedEof { span, .. }
            | ParseError::UnterminatedString { span }
            | ParseError::UnterminatedTemplate { span }
            | ParseError::UnterminatedComment { span }
            | ParseError::UnterminatedMacro { span }
            | ParseError::UnterminatedSource { span }
            | ParseError::InvalidEscape { span, .. }
            | ParseError::InvalidNumber { span, .. }
            | ParseError::LiteralOutOfRange { span, .. }
            | ParseError::InvalidSyntax { span, .. }
            | ParseError::LexerError { span } => Some(*span),
            ParseError::MacroRedefined { .. }
            | ParseError::MacroArity { .. }
            | ParseError::MacroRunaway { .. } => None,
        }
    }

    pub fn unexpected_token(
        found: impl Into<String>,
        expected: impl Into<String>,
        span: Span,
    ) -> Self {
        ParseError::UnexpectedToken {
            found: found.into(),
            expected: expected.into(),
            span,
        }
    }

    pub fn unexpected_eof(expected: impl Into<String>, span: Span) -> Self {
        ParseError::UnexpectedEof {
            expected: expected.into(),
            span,
        }
    }

    pub fn invalid_syntax(message: impl Into<String>, span: Span) -> Self {
        ParseError::InvalidSyntax {
            message: message.into(),
            span,
        }
    }

    /// Render the offending source line with a `^^^` marker under the span.
    pub fn format_with_context(&self, source: &str) -> String {
        let Some(span) = self.span() else {
            return String::new();
        };
        let Some(line) = source.lines().nth(span.line.saturating_sub(1)) else {
            return String::new();
        };
        let col = span.column.saturating_sub(1);
        let width = span.len().min(line.len().saturating_sub(col)).max(1);
        format!(
            "  {} | {}\n  {} | {}{}",
            span.line,
            line,
            " ".repeat(span.line.to_string().len()),
            " ".repeat(col),
            "^".repeat(width)
        )
    }
}

/// Result type for parsing operations.
pub type ParseResult<T> = Result<T, ParseError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_message_names_both_tokens() {
        let err = ParseError::unexpected_token(";", "expression", Span::new(3, 4, 1, 4));
        let msg = err.to_string();
        assert!(msg.contains(';'), "{msg}");
        assert!(msg.contains("expression"), "{msg}");
    }

    #[test]
    fn context_marks_the_column() {
        let source = "a := ;";
        let err = ParseError::unexpected_token(";", "expression", Span::new(5, 6, 1, 6));
        let ctx = err.format_with_context(source);
        assert!(ctx.contains("a := ;"));
        assert!(ctx.ends_with("     ^"), "{ctx:?}");
    }
}
