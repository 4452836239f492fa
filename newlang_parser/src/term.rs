//! `Term` — the AST node produced by the parser.
//!
//! A single node type tagged by [`TermKind`] keeps the tree-walking
//! evaluator's dispatch flat. Nodes are immutable after parsing.

use serde::{Deserialize, Serialize};

use crate::span::Span;
use crate::token::AssignKind;

/// The closed set of AST node kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TermKind {
    // Literals
    Integer,
    Number,
    Fraction,
    /// Byte string `'...'` (templates `'''...'''` normalize here too)
    StrChar,
    /// Wide string `"..."` (and `"""..."""` templates)
    StrWide,
    /// Raw source block `{% ... %}`
    Source,
    /// Backquoted eval string
    Eval,
    Ellipsis,
    None,

    // Names
    Name,
    /// `$name`; a leading `.` in `text` marks the `$.name` direct form
    Local,
    /// `@name`; a leading `.` in `text` marks the `@.name` direct form
    Module,
    /// `%name`
    Native,
    /// `$N`
    Argument,
    /// `$` — names bound in the current frame chain
    ArgsDict,
    /// `:Name`, optionally with dimension terms
    TypeName,

    // Expressions
    Call,
    /// `:Type(...)` / `:Type[dims](...)` comprehension
    TypeCall,
    Index,
    Field,
    /// Binary operator; the operator lexeme is in `text`
    Operator,
    /// Unary operator; the operator lexeme is in `text`
    UnaryOp,
    Range,
    Dict,
    Tensor,

    // Statements and structure
    Block,
    /// `{* ... *}`
    BlockTry,
    /// `{- ... -}`
    BlockAnd,
    /// `{+ ... +}`
    BlockOr,
    /// `{! ... !}`
    BlockXor,
    /// Assignment; the mode is in `assign_kind`
    Assign,
    /// `[guard] --> body` chain; each arm in `args`
    Follow,
    /// `[guard] <-> body`
    Repeat,
    /// `--expr--`
    Return,
    /// `++expr++`
    Break,
    /// Postfix iterator op; the lexeme (`?`, `!`, `??`, `!?`, `?!`) is in `text`
    Iterator,
    /// A macro definition that reached the parser unexpanded
    MacroDef,
}

/// A type annotation attached to a term: `:Name` plus optional dims.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeAnnotation {
    /// Type name without the leading colon
    pub name: String,
    /// Dimension terms for tensor types (`Int32[2,2]`); `...` dims are
    /// Ellipsis terms
    pub dims: Vec<Term>,
}

impl TypeAnnotation {
    pub fn simple(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            dims: Vec::new(),
        }
    }
}

/// One AST node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Term {
    pub kind: TermKind,
    /// The lexeme: literal text, identifier (sigil stripped), operator
    pub text: String,
    /// Optional type annotation (`x:Int8`, `f(...):Int32`)
    pub annotation: Option<TypeAnnotation>,
    /// Assignment mode for `Assign` terms
    pub assign_kind: Option<AssignKind>,
    pub left: Option<Box<Term>>,
    pub right: Option<Box<Term>>,
    /// Ordered argument list; names may be empty for positional entries
    pub args: Vec<(Option<String>, Term)>,
    /// Statement sequence for block-like terms
    pub block: Vec<Term>,
    /// Documentation bound to this term, if any
    pub doc: Option<String>,
    pub span: Span,
}

impl Term {
    pub fn new(kind: TermKind, text: impl Into<String>, span: Span) -> Self {
        Self {
            kind,
            text: text.into(),
            annotation: None,
            assign_kind: None,
            left: None,
            right: None,
            args: Vec::new(),
            block: Vec::new(),
            doc: None,
            span,
        }
    }

    pub fn with_left(mut self, left: Term) -> Self {
        self.left = Some(Box::new(left));
        self
    }

    pub fn with_right(mut self, right: Term) -> Self {
        self.right = Some(Box::new(right));
        self
    }

    pub fn with_annotation(mut self, annotation: TypeAnnotation) -> Self {
        self.annotation = Some(annotation);
        self
    }

    /// Binary operator node.
    pub fn operator(op: impl Into<String>, left: Term, right: Term, span: Span) -> Self {
        Term::new(TermKind::Operator, op, span)
            .with_left(left)
            .with_right(right)
    }

    pub fn is_literal(&self) -> bool {
        matches!(
            self.kind,
            TermKind::Integer
                | TermKind::Number
                | TermKind::Fraction
                | TermKind::StrChar
                | TermKind::StrWide
                | TermKind::None
                | TermKind::Ellipsis
        )
    }

    pub fn is_block(&self) -> bool {
        matches!(
            self.kind,
            TermKind::Block
                | TermKind::BlockTry
                | TermKind::BlockAnd
                | TermKind::BlockOr
                | TermKind::BlockXor
        )
    }

    /// True for a name-like term usable as an assignment target.
    pub fn is_named(&self) -> bool {
        matches!(
            self.kind,
            TermKind::Name | TermKind::Local | TermKind::Module | TermKind::Native
        )
    }

    /// JSON view of the tree (tooling and test diagnostics).
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn operator_builder_links_children() {
        let span = Span::empty();
        let term = Term::operator(
            "+",
            Term::new(TermKind::Integer, "1", span),
            Term::new(TermKind::Integer, "2", span),
            span,
        );
        assert_eq!(term.kind, TermKind::Operator);
        assert_eq!(term.text, "+");
        assert_eq!(term.left.as_ref().unwrap().text, "1");
        assert_eq!(term.right.as_ref().unwrap().text, "2");
    }

    #[test]
    fn named_targets() {
        let span = Span::empty();
        assert!(Term::new(TermKind::Local, "x", span).is_named());
        assert!(!Term::new(TermKind::Integer, "1", span).is_named());
    }

    #[test]
    fn json_round_trip() {
        let span = Span::empty();
        let term = Term::new(TermKind::Integer, "7", span);
        let json = term.to_json();
        assert_eq!(json["kind"], "Integer");
        assert_eq!(json["text"], "7");
    }
}
