//! Operator precedence and associativity for the expression grammar.

use super::Token;

/// Binding strength, weakest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum Precedence {
    /// `a .. b` / `a .. b .. step`
    Range = 1,
    /// `||`
    LazyOr = 2,
    /// `&&`
    LazyAnd = 3,
    /// `==`, `===`, `!=`, `<`, `<=`, `>`, `>=`, `<=>`
    Comparison = 4,
    /// `~`, `~~`, `~~~`, `!~`, `!~~`
    TypePredicate = 5,
    /// `|`, `^`, `&`
    Bitwise = 6,
    /// `<<`, `>>`
    Shift = 7,
    /// `+`, `-`, `++`
    Additive = 8,
    /// `*`, `/`, `//`, `%`
    Multiplicative = 9,
    /// `**`
    Power = 10,
    /// Unary `-` / `+`
    Prefix = 11,
    /// Calls, indexing, field access, iterator ops
    Postfix = 12,
}

/// Operator associativity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Associativity {
    Left,
    Right,
}

impl Token {
    /// Precedence and associativity of an infix operator, if this token is one.
    ///
    /// Assignment is not listed: it is handled at statement level, where
    /// the whole family is right-associative by construction.
    pub fn binary_precedence(&self) -> Option<(Precedence, Associativity)> {
        use Associativity::{Left, Right};
        use Precedence::*;

        Some(match self {
            Token::DotDot => (Range, Left),

            Token::OrOr => (LazyOr, Left),
            Token::AndAnd => (LazyAnd, Left),

            Token::EqEq
            | Token::EqEqEq
            | Token::NotEq
            | Token::Lt
            | Token::LtEq
            | Token::Gt
            | Token::GtEq
            | Token::Spaceship => (Comparison, Left),

            Token::Tilde
            | Token::TildeTilde
            | Token::TildeTildeTilde
            | Token::NotTilde
            | Token::NotTildeTilde => (TypePredicate, Left),

            Token::Pipe | Token::Caret | Token::Amp => (Bitwise, Left),

            Token::Shl | Token::Shr => (Shift, Left),

            Token::Plus | Token::Minus | Token::PlusPlus => (Additive, Left),

            Token::Star | Token::Slash | Token::SlashSlash | Token::Percent => {
                (Multiplicative, Left)
            }

            Token::StarStar => (Power, Right),

            _ => return None,
        })
    }

    /// Precedence of a prefix operator, if this token is one.
    pub fn unary_precedence(&self) -> Option<Precedence> {
        match self {
            Token::Plus | Token::Minus => Some(Precedence::Prefix),
            _ => None,
        }
    }

    /// True for the postfix iterator operators (`?`, `!`, `??`, `!?`, `?!`).
    pub fn is_iterator_op(&self) -> bool {
        matches!(
            self,
            Token::Quest | Token::Bang | Token::QuestQuest | Token::BangQuest | Token::QuestBang
        )
    }
}
