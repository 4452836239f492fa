//! Token definitions for the NewLang lexer.
//!
//! The flat operator/literal tokens are generated by logos; the
//! context-sensitive forms (strings, templates, nested comments, raw
//! source blocks, macro definitions) only have their *opening* token
//! defined here and are scanned to completion by [`crate::lexer::Lexer`].

mod precedence;

pub use precedence::{Associativity, Precedence};

use logos::Logos;

/// NewLang tokens.
#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq)]
#[logos(skip r"[ \t\r\n\f]+")]
pub enum Token {
    // ==================== Literals ====================
    #[regex(r"[0-9]([0-9]|_[0-9])*")]
    Integer,
    #[regex(r"[0-9]([0-9]|_[0-9])*\.[0-9]([0-9]|_[0-9])*([eE][+-]?[0-9]+)?")]
    #[regex(r"[0-9]([0-9]|_[0-9])*[eE][+-]?[0-9]+")]
    Number,
    /// Fraction literal `N\D`
    #[regex(r"[0-9]([0-9]|_[0-9])*\\[0-9]([0-9]|_[0-9])*")]
    Fraction,
    /// None literal
    #[token("_", priority = 5)]
    Underscore,

    // ==================== String openers (scanned by the lexer layer) ====
    #[token("'''")]
    TripleSingleQuote,
    #[token("\"\"\"")]
    TripleDoubleQuote,
    #[token("'")]
    SingleQuote,
    #[token("\"")]
    DoubleQuote,
    #[token("`")]
    Backquote,
    /// Raw source block `{% ... %}`
    #[token("{%")]
    SourceStart,

    // ==================== Comments and docs ====================
    #[regex(r"#[^\n]*")]
    LineComment,
    #[token("/**")]
    DocBeforeStart,
    #[token("/*")]
    BlockCommentStart,
    #[regex(r"///<[^\n]*")]
    DocAfter,
    #[regex(r"///[^\n<][^\n]*", priority = 6)]
    #[token("///")]
    DocLine,

    // ==================== Macro layer ====================
    /// Opens a macro definition `\\ ... \\\`
    #[token(r"\\")]
    MacroDefStart,
    /// A macro use `\name` left unexpanded
    #[regex(r"\\[_\p{XID_Start}][_\p{XID_Continue}]*")]
    MacroUse,

    // ==================== Identifiers and sigils ====================
    #[regex(r"[_\p{XID_Start}][_\p{XID_Continue}]*")]
    Name,
    /// `$name` — local-then-session lookup
    #[regex(r"\$[_\p{XID_Start}][_\p{XID_Continue}]*")]
    Local,
    /// `$N` — positional argument of the enclosing function
    #[regex(r"\$[0-9]+")]
    Argument,
    /// `$*` — joined argument list (macro bodies)
    #[token("$*")]
    ArgumentAll,
    /// `$.name` — session frame, bypassing shadowing
    #[token("$.")]
    SessionDot,
    /// `$` — dictionary of names in the innermost frame chain
    #[token("$")]
    Dollar,
    /// `@name` / `@pkg.mod` — module/global lookup
    #[regex(r"@[_\p{XID_Start}][_\p{XID_Continue}]*(\.[_\p{XID_Start}][_\p{XID_Continue}]*)*")]
    Module,
    /// `@.name` — global frame, bypassing shadowing
    #[token("@.")]
    GlobalDot,
    /// `%name` — native symbol
    #[regex(r"%[_\p{XID_Start}][_\p{XID_Continue}]*")]
    Native,
    /// `:Name` — type reference
    #[regex(r":[_\p{XID_Start}][_\p{XID_Continue}]*")]
    TypeName,

    // ==================== Delimiters ====================
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token("[")]
    LBracket,
    #[token("]")]
    RBracket,
    #[token("{")]
    LBrace,
    #[token("}")]
    RBrace,
    #[token("{*")]
    TryStart,
    #[token("*}")]
    TryEnd,
    #[token("{-")]
    AndStart,
    #[token("-}")]
    AndEnd,
    #[token("{+")]
    OrStart,
    #[token("+}")]
    OrEnd,
    #[token("{!")]
    XorStart,
    #[token("!}")]
    XorEnd,

    // ==================== Punctuation ====================
    #[token(",")]
    Comma,
    #[token(";")]
    Semicolon,
    #[token(".")]
    Dot,
    #[token("..")]
    DotDot,
    #[token("...")]
    Ellipsis,
    #[token(":")]
    Colon,

    // ==================== Assignment ====================
    #[token(":=")]
    CreateOrAssign,
    #[token("::=")]
    CreateOnly,
    #[token("=")]
    Assign,
    #[token(":-")]
    PureCreateOrAssign,
    #[token("::-")]
    PureCreateOnly,
    #[token("+=")]
    PlusAssign,
    #[token("-=")]
    MinusAssign,
    #[token("*=")]
    StarAssign,
    #[token("/=")]
    SlashAssign,

    // ==================== Control arrows and brackets ====================
    #[token("-->")]
    FollowArrow,
    #[token("<->")]
    RepeatArrow,
    /// Return bracket `--expr--`
    #[token("--")]
    MinusMinus,
    /// Break bracket `++expr++`; also infix concatenation
    #[token("++")]
    PlusPlus,

    // ==================== Type predicates ====================
    #[token("~")]
    Tilde,
    #[token("~~")]
    TildeTilde,
    #[token("~~~")]
    TildeTildeTilde,
    #[token("!~")]
    NotTilde,
    #[token("!~~")]
    NotTildeTilde,

    // ==================== Comparison ====================
    #[token("==")]
    EqEq,
    #[token("===")]
    EqEqEq,
    #[token("!=")]
    NotEq,
    #[token("<")]
    Lt,
    #[token("<=")]
    LtEq,
    #[token(">")]
    Gt,
    #[token(">=")]
    GtEq,
    #[token("<=>")]
    Spaceship,

    // ==================== Logical ====================
    #[token("||")]
    OrOr,
    #[token("&&")]
    AndAnd,

    // ==================== Bitwise and shifts ====================
    #[token("|")]
    Pipe,
    #[token("^")]
    Caret,
    #[token("&")]
    Amp,
    #[token("<<")]
    Shl,
    #[token(">>")]
    Shr,

    // ==================== Arithmetic ====================
    #[token("+")]
    Plus,
    #[token("-")]
    Minus,
    #[token("*")]
    Star,
    #[token("/")]
    Slash,
    #[token("//")]
    SlashSlash,
    #[token("%")]
    Percent,
    #[token("**")]
    StarStar,

    // ==================== Iterator postfix ====================
    #[token("?")]
    Quest,
    #[token("??")]
    QuestQuest,
    #[token("!")]
    Bang,
    #[token("!?")]
    BangQuest,
    #[token("?!")]
    QuestBang,
}

impl Token {
    /// True for tokens the parser drops silently (plain comments).
    pub fn is_trivia(&self) -> bool {
        matches!(self, Token::LineComment)
    }

    /// True for documentation tokens the parser binds to terms.
    pub fn is_doc(&self) -> bool {
        matches!(self, Token::DocLine | Token::DocAfter | Token::DocBeforeStart)
    }

    /// Assignment family (all right-associative, statement level).
    pub fn assign_kind(&self) -> Option<AssignKind> {
        Some(match self {
            Token::CreateOrAssign => AssignKind::CreateOrAssign,
            Token::CreateOnly => AssignKind::CreateOnly,
            Token::Assign => AssignKind::AssignOnly,
            Token::PureCreateOrAssign => AssignKind::PureCreateOrAssign,
            Token::PureCreateOnly => AssignKind::PureCreateOnly,
            Token::PlusAssign => AssignKind::Compound('+'),
            Token::MinusAssign => AssignKind::Compound('-'),
            Token::StarAssign => AssignKind::Compound('*'),
            Token::SlashAssign => AssignKind::Compound('/'),
            _ => return None,
        })
    }
}

/// How an assignment statement binds its target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum AssignKind {
    /// `:=`
    CreateOrAssign,
    /// `::=`
    CreateOnly,
    /// `=`
    AssignOnly,
    /// `:-`
    PureCreateOrAssign,
    /// `::-`
    PureCreateOnly,
    /// `+=` and friends; desugars to the operator plus assign-only
    Compound(char),
}

#[cfg(test)]
mod tests;
