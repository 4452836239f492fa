//! Recursive-descent parser for NewLang.
//!
//! Statements are handled here; the expression grammar (precedence
//! climbing, postfix chains, literals and collections) lives in
//! [`expr`].

mod expr;

use crate::error::{ParseError, ParseResult};
use crate::lexer::{Lexer, SpannedToken};
use crate::macros::{MacroStore, DEFAULT_EXPANSION_LIMIT};
use crate::span::Span;
use crate::term::{Term, TermKind};
use crate::token::Token;

/// Parse a source buffer into a single root term, with no macro layer.
pub fn parse(source: &str) -> ParseResult<Term> {
    Parser::new(source).parse_program()
}

/// Full front-end pipeline: extract macro definitions into `store`,
/// expand uses to a fixed point, then parse the rewritten buffer.
pub fn parse_with_macros(source: &str, store: &mut MacroStore) -> ParseResult<Term> {
    let mut buffer = source.to_string();
    store.extract(&mut buffer)?;
    let expanded = store.expand(&buffer, DEFAULT_EXPANSION_LIMIT)?;
    Parser::new(&expanded).parse_program()
}

/// NewLang parser over a token stream.
pub struct Parser<'a> {
    lexer: Lexer<'a>,
    /// One-token lookahead, trivia already skipped
    current: Option<SpannedToken<'a>>,
    /// Doc comment waiting to be bound to the next statement
    pending_doc: Option<String>,
    last_span: Span,
}

impl<'a> Parser<'a> {
    pub fn new(source: &'a str) -> Self {
        Self {
            lexer: Lexer::new(source),
            current: None,
            pending_doc: None,
            last_span: Span::empty(),
        }
    }

    /// Parse the whole buffer: statements separated by `;`.
    ///
    /// A single statement is returned directly; a sequence becomes a
    /// Block term.
    pub fn parse_program(&mut self) -> ParseResult<Term> {
        let mut statements = Vec::new();
        let start = self.peek_span();

        loop {
            while self.eat(Token::Semicolon)? {}
            if self.peek()?.is_none() {
                break;
            }
            statements.push(self.parse_statement()?);

            match self.peek()? {
                None => break,
                Some(tok) if tok.token == Token::Semicolon => continue,
                Some(tok) => {
                    return Err(ParseError::unexpected_token(
                        tok.text,
                        "';' or end of input",
                        tok.span,
                    ));
                }
            }
        }

        if statements.len() == 1 {
            return Ok(statements.pop().expect("one statement"));
        }
        let span = start.merge(&self.last_span);
        let mut block = Term::new(TermKind::Block, "", span);
        block.block = statements;
        Ok(block)
    }

    /// One statement: control constructs or an (assignment) expression.
    pub fn parse_statement(&mut self) -> ParseResult<Term> {
        let doc = self.pending_doc.take();
        let mut term = match self.peek_token()? {
            Some(Token::LBracket) => {
                // `[expr] -->` opens a guard; `[expr, ...]` is a tensor
                // literal statement (the trailing comma disambiguates).
                let term = self.parse_guarded()?;
                if matches!(term.kind, TermKind::Follow | TermKind::Repeat) {
                    term
                } else {
                    self.finish_assignment(term)?
                }
            }
            Some(Token::MinusMinus) => self.parse_return()?,
            Some(Token::PlusPlus) => self.parse_break()?,
            Some(Token::MacroDefStart) => {
                let tok = self.advance()?.expect("peeked");
                let mut term = Term::new(TermKind::MacroDef, tok.text, tok.span);
                term.doc = doc.clone();
                term
            }
            _ => self.parse_assignment()?,
        };
        if term.doc.is_none() {
            term.doc = doc;
        }
        Ok(term)
    }

    /// `[guard] --> body, [g2] --> b2, ...` or `[guard] <-> body`.
    ///
    /// A `[` at statement level always opens a guard; tensor literals
    /// carry a trailing comma and are recognized inside expressions.
    fn parse_guarded(&mut self) -> ParseResult<Term> {
        let open = self.expect(Token::LBracket, "'['")?;

        // An immediately-closed bracket can only be a tensor literal.
        if self.check(Token::RBracket)? {
            return self.finish_tensor_statement(open, None);
        }
        let guard = self.parse_guard_body()?;
        if self.check(Token::Comma)? {
            return self.finish_tensor_statement(open, Some(guard));
        }
        self.expect(Token::RBracket, "']'")?;

        match self.peek_token()? {
            Some(Token::FollowArrow) => {
                self.advance()?;
                let body = self.parse_statement()?;
                let arm_span = open.merge(&body.span);
                let mut chain = Term::new(TermKind::Follow, "", open);
                chain.args.push((
                    None,
                    Term::new(TermKind::Follow, "", arm_span)
                        .with_left(guard)
                        .with_right(body),
                ));

                while self.check(Token::Comma)? {
                    self.advance()?;
                    self.expect(Token::LBracket, "'[' starting the next guard")?;
                    let guard = self.parse_guard_body()?;
                    self.expect(Token::RBracket, "']'")?;
                    self.expect(Token::FollowArrow, "'-->'")?;
                    let body = self.parse_statement()?;
                    let span = guard.span.merge(&body.span);
                    chain.args.push((
                        None,
                        Term::new(TermKind::Follow, "", span)
                            .with_left(guard)
                            .with_right(body),
                    ));
                }
                chain.span = open.merge(&self.last_span);
                Ok(chain)
            }
            Some(Token::RepeatArrow) => {
                self.advance()?;
                let body = self.parse_statement()?;
                let span = open.merge(&body.span);
                Ok(Term::new(TermKind::Repeat, "", span)
                    .with_left(guard)
                    .with_right(body))
            }
            Some(_) => {
                let tok = self.peek()?.expect("peeked");
                Err(ParseError::unexpected_token(
                    tok.text,
                    "'-->' or '<->' after guard",
                    tok.span,
                ))
            }
            None => Err(ParseError::unexpected_eof(
                "'-->' or '<->' after guard",
                self.last_span,
            )),
        }
    }

    /// The expression inside `[ ... ]`; `_` is the wildcard guard.
    fn parse_guard_body(&mut self) -> ParseResult<Term> {
        if self.check(Token::Underscore)? {
            let tok = self.advance()?.expect("peeked");
            return Ok(Term::new(TermKind::None, "_", tok.span));
        }
        self.parse_expression()
    }

    /// `--expr--` or the bare `--` returning None.
    fn parse_return(&mut self) -> ParseResult<Term> {
        let open = self.expect(Token::MinusMinus, "'--'")?;
        if self.at_statement_end()? {
            return Ok(Term::new(TermKind::Return, "", open));
        }
        let value = self.parse_expression()?;
        let close = self.expect(Token::MinusMinus, "closing '--'")?;
        Ok(Term::new(TermKind::Return, "", open.merge(&close)).with_left(value))
    }

    /// `++expr++` or the bare `++` breaking with None.
    fn parse_break(&mut self) -> ParseResult<Term> {
        let open = self.expect(Token::PlusPlus, "'++'")?;
        if self.at_statement_end()? {
            return Ok(Term::new(TermKind::Break, "", open));
        }
        let value = self.parse_expression()?;
        let close = self.expect(Token::PlusPlus, "closing '++'")?;
        Ok(Term::new(TermKind::Break, "", open.merge(&close)).with_left(value))
    }

    /// True before `;`, a block closer, a `,`, or end of input.
    fn at_statement_end(&mut self) -> ParseResult<bool> {
        Ok(matches!(
            self.peek_token()?,
            None | Some(Token::Semicolon)
                | Some(Token::Comma)
                | Some(Token::RBrace)
                | Some(Token::TryEnd)
                | Some(Token::AndEnd)
                | Some(Token::OrEnd)
                | Some(Token::XorEnd)
        ))
    }

    /// Expression, optionally followed by an assignment operator.
    /// The assignment family is right-associative.
    fn parse_assignment(&mut self) -> ParseResult<Term> {
        let lhs = self.parse_expression()?;
        self.finish_assignment(lhs)
    }

    /// Attach a trailing assignment to an already-parsed left side.
    fn finish_assignment(&mut self, lhs: Term) -> ParseResult<Term> {
        let Some(token) = self.peek_token()? else {
            return Ok(lhs);
        };
        let Some(kind) = token.assign_kind() else {
            return Ok(lhs);
        };
        self.advance()?;

        let rhs = self.parse_assignment()?;
        let span = lhs.span.merge(&rhs.span);
        let mut term = Term::new(TermKind::Assign, "", span)
            .with_left(lhs)
            .with_right(rhs);
        term.assign_kind = Some(kind);
        Ok(term)
    }

    // ==================== token plumbing ====================

    /// Peek the next meaningful token, skipping trivia and stashing docs.
    fn peek(&mut self) -> ParseResult<Option<&SpannedToken<'a>>> {
        while self.current.is_none() {
            match self.lexer.next_token() {
                None => return Ok(None),
                Some(Err(e)) => return Err(e),
                Some(Ok(tok)) if tok.token.is_trivia() => continue,
                Some(Ok(tok)) if tok.token.is_doc() => {
                    self.pending_doc = Some(strip_doc(tok.token, tok.text));
                    continue;
                }
                Some(Ok(tok)) => self.current = Some(tok),
            }
        }
        Ok(self.current.as_ref())
    }

    fn peek_token(&mut self) -> ParseResult<Option<Token>> {
        Ok(self.peek()?.map(|t| t.token))
    }

    fn peek_span(&mut self) -> Span {
        match self.peek() {
            Ok(Some(tok)) => tok.span,
            _ => self.last_span,
        }
    }

    /// Consume and return the current token.
    fn advance(&mut self) -> ParseResult<Option<SpannedToken<'a>>> {
        self.peek()?;
        let tok = self.current.take();
        if let Some(tok) = &tok {
            self.last_span = tok.span;
        }
        Ok(tok)
    }

    fn check(&mut self, token: Token) -> ParseResult<bool> {
        Ok(self.peek_token()? == Some(token))
    }

    /// Consume the token if it matches.
    fn eat(&mut self, token: Token) -> ParseResult<bool> {
        if self.check(token)? {
            self.advance()?;
            return Ok(true);
        }
        Ok(false)
    }

    /// Consume a required token; returns its span.
    fn expect(&mut self, token: Token, what: &str) -> ParseResult<Span> {
        match self.peek()? {
            Some(tok) if tok.token == token => {
                let span = tok.span;
                self.advance()?;
                Ok(span)
            }
            Some(tok) => Err(ParseError::unexpected_token(tok.text, what, tok.span)),
            None => Err(ParseError::unexpected_eof(what, self.last_span)),
        }
    }
}

/// Strip doc-comment markers from the raw lexeme.
fn strip_doc(token: Token, text: &str) -> String {
    match token {
        Token::DocAfter => text.trim_start_matches("///<").trim().to_string(),
        Token::DocLine => text.trim_start_matches('/').trim().to_string(),
        // Block doc: drop `/**` and `*/`
        _ => text
            .trim_start_matches("/**")
            .trim_end_matches("*/")
            .trim()
            .to_string(),
    }
}
