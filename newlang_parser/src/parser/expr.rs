//! Expression grammar: precedence climbing, postfix chains, literals
//! and collection constructors.

use crate::error::{ParseError, ParseResult};
use crate::span::Span;
use crate::term::{Term, TermKind, TypeAnnotation};
use crate::token::{Associativity, Precedence, Token};

use super::Parser;

impl<'a> Parser<'a> {
    /// Entry point for a full expression.
    pub(crate) fn parse_expression(&mut self) -> ParseResult<Term> {
        self.parse_binary(Precedence::Range as u8)
    }

    /// Precedence-climbing loop for infix operators.
    fn parse_binary(&mut self, min: u8) -> ParseResult<Term> {
        let left = self.parse_unary()?;
        self.continue_binary(left, min)
    }

    /// Climb from an already-parsed left operand.
    pub(crate) fn continue_binary(&mut self, left: Term, min: u8) -> ParseResult<Term> {
        let mut left = left;
        loop {
            let Some(tok) = self.peek_token()? else { break };
            let Some((prec, assoc)) = tok.binary_precedence() else {
                break;
            };
            if (prec as u8) < min {
                break;
            }
            self.advance()?;

            if tok == Token::DotDot {
                left = self.parse_range_tail(left)?;
                continue;
            }

            let next_min = match assoc {
                Associativity::Left => prec as u8 + 1,
                Associativity::Right => prec as u8,
            };
            let right = self.parse_binary(next_min)?;
            let span = left.span.merge(&right.span);
            let op = operator_lexeme(tok);
            left = Term::operator(op, left, right, span);
        }

        Ok(left)
    }

    /// `start .. stop` / `start .. stop .. step`, the `..` already eaten.
    fn parse_range_tail(&mut self, start: Term) -> ParseResult<Term> {
        let stop = self.parse_binary(Precedence::Range as u8 + 1)?;
        let mut span = start.span.merge(&stop.span);

        let step = if self.eat(Token::DotDot)? {
            let step = self.parse_binary(Precedence::Range as u8 + 1)?;
            span = span.merge(&step.span);
            Some(step)
        } else {
            None
        };

        let mut range = Term::new(TermKind::Range, "", span);
        range.args.push((Some("start".to_string()), start));
        range.args.push((Some("stop".to_string()), stop));
        if let Some(step) = step {
            range.args.push((Some("step".to_string()), step));
        }
        Ok(range)
    }

    fn parse_unary(&mut self) -> ParseResult<Term> {
        if let Some(tok) = self.peek_token()? {
            if tok.unary_precedence().is_some() {
                let op = self.advance()?.expect("peeked");
                let operand = self.parse_unary()?;
                let span = op.span.merge(&operand.span);
                let lexeme = operator_lexeme(tok);
                return Ok(Term::new(TermKind::UnaryOp, lexeme, span).with_left(operand));
            }
        }
        self.parse_postfix()
    }

    /// Primary followed by calls, indexing, field access, iterator ops
    /// and type annotations.
    fn parse_postfix(&mut self) -> ParseResult<Term> {
        let term = self.parse_primary()?;
        self.continue_postfix(term)
    }

    /// The postfix chain from an already-parsed primary.
    pub(crate) fn continue_postfix(&mut self, term: Term) -> ParseResult<Term> {
        let mut term = term;
        loop {
            match self.peek_token()? {
                Some(Token::LParen) => {
                    self.advance()?;
                    let args = self.parse_arg_list(Token::RParen)?;
                    let close = self.expect(Token::RParen, "')'")?;
                    let span = term.span.merge(&close);
                    let callee_text = term.text.clone();
                    let mut call = Term::new(TermKind::Call, callee_text, span).with_left(term);
                    call.args = args;
                    term = call;
                }
                Some(Token::LBracket) => {
                    self.advance()?;
                    let args = self.parse_index_list()?;
                    let close = self.expect(Token::RBracket, "']'")?;
                    let span = term.span.merge(&close);
                    let mut index = Term::new(TermKind::Index, "", span).with_left(term);
                    index.args = args;
                    term = index;
                }
                Some(Token::Dot) => {
                    self.advance()?;
                    let name = self.expect_name("field name")?;
                    let span = term.span.merge(&name.1);
                    term = Term::new(TermKind::Field, name.0, span).with_left(term);
                }
                Some(tok) if tok.is_iterator_op() => {
                    self.advance()?;
                    let mut span = term.span.merge(&self.last_span);
                    let mut args = Vec::new();
                    if self.check(Token::LParen)? {
                        self.advance()?;
                        args = self.parse_arg_list(Token::RParen)?;
                        let close = self.expect(Token::RParen, "')'")?;
                        span = span.merge(&close);
                    }
                    let mut iter = Term::new(TermKind::Iterator, operator_lexeme(tok), span)
                        .with_left(term);
                    iter.args = args;
                    term = iter;
                }
                Some(Token::TypeName) => {
                    let tok = self.advance()?.expect("peeked");
                    let name = tok.text[1..].to_string();
                    let dims = self.parse_type_dims()?;
                    self.attach_annotation(&mut term, TypeAnnotation { name, dims })?;
                }
                Some(Token::Colon) => {
                    self.advance()?;
                    let (name, _) = self.expect_name("type name after ':'")?;
                    let dims = self.parse_type_dims()?;
                    self.attach_annotation(&mut term, TypeAnnotation { name, dims })?;
                }
                _ => break,
            }
        }

        Ok(term)
    }

    /// Validate and attach a type annotation; literal bounds are
    /// checked here so `300:Int8` fails at parse time.
    fn attach_annotation(&mut self, term: &mut Term, annotation: TypeAnnotation) -> ParseResult<()> {
        if term.kind == TermKind::Integer {
            let value = parse_integer_text(&term.text, term.span)?;
            if !integer_fits(value, &annotation.name) {
                return Err(ParseError::LiteralOutOfRange {
                    literal: term.text.clone(),
                    type_name: annotation.name,
                    span: term.span,
                });
            }
        }
        term.annotation = Some(annotation);
        Ok(())
    }

    /// `[d1, d2, ...]` after a type name; empty when absent.
    fn parse_type_dims(&mut self) -> ParseResult<Vec<Term>> {
        if !self.check(Token::LBracket)? {
            return Ok(Vec::new());
        }
        self.advance()?;
        let mut dims = Vec::new();
        loop {
            if self.check(Token::RBracket)? {
                break;
            }
            if self.check(Token::Ellipsis)? {
                let tok = self.advance()?.expect("peeked");
                dims.push(Term::new(TermKind::Ellipsis, "...", tok.span));
            } else {
                dims.push(self.parse_expression()?);
            }
            if !self.eat(Token::Comma)? {
                break;
            }
        }
        self.expect(Token::RBracket, "']' closing type dimensions")?;
        Ok(dims)
    }

    fn parse_primary(&mut self) -> ParseResult<Term> {
        let Some(tok) = self.peek()?.cloned() else {
            return Err(ParseError::unexpected_eof("expression", self.last_span));
        };

        match tok.token {
            Token::Integer => {
                self.advance()?;
                let text = tok.text.replace('_', "");
                parse_integer_text(&text, tok.span)?;
                Ok(Term::new(TermKind::Integer, text, tok.span))
            }
            Token::Number => {
                self.advance()?;
                let text = tok.text.replace('_', "");
                text.parse::<f64>()
                    .map_err(|_| ParseError::InvalidNumber {
                        literal: tok.text.to_string(),
                        span: tok.span,
                    })?;
                Ok(Term::new(TermKind::Number, text, tok.span))
            }
            Token::Fraction => {
                self.advance()?;
                Ok(Term::new(
                    TermKind::Fraction,
                    tok.text.replace('_', ""),
                    tok.span,
                ))
            }
            Token::SingleQuote => self.string_term(TermKind::StrChar, 1),
            Token::DoubleQuote => self.string_term(TermKind::StrWide, 1),
            Token::TripleSingleQuote => self.string_term(TermKind::StrChar, 3),
            Token::TripleDoubleQuote => self.string_term(TermKind::StrWide, 3),
            Token::Backquote => {
                self.advance()?;
                let inner = &tok.text[1..tok.text.len() - 1];
                Ok(Term::new(TermKind::Eval, inner, tok.span))
            }
            Token::SourceStart => {
                self.advance()?;
                let inner = &tok.text[2..tok.text.len() - 2];
                Ok(Term::new(TermKind::Source, inner, tok.span))
            }
            Token::Underscore => {
                self.advance()?;
                Ok(Term::new(TermKind::None, "_", tok.span))
            }
            Token::Ellipsis => {
                self.advance()?;
                Ok(Term::new(TermKind::Ellipsis, "...", tok.span))
            }
            Token::Name => {
                self.advance()?;
                Ok(Term::new(TermKind::Name, tok.text, tok.span))
            }
            Token::Local => {
                self.advance()?;
                Ok(Term::new(TermKind::Local, &tok.text[1..], tok.span))
            }
            Token::SessionDot => {
                self.advance()?;
                let (name, span) = self.expect_name("name after '$.'")?;
                Ok(Term::new(
                    TermKind::Local,
                    format!(".{name}"),
                    tok.span.merge(&span),
                ))
            }
            Token::Module => {
                self.advance()?;
                Ok(Term::new(TermKind::Module, &tok.text[1..], tok.span))
            }
            Token::GlobalDot => {
                self.advance()?;
                let (name, span) = self.expect_name("name after '@.'")?;
                Ok(Term::new(
                    TermKind::Module,
                    format!(".{name}"),
                    tok.span.merge(&span),
                ))
            }
            Token::Native => {
                self.advance()?;
                Ok(Term::new(TermKind::Native, &tok.text[1..], tok.span))
            }
            Token::Argument => {
                self.advance()?;
                Ok(Term::new(TermKind::Argument, &tok.text[1..], tok.span))
            }
            Token::Dollar => {
                self.advance()?;
                Ok(Term::new(TermKind::ArgsDict, "$", tok.span))
            }
            Token::TypeName => self.parse_type_reference(),
            Token::LParen => self.parse_dict_or_group(),
            Token::LBracket => self.parse_tensor_literal(),
            Token::LBrace => self.parse_block(TermKind::Block, Token::RBrace),
            Token::TryStart => self.parse_block(TermKind::BlockTry, Token::TryEnd),
            Token::AndStart => self.parse_block(TermKind::BlockAnd, Token::AndEnd),
            Token::OrStart => self.parse_block(TermKind::BlockOr, Token::OrEnd),
            Token::XorStart => self.parse_block(TermKind::BlockXor, Token::XorEnd),
            Token::MacroUse => Err(ParseError::invalid_syntax(
                format!("macro '{}' is not defined", tok.text),
                tok.span,
            )),
            _ => Err(ParseError::unexpected_token(
                tok.text,
                "expression",
                tok.span,
            )),
        }
    }

    /// Decode a quoted string token into a term.
    fn string_term(&mut self, kind: TermKind, quote_len: usize) -> ParseResult<Term> {
        let tok = self.advance()?.expect("peeked");
        let inner = &tok.text[quote_len..tok.text.len() - quote_len];
        let decoded = decode_escapes(inner, tok.span)?;
        Ok(Term::new(kind, decoded, tok.span))
    }

    /// `:Name`, `:Name[dims]`, `:Name(args)`, `:Name[dims](args)`.
    fn parse_type_reference(&mut self) -> ParseResult<Term> {
        let tok = self.advance()?.expect("peeked");
        let name = tok.text[1..].to_string();
        let dims = self.parse_type_dims()?;
        let annotation = TypeAnnotation {
            name: name.clone(),
            dims,
        };

        if self.check(Token::LParen)? {
            self.advance()?;
            let args = self.parse_arg_list(Token::RParen)?;
            let close = self.expect(Token::RParen, "')'")?;
            let mut call = Term::new(TermKind::TypeCall, name, tok.span.merge(&close));
            call.annotation = Some(annotation);
            call.args = args;
            return Ok(call);
        }

        let mut term = Term::new(TermKind::TypeName, name, tok.span.merge(&self.last_span));
        term.annotation = Some(annotation);
        Ok(term)
    }

    /// After `(`: either a grouped expression or a dictionary literal.
    /// Dict literals always carry a trailing comma: `(e1, n=e2,)`, `(,)`.
    fn parse_dict_or_group(&mut self) -> ParseResult<Term> {
        let open = self.expect(Token::LParen, "'('")?;

        // `(,)` — the empty dictionary
        if self.check(Token::Comma)? {
            self.advance()?;
            let close = self.expect(Token::RParen, "')' closing the empty dictionary")?;
            return Ok(Term::new(TermKind::Dict, "", open.merge(&close)));
        }

        let first = self.parse_arg_entry()?;

        if self.check(Token::RParen)? {
            // No comma: plain grouping; named entries need the comma.
            let (name, expr) = first;
            if name.is_some() {
                let tok_span = self.peek_span();
                return Err(ParseError::invalid_syntax(
                    "a named entry makes this a dictionary; add a trailing comma",
                    tok_span,
                ));
            }
            self.advance()?;
            return Ok(expr);
        }

        self.expect(Token::Comma, "',' or ')'")?;
        let mut args = vec![first];
        loop {
            if self.check(Token::RParen)? {
                break;
            }
            args.push(self.parse_arg_entry()?);
            if !self.eat(Token::Comma)? {
                // Dictionary elements are comma-terminated, not separated.
                let span = self.peek_span();
                return Err(ParseError::invalid_syntax(
                    "dictionary elements end with ','",
                    span,
                ));
            }
        }
        let close = self.expect(Token::RParen, "')'")?;
        let mut dict = Term::new(TermKind::Dict, "", open.merge(&close));
        dict.args = args;
        Ok(dict)
    }

    /// A tensor literal opened at statement level, where the first
    /// element (if any) was parsed while probing for a guard. Resumes
    /// the full expression grammar afterwards.
    pub(crate) fn finish_tensor_statement(
        &mut self,
        open: Span,
        first: Option<Term>,
    ) -> ParseResult<Term> {
        let mut args = Vec::new();
        if let Some(first) = first {
            args.push((None, first));
            self.expect(Token::Comma, "','")?;
            loop {
                if self.check(Token::RBracket)? {
                    break;
                }
                let element = self.parse_expression()?;
                args.push((None, element));
                if !self.eat(Token::Comma)? {
                    let span = self.peek_span();
                    return Err(ParseError::invalid_syntax(
                        "tensor elements end with ','",
                        span,
                    ));
                }
            }
        }
        let close = self.expect(Token::RBracket, "']'")?;
        let mut tensor = Term::new(TermKind::Tensor, "", open.merge(&close));
        tensor.args = args;
        if self.check(Token::TypeName)? {
            let tok = self.advance()?.expect("peeked");
            tensor.annotation = Some(TypeAnnotation::simple(&tok.text[1..]));
        }

        let term = self.continue_postfix(tensor)?;
        self.continue_binary(term, Precedence::Range as u8)
    }

    /// `[e1, e2,]` with mandatory trailing comma; optional `:Type` suffix.
    fn parse_tensor_literal(&mut self) -> ParseResult<Term> {
        let open = self.expect(Token::LBracket, "'['")?;
        let mut args = Vec::new();

        loop {
            if self.check(Token::RBracket)? {
                break;
            }
            let element = self.parse_expression()?;
            args.push((None, element));
            if !self.eat(Token::Comma)? {
                let span = self.peek_span();
                return Err(ParseError::invalid_syntax(
                    "tensor elements end with ','",
                    span,
                ));
            }
        }
        let close = self.expect(Token::RBracket, "']'")?;
        let mut tensor = Term::new(TermKind::Tensor, "", open.merge(&close));
        tensor.args = args;

        // Optional element-type suffix: `[1, 2,]:Int32`
        if self.check(Token::TypeName)? {
            let tok = self.advance()?.expect("peeked");
            tensor.annotation = Some(TypeAnnotation::simple(&tok.text[1..]));
        }
        Ok(tensor)
    }

    /// Block of statements up to `end`.
    fn parse_block(&mut self, kind: TermKind, end: Token) -> ParseResult<Term> {
        let open = self.advance()?.expect("peeked").span;
        let mut statements = Vec::new();

        loop {
            while self.eat(Token::Semicolon)? {}
            if self.check(end)? {
                break;
            }
            if self.peek()?.is_none() {
                return Err(ParseError::unexpected_eof("closing block", self.last_span));
            }
            statements.push(self.parse_statement()?);
            if !self.check(end)? {
                self.expect(Token::Semicolon, "';' between statements")?;
            }
        }
        let close = self.expect(end, "closing block")?;
        let mut block = Term::new(kind, "", open.merge(&close));
        block.block = statements;
        Ok(block)
    }

    /// Argument list for calls, type calls and dictionaries (without
    /// the trailing-comma rule, which dictionaries enforce separately).
    pub(crate) fn parse_arg_list(
        &mut self,
        close: Token,
    ) -> ParseResult<Vec<(Option<String>, Term)>> {
        let mut args = Vec::new();
        loop {
            if self.check(close)? {
                break;
            }
            args.push(self.parse_arg_entry()?);
            if !self.eat(Token::Comma)? {
                break;
            }
        }
        Ok(args)
    }

    /// One argument: `name=expr`, `'name'=expr`, `expr`, `...`,
    /// `... expr` (splice) or `... expr ...` (fill-by-call).
    fn parse_arg_entry(&mut self) -> ParseResult<(Option<String>, Term)> {
        if self.check(Token::Ellipsis)? {
            let tok = self.advance()?.expect("peeked");
            if matches!(
                self.peek_token()?,
                None | Some(Token::Comma) | Some(Token::RParen) | Some(Token::RBracket)
            ) {
                return Ok((None, Term::new(TermKind::Ellipsis, "...", tok.span)));
            }
            let expr = self.parse_expression()?;
            let mut span = tok.span.merge(&expr.span);
            let text = if self.eat(Token::Ellipsis)? {
                span = span.merge(&self.last_span);
                "......"
            } else {
                "..."
            };
            return Ok((None, Term::new(TermKind::Ellipsis, text, span).with_left(expr)));
        }

        let expr = self.parse_expression()?;

        if self.check(Token::Assign)? {
            if let Some(name) = entry_name(&expr) {
                self.advance()?;
                let mut value = self.parse_expression()?;
                // `arg:Type=default` — keep the formal's annotation on
                // the default term.
                if value.annotation.is_none() {
                    value.annotation = expr.annotation.clone();
                }
                return Ok((Some(name), value));
            }
        }
        Ok((None, expr))
    }

    /// Index list: like arguments but `_` is a new-axis marker.
    fn parse_index_list(&mut self) -> ParseResult<Vec<(Option<String>, Term)>> {
        let mut args = Vec::new();
        loop {
            if self.check(Token::RBracket)? {
                break;
            }
            if self.check(Token::Underscore)? {
                let tok = self.advance()?.expect("peeked");
                args.push((None, Term::new(TermKind::None, "_", tok.span)));
            } else if self.check(Token::Ellipsis)? {
                let tok = self.advance()?.expect("peeked");
                args.push((None, Term::new(TermKind::Ellipsis, "...", tok.span)));
            } else {
                args.push((None, self.parse_expression()?));
            }
            if !self.eat(Token::Comma)? {
                break;
            }
        }
        Ok(args)
    }

    /// A plain identifier token with its span.
    fn expect_name(&mut self, what: &str) -> ParseResult<(String, Span)> {
        match self.peek()? {
            Some(tok) if tok.token == Token::Name => {
                let text = tok.text.to_string();
                let span = tok.span;
                self.advance()?;
                Ok((text, span))
            }
            Some(tok) => Err(ParseError::unexpected_token(tok.text, what, tok.span)),
            None => Err(ParseError::unexpected_eof(what, self.last_span)),
        }
    }
}

/// The name an argument entry binds, for `name=expr` forms.
fn entry_name(term: &Term) -> Option<String> {
    match term.kind {
        TermKind::Name | TermKind::StrChar | TermKind::StrWide => Some(term.text.clone()),
        _ => None,
    }
}

/// Lexeme for an operator token, as stored in `Term::text`.
fn operator_lexeme(token: Token) -> &'static str {
    match token {
        Token::OrOr => "||",
        Token::AndAnd => "&&",
        Token::EqEq => "==",
        Token::EqEqEq => "===",
        Token::NotEq => "!=",
        Token::Lt => "<",
        Token::LtEq => "<=",
        Token::Gt => ">",
        Token::GtEq => ">=",
        Token::Spaceship => "<=>",
        Token::Tilde => "~",
        Token::TildeTilde => "~~",
        Token::TildeTildeTilde => "~~~",
        Token::NotTilde => "!~",
        Token::NotTildeTilde => "!~~",
        Token::Pipe => "|",
        Token::Caret => "^",
        Token::Amp => "&",
        Token::Shl => "<<",
        Token::Shr => ">>",
        Token::Plus => "+",
        Token::Minus => "-",
        Token::PlusPlus => "++",
        Token::Star => "*",
        Token::Slash => "/",
        Token::SlashSlash => "//",
        Token::Percent => "%",
        Token::StarStar => "**",
        Token::DotDot => "..",
        Token::Quest => "?",
        Token::QuestQuest => "??",
        Token::Bang => "!",
        Token::BangQuest => "!?",
        Token::QuestBang => "?!",
        _ => "?op?",
    }
}

/// Parse integer text (separators already stripped).
fn parse_integer_text(text: &str, span: Span) -> ParseResult<i64> {
    text.parse::<i64>().map_err(|_| ParseError::InvalidNumber {
        literal: text.to_string(),
        span,
    })
}

/// Does a literal value fit the named scalar type?
fn integer_fits(value: i64, type_name: &str) -> bool {
    match type_name {
        "Bool" => value == 0 || value == 1,
        "Int8" => i8::try_from(value).is_ok(),
        "Int16" => i16::try_from(value).is_ok(),
        "Int32" => i32::try_from(value).is_ok(),
        "Int64" => true,
        // Floats and unknown (user) types are checked at runtime.
        _ => true,
    }
}

/// Decode C-style escapes; `\s` is a space.
pub(crate) fn decode_escapes(inner: &str, span: Span) -> ParseResult<String> {
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();

    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        let Some(escape) = chars.next() else {
            return Err(ParseError::InvalidEscape {
                sequence: "\\".to_string(),
                span,
            });
        };
        match escape {
            'n' => out.push('\n'),
            't' => out.push('\t'),
            'r' => out.push('\r'),
            '0' => out.push('\0'),
            's' => out.push(' '),
            'a' => out.push('\x07'),
            'b' => out.push('\x08'),
            'f' => out.push('\x0c'),
            'v' => out.push('\x0b'),
            '\\' => out.push('\\'),
            '\'' => out.push('\''),
            '"' => out.push('"'),
            'x' => {
                let hex: String = chars.by_ref().take(2).collect();
                let code = u8::from_str_radix(&hex, 16).map_err(|_| ParseError::InvalidEscape {
                    sequence: format!("\\x{hex}"),
                    span,
                })?;
                out.push(code as char);
            }
            other => {
                return Err(ParseError::InvalidEscape {
                    sequence: format!("\\{other}"),
                    span,
                });
            }
        }
    }
    Ok(out)
}
