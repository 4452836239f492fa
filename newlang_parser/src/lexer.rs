//! Lexer for NewLang source.
//!
//! Wraps the logos-generated token automaton with hand-written scanning
//! for the context-sensitive forms: nested block comments, quoted and
//! triple-quoted strings, backquoted eval strings, raw `{% %}` blocks
//! and `\\ ... \\\` macro definitions. After each scan the inner lexer
//! is restarted past the consumed region.

use logos::Logos;

use crate::error::{ParseError, ParseResult};
use crate::span::{SourceMap, Span};
use crate::token::Token;

/// A token with its span and source text.
#[derive(Debug, Clone)]
pub struct SpannedToken<'a> {
    pub token: Token,
    pub span: Span,
    pub text: &'a str,
}

impl<'a> SpannedToken<'a> {
    pub fn new(token: Token, span: Span, text: &'a str) -> Self {
        Self { token, span, text }
    }
}

/// NewLang lexer.
pub struct Lexer<'a> {
    source: &'a str,
    inner: logos::Lexer<'a, Token>,
    source_map: SourceMap,
    peeked: Option<Result<SpannedToken<'a>, ParseError>>,
    /// Offset of the inner lexer relative to the original source
    offset: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str) -> Self {
        Self {
            source,
            inner: Token::lexer(source),
            source_map: SourceMap::new(source),
            peeked: None,
            offset: 0,
        }
    }

    pub fn source(&self) -> &'a str {
        self.source
    }

    pub fn source_map(&self) -> &SourceMap {
        &self.source_map
    }

    fn make_span(&self, start: usize, end: usize) -> Span {
        self.source_map.span(start, end)
    }

    /// Peek at the next token without consuming it.
    pub fn peek(&mut self) -> Option<&Result<SpannedToken<'a>, ParseError>> {
        if self.peeked.is_none() {
            self.peeked = self.next_token_internal();
        }
        self.peeked.as_ref()
    }

    pub fn next_token(&mut self) -> Option<Result<SpannedToken<'a>, ParseError>> {
        if let Some(peeked) = self.peeked.take() {
            return Some(peeked);
        }
        self.next_token_internal()
    }

    fn next_token_internal(&mut self) -> Option<Result<SpannedToken<'a>, ParseError>> {
        let result = self.inner.next()?;
        let span = self.inner.span();
        let start = self.offset + span.start;
        let end = self.offset + span.end;

        match result {
            Ok(Token::BlockCommentStart) | Ok(Token::DocBeforeStart) => {
                // Both scan from after "/*"; "/**/" is an empty comment.
                let token = if matches!(result, Ok(Token::DocBeforeStart)) {
                    Token::DocBeforeStart
                } else {
                    Token::LineComment
                };
                self.scanned(start, start + 2, token, Self::scan_block_comment)
            }

            Ok(Token::SingleQuote) => self.scanned(start, end, Token::SingleQuote, |l, p| {
                l.scan_quoted(p, b'\'', 1)
            }),
            Ok(Token::DoubleQuote) => self.scanned(start, end, Token::DoubleQuote, |l, p| {
                l.scan_quoted(p, b'"', 1)
            }),
            Ok(Token::TripleSingleQuote) => {
                self.scanned(start, end, Token::TripleSingleQuote, |l, p| {
                    l.scan_quoted(p, b'\'', 3)
                })
            }
            Ok(Token::TripleDoubleQuote) => {
                self.scanned(start, end, Token::TripleDoubleQuote, |l, p| {
                    l.scan_quoted(p, b'"', 3)
                })
            }
            Ok(Token::Backquote) => self.scanned(start, end, Token::Backquote, |l, p| {
                l.scan_quoted(p, b'`', 1)
            }),

            Ok(Token::SourceStart) => {
                self.scanned(start, end, Token::SourceStart, Self::scan_raw_source)
            }

            Ok(Token::MacroDefStart) => {
                self.scanned(start, end, Token::MacroDefStart, Self::scan_macro_def)
            }

            Ok(token) => {
                let span = self.make_span(start, end);
                Some(Ok(SpannedToken::new(token, span, &self.source[start..end])))
            }

            Err(()) => {
                let span = self.make_span(start, end);
                Some(Err(ParseError::LexerError { span }))
            }
        }
    }

    /// Run `scan` from `content_start`, emit `token` covering the whole
    /// region, and restart the inner lexer after it.
    fn scanned(
        &mut self,
        start: usize,
        content_start: usize,
        token: Token,
        scan: impl FnOnce(&Self, usize) -> ParseResult<usize>,
    ) -> Option<Result<SpannedToken<'a>, ParseError>> {
        match scan(self, content_start) {
            Ok(region_end) => {
                self.restart_from(region_end);
                let span = self.make_span(start, region_end);
                Some(Ok(SpannedToken::new(
                    token,
                    span,
                    &self.source[start..region_end],
                )))
            }
            Err(e) => {
                self.restart_from(self.source.len());
                Some(Err(e))
            }
        }
    }

    /// Scan a nested `/* ... */` comment; returns the offset past `*/`.
    fn scan_block_comment(&self, start: usize) -> ParseResult<usize> {
        let bytes = self.source.as_bytes();
        let mut depth = 1;
        let mut pos = start;

        while pos < bytes.len() && depth > 0 {
            match memchr::memchr2(b'/', b'*', &bytes[pos..]) {
                None => {
                    pos = bytes.len();
                    break;
                }
                Some(offset) => {
                    pos += offset;
                    if pos + 1 < bytes.len() {
                        if bytes[pos] == b'/' && bytes[pos + 1] == b'*' {
                            depth += 1;
                            pos += 2;
                            continue;
                        }
                        if bytes[pos] == b'*' && bytes[pos + 1] == b'/' {
                            depth -= 1;
                            pos += 2;
                            continue;
                        }
                    }
                    pos += 1;
                }
            }
        }

        if depth > 0 {
            Err(ParseError::UnterminatedComment {
                span: self.make_span(start.saturating_sub(2), pos),
            })
        } else {
            Ok(pos)
        }
    }

    /// Scan string content to the closing delimiter, honoring `\` escapes.
    /// `repeat` is 1 for plain strings, 3 for templates.
    fn scan_quoted(&self, start: usize, quote: u8, repeat: usize) -> ParseResult<usize> {
        let bytes = self.source.as_bytes();
        let mut pos = start;

        while pos < bytes.len() {
            match memchr::memchr2(b'\\', quote, &bytes[pos..]) {
                None => break,
                Some(offset) => {
                    pos += offset;
                    if bytes[pos] == b'\\' {
                        pos += 2; // skip the escaped byte
                        continue;
                    }
                    if repeat == 1 {
                        return Ok(pos + 1);
                    }
                    if pos + repeat <= bytes.len() && bytes[pos..pos + repeat].iter().all(|b| *b == quote)
                    {
                        return Ok(pos + repeat);
                    }
                    pos += 1;
                }
            }
        }

        let span = self.make_span(start.saturating_sub(repeat), pos.min(self.source.len()));
        if repeat == 3 {
            Err(ParseError::UnterminatedTemplate { span })
        } else {
            Err(ParseError::UnterminatedString { span })
        }
    }

    /// Scan a `{% ... %}` block; embedded `{% %}` pairs nest.
    fn scan_raw_source(&self, start: usize) -> ParseResult<usize> {
        let bytes = self.source.as_bytes();
        let mut depth = 1;
        let mut pos = start;

        while pos < bytes.len() && depth > 0 {
            match memchr::memchr2(b'{', b'%', &bytes[pos..]) {
                None => {
                    pos = bytes.len();
                    break;
                }
                Some(offset) => {
                    pos += offset;
                    if pos + 1 < bytes.len() {
                        if bytes[pos] == b'{' && bytes[pos + 1] == b'%' {
                            depth += 1;
                            pos += 2;
                            continue;
                        }
                        if bytes[pos] == b'%' && bytes[pos + 1] == b'}' {
                            depth -= 1;
                            pos += 2;
                            continue;
                        }
                    }
                    pos += 1;
                }
            }
        }

        if depth > 0 {
            Err(ParseError::UnterminatedSource {
                span: self.make_span(start.saturating_sub(2), pos),
            })
        } else {
            Ok(pos)
        }
    }

    /// Scan a macro definition opened by `\\` up to the `\\\` terminator.
    fn scan_macro_def(&self, start: usize) -> ParseResult<usize> {
        match crate::macros::find_macro_terminator(self.source, start) {
            Some(end) => Ok(end),
            None => Err(ParseError::UnterminatedMacro {
                span: self.make_span(start.saturating_sub(2), self.source.len()),
            }),
        }
    }

    /// Restart the inner lexer at an absolute byte position.
    pub fn restart_from(&mut self, pos: usize) {
        self.peeked = None;
        let inner_abs = self.offset + self.inner.span().end;
        if pos > inner_abs && pos <= self.source.len() {
            self.inner.bump(pos - inner_abs);
        } else if pos < self.source.len() {
            self.inner = Token::lexer(&self.source[pos..]);
            self.offset = pos;
        } else {
            self.inner = Token::lexer("");
            self.offset = pos;
        }
    }

    pub fn is_eof(&mut self) -> bool {
        self.peek().is_none()
    }
}

impl<'a> Iterator for Lexer<'a> {
    type Item = Result<SpannedToken<'a>, ParseError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_token()
    }
}

/// Tokenize a whole buffer (used by tests and diagnostics).
pub fn tokenize(source: &str) -> Vec<Result<SpannedToken<'_>, ParseError>> {
    Lexer::new(source).collect()
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn kinds(source: &str) -> Vec<Token> {
        tokenize(source)
            .into_iter()
            .filter_map(|r| r.ok())
            .map(|t| t.token)
            .collect()
    }

    #[test]
    fn statement_tokens() {
        assert_eq!(
            kinds("var1 ::= 123;"),
            vec![
                Token::Name,
                Token::CreateOnly,
                Token::Integer,
                Token::Semicolon,
            ]
        );
    }

    #[test]
    fn byte_string_is_one_token() {
        let tokens: Vec<_> = tokenize("'byte' + 1").into_iter().map(|r| r.unwrap()).collect();
        assert_eq!(tokens[0].token, Token::SingleQuote);
        assert_eq!(tokens[0].text, "'byte'");
        assert_eq!(tokens[1].token, Token::Plus);
    }

    #[test]
    fn wide_string_with_escape() {
        let tokens: Vec<_> = tokenize(r#""a\"b""#).into_iter().map(|r| r.unwrap()).collect();
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].text, r#""a\"b""#);
    }

    #[test]
    fn template_spans_lines() {
        let src = "'''line1\nline2''' 42";
        let tokens: Vec<_> = tokenize(src).into_iter().map(|r| r.unwrap()).collect();
        assert_eq!(tokens[0].token, Token::TripleSingleQuote);
        assert_eq!(tokens[0].text, "'''line1\nline2'''");
        assert_eq!(tokens[1].token, Token::Integer);
    }

    #[test]
    fn nested_block_comment() {
        assert_eq!(
            kinds("/* outer /* inner */ outer */ 7"),
            vec![Token::LineComment, Token::Integer]
        );
    }

    #[test]
    fn unterminated_comment_is_an_error() {
        let tokens = tokenize("/* no close");
        assert_eq!(tokens.len(), 1);
        assert!(matches!(
            tokens[0],
            Err(ParseError::UnterminatedComment { .. })
        ));
    }

    #[test]
    fn raw_source_block_nests() {
        let src = "{% if (a) {% b %} c %} 5";
        let tokens: Vec<_> = tokenize(src).into_iter().map(|r| r.unwrap()).collect();
        assert_eq!(tokens[0].token, Token::SourceStart);
        assert_eq!(tokens[0].text, "{% if (a) {% b %} c %}");
        assert_eq!(tokens[1].token, Token::Integer);
    }

    #[test]
    fn macro_definition_is_one_token() {
        let src = r"\\if(cond) [\$cond]-->\\\ 9";
        let tokens: Vec<_> = tokenize(src).into_iter().map(|r| r.unwrap()).collect();
        assert_eq!(tokens[0].token, Token::MacroDefStart);
        assert_eq!(tokens[0].text, r"\\if(cond) [\$cond]-->\\\");
        assert_eq!(tokens[1].token, Token::Integer);
    }

    #[test]
    fn unterminated_string_reports_open_position() {
        let tokens = tokenize("'oops");
        assert_eq!(tokens.len(), 1);
        match &tokens[0] {
            Err(ParseError::UnterminatedString { span }) => assert_eq!(span.start, 0),
            other => panic!("expected unterminated string, got {other:?}"),
        }
    }

    #[test]
    fn spans_track_lines() {
        let tokens: Vec<_> = tokenize("a\nb").into_iter().map(|r| r.unwrap()).collect();
        assert_eq!(tokens[0].span.line, 1);
        assert_eq!(tokens[1].span.line, 2);
        assert_eq!(tokens[1].span.column, 1);
    }
}
