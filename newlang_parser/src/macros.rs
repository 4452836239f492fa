//! Macro store and textual expander.
//!
//! Macros rewrite source text *before* parsing. A definition
//! `\\name(params) body \\\` registers `body` under the key `\name(`
//! (or `\name` for the parameterless form) and is blanked out of the
//! buffer with spaces so every later token keeps its position. Uses
//! `\name` / `\name(args)` are then substituted to a fixed point.

use std::collections::HashMap;

use crate::error::{ParseError, ParseResult};

/// Default bound on expansion passes before declaring runaway recursion.
pub const DEFAULT_EXPANSION_LIMIT: usize = 100;

/// Find the end of a macro definition: the byte index just past the
/// first `\\\` terminator at or after `from`. The definition opener
/// `\\` must already have been consumed.
pub fn find_macro_terminator(source: &str, from: usize) -> Option<usize> {
    let bytes = source.as_bytes();
    let mut pos = from;
    while pos < bytes.len() {
        let offset = memchr::memchr(b'\\', &bytes[pos..])?;
        pos += offset;
        let run = bytes[pos..].iter().take_while(|b| **b == b'\\').count();
        if run >= 3 {
            return Some(pos + 3);
        }
        pos += run.max(1);
    }
    None
}

/// A registered macro: parameter names plus the body template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MacroDef {
    pub params: Vec<String>,
    pub body: String,
}

/// Mapping from macro key (`\name` or `\name(`) to definition.
#[derive(Debug, Clone, Default)]
pub struct MacroStore {
    map: HashMap<String, MacroDef>,
}

impl MacroStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&MacroDef> {
        self.map.get(key)
    }

    /// Register a macro. Re-registering an identical body is a no-op;
    /// a different body for an existing key is an error.
    pub fn register(&mut self, key: String, def: MacroDef) -> ParseResult<()> {
        if let Some(existing) = self.map.get(&key) {
            if *existing == def {
                return Ok(());
            }
            return Err(ParseError::MacroRedefined { key });
        }
        self.map.insert(key, def);
        Ok(())
    }

    /// Extract every top-level `\\ ... \\\` definition from `source`,
    /// registering each and overwriting its span with spaces of equal
    /// length (newlines are preserved so positions survive).
    ///
    /// Returns the number of definitions found.
    pub fn extract(&mut self, source: &mut String) -> ParseResult<usize> {
        let mut found = 0;
        let mut pos = 0;

        loop {
            let bytes = source.as_bytes();
            let Some(offset) = find_def_start(bytes, pos) else {
                break;
            };
            let start = offset;
            let Some(end) = find_macro_terminator(source, start + 2) else {
                // Leave an unterminated definition for the lexer to report.
                break;
            };

            let span_text = &source[start..end];
            let inner = &span_text[2..span_text.len() - 3];
            let (key, def) = parse_definition(inner)?;
            self.register(key, def)?;
            found += 1;

            let blanked: String = source[start..end]
                .chars()
                .map(|c| if c == '\n' { '\n' } else { ' ' })
                .collect();
            source.replace_range(start..end, &blanked);
            pos = end;
        }

        Ok(found)
    }

    /// Expand all known macro uses in `source` to a fixed point,
    /// bounded by `limit` passes.
    pub fn expand(&self, source: &str, limit: usize) -> ParseResult<String> {
        let mut current = source.to_string();
        for _ in 0..limit {
            let next = self.expand_once(&current)?;
            if next == current {
                return Ok(current);
            }
            current = next;
        }
        // One extra pass to confirm the fixed point was truly missed.
        let next = self.expand_once(&current)?;
        if next == current {
            Ok(current)
        } else {
            Err(ParseError::MacroRunaway { limit })
        }
    }

    fn expand_once(&self, source: &str) -> ParseResult<String> {
        let mut out = String::with_capacity(source.len());
        let bytes = source.as_bytes();
        let mut pos = 0;

        while pos < bytes.len() {
            let Some(offset) = memchr::memchr(b'\\', &bytes[pos..]) else {
                out.push_str(&source[pos..]);
                break;
            };
            out.push_str(&source[pos..pos + offset]);
            pos += offset;

            // Only `\name` openings are candidates; anything else is copied.
            let Some(name_end) = scan_macro_name(source, pos + 1) else {
                out.push('\\');
                pos += 1;
                continue;
            };
            let name = &source[pos + 1..name_end];

            // Parameterized form first, then the bare key. The body
            // is spliced with surrounding spaces so it cannot merge
            // with adjacent tokens (`{` + `--x--` must not lex `{-`).
            if name_end < bytes.len() && bytes[name_end] == b'(' {
                let paren_key = format!("\\{name}(");
                if let Some(def) = self.map.get(&paren_key) {
                    let (args, call_end) = parse_call_args(source, name_end)?;
                    out.push(' ');
                    out.push_str(&substitute(&paren_key, def, &args)?);
                    out.push(' ');
                    pos = call_end;
                    continue;
                }
            }
            let bare_key = format!("\\{name}");
            if let Some(def) = self.map.get(&bare_key) {
                out.push(' ');
                out.push_str(&substitute(&bare_key, def, &[])?);
                out.push(' ');
                pos = name_end;
                continue;
            }

            // Unknown key: left as-is.
            out.push('\\');
            pos += 1;
        }

        Ok(out)
    }
}

/// Find the next `\\` that opens a definition (exactly two backslashes,
/// not part of a longer run).
fn find_def_start(bytes: &[u8], from: usize) -> Option<usize> {
    let mut pos = from;
    while pos < bytes.len() {
        let offset = memchr::memchr(b'\\', &bytes[pos..])?;
        pos += offset;
        let run = bytes[pos..].iter().take_while(|b| **b == b'\\').count();
        if run == 2 {
            return Some(pos);
        }
        pos += run.max(1);
    }
    None
}

/// Split a definition's inner text into its key and [`MacroDef`].
fn parse_definition(inner: &str) -> ParseResult<(String, MacroDef)> {
    let trimmed = inner.trim_start();
    let name_len = trimmed
        .char_indices()
        .take_while(|(i, c)| is_name_char(*c, *i == 0))
        .map(|(i, c)| i + c.len_utf8())
        .last()
        .unwrap_or(0);
    if name_len == 0 {
        return Err(ParseError::InvalidSyntax {
            message: "macro definition without a name".to_string(),
            span: crate::span::Span::empty(),
        });
    }
    let name = &trimmed[..name_len];
    let rest = &trimmed[name_len..];

    if let Some(rest) = rest.strip_prefix('(') {
        let close = rest.find(')').ok_or_else(|| ParseError::InvalidSyntax {
            message: format!("macro '{name}' parameter list is not closed"),
            span: crate::span::Span::empty(),
        })?;
        let params: Vec<String> = rest[..close]
            .split(',')
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(str::to_string)
            .collect();
        let body = rest[close + 1..].trim().to_string();
        Ok((format!("\\{name}("), MacroDef { params, body }))
    } else {
        Ok((
            format!("\\{name}"),
            MacroDef {
                params: Vec::new(),
                body: rest.trim().to_string(),
            },
        ))
    }
}

fn is_name_char(c: char, first: bool) -> bool {
    if first {
        c == '_' || c.is_alphabetic()
    } else {
        c == '_' || c.is_alphanumeric()
    }
}

/// Scan an identifier starting at `from`; returns the end offset, or
/// None if no identifier starts there.
fn scan_macro_name(source: &str, from: usize) -> Option<usize> {
    let rest = &source[from.min(source.len())..];
    let mut end = from;
    for (i, c) in rest.char_indices() {
        if is_name_char(c, i == 0) {
            end = from + i + c.len_utf8();
        } else {
            break;
        }
    }
    (end > from).then_some(end)
}

/// Parse `(arg1, arg2, ...)` starting at the `(`; commas split only at
/// parenthesis depth 0, `\,` escapes a literal comma. Returns the
/// argument texts and the offset past the closing `)`.
fn parse_call_args(source: &str, open: usize) -> ParseResult<(Vec<String>, usize)> {
    let bytes = source.as_bytes();
    debug_assert_eq!(bytes[open], b'(');

    let mut args = Vec::new();
    let mut current = String::new();
    let mut depth = 1;
    let mut pos = open + 1;

    while pos < bytes.len() {
        let c = source[pos..].chars().next().expect("in-bounds char");
        match c {
            '\\' if bytes.get(pos + 1) == Some(&b',') => {
                current.push(',');
                pos += 2;
                continue;
            }
            '(' => {
                depth += 1;
                current.push(c);
            }
            ')' => {
                depth -= 1;
                if depth == 0 {
                    let trimmed = current.trim();
                    if !trimmed.is_empty() || !args.is_empty() {
                        args.push(trimmed.to_string());
                    }
                    return Ok((args, pos + 1));
                }
                current.push(c);
            }
            ',' if depth == 1 => {
                args.push(current.trim().to_string());
                current.clear();
            }
            _ => current.push(c),
        }
        pos += c.len_utf8();
    }

    Err(ParseError::InvalidSyntax {
        message: "macro call arguments are not closed".to_string(),
        span: crate::span::Span::empty(),
    })
}

/// Substitute `$N`, `$name` and `$*` (each optionally preceded by a
/// backslash) in the macro body.
fn substitute(key: &str, def: &MacroDef, args: &[String]) -> ParseResult<String> {
    let body = &def.body;
    let mut out = String::with_capacity(body.len());
    let mut chars = body.char_indices().peekable();

    while let Some((i, c)) = chars.next() {
        // `\$` is an escaped parameter reference; bare `$` works too.
        let dollar_at = match c {
            '\\' if body[i + 1..].starts_with('$') => {
                chars.next();
                Some(i + 2)
            }
            '$' => Some(i + 1),
            _ => None,
        };
        let Some(after) = dollar_at else {
            out.push(c);
            continue;
        };

        let rest = &body[after..];
        if rest.starts_with('*') {
            chars.next();
            out.push_str(&args.join(", "));
            continue;
        }

        let digits: String = rest.chars().take_while(char::is_ascii_digit).collect();
        if !digits.is_empty() {
            let index: usize = digits.parse().map_err(|_| ParseError::InvalidSyntax {
                message: format!("bad macro argument index in '{key}'"),
                span: crate::span::Span::empty(),
            })?;
            if index == 0 || index > args.len() {
                return Err(ParseError::MacroArity {
                    key: key.to_string(),
                    index,
                    supplied: args.len(),
                });
            }
            for _ in 0..digits.len() {
                chars.next();
            }
            out.push_str(&args[index - 1]);
            continue;
        }

        if let Some(name_end) = scan_macro_name(rest, 0) {
            let name = &rest[..name_end];
            if let Some(param_index) = def.params.iter().position(|p| p == name) {
                if param_index >= args.len() {
                    return Err(ParseError::MacroArity {
                        key: key.to_string(),
                        index: param_index + 1,
                        supplied: args.len(),
                    });
                }
                for _ in 0..name.chars().count() {
                    chars.next();
                }
                out.push_str(&args[param_index]);
                continue;
            }
        }

        // `$` that refers to nothing macro-level stays verbatim
        // (it may be a NewLang local or the `$` context listing).
        out.push('$');
    }

    Ok(out)
}
