//! Byte and wide string values.
//!
//! Byte strings (`'...'`) index by byte; wide strings (`"..."`) index
//! by Unicode codepoint. Out-of-range indexing raises, it never clamps.

use crate::error::NlError;
use crate::types::NlType;

/// String payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Str {
    Bytes(Vec<u8>),
    Wide(Vec<char>),
}

impl Str {
    pub fn bytes(text: &str) -> Str {
        Str::Bytes(text.as_bytes().to_vec())
    }

    pub fn wide(text: &str) -> Str {
        Str::Wide(text.chars().collect())
    }

    pub fn kind(&self) -> NlType {
        match self {
            Str::Bytes(_) => NlType::StrChar,
            Str::Wide(_) => NlType::StrWide,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Str::Bytes(bytes) => bytes.len(),
            Str::Wide(chars) => chars.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Lossy text view (byte strings decode as UTF-8).
    pub fn to_text(&self) -> String {
        match self {
            Str::Bytes(bytes) => String::from_utf8_lossy(bytes).into_owned(),
            Str::Wide(chars) => chars.iter().collect(),
        }
    }

    fn checked_index(&self, index: i64) -> Result<usize, NlError> {
        let len = self.len() as i64;
        let resolved = if index < 0 { len + index } else { index };
        if resolved < 0 || resolved >= len {
            return Err(NlError::runtime(format!(
                "string index {index} out of range for length {len}"
            )));
        }
        Ok(resolved as usize)
    }

    /// One code unit as a string of the same kind.
    pub fn get(&self, index: i64) -> Result<Str, NlError> {
        let index = self.checked_index(index)?;
        Ok(match self {
            Str::Bytes(bytes) => Str::Bytes(vec![bytes[index]]),
            Str::Wide(chars) => Str::Wide(vec![chars[index]]),
        })
    }

    /// Mutate one code unit from a one-element string or a codepoint.
    pub fn set(&mut self, index: i64, value: &Str) -> Result<(), NlError> {
        let index = self.checked_index(index)?;
        if value.len() != 1 {
            return Err(NlError::value(format!(
                "expected a single code unit, got {} of them",
                value.len()
            )));
        }
        match (self, value) {
            (Str::Bytes(bytes), Str::Bytes(unit)) => bytes[index] = unit[0],
            (Str::Wide(chars), Str::Wide(unit)) => chars[index] = unit[0],
            (Str::Bytes(bytes), Str::Wide(unit)) => {
                let c = unit[0];
                if !c.is_ascii() {
                    return Err(NlError::value(format!(
                        "'{c}' does not fit a byte string element"
                    )));
                }
                bytes[index] = c as u8;
            }
            (Str::Wide(chars), Str::Bytes(unit)) => chars[index] = unit[0] as char,
        }
        Ok(())
    }

    pub fn set_from_code(&mut self, index: i64, code: i64) -> Result<(), NlError> {
        let index = self.checked_index(index)?;
        match self {
            Str::Bytes(bytes) => {
                let code = u8::try_from(code)
                    .map_err(|_| NlError::value(format!("{code} does not fit a byte")))?;
                bytes[index] = code;
            }
            Str::Wide(chars) => {
                let code = u32::try_from(code)
                    .ok()
                    .and_then(char::from_u32)
                    .ok_or_else(|| NlError::value(format!("{code} is not a codepoint")))?;
                chars[index] = code;
            }
        }
        Ok(())
    }

    /// Concatenation; a mixed pair widens to a wide string.
    pub fn concat(&self, other: &Str) -> Str {
        match (self, other) {
            (Str::Bytes(a), Str::Bytes(b)) => {
                let mut out = a.clone();
                out.extend_from_slice(b);
                Str::Bytes(out)
            }
            _ => {
                let mut out: Vec<char> = self.to_text().chars().collect();
                out.extend(other.to_text().chars());
                Str::Wide(out)
            }
        }
    }

    pub fn compare(&self, other: &Str) -> std::cmp::Ordering {
        self.to_text().cmp(&other.to_text())
    }

    pub fn to_upper(&self) -> Str {
        match self {
            Str::Bytes(bytes) => Str::Bytes(bytes.iter().map(|b| b.to_ascii_uppercase()).collect()),
            Str::Wide(chars) => Str::Wide(
                chars
                    .iter()
                    .flat_map(|c| c.to_uppercase())
                    .collect(),
            ),
        }
    }

    pub fn to_lower(&self) -> Str {
        match self {
            Str::Bytes(bytes) => Str::Bytes(bytes.iter().map(|b| b.to_ascii_lowercase()).collect()),
            Str::Wide(chars) => Str::Wide(
                chars
                    .iter()
                    .flat_map(|c| c.to_lowercase())
                    .collect(),
            ),
        }
    }

    /// `$N` / `${name}` substitution used when a string is called.
    pub fn format(&self, positional: &[String], named: &[(String, String)]) -> Str {
        let text = self.to_text();
        let mut out = String::with_capacity(text.len());
        let mut chars = text.chars().peekable();

        while let Some(c) = chars.next() {
            if c != '$' {
                out.push(c);
                continue;
            }
            match chars.peek() {
                Some('{') => {
                    chars.next();
                    let mut name = String::new();
                    let mut closed = false;
                    for c in chars.by_ref() {
                        if c == '}' {
                            closed = true;
                            break;
                        }
                        name.push(c);
                    }
                    match named.iter().find(|(n, _)| *n == name) {
                        Some((_, value)) if closed => out.push_str(value),
                        _ => {
                            out.push_str("${");
                            out.push_str(&name);
                            if closed {
                                out.push('}');
                            }
                        }
                    }
                }
                Some(d) if d.is_ascii_digit() => {
                    let mut digits = String::new();
                    while let Some(d) = chars.peek() {
                        if d.is_ascii_digit() {
                            digits.push(*d);
                            chars.next();
                        } else {
                            break;
                        }
                    }
                    let index: usize = digits.parse().unwrap_or(0);
                    if index >= 1 && index <= positional.len() {
                        out.push_str(&positional[index - 1]);
                    } else {
                        out.push('$');
                        out.push_str(&digits);
                    }
                }
                _ => out.push('$'),
            }
        }

        match self {
            Str::Bytes(_) => Str::Bytes(out.into_bytes()),
            Str::Wide(_) => Str::Wide(out.chars().collect()),
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn element_access_by_kind() {
        let byte = Str::bytes("byte");
        assert_eq!(byte.get(0).unwrap().to_text(), "b");
        assert_eq!(byte.get(3).unwrap().to_text(), "e");
        assert_eq!(byte.get(-1).unwrap().to_text(), "e");

        let wide = Str::wide("строка");
        assert_eq!(wide.len(), 6);
        assert_eq!(wide.get(0).unwrap().to_text(), "с");
        assert_eq!(wide.get(5).unwrap().to_text(), "а");
    }

    #[test]
    fn out_of_range_throws() {
        let s = Str::bytes("abc");
        assert!(s.get(3).is_err());
        assert!(s.get(-4).is_err());
    }

    #[test]
    fn set_index_mutates_one_unit() {
        let mut s = Str::bytes("byte");
        s.set(0, &Str::bytes("B")).unwrap();
        s.set(1, &Str::bytes("Y")).unwrap();
        assert_eq!(s.to_text(), "BYte");

        let mut wide = Str::wide("строка");
        wide.set(0, &Str::wide("С")).unwrap();
        assert_eq!(wide.to_text(), "Строка");
    }

    #[test]
    fn concat_mixed_widens() {
        let out = Str::bytes("ab").concat(&Str::wide("кц"));
        assert_eq!(out.kind(), NlType::StrWide);
        assert_eq!(out.to_text(), "abкц");

        let out = Str::bytes("ab").concat(&Str::bytes("cd"));
        assert_eq!(out.kind(), NlType::StrChar);
    }

    #[test]
    fn case_mapping_is_unicode_aware_on_wide() {
        assert_eq!(Str::wide("строка").to_upper().to_text(), "СТРОКА");
        assert_eq!(Str::bytes("BYTE").to_lower().to_text(), "byte");
    }

    #[test]
    fn format_substitutes_positional_and_named() {
        let template = Str::wide("$1 $2 ${name}");
        let out = template.format(&["100".into(), "-1".into()], &[]);
        assert_eq!(out.to_text(), "100 -1 ${name}");

        let out = template.format(
            &["a".into(), "b".into()],
            &[("name".to_string(), "value".to_string())],
        );
        assert_eq!(out.to_text(), "a b value");
    }

    #[test]
    fn format_leaves_unknown_placeholders() {
        let template = Str::bytes("$1 $9 $x");
        let out = template.format(&["one".into()], &[]);
        assert_eq!(out.to_text(), "one $9 $x");
    }
}
