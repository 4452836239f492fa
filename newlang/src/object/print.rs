//! Normative textual forms.
//!
//! `Display` output is the stable serialization of every value:
//! `123`, `301\3`, `'bytes'`, `"wide"`, `(1, 2,)`, `[1, 2,]:Int8`,
//! `[\n  [1, 2,], [3, 4,],\n]:Int32`, `_` for None. Pure-function
//! memoization keys reuse these forms.

use std::fmt;

use newlang_parser::{Term, TermKind};

use super::tensor::{Scalar, Tensor};
use super::{Dim, Object, Payload};

impl fmt::Display for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.payload {
            Payload::Tensor(tensor) => write_tensor(f, tensor),
            Payload::Fraction(fraction) => write!(f, "{fraction}"),
            Payload::Str(s) => match s {
                super::strings::Str::Bytes(_) => write!(f, "'{}'", s.to_text()),
                super::strings::Str::Wide(_) => write!(f, "\"{}\"", s.to_text()),
            },
            Payload::Dict(dict) => {
                let dict = dict.borrow();
                write_dict_items(f, dict.items())
            }
            Payload::Class(instance) => {
                write!(f, "{}", instance.class_name)?;
                let data = instance.data.borrow();
                write_dict_items(f, data.items())
            }
            Payload::Range(range) => {
                write!(f, "{}..{}", range.start, range.stop)?;
                if range.step.as_i64() != Some(1) {
                    write!(f, "..{}", range.step)?;
                }
                Ok(())
            }
            Payload::Iter(_) => write!(f, ":Iterator"),
            Payload::NativeFunc(func) => {
                write_prototype(f, &func.name, &func.proto)?;
                write!(f, "{{}}")
            }
            Payload::EvalFunc(func) => {
                write_prototype(f, &func.name, &func.proto)?;
                write!(f, ":={{ ... }}")
            }
            Payload::Type(value) => {
                write!(f, ":{}", value.kind.name())?;
                if !value.dims.is_empty() {
                    write!(f, "[")?;
                    for (i, dim) in value.dims.iter().enumerate() {
                        if i > 0 {
                            write!(f, ",")?;
                        }
                        match dim {
                            Dim::Fixed(n) => write!(f, "{n}")?,
                            Dim::Any => write!(f, "...")?,
                        }
                    }
                    write!(f, "]")?;
                }
                Ok(())
            }
            Payload::None => write!(f, "_"),
            Payload::Ellipsis => write!(f, "..."),
            Payload::IteratorEnd => write!(f, ":IteratorEnd"),
            Payload::Error(message) => write!(f, ":Error('{message}')"),
        }
    }
}

fn write_dict_items(
    f: &mut fmt::Formatter<'_>,
    items: &[(Option<String>, Object)],
) -> fmt::Result {
    write!(f, "(")?;
    if items.is_empty() {
        return write!(f, ",)");
    }
    for (i, (name, value)) in items.iter().enumerate() {
        if i > 0 {
            write!(f, " ")?;
        }
        match name {
            Some(name) => write!(f, "{name}={value},")?,
            None => write!(f, "{value},")?,
        }
    }
    write!(f, ")")
}

fn write_tensor(f: &mut fmt::Formatter<'_>, tensor: &Tensor) -> fmt::Result {
    if tensor.is_scalar() {
        return write_scalar(f, tensor.get(0));
    }
    write_tensor_body(f, tensor)?;
    write!(f, ":{}", tensor.kind().type_name())
}

fn write_tensor_body(f: &mut fmt::Formatter<'_>, tensor: &Tensor) -> fmt::Result {
    let shape = tensor.shape();
    if shape.len() <= 1 {
        write!(f, "[")?;
        for i in 0..tensor.len() {
            if i > 0 {
                write!(f, " ")?;
            }
            write_scalar(f, tensor.get(i))?;
            write!(f, ",")?;
        }
        return write!(f, "]");
    }
    write!(f, "[\n  ")?;
    for row in 0..shape[0] {
        if row > 0 {
            write!(f, ", ")?;
        }
        let sub = tensor.index_axis0(row as i64).map_err(|_| fmt::Error)?;
        write_tensor_body(f, &sub)?;
    }
    write!(f, ",\n]")
}

fn write_scalar(f: &mut fmt::Formatter<'_>, value: Scalar) -> fmt::Result {
    match value {
        Scalar::Int(v) => write!(f, "{v}"),
        Scalar::Float(v) => write!(f, "{}", format_float(v)),
    }
}

/// Floats print without spurious zeros: `0.1`, `123.456`, `10`.
pub(crate) fn format_float(value: f64) -> String {
    if value.is_nan() {
        return "nan".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "inf" } else { "-inf" }.to_string();
    }
    if value.fract() == 0.0 && value.abs() < 1.0e15 {
        return format!("{}", value as i64);
    }
    let mut text = format!("{value:.12}");
    while text.ends_with('0') {
        text.pop();
    }
    if text.ends_with('.') {
        text.pop();
    }
    text
}

/// Render a callable prototype: `name(arg:Type=default, ...):Ret`.
fn write_prototype(f: &mut fmt::Formatter<'_>, name: &str, proto: &Term) -> fmt::Result {
    write!(f, "{name}(")?;
    for (i, (arg_name, arg)) in proto.args.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        match arg_name {
            Some(arg_name) => {
                write!(f, "{arg_name}")?;
                if let Some(annotation) = &arg.annotation {
                    write!(f, ":{}", annotation.name)?;
                }
                write!(f, "={}", render_value(arg))?;
            }
            None => write!(f, "{}", render_term(arg))?,
        }
    }
    write!(f, ")")?;
    if let Some(annotation) = &proto.annotation {
        write!(f, ":{}", annotation.name)?;
    }
    Ok(())
}

/// Minimal source rendering for prototype fragments.
fn render_term(term: &Term) -> String {
    let mut out = render_value(term);
    if term.kind != TermKind::Ellipsis {
        if let Some(annotation) = &term.annotation {
            out.push(':');
            out.push_str(&annotation.name);
        }
    }
    out
}

/// The bare value text, annotation omitted (defaults already printed
/// their formal's type).
fn render_value(term: &Term) -> String {
    match term.kind {
        TermKind::Ellipsis => "...".to_string(),
        TermKind::StrChar => format!("'{}'", term.text),
        TermKind::StrWide => format!("\"{}\"", term.text),
        TermKind::None => "_".to_string(),
        _ => term.text.clone(),
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use crate::object::dict::DictData;
    use crate::object::fraction::Fraction;
    use crate::object::tensor::Scalar;
    use crate::types::ScalarKind;

    use super::super::Object;
    use super::*;

    #[test]
    fn scalar_forms() {
        assert_eq!(Object::int(123).to_string(), "123");
        assert_eq!(Object::float(123.456).to_string(), "123.456");
        assert_eq!(Object::float(100.0).to_string(), "100");
        assert_eq!(Object::bool_value(true).to_string(), "1");
        assert_eq!(Object::none().to_string(), "_");
    }

    #[test]
    fn string_forms_keep_their_quotes() {
        assert_eq!(Object::str_bytes("STRBYTE").to_string(), "'STRBYTE'");
        assert_eq!(Object::str_wide("STRCHAR").to_string(), "\"STRCHAR\"");
    }

    #[test]
    fn fraction_form() {
        let f = Object::fraction(Fraction::parse("301\\3").unwrap());
        assert_eq!(f.to_string(), "301\\3");
    }

    #[test]
    fn dict_forms() {
        assert_eq!(Object::dict(DictData::new()).to_string(), "(,)");

        let mut data = DictData::new();
        data.push(None, Object::int(10));
        data.push(None, Object::int(2));
        assert_eq!(Object::dict(data).to_string(), "(10, 2,)");

        let mut named = DictData::new();
        named.push(Some("a".to_string()), Object::int(1));
        named.push(None, Object::str_bytes("x"));
        assert_eq!(Object::dict(named).to_string(), "(a=1, 'x',)");
    }

    #[test]
    fn rank1_tensor_with_kind_suffix() {
        let t = Tensor::from_elements(
            ScalarKind::Bool,
            vec![4],
            vec![
                Scalar::Int(1),
                Scalar::Int(1),
                Scalar::Int(0),
                Scalar::Int(0),
            ],
        )
        .unwrap();
        assert_eq!(Object::tensor(t).to_string(), "[1, 1, 0, 0,]:Bool");
    }

    #[test]
    fn rank2_tensor_layout() {
        let t = Tensor::from_elements(
            ScalarKind::Int32,
            vec![2, 2],
            vec![
                Scalar::Int(1),
                Scalar::Int(2),
                Scalar::Int(3),
                Scalar::Int(4),
            ],
        )
        .unwrap();
        assert_eq!(
            Object::tensor(t).to_string(),
            "[\n  [1, 2,], [3, 4,],\n]:Int32"
        );
    }

    #[test]
    fn float_tensor_trims_zeros() {
        let t = Tensor::from_elements(
            ScalarKind::Float64,
            vec![3],
            vec![
                Scalar::Float(1.2),
                Scalar::Float(0.22),
                Scalar::Float(0.69),
            ],
        )
        .unwrap();
        assert_eq!(Object::tensor(t).to_string(), "[1.2, 0.22, 0.69,]:Float64");
    }

    #[test]
    fn range_form_omits_unit_step() {
        let range = crate::object::range::RangeData::new(
            Object::int(0),
            Object::int(5),
            None,
        )
        .unwrap();
        assert_eq!(Object::range(range).to_string(), "0..5");

        let stepped = crate::object::range::RangeData::new(
            Object::int(0),
            Object::int(10),
            Some(Object::int(2)),
        )
        .unwrap();
        assert_eq!(Object::range(stepped).to_string(), "0..10..2");
    }
}
