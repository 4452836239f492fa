//! Arithmetic, comparison, concatenation and indexing on [`Object`].

use std::cmp::Ordering;

use crate::error::NlError;
use crate::types::ScalarKind;

use super::dict::DictData;
use super::fraction::Fraction;
use super::tensor::{Scalar, Tensor};
use super::{Object, Payload};

impl Object {
    /// Binary arithmetic. `op` is one of `+ - * / f % p` where `f` is
    /// floor division and `p` is power; bitwise `| ^ &` and shifts
    /// `<` `>` ride the same path on integer tensors.
    pub fn arithmetic(&self, op: char, other: &Object) -> Result<Object, NlError> {
        match (&self.payload, &other.payload) {
            (Payload::Fraction(a), Payload::Fraction(b)) => fraction_op(op, a, b),
            // Mixing a fraction with an integer scalar stays exact.
            (Payload::Fraction(a), Payload::Tensor(t)) if t.is_scalar() => {
                match t.as_i64() {
                    Some(v) => fraction_op(op, a, &Fraction::from_i64(v)),
                    None => float_fraction_op(op, self, other),
                }
            }
            (Payload::Tensor(t), Payload::Fraction(b)) if t.is_scalar() => {
                match t.as_i64() {
                    Some(v) => fraction_op(op, &Fraction::from_i64(v), b),
                    None => float_fraction_op(op, self, other),
                }
            }
            // A fraction against a non-scalar tensor promotes the
            // tensor side to Float64.
            (Payload::Fraction(a), Payload::Tensor(t)) => {
                let lhs = Tensor::scalar_f64(a.to_f64(), ScalarKind::Float64)?;
                let out = lhs.binary_op(op, &t.to_kind(ScalarKind::Float64)?)?;
                Ok(Object::tensor(out))
            }
            (Payload::Tensor(t), Payload::Fraction(b)) => {
                let rhs = Tensor::scalar_f64(b.to_f64(), ScalarKind::Float64)?;
                let out = t.to_kind(ScalarKind::Float64)?.binary_op(op, &rhs)?;
                Ok(Object::tensor(out))
            }
            (Payload::Tensor(a), Payload::Tensor(b)) => {
                Ok(Object::tensor(a.binary_op(op, b)?))
            }
            _ => Err(NlError::type_error(format!(
                "'{}' is not defined for {} and {}",
                display_op(op),
                self.kind().name(),
                other.kind().name()
            ))),
        }
    }

    pub fn negate(&self) -> Result<Object, NlError> {
        match &self.payload {
            Payload::Tensor(t) => Ok(Object::tensor(t.negate()?)),
            Payload::Fraction(f) => Ok(Object::fraction(f.neg())),
            _ => Err(NlError::type_error(format!(
                "unary '-' is not defined for {}",
                self.kind().name()
            ))),
        }
    }

    /// `==` — numeric equality across kinds; containers elementwise.
    pub fn equals(&self, other: &Object) -> bool {
        match (&self.payload, &other.payload) {
            (Payload::Tensor(a), Payload::Tensor(b)) => a.value_eq(b),
            (Payload::Fraction(a), Payload::Fraction(b)) => a == b,
            (Payload::Fraction(f), Payload::Tensor(t))
            | (Payload::Tensor(t), Payload::Fraction(f)) => match t.as_i64() {
                Some(v) => *f == Fraction::from_i64(v),
                None => t.as_f64().is_some_and(|v| v == f.to_f64()),
            },
            (Payload::Str(a), Payload::Str(b)) => a.to_text() == b.to_text(),
            (Payload::Dict(a), Payload::Dict(b)) => {
                let a = a.borrow();
                let b = b.borrow();
                a.len() == b.len()
                    && a.items()
                        .iter()
                        .zip(b.items().iter())
                        .all(|((an, av), (bn, bv))| an == bn && av.equals(bv))
            }
            (Payload::None, Payload::None) => true,
            (Payload::Ellipsis, Payload::Ellipsis) => true,
            (Payload::IteratorEnd, Payload::IteratorEnd) => true,
            (Payload::Type(a), Payload::Type(b)) => a == b,
            _ => false,
        }
    }

    /// `===` — equality plus identical current kinds.
    pub fn strict_equals(&self, other: &Object) -> bool {
        self.kind() == other.kind() && self.equals(other)
    }

    /// Ordering for `<`, `<=`, `>`, `>=`, `<=>`. Defined on numeric
    /// scalars (fractions cross-multiply) and strings.
    pub fn compare_order(&self, other: &Object) -> Result<Ordering, NlError> {
        match (&self.payload, &other.payload) {
            (Payload::Fraction(a), Payload::Fraction(b)) => Ok(a.compare(b)),
            (Payload::Str(a), Payload::Str(b)) => Ok(a.compare(b)),
            _ if self.is_numeric_scalar() && other.is_numeric_scalar() => {
                let a = self.number_value()?;
                let b = other.number_value()?;
                a.partial_cmp(&b).ok_or_else(|| {
                    NlError::value("comparison with NaN is unordered".to_string())
                })
            }
            _ => Err(NlError::type_error(format!(
                "ordering is not defined for {} and {}",
                self.kind().name(),
                other.kind().name()
            ))),
        }
    }

    /// `++` — append elements.
    pub fn concat(&self, other: &Object) -> Result<Object, NlError> {
        match (&self.payload, &other.payload) {
            (Payload::Str(a), Payload::Str(b)) => Ok(Object::string(a.concat(b))),
            (Payload::Tensor(a), Payload::Tensor(b)) => Ok(Object::tensor(a.concat(b)?)),
            (Payload::Dict(a), Payload::Dict(b)) => {
                let mut out = a.borrow().clone();
                out.append_all(&b.borrow());
                Ok(Object::dict(out))
            }
            _ => Err(NlError::type_error(format!(
                "'++' is not defined for {} and {}",
                self.kind().name(),
                other.kind().name()
            ))),
        }
    }

    /// `obj[indices...]`.
    pub fn index_get(&self, indices: &[Object]) -> Result<Object, NlError> {
        match &self.payload {
            Payload::Str(s) => {
                let [index] = indices else {
                    return Err(NlError::runtime(
                        "strings take exactly one index".to_string(),
                    ));
                };
                match &index.payload {
                    Payload::Range(range) => {
                        let (from, to, step) = range.slice_bounds(s.len())?;
                        let mut out: Option<super::strings::Str> = None;
                        let mut i = from;
                        while (step > 0 && i < to) || (step < 0 && i > to) {
                            let unit = s.get(i)?;
                            out = Some(match out {
                                Some(acc) => acc.concat(&unit),
                                None => unit,
                            });
                            i += step;
                        }
                        Ok(Object::string(out.unwrap_or_else(|| match s {
                            super::strings::Str::Bytes(_) => super::strings::Str::Bytes(vec![]),
                            super::strings::Str::Wide(_) => super::strings::Str::Wide(vec![]),
                        })))
                    }
                    _ => {
                        let i = index_int(index)?;
                        Ok(Object::string(s.get(i)?))
                    }
                }
            }
            Payload::Dict(_) | Payload::Class(_) => {
                let dict = self.as_dict_ref().expect("dict payload");
                let [index] = indices else {
                    return Err(NlError::runtime(
                        "dictionaries take exactly one index".to_string(),
                    ));
                };
                match &index.payload {
                    Payload::Str(name) => dict.borrow().get_by_name(&name.to_text()),
                    Payload::Range(range) => {
                        let len = dict.borrow().len();
                        let (from, to, step) = range.slice_bounds(len)?;
                        let mut out = DictData::new();
                        let mut i = from;
                        while (step > 0 && i < to) || (step < 0 && i > to) {
                            let value = dict.borrow().get_by_index(i)?;
                            let name = dict.borrow().name_at(i as usize).map(str::to_string);
                            out.push(name, value);
                            i += step;
                        }
                        Ok(Object::dict(out))
                    }
                    _ => dict.borrow().get_by_index(index_int(index)?),
                }
            }
            Payload::Tensor(tensor) => {
                let mut current = tensor.clone();
                let mut axes_left = current.shape().len();
                for index in indices {
                    match &index.payload {
                        // `...` leaves the remaining axes intact
                        Payload::Ellipsis => break,
                        // `_` inserts a new axis of extent 1
                        Payload::None => {
                            let mut shape = vec![1];
                            shape.extend_from_slice(current.shape());
                            current = current.reshape(shape)?;
                        }
                        Payload::Range(range) => {
                            let dim = current.shape().first().copied().unwrap_or(0);
                            let (from, to, step) = range.slice_bounds(dim)?;
                            current = current.slice_axis0(from, to, step)?;
                        }
                        _ => {
                            if axes_left == 0 {
                                return Err(NlError::runtime(
                                    "too many indices for tensor".to_string(),
                                ));
                            }
                            current = current.index_axis0(index_int(index)?)?;
                            axes_left -= 1;
                        }
                    }
                }
                Ok(Object::tensor(current))
            }
            _ => Err(NlError::type_error(format!(
                "{} is not indexable",
                self.kind().name()
            ))),
        }
    }

    /// `obj[indices...] = value` — strings and tensors mutate in
    /// place; dictionaries replace the element.
    pub fn index_set(&mut self, indices: &[Object], value: &Object) -> Result<(), NlError> {
        // Dictionaries and class instances share storage through the
        // ref; handle them before taking the payload mutably.
        if let Some(dict) = self.as_dict_ref() {
            let [index] = indices else {
                return Err(NlError::runtime(
                    "dictionaries take exactly one index".to_string(),
                ));
            };
            return match &index.payload {
                Payload::Str(name) => {
                    dict.borrow_mut().set_by_name(&name.to_text(), value.clone());
                    Ok(())
                }
                _ => dict
                    .borrow_mut()
                    .set_by_index(index_int(index)?, value.clone()),
            };
        }

        match &mut self.payload {
            Payload::Str(s) => {
                let [index] = indices else {
                    return Err(NlError::runtime(
                        "strings take exactly one index".to_string(),
                    ));
                };
                let i = index_int(index)?;
                if let Some(unit) = value.as_str() {
                    s.set(i, unit)
                } else if let Some(code) = value.as_i64() {
                    s.set_from_code(i, code)
                } else {
                    Err(NlError::type_error(format!(
                        "cannot write {} into a string element",
                        value.kind().name()
                    )))
                }
            }
            Payload::Tensor(tensor) => {
                let flat = flatten_index(tensor, indices)?;
                let scalar = value
                    .as_tensor()
                    .and_then(Tensor::scalar_value)
                    .ok_or_else(|| {
                        NlError::type_error("tensor elements take numeric scalars".to_string())
                    })?;
                tensor.set(flat, scalar)
            }
            _ => Err(NlError::type_error(format!(
                "{} is not index-assignable",
                self.kind().name()
            ))),
        }
    }

    /// `obj.name` — equivalent to `obj["name"]` on dictionaries and
    /// class instances.
    pub fn field_get(&self, name: &str) -> Result<Object, NlError> {
        let dict = self.as_dict_ref().ok_or_else(|| {
            NlError::type_error(format!("{} has no fields", self.kind().name()))
        })?;
        let out = dict.borrow().get_by_name(name);
        out
    }

    pub fn field_set(&mut self, name: &str, value: Object) -> Result<(), NlError> {
        let dict = self.as_dict_ref().ok_or_else(|| {
            NlError::type_error(format!("{} has no fields", self.kind().name()))
        })?;
        dict.borrow_mut().set_by_name(name, value);
        Ok(())
    }
}

/// Integer value of an index object.
fn index_int(index: &Object) -> Result<i64, NlError> {
    index
        .as_i64()
        .ok_or_else(|| NlError::type_error(format!("{} is not an index", index.kind().name())))
}

/// Resolve a full multi-axis index to a flat offset.
fn flatten_index(tensor: &Tensor, indices: &[Object]) -> Result<usize, NlError> {
    let shape = tensor.shape();
    if indices.len() != shape.len().max(1) {
        return Err(NlError::runtime(format!(
            "expected {} indices, got {}",
            shape.len().max(1),
            indices.len()
        )));
    }
    if shape.is_empty() {
        let i = index_int(&indices[0])?;
        if i != 0 {
            return Err(NlError::runtime(format!(
                "index {i} out of range for a scalar"
            )));
        }
        return Ok(0);
    }
    let mut flat = 0usize;
    for (index, dim) in indices.iter().zip(shape.iter()) {
        let dim = *dim as i64;
        let mut i = index_int(index)?;
        if i < 0 {
            i += dim;
        }
        if i < 0 || i >= dim {
            return Err(NlError::runtime(format!(
                "index {i} out of range for axis of {dim}"
            )));
        }
        flat = flat * dim as usize + i as usize;
    }
    Ok(flat)
}

/// Exact fraction arithmetic.
fn fraction_op(op: char, a: &Fraction, b: &Fraction) -> Result<Object, NlError> {
    let out = match op {
        '+' => a.add(b),
        '-' => a.sub(b),
        '*' => a.mul(b),
        '/' => a.div(b)?,
        'f' => a.floor_div(b)?,
        '%' => a.modulo(b)?,
        'p' => {
            let exp = b
                .to_f64()
                .fract()
                .eq(&0.0)
                .then(|| b.to_f64() as i64)
                .ok_or_else(|| {
                    NlError::value("fraction power takes an integer exponent".to_string())
                })?;
            a.pow(exp)?
        }
        _ => {
            return Err(NlError::type_error(format!(
                "'{}' is not defined for fractions",
                display_op(op)
            )));
        }
    };
    Ok(Object::fraction(out))
}

/// Fraction next to a float scalar: fall back to Float64 arithmetic.
fn float_fraction_op(op: char, a: &Object, b: &Object) -> Result<Object, NlError> {
    let lhs = Tensor::scalar_f64(a.number_value()?, ScalarKind::Float64)?;
    let rhs = Tensor::scalar_f64(b.number_value()?, ScalarKind::Float64)?;
    Ok(Object::tensor(lhs.binary_op(op, &rhs)?))
}

fn display_op(op: char) -> &'static str {
    match op {
        '+' => "+",
        '-' => "-",
        '*' => "*",
        '/' => "/",
        'f' => "//",
        '%' => "%",
        'p' => "**",
        '|' => "|",
        '^' => "^",
        '&' => "&",
        '<' => "<<",
        '>' => ">>",
        _ => "?",
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use crate::types::NlType;

    use super::*;

    #[test]
    fn fraction_plus_fraction_is_exact() {
        let a = Object::fraction(Fraction::parse("100\\1").unwrap());
        let b = Object::fraction(Fraction::parse("1\\3").unwrap());
        let sum = a.arithmetic('+', &b).unwrap();
        assert_eq!(sum.as_fraction().unwrap().to_string(), "301\\3");
    }

    #[test]
    fn fraction_with_integer_stays_exact() {
        let a = Object::fraction(Fraction::parse("1\\3").unwrap());
        let sum = a.arithmetic('+', &Object::int(1)).unwrap();
        assert_eq!(sum.as_fraction().unwrap().to_string(), "4\\3");
    }

    #[test]
    fn fraction_floor_division_and_modulo_stay_exact() {
        let half = Object::fraction(Fraction::parse("1\\2").unwrap());
        let third = Object::fraction(Fraction::parse("1\\3").unwrap());

        let quotient = half.arithmetic('f', &third).unwrap();
        assert_eq!(quotient.as_fraction().unwrap().to_string(), "1\\1");

        let remainder = half.arithmetic('%', &third).unwrap();
        assert_eq!(remainder.as_fraction().unwrap().to_string(), "1\\6");

        // mixed with an integer scalar stays on the exact path
        let quotient = Object::fraction(Fraction::parse("7\\2").unwrap())
            .arithmetic('f', &Object::int(2))
            .unwrap();
        assert_eq!(quotient.as_fraction().unwrap().to_string(), "1\\1");
    }

    #[test]
    fn equality_across_kinds() {
        assert!(Object::int(5).equals(&Object::float(5.0)));
        assert!(!Object::int(5).strict_equals(&Object::float(5.0)));
        assert!(Object::int(5).strict_equals(&Object::int(5)));
        assert!(Object::str_bytes("a").equals(&Object::str_wide("a")));
        assert!(!Object::str_bytes("a").strict_equals(&Object::str_wide("a")));
    }

    #[test]
    fn equality_implies_structural_compat() {
        // `a == b` pairs always share a common comparable form
        let a = Object::int(7);
        let b = Object::int_typed(7, ScalarKind::Int32).unwrap();
        assert!(a.equals(&b));
        assert_eq!(b.kind(), NlType::Int32);
    }

    #[test]
    fn ordering_on_fractions_and_strings() {
        let third = Object::fraction(Fraction::parse("1\\3").unwrap());
        let half = Object::fraction(Fraction::parse("1\\2").unwrap());
        assert_eq!(third.compare_order(&half).unwrap(), Ordering::Less);

        let a = Object::str_bytes("abc");
        let b = Object::str_bytes("abd");
        assert_eq!(a.compare_order(&b).unwrap(), Ordering::Less);

        assert!(Object::dict(DictData::new())
            .compare_order(&Object::int(1))
            .is_err());
    }

    #[test]
    fn concat_strings_tensors_dicts() {
        let s = Object::str_bytes("ab").concat(&Object::str_bytes("cd")).unwrap();
        assert_eq!(s.as_str().unwrap().to_text(), "abcd");

        let t = Object::int(1).concat(&Object::int(2)).unwrap();
        assert_eq!(t.as_tensor().unwrap().shape(), &[2]);

        let mut d1 = DictData::new();
        d1.push(None, Object::int(1));
        let mut d2 = DictData::new();
        d2.push(Some("x".to_string()), Object::int(2));
        let joined = Object::dict(d1).concat(&Object::dict(d2)).unwrap();
        assert_eq!(joined.as_dict_ref().unwrap().borrow().len(), 2);
    }

    #[test]
    fn string_index_out_of_range_throws() {
        let s = Object::str_bytes("abc");
        assert!(s.index_get(&[Object::int(5)]).is_err());
    }

    #[test]
    fn dict_named_and_positional_indexing() {
        let mut data = DictData::new();
        data.push(Some("a".to_string()), Object::int(1));
        data.push(None, Object::int(2));
        let dict = Object::dict(data);

        assert_eq!(
            dict.index_get(&[Object::str_bytes("a")]).unwrap().as_i64(),
            Some(1)
        );
        assert_eq!(dict.index_get(&[Object::int(1)]).unwrap().as_i64(), Some(2));
    }

    #[test]
    fn tensor_multi_axis_get_and_set() {
        let tensor = Tensor::from_elements(
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
        let mut obj = Object::tensor(tensor);

        let got = obj.index_get(&[Object::int(1), Object::int(0)]).unwrap();
        assert_eq!(got.as_i64(), Some(3));

        // fewer indices than axes leaves trailing axes intact
        let row = obj.index_get(&[Object::int(0)]).unwrap();
        assert_eq!(row.as_tensor().unwrap().shape(), &[2]);

        obj.index_set(&[Object::int(1), Object::int(1)], &Object::int(9))
            .unwrap();
        let got = obj.index_get(&[Object::int(1), Object::int(1)]).unwrap();
        assert_eq!(got.as_i64(), Some(9));
    }

    #[test]
    fn field_access_mirrors_named_index() {
        let mut data = DictData::new();
        data.push(Some("speed".to_string()), Object::int(88));
        let obj = Object::dict(data);
        assert_eq!(obj.field_get("speed").unwrap().as_i64(), Some(88));
        assert!(obj.field_get("missing").is_err());
    }
}
