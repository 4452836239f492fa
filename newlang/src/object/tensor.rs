//! N-dimensional tensor values with scalar-typed storage.
//!
//! Integer kinds share one `i64` pool and float kinds one `f64` pool;
//! the element kind decides bounds checks, printing and conversions.
//! A tensor may also be backed by foreign memory (`:Pointer` globals),
//! in which case reads and writes go through the raw pointer with the
//! declared element kind.

use crate::error::NlError;
use crate::types::ScalarKind;

/// One element value, untyped until paired with a [`ScalarKind`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Scalar {
    Int(i64),
    Float(f64),
}

impl Scalar {
    pub fn as_f64(&self) -> f64 {
        match self {
            Scalar::Int(v) => *v as f64,
            Scalar::Float(v) => *v,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Scalar::Int(v) => Some(*v),
            Scalar::Float(v) => {
                if v.fract() == 0.0 && v.abs() < 9.0e18 {
                    Some(*v as i64)
                } else {
                    None
                }
            }
        }
    }

    pub fn is_zero(&self) -> bool {
        match self {
            Scalar::Int(v) => *v == 0,
            Scalar::Float(v) => *v == 0.0,
        }
    }

    /// Exact numeric equality across integer and float carriers.
    pub fn value_eq(&self, other: &Scalar) -> bool {
        match (self, other) {
            (Scalar::Int(a), Scalar::Int(b)) => a == b,
            (Scalar::Float(a), Scalar::Float(b)) => a == b,
            (Scalar::Int(a), Scalar::Float(b)) | (Scalar::Float(b), Scalar::Int(a)) => {
                b.fract() == 0.0 && *a as f64 == *b
            }
        }
    }

    pub fn partial_cmp_value(&self, other: &Scalar) -> Option<std::cmp::Ordering> {
        self.as_f64().partial_cmp(&other.as_f64())
    }
}

/// Foreign memory backing a pointer tensor.
#[derive(Debug, Clone, Copy)]
pub struct ForeignBuf {
    pub ptr: *mut std::ffi::c_void,
    pub len: usize,
}

/// Element storage.
#[derive(Debug, Clone)]
pub enum Store {
    Ints(Vec<i64>),
    Floats(Vec<f64>),
    Foreign(ForeignBuf),
}

/// N-d array; an empty shape denotes a scalar.
#[derive(Debug, Clone)]
pub struct Tensor {
    kind: ScalarKind,
    shape: Vec<usize>,
    store: Store,
}

impl Tensor {
    /// Integer scalar of the given kind; fails when the value does not fit.
    pub fn scalar_i64(value: i64, kind: ScalarKind) -> Result<Tensor, NlError> {
        check_fits(value, kind)?;
        if kind.is_float() {
            return Ok(Tensor {
                kind,
                shape: Vec::new(),
                store: Store::Floats(vec![store_float(value as f64, kind)]),
            });
        }
        Ok(Tensor {
            kind,
            shape: Vec::new(),
            store: Store::Ints(vec![value]),
        })
    }

    /// Integer scalar with the narrowest inferred kind.
    pub fn scalar_int(value: i64) -> Tensor {
        Tensor {
            kind: ScalarKind::narrowest_int(value),
            shape: Vec::new(),
            store: Store::Ints(vec![value]),
        }
    }

    pub fn scalar_f64(value: f64, kind: ScalarKind) -> Result<Tensor, NlError> {
        if kind.is_integer() {
            if value.fract() != 0.0 {
                return Err(NlError::value(format!(
                    "{value} has a fractional part and cannot become {}",
                    kind.type_name()
                )));
            }
            return Tensor::scalar_i64(value as i64, kind);
        }
        Ok(Tensor {
            kind,
            shape: Vec::new(),
            store: Store::Floats(vec![store_float(value, kind)]),
        })
    }

    pub fn scalar_bool(value: bool) -> Tensor {
        Tensor {
            kind: ScalarKind::Bool,
            shape: Vec::new(),
            store: Store::Ints(vec![i64::from(value)]),
        }
    }

    /// Build from row-major elements; the element count must match the
    /// shape product and every value must fit `kind`.
    pub fn from_elements(
        kind: ScalarKind,
        shape: Vec<usize>,
        elements: Vec<Scalar>,
    ) -> Result<Tensor, NlError> {
        let expected: usize = shape.iter().product();
        if elements.len() != expected {
            return Err(NlError::value(format!(
                "shape {shape:?} needs {expected} elements, got {}",
                elements.len()
            )));
        }
        if kind.is_float() {
            let values = elements
                .iter()
                .map(|s| store_float(s.as_f64(), kind))
                .collect();
            return Ok(Tensor {
                kind,
                shape,
                store: Store::Floats(values),
            });
        }
        let mut values = Vec::with_capacity(elements.len());
        for element in &elements {
            let v = element.as_i64().ok_or_else(|| {
                NlError::value(format!(
                    "{} is not exact for {}",
                    element.as_f64(),
                    kind.type_name()
                ))
            })?;
            check_fits(v, kind)?;
            values.push(v);
        }
        Ok(Tensor {
            kind,
            shape,
            store: Store::Ints(values),
        })
    }

    /// Foreign-backed tensor over `len` elements at `ptr`.
    pub fn foreign(ptr: *mut std::ffi::c_void, len: usize, kind: ScalarKind) -> Tensor {
        let shape = if len == 1 { Vec::new() } else { vec![len] };
        Tensor {
            kind,
            shape,
            store: Store::Foreign(ForeignBuf { ptr, len }),
        }
    }

    pub fn kind(&self) -> ScalarKind {
        self.kind
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub fn is_scalar(&self) -> bool {
        self.shape.is_empty()
    }

    pub fn is_foreign(&self) -> bool {
        matches!(self.store, Store::Foreign(_))
    }

    /// Element count; the empty product makes a scalar count as 1.
    pub fn len(&self) -> usize {
        self.shape.iter().product()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Element at a row-major flat index.
    pub fn get(&self, index: usize) -> Scalar {
        match &self.store {
            Store::Ints(values) => Scalar::Int(values[index]),
            Store::Floats(values) => Scalar::Float(values[index]),
            Store::Foreign(buf) => read_foreign(buf, self.kind, index),
        }
    }

    /// Write one element, enforcing the element kind.
    pub fn set(&mut self, index: usize, value: Scalar) -> Result<(), NlError> {
        if index >= self.len() {
            return Err(NlError::runtime(format!(
                "index {index} out of range for {} elements",
                self.len()
            )));
        }
        let kind = self.kind;
        match &mut self.store {
            Store::Ints(values) => {
                let v = value.as_i64().ok_or_else(|| {
                    NlError::value(format!(
                        "{} is not exact for {}",
                        value.as_f64(),
                        kind.type_name()
                    ))
                })?;
                check_fits(v, kind)?;
                values[index] = v;
            }
            Store::Floats(values) => values[index] = store_float(value.as_f64(), kind),
            Store::Foreign(buf) => write_foreign(buf, kind, index, value)?,
        }
        Ok(())
    }

    /// All elements in row-major order.
    pub fn elements(&self) -> Vec<Scalar> {
        (0..self.len()).map(|i| self.get(i)).collect()
    }

    /// The single element of a scalar tensor.
    pub fn scalar_value(&self) -> Option<Scalar> {
        self.is_scalar().then(|| self.get(0))
    }

    pub fn as_i64(&self) -> Option<i64> {
        self.scalar_value().and_then(|s| s.as_i64())
    }

    pub fn as_f64(&self) -> Option<f64> {
        self.scalar_value().map(|s| s.as_f64())
    }

    /// Truthiness: a scalar is non-zero; a tensor is non-empty with at
    /// least one non-zero element.
    pub fn is_truthy(&self) -> bool {
        if self.is_scalar() {
            return !self.get(0).is_zero();
        }
        (0..self.len()).any(|i| !self.get(i).is_zero())
    }

    /// Convert to another element kind; narrowing must fit exactly.
    pub fn to_kind(&self, kind: ScalarKind) -> Result<Tensor, NlError> {
        Tensor::from_elements(kind, self.shape.clone(), self.elements())
    }

    /// Elementwise binary arithmetic. Operands must have equal shapes
    /// or one of them must be a scalar.
    pub fn binary_op(&self, op: char, other: &Tensor) -> Result<Tensor, NlError> {
        let shape = self.merged_shape(other)?;
        let kind = result_kind(op, self.kind, other.kind);
        let count: usize = shape.iter().product();

        let mut elements = Vec::with_capacity(count);
        for i in 0..count {
            let a = self.broadcast_get(i);
            let b = other.broadcast_get(i);
            elements.push(apply_op(op, a, b, kind)?);
        }
        // Integer results widen to whatever kind the values now need,
        // so 120 + 120 lands in Int16 instead of overflowing Int8.
        let kind = if kind.is_integer() {
            elements.iter().fold(kind, |k, s| match s {
                Scalar::Int(v) => k.max(ScalarKind::narrowest_int(*v)),
                Scalar::Float(_) => k,
            })
        } else {
            kind
        };
        Tensor::from_elements(kind, shape, elements)
    }

    fn merged_shape(&self, other: &Tensor) -> Result<Vec<usize>, NlError> {
        if self.is_scalar() {
            return Ok(other.shape.clone());
        }
        if other.is_scalar() || self.shape == other.shape {
            return Ok(self.shape.clone());
        }
        Err(NlError::runtime(format!(
            "shape mismatch: {:?} vs {:?}",
            self.shape, other.shape
        )))
    }

    fn broadcast_get(&self, index: usize) -> Scalar {
        if self.is_scalar() {
            self.get(0)
        } else {
            self.get(index)
        }
    }

    pub fn negate(&self) -> Result<Tensor, NlError> {
        let elements = self
            .elements()
            .into_iter()
            .map(|s| match s {
                Scalar::Int(v) => Scalar::Int(-v),
                Scalar::Float(v) => Scalar::Float(-v),
            })
            .collect();
        let kind = if self.kind == ScalarKind::Bool {
            ScalarKind::Int8
        } else {
            self.kind
        };
        Tensor::from_elements(kind, self.shape.clone(), elements)
    }

    /// Whole-tensor exact equality (shape and every element).
    pub fn value_eq(&self, other: &Tensor) -> bool {
        let shapes_match = self.shape == other.shape
            || (self.is_scalar() && other.len() == 1)
            || (other.is_scalar() && self.len() == 1);
        if !shapes_match {
            return false;
        }
        let count = self.len().max(1);
        (0..count).all(|i| self.broadcast_get(i).value_eq(&other.broadcast_get(i)))
    }

    /// Concatenate along axis 0; shapes beyond axis 0 must match.
    /// Scalars concatenate as one-element vectors.
    pub fn concat(&self, other: &Tensor) -> Result<Tensor, NlError> {
        let a_shape = self.vector_shape();
        let b_shape = other.vector_shape();
        if a_shape[1..] != b_shape[1..] {
            return Err(NlError::runtime(format!(
                "cannot concatenate shapes {:?} and {:?}",
                self.shape, other.shape
            )));
        }
        let mut shape = a_shape.clone();
        shape[0] = a_shape[0] + b_shape[0];
        let kind = ScalarKind::promote(self.kind, other.kind);
        let mut elements = self.elements();
        elements.extend(other.elements());
        Tensor::from_elements(kind, shape, elements)
    }

    fn vector_shape(&self) -> Vec<usize> {
        if self.is_scalar() {
            vec![1]
        } else {
            self.shape.clone()
        }
    }

    /// Sub-tensor at an axis-0 position; scalar for rank-1 input.
    pub fn index_axis0(&self, index: i64) -> Result<Tensor, NlError> {
        let dim = *self.shape.first().ok_or_else(|| {
            NlError::runtime("cannot index a scalar tensor".to_string())
        })? as i64;
        let index = if index < 0 { dim + index } else { index };
        if index < 0 || index >= dim {
            return Err(NlError::runtime(format!(
                "index {index} out of range for axis of {dim}"
            )));
        }
        let rest: usize = self.shape[1..].iter().product::<usize>().max(1);
        let start = index as usize * rest;
        let elements = (start..start + rest).map(|i| self.get(i)).collect();
        let shape = self.shape[1..].to_vec();
        Tensor::from_elements(self.kind, shape, elements)
    }

    /// Axis-0 slice over half-open `[from, to)`.
    pub fn slice_axis0(&self, from: i64, to: i64, step: i64) -> Result<Tensor, NlError> {
        if step == 0 {
            return Err(NlError::value("slice step must not be zero".to_string()));
        }
        let dim = *self.shape.first().ok_or_else(|| {
            NlError::runtime("cannot slice a scalar tensor".to_string())
        })? as i64;
        let rest: usize = self.shape[1..].iter().product::<usize>().max(1);

        let mut rows = Vec::new();
        let mut i = from;
        while (step > 0 && i < to) || (step < 0 && i > to) {
            if i < 0 || i >= dim {
                return Err(NlError::runtime(format!(
                    "slice index {i} out of range for axis of {dim}"
                )));
            }
            rows.push(i as usize);
            i += step;
        }

        let mut elements = Vec::with_capacity(rows.len() * rest);
        for row in &rows {
            let start = row * rest;
            elements.extend((start..start + rest).map(|i| self.get(i)));
        }
        let mut shape = self.shape.clone();
        shape[0] = rows.len();
        Tensor::from_elements(self.kind, shape, elements)
    }

    /// Reshape in place (row-major), keeping the element count.
    pub fn reshape(&self, shape: Vec<usize>) -> Result<Tensor, NlError> {
        let expected: usize = shape.iter().product();
        if expected != self.len().max(1) {
            return Err(NlError::value(format!(
                "cannot reshape {} elements into {shape:?}",
                self.len()
            )));
        }
        Tensor::from_elements(self.kind, shape, self.elements())
    }
}

/// Result kind for an arithmetic op, honoring the float-division rule.
fn result_kind(op: char, a: ScalarKind, b: ScalarKind) -> ScalarKind {
    let promoted = ScalarKind::promote(a, b);
    match op {
        // `/` of two integers yields Float64
        '/' if promoted.is_integer() => ScalarKind::Float64,
        // shifts escape the narrow kinds
        '<' | '>' if promoted.is_integer() => ScalarKind::Int64,
        // power grows fast; give integer results the full width
        'p' if promoted.is_integer() => ScalarKind::Int64,
        _ => promoted,
    }
}

/// Apply one scalar op; `f` is floor division, `p` is power,
/// `<`/`>` are shifts.
fn apply_op(op: char, a: Scalar, b: Scalar, kind: ScalarKind) -> Result<Scalar, NlError> {
    if kind.is_integer() && op != '/' {
        let (Some(x), Some(y)) = (a.as_i64(), b.as_i64()) else {
            return float_op(op, a.as_f64(), b.as_f64());
        };
        return int_op(op, x, y);
    }
    float_op(op, a.as_f64(), b.as_f64())
}

fn int_op(op: char, a: i64, b: i64) -> Result<Scalar, NlError> {
    let out = match op {
        '+' => a.checked_add(b),
        '-' => a.checked_sub(b),
        '*' => a.checked_mul(b),
        'f' => {
            if b == 0 {
                return Err(NlError::value("integer division by zero".to_string()));
            }
            floor_div_i64(a, b)
        }
        '%' => {
            if b == 0 {
                return Err(NlError::value("modulo by zero".to_string()));
            }
            // remainder consistent with floor division: sign follows b
            a.checked_rem(b)
                .map(|r| if r != 0 && (r < 0) != (b < 0) { r + b } else { r })
        }
        'p' => {
            let exp = u32::try_from(b)
                .map_err(|_| NlError::value("negative integer exponent".to_string()))?;
            a.checked_pow(exp)
        }
        '|' => Some(a | b),
        '^' => Some(a ^ b),
        '&' => Some(a & b),
        '<' => a.checked_shl(b as u32),
        '>' => a.checked_shr(b as u32),
        _ => return Err(NlError::runtime(format!("unsupported operator '{op}'"))),
    };
    out.map(Scalar::Int)
        .ok_or_else(|| NlError::value(format!("integer overflow in '{op}'")))
}

/// Quotient rounded toward −∞; `div_euclid` rounds toward the sign of
/// the remainder instead, which differs for negative divisors.
fn floor_div_i64(a: i64, b: i64) -> Option<i64> {
    let q = a.checked_div(b)?;
    let r = a.checked_rem(b)?;
    if r != 0 && (r < 0) != (b < 0) {
        Some(q - 1)
    } else {
        Some(q)
    }
}

fn float_op(op: char, a: f64, b: f64) -> Result<Scalar, NlError> {
    let out = match op {
        '+' => a + b,
        '-' => a - b,
        '*' => a * b,
        '/' => {
            if b == 0.0 {
                return Err(NlError::value("division by zero".to_string()));
            }
            a / b
        }
        'f' => {
            if b == 0.0 {
                return Err(NlError::value("division by zero".to_string()));
            }
            (a / b).floor()
        }
        '%' => {
            if b == 0.0 {
                return Err(NlError::value("modulo by zero".to_string()));
            }
            a - (a / b).floor() * b
        }
        'p' => a.powf(b),
        _ => return Err(NlError::runtime(format!("unsupported operator '{op}'"))),
    };
    Ok(Scalar::Float(out))
}

fn check_fits(value: i64, kind: ScalarKind) -> Result<(), NlError> {
    if kind.fits_i64(value) {
        Ok(())
    } else {
        Err(NlError::value(format!(
            "{value} does not fit {}",
            kind.type_name()
        )))
    }
}

/// Round-trip floats through f32 when the element kind demands it.
fn store_float(value: f64, kind: ScalarKind) -> f64 {
    if kind == ScalarKind::Float32 {
        value as f32 as f64
    } else {
        value
    }
}

fn read_foreign(buf: &ForeignBuf, kind: ScalarKind, index: usize) -> Scalar {
    debug_assert!(index < buf.len);
    // SAFETY: the buffer was produced by symbol resolution with the
    // declared element kind; index is bounds-checked by callers.
    unsafe {
        match kind {
            ScalarKind::Bool => Scalar::Int(i64::from(*(buf.ptr as *const u8).add(index) != 0)),
            ScalarKind::Int8 => Scalar::Int(i64::from(*(buf.ptr as *const i8).add(index))),
            ScalarKind::Int16 => Scalar::Int(i64::from(*(buf.ptr as *const i16).add(index))),
            ScalarKind::Int32 => Scalar::Int(i64::from(*(buf.ptr as *const i32).add(index))),
            ScalarKind::Int64 => Scalar::Int(*(buf.ptr as *const i64).add(index)),
            ScalarKind::Float32 => Scalar::Float(f64::from(*(buf.ptr as *const f32).add(index))),
            ScalarKind::Float64 => Scalar::Float(*(buf.ptr as *const f64).add(index)),
        }
    }
}

fn write_foreign(
    buf: &ForeignBuf,
    kind: ScalarKind,
    index: usize,
    value: Scalar,
) -> Result<(), NlError> {
    let as_int = |v: Scalar| {
        v.as_i64()
            .ok_or_else(|| NlError::value(format!("{} is not exact for {}", v.as_f64(), kind.type_name())))
    };
    // SAFETY: same contract as `read_foreign`; the declared kind fixes
    // the element width.
    unsafe {
        match kind {
            ScalarKind::Bool => {
                *(buf.ptr as *mut u8).add(index) = u8::from(!value.is_zero());
            }
            ScalarKind::Int8 => {
                let v = as_int(value)?;
                check_fits(v, kind)?;
                *(buf.ptr as *mut i8).add(index) = v as i8;
            }
            ScalarKind::Int16 => {
                let v = as_int(value)?;
                check_fits(v, kind)?;
                *(buf.ptr as *mut i16).add(index) = v as i16;
            }
            ScalarKind::Int32 => {
                let v = as_int(value)?;
                check_fits(v, kind)?;
                *(buf.ptr as *mut i32).add(index) = v as i32;
            }
            ScalarKind::Int64 => {
                *(buf.ptr as *mut i64).add(index) = as_int(value)?;
            }
            ScalarKind::Float32 => {
                *(buf.ptr as *mut f32).add(index) = value.as_f64() as f32;
            }
            ScalarKind::Float64 => {
                *(buf.ptr as *mut f64).add(index) = value.as_f64();
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn scalar_inference() {
        assert_eq!(Tensor::scalar_int(1).kind(), ScalarKind::Bool);
        assert_eq!(Tensor::scalar_int(123).kind(), ScalarKind::Int8);
        assert_eq!(Tensor::scalar_int(300).kind(), ScalarKind::Int16);
        assert!(Tensor::scalar_int(5).is_scalar());
    }

    #[test]
    fn fixed_kind_rejects_overflow() {
        assert!(Tensor::scalar_i64(300, ScalarKind::Int8).is_err());
        assert!(Tensor::scalar_i64(127, ScalarKind::Int8).is_ok());
    }

    #[test]
    fn storage_matches_shape_product() {
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
        assert_eq!(t.len(), 4);
        assert_eq!(t.shape(), &[2, 2]);

        let err = Tensor::from_elements(ScalarKind::Int32, vec![2, 2], vec![Scalar::Int(1)]);
        assert!(err.is_err());
    }

    #[test]
    fn integer_division_yields_float64() {
        let a = Tensor::scalar_int(7);
        let b = Tensor::scalar_int(2);
        let q = a.binary_op('/', &b).unwrap();
        assert_eq!(q.kind(), ScalarKind::Float64);
        assert_eq!(q.as_f64(), Some(3.5));
    }

    #[test]
    fn floor_division_rounds_toward_negative_infinity() {
        let cases = [
            (-7, 2, -4),
            (7, -2, -4),
            (-7, -2, 3),
            (7, 2, 3),
        ];
        for (a, b, expected) in cases {
            let q = Tensor::scalar_int(a)
                .binary_op('f', &Tensor::scalar_int(b))
                .unwrap();
            assert_eq!(q.as_i64(), Some(expected), "{a} // {b}");
        }
    }

    #[test]
    fn modulo_sign_follows_the_divisor() {
        let cases = [(-7, 2, 1), (7, -2, -1), (-7, -2, -1), (7, 2, 1)];
        for (a, b, expected) in cases {
            let r = Tensor::scalar_int(a)
                .binary_op('%', &Tensor::scalar_int(b))
                .unwrap();
            assert_eq!(r.as_i64(), Some(expected), "{a} % {b}");
        }
    }

    #[test]
    fn elementwise_with_scalar_broadcast() {
        let t = Tensor::from_elements(
            ScalarKind::Int8,
            vec![3],
            vec![Scalar::Int(1), Scalar::Int(2), Scalar::Int(3)],
        )
        .unwrap();
        let sum = t.binary_op('+', &Tensor::scalar_int(10)).unwrap();
        assert_eq!(sum.elements(), vec![Scalar::Int(11), Scalar::Int(12), Scalar::Int(13)]);
    }

    #[test]
    fn concat_along_axis0() {
        let a = Tensor::from_elements(ScalarKind::Int8, vec![2], vec![Scalar::Int(1), Scalar::Int(2)])
            .unwrap();
        let b = Tensor::from_elements(ScalarKind::Int8, vec![1], vec![Scalar::Int(3)]).unwrap();
        let c = a.concat(&b).unwrap();
        assert_eq!(c.shape(), &[3]);
        assert_eq!(c.elements()[2], Scalar::Int(3));
    }

    #[test]
    fn concat_shape_mismatch_fails() {
        let a = Tensor::from_elements(
            ScalarKind::Int8,
            vec![1, 2],
            vec![Scalar::Int(1), Scalar::Int(2)],
        )
        .unwrap();
        let b = Tensor::from_elements(
            ScalarKind::Int8,
            vec![1, 3],
            vec![Scalar::Int(1), Scalar::Int(2), Scalar::Int(3)],
        )
        .unwrap();
        assert!(a.concat(&b).is_err());
    }

    #[test]
    fn axis0_indexing_reduces_rank() {
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
        let row = t.index_axis0(1).unwrap();
        assert_eq!(row.shape(), &[2]);
        assert_eq!(row.elements(), vec![Scalar::Int(3), Scalar::Int(4)]);

        let element = row.index_axis0(0).unwrap();
        assert!(element.is_scalar());
        assert_eq!(element.as_i64(), Some(3));
    }

    #[test]
    fn narrowing_conversion_checks_values() {
        let t = Tensor::scalar_int(300);
        assert!(t.to_kind(ScalarKind::Int8).is_err());
        assert!(t.to_kind(ScalarKind::Int32).is_ok());

        let f = Tensor::scalar_f64(1.5, ScalarKind::Float64).unwrap();
        assert!(f.to_kind(ScalarKind::Int64).is_err());
    }

    #[test]
    fn whole_tensor_equality() {
        let a = Tensor::scalar_int(5);
        let b = Tensor::scalar_f64(5.0, ScalarKind::Float64).unwrap();
        assert!(a.value_eq(&b));
        assert!(!a.value_eq(&Tensor::scalar_int(6)));
    }

    #[test]
    fn float32_storage_rounds() {
        let t = Tensor::scalar_f64(0.1, ScalarKind::Float32).unwrap();
        assert_eq!(t.as_f64(), Some(0.1f32 as f64));
    }
}
