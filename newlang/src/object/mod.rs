//! `Object` — the universal runtime value.
//!
//! One payload variant at a time plus an optional *fixed* kind: the
//! declared type of the binding holding the value. Assignment into a
//! fixed-kind binding coerces or fails, never silently narrows.

pub mod dict;
pub mod fraction;
pub mod funcs;
pub mod iterator;
mod ops;
mod print;
pub mod range;
pub mod strings;
pub mod tensor;

use std::rc::Rc;

use crate::error::NlError;
use crate::types::{NlType, ScalarKind};

pub use dict::{new_dict_ref, ClassInstance, DictData, DictRef};
pub use fraction::Fraction;
pub use funcs::{EvalFunc, FfiAbi, NativeFunc};
pub use iterator::{IterData, IterRef, IterStep};
pub use range::RangeData;
pub use strings::Str;
pub use tensor::{Scalar, Tensor};

/// One dimension of a type value's shape constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dim {
    /// Fixed extent; 0 denotes "scalar"
    Fixed(usize),
    /// `...` — any extent
    Any,
}

/// A first-class type: callable to convert or construct values.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeValue {
    pub kind: NlType,
    pub dims: Vec<Dim>,
}

impl TypeValue {
    pub fn simple(kind: NlType) -> TypeValue {
        TypeValue {
            kind,
            dims: Vec::new(),
        }
    }
}

/// Payload variants.
#[derive(Debug, Clone)]
pub enum Payload {
    Tensor(Tensor),
    Fraction(Fraction),
    Str(Str),
    Dict(DictRef),
    Class(ClassInstance),
    Range(Box<RangeData>),
    Iter(IterRef),
    NativeFunc(Rc<NativeFunc>),
    EvalFunc(Rc<EvalFunc>),
    Type(TypeValue),
    None,
    Ellipsis,
    IteratorEnd,
    /// Produced by try-blocks from a caught error
    Error(String),
}

/// The runtime value.
#[derive(Debug, Clone)]
pub struct Object {
    pub payload: Payload,
    /// Declared kind of the binding holding this value, if any
    pub fixed: Option<NlType>,
}

impl Object {
    pub fn new(payload: Payload) -> Object {
        Object {
            payload,
            fixed: None,
        }
    }

    pub fn with_fixed(mut self, fixed: NlType) -> Object {
        self.fixed = Some(fixed);
        self
    }

    // ==================== constructors ====================

    pub fn none() -> Object {
        Object::new(Payload::None)
    }

    pub fn ellipsis() -> Object {
        Object::new(Payload::Ellipsis)
    }

    pub fn iterator_end() -> Object {
        Object::new(Payload::IteratorEnd)
    }

    /// Integer scalar with the narrowest inferred kind.
    pub fn int(value: i64) -> Object {
        Object::new(Payload::Tensor(Tensor::scalar_int(value)))
    }

    pub fn int_typed(value: i64, kind: ScalarKind) -> Result<Object, NlError> {
        Ok(Object::new(Payload::Tensor(Tensor::scalar_i64(value, kind)?)))
    }

    /// Float scalar (Float64).
    pub fn float(value: f64) -> Object {
        Object::new(Payload::Tensor(
            Tensor::scalar_f64(value, ScalarKind::Float64).expect("float64 accepts all"),
        ))
    }

    pub fn bool_value(value: bool) -> Object {
        Object::new(Payload::Tensor(Tensor::scalar_bool(value)))
    }

    pub fn tensor(tensor: Tensor) -> Object {
        Object::new(Payload::Tensor(tensor))
    }

    pub fn fraction(fraction: Fraction) -> Object {
        Object::new(Payload::Fraction(fraction))
    }

    pub fn str_bytes(text: &str) -> Object {
        Object::new(Payload::Str(Str::bytes(text)))
    }

    pub fn str_wide(text: &str) -> Object {
        Object::new(Payload::Str(Str::wide(text)))
    }

    pub fn string(value: Str) -> Object {
        Object::new(Payload::Str(value))
    }

    pub fn dict(data: DictData) -> Object {
        Object::new(Payload::Dict(new_dict_ref(data)))
    }

    pub fn dict_from_ref(data: DictRef) -> Object {
        Object::new(Payload::Dict(data))
    }

    pub fn class(instance: ClassInstance) -> Object {
        Object::new(Payload::Class(instance))
    }

    pub fn range(range: RangeData) -> Object {
        Object::new(Payload::Range(Box::new(range)))
    }

    pub fn iterator(iter: IterData) -> Object {
        Object::new(Payload::Iter(iter.into_ref()))
    }

    pub fn eval_func(func: EvalFunc) -> Object {
        Object::new(Payload::EvalFunc(Rc::new(func)))
    }

    pub fn native_func(func: NativeFunc) -> Object {
        Object::new(Payload::NativeFunc(Rc::new(func)))
    }

    pub fn type_value(value: TypeValue) -> Object {
        Object::new(Payload::Type(value))
    }

    pub fn error_value(message: impl Into<String>) -> Object {
        Object::new(Payload::Error(message.into()))
    }

    // ==================== kind and accessors ====================

    /// The *current* kind. Tensors answer with their element kind,
    /// which sits below `:Tensor` in the lattice.
    pub fn kind(&self) -> NlType {
        match &self.payload {
            Payload::Tensor(t) => t.kind().into(),
            Payload::Fraction(_) => NlType::Fraction,
            Payload::Str(s) => s.kind(),
            Payload::Dict(_) => NlType::Dict,
            Payload::Class(c) => NlType::Class(c.class_name.clone()),
            Payload::Range(_) => NlType::Range,
            Payload::Iter(_) => NlType::Iterator,
            Payload::NativeFunc(_) => NlType::NativeFunc,
            Payload::EvalFunc(_) => NlType::EvalFunc,
            Payload::Type(_) => NlType::Type,
            Payload::None => NlType::None,
            Payload::Ellipsis => NlType::Ellipsis,
            Payload::IteratorEnd => NlType::IteratorEnd,
            Payload::Error(_) => NlType::Error,
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self.payload, Payload::None)
    }

    pub fn is_ellipsis(&self) -> bool {
        matches!(self.payload, Payload::Ellipsis)
    }

    pub fn is_iterator_end(&self) -> bool {
        matches!(self.payload, Payload::IteratorEnd)
    }

    pub fn is_error(&self) -> bool {
        matches!(self.payload, Payload::Error(_))
    }

    pub fn as_tensor(&self) -> Option<&Tensor> {
        match &self.payload {
            Payload::Tensor(t) => Some(t),
            _ => None,
        }
    }

    pub fn as_tensor_mut(&mut self) -> Option<&mut Tensor> {
        match &mut self.payload {
            Payload::Tensor(t) => Some(t),
            _ => None,
        }
    }

    pub fn as_fraction(&self) -> Option<&Fraction> {
        match &self.payload {
            Payload::Fraction(f) => Some(f),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&Str> {
        match &self.payload {
            Payload::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Dictionary storage, looking through class instances.
    pub fn as_dict_ref(&self) -> Option<DictRef> {
        match &self.payload {
            Payload::Dict(d) => Some(d.clone()),
            Payload::Class(c) => Some(c.data.clone()),
            _ => None,
        }
    }

    pub fn as_range(&self) -> Option<&RangeData> {
        match &self.payload {
            Payload::Range(r) => Some(r),
            _ => None,
        }
    }

    pub fn as_iter(&self) -> Option<IterRef> {
        match &self.payload {
            Payload::Iter(i) => Some(i.clone()),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        self.as_tensor().and_then(Tensor::as_i64)
    }

    /// Numeric value of a scalar tensor or fraction.
    pub fn number_value(&self) -> Result<f64, NlError> {
        match &self.payload {
            Payload::Tensor(t) if t.is_scalar() => Ok(t.as_f64().expect("scalar")),
            Payload::Fraction(f) => Ok(f.to_f64()),
            _ => Err(NlError::type_error(format!(
                "{} is not a numeric scalar",
                self.kind().name()
            ))),
        }
    }

    pub fn is_numeric_scalar(&self) -> bool {
        match &self.payload {
            Payload::Tensor(t) => t.is_scalar(),
            Payload::Fraction(_) => true,
            _ => false,
        }
    }

    /// Truthiness for guards and pure blocks.
    pub fn is_truthy(&self) -> bool {
        match &self.payload {
            Payload::Tensor(t) => t.is_truthy(),
            Payload::Fraction(f) => !f.is_zero(),
            Payload::Str(s) => !s.is_empty(),
            Payload::Dict(d) => !d.borrow().is_empty(),
            Payload::Class(_) => true,
            Payload::Range(_) => true,
            Payload::Iter(_) => true,
            Payload::NativeFunc(_) | Payload::EvalFunc(_) | Payload::Type(_) => true,
            Payload::None | Payload::Ellipsis | Payload::IteratorEnd => false,
            Payload::Error(_) => false,
        }
    }

    /// Coerce toward a fixed kind, keeping the annotation.
    /// Widening is free; narrowing must fit exactly.
    pub fn coerce_to(&self, target: &NlType) -> Result<Object, NlError> {
        if *target == NlType::Any || self.kind() == *target {
            let mut out = self.clone();
            out.fixed = Some(target.clone());
            return Ok(out);
        }
        // Scalar-kind tensors convert across the numeric chain.
        if let (Some(tensor), Some(kind)) = (self.as_tensor(), target.scalar_kind()) {
            let converted = tensor.to_kind(kind)?;
            return Ok(Object::tensor(converted).with_fixed(target.clone()));
        }
        // String kinds convert among themselves; FmtChar is the
        // byte-string view handed to native format arguments.
        if let Some(s) = self.as_str() {
            let converted = match target {
                NlType::StrWide => Some(Str::wide(&s.to_text())),
                NlType::StrChar | NlType::FmtChar => Some(Str::bytes(&s.to_text())),
                NlType::String => Some(s.clone()),
                _ => None,
            };
            if let Some(converted) = converted {
                return Ok(Object::string(converted).with_fixed(target.clone()));
            }
        }
        if self.kind().is_subtype_of(target) {
            let mut out = self.clone();
            out.fixed = Some(target.clone());
            return Ok(out);
        }
        Err(NlError::type_error(format!(
            "cannot fit {} into {}",
            self.kind().name(),
            target.name()
        )))
    }
}

impl Default for Object {
    fn default() -> Self {
        Object::none()
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn literal_inference() {
        assert_eq!(Object::int(123).kind(), NlType::Int8);
        assert_eq!(Object::int(300).kind(), NlType::Int16);
        assert_eq!(Object::int(1).kind(), NlType::Bool);
        assert_eq!(Object::float(1.5).kind(), NlType::Float64);
    }

    #[test]
    fn fixed_kind_survives_coercion() {
        let value = Object::int(100).coerce_to(&NlType::Int32).unwrap();
        assert_eq!(value.kind(), NlType::Int32);
        assert_eq!(value.fixed, Some(NlType::Int32));
    }

    #[test]
    fn narrowing_out_of_range_fails() {
        let err = Object::int(300).coerce_to(&NlType::Int8);
        assert!(err.is_err());
    }

    #[test]
    fn truthiness() {
        assert!(Object::int(1).is_truthy());
        assert!(!Object::int(0).is_truthy());
        assert!(!Object::none().is_truthy());
        assert!(!Object::str_bytes("").is_truthy());
        assert!(Object::str_bytes("x").is_truthy());
        assert!(!Object::dict(DictData::new()).is_truthy());
        assert!(!Object::iterator_end().is_truthy());
    }

    #[test]
    fn dict_objects_share_storage() {
        let dict = Object::dict(DictData::new());
        let alias = dict.clone();
        dict.as_dict_ref()
            .unwrap()
            .borrow_mut()
            .push(None, Object::int(1));
        assert_eq!(alias.as_dict_ref().unwrap().borrow().len(), 1);
    }
}
