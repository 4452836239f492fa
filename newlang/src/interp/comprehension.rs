//! Type-driven container construction.
//!
//! `:Type[shape](args...)` fills a container of the named kind from a
//! heterogeneous argument list: scalars, tensors, ranges, strings (as
//! code units), dictionaries (flattened), repeat-last `...` fillers
//! and `... call() ...` per-slot generators.

use newlang_parser::{Term, TermKind};

use crate::error::NlError;
use crate::object::{
    ClassInstance, Dim, DictData, Fraction, NativeFunc, Object, Payload, Scalar, Str, Tensor,
    TypeValue,
};
use crate::types::{NlType, ScalarKind};

use super::{EvalResult, Interpreter, Unwind};

/// One element of the fill stream.
enum FillItem {
    Value(Option<String>, Object),
    /// bare `...` — repeat the last value to fill the shape
    RepeatLast,
    /// `... call() ...` — invoke per missing slot
    FillCall(Term),
    /// `... expr` — splice a container's elements
    Splice(Object),
}

/// Comprehension entry point for `:Type[dims](arg terms...)`.
pub(crate) fn construct(
    interp: &mut Interpreter,
    kind: &NlType,
    dims: &[Dim],
    args: &[(Option<String>, Term)],
) -> EvalResult {
    // `:Pointer(...)` resolves native symbols, not containers.
    if *kind == NlType::Pointer {
        return construct_pointer(interp, args);
    }

    let mut items = Vec::with_capacity(args.len());
    for (name, term) in args {
        if term.kind == TermKind::Ellipsis {
            match (&term.left, term.text.as_str()) {
                (None, _) => items.push(FillItem::RepeatLast),
                (Some(call), "......") => items.push(FillItem::FillCall((**call).clone())),
                (Some(expr), _) => {
                    let value = interp.eval_term(expr)?;
                    items.push(FillItem::Splice(value));
                }
            }
            continue;
        }
        let value = interp.eval_term(term)?;
        items.push(FillItem::Value(name.clone(), value));
    }

    build(interp, kind, dims, items)
}

/// Construction when the type arrives as a value (a stored `:Type`
/// object being called). Per-slot call generators need source terms
/// and are unavailable here; ellipsis markers still repeat-fill.
pub(crate) fn construct_from_values(
    interp: &mut Interpreter,
    type_value: &TypeValue,
    args: Vec<(Option<String>, Object)>,
) -> EvalResult {
    let items = args
        .into_iter()
        .map(|(name, value)| {
            if value.is_ellipsis() {
                FillItem::RepeatLast
            } else {
                FillItem::Value(name, value)
            }
        })
        .collect();
    build(interp, &type_value.kind, &type_value.dims, items)
}

fn build(
    interp: &mut Interpreter,
    kind: &NlType,
    dims: &[Dim],
    items: Vec<FillItem>,
) -> EvalResult {
    match kind {
        NlType::Dict => build_dict(items),
        NlType::Class(name) => instantiate_class(interp, name, items),
        NlType::Fraction => build_fraction(items),
        NlType::StrChar | NlType::StrWide => build_string(kind, items),
        NlType::Tensor
        | NlType::Bool
        | NlType::Int8
        | NlType::Int16
        | NlType::Int32
        | NlType::Int64
        | NlType::Float32
        | NlType::Float64 => build_tensor(interp, kind, dims, items),
        other => Err(Unwind::Error(NlError::type_error(format!(
            "{} is not constructible",
            other.name()
        )))),
    }
}

// ==================== dictionaries and classes ====================

fn build_dict(items: Vec<FillItem>) -> EvalResult {
    let mut dict = DictData::new();
    for item in items {
        match item {
            FillItem::Value(name, value) => dict.push(name, value),
            FillItem::Splice(value) => match value.as_dict_ref() {
                Some(source) => dict.append_all(&source.borrow()),
                None => {
                    return Err(Unwind::Error(NlError::type_error(format!(
                        "cannot splice {} into a dictionary",
                        value.kind().name()
                    ))));
                }
            },
            FillItem::RepeatLast | FillItem::FillCall(_) => {
                return Err(Unwind::Error(NlError::value(
                    "dictionaries take no shape fillers".to_string(),
                )));
            }
        }
    }
    Ok(Object::dict(dict))
}

fn instantiate_class(interp: &mut Interpreter, name: &str, items: Vec<FillItem>) -> EvalResult {
    let def = interp.classes.get(name).cloned().ok_or_else(|| {
        Unwind::Error(NlError::runtime(format!("class '{name}' is not defined")))
    })?;

    let mut data = def.prototype.clone();
    let mut position = 0i64;
    for item in items {
        let FillItem::Value(field, value) = item else {
            return Err(Unwind::Error(NlError::value(
                "class constructors take plain arguments".to_string(),
            )));
        };
        match field {
            Some(field) => {
                if data.position_of(&field).is_none() {
                    return Err(Unwind::Error(NlError::runtime(format!(
                        "class '{name}' has no field '{field}'"
                    ))));
                }
                data.set_by_name(&field, value);
            }
            None => {
                data.set_by_index(position, value)?;
                position += 1;
            }
        }
    }

    Ok(Object::class(ClassInstance::new(
        def.name.clone(),
        def.ancestry.clone(),
        data,
    )))
}

// ==================== scalars and strings ====================

fn build_fraction(items: Vec<FillItem>) -> EvalResult {
    let [FillItem::Value(_, value)] = items.as_slice() else {
        return Err(Unwind::Error(NlError::value(
            "a fraction is built from one value".to_string(),
        )));
    };
    match &value.payload {
        Payload::Fraction(f) => Ok(Object::fraction(f.clone())),
        Payload::Tensor(t) => match t.as_i64() {
            Some(v) => Ok(Object::fraction(Fraction::from_i64(v))),
            None => Err(Unwind::Error(NlError::value(
                "only integers convert to fractions exactly".to_string(),
            ))),
        },
        _ => Err(Unwind::Error(NlError::type_error(format!(
            "cannot convert {} to a fraction",
            value.kind().name()
        )))),
    }
}

fn build_string(kind: &NlType, items: Vec<FillItem>) -> EvalResult {
    // A single string argument re-widths; scalar codes become units.
    if let [FillItem::Value(_, value)] = items.as_slice() {
        if let Some(s) = value.as_str() {
            let text = s.to_text();
            return Ok(match kind {
                NlType::StrChar => Object::str_bytes(&text),
                _ => Object::str_wide(&text),
            });
        }
    }

    let mut text = String::new();
    for item in items {
        let FillItem::Value(_, value) = item else {
            return Err(Unwind::Error(NlError::value(
                "strings are built from code units".to_string(),
            )));
        };
        let code = value.as_i64().ok_or_else(|| {
            Unwind::Error(NlError::type_error(format!(
                "{} is not a code unit",
                value.kind().name()
            )))
        })?;
        let c = u32::try_from(code)
            .ok()
            .and_then(char::from_u32)
            .ok_or_else(|| Unwind::Error(NlError::value(format!("{code} is not a codepoint"))))?;
        text.push(c);
    }
    Ok(match kind {
        NlType::StrChar => Object::str_bytes(&text),
        _ => Object::str_wide(&text),
    })
}

// ==================== tensors ====================

fn build_tensor(
    interp: &mut Interpreter,
    kind: &NlType,
    dims: &[Dim],
    items: Vec<FillItem>,
) -> EvalResult {
    let target = target_count(dims);
    let mut elements: Vec<Scalar> = Vec::new();
    let mut saw_float = false;

    let total = items.len();
    for (index, item) in items.into_iter().enumerate() {
        match item {
            FillItem::Value(_, value) | FillItem::Splice(value) => {
                collect_elements(&value, &mut elements, &mut saw_float)?;
            }
            FillItem::RepeatLast => {
                if index + 1 != total {
                    return Err(Unwind::Error(NlError::value(
                        "'...' fills only at the end of the arguments".to_string(),
                    )));
                }
                let Some(target) = target else {
                    return Err(Unwind::Error(NlError::value(
                        "'...' filling needs a fixed shape".to_string(),
                    )));
                };
                let last = elements.last().copied().ok_or_else(|| {
                    Unwind::Error(NlError::value(
                        "'...' filling needs a preceding value".to_string(),
                    ))
                })?;
                while elements.len() < target {
                    elements.push(last);
                }
            }
            FillItem::FillCall(call) => {
                let Some(target) = target else {
                    return Err(Unwind::Error(NlError::value(
                        "call filling needs a fixed shape".to_string(),
                    )));
                };
                while elements.len() < target {
                    let value = interp.eval_term(&call)?;
                    collect_elements(&value, &mut elements, &mut saw_float)?;
                }
            }
        }
    }

    if let Some(target) = target {
        if elements.len() > target {
            return Err(Unwind::Error(NlError::value(format!(
                "shape takes {target} elements, got {}",
                elements.len()
            ))));
        }
        if elements.len() < target {
            return Err(Unwind::Error(NlError::value(format!(
                "shape needs {target} elements, got {}",
                elements.len()
            ))));
        }
    }

    let shape = resolve_shape(dims, elements.len(), target)?;

    let element_kind = match kind.scalar_kind() {
        Some(kind) => kind,
        // `:Tensor` infers from the collected values.
        None => {
            if saw_float {
                ScalarKind::Float64
            } else {
                elements.iter().fold(ScalarKind::Bool, |k, s| match s {
                    Scalar::Int(v) => k.max(ScalarKind::narrowest_int(*v)),
                    Scalar::Float(_) => k.max(ScalarKind::Float64),
                })
            }
        }
    };

    Ok(Object::tensor(Tensor::from_elements(
        element_kind,
        shape,
        elements,
    )?))
}

/// Element count demanded by the dims, when fully fixed.
/// A dimension of 0 denotes a scalar.
fn target_count(dims: &[Dim]) -> Option<usize> {
    if dims.is_empty() || dims.iter().any(|d| matches!(d, Dim::Any)) {
        return None;
    }
    if dims == [Dim::Fixed(0)] {
        return Some(1);
    }
    Some(
        dims.iter()
            .map(|d| match d {
                Dim::Fixed(n) => *n,
                Dim::Any => unreachable!(),
            })
            .product(),
    )
}

/// Final shape: fixed dims as given, one `...` dim absorbing the
/// remainder, or inference when no dims were written.
fn resolve_shape(dims: &[Dim], count: usize, target: Option<usize>) -> Result<Vec<usize>, Unwind> {
    if dims.is_empty() {
        // Inferred: one element stays scalar, otherwise a vector.
        return Ok(if count == 1 { Vec::new() } else { vec![count] });
    }
    if dims == [Dim::Fixed(0)] {
        return Ok(Vec::new());
    }
    if target.is_some() {
        return Ok(dims
            .iter()
            .map(|d| match d {
                Dim::Fixed(n) => *n,
                Dim::Any => unreachable!(),
            })
            .collect());
    }

    // Exactly one `...` dim divides the remainder.
    let any_count = dims.iter().filter(|d| matches!(d, Dim::Any)).count();
    if any_count > 1 {
        return Err(Unwind::Error(NlError::value(
            "at most one '...' dimension is supported".to_string(),
        )));
    }
    let fixed: usize = dims
        .iter()
        .filter_map(|d| match d {
            Dim::Fixed(n) => Some(*n),
            Dim::Any => None,
        })
        .product();
    if fixed == 0 || count % fixed != 0 {
        return Err(Unwind::Error(NlError::value(format!(
            "{count} elements do not divide into shape"
        ))));
    }
    Ok(dims
        .iter()
        .map(|d| match d {
            Dim::Fixed(n) => *n,
            Dim::Any => count / fixed,
        })
        .collect())
}

/// Flatten one argument into scalar elements.
fn collect_elements(
    value: &Object,
    out: &mut Vec<Scalar>,
    saw_float: &mut bool,
) -> Result<(), NlError> {
    match &value.payload {
        Payload::Tensor(tensor) => {
            if tensor.kind().is_float() {
                *saw_float = true;
            }
            out.extend(tensor.elements());
            Ok(())
        }
        Payload::Range(range) => {
            let tensor = range.to_tensor()?;
            if tensor.kind().is_float() {
                *saw_float = true;
            }
            out.extend(tensor.elements());
            Ok(())
        }
        Payload::Fraction(fraction) => {
            *saw_float = true;
            out.push(Scalar::Float(fraction.to_f64()));
            Ok(())
        }
        Payload::Str(s) => {
            match s {
                Str::Bytes(bytes) => out.extend(bytes.iter().map(|b| Scalar::Int(i64::from(*b)))),
                Str::Wide(chars) => {
                    out.extend(chars.iter().map(|c| Scalar::Int(i64::from(u32::from(*c)))));
                }
            }
            Ok(())
        }
        Payload::Dict(dict) => {
            for (_, element) in dict.borrow().items() {
                collect_elements(element, out, saw_float)?;
            }
            Ok(())
        }
        _ => Err(NlError::type_error(format!(
            "{} cannot fill a tensor",
            value.kind().name()
        ))),
    }
}

// ==================== native pointers ====================

/// `:Pointer('prototype')` — a native function for call prototypes, a
/// pointer-backed tensor for `name:Kind` variable prototypes.
fn construct_pointer(interp: &mut Interpreter, args: &[(Option<String>, Term)]) -> EvalResult {
    let [(None, proto_arg)] = args else {
        return Err(Unwind::Error(NlError::value(
            ":Pointer takes one prototype string".to_string(),
        )));
    };
    let proto_text = match proto_arg.kind {
        TermKind::StrChar | TermKind::StrWide => proto_arg.text.clone(),
        _ => {
            return Err(Unwind::Error(NlError::type_error(
                ":Pointer takes a string prototype".to_string(),
            )));
        }
    };

    let parsed = newlang_parser::parse(&proto_text)?;
    match parsed.kind {
        TermKind::Call => {
            let name = parsed.text.clone();
            Ok(Object::native_func(NativeFunc::new(name, parsed, None, None)))
        }
        TermKind::Name => {
            let annotation = parsed.annotation.as_ref().ok_or_else(|| {
                Unwind::Error(NlError::type_error(
                    "a pointer variable prototype needs a type".to_string(),
                ))
            })?;
            let kind = ScalarKind::from_name(&annotation.name).ok_or_else(|| {
                Unwind::Error(NlError::type_error(format!(
                    "'{}' is not a pointer element type",
                    annotation.name
                )))
            })?;
            let ptr = interp.resolver.symbol_lookup(&parsed.text, None)?;
            Ok(Object::tensor(Tensor::foreign(ptr, 1, kind)))
        }
        _ => Err(Unwind::Error(NlError::value(
            "unrecognized pointer prototype".to_string(),
        ))),
    }
}
