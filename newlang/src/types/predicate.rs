//! The `~` / `~~` / `~~~` predicate family.
//!
//! - `a ~ T`   — kind compatibility along the lattice, or class
//!   ancestry for class instances;
//! - `a ~~ T`  — structural compatibility against a dictionary shape;
//! - `a ~~~ T` — strict: identical kinds, identical shapes, recursive.

use crate::error::NlError;
use crate::object::{Dim, Object, Payload};

use super::NlType;

/// `a ~ T`.
pub fn check_instance(value: &Object, target: &Object) -> Result<bool, NlError> {
    let target_type = match &target.payload {
        Payload::Type(t) => t.kind.clone(),
        Payload::Str(s) => NlType::from_name(&s.to_text()),
        Payload::Class(prototype) => NlType::Class(prototype.class_name.clone()),
        _ => {
            return Err(NlError::type_error(format!(
                "'~' expects a type on the right, got {}",
                target.kind().name()
            )));
        }
    };

    if let NlType::Class(name) = &target_type {
        return Ok(match &value.payload {
            Payload::Class(instance) => instance.is_instance_of(name),
            _ => false,
        });
    }
    Ok(value.kind().is_subtype_of(&target_type))
}

/// `a ~~ T` — when `T` is a dictionary shape, every named field of `T`
/// must exist in `a` with a compatible kind. A type target falls back
/// to the `~` test; a plain value target compares kinds through their
/// nearest common ancestor, so `a == b` implies `a ~~ b`.
pub fn check_structural(value: &Object, target: &Object) -> Result<bool, NlError> {
    if matches!(
        target.payload,
        Payload::Type(_) | Payload::Str(_) | Payload::Class(_)
    ) {
        return check_instance(value, target);
    }
    let Some(shape) = target.as_dict_ref() else {
        return Ok(kinds_share_ancestor(&value.kind(), &target.kind()));
    };
    let Some(data) = value.as_dict_ref() else {
        return Ok(false);
    };

    let shape = shape.borrow();
    let data = data.borrow();
    for (name, expected) in shape.items() {
        let Some(name) = name else { continue };
        let Some(index) = data.position_of(name) else {
            return Ok(false);
        };
        let actual = &data.items()[index].1;
        if !kinds_compatible(&actual.kind(), &expected.kind()) {
            return Ok(false);
        }
    }
    Ok(true)
}

/// `a ~~~ T` — strict match.
pub fn check_strict(value: &Object, target: &Object) -> Result<bool, NlError> {
    if let Payload::Type(t) = &target.payload {
        if value.kind() != t.kind {
            return Ok(false);
        }
        if let Some(tensor) = value.as_tensor() {
            return Ok(dims_match(&t.dims, tensor.shape()));
        }
        return Ok(t.dims.is_empty());
    }
    Ok(strict_value_match(value, target))
}

fn strict_value_match(a: &Object, b: &Object) -> bool {
    if a.kind() != b.kind() {
        return false;
    }
    match (&a.payload, &b.payload) {
        (Payload::Tensor(ta), Payload::Tensor(tb)) => ta.shape() == tb.shape(),
        (Payload::Str(sa), Payload::Str(sb)) => sa.len() == sb.len(),
        (Payload::Dict(da), Payload::Dict(db)) => {
            let da = da.borrow();
            let db = db.borrow();
            da.len() == db.len()
                && da
                    .items()
                    .iter()
                    .zip(db.items().iter())
                    .all(|((an, av), (bn, bv))| an == bn && strict_value_match(av, bv))
        }
        (Payload::Class(ca), Payload::Class(cb)) => {
            ca.class_name == cb.class_name
        }
        // None is compatible only with None; other markers likewise.
        _ => true,
    }
}

fn dims_match(dims: &[Dim], shape: &[usize]) -> bool {
    if dims.is_empty() {
        return true;
    }
    if dims.len() != shape.len() {
        return false;
    }
    dims.iter().zip(shape.iter()).all(|(dim, extent)| match dim {
        Dim::Any => true,
        Dim::Fixed(n) => n == extent,
    })
}

fn kinds_compatible(actual: &NlType, expected: &NlType) -> bool {
    actual.is_subtype_of(expected) || expected.is_subtype_of(actual)
}

/// Do two kinds meet below `Any`? Int8 and Float64 meet at Tensor;
/// StrChar and StrWide at String; Dict and Tensor only at Any.
fn kinds_share_ancestor(a: &NlType, b: &NlType) -> bool {
    if a == b {
        return true;
    }
    let mut lineage = vec![a.clone()];
    let mut cursor = a.clone();
    while let Some(parent) = cursor.parent() {
        lineage.push(parent.clone());
        cursor = parent;
    }
    let mut cursor = b.clone();
    loop {
        if cursor != NlType::Any && lineage.contains(&cursor) {
            return true;
        }
        match cursor.parent() {
            Some(parent) => cursor = parent,
            None => return false,
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::object::dict::{ClassInstance, DictData};
    use crate::object::{Object, TypeValue};
    use crate::types::NlType;

    use super::*;

    fn type_of(name: &str) -> Object {
        Object::type_value(TypeValue::simple(NlType::from_name(name)))
    }

    #[test]
    fn instance_walks_the_lattice() {
        let value = Object::int(100); // Int8
        assert!(check_instance(&value, &type_of("Int8")).unwrap());
        assert!(check_instance(&value, &type_of("Int16")).unwrap());
        assert!(check_instance(&value, &type_of("Int64")).unwrap());
        assert!(check_instance(&value, &type_of("Tensor")).unwrap());
        assert!(check_instance(&value, &type_of("Arithmetic")).unwrap());
        assert!(check_instance(&value, &type_of("Any")).unwrap());
        assert!(!check_instance(&value, &type_of("Bool")).unwrap());
        assert!(!check_instance(&value, &type_of("None")).unwrap());
    }

    #[test]
    fn instance_accepts_string_type_names() {
        let value = Object::int(1);
        assert!(check_instance(&value, &Object::str_bytes("Bool")).unwrap());
        assert!(check_instance(&value, &Object::str_bytes("Int64")).unwrap());
    }

    #[test]
    fn class_ancestry() {
        let car = Object::class(ClassInstance::new(
            "Car",
            vec!["Vehicle".to_string()],
            DictData::new(),
        ));
        assert!(check_instance(&car, &type_of("Car")).unwrap());
        assert!(check_instance(&car, &type_of("Vehicle")).unwrap());
        assert!(!check_instance(&car, &type_of("Boat")).unwrap());
        // a plain value is not an instance of a user class
        assert!(!check_instance(&Object::int(1), &type_of("Car")).unwrap());
    }

    #[test]
    fn structural_checks_named_fields() {
        let mut shape = DictData::new();
        shape.push(Some("x".to_string()), Object::int(0));
        shape.push(Some("y".to_string()), Object::int(0));
        let shape = Object::dict(shape);

        let mut point = DictData::new();
        point.push(Some("x".to_string()), Object::int(3));
        point.push(Some("y".to_string()), Object::int(4));
        point.push(Some("label".to_string()), Object::str_bytes("p"));
        let point = Object::dict(point);

        assert!(check_structural(&point, &shape).unwrap());

        let mut missing = DictData::new();
        missing.push(Some("x".to_string()), Object::int(3));
        let missing = Object::dict(missing);
        assert!(!check_structural(&missing, &shape).unwrap());
    }

    #[test]
    fn equal_values_are_structurally_compatible() {
        // a == b ⇒ a ~~ b: kinds meet below Any
        assert!(check_structural(&Object::int(5), &Object::float(5.0)).unwrap());
        assert!(check_structural(&Object::str_bytes("a"), &Object::str_wide("a")).unwrap());
        assert!(!check_structural(&Object::int(5), &Object::none()).unwrap());
    }

    #[test]
    fn strict_is_reflexive() {
        for value in [
            Object::int(5),
            Object::float(1.5),
            Object::str_bytes("s"),
            Object::none(),
            Object::dict(DictData::new()),
        ] {
            assert!(check_strict(&value, &value).unwrap(), "{value}");
        }
    }

    #[test]
    fn strict_rejects_kind_mismatch() {
        assert!(!check_strict(&Object::int(5), &Object::float(5.0)).unwrap());
        assert!(!check_strict(&Object::none(), &Object::int(0)).unwrap());
        // `5 ~~~ :Int8` — kind matches, no dims demanded
        assert!(check_strict(&Object::int(5), &type_of("Int8")).unwrap());
        assert!(!check_strict(&Object::int(500), &type_of("Int8")).unwrap());
    }
}
