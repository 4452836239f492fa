//! FFI bridge: prototype terms to libffi descriptors, argument
//! marshaling, and the call itself.
//!
//! The fixed type mapping: Bool→uint8, Int8→sint8, Int16→sint16,
//! Int32→sint32, Int64→sint64, Float32→float, Float64→double,
//! StrChar/FmtChar→`char*` (UTF-8), StrWide→`wchar_t*`,
//! Pointer/File→`void*`.

pub mod loader;

use std::ffi::{c_void, CString};

use libffi::low::{self, ffi_cif, CodePtr};
use libffi::middle::Type;

use newlang_parser::{Term, TermKind};

use crate::error::NlError;
use crate::object::{NativeFunc, Object, Payload, Str};
use crate::types::ScalarKind;

pub use loader::{LibResolver, SymbolResolver};

/// The C-side kind an argument or return marshals through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FfiKind {
    Void,
    UInt8,
    SInt8,
    SInt16,
    SInt32,
    SInt64,
    Float,
    Double,
    CharPtr,
    WidePtr,
    Pointer,
}

impl FfiKind {
    /// Fixed mapping from NewLang type names.
    pub fn from_type_name(name: &str) -> Result<FfiKind, NlError> {
        Ok(match name {
            "Bool" => FfiKind::UInt8,
            "Int8" => FfiKind::SInt8,
            "Int16" => FfiKind::SInt16,
            "Int32" => FfiKind::SInt32,
            "Int64" => FfiKind::SInt64,
            "Float32" => FfiKind::Float,
            "Float64" => FfiKind::Double,
            "StrChar" | "FmtChar" => FfiKind::CharPtr,
            "StrWide" => FfiKind::WidePtr,
            "Pointer" | "File" => FfiKind::Pointer,
            "None" => FfiKind::Void,
            other => {
                return Err(NlError::type_error(format!(
                    "'{other}' has no native representation"
                )));
            }
        })
    }

    /// Kind inferred from a runtime value (variadic tails), with the
    /// default C argument promotions applied.
    pub fn from_value(value: &Object) -> Result<FfiKind, NlError> {
        Ok(match &value.payload {
            Payload::Tensor(t) if t.is_scalar() => match t.kind() {
                ScalarKind::Bool | ScalarKind::Int8 | ScalarKind::Int16 | ScalarKind::Int32 => {
                    FfiKind::SInt32
                }
                ScalarKind::Int64 => FfiKind::SInt64,
                ScalarKind::Float32 | ScalarKind::Float64 => FfiKind::Double,
            },
            Payload::Str(Str::Bytes(_)) => FfiKind::CharPtr,
            Payload::Str(Str::Wide(_)) => FfiKind::WidePtr,
            _ => {
                return Err(NlError::type_error(format!(
                    "{} cannot cross the FFI boundary",
                    value.kind().name()
                )));
            }
        })
    }

    fn libffi_type(&self) -> Type {
        match self {
            FfiKind::Void => Type::void(),
            FfiKind::UInt8 => Type::u8(),
            FfiKind::SInt8 => Type::i8(),
            FfiKind::SInt16 => Type::i16(),
            FfiKind::SInt32 => Type::i32(),
            FfiKind::SInt64 => Type::i64(),
            FfiKind::Float => Type::f32(),
            FfiKind::Double => Type::f64(),
            FfiKind::CharPtr | FfiKind::WidePtr | FfiKind::Pointer => Type::pointer(),
        }
    }
}

/// One marshaled argument value; the slot is what libffi points at.
enum Slot {
    U8(u8),
    I8(i8),
    I16(i16),
    I32(i32),
    I64(i64),
    F32(f32),
    F64(f64),
    Ptr(*mut c_void),
}

impl Slot {
    fn as_arg_ptr(&mut self) -> *mut c_void {
        match self {
            Slot::U8(v) => v as *mut u8 as *mut c_void,
            Slot::I8(v) => v as *mut i8 as *mut c_void,
            Slot::I16(v) => v as *mut i16 as *mut c_void,
            Slot::I32(v) => v as *mut i32 as *mut c_void,
            Slot::I64(v) => v as *mut i64 as *mut c_void,
            Slot::F32(v) => v as *mut f32 as *mut c_void,
            Slot::F64(v) => v as *mut f64 as *mut c_void,
            Slot::Ptr(v) => v as *mut *mut c_void as *mut c_void,
        }
    }
}

/// Marshaled arguments; string buffers outlive the call.
#[derive(Default)]
struct Marshalled {
    strings: Vec<CString>,
    wides: Vec<Vec<libc::wchar_t>>,
    slots: Vec<Slot>,
    kinds: Vec<FfiKind>,
}

impl Marshalled {
    /// Convert one value to its C-side slot. Widening is free;
    /// narrowing demands the value fit.
    fn push(&mut self, value: &Object, kind: FfiKind) -> Result<(), NlError> {
        let slot = match kind {
            FfiKind::Void => {
                return Err(NlError::type_error("void argument".to_string()));
            }
            FfiKind::UInt8 => Slot::U8(u8::from(value.is_truthy())),
            FfiKind::SInt8 => Slot::I8(narrow(value, i8::MIN as i64, i8::MAX as i64)? as i8),
            FfiKind::SInt16 => Slot::I16(narrow(value, i16::MIN as i64, i16::MAX as i64)? as i16),
            FfiKind::SInt32 => Slot::I32(narrow(value, i32::MIN as i64, i32::MAX as i64)? as i32),
            FfiKind::SInt64 => Slot::I64(narrow(value, i64::MIN, i64::MAX)?),
            FfiKind::Float => Slot::F32(value.number_value()? as f32),
            FfiKind::Double => Slot::F64(value.number_value()?),
            FfiKind::CharPtr => {
                let text = value
                    .as_str()
                    .map(Str::to_text)
                    .ok_or_else(|| string_expected(value))?;
                let c_string = CString::new(text)
                    .map_err(|_| NlError::value("string holds an interior NUL".to_string()))?;
                self.strings.push(c_string);
                let ptr = self.strings.last().expect("just pushed").as_ptr();
                Slot::Ptr(ptr as *mut c_void)
            }
            FfiKind::WidePtr => {
                let text = value
                    .as_str()
                    .map(Str::to_text)
                    .ok_or_else(|| string_expected(value))?;
                let mut buffer: Vec<libc::wchar_t> = text
                    .chars()
                    .map(|c| u32::from(c) as libc::wchar_t)
                    .collect();
                buffer.push(0);
                self.wides.push(buffer);
                let ptr = self.wides.last().expect("just pushed").as_ptr();
                Slot::Ptr(ptr as *mut c_void)
            }
            FfiKind::Pointer => {
                let address = value.as_i64().ok_or_else(|| {
                    NlError::type_error(format!(
                        "{} is not a pointer value",
                        value.kind().name()
                    ))
                })?;
                Slot::Ptr(address as *mut c_void)
            }
        };
        self.slots.push(slot);
        self.kinds.push(kind);
        Ok(())
    }
}

fn string_expected(value: &Object) -> NlError {
    NlError::type_error(format!("expected a string, got {}", value.kind().name()))
}

/// Integer narrowing that never silently wraps.
fn narrow(value: &Object, min: i64, max: i64) -> Result<i64, NlError> {
    let v = value.as_i64().ok_or_else(|| {
        NlError::type_error(format!("{} is not an integer", value.kind().name()))
    })?;
    if v < min || v > max {
        return Err(NlError::value(format!(
            "{v} does not fit the native argument range {min}..{max}"
        )));
    }
    Ok(v)
}

/// Formal kinds declared by a native prototype, plus return kind and
/// the variadic marker.
pub fn prototype_kinds(proto: &Term) -> Result<(Vec<FfiKind>, FfiKind, bool), NlError> {
    let mut kinds = Vec::new();
    let mut variadic = false;
    for (name, term) in &proto.args {
        if term.kind == TermKind::Ellipsis {
            variadic = true;
            break;
        }
        let type_name = term
            .annotation
            .as_ref()
            .map(|a| a.name.clone())
            .ok_or_else(|| {
                NlError::type_error(format!(
                    "native formal '{}' needs a type",
                    name.clone().unwrap_or_else(|| term.text.clone())
                ))
            })?;
        kinds.push(FfiKind::from_type_name(&type_name)?);
    }
    let ret = match &proto.annotation {
        Some(annotation) => FfiKind::from_type_name(&annotation.name)?,
        None => FfiKind::Void,
    };
    Ok((kinds, ret, variadic))
}

/// Call a resolved native function with bound arguments.
///
/// The fixed formals marshal to their declared kinds; variadic
/// extras derive their descriptors from the runtime kinds.
pub fn call_native(func: &NativeFunc, ptr: *mut c_void, args: &[Object]) -> Result<Object, NlError> {
    let (fixed_kinds, ret_kind, variadic) = prototype_kinds(&func.proto)?;

    if args.len() < fixed_kinds.len() || (!variadic && args.len() != fixed_kinds.len()) {
        return Err(NlError::runtime(format!(
            "native '{}' takes {} argument(s), got {}",
            func.name,
            fixed_kinds.len(),
            args.len()
        )));
    }

    let mut marshalled = Marshalled::default();
    for (value, kind) in args.iter().zip(fixed_kinds.iter()) {
        marshalled.push(value, *kind)?;
    }
    for value in &args[fixed_kinds.len()..] {
        let kind = FfiKind::from_value(value)?;
        marshalled.push(value, kind)?;
    }

    // Keep the Type values alive across the call; the cif borrows
    // their raw ffi_type pointers.
    let arg_types: Vec<Type> = marshalled
        .kinds
        .iter()
        .map(|k| k.libffi_type())
        .collect();
    let mut raw_types: Vec<*mut low::ffi_type> =
        arg_types.iter().map(|t| t.as_raw_ptr()).collect();
    let ret_type = ret_kind.libffi_type();

    let mut cif: ffi_cif = Default::default();
    // SAFETY: type pointers come from live `Type` values above; the
    // counts match `raw_types`.
    unsafe {
        let status = if variadic {
            low::prep_cif_var(
                &mut cif,
                low::ffi_abi_FFI_DEFAULT_ABI,
                fixed_kinds.len(),
                raw_types.len(),
                ret_type.as_raw_ptr(),
                raw_types.as_mut_ptr(),
            )
        } else {
            low::prep_cif(
                &mut cif,
                low::ffi_abi_FFI_DEFAULT_ABI,
                raw_types.len(),
                ret_type.as_raw_ptr(),
                raw_types.as_mut_ptr(),
            )
        };
        status.map_err(|e| NlError::runtime(format!("ffi descriptor rejected: {e:?}")))?;
    }

    let mut arg_ptrs: Vec<*mut c_void> = marshalled
        .slots
        .iter_mut()
        .map(Slot::as_arg_ptr)
        .collect();
    let code = CodePtr(ptr);

    // SAFETY: the prototype declared this signature; slots and string
    // buffers stay alive in `marshalled` until after the call.
    let result = unsafe {
        match ret_kind {
            FfiKind::Void => {
                low::call::<()>(&mut cif, code, arg_ptrs.as_mut_ptr());
                Object::none()
            }
            FfiKind::UInt8 => {
                let v: u8 = low::call(&mut cif, code, arg_ptrs.as_mut_ptr());
                Object::bool_value(v != 0)
            }
            FfiKind::SInt8 => {
                let v: i8 = low::call(&mut cif, code, arg_ptrs.as_mut_ptr());
                Object::int_typed(i64::from(v), ScalarKind::Int8)?
            }
            FfiKind::SInt16 => {
                let v: i16 = low::call(&mut cif, code, arg_ptrs.as_mut_ptr());
                Object::int_typed(i64::from(v), ScalarKind::Int16)?
            }
            FfiKind::SInt32 => {
                let v: i32 = low::call(&mut cif, code, arg_ptrs.as_mut_ptr());
                Object::int_typed(i64::from(v), ScalarKind::Int32)?
            }
            FfiKind::SInt64 => {
                let v: i64 = low::call(&mut cif, code, arg_ptrs.as_mut_ptr());
                Object::int_typed(v, ScalarKind::Int64)?
            }
            FfiKind::Float => {
                let v: f32 = low::call(&mut cif, code, arg_ptrs.as_mut_ptr());
                Object::tensor(crate::object::Tensor::scalar_f64(
                    f64::from(v),
                    ScalarKind::Float32,
                )?)
            }
            FfiKind::Double => {
                let v: f64 = low::call(&mut cif, code, arg_ptrs.as_mut_ptr());
                Object::float(v)
            }
            FfiKind::CharPtr | FfiKind::WidePtr | FfiKind::Pointer => {
                let v: *mut c_void = low::call(&mut cif, code, arg_ptrs.as_mut_ptr());
                Object::int_typed(v as i64, ScalarKind::Int64)?
            }
        }
    };

    Ok(result)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use newlang_parser::parse;

    use super::*;

    #[test]
    fn type_name_mapping_is_fixed() {
        assert_eq!(FfiKind::from_type_name("Bool").unwrap(), FfiKind::UInt8);
        assert_eq!(FfiKind::from_type_name("Int8").unwrap(), FfiKind::SInt8);
        assert_eq!(FfiKind::from_type_name("Int64").unwrap(), FfiKind::SInt64);
        assert_eq!(FfiKind::from_type_name("Float32").unwrap(), FfiKind::Float);
        assert_eq!(FfiKind::from_type_name("Float64").unwrap(), FfiKind::Double);
        assert_eq!(FfiKind::from_type_name("FmtChar").unwrap(), FfiKind::CharPtr);
        assert_eq!(FfiKind::from_type_name("StrWide").unwrap(), FfiKind::WidePtr);
        assert_eq!(FfiKind::from_type_name("File").unwrap(), FfiKind::Pointer);
        assert!(FfiKind::from_type_name("Dict").is_err());
    }

    #[test]
    fn prototype_kinds_read_the_term() {
        let proto = parse("printf(format:FmtChar, ...):Int32").unwrap();
        let (kinds, ret, variadic) = prototype_kinds(&proto).unwrap();
        assert_eq!(kinds, vec![FfiKind::CharPtr]);
        assert_eq!(ret, FfiKind::SInt32);
        assert!(variadic);

        let proto = parse("func_export(arg1:Int64, arg2:Int8=100):Int64").unwrap();
        let (kinds, ret, variadic) = prototype_kinds(&proto).unwrap();
        assert_eq!(kinds, vec![FfiKind::SInt64, FfiKind::SInt8]);
        assert_eq!(ret, FfiKind::SInt64);
        assert!(!variadic);
    }

    #[test]
    fn variadic_values_promote() {
        assert_eq!(
            FfiKind::from_value(&Object::int(5)).unwrap(),
            FfiKind::SInt32
        );
        assert_eq!(
            FfiKind::from_value(&Object::float(0.5)).unwrap(),
            FfiKind::Double
        );
        assert_eq!(
            FfiKind::from_value(&Object::str_bytes("hi")).unwrap(),
            FfiKind::CharPtr
        );
    }

    #[test]
    fn narrowing_checks_the_value() {
        assert!(narrow(&Object::int(1000), i8::MIN as i64, i8::MAX as i64).is_err());
        assert_eq!(narrow(&Object::int(100), i8::MIN as i64, i8::MAX as i64).unwrap(), 100);
    }
}
