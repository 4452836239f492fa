//! The built-in type lattice.
//!
//! ```text
//! Any
//!  ├── Arithmetic
//!  │    ├── Tensor
//!  │    │    ├── Bool ⊂ Int8 ⊂ Int16 ⊂ Int32 ⊂ Int64
//!  │    │    └── Float32 ⊂ Float64
//!  │    └── Fraction
//!  ├── String
//!  │    └── StrChar, StrWide, FmtChar
//!  ├── Function
//!  │    └── NativeFunc, EvalFunc
//!  ├── Dict, Class, Range, Iterator, Pointer, File, Type, ...
//!  └── None, Ellipsis, IteratorEnd, Error
//! ```
//!
//! Class-hierarchy membership (`a ~ :UserClass`) is resolved against
//! the interpreter's class registry, not here.

pub mod predicate;

use serde::{Deserialize, Serialize};

/// Scalar element kinds a tensor can carry, in promotion order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ScalarKind {
    Bool,
    Int8,
    Int16,
    Int32,
    Int64,
    Float32,
    Float64,
}

impl ScalarKind {
    pub fn is_float(&self) -> bool {
        matches!(self, ScalarKind::Float32 | ScalarKind::Float64)
    }

    pub fn is_integer(&self) -> bool {
        !self.is_float()
    }

    /// Arithmetic result kind for two operands.
    pub fn promote(a: ScalarKind, b: ScalarKind) -> ScalarKind {
        a.max(b)
    }

    /// Does an integer value fit this kind without loss?
    pub fn fits_i64(&self, value: i64) -> bool {
        match self {
            ScalarKind::Bool => value == 0 || value == 1,
            ScalarKind::Int8 => i8::try_from(value).is_ok(),
            ScalarKind::Int16 => i16::try_from(value).is_ok(),
            ScalarKind::Int32 => i32::try_from(value).is_ok(),
            ScalarKind::Int64 => true,
            // Integers above 2^53 lose precision in floats; tolerated for
            // explicit float targets, matching ordinary widening rules.
            ScalarKind::Float32 | ScalarKind::Float64 => true,
        }
    }

    /// The narrowest integer kind holding `value`.
    pub fn narrowest_int(value: i64) -> ScalarKind {
        if value == 0 || value == 1 {
            ScalarKind::Bool
        } else if i8::try_from(value).is_ok() {
            ScalarKind::Int8
        } else if i16::try_from(value).is_ok() {
            ScalarKind::Int16
        } else if i32::try_from(value).is_ok() {
            ScalarKind::Int32
        } else {
            ScalarKind::Int64
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            ScalarKind::Bool => "Bool",
            ScalarKind::Int8 => "Int8",
            ScalarKind::Int16 => "Int16",
            ScalarKind::Int32 => "Int32",
            ScalarKind::Int64 => "Int64",
            ScalarKind::Float32 => "Float32",
            ScalarKind::Float64 => "Float64",
        }
    }

    pub fn from_name(name: &str) -> Option<ScalarKind> {
        Some(match name {
            "Bool" => ScalarKind::Bool,
            "Int8" => ScalarKind::Int8,
            "Int16" => ScalarKind::Int16,
            "Int32" => ScalarKind::Int32,
            "Int64" => ScalarKind::Int64,
            "Float32" => ScalarKind::Float32,
            "Float64" => ScalarKind::Float64,
            _ => return None,
        })
    }
}

impl From<ScalarKind> for NlType {
    fn from(kind: ScalarKind) -> Self {
        match kind {
            ScalarKind::Bool => NlType::Bool,
            ScalarKind::Int8 => NlType::Int8,
            ScalarKind::Int16 => NlType::Int16,
            ScalarKind::Int32 => NlType::Int32,
            ScalarKind::Int64 => NlType::Int64,
            ScalarKind::Float32 => NlType::Float32,
            ScalarKind::Float64 => NlType::Float64,
        }
    }
}

/// A NewLang type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NlType {
    // Scalar tensor kinds
    Bool,
    Int8,
    Int16,
    Int32,
    Int64,
    Float32,
    Float64,
    // Abstract numeric tiers
    Tensor,
    Fraction,
    Arithmetic,
    // Strings
    StrChar,
    StrWide,
    FmtChar,
    String,
    // Containers and friends
    Dict,
    /// User class by name
    Class(std::string::String),
    Range,
    Iterator,
    IteratorEnd,
    // Callables
    NativeFunc,
    EvalFunc,
    Function,
    // FFI carriers
    Pointer,
    File,
    // First-class types and markers
    Type,
    None,
    Ellipsis,
    Error,
    Any,
}

impl NlType {
    /// Parse a builtin type name; unknown names are user classes.
    pub fn from_name(name: &str) -> NlType {
        match name {
            "Bool" => NlType::Bool,
            "Int8" => NlType::Int8,
            "Int16" => NlType::Int16,
            "Int32" => NlType::Int32,
            "Int64" => NlType::Int64,
            "Float32" => NlType::Float32,
            "Float64" => NlType::Float64,
            "Tensor" => NlType::Tensor,
            "Fraction" => NlType::Fraction,
            "Arithmetic" => NlType::Arithmetic,
            "StrChar" => NlType::StrChar,
            "StrWide" => NlType::StrWide,
            "FmtChar" => NlType::FmtChar,
            "String" => NlType::String,
            "Dict" => NlType::Dict,
            "Range" => NlType::Range,
            "Iterator" => NlType::Iterator,
            "IteratorEnd" => NlType::IteratorEnd,
            "NativeFunc" => NlType::NativeFunc,
            "EvalFunc" => NlType::EvalFunc,
            "Function" => NlType::Function,
            "Pointer" => NlType::Pointer,
            "File" => NlType::File,
            "Type" => NlType::Type,
            "None" => NlType::None,
            "Ellipsis" => NlType::Ellipsis,
            "Error" => NlType::Error,
            "Any" => NlType::Any,
            other => NlType::Class(other.to_string()),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            NlType::Bool => "Bool",
            NlType::Int8 => "Int8",
            NlType::Int16 => "Int16",
            NlType::Int32 => "Int32",
            NlType::Int64 => "Int64",
            NlType::Float32 => "Float32",
            NlType::Float64 => "Float64",
            NlType::Tensor => "Tensor",
            NlType::Fraction => "Fraction",
            NlType::Arithmetic => "Arithmetic",
            NlType::StrChar => "StrChar",
            NlType::StrWide => "StrWide",
            NlType::FmtChar => "FmtChar",
            NlType::String => "String",
            NlType::Dict => "Dict",
            NlType::Class(name) => name,
            NlType::Range => "Range",
            NlType::Iterator => "Iterator",
            NlType::IteratorEnd => "IteratorEnd",
            NlType::NativeFunc => "NativeFunc",
            NlType::EvalFunc => "EvalFunc",
            NlType::Function => "Function",
            NlType::Pointer => "Pointer",
            NlType::File => "File",
            NlType::Type => "Type",
            NlType::None => "None",
            NlType::Ellipsis => "Ellipsis",
            NlType::Error => "Error",
            NlType::Any => "Any",
        }
    }

    /// The direct parent in the lattice, if any.
    fn parent(&self) -> Option<NlType> {
        Some(match self {
            NlType::Bool => NlType::Int8,
            NlType::Int8 => NlType::Int16,
            NlType::Int16 => NlType::Int32,
            NlType::Int32 => NlType::Int64,
            NlType::Int64 => NlType::Tensor,
            NlType::Float32 => NlType::Float64,
            NlType::Float64 => NlType::Tensor,
            NlType::Tensor => NlType::Arithmetic,
            NlType::Fraction => NlType::Arithmetic,
            NlType::Arithmetic => NlType::Any,
            NlType::StrChar | NlType::StrWide | NlType::FmtChar => NlType::String,
            NlType::String => NlType::Any,
            NlType::NativeFunc | NlType::EvalFunc => NlType::Function,
            NlType::Function => NlType::Any,
            NlType::Dict
            | NlType::Class(_)
            | NlType::Range
            | NlType::Iterator
            | NlType::IteratorEnd
            | NlType::Pointer
            | NlType::File
            | NlType::Type
            | NlType::None
            | NlType::Ellipsis
            | NlType::Error => NlType::Any,
            NlType::Any => return Option::None,
        })
    }

    /// Subtype test along the built-in lattice (reflexive).
    pub fn is_subtype_of(&self, other: &NlType) -> bool {
        if self == other || *other == NlType::Any {
            return true;
        }
        let mut current = self.clone();
        while let Some(parent) = current.parent() {
            if parent == *other {
                return true;
            }
            current = parent;
        }
        false
    }

    /// Scalar kind for concrete tensor types.
    pub fn scalar_kind(&self) -> Option<ScalarKind> {
        Some(match self {
            NlType::Bool => ScalarKind::Bool,
            NlType::Int8 => ScalarKind::Int8,
            NlType::Int16 => ScalarKind::Int16,
            NlType::Int32 => ScalarKind::Int32,
            NlType::Int64 => ScalarKind::Int64,
            NlType::Float32 => ScalarKind::Float32,
            NlType::Float64 => ScalarKind::Float64,
            _ => return Option::None,
        })
    }
}

impl std::fmt::Display for NlType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, ":{}", self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integer_chain_is_ordered() {
        assert!(NlType::Bool.is_subtype_of(&NlType::Int8));
        assert!(NlType::Bool.is_subtype_of(&NlType::Int64));
        assert!(NlType::Int8.is_subtype_of(&NlType::Tensor));
        assert!(NlType::Int8.is_subtype_of(&NlType::Arithmetic));
        assert!(NlType::Int8.is_subtype_of(&NlType::Any));
        assert!(!NlType::Int16.is_subtype_of(&NlType::Int8));
        assert!(!NlType::Int8.is_subtype_of(&NlType::Bool));
    }

    #[test]
    fn float_chain_is_parallel() {
        assert!(NlType::Float32.is_subtype_of(&NlType::Float64));
        assert!(NlType::Float64.is_subtype_of(&NlType::Tensor));
        assert!(!NlType::Float32.is_subtype_of(&NlType::Int64));
        assert!(!NlType::Int64.is_subtype_of(&NlType::Float64));
    }

    #[test]
    fn strings_and_functions() {
        assert!(NlType::StrChar.is_subtype_of(&NlType::String));
        assert!(NlType::StrWide.is_subtype_of(&NlType::String));
        assert!(NlType::FmtChar.is_subtype_of(&NlType::String));
        assert!(NlType::NativeFunc.is_subtype_of(&NlType::Function));
        assert!(!NlType::String.is_subtype_of(&NlType::Arithmetic));
    }

    #[test]
    fn none_is_only_none_and_any() {
        assert!(NlType::None.is_subtype_of(&NlType::None));
        assert!(NlType::None.is_subtype_of(&NlType::Any));
        assert!(!NlType::None.is_subtype_of(&NlType::Tensor));
    }

    #[test]
    fn narrowest_int_inference() {
        assert_eq!(ScalarKind::narrowest_int(0), ScalarKind::Bool);
        assert_eq!(ScalarKind::narrowest_int(1), ScalarKind::Bool);
        assert_eq!(ScalarKind::narrowest_int(123), ScalarKind::Int8);
        assert_eq!(ScalarKind::narrowest_int(300), ScalarKind::Int16);
        assert_eq!(ScalarKind::narrowest_int(70000), ScalarKind::Int32);
        assert_eq!(ScalarKind::narrowest_int(5_000_000_000), ScalarKind::Int64);
        assert_eq!(ScalarKind::narrowest_int(-5), ScalarKind::Int8);
    }

    #[test]
    fn promotion_follows_rank() {
        assert_eq!(
            ScalarKind::promote(ScalarKind::Bool, ScalarKind::Int32),
            ScalarKind::Int32
        );
        assert_eq!(
            ScalarKind::promote(ScalarKind::Int64, ScalarKind::Float32),
            ScalarKind::Float32
        );
    }

    #[test]
    fn unknown_names_become_classes() {
        assert_eq!(
            NlType::from_name("Vehicle"),
            NlType::Class("Vehicle".to_string())
        );
        assert_eq!(NlType::from_name("Int8"), NlType::Int8);
    }
}
