//! Callable values: interpreted functions and native (FFI) functions.

use std::cell::Cell;
use std::ffi::c_void;

use newlang_parser::Term;

/// An interpreted function: prototype plus body, both parser terms.
#[derive(Debug, Clone)]
pub struct EvalFunc {
    pub name: String,
    /// Call-shaped term whose args are the formal parameters
    pub proto: Term,
    pub body: Term,
    /// `:-` / `::-` definitions; pure bodies may be memoized and must
    /// not reach native functions
    pub pure_func: bool,
}

/// A native function bound through the FFI bridge.
#[derive(Debug)]
pub struct NativeFunc {
    pub name: String,
    /// Parsed prototype: a Call term with per-argument annotations and
    /// a return-type annotation
    pub proto: Term,
    /// Overrides the lookup symbol when the exported name is mangled
    pub mangle: Option<String>,
    /// Shared library to search; empty means the main program image
    pub module: Option<String>,
    pub abi: FfiAbi,
    /// Lazily resolved symbol address
    ptr: Cell<Option<*mut c_void>>,
}

/// Calling convention tag. Only the platform default is supported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FfiAbi {
    #[default]
    Default,
}

impl NativeFunc {
    pub fn new(
        name: impl Into<String>,
        proto: Term,
        mangle: Option<String>,
        module: Option<String>,
    ) -> Self {
        Self {
            name: name.into(),
            proto,
            mangle,
            module,
            abi: FfiAbi::Default,
            ptr: Cell::new(None),
        }
    }

    /// The symbol to look up: the mangled override or the plain name.
    pub fn symbol_name(&self) -> &str {
        self.mangle.as_deref().unwrap_or(&self.name)
    }

    pub fn resolved_ptr(&self) -> Option<*mut c_void> {
        self.ptr.get()
    }

    pub fn cache_ptr(&self, ptr: *mut c_void) {
        self.ptr.set(Some(ptr));
    }
}

#[cfg(test)]
mod tests {
    use newlang_parser::parse;

    use super::*;

    #[test]
    fn symbol_name_prefers_mangle() {
        let proto = parse("f(x:Int32):Int32").unwrap();
        let plain = NativeFunc::new("f", proto.clone(), None, None);
        assert_eq!(plain.symbol_name(), "f");

        let mangled = NativeFunc::new("f", proto, Some("_f2".to_string()), None);
        assert_eq!(mangled.symbol_name(), "_f2");
    }

    #[test]
    fn pointer_cache_round_trip() {
        let proto = parse("f():Int32").unwrap();
        let func = NativeFunc::new("f", proto, None, None);
        assert!(func.resolved_ptr().is_none());
        let marker = 0x1234 as *mut c_void;
        func.cache_ptr(marker);
        assert_eq!(func.resolved_ptr(), Some(marker));
    }
}
