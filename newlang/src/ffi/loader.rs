//! Symbol resolution behind a trait seam.
//!
//! The evaluator only needs `symbol_lookup(name, module) -> pointer`;
//! the default implementation searches shared libraries through
//! libloading, with an empty module meaning the main program image.
//! Tests (and embedders) register their own symbols instead.

use std::collections::HashMap;
use std::ffi::c_void;

use crate::error::NlError;

/// The `symbol(name, module) -> pointer` contract.
pub trait SymbolResolver {
    fn symbol_lookup(&mut self, name: &str, module: Option<&str>) -> Result<*mut c_void, NlError>;
}

/// Shared-library resolver; loaded modules stay in a registry so
/// their symbols remain valid for the interpreter's lifetime.
#[derive(Default)]
pub struct LibResolver {
    #[cfg(unix)]
    main: Option<libloading::os::unix::Library>,
    #[cfg(unix)]
    modules: HashMap<String, libloading::os::unix::Library>,
    #[cfg(not(unix))]
    _unsupported: std::marker::PhantomData<HashMap<String, ()>>,
}

impl LibResolver {
    pub fn new() -> LibResolver {
        LibResolver::default()
    }
}

#[cfg(unix)]
impl SymbolResolver for LibResolver {
    fn symbol_lookup(&mut self, name: &str, module: Option<&str>) -> Result<*mut c_void, NlError> {
        let library = match module {
            None | Some("") => {
                if self.main.is_none() {
                    self.main = Some(libloading::os::unix::Library::this());
                }
                self.main.as_ref().expect("just loaded")
            }
            Some(path) => {
                if !self.modules.contains_key(path) {
                    // SAFETY: loading a library runs its initializers;
                    // that is the documented contract of the FFI layer.
                    let library = unsafe { libloading::os::unix::Library::new(path) }
                        .map_err(|e| {
                            NlError::runtime(format!("cannot load module '{path}': {e}"))
                        })?;
                    self.modules.insert(path.to_string(), library);
                }
                self.modules.get(path).expect("just inserted")
            }
        };

        // SAFETY: the symbol is only used through prototypes the
        // caller declares; we hand back the raw address.
        let symbol = unsafe { library.get::<*mut c_void>(name.as_bytes()) }.map_err(|e| {
            NlError::runtime(format!("symbol '{name}' not found: {e}"))
        })?;
        Ok(unsafe { symbol.into_raw() } as *mut c_void)
    }
}

#[cfg(not(unix))]
impl SymbolResolver for LibResolver {
    fn symbol_lookup(&mut self, name: &str, _module: Option<&str>) -> Result<*mut c_void, NlError> {
        Err(NlError::runtime(format!(
            "native symbol lookup is not supported on this platform ('{name}')"
        )))
    }
}

/// Resolver over a fixed table; what the original exposes as
/// "add symbol" for embedding and tests.
#[derive(Debug, Default)]
pub struct StaticResolver {
    symbols: HashMap<String, usize>,
}

impl StaticResolver {
    pub fn new() -> StaticResolver {
        StaticResolver::default()
    }

    pub fn register(&mut self, name: impl Into<String>, ptr: *mut c_void) {
        self.symbols.insert(name.into(), ptr as usize);
    }
}

impl SymbolResolver for StaticResolver {
    fn symbol_lookup(&mut self, name: &str, _module: Option<&str>) -> Result<*mut c_void, NlError> {
        self.symbols
            .get(name)
            .map(|address| *address as *mut c_void)
            .ok_or_else(|| NlError::runtime(format!("symbol '{name}' not found")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn static_resolver_round_trip() {
        let mut resolver = StaticResolver::new();
        let mut value = 42i64;
        resolver.register("answer", &mut value as *mut i64 as *mut c_void);

        let found = resolver.symbol_lookup("answer", None).unwrap();
        assert_eq!(found as usize, &mut value as *mut i64 as usize);
        assert!(resolver.symbol_lookup("missing", None).is_err());
    }
}
