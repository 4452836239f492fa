//! The tree-walking evaluator and its supporting state.

pub mod call;
pub mod comprehension;
mod eval;
pub mod scopes;

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use newlang_parser::{MacroStore, Term};

use crate::error::NlError;
use crate::ffi::loader::LibResolver;
use crate::ffi::SymbolResolver;
use crate::object::{DictData, Object};

pub use scopes::{Frame, FrameKind, Scopes};

/// Evaluation leaves a statement either with a value or by unwinding.
/// Return and Break are control-flow carriers, not errors: try-blocks
/// catch only the `Error` variant.
#[derive(Debug)]
pub enum Unwind {
    Error(NlError),
    Return(Object),
    Break(Object),
}

impl From<NlError> for Unwind {
    fn from(error: NlError) -> Self {
        Unwind::Error(error)
    }
}

impl From<newlang_parser::ParseError> for Unwind {
    fn from(error: newlang_parser::ParseError) -> Self {
        Unwind::Error(NlError::Parse(error))
    }
}

pub type EvalResult = Result<Object, Unwind>;

/// Tunables consumed at construction.
#[derive(Debug, Clone)]
pub struct InterpreterConfig {
    /// Maximum depth of the local frame stack
    pub recursion_limit: usize,
    /// Macro expansion pass bound
    pub macro_expansion_limit: usize,
    /// Memoize pure (`:-`) functions; off by default
    pub memoize_pure: bool,
}

impl Default for InterpreterConfig {
    fn default() -> Self {
        Self {
            recursion_limit: 1024,
            macro_expansion_limit: newlang_parser::DEFAULT_EXPANSION_LIMIT,
            memoize_pure: false,
        }
    }
}

/// A registered user class.
#[derive(Debug, Clone)]
pub struct ClassDef {
    pub name: String,
    /// Direct parents (already registered at definition time)
    pub parents: Vec<String>,
    /// Flattened ancestor names, nearest first
    pub ancestry: Vec<String>,
    /// Field defaults
    pub prototype: DictData,
}

/// One active call's argument context, backing `$N` and `$`.
#[derive(Debug, Default)]
pub(crate) struct CallCtx {
    /// The callee itself (`$0`)
    pub callee: Object,
    /// Bound actuals in call order
    pub args: Vec<(Option<String>, Object)>,
}

/// The interpreter: scopes, macro store, class registry, FFI resolver.
pub struct Interpreter {
    pub(crate) scopes: Scopes,
    pub(crate) macros: MacroStore,
    pub(crate) config: InterpreterConfig,
    pub(crate) classes: HashMap<String, ClassDef>,
    pub(crate) resolver: Box<dyn SymbolResolver>,
    interrupt: Arc<AtomicBool>,
    pub(crate) call_stack: Vec<CallCtx>,
    /// Pure-function result cache, keyed by canonical print forms
    pub(crate) memo: HashMap<(String, String), Object>,
    /// Depth of pure-function evaluation; native calls are rejected
    /// while it is non-zero
    pub(crate) pure_depth: usize,
}

impl std::fmt::Debug for Interpreter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Interpreter")
            .field("config", &self.config)
            .field("classes", &self.classes.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}

impl Interpreter {
    pub fn new() -> Interpreter {
        Interpreter::with_config(InterpreterConfig::default())
    }

    pub fn with_config(config: InterpreterConfig) -> Interpreter {
        Interpreter {
            scopes: Scopes::new(),
            macros: MacroStore::new(),
            config,
            classes: HashMap::new(),
            resolver: Box::new(LibResolver::new()),
            interrupt: Arc::new(AtomicBool::new(false)),
            call_stack: Vec::new(),
            memo: HashMap::new(),
            pure_depth: 0,
        }
    }

    /// Replace the FFI symbol resolver (tests inject stubs here).
    pub fn set_resolver(&mut self, resolver: Box<dyn SymbolResolver>) {
        self.resolver = resolver;
    }

    /// The flag a signal handler flips to interrupt evaluation; it is
    /// checked at statement boundaries.
    pub fn interrupt_flag(&self) -> Arc<AtomicBool> {
        self.interrupt.clone()
    }

    pub(crate) fn check_interrupt(&self) -> Result<(), NlError> {
        if self.interrupt.swap(false, Ordering::Relaxed) {
            return Err(NlError::Signal(
                "evaluation interrupted by signal".to_string(),
            ));
        }
        Ok(())
    }

    /// Full pipeline: extract macros, expand, parse, evaluate.
    pub fn eval_str(&mut self, source: &str) -> Result<Object, NlError> {
        let mut buffer = source.to_string();
        self.macros.extract(&mut buffer)?;
        let expanded = self.macros.expand(&buffer, self.config.macro_expansion_limit)?;
        let term = newlang_parser::Parser::new(&expanded).parse_program()?;
        self.eval_root(&term)
    }

    /// Evaluate a parsed program, converting stray control-flow
    /// unwinds at the top level into their carried values.
    pub fn eval_root(&mut self, term: &Term) -> Result<Object, NlError> {
        match self.eval_term(term) {
            Ok(value) => Ok(value),
            Err(Unwind::Return(value)) | Err(Unwind::Break(value)) => Ok(value),
            Err(Unwind::Error(error)) => Err(error),
        }
    }

    /// The registered macro store (REPL introspection).
    pub fn macro_store(&self) -> &MacroStore {
        &self.macros
    }

    pub fn class_def(&self, name: &str) -> Option<&ClassDef> {
        self.classes.get(name)
    }
}
