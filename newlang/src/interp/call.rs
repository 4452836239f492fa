//! Call dispatch and argument binding.

use std::rc::Rc;

use newlang_parser::{Term, TermKind};

use crate::error::NlError;
use crate::object::{EvalFunc, NativeFunc, Object, Payload};
use crate::types::NlType;

use super::{CallCtx, EvalResult, Frame, Interpreter, Unwind};

/// One formal parameter of a prototype.
#[derive(Debug, Clone)]
pub struct Formal {
    pub name: String,
    pub default: Option<Term>,
    pub type_name: Option<String>,
}

/// A prototype's parameter list: formals plus a variadic marker.
#[derive(Debug, Clone, Default)]
pub struct Prototype {
    pub formals: Vec<Formal>,
    pub variadic: bool,
}

impl Prototype {
    /// Read the formal list out of a Call-shaped term.
    pub fn from_term(proto: &Term) -> Result<Prototype, NlError> {
        let mut formals = Vec::new();
        let mut variadic = false;
        for (index, (name, term)) in proto.args.iter().enumerate() {
            if term.kind == TermKind::Ellipsis && term.left.is_none() {
                if index + 1 != proto.args.len() {
                    return Err(NlError::runtime(
                        "'...' must be the last formal parameter".to_string(),
                    ));
                }
                variadic = true;
                break;
            }
            match name {
                // `name=default`
                Some(name) => formals.push(Formal {
                    name: name.clone(),
                    default: Some(term.clone()),
                    type_name: term.annotation.as_ref().map(|a| a.name.clone()),
                }),
                // plain `name[:Type]`
                None => {
                    if !term.is_named() && term.kind != TermKind::Name {
                        return Err(NlError::runtime(format!(
                            "formal parameter {} is not a name",
                            index + 1
                        )));
                    }
                    formals.push(Formal {
                        name: term.text.clone(),
                        default: None,
                        type_name: term.annotation.as_ref().map(|a| a.name.clone()),
                    });
                }
            }
        }
        Ok(Prototype { formals, variadic })
    }
}

impl Interpreter {
    /// `callee(args...)` once the callee is a value.
    pub(crate) fn dispatch_call(
        &mut self,
        callee: &Object,
        args: Vec<(Option<String>, Object)>,
        site: &Term,
    ) -> EvalResult {
        match &callee.payload {
            Payload::Type(type_value) => {
                super::comprehension::construct_from_values(self, type_value, args)
            }
            Payload::EvalFunc(func) => self.call_eval_func(func.clone(), callee.clone(), args),
            Payload::NativeFunc(func) => self.call_native_func(func, args),
            // Calling a string formats it with the arguments.
            Payload::Str(s) => {
                let mut positional = Vec::new();
                let mut named = Vec::new();
                for (name, value) in &args {
                    let text = argument_text(value);
                    match name {
                        Some(name) => named.push((name.clone(), text)),
                        None => positional.push(text),
                    }
                }
                Ok(Object::string(s.format(&positional, &named)))
            }
            _ => Err(Unwind::Error(NlError::type_error(format!(
                "{} is not callable (calling '{}')",
                callee.kind().name(),
                site.text
            )))),
        }
    }

    /// Interpreted call: bind, push a frame, run the body, pop on any
    /// exit. `--x--` unwinds land here.
    fn call_eval_func(
        &mut self,
        func: Rc<EvalFunc>,
        callee: Object,
        actuals: Vec<(Option<String>, Object)>,
    ) -> EvalResult {
        if self.scopes.depth() >= self.config.recursion_limit {
            return Err(Unwind::Error(NlError::runtime(format!(
                "recursion limit of {} frames reached",
                self.config.recursion_limit
            ))));
        }

        let prototype = Prototype::from_term(&func.proto)?;
        let bound = self.bind_arguments(&prototype, actuals)?;

        let memo_key = if func.pure_func && self.config.memoize_pure {
            let key = (
                func.name.clone(),
                bound
                    .iter()
                    .map(|(_, value)| value.to_string())
                    .collect::<Vec<_>>()
                    .join(","),
            );
            if let Some(cached) = self.memo.get(&key) {
                return Ok(cached.clone());
            }
            Some(key)
        } else {
            None
        };

        let mut frame = Frame::new();
        for (name, value) in &bound {
            if let Some(name) = name {
                frame.insert(name.clone(), value.clone());
            }
        }

        self.scopes.push_frame(frame);
        self.call_stack.push(CallCtx {
            callee,
            args: bound,
        });
        if func.pure_func {
            self.pure_depth += 1;
        }

        let outcome = self.eval_term(&func.body);

        if func.pure_func {
            self.pure_depth -= 1;
        }
        self.call_stack.pop();
        self.scopes.pop_frame();

        let result = match outcome {
            Ok(value) => Ok(value),
            Err(Unwind::Return(value)) => Ok(value),
            Err(other) => Err(other),
        };

        if let (Some(key), Ok(value)) = (memo_key, &result) {
            self.memo.insert(key, value.clone());
        }
        result
    }

    /// Native call through the FFI bridge, resolving the symbol once.
    fn call_native_func(
        &mut self,
        func: &Rc<NativeFunc>,
        actuals: Vec<(Option<String>, Object)>,
    ) -> EvalResult {
        if self.pure_depth > 0 {
            return Err(Unwind::Error(NlError::type_error(format!(
                "pure functions may not call native '{}'",
                func.name
            ))));
        }

        let prototype = Prototype::from_term(&func.proto)?;
        let bound = self.bind_arguments(&prototype, actuals)?;

        let ptr = match func.resolved_ptr() {
            Some(ptr) => ptr,
            None => {
                let ptr = self
                    .resolver
                    .symbol_lookup(func.symbol_name(), func.module.as_deref())?;
                log::debug!("resolved native symbol '{}'", func.symbol_name());
                func.cache_ptr(ptr);
                ptr
            }
        };

        let args: Vec<Object> = bound.into_iter().map(|(_, value)| value).collect();
        Ok(crate::ffi::call_native(func, ptr, &args)?)
    }

    /// Match actuals against formals per the calling convention:
    /// named actuals bind their formal, positionals fill the rest in
    /// order, defaults cover the unbound tail, and a trailing `...`
    /// collects leftovers.
    pub(crate) fn bind_arguments(
        &mut self,
        prototype: &Prototype,
        actuals: Vec<(Option<String>, Object)>,
    ) -> Result<Vec<(Option<String>, Object)>, Unwind> {
        let mut slots: Vec<Option<Object>> = vec![None; prototype.formals.len()];
        let mut varargs: Vec<(Option<String>, Object)> = Vec::new();

        // Named actuals first, so positionals can skip their slots.
        for (name, value) in &actuals {
            let Some(name) = name else { continue };
            match prototype.formals.iter().position(|f| f.name == *name) {
                Some(index) => {
                    if slots[index].is_some() {
                        return Err(Unwind::Error(NlError::runtime(format!(
                            "argument '{name}' bound twice"
                        ))));
                    }
                    slots[index] = Some(value.clone());
                }
                None if prototype.variadic => varargs.push((Some(name.clone()), value.clone())),
                None => {
                    return Err(Unwind::Error(NlError::runtime(format!(
                        "unknown argument name '{name}'"
                    ))));
                }
            }
        }

        // Positional actuals fill successive unbound formals.
        let mut cursor = 0usize;
        for (name, value) in &actuals {
            if name.is_some() {
                continue;
            }
            while cursor < slots.len() && slots[cursor].is_some() {
                cursor += 1;
            }
            if cursor < slots.len() {
                slots[cursor] = Some(value.clone());
                cursor += 1;
            } else if prototype.variadic {
                varargs.push((None, value.clone()));
            } else {
                return Err(Unwind::Error(NlError::runtime(format!(
                    "too many arguments: expected {}",
                    prototype.formals.len()
                ))));
            }
        }

        // Defaults, then the completeness check.
        let mut bound = Vec::with_capacity(slots.len() + varargs.len());
        for (index, slot) in slots.into_iter().enumerate() {
            let formal = &prototype.formals[index];
            let value = match slot {
                Some(value) => value,
                None => match &formal.default {
                    Some(default) => self.eval_term(default)?,
                    None => {
                        return Err(Unwind::Error(NlError::runtime(format!(
                            "argument '{}' is missing",
                            formal.name
                        ))));
                    }
                },
            };
            let value = match &formal.type_name {
                Some(type_name) => value.coerce_to(&NlType::from_name(type_name))?,
                None => value,
            };
            bound.push((Some(formal.name.clone()), value));
        }
        bound.extend(varargs);
        Ok(bound)
    }
}

/// Text form of a value used in string formatting: strings drop their
/// quotes, everything else prints normally.
fn argument_text(value: &Object) -> String {
    match value.as_str() {
        Some(s) => s.to_text(),
        None => value.to_string(),
    }
}
