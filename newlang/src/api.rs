//! Programmatic entry points for embedding the interpreter.

use std::path::Path;

use crate::dsl;
use crate::error::{NlError, SpannedNlError};
use crate::interp::{Interpreter, InterpreterConfig};
use crate::object::Object;

/// Evaluate one source string in a fresh interpreter with the DSL
/// prelude installed.
pub fn eval_str(source: &str) -> Result<Object, SpannedNlError> {
    let mut interp = new_interpreter(InterpreterConfig::default())?;
    interp.eval_str(source).map_err(SpannedNlError::new)
}

/// Run a source file; a leading `#!` line is ignored by the lexer.
pub fn run_file(path: &Path) -> Result<Object, SpannedNlError> {
    let source = std::fs::read_to_string(path).map_err(|e| {
        SpannedNlError::new(NlError::runtime(format!(
            "cannot read {}: {e}",
            path.display()
        )))
    })?;
    eval_str(&source)
}

/// A fresh interpreter with the macro prelude registered.
pub fn new_interpreter(config: InterpreterConfig) -> Result<Interpreter, SpannedNlError> {
    let mut interp = Interpreter::with_config(config);
    dsl::install(&mut interp).map_err(SpannedNlError::new)?;
    Ok(interp)
}

/// Evaluate and report as JSON: `{"ok": bool, "kind": ..., "value": ...}`
/// with the normative print form as the value (embedder convenience).
pub fn eval_str_json(source: &str) -> serde_json::Value {
    match eval_str(source) {
        Ok(value) => serde_json::json!({
            "ok": true,
            "kind": value.kind().name(),
            "value": value.to_string(),
        }),
        Err(error) => serde_json::json!({
            "ok": false,
            "kind": error.error.kind_name(),
            "error": error.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn eval_str_returns_the_last_value() {
        let value = eval_str("1 + 2").unwrap();
        assert_eq!(value.as_i64(), Some(3));
    }

    #[test]
    fn parse_errors_carry_their_span() {
        let err = eval_str("x := 'oops").unwrap_err();
        assert!(err.span.is_some());
    }

    #[test]
    fn json_report_forms() {
        let ok = eval_str_json("40 + 2");
        assert_eq!(ok["ok"], true);
        assert_eq!(ok["value"], "42");

        let err = eval_str_json("nosuch");
        assert_eq!(err["ok"], false);
        assert_eq!(err["kind"], "RuntimeError");
    }
}
