//! REPL session: one interpreter kept alive across evaluations.

use crate::dsl;
use crate::error::SpannedNlError;
use crate::interp::{Interpreter, InterpreterConfig};
use crate::object::Object;

/// Outcome of one REPL evaluation.
#[derive(Debug)]
pub enum ReplOutcome {
    Value(Object),
    Error(SpannedNlError),
}

/// Session state: the interpreter (scopes, macros, classes) persists
/// across inputs; `ans` holds the last value.
pub struct ReplSession {
    interp: Interpreter,
    ans: Option<Object>,
    eval_count: u64,
}

impl std::fmt::Debug for ReplSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReplSession")
            .field("eval_count", &self.eval_count)
            .finish_non_exhaustive()
    }
}

impl ReplSession {
    pub fn new() -> Result<ReplSession, SpannedNlError> {
        Self::with_config(InterpreterConfig::default())
    }

    pub fn with_config(config: InterpreterConfig) -> Result<ReplSession, SpannedNlError> {
        let mut interp = Interpreter::with_config(config);
        dsl::install(&mut interp).map_err(SpannedNlError::new)?;
        Ok(ReplSession {
            interp,
            ans: None,
            eval_count: 0,
        })
    }

    /// Evaluate one input; the session survives errors.
    pub fn eval(&mut self, source: &str) -> ReplOutcome {
        self.eval_count += 1;
        match self.interp.eval_str(source) {
            Ok(value) => {
                self.ans = Some(value.clone());
                ReplOutcome::Value(value)
            }
            Err(error) => ReplOutcome::Error(SpannedNlError::new(error)),
        }
    }

    /// The last successful value.
    pub fn ans(&self) -> Option<&Object> {
        self.ans.as_ref()
    }

    pub fn eval_count(&self) -> u64 {
        self.eval_count
    }

    pub fn interpreter(&mut self) -> &mut Interpreter {
        &mut self.interp
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_persists_across_inputs() {
        let mut session = ReplSession::new().unwrap();
        assert!(matches!(session.eval("x := 41"), ReplOutcome::Value(_)));
        match session.eval("x + 1") {
            ReplOutcome::Value(value) => assert_eq!(value.as_i64(), Some(42)),
            ReplOutcome::Error(e) => panic!("unexpected error: {e}"),
        }
        assert_eq!(session.ans().unwrap().as_i64(), Some(42));
    }

    #[test]
    fn session_survives_errors() {
        let mut session = ReplSession::new().unwrap();
        session.eval("x := 1");
        assert!(matches!(session.eval("nosuch"), ReplOutcome::Error(_)));
        assert!(matches!(session.eval("x"), ReplOutcome::Value(_)));
    }

    #[test]
    fn macros_persist_across_inputs() {
        let mut session = ReplSession::new().unwrap();
        session.eval(r"\\twice(x) (\$x + \$x)\\\");
        match session.eval(r"\twice(21)") {
            ReplOutcome::Value(value) => assert_eq!(value.as_i64(), Some(42)),
            ReplOutcome::Error(e) => panic!("unexpected error: {e}"),
        }
    }
}
