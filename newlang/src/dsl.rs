//! The stock macro prelude that bootstraps control-flow keywords.
//!
//! NewLang has no `if` or `while` in its grammar; the driver and the
//! REPL register these macros so programs can use the keyword forms,
//! which expand to the guard/arrow constructs the evaluator handles.

use crate::error::NlError;
use crate::interp::Interpreter;

/// The prelude source, in definition form.
pub const PRELUDE: &str = r"
\\if(cond)   [\$cond]-->\\\
\\elif(cond) ,[\$cond]-->\\\
\\else       ,[_]-->\\\
\\while(cond) [\$cond]<->\\\
\\return      --\\\
\\return(...) --\$*--\\\
\\break       ++\\\
\\break(...)  ++\$*++\\\
\\true  1\\\
\\yes   1\\\
\\false 0\\\
\\no    0\\\
\\this  $0\\\
";

/// Register the prelude macros into an interpreter's store.
pub fn install(interp: &mut Interpreter) -> Result<(), NlError> {
    let mut buffer = PRELUDE.to_string();
    interp.macros.extract(&mut buffer)?;
    Ok(())
}
