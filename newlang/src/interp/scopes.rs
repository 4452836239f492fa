//! Scope frames and the sigil lookup chain.
//!
//! Three tiers: the local stack (one frame per active call; its root
//! is the top-level frame of the run), the session frame, and the
//! process-wide global frame. Bare names see the local stack only;
//! `$name` falls through to the session, `@name` on to the globals;
//! `$.name` / `@.name` bypass shadowing.

use std::cell::RefCell;
use std::collections::HashSet;

use indexmap::IndexMap;
use log::warn;

use crate::error::NlError;
use crate::object::Object;

/// One ordered name→value mapping.
pub type Frame = IndexMap<String, Object>;

thread_local! {
    /// The process-wide global frame, shared by every interpreter on
    /// the thread (evaluation is single-threaded by design).
    static GLOBALS: RefCell<Frame> = RefCell::new(Frame::new());
}

/// Which tier a name resolved in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameKind {
    Local,
    Session,
    Global,
}

/// The scope state of one interpreter.
#[derive(Debug, Default)]
pub struct Scopes {
    /// Local stack; index 0 is the top-level frame
    locals: Vec<Frame>,
    session: Frame,
    /// Names already warned about for duplicate-global writes
    warned_globals: HashSet<String>,
}

impl Scopes {
    pub fn new() -> Scopes {
        Scopes {
            locals: vec![Frame::new()],
            session: Frame::new(),
            warned_globals: HashSet::new(),
        }
    }

    pub fn push_frame(&mut self, frame: Frame) {
        self.locals.push(frame);
    }

    pub fn pop_frame(&mut self) {
        debug_assert!(self.locals.len() > 1, "the root frame stays");
        if self.locals.len() > 1 {
            self.locals.pop();
        }
    }

    pub fn depth(&self) -> usize {
        self.locals.len()
    }

    // ==================== lookup ====================

    /// `name` — the local stack only, innermost first.
    pub fn get_bare(&self, name: &str) -> Option<Object> {
        self.locals
            .iter()
            .rev()
            .find_map(|frame| frame.get(name).cloned())
    }

    /// `$name` — local stack, then session.
    pub fn get_local(&self, name: &str) -> Option<Object> {
        self.get_bare(name)
            .or_else(|| self.session.get(name).cloned())
    }

    /// `@name` — local stack, session, then globals.
    pub fn get_module(&self, name: &str) -> Option<Object> {
        self.get_local(name)
            .or_else(|| GLOBALS.with(|g| g.borrow().get(name).cloned()))
    }

    /// `$.name` — session directly.
    pub fn get_session_direct(&self, name: &str) -> Option<Object> {
        self.session.get(name).cloned()
    }

    /// `@.name` — globals directly.
    pub fn get_global_direct(&self, name: &str) -> Option<Object> {
        GLOBALS.with(|g| g.borrow().get(name).cloned())
    }

    /// Where would this name resolve, following the `@name` chain?
    pub fn find(&self, name: &str) -> Option<FrameKind> {
        if self.locals.iter().any(|frame| frame.contains_key(name)) {
            return Some(FrameKind::Local);
        }
        if self.session.contains_key(name) {
            return Some(FrameKind::Session);
        }
        if GLOBALS.with(|g| g.borrow().contains_key(name)) {
            return Some(FrameKind::Global);
        }
        None
    }

    // ==================== mutation ====================

    /// Create a binding in the named tier. Duplicate session entries
    /// are rejected; duplicate globals warn once per session per name
    /// and the last write wins.
    pub fn create(&mut self, kind: FrameKind, name: &str, value: Object) -> Result<(), NlError> {
        match kind {
            FrameKind::Local => {
                let frame = self.locals.last_mut().expect("at least the root frame");
                frame.insert(name.to_string(), value);
                Ok(())
            }
            FrameKind::Session => {
                if self.session.contains_key(name) {
                    return Err(NlError::runtime(format!(
                        "session name '{name}' already exists"
                    )));
                }
                self.session.insert(name.to_string(), value);
                Ok(())
            }
            FrameKind::Global => {
                let exists = GLOBALS.with(|g| g.borrow().contains_key(name));
                if exists && self.warned_globals.insert(name.to_string()) {
                    warn!("global '{name}' is defined more than once; last write wins");
                }
                GLOBALS.with(|g| g.borrow_mut().insert(name.to_string(), value));
                Ok(())
            }
        }
    }

    /// Overwrite an existing binding where it resolved.
    pub fn assign(&mut self, kind: FrameKind, name: &str, value: Object) -> Result<(), NlError> {
        match kind {
            FrameKind::Local => {
                for frame in self.locals.iter_mut().rev() {
                    if let Some(slot) = frame.get_mut(name) {
                        *slot = value;
                        return Ok(());
                    }
                }
                Err(NlError::runtime(format!("name '{name}' is not defined")))
            }
            FrameKind::Session => {
                match self.session.get_mut(name) {
                    Some(slot) => {
                        *slot = value;
                        Ok(())
                    }
                    None => Err(NlError::runtime(format!(
                        "session name '{name}' is not defined"
                    ))),
                }
            }
            FrameKind::Global => {
                let done = GLOBALS.with(|g| {
                    let mut globals = g.borrow_mut();
                    match globals.get_mut(name) {
                        Some(slot) => {
                            *slot = value;
                            true
                        }
                        None => false,
                    }
                });
                if done {
                    Ok(())
                } else {
                    Err(NlError::runtime(format!(
                        "global name '{name}' is not defined"
                    )))
                }
            }
        }
    }

    /// Remove a binding following the resolution chain. Returns
    /// whether something was removed.
    pub fn remove(&mut self, name: &str) -> bool {
        for frame in self.locals.iter_mut().rev() {
            if frame.shift_remove(name).is_some() {
                return true;
            }
        }
        if self.session.shift_remove(name).is_some() {
            return true;
        }
        GLOBALS.with(|g| g.borrow_mut().shift_remove(name).is_some())
    }

    /// Names visible from here: the local chain plus the session,
    /// innermost first, without duplicates. Backs the `$` listing.
    pub fn visible_names(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        let mut out = Vec::new();
        for frame in self.locals.iter().rev() {
            for name in frame.keys() {
                if seen.insert(name.clone()) {
                    out.push(name.clone());
                }
            }
        }
        for name in self.session.keys() {
            if seen.insert(name.clone()) {
                out.push(name.clone());
            }
        }
        out
    }

    /// Test hook: clear the shared global frame.
    pub fn reset_globals() {
        GLOBALS.with(|g| g.borrow_mut().clear());
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn scopes() -> Scopes {
        Scopes::reset_globals();
        Scopes::new()
    }

    #[test]
    fn bare_lookup_is_local_only() {
        let mut s = scopes();
        s.create(FrameKind::Session, "x", Object::int(1)).unwrap();
        assert!(s.get_bare("x").is_none());
        assert_eq!(s.get_local("x").unwrap().as_i64(), Some(1));
    }

    #[test]
    fn local_shadows_session_and_direct_access_bypasses() {
        let mut s = scopes();
        s.create(FrameKind::Session, "x", Object::int(1)).unwrap();
        s.create(FrameKind::Local, "x", Object::int(2)).unwrap();

        assert_eq!(s.get_bare("x").unwrap().as_i64(), Some(2));
        assert_eq!(s.get_local("x").unwrap().as_i64(), Some(2));
        assert_eq!(s.get_session_direct("x").unwrap().as_i64(), Some(1));
    }

    #[test]
    fn module_chain_reaches_globals() {
        let mut s = scopes();
        s.create(FrameKind::Global, "g", Object::int(7)).unwrap();
        assert!(s.get_bare("g").is_none());
        assert!(s.get_local("g").is_none());
        assert_eq!(s.get_module("g").unwrap().as_i64(), Some(7));
        assert_eq!(s.get_global_direct("g").unwrap().as_i64(), Some(7));
    }

    #[test]
    fn duplicate_session_entries_are_rejected() {
        let mut s = scopes();
        s.create(FrameKind::Session, "x", Object::int(1)).unwrap();
        assert!(s.create(FrameKind::Session, "x", Object::int(2)).is_err());
    }

    #[test]
    fn duplicate_globals_last_write_wins() {
        let mut s = scopes();
        s.create(FrameKind::Global, "g", Object::int(1)).unwrap();
        s.create(FrameKind::Global, "g", Object::int(2)).unwrap();
        assert_eq!(s.get_global_direct("g").unwrap().as_i64(), Some(2));
    }

    #[test]
    fn call_frames_stack_and_unwind() {
        let mut s = scopes();
        s.create(FrameKind::Local, "outer", Object::int(1)).unwrap();
        s.push_frame(Frame::new());
        s.create(FrameKind::Local, "inner", Object::int(2)).unwrap();

        // inner frames see outer bindings
        assert!(s.get_bare("outer").is_some());
        assert!(s.get_bare("inner").is_some());

        s.pop_frame();
        assert!(s.get_bare("inner").is_none());
        assert!(s.get_bare("outer").is_some());
    }

    #[test]
    fn remove_reports_whether_something_was_removed() {
        let mut s = scopes();
        s.create(FrameKind::Local, "x", Object::int(1)).unwrap();
        assert!(s.remove("x"));
        assert!(!s.remove("x"));
    }

    #[test]
    fn visible_names_preserve_creation_order() {
        let mut s = scopes();
        s.create(FrameKind::Local, "a", Object::int(1)).unwrap();
        s.create(FrameKind::Local, "b", Object::int(2)).unwrap();
        assert_eq!(s.visible_names(), vec!["a".to_string(), "b".to_string()]);
    }
}
