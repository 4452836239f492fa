//! Iterator values: a non-owning cursor over a dictionary.
//!
//! The cursor holds a weak reference; when the source dictionary is
//! dropped the iterator turns permanently exhausted instead of
//! dangling. An optional anchored regex filters entries by name, the
//! empty pattern selecting unnamed entries.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use regex::Regex;

use crate::error::NlError;

use super::dict::{DictData, DictRef};
use super::Object;

/// One step of an iterator.
#[derive(Debug, Clone)]
pub enum IterStep {
    Item(Object),
    End,
}

/// Iterator state.
#[derive(Debug)]
pub struct IterData {
    source: Weak<RefCell<DictData>>,
    /// Keeps a derived source (range or string materialized into a
    /// dictionary) alive for the iterator's lifetime; dictionaries
    /// proper are held weakly only.
    owned: Option<DictRef>,
    filter: Option<Regex>,
    pos: usize,
}

pub type IterRef = Rc<RefCell<IterData>>;

impl IterData {
    pub fn new(source: &DictRef, filter: Option<&str>) -> Result<IterData, NlError> {
        let filter = match filter {
            Some(pattern) => Some(compile_anchored(pattern)?),
            None => None,
        };
        Ok(IterData {
            source: Rc::downgrade(source),
            owned: None,
            filter,
            pos: 0,
        })
    }

    /// Iterator over a dictionary it owns itself (built from a range
    /// or string source).
    pub fn owned(source: DictRef, filter: Option<&str>) -> Result<IterData, NlError> {
        let mut iter = IterData::new(&source, filter)?;
        iter.owned = Some(source);
        Ok(iter)
    }

    pub fn into_ref(self) -> IterRef {
        Rc::new(RefCell::new(self))
    }

    fn matches(&self, name: Option<&str>) -> bool {
        match &self.filter {
            None => true,
            Some(regex) => regex.is_match(name.unwrap_or("")),
        }
    }

    /// Advance to the next matching element; sticky End once exhausted
    /// or once the source has been dropped.
    pub fn next(&mut self) -> IterStep {
        let Some(source) = self.source.upgrade() else {
            return IterStep::End;
        };
        let source = source.borrow();
        while self.pos < source.len() {
            let index = self.pos;
            self.pos += 1;
            let (name, value) = &source.items()[index];
            if self.matches(name.as_deref()) {
                return IterStep::Item(value.clone());
            }
        }
        IterStep::End
    }

    /// Read up to `count` elements into a dictionary. A negative count
    /// pads the tail with IteratorEnd markers to exactly `|count|`.
    pub fn take(&mut self, count: i64) -> DictData {
        let pad = count < 0;
        let want = count.unsigned_abs() as usize;
        let mut out = DictData::new();
        for _ in 0..want {
            match self.next() {
                IterStep::Item(value) => out.push(None, value),
                IterStep::End => {
                    if pad {
                        out.push(None, Object::iterator_end());
                    } else {
                        break;
                    }
                }
            }
        }
        out
    }

    /// Materialize everything that remains, preserving names.
    pub fn take_rest(&mut self) -> DictData {
        let mut out = DictData::new();
        let Some(source) = self.source.upgrade() else {
            return out;
        };
        let source = source.borrow();
        while self.pos < source.len() {
            let index = self.pos;
            self.pos += 1;
            let (name, value) = &source.items()[index];
            if self.matches(name.as_deref()) {
                out.push(name.clone(), value.clone());
            }
        }
        out
    }

    pub fn reset(&mut self) {
        self.pos = 0;
    }

    /// Next matching element without advancing.
    pub fn peek(&mut self) -> IterStep {
        let pos = self.pos;
        let step = self.next();
        self.pos = pos;
        step
    }

    pub fn is_valid(&self) -> bool {
        self.source.upgrade().is_some()
    }
}

/// Compile an anchored pattern: the whole name must match.
fn compile_anchored(pattern: &str) -> Result<Regex, NlError> {
    Regex::new(&format!("^(?:{pattern})$"))
        .map_err(|e| NlError::value(format!("bad iterator filter '{pattern}': {e}")))
}
