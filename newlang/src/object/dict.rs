//! Ordered dictionaries and class instances.
//!
//! Dictionaries are shared, mutable containers (`Rc<RefCell<_>>`), so
//! assignment hands out another reference to the same storage and
//! iterators can hold a non-owning cursor over it.

use std::cell::RefCell;
use std::rc::Rc;

use crate::error::NlError;

use super::Object;

/// Dictionary storage: ordered `(name?, value)` pairs. Names need not
/// be unique; named lookup returns the first match.
#[derive(Debug, Clone, Default)]
pub struct DictData {
    items: Vec<(Option<String>, Object)>,
}

pub type DictRef = Rc<RefCell<DictData>>;

pub fn new_dict_ref(data: DictData) -> DictRef {
    Rc::new(RefCell::new(data))
}

impl DictData {
    pub fn new() -> DictData {
        DictData::default()
    }

    pub fn from_items(items: Vec<(Option<String>, Object)>) -> DictData {
        DictData { items }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn items(&self) -> &[(Option<String>, Object)] {
        &self.items
    }

    pub fn push(&mut self, name: Option<String>, value: Object) {
        self.items.push((name, value));
    }

    /// Insert before `index`; `index == len` appends.
    pub fn insert_before(
        &mut self,
        index: usize,
        name: Option<String>,
        value: Object,
    ) -> Result<(), NlError> {
        if index > self.items.len() {
            return Err(NlError::runtime(format!(
                "insert position {index} out of range for {} elements",
                self.items.len()
            )));
        }
        self.items.insert(index, (name, value));
        Ok(())
    }

    fn checked_index(&self, index: i64) -> Result<usize, NlError> {
        let len = self.items.len() as i64;
        let resolved = if index < 0 { len + index } else { index };
        if resolved < 0 || resolved >= len {
            return Err(NlError::runtime(format!(
                "index {index} out of range for {len} elements"
            )));
        }
        Ok(resolved as usize)
    }

    pub fn get_by_index(&self, index: i64) -> Result<Object, NlError> {
        let index = self.checked_index(index)?;
        Ok(self.items[index].1.clone())
    }

    pub fn name_at(&self, index: usize) -> Option<&str> {
        self.items.get(index).and_then(|(n, _)| n.as_deref())
    }

    pub fn position_of(&self, name: &str) -> Option<usize> {
        self.items
            .iter()
            .position(|(n, _)| n.as_deref() == Some(name))
    }

    pub fn get_by_name(&self, name: &str) -> Result<Object, NlError> {
        self.position_of(name)
            .map(|i| self.items[i].1.clone())
            .ok_or_else(|| NlError::runtime(format!("name '{name}' not found")))
    }

    /// Mutable access to one element (nested index-assignment paths).
    pub fn item_mut(&mut self, index: i64) -> Result<&mut Object, NlError> {
        let index = self.checked_index(index)?;
        Ok(&mut self.items[index].1)
    }

    pub fn item_mut_by_name(&mut self, name: &str) -> Result<&mut Object, NlError> {
        let index = self
            .position_of(name)
            .ok_or_else(|| NlError::runtime(format!("name '{name}' not found")))?;
        Ok(&mut self.items[index].1)
    }

    pub fn set_by_index(&mut self, index: i64, value: Object) -> Result<(), NlError> {
        let index = self.checked_index(index)?;
        self.items[index].1 = value;
        Ok(())
    }

    /// Replace the first entry named `name`, or append a new one.
    pub fn set_by_name(&mut self, name: &str, value: Object) {
        match self.position_of(name) {
            Some(index) => self.items[index].1 = value,
            None => self.items.push((Some(name.to_string()), value)),
        }
    }

    pub fn append_all(&mut self, other: &DictData) {
        self.items.extend(other.items.iter().cloned());
    }
}

/// A class instance: dictionary payload plus hierarchy info.
///
/// `ancestry` holds every ancestor class name, nearest first; it is
/// flattened at construction time, which keeps predicate checks cheap
/// and makes cycles unrepresentable.
#[derive(Debug, Clone)]
pub struct ClassInstance {
    pub class_name: String,
    pub ancestry: Vec<String>,
    pub data: DictRef,
}

impl ClassInstance {
    pub fn new(class_name: impl Into<String>, ancestry: Vec<String>, data: DictData) -> Self {
        Self {
            class_name: class_name.into(),
            ancestry,
            data: new_dict_ref(data),
        }
    }

    /// Does this instance belong to `name`, directly or by ancestry?
    pub fn is_instance_of(&self, name: &str) -> bool {
        self.class_name == name || self.ancestry.iter().any(|a| a == name)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn positional_and_named_access() {
        let mut dict = DictData::new();
        dict.push(Some("a".to_string()), Object::int(1));
        dict.push(None, Object::int(2));
        dict.push(Some("a".to_string()), Object::int(3));

        assert_eq!(dict.get_by_index(1).unwrap().as_i64(), Some(2));
        assert_eq!(dict.get_by_index(-1).unwrap().as_i64(), Some(3));
        // duplicate names: first match wins
        assert_eq!(dict.get_by_name("a").unwrap().as_i64(), Some(1));
        assert!(dict.get_by_name("missing").is_err());
        assert!(dict.get_by_index(3).is_err());
    }

    #[test]
    fn insert_before_keeps_order() {
        let mut dict = DictData::new();
        dict.push(None, Object::int(1));
        dict.push(None, Object::int(3));
        dict.insert_before(1, None, Object::int(2)).unwrap();
        let values: Vec<_> = dict.items().iter().map(|(_, v)| v.as_i64().unwrap()).collect();
        assert_eq!(values, vec![1, 2, 3]);
        assert!(dict.insert_before(5, None, Object::int(9)).is_err());
    }

    #[test]
    fn instance_membership_follows_ancestry() {
        let instance = ClassInstance::new(
            "Car",
            vec!["Vehicle".to_string(), "Thing".to_string()],
            DictData::new(),
        );
        assert!(instance.is_instance_of("Car"));
        assert!(instance.is_instance_of("Vehicle"));
        assert!(instance.is_instance_of("Thing"));
        assert!(!instance.is_instance_of("Boat"));
    }
}
