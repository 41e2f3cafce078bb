use std::ops::Index;

use super::Value;

/// Ordered collection of values keyed by id.
///
/// Insertion order is the prompting and display order.
#[derive(Debug, Clone, Default)]
pub struct ValuesDict {
    values: Vec<Value>,
}

impl ValuesDict {
    pub fn new(values: impl IntoIterator<Item = Value>) -> Self {
        values.into_iter().collect()
    }

    pub fn get(&self, id: &str) -> Option<&Value> {
        self.values.iter().find(|v| v.id() == id)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut Value> {
        self.values.iter_mut().find(|v| v.id() == id)
    }

    /// Insert a value, replacing in place any value with the same id.
    ///
    /// Returns the replaced value.
    pub fn insert(&mut self, value: Value) -> Option<Value> {
        match self.values.iter_mut().find(|v| v.id() == value.id()) {
            Some(slot) => Some(std::mem::replace(slot, value)),
            None => {
                self.values.push(value);
                None
            }
        }
    }

    pub fn remove(&mut self, id: &str) -> Option<Value> {
        let pos = self.values.iter().position(|v| v.id() == id)?;
        Some(self.values.remove(pos))
    }

    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Value> {
        self.values.iter()
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, Value> {
        self.values.iter_mut()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.iter().map(Value::id)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl FromIterator<Value> for ValuesDict {
    fn from_iter<I: IntoIterator<Item = Value>>(iter: I) -> Self {
        let mut dict = Self::default();
        for value in iter {
            dict.insert(value);
        }
        dict
    }
}

impl<'a> IntoIterator for &'a ValuesDict {
    type Item = &'a Value;
    type IntoIter = std::slice::Iter<'a, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.values.iter()
    }
}

impl Index<&str> for ValuesDict {
    type Output = Value;

    #[allow(clippy::panic)]
    fn index(&self, id: &str) -> &Value {
        match self.get(id) {
            Some(v) => v,
            None => panic!("no value named \"{id}\""),
        }
    }
}
