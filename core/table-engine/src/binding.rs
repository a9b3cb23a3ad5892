//! FILENAME: core/table-engine/src/binding.rs
//! AspectBinding - an "aspect -> value" map merged along header paths.
//!
//! Structural nodes hold partial bindings. A body cell's fact prototype is the
//! merge of every binding along its z, y and x paths, where a binding made
//! closer to the leaf overrides one inherited from an ancestor.

use std::collections::BTreeMap;

use xbrl_model::{Aspect, AspectValue, QName};

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AspectBinding {
    values: BTreeMap<Aspect, AspectValue>,
}

impl AspectBinding {
    pub fn new() -> Self {
        AspectBinding::default()
    }

    pub fn get(&self, aspect: &Aspect) -> Option<&AspectValue> {
        self.values.get(aspect)
    }

    pub fn contains(&self, aspect: &Aspect) -> bool {
        self.values.contains_key(aspect)
    }

    pub fn insert(&mut self, aspect: Aspect, value: AspectValue) -> Option<AspectValue> {
        self.values.insert(aspect, value)
    }

    /// Binds the aspect only if it is not bound yet. Returns whether it was bound.
    pub fn insert_if_absent(&mut self, aspect: Aspect, value: AspectValue) -> bool {
        if self.values.contains_key(&aspect) {
            return false;
        }
        self.values.insert(aspect, value);
        true
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Aspect, &AspectValue)> {
        self.values.iter()
    }

    /// Bound dimensions and their values.
    pub fn dimensions(&self) -> impl Iterator<Item = (&QName, &AspectValue)> {
        self.values
            .iter()
            .filter_map(|(aspect, value)| aspect.dimension().map(|dim| (dim, value)))
    }

    pub fn concept(&self) -> Option<&QName> {
        match self.values.get(&Aspect::Concept) {
            Some(AspectValue::Concept(q)) => Some(q),
            _ => None,
        }
    }

    pub fn has_entry_surrogate(&self) -> bool {
        self.values.values().any(AspectValue::is_entry_surrogate)
    }

    /// Merges `other` into this binding; values in `other` win.
    pub fn override_with(&mut self, other: &AspectBinding) {
        for (aspect, value) in &other.values {
            self.values.insert(aspect.clone(), value.clone());
        }
    }
}

impl FromIterator<(Aspect, AspectValue)> for AspectBinding {
    fn from_iter<I: IntoIterator<Item = (Aspect, AspectValue)>>(iter: I) -> Self {
        AspectBinding {
            values: iter.into_iter().collect(),
        }
    }
}
