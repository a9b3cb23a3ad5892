//! FILENAME: core/xbrl-model/src/fact.rs
//! Facts and the fact store contract.
//!
//! A fact is one reported, dimensionally qualified data point. Facts are
//! referenced by `FactId`, which doubles as document order: a lower id was
//! reported earlier. The `FactStore` trait is what the table engine needs from
//! whatever holds the instance data; `InMemoryFactStore` keeps the facts in a
//! vector with interned dimension/concept indexes.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::aspect::{Aspect, AspectValue, DimensionValue, EntityIdentifier, Period, Unit};
use crate::qname::QName;

/// Index of a fact in its store, in document order.
pub type FactId = u32;

/// An ordered set of fact references. Iteration follows document order.
pub type FactSet = BTreeSet<FactId>;

// ============================================================================
// FACT
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FactValue {
    /// Numeric value in its lexical form.
    Numeric(String),
    Text(String),
    Nil,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fact {
    /// Assigned by the store when the fact is added.
    pub id: FactId,
    pub concept: QName,
    pub entity: EntityIdentifier,
    pub period: Period,
    pub unit: Option<Unit>,
    /// Reported dimension values. Dimensions not listed take their default.
    pub dimensions: BTreeMap<QName, DimensionValue>,
    pub value: FactValue,
}

impl Fact {
    pub fn new(concept: QName, entity: EntityIdentifier, period: Period, value: FactValue) -> Self {
        Fact {
            id: 0,
            concept,
            entity,
            period,
            unit: None,
            dimensions: BTreeMap::new(),
            value,
        }
    }

    pub fn with_unit(mut self, unit: Unit) -> Self {
        self.unit = Some(unit);
        self
    }

    pub fn with_member(mut self, dimension: QName, member: QName) -> Self {
        self.dimensions.insert(dimension, DimensionValue::Explicit(member));
        self
    }

    pub fn with_typed(mut self, dimension: QName, value: impl Into<String>) -> Self {
        self.dimensions
            .insert(dimension, DimensionValue::Typed(value.into()));
        self
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self.value, FactValue::Numeric(_))
    }

    /// Value as it should appear in a rendered cell.
    pub fn rendered_value(&self) -> String {
        match &self.value {
            FactValue::Numeric(v) | FactValue::Text(v) => v.clone(),
            FactValue::Nil => String::new(),
        }
    }

    /// The value this fact reports for an aspect, if any.
    ///
    /// An unreported dimension yields `None`; callers that need default
    /// equivalence consult the taxonomy.
    pub fn aspect_value(&self, aspect: &Aspect) -> Option<AspectValue> {
        match aspect {
            Aspect::Concept => Some(AspectValue::Concept(self.concept.clone())),
            Aspect::Entity => Some(AspectValue::Entity(self.entity.clone())),
            Aspect::Period => Some(AspectValue::Period(self.period.clone())),
            Aspect::Unit => self.unit.clone().map(AspectValue::Unit),
            Aspect::Dimension(dim) => self.dimensions.get(dim).map(|v| match v {
                DimensionValue::Explicit(member) => AspectValue::Member(member.clone()),
                DimensionValue::Typed(value) => AspectValue::Typed(value.clone()),
            }),
        }
    }
}

// ============================================================================
// FACT STORE CONTRACT
// ============================================================================

/// Member selection for the dimension index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemberSelector<'a> {
    /// Facts reporting this explicit member.
    Member(&'a QName),
    /// Facts that do not report the dimension at all.
    Absent,
}

/// Read-only access to the facts of one instance.
pub trait FactStore {
    fn all_facts(&self) -> FactSet;

    fn fact(&self, id: FactId) -> Option<&Fact>;

    fn facts_by_dimension_member(&self, dimension: &QName, member: MemberSelector<'_>) -> FactSet;

    fn facts_by_concept(&self, concept: &QName) -> FactSet {
        self.all_facts()
            .into_iter()
            .filter(|id| self.fact(*id).map_or(false, |f| &f.concept == concept))
            .collect()
    }
}

// ============================================================================
// IN-MEMORY FACT STORE
// ============================================================================

/// Fact store backed by a vector, with concept and dimension-member indexes.
#[derive(Debug, Clone, Default)]
pub struct InMemoryFactStore {
    facts: Vec<Fact>,
    by_concept: FxHashMap<QName, FactSet>,
    by_member: FxHashMap<(QName, QName), FactSet>,
    /// Facts reporting each dimension with any value.
    reporting: FxHashMap<QName, FactSet>,
}

impl InMemoryFactStore {
    pub fn new() -> Self {
        InMemoryFactStore::default()
    }

    /// Adds a fact, assigning it the next id in document order.
    pub fn add(&mut self, mut fact: Fact) -> FactId {
        let id = self.facts.len() as FactId;
        fact.id = id;

        self.by_concept
            .entry(fact.concept.clone())
            .or_default()
            .insert(id);
        for (dim, value) in &fact.dimensions {
            self.reporting.entry(dim.clone()).or_default().insert(id);
            if let DimensionValue::Explicit(member) = value {
                self.by_member
                    .entry((dim.clone(), member.clone()))
                    .or_default()
                    .insert(id);
            }
        }

        self.facts.push(fact);
        id
    }

    pub fn len(&self) -> usize {
        self.facts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.facts.is_empty()
    }
}

impl FactStore for InMemoryFactStore {
    fn all_facts(&self) -> FactSet {
        (0..self.facts.len() as FactId).collect()
    }

    fn fact(&self, id: FactId) -> Option<&Fact> {
        self.facts.get(id as usize)
    }

    fn facts_by_dimension_member(&self, dimension: &QName, member: MemberSelector<'_>) -> FactSet {
        match member {
            MemberSelector::Member(member) => self
                .by_member
                .get(&(dimension.clone(), member.clone()))
                .cloned()
                .unwrap_or_default(),
            MemberSelector::Absent => match self.reporting.get(dimension) {
                Some(reporting) => self
                    .all_facts()
                    .into_iter()
                    .filter(|id| !reporting.contains(id))
                    .collect(),
                None => self.all_facts(),
            },
        }
    }

    fn facts_by_concept(&self, concept: &QName) -> FactSet {
        self.by_concept.get(concept).cloned().unwrap_or_default()
    }
}
