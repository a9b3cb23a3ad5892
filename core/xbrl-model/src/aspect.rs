//! FILENAME: core/xbrl-model/src/aspect.rs
//! Aspects and aspect values.
//!
//! An aspect is one reportable dimension of a fact: its concept, entity,
//! period, unit, or the value of an explicit or typed dimension. Table
//! definitions bind aspects to values; facts carry a value for each aspect
//! they report.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::fmt;
use std::hash::{Hash, Hasher};

use crate::qname::QName;

// ============================================================================
// ASPECTS
// ============================================================================

/// A reportable dimension of a fact.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Aspect {
    Concept,
    Entity,
    Period,
    Unit,
    /// Explicit or typed dimension, identified by the dimension concept.
    Dimension(QName),
}

impl Aspect {
    pub fn is_dimension(&self) -> bool {
        matches!(self, Aspect::Dimension(_))
    }

    pub fn dimension(&self) -> Option<&QName> {
        match self {
            Aspect::Dimension(dim) => Some(dim),
            _ => None,
        }
    }
}

impl fmt::Display for Aspect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Aspect::Concept => write!(f, "concept"),
            Aspect::Entity => write!(f, "entity-identifier"),
            Aspect::Period => write!(f, "period"),
            Aspect::Unit => write!(f, "unit"),
            Aspect::Dimension(dim) => write!(f, "{}", dim),
        }
    }
}

// ============================================================================
// PERIODS
// ============================================================================

/// Period type used by filters and concept declarations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PeriodType {
    Instant,
    Duration,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Period {
    Instant(NaiveDate),
    Duration { start: NaiveDate, end: NaiveDate },
    Forever,
}

impl Period {
    pub fn period_type(&self) -> PeriodType {
        match self {
            Period::Instant(_) => PeriodType::Instant,
            Period::Duration { .. } | Period::Forever => PeriodType::Duration,
        }
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Period::Instant(date) => write!(f, "{}", date),
            Period::Duration { start, end } => write!(f, "{}/{}", start, end),
            Period::Forever => write!(f, "forever"),
        }
    }
}

// ============================================================================
// ENTITIES AND UNITS
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityIdentifier {
    pub scheme: String,
    pub value: String,
}

impl EntityIdentifier {
    pub fn new(scheme: impl Into<String>, value: impl Into<String>) -> Self {
        EntityIdentifier {
            scheme: scheme.into(),
            value: value.into(),
        }
    }
}

/// A unit as multiply/divide measure lists.
///
/// Equality and hashing treat each list as a set, so `a*b` equals `b*a`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Unit {
    pub multiply: SmallVec<[QName; 2]>,
    #[serde(default)]
    pub divide: SmallVec<[QName; 1]>,
}

impl Unit {
    pub fn simple(measure: QName) -> Self {
        let mut multiply = SmallVec::new();
        multiply.push(measure);
        Unit {
            multiply,
            divide: SmallVec::new(),
        }
    }

    pub fn ratio(numerator: QName, denominator: QName) -> Self {
        let mut unit = Unit::simple(numerator);
        unit.divide.push(denominator);
        unit
    }

    fn normalized(&self) -> (Vec<&QName>, Vec<&QName>) {
        let mut mul: Vec<&QName> = self.multiply.iter().collect();
        let mut div: Vec<&QName> = self.divide.iter().collect();
        mul.sort();
        mul.dedup();
        div.sort();
        div.dedup();
        (mul, div)
    }
}

impl PartialEq for Unit {
    fn eq(&self, other: &Self) -> bool {
        self.normalized() == other.normalized()
    }
}

impl Eq for Unit {}

impl Hash for Unit {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.normalized().hash(state);
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (mul, div) = self.normalized();
        let join = |measures: &[&QName]| {
            measures
                .iter()
                .map(|m| m.local_name.as_str())
                .collect::<Vec<_>>()
                .join("*")
        };
        if div.is_empty() {
            write!(f, "{}", join(&mul))
        } else {
            write!(f, "{}/{}", join(&mul), join(&div))
        }
    }
}

// ============================================================================
// DIMENSION AND ASPECT VALUES
// ============================================================================

/// Value a fact reports for one dimension.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DimensionValue {
    Explicit(QName),
    Typed(String),
}

/// Value bound to an aspect, either by a definition node or by a fact.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AspectValue {
    Concept(QName),
    Entity(EntityIdentifier),
    Period(Period),
    Unit(Unit),
    /// Explicit dimension member.
    Member(QName),
    /// Typed dimension value in its lexical form.
    Typed(String),
    /// The dimension's default member (equivalent to the dimension being absent).
    DimensionDefault,
    /// Synthetic open-axis partition that stands for a row/column to be filled in.
    EntrySurrogate(u32),
}

impl AspectValue {
    /// Whether this value can be bound to the given aspect.
    pub fn fits(&self, aspect: &Aspect) -> bool {
        match (aspect, self) {
            (_, AspectValue::EntrySurrogate(_)) => true,
            (Aspect::Concept, AspectValue::Concept(_)) => true,
            (Aspect::Entity, AspectValue::Entity(_)) => true,
            (Aspect::Period, AspectValue::Period(_)) => true,
            (Aspect::Unit, AspectValue::Unit(_)) => true,
            (Aspect::Dimension(_), AspectValue::Member(_))
            | (Aspect::Dimension(_), AspectValue::Typed(_))
            | (Aspect::Dimension(_), AspectValue::DimensionDefault) => true,
            _ => false,
        }
    }

    pub fn is_entry_surrogate(&self) -> bool {
        matches!(self, AspectValue::EntrySurrogate(_))
    }

    pub fn as_qname(&self) -> Option<&QName> {
        match self {
            AspectValue::Concept(q) | AspectValue::Member(q) => Some(q),
            _ => None,
        }
    }
}

impl fmt::Display for AspectValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AspectValue::Concept(q) | AspectValue::Member(q) => write!(f, "{}", q),
            AspectValue::Entity(e) => write!(f, "{} {}", e.scheme, e.value),
            AspectValue::Period(p) => write!(f, "{}", p),
            AspectValue::Unit(u) => write!(f, "{}", u),
            AspectValue::Typed(v) => write!(f, "{}", v),
            AspectValue::DimensionDefault => write!(f, "(default)"),
            AspectValue::EntrySurrogate(n) => write!(f, "(entry {})", n),
        }
    }
}
