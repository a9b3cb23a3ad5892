//! FILENAME: core/xbrl-model/src/lib.rs
//! Shared data model for dimensional report tables.
//!
//! This crate holds the types every other crate in the workspace agrees on
//! (qualified names, aspects, facts, expression values) and the read-only
//! contracts the table engine consumes from its collaborators:
//! - `TaxonomyModel`: concepts, dimension defaults, labels, relationship networks
//! - `FactStore`: the reported facts with a dimension-member index
//! - `ExpressionEvaluator`: dynamic values and cardinalities
//!
//! In-memory implementations of all three are provided for callers that
//! already hold their data in memory.

pub mod qname;
pub mod aspect;
pub mod fact;
pub mod taxonomy;
pub mod network;
pub mod expression;

pub use qname::QName;
pub use aspect::{Aspect, AspectValue, DimensionValue, EntityIdentifier, Period, PeriodType, Unit};
pub use fact::{Fact, FactId, FactSet, FactStore, FactValue, InMemoryFactStore, MemberSelector};
pub use taxonomy::*;
pub use network::{navigate, NetworkQuery, RelatedEntity, RelationshipAxis, RelationshipSource};
pub use expression::{EvaluationError, Expression, ExpressionEvaluator, Scope, ScopeEvaluator, Value};
