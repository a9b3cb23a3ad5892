//! FILENAME: core/table-engine/src/error.rs

use std::fmt;
use thiserror::Error;

use xbrl_model::{Aspect, EvaluationError, QName, RelationshipAxis};

use crate::definition::{Axis, NodeId, Tag};

/// Body-cell position within a materialized table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellCoordinate {
    pub page: usize,
    pub row: usize,
    pub column: usize,
}

impl fmt::Display for CellCoordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "page {} row {} column {}", self.page, self.row, self.column)
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum StructuralError {
    #[error("closed definition node {node} on the {axis} axis contributes no structural node")]
    ZeroCardinality { node: NodeId, axis: Axis },

    #[error("relationship node {node} on the {axis} axis: source {source_name} {reason}")]
    UnresolvableRelationshipSource {
        node: NodeId,
        axis: Axis,
        source_name: String,
        reason: String,
    },

    #[error("node {node} has several constraint sets matching tags {tags:?} at {coordinate}")]
    AmbiguousTagSelector {
        node: NodeId,
        tags: Vec<Tag>,
        coordinate: CellCoordinate,
    },

    #[error("node {node} has no constraint set for tags {tags:?} at {coordinate}")]
    MissingConstraintSet {
        node: NodeId,
        tags: Vec<Tag>,
        coordinate: CellCoordinate,
    },

    #[error("node {node} on the {axis} axis: dimension {dimension} {reason}")]
    InconsistentDimensionCoverage {
        node: NodeId,
        axis: Axis,
        dimension: QName,
        reason: String,
    },

    #[error("expression of node {node} on the {axis} axis failed: {source}")]
    Evaluation {
        node: NodeId,
        axis: Axis,
        #[source]
        source: EvaluationError,
    },

    #[error("relationship node {node} on the {axis} axis: {relationship_axis:?} admits one generation, {generations} requested")]
    TooManyGenerations {
        node: NodeId,
        axis: Axis,
        relationship_axis: RelationshipAxis,
        generations: u32,
    },

    #[error("rule node {node} on the {axis} axis repeats {expected} times but one source yields {found} values")]
    CardinalityMismatch {
        node: NodeId,
        axis: Axis,
        expected: usize,
        found: usize,
    },

    #[error("rule node {node} on the {axis} axis binds an invalid {aspect} value: {reason}")]
    InvalidAspectValue {
        node: NodeId,
        axis: Axis,
        aspect: Aspect,
        reason: String,
    },

    #[error("{axis} axis header row {row} spans {found} leaves, expected {expected}")]
    InconsistentSpans {
        axis: Axis,
        row: usize,
        expected: usize,
        found: usize,
    },
}

impl StructuralError {
    /// Definition node the error points at, if any.
    pub fn node(&self) -> Option<&NodeId> {
        match self {
            StructuralError::ZeroCardinality { node, .. }
            | StructuralError::UnresolvableRelationshipSource { node, .. }
            | StructuralError::AmbiguousTagSelector { node, .. }
            | StructuralError::MissingConstraintSet { node, .. }
            | StructuralError::InconsistentDimensionCoverage { node, .. }
            | StructuralError::Evaluation { node, .. }
            | StructuralError::TooManyGenerations { node, .. }
            | StructuralError::CardinalityMismatch { node, .. }
            | StructuralError::InvalidAspectValue { node, .. } => Some(node),
            StructuralError::InconsistentSpans { .. } => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, StructuralError>;
