//! FILENAME: core/table-engine/src/layout.rs
//! Layout Table - The render-ready output of a resolved table.
//!
//! This is a plain tree any renderer (XML table model, JSON, HTML, spreadsheet)
//! can walk: per-axis header groups with spanning cells, and a grid of body
//! cells per page. Nothing here knows how the table was resolved.

use serde::{Deserialize, Serialize};
use xbrl_model::{Aspect, AspectValue, FactId, Value};

use crate::definition::{Axis, NodeId, Tag};

// ============================================================================
// HEADERS
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeaderLabel {
    pub text: String,
    /// `None` for the header's main label.
    pub role: Option<String>,
    pub lang: String,
}

/// One aspect a header cell constrains.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeaderConstraint {
    pub aspect: Aspect,
    /// `None` when the aspect is held at its default.
    pub value: Option<AspectValue>,
    pub tag: Option<Tag>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeaderCell {
    /// Number of leaf coordinates this cell covers.
    pub span: usize,
    pub is_rollup: bool,
    pub is_entry_placeholder: bool,
    /// Definition node that produced the cell.
    pub node: Option<NodeId>,
    pub labels: Vec<HeaderLabel>,
    pub constraints: Vec<HeaderConstraint>,
}

impl HeaderCell {
    /// Main label text, if any.
    pub fn text(&self) -> Option<&str> {
        self.labels
            .iter()
            .find(|l| l.role.is_none())
            .map(|l| l.text.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct HeaderRow {
    pub cells: Vec<HeaderCell>,
}

/// Header rows contributed by one breakdown.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeaderGroup {
    pub breakdown: NodeId,
    pub label: Option<String>,
    pub rows: Vec<HeaderRow>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AxisHeaders {
    pub axis: Axis,
    pub groups: Vec<HeaderGroup>,
    /// Number of leaf coordinates (columns, rows or pages).
    pub leaf_count: usize,
}

impl AxisHeaders {
    pub fn empty(axis: Axis) -> Self {
        AxisHeaders {
            axis,
            groups: Vec::new(),
            leaf_count: 0,
        }
    }

    /// All header rows, top to bottom.
    pub fn rows(&self) -> impl Iterator<Item = &HeaderRow> {
        self.groups.iter().flat_map(|g| g.rows.iter())
    }
}

// ============================================================================
// BODY
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Justification {
    Left,
    Right,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CellFact {
    pub fact: FactId,
    pub value: String,
    pub justification: Justification,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct BodyCell {
    pub facts: Vec<CellFact>,
    /// Coordinate of a synthesized data-entry row or column.
    pub is_entry_placeholder: bool,
}

impl BodyCell {
    /// Empty cells are only rendered as data-entry placeholders.
    pub fn is_rendered(&self) -> bool {
        !self.facts.is_empty() || self.is_entry_placeholder
    }

    pub fn values(&self) -> Vec<&str> {
        self.facts.iter().map(|f| f.value.as_str()).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct BodyRow {
    pub cells: Vec<BodyCell>,
}

/// The y-by-x grid for one z discriminator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BodyPage {
    pub z_index: usize,
    pub rows: Vec<BodyRow>,
}

// ============================================================================
// TABLE
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayoutTable {
    pub table: NodeId,
    pub label: Option<String>,
    /// Parameter values this instance was resolved with.
    pub parameters: Vec<(String, Value)>,
    pub x: AxisHeaders,
    pub y: AxisHeaders,
    pub z: AxisHeaders,
    pub pages: Vec<BodyPage>,
}

impl LayoutTable {
    pub fn headers(&self, axis: Axis) -> &AxisHeaders {
        match axis {
            Axis::X => &self.x,
            Axis::Y => &self.y,
            Axis::Z => &self.z,
        }
    }

    pub fn cell(&self, page: usize, row: usize, column: usize) -> Option<&BodyCell> {
        self.pages.get(page)?.rows.get(row)?.cells.get(column)
    }
}
