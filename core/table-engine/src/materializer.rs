//! FILENAME: core/table-engine/src/materializer.rs
//! Layout Materializer - turns three resolved axis trees into a LayoutTable.
//!
//! Two passes, composed by `materialize`:
//! 1. `build_headers`: one header row per tree level below the axis root,
//!    each cell spanning the leaves below its node; consecutive rows from the
//!    same breakdown form a header group
//! 2. `fill_body`: one page per z discriminator; for every (z, y, x) leaf
//!    triple the bindings along the three paths are merged into a fact
//!    prototype and matched against the facts
//!
//! An axis without leaves contributes one implicit coordinate bound to
//! nothing, so a table without a z axis has exactly one page.

use std::collections::BTreeSet;

use smallvec::SmallVec;
use xbrl_model::{Aspect, AspectValue, FactSet, LabelTarget, TaxonomyModel, ROLE_GENERIC_LABEL};

use crate::binding::AspectBinding;
use crate::config::TableOptions;
use crate::definition::{Breakdown, TableDefinition, Tag, TAG_PERIOD_END, TAG_PERIOD_START};
use crate::error::{CellCoordinate, Result, StructuralError};
use crate::labels::header_labels;
use crate::layout::{
    AxisHeaders, BodyCell, BodyPage, BodyRow, CellFact, HeaderCell, HeaderConstraint, HeaderGroup,
    HeaderRow, Justification, LayoutTable,
};
use crate::logging::CAT_LAYOUT;
use crate::matcher::FactMatcher;
use crate::structure::{RollupKind, StructuralNode};
use crate::{log_debug, log_enter, log_exit};

/// Path from an axis root (inclusive) down to one leaf.
pub type LeafPath<'t, 'd> = Vec<&'t StructuralNode<'d>>;

/// Headers of all three axes.
#[derive(Debug, Clone, PartialEq)]
pub struct HeaderForest {
    pub x: AxisHeaders,
    pub y: AxisHeaders,
    pub z: AxisHeaders,
}

// ============================================================================
// TREE WALKS
// ============================================================================

/// Root-to-leaf paths of every non-abstract leaf, in document order.
pub fn leaf_paths<'t, 'd>(root: &'t StructuralNode<'d>) -> Vec<LeafPath<'t, 'd>> {
    fn collect<'t, 'd>(
        node: &'t StructuralNode<'d>,
        path: &mut LeafPath<'t, 'd>,
        out: &mut Vec<LeafPath<'t, 'd>>,
    ) {
        if node.children.is_empty() {
            if !node.is_abstract {
                out.push(path.clone());
            }
            return;
        }
        for child in &node.children {
            path.push(child);
            collect(child, path, out);
            path.pop();
        }
    }

    let mut out = Vec::new();
    let mut path = vec![root];
    collect(root, &mut path, &mut out);
    if out.is_empty() {
        out.push(vec![root]);
    }
    out
}

fn nodes_at_level<'t, 'd>(node: &'t StructuralNode<'d>, level: usize, out: &mut Vec<&'t StructuralNode<'d>>) {
    if level == 0 {
        out.push(node);
        return;
    }
    for child in &node.children {
        nodes_at_level(child, level - 1, out);
    }
}

/// Number of pages: the widest z header row, or 1 without z headers.
pub fn discriminator_count(z: &AxisHeaders) -> usize {
    z.rows()
        .map(|row| row.cells.iter().map(|cell| cell.span).sum::<usize>())
        .max()
        .unwrap_or(1)
}

fn is_period_tag(tag: &str) -> bool {
    tag == TAG_PERIOD_START || tag == TAG_PERIOD_END
}

/// Constraint ordering: other tags, period start, untagged, period end.
fn tag_rank(tag: Option<&str>) -> u8 {
    match tag {
        Some(TAG_PERIOD_START) => 1,
        None => 2,
        Some(TAG_PERIOD_END) => 3,
        Some(_) => 0,
    }
}

// ============================================================================
// CELL BINDING
// ============================================================================

/// Merges the bindings along the z, y and x paths into one fact prototype.
///
/// Later nodes override earlier ones. Tagged constraint sets are selected by
/// the union of all tag selectors on the three paths, narrowed to the period
/// tags when one of them is present.
pub fn cell_binding(paths: [&[&StructuralNode<'_>]; 3], coordinate: CellCoordinate) -> Result<AspectBinding> {
    let nodes = || paths.iter().flat_map(|path| path.iter().copied());

    let mut tags: BTreeSet<&Tag> = nodes().flat_map(|node| node.tag_selectors.iter()).collect();
    if tags.iter().any(|tag| is_period_tag(tag)) {
        tags.retain(|tag| is_period_tag(tag));
    }
    let tag_list = || tags.iter().map(|tag| (*tag).clone()).collect::<Vec<Tag>>();

    let mut binding = AspectBinding::new();
    let mut deemed = BTreeSet::new();
    for node in nodes() {
        binding.override_with(&node.aspects);
        deemed.extend(node.deemed_defaulted_dims.iter());
        if node.tagged_aspects.is_empty() {
            continue;
        }

        let selected: SmallVec<[&AspectBinding; 2]> = node
            .tagged_aspects
            .iter()
            .filter(|(tag, _)| tags.contains(tag))
            .map(|(_, set)| set)
            .collect();
        let node_id = || node.definition.map(|d| d.id.clone()).unwrap_or_default();
        match selected.as_slice() {
            [] => {
                if !tags.is_empty() && !node.has_default_constraint_set {
                    return Err(StructuralError::MissingConstraintSet {
                        node: node_id(),
                        tags: tag_list(),
                        coordinate,
                    });
                }
            }
            [only] => binding.override_with(only),
            _ => {
                return Err(StructuralError::AmbiguousTagSelector {
                    node: node_id(),
                    tags: tag_list(),
                    coordinate,
                });
            }
        }
    }

    for dimension in deemed {
        binding.insert_if_absent(Aspect::Dimension(dimension.clone()), AspectValue::DimensionDefault);
    }
    Ok(binding)
}

// ============================================================================
// MATERIALIZER
// ============================================================================

pub struct LayoutMaterializer<'a> {
    taxonomy: &'a dyn TaxonomyModel,
    matcher: &'a FactMatcher<'a>,
    options: &'a TableOptions,
}

impl<'a> LayoutMaterializer<'a> {
    pub fn new(taxonomy: &'a dyn TaxonomyModel, matcher: &'a FactMatcher<'a>, options: &'a TableOptions) -> Self {
        LayoutMaterializer {
            taxonomy,
            matcher,
            options,
        }
    }

    pub fn materialize(
        &self,
        definition: &TableDefinition,
        x: &StructuralNode<'_>,
        y: &StructuralNode<'_>,
        z: &StructuralNode<'_>,
    ) -> Result<LayoutTable> {
        log_enter!(CAT_LAYOUT, "materialize", "table={}", definition.id);

        let headers = HeaderForest {
            x: self.build_headers(x)?,
            y: self.build_headers(y)?,
            z: self.build_headers(z)?,
        };
        let pages = self.fill_body(&headers, x, y, z)?;
        let label = self.taxonomy.label(
            &LabelTarget::Resource(definition.id.clone()),
            ROLE_GENERIC_LABEL,
            &self.options.lang,
        );

        log_exit!(CAT_LAYOUT, "materialize", "pages={}", pages.len());
        Ok(LayoutTable {
            table: definition.id.clone(),
            label,
            parameters: Vec::new(),
            x: headers.x,
            y: headers.y,
            z: headers.z,
            pages,
        })
    }

    // ========================================================================
    // HEADERS
    // ========================================================================

    pub fn build_headers(&self, root: &StructuralNode<'_>) -> Result<AxisHeaders> {
        let axis = root.axis;
        let leaf_count = root.leaf_count();
        let mut headers = AxisHeaders {
            axis,
            groups: Vec::new(),
            leaf_count,
        };

        let mut current: Option<HeaderGroup> = None;
        for level in 1..root.depth() {
            let mut nodes = Vec::new();
            nodes_at_level(root, level, &mut nodes);

            let cells: Vec<HeaderCell> = nodes.iter().map(|node| self.header_cell(node)).collect();
            let found: usize = cells.iter().map(|cell| cell.span).sum();
            if found != leaf_count {
                return Err(StructuralError::InconsistentSpans {
                    axis,
                    row: level - 1,
                    expected: leaf_count,
                    found,
                });
            }

            let row = HeaderRow { cells };
            // Padding rollups carry their parent's breakdown; the row belongs
            // to the breakdown of its real nodes.
            let breakdown = nodes
                .iter()
                .filter(|node| !node.is_rollup())
                .find_map(|node| node.breakdown)
                .or_else(|| nodes.iter().find_map(|node| node.breakdown));
            let key = breakdown.map(|bd| bd.id.as_str()).unwrap_or_default();
            let continues = current.as_ref().map_or(false, |group| group.breakdown == key);
            if continues {
                if let Some(group) = current.as_mut() {
                    group.rows.push(row);
                }
            } else {
                if let Some(group) = current.take() {
                    headers.groups.push(group);
                }
                current = Some(self.header_group(breakdown, row));
            }
        }
        if let Some(group) = current {
            headers.groups.push(group);
        }

        log_debug!(
            CAT_LAYOUT,
            "{} headers: {} groups, {} leaves",
            axis,
            headers.groups.len(),
            leaf_count
        );
        Ok(headers)
    }

    fn header_group(&self, breakdown: Option<&Breakdown>, first_row: HeaderRow) -> HeaderGroup {
        let id = breakdown.map(|bd| bd.id.clone()).unwrap_or_default();
        HeaderGroup {
            label: self.taxonomy.label(
                &LabelTarget::Resource(id.clone()),
                ROLE_GENERIC_LABEL,
                &self.options.lang,
            ),
            breakdown: id,
            rows: vec![first_row],
        }
    }

    fn header_cell(&self, node: &StructuralNode<'_>) -> HeaderCell {
        HeaderCell {
            span: node.leaf_count(),
            is_rollup: node.is_rollup(),
            is_entry_placeholder: node.aspects.has_entry_surrogate(),
            node: node.definition.map(|d| d.id.clone()),
            labels: header_labels(self.taxonomy, node, self.options),
            constraints: self.header_constraints(node),
        }
    }

    /// Aspects a header cell constrains, ordered by tag.
    pub fn header_constraints(&self, node: &StructuralNode<'_>) -> Vec<HeaderConstraint> {
        if node.rollup == Some(RollupKind::SpecifiesMember) {
            return Vec::new();
        }

        let bindings = std::iter::once((None, &node.aspects))
            .chain(node.tagged_aspects.iter().map(|(tag, set)| (Some(tag), set)));
        let mut constraints = Vec::new();
        for (tag, binding) in bindings {
            for (aspect, value) in binding.iter() {
                if node.is_rollup() && !aspect.is_dimension() {
                    continue;
                }
                constraints.push(HeaderConstraint {
                    aspect: aspect.clone(),
                    value: self.constraint_value(aspect, value),
                    tag: tag.cloned(),
                });
            }
        }
        for dimension in &node.deemed_defaulted_dims {
            constraints.push(HeaderConstraint {
                aspect: Aspect::Dimension(dimension.clone()),
                value: None,
                tag: None,
            });
        }

        constraints.sort_by_key(|c| tag_rank(c.tag.as_deref()));
        constraints
    }

    /// Dimension defaults are emitted without a value.
    fn constraint_value(&self, aspect: &Aspect, value: &AspectValue) -> Option<AspectValue> {
        match (aspect, value) {
            (_, AspectValue::DimensionDefault) => None,
            (Aspect::Dimension(dimension), AspectValue::Member(member))
                if self.taxonomy.default_member(dimension) == Some(member) =>
            {
                None
            }
            _ => Some(value.clone()),
        }
    }

    // ========================================================================
    // BODY
    // ========================================================================

    pub fn fill_body(
        &self,
        headers: &HeaderForest,
        x: &StructuralNode<'_>,
        y: &StructuralNode<'_>,
        z: &StructuralNode<'_>,
    ) -> Result<Vec<BodyPage>> {
        if let Some(empty) = [x, y, z].iter().find(|root| root.breakdown_without_nodes) {
            log_debug!(CAT_LAYOUT, "{} axis has no nodes, no pages", empty.axis);
            return Ok(Vec::new());
        }

        let table_facts = self.matcher.table_facts();
        let x_paths = leaf_paths(x);
        let y_paths = leaf_paths(y);
        let z_paths = leaf_paths(z);
        let count = discriminator_count(&headers.z);

        let mut pages = Vec::with_capacity(count);
        for (page, z_path) in z_paths.iter().take(count).enumerate() {
            let mut bindable = 0usize;
            let mut rows = Vec::with_capacity(y_paths.len());
            for (row, y_path) in y_paths.iter().enumerate() {
                let mut cells = Vec::with_capacity(x_paths.len());
                for (column, x_path) in x_paths.iter().enumerate() {
                    let coordinate = CellCoordinate { page, row, column };
                    let paths = [z_path.as_slice(), y_path.as_slice(), x_path.as_slice()];
                    let binding = cell_binding(paths, coordinate)?;
                    if self.is_bindable(&binding) {
                        bindable += 1;
                        cells.push(self.body_cell(&binding, paths, &table_facts));
                    } else {
                        cells.push(BodyCell {
                            facts: Vec::new(),
                            is_entry_placeholder: binding.has_entry_surrogate(),
                        });
                    }
                }
                rows.push(BodyRow { cells });
            }

            if bindable == 0 {
                log_debug!(CAT_LAYOUT, "page {} has no bindable cell, dropped", page);
                continue;
            }
            pages.push(BodyPage { z_index: page, rows });
        }
        Ok(pages)
    }

    /// Cells bound to nothing, or to an abstract concept, stay empty.
    fn is_bindable(&self, binding: &AspectBinding) -> bool {
        !binding.is_empty()
            && binding
                .concept()
                .and_then(|name| self.taxonomy.concept(name))
                .map_or(true, |concept| !concept.is_abstract)
    }

    fn body_cell(&self, binding: &AspectBinding, paths: [&[&StructuralNode<'_>]; 3], table_facts: &FactSet) -> BodyCell {
        // Open-axis partitions along the paths bound the candidates.
        let partition = paths
            .iter()
            .flat_map(|path| path.iter())
            .filter_map(|node| node.facts_partition.as_ref())
            .fold(None, |acc: Option<FactSet>, part| {
                Some(match acc {
                    None => part.clone(),
                    Some(acc) => acc.intersection(part).copied().collect(),
                })
            });
        let candidates = partition.as_ref().unwrap_or(table_facts);

        let store = self.matcher.store();
        let facts = self
            .matcher
            .matching(binding, candidates)
            .into_iter()
            .filter_map(|id| store.fact(id).map(|fact| (id, fact)))
            .map(|(id, fact)| CellFact {
                fact: id,
                value: fact.rendered_value(),
                justification: if fact.is_numeric() {
                    Justification::Right
                } else {
                    Justification::Left
                },
            })
            .collect();

        BodyCell {
            facts,
            is_entry_placeholder: binding.has_entry_surrogate(),
        }
    }
}
