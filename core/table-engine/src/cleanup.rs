//! FILENAME: core/table-engine/src/cleanup.rs
//! Post-order passes over resolved structural trees.
//!
//! - `trim`: drop abstract nodes left without children
//! - `insert_rollups`: give every non-abstract parent a rollup child that
//!   stands for the parent's own coordinate
//! - `equalize_depth`: pad shallow leaves with rollup chains so every leaf of
//!   a forest sits at the same depth (rectangular headers)
//! - `backfill_defaulted_dims`: record dimensions a sibling binds but a node
//!   leaves open, so they bind to the default member rather than "any"

use std::collections::BTreeSet;

use xbrl_model::QName;

use crate::definition::{NodeKind, ParentChildOrder};
use crate::structure::{RollupKind, StructuralNode};

/// Removes abstract nodes without children, bottom-up, below `node`.
pub fn trim(node: &mut StructuralNode<'_>) {
    for child in &mut node.children {
        trim(child);
    }
    node.children
        .retain(|child| !(child.is_abstract && child.children.is_empty()));
}

/// Removes childless abstract nodes from a forest.
pub fn trim_forest(forest: &mut Vec<StructuralNode<'_>>) {
    for node in forest.iter_mut() {
        trim(node);
    }
    forest.retain(|node| !(node.is_abstract && node.children.is_empty()));
}

/// Adds a rollup child to every non-abstract node in `node`'s subtree that
/// has children but no rollup yet.
pub fn insert_rollups(node: &mut StructuralNode<'_>) {
    for child in &mut node.children {
        insert_rollups(child);
    }
    if node.is_abstract || node.is_rollup() || node.children.is_empty() || node.has_rollup_child() {
        return;
    }

    let kind = rollup_kind_for_parent(node);
    let rollup = StructuralNode::rollup_of(node, kind);
    match node.parent_child_order() {
        ParentChildOrder::ParentFirst => node.children.insert(0, rollup),
        ParentChildOrder::ChildrenFirst => node.children.push(rollup),
    }
}

fn rollup_kind_for_parent(node: &StructuralNode<'_>) -> RollupKind {
    match node.definition.map(|d| &d.kind) {
        Some(NodeKind::Rule(_)) => {
            let own = node.bound_dimensions();
            let itemized = node
                .children
                .iter()
                .any(|child| !own.is_disjoint(&child.bound_dimensions()));
            if itemized {
                RollupKind::SpecifiesMember
            } else {
                RollupKind::ImpliesDefaultMember
            }
        }
        _ => RollupKind::for_definition(node.definition),
    }
}

/// Pads every non-abstract leaf of `forest` shallower than `max_depth`
/// (top level = depth 1) with a chain of rollup descendants.
pub fn equalize_depth(forest: &mut [StructuralNode<'_>], max_depth: usize) {
    for node in forest.iter_mut() {
        pad(node, 1, max_depth);
    }
}

fn pad(node: &mut StructuralNode<'_>, depth: usize, max_depth: usize) {
    if !node.children.is_empty() {
        for child in &mut node.children {
            pad(child, depth + 1, max_depth);
        }
        return;
    }
    if node.is_abstract || depth >= max_depth {
        return;
    }
    let kind = node
        .rollup
        .unwrap_or_else(|| RollupKind::for_definition(node.definition));
    node.children.push(StructuralNode::rollup_of(node, kind));
    pad(&mut node.children[0], depth + 1, max_depth);
}

/// Depth of the deepest tree in a forest.
pub fn forest_depth(forest: &[StructuralNode<'_>]) -> usize {
    forest.iter().map(StructuralNode::depth).max().unwrap_or(0)
}

/// Records deemed-defaulted dimensions on every sibling group below `node`.
///
/// `ancestor_dims` are dimensions bound above `node`; a sibling that
/// inherits one of them keeps the inherited member instead.
pub fn backfill_defaulted_dims(node: &mut StructuralNode<'_>, ancestor_dims: &BTreeSet<QName>) {
    let covered: BTreeSet<QName> = node
        .children
        .iter()
        .flat_map(|child| child.bound_dimensions())
        .collect();

    for child in &mut node.children {
        let own = child.bound_dimensions();
        for dim in &covered {
            if !own.contains(dim) && !ancestor_dims.contains(dim) {
                child.deemed_defaulted_dims.insert(dim.clone());
            }
        }

        let mut inner = ancestor_dims.clone();
        inner.extend(own);
        backfill_defaulted_dims(child, &inner);
    }
}
