//! FILENAME: core/table-engine/src/structure.rs
//! Structural tree - the resolved, engine-owned form of one table axis.
//!
//! The resolver expands each axis's definition tree into a tree of
//! `StructuralNode`s: one node per header coordinate, with the aspects it
//! binds. The root of every axis tree is synthetic (no definition); its
//! descendants borrow the definition nodes that produced them.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use xbrl_model::{FactSet, QName, Scope};

use crate::binding::AspectBinding;
use crate::definition::{Axis, Breakdown, DefinitionNode, NodeKind, ParentChildOrder, RelationshipKind, Tag};

/// Why a synthetic rollup node exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RollupKind {
    /// Stands for the default member of the dimension its siblings itemize.
    ImpliesDefaultMember,
    /// Repeats the member its parent specifies.
    SpecifiesMember,
    ForConceptRelationshipNode,
    ForDimensionRelationshipNode,
    ForClosedDefinitionNode,
    ForOpenDefinitionNode,
    ForDefinitionNode,
}

impl RollupKind {
    /// Rollup kind that stands for a node produced by `definition`.
    pub fn for_definition(definition: Option<&DefinitionNode>) -> Self {
        match definition.map(|d| &d.kind) {
            Some(NodeKind::Relationship(rel)) => match rel.kind {
                RelationshipKind::Concept { .. } => RollupKind::ForConceptRelationshipNode,
                RelationshipKind::Dimension { .. } => RollupKind::ForDimensionRelationshipNode,
            },
            Some(NodeKind::Rule(_)) => RollupKind::ForClosedDefinitionNode,
            Some(NodeKind::Aspect(_)) => RollupKind::ForOpenDefinitionNode,
            Some(NodeKind::Breakdown) | None => RollupKind::ForDefinitionNode,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StructuralNode<'d> {
    /// Definition node that produced this node (`None` for axis roots).
    pub definition: Option<&'d DefinitionNode>,

    /// Top-level breakdown this node belongs to.
    pub breakdown: Option<&'d Breakdown>,

    pub axis: Axis,

    /// Aspects bound by this node. Unbound aspects inherit from ancestors.
    pub aspects: AspectBinding,

    /// Tagged constraint sets, selected per body cell by tag selectors.
    pub tagged_aspects: BTreeMap<Tag, AspectBinding>,

    /// False for rule nodes whose constraint sets are all tagged.
    pub has_default_constraint_set: bool,

    pub is_abstract: bool,

    pub rollup: Option<RollupKind>,

    pub tag_selectors: BTreeSet<Tag>,

    /// Facts of an open-aspect partition, reused as the body candidate set.
    pub facts_partition: Option<FactSet>,

    /// Dimensions a sibling binds but this node leaves at its default.
    pub deemed_defaulted_dims: BTreeSet<QName>,

    /// Preferred label role from the relationship that produced this node.
    pub preferred_label: Option<String>,

    /// Variables this node binds for expressions below it.
    pub variables: Scope,

    /// How many structural nodes the definition produced in this repetition.
    pub repetitions: usize,

    /// Set on an axis root whose breakdowns produced no nodes at all.
    pub breakdown_without_nodes: bool,

    pub children: Vec<StructuralNode<'d>>,
}

impl<'d> StructuralNode<'d> {
    fn empty(axis: Axis) -> Self {
        StructuralNode {
            definition: None,
            breakdown: None,
            axis,
            aspects: AspectBinding::new(),
            tagged_aspects: BTreeMap::new(),
            has_default_constraint_set: true,
            is_abstract: false,
            rollup: None,
            tag_selectors: BTreeSet::new(),
            facts_partition: None,
            deemed_defaulted_dims: BTreeSet::new(),
            preferred_label: None,
            variables: Scope::new(),
            repetitions: 1,
            breakdown_without_nodes: false,
            children: Vec::new(),
        }
    }

    pub fn axis_root(axis: Axis) -> Self {
        StructuralNode {
            is_abstract: true,
            ..StructuralNode::empty(axis)
        }
    }

    pub fn from_definition(definition: &'d DefinitionNode, breakdown: &'d Breakdown, axis: Axis) -> Self {
        let mut node = StructuralNode::empty(axis);
        node.definition = Some(definition);
        node.breakdown = Some(breakdown);
        node.is_abstract = definition.is_abstract;
        if let Some(tag) = &definition.tag_selector {
            node.tag_selectors.insert(tag.clone());
        }
        node
    }

    /// A rollup child standing for `parent` itself.
    pub fn rollup_of(parent: &StructuralNode<'d>, kind: RollupKind) -> Self {
        let mut node = StructuralNode::empty(parent.axis);
        node.definition = parent.definition;
        node.breakdown = parent.breakdown;
        node.rollup = Some(kind);
        node
    }

    pub fn is_rollup(&self) -> bool {
        self.rollup.is_some()
    }

    pub fn has_rollup_child(&self) -> bool {
        self.children.iter().any(StructuralNode::is_rollup)
    }

    pub fn parent_child_order(&self) -> ParentChildOrder {
        match (self.definition, self.breakdown) {
            (Some(def), _) => def.parent_child_order,
            (None, Some(bd)) => bd.parent_child_order,
            (None, None) => ParentChildOrder::default(),
        }
    }

    /// Height of this subtree; a leaf has depth 1.
    pub fn depth(&self) -> usize {
        1 + self.children.iter().map(StructuralNode::depth).max().unwrap_or(0)
    }

    /// Number of non-abstract leaves below (or at) this node.
    pub fn leaf_count(&self) -> usize {
        if self.children.is_empty() {
            return usize::from(!self.is_abstract);
        }
        self.children.iter().map(StructuralNode::leaf_count).sum()
    }

    /// Dimensions this node binds in any of its constraint sets.
    pub fn bound_dimensions(&self) -> BTreeSet<QName> {
        self.aspects
            .dimensions()
            .map(|(dim, _)| dim.clone())
            .chain(
                self.tagged_aspects
                    .values()
                    .flat_map(|b| b.dimensions().map(|(dim, _)| dim.clone())),
            )
            .collect()
    }

    /// The chain of nodes down to the only leaf, when there is exactly one.
    pub fn single_leaf_path(&self) -> Option<Vec<&StructuralNode<'d>>> {
        let mut path = Vec::new();
        let mut current = self;
        loop {
            match current.children.as_slice() {
                [] => return Some(path),
                [only] => {
                    path.push(only);
                    current = only;
                }
                _ => return None,
            }
        }
    }
}
