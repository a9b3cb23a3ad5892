//! FILENAME: core/table-engine/src/definition.rs
//! Table Definition - The serializable description of a report table.
//!
//! This module contains all the types needed to DESCRIBE a table: three axes of
//! breakdowns, each holding a tree of definition nodes. These structures are:
//! - Serializable (definitions can be stored as JSON next to their options)
//! - Immutable input to the resolver (owned by the caller)
//! - A single tagged union per node, so resolution is one exhaustive match

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

use xbrl_model::{
    Aspect, AspectValue, Expression, Fact, NetworkKey, PeriodType, QName, RelationshipAxis,
    RelationshipSource, TaxonomyModel, ARCROLE_DOMAIN_MEMBER, ARCROLE_PARENT_CHILD,
};

/// Identifier of a table, breakdown or definition node.
pub type NodeId = String;

/// Tag selecting one of a rule node's constraint sets.
pub type Tag = String;

pub const TAG_PERIOD_START: &str = "table.periodStart";
pub const TAG_PERIOD_END: &str = "table.periodEnd";

// ============================================================================
// AXES
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Axis {
    X,
    Y,
    Z,
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Axis::X => write!(f, "x"),
            Axis::Y => write!(f, "y"),
            Axis::Z => write!(f, "z"),
        }
    }
}

/// Where the rollup standing for a non-abstract parent goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ParentChildOrder {
    ParentFirst,
    ChildrenFirst,
}

impl Default for ParentChildOrder {
    fn default() -> Self {
        ParentChildOrder::ChildrenFirst
    }
}

// ============================================================================
// FILTERS
// ============================================================================

/// Declarative fact filter used at table level and on open aspect nodes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FactFilter {
    /// Fact concept is one of the listed concepts.
    Concept(Vec<QName>),
    PeriodType(PeriodType),
    /// Fact reports one of the members for the dimension, or (when
    /// `include_default`) leaves it at its default.
    Dimension {
        dimension: QName,
        members: Vec<QName>,
        include_default: bool,
    },
    EntityScheme(String),
    /// Fact has (or lacks) a unit.
    HasUnit(bool),
}

impl FactFilter {
    pub fn accepts(&self, fact: &Fact, taxonomy: &dyn TaxonomyModel) -> bool {
        match self {
            FactFilter::Concept(concepts) => concepts.contains(&fact.concept),
            FactFilter::PeriodType(period_type) => fact.period.period_type() == *period_type,
            FactFilter::Dimension {
                dimension,
                members,
                include_default,
            } => {
                let default = taxonomy.default_member(dimension);
                match fact.aspect_value(&Aspect::Dimension(dimension.clone())) {
                    Some(AspectValue::Member(member)) => {
                        members.contains(&member)
                            || (*include_default && default == Some(&member))
                    }
                    Some(_) => false,
                    None => *include_default,
                }
            }
            FactFilter::EntityScheme(scheme) => &fact.entity.scheme == scheme,
            FactFilter::HasUnit(has_unit) => fact.unit.is_some() == *has_unit,
        }
    }
}

// ============================================================================
// RULE NODES
// ============================================================================

/// Where a rule node gets an aspect's value from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AspectSource {
    Fixed(AspectValue),
    /// One repetition of the node per value.
    OneOf(Vec<AspectValue>),
    /// Evaluated per resolution; a sequence result repeats the node.
    Expression(Expression),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AspectRule {
    pub aspect: Aspect,
    pub source: AspectSource,
}

impl AspectRule {
    pub fn fixed(aspect: Aspect, value: AspectValue) -> Self {
        AspectRule {
            aspect,
            source: AspectSource::Fixed(value),
        }
    }
}

/// A group of aspect rules, optionally selected by tag.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ConstraintSet {
    #[serde(default)]
    pub tag: Option<Tag>,
    pub rules: Vec<AspectRule>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RuleNode {
    pub constraint_sets: Vec<ConstraintSet>,
}

// ============================================================================
// RELATIONSHIP NODES
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RelationshipKind {
    /// Navigates a concept network and binds the concept aspect.
    Concept {
        /// Defaults to parent-child.
        #[serde(default)]
        arcrole: Option<String>,
    },
    /// Navigates a dimension domain and binds the dimension aspect.
    Dimension { dimension: QName },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelationshipNode {
    pub kind: RelationshipKind,
    #[serde(default)]
    pub link_role: Option<String>,
    pub sources: Vec<RelationshipSource>,
    #[serde(default)]
    pub axis: RelationshipAxis,
    /// 0 means unbounded.
    #[serde(default)]
    pub generations: u32,
    /// Variable bound to each related entity for descendant expressions.
    #[serde(default)]
    pub variable: Option<String>,
}

impl RelationshipNode {
    pub fn network(&self) -> NetworkKey {
        let arcrole = match &self.kind {
            RelationshipKind::Concept { arcrole } => {
                arcrole.clone().unwrap_or_else(|| ARCROLE_PARENT_CHILD.to_string())
            }
            RelationshipKind::Dimension { .. } => ARCROLE_DOMAIN_MEMBER.to_string(),
        };
        NetworkKey::new(arcrole, self.link_role.clone())
    }

    pub fn covered_aspect(&self) -> Aspect {
        match &self.kind {
            RelationshipKind::Concept { .. } => Aspect::Concept,
            RelationshipKind::Dimension { dimension } => Aspect::Dimension(dimension.clone()),
        }
    }
}

// ============================================================================
// ASPECT (OPEN) NODES
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AspectNode {
    pub aspect: Aspect,
    #[serde(default)]
    pub filters: Vec<FactFilter>,
    /// Whether data-entry placeholder partitions may be synthesized.
    #[serde(default = "default_true")]
    pub entry_rows: bool,
}

fn default_true() -> bool {
    true
}

// ============================================================================
// DEFINITION NODE
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum NodeKind {
    /// Structural grouping nested inside a breakdown.
    Breakdown,
    Rule(RuleNode),
    Relationship(RelationshipNode),
    Aspect(AspectNode),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DefinitionNode {
    pub id: NodeId,
    pub kind: NodeKind,

    #[serde(default)]
    pub is_abstract: bool,

    /// Merged rule nodes fold their bindings into the enclosing structural node.
    #[serde(default)]
    pub is_merged: bool,

    #[serde(default)]
    pub tag_selector: Option<Tag>,

    #[serde(default)]
    pub parent_child_order: ParentChildOrder,

    #[serde(default)]
    pub children: Vec<DefinitionNode>,
}

impl DefinitionNode {
    fn with_kind(id: impl Into<NodeId>, kind: NodeKind) -> Self {
        DefinitionNode {
            id: id.into(),
            kind,
            is_abstract: false,
            is_merged: false,
            tag_selector: None,
            parent_child_order: ParentChildOrder::default(),
            children: Vec::new(),
        }
    }

    /// A rule node with a single untagged constraint set.
    pub fn rule(id: impl Into<NodeId>, rules: Vec<AspectRule>) -> Self {
        DefinitionNode::with_kind(
            id,
            NodeKind::Rule(RuleNode {
                constraint_sets: vec![ConstraintSet { tag: None, rules }],
            }),
        )
    }

    /// A rule node with several constraint sets.
    pub fn tagged_rule(id: impl Into<NodeId>, constraint_sets: Vec<ConstraintSet>) -> Self {
        DefinitionNode::with_kind(id, NodeKind::Rule(RuleNode { constraint_sets }))
    }

    /// An abstract rule node binding nothing (a header grouping).
    pub fn group(id: impl Into<NodeId>) -> Self {
        let mut node = DefinitionNode::rule(id, Vec::new());
        node.is_abstract = true;
        node
    }

    pub fn relationship(id: impl Into<NodeId>, relationship: RelationshipNode) -> Self {
        DefinitionNode::with_kind(id, NodeKind::Relationship(relationship))
    }

    pub fn aspect(id: impl Into<NodeId>, aspect: Aspect) -> Self {
        DefinitionNode::with_kind(
            id,
            NodeKind::Aspect(AspectNode {
                aspect,
                filters: Vec::new(),
                entry_rows: true,
            }),
        )
    }

    pub fn breakdown(id: impl Into<NodeId>, children: Vec<DefinitionNode>) -> Self {
        let mut node = DefinitionNode::with_kind(id, NodeKind::Breakdown);
        node.children = children;
        node
    }

    pub fn with_children(mut self, children: Vec<DefinitionNode>) -> Self {
        self.children = children;
        self
    }

    pub fn abstract_node(mut self) -> Self {
        self.is_abstract = true;
        self
    }

    pub fn merged(mut self) -> Self {
        self.is_merged = true;
        self
    }

    pub fn with_tag(mut self, tag: impl Into<Tag>) -> Self {
        self.tag_selector = Some(tag.into());
        self
    }

    pub fn with_order(mut self, order: ParentChildOrder) -> Self {
        self.parent_child_order = order;
        self
    }

    /// Closed nodes enumerate their values from the definition or taxonomy;
    /// open (aspect) nodes take them from the facts.
    pub fn is_closed(&self) -> bool {
        !matches!(self.kind, NodeKind::Aspect(_))
    }

    /// Aspects this node binds on the structural nodes it produces.
    pub fn aspects_covered(&self) -> BTreeSet<Aspect> {
        match &self.kind {
            NodeKind::Breakdown => BTreeSet::new(),
            NodeKind::Rule(rule) => rule
                .constraint_sets
                .iter()
                .flat_map(|set| set.rules.iter().map(|r| r.aspect.clone()))
                .collect(),
            NodeKind::Relationship(rel) => std::iter::once(rel.covered_aspect()).collect(),
            NodeKind::Aspect(open) => std::iter::once(open.aspect.clone()).collect(),
        }
    }

    /// Whether every child covers at least the aspects this node covers.
    pub fn children_cover_same_aspects(&self) -> bool {
        let covered = self.aspects_covered();
        !self.children.is_empty()
            && self
                .children
                .iter()
                .all(|child| covered.is_subset(&child.aspects_covered()))
    }
}

// ============================================================================
// BREAKDOWNS AND TABLE
// ============================================================================

/// A top-level grouping of definition nodes on one axis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Breakdown {
    pub id: NodeId,
    #[serde(default)]
    pub parent_child_order: ParentChildOrder,
    pub nodes: Vec<DefinitionNode>,
}

impl Breakdown {
    pub fn new(id: impl Into<NodeId>, nodes: Vec<DefinitionNode>) -> Self {
        Breakdown {
            id: id.into(),
            parent_child_order: ParentChildOrder::default(),
            nodes,
        }
    }
}

/// The complete table definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableDefinition {
    pub id: NodeId,
    #[serde(default)]
    pub x: Vec<Breakdown>,
    #[serde(default)]
    pub y: Vec<Breakdown>,
    #[serde(default)]
    pub z: Vec<Breakdown>,
    /// Table-level filters applied to every fact before resolution.
    #[serde(default)]
    pub filters: Vec<FactFilter>,
}

impl TableDefinition {
    pub fn new(id: impl Into<NodeId>) -> Self {
        TableDefinition {
            id: id.into(),
            x: Vec::new(),
            y: Vec::new(),
            z: Vec::new(),
            filters: Vec::new(),
        }
    }

    pub fn breakdowns(&self, axis: Axis) -> &[Breakdown] {
        match axis {
            Axis::X => &self.x,
            Axis::Y => &self.y,
            Axis::Z => &self.z,
        }
    }
}
