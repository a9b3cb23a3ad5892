//! FILENAME: core/xbrl-model/src/network.rs
//! Relationship-network navigation.
//!
//! Answers "which concepts (or domain members) are related to these sources
//! along this axis" as a tree that mirrors the network hierarchy. Networks
//! may contain cycles: every descent keeps the chain of entities on the
//! current path and stops when an entity would repeat on that path.

use serde::{Deserialize, Serialize};

use crate::qname::QName;
use crate::taxonomy::{NetworkKey, Relationship, TaxonomyModel, ARCROLE_DIMENSION_DOMAIN};

/// Traversal axis of a relationship query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RelationshipAxis {
    Child,
    ChildOrSelf,
    Descendant,
    DescendantOrSelf,
    Parent,
    ParentOrSelf,
    Sibling,
    SiblingOrSelf,
}

impl Default for RelationshipAxis {
    fn default() -> Self {
        RelationshipAxis::Descendant
    }
}

impl RelationshipAxis {
    pub fn is_or_self(self) -> bool {
        matches!(
            self,
            RelationshipAxis::ChildOrSelf
                | RelationshipAxis::DescendantOrSelf
                | RelationshipAxis::ParentOrSelf
                | RelationshipAxis::SiblingOrSelf
        )
    }

    /// Axes that only ever reach one generation.
    pub fn is_single_generation(self) -> bool {
        !matches!(
            self,
            RelationshipAxis::Descendant | RelationshipAxis::DescendantOrSelf
        )
    }

    fn direction(self) -> Direction {
        match self {
            RelationshipAxis::Child
            | RelationshipAxis::ChildOrSelf
            | RelationshipAxis::Descendant
            | RelationshipAxis::DescendantOrSelf => Direction::Down,
            RelationshipAxis::Parent | RelationshipAxis::ParentOrSelf => Direction::Up,
            RelationshipAxis::Sibling | RelationshipAxis::SiblingOrSelf => Direction::Across,
        }
    }
}

enum Direction {
    Down,
    Up,
    Across,
}

/// Starting point of a traversal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RelationshipSource {
    /// The network roots (or, for dimension queries, the dimension's domains).
    Root,
    Entity(QName),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkQuery {
    pub network: NetworkKey,
    /// Set when navigating the domain of an explicit dimension.
    pub dimension: Option<QName>,
    pub sources: Vec<RelationshipSource>,
    pub axis: RelationshipAxis,
    /// Generation limit for descendant axes; 0 means unbounded.
    pub generations: u32,
}

/// One related entity and, for descendant axes, the entities below it.
#[derive(Debug, Clone, PartialEq)]
pub struct RelatedEntity {
    pub name: QName,
    pub preferred_label: Option<String>,
    pub usable: bool,
    pub children: Vec<RelatedEntity>,
}

impl RelatedEntity {
    fn leaf(name: QName) -> Self {
        RelatedEntity {
            name,
            preferred_label: None,
            usable: true,
            children: Vec::new(),
        }
    }

    fn from_relationship(rel: &Relationship, target: QName) -> Self {
        RelatedEntity {
            name: target,
            preferred_label: rel.preferred_label.clone(),
            usable: rel.usable,
            children: Vec::new(),
        }
    }

    /// Number of entities in this subtree.
    pub fn count(&self) -> usize {
        1 + self.children.iter().map(RelatedEntity::count).sum::<usize>()
    }

    pub fn depth(&self) -> usize {
        1 + self.children.iter().map(RelatedEntity::depth).max().unwrap_or(0)
    }
}

/// Resolves a query into a forest of related entities.
///
/// Duplicate sources are navigated once. For "-or-self" axes on the
/// descendant side, results hang below a single node for the source.
pub fn navigate<T: TaxonomyModel + ?Sized>(taxonomy: &T, query: &NetworkQuery) -> Vec<RelatedEntity> {
    let mut result = Vec::new();
    let mut visited_sources: Vec<&RelationshipSource> = Vec::new();

    for source in &query.sources {
        if visited_sources.contains(&source) {
            continue;
        }
        visited_sources.push(source);

        match source {
            RelationshipSource::Root => {
                if let Direction::Down = query.axis.direction() {
                    for root in roots(taxonomy, query) {
                        let mut node = root;
                        if !query.axis.is_single_generation() && query.generations != 1 {
                            let mut path = vec![node.name.clone()];
                            let remaining = remaining_after_first(query.generations);
                            node.children = descend(taxonomy, query, &node.name, &mut path, remaining);
                        }
                        result.push(node);
                    }
                }
            }
            RelationshipSource::Entity(name) => match query.axis.direction() {
                Direction::Down => {
                    let limit = if query.axis.is_single_generation() {
                        Some(1)
                    } else if query.generations == 0 {
                        None
                    } else {
                        Some(query.generations)
                    };
                    let mut path = vec![name.clone()];
                    let children = descend(taxonomy, query, name, &mut path, limit);
                    if query.axis.is_or_self() {
                        let mut node = RelatedEntity::leaf(name.clone());
                        node.children = children;
                        result.push(node);
                    } else {
                        result.extend(children);
                    }
                }
                Direction::Up => {
                    if query.axis.is_or_self() {
                        result.push(RelatedEntity::leaf(name.clone()));
                    }
                    for rel in taxonomy.relationships_to(&query.network, name) {
                        result.push(RelatedEntity::from_relationship(&rel, rel.from.clone()));
                    }
                }
                Direction::Across => {
                    result.extend(siblings(taxonomy, query, name));
                }
            },
        }
    }

    result
}

fn remaining_after_first(generations: u32) -> Option<u32> {
    match generations {
        0 => None,
        n => Some(n - 1),
    }
}

/// Entities reached from `from`, one tree level per generation.
fn descend<T: TaxonomyModel + ?Sized>(
    taxonomy: &T,
    query: &NetworkQuery,
    from: &QName,
    path: &mut Vec<QName>,
    remaining: Option<u32>,
) -> Vec<RelatedEntity> {
    if remaining == Some(0) {
        return Vec::new();
    }

    let mut out = Vec::new();
    for rel in taxonomy.relationships_from(&query.network, from) {
        if path.contains(&rel.to) {
            continue;
        }
        let mut node = RelatedEntity::from_relationship(&rel, rel.to.clone());
        path.push(rel.to.clone());
        node.children = descend(taxonomy, query, &rel.to, path, remaining.map(|r| r - 1));
        path.pop();
        out.push(node);
    }
    out
}

fn roots<T: TaxonomyModel + ?Sized>(taxonomy: &T, query: &NetworkQuery) -> Vec<RelatedEntity> {
    match &query.dimension {
        Some(dimension) => {
            let domain_network =
                NetworkKey::new(ARCROLE_DIMENSION_DOMAIN, query.network.link_role.clone());
            taxonomy
                .relationships_from(&domain_network, dimension)
                .iter()
                .map(|rel| RelatedEntity::from_relationship(rel, rel.to.clone()))
                .collect()
        }
        None => taxonomy
            .network_roots(&query.network)
            .into_iter()
            .map(RelatedEntity::leaf)
            .collect(),
    }
}

fn siblings<T: TaxonomyModel + ?Sized>(taxonomy: &T, query: &NetworkQuery, name: &QName) -> Vec<RelatedEntity> {
    let include_self = query.axis.is_or_self();
    let parents = taxonomy.relationships_to(&query.network, name);

    let candidates: Vec<RelatedEntity> = if parents.is_empty() {
        roots(taxonomy, query)
    } else {
        parents
            .iter()
            .flat_map(|parent| taxonomy.relationships_from(&query.network, &parent.from))
            .map(|rel| RelatedEntity::from_relationship(&rel, rel.to.clone()))
            .collect()
    };

    let mut out: Vec<RelatedEntity> = Vec::new();
    for candidate in candidates {
        if (!include_self && &candidate.name == name) || out.iter().any(|o| o.name == candidate.name) {
            continue;
        }
        out.push(candidate);
    }
    out
}
