//! FILENAME: core/xbrl-model/src/taxonomy.rs
//! Taxonomy contract: concepts, dimension defaults, labels and relationship
//! networks.
//!
//! The table engine only reads the taxonomy. `InMemoryTaxonomy` is a small
//! reference implementation holding everything in hash maps, with
//! relationships kept in insertion order (which is network order).

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::aspect::PeriodType;
use crate::network::{navigate, NetworkQuery, RelatedEntity};
use crate::qname::QName;

// ============================================================================
// WELL-KNOWN ROLES
// ============================================================================

pub const ARCROLE_PARENT_CHILD: &str = "http://www.xbrl.org/2003/arcrole/parent-child";
pub const ARCROLE_DIMENSION_DOMAIN: &str = "http://xbrl.org/int/dim/arcrole/dimension-domain";
pub const ARCROLE_DOMAIN_MEMBER: &str = "http://xbrl.org/int/dim/arcrole/domain-member";

pub const ROLE_STANDARD_LABEL: &str = "http://www.xbrl.org/2003/role/label";
pub const ROLE_TERSE_LABEL: &str = "http://www.xbrl.org/2003/role/terseLabel";
pub const ROLE_DOCUMENTATION: &str = "http://www.xbrl.org/2003/role/documentation";
pub const ROLE_PERIOD_START_LABEL: &str = "http://www.xbrl.org/2003/role/periodStartLabel";
pub const ROLE_PERIOD_END_LABEL: &str = "http://www.xbrl.org/2003/role/periodEndLabel";
/// Generic label role used for labels on table resources.
pub const ROLE_GENERIC_LABEL: &str = "http://www.xbrl.org/2008/role/label";
pub const ROLE_CODE_LABEL: &str = "http://www.eurofiling.info/xbrl/role/rc-code";

// ============================================================================
// CONCEPTS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConceptKind {
    /// Primary item or domain member.
    Item,
    ExplicitDimension,
    TypedDimension,
    Hypercube,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Concept {
    pub name: QName,
    pub kind: ConceptKind,
    pub is_abstract: bool,
    pub is_numeric: bool,
    pub period_type: Option<PeriodType>,
}

impl Concept {
    pub fn item(name: QName) -> Self {
        Concept {
            name,
            kind: ConceptKind::Item,
            is_abstract: false,
            is_numeric: true,
            period_type: Some(PeriodType::Instant),
        }
    }

    pub fn abstract_item(name: QName) -> Self {
        Concept {
            is_abstract: true,
            is_numeric: false,
            period_type: None,
            ..Concept::item(name)
        }
    }

    pub fn explicit_dimension(name: QName) -> Self {
        Concept {
            kind: ConceptKind::ExplicitDimension,
            ..Concept::abstract_item(name)
        }
    }

    pub fn typed_dimension(name: QName) -> Self {
        Concept {
            kind: ConceptKind::TypedDimension,
            ..Concept::abstract_item(name)
        }
    }

    pub fn is_dimension(&self) -> bool {
        matches!(
            self.kind,
            ConceptKind::ExplicitDimension | ConceptKind::TypedDimension
        )
    }
}

// ============================================================================
// NETWORKS AND LABELS
// ============================================================================

/// Identifies a relationship network by arcrole and (optionally) link role.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NetworkKey {
    pub arcrole: String,
    /// `None` selects relationships from every link role.
    #[serde(default)]
    pub link_role: Option<String>,
}

impl NetworkKey {
    pub fn new(arcrole: impl Into<String>, link_role: Option<String>) -> Self {
        NetworkKey {
            arcrole: arcrole.into(),
            link_role,
        }
    }

    pub fn presentation(link_role: Option<String>) -> Self {
        NetworkKey::new(ARCROLE_PARENT_CHILD, link_role)
    }

    fn admits(&self, arcrole: &str, link_role: &str) -> bool {
        self.arcrole == arcrole
            && self.link_role.as_deref().map_or(true, |role| role == link_role)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Relationship {
    pub from: QName,
    pub to: QName,
    #[serde(default)]
    pub preferred_label: Option<String>,
    /// XDT `usable` attribute; false members may not be reported.
    pub usable: bool,
}

impl Relationship {
    pub fn new(from: QName, to: QName) -> Self {
        Relationship {
            from,
            to,
            preferred_label: None,
            usable: true,
        }
    }

    pub fn with_preferred_label(mut self, role: impl Into<String>) -> Self {
        self.preferred_label = Some(role.into());
        self
    }

    pub fn not_usable(mut self) -> Self {
        self.usable = false;
        self
    }
}

/// Something a label can be attached to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LabelTarget {
    Concept(QName),
    /// A table resource (table, breakdown or definition node) by id.
    Resource(String),
}

// ============================================================================
// TAXONOMY CONTRACT
// ============================================================================

/// Read-only view of a taxonomy.
pub trait TaxonomyModel {
    fn concept(&self, name: &QName) -> Option<&Concept>;

    /// Declared default member of an explicit dimension.
    fn default_member(&self, dimension: &QName) -> Option<&QName>;

    fn label(&self, target: &LabelTarget, role: &str, lang: &str) -> Option<String>;

    /// Outgoing relationships of `source` in network order.
    fn relationships_from(&self, network: &NetworkKey, source: &QName) -> Vec<Relationship>;

    /// Incoming relationships of `target` in network order.
    fn relationships_to(&self, network: &NetworkKey, target: &QName) -> Vec<Relationship>;

    /// Sources that are never targets in the network, in network order.
    fn network_roots(&self, network: &NetworkKey) -> Vec<QName>;

    /// Related entities of a query, flattened depth-first.
    fn related_entities(&self, query: &NetworkQuery) -> Vec<QName> {
        fn flatten(nodes: &[RelatedEntity], out: &mut Vec<QName>) {
            for node in nodes {
                out.push(node.name.clone());
                flatten(&node.children, out);
            }
        }
        let mut out = Vec::new();
        flatten(&navigate(self, query), &mut out);
        out
    }
}

// ============================================================================
// IN-MEMORY TAXONOMY
// ============================================================================

#[derive(Debug, Clone)]
struct StoredRelationship {
    arcrole: String,
    link_role: String,
    relationship: Relationship,
}

#[derive(Debug, Clone, Default)]
pub struct InMemoryTaxonomy {
    concepts: FxHashMap<QName, Concept>,
    defaults: FxHashMap<QName, QName>,
    labels: FxHashMap<(LabelTarget, String), Vec<(String, String)>>,
    relationships: Vec<StoredRelationship>,
}

impl InMemoryTaxonomy {
    pub fn new() -> Self {
        InMemoryTaxonomy::default()
    }

    pub fn add_concept(&mut self, concept: Concept) -> &mut Self {
        self.concepts.insert(concept.name.clone(), concept);
        self
    }

    pub fn set_default_member(&mut self, dimension: QName, member: QName) -> &mut Self {
        self.defaults.insert(dimension, member);
        self
    }

    pub fn add_label(
        &mut self,
        target: LabelTarget,
        role: &str,
        lang: &str,
        text: impl Into<String>,
    ) -> &mut Self {
        self.labels
            .entry((target, role.to_string()))
            .or_default()
            .push((lang.to_string(), text.into()));
        self
    }

    pub fn add_relationship(
        &mut self,
        arcrole: &str,
        link_role: &str,
        relationship: Relationship,
    ) -> &mut Self {
        self.relationships.push(StoredRelationship {
            arcrole: arcrole.to_string(),
            link_role: link_role.to_string(),
            relationship,
        });
        self
    }

    fn network<'a>(&'a self, network: &'a NetworkKey) -> impl Iterator<Item = &'a Relationship> + 'a {
        self.relationships
            .iter()
            .filter(move |r| network.admits(&r.arcrole, &r.link_role))
            .map(|r| &r.relationship)
    }
}

impl TaxonomyModel for InMemoryTaxonomy {
    fn concept(&self, name: &QName) -> Option<&Concept> {
        self.concepts.get(name)
    }

    fn default_member(&self, dimension: &QName) -> Option<&QName> {
        self.defaults.get(dimension)
    }

    fn label(&self, target: &LabelTarget, role: &str, lang: &str) -> Option<String> {
        let candidates = self.labels.get(&(target.clone(), role.to_string()))?;
        let primary = lang.split('-').next().unwrap_or(lang);
        candidates
            .iter()
            .find(|(l, _)| l == lang)
            .or_else(|| {
                candidates
                    .iter()
                    .find(|(l, _)| l.split('-').next() == Some(primary))
            })
            .map(|(_, text)| text.clone())
    }

    fn relationships_from(&self, network: &NetworkKey, source: &QName) -> Vec<Relationship> {
        self.network(network)
            .filter(|r| &r.from == source)
            .cloned()
            .collect()
    }

    fn relationships_to(&self, network: &NetworkKey, target: &QName) -> Vec<Relationship> {
        self.network(network)
            .filter(|r| &r.to == target)
            .cloned()
            .collect()
    }

    fn network_roots(&self, network: &NetworkKey) -> Vec<QName> {
        let targets: Vec<&QName> = self.network(network).map(|r| &r.to).collect();
        let mut roots: Vec<QName> = Vec::new();
        for rel in self.network(network) {
            if !targets.contains(&&rel.from) && !roots.contains(&rel.from) {
                roots.push(rel.from.clone());
            }
        }
        roots
    }
}
