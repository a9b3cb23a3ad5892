//! FILENAME: core/table-engine/src/labels.rs
//! Header label resolution.
//!
//! The main label of a header cell comes from, in order:
//! - nothing, for rollups
//! - the rule node's own resource label, when the node repeats once
//! - the node's primary bound value (concept, else a dimension member, else
//!   the first bound aspect), labelled through the taxonomy
//!
//! Taxonomy labels are looked up with the preferred role first, then the
//! generic and standard label roles, then the qualified name itself.

use xbrl_model::{
    Aspect, AspectValue, LabelTarget, TaxonomyModel, ROLE_GENERIC_LABEL, ROLE_STANDARD_LABEL,
};

use crate::config::TableOptions;
use crate::definition::NodeKind;
use crate::layout::HeaderLabel;
use crate::structure::StructuralNode;

/// Label of `target`, trying the preferred role, then generic, then standard.
pub fn resolve_label(
    taxonomy: &dyn TaxonomyModel,
    target: &LabelTarget,
    preferred: Option<&str>,
    lang: &str,
) -> Option<String> {
    preferred
        .into_iter()
        .chain([ROLE_GENERIC_LABEL, ROLE_STANDARD_LABEL])
        .find_map(|role| taxonomy.label(target, role, lang))
}

/// Display text of one aspect value; `None` for values that render blank.
pub fn value_text(
    taxonomy: &dyn TaxonomyModel,
    value: &AspectValue,
    preferred: Option<&str>,
    lang: &str,
) -> Option<String> {
    match value {
        AspectValue::Concept(name) | AspectValue::Member(name) => Some(
            resolve_label(taxonomy, &LabelTarget::Concept(name.clone()), preferred, lang)
                .unwrap_or_else(|| name.to_string()),
        ),
        AspectValue::EntrySurrogate(_) | AspectValue::DimensionDefault => None,
        other => Some(other.to_string()),
    }
}

/// The value a header cell is labelled by.
fn primary_value<'n>(node: &'n StructuralNode<'_>) -> Option<&'n AspectValue> {
    let aspects = &node.aspects;
    aspects
        .get(&Aspect::Concept)
        .or_else(|| aspects.dimensions().next().map(|(_, value)| value))
        .or_else(|| aspects.iter().next().map(|(_, value)| value))
}

/// Main label text of a structural node.
pub fn header_text(taxonomy: &dyn TaxonomyModel, node: &StructuralNode<'_>, lang: &str) -> Option<String> {
    if node.is_rollup() {
        return None;
    }

    if let Some(definition) = node.definition {
        if matches!(definition.kind, NodeKind::Rule(_)) && node.repetitions == 1 {
            let own = taxonomy.label(
                &LabelTarget::Resource(definition.id.clone()),
                ROLE_GENERIC_LABEL,
                lang,
            );
            if own.is_some() {
                return own;
            }
        }
    }

    primary_value(node).and_then(|value| value_text(taxonomy, value, node.preferred_label.as_deref(), lang))
}

/// All labels of a header cell: the main label, then one per extra role.
pub fn header_labels(
    taxonomy: &dyn TaxonomyModel,
    node: &StructuralNode<'_>,
    options: &TableOptions,
) -> Vec<HeaderLabel> {
    let lang = options.lang.as_str();
    let mut labels = Vec::new();
    if let Some(text) = header_text(taxonomy, node, lang) {
        labels.push(HeaderLabel {
            text,
            role: None,
            lang: lang.to_string(),
        });
    }
    if node.is_rollup() {
        return labels;
    }

    let target = match primary_value(node).and_then(AspectValue::as_qname) {
        Some(name) => LabelTarget::Concept(name.clone()),
        None => match node.definition {
            Some(definition) => LabelTarget::Resource(definition.id.clone()),
            None => return labels,
        },
    };
    for role in options.ordered_label_roles() {
        if let Some(text) = taxonomy.label(&target, role, lang) {
            labels.push(HeaderLabel {
                text,
                role: Some(role.to_string()),
                lang: lang.to_string(),
            });
        }
    }
    labels
}
