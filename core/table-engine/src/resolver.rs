//! FILENAME: core/table-engine/src/resolver.rs
//! Structural Resolver - expands one axis's definition tree into a structural tree.
//!
//! Algorithm (per axis):
//! 1. Resolve the first breakdown's nodes under the axis root
//! 2. Clean the breakdown forest: trim, insert rollups, equalize depth
//! 3. Attach the next breakdown under every leaf (cartesian expansion), with
//!    the facts narrowed along the path to that leaf
//! 4. Axis-level cleanups: trim, equalize depth, backfill defaulted dimensions
//!
//! Node variants are resolved by one exhaustive match in `resolve_definition`.
//! Rule-node repetitions are memoised per resolver, keyed by node id and the
//! in-scope variables.

use std::collections::{BTreeMap, BTreeSet};
use std::rc::Rc;

use rustc_hash::FxHashMap;
use xbrl_model::{
    navigate, Aspect, AspectValue, ConceptKind, ExpressionEvaluator, FactSet, NetworkQuery,
    RelatedEntity, RelationshipSource, Scope, TaxonomyModel, Value, ROLE_PERIOD_END_LABEL,
    ROLE_PERIOD_START_LABEL,
};

use crate::binding::AspectBinding;
use crate::cleanup::{
    backfill_defaulted_dims, equalize_depth, forest_depth, insert_rollups, trim, trim_forest,
};
use crate::config::TableOptions;
use crate::definition::{
    AspectNode, AspectSource, Axis, Breakdown, DefinitionNode, NodeId, NodeKind,
    RelationshipKind, RelationshipNode, RuleNode, Tag, TAG_PERIOD_END, TAG_PERIOD_START,
};
use crate::error::{Result, StructuralError};
use crate::labels::value_text;
use crate::logging::CAT_RESOLVE;
use crate::matcher::FactMatcher;
use crate::structure::StructuralNode;
use crate::{log_debug, log_enter, log_exit};

// ============================================================================
// RULE REPETITIONS
// ============================================================================

/// Bindings of one repetition of a rule node.
#[derive(Debug, Clone, PartialEq)]
struct Repetition {
    untagged: AspectBinding,
    tagged: BTreeMap<Tag, AspectBinding>,
    has_default_set: bool,
}

/// Axis and top-level breakdown a definition node is being resolved for.
#[derive(Clone, Copy)]
struct Frame<'d> {
    axis: Axis,
    breakdown: &'d Breakdown,
}

// ============================================================================
// RESOLVER
// ============================================================================

pub struct StructuralResolver<'a> {
    taxonomy: &'a dyn TaxonomyModel,
    evaluator: &'a dyn ExpressionEvaluator,
    matcher: &'a FactMatcher<'a>,
    options: &'a TableOptions,

    /// Rule-node repetitions by (node id, in-scope variables).
    memo: FxHashMap<(NodeId, Scope), Rc<Vec<Repetition>>>,

    /// Next entry-surrogate number; unique across all axes of one table.
    next_entry: u32,
}

impl<'a> StructuralResolver<'a> {
    pub fn new(
        taxonomy: &'a dyn TaxonomyModel,
        evaluator: &'a dyn ExpressionEvaluator,
        matcher: &'a FactMatcher<'a>,
        options: &'a TableOptions,
    ) -> Self {
        StructuralResolver {
            taxonomy,
            evaluator,
            matcher,
            options,
            memo: FxHashMap::default(),
            next_entry: 0,
        }
    }

    /// Resolves the breakdowns of one axis into a tree under a synthetic root.
    pub fn resolve_axis<'d>(
        &mut self,
        axis: Axis,
        breakdowns: &'d [Breakdown],
        facts: &FactSet,
        scope: &Scope,
    ) -> Result<StructuralNode<'d>> {
        log_enter!(CAT_RESOLVE, "resolve_axis", "axis={} breakdowns={}", axis, breakdowns.len());

        let mut root = StructuralNode::axis_root(axis);
        self.expand_breakdowns(&mut root, breakdowns, axis, facts, scope)?;

        trim(&mut root);
        let depth = forest_depth(&root.children);
        equalize_depth(&mut root.children, depth);
        backfill_defaulted_dims(&mut root, &BTreeSet::new());

        root.breakdown_without_nodes = !breakdowns.is_empty() && root.leaf_count() == 0;

        log_debug!(
            CAT_RESOLVE,
            "{} axis resolved: {} leaves, depth {}",
            axis,
            root.leaf_count(),
            depth
        );
        log_exit!(CAT_RESOLVE, "resolve_axis");
        Ok(root)
    }

    // ========================================================================
    // BREAKDOWN EXPANSION
    // ========================================================================

    /// Resolves `breakdowns[0]` under `parent`, then attaches the remaining
    /// breakdowns under every leaf it produced.
    fn expand_breakdowns<'d>(
        &mut self,
        parent: &mut StructuralNode<'d>,
        breakdowns: &'d [Breakdown],
        axis: Axis,
        facts: &FactSet,
        scope: &Scope,
    ) -> Result<()> {
        let Some((first, rest)) = breakdowns.split_first() else {
            return Ok(());
        };

        if first.nodes.is_empty() {
            return self.expand_breakdowns(parent, rest, axis, facts, scope);
        }

        let frame = Frame {
            axis,
            breakdown: first,
        };
        let start = parent.children.len();
        for definition in &first.nodes {
            self.resolve_definition(parent, definition, frame, facts, scope)?;
        }

        let mut forest = parent.children.split_off(start);
        trim_forest(&mut forest);
        for node in &mut forest {
            insert_rollups(node);
        }
        let depth = forest_depth(&forest);
        equalize_depth(&mut forest, depth);

        if !rest.is_empty() {
            for node in &mut forest {
                self.attach_breakdowns(node, rest, axis, facts, scope)?;
            }
        }

        parent.children.extend(forest);
        Ok(())
    }

    fn attach_breakdowns<'d>(
        &mut self,
        node: &mut StructuralNode<'d>,
        rest: &'d [Breakdown],
        axis: Axis,
        facts: &FactSet,
        scope: &Scope,
    ) -> Result<()> {
        let narrowed: FactSet = match &node.facts_partition {
            Some(partition) => partition.intersection(facts).copied().collect(),
            None => self.matcher.filter_bound(&node.aspects, facts),
        };
        let inner = extend_scope(scope, &node.variables);

        if node.children.is_empty() {
            return self.expand_breakdowns(node, rest, axis, &narrowed, &inner);
        }
        for child in &mut node.children {
            self.attach_breakdowns(child, rest, axis, &narrowed, &inner)?;
        }
        Ok(())
    }

    // ========================================================================
    // DEFINITION NODES
    // ========================================================================

    /// Resolves one definition node, appending what it produces to `parent`
    /// (merged rule nodes fold into `parent` instead).
    fn resolve_definition<'d>(
        &mut self,
        parent: &mut StructuralNode<'d>,
        definition: &'d DefinitionNode,
        frame: Frame<'d>,
        facts: &FactSet,
        scope: &Scope,
    ) -> Result<()> {
        match &definition.kind {
            NodeKind::Breakdown => {
                for child in &definition.children {
                    self.resolve_definition(parent, child, frame, facts, scope)?;
                }
                Ok(())
            }
            NodeKind::Rule(rule) => self.resolve_rule(parent, definition, rule, frame, facts, scope),
            NodeKind::Relationship(rel) => {
                self.resolve_relationship(parent, definition, rel, frame, facts, scope)
            }
            NodeKind::Aspect(open) => {
                self.resolve_open_aspect(parent, definition, open, frame, facts, scope)
            }
        }
    }

    fn resolve_children<'d>(
        &mut self,
        node: &mut StructuralNode<'d>,
        definition: &'d DefinitionNode,
        frame: Frame<'d>,
        facts: &FactSet,
        scope: &Scope,
    ) -> Result<()> {
        if definition.children.is_empty() {
            return Ok(());
        }
        let inner = extend_scope(scope, &node.variables);
        for child in &definition.children {
            self.resolve_definition(node, child, frame, facts, &inner)?;
        }
        Ok(())
    }

    // ========================================================================
    // RULE NODES
    // ========================================================================

    fn resolve_rule<'d>(
        &mut self,
        parent: &mut StructuralNode<'d>,
        definition: &'d DefinitionNode,
        rule: &'d RuleNode,
        frame: Frame<'d>,
        facts: &FactSet,
        scope: &Scope,
    ) -> Result<()> {
        let repetitions = self.repetitions(definition, rule, frame.axis, scope)?;

        if repetitions.is_empty() && !definition.is_abstract && !definition.children_cover_same_aspects() {
            return Err(StructuralError::ZeroCardinality {
                node: definition.id.clone(),
                axis: frame.axis,
            });
        }

        if definition.is_merged {
            if repetitions.len() > 1 {
                return Err(StructuralError::CardinalityMismatch {
                    node: definition.id.clone(),
                    axis: frame.axis,
                    expected: 1,
                    found: repetitions.len(),
                });
            }
            if let Some(repetition) = repetitions.first() {
                fold_into(parent, repetition);
            }
            if let Some(tag) = &definition.tag_selector {
                parent.tag_selectors.insert(tag.clone());
            }
            for child in &definition.children {
                self.resolve_definition(parent, child, frame, facts, scope)?;
            }
            return Ok(());
        }

        if repetitions.is_empty() {
            // Header-only node; its children carry the coordinates.
            let mut node = StructuralNode::from_definition(definition, frame.breakdown, frame.axis);
            node.is_abstract = true;
            node.repetitions = 0;
            self.resolve_children(&mut node, definition, frame, facts, scope)?;
            parent.children.push(node);
            return Ok(());
        }

        let count = repetitions.len();
        for repetition in repetitions.iter() {
            let mut node = StructuralNode::from_definition(definition, frame.breakdown, frame.axis);
            node.aspects = repetition.untagged.clone();
            node.tagged_aspects = repetition.tagged.clone();
            node.has_default_constraint_set = repetition.has_default_set;
            node.repetitions = count;

            let narrowed = self.matcher.filter_bound(&node.aspects, facts);
            self.resolve_children(&mut node, definition, frame, &narrowed, scope)?;
            parent.children.push(node);
        }
        Ok(())
    }

    fn repetitions(
        &mut self,
        definition: &DefinitionNode,
        rule: &RuleNode,
        axis: Axis,
        scope: &Scope,
    ) -> Result<Rc<Vec<Repetition>>> {
        let key = (definition.id.clone(), scope.clone());
        if let Some(hit) = self.memo.get(&key) {
            return Ok(Rc::clone(hit));
        }
        let computed = Rc::new(self.compute_repetitions(definition, rule, axis, scope)?);
        self.memo.insert(key, Rc::clone(&computed));
        Ok(computed)
    }

    /// Evaluates every aspect rule into a column of values. Columns of one
    /// value repeat across all repetitions; longer columns must agree.
    fn compute_repetitions(
        &self,
        definition: &DefinitionNode,
        rule: &RuleNode,
        axis: Axis,
        scope: &Scope,
    ) -> Result<Vec<Repetition>> {
        let mut columns: Vec<(Option<&Tag>, &Aspect, Vec<AspectValue>)> = Vec::new();
        for set in &rule.constraint_sets {
            for aspect_rule in &set.rules {
                let values = match &aspect_rule.source {
                    AspectSource::Fixed(value) => vec![value.clone()],
                    AspectSource::OneOf(values) => values.clone(),
                    AspectSource::Expression(expression) => self
                        .evaluator
                        .evaluate(expression, scope)
                        .and_then(|value| value.to_aspect_values(&aspect_rule.aspect))
                        .map_err(|source| StructuralError::Evaluation {
                            node: definition.id.clone(),
                            axis,
                            source,
                        })?,
                };
                if let Some(bad) = values.iter().find(|v| !v.fits(&aspect_rule.aspect)) {
                    return Err(StructuralError::InvalidAspectValue {
                        node: definition.id.clone(),
                        axis,
                        aspect: aspect_rule.aspect.clone(),
                        reason: format!("{} cannot be bound to this aspect", bad),
                    });
                }
                columns.push((set.tag.as_ref(), &aspect_rule.aspect, values));
            }
        }

        if columns.iter().any(|(_, _, values)| values.is_empty()) {
            return Ok(Vec::new());
        }
        let count = columns.iter().map(|(_, _, values)| values.len()).max().unwrap_or(1);
        if let Some((_, _, values)) = columns
            .iter()
            .find(|(_, _, values)| values.len() != 1 && values.len() != count)
        {
            return Err(StructuralError::CardinalityMismatch {
                node: definition.id.clone(),
                axis,
                expected: count,
                found: values.len(),
            });
        }

        let has_default_set =
            rule.constraint_sets.is_empty() || rule.constraint_sets.iter().any(|s| s.tag.is_none());

        (0..count)
            .map(|index| {
                let mut repetition = Repetition {
                    untagged: AspectBinding::new(),
                    tagged: BTreeMap::new(),
                    has_default_set,
                };
                for set in &rule.constraint_sets {
                    if let Some(tag) = &set.tag {
                        repetition.tagged.entry(tag.clone()).or_default();
                    }
                }
                for (tag, aspect, values) in &columns {
                    let value = if values.len() == 1 { &values[0] } else { &values[index] };
                    let target = match tag {
                        None => &mut repetition.untagged,
                        Some(tag) => repetition.tagged.entry((*tag).clone()).or_default(),
                    };
                    target.insert((*aspect).clone(), value.clone());
                }

                if self.options.validate_concepts {
                    self.validate_binding(definition, axis, &repetition.untagged)?;
                    for binding in repetition.tagged.values() {
                        self.validate_binding(definition, axis, binding)?;
                    }
                }
                Ok(repetition)
            })
            .collect()
    }

    fn validate_binding(&self, definition: &DefinitionNode, axis: Axis, binding: &AspectBinding) -> Result<()> {
        for (aspect, value) in binding.iter() {
            match (aspect, value) {
                (Aspect::Concept, AspectValue::Concept(name)) => {
                    let reason = match self.taxonomy.concept(name) {
                        None => format!("concept {} is not defined", name),
                        Some(concept) if concept.kind != ConceptKind::Item => {
                            format!("{} is a dimension or hypercube", name)
                        }
                        Some(_) => continue,
                    };
                    return Err(StructuralError::InvalidAspectValue {
                        node: definition.id.clone(),
                        axis,
                        aspect: aspect.clone(),
                        reason,
                    });
                }
                (Aspect::Dimension(dimension), value) => {
                    let kind = self.taxonomy.concept(dimension).map(|c| c.kind);
                    let reason = match (kind, value) {
                        (Some(ConceptKind::ExplicitDimension), AspectValue::Member(member)) => {
                            if self.taxonomy.concept(member).is_none() {
                                return Err(StructuralError::InvalidAspectValue {
                                    node: definition.id.clone(),
                                    axis,
                                    aspect: aspect.clone(),
                                    reason: format!("member {} is not defined", member),
                                });
                            }
                            continue;
                        }
                        (Some(ConceptKind::ExplicitDimension), AspectValue::Typed(_)) => {
                            "is explicit but bound to a typed value"
                        }
                        (Some(ConceptKind::TypedDimension), AspectValue::Member(_)) => {
                            "is typed but bound to a member"
                        }
                        (Some(ConceptKind::ExplicitDimension | ConceptKind::TypedDimension), _) => continue,
                        _ => "is not a dimension",
                    };
                    return Err(StructuralError::InconsistentDimensionCoverage {
                        node: definition.id.clone(),
                        axis,
                        dimension: dimension.clone(),
                        reason: reason.to_string(),
                    });
                }
                _ => {}
            }
        }
        Ok(())
    }

    // ========================================================================
    // RELATIONSHIP NODES
    // ========================================================================

    fn resolve_relationship<'d>(
        &mut self,
        parent: &mut StructuralNode<'d>,
        definition: &'d DefinitionNode,
        rel: &'d RelationshipNode,
        frame: Frame<'d>,
        facts: &FactSet,
        scope: &Scope,
    ) -> Result<()> {
        if rel.axis.is_single_generation() && rel.generations > 1 {
            return Err(StructuralError::TooManyGenerations {
                node: definition.id.clone(),
                axis: frame.axis,
                relationship_axis: rel.axis,
                generations: rel.generations,
            });
        }
        self.check_sources(definition, rel, frame.axis)?;

        let query = NetworkQuery {
            network: rel.network(),
            dimension: match &rel.kind {
                RelationshipKind::Dimension { dimension } => Some(dimension.clone()),
                RelationshipKind::Concept { .. } => None,
            },
            sources: rel.sources.clone(),
            axis: rel.axis,
            generations: rel.generations,
        };
        let related = navigate(self.taxonomy, &query);
        log_debug!(
            CAT_RESOLVE,
            "relationship node {}: {} related entities",
            definition.id,
            related.iter().map(RelatedEntity::count).sum::<usize>()
        );

        for entity in &related {
            let node = self.relationship_node(definition, rel, entity, frame, facts, scope)?;
            parent.children.push(node);
        }
        Ok(())
    }

    fn check_sources(&self, definition: &DefinitionNode, rel: &RelationshipNode, axis: Axis) -> Result<()> {
        let unresolvable = |name: &xbrl_model::QName, reason: &str| StructuralError::UnresolvableRelationshipSource {
            node: definition.id.clone(),
            axis,
            source_name: name.to_string(),
            reason: reason.to_string(),
        };

        if let RelationshipKind::Dimension { dimension } = &rel.kind {
            let kind = self.taxonomy.concept(dimension).map(|c| c.kind);
            if kind != Some(ConceptKind::ExplicitDimension) {
                return Err(StructuralError::InconsistentDimensionCoverage {
                    node: definition.id.clone(),
                    axis,
                    dimension: dimension.clone(),
                    reason: "is not an explicit dimension".to_string(),
                });
            }
        }

        for source in &rel.sources {
            let RelationshipSource::Entity(name) = source else {
                continue;
            };
            match self.taxonomy.concept(name) {
                None => return Err(unresolvable(name, "is not defined in the taxonomy")),
                Some(concept) if concept.kind != ConceptKind::Item => {
                    return Err(unresolvable(name, "is a dimension or hypercube"));
                }
                Some(_) => {}
            }
        }
        Ok(())
    }

    /// Structural node for one related entity and its descendants. Definition
    /// children resolve under every leaf.
    fn relationship_node<'d>(
        &mut self,
        definition: &'d DefinitionNode,
        rel: &'d RelationshipNode,
        entity: &RelatedEntity,
        frame: Frame<'d>,
        facts: &FactSet,
        scope: &Scope,
    ) -> Result<StructuralNode<'d>> {
        let mut node = StructuralNode::from_definition(definition, frame.breakdown, frame.axis);
        let value = match &rel.kind {
            RelationshipKind::Concept { .. } => {
                node.is_abstract |= self
                    .taxonomy
                    .concept(&entity.name)
                    .map_or(false, |c| c.is_abstract);
                AspectValue::Concept(entity.name.clone())
            }
            RelationshipKind::Dimension { .. } => {
                node.is_abstract |= !entity.usable;
                AspectValue::Member(entity.name.clone())
            }
        };
        node.aspects.insert(rel.covered_aspect(), value);

        node.preferred_label = entity.preferred_label.clone();
        match entity.preferred_label.as_deref() {
            Some(ROLE_PERIOD_START_LABEL) => {
                node.tag_selectors.insert(TAG_PERIOD_START.to_string());
            }
            Some(ROLE_PERIOD_END_LABEL) => {
                node.tag_selectors.insert(TAG_PERIOD_END.to_string());
            }
            _ => {}
        }
        if let Some(variable) = &rel.variable {
            node.variables
                .insert(variable.clone(), Value::QName(entity.name.clone()));
        }

        if entity.children.is_empty() {
            let narrowed = self.matcher.filter_bound(&node.aspects, facts);
            self.resolve_children(&mut node, definition, frame, &narrowed, scope)?;
        } else {
            for child in &entity.children {
                let child_node = self.relationship_node(definition, rel, child, frame, facts, scope)?;
                node.children.push(child_node);
            }
        }
        Ok(node)
    }

    // ========================================================================
    // ASPECT (OPEN) NODES
    // ========================================================================

    fn resolve_open_aspect<'d>(
        &mut self,
        parent: &mut StructuralNode<'d>,
        definition: &'d DefinitionNode,
        open: &'d AspectNode,
        frame: Frame<'d>,
        facts: &FactSet,
        scope: &Scope,
    ) -> Result<()> {
        let filtered = self.matcher.apply_filters(&open.filters, facts);

        // Partition by reported value, in order of first appearance.
        let mut partitions: Vec<(AspectValue, FactSet)> = Vec::new();
        let mut index: FxHashMap<AspectValue, usize> = FxHashMap::default();
        for id in &filtered {
            let Some(value) = self
                .matcher
                .store()
                .fact(*id)
                .and_then(|fact| fact.aspect_value(&open.aspect))
            else {
                continue;
            };
            match index.get(&value) {
                Some(&slot) => {
                    partitions[slot].1.insert(*id);
                }
                None => {
                    index.insert(value.clone(), partitions.len());
                    partitions.push((value, std::iter::once(*id).collect()));
                }
            }
        }

        // Concepts keep document order; everything else sorts by header text.
        if open.aspect != Aspect::Concept {
            let lang = self.options.lang.as_str();
            partitions.sort_by_cached_key(|(value, _)| {
                value_text(self.taxonomy, value, None, lang).unwrap_or_default()
            });
        }

        log_debug!(
            CAT_RESOLVE,
            "open node {} on {}: {} partitions from {} facts",
            definition.id,
            open.aspect,
            partitions.len(),
            filtered.len()
        );

        for (value, partition) in partitions {
            let mut node = StructuralNode::from_definition(definition, frame.breakdown, frame.axis);
            node.aspects.insert(open.aspect.clone(), value);
            self.resolve_children(&mut node, definition, frame, &partition, scope)?;
            node.facts_partition = Some(partition);
            parent.children.push(node);
        }

        if let (Some(rows), true) = (self.options.entry_rows, open.entry_rows) {
            let count = if parent.aspects.has_entry_surrogate() { rows.min(1) } else { rows };
            for _ in 0..count {
                let mut node = StructuralNode::from_definition(definition, frame.breakdown, frame.axis);
                node.aspects
                    .insert(open.aspect.clone(), AspectValue::EntrySurrogate(self.next_entry));
                self.next_entry += 1;
                self.resolve_children(&mut node, definition, frame, &FactSet::new(), scope)?;
                node.facts_partition = Some(FactSet::new());
                parent.children.push(node);
            }
        }
        Ok(())
    }
}

/// Folds a merged rule node's bindings into the enclosing structural node;
/// bindings the enclosing node already makes win.
fn fold_into(parent: &mut StructuralNode<'_>, repetition: &Repetition) {
    for (aspect, value) in repetition.untagged.iter() {
        parent.aspects.insert_if_absent(aspect.clone(), value.clone());
    }
    for (tag, binding) in &repetition.tagged {
        let target = parent.tagged_aspects.entry(tag.clone()).or_default();
        for (aspect, value) in binding.iter() {
            target.insert_if_absent(aspect.clone(), value.clone());
        }
    }
    if !repetition.has_default_set {
        parent.has_default_constraint_set = false;
    }
}

fn extend_scope(scope: &Scope, variables: &Scope) -> Scope {
    let mut inner = scope.clone();
    inner.extend(variables.iter().map(|(k, v)| (k.clone(), v.clone())));
    inner
}
