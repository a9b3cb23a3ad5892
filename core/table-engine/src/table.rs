//! FILENAME: core/table-engine/src/table.rs
//! Table entry points.
//!
//! `resolve_table` resolves one table instance: the z axis first (a single z
//! path puts its variables in scope for y and x), then y, then x, then
//! materializes the layout. `resolve_table_set` expands sequence-valued
//! parameters into every combination and resolves each one independently.

use xbrl_model::{ExpressionEvaluator, FactStore, Scope, TaxonomyModel, Value};

use crate::config::TableOptions;
use crate::definition::{Axis, TableDefinition};
use crate::error::{Result, StructuralError};
use crate::layout::LayoutTable;
use crate::logging::CAT_TABLE;
use crate::materializer::LayoutMaterializer;
use crate::matcher::FactMatcher;
use crate::resolver::StructuralResolver;
use crate::{log_enter, log_error, log_exit, log_info, log_warn};

/// One parameter combination and what resolving it produced.
#[derive(Debug, Clone, PartialEq)]
pub struct TableInstance {
    pub parameters: Scope,
    pub outcome: std::result::Result<LayoutTable, StructuralError>,
}

impl TableInstance {
    pub fn is_ok(&self) -> bool {
        self.outcome.is_ok()
    }
}

/// Resolves and lays out one instance of a table.
pub fn resolve_table(
    definition: &TableDefinition,
    taxonomy: &dyn TaxonomyModel,
    facts: &dyn FactStore,
    evaluator: &dyn ExpressionEvaluator,
    parameters: &Scope,
    options: &TableOptions,
) -> Result<LayoutTable> {
    log_enter!(CAT_TABLE, "resolve_table", "table={} parameters={}", definition.id, parameters.len());

    let matcher = FactMatcher::new(taxonomy, facts, &definition.filters);
    let table_facts = matcher.table_facts();
    let mut resolver = StructuralResolver::new(taxonomy, evaluator, &matcher, options);

    let z = resolver.resolve_axis(Axis::Z, &definition.z, &table_facts, parameters)?;
    let mut scope = parameters.clone();
    if let Some(path) = z.single_leaf_path() {
        for node in path {
            scope.extend(node.variables.iter().map(|(k, v)| (k.clone(), v.clone())));
        }
    }
    let y = resolver.resolve_axis(Axis::Y, &definition.y, &table_facts, &scope)?;
    let x = resolver.resolve_axis(Axis::X, &definition.x, &table_facts, &scope)?;

    let materializer = LayoutMaterializer::new(taxonomy, &matcher, options);
    let mut table = materializer.materialize(definition, &x, &y, &z).map_err(|err| {
        if let StructuralError::InconsistentSpans { .. } = err {
            log_error!(CAT_TABLE, "table {}: resolved structure is not rectangular: {}", definition.id, err);
        }
        err
    })?;
    table.parameters = parameters
        .iter()
        .map(|(name, value)| (name.clone(), value.clone()))
        .collect();

    log_info!(
        CAT_TABLE,
        "table {}: {} x {} over {} pages",
        definition.id,
        table.y.leaf_count,
        table.x.leaf_count,
        table.pages.len()
    );
    log_exit!(CAT_TABLE, "resolve_table");
    Ok(table)
}

/// Every combination of parameter values, names ascending, the last name
/// varying fastest. Non-sequence values take part as single choices; an
/// empty sequence yields no combinations.
pub fn parameter_combinations(parameters: &Scope) -> Vec<Scope> {
    let mut combinations = vec![Scope::new()];
    for (name, value) in parameters {
        let choices: Vec<Value> = match value {
            Value::Sequence(_) => value.items().into_iter().cloned().collect(),
            single => vec![single.clone()],
        };
        combinations = combinations
            .into_iter()
            .flat_map(|partial| {
                choices.iter().map(move |choice| {
                    let mut next = partial.clone();
                    next.insert(name.clone(), choice.clone());
                    next
                })
            })
            .collect();
    }
    combinations
}

/// Resolves one table instance per parameter combination. A failing
/// instance is reported in its own outcome and does not stop the others.
pub fn resolve_table_set(
    definition: &TableDefinition,
    taxonomy: &dyn TaxonomyModel,
    facts: &dyn FactStore,
    evaluator: &dyn ExpressionEvaluator,
    parameters: &Scope,
    options: &TableOptions,
) -> Vec<TableInstance> {
    parameter_combinations(parameters)
        .into_iter()
        .map(|combination| {
            let outcome = resolve_table(definition, taxonomy, facts, evaluator, &combination, options);
            if let Err(err) = &outcome {
                log_warn!(CAT_TABLE, "table {} instance {:?} failed: {}", definition.id, combination, err);
            }
            TableInstance {
                parameters: combination,
                outcome,
            }
        })
        .collect()
}
