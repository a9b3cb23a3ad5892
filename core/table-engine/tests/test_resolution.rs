//! FILENAME: tests/test_resolution.rs
//! Integration tests for resolving table definitions end to end.

mod common;

use common::{
    concept_rule, concept_tree, concepts_rule, grid, instant, period_rule, q, region_rule,
    region_tree, row_texts, table, BalanceSheetFixture, TestHarness,
};
use table_engine::{
    resolve_table_set, AspectRule, AspectSource, Axis, Breakdown, DefinitionNode, StructuralError,
};
use xbrl_model::{
    Aspect, AspectValue, EvaluationError, Expression, ExpressionEvaluator, RelationshipAxis, Scope,
    Value,
};

// ============================================================================
// HELPER FUNCTIONS
// ============================================================================

/// Rule node binding Assets at the 2023 year end.
fn assets_2023(id: &str) -> DefinitionNode {
    DefinitionNode::rule(
        id,
        vec![
            AspectRule::fixed(Aspect::Concept, AspectValue::Concept(q("Assets"))),
            AspectRule::fixed(Aspect::Period, AspectValue::Period(instant(2023, 12, 31))),
        ],
    )
}

/// Yields no concepts while `$p` is "a", Assets otherwise.
struct ParameterEvaluator;

impl ExpressionEvaluator for ParameterEvaluator {
    fn evaluate(&self, _expression: &Expression, scope: &Scope) -> Result<Value, EvaluationError> {
        match scope.get("p") {
            Some(Value::String(p)) if p == "a" => Ok(Value::Empty),
            Some(_) => Ok(Value::QName(q("Assets"))),
            None => Err(EvaluationError::UnknownVariable("p".to_string())),
        }
    }
}

// ============================================================================
// BASIC TABLES
// ============================================================================

#[test]
fn test_two_concepts_by_open_period() {
    let harness = TestHarness::with_store(BalanceSheetFixture::scenario_store());
    let definition = table(
        "balance",
        vec![Breakdown::new("bx", vec![concepts_rule("concepts", &["Assets", "Liabilities"])])],
        vec![Breakdown::new("by", vec![DefinitionNode::aspect("periods", Aspect::Period)])],
        Vec::new(),
    );

    let layout = harness.resolve(&definition).unwrap();

    assert_eq!(layout.label.as_deref(), Some("Balance sheet"));
    assert_eq!(layout.x.leaf_count, 2);
    assert_eq!(layout.y.leaf_count, 1);
    assert_eq!(layout.pages.len(), 1);
    assert_eq!(layout.pages[0].z_index, 0);
    assert_eq!(
        grid(&layout, 0),
        vec![vec![vec!["100".to_string()], vec!["40".to_string()]]]
    );
    assert_eq!(
        row_texts(&layout, Axis::X, 0),
        vec![Some("Assets".to_string()), Some("Liabilities".to_string())]
    );
    assert_eq!(row_texts(&layout, Axis::Y, 0), vec![Some("2023-12-31".to_string())]);
}

#[test]
fn test_cartesian_breakdowns_on_one_axis() {
    let harness = TestHarness::new();
    let definition = table(
        "t",
        vec![
            Breakdown::new("concepts", vec![concepts_rule("c", &["Assets", "Liabilities"])]),
            Breakdown::new(
                "periods",
                vec![period_rule("p", vec![instant(2023, 12, 31), instant(2022, 12, 31)])],
            ),
        ],
        Vec::new(),
        Vec::new(),
    );

    let layout = harness.resolve(&definition).unwrap();

    assert_eq!(layout.x.leaf_count, 4);
    assert_eq!(layout.x.groups.len(), 2);
    let spans: Vec<Vec<usize>> = layout
        .x
        .rows()
        .map(|row| row.cells.iter().map(|c| c.span).collect())
        .collect();
    assert_eq!(spans, vec![vec![2, 2], vec![1, 1, 1, 1]]);

    // No y breakdowns: one implicit row.
    assert_eq!(
        grid(&layout, 0),
        vec![vec![
            vec!["100".to_string()],
            vec!["90".to_string()],
            vec!["40".to_string()],
            Vec::new(),
        ]]
    );
}

#[test]
fn test_open_concept_keeps_document_order() {
    let harness = TestHarness::new();
    let definition = table(
        "t",
        vec![Breakdown::new("bx", vec![period_rule("p", vec![instant(2023, 12, 31)])])],
        vec![Breakdown::new("by", vec![DefinitionNode::aspect("concepts", Aspect::Concept)])],
        Vec::new(),
    );

    let layout = harness.resolve(&definition).unwrap();

    assert_eq!(layout.y.leaf_count, 5);
    let names: Vec<Option<String>> = row_texts(&layout, Axis::Y, 0);
    assert_eq!(
        names,
        vec![
            Some("Assets".to_string()),
            Some("Liabilities".to_string()),
            Some("Cash".to_string()),
            Some("Land".to_string()),
            Some(q("EntityName").to_string()),
        ]
    );

    let page = &layout.pages[0];
    assert_eq!(page.rows[0].cells[0].values(), vec!["100"]);
    let text = &page.rows[4].cells[0].facts[0];
    assert_eq!(text.value, "ACME");
    assert_eq!(text.justification, table_engine::Justification::Left);
    assert_eq!(page.rows[0].cells[0].facts[0].justification, table_engine::Justification::Right);
}

#[test]
fn test_table_filters_restrict_open_partitions() {
    let harness = TestHarness::new();
    let mut definition = table(
        "t",
        vec![Breakdown::new("bx", vec![period_rule("p", vec![instant(2023, 12, 31)])])],
        vec![Breakdown::new("by", vec![DefinitionNode::aspect("concepts", Aspect::Concept)])],
        Vec::new(),
    );
    definition.filters = vec![table_engine::FactFilter::Concept(vec![q("Assets"), q("Liabilities")])];

    let layout = harness.resolve(&definition).unwrap();

    assert_eq!(layout.y.leaf_count, 2);
    assert_eq!(
        grid(&layout, 0),
        vec![vec![vec!["100".to_string()]], vec![vec!["40".to_string()]]]
    );
}

// ============================================================================
// RELATIONSHIP NODES
// ============================================================================

#[test]
fn test_descendant_or_self_tree_with_rollup() {
    let harness = TestHarness::new();
    let definition = table(
        "t",
        vec![Breakdown::new("bx", vec![period_rule("p", vec![instant(2023, 12, 31)])])],
        vec![Breakdown::new(
            "by",
            vec![concept_tree("tree", "Assets", RelationshipAxis::DescendantOrSelf)],
        )],
        Vec::new(),
    );

    let layout = harness.resolve(&definition).unwrap();

    assert_eq!(layout.y.leaf_count, 3);
    assert_eq!(row_texts(&layout, Axis::Y, 0), vec![Some("Assets".to_string())]);
    assert_eq!(
        row_texts(&layout, Axis::Y, 1),
        vec![Some("Cash".to_string()), Some("Land".to_string()), None]
    );
    let rollup = &layout.y.rows().nth(1).unwrap().cells[2];
    assert!(rollup.is_rollup);

    // The rollup row stands for Assets itself.
    assert_eq!(
        grid(&layout, 0),
        vec![
            vec![vec!["30".to_string()]],
            vec![vec!["70".to_string()]],
            vec![vec!["100".to_string()]],
        ]
    );
}

#[test]
fn test_dimension_domain_from_root() {
    let harness = TestHarness::new();
    let definition = table(
        "t",
        vec![Breakdown::new("regions", vec![region_tree("regions")])],
        vec![Breakdown::new("by", vec![assets_2023("assets")])],
        Vec::new(),
    );

    let layout = harness.resolve(&definition).unwrap();

    assert_eq!(layout.x.leaf_count, 3);
    assert_eq!(row_texts(&layout, Axis::X, 0), vec![Some("All regions".to_string())]);
    assert_eq!(
        row_texts(&layout, Axis::X, 1),
        vec![Some("North".to_string()), Some("South".to_string()), None]
    );
    assert_eq!(
        grid(&layout, 0),
        vec![vec![
            vec!["60".to_string()],
            vec!["40".to_string()],
            vec!["100".to_string()],
        ]]
    );
}

#[test]
fn test_unknown_relationship_source_fails() {
    let harness = TestHarness::new();
    let definition = table(
        "t",
        Vec::new(),
        vec![Breakdown::new(
            "by",
            vec![concept_tree("tree", "Goodwill", RelationshipAxis::Descendant)],
        )],
        Vec::new(),
    );

    match harness.resolve(&definition) {
        Err(StructuralError::UnresolvableRelationshipSource { node, axis, .. }) => {
            assert_eq!(node, "tree");
            assert_eq!(axis, Axis::Y);
        }
        other => panic!("expected unresolvable source, got {:?}", other),
    }
}

// ============================================================================
// RULE NODES AND PARAMETERS
// ============================================================================

#[test]
fn test_explicit_member_against_default_total() {
    let harness = TestHarness::new();
    let mut north = region_rule("north", "North");
    if let table_engine::NodeKind::Rule(rule) = &mut north.kind {
        rule.constraint_sets[0]
            .rules
            .push(AspectRule::fixed(Aspect::Concept, AspectValue::Concept(q("Assets"))));
    }
    let definition = table(
        "t",
        vec![Breakdown::new("bx", vec![period_rule("p", vec![instant(2023, 12, 31)])])],
        vec![Breakdown::new("by", vec![north, concept_rule("total", "Assets")])],
        Vec::new(),
    );

    let layout = harness.resolve(&definition).unwrap();

    assert_eq!(
        grid(&layout, 0),
        vec![vec![vec!["60".to_string()]], vec![vec!["100".to_string()]]]
    );
}

#[test]
fn test_zero_cardinality_fails_one_instance_only() {
    let harness = TestHarness::new();
    let definition = table(
        "t",
        vec![Breakdown::new("bx", vec![period_rule("p", vec![instant(2023, 12, 31)])])],
        vec![Breakdown::new(
            "by",
            vec![DefinitionNode::rule(
                "dynamic",
                vec![AspectRule {
                    aspect: Aspect::Concept,
                    source: AspectSource::Expression(Expression::new("concepts-for-p")),
                }],
            )],
        )],
        Vec::new(),
    );
    let mut parameters = Scope::new();
    parameters.insert(
        "p".to_string(),
        Value::Sequence(vec![Value::String("a".to_string()), Value::String("b".to_string())]),
    );

    let instances = resolve_table_set(
        &definition,
        &harness.taxonomy,
        &harness.store,
        &ParameterEvaluator,
        &parameters,
        &harness.options,
    );

    assert_eq!(instances.len(), 2);
    assert_eq!(
        instances[0].outcome,
        Err(StructuralError::ZeroCardinality {
            node: "dynamic".to_string(),
            axis: Axis::Y,
        })
    );
    assert!(instances[1].is_ok());
    let layout = instances[1].outcome.as_ref().unwrap();
    assert_eq!(layout.parameters, vec![("p".to_string(), Value::String("b".to_string()))]);
    assert_eq!(grid(layout, 0), vec![vec![vec!["100".to_string()]]]);
}

#[test]
fn test_expression_reads_parameter() {
    let harness = TestHarness::new();
    let definition = table(
        "t",
        vec![Breakdown::new("bx", vec![period_rule("p", vec![instant(2023, 12, 31)])])],
        vec![Breakdown::new(
            "by",
            vec![DefinitionNode::rule(
                "chosen",
                vec![AspectRule {
                    aspect: Aspect::Concept,
                    source: AspectSource::Expression(Expression::new("$concepts")),
                }],
            )],
        )],
        Vec::new(),
    );
    let mut parameters = Scope::new();
    parameters.insert(
        "concepts".to_string(),
        Value::Sequence(vec![Value::QName(q("Cash")), Value::QName(q("Land"))]),
    );

    let layout = harness.resolve_with(&definition, &parameters).unwrap();
    assert_eq!(layout.y.leaf_count, 2);
    assert_eq!(
        grid(&layout, 0),
        vec![vec![vec!["30".to_string()]], vec![vec!["70".to_string()]]]
    );

    // Without the parameter the expression cannot be evaluated.
    assert!(matches!(
        harness.resolve(&definition),
        Err(StructuralError::Evaluation { .. })
    ));
}

#[test]
fn test_invalid_concept_rejected() {
    let harness = TestHarness::new();
    let definition = table(
        "t",
        vec![Breakdown::new("bx", vec![concept_rule("dim", "RegionAxis")])],
        Vec::new(),
        Vec::new(),
    );

    assert!(matches!(
        harness.resolve(&definition),
        Err(StructuralError::InvalidAspectValue { node, .. }) if node == "dim"
    ));
}
