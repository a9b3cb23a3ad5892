//! FILENAME: tests/common/mod.rs
//! Test harness and fixtures for table-engine integration tests.

#![allow(dead_code)]

use chrono::NaiveDate;
use table_engine::{
    resolve_table, AspectRule, AspectSource, Breakdown, DefinitionNode, LayoutTable,
    RelationshipKind, RelationshipNode, Result, TableDefinition, TableOptions,
};
use xbrl_model::{
    Aspect, AspectValue, Concept, EntityIdentifier, Fact, FactValue, InMemoryFactStore,
    InMemoryTaxonomy, LabelTarget, Period, QName, Relationship, RelationshipAxis,
    RelationshipSource, Scope, ScopeEvaluator, Unit, ARCROLE_DIMENSION_DOMAIN,
    ARCROLE_DOMAIN_MEMBER, ARCROLE_PARENT_CHILD, ROLE_GENERIC_LABEL, ROLE_STANDARD_LABEL,
};

pub const NS: &str = "http://example.com/bs";
pub const LINK_ROLE: &str = "http://example.com/role/BalanceSheet";

pub fn q(name: &str) -> QName {
    QName::with_prefix("bs", NS, name)
}

pub fn instant(year: i32, month: u32, day: u32) -> Period {
    Period::Instant(NaiveDate::from_ymd_opt(year, month, day).unwrap())
}

pub fn entity() -> EntityIdentifier {
    EntityIdentifier::new("http://www.sec.gov/CIK", "0000042")
}

pub fn usd() -> Unit {
    Unit::simple(QName::with_prefix("iso4217", "http://www.xbrl.org/2003/iso4217", "USD"))
}

pub fn numeric(concept: &str, period: Period, value: &str) -> Fact {
    Fact::new(q(concept), entity(), period, FactValue::Numeric(value.to_string())).with_unit(usd())
}

// ============================================================================
// DEFINITION BUILDERS
// ============================================================================

/// Rule node repeating once per listed concept.
pub fn concepts_rule(id: &str, names: &[&str]) -> DefinitionNode {
    DefinitionNode::rule(
        id,
        vec![AspectRule {
            aspect: Aspect::Concept,
            source: AspectSource::OneOf(names.iter().map(|n| AspectValue::Concept(q(n))).collect()),
        }],
    )
}

pub fn concept_rule(id: &str, name: &str) -> DefinitionNode {
    DefinitionNode::rule(id, vec![AspectRule::fixed(Aspect::Concept, AspectValue::Concept(q(name)))])
}

pub fn region_rule(id: &str, member: &str) -> DefinitionNode {
    DefinitionNode::rule(
        id,
        vec![AspectRule::fixed(Aspect::Dimension(q("RegionAxis")), AspectValue::Member(q(member)))],
    )
}

pub fn period_rule(id: &str, periods: Vec<Period>) -> DefinitionNode {
    DefinitionNode::rule(
        id,
        vec![AspectRule {
            aspect: Aspect::Period,
            source: AspectSource::OneOf(periods.into_iter().map(AspectValue::Period).collect()),
        }],
    )
}

pub fn concept_tree(id: &str, source: &str, axis: RelationshipAxis) -> DefinitionNode {
    DefinitionNode::relationship(
        id,
        RelationshipNode {
            kind: RelationshipKind::Concept { arcrole: None },
            link_role: Some(LINK_ROLE.to_string()),
            sources: vec![RelationshipSource::Entity(q(source))],
            axis,
            generations: 0,
            variable: None,
        },
    )
}

pub fn region_tree(id: &str) -> DefinitionNode {
    DefinitionNode::relationship(
        id,
        RelationshipNode {
            kind: RelationshipKind::Dimension { dimension: q("RegionAxis") },
            link_role: Some(LINK_ROLE.to_string()),
            sources: vec![RelationshipSource::Root],
            axis: RelationshipAxis::Descendant,
            generations: 0,
            variable: None,
        },
    )
}

pub fn table(id: &str, x: Vec<Breakdown>, y: Vec<Breakdown>, z: Vec<Breakdown>) -> TableDefinition {
    let mut definition = TableDefinition::new(id);
    definition.x = x;
    definition.y = y;
    definition.z = z;
    definition
}

// ============================================================================
// FIXTURES
// ============================================================================

/// A small balance sheet: concepts, a region dimension, labels and facts.
pub struct BalanceSheetFixture;

impl BalanceSheetFixture {
    pub fn taxonomy() -> InMemoryTaxonomy {
        let mut taxonomy = InMemoryTaxonomy::new();
        for name in ["Assets", "Liabilities", "Cash", "Land"] {
            taxonomy.add_concept(Concept::item(q(name)));
        }
        for name in ["BalanceSheetAbstract", "AllRegions", "North", "South"] {
            taxonomy.add_concept(Concept::abstract_item(q(name)));
        }
        taxonomy.add_concept(Concept {
            is_numeric: false,
            ..Concept::item(q("EntityName"))
        });
        taxonomy
            .add_concept(Concept::explicit_dimension(q("RegionAxis")))
            .set_default_member(q("RegionAxis"), q("AllRegions"));

        for (from, to) in [
            ("BalanceSheetAbstract", "Assets"),
            ("BalanceSheetAbstract", "Liabilities"),
            ("Assets", "Cash"),
            ("Assets", "Land"),
        ] {
            taxonomy.add_relationship(ARCROLE_PARENT_CHILD, LINK_ROLE, Relationship::new(q(from), q(to)));
        }
        taxonomy
            .add_relationship(
                ARCROLE_DIMENSION_DOMAIN,
                LINK_ROLE,
                Relationship::new(q("RegionAxis"), q("AllRegions")),
            )
            .add_relationship(ARCROLE_DOMAIN_MEMBER, LINK_ROLE, Relationship::new(q("AllRegions"), q("North")))
            .add_relationship(ARCROLE_DOMAIN_MEMBER, LINK_ROLE, Relationship::new(q("AllRegions"), q("South")));

        for (name, text) in [
            ("Assets", "Assets"),
            ("Liabilities", "Liabilities"),
            ("Cash", "Cash"),
            ("Land", "Land"),
            ("AllRegions", "All regions"),
            ("North", "North"),
            ("South", "South"),
        ] {
            taxonomy.add_label(LabelTarget::Concept(q(name)), ROLE_STANDARD_LABEL, "en", text);
        }
        taxonomy.add_label(
            LabelTarget::Resource("balance".to_string()),
            ROLE_GENERIC_LABEL,
            "en",
            "Balance sheet",
        );
        taxonomy
    }

    /// Facts, in document order:
    /// 0 Assets 2023 = 100, 1 Liabilities 2023 = 40, 2 Assets 2022 = 90,
    /// 3 Cash 2023 = 30, 4 Land 2023 = 70, 5 Assets North 2023 = 60,
    /// 6 Assets South 2023 = 40, 7 EntityName 2023 = "ACME".
    pub fn store() -> InMemoryFactStore {
        let mut store = InMemoryFactStore::new();
        let y2023 = instant(2023, 12, 31);
        let y2022 = instant(2022, 12, 31);
        store.add(numeric("Assets", y2023.clone(), "100"));
        store.add(numeric("Liabilities", y2023.clone(), "40"));
        store.add(numeric("Assets", y2022, "90"));
        store.add(numeric("Cash", y2023.clone(), "30"));
        store.add(numeric("Land", y2023.clone(), "70"));
        store.add(numeric("Assets", y2023.clone(), "60").with_member(q("RegionAxis"), q("North")));
        store.add(numeric("Assets", y2023.clone(), "40").with_member(q("RegionAxis"), q("South")));
        store.add(Fact::new(q("EntityName"), entity(), y2023, FactValue::Text("ACME".to_string())));
        store
    }

    /// Only the two facts of the two-concept scenario.
    pub fn scenario_store() -> InMemoryFactStore {
        let mut store = InMemoryFactStore::new();
        store.add(numeric("Assets", instant(2023, 12, 31), "100"));
        store.add(numeric("Liabilities", instant(2023, 12, 31), "40"));
        store
    }
}

// ============================================================================
// HARNESS
// ============================================================================

pub struct TestHarness {
    pub taxonomy: InMemoryTaxonomy,
    pub store: InMemoryFactStore,
    pub evaluator: ScopeEvaluator,
    pub options: TableOptions,
}

impl TestHarness {
    /// Harness over the balance-sheet fixture.
    pub fn new() -> Self {
        TestHarness {
            taxonomy: BalanceSheetFixture::taxonomy(),
            store: BalanceSheetFixture::store(),
            evaluator: ScopeEvaluator::new(),
            options: TableOptions::default(),
        }
    }

    pub fn with_store(store: InMemoryFactStore) -> Self {
        TestHarness {
            store,
            ..TestHarness::new()
        }
    }

    pub fn resolve(&self, definition: &TableDefinition) -> Result<LayoutTable> {
        self.resolve_with(definition, &Scope::new())
    }

    pub fn resolve_with(&self, definition: &TableDefinition, parameters: &Scope) -> Result<LayoutTable> {
        resolve_table(
            definition,
            &self.taxonomy,
            &self.store,
            &self.evaluator,
            parameters,
            &self.options,
        )
    }
}

/// Values of every body cell of a page, row by row.
pub fn grid(table: &LayoutTable, page: usize) -> Vec<Vec<Vec<String>>> {
    table.pages[page]
        .rows
        .iter()
        .map(|row| {
            row.cells
                .iter()
                .map(|cell| cell.facts.iter().map(|f| f.value.clone()).collect())
                .collect()
        })
        .collect()
}

/// Main label texts of one header row.
pub fn row_texts(table: &LayoutTable, axis: table_engine::Axis, row: usize) -> Vec<Option<String>> {
    table
        .headers(axis)
        .rows()
        .nth(row)
        .map(|r| r.cells.iter().map(|c| c.text().map(str::to_string)).collect())
        .unwrap_or_default()
}
