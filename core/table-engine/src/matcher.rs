//! FILENAME: core/table-engine/src/matcher.rs
//! FactMatcher - finds the facts that satisfy an aspect binding.
//!
//! Matching runs in two stages:
//! 1. Pre-filter: every bound explicit dimension (member or default) shrinks the
//!    candidate set through the fact store's dimension-member index.
//! 2. Exact test: each remaining fact is compared aspect by aspect.
//!
//! Dimension-default equivalence applies in both directions: a binding that
//! names a dimension's default member matches facts that omit the dimension,
//! and a fact reporting the default member matches a binding that leaves the
//! dimension unbound.

use xbrl_model::{
    Aspect, AspectValue, DimensionValue, Fact, FactId, FactSet, FactStore, MemberSelector, QName,
    TaxonomyModel,
};

use crate::binding::AspectBinding;
use crate::definition::FactFilter;
use crate::log_debug;
use crate::logging::CAT_MATCH;

pub struct FactMatcher<'a> {
    taxonomy: &'a dyn TaxonomyModel,
    store: &'a dyn FactStore,
    /// Table-level filters, reapplied on every match.
    filters: &'a [FactFilter],
}

impl<'a> FactMatcher<'a> {
    pub fn new(
        taxonomy: &'a dyn TaxonomyModel,
        store: &'a dyn FactStore,
        filters: &'a [FactFilter],
    ) -> Self {
        FactMatcher {
            taxonomy,
            store,
            filters,
        }
    }

    pub fn store(&self) -> &'a dyn FactStore {
        self.store
    }

    /// All facts passing the table-level filters.
    pub fn table_facts(&self) -> FactSet {
        self.apply_filters(self.filters, &self.store.all_facts())
    }

    /// Facts from `candidates` accepted by every filter.
    pub fn apply_filters(&self, filters: &[FactFilter], candidates: &FactSet) -> FactSet {
        if filters.is_empty() {
            return candidates.clone();
        }
        candidates
            .iter()
            .copied()
            .filter(|id| {
                self.store
                    .fact(*id)
                    .map_or(false, |fact| filters.iter().all(|f| f.accepts(fact, self.taxonomy)))
            })
            .collect()
    }

    /// Facts from `candidates` satisfying the complete binding.
    pub fn matching(&self, binding: &AspectBinding, candidates: &FactSet) -> FactSet {
        if binding.has_entry_surrogate() {
            return FactSet::new();
        }

        let mut narrowed = candidates.clone();
        if let Some(concept) = binding.concept() {
            let bucket = self.store.facts_by_concept(concept);
            narrowed = narrowed.intersection(&bucket).copied().collect();
        }
        for (dimension, value) in binding.dimensions() {
            if narrowed.is_empty() {
                break;
            }
            if let Some(bucket) = self.dimension_bucket(dimension, value) {
                narrowed = narrowed.intersection(&bucket).copied().collect();
            }
        }

        let matched: FactSet = narrowed
            .into_iter()
            .filter(|id| self.fact_matches(binding, *id))
            .collect();

        log_debug!(
            CAT_MATCH,
            "{} of {} candidates match {} bound aspects",
            matched.len(),
            candidates.len(),
            binding.len()
        );
        matched
    }

    fn fact_matches(&self, binding: &AspectBinding, id: FactId) -> bool {
        self.store.fact(id).map_or(false, |fact| self.matches(binding, fact))
    }

    /// Exact test of one fact against a complete binding.
    pub fn matches(&self, binding: &AspectBinding, fact: &Fact) -> bool {
        if !self.bound_aspects_match(binding, fact) {
            return false;
        }

        // Dimensions the binding leaves open must be at their default on the fact.
        for (dimension, value) in &fact.dimensions {
            if binding.contains(&Aspect::Dimension(dimension.clone())) {
                continue;
            }
            match value {
                DimensionValue::Explicit(member) => {
                    if self.taxonomy.default_member(dimension) != Some(member) {
                        return false;
                    }
                }
                DimensionValue::Typed(_) => return false,
            }
        }

        self.filters.iter().all(|f| f.accepts(fact, self.taxonomy))
    }

    /// Facts from `candidates` agreeing with the aspects `binding` binds,
    /// ignoring everything it leaves open.
    pub fn filter_bound(&self, binding: &AspectBinding, candidates: &FactSet) -> FactSet {
        if binding.is_empty() {
            return candidates.clone();
        }
        candidates
            .iter()
            .copied()
            .filter(|id| {
                self.store
                    .fact(*id)
                    .map_or(false, |fact| self.bound_aspects_match(binding, fact))
            })
            .collect()
    }

    fn bound_aspects_match(&self, binding: &AspectBinding, fact: &Fact) -> bool {
        binding
            .iter()
            .all(|(aspect, value)| self.value_matches(aspect, value, fact))
    }

    fn value_matches(&self, aspect: &Aspect, bound: &AspectValue, fact: &Fact) -> bool {
        match (aspect, bound) {
            (_, AspectValue::EntrySurrogate(_)) => false,
            (Aspect::Concept, AspectValue::Concept(concept)) => &fact.concept == concept,
            (Aspect::Entity, AspectValue::Entity(entity)) => &fact.entity == entity,
            (Aspect::Period, AspectValue::Period(period)) => &fact.period == period,
            (Aspect::Unit, AspectValue::Unit(unit)) => {
                !fact.is_numeric() || fact.unit.as_ref() == Some(unit)
            }
            (Aspect::Dimension(dimension), value) => {
                let default = self.taxonomy.default_member(dimension);
                match (value, fact.dimensions.get(dimension)) {
                    (AspectValue::Member(m), Some(DimensionValue::Explicit(reported))) => m == reported,
                    (AspectValue::Member(m), None) => default == Some(m),
                    (AspectValue::Typed(v), Some(DimensionValue::Typed(reported))) => v == reported,
                    (AspectValue::DimensionDefault, None) => true,
                    (AspectValue::DimensionDefault, Some(DimensionValue::Explicit(reported))) => {
                        default == Some(reported)
                    }
                    _ => false,
                }
            }
            _ => false,
        }
    }

    /// Candidate bucket for one bound dimension, or `None` when the index
    /// cannot help (typed values).
    fn dimension_bucket(&self, dimension: &QName, value: &AspectValue) -> Option<FactSet> {
        let default = self.taxonomy.default_member(dimension);
        match value {
            AspectValue::Member(member) => {
                let mut bucket = self
                    .store
                    .facts_by_dimension_member(dimension, MemberSelector::Member(member));
                if default == Some(member) {
                    bucket.extend(self.store.facts_by_dimension_member(dimension, MemberSelector::Absent));
                }
                Some(bucket)
            }
            AspectValue::DimensionDefault => {
                let mut bucket = self
                    .store
                    .facts_by_dimension_member(dimension, MemberSelector::Absent);
                if let Some(default) = default {
                    bucket.extend(
                        self.store
                            .facts_by_dimension_member(dimension, MemberSelector::Member(default)),
                    );
                }
                Some(bucket)
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use xbrl_model::{
        EntityIdentifier, FactValue, InMemoryFactStore, InMemoryTaxonomy, Period, Unit,
    };

    fn q(name: &str) -> QName {
        QName::new("http://example.com", name)
    }

    fn instant(y: i32, m: u32, d: u32) -> Period {
        Period::Instant(NaiveDate::from_ymd_opt(y, m, d).unwrap())
    }

    fn create_test_taxonomy() -> InMemoryTaxonomy {
        let mut taxonomy = InMemoryTaxonomy::new();
        taxonomy.set_default_member(q("RegionAxis"), q("AllRegions"));
        taxonomy
    }

    fn create_test_store() -> InMemoryFactStore {
        let entity = EntityIdentifier::new("http://www.sec.gov/CIK", "42");
        let usd = Unit::simple(q("USD"));
        let num = |v: &str| FactValue::Numeric(v.to_string());
        let mut store = InMemoryFactStore::new();
        // 0: no region
        store.add(Fact::new(q("Assets"), entity.clone(), instant(2023, 12, 31), num("100")).with_unit(usd.clone()));
        // 1: North
        store.add(
            Fact::new(q("Assets"), entity.clone(), instant(2023, 12, 31), num("60"))
                .with_unit(usd.clone())
                .with_member(q("RegionAxis"), q("North")),
        );
        // 2: explicitly reported default member
        store.add(
            Fact::new(q("Assets"), entity.clone(), instant(2022, 12, 31), num("90"))
                .with_unit(usd.clone())
                .with_member(q("RegionAxis"), q("AllRegions")),
        );
        // 3: typed dimension
        store.add(
            Fact::new(q("Liabilities"), entity.clone(), instant(2023, 12, 31), num("40"))
                .with_unit(usd)
                .with_typed(q("SeqAxis"), "7"),
        );
        // 4: text fact without unit
        store.add(Fact::new(q("Name"), entity, instant(2023, 12, 31), FactValue::Text("ACME".into())));
        store
    }

    fn ids(set: &FactSet) -> Vec<FactId> {
        set.iter().copied().collect()
    }

    #[test]
    fn test_unbound_dimension_means_default() {
        let taxonomy = create_test_taxonomy();
        let store = create_test_store();
        let matcher = FactMatcher::new(&taxonomy, &store, &[]);
        let binding: AspectBinding = vec![(Aspect::Concept, AspectValue::Concept(q("Assets")))]
            .into_iter()
            .collect();
        assert_eq!(ids(&matcher.matching(&binding, &store.all_facts())), vec![0, 2]);
    }

    #[test]
    fn test_default_member_equivalence() {
        let taxonomy = create_test_taxonomy();
        let store = create_test_store();
        let matcher = FactMatcher::new(&taxonomy, &store, &[]);
        let region = Aspect::Dimension(q("RegionAxis"));

        let mut binding = AspectBinding::new();
        binding.insert(Aspect::Concept, AspectValue::Concept(q("Assets")));
        binding.insert(region.clone(), AspectValue::Member(q("AllRegions")));
        assert_eq!(ids(&matcher.matching(&binding, &store.all_facts())), vec![0, 2]);

        binding.insert(region.clone(), AspectValue::DimensionDefault);
        assert_eq!(ids(&matcher.matching(&binding, &store.all_facts())), vec![0, 2]);

        binding.insert(region, AspectValue::Member(q("North")));
        assert_eq!(ids(&matcher.matching(&binding, &store.all_facts())), vec![1]);
    }

    #[test]
    fn test_typed_dimension_and_unit() {
        let taxonomy = create_test_taxonomy();
        let store = create_test_store();
        let matcher = FactMatcher::new(&taxonomy, &store, &[]);

        let mut binding = AspectBinding::new();
        binding.insert(Aspect::Dimension(q("SeqAxis")), AspectValue::Typed("7".into()));
        binding.insert(Aspect::Unit, AspectValue::Unit(Unit::simple(q("USD"))));
        assert_eq!(ids(&matcher.matching(&binding, &store.all_facts())), vec![3]);

        // Unit is ignored for non-numeric facts.
        let mut text = AspectBinding::new();
        text.insert(Aspect::Concept, AspectValue::Concept(q("Name")));
        text.insert(Aspect::Unit, AspectValue::Unit(Unit::simple(q("EUR"))));
        assert_eq!(ids(&matcher.matching(&text, &store.all_facts())), vec![4]);
    }

    #[test]
    fn test_entry_surrogate_never_matches() {
        let taxonomy = create_test_taxonomy();
        let store = create_test_store();
        let matcher = FactMatcher::new(&taxonomy, &store, &[]);
        let binding: AspectBinding = vec![(Aspect::Period, AspectValue::EntrySurrogate(0))]
            .into_iter()
            .collect();
        assert!(matcher.matching(&binding, &store.all_facts()).is_empty());
        assert!(matcher.filter_bound(&binding, &store.all_facts()).is_empty());
    }

    #[test]
    fn test_table_filters_reapplied() {
        let taxonomy = create_test_taxonomy();
        let store = create_test_store();
        let filters = vec![FactFilter::HasUnit(true)];
        let matcher = FactMatcher::new(&taxonomy, &store, &filters);
        assert_eq!(ids(&matcher.table_facts()), vec![0, 1, 2, 3]);

        let binding: AspectBinding = vec![(Aspect::Concept, AspectValue::Concept(q("Name")))]
            .into_iter()
            .collect();
        assert!(matcher.matching(&binding, &store.all_facts()).is_empty());
    }

    #[test]
    fn test_filter_bound_ignores_open_dimensions() {
        let taxonomy = create_test_taxonomy();
        let store = create_test_store();
        let matcher = FactMatcher::new(&taxonomy, &store, &[]);
        let binding: AspectBinding = vec![(Aspect::Period, AspectValue::Period(instant(2023, 12, 31)))]
            .into_iter()
            .collect();
        assert_eq!(ids(&matcher.filter_bound(&binding, &store.all_facts())), vec![0, 1, 3, 4]);
    }

    #[test]
    fn test_prefilter_agrees_with_exact_test() {
        let taxonomy = create_test_taxonomy();
        let store = create_test_store();
        let matcher = FactMatcher::new(&taxonomy, &store, &[]);
        let all = store.all_facts();

        let concepts = [None, Some("Assets"), Some("Liabilities"), Some("Name")];
        let periods = [None, Some(instant(2023, 12, 31)), Some(instant(2022, 12, 31))];
        let regions = [
            None,
            Some(AspectValue::Member(q("North"))),
            Some(AspectValue::Member(q("AllRegions"))),
            Some(AspectValue::DimensionDefault),
        ];
        for concept in &concepts {
            for period in &periods {
                for region in &regions {
                    let mut binding = AspectBinding::new();
                    if let Some(c) = concept {
                        binding.insert(Aspect::Concept, AspectValue::Concept(q(c)));
                    }
                    if let Some(p) = period {
                        binding.insert(Aspect::Period, AspectValue::Period(p.clone()));
                    }
                    if let Some(r) = region {
                        binding.insert(Aspect::Dimension(q("RegionAxis")), r.clone());
                    }
                    let expected: FactSet = all
                        .iter()
                        .copied()
                        .filter(|id| matcher.matches(&binding, store.fact(*id).unwrap()))
                        .collect();
                    assert_eq!(matcher.matching(&binding, &all), expected, "binding {:?}", binding);
                }
            }
        }
    }
}
