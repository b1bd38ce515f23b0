//! Change detection: compare a declared schema against the live one.

use std::collections::HashSet;

use serde::Serialize;

use quadmap_core::{PredicateDescriptor, Schema, TypeDescriptor};

/// Declared predicates that need to be (re)applied.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PredicateDiff {
    /// Declared but absent from the live schema.
    pub missing: Vec<PredicateDescriptor>,
    /// Present live with a different definition.
    pub changed: Vec<PredicateDescriptor>,
}

/// How a declared type relates to the live schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TypeStatus {
    Missing,
    Changed,
    Unchanged,
}

/// The outcome of reconciling two schemas.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SchemaDiff {
    pub predicates: PredicateDiff,
    /// Every declared type with its status.
    pub types: Vec<(TypeDescriptor, TypeStatus)>,
    /// Live types matching declared names, for merging field lists.
    pub live_types: Vec<TypeDescriptor>,
    /// Live predicates the declared schema does not mention.
    pub unlisted: Vec<String>,
    pub summary: DiffSummary,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DiffSummary {
    pub declared_predicates: usize,
    pub missing_predicates: usize,
    pub changed_predicates: usize,
    pub declared_types: usize,
    pub missing_types: usize,
    pub changed_types: usize,
}

impl SchemaDiff {
    /// Nothing to apply.
    pub fn is_clean(&self) -> bool {
        self.predicates.missing.is_empty()
            && self.predicates.changed.is_empty()
            && self
                .types
                .iter()
                .all(|(_, status)| *status == TypeStatus::Unchanged)
    }
}

/// Partition declared predicates into missing and changed.
pub fn reconcile_predicates(
    declared: &[PredicateDescriptor],
    live: &[PredicateDescriptor],
) -> PredicateDiff {
    let mut diff = PredicateDiff::default();
    for want in declared {
        match live.iter().find(|have| have.name == want.name) {
            None => diff.missing.push(want.clone()),
            Some(have) if !same_definition(want, have) => diff.changed.push(want.clone()),
            Some(_) => {}
        }
    }
    diff
}

/// Structural equality; tokenizers compare as sets.
pub fn same_definition(a: &PredicateDescriptor, b: &PredicateDescriptor) -> bool {
    let tokens = |p: &PredicateDescriptor| -> HashSet<String> { p.tokenizers.iter().cloned().collect() };
    a.kind == b.kind
        && a.list == b.list
        && a.lang == b.lang
        && a.index == b.index
        && a.reverse == b.reverse
        && a.count == b.count
        && a.upsert == b.upsert
        && tokens(a) == tokens(b)
}

/// Unchanged when every declared field already exists on the live type.
///
/// Fields added to the live type elsewhere do not count as a change; an
/// absent live type is `Missing`, never an empty match.
pub fn compare_type(declared: &TypeDescriptor, live: &[TypeDescriptor]) -> TypeStatus {
    let Some(have) = live.iter().find(|t| t.name == declared.name) else {
        return TypeStatus::Missing;
    };
    let live_fields: HashSet<&str> = have.fields.iter().map(String::as_str).collect();
    if declared
        .fields
        .iter()
        .all(|f| live_fields.contains(f.as_str()))
    {
        TypeStatus::Unchanged
    } else {
        TypeStatus::Changed
    }
}

/// Reconcile predicates and types of `declared` against `live`.
pub fn reconcile(declared: &Schema, live: &Schema) -> SchemaDiff {
    let predicates = reconcile_predicates(&declared.predicates, &live.predicates);
    let types: Vec<(TypeDescriptor, TypeStatus)> = declared
        .types
        .iter()
        .map(|t| (t.clone(), compare_type(t, &live.types)))
        .collect();
    let live_types = live
        .types
        .iter()
        .filter(|t| declared.type_named(&t.name).is_some())
        .cloned()
        .collect();
    let unlisted = live
        .predicates
        .iter()
        .filter(|p| declared.predicate(&p.name).is_none())
        .map(|p| p.name.clone())
        .collect();

    let summary = DiffSummary {
        declared_predicates: declared.predicates.len(),
        missing_predicates: predicates.missing.len(),
        changed_predicates: predicates.changed.len(),
        declared_types: types.len(),
        missing_types: types.iter().filter(|(_, s)| *s == TypeStatus::Missing).count(),
        changed_types: types.iter().filter(|(_, s)| *s == TypeStatus::Changed).count(),
    };
    tracing::debug!(?summary, "Reconciled schema");

    SchemaDiff {
        predicates,
        types,
        live_types,
        unlisted,
        summary,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quadmap_core::ScalarKind;

    fn age() -> PredicateDescriptor {
        PredicateDescriptor::new("age", ScalarKind::Int)
    }

    #[test]
    fn test_index_change_is_detected() {
        let declared = vec![age().with_index(["int"])];
        let live = vec![age()];
        let diff = reconcile_predicates(&declared, &live);
        assert!(diff.missing.is_empty());
        assert_eq!(diff.changed.len(), 1);
        assert_eq!(diff.changed[0].name, "age");
    }

    #[test]
    fn test_tokenizer_order_is_ignored() {
        let a = PredicateDescriptor::new("name", ScalarKind::String).with_index(["term", "exact"]);
        let b = PredicateDescriptor::new("name", ScalarKind::String).with_index(["exact", "term"]);
        assert!(same_definition(&a, &b));
    }

    #[test]
    fn test_each_flag_matters() {
        let base = PredicateDescriptor::new("friend", ScalarKind::Uid);
        assert!(!same_definition(&base, &base.clone().list()));
        assert!(!same_definition(&base, &base.clone().with_reverse()));
        assert!(!same_definition(&base, &base.clone().with_count()));
        assert!(!same_definition(&base, &base.clone().with_upsert()));
        assert!(!same_definition(&base, &base.clone().with_lang(None)));
        let mut other_kind = base.clone();
        other_kind.kind = ScalarKind::String;
        assert!(!same_definition(&base, &other_kind));
    }

    #[test]
    fn test_missing_predicate() {
        let diff = reconcile_predicates(&[age()], &[]);
        assert_eq!(diff.missing, vec![age()]);
    }

    #[test]
    fn test_type_subset_is_unchanged() {
        let declared = TypeDescriptor::new("Person", vec!["name".into()]);
        let live = vec![TypeDescriptor::new(
            "Person",
            vec!["age".into(), "name".into()],
        )];
        assert_eq!(compare_type(&declared, &live), TypeStatus::Unchanged);

        let wider = TypeDescriptor::new("Person", vec!["name".into(), "email".into()]);
        assert_eq!(compare_type(&wider, &live), TypeStatus::Changed);
    }

    #[test]
    fn test_absent_type_is_missing_even_without_fields() {
        let empty = TypeDescriptor::new("Ghost", vec![]);
        assert_eq!(compare_type(&empty, &[]), TypeStatus::Missing);
    }

    #[test]
    fn test_reconcile_is_reflexive() {
        let schema = Schema {
            predicates: vec![
                age().with_index(["int"]),
                PredicateDescriptor::new("friend", ScalarKind::Uid)
                    .list()
                    .with_reverse(),
            ],
            types: vec![TypeDescriptor::new(
                "Person",
                vec!["age".into(), "friend".into()],
            )],
        };
        let diff = reconcile(&schema, &schema);
        assert!(diff.predicates.missing.is_empty());
        assert!(diff.predicates.changed.is_empty());
        assert!(diff.unlisted.is_empty());
        assert!(diff.is_clean());
    }
}
