//! Field descriptor resolution.
//!
//! Turns a record's static [`RecordShape`] into predicate descriptors once
//! per record type. Results are cached by type identity and never change
//! after publication.

use std::any::TypeId;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use quadmap_core::types::TYPE_PREDICATE;
use quadmap_core::{
    FieldDecl, FieldType, MapperError, PredicateDescriptor, PredicateRole, Record, RecordShape,
    Result, ScalarKind, Schema, ShapeRef, TypeDescriptor,
};

/// Descriptors of one record type, split by role.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResolvedType {
    pub type_names: Vec<String>,
    /// Predicates the record writes, in declaration order.
    pub predicates: Vec<PredicateDescriptor>,
    /// Edge properties of some sibling predicate.
    pub facets: Vec<PredicateDescriptor>,
    /// Inbound edges listed in the type but never written.
    pub reverse: Vec<PredicateDescriptor>,
    type_fields: Vec<String>,
}

impl ResolvedType {
    /// Every descriptor regardless of role.
    pub fn descriptors(&self) -> impl Iterator<Item = &PredicateDescriptor> {
        self.predicates
            .iter()
            .chain(self.facets.iter())
            .chain(self.reverse.iter())
    }

    pub fn predicate(&self, name: &str) -> Option<&PredicateDescriptor> {
        self.predicates.iter().find(|p| p.name == name)
    }

    /// Facet descriptors attached to edges of predicate `owner`.
    pub fn facets_for<'a>(
        &'a self,
        owner: &'a str,
    ) -> impl Iterator<Item = &'a PredicateDescriptor> + 'a {
        self.facets.iter().filter(move |f| f.name == owner)
    }

    /// Deduplicated field names shared by every declared type.
    pub fn type_fields(&self) -> &[String] {
        &self.type_fields
    }

    pub fn type_descriptors(&self) -> Vec<TypeDescriptor> {
        self.type_names
            .iter()
            .map(|name| TypeDescriptor::new(name.clone(), self.type_fields.clone()))
            .collect()
    }

    /// Predicates and types to declare in the store for this record type.
    ///
    /// Language variants of one predicate collapse into a single definition.
    pub fn schema(&self) -> Schema {
        let mut predicates: Vec<PredicateDescriptor> = Vec::new();
        for p in &self.predicates {
            if let Some(seen) = predicates.iter_mut().find(|seen| seen.name == p.name) {
                seen.lang |= p.lang;
                continue;
            }
            let mut declared = p.clone();
            declared.lang_variant = None;
            declared.field_path.clear();
            predicates.push(declared);
        }
        Schema {
            predicates,
            types: self.type_descriptors(),
        }
    }
}

/// Resolve the descriptors of a record shape.
pub fn resolve(shape: &RecordShape) -> Result<ResolvedType> {
    let mut type_names: Vec<String> = Vec::with_capacity(shape.type_names.len());
    for name in &shape.type_names {
        if !type_names.contains(name) {
            type_names.push(name.clone());
        }
    }
    let mut out = ResolvedType {
        type_names,
        ..Default::default()
    };
    let mut embedding = Vec::new();
    resolve_fields(&shape.fields, &[], &mut embedding, &mut out)?;

    let mut type_fields: Vec<String> = Vec::new();
    for name in out
        .predicates
        .iter()
        .chain(out.reverse.iter())
        .map(|p| &p.name)
    {
        if !type_fields.contains(name) {
            type_fields.push(name.clone());
        }
    }
    out.type_fields = type_fields;
    Ok(out)
}

fn resolve_fields(
    fields: &[FieldDecl],
    prefix: &[String],
    embedding: &mut Vec<TypeId>,
    out: &mut ResolvedType,
) -> Result<()> {
    for field in fields {
        let mut path = prefix.to_vec();
        path.push(field.name.clone());

        if let FieldType::Embedded(inner) = &field.ty {
            if embedding.contains(&inner.id()) {
                return Err(MapperError::schema_mismatch(
                    &field.name,
                    format!("{} embeds itself", inner.name()),
                ));
            }
            embedding.push(inner.id());
            resolve_fields(&inner.build().fields, &path, embedding, out)?;
            embedding.pop();
            continue;
        }

        if let Some(desc) = resolve_field(field, path)? {
            push_descriptor(desc, &field.name, out)?;
        }
    }
    Ok(())
}

/// Resolve one annotated field.
///
/// Returns `None` for untagged fields and the identity/type fields.
pub fn resolve_field(field: &FieldDecl, path: Vec<String>) -> Result<Option<PredicateDescriptor>> {
    let Some(tag) = field.tag.as_deref().map(str::trim) else {
        return Ok(None);
    };
    if tag.is_empty() || tag == "-" || tag == "uid" || tag == TYPE_PREDICATE {
        return Ok(None);
    }

    if let Some((owner, facet)) = tag.split_once('|') {
        if owner.is_empty() || facet.is_empty() {
            return Err(MapperError::schema_mismatch(
                &field.name,
                format!("malformed facet annotation {tag:?}"),
            ));
        }
        let kind = field.ty.scalar_kind().unwrap_or(ScalarKind::Default);
        let mut desc = PredicateDescriptor::new(owner, kind).with_field_path(path);
        desc.list = field.sequence;
        desc.role = PredicateRole::FacetOf {
            facet: facet.to_string(),
        };
        return Ok(Some(desc));
    }

    let (name, lang) = match tag.split_once('@') {
        Some((name, lang)) => (name, Some(lang)),
        None => (tag, None),
    };
    if name.is_empty() || name == "~" {
        return Err(MapperError::schema_mismatch(
            &field.name,
            format!("empty predicate name in {tag:?}"),
        ));
    }

    if name.starts_with('~') {
        let mut desc = PredicateDescriptor::new(name, ScalarKind::Uid).with_field_path(path);
        desc.list = field.sequence;
        desc.role = PredicateRole::Reverse;
        return Ok(Some(desc));
    }

    let kind = field.ty.scalar_kind().ok_or_else(|| {
        MapperError::schema_mismatch(
            &field.name,
            format!("predicate {name} has no resolvable scalar kind ({:?})", field.ty),
        )
    })?;

    let mut desc = PredicateDescriptor::new(name, kind).with_field_path(path);
    desc.list = field.sequence;

    if let Some(lang) = lang {
        if !matches!(kind, ScalarKind::String | ScalarKind::Default) {
            return Err(MapperError::schema_mismatch(
                &field.name,
                format!("language variant on {kind} predicate {name}"),
            ));
        }
        desc = desc.with_lang((!lang.is_empty()).then(|| lang.to_string()));
    }
    if let Some(tokens) = &field.tokenizers {
        desc = desc.with_index(tokens.iter().cloned());
    }
    if field.count {
        desc = desc.with_count();
    }
    if field.upsert {
        desc = desc.with_upsert();
    }
    if field.reverse_edge {
        if kind != ScalarKind::Uid {
            return Err(MapperError::schema_mismatch(
                &field.name,
                format!("@reverse requires a uid predicate, {name} is {kind}"),
            ));
        }
        desc = desc.with_reverse();
    }
    Ok(Some(desc))
}

fn push_descriptor(desc: PredicateDescriptor, field: &str, out: &mut ResolvedType) -> Result<()> {
    match desc.role {
        PredicateRole::FacetOf { .. } => out.facets.push(desc),
        PredicateRole::Reverse => out.reverse.push(desc),
        PredicateRole::Ordinary => {
            if let Some(prev) = out.predicates.iter().find(|p| p.name == desc.name) {
                if prev.kind != desc.kind || prev.list != desc.list {
                    return Err(MapperError::schema_mismatch(
                        field,
                        format!(
                            "predicate {} declared as {} and {}",
                            desc.name,
                            prev.kind,
                            desc.kind
                        ),
                    ));
                }
                if prev.lang_variant == desc.lang_variant {
                    return Err(MapperError::schema_mismatch(
                        field,
                        format!("predicate {} declared twice", desc.name),
                    ));
                }
            }
            out.predicates.push(desc);
        }
    }
    Ok(())
}

// ── Cache ────────────────────────────────────────────────────────

/// Per-process cache of resolved record types.
///
/// Each entry is published once; concurrent readers never observe a
/// partially resolved type.
#[derive(Debug, Default)]
pub struct DescriptorCache {
    entries: RwLock<HashMap<TypeId, Arc<ResolvedType>>>,
}

impl DescriptorCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolved descriptors for `shape`, resolving on first use.
    pub fn get(&self, shape: ShapeRef) -> Result<Arc<ResolvedType>> {
        if let Some(hit) = self
            .entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&shape.id())
        {
            return Ok(Arc::clone(hit));
        }

        let resolved = Arc::new(resolve(&shape.build())?);
        tracing::debug!(
            record = shape.name(),
            predicates = resolved.predicates.len(),
            facets = resolved.facets.len(),
            "Resolved record descriptors"
        );

        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        Ok(Arc::clone(entries.entry(shape.id()).or_insert(resolved)))
    }

    pub fn of<R: Record + 'static>(&self) -> Result<Arc<ResolvedType>> {
        self.get(ShapeRef::of::<R>())
    }

    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quadmap_core::NodeView;

    struct Audit;

    impl Record for Audit {
        fn shape() -> RecordShape {
            RecordShape::new(["Audit"])
                .field(FieldDecl::tagged("Created", "created", FieldType::DateTime))
                .field(FieldDecl::tagged("Owner", "owner", FieldType::String))
        }
        fn node_id(&self) -> &str {
            ""
        }
        fn set_node_id(&mut self, _: String) {}
        fn view(&self) -> NodeView {
            NodeView::of::<Self>("")
        }
    }

    fn person_shape() -> RecordShape {
        RecordShape::new(["Person"])
            .field(FieldDecl::tagged("Uid", "uid", FieldType::String))
            .field(FieldDecl::tagged("DType", "dgraph.type", FieldType::String).sequence())
            .field(FieldDecl::tagged("Name", "name", FieldType::String).with_index(["term", "exact"]))
            .field(FieldDecl::tagged("NameEn", "name@en", FieldType::String))
            .field(FieldDecl::tagged("Age", "age", FieldType::Int))
            .field(FieldDecl::tagged("Tags", "tags", FieldType::String).sequence())
            .field(
                FieldDecl::tagged("Friends", "friend", FieldType::Node)
                    .sequence()
                    .with_reverse_edge()
                    .with_count(),
            )
            .field(FieldDecl::tagged("Since", "friend|since", FieldType::DateTime))
            .field(FieldDecl::tagged("Followers", "~follows", FieldType::Node).sequence())
            .field(FieldDecl::new("cache", FieldType::Opaque("Mutex".into())))
            .field(FieldDecl::new("Audit", FieldType::Embedded(ShapeRef::of::<Audit>())))
    }

    #[test]
    fn classifies_fields_by_annotation() {
        let r = resolve(&person_shape()).unwrap();
        let names: Vec<_> = r.predicates.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(
            names,
            vec!["name", "name", "age", "tags", "friend", "created", "owner"]
        );

        let name_en = &r.predicates[1];
        assert!(name_en.lang);
        assert_eq!(name_en.lang_variant.as_deref(), Some("en"));

        let friend = r.predicate("friend").unwrap();
        assert_eq!(friend.kind, ScalarKind::Uid);
        assert!(friend.list && friend.reverse && friend.count);

        assert_eq!(r.facets.len(), 1);
        assert_eq!(r.facets[0].name, "friend");
        assert_eq!(r.facets[0].facet_name(), Some("since"));

        assert_eq!(r.reverse.len(), 1);
        assert!(r.reverse[0].is_reverse_marker());
    }

    #[test]
    fn embedded_fields_are_flattened_with_paths() {
        let r = resolve(&person_shape()).unwrap();
        let created = r.predicate("created").unwrap();
        assert_eq!(created.field_path, vec!["Audit", "Created"]);
    }

    #[test]
    fn type_fields_are_deduplicated_and_include_reverse() {
        let r = resolve(&person_shape()).unwrap();
        assert_eq!(
            r.type_fields(),
            ["name", "age", "tags", "friend", "created", "owner", "~follows"]
        );
        let types = r.type_descriptors();
        assert_eq!(types.len(), 1);
        assert_eq!(types[0].name, "Person");
    }

    #[test]
    fn repeated_type_names_collapse() {
        let shape = RecordShape::new(["Person", "Agent", "Person"])
            .field(FieldDecl::tagged("Name", "name", FieldType::String));
        assert_eq!(resolve(&shape).unwrap().type_names, ["Person", "Agent"]);
    }

    #[test]
    fn schema_collapses_language_variants() {
        let schema = resolve(&person_shape()).unwrap().schema();
        let names: Vec<_> = schema.predicates.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["name", "age", "tags", "friend", "created", "owner"]);
        assert!(schema.rdf().contains("name: string @index(term,exact) @lang ."));
        assert!(schema.rdf().contains("friend: [uid] @reverse @count ."));
        assert!(schema.rdf().contains("\t<~follows>"));
    }

    #[test]
    fn opaque_predicate_is_schema_mismatch() {
        let shape = RecordShape::new(["Bad"])
            .field(FieldDecl::tagged("Lock", "lock", FieldType::Opaque("Mutex".into())));
        assert!(matches!(
            resolve(&shape),
            Err(MapperError::SchemaMismatch { field, .. }) if field == "Lock"
        ));
    }

    #[test]
    fn conflicting_kinds_are_schema_mismatch() {
        let shape = RecordShape::new(["Bad"])
            .field(FieldDecl::tagged("A", "value", FieldType::Int))
            .field(FieldDecl::tagged("B", "value", FieldType::String));
        assert!(matches!(
            resolve(&shape),
            Err(MapperError::SchemaMismatch { .. })
        ));
    }

    #[test]
    fn malformed_facet_is_schema_mismatch() {
        let shape =
            RecordShape::new(["Bad"]).field(FieldDecl::tagged("F", "friend|", FieldType::Int));
        assert!(resolve(&shape).is_err());
    }

    #[test]
    fn reverse_edge_on_scalar_is_rejected() {
        let shape = RecordShape::new(["Bad"])
            .field(FieldDecl::tagged("N", "name", FieldType::String).with_reverse_edge());
        assert!(resolve(&shape).is_err());
    }

    #[test]
    fn cache_resolves_once_per_type() {
        let cache = DescriptorCache::new();
        let a = cache.of::<Audit>().unwrap();
        let b = cache.of::<Audit>().unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn cache_is_shareable_across_threads() {
        let cache = Arc::new(DescriptorCache::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let cache = Arc::clone(&cache);
                std::thread::spawn(move || cache.of::<Audit>().unwrap())
            })
            .collect();
        let resolved: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert!(resolved.windows(2).all(|w| Arc::ptr_eq(&w[0], &w[1])));
    }
}
