//! Read operations and the query filter builder.
//!
//! Filters are derived structurally from record views: populated scalar
//! fields become `eq(..)` clauses, edges become `uid_in(..)` plus optional
//! facet and nested-attribute filters. Building a filter never fails.

use std::sync::Arc;

use serde::de::DeserializeOwned;

use quadmap_core::{
    FieldValue, NodeView, PredicateDescriptor, ScalarKind, Schema, TypeDescriptor, Value,
};
use quadmap_encode::{DescriptorCache, ResolvedType};

use crate::client::{GraphClient, GraphDriver, Result};

// ── Filters ──────────────────────────────────────────────────────

/// Filter fragments derived from one field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Filter {
    /// `eq(name,..)` or `uid_in(name,..)`.
    pub main: String,
    /// `@facets(..)` for the edge.
    pub facet: String,
    /// AND of the nested node's plain attribute filters.
    pub sub: String,
}

impl Filter {
    pub fn is_empty(&self) -> bool {
        self.main.is_empty() && self.facet.is_empty() && self.sub.is_empty()
    }
}

/// Filters of a whole record.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordFilter {
    /// AND of every non-empty main filter.
    pub main: String,
    /// Edge predicates with facet or nested-attribute filters.
    pub edges: Vec<(String, Filter)>,
}

impl RecordFilter {
    /// `@filter(..)` clause, empty when there is nothing to filter on.
    pub fn clause(&self) -> String {
        if self.main.is_empty() {
            String::new()
        } else {
            format!("@filter({})", self.main)
        }
    }
}

/// Derives query filters from record views.
#[derive(Debug, Clone, Default)]
pub struct FilterBuilder {
    cache: Arc<DescriptorCache>,
}

impl FilterBuilder {
    pub fn new(cache: Arc<DescriptorCache>) -> Self {
        Self { cache }
    }

    /// Filter for one field value. Absent, cleared and zero values yield
    /// an empty filter.
    pub fn build_filter(&self, desc: &PredicateDescriptor, value: &FieldValue) -> Filter {
        let FieldValue::Set(value) = value else {
            return Filter::default();
        };
        if desc.kind == ScalarKind::Uid {
            return self.edge_filter(desc, value);
        }

        let literals: Vec<String> = match value {
            Value::List(items) => items.iter().filter_map(|v| literal(desc.kind, v)).collect(),
            single => literal(desc.kind, single).into_iter().collect(),
        };
        let name = predicate_ref(desc);
        let main = match literals.as_slice() {
            [] => String::new(),
            [one] => format!("eq({name},{one})"),
            many => format!("eq({name},[{}])", many.join(",")),
        };
        Filter {
            main,
            ..Default::default()
        }
    }

    /// Fold the filters of every mapped field of `view`.
    pub fn build_filters(&self, resolved: &ResolvedType, view: &NodeView) -> RecordFilter {
        let mut mains = Vec::new();
        let mut edges = Vec::new();
        for desc in &resolved.predicates {
            let filter = self.build_filter(desc, view.lookup(&desc.field_path));
            if !filter.main.is_empty() {
                mains.push(filter.main.clone());
            }
            if !filter.facet.is_empty() || !filter.sub.is_empty() {
                edges.push((desc.name.clone(), filter));
            }
        }
        RecordFilter {
            main: mains.join(" AND "),
            edges,
        }
    }

    /// Single-candidate edge filter: only the first node of a list is used.
    fn edge_filter(&self, desc: &PredicateDescriptor, value: &Value) -> Filter {
        let candidate = match value {
            Value::List(items) => items.first(),
            single => Some(single),
        };
        let Some(Value::Node(node)) = candidate else {
            return Filter::default();
        };

        let main = if node.id.is_empty() {
            String::new()
        } else {
            format!("uid_in({},{})", desc.name, node.id)
        };

        let nested = match self.cache.get(node.shape) {
            Ok(r) => r,
            Err(e) => {
                tracing::warn!(predicate = %desc.name, error = %e, "Nested record unresolvable, filtering on uid only");
                return Filter {
                    main,
                    ..Default::default()
                };
            }
        };

        let facets: Vec<String> = nested
            .facets_for(&desc.name)
            .filter_map(|f| {
                let key = f.facet_name()?;
                let v = node.lookup(&f.field_path).value()?;
                Some(format!("eq({key},{})", facet_literal(v)?))
            })
            .collect();
        let facet = if facets.is_empty() {
            String::new()
        } else {
            format!("@facets({})", facets.join(" AND "))
        };

        let sub: Vec<String> = nested
            .predicates
            .iter()
            .filter(|p| p.kind != ScalarKind::Uid)
            .map(|p| self.build_filter(p, node.lookup(&p.field_path)).main)
            .filter(|m| !m.is_empty())
            .collect();

        Filter {
            main,
            facet,
            sub: sub.join(" AND "),
        }
    }
}

fn predicate_ref(desc: &PredicateDescriptor) -> String {
    match &desc.lang_variant {
        Some(lang) => format!("{}@{lang}", desc.name),
        None => desc.name.clone(),
    }
}

fn quote(s: &str) -> String {
    format!("\"{}\"", s.replace('\\', "\\\\").replace('"', "\\\""))
}

/// Literal of `value` for a predicate of `kind`; `None` for zero values
/// and kinds that cannot be compared by equality.
fn literal(kind: ScalarKind, value: &Value) -> Option<String> {
    if value.is_zero() {
        return None;
    }
    match (kind, value) {
        (ScalarKind::String, Value::Str(s)) => Some(quote(s)),
        (ScalarKind::Int, Value::Int(i)) => Some(i.to_string()),
        (ScalarKind::Int, Value::UInt(u)) => Some(u.to_string()),
        (ScalarKind::Float, Value::Float(f)) => Some(format!("{f:.6}")),
        (ScalarKind::Bool, Value::Bool(b)) => Some(b.to_string()),
        (ScalarKind::DateTime, Value::DateTime(dt)) => Some(quote(&dt.to_rfc3339())),
        // geo, password, default and mismatched values
        _ => None,
    }
}

fn facet_literal(value: &Value) -> Option<String> {
    if value.is_zero() {
        return None;
    }
    match value {
        Value::Str(s) => Some(quote(s)),
        Value::Int(i) => Some(i.to_string()),
        Value::UInt(u) => Some(u.to_string()),
        Value::Float(f) => Some(format!("{f:.6}")),
        Value::Bool(b) => Some(b.to_string()),
        Value::DateTime(dt) => Some(quote(&dt.to_rfc3339())),
        Value::Geo(_) | Value::Node(_) | Value::List(_) => None,
    }
}

// ── Introspection ────────────────────────────────────────────────

pub fn schema_query() -> &'static str {
    "schema{}"
}

pub fn predicate_query(name: &str) -> String {
    format!("schema(pred: {name}){{}}")
}

pub fn type_query(name: &str) -> String {
    format!("schema(type: {name}){{}}")
}

impl<D: GraphDriver> GraphClient<D> {
    /// Run a read query and decode its JSON response.
    pub async fn query_json<T: DeserializeOwned>(&self, query: &str) -> Result<T> {
        let bytes = self.driver().execute_query(query).await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// Live schema without store-internal predicates and types.
    pub async fn fetch_schema(&self) -> Result<Schema> {
        let schema: Schema = self.query_json(schema_query()).await?;
        let schema = schema.without_prefix(self.system_prefix());
        tracing::debug!(
            predicates = schema.predicates.len(),
            types = schema.types.len(),
            "Fetched live schema"
        );
        Ok(schema)
    }

    pub async fn find_predicate(&self, name: &str) -> Result<Option<PredicateDescriptor>> {
        let schema: Schema = self.query_json(&predicate_query(name)).await?;
        Ok(schema.predicates.into_iter().next())
    }

    pub async fn find_type(&self, name: &str) -> Result<Option<TypeDescriptor>> {
        let schema: Schema = self.query_json(&type_query(name)).await?;
        Ok(schema.types.into_iter().next())
    }

    /// A filter builder sharing this client's descriptor cache.
    pub fn filters(&self) -> FilterBuilder {
        FilterBuilder::new(Arc::clone(self.encoder().cache()))
    }
}
