//! Schema model: predicates plus types, as declared or as reported live.

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::types::{PredicateDescriptor, ScalarKind, SYSTEM_PREFIX};

/// A named type and the ordered set of predicate names it groups.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RawType")]
pub struct TypeDescriptor {
    pub name: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<String>,
}

/// Introspection returns fields as `{"name": ..}` objects while declared
/// schema files list plain names; accept both.
#[derive(Deserialize)]
struct RawType {
    name: String,
    #[serde(default)]
    fields: Vec<RawField>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawField {
    Name(String),
    Object { name: String },
}

impl From<RawType> for TypeDescriptor {
    fn from(raw: RawType) -> Self {
        let fields = raw
            .fields
            .into_iter()
            .map(|f| match f {
                RawField::Name(name) | RawField::Object { name } => name,
            })
            .collect();
        Self::new(raw.name, fields)
    }
}

impl TypeDescriptor {
    /// Build a type, dropping repeated field names but keeping first-seen order.
    pub fn new(name: impl Into<String>, fields: Vec<String>) -> Self {
        let mut unique: Vec<String> = Vec::with_capacity(fields.len());
        for field in fields {
            if !unique.contains(&field) {
                unique.push(field);
            }
        }
        Self {
            name: name.into(),
            fields: unique,
        }
    }

    /// Render the type block for the store's alter call.
    ///
    /// Reverse predicates are wrapped in angle brackets. A type without
    /// fields renders as an empty string.
    pub fn rdf(&self) -> String {
        if self.fields.is_empty() {
            return String::new();
        }
        let fields: Vec<String> = self
            .fields
            .iter()
            .map(|f| {
                if f.starts_with('~') {
                    format!("<{f}>")
                } else {
                    f.clone()
                }
            })
            .collect();
        format!("type {} {{\n\t{}\n}}", self.name, fields.join("\n\t"))
    }
}

/// Predicates and types of a graph schema.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Schema {
    #[serde(default, rename = "schema")]
    pub predicates: Vec<PredicateDescriptor>,
    #[serde(default)]
    pub types: Vec<TypeDescriptor>,
}

impl Schema {
    /// Parse the JSON returned by the store's `schema {}` introspection query.
    ///
    /// Predicates of kinds records cannot hold are kept as
    /// [`ScalarKind::Unsupported`] so they still take part in comparisons.
    pub fn from_json(bytes: &[u8]) -> Result<Self> {
        let schema: Self = serde_json::from_slice(bytes)?;
        for p in &schema.predicates {
            if p.kind == ScalarKind::Unsupported {
                tracing::warn!(predicate = %p.name, "Predicate has an unsupported kind");
            }
        }
        Ok(schema)
    }

    /// Drop store-internal predicates and types.
    pub fn without_system(self) -> Self {
        self.without_prefix(SYSTEM_PREFIX)
    }

    pub fn without_prefix(self, prefix: &str) -> Self {
        let before = (self.predicates.len(), self.types.len());
        let predicates: Vec<_> = self
            .predicates
            .into_iter()
            .filter(|p| !p.name.starts_with(prefix))
            .collect();
        let types: Vec<_> = self
            .types
            .into_iter()
            .filter(|t| !t.name.starts_with(prefix))
            .collect();
        tracing::trace!(
            dropped_predicates = before.0 - predicates.len(),
            dropped_types = before.1 - types.len(),
            prefix,
            "Filtered system schema"
        );
        Self { predicates, types }
    }

    pub fn predicate(&self, name: &str) -> Option<&PredicateDescriptor> {
        self.predicates.iter().find(|p| p.name == name)
    }

    pub fn type_named(&self, name: &str) -> Option<&TypeDescriptor> {
        self.types.iter().find(|t| t.name == name)
    }

    /// All predicate lines followed by all non-empty type blocks.
    pub fn rdf(&self) -> String {
        self.predicates
            .iter()
            .map(PredicateDescriptor::rdf)
            .chain(self.types.iter().map(TypeDescriptor::rdf))
            .filter(|line| !line.is_empty())
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn is_empty(&self) -> bool {
        self.predicates.is_empty() && self.types.is_empty()
    }
}
