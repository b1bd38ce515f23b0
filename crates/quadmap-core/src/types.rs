//! Core value objects for the graph store protocol.
//!
//! Predicates describe what may be stored, quads are what gets sent, and
//! facets are the typed key/value properties attached to an edge quad.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

use crate::error::{MapperError, Result};

/// Object value that deletes every value of a predicate.
pub const WILDCARD: &str = "_STAR_ALL";

/// Predicate the store uses to record a node's type names.
pub const TYPE_PREDICATE: &str = "dgraph.type";

/// Prefix reserved for store-internal predicates and types.
pub const SYSTEM_PREFIX: &str = "dgraph.";

/// Prefix of a client-assigned blank node identifier.
pub const BLANK_PREFIX: &str = "_:";

// ── Scalar Kinds ─────────────────────────────────────────────────

/// Predicate value kinds understood by the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScalarKind {
    String,
    Password,
    Int,
    Float,
    Bool,
    DateTime,
    Geo,
    Uid,
    Default,
    /// A live predicate of a kind records cannot hold, such as a vector.
    /// Never declared; never equal to a declared kind.
    #[serde(other)]
    Unsupported,
}

impl ScalarKind {
    /// The store's textual name for this kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Password => "password",
            Self::Int => "int",
            Self::Float => "float",
            Self::Bool => "bool",
            Self::DateTime => "datetime",
            Self::Geo => "geo",
            Self::Uid => "uid",
            Self::Default => "default",
            Self::Unsupported => "unsupported",
        }
    }
}

impl fmt::Display for ScalarKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ScalarKind {
    type Err = MapperError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "string" => Ok(Self::String),
            "password" => Ok(Self::Password),
            "int" => Ok(Self::Int),
            "float" => Ok(Self::Float),
            "bool" => Ok(Self::Bool),
            "datetime" => Ok(Self::DateTime),
            "geo" => Ok(Self::Geo),
            "uid" => Ok(Self::Uid),
            "default" => Ok(Self::Default),
            other => Err(MapperError::UnsupportedScalarKind(other.to_string())),
        }
    }
}

// ── Predicates ───────────────────────────────────────────────────

/// How a resolved field participates in mutations.
///
/// Exactly one role applies to every descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum PredicateRole {
    /// A predicate of its own.
    #[default]
    Ordinary,
    /// An edge property of the named sibling predicate.
    FacetOf { facet: String },
    /// Mirrors an inbound edge; listed in the type, never mutated.
    Reverse,
}

/// A predicate definition as declared by a record or reported by the store.
///
/// Field names follow the store's schema introspection JSON so live
/// schemas deserialize directly into this type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredicateDescriptor {
    #[serde(rename = "predicate")]
    pub name: String,
    #[serde(rename = "type")]
    pub kind: ScalarKind,
    #[serde(default)]
    pub index: bool,
    #[serde(default, rename = "tokenizer", skip_serializing_if = "Vec::is_empty")]
    pub tokenizers: Vec<String>,
    #[serde(default)]
    pub reverse: bool,
    #[serde(default)]
    pub count: bool,
    #[serde(default)]
    pub list: bool,
    #[serde(default)]
    pub upsert: bool,
    #[serde(default)]
    pub lang: bool,
    /// Language tag written into quads, e.g. `en` for `name@en`.
    #[serde(skip)]
    pub lang_variant: Option<String>,
    #[serde(skip)]
    pub role: PredicateRole,
    /// Path of record field names leading to the value.
    #[serde(skip)]
    pub field_path: Vec<String>,
}

impl PredicateDescriptor {
    pub fn new(name: impl Into<String>, kind: ScalarKind) -> Self {
        Self {
            name: name.into(),
            kind,
            index: false,
            tokenizers: Vec::new(),
            reverse: false,
            count: false,
            list: false,
            upsert: false,
            lang: false,
            lang_variant: None,
            role: PredicateRole::Ordinary,
            field_path: Vec::new(),
        }
    }

    pub fn list(mut self) -> Self {
        self.list = true;
        self
    }

    pub fn with_index<I, S>(mut self, tokenizers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.index = true;
        self.tokenizers = tokenizers.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_reverse(mut self) -> Self {
        self.reverse = true;
        self
    }

    pub fn with_count(mut self) -> Self {
        self.count = true;
        self
    }

    pub fn with_upsert(mut self) -> Self {
        self.upsert = true;
        self
    }

    pub fn with_lang(mut self, variant: Option<String>) -> Self {
        self.lang = true;
        self.lang_variant = variant;
        self
    }

    pub fn with_field_path(mut self, path: Vec<String>) -> Self {
        self.field_path = path;
        self
    }

    pub fn is_ordinary(&self) -> bool {
        self.role == PredicateRole::Ordinary
    }

    pub fn is_reverse_marker(&self) -> bool {
        self.role == PredicateRole::Reverse
    }

    /// Facet key when this descriptor is an edge property.
    pub fn facet_name(&self) -> Option<&str> {
        match &self.role {
            PredicateRole::FacetOf { facet } => Some(facet),
            _ => None,
        }
    }

    /// Render the schema line for the store's alter call.
    ///
    /// `name: [type] @index(a,b) @reverse @count @upsert @lang .`
    pub fn rdf(&self) -> String {
        let mut ty = self.kind.as_str().to_string();
        if self.list {
            ty = format!("[{ty}]");
        }

        let mut clauses = Vec::new();
        if self.index {
            clauses.push(format!("@index({})", self.tokenizers.join(",")));
        }
        if self.reverse {
            clauses.push("@reverse".to_string());
        }
        if self.count {
            clauses.push("@count".to_string());
        }
        if self.upsert {
            clauses.push("@upsert".to_string());
        }
        if self.lang {
            clauses.push("@lang".to_string());
        }

        if clauses.is_empty() {
            format!("{}: {ty} .", self.name)
        } else {
            format!("{}: {ty} {} .", self.name, clauses.join(" "))
        }
    }
}

impl fmt::Display for PredicateDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

// ── Quads ────────────────────────────────────────────────────────

/// A scalar object of a quad, tagged by the kind the store stores it as.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum ObjectValue {
    #[serde(rename = "default_val")]
    Default(String),
    #[serde(rename = "str_val")]
    Str(String),
    #[serde(rename = "password_val")]
    Password(String),
    #[serde(rename = "int_val")]
    Int(i64),
    #[serde(rename = "double_val")]
    Float(f64),
    #[serde(rename = "bool_val")]
    Bool(bool),
    #[serde(rename = "datetime_val")]
    DateTime(Vec<u8>),
    #[serde(rename = "geo_val")]
    Geo(Vec<u8>),
}

impl ObjectValue {
    pub fn wildcard() -> Self {
        Self::Default(WILDCARD.to_string())
    }

    pub fn is_wildcard(&self) -> bool {
        matches!(self, Self::Default(v) if v == WILDCARD)
    }
}

/// The object side of a quad: a value or another node.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Object {
    #[serde(rename = "objectValue")]
    Value(ObjectValue),
    #[serde(rename = "objectId")]
    Node(String),
}

/// One subject–predicate–object statement with optional edge facets.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Quad {
    pub subject: String,
    pub predicate: String,
    #[serde(flatten)]
    pub object: Object,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lang: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub facets: Vec<Facet>,
}

impl Quad {
    pub fn value(
        subject: impl Into<String>,
        predicate: impl Into<String>,
        value: ObjectValue,
    ) -> Self {
        Self {
            subject: subject.into(),
            predicate: predicate.into(),
            object: Object::Value(value),
            lang: None,
            facets: Vec::new(),
        }
    }

    pub fn edge(
        subject: impl Into<String>,
        predicate: impl Into<String>,
        object_id: impl Into<String>,
    ) -> Self {
        Self {
            subject: subject.into(),
            predicate: predicate.into(),
            object: Object::Node(object_id.into()),
            lang: None,
            facets: Vec::new(),
        }
    }

    /// A delete-everything quad for `predicate` on `subject`.
    pub fn wildcard(subject: impl Into<String>, predicate: impl Into<String>) -> Self {
        Self::value(subject, predicate, ObjectValue::wildcard())
    }

    /// A quad removing every predicate of `subject`.
    pub fn node_wildcard(subject: impl Into<String>) -> Self {
        Self::wildcard(subject, WILDCARD)
    }

    pub fn with_lang(mut self, lang: Option<String>) -> Self {
        self.lang = lang;
        self
    }

    pub fn is_wildcard(&self) -> bool {
        matches!(&self.object, Object::Value(v) if v.is_wildcard())
    }

    pub fn object_value(&self) -> Option<&ObjectValue> {
        match &self.object {
            Object::Value(v) => Some(v),
            Object::Node(_) => None,
        }
    }

    pub fn object_id(&self) -> Option<&str> {
        match &self.object {
            Object::Node(id) => Some(id),
            Object::Value(_) => None,
        }
    }
}

// ── Facets ───────────────────────────────────────────────────────

/// Value-kind tag of an encoded facet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum FacetKind {
    Int,
    Float,
    Bool,
    String,
    DateTime,
}

/// A typed key/value property attached to an edge.
///
/// Int and float facets are always 8 little-endian bytes.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Facet {
    pub key: String,
    pub value: Vec<u8>,
    #[serde(rename = "valType")]
    pub kind: FacetKind,
}

/// A decoded facet value.
#[derive(Debug, Clone, PartialEq)]
pub enum FacetValue {
    Int(i64),
    Float(f64),
    Bool(bool),
    String(String),
    DateTime(DateTime<FixedOffset>),
}

impl Facet {
    pub fn int(key: impl Into<String>, value: i64) -> Self {
        Self {
            key: key.into(),
            value: value.to_le_bytes().to_vec(),
            kind: FacetKind::Int,
        }
    }

    pub fn float(key: impl Into<String>, value: f64) -> Self {
        Self {
            key: key.into(),
            value: value.to_bits().to_le_bytes().to_vec(),
            kind: FacetKind::Float,
        }
    }

    pub fn bool(key: impl Into<String>, value: bool) -> Self {
        Self {
            key: key.into(),
            value: value.to_string().into_bytes(),
            kind: FacetKind::Bool,
        }
    }

    pub fn string(key: impl Into<String>, value: &str) -> Self {
        Self {
            key: key.into(),
            value: value.as_bytes().to_vec(),
            kind: FacetKind::String,
        }
    }

    pub fn datetime(key: impl Into<String>, value: &DateTime<FixedOffset>) -> Self {
        Self {
            key: key.into(),
            value: value.to_rfc3339().into_bytes(),
            kind: FacetKind::DateTime,
        }
    }

    /// Decode the raw bytes according to the kind tag.
    pub fn decode(&self) -> Result<FacetValue> {
        match self.kind {
            FacetKind::Int => Ok(FacetValue::Int(i64::from_le_bytes(self.fixed8()?))),
            FacetKind::Float => Ok(FacetValue::Float(f64::from_bits(u64::from_le_bytes(
                self.fixed8()?,
            )))),
            FacetKind::Bool => match self.value.as_slice() {
                b"true" => Ok(FacetValue::Bool(true)),
                b"false" => Ok(FacetValue::Bool(false)),
                _ => Err(MapperError::encoding(&self.key, "invalid bool facet bytes")),
            },
            FacetKind::String => String::from_utf8(self.value.clone())
                .map(FacetValue::String)
                .map_err(|e| MapperError::encoding(&self.key, e)),
            FacetKind::DateTime => {
                let text = std::str::from_utf8(&self.value)
                    .map_err(|e| MapperError::encoding(&self.key, e))?;
                DateTime::parse_from_rfc3339(text)
                    .map(FacetValue::DateTime)
                    .map_err(|e| MapperError::encoding(&self.key, e))
            }
        }
    }

    fn fixed8(&self) -> Result<[u8; 8]> {
        self.value.as_slice().try_into().map_err(|_| {
            MapperError::encoding(
                &self.key,
                format!("expected 8 bytes, got {}", self.value.len()),
            )
        })
    }
}
