//! The record model: static shapes and per-instance structural views.
//!
//! A [`Record`] declares its shape once (field names, annotations, value
//! types) and exposes each instance as a [`NodeView`]. Encoding and filter
//! building work over views, so no runtime type introspection is needed.

use std::any::TypeId;
use std::fmt;

use chrono::{DateTime, FixedOffset, Utc};

use crate::geometry::Geometry;
use crate::types::ScalarKind;

/// Seconds between 0001-01-01T00:00:00Z and the Unix epoch, negated.
///
/// Timestamps at this instant are the "unset" datetime.
pub const ZERO_TIME_UNIX: i64 = -62_135_596_800;

// ── Records ──────────────────────────────────────────────────────

/// An application type that maps onto graph nodes.
pub trait Record {
    /// Static field declarations; must not depend on field values.
    fn shape() -> RecordShape
    where
        Self: Sized;

    /// The node identity; empty for records pending creation.
    fn node_id(&self) -> &str;

    fn set_node_id(&mut self, id: String);

    /// Structural view of this instance.
    fn view(&self) -> NodeView;

    fn shape_ref() -> ShapeRef
    where
        Self: Sized + 'static,
    {
        ShapeRef::of::<Self>()
    }
}

/// Identity of a record type plus the way to build its shape.
///
/// Used as the descriptor cache key.
#[derive(Clone, Copy)]
pub struct ShapeRef {
    id: TypeId,
    name: &'static str,
    build: fn() -> RecordShape,
}

impl ShapeRef {
    pub fn of<R: Record + 'static>() -> Self {
        Self {
            id: TypeId::of::<R>(),
            name: std::any::type_name::<R>(),
            build: R::shape,
        }
    }

    pub fn id(&self) -> TypeId {
        self.id
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn build(&self) -> RecordShape {
        (self.build)()
    }
}

impl PartialEq for ShapeRef {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for ShapeRef {}

impl fmt::Debug for ShapeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ShapeRef({})", self.name)
    }
}

// ── Shapes ───────────────────────────────────────────────────────

/// Declared value type of a record field.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldType {
    String,
    Password,
    Default,
    Int,
    Float,
    Bool,
    DateTime,
    Geo,
    /// A nested record reached through an edge.
    Node,
    /// An anonymous substructure whose fields are flattened into the parent.
    Embedded(ShapeRef),
    /// A value the store has no kind for.
    Opaque(String),
}

impl FieldType {
    pub fn scalar_kind(&self) -> Option<ScalarKind> {
        match self {
            Self::String => Some(ScalarKind::String),
            Self::Password => Some(ScalarKind::Password),
            Self::Default => Some(ScalarKind::Default),
            Self::Int => Some(ScalarKind::Int),
            Self::Float => Some(ScalarKind::Float),
            Self::Bool => Some(ScalarKind::Bool),
            Self::DateTime => Some(ScalarKind::DateTime),
            Self::Geo => Some(ScalarKind::Geo),
            Self::Node => Some(ScalarKind::Uid),
            Self::Embedded(_) | Self::Opaque(_) => None,
        }
    }
}

/// Declaration of one record field.
///
/// `tag` is the predicate annotation: `name`, `name@lang`, `~reverse` or
/// `owner|facet`. Fields without a tag are internal and never mapped.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDecl {
    pub name: String,
    pub tag: Option<String>,
    pub ty: FieldType,
    pub sequence: bool,
    pub tokenizers: Option<Vec<String>>,
    pub count: bool,
    pub upsert: bool,
    pub reverse_edge: bool,
}

impl FieldDecl {
    pub fn new(name: impl Into<String>, ty: FieldType) -> Self {
        Self {
            name: name.into(),
            tag: None,
            ty,
            sequence: false,
            tokenizers: None,
            count: false,
            upsert: false,
            reverse_edge: false,
        }
    }

    /// Shorthand for a field tagged with `tag`.
    pub fn tagged(name: impl Into<String>, tag: impl Into<String>, ty: FieldType) -> Self {
        Self::new(name, ty).tag(tag)
    }

    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }

    /// The field holds a sequence of values.
    pub fn sequence(mut self) -> Self {
        self.sequence = true;
        self
    }

    pub fn with_index<I, S>(mut self, tokenizers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tokenizers = Some(tokenizers.into_iter().map(Into::into).collect());
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

    /// Ask the store to maintain the inbound direction of this edge.
    pub fn with_reverse_edge(mut self) -> Self {
        self.reverse_edge = true;
        self
    }
}

/// Static shape of a record type.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RecordShape {
    pub type_names: Vec<String>,
    pub fields: Vec<FieldDecl>,
}

impl RecordShape {
    pub fn new<I, S>(type_names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            type_names: type_names.into_iter().map(Into::into).collect(),
            fields: Vec::new(),
        }
    }

    pub fn field(mut self, field: FieldDecl) -> Self {
        self.fields.push(field);
        self
    }
}

// ── Views ────────────────────────────────────────────────────────

/// Presence of a field value in a view.
///
/// `Cleared` is distinct from `Absent`: an update turns it into a delete.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum FieldValue {
    #[default]
    Absent,
    Cleared,
    Set(Value),
}

static ABSENT: FieldValue = FieldValue::Absent;

impl FieldValue {
    pub fn set(value: impl Into<Value>) -> Self {
        Self::Set(value.into())
    }

    pub fn from_option<T: Into<Value>>(value: Option<T>) -> Self {
        value.map_or(Self::Absent, Self::set)
    }

    pub fn value(&self) -> Option<&Value> {
        match self {
            Self::Set(v) => Some(v),
            Self::Absent | Self::Cleared => None,
        }
    }

    pub fn is_absent(&self) -> bool {
        matches!(self, Self::Absent)
    }
}

/// Structural view of one record instance.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeView {
    pub shape: ShapeRef,
    pub id: String,
    pub fields: Vec<(String, FieldValue)>,
}

impl NodeView {
    pub fn new(shape: ShapeRef, id: impl Into<String>) -> Self {
        Self {
            shape,
            id: id.into(),
            fields: Vec::new(),
        }
    }

    pub fn of<R: Record + 'static>(id: impl Into<String>) -> Self {
        Self::new(ShapeRef::of::<R>(), id)
    }

    /// Add a populated field.
    pub fn with(self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.with_field(name, FieldValue::set(value))
    }

    /// Add a field that is populated only when `value` is `Some`.
    pub fn with_opt<T: Into<Value>>(self, name: impl Into<String>, value: Option<T>) -> Self {
        self.with_field(name, FieldValue::from_option(value))
    }

    /// Mark a field as explicitly cleared.
    pub fn cleared(self, name: impl Into<String>) -> Self {
        self.with_field(name, FieldValue::Cleared)
    }

    pub fn with_field(mut self, name: impl Into<String>, value: FieldValue) -> Self {
        let name = name.into();
        match self.fields.iter_mut().find(|(n, _)| *n == name) {
            Some((_, slot)) => *slot = value,
            None => self.fields.push((name, value)),
        }
        self
    }

    pub fn get(&self, name: &str) -> &FieldValue {
        self.fields
            .iter()
            .find(|(n, _)| n == name)
            .map_or(&ABSENT, |(_, v)| v)
    }

    /// Follow a field path through embedded substructures.
    pub fn lookup(&self, path: &[String]) -> &FieldValue {
        match path {
            [] => &ABSENT,
            [last] => self.get(last),
            [head, rest @ ..] => match self.get(head) {
                FieldValue::Set(Value::Node(inner)) => inner.lookup(rest),
                _ => &ABSENT,
            },
        }
    }

    /// No identity and no populated field.
    pub fn is_empty(&self) -> bool {
        self.id.is_empty()
            && self.fields.iter().all(|(_, v)| match v {
                FieldValue::Absent => true,
                FieldValue::Cleared => false,
                FieldValue::Set(v) => v.is_zero(),
            })
    }
}

// ── Values ───────────────────────────────────────────────────────

/// A runtime field value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Str(String),
    Int(i64),
    UInt(u64),
    Float(f64),
    Bool(bool),
    DateTime(DateTime<FixedOffset>),
    Geo(Geometry),
    Node(NodeView),
    List(Vec<Value>),
}

impl Value {
    /// Short name of the runtime kind, for error messages.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Str(_) => "string",
            Self::Int(_) => "int",
            Self::UInt(_) => "uint",
            Self::Float(_) => "float",
            Self::Bool(_) => "bool",
            Self::DateTime(_) => "datetime",
            Self::Geo(_) => "geo",
            Self::Node(_) => "node",
            Self::List(_) => "list",
        }
    }

    /// The zero value of the runtime kind.
    pub fn is_zero(&self) -> bool {
        match self {
            Self::Str(s) => s.is_empty(),
            Self::Int(i) => *i == 0,
            Self::UInt(u) => *u == 0,
            Self::Float(f) => *f == 0.0,
            Self::Bool(b) => !b,
            Self::DateTime(dt) => dt.timestamp() == ZERO_TIME_UNIX && dt.timestamp_subsec_nanos() == 0,
            Self::Geo(g) => g.is_empty(),
            Self::Node(n) => n.is_empty(),
            Self::List(l) => l.is_empty(),
        }
    }
}

macro_rules! value_from {
    ($variant:ident: $($t:ty),+) => {
        $(impl From<$t> for Value {
            fn from(v: $t) -> Self {
                Self::$variant(v.into())
            }
        })+
    };
}

value_from!(Int: i8, i16, i32, i64);
value_from!(UInt: u8, u16, u32, u64);
value_from!(Float: f32, f64);
value_from!(Str: String, &str);

impl From<isize> for Value {
    fn from(v: isize) -> Self {
        Self::Int(v as i64)
    }
}

impl From<usize> for Value {
    fn from(v: usize) -> Self {
        Self::UInt(v as u64)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<DateTime<FixedOffset>> for Value {
    fn from(v: DateTime<FixedOffset>) -> Self {
        Self::DateTime(v)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(v: DateTime<Utc>) -> Self {
        Self::DateTime(v.fixed_offset())
    }
}

impl From<Geometry> for Value {
    fn from(v: Geometry) -> Self {
        Self::Geo(v)
    }
}

impl From<NodeView> for Value {
    fn from(v: NodeView) -> Self {
        Self::Node(v)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(v: Vec<T>) -> Self {
        Self::List(v.into_iter().map(Into::into).collect())
    }
}
