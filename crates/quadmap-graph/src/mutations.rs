//! Request assembly and write operations.
//!
//! A [`Request`] bundles named query variables, read sub-queries and any
//! number of conditional mutation units into one transactional payload.

use std::collections::HashMap;

use chrono::{DateTime, FixedOffset, Utc};
use serde::Serialize;

use quadmap_core::types::BLANK_PREFIX;
use quadmap_core::{MapperError, Quad, Record};
use quadmap_encode::{Encoded, MutationMode};

use crate::client::{GraphClient, GraphDriver, MutationOutcome, Result};

// ── Variables ────────────────────────────────────────────────────

/// A value bound to a query variable.
#[derive(Debug, Clone, PartialEq)]
pub enum VarValue {
    Int(i64),
    Str(String),
    /// Rendered as a JSON-like list and typed `string`.
    StrList(Vec<String>),
    Bool(bool),
    Float(f64),
    /// Rendered as RFC 3339 text and typed `string`.
    DateTime(DateTime<FixedOffset>),
}

impl VarValue {
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Int(_) => "int",
            Self::Str(_) | Self::StrList(_) | Self::DateTime(_) => "string",
            Self::Bool(_) => "bool",
            Self::Float(_) => "float",
        }
    }

    pub fn render(&self) -> String {
        match self {
            Self::Int(i) => i.to_string(),
            Self::Str(s) => s.clone(),
            Self::StrList(items) => format!(r#"["{}"]"#, items.join(r#"",""#)),
            Self::Bool(b) => b.to_string(),
            Self::Float(f) => format!("{f:.6}"),
            Self::DateTime(dt) => dt.to_rfc3339(),
        }
    }

    pub fn is_zero(&self) -> bool {
        match self {
            Self::Int(i) => *i == 0,
            Self::Str(s) => s.is_empty(),
            Self::StrList(items) => items.is_empty(),
            Self::Bool(b) => !b,
            Self::Float(f) => *f == 0.0,
            Self::DateTime(_) => false,
        }
    }
}

macro_rules! var_from {
    ($variant:ident: $($t:ty),+) => {
        $(impl From<$t> for VarValue {
            fn from(v: $t) -> Self {
                Self::$variant(v.into())
            }
        })+
    };
}

var_from!(Int: i8, i16, i32, i64, u8, u16, u32);
var_from!(Str: String, &str);
var_from!(Float: f32, f64);
var_from!(Bool: bool);
var_from!(DateTime: DateTime<FixedOffset>);

impl From<DateTime<Utc>> for VarValue {
    fn from(v: DateTime<Utc>) -> Self {
        Self::DateTime(v.fixed_offset())
    }
}

impl From<Vec<String>> for VarValue {
    fn from(v: Vec<String>) -> Self {
        Self::StrList(v)
    }
}

impl From<Vec<&str>> for VarValue {
    fn from(v: Vec<&str>) -> Self {
        Self::StrList(v.into_iter().map(String::from).collect())
    }
}

// ── Mutation Units ───────────────────────────────────────────────

/// One conditional unit of set and delete quads.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Mutation {
    pub conditions: Vec<String>,
    pub set: Vec<Quad>,
    pub delete: Vec<Quad>,
}

impl Mutation {
    /// Add a condition; all conditions must hold for the unit to apply.
    pub fn add_cond(&mut self, cond: impl Into<String>) -> &mut Self {
        self.conditions.push(cond.into());
        self
    }

    pub fn add_encoded(&mut self, encoded: Encoded) -> &mut Self {
        self.set.extend(encoded.set);
        self.delete.extend(encoded.delete);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.set.is_empty() && self.delete.is_empty()
    }

    /// `@if(c1 AND c2)`, or empty without conditions.
    pub fn cond(&self) -> String {
        if self.conditions.is_empty() {
            String::new()
        } else {
            format!("@if({})", self.conditions.join(" AND "))
        }
    }
}

/// A mutation unit ready for the driver.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AssembledMutation {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub cond: String,
    pub set: Vec<Quad>,
    pub delete: Vec<Quad>,
    pub commit_now: bool,
}

/// A complete transactional request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AssembledRequest {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub query: String,
    #[serde(skip_serializing_if = "HashMap::is_empty")]
    pub vars: HashMap<String, String>,
    pub mutations: Vec<AssembledMutation>,
    pub commit_now: bool,
}

// ── Requests ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Default)]
pub struct Request {
    vars: HashMap<String, String>,
    declarations: Vec<String>,
    queries: Vec<String>,
    mutations: Vec<Mutation>,
}

impl Request {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a query variable.
    ///
    /// Zero values are ignored and the first binding of a name wins.
    pub fn add_var(&mut self, name: impl Into<String>, value: impl Into<VarValue>) -> &mut Self {
        let name = name.into();
        let value = value.into();
        if value.is_zero() || self.vars.contains_key(&name) {
            return self;
        }
        self.declarations
            .push(format!("{name}:{}", value.type_name()));
        self.vars.insert(name, value.render());
        self
    }

    /// Add a read block, e.g. `q(func: eq(email, $email)) { v as uid }`.
    pub fn add_query(&mut self, block: impl Into<String>) -> &mut Self {
        self.queries.push(block.into());
        self
    }

    pub fn new_mutation(&mut self) -> &mut Mutation {
        self.mutations.push(Mutation::default());
        let last = self.mutations.len() - 1;
        &mut self.mutations[last]
    }

    pub fn mutations(&self) -> &[Mutation] {
        &self.mutations
    }

    /// The combined query text, empty when no block was added.
    pub fn query(&self) -> String {
        if self.queries.is_empty() {
            return String::new();
        }
        let header = if self.declarations.is_empty() {
            String::new()
        } else {
            format!("({})", self.declarations.join(","))
        };
        format!("query Me{header}{{\n\t{}\n}}", self.queries.join("\n\t"))
    }

    /// Assemble the request; empty units are dropped.
    pub fn marshal(&self, commit_now: bool) -> quadmap_core::Result<AssembledRequest> {
        let mutations: Vec<AssembledMutation> = self
            .mutations
            .iter()
            .filter(|m| !m.is_empty())
            .map(|m| AssembledMutation {
                cond: m.cond(),
                set: m.set.clone(),
                delete: m.delete.clone(),
                commit_now,
            })
            .collect();
        if mutations.is_empty() {
            return Err(MapperError::NoOperation);
        }
        Ok(AssembledRequest {
            query: self.query(),
            vars: self.vars.clone(),
            mutations,
            commit_now,
        })
    }
}

// ── Client Writes ────────────────────────────────────────────────

impl<D: GraphDriver> GraphClient<D> {
    /// Send a request and apply the identity contract to the response.
    pub async fn mutate(&self, request: &Request, commit_now: bool) -> Result<MutationOutcome> {
        let assembled = request.marshal(commit_now)?;
        tracing::debug!(
            units = assembled.mutations.len(),
            has_query = !assembled.query.is_empty(),
            commit_now,
            "Executing mutation"
        );
        self.driver().execute_mutation(&assembled).await?.outcome()
    }

    /// Create `record` as a new node and store the assigned uid in it.
    pub async fn insert<R: Record>(&self, record: &mut R) -> Result<MutationOutcome> {
        let encoded = self.encoder().encode(record, MutationMode::Insert)?;
        let mut request = Request::new();
        request.new_mutation().add_encoded(encoded);
        let outcome = self.mutate(&request, true).await?;

        if let MutationOutcome::Created(ids) = &outcome {
            let label = record.node_id().strip_prefix(BLANK_PREFIX).map(str::to_string);
            if let Some(uid) = label.and_then(|l| ids.get(&l)) {
                tracing::debug!(uid = %uid, "Node created");
                record.set_node_id(uid.clone());
            }
        }
        Ok(outcome)
    }

    /// Write the populated and cleared fields of an existing node.
    pub async fn update<R: Record>(&self, record: &mut R) -> Result<MutationOutcome> {
        let encoded = self.encoder().encode(record, MutationMode::Update)?;
        let mut request = Request::new();
        request.new_mutation().add_encoded(encoded);
        self.mutate(&request, true).await
    }

    /// Remove every value of `record`'s node.
    pub async fn delete<R: Record + 'static>(&self, record: &R) -> Result<MutationOutcome> {
        let encoded = self.encoder().encode_delete(record)?;
        let mut request = Request::new();
        request.new_mutation().add_encoded(encoded);
        self.mutate(&request, true).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_marshal_without_mutations_is_no_operation() {
        let mut req = Request::new();
        req.add_query("q(func: uid(0x1)) { v as uid }");
        req.new_mutation().add_cond("eq(len(v), 1)");
        assert!(matches!(req.marshal(true), Err(MapperError::NoOperation)));
    }

    #[test]
    fn test_query_header_and_conditions() {
        let mut req = Request::new();
        req.add_var("$email", "a@b.c").add_var("$age", 30);
        req.add_query("q(func: eq(email, $email)) { v as uid }");
        req.new_mutation()
            .add_cond("eq(len(v), 0)")
            .add_cond("gt(val(a), 1)")
            .set
            .push(Quad::wildcard("uid(v)", "name"));

        let assembled = req.marshal(false).unwrap();
        assert_eq!(
            assembled.query,
            "query Me($email:string,$age:int){\n\tq(func: eq(email, $email)) { v as uid }\n}"
        );
        assert_eq!(assembled.vars["$age"], "30");
        assert_eq!(assembled.mutations.len(), 1);
        assert_eq!(assembled.mutations[0].cond, "@if(eq(len(v), 0) AND gt(val(a), 1))");
        assert!(!assembled.commit_now);
    }

    #[test]
    fn test_first_binding_wins_and_zero_is_ignored() {
        let mut req = Request::new();
        req.add_var("$n", "first").add_var("$n", "second").add_var("$z", 0);
        req.add_query("q() {}");
        req.new_mutation().delete.push(Quad::wildcard("0x1", "n"));
        let assembled = req.marshal(true).unwrap();
        assert_eq!(assembled.vars.len(), 1);
        assert_eq!(assembled.vars["$n"], "first");
        assert!(assembled.query.starts_with("query Me($n:string){"));
    }

    #[test]
    fn test_var_rendering() {
        assert_eq!(VarValue::from(vec!["a", "b"]).render(), r#"["a","b"]"#);
        assert_eq!(VarValue::from(vec!["a", "b"]).type_name(), "string");
        assert_eq!(VarValue::from(1.5).render(), "1.500000");
        assert_eq!(VarValue::from(true).type_name(), "bool");
    }

    #[test]
    fn test_empty_units_are_dropped() {
        let mut req = Request::new();
        req.new_mutation();
        req.new_mutation().set.push(Quad::wildcard("0x1", "n"));
        let assembled = req.marshal(true).unwrap();
        assert_eq!(assembled.mutations.len(), 1);
        assert!(assembled.mutations[0].commit_now);
        assert!(assembled.query.is_empty());
    }
}
