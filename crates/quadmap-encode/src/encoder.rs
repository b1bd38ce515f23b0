//! Record-to-quad encoding.
//!
//! An [`Encoder`] walks a record's [`NodeView`] against the resolved
//! descriptors of its type and produces the set and delete quads of one
//! insert or update. Either the complete result is returned or an error;
//! no partial quads escape.

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, trace};

use quadmap_core::config::{EncoderConfig, ZeroValuePolicy};
use quadmap_core::types::TYPE_PREDICATE;
use quadmap_core::{
    FieldValue, MapperError, NodeView, ObjectValue, PredicateDescriptor, Quad, Record, Result,
    ScalarKind, Value,
};

use crate::blank::{generator_for, BlankNodeGenerator};
use crate::codec::{mismatch, scalar_object};
use crate::facet::encode_facet;
use crate::password::{BcryptHasher, PasswordHasher};
use crate::resolver::{DescriptorCache, ResolvedType};

/// What the produced quads are for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationMode {
    /// Create a node: blank identity allowed, type quads added.
    Insert,
    /// Modify an existing node: identity required, clears become deletes.
    Update,
}

/// Quads of one encoded record.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Encoded {
    pub set: Vec<Quad>,
    pub delete: Vec<Quad>,
}

impl Encoded {
    pub fn is_empty(&self) -> bool {
        self.set.is_empty() && self.delete.is_empty()
    }
}

/// Encodes records into quads.
///
/// Cheap to share behind an `Arc`; descriptor resolution is cached per
/// record type.
pub struct Encoder {
    cache: Arc<DescriptorCache>,
    blanks: Box<dyn BlankNodeGenerator>,
    hasher: Box<dyn PasswordHasher>,
    zero_values: ZeroValuePolicy,
}

impl Encoder {
    pub fn new(config: &EncoderConfig) -> Self {
        Self {
            cache: Arc::new(DescriptorCache::new()),
            blanks: generator_for(config.blank_nodes),
            hasher: Box::new(BcryptHasher::new(config.bcrypt_cost)),
            zero_values: config.zero_values,
        }
    }

    /// Share a descriptor cache with other encoders.
    pub fn with_cache(mut self, cache: Arc<DescriptorCache>) -> Self {
        self.cache = cache;
        self
    }

    pub fn with_blank_nodes(mut self, blanks: impl BlankNodeGenerator + 'static) -> Self {
        self.blanks = Box::new(blanks);
        self
    }

    pub fn with_hasher(mut self, hasher: impl PasswordHasher + 'static) -> Self {
        self.hasher = Box::new(hasher);
        self
    }

    pub fn with_zero_values(mut self, policy: ZeroValuePolicy) -> Self {
        self.zero_values = policy;
        self
    }

    pub fn cache(&self) -> &Arc<DescriptorCache> {
        &self.cache
    }

    pub fn zero_values(&self) -> ZeroValuePolicy {
        self.zero_values
    }

    /// Encode `record`, writing a freshly assigned blank identity back on insert.
    pub fn encode<R: Record>(&self, record: &mut R, mode: MutationMode) -> Result<Encoded> {
        let mut view = record.view();
        let encoded = self.encode_view(&mut view, mode)?;
        if view.id != record.node_id() {
            record.set_node_id(view.id);
        }
        Ok(encoded)
    }

    /// Encode a structural view directly.
    ///
    /// On insert an empty identity is replaced by a blank node identifier,
    /// but only when encoding succeeds.
    pub fn encode_view(&self, view: &mut NodeView, mode: MutationMode) -> Result<Encoded> {
        let resolved = self.cache.get(view.shape)?;

        let subject = if view.id.is_empty() {
            match mode {
                MutationMode::Insert => self.blanks.next_blank(),
                MutationMode::Update => {
                    return Err(MapperError::EmptyIdentity(format!(
                        "cannot update {} without a node id",
                        view.shape.name()
                    )))
                }
            }
        } else {
            view.id.clone()
        };

        let mut out = Encoded::default();
        self.encode_fields(&subject, view, &resolved, mode, &mut out)?;

        if mode == MutationMode::Insert && !out.set.is_empty() {
            for name in &resolved.type_names {
                out.set.push(Quad::value(
                    &subject,
                    TYPE_PREDICATE,
                    ObjectValue::Str(name.clone()),
                ));
            }
        }

        debug!(
            subject = %subject,
            mode = ?mode,
            set = out.set.len(),
            delete = out.delete.len(),
            "Encoded record"
        );
        view.id = subject;
        Ok(out)
    }

    /// The delete that removes every value of `record`'s node.
    pub fn encode_delete<R: Record + 'static>(&self, record: &R) -> Result<Encoded> {
        let id = record.node_id();
        if id.is_empty() {
            return Err(MapperError::EmptyIdentity(format!(
                "cannot delete {} without a node id",
                R::shape_ref().name()
            )));
        }
        debug!(subject = %id, "Encoded node delete");
        Ok(Encoded {
            set: Vec::new(),
            delete: vec![Quad::node_wildcard(id)],
        })
    }

    fn encode_fields(
        &self,
        subject: &str,
        view: &NodeView,
        resolved: &ResolvedType,
        mode: MutationMode,
        out: &mut Encoded,
    ) -> Result<()> {
        for desc in &resolved.predicates {
            match view.lookup(&desc.field_path) {
                FieldValue::Absent => {}
                FieldValue::Cleared => {
                    if mode == MutationMode::Update {
                        out.delete.push(
                            Quad::wildcard(subject, &desc.name)
                                .with_lang(desc.lang_variant.clone()),
                        );
                    }
                }
                FieldValue::Set(value) => {
                    if !self.skips(value) {
                        self.encode_predicate(subject, desc, value, mode, out)?;
                    }
                }
            }
        }
        Ok(())
    }

    fn encode_predicate(
        &self,
        subject: &str,
        desc: &PredicateDescriptor,
        value: &Value,
        mode: MutationMode,
        out: &mut Encoded,
    ) -> Result<()> {
        if !desc.list {
            if matches!(value, Value::List(_)) {
                return Err(mismatch(desc, value));
            }
            self.encode_single(subject, desc, value, mode, out)?;
            return Ok(());
        }

        let Value::List(items) = value else {
            return Err(mismatch(desc, value));
        };
        let mut produced = false;
        for item in items {
            if self.skips(item) {
                continue;
            }
            produced |= self.encode_single(subject, desc, item, mode, out)?;
        }
        // Replace the stored list instead of appending to it.
        if produced && mode == MutationMode::Update {
            out.delete
                .push(Quad::wildcard(subject, &desc.name).with_lang(desc.lang_variant.clone()));
        }
        Ok(())
    }

    /// Encode one value; returns whether a quad for `desc` was produced.
    fn encode_single(
        &self,
        subject: &str,
        desc: &PredicateDescriptor,
        value: &Value,
        mode: MutationMode,
        out: &mut Encoded,
    ) -> Result<bool> {
        if desc.kind != ScalarKind::Uid {
            let object = scalar_object(desc, value, self.hasher.as_ref())?;
            out.set
                .push(Quad::value(subject, &desc.name, object).with_lang(desc.lang_variant.clone()));
            return Ok(true);
        }

        let Value::Node(nested) = value else {
            return Err(mismatch(desc, value));
        };
        if nested.id.is_empty() {
            trace!(predicate = %desc.name, "Skipping edge to node without id");
            return Ok(false);
        }

        let nested_resolved = self.cache.get(nested.shape)?;
        let mut edge = Quad::edge(subject, &desc.name, &nested.id);
        for facet in nested_resolved.facets_for(&desc.name) {
            let Some(key) = facet.facet_name() else {
                continue;
            };
            if let FieldValue::Set(v) = nested.lookup(&facet.field_path) {
                if !self.skips(v) {
                    edge.facets.push(encode_facet(key, v)?);
                }
            }
        }

        self.encode_fields(&nested.id, nested, &nested_resolved, mode, out)?;
        out.set.push(edge);
        Ok(true)
    }

    fn skips(&self, value: &Value) -> bool {
        self.zero_values == ZeroValuePolicy::Skip && value.is_zero()
    }
}

impl Default for Encoder {
    fn default() -> Self {
        Self::new(&EncoderConfig::default())
    }
}

impl std::fmt::Debug for Encoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Encoder")
            .field("cached_types", &self.cache.len())
            .field("zero_values", &self.zero_values)
            .finish_non_exhaustive()
    }
}
