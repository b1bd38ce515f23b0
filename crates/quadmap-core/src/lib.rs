//! quadmap-core: the shared model of the quadmap workspace.
//!
//! This crate provides the value objects every other crate builds on:
//! - Predicate and type descriptors plus their RDF schema text
//! - Quads and facets, the atomic units of a graph mutation
//! - The record model (shapes, structural views, tri-state field values)
//! - Encoder configuration
//! - The common error taxonomy

pub mod config;
pub mod error;
pub mod geometry;
pub mod record;
pub mod schema;
pub mod types;

pub use error::{MapperError, Result};
pub use geometry::Geometry;
pub use record::{FieldDecl, FieldType, FieldValue, NodeView, Record, RecordShape, ShapeRef, Value};
pub use schema::{Schema, TypeDescriptor};
pub use types::{
    Facet, FacetKind, FacetValue, Object, ObjectValue, PredicateDescriptor, PredicateRole, Quad,
    ScalarKind,
};
