//! quadmap-sync: schema reconciliation for the graph store.
//!
//! Compares a declared schema against the store's live schema, builds the
//! alter plan that converges them and applies it through a graph client.

pub mod config;
pub mod diff;
pub mod error;
pub mod plan;
