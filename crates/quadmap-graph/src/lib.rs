//! quadmap-graph: requests, filters and the driver seam.
//!
//! Records are encoded by `quadmap-encode`; this crate assembles the
//! resulting quads into transactional requests, derives query filters and
//! hands everything to a [`GraphDriver`] supplied by the caller.

pub mod client;
pub mod mutations;
pub mod queries;

pub use client::{AlterOp, GraphClient, GraphDriver, GraphError, MutationOutcome, MutationResponse};
pub use mutations::{AssembledMutation, AssembledRequest, Mutation, Request, VarValue};
pub use queries::{Filter, FilterBuilder, RecordFilter};
