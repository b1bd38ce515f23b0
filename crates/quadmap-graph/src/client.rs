//! Driver seam and shared graph client.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use quadmap_core::config::EncoderConfig;
use quadmap_core::{MapperError, Record};
use quadmap_encode::Encoder;

use crate::mutations::AssembledRequest;

/// Errors from graph operations.
#[derive(Debug, thiserror::Error)]
pub enum GraphError {
    #[error("Driver error: {0}")]
    Driver(String),

    #[error(transparent)]
    Mapper(#[from] MapperError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, GraphError>;

/// A schema operation for the store's alter call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AlterOp {
    /// Apply predicate and type definitions in RDF schema text.
    Schema(String),
    DropPredicate(String),
    DropType(String),
    /// Delete all data, keep the schema.
    DropData,
    /// Delete all data and the schema.
    DropAll,
}

/// What the store reports after executing a mutation request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MutationResponse {
    /// Blank node label (without `_:`) to assigned uid.
    #[serde(default)]
    pub assigned_ids: HashMap<String, String>,
    #[serde(default)]
    pub touched_predicates: Vec<String>,
}

/// Result of a mutation that changed something.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MutationOutcome {
    /// New nodes were created; blank label to uid.
    Created(HashMap<String, String>),
    /// Existing nodes were modified.
    Updated(Vec<String>),
}

impl MutationResponse {
    /// Apply the identity contract to a successful driver response.
    pub fn outcome(self) -> Result<MutationOutcome> {
        if !self.assigned_ids.is_empty() {
            Ok(MutationOutcome::Created(self.assigned_ids))
        } else if !self.touched_predicates.is_empty() {
            Ok(MutationOutcome::Updated(self.touched_predicates))
        } else {
            Err(MapperError::NothingChanged.into())
        }
    }
}

/// The transport to a graph store.
///
/// Implementations own connections, transactions and retries. Every method
/// reports failures as [`GraphError::Driver`].
#[async_trait]
pub trait GraphDriver: Send + Sync {
    /// Run a read query and return the raw JSON response.
    async fn execute_query(&self, query: &str) -> Result<Vec<u8>>;

    async fn execute_mutation(&self, request: &AssembledRequest) -> Result<MutationResponse>;

    async fn alter(&self, op: &AlterOp) -> Result<()>;
}

/// Graph client over a driver.
///
/// This is the single point where records become requests. Clone is cheap
/// when the driver is.
#[derive(Clone)]
pub struct GraphClient<D> {
    driver: D,
    encoder: Arc<Encoder>,
    system_prefix: String,
}

impl<D: GraphDriver> GraphClient<D> {
    pub fn new(driver: D) -> Self {
        Self::with_config(driver, &EncoderConfig::default())
    }

    pub fn with_config(driver: D, config: &EncoderConfig) -> Self {
        Self {
            driver,
            encoder: Arc::new(Encoder::new(config)),
            system_prefix: config.system_prefix.clone(),
        }
    }

    pub fn with_encoder(mut self, encoder: Encoder) -> Self {
        self.encoder = Arc::new(encoder);
        self
    }

    pub fn driver(&self) -> &D {
        &self.driver
    }

    pub fn encoder(&self) -> &Encoder {
        &self.encoder
    }

    pub fn system_prefix(&self) -> &str {
        &self.system_prefix
    }

    // ── Schema Operations ────────────────────────────────────────

    pub async fn alter(&self, op: AlterOp) -> Result<()> {
        tracing::info!(op = ?AlterKind::from(&op), "Altering graph schema");
        self.driver.alter(&op).await
    }

    /// Apply RDF schema text; empty text is not sent.
    pub async fn alter_schema(&self, rdf: &str) -> Result<()> {
        if rdf.trim().is_empty() {
            tracing::debug!("Schema text empty, nothing to alter");
            return Ok(());
        }
        self.alter(AlterOp::Schema(rdf.to_string())).await
    }

    /// Declare the predicates and types of record type `R`.
    pub async fn sync_schema<R: Record + 'static>(&self) -> Result<()> {
        let resolved = self.encoder.cache().of::<R>()?;
        self.alter_schema(&resolved.schema().rdf()).await
    }

    pub async fn drop_predicate(&self, name: &str) -> Result<()> {
        self.alter(AlterOp::DropPredicate(name.to_string())).await
    }

    pub async fn drop_type(&self, name: &str) -> Result<()> {
        self.alter(AlterOp::DropType(name.to_string())).await
    }

    pub async fn drop_data(&self) -> Result<()> {
        self.alter(AlterOp::DropData).await
    }

    pub async fn drop_all(&self) -> Result<()> {
        self.alter(AlterOp::DropAll).await
    }
}

/// Loggable form of an [`AlterOp`] without the schema body.
#[derive(Debug)]
enum AlterKind<'a> {
    Schema { bytes: usize },
    DropPredicate(&'a str),
    DropType(&'a str),
    DropData,
    DropAll,
}

impl<'a> From<&'a AlterOp> for AlterKind<'a> {
    fn from(op: &'a AlterOp) -> Self {
        match op {
            AlterOp::Schema(text) => Self::Schema { bytes: text.len() },
            AlterOp::DropPredicate(name) => Self::DropPredicate(name),
            AlterOp::DropType(name) => Self::DropType(name),
            AlterOp::DropData => Self::DropData,
            AlterOp::DropAll => Self::DropAll,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_contract() {
        let created = MutationResponse {
            assigned_ids: HashMap::from([("b1".to_string(), "0x10".to_string())]),
            touched_predicates: vec!["name".into()],
        };
        assert!(matches!(created.outcome(), Ok(MutationOutcome::Created(ids)) if ids["b1"] == "0x10"));

        let updated = MutationResponse {
            touched_predicates: vec!["name".into()],
            ..Default::default()
        };
        assert!(matches!(updated.outcome(), Ok(MutationOutcome::Updated(p)) if p == ["name"]));

        let nothing = MutationResponse::default();
        assert!(matches!(
            nothing.outcome(),
            Err(GraphError::Mapper(MapperError::NothingChanged))
        ));
    }

    #[test]
    fn test_response_parses_with_missing_fields() {
        let r: MutationResponse = serde_json::from_str(r#"{"assigned_ids":{"b1":"0x1"}}"#).unwrap();
        assert_eq!(r.assigned_ids["b1"], "0x1");
        assert!(r.touched_predicates.is_empty());
    }
}
