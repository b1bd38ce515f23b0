//! End-to-end reconciliation: schema files in, alter operations out.

use std::sync::Mutex;

use async_trait::async_trait;

use quadmap_core::{PredicateDescriptor, ScalarKind, Schema};
use quadmap_graph::client::Result;
use quadmap_graph::{
    AlterOp, AssembledRequest, GraphClient, GraphDriver, GraphError, MutationResponse,
};
use quadmap_sync::config::SyncConfig;
use quadmap_sync::diff::{reconcile, TypeStatus};
use quadmap_sync::plan::{apply_plan, AlterPlan};

#[derive(Default)]
struct AlterRecorder {
    alters: Mutex<Vec<AlterOp>>,
}

#[async_trait]
impl GraphDriver for AlterRecorder {
    async fn execute_query(&self, _query: &str) -> Result<Vec<u8>> {
        Err(GraphError::Driver("queries not supported".into()))
    }

    async fn execute_mutation(&self, _request: &AssembledRequest) -> Result<MutationResponse> {
        Err(GraphError::Driver("mutations not supported".into()))
    }

    async fn alter(&self, op: &AlterOp) -> Result<()> {
        self.alters.lock().unwrap().push(op.clone());
        Ok(())
    }
}

const DECLARED: &str = r#"{
  "schema": [
    {"predicate": "name", "type": "string", "index": true, "tokenizer": ["exact"]},
    {"predicate": "age", "type": "int", "index": true, "tokenizer": ["int"]}
  ],
  "types": [
    {"name": "Person", "fields": [{"name": "name"}, {"name": "age"}]}
  ]
}"#;

const LIVE: &str = r#"{
  "schema": [
    {"predicate": "dgraph.type", "type": "string", "index": true, "tokenizer": ["exact"], "list": true},
    {"predicate": "name", "type": "string", "index": true, "tokenizer": ["exact"]},
    {"predicate": "age", "type": "int"},
    {"predicate": "legacy", "type": "string"}
  ],
  "types": [
    {"name": "Person", "fields": [{"name": "name"}, {"name": "age"}]},
    {"name": "dgraph.graphql", "fields": [{"name": "dgraph.graphql.schema"}]}
  ]
}"#;

fn write_schemas(dir: &tempfile::TempDir) -> SyncConfig {
    let declared = dir.path().join("declared.json");
    let live = dir.path().join("live.json");
    std::fs::write(&declared, DECLARED).unwrap();
    std::fs::write(&live, LIVE).unwrap();
    SyncConfig {
        declared_schema: declared,
        live_schema: Some(live),
        ..Default::default()
    }
}

#[test]
fn test_missing_index_is_a_changed_predicate() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_schemas(&dir);
    let diff = reconcile(
        &config.read_declared().unwrap(),
        &config.read_live().unwrap(),
    );

    assert!(diff.predicates.missing.is_empty());
    assert_eq!(diff.predicates.changed.len(), 1);
    assert_eq!(diff.predicates.changed[0].name, "age");
    assert_eq!(diff.types[0].1, TypeStatus::Unchanged);
    assert_eq!(diff.unlisted, vec!["legacy"]);

    let plan = AlterPlan::from_diff(&diff, false);
    assert_eq!(plan.rdf(), "age: int @index(int) .");
}

#[test]
fn test_schema_reconciled_against_itself_is_clean() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_schemas(&dir);
    let declared = config.read_declared().unwrap();
    let diff = reconcile(&declared, &declared);
    assert!(diff.is_clean());
    assert!(AlterPlan::from_diff(&diff, true).is_empty());
}

#[tokio::test]
async fn test_empty_plan_sends_nothing() {
    let client = GraphClient::new(AlterRecorder::default());
    apply_plan(&client, &AlterPlan::default()).await.unwrap();
    assert!(client.driver().alters.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_plan_applies_schema_then_drops() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_schemas(&dir);
    let diff = reconcile(
        &config.read_declared().unwrap(),
        &config.read_live().unwrap(),
    );
    let plan = AlterPlan::from_diff(&diff, true);

    let client = GraphClient::new(AlterRecorder::default());
    apply_plan(&client, &plan).await.unwrap();

    let alters = client.driver().alters.lock().unwrap();
    assert_eq!(
        *alters,
        vec![
            AlterOp::Schema("age: int @index(int) .".into()),
            AlterOp::DropPredicate("legacy".into()),
        ]
    );
}

#[test]
fn test_new_type_against_empty_store() {
    let declared = Schema {
        predicates: vec![PredicateDescriptor::new("title", ScalarKind::String)],
        types: vec![],
    };
    let diff = reconcile(&declared, &Schema::default());
    assert_eq!(diff.summary.missing_predicates, 1);
    assert_eq!(AlterPlan::from_diff(&diff, false).rdf(), "title: string .");
}

#[test]
fn test_unsupported_live_kind_is_a_changed_predicate() {
    let live = Schema::from_json(
        br#"{"schema":[{"predicate":"name","type":"string"},{"predicate":"emb","type":"float32vector"}]}"#,
    )
    .unwrap();
    let declared = Schema {
        predicates: vec![
            PredicateDescriptor::new("name", ScalarKind::String),
            PredicateDescriptor::new("emb", ScalarKind::Float),
        ],
        types: vec![],
    };
    let diff = reconcile(&declared, &live);
    assert!(diff.predicates.missing.is_empty());
    assert_eq!(diff.predicates.changed.len(), 1);
    assert_eq!(diff.predicates.changed[0].name, "emb");
    assert_eq!(AlterPlan::from_diff(&diff, false).rdf(), "emb: float .");
}
