//! Alter plans: what to send to the store to converge on the declared schema.

use serde::Serialize;

use quadmap_core::{Schema, TypeDescriptor};
use quadmap_graph::{GraphClient, GraphDriver};

use crate::config::OutputFormat;
use crate::diff::{SchemaDiff, TypeStatus};
use crate::error::Result;

/// Definitions to apply and predicates to drop.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AlterPlan {
    pub schema: Schema,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub drops: Vec<String>,
}

impl AlterPlan {
    /// Build the plan for `diff`.
    ///
    /// Changed types keep the fields the live type already has, so fields
    /// added elsewhere survive the alter. With `drop_unlisted`, live
    /// predicates the declared schema does not mention are dropped.
    pub fn from_diff(diff: &SchemaDiff, drop_unlisted: bool) -> Self {
        let mut predicates = diff.predicates.missing.clone();
        predicates.extend(diff.predicates.changed.iter().cloned());

        let types = diff
            .types
            .iter()
            .filter_map(|(declared, status)| match status {
                TypeStatus::Unchanged => None,
                TypeStatus::Missing => Some(declared.clone()),
                TypeStatus::Changed => {
                    let mut fields = declared.fields.clone();
                    if let Some(live) = diff.live_types.iter().find(|t| t.name == declared.name) {
                        fields.extend(live.fields.iter().cloned());
                    }
                    Some(TypeDescriptor::new(declared.name.clone(), fields))
                }
            })
            .collect();

        let drops = if drop_unlisted {
            diff.unlisted.clone()
        } else {
            Vec::new()
        };

        Self {
            schema: Schema { predicates, types },
            drops,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.schema.is_empty() && self.drops.is_empty()
    }

    /// RDF schema text of the definitions.
    pub fn rdf(&self) -> String {
        self.schema.rdf()
    }

    pub fn render(&self, format: OutputFormat) -> Result<String> {
        match format {
            OutputFormat::Rdf => {
                let mut out = self.rdf();
                for name in &self.drops {
                    if !out.is_empty() {
                        out.push('\n');
                    }
                    out.push_str(&format!("# drop {name}"));
                }
                Ok(out)
            }
            OutputFormat::Json => Ok(serde_json::to_string_pretty(self)?),
        }
    }
}

/// Send `plan` through the client. An empty plan sends nothing.
pub async fn apply_plan<D: GraphDriver>(client: &GraphClient<D>, plan: &AlterPlan) -> Result<()> {
    if plan.is_empty() {
        tracing::info!("Schema already up to date");
        return Ok(());
    }

    client.alter_schema(&plan.rdf()).await?;
    for name in &plan.drops {
        client.drop_predicate(name).await?;
    }

    tracing::info!(
        predicates = plan.schema.predicates.len(),
        types = plan.schema.types.len(),
        dropped = plan.drops.len(),
        "Applied schema plan"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diff::reconcile;
    use quadmap_core::{PredicateDescriptor, ScalarKind};

    fn declared() -> Schema {
        Schema {
            predicates: vec![
                PredicateDescriptor::new("name", ScalarKind::String).with_index(["exact"]),
                PredicateDescriptor::new("age", ScalarKind::Int),
            ],
            types: vec![TypeDescriptor::new(
                "Person",
                vec!["name".into(), "age".into()],
            )],
        }
    }

    #[test]
    fn test_plan_against_empty_store_declares_everything() {
        let plan = AlterPlan::from_diff(&reconcile(&declared(), &Schema::default()), false);
        assert_eq!(
            plan.rdf(),
            "name: string @index(exact) .\nage: int .\ntype Person {\n\tname\n\tage\n}"
        );
    }

    #[test]
    fn test_changed_type_keeps_live_fields() {
        let live = Schema {
            predicates: declared().predicates,
            types: vec![TypeDescriptor::new(
                "Person",
                vec!["name".into(), "nickname".into()],
            )],
        };
        let plan = AlterPlan::from_diff(&reconcile(&declared(), &live), false);
        assert!(plan.schema.predicates.is_empty());
        assert_eq!(plan.schema.types[0].fields, vec!["name", "age", "nickname"]);
    }

    #[test]
    fn test_unlisted_predicates_dropped_only_on_request() {
        let mut live = declared();
        live.predicates
            .push(PredicateDescriptor::new("legacy", ScalarKind::String));
        let diff = reconcile(&declared(), &live);

        assert!(AlterPlan::from_diff(&diff, false).is_empty());

        let plan = AlterPlan::from_diff(&diff, true);
        assert_eq!(plan.drops, vec!["legacy"]);
        assert_eq!(plan.render(OutputFormat::Rdf).unwrap(), "# drop legacy");
    }

    #[test]
    fn test_json_render() {
        let plan = AlterPlan::from_diff(&reconcile(&declared(), &Schema::default()), false);
        let json: serde_json::Value =
            serde_json::from_str(&plan.render(OutputFormat::Json).unwrap()).unwrap();
        assert_eq!(json["schema"]["schema"][0]["predicate"], "name");
        assert_eq!(json["schema"]["types"][0]["name"], "Person");
        assert!(json.get("drops").is_none());
    }
}
