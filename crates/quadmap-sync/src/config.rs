//! Configuration for the quadmap-sync schema reconciler.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use quadmap_core::types::SYSTEM_PREFIX;
use quadmap_core::Schema;

use crate::error::{Result, SyncError};

/// How an alter plan is printed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Schema text ready for the store's alter call.
    #[default]
    Rdf,
    Json,
}

/// Top-level sync configuration.
///
/// Loaded from `quadmap.toml` `[sync]` section or `QUADMAP_SYNC__`
/// environment variables.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SyncConfig {
    /// JSON file with the declared predicates and types.
    #[serde(default = "default_declared_schema")]
    pub declared_schema: PathBuf,

    /// JSON file with the store's `schema {}` response. Without it the
    /// store is treated as empty.
    #[serde(default)]
    pub live_schema: Option<PathBuf>,

    #[serde(default)]
    pub format: OutputFormat,

    /// Drop live predicates the declared schema does not mention.
    #[serde(default)]
    pub drop_unlisted: bool,

    /// Live predicates and types with this prefix are ignored.
    #[serde(default = "default_system_prefix")]
    pub system_prefix: String,
}

fn default_declared_schema() -> PathBuf {
    PathBuf::from("schema.json")
}

fn default_system_prefix() -> String {
    SYSTEM_PREFIX.to_string()
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            declared_schema: default_declared_schema(),
            live_schema: None,
            format: OutputFormat::default(),
            drop_unlisted: false,
            system_prefix: default_system_prefix(),
        }
    }
}

impl SyncConfig {
    /// Load the `[sync]` section from `{file_prefix}.toml` and the environment.
    pub fn load(file_prefix: &str) -> Result<Self> {
        let cfg = config::Config::builder()
            .add_source(config::File::with_name(file_prefix).required(false))
            .add_source(
                config::Environment::with_prefix("QUADMAP")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| SyncError::Config(e.to_string()))?;

        match cfg.get::<SyncConfig>("sync") {
            Ok(c) => Ok(c),
            Err(config::ConfigError::NotFound(_)) => Ok(SyncConfig::default()),
            Err(e) => Err(SyncError::Config(e.to_string())),
        }
    }

    pub fn read_declared(&self) -> Result<Schema> {
        read_schema(&self.declared_schema)
    }

    /// The live schema without system entries; empty when no file is set.
    pub fn read_live(&self) -> Result<Schema> {
        match &self.live_schema {
            Some(path) => Ok(read_schema(path)?.without_prefix(&self.system_prefix)),
            None => Ok(Schema::default()),
        }
    }
}

/// Parse a schema JSON file.
pub fn read_schema(path: &Path) -> Result<Schema> {
    let bytes = std::fs::read(path).map_err(|source| SyncError::SchemaFile {
        path: path.to_path_buf(),
        source,
    })?;
    Schema::from_json(&bytes).map_err(|source| SyncError::SchemaParse {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = SyncConfig::default();
        assert_eq!(config.declared_schema, PathBuf::from("schema.json"));
        assert_eq!(config.format, OutputFormat::Rdf);
        assert!(!config.drop_unlisted);
        assert!(config.live_schema.is_none());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut file = std::fs::File::create(dir.path().join("sync.toml")).unwrap();
        writeln!(
            file,
            "[sync]\ndeclared_schema = \"declared.json\"\nformat = \"json\"\ndrop_unlisted = true"
        )
        .unwrap();

        let prefix = dir.path().join("sync");
        let config = SyncConfig::load(prefix.to_str().unwrap()).unwrap();
        assert_eq!(config.declared_schema, PathBuf::from("declared.json"));
        assert_eq!(config.format, OutputFormat::Json);
        assert!(config.drop_unlisted);
        assert_eq!(config.system_prefix, "dgraph.");
    }

    #[test]
    fn test_read_live_filters_system_entries() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("live.json");
        std::fs::write(
            &path,
            r#"{"schema":[{"predicate":"dgraph.type","type":"string"},{"predicate":"age","type":"int"}]}"#,
        )
        .unwrap();
        let config = SyncConfig {
            live_schema: Some(path),
            ..Default::default()
        };
        let live = config.read_live().unwrap();
        assert_eq!(live.predicates.len(), 1);
        assert_eq!(live.predicates[0].name, "age");
    }

    #[test]
    fn test_missing_schema_file_is_reported() {
        let config = SyncConfig {
            declared_schema: PathBuf::from("/nonexistent/declared.json"),
            ..Default::default()
        };
        assert!(matches!(
            config.read_declared(),
            Err(SyncError::SchemaFile { .. })
        ));
    }
}
