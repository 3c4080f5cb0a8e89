//! Configuration loading from TOML files

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

use ngramflow_core::indexer::BackendCommand;
use ngramflow_core::retry::RetryPolicy;
use ngramflow_ingest::worklist::BooksTemplate;
use ngramflow_ingest::PipelineConfig;

/// Global configuration for ngramflow
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub backend: BackendConfig,
    pub pipeline: PipelineSection,
    pub books: BooksSection,
}

/// How to launch the indexing backend in each of its modes.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    pub program: String,
    pub args: Vec<String>,
    /// Class for bulk ingest mode
    pub ingest_class: String,
    /// Class for pipelined query mode
    pub query_class: String,
    /// Class for the retrieval timing harness
    pub timing_class: String,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            program: "java".to_string(),
            args: vec!["-cp".to_string(), "lib/*".to_string()],
            ingest_class: "org.apache.lucene.ngram.IndexNgramFeatures".to_string(),
            query_class: "org.apache.lucene.ngram.ExtractNgramFeatures".to_string(),
            timing_class: "org.apache.lucene.ngram.ExtractNgrams".to_string(),
        }
    }
}

impl BackendConfig {
    fn command(&self, class: &str, index: &Path) -> BackendCommand {
        BackendCommand::new(&self.program)
            .args(self.args.iter().cloned())
            .arg(class)
            .arg("-index")
            .arg(index.display().to_string())
    }

    pub fn ingest_command(&self, index: &Path) -> BackendCommand {
        self.command(&self.ingest_class, index)
    }

    pub fn query_command(&self, index: &Path) -> BackendCommand {
        self.command(&self.query_class, index)
    }

    pub fn timing_command(&self, index: &Path) -> BackendCommand {
        self.command(&self.timing_class, index)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PipelineSection {
    pub ledger: PathBuf,
    pub queue_depth: usize,
    pub retry_delay_secs: u64,
    pub shutdown_grace_secs: u64,
}

impl Default for PipelineSection {
    fn default() -> Self {
        Self {
            ledger: PathBuf::from("paths_done"),
            queue_depth: 4,
            retry_delay_secs: 60,
            shutdown_grace_secs: 30,
        }
    }
}

impl PipelineSection {
    pub fn pipeline_config(&self) -> PipelineConfig {
        PipelineConfig {
            ledger_path: self.ledger.clone(),
            queue_depth: self.queue_depth,
            retry: RetryPolicy {
                delay: Duration::from_secs(self.retry_delay_secs),
                max_attempts: None,
            },
            shutdown_grace: Duration::from_secs(self.shutdown_grace_secs),
            interactive: true,
        }
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_secs(self.shutdown_grace_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BooksSection {
    pub base_url: String,
    pub corpus: String,
    pub version: String,
}

impl Default for BooksSection {
    fn default() -> Self {
        let t = BooksTemplate::default();
        Self {
            base_url: t.base_url,
            corpus: t.corpus,
            version: t.version,
        }
    }
}

impl BooksSection {
    pub fn template(&self) -> BooksTemplate {
        BooksTemplate {
            base_url: self.base_url.clone(),
            corpus: self.corpus.clone(),
            version: self.version.clone(),
        }
    }
}

impl Config {
    /// Load configuration from default locations
    ///
    /// Search order:
    /// 1. ./ngramflow.toml (current directory)
    /// 2. ~/.config/ngramflow/config.toml
    ///
    /// If no config file found, returns default config.
    pub fn load() -> Result<Self> {
        let local_config = PathBuf::from("ngramflow.toml");
        if local_config.exists() {
            return Self::from_file(&local_config);
        }

        if let Some(dirs) = directories::ProjectDirs::from("", "", "ngramflow") {
            let user_config = dirs.config_dir().join("config.toml");
            if user_config.exists() {
                return Self::from_file(&user_config);
            }
        }

        Ok(Self::default())
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        toml::from_str(&text)
            .with_context(|| format!("failed to parse config {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_values() {
        let config = Config::default();
        assert_eq!(config.backend.program, "java");
        assert_eq!(config.pipeline.queue_depth, 4);
        assert_eq!(config.pipeline.retry_delay_secs, 60);
        assert_eq!(config.pipeline.ledger, PathBuf::from("paths_done"));
    }

    #[test]
    fn ingest_command_shape() {
        let config = Config::default();
        let cmd = config.backend.ingest_command(Path::new("index_features"));
        assert_eq!(
            format!("{cmd}"),
            "java -cp lib/* org.apache.lucene.ngram.IndexNgramFeatures -index index_features"
        );
    }

    #[test]
    fn partial_toml_overrides_only_named_fields() {
        let config: Config = toml::from_str(
            r#"
            [pipeline]
            queue_depth = 8

            [books]
            corpus = "fre-all"
            "#,
        )
        .unwrap();

        assert_eq!(config.pipeline.queue_depth, 8);
        assert_eq!(config.pipeline.retry_delay_secs, 60);
        assert_eq!(config.books.corpus, "fre-all");
        assert_eq!(config.backend.program, "java");
    }

    #[test]
    fn from_file_roundtrip() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("ngramflow.toml");
        std::fs::write(&path, "[backend]\nprogram = \"/usr/bin/java\"\n").unwrap();

        let config = Config::from_file(&path).unwrap();
        assert_eq!(config.backend.program, "/usr/bin/java");
    }

    #[test]
    fn pipeline_config_conversion() {
        let section = PipelineSection {
            retry_delay_secs: 5,
            ..Default::default()
        };
        let pc = section.pipeline_config();
        assert_eq!(pc.retry.delay, Duration::from_secs(5));
        assert!(pc.retry.max_attempts.is_none());
        assert!(pc.interactive);
    }
}
