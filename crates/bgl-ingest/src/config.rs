//! Load configuration
//!
//! A YAML manifest describes which providers to load and where their release
//! files live, plus engine tuning. Environment variables prefixed `BGL`
//! override any field (`BGL__SETTINGS__WORKERS=8`).

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Default rows per bulk transaction.
pub const DEFAULT_COMMIT_CHUNK_SIZE: u64 = 10_000;

/// Default entities per extractor batch.
pub const DEFAULT_BATCH_SIZE: usize = 5_000;

/// Default primary queue bound.
pub const DEFAULT_QUEUE_CAPACITY: usize = 100;

fn default_staging_dir() -> PathBuf {
    PathBuf::from("./staging")
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./data")
}

fn default_workers() -> usize {
    num_cpus_default()
}

fn num_cpus_default() -> usize {
    // the engine clamps again; this only seeds the manifest default
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4)
        .clamp(2, 8)
}

fn default_queue_capacity() -> usize {
    DEFAULT_QUEUE_CAPACITY
}

fn default_batch_size() -> usize {
    DEFAULT_BATCH_SIZE
}

fn default_commit_chunk_size() -> u64 {
    DEFAULT_COMMIT_CHUNK_SIZE
}

fn default_max_attempts() -> u32 {
    5
}

/// Engine and staging tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoadSettings {
    #[serde(default = "default_staging_dir")]
    pub staging_dir: PathBuf,

    /// Where downloaded release files land.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    #[serde(default = "default_workers")]
    pub workers: usize,

    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,

    /// Entities per extractor batch.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Rows per bulk transaction (one load job per chunk).
    #[serde(default = "default_commit_chunk_size")]
    pub commit_chunk_size: u64,

    /// Attempts before a transient write failure is dead-lettered.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
}

impl Default for LoadSettings {
    fn default() -> Self {
        Self {
            staging_dir: default_staging_dir(),
            data_dir: default_data_dir(),
            workers: default_workers(),
            queue_capacity: default_queue_capacity(),
            batch_size: default_batch_size(),
            commit_chunk_size: default_commit_chunk_size(),
            max_attempts: default_max_attempts(),
        }
    }
}

/// Where one release file comes from: a local path, a URL, or both
/// (path as the cache target).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SourceLocation {
    #[serde(default)]
    pub path: Option<PathBuf>,

    #[serde(default)]
    pub url: Option<String>,

    /// Optional SHA-256 of the (decompressed) file.
    #[serde(default)]
    pub sha256: Option<String>,
}

impl SourceLocation {
    pub fn is_empty(&self) -> bool {
        self.path.is_none() && self.url.is_none()
    }
}

/// One ontology to load before any provider data references its terms.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OntologyConfig {
    /// Short name used in relation files, e.g. "do", "so".
    pub name: String,
    pub source: SourceLocation,
}

/// One model-organism provider ("sub-type" of the load).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Provider code, e.g. "FB", "MGI", "ZFIN".
    pub name: String,

    /// NCBI taxon of the provider's organism, e.g. "NCBITaxon:7227".
    #[serde(default)]
    pub taxon_id: Option<String>,

    #[serde(default)]
    pub genes: Option<SourceLocation>,

    #[serde(default)]
    pub alleles: Option<SourceLocation>,

    #[serde(default)]
    pub disease: Option<SourceLocation>,

    #[serde(default)]
    pub orthology: Option<SourceLocation>,
}

/// Top-level manifest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoadConfig {
    #[serde(default)]
    pub settings: LoadSettings,

    #[serde(default)]
    pub ontologies: Vec<OntologyConfig>,

    #[serde(default)]
    pub providers: Vec<ProviderConfig>,
}

impl LoadConfig {
    /// Load the manifest from a YAML file, then apply `BGL`-prefixed
    /// environment overrides.
    pub fn from_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let config = config::Config::builder()
            .add_source(config::File::from(path))
            .add_source(config::Environment::with_prefix("BGL").separator("__"))
            .build()?;
        let loaded: LoadConfig = config.try_deserialize()?;
        Ok(loaded)
    }

    /// Validate the manifest, collecting every problem instead of stopping
    /// at the first.
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut problems = Vec::new();

        if self.settings.batch_size == 0 {
            problems.push("settings.batch_size must be positive".to_string());
        }
        if self.settings.commit_chunk_size == 0 {
            problems.push("settings.commit_chunk_size must be positive".to_string());
        }
        if self.settings.workers == 0 {
            problems.push("settings.workers must be positive".to_string());
        }
        if self.settings.queue_capacity == 0 {
            problems.push("settings.queue_capacity must be positive".to_string());
        }

        let mut seen = HashSet::new();
        for provider in &self.providers {
            if !seen.insert(provider.name.as_str()) {
                problems.push(format!("duplicate provider name: {}", provider.name));
            }
            for (datatype, source) in [
                ("genes", &provider.genes),
                ("alleles", &provider.alleles),
                ("disease", &provider.disease),
                ("orthology", &provider.orthology),
            ] {
                if let Some(source) = source {
                    if source.is_empty() {
                        problems.push(format!(
                            "provider {}: {datatype} source has neither path nor url",
                            provider.name
                        ));
                    }
                }
            }
        }

        let mut seen = HashSet::new();
        for ontology in &self.ontologies {
            if !seen.insert(ontology.name.as_str()) {
                problems.push(format!("duplicate ontology name: {}", ontology.name));
            }
            if ontology.source.is_empty() {
                problems.push(format!(
                    "ontology {}: source has neither path nor url",
                    ontology.name
                ));
            }
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(problems)
        }
    }
}
