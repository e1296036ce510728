//! Hierarchical configuration
//!
//! Precedence, low to high:
//! 1. Built-in defaults
//! 2. `.env` in the working directory
//! 3. Config file (`~/.forger/config.yaml` or `--config`)
//! 4. Environment variables (`FORGER_*`)
//! 5. CLI flags (applied by the command)
//!
//! Static S3 keys are read from `AWS_ACCESS_ID` and `AWS_SECRET_KEY` in `.env`
//! or the environment, never from the config file.

use anyhow::{anyhow, bail, Context, Result};
use camino::{Utf8Path, Utf8PathBuf};
use forger_core::source::s3::{DEFAULT_BUCKET, DEFAULT_REGION};
use forger_core::{S3SourceConfig, DEFAULT_CONCURRENCY};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use tracing::{debug, warn};

/// Resolved settings
#[derive(Clone, PartialEq, Eq, Serialize)]
pub struct ForgerConfig {
    pub bucket: String,
    pub region: String,
    pub endpoint: Option<String>,
    pub prefix: String,
    pub concurrency: usize,
    pub template_dir: Option<Utf8PathBuf>,
    /// Stack catalog replacing the built-in one
    pub catalog: Option<Utf8PathBuf>,
    pub access_key_id: Option<String>,
    #[serde(skip)]
    pub secret_access_key: Option<String>,
}

impl fmt::Debug for ForgerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ForgerConfig")
            .field("bucket", &self.bucket)
            .field("region", &self.region)
            .field("endpoint", &self.endpoint)
            .field("prefix", &self.prefix)
            .field("concurrency", &self.concurrency)
            .field("template_dir", &self.template_dir)
            .field("catalog", &self.catalog)
            .field("access_key_id", &self.access_key_id)
            .field(
                "secret_access_key",
                &self.secret_access_key.as_ref().map(|_| "<redacted>"),
            )
            .finish()
    }
}

impl Default for ForgerConfig {
    fn default() -> Self {
        Self {
            bucket: DEFAULT_BUCKET.to_string(),
            region: DEFAULT_REGION.to_string(),
            endpoint: None,
            prefix: String::new(),
            concurrency: DEFAULT_CONCURRENCY,
            template_dir: None,
            catalog: None,
            access_key_id: None,
            secret_access_key: None,
        }
    }
}

impl ForgerConfig {
    pub fn s3_source_config(&self) -> S3SourceConfig {
        S3SourceConfig {
            bucket: self.bucket.clone(),
            region: self.region.clone(),
            endpoint: self.endpoint.clone(),
            prefix: self.prefix.clone(),
            access_key_id: self.access_key_id.clone(),
            secret_access_key: self.secret_access_key.clone(),
        }
    }

    fn merge_file(&mut self, file: FileConfig) {
        if let Some(bucket) = file.bucket {
            self.bucket = bucket;
        }
        if let Some(region) = file.region {
            self.region = region;
        }
        if file.endpoint.is_some() {
            self.endpoint = file.endpoint;
        }
        if let Some(prefix) = file.prefix {
            self.prefix = prefix;
        }
        if let Some(concurrency) = file.concurrency {
            self.concurrency = concurrency;
        }
        if file.template_dir.is_some() {
            self.template_dir = file.template_dir;
        }
        if file.catalog.is_some() {
            self.catalog = file.catalog;
        }
    }

    /// Apply `FORGER_*` and AWS key variables from `lookup`
    fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        if let Some(bucket) = get("FORGER_BUCKET") {
            self.bucket = bucket;
        }
        if let Some(region) = get("FORGER_REGION") {
            self.region = region;
        }
        if let Some(endpoint) = get("FORGER_ENDPOINT") {
            self.endpoint = Some(endpoint);
        }
        if let Some(prefix) = get("FORGER_PREFIX") {
            self.prefix = prefix;
        }
        if let Some(concurrency) = get("FORGER_CONCURRENCY") {
            self.concurrency = concurrency
                .trim()
                .parse()
                .with_context(|| format!("Invalid FORGER_CONCURRENCY: {}", concurrency))?;
        }
        if let Some(dir) = get("FORGER_TEMPLATE_DIR") {
            self.template_dir = Some(Utf8PathBuf::from(dir));
        }
        if let Some(catalog) = get("FORGER_CATALOG") {
            self.catalog = Some(Utf8PathBuf::from(catalog));
        }
        if let Some(id) = get("AWS_ACCESS_ID") {
            self.access_key_id = Some(id.trim().to_string());
        }
        if let Some(secret) = get("AWS_SECRET_KEY") {
            self.secret_access_key = Some(secret.trim().to_string());
        }

        Ok(())
    }

    /// Reject settings the engine cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.concurrency == 0 {
            bail!("Concurrency must be at least 1");
        }
        if self.bucket.trim().is_empty() {
            bail!("Template bucket must not be empty");
        }
        Ok(())
    }
}

/// On-disk config file; every field optional
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileConfig {
    bucket: Option<String>,
    region: Option<String>,
    endpoint: Option<String>,
    prefix: Option<String>,
    concurrency: Option<usize>,
    template_dir: Option<Utf8PathBuf>,
    catalog: Option<Utf8PathBuf>,
}

/// Configuration hierarchy loader
pub struct ConfigLoader {
    config_path: Option<Utf8PathBuf>,
    explicit: bool,
    dotenv_path: Option<PathBuf>,
}

impl ConfigLoader {
    /// Loader for the standard locations, or an explicit `--config` file
    pub fn new(explicit: Option<&Utf8Path>) -> Self {
        let (config_path, explicit) = match explicit {
            Some(path) => (Some(path.to_path_buf()), true),
            None => (default_config_path(), false),
        };
        Self {
            config_path,
            explicit,
            dotenv_path: Some(PathBuf::from(".env")),
        }
    }

    /// Use a different `.env` file, or none
    pub fn with_dotenv(mut self, path: Option<PathBuf>) -> Self {
        self.dotenv_path = path;
        self
    }

    pub fn load(&self) -> Result<ForgerConfig> {
        let mut config = ForgerConfig::default();

        let dotenv = self.read_dotenv();
        config.apply_env(|name| dotenv.get(name).cloned())?;

        if let Some(path) = &self.config_path {
            if path.exists() {
                debug!("Loading config from {}", path);
                config.merge_file(load_yaml_file(path)?);
            } else if self.explicit {
                return Err(anyhow!("Config file not found: {}", path));
            }
        }

        config.apply_env(|name| std::env::var(name).ok())?;
        config.validate()?;

        Ok(config)
    }

    /// `.env` entries, without touching the process environment
    fn read_dotenv(&self) -> HashMap<String, String> {
        let Some(path) = &self.dotenv_path else {
            return HashMap::new();
        };

        match dotenvy::from_path_iter(path) {
            Ok(iter) => iter
                .filter_map(|item| match item {
                    Ok(pair) => Some(pair),
                    Err(e) => {
                        warn!("Ignoring malformed line in {}: {}", path.display(), e);
                        None
                    }
                })
                .collect(),
            Err(e) if e.not_found() => HashMap::new(),
            Err(e) => {
                warn!("Could not read {}: {}", path.display(), e);
                HashMap::new()
            }
        }
    }
}

/// Get the forger configuration directory (~/.forger)
///
/// Prefers HOME over dirs::home_dir() so overrides in containers apply.
pub fn forger_dir() -> Option<Utf8PathBuf> {
    let home = std::env::var("HOME")
        .ok()
        .map(PathBuf::from)
        .or_else(dirs::home_dir)?;
    Utf8PathBuf::from_path_buf(home)
        .ok()
        .map(|home| home.join(".forger"))
}

fn default_config_path() -> Option<Utf8PathBuf> {
    forger_dir().map(|dir| dir.join("config.yaml"))
}

fn load_yaml_file(path: &Utf8Path) -> Result<FileConfig> {
    let content =
        std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path))?;
    if content.trim().is_empty() {
        return Ok(FileConfig::default());
    }
    serde_yaml_ng::from_str(&content).with_context(|| format!("Failed to parse {}", path))
}
