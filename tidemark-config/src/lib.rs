//! Run configuration for tidemark: YAML file + environment overlays.
//!
//! Precedence is file first, then `TIDEMARK__`-prefixed environment
//! variables (`__` separates nesting levels, so `TIDEMARK__API__BASE_URL`
//! overrides `api.base_url`). After merging, `${VAR}` placeholders inside
//! string values are expanded recursively with a depth cap, so a config
//! file can say `credentials_file: "${CREDENTIALS_DIR}/twitter.json"`.
//!
//! Every field has a default, so a run with no config file at all falls
//! back to the original flat-file names in the working directory.

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use serde_json::Value;
use std::path::Path;

const MAX_EXPANSION_PASSES: usize = 8;

/// Top-level configuration for one tidemark run.
#[derive(Debug, Clone, Deserialize)]
pub struct TidemarkConfig {
    /// JSON descriptor holding the four OAuth 1.0a credential strings.
    #[serde(default = "default_credentials_file")]
    pub credentials_file: String,
    /// Reference CSV with the `Source` column listing domains to search.
    #[serde(default = "default_reference_file")]
    pub reference_file: String,
    /// Where the flattened per-post rows are written.
    #[serde(default = "default_raw_output_file")]
    pub raw_output_file: String,
    /// Where the one-shot joined summary is written.
    #[serde(default = "default_summary_output_file")]
    pub summary_output_file: String,
    #[serde(default)]
    pub api: ApiSection,
    #[serde(default)]
    pub log: LogSection,
}

impl Default for TidemarkConfig {
    fn default() -> Self {
        Self {
            credentials_file: default_credentials_file(),
            reference_file: default_reference_file(),
            raw_output_file: default_raw_output_file(),
            summary_output_file: default_summary_output_file(),
            api: ApiSection::default(),
            log: LogSection::default(),
        }
    }
}

/// Search API endpoint settings.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiSection {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// When the API reports an exhausted rate limit, sleep until the
    /// window resets instead of failing the request.
    #[serde(default = "default_true")]
    pub wait_on_rate_limit: bool,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ApiSection {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            wait_on_rate_limit: true,
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Logging settings, mapped onto `tidemark_common::observability`.
#[derive(Debug, Clone, Deserialize)]
pub struct LogSection {
    /// Log directory; `None` defers to `TIDEMARK_LOG_DIR` or the
    /// per-user data directory.
    #[serde(default)]
    pub dir: Option<String>,
    /// Mirror log events to stderr.
    #[serde(default)]
    pub stderr: bool,
    /// `text` or `json`.
    #[serde(default = "default_log_format")]
    pub format: String,
    /// Filter applied when `RUST_LOG` is unset.
    #[serde(default = "default_log_filter")]
    pub filter: String,
}

impl Default for LogSection {
    fn default() -> Self {
        Self {
            dir: None,
            stderr: false,
            format: default_log_format(),
            filter: default_log_filter(),
        }
    }
}

fn default_credentials_file() -> String {
    "twitter_credentials.json".into()
}
fn default_reference_file() -> String {
    "consensus.csv".into()
}
fn default_raw_output_file() -> String {
    "popularity_tweets.csv".into()
}
fn default_summary_output_file() -> String {
    "popularity.csv".into()
}
fn default_base_url() -> String {
    "https://api.twitter.com".into()
}
fn default_true() -> bool {
    true
}
fn default_timeout_secs() -> u64 {
    30
}
fn default_log_format() -> String {
    "text".into()
}
fn default_log_filter() -> String {
    "info".into()
}

fn expand_env_string(raw: &str) -> String {
    let mut cur = raw.to_string();
    // Re-expand until a fixed point so values referencing other variables
    // resolve fully; the pass cap keeps cycles from spinning forever.
    for _ in 0..MAX_EXPANSION_PASSES {
        let expanded = match shellexpand::env(&cur) {
            Ok(cow) => cow.into_owned(),
            Err(_) => cur.clone(),
        };
        if expanded == cur {
            break;
        }
        cur = expanded;
    }
    cur
}

fn expand_env_in_value(v: &mut Value) {
    match v {
        Value::String(s) => {
            if s.contains('$') {
                *s = expand_env_string(s);
            }
        }
        Value::Array(arr) => arr.iter_mut().for_each(expand_env_in_value),
        Value::Object(obj) => obj.values_mut().for_each(expand_env_in_value),
        _ => {}
    }
}

/// Builder hiding the `config` crate wiring (file + env overrides).
pub struct TidemarkConfigLoader {
    builder: config::ConfigBuilder<config::builder::DefaultState>,
}

impl Default for TidemarkConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl TidemarkConfigLoader {
    /// Start with the `TIDEMARK__` environment overlay attached.
    ///
    /// ```
    /// use tidemark_config::TidemarkConfigLoader;
    ///
    /// let cfg = TidemarkConfigLoader::new().load().expect("defaults load");
    /// assert_eq!(cfg.reference_file, "consensus.csv");
    /// assert_eq!(cfg.api.base_url, "https://api.twitter.com");
    /// assert!(cfg.api.wait_on_rate_limit);
    /// ```
    pub fn new() -> Self {
        let builder =
            Config::builder().add_source(Environment::with_prefix("TIDEMARK").separator("__"));
        Self { builder }
    }

    /// Attach a config file; the `config` crate infers the format from
    /// the suffix. The file must exist: callers decide whether a missing
    /// default path is acceptable before calling this.
    pub fn with_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.builder = self
            .builder
            .add_source(File::from(path.as_ref()).required(true));
        self
    }

    /// Merge an inline YAML snippet (tests, CLI overrides).
    ///
    /// ```
    /// use tidemark_config::TidemarkConfigLoader;
    ///
    /// let cfg = TidemarkConfigLoader::new()
    ///     .with_yaml_str("reference_file: sources.csv\napi:\n  timeout_secs: 5")
    ///     .load()
    ///     .unwrap();
    ///
    /// assert_eq!(cfg.reference_file, "sources.csv");
    /// assert_eq!(cfg.api.timeout_secs, 5);
    /// // Untouched fields keep their defaults.
    /// assert_eq!(cfg.raw_output_file, "popularity_tweets.csv");
    /// ```
    pub fn with_yaml_str(mut self, yaml: &str) -> Self {
        self.builder = self
            .builder
            .add_source(File::from_str(yaml, config::FileFormat::Yaml));
        self
    }

    /// Merge all sources, expand `${VAR}` placeholders, and deserialize.
    pub fn load(self) -> Result<TidemarkConfig, ConfigError> {
        let cfg = self.builder.build()?;

        // Through serde_json::Value first so expansion can walk nested
        // strings before the typed deserialize.
        let mut v: Value = cfg.try_deserialize()?;
        expand_env_in_value(&mut v);

        let typed: TidemarkConfig =
            serde_json::from_value(v).map_err(|e| ConfigError::Message(e.to_string()))?;

        Ok(typed)
    }
}
