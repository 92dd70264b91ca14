//! Application configuration for tallycheck.
//!
//! User config lives at `~/.tallycheck/tallycheck.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Result, TallycheckError};
use crate::types::Tier;

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "tallycheck.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".tallycheck";

// ---------------------------------------------------------------------------
// Config structs (matching tallycheck.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Global defaults.
    #[serde(default)]
    pub defaults: DefaultsConfig,

    /// Page markup markers.
    #[serde(default)]
    pub extract: ExtractConfig,

    /// File name patterns selecting each tier's documents.
    #[serde(default)]
    pub tiers: TiersConfig,
}

/// How a repeated (path, label) write is resolved while merging fragments.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MergePolicy {
    /// The later write replaces the earlier count.
    #[default]
    Overwrite,
    /// The first count is kept; differing later writes are rejected.
    Strict,
}

/// `[defaults]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefaultsConfig {
    /// Directory holding the downloaded pages.
    #[serde(default = "default_page_dir")]
    pub page_dir: String,

    /// Directory receiving CSVs and logs.
    #[serde(default = "default_results_dir")]
    pub results_dir: String,

    /// Whether to cross-check totals between tiers.
    #[serde(default = "default_true")]
    pub cross_validate: bool,

    /// Maximum documents parsed at once.
    #[serde(default = "default_concurrency")]
    pub concurrency: u32,

    /// Merge policy for repeated (path, label) writes.
    #[serde(default)]
    pub merge_policy: MergePolicy,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            page_dir: default_page_dir(),
            results_dir: default_results_dir(),
            cross_validate: true,
            concurrency: default_concurrency(),
            merge_policy: MergePolicy::default(),
        }
    }
}

fn default_page_dir() -> String {
    "download/".into()
}
fn default_results_dir() -> String {
    "results/".into()
}
fn default_true() -> bool {
    true
}
fn default_concurrency() -> u32 {
    4
}

/// `[extract]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractConfig {
    /// Substring marking a description row as a section heading, not a metric.
    #[serde(default = "default_section_marker")]
    pub section_marker: String,

    /// Substring of a header link target that marks it as a location link.
    #[serde(default = "default_location_marker")]
    pub location_marker: String,

    /// Leaf name used for pages that only carry row totals.
    #[serde(default = "default_sum_leaf")]
    pub sum_leaf: String,

    /// Header link texts containing any of these are site chrome, not locations.
    #[serde(default = "default_stop_words")]
    pub stop_words: Vec<String>,
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            section_marker: default_section_marker(),
            location_marker: default_location_marker(),
            sum_leaf: default_sum_leaf(),
            stop_words: default_stop_words(),
        }
    }
}

fn default_section_marker() -> String {
    "ИЗБИРАТЕЛЬНАЯ".into()
}
fn default_location_marker() -> String {
    "region".into()
}
fn default_sum_leaf() -> String {
    "Sum".into()
}
fn default_stop_words() -> Vec<String> {
    vec![
        "ЦИК России".into(),
        "Выборы и референдумы".into(),
        "сайт избирательной".into(),
    ]
}

/// `[tiers]` section: file name substrings selecting each tier.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TiersConfig {
    #[serde(default = "default_top")]
    pub top: String,

    #[serde(default = "default_territorial")]
    pub territorial: String,

    #[serde(default = "default_precinct")]
    pub precinct: String,

    /// Used for the precinct tier when the primary pattern yields no data.
    #[serde(default = "default_precinct_fallback")]
    pub precinct_fallback: String,
}

impl Default for TiersConfig {
    fn default() -> Self {
        Self {
            top: default_top(),
            territorial: default_territorial(),
            precinct: default_precinct(),
            precinct_fallback: default_precinct_fallback(),
        }
    }
}

fn default_top() -> String {
    "root".into()
}
fn default_territorial() -> String {
    "first-".into()
}
fn default_precinct() -> String {
    "second-".into()
}
fn default_precinct_fallback() -> String {
    "third-".into()
}

impl TiersConfig {
    /// Primary file name pattern for `tier`.
    pub fn pattern(&self, tier: Tier) -> &str {
        match tier {
            Tier::Top => &self.top,
            Tier::Territorial => &self.territorial,
            Tier::Precinct => &self.precinct,
        }
    }

    /// CSV file name written for `tier`.
    pub fn csv_name(tier: Tier) -> String {
        format!("output-{tier}.csv")
    }
}

// ---------------------------------------------------------------------------
// Run config (runtime, merged from config + CLI flags)
// ---------------------------------------------------------------------------

/// Runtime configuration for one corpus run, merged from config file + CLI flags.
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Directory holding the downloaded pages.
    pub page_dir: PathBuf,
    /// Directory receiving CSVs and logs.
    pub results_dir: PathBuf,
    /// Whether to cross-check totals between tiers.
    pub cross_validate: bool,
    /// Maximum documents parsed at once.
    pub concurrency: usize,
    /// Merge policy for repeated (path, label) writes.
    pub merge_policy: MergePolicy,
    /// Page markup markers.
    pub extract: ExtractConfig,
    /// Tier file name patterns.
    pub tiers: TiersConfig,
}

impl From<&AppConfig> for RunConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            page_dir: PathBuf::from(&config.defaults.page_dir),
            results_dir: PathBuf::from(&config.defaults.results_dir),
            cross_validate: config.defaults.cross_validate,
            concurrency: config.defaults.concurrency.max(1) as usize,
            merge_policy: config.defaults.merge_policy,
            extract: config.extract.clone(),
            tiers: config.tiers.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.tallycheck/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| TallycheckError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.tallycheck/tallycheck.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| TallycheckError::io(path, e))?;

    toml::from_str(&content).map_err(|e| {
        TallycheckError::config(format!("failed to parse {}: {e}", path.display()))
    })
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| TallycheckError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| TallycheckError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| TallycheckError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_serializes() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize default config");
        assert!(toml_str.contains("page_dir"));
        assert!(toml_str.contains("merge_policy = \"overwrite\""));
        assert!(toml_str.contains("location_marker = \"region\""));
    }

    #[test]
    fn partial_config_fills_defaults() {
        let toml_str = r#"
[defaults]
results_dir = "/tmp/out"
merge_policy = "strict"

[extract]
stop_words = ["Home"]
"#;
        let config: AppConfig = toml::from_str(toml_str).expect("parse");
        assert_eq!(config.defaults.results_dir, "/tmp/out");
        assert_eq!(config.defaults.page_dir, "download/");
        assert_eq!(config.defaults.merge_policy, MergePolicy::Strict);
        assert_eq!(config.extract.stop_words, vec!["Home".to_string()]);
        assert_eq!(config.extract.sum_leaf, "Sum");
        assert_eq!(config.tiers.precinct_fallback, "third-");
    }

    #[test]
    fn unknown_merge_policy_is_rejected() {
        let err = toml::from_str::<AppConfig>("[defaults]\nmerge_policy = \"additive\"\n");
        assert!(err.is_err());
    }

    #[test]
    fn run_config_from_app_config() {
        let mut app = AppConfig::default();
        app.defaults.concurrency = 0;
        let run = RunConfig::from(&app);
        assert_eq!(run.concurrency, 1);
        assert!(run.cross_validate);
        assert_eq!(run.page_dir, PathBuf::from("download/"));
        assert_eq!(run.tiers.pattern(Tier::Territorial), "first-");
    }

    #[test]
    fn csv_names_follow_tier() {
        assert_eq!(TiersConfig::csv_name(Tier::Precinct), "output-precinct.csv");
    }

    #[test]
    fn load_config_from_reports_path_on_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(&path, "[defaults\nconcurrency = 2\n").unwrap();

        let err = load_config_from(&path).unwrap_err();
        assert!(matches!(err, TallycheckError::Config { .. }));
        assert!(err.to_string().contains(CONFIG_FILE_NAME));

        std::fs::write(&path, "[defaults]\nconcurrency = 2\n").unwrap();
        let config = load_config_from(&path).unwrap();
        assert_eq!(config.defaults.concurrency, 2);
    }
}
