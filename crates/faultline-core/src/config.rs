use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::FaultlineError;

/// Top-level configuration loaded from `.faultline.toml`.
///
/// Every field has a default so a missing or partial file is fine.
///
/// # Examples
///
/// ```
/// use faultline_core::FaultlineConfig;
///
/// let config = FaultlineConfig::default();
/// assert_eq!(config.git.max_concurrency, 6);
/// assert_eq!(config.hotspots.top_n, 10);
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FaultlineConfig {
    /// Accessor and subprocess settings.
    #[serde(default)]
    pub git: GitConfig,
    /// Change-analysis settings.
    #[serde(default)]
    pub analysis: AnalysisConfig,
    /// Hotspot scan settings.
    #[serde(default)]
    pub hotspots: HotspotConfig,
}

impl FaultlineConfig {
    /// Load configuration from a TOML file at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`FaultlineError::Io`] if the file cannot be read, or
    /// [`FaultlineError::Toml`] if the content is not valid TOML.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use faultline_core::FaultlineConfig;
    /// use std::path::Path;
    ///
    /// let config = FaultlineConfig::from_file(Path::new(".faultline.toml")).unwrap();
    /// ```
    pub fn from_file(path: &Path) -> Result<Self, FaultlineError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns [`FaultlineError::Toml`] if parsing fails.
    ///
    /// # Examples
    ///
    /// ```
    /// use faultline_core::FaultlineConfig;
    ///
    /// let toml = r#"
    /// [hotspots]
    /// top_n = 5
    /// "#;
    /// let config = FaultlineConfig::from_toml(toml).unwrap();
    /// assert_eq!(config.hotspots.top_n, 5);
    /// ```
    pub fn from_toml(content: &str) -> Result<Self, FaultlineError> {
        let config: Self = toml::from_str(content)?;
        Ok(config)
    }
}

/// Accessor configuration.
///
/// # Examples
///
/// ```
/// use faultline_core::GitConfig;
///
/// let config = GitConfig::default();
/// assert!(config.exclude.iter().any(|p| p.contains("node_modules")));
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitConfig {
    /// Maximum concurrent git subprocesses (default: 6).
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,
    /// Glob patterns excluded from diff statistics entirely.
    #[serde(default = "default_exclude")]
    pub exclude: Vec<String>,
}

fn default_max_concurrency() -> usize {
    6
}

fn default_exclude() -> Vec<String> {
    vec![
        "node_modules/**".into(),
        "vendor/**".into(),
        "dist/**".into(),
        "target/**".into(),
        "*.lock".into(),
        "*.min.js".into(),
    ]
}

impl Default for GitConfig {
    fn default() -> Self {
        Self {
            max_concurrency: default_max_concurrency(),
            exclude: default_exclude(),
        }
    }
}

/// Change-analysis configuration.
///
/// # Examples
///
/// ```
/// use faultline_core::AnalysisConfig;
///
/// let config = AnalysisConfig::default();
/// assert!(config.extra_extensions.is_empty());
/// assert_eq!(config.max_file_bytes, 1_048_576);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Extensions analyzed in addition to the built-in source set.
    #[serde(default)]
    pub extra_extensions: Vec<String>,
    /// Files larger than this are degraded instead of analyzed (default: 1 MiB).
    #[serde(default = "default_max_file_bytes")]
    pub max_file_bytes: usize,
}

fn default_max_file_bytes() -> usize {
    1_048_576
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            extra_extensions: Vec::new(),
            max_file_bytes: default_max_file_bytes(),
        }
    }
}

/// Hotspot scan configuration.
///
/// # Examples
///
/// ```
/// use faultline_core::HotspotConfig;
///
/// let config = HotspotConfig::default();
/// assert_eq!(config.max_commits, 200);
/// assert_eq!(config.timeout_secs, 30);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HotspotConfig {
    /// Number of hotspots returned (default: 10).
    #[serde(default = "default_top_n")]
    pub top_n: usize,
    /// Commit-range cap for a single scan (default: 200).
    #[serde(default = "default_max_commits")]
    pub max_commits: usize,
    /// Scan deadline in seconds; partial results after expiry (default: 30).
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_top_n() -> usize {
    10
}

fn default_max_commits() -> usize {
    200
}

fn default_timeout_secs() -> u64 {
    30
}

impl Default for HotspotConfig {
    fn default() -> Self {
        Self {
            top_n: default_top_n(),
            max_commits: default_max_commits(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_expected_values() {
        let config = FaultlineConfig::default();
        assert_eq!(config.git.max_concurrency, 6);
        assert_eq!(config.analysis.max_file_bytes, 1_048_576);
        assert_eq!(config.hotspots.top_n, 10);
        assert_eq!(config.hotspots.max_commits, 200);
        assert_eq!(config.hotspots.timeout_secs, 30);
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let config = FaultlineConfig::from_toml(
            r#"
            [git]
            max_concurrency = 2
            "#,
        )
        .unwrap();
        assert_eq!(config.git.max_concurrency, 2);
        assert!(!config.git.exclude.is_empty());
        assert_eq!(config.hotspots.top_n, 10);
    }

    #[test]
    fn empty_toml_is_valid() {
        let config = FaultlineConfig::from_toml("").unwrap();
        assert_eq!(config.git.max_concurrency, 6);
    }

    #[test]
    fn invalid_toml_is_an_error() {
        assert!(FaultlineConfig::from_toml("[git\nmax_concurrency = ").is_err());
    }

    #[test]
    fn extra_extensions_parse() {
        let config = FaultlineConfig::from_toml(
            r#"
            [analysis]
            extra_extensions = ["vue", "svelte"]
            "#,
        )
        .unwrap();
        assert_eq!(config.analysis.extra_extensions, vec!["vue", "svelte"]);
    }
}
