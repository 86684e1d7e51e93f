//! Configuration file handling.
//!
//! The configuration is a YAML file at `~/.jira-cli.yaml` unless
//! `--config` or `JIRA_CLI_CONFIG` points elsewhere. It is loaded once per
//! command and passed explicitly to whatever needs it.

use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

/// Default configuration file name in the home directory.
const CONFIG_FILE_NAME: &str = ".jira-cli.yaml";

/// File and variable used by earlier releases, still honoured.
const LEGACY_CONFIG_FILE_NAME: &str = ".pyjira.yaml";
const LEGACY_CONFIG_ENV: &str = "PYJIRA_CONFIG";

/// Query used by the dashboard when no board filter is configured.
pub const DEFAULT_DASHBOARD_JQL: &str = "assignee = currentUser() ORDER BY updated DESC";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("No configuration file found '{}'. To configure, run the command 'jira configure'", .0.display())]
    NotFound(PathBuf),

    #[error("Could not determine the home directory")]
    NoHomeDir,

    #[error("Failed to read {}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse {}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("Failed to write {}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to encode configuration")]
    Encode(#[source] serde_yaml::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Jira connection settings and UI preferences.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    pub jira_base_url: String,

    /// PEM file with the server's root certificate.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cert_path: Option<String>,

    pub user: String,
    pub token: String,

    #[serde(default)]
    pub board: Board,

    #[serde(default)]
    pub dashboard: DashboardSettings,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Board {
    #[serde(default)]
    pub filter: Filter,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Filter {
    #[serde(default)]
    pub jql: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardSettings {
    #[serde(default = "default_refresh_interval")]
    pub refresh_interval_secs: u64,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

fn default_refresh_interval() -> u64 {
    30
}

fn default_request_timeout() -> u64 {
    10
}

impl Default for DashboardSettings {
    fn default() -> Self {
        Self {
            refresh_interval_secs: default_refresh_interval(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

impl Config {
    /// Load and validate the configuration at `path`.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Config =
            serde_yaml::from_str(&content).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        config.validate()?;
        Ok(config)
    }

    /// Write the configuration to `path`, creating parent directories.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let content = serde_yaml::to_string(self).map_err(ConfigError::Encode)?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|source| ConfigError::Write {
                path: path.to_path_buf(),
                source,
            })?;
        }
        fs::write(path, content).map_err(|source| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let url = self.jira_base_url.trim();
        if url.is_empty() {
            return Err(ConfigError::Invalid("jira_base_url is empty".to_string()));
        }
        if !url.starts_with("http://") && !url.starts_with("https://") {
            return Err(ConfigError::Invalid(format!(
                "jira_base_url must start with http:// or https:// (got '{}')",
                url
            )));
        }
        Ok(())
    }

    /// Base URL without a trailing slash.
    pub fn base_url(&self) -> &str {
        self.jira_base_url.trim().trim_end_matches('/')
    }

    /// Certificate path with `~` expanded. Empty values mean "none".
    pub fn cert_path(&self) -> Option<PathBuf> {
        self.cert_path
            .as_deref()
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(|p| PathBuf::from(shellexpand::tilde(p).as_ref()))
    }

    /// JQL the dashboard watches by default.
    pub fn dashboard_jql(&self) -> &str {
        let jql = self.board.filter.jql.trim();
        if jql.is_empty() {
            DEFAULT_DASHBOARD_JQL
        } else {
            jql
        }
    }
}

/// Resolve the configuration path.
///
/// In order: an explicit override (`--config` / `JIRA_CLI_CONFIG`), then
/// `PYJIRA_CONFIG`, then `~/.jira-cli.yaml`. An existing `~/.pyjira.yaml` is
/// used when `~/.jira-cli.yaml` does not exist.
pub fn resolve_path(explicit: Option<&Path>) -> Result<PathBuf, ConfigError> {
    resolve_from(
        explicit,
        env::var_os(LEGACY_CONFIG_ENV).map(PathBuf::from),
        dirs::home_dir(),
    )
}

fn resolve_from(
    explicit: Option<&Path>,
    legacy_env: Option<PathBuf>,
    home: Option<PathBuf>,
) -> Result<PathBuf, ConfigError> {
    if let Some(path) = explicit.or(legacy_env.as_deref()) {
        if !path.as_os_str().is_empty() {
            return Ok(expand(path));
        }
    }

    let home = home.ok_or(ConfigError::NoHomeDir)?;
    let current = home.join(CONFIG_FILE_NAME);
    let legacy = home.join(LEGACY_CONFIG_FILE_NAME);
    if !current.exists() && legacy.exists() {
        debug!(path = %legacy.display(), "using legacy configuration file");
        return Ok(legacy);
    }
    Ok(current)
}

fn expand(path: &Path) -> PathBuf {
    PathBuf::from(shellexpand::tilde(&path.to_string_lossy()).as_ref())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sample() -> Config {
        Config {
            jira_base_url: "https://jira.example.com/".to_string(),
            cert_path: None,
            user: "alice".to_string(),
            token: "secret".to_string(),
            board: Board::default(),
            dashboard: DashboardSettings::default(),
        }
    }

    #[test]
    fn test_save_then_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.yaml");

        let mut config = sample();
        config.board.filter.jql = "project = DEMO".to_string();
        config.save(&path).unwrap();

        let loaded = Config::load(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_load_minimal_file_uses_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.yaml");
        fs::write(
            &path,
            "jira_base_url: https://jira.example.com\nuser: bob\ntoken: t0k3n\n",
        )
        .unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.user, "bob");
        assert_eq!(config.dashboard.refresh_interval_secs, 30);
        assert_eq!(config.dashboard.request_timeout_secs, 10);
        assert_eq!(config.dashboard_jql(), DEFAULT_DASHBOARD_JQL);
        assert!(config.cert_path().is_none());
    }

    #[test]
    fn test_missing_file_mentions_configure() {
        let dir = TempDir::new().unwrap();
        let err = Config::load(&dir.path().join("absent.yaml")).unwrap_err();
        assert!(matches!(err, ConfigError::NotFound(_)));
        assert!(err.to_string().contains("jira configure"));
    }

    #[test]
    fn test_invalid_yaml_is_a_parse_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.yaml");
        fs::write(&path, "jira_base_url: [unclosed").unwrap();
        assert!(matches!(
            Config::load(&path),
            Err(ConfigError::Parse { .. })
        ));
    }

    #[test]
    fn test_rejects_url_without_scheme() {
        let mut config = sample();
        config.jira_base_url = "jira.example.com".to_string();
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_base_url_strips_trailing_slash() {
        assert_eq!(sample().base_url(), "https://jira.example.com");
    }

    #[test]
    fn test_empty_cert_path_is_none() {
        let mut config = sample();
        config.cert_path = Some("   ".to_string());
        assert!(config.cert_path().is_none());

        config.cert_path = Some("/etc/ssl/jira.pem".to_string());
        assert_eq!(config.cert_path(), Some(PathBuf::from("/etc/ssl/jira.pem")));
    }

    #[test]
    fn test_board_jql_overrides_default() {
        let mut config = sample();
        config.board.filter.jql = "  project = DEMO  ".to_string();
        assert_eq!(config.dashboard_jql(), "project = DEMO");
    }

    #[test]
    fn test_explicit_path_wins() {
        let path = resolve_from(
            Some(Path::new("/tmp/jira.yaml")),
            Some(PathBuf::from("/tmp/legacy.yaml")),
            None,
        )
        .unwrap();
        assert_eq!(path, PathBuf::from("/tmp/jira.yaml"));
    }

    #[test]
    fn test_legacy_env_used_without_override() {
        let path = resolve_from(None, Some(PathBuf::from("/tmp/legacy.yaml")), None).unwrap();
        assert_eq!(path, PathBuf::from("/tmp/legacy.yaml"));
    }

    #[test]
    fn test_home_file_preferred_over_legacy_file() {
        let home = TempDir::new().unwrap();
        let path = resolve_from(None, None, Some(home.path().to_path_buf())).unwrap();
        assert_eq!(path, home.path().join(CONFIG_FILE_NAME));

        fs::write(home.path().join(LEGACY_CONFIG_FILE_NAME), "user: old\n").unwrap();
        let path = resolve_from(None, None, Some(home.path().to_path_buf())).unwrap();
        assert_eq!(path, home.path().join(LEGACY_CONFIG_FILE_NAME));

        fs::write(home.path().join(CONFIG_FILE_NAME), "user: new\n").unwrap();
        let path = resolve_from(None, None, Some(home.path().to_path_buf())).unwrap();
        assert_eq!(path, home.path().join(CONFIG_FILE_NAME));
    }

    #[test]
    fn test_no_home_dir() {
        assert!(matches!(
            resolve_from(None, None, None),
            Err(ConfigError::NoHomeDir)
        ));
    }
}
