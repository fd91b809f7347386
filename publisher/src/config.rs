use serde::Deserialize;
use std::env;
use std::fs::File;
use std::path::Path;
use thiserror::Error;
use url::Url;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("could not load config from file: {0}")]
    LoadError(#[from] std::io::Error),
    #[error("could not parse config: {0}")]
    ParseError(#[from] serde_yaml::Error),
    #[error("port cannot be 0")]
    InvalidPort,
}

/// Network listener configuration
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct Listener {
    /// Host address to bind to (e.g., "0.0.0.0" or "127.0.0.1")
    pub host: String,
    /// Port number to listen on
    pub port: u16,
}

impl Listener {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.port == 0 {
            return Err(ConfigError::InvalidPort);
        }
        Ok(())
    }
}

fn default_path() -> String {
    "data.json".to_string()
}

fn default_branch() -> String {
    "main".to_string()
}

fn default_api_base() -> Url {
    // Static string, cannot fail to parse
    Url::parse("https://api.github.com").expect("valid default API base")
}

/// Target repository configuration.
///
/// Owner, repo, and token are all required to publish, but a partially
/// configured server still starts and answers requests; the publish endpoint
/// reports the misconfiguration per request. Token is never read from the
/// file, only from the environment (see [`Config::apply_env`]).
#[derive(Clone, Debug, Deserialize)]
pub struct GithubConfig {
    pub owner: Option<String>,
    pub repo: Option<String>,
    /// Path written when the payload does not name one
    #[serde(default = "default_path")]
    pub default_path: String,
    /// Branch written when the payload does not name one
    #[serde(default = "default_branch")]
    pub default_branch: String,
    /// Contents API base; overridable so tests can point at a local server
    #[serde(default = "default_api_base")]
    pub api_base: Url,
    #[serde(skip)]
    pub token: Option<String>,
}

impl Default for GithubConfig {
    fn default() -> Self {
        GithubConfig {
            owner: None,
            repo: None,
            default_path: default_path(),
            default_branch: default_branch(),
            api_base: default_api_base(),
            token: None,
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct MetricsConfig {
    pub statsd_host: String,
    pub statsd_port: u16,
}

#[derive(Clone, Debug, Deserialize)]
pub struct LoggingConfig {
    pub sentry_dsn: String,
}

/// Service configuration, loaded once at startup and injected into the
/// handler.
#[derive(Clone, Debug, Deserialize)]
pub struct Config {
    pub listener: Listener,
    #[serde(default)]
    pub github: GithubConfig,
    /// Shared secret gating the publish endpoint; environment-only
    #[serde(skip)]
    pub push_secret: Option<String>,
    pub metrics: Option<MetricsConfig>,
    pub logging: Option<LoggingConfig>,
}

impl Config {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let file = File::open(path)?;
        let config: Config = serde_yaml::from_reader(file)?;
        config.listener.validate()?;

        Ok(config)
    }

    /// Overlay secrets (and optionally the target repository) from the
    /// environment: `GITHUB_TOKEN`, `PUSH_SECRET`, `GITHUB_OWNER`,
    /// `GITHUB_REPO`.
    pub fn apply_env(&mut self) {
        if let Ok(token) = env::var("GITHUB_TOKEN") {
            self.github.token = Some(token);
        }
        if let Ok(owner) = env::var("GITHUB_OWNER") {
            self.github.owner = Some(owner);
        }
        if let Ok(repo) = env::var("GITHUB_REPO") {
            self.github.repo = Some(repo);
        }
        if let Ok(secret) = env::var("PUSH_SECRET") {
            self.push_secret = Some(secret);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_tmp_file(s: &str) -> tempfile::NamedTempFile {
        let mut tmp = tempfile::NamedTempFile::new().expect("create temp file");
        write!(tmp, "{}", s).expect("write yaml");

        tmp
    }

    #[test]
    fn full_config() {
        let yaml = r#"
            listener:
                host: 0.0.0.0
                port: 8080
            github:
                owner: octocat
                repo: site
                default_path: content/data.json
                default_branch: master
            metrics:
                statsd_host: 127.0.0.1
                statsd_port: 8125
            "#;
        let tmp = write_tmp_file(yaml);
        let config = Config::from_file(tmp.path()).expect("load config");

        assert_eq!(config.listener.port, 8080);
        assert_eq!(config.github.owner.as_deref(), Some("octocat"));
        assert_eq!(config.github.repo.as_deref(), Some("site"));
        assert_eq!(config.github.default_path, "content/data.json");
        assert_eq!(config.github.default_branch, "master");
        assert_eq!(config.github.api_base.as_str(), "https://api.github.com/");
        assert_eq!(config.metrics.unwrap().statsd_port, 8125);
        assert!(config.logging.is_none());
        // Secrets never come from the file
        assert!(config.github.token.is_none());
        assert!(config.push_secret.is_none());
    }

    #[test]
    fn minimal_config_uses_defaults() {
        let yaml = r#"
            listener:
                host: 127.0.0.1
                port: 9000
            "#;
        let tmp = write_tmp_file(yaml);
        let config = Config::from_file(tmp.path()).expect("load config");

        assert!(config.github.owner.is_none());
        assert_eq!(config.github.default_path, "data.json");
        assert_eq!(config.github.default_branch, "main");
    }

    #[test]
    fn zero_port_is_rejected() {
        let yaml = r#"
            listener:
                host: 127.0.0.1
                port: 0
            "#;
        let tmp = write_tmp_file(yaml);
        let err = Config::from_file(tmp.path()).expect_err("invalid port");
        assert!(matches!(err, ConfigError::InvalidPort));
    }
}
