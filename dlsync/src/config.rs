use std::time;

use anyhow::Context;
use camino::{Utf8Path, Utf8PathBuf};
use glob::{MatchOptions, Pattern, PatternError};
use serde::{Deserialize, Serialize};

use crate::oauth;

#[derive(Debug)]
pub struct PatternList(Vec<Pattern>, MatchOptions);

impl Default for PatternList {
    fn default() -> Self {
        PatternList(Vec::new(), MatchOptions::new())
    }
}

impl PatternList {
    pub fn new<I>(patterns: I) -> Result<PatternList, PatternError>
    where
        I: Iterator,
        I::Item: AsRef<str>,
    {
        Self::with_options(patterns, MatchOptions::new())
    }

    pub fn with_options<I>(patterns: I, opts: MatchOptions) -> Result<PatternList, PatternError>
    where
        I: Iterator,
        I::Item: AsRef<str>,
    {
        let patterns: Result<Vec<_>, _> = patterns.map(|p| Pattern::new(p.as_ref())).collect();
        Ok(PatternList(patterns?, opts))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Whether the root-relative `path` matches any of the patterns
    pub fn matches(&self, path: &str) -> bool {
        self.0.iter().any(|p| p.matches_with(path, self.1))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteConfig {
    /// Name of the Data Lake Store account
    pub store_name: String,
    /// Folder of the store that is synchronized
    pub root: String,
    pub tenant_id: String,
    pub client_id: String,
    pub client_secret: String,
    /// Azure AD authority, defaults to the public cloud
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authority_host: Option<String>,
    /// WebHDFS endpoint, defaults to the one derived from `store_name`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
}

impl RemoteConfig {
    pub fn credentials(&self) -> oauth::Credentials {
        oauth::Credentials {
            tenant_id: self.tenant_id.clone(),
            client_id: self.client_id.clone(),
            client_secret: self.client_secret.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    pub local_dir: Utf8PathBuf,
    pub remote: RemoteConfig,
    /// Glob patterns of root-relative paths excluded from both sides
    #[serde(default)]
    pub ignore: Vec<String>,
    #[serde(default = "default_case_sensitive")]
    pub case_sensitive: bool,
    /// Local files are only considered newer when they are by more than this
    #[serde(default)]
    pub mtime_tolerance_secs: u64,
}

fn default_case_sensitive() -> bool {
    true
}

impl Config {
    pub async fn load_from_file(path: &Utf8Path) -> anyhow::Result<Self> {
        let config_json = tokio::fs::read(&path)
            .await
            .with_context(|| format!("Failed to read config from {path}"))?;
        let config_json = std::str::from_utf8(&config_json)?;
        let config: Config = serde_json::from_str(config_json)
            .with_context(|| format!("Failed to parse config from {path}"))?;
        config.check()?;
        Ok(config)
    }

    pub async fn save_to_file(&self, path: &Utf8Path) -> anyhow::Result<()> {
        if let Some(dir) = path.parent() {
            tokio::fs::create_dir_all(dir).await?;
        }
        let config_json = serde_json::to_string_pretty(self)?;
        tokio::fs::write(path, config_json)
            .await
            .with_context(|| format!("Failed to write config to {path}"))?;
        Ok(())
    }

    fn check(&self) -> crate::Result<()> {
        if !self.local_dir.is_absolute() {
            crate::config_bail!("localDir must be absolute: {}", self.local_dir);
        }
        if self.remote.store_name.is_empty() {
            crate::config_bail!("remote.storeName is empty");
        }
        self.ignore_patterns()?;
        Ok(())
    }

    pub fn ignore_patterns(&self) -> crate::Result<PatternList> {
        let opts = MatchOptions {
            case_sensitive: self.case_sensitive,
            require_literal_separator: false,
            require_literal_leading_dot: false,
        };
        PatternList::with_options(self.ignore.iter(), opts)
            .map_err(|err| crate::Error::Config(format!("invalid ignore pattern: {err}")))
    }

    pub fn mtime_tolerance(&self) -> time::Duration {
        time::Duration::from_secs(self.mtime_tolerance_secs)
    }
}
