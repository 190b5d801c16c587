//! Configuration file handling for TaxMate.
//!
//! The configuration file is stored at `$TAXMATE_HOME/config.json` and holds the base URL of the
//! TaxMate API along with the location of the saved access token.

use crate::{utils, Result};
use anyhow::{bail, Context};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use url::Url;

const APP_NAME: &str = "taxmate";
const CONFIG_VERSION: u8 = 1;
const SECRETS: &str = ".secrets";
const TOKEN_JSON: &str = "token.json";
const CONFIG_JSON: &str = "config.json";

/// Where the API is expected when none is configured.
pub const DEFAULT_API_URL: &str = "http://127.0.0.1:8000";

/// The `Config` object represents the configuration of the app. You instantiate it by providing
/// the path to `$TAXMATE_HOME` and from there it loads `$TAXMATE_HOME/config.json`. It provides
/// paths to other items that are either configurable or are expected in a certain location within
/// the home directory.
#[derive(Debug, Clone)]
pub struct Config {
    root: PathBuf,
    secrets: PathBuf,
    config_path: PathBuf,
    config_file: ConfigFile,
    api_url: Url,
}

impl Config {
    /// Creates the data directory, its secrets subdirectory and an initial `config.json` pointing
    /// at `api_url`.
    ///
    /// # Arguments
    /// - `dir` - The directory that will be the root of data directory, e.g. `$HOME/taxmate`
    /// - `api_url` - The base URL of the TaxMate API, e.g. `http://127.0.0.1:8000`
    ///
    /// # Errors
    /// - Returns an error if `api_url` is not a valid http(s) URL or any file operation fails.
    pub async fn create(dir: impl Into<PathBuf>, api_url: &str) -> Result<Self> {
        let api_url = parse_api_url(api_url)?;

        let maybe_relative = dir.into();
        utils::make_dir(&maybe_relative)
            .await
            .context("Unable to create the taxmate home directory")?;
        let root = utils::canonicalize(&maybe_relative).await?;

        let secrets_dir = root.join(SECRETS);
        utils::make_dir(&secrets_dir).await?;
        let config_path = root.join(CONFIG_JSON);

        let config_file = ConfigFile {
            api_url: api_url.to_string(),
            ..ConfigFile::default()
        };
        config_file.save(&config_path).await?;

        Ok(Self {
            root,
            secrets: secrets_dir,
            config_path,
            config_file,
            api_url,
        })
    }

    /// This will
    /// - validate that the `taxmate_home` exists and that the config file exists
    /// - load the config file
    /// - validate that the secrets directory exists
    /// - return the loaded configuration object
    pub async fn load(taxmate_home: impl Into<PathBuf>) -> Result<Self> {
        let maybe_relative = taxmate_home.into();
        let root = utils::canonicalize(&maybe_relative)
            .await
            .context("TaxMate Home is missing, run 'taxmate init' first")?;

        let config_path = root.join(CONFIG_JSON);
        if !config_path.is_file() {
            bail!("The config file is missing '{}'", config_path.display())
        }
        let config_file = ConfigFile::load(&config_path).await?;
        let api_url = parse_api_url(&config_file.api_url)?;

        let config = Self {
            root: root.clone(),
            secrets: root.join(SECRETS),
            config_path,
            config_file,
            api_url,
        };
        if !config.secrets.is_dir() {
            bail!(
                "The secrets directory is missing '{}'",
                config.secrets.display()
            )
        }
        Ok(config)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    pub fn secrets(&self) -> &Path {
        &self.secrets
    }

    /// The API base URL. Always ends with `/` so that endpoint paths can be joined onto it.
    pub fn api_url(&self) -> &Url {
        &self.api_url
    }

    /// Returns the stored `token_path` if it is absolute, otherwise resolves the relative path.
    pub fn token_path(&self) -> PathBuf {
        let p = self.config_file.token_path();
        if p.is_absolute() {
            return p;
        }
        self.root.join(p)
    }
}

/// Parses `s` as an http(s) URL and makes sure its path ends with `/`.
fn parse_api_url(s: &str) -> Result<Url> {
    let mut url = Url::parse(s.trim()).with_context(|| format!("Invalid API URL '{s}'"))?;
    if !matches!(url.scheme(), "http" | "https") {
        bail!("The API URL must use http or https, got '{}'", url.scheme());
    }
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

/// Represents the serialization and deserialization format of the configuration file.
///
/// Example configuration:
/// ```json
/// {
///   "app_name": "taxmate",
///   "config_version": 1,
///   "api_url": "http://127.0.0.1:8000/",
///   "token_path": ".secrets/token.json"
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
struct ConfigFile {
    /// Application name, should always be "taxmate"
    app_name: String,

    /// Configuration file version
    config_version: u8,

    /// Base URL of the TaxMate API
    api_url: String,

    /// Path to the saved access token (optional, relative to config.json or absolute)
    /// Defaults to $TAXMATE_HOME/.secrets/token.json if not specified
    #[serde(skip_serializing_if = "Option::is_none")]
    token_path: Option<PathBuf>,
}

impl Default for ConfigFile {
    fn default() -> Self {
        Self {
            app_name: APP_NAME.to_string(),
            config_version: CONFIG_VERSION,
            api_url: DEFAULT_API_URL.to_string(),
            token_path: None,
        }
    }
}

impl ConfigFile {
    /// Loads a ConfigFile asynchronously from the specified path.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let config: ConfigFile = utils::deserialize(path).await?;

        anyhow::ensure!(
            config.app_name == APP_NAME,
            "Invalid app_name in config file: expected '{}', got '{}'",
            APP_NAME,
            config.app_name
        );

        Ok(config)
    }

    /// Saves the ConfigFile to the specified path.
    pub async fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let p = path.as_ref();
        let data = serde_json::to_string_pretty(self).context("Unable to serialize config")?;
        utils::write_private(p, data)
            .await
            .context("Unable to write config file")
    }

    #[cfg(test)]
    pub fn new(api_url: &str, token_path: Option<PathBuf>) -> Self {
        Self {
            api_url: api_url.to_string(),
            token_path,
            ..Self::default()
        }
    }

    /// Gets the token path.
    ///
    /// If the path is relative, it should be interpreted as relative to the config.json file.
    /// If None, defaults to $TAXMATE_HOME/.secrets/token.json
    pub fn token_path(&self) -> PathBuf {
        self.token_path
            .clone()
            .unwrap_or_else(|| PathBuf::from(SECRETS).join(TOKEN_JSON))
    }
}
