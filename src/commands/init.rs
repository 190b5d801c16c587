use crate::commands::Out;
use crate::error::{ErrorType, IntoResult};
use crate::{Config, Result};
use anyhow::Context;
use std::path::Path;

/// Creates the data directory, its `.secrets` subdirectory and an initial `config.json` that
/// points at `api_url`.
///
/// # Arguments
/// - `taxmate_home` - The directory that will be the root of data directory, e.g. `$HOME/taxmate`
/// - `api_url` - The base URL of the TaxMate API, e.g. `http://127.0.0.1:8000`
///
/// # Errors
/// - Returns an error if the URL is not http(s) or if any file operations fail.
pub async fn init(taxmate_home: &Path, api_url: &str) -> Result<Out<()>> {
    let config = Config::create(taxmate_home, api_url)
        .await
        .context("Unable to create the data directory and configs")
        .pub_result(ErrorType::Config)?;
    Ok(format!(
        "Successfully created the taxmate directory at {} using the API at {}",
        config.root().display(),
        config.api_url()
    )
    .into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::error_type;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_init_creates_loadable_home() {
        let dir = TempDir::new().unwrap();
        let home = dir.path().join("taxmate");
        let out = init(&home, "https://tax.example.com/api").await.unwrap();
        assert!(out.message().contains("https://tax.example.com/api/"));

        let config = Config::load(&home).await.unwrap();
        assert_eq!(config.api_url().as_str(), "https://tax.example.com/api/");
    }

    #[tokio::test]
    async fn test_init_rejects_bad_url() {
        let dir = TempDir::new().unwrap();
        let err = init(&dir.path().join("taxmate"), "ftp://nope").await.unwrap_err();
        assert_eq!(error_type(&err), Some(ErrorType::Config));
    }
}
