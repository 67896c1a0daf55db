//! Remote skill registry client.
//!
//! The registry exposes two endpoints the store depends on: latest-version
//! lookup and archive download (gzip tarball). Server-side behavior beyond
//! this contract is out of scope.

use std::path::PathBuf;

use {async_trait::async_trait, serde::Deserialize};

use crate::error::RegistryError;

/// Client contract consumed by the store's install/update workflows.
#[async_trait]
pub trait RegistryClient: Send + Sync {
    /// Latest published version string for a slug.
    async fn fetch_latest_version(&self, slug: &str) -> Result<String, RegistryError>;

    /// Download the archive for a slug (latest when `version` is `None`),
    /// returning the local path of the fetched tarball.
    async fn download(&self, slug: &str, version: Option<&str>)
    -> Result<PathBuf, RegistryError>;
}

#[derive(Deserialize)]
struct RemoteSkillInfo {
    #[serde(default)]
    latest: Option<RemoteVersion>,
}

#[derive(Deserialize)]
struct RemoteVersion {
    #[serde(default)]
    version: Option<String>,
}

/// HTTP implementation against a skillshub-compatible registry.
pub struct HttpRegistryClient {
    base_url: String,
    client: reqwest::Client,
}

impl HttpRegistryClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl RegistryClient for HttpRegistryClient {
    async fn fetch_latest_version(&self, slug: &str) -> Result<String, RegistryError> {
        let url = format!("{}/api/skills/{slug}", self.base_url);
        let resp = self.client.get(&url).send().await?;

        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(RegistryError::NotFound(slug.to_string()));
        }
        if !resp.status().is_success() {
            return Err(RegistryError::Network(format!(
                "GET {url} returned HTTP {}",
                resp.status()
            )));
        }

        let info: RemoteSkillInfo = resp.json().await?;
        info.latest
            .and_then(|latest| latest.version)
            .ok_or_else(|| {
                RegistryError::Network(format!("registry response for '{slug}' has no version"))
            })
    }

    async fn download(
        &self,
        slug: &str,
        version: Option<&str>,
    ) -> Result<PathBuf, RegistryError> {
        let mut url = format!("{}/api/skills/{slug}/download", self.base_url);
        if let Some(version) = version {
            url.push_str(&format!("?version={version}"));
        }

        let resp = self.client.get(&url).send().await?;
        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(RegistryError::NotFound(slug.to_string()));
        }
        if !resp.status().is_success() {
            return Err(RegistryError::Network(format!(
                "GET {url} returned HTTP {}",
                resp.status()
            )));
        }
        let bytes = resp.bytes().await?;

        let (mut file, path) = tempfile::Builder::new()
            .prefix("skilldeck-")
            .suffix(".tar.gz")
            .tempfile()
            .map_err(RegistryError::Io)?
            .keep()
            .map_err(|e| RegistryError::Io(e.error))?;
        std::io::Write::write_all(&mut file, &bytes).map_err(RegistryError::Io)?;

        tracing::debug!(%slug, ?version, path = %path.display(), "downloaded skill archive");
        Ok(path)
    }
}
