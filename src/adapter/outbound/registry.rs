//! Docker Hub tag listing.
//!
//! Implements [`ImageRegistry`] against the public Docker Hub v2 API.
//! Official images (no namespace) live under `library/`.

use async_trait::async_trait;
use reqwest::header::USER_AGENT;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tracing::debug;
use url::Url;

use crate::error::{Error, NetworkError, OrchestrationError, Result};
use crate::port::outbound::registry::ImageRegistry;

/// Docker Hub API root.
pub const DOCKER_HUB_API: &str = "https://hub.docker.com/v2/";

const PAGE_SIZE: u32 = 100;

/// Docker Hub registry client.
#[derive(Debug, Clone)]
pub struct DockerHubRegistry {
    client: Client,
    /// API root, always ending in `/`.
    base_url: String,
}

impl DockerHubRegistry {
    /// Client for the public Docker Hub.
    #[must_use]
    pub fn new() -> Self {
        Self::with_base_url(DOCKER_HUB_API)
    }

    /// Client for a Docker Hub compatible mirror.
    #[must_use]
    pub fn with_base_url(base_url: &str) -> Self {
        let mut base_url = base_url.to_string();
        if !base_url.ends_with('/') {
            base_url.push('/');
        }
        Self {
            client: Client::new(),
            base_url,
        }
    }

    fn tags_url(&self, image: &str) -> Result<Url> {
        let (namespace, repository) = split_image(image);
        let mut url = Url::parse(&self.base_url)
            .and_then(|base| base.join(&format!("repositories/{namespace}/{repository}/tags")))
            .map_err(|e| OrchestrationError::RegistryPayload {
                image: image.to_string(),
                reason: e.to_string(),
            })?;
        url.query_pairs_mut()
            .append_pair("page_size", &PAGE_SIZE.to_string())
            .append_pair("ordering", "last_updated");
        Ok(url)
    }
}

impl Default for DockerHubRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// `namespace/repository` for an image reference, tag and registry host
/// stripped.
#[must_use]
pub fn split_image(image: &str) -> (&str, &str) {
    let image = image.split(':').next().unwrap_or(image);
    let image = image.strip_prefix("docker.io/").unwrap_or(image);
    match image.rsplit_once('/') {
        Some((namespace, repository)) => (namespace, repository),
        None => ("library", image),
    }
}

#[derive(Deserialize)]
struct TagPage {
    results: Vec<Tag>,
}

#[derive(Deserialize)]
struct Tag {
    name: String,
}

fn classify(image: &str, err: &reqwest::Error) -> Error {
    if err.is_timeout() {
        NetworkError::Timeout {
            image: image.to_string(),
        }
        .into()
    } else {
        NetworkError::Unreachable {
            image: image.to_string(),
            reason: err.to_string(),
        }
        .into()
    }
}

#[async_trait]
impl ImageRegistry for DockerHubRegistry {
    async fn list_available_versions(&self, image: &str) -> Result<Vec<String>> {
        let url = self.tags_url(image)?;
        debug!(image, url = %url, "Querying registry");

        let response = self
            .client
            .get(url)
            .header(USER_AGENT, concat!("stackforge/", env!("CARGO_PKG_VERSION")))
            .send()
            .await
            .map_err(|e| classify(image, &e))?;

        let status = response.status();
        if status.is_server_error() {
            return Err(NetworkError::ServerError {
                image: image.to_string(),
                status: status.as_u16(),
            }
            .into());
        }
        if status != StatusCode::OK {
            return Err(OrchestrationError::Registry {
                image: image.to_string(),
                status: status.as_u16(),
            }
            .into());
        }

        let page: TagPage = response
            .json()
            .await
            .map_err(|e| OrchestrationError::RegistryPayload {
                image: image.to_string(),
                reason: e.to_string(),
            })?;
        Ok(page.results.into_iter().map(|t| t.name).collect())
    }
}
