//! Remote registry clients
//!
//! Two small HTTP lookups feed drift detection: the Docker Registry v2
//! manifest digest for `image:tag`, and the PyPI `requires_python` string
//! for a pinned release. Both are fail-fast with a 15 second timeout and
//! never retried.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{ACCEPT, AUTHORIZATION, WWW_AUTHENTICATE};

use crate::error::{Error, Result};

const MANIFEST_ACCEPT: &str =
    "application/vnd.oci.image.index.v1+json, application/vnd.docker.distribution.manifest.v2+json";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Resolves the remote content digest for a container image tag.
#[async_trait]
pub trait DigestResolver: Send + Sync {
    async fn resolve_digest(&self, image: &str, tag: &str) -> Result<String>;
}

/// A parsed image reference: registry host plus repository path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageRef {
    pub registry: String,
    pub repository: String,
}

/// Split an image name into registry and repository, applying the Docker
/// Hub conventions: no host means `registry-1.docker.io`, and bare library
/// images are prefixed `library/`.
pub fn parse_image_ref(image: &str) -> ImageRef {
    let (host, rest) = match image.split_once('/') {
        Some((candidate, rest))
            if candidate.contains('.') || candidate.contains(':') || candidate == "localhost" =>
        {
            (candidate.to_string(), rest.to_string())
        }
        _ => ("registry-1.docker.io".to_string(), image.to_string()),
    };

    let repository = if host == "registry-1.docker.io" && !rest.contains('/') {
        format!("library/{rest}")
    } else {
        rest
    };

    ImageRef {
        registry: host,
        repository,
    }
}

/// HTTP client for the Docker Registry v2 API.
pub struct HttpRegistryClient {
    client: reqwest::Client,
}

impl HttpRegistryClient {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(REQUEST_TIMEOUT)
                .build()
                .expect("reqwest client"),
        }
    }

    /// Fetch a bearer token from the challenge in a 401 response.
    async fn fetch_token(&self, challenge: &str) -> Result<Option<String>> {
        let params = parse_auth_challenge(challenge);
        let Some(realm) = params.get("realm") else {
            return Ok(None);
        };

        let mut request = self.client.get(realm);
        if let Some(service) = params.get("service") {
            request = request.query(&[("service", service)]);
        }
        if let Some(scope) = params.get("scope") {
            request = request.query(&[("scope", scope)]);
        }

        let response = request.send().await.map_err(|e| Error::Registry {
            message: format!("token request failed: {e}"),
        })?;
        let body: serde_json::Value = response.json().await.map_err(|e| Error::Registry {
            message: format!("token response invalid: {e}"),
        })?;
        Ok(body
            .get("token")
            .or_else(|| body.get("access_token"))
            .and_then(|t| t.as_str())
            .map(str::to_string))
    }
}

impl Default for HttpRegistryClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DigestResolver for HttpRegistryClient {
    async fn resolve_digest(&self, image: &str, tag: &str) -> Result<String> {
        let image_ref = parse_image_ref(image);
        let url = format!(
            "https://{}/v2/{}/manifests/{}",
            image_ref.registry, image_ref.repository, tag
        );

        let mut response = self
            .client
            .head(&url)
            .header(ACCEPT, MANIFEST_ACCEPT)
            .send()
            .await
            .map_err(|e| Error::Registry {
                message: format!("manifest request failed: {e}"),
            })?;

        if response.status() == reqwest::StatusCode::UNAUTHORIZED {
            let challenge = response
                .headers()
                .get(WWW_AUTHENTICATE)
                .and_then(|v| v.to_str().ok())
                .unwrap_or_default()
                .to_string();
            let Some(token) = self.fetch_token(&challenge).await? else {
                return Err(Error::Registry {
                    message: format!("registry {} requires auth", image_ref.registry),
                });
            };
            response = self
                .client
                .head(&url)
                .header(ACCEPT, MANIFEST_ACCEPT)
                .header(AUTHORIZATION, format!("Bearer {token}"))
                .send()
                .await
                .map_err(|e| Error::Registry {
                    message: format!("manifest request failed: {e}"),
                })?;
        }

        if !response.status().is_success() {
            return Err(Error::Registry {
                message: format!(
                    "manifest for {image}:{tag} returned {}",
                    response.status()
                ),
            });
        }

        response
            .headers()
            .get("docker-content-digest")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .ok_or_else(|| Error::Registry {
                message: format!("no Docker-Content-Digest header for {image}:{tag}"),
            })
    }
}

/// Parse a `Bearer realm="…",service="…",scope="…"` challenge.
fn parse_auth_challenge(challenge: &str) -> std::collections::HashMap<String, String> {
    challenge
        .trim_start_matches("Bearer ")
        .split(',')
        .filter_map(|part| {
            let (key, raw) = part.trim().split_once('=')?;
            Some((key.to_string(), raw.trim_matches('"').to_string()))
        })
        .collect()
}

/// Fetch the `requires_python` string of one PyPI release, `None` when the
/// release does not declare it or the lookup fails.
pub async fn pypi_requires_python(package: &str, version: &str) -> Option<String> {
    let client = reqwest::Client::builder()
        .timeout(REQUEST_TIMEOUT)
        .build()
        .ok()?;
    let url = format!("https://pypi.org/pypi/{package}/{version}/json");

    let response = client.get(&url).send().await.ok()?;
    if !response.status().is_success() {
        return None;
    }
    let body: serde_json::Value = response.json().await.ok()?;
    body.get("info")
        .and_then(|info| info.get("requires_python"))
        .and_then(|r| r.as_str())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}
