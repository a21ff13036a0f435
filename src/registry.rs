//! Container registry access over the OCI distribution API

use crate::domain::ImageReference;
use crate::error::{CiuxError, Result};
use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::header::{ACCEPT, AUTHORIZATION, WWW_AUTHENTICATE};
use reqwest::StatusCode;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

/// Default bound on a single registry request
pub const DEFAULT_QUERY_TIMEOUT: Duration = Duration::from_secs(20);

const MANIFEST_MEDIA_TYPES: &str = "application/vnd.oci.image.index.v1+json, \
application/vnd.oci.image.manifest.v1+json, \
application/vnd.docker.distribution.manifest.list.v2+json, \
application/vnd.docker.distribution.manifest.v2+json";

/// Answers whether an image reference exists in its registry
pub trait ImageRegistry {
    /// # Returns
    /// * `Ok(true)` / `Ok(false)` - The registry answered
    /// * `Err(RegistryQuery)` - The registry could not be queried
    fn exists(&self, reference: &str) -> Result<bool>;
}

/// `WWW-Authenticate: Bearer realm="..",service="..",scope=".."`
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BearerChallenge {
    pub realm: String,
    pub service: Option<String>,
    pub scope: Option<String>,
}

impl BearerChallenge {
    pub fn parse(header: &str) -> Option<Self> {
        let (scheme, params) = header.trim().split_once(' ')?;
        if !scheme.eq_ignore_ascii_case("bearer") {
            return None;
        }

        let mut challenge = BearerChallenge::default();
        for (key, value) in split_params(params) {
            match key.to_ascii_lowercase().as_str() {
                "realm" => challenge.realm = value,
                "service" => challenge.service = Some(value),
                "scope" => challenge.scope = Some(value),
                _ => {}
            }
        }

        if challenge.realm.is_empty() {
            None
        } else {
            Some(challenge)
        }
    }
}

/// Split `k="v",k2="v,2"` respecting quotes
fn split_params(params: &str) -> Vec<(String, String)> {
    let mut pairs = Vec::new();
    let mut rest = params.trim();

    while let Some(eq) = rest.find('=') {
        let key = rest[..eq].trim().trim_start_matches(',').trim().to_string();
        let after = &rest[eq + 1..];

        let (value, remaining) = if let Some(quoted) = after.strip_prefix('"') {
            match quoted.find('"') {
                Some(end) => (&quoted[..end], &quoted[end + 1..]),
                None => (quoted, ""),
            }
        } else {
            match after.find(',') {
                Some(end) => (&after[..end], &after[end..]),
                None => (after, ""),
            }
        };

        pairs.push((key, value.trim().to_string()));
        rest = remaining.trim_start_matches(|c: char| c == ',' || c.is_whitespace());
    }

    pairs
}

#[derive(Deserialize)]
struct TokenResponse {
    #[serde(default)]
    token: Option<String>,
    #[serde(default)]
    access_token: Option<String>,
}

/// Registry client speaking HTTP(S) with anonymous token negotiation
pub struct HttpRegistry {
    client: Client,
}

impl HttpRegistry {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("ciux/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| CiuxError::registry(format!("unable to build HTTP client: {}", e)))?;
        Ok(HttpRegistry { client })
    }

    fn send(&self, request: RequestBuilder, reference: &ImageReference) -> Result<Response> {
        request
            .send()
            .map_err(|e| CiuxError::registry(format!("{}: {}", reference, e)))
    }

    fn fetch_token(&self, challenge: &BearerChallenge, reference: &ImageReference) -> Result<String> {
        let scope = challenge
            .scope
            .clone()
            .unwrap_or_else(|| format!("repository:{}:pull", reference.repository));

        let mut query = vec![("scope", scope)];
        if let Some(service) = &challenge.service {
            query.push(("service", service.clone()));
        }

        let response = self.send(self.client.get(&challenge.realm).query(&query), reference)?;
        if !response.status().is_success() {
            return Err(CiuxError::registry(format!(
                "{}: token request to {} returned {}",
                reference,
                challenge.realm,
                response.status()
            )));
        }

        let body: TokenResponse = response
            .json()
            .map_err(|e| CiuxError::registry(format!("{}: invalid token response: {}", reference, e)))?;
        body.token
            .or(body.access_token)
            .ok_or_else(|| CiuxError::registry(format!("{}: token response has no token", reference)))
    }
}

/// `HEAD` target for the manifest of `reference`
pub fn manifest_url(reference: &ImageReference) -> String {
    let scheme = if reference.is_insecure() { "http" } else { "https" };
    format!(
        "{}://{}/v2/{}/manifests/{}",
        scheme,
        reference.api_host(),
        reference.repository,
        reference.target.as_str()
    )
}

impl ImageRegistry for HttpRegistry {
    fn exists(&self, reference: &str) -> Result<bool> {
        let reference = ImageReference::parse(reference)?;
        let url = manifest_url(&reference);
        let head = || self.client.head(&url).header(ACCEPT, MANIFEST_MEDIA_TYPES);

        let mut response = self.send(head(), &reference)?;

        if response.status() == StatusCode::UNAUTHORIZED {
            let challenge = response
                .headers()
                .get(WWW_AUTHENTICATE)
                .and_then(|h| h.to_str().ok())
                .and_then(BearerChallenge::parse)
                .ok_or_else(|| CiuxError::registry(format!("{}: unauthorized", reference)))?;

            debug!(realm = %challenge.realm, "Registry requires a bearer token");
            let token = self.fetch_token(&challenge, &reference)?;
            response = self.send(head().header(AUTHORIZATION, format!("Bearer {}", token)), &reference)?;
        }

        debug!(url = %url, status = %response.status(), "Registry manifest query");
        match response.status() {
            StatusCode::OK => Ok(true),
            StatusCode::NOT_FOUND => Ok(false),
            status => Err(CiuxError::registry(format!("{}: unexpected status {}", reference, status))),
        }
    }
}
