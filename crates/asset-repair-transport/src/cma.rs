//! HTTP client for the hosted content management API.
//!
//! Requests are blocking (`ureq`) and are moved onto tokio's blocking pool by
//! the [`AssetApi`] implementation, the same way replay code elsewhere in the
//! workspace wraps blocking network clients.
//!
//! ## Configuration
//!
//! - `CMA_TIMEOUT_SECS` - request timeout (default 30)
//! - `CMA_CONNECT_TIMEOUT_SECS` - connect timeout (default 10)
//!
//! ## Usage
//!
//! ```ignore
//! let client = ManagementClient::new(DEFAULT_API_URL, token);
//! let space = client.get_space("abc123").await?;
//! ```

use anyhow::{anyhow, Result};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, trace};

use asset_repair_types::{Asset, Collection, Environment, FileRef, Space};

use crate::api::{AssetApi, AssetPath};
use crate::error::ApiError;

/// Root of the hosted management API.
pub const DEFAULT_API_URL: &str = "https://api.contentful.com";

const CONTENT_TYPE: &str = "application/vnd.contentful.management.v1+json";
const VERSION_HEADER: &str = "X-Contentful-Version";

/// Client for the content management API.
#[derive(Clone)]
pub struct ManagementClient {
    base_url: String,
    access_token: String,
    agent: ureq::Agent,
    process_polls: usize,
    process_poll_interval: Duration,
}

impl ManagementClient {
    /// Default request timeout in seconds (can be overridden by env).
    const DEFAULT_TIMEOUT_SECS: u64 = 30;
    /// Default connect timeout in seconds (can be overridden by env).
    const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;
    /// How many times to look for a processed file before giving up.
    const DEFAULT_PROCESS_POLLS: usize = 20;
    const DEFAULT_PROCESS_POLL_INTERVAL_MS: u64 = 500;

    fn default_timeouts() -> (Duration, Duration) {
        let timeout_secs = std::env::var("CMA_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(Self::DEFAULT_TIMEOUT_SECS);
        let connect_secs = std::env::var("CMA_CONNECT_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(Self::DEFAULT_CONNECT_TIMEOUT_SECS);
        (
            Duration::from_secs(timeout_secs),
            Duration::from_secs(connect_secs),
        )
    }

    fn build_agent(timeout: Duration, connect_timeout: Duration) -> ureq::Agent {
        ureq::AgentBuilder::new()
            .timeout(timeout)
            .timeout_connect(connect_timeout)
            .build()
    }

    /// Create a client for `base_url` using timeouts from the environment.
    pub fn new(base_url: &str, access_token: &str) -> Self {
        let (timeout, connect_timeout) = Self::default_timeouts();
        Self::with_timeouts(base_url, access_token, timeout, connect_timeout)
    }

    /// Create a client with explicit timeouts.
    pub fn with_timeouts(
        base_url: &str,
        access_token: &str,
        timeout: Duration,
        connect_timeout: Duration,
    ) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            access_token: access_token.to_string(),
            agent: Self::build_agent(timeout, connect_timeout),
            process_polls: Self::DEFAULT_PROCESS_POLLS,
            process_poll_interval: Duration::from_millis(Self::DEFAULT_PROCESS_POLL_INTERVAL_MS),
        }
    }

    /// Override how long `process_asset_for_locale` waits for the file.
    pub fn with_process_polling(mut self, polls: usize, interval: Duration) -> Self {
        self.process_polls = polls.max(1);
        self.process_poll_interval = interval;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn authorize(&self, request: ureq::Request) -> ureq::Request {
        request
            .set("Authorization", &format!("Bearer {}", self.access_token))
            .set("Content-Type", CONTENT_TYPE)
    }

    fn map_error(url: &str, resource: &str, version: Option<u64>, err: ureq::Error) -> ApiError {
        match err {
            ureq::Error::Status(409, _) => ApiError::VersionConflict {
                resource: resource.to_string(),
                sent: version.unwrap_or_default(),
            },
            ureq::Error::Status(404, _) => ApiError::NotFound {
                resource: resource.to_string(),
            },
            ureq::Error::Status(status, response) => ApiError::Http {
                url: url.to_string(),
                status,
                body: response.into_string().unwrap_or_default(),
            },
            ureq::Error::Transport(t) => ApiError::Transport {
                url: url.to_string(),
                message: t.to_string(),
            },
        }
    }

    fn decode<T: DeserializeOwned>(url: &str, response: ureq::Response) -> Result<T> {
        response.into_json::<T>().map_err(|e| {
            ApiError::Decode {
                url: url.to_string(),
                message: e.to_string(),
            }
            .into()
        })
    }

    /// Issue a GET and decode the body.
    fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        resource: &str,
        page: Option<(usize, Option<usize>)>,
    ) -> Result<T> {
        let url = self.url(path);
        let mut request = self.authorize(self.agent.get(&url));
        if let Some((skip, limit)) = page {
            request = request.query("skip", &skip.to_string());
            if let Some(limit) = limit {
                request = request.query("limit", &limit.to_string());
            }
        }
        debug!(url = %url, ?page, "GET");
        let response = request
            .call()
            .map_err(|e| Self::map_error(&url, resource, None, e))?;
        Self::decode(&url, response)
    }

    /// Issue a version-checked mutation and return the response, if any body.
    fn mutate(
        &self,
        method: &str,
        path: &str,
        resource: &str,
        version: u64,
        body: Option<&Value>,
    ) -> Result<Option<Value>> {
        let url = self.url(path);
        let request = self
            .authorize(self.agent.request(method, &url))
            .set(VERSION_HEADER, &version.to_string());
        debug!(method, url = %url, version, "mutation");
        let result = match body {
            Some(body) => request.send_json(body),
            None => request.call(),
        };
        let response = result.map_err(|e| Self::map_error(&url, resource, Some(version), e))?;
        if response.status() == 204 {
            return Ok(None);
        }
        Self::decode(&url, response).map(Some)
    }

    fn mutate_asset(&self, method: &str, suffix: &str, asset: &Asset, body: Option<&Value>) -> Result<Asset> {
        let path = AssetPath::of(asset)?;
        let url_path = format!("{}{}", path.url_path(), suffix);
        let value = self
            .mutate(method, &url_path, &path.to_string(), asset.version(), body)?
            .ok_or_else(|| anyhow!("{} {} returned no body", method, url_path))?;
        trace!(?value, "mutation response");
        serde_json::from_value(value).map_err(|e| {
            ApiError::Decode {
                url: self.url(&url_path),
                message: e.to_string(),
            }
            .into()
        })
    }

    pub fn get_spaces_blocking(&self, skip: usize, limit: Option<usize>) -> Result<Collection<Space>> {
        self.get_json("/spaces", "spaces", Some((skip, limit)))
    }

    pub fn get_space_blocking(&self, space_id: &str) -> Result<Space> {
        self.get_json(
            &format!("/spaces/{}", space_id),
            &format!("space {}", space_id),
            None,
        )
    }

    pub fn get_environments_blocking(
        &self,
        space_id: &str,
        skip: usize,
        limit: Option<usize>,
    ) -> Result<Collection<Environment>> {
        self.get_json(
            &format!("/spaces/{}/environments", space_id),
            &format!("environments of space {}", space_id),
            Some((skip, limit)),
        )
    }

    pub fn get_environment_blocking(&self, space_id: &str, environment_id: &str) -> Result<Environment> {
        self.get_json(
            &format!("/spaces/{}/environments/{}", space_id, environment_id),
            &format!("environment {}/{}", space_id, environment_id),
            None,
        )
    }

    pub fn get_assets_blocking(
        &self,
        space_id: &str,
        environment_id: &str,
        skip: usize,
        limit: Option<usize>,
    ) -> Result<Collection<Asset>> {
        self.get_json(
            &format!("/spaces/{}/environments/{}/assets", space_id, environment_id),
            &format!("assets of {}/{}", space_id, environment_id),
            Some((skip, limit)),
        )
    }

    pub fn get_asset_blocking(
        &self,
        space_id: &str,
        environment_id: &str,
        asset_id: &str,
    ) -> Result<Asset> {
        let path = AssetPath {
            space_id: space_id.to_string(),
            environment_id: environment_id.to_string(),
            asset_id: asset_id.to_string(),
        };
        self.get_json(&path.url_path(), &path.to_string(), None)
    }

    pub fn update_asset_blocking(&self, asset: &Asset) -> Result<Asset> {
        let body = serde_json::json!({ "fields": asset.fields });
        self.mutate_asset("PUT", "", asset, Some(&body))
    }

    pub fn archive_asset_blocking(&self, asset: &Asset) -> Result<Asset> {
        self.mutate_asset("PUT", "/archived", asset, None)
    }

    pub fn unarchive_asset_blocking(&self, asset: &Asset) -> Result<Asset> {
        self.mutate_asset("DELETE", "/archived", asset, None)
    }

    pub fn publish_asset_blocking(&self, asset: &Asset) -> Result<Asset> {
        self.mutate_asset("PUT", "/published", asset, None)
    }

    /// Ask the service to ingest the locale's upload. The service answers
    /// before the file is ready; see [`AssetApi::process_asset_for_locale`].
    pub fn request_processing_blocking(&self, asset: &Asset, locale: &str) -> Result<()> {
        let path = AssetPath::of(asset)?;
        let url_path = format!("{}/files/{}/process", path.url_path(), locale);
        self.mutate("PUT", &url_path, &path.to_string(), asset.version(), None)?;
        Ok(())
    }

    async fn blocking<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&ManagementClient) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let client = self.clone();
        tokio::task::spawn_blocking(move || f(&client))
            .await
            .map_err(|e| anyhow!("blocking request task failed: {}", e))?
    }
}

#[async_trait::async_trait]
impl AssetApi for ManagementClient {
    async fn get_spaces(&self, skip: usize, limit: Option<usize>) -> Result<Collection<Space>> {
        self.blocking(move |c| c.get_spaces_blocking(skip, limit)).await
    }

    async fn get_space(&self, space_id: &str) -> Result<Space> {
        let space_id = space_id.to_string();
        self.blocking(move |c| c.get_space_blocking(&space_id)).await
    }

    async fn get_environments(
        &self,
        space_id: &str,
        skip: usize,
        limit: Option<usize>,
    ) -> Result<Collection<Environment>> {
        let space_id = space_id.to_string();
        self.blocking(move |c| c.get_environments_blocking(&space_id, skip, limit))
            .await
    }

    async fn get_environment(&self, space_id: &str, environment_id: &str) -> Result<Environment> {
        let (space_id, environment_id) = (space_id.to_string(), environment_id.to_string());
        self.blocking(move |c| c.get_environment_blocking(&space_id, &environment_id))
            .await
    }

    async fn get_assets(
        &self,
        space_id: &str,
        environment_id: &str,
        skip: usize,
        limit: Option<usize>,
    ) -> Result<Collection<Asset>> {
        let (space_id, environment_id) = (space_id.to_string(), environment_id.to_string());
        self.blocking(move |c| c.get_assets_blocking(&space_id, &environment_id, skip, limit))
            .await
    }

    async fn get_asset(
        &self,
        space_id: &str,
        environment_id: &str,
        asset_id: &str,
    ) -> Result<Asset> {
        let (space_id, environment_id, asset_id) = (
            space_id.to_string(),
            environment_id.to_string(),
            asset_id.to_string(),
        );
        self.blocking(move |c| c.get_asset_blocking(&space_id, &environment_id, &asset_id))
            .await
    }

    async fn update_asset(&self, asset: &Asset) -> Result<Asset> {
        let asset = asset.clone();
        self.blocking(move |c| c.update_asset_blocking(&asset)).await
    }

    async fn archive_asset(&self, asset: &Asset) -> Result<Asset> {
        let asset = asset.clone();
        self.blocking(move |c| c.archive_asset_blocking(&asset)).await
    }

    async fn unarchive_asset(&self, asset: &Asset) -> Result<Asset> {
        let asset = asset.clone();
        self.blocking(move |c| c.unarchive_asset_blocking(&asset)).await
    }

    async fn publish_asset(&self, asset: &Asset) -> Result<Asset> {
        let asset = asset.clone();
        self.blocking(move |c| c.publish_asset_blocking(&asset)).await
    }

    /// Request processing, then poll until the locale carries a finalized
    /// URL and return that fresh record.
    async fn process_asset_for_locale(&self, asset: &Asset, locale: &str) -> Result<Asset> {
        let path = AssetPath::of(asset)?;
        {
            let asset = asset.clone();
            let locale = locale.to_string();
            self.blocking(move |c| c.request_processing_blocking(&asset, &locale))
                .await?;
        }

        for poll in 1..=self.process_polls {
            tokio::time::sleep(self.process_poll_interval).await;
            let fresh = self
                .get_asset(&path.space_id, &path.environment_id, &path.asset_id)
                .await?;
            if fresh.file(locale).is_some_and(FileRef::is_finalized) {
                debug!(locale, poll, version = fresh.version(), "locale processed");
                return Ok(fresh);
            }
            trace!(locale, poll, "locale not processed yet");
        }

        Err(ApiError::ProcessingIncomplete {
            resource: path.to_string(),
            locale: locale.to_string(),
            polls: self.process_polls,
        }
        .into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_creation() {
        let client = ManagementClient::new(DEFAULT_API_URL, "token");
        assert_eq!(client.base_url(), "https://api.contentful.com");

        let custom = ManagementClient::new("https://cma.internal.example/", "token");
        assert_eq!(custom.base_url(), "https://cma.internal.example");
        assert_eq!(custom.url("/spaces"), "https://cma.internal.example/spaces");
    }

    #[test]
    fn test_process_polling_is_clamped() {
        let client = ManagementClient::new(DEFAULT_API_URL, "token")
            .with_process_polling(0, Duration::from_millis(5));
        assert_eq!(client.process_polls, 1);
    }

    /// Run with: CMA_ACCESS_TOKEN=... cargo test -p asset-repair-transport test_list_spaces -- --ignored --nocapture
    #[tokio::test]
    #[ignore = "requires network access and a CMA_ACCESS_TOKEN"]
    async fn test_list_spaces() {
        let token = std::env::var("CMA_ACCESS_TOKEN").expect("CMA_ACCESS_TOKEN not set");
        let client = ManagementClient::new(DEFAULT_API_URL, &token);
        let page = client.get_spaces(0, Some(10)).await.unwrap();
        println!("Fetched {} spaces (total {:?})", page.items.len(), page.total);
    }
}
