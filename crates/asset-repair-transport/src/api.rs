//! Remote resource client abstraction.
//!
//! The repair pipeline only needs listings, id lookups and the handful of
//! version-checked asset mutations below. Backends (the hosted HTTP service,
//! the in-memory service used by tests) implement this trait so callers are not
//! coupled to one of them.

use anyhow::{anyhow, Result};

use asset_repair_types::{Asset, Collection, Environment, Space};

/// Listings, lookups and asset mutations, one level of the hierarchy at a time.
///
/// Every mutation sends `asset.sys.version` and fails with
/// [`ApiError::VersionConflict`](crate::ApiError::VersionConflict) if the
/// service holds a different one. On success the returned asset carries the
/// bumped version and must be used for the next call.
#[async_trait::async_trait]
pub trait AssetApi: Send + Sync {
    /// List spaces visible to the credentials.
    async fn get_spaces(&self, skip: usize, limit: Option<usize>) -> Result<Collection<Space>>;

    async fn get_space(&self, space_id: &str) -> Result<Space>;

    async fn get_environments(
        &self,
        space_id: &str,
        skip: usize,
        limit: Option<usize>,
    ) -> Result<Collection<Environment>>;

    async fn get_environment(&self, space_id: &str, environment_id: &str) -> Result<Environment>;

    async fn get_assets(
        &self,
        space_id: &str,
        environment_id: &str,
        skip: usize,
        limit: Option<usize>,
    ) -> Result<Collection<Asset>>;

    async fn get_asset(
        &self,
        space_id: &str,
        environment_id: &str,
        asset_id: &str,
    ) -> Result<Asset>;

    /// Persist `asset.fields`.
    async fn update_asset(&self, asset: &Asset) -> Result<Asset>;

    async fn archive_asset(&self, asset: &Asset) -> Result<Asset>;

    async fn unarchive_asset(&self, asset: &Asset) -> Result<Asset>;

    async fn publish_asset(&self, asset: &Asset) -> Result<Asset>;

    /// Ingest the locale's `upload` source into an asset-owned `url`.
    async fn process_asset_for_locale(&self, asset: &Asset, locale: &str) -> Result<Asset>;
}

/// Owned coordinates of an asset.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AssetPath {
    pub space_id: String,
    pub environment_id: String,
    pub asset_id: String,
}

impl AssetPath {
    /// Read the coordinates from the asset's links.
    pub fn of(asset: &Asset) -> Result<Self> {
        let space_id = asset
            .space_id()
            .ok_or_else(|| anyhow!("asset {} has no space link", asset.id()))?;
        let environment_id = asset
            .environment_id()
            .ok_or_else(|| anyhow!("asset {} has no environment link", asset.id()))?;
        Ok(Self {
            space_id: space_id.to_string(),
            environment_id: environment_id.to_string(),
            asset_id: asset.id().to_string(),
        })
    }

    /// Path of the asset below the API root.
    pub fn url_path(&self) -> String {
        format!(
            "/spaces/{}/environments/{}/assets/{}",
            self.space_id, self.environment_id, self.asset_id
        )
    }
}

impl std::fmt::Display for AssetPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "asset {}/{}/{}",
            self.space_id, self.environment_id, self.asset_id
        )
    }
}
