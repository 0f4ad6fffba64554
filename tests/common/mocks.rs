//! Service wrappers used to steer a run from the outside.

use anyhow::Result;
use asset_repair::CancellationToken;
use asset_repair_transport::{AssetApi, InMemoryApi, Operation};
use asset_repair_types::{Asset, Collection, Environment, Space};

/// Delegates to an [`InMemoryApi`] and cancels `token` as soon as
/// `trigger` is called, the way an interrupt arriving mid-asset would.
pub struct CancellingApi {
    pub inner: InMemoryApi,
    pub token: CancellationToken,
    pub trigger: Operation,
}

impl CancellingApi {
    pub fn new(inner: InMemoryApi, token: CancellationToken, trigger: Operation) -> Self {
        Self {
            inner,
            token,
            trigger,
        }
    }

    fn observe(&self, operation: Operation) {
        if operation == self.trigger {
            self.token.cancel();
        }
    }
}

#[async_trait::async_trait]
impl AssetApi for CancellingApi {
    async fn get_spaces(&self, skip: usize, limit: Option<usize>) -> Result<Collection<Space>> {
        self.observe(Operation::GetSpaces);
        self.inner.get_spaces(skip, limit).await
    }

    async fn get_space(&self, space_id: &str) -> Result<Space> {
        self.observe(Operation::GetSpace);
        self.inner.get_space(space_id).await
    }

    async fn get_environments(
        &self,
        space_id: &str,
        skip: usize,
        limit: Option<usize>,
    ) -> Result<Collection<Environment>> {
        self.observe(Operation::GetEnvironments);
        self.inner.get_environments(space_id, skip, limit).await
    }

    async fn get_environment(&self, space_id: &str, environment_id: &str) -> Result<Environment> {
        self.observe(Operation::GetEnvironment);
        self.inner.get_environment(space_id, environment_id).await
    }

    async fn get_assets(
        &self,
        space_id: &str,
        environment_id: &str,
        skip: usize,
        limit: Option<usize>,
    ) -> Result<Collection<Asset>> {
        self.observe(Operation::GetAssets);
        self.inner.get_assets(space_id, environment_id, skip, limit).await
    }

    async fn get_asset(&self, space_id: &str, environment_id: &str, asset_id: &str) -> Result<Asset> {
        self.observe(Operation::GetAsset);
        self.inner.get_asset(space_id, environment_id, asset_id).await
    }

    async fn update_asset(&self, asset: &Asset) -> Result<Asset> {
        self.observe(Operation::Update);
        self.inner.update_asset(asset).await
    }

    async fn archive_asset(&self, asset: &Asset) -> Result<Asset> {
        self.observe(Operation::Archive);
        self.inner.archive_asset(asset).await
    }

    async fn unarchive_asset(&self, asset: &Asset) -> Result<Asset> {
        self.observe(Operation::Unarchive);
        self.inner.unarchive_asset(asset).await
    }

    async fn publish_asset(&self, asset: &Asset) -> Result<Asset> {
        self.observe(Operation::Publish);
        self.inner.publish_asset(asset).await
    }

    async fn process_asset_for_locale(&self, asset: &Asset, locale: &str) -> Result<Asset> {
        self.observe(Operation::Process);
        self.inner.process_asset_for_locale(asset, locale).await
    }
}
