//! In-process content management service.
//!
//! [`InMemoryApi`] keeps spaces, environments and assets in memory and
//! applies the same rules the hosted service does: every mutation is
//! version-checked and bumps the version, archived assets cannot be changed,
//! published assets cannot be archived, publishing needs pending changes and
//! finalized files, and processing replaces `upload` with a URL owned by the
//! asset. It also records every successful mutation and can be told to fail
//! upcoming calls, which makes repair runs reproducible without a network.

use anyhow::Result;
use indexmap::IndexMap;
use parking_lot::Mutex;
use std::collections::HashMap;

use asset_repair_types::{Asset, Collection, Environment, FileRef, Space};

use crate::api::{AssetApi, AssetPath};
use crate::error::ApiError;

/// Every call the service accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    GetSpaces,
    GetSpace,
    GetEnvironments,
    GetEnvironment,
    GetAssets,
    GetAsset,
    Update,
    Archive,
    Unarchive,
    Publish,
    Process,
}

/// A successful mutation, in the order it was applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutationRecord {
    pub operation: Operation,
    pub asset_id: String,
    pub locale: Option<String>,
    /// Version the caller sent.
    pub version: u64,
}

#[derive(Debug, Clone)]
struct InjectedFailure {
    operation: Operation,
    /// `None` matches any target.
    target: Option<String>,
    remaining: usize,
    conflict: bool,
}

#[derive(Debug)]
struct SpaceEntry {
    space: Space,
    environments: IndexMap<String, EnvironmentEntry>,
}

#[derive(Debug)]
struct EnvironmentEntry {
    environment: Environment,
    assets: IndexMap<String, Asset>,
}

#[derive(Debug)]
struct Store {
    spaces: IndexMap<String, SpaceEntry>,
    mutations: Vec<MutationRecord>,
    calls: HashMap<Operation, usize>,
    failures: Vec<InjectedFailure>,
    max_page_size: usize,
    file_host: String,
}

impl Store {
    fn space(&self, space_id: &str) -> Result<&SpaceEntry, ApiError> {
        self.spaces.get(space_id).ok_or_else(|| ApiError::NotFound {
            resource: format!("space {}", space_id),
        })
    }

    fn environment(&self, space_id: &str, environment_id: &str) -> Result<&EnvironmentEntry, ApiError> {
        self.space(space_id)?
            .environments
            .get(environment_id)
            .ok_or_else(|| ApiError::NotFound {
                resource: format!("environment {}/{}", space_id, environment_id),
            })
    }

    fn asset_mut(&mut self, path: &AssetPath) -> Result<&mut Asset, ApiError> {
        self.spaces
            .get_mut(&path.space_id)
            .and_then(|s| s.environments.get_mut(&path.environment_id))
            .and_then(|e| e.assets.get_mut(&path.asset_id))
            .ok_or_else(|| ApiError::NotFound {
                resource: path.to_string(),
            })
    }

    /// Count the call and fire an injected failure if one matches.
    fn enter(&mut self, operation: Operation, target: &str, resource: &str, version: u64) -> Result<(), ApiError> {
        *self.calls.entry(operation).or_default() += 1;
        let hit = self.failures.iter_mut().find(|f| {
            f.operation == operation
                && f.remaining > 0
                && f.target.as_deref().map_or(true, |t| t == target)
        });
        let Some(failure) = hit else {
            return Ok(());
        };
        failure.remaining -= 1;
        if failure.conflict {
            Err(ApiError::VersionConflict {
                resource: resource.to_string(),
                sent: version,
            })
        } else {
            Err(ApiError::Http {
                url: format!("memory://{}", resource),
                status: 500,
                body: format!("injected {:?} failure", operation),
            })
        }
    }

    fn page<T: Clone>(&self, items: impl Iterator<Item = T>, skip: usize, limit: Option<usize>) -> Collection<T> {
        let all: Vec<T> = items.collect();
        let limit = limit.unwrap_or(self.max_page_size).min(self.max_page_size);
        let items = all.iter().skip(skip).take(limit).cloned().collect();
        Collection::new(skip, limit, items).with_total(all.len())
    }

    /// Apply `change` to the stored asset after checking the sent version,
    /// then bump the version and log the mutation.
    fn mutate(
        &mut self,
        operation: Operation,
        sent: &Asset,
        locale: Option<&str>,
        change: impl FnOnce(&mut Asset, &str) -> Result<(), String>,
    ) -> Result<Asset, ApiError> {
        let path = AssetPath::of(sent).map_err(|e| ApiError::Rejected {
            operation: format!("{:?}", operation),
            resource: sent.id().to_string(),
            reason: e.to_string(),
        })?;
        let resource = path.to_string();
        self.enter(operation, &path.asset_id, &resource, sent.version())?;

        let file_host = self.file_host.clone();
        let stored = self.asset_mut(&path)?;
        if stored.version() != sent.version() {
            return Err(ApiError::VersionConflict {
                resource,
                sent: sent.version(),
            });
        }
        change(stored, &file_host).map_err(|reason| ApiError::Rejected {
            operation: format!("{:?}", operation),
            resource: resource.clone(),
            reason,
        })?;
        stored.sys.version += 1;
        let result = stored.clone();

        self.mutations.push(MutationRecord {
            operation,
            asset_id: path.asset_id,
            locale: locale.map(str::to_string),
            version: sent.version(),
        });
        Ok(result)
    }
}

/// In-memory [`AssetApi`] backend.
#[derive(Debug)]
pub struct InMemoryApi {
    store: Mutex<Store>,
}

impl Default for InMemoryApi {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryApi {
    /// Largest page served when the caller does not ask for less.
    pub const DEFAULT_MAX_PAGE_SIZE: usize = 100;

    pub fn new() -> Self {
        Self {
            store: Mutex::new(Store {
                spaces: IndexMap::new(),
                mutations: Vec::new(),
                calls: HashMap::new(),
                failures: Vec::new(),
                max_page_size: Self::DEFAULT_MAX_PAGE_SIZE,
                file_host: "images.example.net".to_string(),
            }),
        }
    }

    /// Cap every listing page at `size` items.
    pub fn with_max_page_size(self, size: usize) -> Self {
        self.store.lock().max_page_size = size.max(1);
        self
    }

    pub fn with_space(self, space_id: &str) -> Self {
        self.insert_space(space_id);
        self
    }

    pub fn with_environment(self, space_id: &str, environment_id: &str) -> Self {
        self.insert_environment(Environment::new(space_id, environment_id));
        self
    }

    /// An environment that aliases `target`.
    pub fn with_alias(self, space_id: &str, alias_id: &str, target: &str) -> Self {
        self.insert_environment(Environment::alias(space_id, alias_id, target));
        self
    }

    /// Store `asset` under the space and environment its links name,
    /// creating both if needed.
    pub fn with_asset(self, asset: Asset) -> Self {
        self.insert_asset(asset);
        self
    }

    fn insert_space(&self, space_id: &str) {
        self.store
            .lock()
            .spaces
            .entry(space_id.to_string())
            .or_insert_with(|| SpaceEntry {
                space: Space::new(space_id),
                environments: IndexMap::new(),
            });
    }

    fn insert_environment(&self, environment: Environment) {
        let space_id = environment
            .sys
            .space
            .as_ref()
            .map(|l| l.sys.id.clone())
            .unwrap_or_default();
        self.insert_space(&space_id);
        let mut store = self.store.lock();
        if let Some(space) = store.spaces.get_mut(&space_id) {
            space
                .environments
                .entry(environment.id().to_string())
                .or_insert_with(|| EnvironmentEntry {
                    environment,
                    assets: IndexMap::new(),
                });
        }
    }

    /// Insert or replace an asset.
    pub fn insert_asset(&self, asset: Asset) {
        let space_id = asset.space_id().unwrap_or_default().to_string();
        let environment_id = asset.environment_id().unwrap_or_default().to_string();
        self.insert_environment(Environment::new(&space_id, &environment_id));
        let mut store = self.store.lock();
        if let Some(env) = store
            .spaces
            .get_mut(&space_id)
            .and_then(|s| s.environments.get_mut(&environment_id))
        {
            env.assets.insert(asset.id().to_string(), asset);
        }
    }

    /// Current stored state of an asset.
    pub fn asset(&self, space_id: &str, environment_id: &str, asset_id: &str) -> Option<Asset> {
        let store = self.store.lock();
        store
            .environment(space_id, environment_id)
            .ok()?
            .assets
            .get(asset_id)
            .cloned()
    }

    /// Simulate somebody else editing the asset: bump its version.
    pub fn touch_asset(&self, space_id: &str, environment_id: &str, asset_id: &str) {
        let path = AssetPath {
            space_id: space_id.to_string(),
            environment_id: environment_id.to_string(),
            asset_id: asset_id.to_string(),
        };
        if let Ok(asset) = self.store.lock().asset_mut(&path) {
            asset.sys.version += 1;
        }
    }

    /// Make the next `times` calls of `operation` fail with an HTTP 500.
    /// `target` restricts it to one asset, space or environment id.
    pub fn fail_next(&self, operation: Operation, target: Option<&str>, times: usize) {
        self.inject(operation, target, times, false);
    }

    /// Make the next `times` calls of `operation` fail with a version conflict.
    pub fn conflict_next(&self, operation: Operation, target: Option<&str>, times: usize) {
        self.inject(operation, target, times, true);
    }

    fn inject(&self, operation: Operation, target: Option<&str>, times: usize, conflict: bool) {
        self.store.lock().failures.push(InjectedFailure {
            operation,
            target: target.map(str::to_string),
            remaining: times,
            conflict,
        });
    }

    /// Successful mutations so far.
    pub fn mutations(&self) -> Vec<MutationRecord> {
        self.store.lock().mutations.clone()
    }

    /// How many times `operation` was called, failed calls included.
    pub fn calls(&self, operation: Operation) -> usize {
        self.store.lock().calls.get(&operation).copied().unwrap_or(0)
    }
}

fn file_name_of(file: &FileRef, source: &str) -> String {
    file.file_name.clone().unwrap_or_else(|| {
        source
            .rsplit('/')
            .next()
            .filter(|s| !s.is_empty())
            .unwrap_or("file")
            .to_string()
    })
}

#[async_trait::async_trait]
impl AssetApi for InMemoryApi {
    async fn get_spaces(&self, skip: usize, limit: Option<usize>) -> Result<Collection<Space>> {
        let mut store = self.store.lock();
        store.enter(Operation::GetSpaces, "", "spaces", 0)?;
        Ok(store.page(store.spaces.values().map(|s| s.space.clone()), skip, limit))
    }

    async fn get_space(&self, space_id: &str) -> Result<Space> {
        let mut store = self.store.lock();
        let resource = format!("space {}", space_id);
        store.enter(Operation::GetSpace, space_id, &resource, 0)?;
        Ok(store.space(space_id)?.space.clone())
    }

    async fn get_environments(
        &self,
        space_id: &str,
        skip: usize,
        limit: Option<usize>,
    ) -> Result<Collection<Environment>> {
        let mut store = self.store.lock();
        let resource = format!("environments of space {}", space_id);
        store.enter(Operation::GetEnvironments, space_id, &resource, 0)?;
        let space = store.space(space_id)?;
        Ok(store.page(
            space.environments.values().map(|e| e.environment.clone()),
            skip,
            limit,
        ))
    }

    async fn get_environment(&self, space_id: &str, environment_id: &str) -> Result<Environment> {
        let mut store = self.store.lock();
        let resource = format!("environment {}/{}", space_id, environment_id);
        store.enter(Operation::GetEnvironment, environment_id, &resource, 0)?;
        Ok(store.environment(space_id, environment_id)?.environment.clone())
    }

    async fn get_assets(
        &self,
        space_id: &str,
        environment_id: &str,
        skip: usize,
        limit: Option<usize>,
    ) -> Result<Collection<Asset>> {
        let mut store = self.store.lock();
        let resource = format!("assets of {}/{}", space_id, environment_id);
        store.enter(Operation::GetAssets, environment_id, &resource, 0)?;
        let env = store.environment(space_id, environment_id)?;
        Ok(store.page(env.assets.values().cloned(), skip, limit))
    }

    async fn get_asset(
        &self,
        space_id: &str,
        environment_id: &str,
        asset_id: &str,
    ) -> Result<Asset> {
        let mut store = self.store.lock();
        let path = AssetPath {
            space_id: space_id.to_string(),
            environment_id: environment_id.to_string(),
            asset_id: asset_id.to_string(),
        };
        store.enter(Operation::GetAsset, asset_id, &path.to_string(), 0)?;
        Ok(store.asset_mut(&path)?.clone())
    }

    async fn update_asset(&self, asset: &Asset) -> Result<Asset> {
        let fields = asset.fields.clone();
        let updated = self.store.lock().mutate(Operation::Update, asset, None, |stored, _| {
            if stored.is_archived() {
                return Err("cannot update an archived asset".to_string());
            }
            let sends_details = fields
                .file
                .iter()
                .flat_map(|files| files.values())
                .flatten()
                .any(|f| f.details.is_some());
            if sends_details {
                return Err("file details are computed by the service".to_string());
            }
            stored.fields = fields;
            Ok(())
        })?;
        Ok(updated)
    }

    async fn archive_asset(&self, asset: &Asset) -> Result<Asset> {
        let archived = self.store.lock().mutate(Operation::Archive, asset, None, |stored, _| {
            if stored.is_published() {
                return Err("cannot archive a published asset".to_string());
            }
            if stored.is_archived() {
                return Err("asset is already archived".to_string());
            }
            stored.sys.archived_version = Some(stored.sys.version);
            Ok(())
        })?;
        Ok(archived)
    }

    async fn unarchive_asset(&self, asset: &Asset) -> Result<Asset> {
        let unarchived = self.store.lock().mutate(Operation::Unarchive, asset, None, |stored, _| {
            if !stored.is_archived() {
                return Err("cannot unarchive a non-archived asset".to_string());
            }
            stored.sys.archived_version = None;
            Ok(())
        })?;
        Ok(unarchived)
    }

    async fn publish_asset(&self, asset: &Asset) -> Result<Asset> {
        let published = self.store.lock().mutate(Operation::Publish, asset, None, |stored, _| {
            if stored.is_archived() {
                return Err("cannot publish an archived asset".to_string());
            }
            if stored.is_published() && !stored.is_updated() {
                return Err("nothing to publish".to_string());
            }
            let unprocessed = stored
                .fields
                .file
                .iter()
                .flat_map(|files| files.iter())
                .filter_map(|(locale, file)| file.as_ref().map(|f| (locale, f)))
                .find(|(_, f)| !f.is_finalized());
            if let Some((locale, _)) = unprocessed {
                return Err(format!("file for locale {} is not processed", locale));
            }
            stored.sys.published_version = Some(stored.sys.version);
            Ok(())
        })?;
        Ok(published)
    }

    async fn process_asset_for_locale(&self, asset: &Asset, locale: &str) -> Result<Asset> {
        let processed = self.store.lock().mutate(Operation::Process, asset, Some(locale), |stored, host| {
            if stored.is_archived() {
                return Err("cannot process an archived asset".to_string());
            }
            let space_id = stored.space_id().unwrap_or_default().to_string();
            let asset_id = stored.id().to_string();
            let file = stored
                .fields
                .file
                .as_mut()
                .and_then(|files| files.get_mut(locale))
                .and_then(Option::as_mut)
                .ok_or_else(|| format!("no file for locale {}", locale))?;
            let upload = file
                .upload
                .take()
                .ok_or_else(|| format!("nothing to process for locale {}", locale))?;
            let nonce = uuid::Uuid::new_v4().simple().to_string();
            file.url = Some(format!(
                "//{}/{}/{}/{}/{}",
                host,
                space_id,
                asset_id,
                nonce,
                file_name_of(file, &upload)
            ));
            Ok(())
        })?;
        Ok(processed)
    }
}
