//! Asset records as returned by the content management API.
//!
//! Only the parts of the record the repair pipeline reasons about are typed.
//! Everything else is kept in `extra`/`other` maps so that a record can be
//! read, modified and written back without losing fields.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::scope::Link;

/// Per-locale file map. Iteration order is the order the server sent.
pub type LocaleFiles = IndexMap<String, Option<FileRef>>;

/// A binary asset record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Asset {
    pub sys: AssetSys,
    #[serde(default)]
    pub fields: AssetFields,
}

/// System metadata of an asset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetSys {
    pub id: String,
    /// Monotonically increasing; every mutation is checked against it.
    pub version: u64,
    /// Absent when the asset was never published.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published_version: Option<u64>,
    /// Present while the asset is archived.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub archived_version: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub space: Option<Link>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub environment: Option<Link>,
    #[serde(flatten)]
    pub extra: IndexMap<String, Value>,
}

/// Asset fields. `file` is the only one the pipeline touches.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AssetFields {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<LocaleFiles>,
    #[serde(flatten)]
    pub other: IndexMap<String, Value>,
}

/// One locale's file.
///
/// A finalized file carries `url`; a file waiting to be ingested carries
/// `upload`. `details` is computed by the server and must not be sent back in
/// a mutation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileRef {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upload: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    #[serde(flatten)]
    pub extra: IndexMap<String, Value>,
}

/// Borrowed view of the shape a [`FileRef`] is in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileState<'a> {
    /// Finalized; the URL is what the server serves.
    Remote(&'a str),
    /// Waiting for the server to ingest `upload`.
    Pending(&'a str),
    /// Neither a URL nor an upload source.
    Empty,
}

impl FileRef {
    /// A finalized file at `url`.
    pub fn remote(url: impl Into<String>) -> Self {
        Self {
            url: Some(url.into()),
            ..Default::default()
        }
    }

    /// A file awaiting ingestion from `upload`.
    pub fn pending(upload: impl Into<String>) -> Self {
        Self {
            upload: Some(upload.into()),
            ..Default::default()
        }
    }

    pub fn with_details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }

    pub fn state(&self) -> FileState<'_> {
        match (&self.url, &self.upload) {
            (Some(url), _) => FileState::Remote(url),
            (None, Some(upload)) => FileState::Pending(upload),
            (None, None) => FileState::Empty,
        }
    }

    pub fn is_finalized(&self) -> bool {
        self.url.is_some() && self.upload.is_none()
    }
}

impl Asset {
    /// Build a bare asset; mostly useful for fixtures.
    pub fn new(space_id: &str, environment_id: &str, asset_id: &str, version: u64) -> Self {
        Self {
            sys: AssetSys {
                id: asset_id.to_string(),
                version,
                published_version: None,
                archived_version: None,
                space: Some(Link::new("Space", space_id)),
                environment: Some(Link::new("Environment", environment_id)),
                extra: IndexMap::new(),
            },
            fields: AssetFields::default(),
        }
    }

    pub fn with_file(mut self, locale: &str, file: Option<FileRef>) -> Self {
        self.fields
            .file
            .get_or_insert_with(IndexMap::new)
            .insert(locale.to_string(), file);
        self
    }

    pub fn with_published_version(mut self, version: u64) -> Self {
        self.sys.published_version = Some(version);
        self
    }

    pub fn with_archived_version(mut self, version: u64) -> Self {
        self.sys.archived_version = Some(version);
        self
    }

    pub fn id(&self) -> &str {
        &self.sys.id
    }

    pub fn version(&self) -> u64 {
        self.sys.version
    }

    pub fn space_id(&self) -> Option<&str> {
        self.sys.space.as_ref().map(|l| l.sys.id.as_str())
    }

    pub fn environment_id(&self) -> Option<&str> {
        self.sys.environment.as_ref().map(|l| l.sys.id.as_str())
    }

    /// Never published.
    pub fn is_draft(&self) -> bool {
        self.sys.published_version.is_none()
    }

    pub fn is_published(&self) -> bool {
        !self.is_draft()
    }

    /// Published, with edits beyond that publish. Drafts are never updated.
    ///
    /// Publishing bumps the version once, so a freshly published asset sits
    /// exactly one version ahead of `published_version`.
    pub fn is_updated(&self) -> bool {
        match self.sys.published_version {
            None => false,
            Some(published) => self.sys.version.saturating_sub(published) > 1,
        }
    }

    pub fn is_archived(&self) -> bool {
        self.sys.archived_version.is_some()
    }

    pub fn file(&self, locale: &str) -> Option<&FileRef> {
        self.fields.file.as_ref()?.get(locale)?.as_ref()
    }
}
