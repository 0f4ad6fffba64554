//! Fixture builders for repair runs against the in-memory service.

use asset_repair::RunScope;
use asset_repair_types::{Asset, FileRef, RepairOptions, RetryPolicy};

pub const SPACE: &str = "space";
pub const ENV: &str = "master";

/// A URL that belongs to `<asset_id>-old` in the same space.
pub fn foreign_url(space_id: &str, asset_id: &str) -> String {
    format!("//images.example.net/{}/{}-old/nonce/file.png", space_id, asset_id)
}

/// Draft asset whose only file is a cross-reference.
pub fn cross_ref_asset(space_id: &str, environment_id: &str, asset_id: &str) -> Asset {
    Asset::new(space_id, environment_id, asset_id, 1).with_file(
        "en-US",
        Some(FileRef::remote(foreign_url(space_id, asset_id))),
    )
}

/// Published asset with no pending edits and a cross-referenced file.
pub fn published_cross_ref_asset(space_id: &str, environment_id: &str, asset_id: &str) -> Asset {
    let mut asset = cross_ref_asset(space_id, environment_id, asset_id).with_published_version(1);
    asset.sys.version = 2;
    asset
}

/// Asset whose file already belongs to it.
pub fn clean_asset(space_id: &str, environment_id: &str, asset_id: &str) -> Asset {
    Asset::new(space_id, environment_id, asset_id, 1).with_file(
        "en-US",
        Some(FileRef::remote(format!(
            "https://images.example.net/{}/{}/nonce/file.png",
            space_id, asset_id
        ))),
    )
}

/// Default repair options without retry delays.
pub fn options() -> RepairOptions {
    RepairOptions {
        processing: RetryPolicy::immediate(3),
        ..Default::default()
    }
}

/// Explicit space and environment ids; an empty slice means "all".
pub fn scope(space_ids: &[&str], environment_ids: &[&str]) -> RunScope {
    fn owned(ids: &[&str]) -> Option<Vec<String>> {
        (!ids.is_empty()).then(|| ids.iter().map(|id| id.to_string()).collect())
    }
    RunScope {
        space_ids: owned(space_ids),
        environment_ids: owned(environment_ids),
    }
}
