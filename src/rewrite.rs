//! Cross-reference detection for asset file URLs.
//!
//! A finalized file URL has the shape `[scheme:]//host/{space}/{asset}/{token}/{name}`.
//! When the `{space}/{asset}` pair differs from the asset holding the file,
//! the file was copied from another asset and still points into that asset's
//! storage. Such a locale is turned back into an upload of the same URL so the
//! service ingests it again under the right owner.

use anyhow::{anyhow, Result};
use regex::Regex;
use std::sync::LazyLock;
use tracing::{trace, warn};

use asset_repair_types::{Asset, LocaleFiles};

static URL_PATH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(https?:)?//[^/]+/([^/]+)/([^/]+)/[^/]+/[^/]+$")
        .expect("asset URL pattern is a valid regex")
});

/// Rewrite cross-referenced locales of `files` in place.
///
/// `details` is removed from every present file. Returns the rewritten
/// locales in map order.
pub fn rewrite_file_urls(files: &mut LocaleFiles, space_id: &str, asset_id: &str) -> Vec<String> {
    let mut rewritten = Vec::new();

    for (locale, file) in files.iter_mut() {
        let Some(file) = file.as_mut() else {
            trace!(%locale, "file not set");
            continue;
        };
        file.details = None;

        let Some(url) = file.url.as_deref() else {
            trace!(%locale, "url not set for locale");
            continue;
        };

        let Some(caps) = URL_PATH.captures(url) else {
            warn!(%locale, url, "malformed asset url for locale");
            continue;
        };

        let has_scheme = caps.get(1).is_some();
        if &caps[2] == space_id && &caps[3] == asset_id {
            trace!(%locale, url, "asset url for locale is correct");
            continue;
        }

        let upload = if has_scheme {
            url.to_string()
        } else {
            format!("https:{}", url)
        };
        trace!(%locale, upload = %upload, "moved cross-referenced url into upload");
        file.upload = Some(upload);
        file.url = None;
        rewritten.push(locale.clone());
    }

    rewritten
}

/// [`rewrite_file_urls`] against the asset's own space and id.
///
/// An asset without a `file` field has nothing to rewrite. Fails only if the
/// asset carries no space link to compare against.
pub fn rewrite_asset_urls(asset: &mut Asset) -> Result<Vec<String>> {
    let space_id = asset
        .space_id()
        .ok_or_else(|| anyhow!("asset {} has no space link", asset.id()))?
        .to_string();
    let asset_id = asset.id().to_string();

    Ok(match asset.fields.file.as_mut() {
        Some(files) => rewrite_file_urls(files, &space_id, &asset_id),
        None => Vec::new(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use asset_repair_types::FileRef;
    use serde_json::json;

    fn asset_with(files: &[(&str, &str)]) -> Asset {
        files.iter().fold(Asset::new("space", "master", "asset", 1), |asset, (locale, url)| {
            asset.with_file(locale, Some(FileRef::remote(*url).with_details(json!({}))))
        })
    }

    fn file<'a>(asset: &'a Asset, locale: &str) -> &'a FileRef {
        asset.file(locale).unwrap()
    }

    #[test]
    fn test_matching_urls_are_left_alone() {
        let mut asset = asset_with(&[
            ("en-US", "//images.example.net/space/asset/nonce/hello.png"),
            ("es-US", "//images.example.net/space/asset/nonce/hola.png"),
        ]);
        assert!(rewrite_asset_urls(&mut asset).unwrap().is_empty());
        assert_eq!(
            file(&asset, "es-US"),
            &FileRef::remote("//images.example.net/space/asset/nonce/hola.png")
        );
    }

    #[test]
    fn test_foreign_asset_or_space_is_rewritten() {
        let mut asset = asset_with(&[("es-ES", "//images.example.net/space/asset1/nonce/oye.png")]);
        assert_eq!(rewrite_asset_urls(&mut asset).unwrap(), vec!["es-ES"]);

        let mut asset = asset_with(&[("es-ES", "//images.example.net/space1/asset/nonce/oye.png")]);
        assert_eq!(rewrite_asset_urls(&mut asset).unwrap(), vec!["es-ES"]);
    }

    #[test]
    fn test_mixed_locales_keep_map_order() {
        let mut asset = asset_with(&[
            ("en-US", "https://images.example.net/space/asset/nonce/hello.png"),
            ("en-AU", "//images.example.net/space/asset/nonce/gdaymate.png"),
            ("en-UK", "//images.example.net/space1/asset/nonce/hello.png"),
            ("es-US", "https://images.example.net/space/asset1/nonce/hola.png"),
        ]);

        let locales = rewrite_asset_urls(&mut asset).unwrap();
        assert_eq!(locales, vec!["en-UK", "es-US"]);
        assert_eq!(
            file(&asset, "en-US"),
            &FileRef::remote("https://images.example.net/space/asset/nonce/hello.png")
        );
        assert_eq!(
            file(&asset, "en-AU"),
            &FileRef::remote("//images.example.net/space/asset/nonce/gdaymate.png")
        );
        assert_eq!(
            file(&asset, "en-UK"),
            &FileRef::pending("https://images.example.net/space1/asset/nonce/hello.png")
        );
        assert_eq!(
            file(&asset, "es-US"),
            &FileRef::pending("https://images.example.net/space/asset1/nonce/hola.png")
        );
    }

    #[test]
    fn test_scheme_handling() {
        for (url, upload) in [
            (
                "http://images.example.net/space1/asset/nonce/hello.png",
                "http://images.example.net/space1/asset/nonce/hello.png",
            ),
            (
                "HTTPS://images.example.net/space1/asset/nonce/hello.png",
                "HTTPS://images.example.net/space1/asset/nonce/hello.png",
            ),
            (
                "//images.example.net/space1/asset/nonce/hello.png",
                "https://images.example.net/space1/asset/nonce/hello.png",
            ),
        ] {
            let mut asset = asset_with(&[("en-US", url)]);
            rewrite_asset_urls(&mut asset).unwrap();
            assert_eq!(file(&asset, "en-US"), &FileRef::pending(upload), "{}", url);
        }
    }

    #[test]
    fn test_details_cleared_everywhere() {
        let mut asset = asset_with(&[
            ("en-US", "//images.example.net/space/asset1/nonce/hello.png"),
            ("es-US", "https://images.example.net/space/asset/nonce/hola.png"),
        ]);
        rewrite_asset_urls(&mut asset).unwrap();
        assert!(file(&asset, "en-US").details.is_none());
        assert!(file(&asset, "es-US").details.is_none());
    }

    #[test]
    fn test_pending_null_and_malformed_are_skipped() {
        let pending = "http://images.example.net/space1/asset/nonce/hello.png";
        let malformed = "http://images.example.net/space1/nonce/hello.png";
        let mut asset = Asset::new("space", "master", "asset", 1)
            .with_file("en-US", Some(FileRef::pending(pending).with_details(json!({}))))
            .with_file("de-DE", None)
            .with_file("fr-FR", Some(FileRef::remote(malformed).with_details(json!({}))));

        assert!(rewrite_asset_urls(&mut asset).unwrap().is_empty());
        assert_eq!(file(&asset, "en-US"), &FileRef::pending(pending));
        assert_eq!(file(&asset, "fr-FR"), &FileRef::remote(malformed));
        assert!(asset.file("de-DE").is_none());
    }

    #[test]
    fn test_second_pass_finds_nothing() {
        let mut asset = asset_with(&[("en-US", "//images.example.net/space/asset1/nonce/x.png")]);
        assert_eq!(rewrite_asset_urls(&mut asset).unwrap().len(), 1);
        assert!(rewrite_asset_urls(&mut asset).unwrap().is_empty());
    }

    #[test]
    fn test_asset_without_files_or_space() {
        let mut bare = Asset::new("space", "master", "asset", 1);
        assert!(rewrite_asset_urls(&mut bare).unwrap().is_empty());

        bare.sys.space = None;
        assert!(rewrite_asset_urls(&mut bare).is_err());
    }
}
