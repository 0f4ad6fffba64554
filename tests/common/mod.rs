#![allow(unused_imports)]
//! Shared test utilities for integration tests.
//!
//! # Modules
//!
//! - `fixtures`: asset builders, seeded services and default options
//! - `mocks`: an [`AssetApi`](asset_repair_transport::AssetApi) wrapper that
//!   cancels the run from inside a call
//! - `assertions`: assertion helpers with better failure messages

pub mod assertions;
pub mod fixtures;
pub mod mocks;

pub use assertions::{assert_error_contains, assert_ids, assert_ok};
pub use fixtures::{
    clean_asset, cross_ref_asset, foreign_url, options, published_cross_ref_asset, scope, ENV,
    SPACE,
};
pub use mocks::CancellingApi;
