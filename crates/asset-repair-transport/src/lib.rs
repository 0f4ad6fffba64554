//! Asset Repair Transport Layer
//!
//! Everything that talks to the content management service lives here.
//!
//! This crate provides:
//! - [`api`]: the [`AssetApi`] trait the repair pipeline is written against
//! - [`cma`]: [`ManagementClient`], the HTTP client for the hosted service
//! - [`memory`]: [`InMemoryApi`], an in-process service with the same rules
//! - [`paginate`]: [`Paginator`], a lazy sequence over skip/limit listings
//! - [`error`]: [`ApiError`], with version conflicts kept distinguishable
//!
//! # Example
//!
//! ```ignore
//! use asset_repair_transport::{AssetApi, ManagementClient, Paginator};
//!
//! let client = ManagementClient::new(DEFAULT_API_URL, token);
//! let mut spaces = Paginator::new(|skip, limit| client.get_spaces(skip, limit));
//! while let Some(space) = spaces.next().await? {
//!     println!("{}", space.id());
//! }
//! ```

pub mod api;
pub mod cma;
pub mod error;
pub mod memory;
pub mod paginate;

// Re-export main types for convenience
pub use api::{AssetApi, AssetPath};
pub use cma::{ManagementClient, DEFAULT_API_URL};
pub use error::{is_version_conflict, ApiError};
pub use memory::{InMemoryApi, MutationRecord, Operation};
pub use paginate::Paginator;
