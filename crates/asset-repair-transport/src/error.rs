//! Errors raised by [`AssetApi`](crate::AssetApi) implementations.
//!
//! The trait itself returns `anyhow::Result`; these values travel inside the
//! `anyhow::Error` so callers can still tell a version conflict apart from
//! everything else.

/// A failed call against the content management service.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ApiError {
    /// The record changed since the caller last read it.
    #[error("version conflict on {resource}: sent version {sent}")]
    VersionConflict { resource: String, sent: u64 },

    #[error("{resource} not found")]
    NotFound { resource: String },

    /// The service refused the operation for the record's current state.
    #[error("{operation} rejected for {resource}: {reason}")]
    Rejected {
        operation: String,
        resource: String,
        reason: String,
    },

    /// Processing was accepted but the file never became available.
    #[error("processing of locale {locale} for {resource} did not finish after {polls} polls")]
    ProcessingIncomplete {
        resource: String,
        locale: String,
        polls: usize,
    },

    #[error("request to {url} failed with HTTP {status}: {body}")]
    Http {
        url: String,
        status: u16,
        body: String,
    },

    #[error("transport error for {url}: {message}")]
    Transport { url: String, message: String },

    #[error("failed to decode response from {url}: {message}")]
    Decode { url: String, message: String },
}

impl ApiError {
    pub fn is_version_conflict(&self) -> bool {
        matches!(self, ApiError::VersionConflict { .. })
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, ApiError::NotFound { .. })
    }
}

/// True if any error in the chain is an [`ApiError::VersionConflict`].
pub fn is_version_conflict(error: &anyhow::Error) -> bool {
    error
        .chain()
        .filter_map(|e| e.downcast_ref::<ApiError>())
        .any(ApiError::is_version_conflict)
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;

    #[test]
    fn test_version_conflict_survives_context() {
        let err: anyhow::Result<()> = Err(ApiError::VersionConflict {
            resource: "asset a1".to_string(),
            sent: 3,
        }
        .into());
        let err = err.context("update asset a1").unwrap_err();
        assert!(is_version_conflict(&err));

        let other = anyhow::Error::from(ApiError::NotFound {
            resource: "space s".to_string(),
        });
        assert!(!is_version_conflict(&other));
    }
}
