//! Error types for object-store settings resolution.
//!
//! # Design
//! - Every variant is fatal at startup; nothing here is retried.
//! - Messages stay constant while context fields carry the offending values.

use thiserror::Error;

use crate::model::StorageType;

/// Primary error type for settings resolution.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Bucket path matched one of the traversal/anchor patterns.
    #[error("invalid bucket")]
    InvalidBucket {
        /// Bucket value as configured.
        value: String,
    },
    /// A Workhorse-accelerated type had neither a legacy section nor an override.
    #[error("incomplete object storage configuration")]
    IncompleteConfiguration {
        /// Storage type lacking configuration.
        store: StorageType,
    },
    /// An enabled consolidated type resolved without a bucket.
    #[error("object storage must have a bucket specified")]
    MissingBucket {
        /// Storage type missing its bucket.
        store: StorageType,
    },
    /// Override block carried a key outside the allow-list.
    #[error("unsupported object storage override")]
    UnknownOverride {
        /// Storage type owning the override block.
        store: StorageType,
        /// Rejected override key.
        key: String,
    },
    /// Storage type name was not recognised.
    #[error("unknown storage type")]
    UnknownStorageType {
        /// Storage type payload provided by the caller.
        value: String,
    },
    /// Bucket validation pattern failed to compile.
    #[error("failed to compile bucket pattern")]
    BucketPattern {
        /// Source regex error.
        source: regex::Error,
    },
    /// Section of the settings tree did not have the expected shape.
    #[error("invalid settings section")]
    InvalidSection {
        /// Dotted path of the offending section.
        section: String,
        /// Source deserialisation error.
        source: serde_json::Error,
    },
}

impl ConfigError {
    pub(crate) fn invalid_section(section: impl Into<String>, source: serde_json::Error) -> Self {
        Self::InvalidSection {
            section: section.into(),
            source,
        }
    }
}

/// Convenience alias for settings results.
pub type ConfigResult<T> = Result<T, ConfigError>;
