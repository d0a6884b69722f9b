//! Normalisation of legacy per-type object-store blocks.
//!
//! # Design
//! - Applies defaults to whatever a per-type block left unset.
//! - Direct upload is forced on regardless of the configured value.
//! - Bucket paths are split and validated here so bad values fail at load time.

use tracing::debug;

use crate::defaults::RESERVED_RESOLVED_KEYS;
use crate::error::ConfigResult;
use crate::model::{RawObjectStoreConfig, ResolvedObjectStoreConfig, StorageType};
use crate::validate::split_bucket_prefix;

/// Normalise a possibly-absent legacy block into a fully populated config.
///
/// `store` is only used for diagnostics.
///
/// # Errors
///
/// Returns [`crate::ConfigError::InvalidBucket`] when `remote_directory` has
/// an unsafe path shape.
pub fn normalize_legacy(
    raw: Option<RawObjectStoreConfig>,
    store: StorageType,
) -> ConfigResult<ResolvedObjectStoreConfig> {
    let mut raw = raw.unwrap_or_default();
    for key in RESERVED_RESOLVED_KEYS {
        if raw.extra.remove(key).is_some() {
            debug!(store = %store, key, "dropping reserved key from legacy object storage block");
        }
    }
    let (remote_directory, split_prefix) = split_bucket_prefix(raw.remote_directory.as_deref())?;
    let bucket_prefix = split_prefix.or(raw.bucket_prefix);

    if raw.direct_upload == Some(false) {
        debug!(store = %store, "legacy direct_upload=false overridden; direct uploads are mandatory");
    }

    Ok(ResolvedObjectStoreConfig {
        enabled: raw.enabled.unwrap_or(false),
        remote_directory,
        bucket_prefix,
        direct_upload: true,
        proxy_download: raw.proxy_download.unwrap_or(false),
        storage_options: raw.storage_options.unwrap_or_default(),
        connection: raw.connection,
        cdn: None,
        consolidated_settings: false,
        extra: raw.extra,
    })
}
