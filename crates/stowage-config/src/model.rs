//! Typed settings models for raw input blocks and resolved output.
//!
//! # Design
//! - Pure data carriers; parsing lives in `tree.rs`, resolution in `resolve.rs`.
//! - Unknown keys on legacy blocks are preserved so storage backends still see them.

use std::collections::BTreeMap;
use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::ConfigError;

/// Storage subsystems that may be backed by object storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageType {
    /// CI job artifacts.
    Artifacts,
    /// Merge request diffs stored outside the database.
    ExternalDiffs,
    /// Git LFS objects.
    Lfs,
    /// User uploads and attachments.
    Uploads,
    /// Package registry files.
    Packages,
    /// Dependency proxy blobs and manifests.
    DependencyProxy,
    /// Terraform state files.
    TerraformState,
    /// Static site deployments.
    Pages,
    /// CI secure files.
    CiSecureFiles,
}

impl StorageType {
    /// Every supported storage type in declaration order.
    pub const ALL: [Self; 9] = [
        Self::Artifacts,
        Self::ExternalDiffs,
        Self::Lfs,
        Self::Uploads,
        Self::Packages,
        Self::DependencyProxy,
        Self::TerraformState,
        Self::Pages,
        Self::CiSecureFiles,
    ];

    #[must_use]
    /// Render the storage type as its settings-tree key.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Artifacts => "artifacts",
            Self::ExternalDiffs => "external_diffs",
            Self::Lfs => "lfs",
            Self::Uploads => "uploads",
            Self::Packages => "packages",
            Self::DependencyProxy => "dependency_proxy",
            Self::TerraformState => "terraform_state",
            Self::Pages => "pages",
            Self::CiSecureFiles => "ci_secure_files",
        }
    }

    /// Whether uploads for this type go through Workhorse and therefore must
    /// share the consolidated credential.
    #[must_use]
    pub const fn is_workhorse_accelerated(self) -> bool {
        !self.allows_incomplete()
    }

    /// Whether this type may stay on its own storage (or disk) when
    /// consolidated settings are active.
    #[must_use]
    pub const fn allows_incomplete(self) -> bool {
        matches!(self, Self::Pages | Self::CiSecureFiles)
    }
}

impl Display for StorageType {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

impl FromStr for StorageType {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|store| store.as_str() == s)
            .ok_or_else(|| ConfigError::UnknownStorageType {
                value: s.to_string(),
            })
    }
}

/// Object-store block as written in a per-type section.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawObjectStoreConfig {
    /// Whether object storage is enabled for the type.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    /// Bucket name, optionally followed by `/prefix`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remote_directory: Option<String>,
    /// Sub-path inside the bucket.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bucket_prefix: Option<String>,
    /// Direct upload flag; always forced on during normalisation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub direct_upload: Option<bool>,
    /// Whether downloads are proxied through the application.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proxy_download: Option<bool>,
    /// Provider-specific storage options (encryption etc.).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage_options: Option<Map<String, Value>>,
    /// Provider credentials, opaque to the resolver.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connection: Option<Map<String, Value>>,
    /// Remaining keys carried through untouched.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl RawObjectStoreConfig {
    /// Whether the block is enabled and carries its own credentials.
    #[must_use]
    pub fn has_own_connection(&self) -> bool {
        self.enabled.unwrap_or(false) && self.connection.as_ref().is_some_and(|map| !map.is_empty())
    }
}

/// Per-type section of the settings tree (e.g. `artifacts:`).
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct StorageSection {
    /// Section-level feature flag.
    #[serde(default)]
    pub enabled: Option<bool>,
    /// Legacy object-store block for the type.
    #[serde(default)]
    pub object_store: Option<RawObjectStoreConfig>,
    /// Other section keys (paths etc.).
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Allow-listed per-type override inside the consolidated block.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ObjectOverride {
    /// Bucket name, optionally followed by `/prefix`.
    #[serde(default)]
    pub bucket: Option<String>,
    /// Enable or disable object storage for the type.
    #[serde(default)]
    pub enabled: Option<bool>,
    /// Proxy download override.
    #[serde(default)]
    pub proxy_download: Option<bool>,
    /// CDN settings forwarded verbatim.
    #[serde(default)]
    pub cdn: Option<Value>,
}

/// Top-level consolidated `object_store` block.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConsolidatedObjectStoreConfig {
    /// Global consolidation switch.
    pub enabled: bool,
    /// Shared provider credentials.
    pub connection: Option<Map<String, Value>>,
    /// Default proxy download flag.
    pub proxy_download: Option<bool>,
    /// Default storage options.
    pub storage_options: Option<Map<String, Value>>,
    /// Allow-listed overrides keyed by storage type.
    pub objects: BTreeMap<StorageType, ObjectOverride>,
    /// Override keys dropped by the allow-list, per storage type.
    pub rejected_overrides: BTreeMap<StorageType, Vec<String>>,
}

impl ConsolidatedObjectStoreConfig {
    /// Whether the block can serve storage types: enabled with a connection.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.enabled && self.connection.as_ref().is_some_and(|map| !map.is_empty())
    }

    /// Number of override keys dropped by the allow-list across all types.
    #[must_use]
    pub fn rejected_override_count(&self) -> usize {
        self.rejected_overrides.values().map(Vec::len).sum()
    }
}

/// Where a resolved configuration came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SettingsSource {
    /// Normalised per-type block.
    Legacy,
    /// Shared consolidated block plus overrides.
    Consolidated,
}

/// Fully resolved object-store configuration for one storage type.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResolvedObjectStoreConfig {
    /// Whether object storage is enabled.
    pub enabled: bool,
    /// Bucket name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remote_directory: Option<String>,
    /// Sub-path inside the bucket.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bucket_prefix: Option<String>,
    /// Always `true` once resolved.
    pub direct_upload: bool,
    /// Whether downloads are proxied through the application.
    pub proxy_download: bool,
    /// Provider-specific storage options.
    #[serde(default)]
    pub storage_options: Map<String, Value>,
    /// Provider credentials.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connection: Option<Map<String, Value>>,
    /// CDN settings from a consolidated override.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cdn: Option<Value>,
    /// Set when produced from the consolidated block.
    #[serde(default, skip_serializing_if = "is_false")]
    pub consolidated_settings: bool,
    /// Legacy keys carried through untouched.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[allow(clippy::trivially_copy_pass_by_ref)]
const fn is_false(value: &bool) -> bool {
    !*value
}

/// Resolved entry for one storage type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedStorage {
    /// Section-level feature flag after resolution.
    pub enabled: bool,
    /// Which configuration shape produced the entry.
    pub source: SettingsSource,
    /// Object-store settings handed to the storage backend.
    pub object_store: ResolvedObjectStoreConfig,
}

/// Immutable mapping from storage type to resolved settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResolvedSettings {
    stores: BTreeMap<StorageType, ResolvedStorage>,
}

impl ResolvedSettings {
    pub(crate) const fn new(stores: BTreeMap<StorageType, ResolvedStorage>) -> Self {
        Self { stores }
    }

    /// Look up the resolved settings for a storage type.
    #[must_use]
    pub fn get(&self, store: StorageType) -> Option<&ResolvedStorage> {
        self.stores.get(&store)
    }

    /// Iterate resolved entries in storage-type order.
    pub fn iter(&self) -> impl Iterator<Item = (StorageType, &ResolvedStorage)> {
        self.stores.iter().map(|(store, resolved)| (*store, resolved))
    }

    /// Storage types resolved through the consolidated block.
    pub fn consolidated(&self) -> impl Iterator<Item = StorageType> + '_ {
        self.iter()
            .filter(|(_, resolved)| resolved.source == SettingsSource::Consolidated)
            .map(|(store, _)| store)
    }

    /// Storage types whose object storage ended up enabled.
    pub fn object_storage_enabled(&self) -> impl Iterator<Item = StorageType> + '_ {
        self.iter()
            .filter(|(_, resolved)| resolved.object_store.enabled)
            .map(|(store, _)| store)
    }

    /// Number of resolved storage types.
    #[must_use]
    pub fn len(&self) -> usize {
        self.stores.len()
    }

    /// Whether no storage types were resolved.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.stores.is_empty()
    }
}

/// Explicit switches for the resolver.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResolverOptions {
    /// Reject unknown override keys and storage types instead of warning.
    pub strict: bool,
}

impl ResolverOptions {
    /// Options with strict validation enabled.
    #[must_use]
    pub const fn strict() -> Self {
        Self { strict: true }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn storage_type_parses_and_formats() {
        for store in StorageType::ALL {
            assert_eq!(StorageType::from_str(store.as_str()).ok(), Some(store));
            assert_eq!(store.to_string(), store.as_str());
        }
        assert!(matches!(
            StorageType::from_str("videos"),
            Err(ConfigError::UnknownStorageType { .. })
        ));
    }

    #[test]
    fn workhorse_subset_excludes_pages_and_secure_files() {
        let accelerated: Vec<_> = StorageType::ALL
            .into_iter()
            .filter(|store| store.is_workhorse_accelerated())
            .collect();
        assert_eq!(accelerated.len(), 7);
        assert!(!accelerated.contains(&StorageType::Pages));
        assert!(!accelerated.contains(&StorageType::CiSecureFiles));
        assert!(StorageType::Pages.allows_incomplete());
        assert!(!StorageType::Lfs.allows_incomplete());
    }

    #[test]
    fn raw_block_preserves_unknown_keys() -> anyhow::Result<()> {
        let raw: RawObjectStoreConfig = serde_json::from_value(json!({
            "enabled": true,
            "remote_directory": "artifacts",
            "background_upload": false
        }))?;
        assert_eq!(raw.enabled, Some(true));
        assert_eq!(raw.extra.get("background_upload"), Some(&json!(false)));
        Ok(())
    }

    #[test]
    fn own_connection_requires_enabled_and_credentials() -> anyhow::Result<()> {
        let raw: RawObjectStoreConfig = serde_json::from_value(json!({
            "enabled": true,
            "connection": { "provider": "AWS" }
        }))?;
        assert!(raw.has_own_connection());

        let disabled = RawObjectStoreConfig {
            enabled: Some(false),
            ..raw.clone()
        };
        assert!(!disabled.has_own_connection());

        let empty = RawObjectStoreConfig {
            connection: Some(Map::new()),
            ..raw
        };
        assert!(!empty.has_own_connection());
        Ok(())
    }

    #[test]
    fn rejected_override_count_sums_every_type() {
        let mut block = ConsolidatedObjectStoreConfig::default();
        assert_eq!(block.rejected_override_count(), 0);
        block
            .rejected_overrides
            .insert(StorageType::Lfs, vec!["region".into(), "endpoint".into()]);
        block
            .rejected_overrides
            .insert(StorageType::Uploads, vec!["connection".into()]);
        assert_eq!(block.rejected_override_count(), 3);
    }

    #[test]
    fn resolved_config_omits_unset_fields() -> anyhow::Result<()> {
        let resolved = ResolvedObjectStoreConfig {
            direct_upload: true,
            ..ResolvedObjectStoreConfig::default()
        };
        let value = serde_json::to_value(&resolved)?;
        assert_eq!(
            value,
            json!({
                "enabled": false,
                "direct_upload": true,
                "proxy_download": false,
                "storage_options": {}
            })
        );
        Ok(())
    }
}
