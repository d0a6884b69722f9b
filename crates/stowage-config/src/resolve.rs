//! Resolution of legacy and consolidated object-store settings.
//!
//! # Design
//! - Each storage type is first classified into an [`ObjectStoreSource`], then
//!   resolved once into a [`ResolvedObjectStoreConfig`].
//! - Workhorse-accelerated types must go through the consolidated block when it
//!   is active; `pages` and `ci_secure_files` may keep their own storage.
//! - Override keys beat consolidated defaults; legacy values only ever fill
//!   storage options the consolidated block does not set.

use std::collections::BTreeMap;

use serde_json::{Map, Value};
use tracing::{info, instrument, warn};

use crate::error::{ConfigError, ConfigResult};
use crate::legacy::normalize_legacy;
use crate::model::{
    ConsolidatedObjectStoreConfig, ObjectOverride, RawObjectStoreConfig,
    ResolvedObjectStoreConfig, ResolvedSettings, ResolvedStorage, ResolverOptions,
    SettingsSource, StorageSection, StorageType,
};
use crate::tree::SettingsTree;
use crate::validate::split_bucket_prefix;

/// Configuration shape a storage type resolves from.
#[derive(Debug, Clone)]
pub enum ObjectStoreSource<'a> {
    /// The type's own per-type block (possibly absent).
    Legacy {
        /// Legacy block to normalise.
        block: Option<&'a RawObjectStoreConfig>,
    },
    /// The shared consolidated block merged with the type's overrides.
    Consolidated {
        /// Shared consolidated block.
        common: &'a ConsolidatedObjectStoreConfig,
        /// Allow-listed overrides for the type.
        overrides: Option<&'a ObjectOverride>,
        /// Legacy storage options used to fill keys the block leaves unset.
        legacy_storage_options: Option<&'a Map<String, Value>>,
    },
}

impl ObjectStoreSource<'_> {
    /// Which settings source this variant represents.
    #[must_use]
    pub const fn kind(&self) -> SettingsSource {
        match self {
            Self::Legacy { .. } => SettingsSource::Legacy,
            Self::Consolidated { .. } => SettingsSource::Consolidated,
        }
    }

    /// Produce the concrete configuration for `store`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidBucket`] when the configured bucket has an
    /// unsafe path shape.
    pub fn resolve(self, store: StorageType) -> ConfigResult<ResolvedObjectStoreConfig> {
        match self {
            Self::Legacy { block } => normalize_legacy(block.cloned(), store),
            Self::Consolidated {
                common,
                overrides,
                legacy_storage_options,
            } => {
                let overrides = overrides.cloned().unwrap_or_default();
                let (remote_directory, bucket_prefix) =
                    split_bucket_prefix(overrides.bucket.as_deref())?;

                let mut storage_options = common.storage_options.clone().unwrap_or_default();
                for (key, value) in legacy_storage_options.into_iter().flatten() {
                    storage_options
                        .entry(key.clone())
                        .or_insert_with(|| value.clone());
                }

                Ok(ResolvedObjectStoreConfig {
                    enabled: overrides.enabled.unwrap_or(common.enabled),
                    remote_directory,
                    bucket_prefix,
                    direct_upload: true,
                    proxy_download: overrides
                        .proxy_download
                        .or(common.proxy_download)
                        .unwrap_or(false),
                    storage_options,
                    connection: common.connection.clone(),
                    cdn: overrides.cdn,
                    consolidated_settings: true,
                    extra: Map::new(),
                })
            }
        }
    }
}

/// Resolver over a parsed settings tree.
#[derive(Debug, Clone, Default)]
pub struct ObjectStoreSettings {
    tree: SettingsTree,
    options: ResolverOptions,
}

impl ObjectStoreSettings {
    /// Wrap an already parsed settings tree.
    #[must_use]
    pub const fn new(tree: SettingsTree, options: ResolverOptions) -> Self {
        Self { tree, options }
    }

    /// Parse a raw settings tree.
    ///
    /// # Errors
    ///
    /// Propagates parse failures from [`SettingsTree::from_value`].
    pub fn from_value(value: &Value, options: ResolverOptions) -> ConfigResult<Self> {
        Ok(Self::new(SettingsTree::from_value(value, options)?, options))
    }

    /// Parsed settings tree backing this resolver.
    #[must_use]
    pub const fn tree(&self) -> &SettingsTree {
        &self.tree
    }

    /// Whether the consolidated block governs Workhorse-accelerated types.
    #[must_use]
    pub fn uses_consolidated_settings(&self) -> bool {
        self.active_consolidated().is_some()
    }

    fn active_consolidated(&self) -> Option<&ConsolidatedObjectStoreConfig> {
        self.tree
            .consolidated
            .as_ref()
            .filter(|block| block.is_active())
    }

    /// Classify a storage type into the source it resolves from.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::IncompleteConfiguration`] for a
    /// Workhorse-accelerated type with neither a section nor an override while
    /// consolidated settings are active, and [`ConfigError::MissingBucket`] for
    /// an explicitly enabled Workhorse-accelerated type without a bucket.
    pub fn source_for(&self, store: StorageType) -> ConfigResult<ObjectStoreSource<'_>> {
        let section = self.tree.section(store);
        let block = section.and_then(|section| section.object_store.as_ref());
        let legacy = ObjectStoreSource::Legacy { block };

        let Some(common) = self.active_consolidated() else {
            return Ok(legacy);
        };
        let overrides = common.objects.get(&store);
        let override_enabled = overrides.and_then(|o| o.enabled).unwrap_or(true);
        let missing_bucket = section.is_some_and(|s| s.enabled == Some(true))
            && override_enabled
            && overrides
                .and_then(|o| o.bucket.as_deref())
                .is_none_or(|bucket| bucket.trim().is_empty());

        if store.allows_incomplete() {
            if !override_enabled {
                return Ok(legacy);
            }
            if block.is_some_and(RawObjectStoreConfig::has_own_connection) {
                info!(store = %store, "keeping storage-specific object storage settings");
                return Ok(legacy);
            }
            if section.is_none() && overrides.is_none() {
                return Ok(legacy);
            }
            if missing_bucket {
                warn!(store = %store, "object storage must have a bucket specified; keeping legacy settings");
                return Ok(legacy);
            }
        } else {
            if section.is_none() && overrides.is_none() {
                return Err(ConfigError::IncompleteConfiguration { store });
            }
            if missing_bucket {
                return Err(ConfigError::MissingBucket { store });
            }
            if block.is_some_and(|b| b.enabled == Some(true)) {
                warn!(store = %store, "legacy object storage block ignored; consolidated settings are active");
            }
        }

        Ok(ObjectStoreSource::Consolidated {
            common,
            overrides,
            legacy_storage_options: block.and_then(|b| b.storage_options.as_ref()),
        })
    }

    /// Resolve every supported storage type.
    ///
    /// # Errors
    ///
    /// Fails on the first storage type that cannot be resolved; see
    /// [`Self::source_for`] and [`ObjectStoreSource::resolve`].
    #[instrument(name = "object_store_settings.resolve", skip(self), fields(strict = self.options.strict))]
    pub fn resolve(&self) -> ConfigResult<ResolvedSettings> {
        if let Some(block) = self.tree.consolidated.as_ref()
            && block.enabled
            && !block.is_active()
        {
            warn!("consolidated object storage enabled without a connection; using legacy settings");
        }

        let mut stores = BTreeMap::new();
        for store in StorageType::ALL {
            let source = self.source_for(store)?;
            let kind = source.kind();
            let object_store = source.resolve(store)?;
            let enabled = section_enabled(self.tree.section(store), kind, &object_store);
            stores.insert(
                store,
                ResolvedStorage {
                    enabled,
                    source: kind,
                    object_store,
                },
            );
        }

        let rejected_overrides = self
            .active_consolidated()
            .map_or(0, ConsolidatedObjectStoreConfig::rejected_override_count);
        let resolved = ResolvedSettings::new(stores);
        info!(
            consolidated = resolved.consolidated().count(),
            object_storage_enabled = resolved.object_storage_enabled().count(),
            rejected_overrides,
            "object storage settings resolved"
        );
        Ok(resolved)
    }
}

fn section_enabled(
    section: Option<&StorageSection>,
    kind: SettingsSource,
    object_store: &ResolvedObjectStoreConfig,
) -> bool {
    let configured = section.and_then(|section| section.enabled);
    match kind {
        SettingsSource::Legacy => configured.unwrap_or(object_store.enabled),
        SettingsSource::Consolidated if object_store.enabled => true,
        SettingsSource::Consolidated => configured.unwrap_or(false),
    }
}

/// Parse and resolve a raw settings tree in one step.
///
/// # Errors
///
/// Propagates parse and resolution failures.
pub fn resolve_settings(value: &Value, options: ResolverOptions) -> ConfigResult<ResolvedSettings> {
    ObjectStoreSettings::from_value(value, options)?.resolve()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn consolidated_tree(objects: &Value) -> Value {
        let mut tree = json!({
            "object_store": {
                "enabled": true,
                "proxy_download": true,
                "connection": { "provider": "AWS", "region": "us-east-1" },
                "storage_options": { "server_side_encryption": "AES256" },
                "objects": objects
            }
        });
        if let Some(root) = tree.as_object_mut() {
            for store in StorageType::ALL {
                if store.is_workhorse_accelerated() {
                    root.insert(store.as_str().to_string(), json!({}));
                }
            }
        }
        tree
    }

    fn resolved(settings: &ResolvedSettings, store: StorageType) -> anyhow::Result<&ResolvedStorage> {
        settings
            .get(store)
            .ok_or_else(|| anyhow::anyhow!("{store} missing from resolved settings"))
    }

    #[test]
    fn override_beats_consolidated_defaults() -> anyhow::Result<()> {
        let value = consolidated_tree(&json!({
            "artifacts": { "bucket": "artifacts/ci", "proxy_download": false, "cdn": { "url": "https://cdn.example.com" } }
        }));
        let settings = resolve_settings(&value, ResolverOptions::default())?;
        let artifacts = resolved(&settings, StorageType::Artifacts)?;
        assert_eq!(artifacts.source, SettingsSource::Consolidated);
        assert_eq!(artifacts.object_store.remote_directory.as_deref(), Some("artifacts"));
        assert_eq!(artifacts.object_store.bucket_prefix.as_deref(), Some("ci"));
        assert!(!artifacts.object_store.proxy_download);
        assert_eq!(
            artifacts.object_store.cdn,
            Some(json!({ "url": "https://cdn.example.com" }))
        );

        let lfs = resolved(&settings, StorageType::Lfs)?;
        assert!(lfs.object_store.proxy_download);
        assert_eq!(lfs.object_store.cdn, None);
        Ok(())
    }

    #[test]
    fn legacy_storage_options_fill_gaps_only() -> anyhow::Result<()> {
        let mut value = consolidated_tree(&json!({ "lfs": { "bucket": "lfs-objects" } }));
        value["lfs"] = json!({
            "enabled": true,
            "object_store": {
                "remote_directory": "legacy-lfs",
                "storage_options": {
                    "server_side_encryption": "aws:kms",
                    "server_side_encryption_kms_key_id": "arn:aws:kms:key"
                }
            }
        });
        let settings = resolve_settings(&value, ResolverOptions::default())?;
        let lfs = resolved(&settings, StorageType::Lfs)?;
        assert_eq!(lfs.object_store.remote_directory.as_deref(), Some("lfs-objects"));
        assert_eq!(
            lfs.object_store.storage_options,
            json!({
                "server_side_encryption": "AES256",
                "server_side_encryption_kms_key_id": "arn:aws:kms:key"
            })
            .as_object()
            .cloned()
            .unwrap_or_default()
        );
        Ok(())
    }

    #[test]
    fn override_can_disable_accelerated_type() -> anyhow::Result<()> {
        let mut value =
            consolidated_tree(&json!({ "uploads": { "bucket": "uploads", "enabled": false } }));
        value["uploads"] = json!({ "enabled": true });
        let settings = resolve_settings(&value, ResolverOptions::default())?;
        let uploads = resolved(&settings, StorageType::Uploads)?;
        assert_eq!(uploads.source, SettingsSource::Consolidated);
        assert!(!uploads.object_store.enabled);
        assert!(uploads.enabled, "section flag still applies");
        Ok(())
    }

    #[test]
    fn pages_keeps_own_connection() -> anyhow::Result<()> {
        let mut value = consolidated_tree(&json!({ "pages": { "bucket": "pages" } }));
        value["pages"] = json!({
            "enabled": true,
            "object_store": {
                "enabled": true,
                "remote_directory": "pages-own",
                "connection": { "provider": "Google" }
            }
        });
        let settings = resolve_settings(&value, ResolverOptions::default())?;
        let pages = resolved(&settings, StorageType::Pages)?;
        assert_eq!(pages.source, SettingsSource::Legacy);
        assert_eq!(pages.object_store.remote_directory.as_deref(), Some("pages-own"));
        assert_eq!(
            pages.object_store.connection,
            json!({ "provider": "Google" }).as_object().cloned()
        );
        Ok(())
    }

    #[test]
    fn pages_without_bucket_stays_legacy() -> anyhow::Result<()> {
        let mut value = consolidated_tree(&json!({}));
        value["pages"] = json!({ "enabled": true });
        let settings = ObjectStoreSettings::from_value(&value, ResolverOptions::strict())?;
        let source = settings.source_for(StorageType::Pages)?;
        assert_eq!(source.kind(), SettingsSource::Legacy);
        Ok(())
    }

    #[test]
    fn enabled_workhorse_type_without_bucket_is_fatal() -> anyhow::Result<()> {
        let mut value = consolidated_tree(&json!({ "lfs": { "bucket": "lfs" } }));
        value["packages"] = json!({ "enabled": true });
        for options in [ResolverOptions::default(), ResolverOptions::strict()] {
            let settings = ObjectStoreSettings::from_value(&value, options)?;
            assert!(matches!(
                settings.source_for(StorageType::Packages),
                Err(ConfigError::MissingBucket {
                    store: StorageType::Packages
                })
            ));
            assert!(matches!(
                settings.resolve(),
                Err(ConfigError::MissingBucket { .. })
            ));
        }
        Ok(())
    }

    #[test]
    fn section_without_enabled_flag_needs_no_bucket() -> anyhow::Result<()> {
        let value = consolidated_tree(&json!({}));
        let settings = resolve_settings(&value, ResolverOptions::default())?;
        let packages = resolved(&settings, StorageType::Packages)?;
        assert_eq!(packages.source, SettingsSource::Consolidated);
        assert_eq!(packages.object_store.remote_directory, None);
        Ok(())
    }

    #[test]
    fn override_disabling_type_skips_bucket_check() -> anyhow::Result<()> {
        let mut value = consolidated_tree(&json!({ "packages": { "enabled": false } }));
        value["packages"] = json!({ "enabled": true });
        let settings = resolve_settings(&value, ResolverOptions::default())?;
        let packages = resolved(&settings, StorageType::Packages)?;
        assert!(!packages.object_store.enabled);
        Ok(())
    }

    #[test]
    fn consolidated_block_without_connection_is_inactive() -> anyhow::Result<()> {
        let value = json!({
            "object_store": { "enabled": true, "objects": { "lfs": { "bucket": "lfs" } } },
            "lfs": { "object_store": { "enabled": true, "remote_directory": "legacy-lfs" } }
        });
        let settings = ObjectStoreSettings::from_value(&value, ResolverOptions::default())?;
        assert!(!settings.uses_consolidated_settings());
        let resolved_settings = settings.resolve()?;
        let lfs = resolved(&resolved_settings, StorageType::Lfs)?;
        assert_eq!(lfs.source, SettingsSource::Legacy);
        assert_eq!(lfs.object_store.remote_directory.as_deref(), Some("legacy-lfs"));
        assert!(lfs.enabled);
        Ok(())
    }

    #[test]
    fn invalid_override_bucket_is_fatal() {
        let value = consolidated_tree(&json!({ "terraform_state": { "bucket": "state/../../etc" } }));
        assert!(matches!(
            resolve_settings(&value, ResolverOptions::default()),
            Err(ConfigError::InvalidBucket { .. })
        ));
    }
}
