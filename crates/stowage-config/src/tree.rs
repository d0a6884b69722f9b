//! Parsing of the in-memory settings tree into typed sections.
//!
//! # Design
//! - Accepts the whole application settings tree and picks out the keys it owns.
//! - Applies the override allow-list while parsing so resolution only sees allowed keys.
//! - Shape errors carry the dotted path of the offending section.

use std::collections::BTreeMap;

use serde::Deserialize;
use serde::de::Error as _;
use serde_json::{Map, Value};
use tracing::warn;

use crate::defaults::{ALLOWED_OBJECT_STORE_OVERRIDES, CONSOLIDATED_SECTION, OBJECTS_KEY};
use crate::error::{ConfigError, ConfigResult};
use crate::model::{
    ConsolidatedObjectStoreConfig, ObjectOverride, ResolverOptions, StorageSection, StorageType,
};

/// Typed view of the parts of the settings tree the resolver consumes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SettingsTree {
    /// Top-level consolidated block, when present.
    pub consolidated: Option<ConsolidatedObjectStoreConfig>,
    /// Per-type sections keyed by storage type.
    pub sections: BTreeMap<StorageType, StorageSection>,
}

#[derive(Deserialize)]
struct RawConsolidated {
    #[serde(default)]
    enabled: Option<bool>,
    #[serde(default)]
    connection: Option<Map<String, Value>>,
    #[serde(default)]
    proxy_download: Option<bool>,
    #[serde(default)]
    storage_options: Option<Map<String, Value>>,
    #[serde(default)]
    objects: Option<Map<String, Value>>,
}

impl SettingsTree {
    /// Parse the settings tree.
    ///
    /// Keys that are neither `object_store` nor a storage type are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidSection`] when the root or a section has
    /// the wrong shape. In strict mode, unknown storage types and override
    /// keys under `object_store.objects` are rejected as well.
    pub fn from_value(value: &Value, options: ResolverOptions) -> ConfigResult<Self> {
        let Some(root) = value.as_object() else {
            return Err(ConfigError::invalid_section(
                "<root>",
                serde_json::Error::custom("settings tree must be a map"),
            ));
        };

        let consolidated = match root.get(CONSOLIDATED_SECTION) {
            None | Some(Value::Null) => None,
            Some(block) => Some(parse_consolidated(block, options)?),
        };

        let mut sections = BTreeMap::new();
        for store in StorageType::ALL {
            let Some(section) = root.get(store.as_str()).filter(|value| !value.is_null()) else {
                continue;
            };
            let parsed = StorageSection::deserialize(section)
                .map_err(|source| ConfigError::invalid_section(store.as_str(), source))?;
            sections.insert(store, parsed);
        }

        Ok(Self {
            consolidated,
            sections,
        })
    }

    /// Section for a storage type, if configured.
    #[must_use]
    pub fn section(&self, store: StorageType) -> Option<&StorageSection> {
        self.sections.get(&store)
    }
}

fn parse_consolidated(
    block: &Value,
    options: ResolverOptions,
) -> ConfigResult<ConsolidatedObjectStoreConfig> {
    let raw = RawConsolidated::deserialize(block)
        .map_err(|source| ConfigError::invalid_section(CONSOLIDATED_SECTION, source))?;

    let mut objects = BTreeMap::new();
    let mut rejected_overrides = BTreeMap::new();
    for (name, value) in raw.objects.unwrap_or_default() {
        let store = match name.parse::<StorageType>() {
            Ok(store) => store,
            Err(err) if options.strict => return Err(err),
            Err(_) => {
                warn!(store = %name, "ignoring override for unknown storage type");
                continue;
            }
        };
        let (parsed, rejected) = parse_override(store, &value, options)?;
        if !rejected.is_empty() {
            rejected_overrides.insert(store, rejected);
        }
        objects.insert(store, parsed);
    }

    Ok(ConsolidatedObjectStoreConfig {
        enabled: raw.enabled.unwrap_or(false),
        connection: raw.connection,
        proxy_download: raw.proxy_download,
        storage_options: raw.storage_options,
        objects,
        rejected_overrides,
    })
}

fn parse_override(
    store: StorageType,
    value: &Value,
    options: ResolverOptions,
) -> ConfigResult<(ObjectOverride, Vec<String>)> {
    let section = format!("{CONSOLIDATED_SECTION}.{OBJECTS_KEY}.{store}");
    let map = match value {
        Value::Null => return Ok((ObjectOverride::default(), Vec::new())),
        Value::Object(map) => map,
        _ => {
            return Err(ConfigError::invalid_section(
                section,
                serde_json::Error::custom("override must be a map"),
            ));
        }
    };

    let mut allowed = Map::new();
    let mut rejected = Vec::new();
    for (key, entry) in map {
        if ALLOWED_OBJECT_STORE_OVERRIDES.contains(&key.as_str()) {
            allowed.insert(key.clone(), entry.clone());
        } else if options.strict {
            return Err(ConfigError::UnknownOverride {
                store,
                key: key.clone(),
            });
        } else {
            warn!(store = %store, key = %key, "ignoring object storage override outside the allow-list");
            rejected.push(key.clone());
        }
    }

    let parsed = ObjectOverride::deserialize(Value::Object(allowed))
        .map_err(|source| ConfigError::invalid_section(section, source))?;
    Ok((parsed, rejected))
}
