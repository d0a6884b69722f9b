#![forbid(unsafe_code)]
#![deny(
    warnings,
    dead_code,
    unused,
    unused_imports,
    unused_must_use,
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls,
    missing_docs
)]

//! Object-store settings resolver.
//!
//! Reconciles legacy per-type object-store blocks and the consolidated
//! `object_store` block into one immutable mapping of storage type to
//! resolved settings.
//!
//! Layout: `model.rs` (typed inputs and outputs), `tree.rs` (settings tree
//! parsing), `validate.rs` (bucket splitting), `legacy.rs` (legacy
//! normalisation), `resolve.rs` (`ObjectStoreSettings` and source selection).

mod defaults;
pub mod error;
pub mod legacy;
pub mod model;
pub mod resolve;
pub mod tree;
pub mod validate;

pub use defaults::ALLOWED_OBJECT_STORE_OVERRIDES;
pub use error::{ConfigError, ConfigResult};
pub use legacy::normalize_legacy;
pub use model::{
    ConsolidatedObjectStoreConfig, ObjectOverride, RawObjectStoreConfig,
    ResolvedObjectStoreConfig, ResolvedSettings, ResolvedStorage, ResolverOptions,
    SettingsSource, StorageSection, StorageType,
};
pub use resolve::{ObjectStoreSettings, ObjectStoreSource, resolve_settings};
pub use tree::SettingsTree;
pub use validate::split_bucket_prefix;
