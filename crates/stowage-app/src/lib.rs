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

//! Stowage startup harness.
//!
//! Layout: `bootstrap.rs` (environment, file loading, resolution), `error.rs`
//! (application errors).

/// Application bootstrap and environment loading.
pub mod bootstrap;
/// Application-level error types.
pub mod error;

pub use bootstrap::{BootstrapOptions, load_settings_tree, resolve_from_file, run_app};
pub use error::{AppError, AppResult};
