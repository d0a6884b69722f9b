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
    clippy::cargo,
    clippy::nursery,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls,
    missing_docs
)]

//! Binary entrypoint that resolves object storage settings once at startup and
//! prints the result for storage bootstrap consumers.

use stowage_app::{AppResult, run_app};

/// Resolves the configured settings file, aborting on any configuration error.
fn main() -> AppResult<()> {
    run_app()
}
