//! Library target for the `afeed` package.
//!
//! The deliverable of this package is the `afeed` CLI binary
//! (`src/main.rs`). This library exists so `cargo test -p afeed --doc`
//! can validate feature combinations.

#[doc(hidden)]
pub use account_feeds;
