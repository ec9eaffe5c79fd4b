//! # Bio Store
//!
//! Persistence boundary for pages and blocks.
//!
//! [`PageStore`] is the contract every backend implements. Each mutating
//! call takes the acting user, checks that the user owns the page, and
//! reports failures as [`bio_common::ServiceError`] values; nothing panics
//! across the boundary.
//!
//! [`MemoryPageStore`] is the in-process backend used by the CLI and as the
//! persistence double in tests. It supports failure injection and simulated
//! latency.

pub mod memory;
pub mod settings;
pub mod store;

pub use memory::MemoryPageStore;
pub use settings::PageSettings;
pub use store::PageStore;
