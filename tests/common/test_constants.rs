//! Shared constants for integration tests.
//!
//! Integration tests are compiled as separate crates (one per top-level file in
//! `tests/`). Placing shared constants under `tests/common/` avoids creating an
//! additional integration test binary while still allowing reuse via:
//!
//! ```rust
//! #[path = "common/test_constants.rs"]
//! mod test_constants;
//! ```

/// Profile used for plugin-created tasks in the behaviour tests.
pub const LINUX_PROFILE: &str = "deadline-linux";

/// Profile with no relation to the plugin.
pub const FOREIGN_PROFILE: &str = "docker-batch";
