// Build-time identity reported by GET /version

/// Package version (from Cargo.toml).
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Package name (from Cargo.toml).
pub const NAME: &str = env!("CARGO_PKG_NAME");

/// Revision of the JSON wire contract. Bumped when an entity shape changes incompatibly.
pub const SCHEMA_VERSION: u32 = 1;
