//! # Imaginify Shared Library
//!
//! Data layer and integrations used by the Imaginify API server.
//!
//! ## Module Organization
//!
//! - `db`: lazily connected database handle, pool, migrations
//! - `models`: users, images, pagination
//! - `webhook`: identity provider webhook verification and dispatch
//! - `identity`: identity provider backend client
//! - `assets`: CDN search and image gallery queries
//! - `error`: data layer error type

pub mod assets;
pub mod db;
pub mod error;
pub mod identity;
pub mod models;
pub mod webhook;

/// Current version of the Imaginify shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate authors, inherited from the workspace manifest
pub const AUTHORS: &str = env!("CARGO_PKG_AUTHORS");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_is_set() {
        assert!(!VERSION.is_empty());
    }

    #[test]
    fn test_authors_inherited_from_workspace() {
        assert_eq!(AUTHORS, "Imaginify Contributors");
    }
}
