//! Shared types, error model, and configuration for mdpress.
//!
//! This crate is the foundation depended on by all other mdpress crates.
//! It provides:
//! - [`MdpressError`] — the unified error type
//! - The manifest model and loader ([`Manifest`], [`Category`], [`ArtifactDescriptor`])
//! - Build accounting types ([`BuildReport`], [`ArtifactOutcome`], [`ArtifactFailure`])
//! - Configuration ([`AppConfig`], config loading)

pub mod config;
pub mod error;
pub mod manifest;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, BrandingConfig, BuildConfig, CONFIG_FILE_NAME, MissingFragmentPolicy, PathsConfig,
    RenderConfig, expand_home, init_config, load_config, load_config_from, resolve_config_path,
};
pub use error::{MdpressError, Result};
pub use manifest::{ArtifactDescriptor, Category, Manifest, load_manifest, parse_manifest};
pub use types::{ArtifactFailure, ArtifactOutcome, ArtifactStatus, BuildReport};
