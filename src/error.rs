//! Error taxonomy of the engine core.
//!
//! Loaders and GPU setup return `anyhow::Result` and attach one of these
//! variants as the root cause. The importer and the frame renderer turn every
//! variant except [`NginError::FallbackTexture`] into a logged-and-skipped
//! outcome at their boundary.

use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum NginError {
    /// The asset file is unreadable, malformed, incomplete or has no root node.
    #[error("could not import asset {path:?}: {reason}")]
    AssetParse { path: PathBuf, reason: String },

    /// An image could not be read or decoded.
    #[error("could not decode texture {label}: {reason}")]
    TextureDecode { label: String, reason: String },

    /// A colour or property key is missing from a material.
    #[error("material {material:?} has no {key} colour")]
    MaterialExtraction { material: String, key: &'static str },

    /// A texture could not be bound while recording a draw.
    #[error("cannot bind texture unit {unit}: {reason}")]
    RenderBinding { unit: u32, reason: String },

    /// One of the two well-known fallback textures is missing or broken.
    #[error("fallback texture {path:?} is unavailable: {reason}")]
    FallbackTexture { path: PathBuf, reason: String },

    #[error("invalid transform parent: {0}")]
    InvalidParent(String),

    #[error("binding {name}: {reason}")]
    Binding { name: String, reason: String },
}
