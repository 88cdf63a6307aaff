//! Document-level errors.
//!
//! Only failures that prevent a document from being read or written at all
//! end up here. Problems with individual metadata blocks are reported through
//! [`crate::Diagnostics`] instead.

use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum ProfileError {
    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse Collada XML: {0}")]
    XmlParse(#[from] xmltree::ParseError),

    #[error("Failed to write Collada XML: {0}")]
    XmlWrite(#[from] xmltree::Error),

    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid GLB container: {0}")]
    Glb(#[from] ::gltf::Error),

    #[error("Not a Collada document (root element is <{0}>)")]
    NotCollada(String),

    #[error("Invalid glTF document: {0}")]
    InvalidGltf(String),
}

impl ProfileError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ProfileError::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T, E = ProfileError> = std::result::Result<T, E>;
