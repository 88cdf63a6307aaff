//! lslib-export library
//!
//! Grafts LSLib metadata into Collada/glTF documents, reads it back into
//! scene files and drives the Divine converter for GR2 input and output.

pub mod config;
pub mod divine;
pub mod document;
pub mod pipeline;

pub use config::{DEFAULT_CONFIG, ToolConfig};
pub use divine::{ConvertError, Converter, ConverterSettings};
pub use document::{Document, DocumentFormat};
