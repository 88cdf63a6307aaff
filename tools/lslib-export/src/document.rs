//! Model documents handled by the tool, dispatched on file extension.

use std::path::Path;

use anyhow::{Context, Result, bail};
use lslib_profile::collada::{self, ColladaDocument};
use lslib_profile::gltf::{self, GltfDocument};
use lslib_profile::{Diagnostics, Scene};

/// Container formats understood by the tool and by Divine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Collada,
    Gltf,
    Glb,
    Gr2,
}

impl DocumentFormat {
    /// Detect the format from the file extension (case-insensitive)
    pub fn from_path(path: &Path) -> Result<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|s| s.to_lowercase())
            .unwrap_or_default();

        match ext.as_str() {
            "dae" => Ok(Self::Collada),
            "gltf" => Ok(Self::Gltf),
            "glb" => Ok(Self::Glb),
            "gr2" => Ok(Self::Gr2),
            _ => bail!(
                "Unsupported model format: {:?} (use .dae, .gltf, .glb, or .gr2)",
                path
            ),
        }
    }

    /// Format name on the Divine command line (`-i` / `-o`)
    pub fn converter_name(self) -> &'static str {
        match self {
            Self::Collada => "dae",
            Self::Gltf => "gltf",
            Self::Glb => "glb",
            Self::Gr2 => "gr2",
        }
    }

    pub fn extension(self) -> &'static str {
        self.converter_name()
    }
}

/// A loaded Collada or glTF document
#[derive(Debug, Clone)]
pub enum Document {
    Collada(ColladaDocument),
    Gltf(GltfDocument),
}

impl Document {
    pub fn load(path: &Path) -> Result<Self> {
        match DocumentFormat::from_path(path)? {
            DocumentFormat::Collada => ColladaDocument::load(path)
                .map(Self::Collada)
                .with_context(|| format!("Failed to load Collada document: {}", path.display())),
            DocumentFormat::Gltf | DocumentFormat::Glb => GltfDocument::load(path)
                .map(Self::Gltf)
                .with_context(|| format!("Failed to load glTF document: {}", path.display())),
            DocumentFormat::Gr2 => bail!(
                "{} is a GR2 file; it must be converted with Divine first",
                path.display()
            ),
        }
    }

    /// Save to `path`. The extension must match the document container.
    pub fn save(&self, path: &Path) -> Result<()> {
        let format = DocumentFormat::from_path(path)?;
        if format != self.format() {
            bail!(
                "Cannot save a .{} document as {}",
                self.format().extension(),
                path.display()
            );
        }

        match self {
            Self::Collada(doc) => doc.save(path),
            Self::Gltf(doc) => doc.save(path),
        }
        .with_context(|| format!("Failed to write {}", path.display()))
    }

    pub fn format(&self) -> DocumentFormat {
        match self {
            Self::Collada(_) => DocumentFormat::Collada,
            Self::Gltf(doc) if doc.is_binary() => DocumentFormat::Glb,
            Self::Gltf(_) => DocumentFormat::Gltf,
        }
    }

    /// Read the document's metadata into `scene`
    pub fn import_into(&self, scene: &mut Scene, diags: &mut Diagnostics) {
        match self {
            Self::Collada(doc) => collada::load_metadata(doc, scene, diags),
            Self::Gltf(doc) => gltf::import_metadata(doc, scene, diags),
        }
    }

    /// Write the metadata of `scene` into the document
    pub fn export_from(&mut self, scene: &Scene, diags: &mut Diagnostics) {
        match self {
            Self::Collada(doc) => collada::write_metadata(doc, scene, diags),
            Self::Gltf(doc) => gltf::export_metadata(doc, scene, diags),
        }
    }

    /// Scene holding the document's own meshes and armatures
    pub fn scaffold_scene(&self) -> Scene {
        match self {
            Self::Collada(doc) => doc.scaffold_scene(),
            Self::Gltf(doc) => doc.scaffold_scene(),
        }
    }
}
