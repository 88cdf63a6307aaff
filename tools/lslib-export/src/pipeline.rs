//! Command implementations: metadata import/export and GR2 conversion.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use lslib_profile::{Diagnostics, GameId, Scene, Severity};
use tempfile::NamedTempFile;

use crate::config::ToolConfig;
use crate::divine::Converter;
use crate::document::{Document, DocumentFormat};

/// Load a document, converting GR2 input to a temporary Collada file first.
pub fn load_document(path: &Path, config: &ToolConfig) -> Result<Document> {
    if DocumentFormat::from_path(path)? != DocumentFormat::Gr2 {
        return Document::load(path);
    }

    let converter = Converter::new(config.converter.clone())?;
    let temp = tempfile::tempdir().context("Failed to create temp dir")?;
    let dae = temp.path().join(intermediate_name(path, DocumentFormat::Collada));

    converter
        .import_gr2(path, &dae, DocumentFormat::Collada)
        .with_context(|| format!("Failed to convert {}", path.display()))?;
    Document::load(&dae)
}

/// Read metadata from `document` into the scene at `scene_path`.
///
/// When the scene file does not exist yet it is scaffolded from the
/// document. The result is written to `output` (default: the scene file).
pub fn import(
    document: &Path,
    scene_path: &Path,
    output: Option<&Path>,
    config: &ToolConfig,
) -> Result<Diagnostics> {
    let doc = load_document(document, config)?;

    let mut scene = if scene_path.exists() {
        Scene::load(scene_path)
            .with_context(|| format!("Failed to load scene: {}", scene_path.display()))?
    } else {
        tracing::info!(
            "{} not found, building scene from {}",
            scene_path.display(),
            document.display()
        );
        doc.scaffold_scene()
    };

    let mut diags = Diagnostics::new();
    doc.import_into(&mut scene, &mut diags);

    let output = output.unwrap_or(scene_path);
    scene
        .save(output)
        .with_context(|| format!("Failed to write scene: {}", output.display()))?;
    Ok(diags)
}

/// Write the metadata of the scene at `scene_path` into `document`.
///
/// The annotated document is saved to `output` (default: in place). A `.gr2`
/// output is produced by converting the annotated document with Divine.
pub fn export(
    document: &Path,
    scene_path: &Path,
    output: Option<&Path>,
    game: Option<GameId>,
    config: &ToolConfig,
) -> Result<Diagnostics> {
    let mut doc = Document::load(document)?;
    let mut scene = Scene::load(scene_path)
        .with_context(|| format!("Failed to load scene: {}", scene_path.display()))?;
    if let Some(game) = game {
        scene.metadata.game = game;
    }

    let mut diags = Diagnostics::new();
    doc.export_from(&scene, &mut diags);

    let output = output.unwrap_or(document);
    if DocumentFormat::from_path(output)? != DocumentFormat::Gr2 {
        doc.save(output)?;
        return Ok(diags);
    }

    let game = match scene.metadata.game {
        GameId::Unset => config.default_game(),
        game => game,
    };
    let converter = Converter::new(config.converter.clone())?;
    let intermediate = intermediate_file(document, doc.format())?;
    doc.save(intermediate.path())?;

    converter
        .export_gr2(game, intermediate.path(), output, doc.format())
        .with_context(|| format!("Failed to convert {}", output.display()))?;
    Ok(diags)
}

/// Scene built from the document's own entities, with its metadata loaded.
pub fn inspect(document: &Path, config: &ToolConfig) -> Result<(Scene, Diagnostics)> {
    let doc = load_document(document, config)?;
    let mut scene = doc.scaffold_scene();
    let mut diags = Diagnostics::new();
    doc.import_into(&mut scene, &mut diags);
    Ok((scene, diags))
}

/// Convert between GR2 and a Collada/glTF document with Divine.
pub fn convert(
    input: &Path,
    output: &Path,
    game: Option<GameId>,
    config: &ToolConfig,
) -> Result<()> {
    let from = DocumentFormat::from_path(input)?;
    let to = DocumentFormat::from_path(output)?;

    let converter = Converter::new(config.converter.clone())?;
    match (from, to) {
        (DocumentFormat::Gr2, DocumentFormat::Gr2) => {
            bail!("Both {:?} and {:?} are GR2 files", input, output)
        }
        (DocumentFormat::Gr2, format) => converter.import_gr2(input, output, format)?,
        (format, DocumentFormat::Gr2) => {
            let game = game.unwrap_or_else(|| config.default_game());
            converter.export_gr2(game, input, output, format)?
        }
        _ => bail!(
            "Nothing to convert: neither {:?} nor {:?} is a GR2 file",
            input,
            output
        ),
    }
    Ok(())
}

/// Log a one-line summary of the collected diagnostics.
pub fn summarize(diags: &Diagnostics) {
    let warnings = diags.count(Severity::Warning);
    let errors = diags.count(Severity::Error);
    if errors > 0 {
        tracing::error!("Finished with {} error(s), {} warning(s)", errors, warnings);
    } else if warnings > 0 {
        tracing::warn!("Finished with {} warning(s)", warnings);
    }
}

fn intermediate_name(path: &Path, format: DocumentFormat) -> PathBuf {
    let stem = path.file_stem().unwrap_or_else(|| "model".as_ref());
    PathBuf::from(stem).with_extension(format.extension())
}

/// Temporary file beside `document`, so relative buffer and image URIs still resolve.
fn intermediate_file(document: &Path, format: DocumentFormat) -> Result<NamedTempFile> {
    let dir = match document.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let stem = document
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("model");

    tempfile::Builder::new()
        .prefix(&format!(".{}-", stem))
        .suffix(&format!(".{}", format.extension()))
        .tempfile_in(dir)
        .with_context(|| format!("Failed to create intermediate file in {}", dir.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use lslib_profile::Armature;
    use tempfile::tempdir;

    const DAE: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<COLLADA xmlns="http://www.collada.org/2005/11/COLLADASchema" version="1.4.1">
  <library_geometries>
    <geometry id="Shield-mesh" name="Shield"><mesh/></geometry>
  </library_geometries>
  <library_visual_scenes>
    <visual_scene id="Scene">
      <node id="Root" name="Root" type="JOINT"/>
    </visual_scene>
  </library_visual_scenes>
</COLLADA>"#;

    #[test]
    fn test_intermediate_name() {
        assert_eq!(
            intermediate_name(Path::new("out/Shield_A.GR2"), DocumentFormat::Glb),
            PathBuf::from("Shield_A.glb")
        );
    }

    #[test]
    fn test_intermediate_file_sits_beside_document() {
        let dir = tempdir().unwrap();
        let gltf = dir.path().join("body.gltf");

        let file = intermediate_file(&gltf, DocumentFormat::Gltf).unwrap();
        assert_eq!(file.path().parent(), Some(dir.path()));
        assert_eq!(file.path().extension().and_then(|e| e.to_str()), Some("gltf"));

        let path = file.path().to_path_buf();
        drop(file);
        assert!(!path.exists());
    }

    #[test]
    fn test_export_then_inspect() {
        let dir = tempdir().unwrap();
        let dae = dir.path().join("shield.dae");
        let scene_path = dir.path().join("shield.json");
        std::fs::write(&dae, DAE).unwrap();

        let mut scene = Scene::new();
        scene.metadata.game = GameId::Dos2;
        scene.add_mesh("Shield").rigid = true;
        let rig = scene.add_armature("Armature", Armature::with_bones(["Root"]), true);
        rig.bone_mut("Root").unwrap().export_order = 1;
        scene.save(&scene_path).unwrap();

        let config = ToolConfig::default();
        let diags = export(&dae, &scene_path, None, None, &config).unwrap();
        assert!(diags.is_empty(), "{:?}", diags);

        let (inspected, diags) = inspect(&dae, &config).unwrap();
        assert!(diags.is_empty(), "{:?}", diags);
        assert_eq!(inspected.metadata.game, GameId::Dos2);
        assert!(inspected.mesh("Shield").unwrap().rigid);
        let rig = inspected.armature("Armature").unwrap();
        assert_eq!(rig.bone("Root").unwrap().export_order, 1);
    }

    #[test]
    fn test_import_scaffolds_missing_scene() {
        let dir = tempdir().unwrap();
        let dae = dir.path().join("shield.dae");
        let scene_path = dir.path().join("shield.json");
        std::fs::write(&dae, DAE).unwrap();

        // No LSTools data at all: an error is reported but the scene is still written
        let diags = import(&dae, &scene_path, None, &ToolConfig::default()).unwrap();
        assert!(diags.has_errors());

        let scene = Scene::load(&scene_path).unwrap();
        assert!(scene.mesh("Shield").is_some());
        assert!(scene.armature("Armature").is_some());
    }

    #[test]
    fn test_convert_requires_gr2_side() {
        let dir = tempdir().unwrap();
        let exe = dir.path().join("Divine.exe");
        std::fs::write(&exe, b"").unwrap();
        let mut config = ToolConfig::default();
        config.converter.path = Some(exe);

        let err = convert(Path::new("a.dae"), Path::new("b.glb"), None, &config).unwrap_err();
        assert!(err.to_string().contains("Nothing to convert"));
    }
}
