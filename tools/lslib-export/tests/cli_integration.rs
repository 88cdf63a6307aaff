//! Integration tests for lslib-export
//!
//! Runs the binary against generated documents: import -> edit -> export ->
//! inspect, plus GR2 conversion through a stand-in Divine script.

use std::path::Path;
use std::process::{Command, Output};

use lslib_profile::{Armature, GameId, Scene};
use tempfile::tempdir;

const HELMET_DAE: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<COLLADA xmlns="http://www.collada.org/2005/11/COLLADASchema" version="1.4.1">
  <library_geometries>
    <geometry id="Helmet-mesh" name="Helmet">
      <mesh/>
      <extra>
        <technique profile="LSTools">
          <DivModelType>Rigid</DivModelType>
          <ExportOrder>0</ExportOrder>
          <LOD>0</LOD>
          <LODDistance>0</LODDistance>
        </technique>
      </extra>
    </geometry>
    <geometry id="Visor-mesh" name="Visor"><mesh/></geometry>
  </library_geometries>
  <library_visual_scenes>
    <visual_scene id="Scene">
      <node id="Head" name="Head" type="JOINT">
        <extra><technique profile="LSTools"><BoneIndex>0</BoneIndex></technique></extra>
        <node id="Jaw" name="Jaw" type="JOINT"/>
      </node>
    </visual_scene>
  </library_visual_scenes>
  <extra>
    <technique profile="LSTools">
      <Game>DivinityOriginalSin2DE</Game>
      <MetadataVersion>3</MetadataVersion>
    </technique>
  </extra>
</COLLADA>"#;

fn lslib_export(dir: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_lslib-export"))
        .current_dir(dir)
        .args(args)
        .output()
        .expect("Failed to run lslib-export")
}

fn assert_success(output: &Output) {
    assert!(
        output.status.success(),
        "lslib-export failed:\n{}",
        String::from_utf8_lossy(&output.stderr)
    );
}

#[test]
fn test_import_creates_scene_from_document() {
    let dir = tempdir().expect("Failed to create temp dir");
    std::fs::write(dir.path().join("helmet.dae"), HELMET_DAE).unwrap();

    let output = lslib_export(dir.path(), &["import", "helmet.dae", "--scene", "helmet.json"]);
    assert_success(&output);

    let scene = Scene::load(&dir.path().join("helmet.json")).expect("Scene should be written");
    assert_eq!(scene.metadata.game, GameId::Dos2DE);
    assert_eq!(scene.metadata.metadata_version, 3);
    assert!(scene.mesh("Helmet").unwrap().rigid);
    assert_eq!(scene.mesh("Helmet").unwrap().export_order, 1);
    assert!(!scene.mesh("Visor").unwrap().rigid);

    let rig = scene.armature("Armature").unwrap();
    assert_eq!(rig.bone("Head").unwrap().export_order, 1);
    assert_eq!(rig.bone("Jaw").unwrap().export_order, 0);
}

#[test]
fn test_export_then_inspect() {
    let dir = tempdir().expect("Failed to create temp dir");
    std::fs::write(dir.path().join("helmet.dae"), HELMET_DAE).unwrap();

    let mut scene = Scene::new();
    scene.metadata.game = GameId::Bg3;
    scene.add_mesh("Helmet").rigid = true;
    let visor = scene.add_mesh("Visor");
    visor.cloth = true;
    visor.cloth01 = true;
    visor.export_order = 2;
    visor.lod = 1;
    visor.lod_distance = 12.5;
    let rig = scene.add_armature("Armature", Armature::with_bones(["Head", "Jaw"]), true);
    rig.bone_mut("Head").unwrap().export_order = 2;
    rig.bone_mut("Jaw").unwrap().export_order = 1;
    rig.metadata.skeleton_resource_id = "c0ffee00-0000-4000-8000-000000000001".to_string();
    scene.save(&dir.path().join("edited.json")).unwrap();

    let output = lslib_export(
        dir.path(),
        &[
            "export",
            "helmet.dae",
            "--scene",
            "edited.json",
            "-o",
            "helmet_out.dae",
        ],
    );
    assert_success(&output);
    assert!(dir.path().join("helmet_out.dae").exists());

    let output = lslib_export(dir.path(), &["inspect", "helmet_out.dae"]);
    assert_success(&output);
    let inspected = Scene::parse(&String::from_utf8_lossy(&output.stdout))
        .expect("inspect should print a scene");

    assert_eq!(inspected.metadata.game, GameId::Bg3);
    assert_eq!(inspected.mesh("Visor"), scene.mesh("Visor"));
    let rig = inspected.armature("Armature").unwrap();
    assert_eq!(rig.bone("Head").unwrap().export_order, 2);
    assert_eq!(rig.bone("Jaw").unwrap().export_order, 1);
    // Without an animation library there is nowhere to store the skeleton id
    assert_eq!(rig.metadata.skeleton_resource_id, "");
}

#[test]
fn test_export_game_override() {
    let dir = tempdir().expect("Failed to create temp dir");
    std::fs::write(dir.path().join("helmet.dae"), HELMET_DAE).unwrap();

    let output = lslib_export(dir.path(), &["import", "helmet.dae", "--scene", "helmet.json"]);
    assert_success(&output);
    let output = lslib_export(
        dir.path(),
        &["export", "helmet.dae", "--scene", "helmet.json", "--game", "dos"],
    );
    assert_success(&output);

    let xml = std::fs::read_to_string(dir.path().join("helmet.dae")).unwrap();
    assert!(xml.contains("<Game>DivinityOriginalSin</Game>"));
}

#[test]
fn test_inspect_gltf() {
    let dir = tempdir().expect("Failed to create temp dir");
    let json = serde_json::json!({
        "asset": { "version": "2.0" },
        "scene": 0,
        "scenes": [{
            "nodes": [0, 1],
            "extensions": { "EXT_lslib_profile": { "MetadataVersion": 3, "BoneOrder": { "Hip": 0 } } }
        }],
        "nodes": [
            { "name": "Hip" },
            { "name": "Legs", "mesh": 0, "skin": 0 }
        ],
        "meshes": [{
            "name": "Legs",
            "primitives": [],
            "extensions": { "EXT_lslib_profile": {
                "Rigid": false, "Cloth": false, "MeshProxy": false, "ProxyGeometry": false,
                "Spring": false, "Occluder": false, "ClothPhysics": false, "Cloth01": false,
                "Cloth02": false, "Cloth04": false, "Impostor": false,
                "ExportOrder": 1, "LOD": 0, "LODDistance": 0.0
            } }
        }],
        "skins": [{ "name": "Skeleton", "joints": [0] }],
        "extensionsUsed": ["EXT_lslib_profile"]
    });
    std::fs::write(
        dir.path().join("legs.gltf"),
        serde_json::to_vec_pretty(&json).unwrap(),
    )
    .unwrap();

    let output = lslib_export(dir.path(), &["inspect", "legs.gltf"]);
    assert_success(&output);
    let scene = Scene::parse(&String::from_utf8_lossy(&output.stdout)).unwrap();

    assert_eq!(scene.mesh("Legs").unwrap().export_order, 1);
    let rig = scene.armature("Skeleton").unwrap();
    assert_eq!(rig.bone("Hip").unwrap().export_order, 1);
}

#[test]
fn test_unsupported_extension_fails() {
    let dir = tempdir().expect("Failed to create temp dir");
    std::fs::write(dir.path().join("model.fbx"), b"").unwrap();

    let output = lslib_export(dir.path(), &["inspect", "model.fbx"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("Unsupported model format"));
}

#[test]
fn test_convert_with_invalid_converter_path() {
    let dir = tempdir().expect("Failed to create temp dir");
    std::fs::write(
        dir.path().join("lslib.toml"),
        "[converter]\npath = \"does/not/exist/Divine.exe\"\n",
    )
    .unwrap();

    let output = lslib_export(dir.path(), &["convert", "helmet.gr2", "helmet.dae"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("LSLib path"));
}

/// Divine stand-in: records its arguments and copies `source.dae` to `-d`.
#[cfg(unix)]
#[test]
fn test_gr2_round_trip_through_converter() {
    use std::os::unix::fs::PermissionsExt;

    let dir = tempdir().expect("Failed to create temp dir");
    let script = dir.path().join("divine.sh");
    std::fs::write(
        &script,
        r#"#!/bin/sh
here="$(dirname "$0")"
echo "$@" >> "$here/args.txt"
while [ $# -gt 0 ]; do
  if [ "$1" = "-d" ]; then dst="$2"; fi
  if [ "$1" = "-o" ] && [ "$2" = "glb" ]; then
    echo "[FATAL] Value glb is not allowed for option 'output-format'"
    exit 1
  fi
  shift
done
cp "$here/source.dae" "$dst"
echo "[INFO] Conversion finished"
"#,
    )
    .unwrap();
    std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();
    std::fs::write(dir.path().join("source.dae"), HELMET_DAE).unwrap();
    std::fs::write(
        dir.path().join("lslib.toml"),
        format!(
            "[converter]\npath = {:?}\nmirror_skeletons = true\n\n[export]\ngame = \"dos2de\"\n",
            script.to_str().unwrap()
        ),
    )
    .unwrap();
    std::fs::write(dir.path().join("helmet.gr2"), b"GR2").unwrap();

    // GR2 import goes through a temporary .dae
    let output = lslib_export(dir.path(), &["import", "helmet.gr2", "--scene", "helmet.json"]);
    assert_success(&output);
    let scene = Scene::load(&dir.path().join("helmet.json")).unwrap();
    assert!(scene.mesh("Helmet").unwrap().rigid);

    // Export to GR2 writes the annotated document to a temporary file first
    std::fs::write(dir.path().join("helmet.dae"), HELMET_DAE).unwrap();
    let output = lslib_export(
        dir.path(),
        &["export", "helmet.dae", "--scene", "helmet.json", "-o", "helmet_out.gr2"],
    );
    assert_success(&output);
    assert!(dir.path().join("helmet_out.gr2").exists());

    let args = std::fs::read_to_string(dir.path().join("args.txt")).unwrap();
    let runs: Vec<&str> = args.lines().collect();
    assert_eq!(runs.len(), 2);
    assert!(runs[0].starts_with("--loglevel all -g bg3 -s helmet.gr2 -d "));
    assert!(runs[0].ends_with("-i gr2 -o dae -a convert-model -e flip-uvs -e mirror-skeletons"));
    assert!(runs[1].starts_with("--loglevel all -g dos2de -s "));
    assert!(runs[1].contains("-d helmet_out.gr2 -i dae -o gr2 -a convert-model"));
    assert!(runs[1].ends_with("-e mirror-skeletons -e apply-basis-transforms"));

    // Old LSLib versions reject glTF
    let output = lslib_export(dir.path(), &["convert", "helmet.gr2", "helmet.glb"]);
    assert!(!output.status.success());
    assert!(
        String::from_utf8_lossy(&output.stderr)
            .contains("LSLib v1.20 or later is required for glTF support")
    );
}

/// Divine stand-in that fails unless the document's external buffer sits next to `-s`.
#[cfg(unix)]
#[test]
fn test_gr2_export_keeps_relative_buffers_resolvable() {
    use std::os::unix::fs::PermissionsExt;

    let dir = tempdir().expect("Failed to create temp dir");
    let script = dir.path().join("divine.sh");
    std::fs::write(
        &script,
        r#"#!/bin/sh
while [ $# -gt 0 ]; do
  if [ "$1" = "-s" ]; then src="$2"; fi
  if [ "$1" = "-d" ]; then dst="$2"; fi
  shift
done
if [ ! -f "$(dirname "$src")/body.bin" ]; then
  echo "[FATAL] Could not find buffer body.bin"
  exit 1
fi
cp "$src" "$dst"
"#,
    )
    .unwrap();
    std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();
    std::fs::write(
        dir.path().join("lslib.toml"),
        format!("[converter]\npath = {:?}\n", script.to_str().unwrap()),
    )
    .unwrap();

    let json = serde_json::json!({
        "asset": { "version": "2.0" },
        "scene": 0,
        "scenes": [{ "nodes": [0] }],
        "nodes": [{ "name": "Body", "mesh": 0 }],
        "meshes": [{ "name": "Body", "primitives": [] }],
        "buffers": [{ "uri": "body.bin", "byteLength": 4 }]
    });
    std::fs::write(
        dir.path().join("body.gltf"),
        serde_json::to_vec_pretty(&json).unwrap(),
    )
    .unwrap();
    std::fs::write(dir.path().join("body.bin"), [0u8; 4]).unwrap();

    let mut scene = Scene::new();
    scene.metadata.game = GameId::Bg3;
    scene.add_mesh("Body").rigid = true;
    scene.save(&dir.path().join("body.json")).unwrap();

    let output = lslib_export(
        dir.path(),
        &["export", "body.gltf", "--scene", "body.json", "-o", "body.gr2"],
    );
    assert_success(&output);

    let converted = std::fs::read_to_string(dir.path().join("body.gr2")).unwrap();
    assert!(converted.contains("EXT_lslib_profile"));
    assert!(converted.contains("body.bin"));

    // The intermediate document is removed once Divine is done with it
    let leftovers: Vec<String> = std::fs::read_dir(dir.path())
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
        .filter(|name| name.ends_with(".gltf") && name != "body.gltf")
        .collect();
    assert!(leftovers.is_empty(), "{:?}", leftovers);
}

#[test]
fn test_log_level_follows_rust_log() {
    let dir = tempdir().expect("Failed to create temp dir");
    std::fs::write(dir.path().join("helmet.dae"), HELMET_DAE).unwrap();

    let run = |rust_log: Option<&str>| {
        let mut command = Command::new(env!("CARGO_BIN_EXE_lslib-export"));
        command.current_dir(dir.path()).args(["inspect", "helmet.dae"]);
        match rust_log {
            Some(filter) => command.env("RUST_LOG", filter),
            None => command.env_remove("RUST_LOG"),
        };
        let output = command.output().expect("Failed to run lslib-export");
        assert_success(&output);
        String::from_utf8_lossy(&output.stderr).into_owned()
    };

    assert!(run(Some("debug")).contains("No config at"));
    assert!(!run(None).contains("No config at"));
}
