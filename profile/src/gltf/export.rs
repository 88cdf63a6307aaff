//! glTF metadata export.

use serde_json::{Map, Value, json};

use super::GltfDocument;
use crate::diagnostics::Diagnostics;
use crate::scene::{MeshMetadata, Scene};
use crate::schema::{LSLIB_METADATA_VERSION, MeshField};

/// Flat extension object with all mesh fields, written verbatim.
pub(crate) fn mesh_extension(mesh: &MeshMetadata) -> Value {
    let fields: Map<String, Value> = MeshField::all()
        .map(|field| {
            let value = match field {
                MeshField::Flag(ty) => json!(mesh.flag(ty)),
                MeshField::ExportOrder => json!(mesh.export_order),
                MeshField::Lod => json!(mesh.lod),
                MeshField::LodDistance => json!(mesh.lod_distance),
            };
            (field.key().to_string(), value)
        })
        .collect();
    Value::Object(fields)
}

/// Bone name -> zero-based export order for every armature bound by a skin.
fn bone_order(doc: &GltfDocument, scene: &Scene, diags: &mut Diagnostics) -> Option<Value> {
    if doc.skin_count() == 0 {
        return None;
    }

    let mut resolved: Vec<&str> = Vec::new();
    for index in 0..doc.skin_count() {
        let joints = doc.skin_joint_names(index);
        match scene.resolve_armature(doc.skin_name(index), &joints) {
            Some(name) if !resolved.contains(&name) => resolved.push(name),
            Some(_) => {}
            None => diags.warn(format!(
                "Skin '{}' has no matching armature, bone order not exported",
                doc.skin_name(index).unwrap_or("unnamed")
            )),
        }
    }

    if resolved.is_empty() {
        return None;
    }

    let mut order = Map::new();
    for armature in resolved.iter().filter_map(|name| scene.armature(name)) {
        for bone in &armature.bones {
            match bone.metadata.export_order.checked_sub(1) {
                Some(index) => {
                    order.insert(bone.name.clone(), json!(index));
                }
                None => diags.warn(format!(
                    "Export order {} of bone '{}' is out of range, not exported",
                    bone.metadata.export_order, bone.name
                )),
            }
        }
    }
    Some(Value::Object(order))
}

/// Attach the scene's metadata to a glTF document.
pub fn export_metadata(doc: &mut GltfDocument, scene: &Scene, diags: &mut Diagnostics) {
    let mut scene_ext = Map::new();
    scene_ext.insert("MetadataVersion".to_string(), json!(LSLIB_METADATA_VERSION));
    if let Some(order) = bone_order(doc, scene, diags) {
        scene_ext.insert("BoneOrder".to_string(), order);
    }

    match doc.default_scene() {
        Some(index) => doc.set_extension("scenes", index, Value::Object(scene_ext)),
        None => diags.warn("glTF document has no scene, scene metadata not exported"),
    }

    let mut annotated = 0;
    for index in 0..doc.mesh_count() {
        let Some(name) = doc.mesh_object_name(index).map(str::to_owned) else {
            continue;
        };
        match scene.mesh(&name) {
            Some(mesh) => {
                doc.set_extension("meshes", index, mesh_extension(mesh));
                annotated += 1;
            }
            None => diags.warn(format!(
                "Mesh '{}' has no matching mesh object, metadata not exported",
                name
            )),
        }
    }

    doc.declare_extension();
    tracing::debug!("Exported LSLib metadata for {} meshes", annotated);
}
