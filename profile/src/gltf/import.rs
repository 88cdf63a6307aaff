//! glTF metadata import.
//!
//! glTF importers visit the scene before its nodes, so the scene-level
//! `BoneOrder` map arrives before the armature it applies to is known.
//! [`ImportSession`] caches it until the armature has been resolved and
//! applies it once after all nodes were visited.

use hashbrown::HashMap;
use serde_json::Value;

use super::GltfDocument;
use crate::collada::check_metadata_version;
use crate::diagnostics::Diagnostics;
use crate::scene::{MeshMetadata, Scene};
use crate::schema::{GLTF_EXTENSION_NAME, MeshField};

const METADATA_VERSION_KEY: &str = "MetadataVersion";
const BONE_ORDER_KEY: &str = "BoneOrder";

fn as_i32(value: &Value) -> Option<i32> {
    value.as_i64().and_then(|v| i32::try_from(v).ok())
}

/// Progress of the deferred bone order application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BoneOrderState {
    /// A bone order map was read and waits for its armature.
    AwaitingArmature(HashMap<String, i32>),
    /// The map has been applied (or there was nothing to apply).
    Applied,
}

/// State of one glTF metadata import.
///
/// Scope a session to a single document; it is consumed by [`finish`](Self::finish).
#[derive(Debug)]
pub struct ImportSession {
    bone_order: BoneOrderState,
    armature: Option<String>,
}

impl Default for ImportSession {
    fn default() -> Self {
        Self::new()
    }
}

impl ImportSession {
    pub fn new() -> Self {
        Self {
            bone_order: BoneOrderState::Applied,
            armature: None,
        }
    }

    pub fn bone_order_state(&self) -> &BoneOrderState {
        &self.bone_order
    }

    /// Scene hook: read the schema version and cache the bone order.
    pub fn scene_hook(&mut self, ext: Option<&Value>, scene: &mut Scene, diags: &mut Diagnostics) {
        let Some(ext) = ext else {
            return;
        };

        let Some(fields) = ext.as_object() else {
            diags.warn(format!("Malformed {} scene extension", GLTF_EXTENSION_NAME));
            return;
        };

        for key in fields.keys() {
            if key != METADATA_VERSION_KEY && key != BONE_ORDER_KEY {
                diags.warn(format!("Unrecognized attribute in scene profile: {}", key));
            }
        }

        let version = match fields.get(METADATA_VERSION_KEY) {
            None => 0,
            Some(value) => match value.as_u64().and_then(|v| u32::try_from(v).ok()) {
                Some(version) => version,
                None => {
                    diags.warn(format!("Invalid value {} for {}", value, METADATA_VERSION_KEY));
                    0
                }
            },
        };
        scene.metadata.metadata_version = version;
        check_metadata_version("GLTF", version, diags);

        match fields.get(BONE_ORDER_KEY) {
            None => {}
            Some(Value::Object(entries)) => {
                let mut order = HashMap::with_capacity(entries.len());
                for (bone, value) in entries {
                    match as_i32(value) {
                        Some(index) => {
                            order.insert(bone.clone(), index);
                        }
                        None => diags.warn(format!(
                            "Invalid {} value {} for bone '{}'",
                            BONE_ORDER_KEY, value, bone
                        )),
                    }
                }
                self.bone_order = BoneOrderState::AwaitingArmature(order);
            }
            Some(value) => diags.warn(format!("Invalid value {} for {}", value, BONE_ORDER_KEY)),
        }
    }

    /// Node hook: an armature object has been resolved for a skinned node.
    pub fn armature_hook(&mut self, name: &str, diags: &mut Diagnostics) {
        match &self.armature {
            Some(previous) if previous != name => {
                diags.warn(format!(
                    "Multiple armatures in glTF file, bone order applies to '{}' only",
                    name
                ));
            }
            _ => {}
        }
        self.armature = Some(name.to_string());
    }

    /// Mesh hook: decode the mesh extension into the named mesh object.
    pub fn mesh_hook(
        &mut self,
        name: &str,
        ext: Option<&Value>,
        scene: &mut Scene,
        diags: &mut Diagnostics,
    ) {
        let Some(ext) = ext else {
            return;
        };
        let Some(mesh) = scene.mesh_mut(name) else {
            diags.error(format!(
                "Couldn't load metadata on mesh '{}' (object not found)",
                name
            ));
            return;
        };
        let Some(fields) = ext.as_object() else {
            diags.warn(format!("Malformed {} extension on mesh '{}'", GLTF_EXTENSION_NAME, name));
            return;
        };

        for key in fields.keys() {
            if MeshField::from_key(key).is_none() {
                diags.warn(format!("Unrecognized attribute in mesh profile: {}", key));
            }
        }

        for field in MeshField::all() {
            match fields.get(field.key()) {
                Some(value) => {
                    if !apply_field(mesh, field, value) {
                        diags.warn(format!(
                            "Invalid value {} for {} on mesh '{}'",
                            value,
                            field.key(),
                            name
                        ));
                    }
                }
                None => {
                    diags.warn(format!(
                        "Missing {} in mesh profile of '{}', using default",
                        field.key(),
                        name
                    ));
                    apply_field(mesh, field, &default_value(field));
                }
            }
        }
    }

    /// Apply the cached bone order to the resolved armature.
    pub fn finish(mut self, scene: &mut Scene, diags: &mut Diagnostics) -> BoneOrderState {
        let state = std::mem::replace(&mut self.bone_order, BoneOrderState::Applied);
        let BoneOrderState::AwaitingArmature(order) = state else {
            return BoneOrderState::Applied;
        };

        let Some(armature) = self
            .armature
            .as_deref()
            .and_then(|name| scene.armature_mut(name))
        else {
            diags.warn("BoneOrder found in glTF file but no armature was imported");
            return BoneOrderState::AwaitingArmature(order);
        };

        let mut missing = Vec::new();
        for bone in &mut armature.bones {
            match order.get(&bone.name) {
                Some(&index) => match index.checked_add(1) {
                    Some(export_order) => bone.metadata.export_order = export_order,
                    None => diags.warn(format!(
                        "BoneOrder value {} for bone '{}' is out of range",
                        index, bone.name
                    )),
                },
                None => missing.push(bone.name.clone()),
            }
        }
        if !missing.is_empty() {
            diags.warn(format!(
                "Bones missing from BoneOrder, export order unchanged: {}",
                missing.join(", ")
            ));
        }

        BoneOrderState::Applied
    }
}

fn default_value(field: MeshField) -> Value {
    match field {
        MeshField::Flag(_) => Value::Bool(false),
        MeshField::ExportOrder | MeshField::Lod => Value::from(0),
        MeshField::LodDistance => Value::from(0.0),
    }
}

/// Assign one field. Returns false when the value has the wrong type.
fn apply_field(mesh: &mut MeshMetadata, field: MeshField, value: &Value) -> bool {
    match field {
        MeshField::Flag(ty) => value.as_bool().map(|v| *mesh.flag_mut(ty) = v).is_some(),
        MeshField::ExportOrder => as_i32(value).map(|v| mesh.export_order = v).is_some(),
        MeshField::Lod => as_i32(value).map(|v| mesh.lod = v).is_some(),
        MeshField::LodDistance => value
            .as_f64()
            .map(|v| mesh.lod_distance = v as f32)
            .is_some(),
    }
}

/// Load the LSLib metadata of a glTF document into `scene`.
///
/// Runs the hooks in importer order (scene, skinned nodes, meshes) and
/// applies the deferred bone order last.
pub fn import_metadata(doc: &GltfDocument, scene: &mut Scene, diags: &mut Diagnostics) {
    let mut session = ImportSession::new();
    session.scene_hook(doc.scene_extension(), scene, diags);

    for skin in doc.node_skins() {
        let joints = doc.skin_joint_names(skin);
        match scene.resolve_armature(doc.skin_name(skin), &joints) {
            Some(name) => {
                let name = name.to_owned();
                session.armature_hook(&name, diags);
            }
            None => diags.error(format!(
                "Couldn't resolve armature for skin '{}' (object not found)",
                doc.skin_name(skin).unwrap_or("unnamed")
            )),
        }
    }

    for index in 0..doc.mesh_count() {
        let ext = doc.mesh_extension(index);
        if ext.is_none() {
            continue;
        }
        let name = doc.mesh_object_name(index).unwrap_or_default();
        session.mesh_hook(name, ext, scene, diags);
    }

    session.finish(scene, diags);
}
