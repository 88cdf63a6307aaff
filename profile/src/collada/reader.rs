//! Collada metadata reader.

use std::str::FromStr;
use std::sync::LazyLock;

use hashbrown::HashMap;
use xmltree::{Element, XMLNode};

use super::{
    animations, child_elements, find_profile, geometries, is_joint, text_of, visual_scenes,
};
use crate::diagnostics::Diagnostics;
use crate::scene::{Armature, MeshMetadata, Scene};
use crate::schema::{GameId, LSLIB_METADATA_VERSION, MeshType};

type MeshSetter = fn(&mut MeshMetadata, &str, &mut Diagnostics);

static MESH_TAGS: LazyLock<HashMap<&'static str, MeshSetter>> = LazyLock::new(|| {
    let mut tags: HashMap<&'static str, MeshSetter> = HashMap::new();
    tags.insert("DivModelType", |mesh, value, diags| match MeshType::from_tag(value) {
        Some(ty) => *mesh.flag_mut(ty) = true,
        None => diags.warn(format!(
            "Unrecognized DivModelType in mesh profile: {}",
            value
        )),
    });
    tags.insert("IsImpostor", |mesh, value, _| {
        if value == "1" {
            mesh.impostor = true;
        }
    });
    tags.insert("ExportOrder", |mesh, value, diags| {
        if let Some(order) = parse_index("ExportOrder", value, diags) {
            mesh.export_order = order;
        }
    });
    tags.insert("LOD", |mesh, value, diags| {
        if let Some(lod) = parse_number("LOD", value, diags) {
            mesh.lod = lod;
        }
    });
    tags.insert("LODDistance", |mesh, value, diags| {
        if let Some(distance) = parse_number("LODDistance", value, diags) {
            mesh.lod_distance = distance;
        }
    });
    tags
});

fn parse_number<T: FromStr>(tag: &str, value: &str, diags: &mut Diagnostics) -> Option<T> {
    match value.parse() {
        Ok(v) => Some(v),
        Err(_) => {
            diags.warn(format!("Invalid value '{}' for {} in LSLib profile", value, tag));
            None
        }
    }
}

/// Parse a zero-based index and convert it to a one-based export order.
fn parse_index(tag: &str, value: &str, diags: &mut Diagnostics) -> Option<i32> {
    let index = parse_number::<i32>(tag, value, diags)?;
    let order = index.checked_add(1);
    if order.is_none() {
        diags.warn(format!("{} value {} in LSLib profile is out of range", tag, index));
    }
    order
}

fn profile_fields(profile: &Element) -> impl Iterator<Item = &Element> {
    profile.children.iter().filter_map(|node| match node {
        XMLNode::Element(e) => Some(e),
        _ => None,
    })
}

/// Load the LSLib metadata of a Collada document into `scene`.
///
/// Best-effort: missing blocks, unknown tags and dangling names are
/// reported to `diags` and skipped.
pub fn load_metadata(doc: &super::ColladaDocument, scene: &mut Scene, diags: &mut Diagnostics) {
    let root = doc.root();
    load_root_profile(root, scene, diags);
    load_mesh_profiles(root, scene, diags);
    load_bone_profiles(root, scene, diags);
    load_animation_profile(root, scene);
}

fn load_root_profile(root: &Element, scene: &mut Scene, diags: &mut Diagnostics) {
    let Some(profile) = find_profile(root) else {
        diags.error(
            "LSLib profile data not found in Collada export; make sure you're using LSLib v1.16 or later!",
        );
        return;
    };

    let mut meta_version = 0;
    for field in profile_fields(profile) {
        let value = text_of(field);
        match field.name.as_str() {
            "Game" => match GameId::from_tag(&value) {
                Some(game) => scene.metadata.game = game,
                None => {
                    diags.warn(format!("Unrecognized game in LSLib profile: {}", value));
                    scene.metadata.game = GameId::Unset;
                }
            },
            "MetadataVersion" => {
                meta_version = parse_number("MetadataVersion", &value, diags).unwrap_or(0);
            }
            other => diags.warn(format!("Unrecognized attribute in root profile: {}", other)),
        }
    }

    scene.metadata.metadata_version = meta_version;
    check_metadata_version("Collada", meta_version, diags);
}

/// Report a schema version mismatch. Shared with the glTF importer.
pub(crate) fn check_metadata_version(format: &str, version: u32, diags: &mut Diagnostics) {
    if version < LSLIB_METADATA_VERSION {
        diags.warn(format!(
            "{} file was exported with a too old LSLib version, important metadata might be missing! Please upgrade your LSLib!",
            format
        ));
    } else if version > LSLIB_METADATA_VERSION {
        diags.warn(
            "The Blender exporter plugin is too old for this LSLib version, please upgrade your exporter plugin!",
        );
    }
}

fn load_mesh_profiles(root: &Element, scene: &mut Scene, diags: &mut Diagnostics) {
    for geometry in geometries(root) {
        let Some(profile) = child_elements(geometry, "mesh").find_map(find_profile) else {
            continue;
        };

        let name = geometry
            .attributes
            .get("name")
            .map(String::as_str)
            .unwrap_or_default();
        let Some(mesh) = scene.mesh_mut(name) else {
            diags.error(format!(
                "Couldn't load metadata on geometry '{}' (object not found)",
                name
            ));
            continue;
        };

        for field in profile_fields(profile) {
            match MESH_TAGS.get(field.name.as_str()) {
                Some(setter) => setter(mesh, &text_of(field), diags),
                None => diags.warn(format!(
                    "Unrecognized attribute in mesh profile: {}",
                    field.name
                )),
            }
        }
    }
}

fn load_bone_profiles(root: &Element, scene: &mut Scene, diags: &mut Diagnostics) {
    let armature_name = scene.selected_armature().map(str::to_owned);
    let mut armature = armature_name
        .as_deref()
        .and_then(|name| scene.armature_mut(name));

    for visual_scene in visual_scenes(root) {
        for node in child_elements(visual_scene, "node") {
            load_node_profiles(node, armature.as_deref_mut(), diags);
        }
    }
}

fn load_node_profiles(node: &Element, mut armature: Option<&mut Armature>, diags: &mut Diagnostics) {
    for child in child_elements(node, "node") {
        load_node_profiles(child, armature.as_deref_mut(), diags);
    }

    if !is_joint(node) {
        return;
    }
    let Some(profile) = find_profile(node) else {
        return;
    };

    let name = node
        .attributes
        .get("name")
        .map(String::as_str)
        .unwrap_or_default();
    let Some(bone) = armature.and_then(|armature| armature.bone_mut(name)) else {
        diags.error(format!(
            "Couldn't load metadata on bone '{}' (object not found)",
            name
        ));
        return;
    };

    for field in profile_fields(profile) {
        match field.name.as_str() {
            "BoneIndex" => {
                if let Some(order) = parse_index("BoneIndex", &text_of(field), diags) {
                    bone.export_order = order;
                }
            }
            other => diags.warn(format!("Unrecognized attribute in bone profile: {}", other)),
        }
    }
}

fn load_animation_profile(root: &Element, scene: &mut Scene) {
    let Some(profile) = animations(root).find_map(find_profile) else {
        return;
    };

    let skeleton_id = child_elements(profile, "SkeletonResourceID")
        .next()
        .map(text_of)
        .unwrap_or_default();

    for armature in scene.selected_armatures_mut() {
        armature.metadata.skeleton_resource_id = skeleton_id.clone();
    }
}
