//! Collada metadata writer.
//!
//! Grafts LSTools blocks onto a plain Collada export so LSLib picks up the
//! scene's metadata. Existing LSTools blocks are replaced, other techniques
//! are left alone.

use xmltree::{Element, XMLNode};

use super::{
    ColladaDocument, child_elements_mut, is_joint, replace_profile, text_element,
};
use crate::diagnostics::Diagnostics;
use crate::scene::{Armature, MeshMetadata, Scene};
use crate::schema::LSLIB_METADATA_VERSION;

/// Write the metadata of `scene` into `doc`.
pub fn write_metadata(doc: &mut ColladaDocument, scene: &Scene, diags: &mut Diagnostics) {
    let root = &mut doc.root;

    replace_profile(
        root,
        Some(vec![
            text_element("Game", scene.metadata.game.tag()),
            text_element("MetadataVersion", LSLIB_METADATA_VERSION.to_string()),
        ]),
    );

    write_mesh_profiles(root, scene, diags);

    let armature = scene
        .selected_armature()
        .and_then(|name| scene.armature(name));
    write_bone_profiles(root, armature);
    write_animation_profile(root, armature);
}

/// Zero-based index of a one-based export order; unset and negative orders have none.
fn zero_based(export_order: i32) -> Option<i32> {
    export_order.checked_sub(1).filter(|index| *index >= 0)
}

fn mesh_fields(mesh: &MeshMetadata) -> Vec<Element> {
    let mut fields: Vec<Element> = mesh
        .types()
        .filter(|ty| !matches!(ty, crate::schema::MeshType::Impostor))
        .map(|ty| text_element("DivModelType", ty.tag()))
        .collect();

    if mesh.impostor {
        fields.push(text_element("IsImpostor", "1"));
    }
    if let Some(index) = zero_based(mesh.export_order) {
        fields.push(text_element("ExportOrder", index.to_string()));
    }
    fields.push(text_element("LOD", mesh.lod.to_string()));
    fields.push(text_element("LODDistance", mesh.lod_distance.to_string()));
    fields
}

fn write_mesh_profiles(root: &mut Element, scene: &Scene, diags: &mut Diagnostics) {
    for library in child_elements_mut(root, "library_geometries") {
        for geometry in child_elements_mut(library, "geometry") {
            let name = geometry
                .attributes
                .get("name")
                .cloned()
                .unwrap_or_default();
            let Some(mesh) = scene.mesh(&name) else {
                diags.warn(format!(
                    "Geometry '{}' has no matching mesh object, metadata not written",
                    name
                ));
                continue;
            };

            for mesh_element in child_elements_mut(geometry, "mesh") {
                replace_profile(mesh_element, Some(mesh_fields(mesh)));
            }
        }
    }
}

fn write_bone_profiles(root: &mut Element, armature: Option<&Armature>) {
    for library in child_elements_mut(root, "library_visual_scenes") {
        for visual_scene in child_elements_mut(library, "visual_scene") {
            for node in child_elements_mut(visual_scene, "node") {
                write_node_profiles(node, armature);
            }
        }
    }
}

fn write_node_profiles(node: &mut Element, armature: Option<&Armature>) {
    for child in child_elements_mut(node, "node") {
        write_node_profiles(child, armature);
    }

    if !is_joint(node) {
        return;
    }

    let bone = node
        .attributes
        .get("name")
        .and_then(|name| armature?.bone(name));
    let fields = bone
        .and_then(|bone| zero_based(bone.export_order))
        .map(|index| vec![text_element("BoneIndex", index.to_string())]);
    replace_profile(node, fields);
}

fn write_animation_profile(root: &mut Element, armature: Option<&Armature>) {
    let skeleton_id = armature
        .map(|a| a.metadata.skeleton_resource_id.as_str())
        .filter(|id| !id.is_empty());

    for library in child_elements_mut(root, "library_animations") {
        let Some(animation) = library.children.iter_mut().find_map(|node| match node {
            XMLNode::Element(e) if e.name == "animation" => Some(e),
            _ => None,
        }) else {
            continue;
        };

        replace_profile(
            animation,
            skeleton_id.map(|id| vec![text_element("SkeletonResourceID", id)]),
        );
        return;
    }
}
