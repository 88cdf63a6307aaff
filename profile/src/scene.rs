//! In-memory scene model.
//!
//! Stands in for the host application's scene: a name-keyed set of objects
//! carrying the LSLib metadata properties. Import fills it from a document,
//! export reads it back into one.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{ProfileError, Result};
use crate::schema::{GameId, MeshType};

/// Scene-level metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneMetadata {
    pub game: GameId,
    /// Schema version found in the last imported document (0 = none).
    pub metadata_version: u32,
}

/// Per-mesh metadata.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MeshMetadata {
    pub rigid: bool,
    pub cloth: bool,
    pub mesh_proxy: bool,
    pub proxy_geometry: bool,
    pub spring: bool,
    pub occluder: bool,
    pub cloth_physics: bool,
    pub cloth01: bool,
    pub cloth02: bool,
    pub cloth04: bool,
    pub impostor: bool,
    /// 1-based position in the exported model, 0 = unset.
    pub export_order: i32,
    /// Lower LOD value = more detailed mesh.
    pub lod: i32,
    /// Distance (in meters) after which the next LOD level is displayed.
    pub lod_distance: f32,
}

impl MeshMetadata {
    pub fn flag(&self, ty: MeshType) -> bool {
        match ty {
            MeshType::Rigid => self.rigid,
            MeshType::Cloth => self.cloth,
            MeshType::MeshProxy => self.mesh_proxy,
            MeshType::ProxyGeometry => self.proxy_geometry,
            MeshType::Spring => self.spring,
            MeshType::Occluder => self.occluder,
            MeshType::ClothPhysics => self.cloth_physics,
            MeshType::Cloth01 => self.cloth01,
            MeshType::Cloth02 => self.cloth02,
            MeshType::Cloth04 => self.cloth04,
            MeshType::Impostor => self.impostor,
        }
    }

    pub fn flag_mut(&mut self, ty: MeshType) -> &mut bool {
        match ty {
            MeshType::Rigid => &mut self.rigid,
            MeshType::Cloth => &mut self.cloth,
            MeshType::MeshProxy => &mut self.mesh_proxy,
            MeshType::ProxyGeometry => &mut self.proxy_geometry,
            MeshType::Spring => &mut self.spring,
            MeshType::Occluder => &mut self.occluder,
            MeshType::ClothPhysics => &mut self.cloth_physics,
            MeshType::Cloth01 => &mut self.cloth01,
            MeshType::Cloth02 => &mut self.cloth02,
            MeshType::Cloth04 => &mut self.cloth04,
            MeshType::Impostor => &mut self.impostor,
        }
    }

    /// Mesh types currently set, in schema order.
    pub fn types(&self) -> impl Iterator<Item = MeshType> + '_ {
        MeshType::ALL.into_iter().filter(|ty| self.flag(*ty))
    }
}

/// Per-bone metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BoneMetadata {
    /// 1-based index of the bone in the exported skeleton, 0 = unset.
    pub export_order: i32,
}

/// Per-armature metadata.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ArmatureMetadata {
    pub skeleton_resource_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bone {
    pub name: String,
    #[serde(default)]
    pub metadata: BoneMetadata,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Armature {
    #[serde(default)]
    pub metadata: ArmatureMetadata,
    #[serde(default)]
    pub bones: Vec<Bone>,
}

impl Armature {
    pub fn with_bones<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            metadata: ArmatureMetadata::default(),
            bones: names
                .into_iter()
                .map(|name| Bone {
                    name: name.into(),
                    metadata: BoneMetadata::default(),
                })
                .collect(),
        }
    }

    pub fn bone(&self, name: &str) -> Option<&BoneMetadata> {
        self.bones
            .iter()
            .find(|b| b.name == name)
            .map(|b| &b.metadata)
    }

    pub fn bone_mut(&mut self, name: &str) -> Option<&mut BoneMetadata> {
        self.bones
            .iter_mut()
            .find(|b| b.name == name)
            .map(|b| &mut b.metadata)
    }

    pub fn has_bones<'a>(&self, mut names: impl Iterator<Item = &'a str>) -> bool {
        names.all(|name| self.bone(name).is_some())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ObjectKind {
    Mesh(MeshMetadata),
    Armature(Armature),
    Empty,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneObject {
    #[serde(default)]
    pub selected: bool,
    pub kind: ObjectKind,
}

/// Name-keyed scene of annotation targets.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Scene {
    #[serde(default)]
    pub metadata: SceneMetadata,
    #[serde(default)]
    pub objects: BTreeMap<String, SceneObject>,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a scene description from a JSON file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| ProfileError::io(path, e))?;
        Self::parse(&content)
    }

    /// Parse a scene description from JSON
    pub fn parse(content: &str) -> Result<Self> {
        Ok(serde_json::from_str(content)?)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        std::fs::write(path, self.to_json()?).map_err(|e| ProfileError::io(path, e))
    }

    pub fn add_mesh(&mut self, name: impl Into<String>) -> &mut MeshMetadata {
        let object = self.insert(name.into(), ObjectKind::Mesh(MeshMetadata::default()), false);
        match &mut object.kind {
            ObjectKind::Mesh(mesh) => mesh,
            _ => unreachable!("object was just inserted as a mesh"),
        }
    }

    pub fn add_armature(
        &mut self,
        name: impl Into<String>,
        armature: Armature,
        selected: bool,
    ) -> &mut Armature {
        let object = self.insert(name.into(), ObjectKind::Armature(armature), selected);
        match &mut object.kind {
            ObjectKind::Armature(armature) => armature,
            _ => unreachable!("object was just inserted as an armature"),
        }
    }

    pub fn add_empty(&mut self, name: impl Into<String>) {
        self.insert(name.into(), ObjectKind::Empty, false);
    }

    fn insert(&mut self, name: String, kind: ObjectKind, selected: bool) -> &mut SceneObject {
        let object = self
            .objects
            .entry(name)
            .or_insert(SceneObject { selected, kind: ObjectKind::Empty });
        object.selected = selected;
        object.kind = kind;
        object
    }

    pub fn mesh(&self, name: &str) -> Option<&MeshMetadata> {
        match &self.objects.get(name)?.kind {
            ObjectKind::Mesh(mesh) => Some(mesh),
            _ => None,
        }
    }

    pub fn mesh_mut(&mut self, name: &str) -> Option<&mut MeshMetadata> {
        match &mut self.objects.get_mut(name)?.kind {
            ObjectKind::Mesh(mesh) => Some(mesh),
            _ => None,
        }
    }

    pub fn armature(&self, name: &str) -> Option<&Armature> {
        match &self.objects.get(name)?.kind {
            ObjectKind::Armature(armature) => Some(armature),
            _ => None,
        }
    }

    pub fn armature_mut(&mut self, name: &str) -> Option<&mut Armature> {
        match &mut self.objects.get_mut(name)?.kind {
            ObjectKind::Armature(armature) => Some(armature),
            _ => None,
        }
    }

    pub fn armatures(&self) -> impl Iterator<Item = (&str, &Armature)> {
        self.objects.iter().filter_map(|(name, object)| match &object.kind {
            ObjectKind::Armature(armature) => Some((name.as_str(), armature)),
            _ => None,
        })
    }

    /// Name of the first selected armature, in name order.
    pub fn selected_armature(&self) -> Option<&str> {
        self.objects
            .iter()
            .find(|(_, object)| object.selected && matches!(object.kind, ObjectKind::Armature(_)))
            .map(|(name, _)| name.as_str())
    }

    pub fn selected_armatures_mut(&mut self) -> impl Iterator<Item = &mut Armature> {
        self.objects
            .values_mut()
            .filter(|object| object.selected)
            .filter_map(|object| match &mut object.kind {
                ObjectKind::Armature(armature) => Some(armature),
                _ => None,
            })
    }

    /// Find the armature an exported skin belongs to: by name first, then
    /// by the first armature that owns every joint.
    pub fn resolve_armature(&self, skin_name: Option<&str>, joints: &[String]) -> Option<&str> {
        if let Some((name, _)) = skin_name.and_then(|name| {
            self.armatures()
                .find(|(candidate, _)| *candidate == name)
        }) {
            return Some(name);
        }

        if joints.is_empty() {
            return None;
        }

        self.armatures()
            .find(|(_, armature)| armature.has_bones(joints.iter().map(String::as_str)))
            .map(|(name, _)| name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_scene() -> Scene {
        let mut scene = Scene::new();
        scene.add_mesh("Sword_Mesh").rigid = true;
        scene.add_armature("Skeleton", Armature::with_bones(["Root", "Spine"]), true);
        scene.add_armature("Other", Armature::with_bones(["Root", "Tail"]), false);
        scene.add_empty("Locator");
        scene
    }

    #[test]
    fn test_lookup_by_kind() {
        let scene = sample_scene();
        assert!(scene.mesh("Sword_Mesh").unwrap().rigid);
        assert!(scene.mesh("Skeleton").is_none());
        assert!(scene.mesh("Locator").is_none());
        assert!(scene.armature("Skeleton").is_some());
        assert_eq!(scene.selected_armature(), Some("Skeleton"));
    }

    #[test]
    fn test_flag_accessors_cover_all_types() {
        let mut mesh = MeshMetadata::default();
        for ty in MeshType::ALL {
            *mesh.flag_mut(ty) = true;
        }
        assert_eq!(mesh.types().count(), MeshType::ALL.len());
        assert!(mesh.cloth04 && mesh.impostor && mesh.proxy_geometry);
    }

    #[test]
    fn test_resolve_armature() {
        let scene = sample_scene();
        assert_eq!(scene.resolve_armature(Some("Other"), &[]), Some("Other"));

        let joints = vec!["Root".to_string(), "Tail".to_string()];
        assert_eq!(scene.resolve_armature(Some("Armature"), &joints), Some("Other"));

        let unknown = vec!["Wing".to_string()];
        assert_eq!(scene.resolve_armature(None, &unknown), None);
    }

    #[test]
    fn test_json_round_trip() {
        let mut scene = sample_scene();
        scene.metadata.game = GameId::Dos2DE;
        scene.armature_mut("Skeleton").unwrap().metadata.skeleton_resource_id =
            "3cbd1a02-0e3d-4b6e-9e3a-3c5b0d8f0a11".to_string();

        let json = scene.to_json().unwrap();
        assert!(json.contains("\"game\": \"dos2de\""));
        assert_eq!(Scene::parse(&json).unwrap(), scene);
    }

    #[test]
    fn test_parse_minimal_scene_file() {
        let scene = Scene::parse(
            r#"{
                "objects": {
                    "Body": { "kind": { "type": "mesh" } },
                    "Rig": { "selected": true, "kind": { "type": "armature", "bones": [{ "name": "Root" }] } }
                }
            }"#,
        )
        .unwrap();

        assert_eq!(scene.metadata.game, GameId::Bg3);
        assert_eq!(scene.mesh("Body"), Some(&MeshMetadata::default()));
        assert_eq!(scene.armature("Rig").unwrap().bone("Root"), Some(&BoneMetadata::default()));
    }
}
