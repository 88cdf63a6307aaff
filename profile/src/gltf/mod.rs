//! glTF documents and the `EXT_lslib_profile` extension.
//!
//! The document is kept as raw JSON so that everything outside the LSLib
//! extension survives a load/save cycle untouched. Binary `.glb` files keep
//! their BIN chunk as-is; only the JSON chunk is rewritten.

mod export;
mod import;

pub use export::export_metadata;
pub use import::{BoneOrderState, ImportSession, import_metadata};

use std::borrow::Cow;
use std::path::Path;

use serde_json::Value;

use crate::error::{ProfileError, Result};
use crate::scene::{Armature, Scene};
use crate::schema::GLTF_EXTENSION_NAME;

const GLB_MAGIC: &[u8; 4] = b"glTF";

/// A glTF 2.0 document, either `.gltf` text or `.glb` binary.
#[derive(Debug, Clone)]
pub struct GltfDocument {
    json: Value,
    glb: Option<::gltf::Glb<'static>>,
}

impl GltfDocument {
    pub fn from_json(json: Value) -> Result<Self> {
        if !json.is_object() {
            return Err(ProfileError::InvalidGltf(
                "root is not a JSON object".to_string(),
            ));
        }
        Ok(Self { json, glb: None })
    }

    /// Parse `.gltf` JSON text or a `.glb` container (detected by magic).
    pub fn from_slice(data: &[u8]) -> Result<Self> {
        if data.starts_with(GLB_MAGIC) {
            let glb = ::gltf::Glb::from_slice(data)?;
            let json = serde_json::from_slice(&glb.json)?;
            let owned = ::gltf::Glb {
                header: glb.header,
                json: Cow::Owned(glb.json.into_owned()),
                bin: glb.bin.map(|bin| Cow::Owned(bin.into_owned())),
            };
            let mut doc = Self::from_json(json)?;
            doc.glb = Some(owned);
            Ok(doc)
        } else {
            Self::from_json(serde_json::from_slice(data)?)
        }
    }

    pub fn load(path: &Path) -> Result<Self> {
        let data = std::fs::read(path).map_err(|e| ProfileError::io(path, e))?;
        Self::from_slice(&data)
    }

    /// Serialize back into the container the document was loaded from.
    pub fn to_vec(&self) -> Result<Vec<u8>> {
        match &self.glb {
            Some(glb) => {
                let mut glb = glb.clone();
                glb.json = Cow::Owned(serde_json::to_vec(&self.json)?);
                Ok(glb.to_vec()?)
            }
            None => Ok(serde_json::to_vec_pretty(&self.json)?),
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        std::fs::write(path, self.to_vec()?).map_err(|e| ProfileError::io(path, e))
    }

    pub fn is_binary(&self) -> bool {
        self.glb.is_some()
    }

    pub fn json(&self) -> &Value {
        &self.json
    }

    fn array(&self, key: &str) -> &[Value] {
        self.json
            .get(key)
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Index of the scene the document displays by default.
    pub(crate) fn default_scene(&self) -> Option<usize> {
        let count = self.array("scenes").len();
        let index = self
            .json
            .get("scene")
            .and_then(Value::as_u64)
            .map(|i| i as usize)
            .unwrap_or(0);
        (index < count).then_some(index)
    }

    pub(crate) fn scene_extension(&self) -> Option<&Value> {
        let index = self.default_scene()?;
        extension_of(&self.array("scenes")[index])
    }

    pub(crate) fn mesh_count(&self) -> usize {
        self.array("meshes").len()
    }

    pub(crate) fn mesh_extension(&self, index: usize) -> Option<&Value> {
        extension_of(self.array("meshes").get(index)?)
    }

    /// Scene object name for a mesh: the name of the first node that
    /// instances it, falling back to the mesh's own name.
    pub(crate) fn mesh_object_name(&self, index: usize) -> Option<&str> {
        self.array("nodes")
            .iter()
            .filter(|node| node.get("mesh").and_then(Value::as_u64) == Some(index as u64))
            .find_map(|node| node.get("name").and_then(Value::as_str))
            .or_else(|| {
                self.array("meshes")
                    .get(index)?
                    .get("name")
                    .and_then(Value::as_str)
            })
    }

    pub(crate) fn skin_count(&self) -> usize {
        self.array("skins").len()
    }

    pub(crate) fn skin_name(&self, index: usize) -> Option<&str> {
        self.array("skins").get(index)?.get("name").and_then(Value::as_str)
    }

    /// Node names of a skin's joints, in joint order.
    pub(crate) fn skin_joint_names(&self, index: usize) -> Vec<String> {
        let nodes = self.array("nodes");
        self.array("skins")
            .get(index)
            .and_then(|skin| skin.get("joints"))
            .and_then(Value::as_array)
            .map(|joints| {
                joints
                    .iter()
                    .filter_map(Value::as_u64)
                    .filter_map(|joint| nodes.get(joint as usize))
                    .filter_map(|node| node.get("name").and_then(Value::as_str))
                    .map(str::to_owned)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Skin indices referenced by nodes, in node order.
    pub(crate) fn node_skins(&self) -> Vec<usize> {
        self.array("nodes")
            .iter()
            .filter_map(|node| node.get("skin").and_then(Value::as_u64))
            .map(|skin| skin as usize)
            .collect()
    }

    /// Set `extensions.EXT_lslib_profile` on `json[collection][index]`.
    pub(crate) fn set_extension(&mut self, collection: &str, index: usize, ext: Value) {
        let Some(target) = self
            .json
            .get_mut(collection)
            .and_then(Value::as_array_mut)
            .and_then(|items| items.get_mut(index))
            .and_then(Value::as_object_mut)
        else {
            return;
        };

        let extensions = target
            .entry("extensions")
            .or_insert_with(|| Value::Object(Default::default()));
        if !extensions.is_object() {
            *extensions = Value::Object(Default::default());
        }
        if let Value::Object(map) = extensions {
            map.insert(GLTF_EXTENSION_NAME.to_string(), ext);
        }
    }

    /// Make sure the extension is listed in `extensionsUsed`.
    pub(crate) fn declare_extension(&mut self) {
        let Some(root) = self.json.as_object_mut() else {
            return;
        };
        let used = root
            .entry("extensionsUsed")
            .or_insert_with(|| Value::Array(Vec::new()));
        if !used.is_array() {
            *used = Value::Array(Vec::new());
        }
        if let Value::Array(names) = used {
            if !names.iter().any(|n| n.as_str() == Some(GLTF_EXTENSION_NAME)) {
                names.push(Value::String(GLTF_EXTENSION_NAME.to_string()));
            }
        }
    }

    /// Build a scene with one mesh object per mesh and one selected
    /// armature per skin, named after the skin.
    pub fn scaffold_scene(&self) -> Scene {
        let mut scene = Scene::new();

        for index in 0..self.mesh_count() {
            if let Some(name) = self.mesh_object_name(index) {
                scene.add_mesh(name);
            }
        }

        for index in 0..self.skin_count() {
            let name = self
                .skin_name(index)
                .map(str::to_owned)
                .unwrap_or_else(|| format!("Armature.{:03}", index));
            scene.add_armature(name, Armature::with_bones(self.skin_joint_names(index)), true);
        }

        scene
    }
}

fn extension_of(item: &Value) -> Option<&Value> {
    item.get("extensions")?
        .get(GLTF_EXTENSION_NAME)
}
