//! Collada (.dae) documents and the LSTools technique blocks.
//!
//! LSLib stores its metadata in `<extra><technique profile="LSTools">`
//! blocks at four places: the document root, `geometry/mesh`, joint
//! `node`s and `animation`s. Elements are matched by local name, so the
//! Collada namespace (or any prefix) does not matter.

mod reader;
mod writer;

pub use reader::load_metadata;
pub(crate) use reader::check_metadata_version;
pub use writer::write_metadata;

use std::io::{Read, Write};
use std::path::Path;

use xmltree::{Element, EmitterConfig, XMLNode};

use crate::error::{ProfileError, Result};
use crate::scene::{Armature, Scene};
use crate::schema::COLLADA_PROFILE;

/// A parsed Collada document.
#[derive(Debug, Clone)]
pub struct ColladaDocument {
    root: Element,
}

impl ColladaDocument {
    pub fn parse<R: Read>(reader: R) -> Result<Self> {
        let root = Element::parse(reader)?;
        if root.name != "COLLADA" {
            return Err(ProfileError::NotCollada(root.name));
        }
        Ok(Self { root })
    }

    pub fn parse_str(xml: &str) -> Result<Self> {
        Self::parse(xml.as_bytes())
    }

    pub fn load(path: &Path) -> Result<Self> {
        let file = std::fs::File::open(path).map_err(|e| ProfileError::io(path, e))?;
        Self::parse(std::io::BufReader::new(file))
    }

    pub fn write<W: Write>(&self, writer: W) -> Result<()> {
        let config = EmitterConfig::new().perform_indent(true);
        self.root.write_with_config(writer, config)?;
        Ok(())
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let file = std::fs::File::create(path).map_err(|e| ProfileError::io(path, e))?;
        self.write(std::io::BufWriter::new(file))
    }

    pub fn to_xml_string(&self) -> Result<String> {
        let mut out = Vec::new();
        self.write(&mut out)?;
        Ok(String::from_utf8_lossy(&out).into_owned())
    }

    pub fn root(&self) -> &Element {
        &self.root
    }

    /// Build a scene holding every named geometry as a mesh and every named
    /// joint as a bone of one selected armature called `Armature`.
    pub fn scaffold_scene(&self) -> Scene {
        let mut scene = Scene::new();

        for geometry in geometries(&self.root) {
            if let Some(name) = geometry.attributes.get("name") {
                scene.add_mesh(name.clone());
            }
        }

        let mut joints = Vec::new();
        for visual_scene in visual_scenes(&self.root) {
            for node in child_elements(visual_scene, "node") {
                collect_joint_names(node, &mut joints);
            }
        }
        if !joints.is_empty() {
            scene.add_armature("Armature", Armature::with_bones(joints), true);
        }

        scene
    }
}

fn collect_joint_names(node: &Element, out: &mut Vec<String>) {
    if is_joint(node) {
        if let Some(name) = node.attributes.get("name") {
            out.push(name.clone());
        }
    }
    for child in child_elements(node, "node") {
        collect_joint_names(child, out);
    }
}

/// Child elements of `parent` with the given local name.
pub(crate) fn child_elements<'a>(
    parent: &'a Element,
    name: &'a str,
) -> impl Iterator<Item = &'a Element> + 'a {
    parent.children.iter().filter_map(move |node| match node {
        XMLNode::Element(e) if e.name == name => Some(e),
        _ => None,
    })
}

pub(crate) fn child_elements_mut<'a>(
    parent: &'a mut Element,
    name: &'a str,
) -> impl Iterator<Item = &'a mut Element> + 'a {
    parent.children.iter_mut().filter_map(move |node| match node {
        XMLNode::Element(e) if e.name == name => Some(e),
        _ => None,
    })
}

pub(crate) fn geometries(root: &Element) -> impl Iterator<Item = &Element> {
    child_elements(root, "library_geometries").flat_map(|lib| child_elements(lib, "geometry"))
}

pub(crate) fn visual_scenes(root: &Element) -> impl Iterator<Item = &Element> {
    child_elements(root, "library_visual_scenes")
        .flat_map(|lib| child_elements(lib, "visual_scene"))
}

pub(crate) fn animations(root: &Element) -> impl Iterator<Item = &Element> {
    child_elements(root, "library_animations").flat_map(|lib| child_elements(lib, "animation"))
}

pub(crate) fn is_joint(node: &Element) -> bool {
    node.attributes.get("type").map(String::as_str) == Some("JOINT")
}

fn is_profile(technique: &Element) -> bool {
    technique.name == "technique"
        && technique.attributes.get("profile").map(String::as_str) == Some(COLLADA_PROFILE)
}

/// The `extra/technique[@profile="LSTools"]` block directly under `parent`.
pub(crate) fn find_profile(parent: &Element) -> Option<&Element> {
    child_elements(parent, "extra")
        .flat_map(|extra| extra.children.iter())
        .find_map(|node| match node {
            XMLNode::Element(e) if is_profile(e) => Some(e),
            _ => None,
        })
}

/// Trimmed text content of an element.
pub(crate) fn text_of(element: &Element) -> String {
    element
        .get_text()
        .map(|text| text.trim().to_string())
        .unwrap_or_default()
}

pub(crate) fn text_element(name: &str, text: impl Into<String>) -> Element {
    let mut element = Element::new(name);
    element.children.push(XMLNode::Text(text.into()));
    element
}

/// Replace the LSTools block under `parent`. `None` only removes the old one.
pub(crate) fn replace_profile(parent: &mut Element, fields: Option<Vec<Element>>) {
    for extra in child_elements_mut(parent, "extra") {
        extra
            .children
            .retain(|node| !matches!(node, XMLNode::Element(e) if is_profile(e)));
    }

    let Some(fields) = fields else {
        return;
    };

    let mut technique = Element::new("technique");
    technique
        .attributes
        .insert("profile".to_string(), COLLADA_PROFILE.to_string());
    technique
        .children
        .extend(fields.into_iter().map(XMLNode::Element));

    if let Some(extra) = child_elements_mut(parent, "extra").next() {
        extra.children.push(XMLNode::Element(technique));
    } else {
        let mut extra = Element::new("extra");
        extra.children.push(XMLNode::Element(technique));
        parent.children.push(XMLNode::Element(extra));
    }
}
