//! LSLib metadata profile codec.
//!
//! Reads and writes the game metadata LSLib attaches to Collada and glTF
//! model exports: target game, per-mesh type flags and LODs, bone export
//! order and skeleton resource ids.
//!
//! ```no_run
//! use lslib_profile::{collada::ColladaDocument, Diagnostics, Scene};
//!
//! # fn main() -> Result<(), lslib_profile::ProfileError> {
//! let doc = ColladaDocument::load("Sword.dae".as_ref())?;
//! let mut scene = doc.scaffold_scene();
//! let mut diags = Diagnostics::new();
//! lslib_profile::collada::load_metadata(&doc, &mut scene, &mut diags);
//! # Ok(())
//! # }
//! ```

pub mod collada;
pub mod diagnostics;
pub mod error;
pub mod gltf;
pub mod scene;
pub mod schema;

pub use diagnostics::{Diagnostic, Diagnostics, Severity};
pub use error::ProfileError;
pub use scene::{
    Armature, ArmatureMetadata, Bone, BoneMetadata, MeshMetadata, ObjectKind, Scene, SceneMetadata,
    SceneObject,
};
pub use schema::{COLLADA_PROFILE, GLTF_EXTENSION_NAME, GameId, LSLIB_METADATA_VERSION, MeshType};
