//! LSLib metadata schema.
//!
//! This module is the single source of truth for the profile names, the
//! schema version and the closed value sets shared by the Collada and glTF
//! encodings. Bump [`LSLIB_METADATA_VERSION`] together with any change to
//! the tables below.

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use hashbrown::HashMap;
use serde::{Deserialize, Serialize};

/// Metadata schema version written by (and expected from) LSLib.
pub const LSLIB_METADATA_VERSION: u32 = 3;

/// `profile` attribute of the Collada `<technique>` blocks.
pub const COLLADA_PROFILE: &str = "LSTools";

/// Key of the glTF extension object.
pub const GLTF_EXTENSION_NAME: &str = "EXT_lslib_profile";

/// Target game of an exported model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum GameId {
    #[serde(rename = "dos")]
    Dos,
    #[serde(rename = "dosee")]
    DosEE,
    #[serde(rename = "dos2")]
    Dos2,
    #[serde(rename = "dos2de")]
    Dos2DE,
    #[serde(rename = "bg3prepatch8")]
    Bg3PrePatch8,
    #[default]
    #[serde(rename = "bg3")]
    Bg3,
    #[serde(rename = "unset")]
    Unset,
}

impl GameId {
    pub const ALL: [GameId; 7] = [
        GameId::Dos,
        GameId::DosEE,
        GameId::Dos2,
        GameId::Dos2DE,
        GameId::Bg3PrePatch8,
        GameId::Bg3,
        GameId::Unset,
    ];

    /// Short identifier used in scene files and on the command line.
    pub fn as_str(self) -> &'static str {
        match self {
            GameId::Dos => "dos",
            GameId::DosEE => "dosee",
            GameId::Dos2 => "dos2",
            GameId::Dos2DE => "dos2de",
            GameId::Bg3PrePatch8 => "bg3prepatch8",
            GameId::Bg3 => "bg3",
            GameId::Unset => "unset",
        }
    }

    /// Value of the `<Game>` element in the Collada root profile.
    pub fn tag(self) -> &'static str {
        match self {
            GameId::Dos => "DivinityOriginalSin",
            GameId::DosEE => "DivinityOriginalSinEE",
            GameId::Dos2 => "DivinityOriginalSin2",
            GameId::Dos2DE => "DivinityOriginalSin2DE",
            GameId::Bg3PrePatch8 => "BaldursGate3PrePatch8",
            GameId::Bg3 => "BaldursGate3",
            GameId::Unset => "Unset",
        }
    }

    /// Parse a `<Game>` tag. Returns `None` for tags this schema doesn't know.
    pub fn from_tag(tag: &str) -> Option<GameId> {
        GameId::ALL.into_iter().find(|game| game.tag() == tag)
    }

    /// Game argument understood by the Divine converter, `None` for [`GameId::Unset`].
    pub fn converter_arg(self) -> Option<&'static str> {
        match self {
            GameId::Unset => None,
            GameId::Bg3PrePatch8 => Some("bg3"),
            other => Some(other.as_str()),
        }
    }
}

impl fmt::Display for GameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GameId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.to_ascii_lowercase();
        GameId::ALL
            .into_iter()
            .find(|game| game.as_str() == lower)
            .ok_or_else(|| {
                let known: Vec<_> = GameId::ALL.iter().map(|g| g.as_str()).collect();
                format!("unknown game '{}' (expected one of: {})", s, known.join(", "))
            })
    }
}

/// Mesh type flags. The tag doubles as the `DivModelType` value in Collada
/// and as the boolean key in the glTF mesh extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MeshType {
    Rigid,
    Cloth,
    MeshProxy,
    ProxyGeometry,
    Spring,
    Occluder,
    ClothPhysics,
    Cloth01,
    Cloth02,
    Cloth04,
    Impostor,
}

impl MeshType {
    pub const ALL: [MeshType; 11] = [
        MeshType::Rigid,
        MeshType::Cloth,
        MeshType::MeshProxy,
        MeshType::ProxyGeometry,
        MeshType::Spring,
        MeshType::Occluder,
        MeshType::ClothPhysics,
        MeshType::Cloth01,
        MeshType::Cloth02,
        MeshType::Cloth04,
        MeshType::Impostor,
    ];

    pub fn tag(self) -> &'static str {
        match self {
            MeshType::Rigid => "Rigid",
            MeshType::Cloth => "Cloth",
            MeshType::MeshProxy => "MeshProxy",
            MeshType::ProxyGeometry => "ProxyGeometry",
            MeshType::Spring => "Spring",
            MeshType::Occluder => "Occluder",
            MeshType::ClothPhysics => "ClothPhysics",
            MeshType::Cloth01 => "Cloth01",
            MeshType::Cloth02 => "Cloth02",
            MeshType::Cloth04 => "Cloth04",
            MeshType::Impostor => "Impostor",
        }
    }

    pub fn from_tag(tag: &str) -> Option<MeshType> {
        MeshType::ALL.into_iter().find(|ty| ty.tag() == tag)
    }
}

/// One of the 14 fields of the flat glTF mesh extension object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MeshField {
    Flag(MeshType),
    ExportOrder,
    Lod,
    LodDistance,
}

static MESH_FIELDS_BY_KEY: LazyLock<HashMap<&'static str, MeshField>> =
    LazyLock::new(|| MeshField::all().map(|field| (field.key(), field)).collect());

impl MeshField {
    /// All fields in wire order.
    pub fn all() -> impl Iterator<Item = MeshField> {
        MeshType::ALL
            .into_iter()
            .map(MeshField::Flag)
            .chain([MeshField::ExportOrder, MeshField::Lod, MeshField::LodDistance])
    }

    pub fn key(self) -> &'static str {
        match self {
            MeshField::Flag(ty) => ty.tag(),
            MeshField::ExportOrder => "ExportOrder",
            MeshField::Lod => "LOD",
            MeshField::LodDistance => "LODDistance",
        }
    }

    pub fn from_key(key: &str) -> Option<MeshField> {
        MESH_FIELDS_BY_KEY.get(key).copied()
    }
}
