//! Format-neutral description of a parsed asset.
//!
//! The gltf and obj front-ends both produce a [`SourceScene`]; the importer
//! only ever reads this form.

use std::{collections::HashMap, path::{Path, PathBuf}};

use cgmath::{One, Quaternion, Vector3};

use crate::{data_structures::texture::TextureKind, error::NginError};

#[derive(Clone, Debug, Default)]
pub struct SourceScene {
    pub root: Option<SourceNode>,
    pub meshes: Vec<SourceMesh>,
    pub materials: Vec<SourceMaterial>,
    /// Images stored inside the asset, keyed by their reference name (`"*0"`, `"*1"`, ...).
    pub embedded: HashMap<String, EmbeddedImage>,
    /// Set when the parser could not load everything the asset refers to.
    pub incomplete: bool,
}

#[derive(Clone, Debug)]
pub struct SourceNode {
    pub name: Option<String>,
    pub translation: Vector3<f32>,
    pub rotation: Quaternion<f32>,
    pub scale: Vector3<f32>,
    /// Indices into [`SourceScene::meshes`].
    pub meshes: Vec<usize>,
    pub children: Vec<SourceNode>,
}

impl SourceNode {
    pub fn new(name: Option<String>) -> Self {
        Self {
            name,
            translation: Vector3::new(0.0, 0.0, 0.0),
            rotation: Quaternion::one(),
            scale: Vector3::new(1.0, 1.0, 1.0),
            meshes: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Number of nodes in this subtree, including `self`.
    pub fn count(&self) -> usize {
        1 + self.children.iter().map(SourceNode::count).sum::<usize>()
    }
}

#[derive(Clone, Debug, Default)]
pub struct SourceMesh {
    pub name: Option<String>,
    pub positions: Vec<[f32; 3]>,
    pub normals: Option<Vec<[f32; 3]>>,
    pub tex_coords: Option<Vec<[f32; 2]>>,
    pub tangents: Option<Vec<[f32; 3]>>,
    pub bitangents: Option<Vec<[f32; 3]>>,
    /// Triangle list.
    pub indices: Vec<u32>,
    /// Index into [`SourceScene::materials`].
    pub material: Option<usize>,
}

/// Where a material's texture comes from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TextureRef {
    /// Key into [`SourceScene::embedded`].
    Embedded(String),
    /// Path relative to the directory of the asset file.
    File(PathBuf),
}

#[derive(Clone, Debug, Default)]
pub struct SourceMaterial {
    pub name: String,
    pub ambient: Option<[f32; 4]>,
    pub diffuse: Option<[f32; 4]>,
    pub specular: Option<[f32; 4]>,
    pub shininess: Option<f32>,
    pub textures: Vec<(TextureKind, TextureRef)>,
}

impl SourceMaterial {
    /// Stand-in for meshes that reference no material at all.
    pub fn untextured() -> Self {
        Self {
            name: "default material".to_string(),
            ambient: Some([1.0; 4]),
            diffuse: Some([1.0; 4]),
            specular: Some([1.0; 4]),
            shininess: None,
            textures: Vec::new(),
        }
    }

    /// Base colour for a texture kind. `None` when the asset did not specify it.
    pub fn color(&self, kind: TextureKind) -> Option<[f32; 4]> {
        match kind {
            TextureKind::Ambient => self.ambient,
            TextureKind::Diffuse => self.diffuse,
            TextureKind::Specular => self.specular,
            TextureKind::Normal | TextureKind::Height => Some([0.0; 4]),
        }
    }

    pub fn textures_of(&self, kind: TextureKind) -> impl Iterator<Item = &TextureRef> + '_ {
        self.textures
            .iter()
            .filter(move |(k, _)| *k == kind)
            .map(|(_, texture)| texture)
    }
}

#[derive(Clone, Debug)]
pub struct EmbeddedImage {
    pub bytes: Vec<u8>,
    /// Extension or mime subtype, e.g. `"png"`.
    pub format_hint: Option<String>,
}

/// Parse an asset file, choosing the front-end by extension.
pub fn load_source_scene(path: &Path) -> anyhow::Result<SourceScene> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    match extension.as_deref() {
        Some("gltf") | Some("glb") => super::gltf::load(path),
        Some("obj") => super::obj::load(path),
        _ => Err(NginError::AssetParse {
            path: path.to_path_buf(),
            reason: "unsupported file type".to_string(),
        }
        .into()),
    }
}
