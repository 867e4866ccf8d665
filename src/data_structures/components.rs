//! Component records attachable to an [`Entity`].
//!
//! Entities have no behaviour of their own. What an entity *is* follows from
//! the components it carries: a Transform + Mesh pair gets drawn, a Light is
//! picked up by the lighting pass, a Transform alone is a pure grouping node.

use cgmath::Vector3;

use crate::{
    data_structures::{
        registry::Entity,
        texture::{Texture, TextureKind},
    },
    gpu::{MeshBuffers, ShaderHandle},
};

/// Local position, Euler rotation in degrees and scale, plus an optional
/// reference to the ancestor transform these values are relative to.
///
/// The reference is an entity handle, resolved through the registry on every
/// access. It can only be set with
/// [`Registry::attach_transform_parent`](crate::data_structures::registry::Registry::attach_transform_parent),
/// which keeps the chain acyclic.
#[derive(Clone, Debug, PartialEq)]
pub struct TransformComponent {
    pub position: Vector3<f32>,
    pub rotation: Vector3<f32>,
    pub scale: Vector3<f32>,
    pub(crate) parent: Option<Entity>,
}

impl TransformComponent {
    pub fn new(position: Vector3<f32>, rotation: Vector3<f32>, scale: Vector3<f32>) -> Self {
        Self {
            position,
            rotation,
            scale,
            parent: None,
        }
    }

    pub fn from_position(position: Vector3<f32>) -> Self {
        Self {
            position,
            ..Default::default()
        }
    }

    pub fn is_reference(&self) -> bool {
        self.parent.is_some()
    }

    pub fn reference(&self) -> Option<Entity> {
        self.parent
    }
}

impl Default for TransformComponent {
    fn default() -> Self {
        Self::new(
            Vector3::new(0.0, 0.0, 0.0),
            Vector3::new(0.0, 0.0, 0.0),
            Vector3::new(1.0, 1.0, 1.0),
        )
    }
}

/// GPU geometry of one imported mesh. Never mutated after import.
#[derive(Clone, Debug, PartialEq)]
pub struct MeshComponent {
    pub buffers: MeshBuffers,
    pub shader: ShaderHandle,
    /// Number of indices handed to the indexed draw.
    pub index_count: u32,
    pub vertex_count: u32,
    pub has_normal: bool,
    pub has_texture: bool,
}

/// Textures and base colours of a mesh. Built up over several import passes,
/// one per [`TextureKind`].
#[derive(Clone, Debug, PartialEq)]
pub struct MaterialComponent {
    pub diffuse_textures: Vec<Texture>,
    pub specular_texture: Texture,
    pub normal_texture: Texture,
    pub height_texture: Texture,
    pub ambient_texture: Texture,
    pub ambient_color: [f32; 4],
    pub diffuse_color: [f32; 4],
    pub specular_color: [f32; 4],
    pub shininess: f32,
    pub is_embedded: bool,
}

impl MaterialComponent {
    pub const DEFAULT_SHININESS: f32 = 20.0;

    /// Put `texture` into the slot for its kind. Diffuse textures accumulate,
    /// the other slots keep the last texture assigned.
    pub fn assign(&mut self, texture: Texture) {
        match texture.kind {
            TextureKind::Diffuse => self.diffuse_textures.push(texture),
            TextureKind::Specular => self.specular_texture = texture,
            TextureKind::Normal => self.normal_texture = texture,
            TextureKind::Height => self.height_texture = texture,
            TextureKind::Ambient => self.ambient_texture = texture,
        }
    }

    pub fn set_color(&mut self, kind: TextureKind, color: [f32; 4]) {
        match kind {
            TextureKind::Ambient => self.ambient_color = color,
            TextureKind::Diffuse => self.diffuse_color = color,
            TextureKind::Specular => self.specular_color = color,
            // no colour channel for data maps
            TextureKind::Normal | TextureKind::Height => (),
        }
    }

    pub fn diffuse(&self) -> Option<&Texture> {
        self.diffuse_textures.first()
    }
}

impl Default for MaterialComponent {
    fn default() -> Self {
        Self {
            diffuse_textures: Vec::new(),
            specular_texture: Texture::invalid(TextureKind::Specular),
            normal_texture: Texture::invalid(TextureKind::Normal),
            height_texture: Texture::invalid(TextureKind::Height),
            ambient_texture: Texture::invalid(TextureKind::Ambient),
            ambient_color: [1.0; 4],
            diffuse_color: [1.0; 4],
            specular_color: [1.0; 4],
            shininess: Self::DEFAULT_SHININESS,
            is_embedded: false,
        }
    }
}

/// Position of an entity in the scene tree.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RelationComponent {
    /// `None` only for the scene root.
    pub parent: Option<Entity>,
    pub children: Vec<Entity>,
    pub next: Option<Entity>,
    pub prev: Option<Entity>,
}

impl RelationComponent {
    pub fn with_parent(parent: Entity) -> Self {
        Self {
            parent: Some(parent),
            ..Default::default()
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct TagComponent {
    pub name: String,
}

impl TagComponent {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LightKind {
    Directional,
    Point,
    Spot,
}

#[derive(Clone, Debug, PartialEq)]
pub struct LightComponent {
    pub kind: LightKind,
    pub ambient: Vector3<f32>,
    pub diffuse: Vector3<f32>,
    pub specular: Vector3<f32>,
    // attenuation, point and spot only
    pub constant: f32,
    pub linear: f32,
    pub quadratic: f32,
    /// Inner and outer cone angles in degrees, spot only.
    pub cut_off: f32,
    pub outer_cut_off: f32,
}

impl LightComponent {
    pub fn new(kind: LightKind) -> Self {
        Self {
            kind,
            ambient: Vector3::new(1.0, 1.0, 1.0),
            diffuse: Vector3::new(1.0, 1.0, 1.0),
            specular: Vector3::new(1.0, 1.0, 1.0),
            constant: 1.0,
            linear: 0.09,
            quadratic: 0.032,
            cut_off: 12.5,
            outer_cut_off: 17.5,
        }
    }

    pub fn directional() -> Self {
        Self::new(LightKind::Directional)
    }

    pub fn point(constant: f32, linear: f32, quadratic: f32) -> Self {
        Self {
            constant,
            linear,
            quadratic,
            ..Self::new(LightKind::Point)
        }
    }

    pub fn spot(cut_off: f32, outer_cut_off: f32) -> Self {
        Self {
            cut_off,
            outer_cut_off,
            ..Self::new(LightKind::Spot)
        }
    }

    pub fn with_colors(
        mut self,
        ambient: Vector3<f32>,
        diffuse: Vector3<f32>,
        specular: Vector3<f32>,
    ) -> Self {
        self.ambient = ambient;
        self.diffuse = diffuse;
        self.specular = specular;
        self
    }
}
