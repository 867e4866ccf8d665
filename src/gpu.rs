//! The seam between the engine core and the graphics API.
//!
//! The importer creates resources through a [`GpuDevice`] and the frame
//! renderer records draws through a [`FrameEncoder`]. Both only ever see
//! small arena handles; the implementor owns the actual GPU objects and frees
//! each of them exactly once when it is dropped. [`crate::context::Context`]
//! and [`crate::frame::WgpuFrame`] are the wgpu implementations.

use crate::{
    data_structures::{
        model::ModelVertex,
        texture::{Texture, TextureKind},
    },
    error::NginError,
    lighting::LightingUniform,
    overlay::{LineVertex, MarkerInstance},
};

/// Index of a texture in the device's texture arena.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TextureHandle(pub u32);

impl TextureHandle {
    pub const INVALID: Self = Self(u32::MAX);

    pub fn is_valid(self) -> bool {
        self != Self::INVALID
    }
}

impl Default for TextureHandle {
    fn default() -> Self {
        Self::INVALID
    }
}

/// Index of a buffer in the device's buffer arena.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct BufferHandle(pub u32);

/// Identifies the pipeline a mesh is drawn with.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct ShaderHandle(pub u32);

impl ShaderHandle {
    /// The forward Blinn-Phong pipeline every imported mesh starts with.
    pub const PHONG: Self = Self(0);
}

/// Vertex and index buffer of one uploaded mesh. The vertex layout is part of
/// the pipeline, so there is no separate array object.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MeshBuffers {
    pub vertex: BufferHandle,
    pub index: BufferHandle,
}

/// Per-draw uniform block. Field names match the shader's `DrawUniforms`.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct DrawUniforms {
    pub model: [[f32; 4]; 4],
    pub view: [[f32; 4]; 4],
    pub projection: [[f32; 4]; 4],
    /// `transpose(inverse(view * model))`
    pub normal_mat: [[f32; 4]; 4],
    pub view_pos: [f32; 3],
    pub _padding: u32,
    pub material: MaterialUniform,
}

#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct MaterialUniform {
    pub shininess: f32,
    pub _padding: [f32; 3],
}

/// Resource creation. Everything here happens on the rendering thread.
pub trait GpuDevice {
    fn create_mesh(
        &mut self,
        label: &str,
        vertices: &[ModelVertex],
        indices: &[u32],
    ) -> anyhow::Result<MeshBuffers>;

    fn create_texture(
        &mut self,
        label: &str,
        image: &image::RgbaImage,
        kind: TextureKind,
    ) -> anyhow::Result<TextureHandle>;

    /// Upload six square faces of equal size as one cube map, in
    /// +X, -X, +Y, -Y, +Z, -Z order. Cube maps live in their own arena.
    fn create_cube_texture(
        &mut self,
        label: &str,
        faces: &[image::RgbaImage; 6],
    ) -> anyhow::Result<TextureHandle>;

    fn default_shader(&self) -> ShaderHandle {
        ShaderHandle::PHONG
    }
}

/// Records the commands of one frame.
///
/// Texture units behave like the fixed units of the shading stage: a binding
/// stays in place until it is replaced or explicitly unbound.
pub trait FrameEncoder {
    fn use_shader(&mut self, shader: ShaderHandle);

    /// Light counts and records for every draw recorded after this call.
    fn set_lighting(&mut self, lighting: &LightingUniform);

    fn bind_texture(&mut self, unit: u32, texture: &Texture) -> Result<(), NginError>;

    fn unbind_texture(&mut self, unit: u32);

    fn set_draw_uniforms(&mut self, uniforms: &DrawUniforms);

    fn draw_indexed(&mut self, mesh: &MeshBuffers, index_count: u32) -> Result<(), NginError>;

    /// Editor overlay lines (grid, gizmos) in world space.
    fn draw_lines(&mut self, view_proj: [[f32; 4]; 4], vertices: &[LineVertex]);

    /// Small unlit cubes marking point lights.
    fn draw_light_markers(&mut self, view_proj: [[f32; 4]; 4], markers: &[MarkerInstance]);

    /// Fill the background from a cube map. `inv_view_proj` is the inverse of
    /// the projection times the view with its translation removed.
    fn draw_skybox(
        &mut self,
        inv_view_proj: [[f32; 4]; 4],
        cube: TextureHandle,
    ) -> Result<(), NginError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn draw_uniforms_match_the_shader_layout() {
        // four mat4x4 + vec3/u32 + the material block
        assert_eq!(std::mem::size_of::<DrawUniforms>(), 4 * 64 + 16 + 16);
    }

    #[test]
    fn default_texture_handle_is_invalid() {
        assert!(!TextureHandle::default().is_valid());
        assert!(TextureHandle(0).is_valid());
    }
}
