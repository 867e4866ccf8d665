#![allow(dead_code)]

use std::path::{Path, PathBuf};

use forward_ngin::{
    config::RendererConfig,
    data_structures::{model::ModelVertex, texture::{Texture, TextureKind}},
    error::NginError,
    gpu::{
        BufferHandle, DrawUniforms, FrameEncoder, GpuDevice, MeshBuffers, ShaderHandle,
        TextureHandle,
    },
    lighting::LightingUniform,
    overlay::{LineVertex, MarkerInstance},
    render::TEXTURE_UNITS,
};

/// Hands out sequential handles and remembers what it was asked to create.
#[derive(Debug, Default)]
pub struct RecordingDevice {
    /// (label, vertex count, index count)
    pub meshes: Vec<(String, usize, usize)>,
    /// (label, kind, dimensions)
    pub textures: Vec<(String, TextureKind, (u32, u32))>,
    /// (label, face size)
    pub cubes: Vec<(String, u32)>,
    next_buffer: u32,
}

impl RecordingDevice {
    pub fn new() -> Self {
        Self::default()
    }
}

impl GpuDevice for RecordingDevice {
    fn create_mesh(
        &mut self,
        label: &str,
        vertices: &[ModelVertex],
        indices: &[u32],
    ) -> anyhow::Result<MeshBuffers> {
        self.meshes
            .push((label.to_string(), vertices.len(), indices.len()));
        let buffers = MeshBuffers {
            vertex: BufferHandle(self.next_buffer),
            index: BufferHandle(self.next_buffer + 1),
        };
        self.next_buffer += 2;
        Ok(buffers)
    }

    fn create_texture(
        &mut self,
        label: &str,
        image: &image::RgbaImage,
        kind: TextureKind,
    ) -> anyhow::Result<TextureHandle> {
        self.textures
            .push((label.to_string(), kind, image.dimensions()));
        Ok(TextureHandle((self.textures.len() - 1) as u32))
    }

    fn create_cube_texture(
        &mut self,
        label: &str,
        faces: &[image::RgbaImage; 6],
    ) -> anyhow::Result<TextureHandle> {
        self.cubes.push((label.to_string(), faces[0].width()));
        Ok(TextureHandle((self.cubes.len() - 1) as u32))
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Call {
    UseShader(ShaderHandle),
    SetLighting,
    Bind { unit: u32, handle: TextureHandle },
    Unbind(u32),
    Uniforms(DrawUniforms),
    Draw {
        mesh: MeshBuffers,
        index_count: u32,
        bound: [Option<TextureHandle>; TEXTURE_UNITS as usize],
    },
    Lines(usize),
    Markers(usize),
    Skybox {
        inv_view_proj: [[f32; 4]; 4],
        cube: TextureHandle,
    },
}

/// Records every call in order and tracks the texture units like a real
/// encoder would.
#[derive(Debug, Default)]
pub struct RecordingFrame {
    pub calls: Vec<Call>,
    pub lighting: Option<LightingUniform>,
    pub bound: [Option<TextureHandle>; TEXTURE_UNITS as usize],
    /// Binding this handle fails.
    pub fail_bind: Option<TextureHandle>,
}

impl RecordingFrame {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_on(handle: TextureHandle) -> Self {
        Self {
            fail_bind: Some(handle),
            ..Self::default()
        }
    }

    pub fn draws(&self) -> Vec<&Call> {
        self.calls
            .iter()
            .filter(|c| matches!(c, Call::Draw { .. }))
            .collect()
    }

    pub fn uniforms(&self) -> Vec<DrawUniforms> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                Call::Uniforms(u) => Some(*u),
                _ => None,
            })
            .collect()
    }

    pub fn light_counts(&self) -> Option<(u32, u32, u32)> {
        self.lighting.map(|l| {
            (
                l.number_of_dir_lights,
                l.number_of_point_lights,
                l.number_of_spot_lights,
            )
        })
    }
}

impl FrameEncoder for RecordingFrame {
    fn use_shader(&mut self, shader: ShaderHandle) {
        self.calls.push(Call::UseShader(shader));
    }

    fn set_lighting(&mut self, lighting: &LightingUniform) {
        self.lighting = Some(*lighting);
        self.calls.push(Call::SetLighting);
    }

    fn bind_texture(&mut self, unit: u32, texture: &Texture) -> Result<(), NginError> {
        if !texture.is_valid() || Some(texture.handle) == self.fail_bind {
            return Err(NginError::RenderBinding {
                unit,
                reason: "recording frame refused the texture".to_string(),
            });
        }
        self.bound[unit as usize] = Some(texture.handle);
        self.calls.push(Call::Bind {
            unit,
            handle: texture.handle,
        });
        Ok(())
    }

    fn unbind_texture(&mut self, unit: u32) {
        self.bound[unit as usize] = None;
        self.calls.push(Call::Unbind(unit));
    }

    fn set_draw_uniforms(&mut self, uniforms: &DrawUniforms) {
        self.calls.push(Call::Uniforms(*uniforms));
    }

    fn draw_indexed(&mut self, mesh: &MeshBuffers, index_count: u32) -> Result<(), NginError> {
        self.calls.push(Call::Draw {
            mesh: *mesh,
            index_count,
            bound: self.bound,
        });
        Ok(())
    }

    fn draw_lines(&mut self, _view_proj: [[f32; 4]; 4], vertices: &[LineVertex]) {
        self.calls.push(Call::Lines(vertices.len()));
    }

    fn draw_light_markers(&mut self, _view_proj: [[f32; 4]; 4], markers: &[MarkerInstance]) {
        self.calls.push(Call::Markers(markers.len()));
    }

    fn draw_skybox(
        &mut self,
        inv_view_proj: [[f32; 4]; 4],
        cube: TextureHandle,
    ) -> Result<(), NginError> {
        self.calls.push(Call::Skybox {
            inv_view_proj,
            cube,
        });
        Ok(())
    }
}

/// Renderer config pointing at the crate's own fallback textures.
pub fn test_config() -> RendererConfig {
    RendererConfig {
        asset_root: Path::new(env!("CARGO_MANIFEST_DIR")).join("assets"),
        ..RendererConfig::default()
    }
}

/// A fresh directory under the system temp dir, removed on drop.
pub struct ScratchDir {
    path: PathBuf,
}

impl ScratchDir {
    pub fn new(name: &str) -> Self {
        let path = std::env::temp_dir().join(format!(
            "forward-ngin-{}-{}",
            name,
            std::process::id()
        ));
        let _ = std::fs::remove_dir_all(&path);
        std::fs::create_dir_all(&path).unwrap();
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn write(&self, name: &str, contents: impl AsRef<[u8]>) -> PathBuf {
        let path = self.path.join(name);
        std::fs::write(&path, contents).unwrap();
        path
    }

    pub fn write_png(&self, name: &str, width: u32, height: u32, rgba: [u8; 4]) -> PathBuf {
        let path = self.path.join(name);
        image::RgbaImage::from_pixel(width, height, image::Rgba(rgba))
            .save_with_format(&path, image::ImageFormat::Png)
            .unwrap();
        path
    }
}

impl Drop for ScratchDir {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.path);
    }
}

/// Six `size`x`size` faces named like the default skybox config.
pub fn write_skybox(dir: &ScratchDir, size: u32) -> [PathBuf; 6] {
    forward_ngin::resources::skybox::FACE_NAMES
        .map(|face| dir.write_png(&format!("{}.png", face), size, size, [40, 90, 200, 255]))
}

/// One textured triangle in the XY plane using material `red`.
pub const TRIANGLE_OBJ: &str = "mtllib triangle.mtl
o triangle
v 0.0 0.0 0.0
v 1.0 0.0 0.0
v 0.0 1.0 0.0
vt 0.0 0.0
vt 1.0 0.0
vt 0.0 1.0
vn 0.0 0.0 1.0
usemtl red
f 1/1/1 2/2/1 3/3/1
";

/// Diffuse colour and texture only, ambient and specular are left out.
pub const TRIANGLE_MTL: &str = "newmtl red
Kd 1.0 0.0 0.0
map_Kd diffuse.png
";

/// Writes the triangle obj, its material library and a 2x2 diffuse texture.
pub fn write_triangle(dir: &ScratchDir) -> PathBuf {
    dir.write("triangle.mtl", TRIANGLE_MTL);
    dir.write_png("diffuse.png", 2, 2, [255, 0, 0, 255]);
    dir.write("triangle.obj", TRIANGLE_OBJ)
}
