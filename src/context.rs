//! The wgpu side of the engine.
//!
//! [`Context`] owns the window surface, device, queue and pipelines, and the
//! arenas every GPU mesh buffer and texture lives in. Handles given out
//! through [`GpuDevice`] index those arenas; the objects are released once,
//! when the context is dropped.

use std::{collections::HashMap, sync::Arc};

use anyhow::Context as _;
use wgpu::util::DeviceExt;
use winit::window::Window;

use crate::{
    camera::Projection,
    config::RendererConfig,
    data_structures::{
        model::ModelVertex,
        texture::{GpuTexture, TextureKind},
    },
    frame::WgpuFrame,
    gpu::{BufferHandle, DrawUniforms, GpuDevice, MeshBuffers, TextureHandle},
    pipelines::{
        light::{marker_cube, LightingResources},
        overlay::OverlayResources,
        skybox::SkyboxResources,
        Pipelines,
    },
};

/// Dynamic-offset uniform buffer holding one [`DrawUniforms`] block per draw.
#[derive(Debug)]
pub(crate) struct DrawUniformResources {
    pub buffer: wgpu::Buffer,
    pub bind_group: wgpu::BindGroup,
    /// Distance between blocks, a multiple of the device's offset alignment.
    pub stride: u64,
    pub capacity: u64,
}

impl DrawUniformResources {
    const INITIAL_CAPACITY: u64 = 64;

    fn new(device: &wgpu::Device, layout: &wgpu::BindGroupLayout, stride: u64, capacity: u64) -> Self {
        let buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Draw Uniform Buffer"),
            size: stride * capacity,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                    buffer: &buffer,
                    offset: 0,
                    size: wgpu::BufferSize::new(std::mem::size_of::<DrawUniforms>() as u64),
                }),
            }],
            label: Some("draw_uniform_bind_group"),
        });
        Self {
            buffer,
            bind_group,
            stride,
            capacity,
        }
    }

    /// Grow to hold at least `count` blocks.
    pub fn reserve(&mut self, device: &wgpu::Device, layout: &wgpu::BindGroupLayout, count: u64) {
        if count <= self.capacity {
            return;
        }
        let capacity = grown_capacity(self.capacity, count);
        log::debug!("growing draw uniform buffer to {} blocks", capacity);
        *self = Self::new(device, layout, self.stride, capacity);
    }

    /// Blocks laid out at `stride` intervals, ready for one buffer write.
    pub fn pack(&self, uniforms: &[DrawUniforms]) -> Vec<u8> {
        let mut bytes = vec![0u8; self.stride as usize * uniforms.len()];
        for (i, block) in uniforms.iter().enumerate() {
            let start = i * self.stride as usize;
            let src = bytemuck::bytes_of(block);
            bytes[start..start + src.len()].copy_from_slice(src);
        }
        bytes
    }
}

/// Vertex data that is rewritten every frame, such as overlay lines and
/// light marker instances. The buffer only ever grows.
#[derive(Debug)]
pub(crate) struct GrowableBuffer {
    pub buffer: wgpu::Buffer,
    label: &'static str,
    /// In bytes.
    capacity: u64,
}

impl GrowableBuffer {
    const INITIAL_SIZE: u64 = 16 * 1024;

    fn new(device: &wgpu::Device, label: &'static str, capacity: u64) -> Self {
        let buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(label),
            size: capacity,
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        Self {
            buffer,
            label,
            capacity,
        }
    }

    /// Replace the contents with `bytes`, reallocating first if they do not fit.
    pub fn write(&mut self, device: &wgpu::Device, queue: &wgpu::Queue, bytes: &[u8]) {
        if bytes.is_empty() {
            return;
        }
        let needed = align_to(bytes.len() as u64, wgpu::COPY_BUFFER_ALIGNMENT);
        if needed > self.capacity {
            let capacity = grown_capacity(self.capacity, needed);
            log::debug!("growing {} to {} bytes", self.label, capacity);
            *self = Self::new(device, self.label, capacity);
        }
        queue.write_buffer(&self.buffer, 0, bytes);
    }
}

/// Next power of two that holds `needed`, never less than `current`.
fn grown_capacity(current: u64, needed: u64) -> u64 {
    needed.next_power_of_two().max(current)
}

fn align_to(size: u64, alignment: u64) -> u64 {
    size.div_ceil(alignment.max(1)) * alignment.max(1)
}

#[derive(Debug)]
pub struct Context {
    pub(crate) window: Arc<Window>,
    pub(crate) depth_texture: GpuTexture,
    pub surface: wgpu::Surface<'static>,
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub config: wgpu::SurfaceConfiguration,
    pub clear_colour: wgpu::Color,
    pub projection: Projection,
    pub pipelines: Pipelines,
    pub(crate) textures: Vec<GpuTexture>,
    pub(crate) cube_textures: Vec<GpuTexture>,
    pub(crate) buffers: Vec<wgpu::Buffer>,
    /// Keyed by (diffuse, specular).
    pub(crate) material_groups: HashMap<(TextureHandle, TextureHandle), wgpu::BindGroup>,
    pub(crate) draw_uniforms: DrawUniformResources,
    pub(crate) lighting: LightingResources,
    pub(crate) overlay: OverlayResources,
    pub(crate) skybox: SkyboxResources,
    pub(crate) skybox_groups: HashMap<TextureHandle, wgpu::BindGroup>,
    pub(crate) line_vertices: GrowableBuffer,
    pub(crate) marker_instances: GrowableBuffer,
    pub(crate) marker_cube: (MeshBuffers, u32),
}

impl Context {
    pub async fn new(window: Arc<Window>, renderer: &RendererConfig) -> anyhow::Result<Self> {
        let size = window.inner_size();

        log::info!("wgpu setup");
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::PRIMARY,
            ..Default::default()
        });

        let surface = instance
            .create_surface(window.clone())
            .context("could not create a surface for the window")?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .context("no suitable graphics adapter")?;
        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: None,
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::default(),
                memory_hints: Default::default(),
                trace: wgpu::Trace::Off,
            })
            .await
            .context("could not open the graphics device")?;

        let surface_caps = surface.get_capabilities(&adapter);
        // The shaders assume an sRGB surface, otherwise colours come out darker.
        let surface_format = surface_caps
            .formats
            .iter()
            .copied()
            .find(|f| f.is_srgb())
            .or_else(|| surface_caps.formats.first().copied())
            .context("surface supports no texture format")?;
        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: surface_caps
                .present_modes
                .first()
                .copied()
                .unwrap_or(wgpu::PresentMode::Fifo),
            alpha_mode: surface_caps
                .alpha_modes
                .first()
                .copied()
                .unwrap_or(wgpu::CompositeAlphaMode::Auto),
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);

        let projection = Projection::new(
            config.width,
            config.height,
            cgmath::Deg(renderer.fov_degrees),
            renderer.near,
            renderer.far,
        );

        let depth_texture =
            GpuTexture::create_depth_texture(&device, [config.width, config.height], "depth_texture");

        let pipelines = Pipelines::new(&device, &config);
        let stride = align_to(
            std::mem::size_of::<DrawUniforms>() as u64,
            device.limits().min_uniform_buffer_offset_alignment as u64,
        );
        let draw_uniforms = DrawUniformResources::new(
            &device,
            &pipelines.layouts.draw,
            stride,
            DrawUniformResources::INITIAL_CAPACITY,
        );
        let lighting = LightingResources::new(&device, &pipelines.layouts.lighting);
        let overlay = OverlayResources::new(&device, &pipelines.layouts.overlay);
        let skybox = SkyboxResources::new(&device, &pipelines.layouts.skybox_uniform);
        let line_vertices =
            GrowableBuffer::new(&device, "Overlay Line Buffer", GrowableBuffer::INITIAL_SIZE);
        let marker_instances =
            GrowableBuffer::new(&device, "Light Marker Buffer", GrowableBuffer::INITIAL_SIZE);

        let mut ctx = Self {
            window,
            depth_texture,
            surface,
            device,
            queue,
            config,
            clear_colour: renderer.clear_colour(),
            projection,
            pipelines,
            textures: Vec::new(),
            cube_textures: Vec::new(),
            buffers: Vec::new(),
            material_groups: HashMap::new(),
            draw_uniforms,
            lighting,
            overlay,
            skybox,
            skybox_groups: HashMap::new(),
            line_vertices,
            marker_instances,
            marker_cube: (
                MeshBuffers {
                    vertex: BufferHandle(0),
                    index: BufferHandle(0),
                },
                0,
            ),
        };
        let (vertices, indices) = marker_cube();
        let cube = ctx.create_mesh("light marker cube", &vertices, &indices)?;
        ctx.marker_cube = (cube, indices.len() as u32);

        log::info!(
            "renderer ready: {}x{} {:?}",
            ctx.config.width,
            ctx.config.height,
            ctx.config.format
        );
        Ok(ctx)
    }

    pub fn window(&self) -> &Window {
        &self.window
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        if width > 0 && height > 0 {
            self.config.width = width;
            self.config.height = height;
            self.projection.resize(width, height);
            self.surface.configure(&self.device, &self.config);
            self.depth_texture = GpuTexture::create_depth_texture(
                &self.device,
                [self.config.width, self.config.height],
                "depth_texture",
            );
        }
    }

    /// Acquire the next surface texture and start recording a frame.
    pub fn begin_frame(&mut self) -> Result<WgpuFrame<'_>, wgpu::SurfaceError> {
        let output = self.surface.get_current_texture()?;
        Ok(WgpuFrame::new(self, output))
    }

    pub(crate) fn buffer(&self, handle: BufferHandle) -> Option<&wgpu::Buffer> {
        self.buffers.get(handle.0 as usize)
    }

    pub(crate) fn texture(&self, handle: TextureHandle) -> Option<&GpuTexture> {
        if !handle.is_valid() {
            return None;
        }
        self.textures.get(handle.0 as usize)
    }

    pub(crate) fn cube_texture(&self, handle: TextureHandle) -> Option<&GpuTexture> {
        if !handle.is_valid() {
            return None;
        }
        self.cube_textures.get(handle.0 as usize)
    }

    /// Create the bind group sampling cube map `cube` unless it exists.
    pub(crate) fn ensure_skybox_group(&mut self, cube: TextureHandle) -> anyhow::Result<()> {
        if self.skybox_groups.contains_key(&cube) {
            return Ok(());
        }
        let texture = self.cube_texture(cube).context("cube map is not uploaded")?;
        let sampler = texture.sampler.as_ref().context("cube map has no sampler")?;
        let bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout: &self.pipelines.layouts.skybox_texture,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&texture.view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(sampler),
                },
            ],
            label: Some("skybox_texture_bind_group"),
        });
        self.skybox_groups.insert(cube, bind_group);
        Ok(())
    }

    /// Create the bind group for a diffuse/specular pair unless it exists.
    pub(crate) fn ensure_material_group(
        &mut self,
        diffuse: TextureHandle,
        specular: TextureHandle,
    ) -> anyhow::Result<()> {
        if self.material_groups.contains_key(&(diffuse, specular)) {
            return Ok(());
        }
        let d = self.texture(diffuse).context("diffuse texture is not uploaded")?;
        let s = self.texture(specular).context("specular texture is not uploaded")?;
        let (Some(d_sampler), Some(s_sampler)) = (&d.sampler, &s.sampler) else {
            anyhow::bail!("material texture has no sampler");
        };
        let bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout: &self.pipelines.layouts.material,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&d.view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(d_sampler),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::TextureView(&s.view),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: wgpu::BindingResource::Sampler(s_sampler),
                },
            ],
            label: Some("material_bind_group"),
        });
        self.material_groups.insert((diffuse, specular), bind_group);
        Ok(())
    }

    fn push_buffer(&mut self, buffer: wgpu::Buffer) -> BufferHandle {
        self.buffers.push(buffer);
        BufferHandle((self.buffers.len() - 1) as u32)
    }
}

impl GpuDevice for Context {
    fn create_mesh(
        &mut self,
        label: &str,
        vertices: &[ModelVertex],
        indices: &[u32],
    ) -> anyhow::Result<MeshBuffers> {
        if vertices.is_empty() || indices.is_empty() {
            anyhow::bail!("mesh {:?} has no geometry", label);
        }
        let vertex_buffer = self.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{:?} Vertex Buffer", label)),
            contents: bytemuck::cast_slice(vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let index_buffer = self.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{:?} Index Buffer", label)),
            contents: bytemuck::cast_slice(indices),
            usage: wgpu::BufferUsages::INDEX,
        });
        Ok(MeshBuffers {
            vertex: self.push_buffer(vertex_buffer),
            index: self.push_buffer(index_buffer),
        })
    }

    fn create_texture(
        &mut self,
        label: &str,
        image: &image::RgbaImage,
        kind: TextureKind,
    ) -> anyhow::Result<TextureHandle> {
        if image.width() == 0 || image.height() == 0 {
            anyhow::bail!("texture {:?} is empty", label);
        }
        let texture = GpuTexture::from_rgba(&self.device, &self.queue, image, Some(label), kind.format());
        self.textures.push(texture);
        Ok(TextureHandle((self.textures.len() - 1) as u32))
    }

    fn create_cube_texture(
        &mut self,
        label: &str,
        faces: &[image::RgbaImage; 6],
    ) -> anyhow::Result<TextureHandle> {
        let size = faces[0].width();
        if size == 0 || faces.iter().any(|f| f.dimensions() != (size, size)) {
            anyhow::bail!("cube map {:?} needs six square faces of one size", label);
        }
        let max = self.device.limits().max_texture_dimension_2d;
        if size > max {
            anyhow::bail!("cube map {:?} faces are {}px, the device allows {}", label, size, max);
        }
        let texture = GpuTexture::cube_from_rgba(&self.device, &self.queue, faces, label);
        self.cube_textures.push(texture);
        Ok(TextureHandle((self.cube_textures.len() - 1) as u32))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uniform_stride_respects_alignment() {
        assert_eq!(align_to(288, 256), 512);
        assert_eq!(align_to(256, 256), 256);
        assert_eq!(align_to(288, 0), 288);
    }

    #[test]
    fn buffers_grow_to_powers_of_two_and_never_shrink() {
        assert_eq!(grown_capacity(64, 65), 128);
        assert_eq!(grown_capacity(64, 200), 256);
        assert_eq!(grown_capacity(16 * 1024, 24 * 1001), 32 * 1024);
        assert_eq!(grown_capacity(4096, 12), 4096);
    }
}
