use wgpu::util::DeviceExt;

use crate::{
    data_structures::{model::Vertex, texture::GpuTexture},
    overlay::LineVertex,
};

#[repr(C)]
#[derive(Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
pub struct OverlayUniform {
    pub view_proj: [[f32; 4]; 4],
}

/// View-projection shared by all overlay draws of a frame.
#[derive(Debug)]
pub struct OverlayResources {
    pub buffer: wgpu::Buffer,
    pub bind_group: wgpu::BindGroup,
}

impl OverlayResources {
    pub fn new(device: &wgpu::Device, layout: &wgpu::BindGroupLayout) -> Self {
        use cgmath::SquareMatrix;
        let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Overlay Buffer"),
            contents: bytemuck::cast_slice(&[OverlayUniform {
                view_proj: cgmath::Matrix4::identity().into(),
            }]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: buffer.as_entire_binding(),
            }],
            label: Some("overlay_bind_group"),
        });
        Self { buffer, bind_group }
    }

    pub fn write(&self, queue: &wgpu::Queue, view_proj: [[f32; 4]; 4]) {
        queue.write_buffer(&self.buffer, 0, bytemuck::cast_slice(&[OverlayUniform { view_proj }]));
    }
}

pub fn mk_bind_group_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        entries: &[wgpu::BindGroupLayoutEntry {
            binding: 0,
            visibility: wgpu::ShaderStages::VERTEX,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            count: None,
        }],
        label: Some("overlay_bind_group_layout"),
    })
}

pub fn mk_line_pipeline(
    device: &wgpu::Device,
    config: &wgpu::SurfaceConfiguration,
    overlay_layout: &wgpu::BindGroupLayout,
) -> wgpu::RenderPipeline {
    let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some("Line Pipeline Layout"),
        bind_group_layouts: &[overlay_layout],
        push_constant_ranges: &[],
    });
    let shader = wgpu::ShaderModuleDescriptor {
        label: Some("Line Shader"),
        source: wgpu::ShaderSource::Wgsl(include_str!("line.wgsl").into()),
    };
    crate::pipelines::basic::mk_render_pipeline(
        device,
        &layout,
        config.format,
        Some(wgpu::BlendState::ALPHA_BLENDING),
        Some(GpuTexture::DEPTH_FORMAT),
        &[LineVertex::desc()],
        shader,
        wgpu::PrimitiveTopology::LineList,
    )
}
