use wgpu::util::DeviceExt;

use crate::{
    data_structures::{
        model::{ModelVertex, Vertex},
        texture::GpuTexture,
    },
    lighting::LightingUniform,
    overlay::MarkerInstance,
};

/// The scene's lights, rewritten once per frame.
#[derive(Debug)]
pub struct LightingResources {
    pub buffer: wgpu::Buffer,
    pub bind_group: wgpu::BindGroup,
}

impl LightingResources {
    pub fn new(device: &wgpu::Device, layout: &wgpu::BindGroupLayout) -> Self {
        let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Lighting Buffer"),
            contents: bytemuck::cast_slice(&[LightingUniform::default()]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: buffer.as_entire_binding(),
            }],
            label: Some("lighting_bind_group"),
        });
        Self { buffer, bind_group }
    }

    pub fn write(&self, queue: &wgpu::Queue, lighting: &LightingUniform) {
        queue.write_buffer(&self.buffer, 0, bytemuck::cast_slice(&[*lighting]));
    }
}

pub fn mk_bind_group_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        entries: &[wgpu::BindGroupLayoutEntry {
            binding: 0,
            visibility: wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            count: None,
        }],
        label: Some("lighting_bind_group_layout"),
    })
}

/// Unlit, instanced cubes marking point lights.
pub fn mk_marker_pipeline(
    device: &wgpu::Device,
    config: &wgpu::SurfaceConfiguration,
    overlay_layout: &wgpu::BindGroupLayout,
) -> wgpu::RenderPipeline {
    let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some("Light Marker Pipeline Layout"),
        bind_group_layouts: &[overlay_layout],
        push_constant_ranges: &[],
    });
    let shader = wgpu::ShaderModuleDescriptor {
        label: Some("Light Marker Shader"),
        source: wgpu::ShaderSource::Wgsl(include_str!("light.wgsl").into()),
    };
    crate::pipelines::basic::mk_render_pipeline(
        device,
        &layout,
        config.format,
        Some(wgpu::BlendState {
            alpha: wgpu::BlendComponent::REPLACE,
            color: wgpu::BlendComponent::REPLACE,
        }),
        Some(GpuTexture::DEPTH_FORMAT),
        &[ModelVertex::desc(), MarkerInstance::desc()],
        shader,
        wgpu::PrimitiveTopology::TriangleList,
    )
}

/// Unit cube centred on the origin, counter-clockwise faces pointing outwards.
pub fn marker_cube() -> (Vec<ModelVertex>, Vec<u32>) {
    const FACES: [([f32; 3], [f32; 3], [f32; 3]); 6] = [
        // normal, u axis, v axis
        ([1.0, 0.0, 0.0], [0.0, 0.0, -1.0], [0.0, 1.0, 0.0]),
        ([-1.0, 0.0, 0.0], [0.0, 0.0, 1.0], [0.0, 1.0, 0.0]),
        ([0.0, 1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, -1.0]),
        ([0.0, -1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, 1.0]),
        ([0.0, 0.0, 1.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]),
        ([0.0, 0.0, -1.0], [-1.0, 0.0, 0.0], [0.0, 1.0, 0.0]),
    ];
    let mut vertices = Vec::with_capacity(24);
    let mut indices = Vec::with_capacity(36);
    for (n, u, v) in FACES {
        let base = vertices.len() as u32;
        for (su, sv) in [(-0.5, -0.5), (0.5, -0.5), (0.5, 0.5), (-0.5, 0.5)] {
            let position = [0, 1, 2].map(|i| n[i] * 0.5 + u[i] * su + v[i] * sv);
            vertices.push(ModelVertex {
                position,
                tex_coords: [su + 0.5, 0.5 - sv],
                normal: n,
                tangent: u,
                bitangent: v,
            });
        }
        indices.extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
    }
    (vertices, indices)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cube_faces_wind_outwards() {
        let (vertices, indices) = marker_cube();
        assert_eq!(vertices.len(), 24);
        assert_eq!(indices.len(), 36);
        for tri in indices.chunks(3) {
            let [a, b, c] = [0, 1, 2].map(|i| cgmath::Vector3::from(vertices[tri[i] as usize].position));
            let face_normal = (b - a).cross(c - a);
            let n = cgmath::Vector3::from(vertices[tri[0] as usize].normal);
            assert!(cgmath::InnerSpace::dot(face_normal, n) > 0.0);
        }
    }
}
