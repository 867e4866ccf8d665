//! Editor overlay geometry: the ground grid, axis gizmos and point light markers.
//!
//! Everything here is rebuilt from the registry on demand and drawn after the
//! lit scene through [`FrameEncoder::draw_lines`](crate::gpu::FrameEncoder::draw_lines)
//! and [`FrameEncoder::draw_light_markers`](crate::gpu::FrameEncoder::draw_light_markers).

use cgmath::Vector3;

use crate::data_structures::{
    components::{LightComponent, LightKind},
    model::Vertex,
    registry::Registry,
    transform::world_position,
};

/// Edge length of a light marker cube relative to the unit cube.
pub const MARKER_SCALE: f32 = 0.2;

const AXIS_X: [f32; 3] = [1.0, 0.0, 0.0];
const AXIS_Y: [f32; 3] = [0.0, 0.0, 1.0];
const AXIS_Z: [f32; 3] = [0.0, 1.0, 0.0];

#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct LineVertex {
    pub position: [f32; 3],
    pub colour: [f32; 3],
}

impl LineVertex {
    pub fn new(position: [f32; 3], colour: [f32; 3]) -> Self {
        Self { position, colour }
    }
}

impl Vertex for LineVertex {
    fn desc() -> wgpu::VertexBufferLayout<'static> {
        use std::mem;
        wgpu::VertexBufferLayout {
            array_stride: mem::size_of::<LineVertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &[
                wgpu::VertexAttribute {
                    offset: 0,
                    shader_location: 0,
                    format: wgpu::VertexFormat::Float32x3,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 3]>() as wgpu::BufferAddress,
                    shader_location: 1,
                    format: wgpu::VertexFormat::Float32x3,
                },
            ],
        }
    }
}

/// Per-instance data of one light marker cube.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct MarkerInstance {
    pub model: [[f32; 4]; 4],
    pub colour: [f32; 3],
    pub _padding: f32,
}

impl Vertex for MarkerInstance {
    fn desc() -> wgpu::VertexBufferLayout<'static> {
        use std::mem;
        wgpu::VertexBufferLayout {
            array_stride: mem::size_of::<MarkerInstance>() as wgpu::BufferAddress,
            // one marker per instance, the cube itself comes from the vertex buffer
            step_mode: wgpu::VertexStepMode::Instance,
            attributes: &[
                // a mat4 takes four vec4 slots
                wgpu::VertexAttribute {
                    offset: 0,
                    shader_location: 5,
                    format: wgpu::VertexFormat::Float32x4,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 4]>() as wgpu::BufferAddress,
                    shader_location: 6,
                    format: wgpu::VertexFormat::Float32x4,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 8]>() as wgpu::BufferAddress,
                    shader_location: 7,
                    format: wgpu::VertexFormat::Float32x4,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 12]>() as wgpu::BufferAddress,
                    shader_location: 8,
                    format: wgpu::VertexFormat::Float32x4,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 16]>() as wgpu::BufferAddress,
                    shader_location: 9,
                    format: wgpu::VertexFormat::Float32x3,
                },
            ],
        }
    }
}

/// Lines of the ground grid on the XZ plane, one every unit from
/// `-half_extent` to `half_extent` in both directions.
pub fn grid_lines(half_extent: i32, colour: [f32; 3]) -> Vec<LineVertex> {
    let half_extent = half_extent.max(0);
    let extent = half_extent as f32;
    let mut vertices = Vec::with_capacity((2 * half_extent as usize + 1) * 4);
    for i in -half_extent..=half_extent {
        let offset = i as f32;
        vertices.push(LineVertex::new([-extent, 0.0, offset], colour));
        vertices.push(LineVertex::new([extent, 0.0, offset], colour));
        vertices.push(LineVertex::new([offset, 0.0, -extent], colour));
        vertices.push(LineVertex::new([offset, 0.0, extent], colour));
    }
    vertices
}

/// Three unit-length axis lines starting at `origin`.
pub fn axis_gizmo(origin: Vector3<f32>, length: f32) -> Vec<LineVertex> {
    let o: [f32; 3] = origin.into();
    let end = |axis: Vector3<f32>| -> [f32; 3] { (origin + axis * length).into() };
    vec![
        LineVertex::new(o, AXIS_X),
        LineVertex::new(end(Vector3::unit_x()), AXIS_X),
        LineVertex::new(o, AXIS_Y),
        LineVertex::new(end(Vector3::unit_y()), AXIS_Y),
        LineVertex::new(o, AXIS_Z),
        LineVertex::new(end(Vector3::unit_z()), AXIS_Z),
    ]
}

/// A small cube at the world position of every point light, tinted with its diffuse colour.
pub fn light_markers(registry: &Registry) -> Vec<MarkerInstance> {
    registry
        .view::<LightComponent>()
        .filter(|(_, light)| light.kind == LightKind::Point)
        .map(|(entity, light)| {
            let model = cgmath::Matrix4::from_translation(world_position(registry, entity))
                * cgmath::Matrix4::from_scale(MARKER_SCALE);
            MarkerInstance {
                model: model.into(),
                colour: light.diffuse.into(),
                _padding: 0.0,
            }
        })
        .collect()
}
