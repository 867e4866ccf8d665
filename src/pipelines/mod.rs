//! Render pipelines and the bind group layouts they share.
//!
//! - `basic` is the lit Blinn-Phong pipeline every imported mesh is drawn with
//! - `light` holds the lighting uniform and the point light marker pipeline
//! - `overlay` draws the editor grid and gizmo lines
//! - `skybox` fills the background from a cube map

pub mod basic;
pub mod light;
pub mod overlay;
pub mod skybox;

#[derive(Debug)]
pub struct Layouts {
    pub draw: wgpu::BindGroupLayout,
    pub lighting: wgpu::BindGroupLayout,
    pub material: wgpu::BindGroupLayout,
    pub overlay: wgpu::BindGroupLayout,
    pub skybox_uniform: wgpu::BindGroupLayout,
    pub skybox_texture: wgpu::BindGroupLayout,
}

#[derive(Debug)]
pub struct Pipelines {
    pub layouts: Layouts,
    pub phong: wgpu::RenderPipeline,
    pub lines: wgpu::RenderPipeline,
    pub markers: wgpu::RenderPipeline,
    pub skybox: wgpu::RenderPipeline,
}

impl Pipelines {
    pub fn new(device: &wgpu::Device, config: &wgpu::SurfaceConfiguration) -> Self {
        let layouts = Layouts {
            draw: basic::draw_uniform_layout(device),
            lighting: light::mk_bind_group_layout(device),
            material: basic::material_layout(device),
            overlay: overlay::mk_bind_group_layout(device),
            skybox_uniform: skybox::mk_uniform_layout(device),
            skybox_texture: skybox::mk_texture_layout(device),
        };
        let phong = basic::mk_phong_pipeline(
            device,
            config,
            &layouts.draw,
            &layouts.lighting,
            &layouts.material,
        );
        let lines = overlay::mk_line_pipeline(device, config, &layouts.overlay);
        let markers = light::mk_marker_pipeline(device, config, &layouts.overlay);
        let skybox = skybox::mk_skybox_pipeline(
            device,
            config,
            &layouts.skybox_uniform,
            &layouts.skybox_texture,
        );
        Self {
            layouts,
            phong,
            lines,
            markers,
            skybox,
        }
    }
}
