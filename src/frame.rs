//! The wgpu [`FrameEncoder`].
//!
//! A wgpu render pass borrows every buffer and bind group it touches for its
//! whole lifetime, so the frame is recorded into a command list first and
//! replayed into a single pass by [`WgpuFrame::finish`]. Uniform blocks, line
//! vertices and marker instances are collected on the way and uploaded in
//! one write each before the pass begins. The skybox is drawn in the order it
//! was recorded, so it belongs before the meshes.

use std::{iter, ops::Range};

use crate::{
    context::Context,
    data_structures::texture::Texture,
    error::NginError,
    gpu::{DrawUniforms, FrameEncoder, MeshBuffers, ShaderHandle, TextureHandle},
    lighting::LightingUniform,
    overlay::{LineVertex, MarkerInstance},
    render::{DIFFUSE_UNIT, SPECULAR_UNIT, TEXTURE_UNITS},
};

#[derive(Debug)]
enum Command {
    Mesh {
        uniform_index: u32,
        diffuse: TextureHandle,
        specular: TextureHandle,
        mesh: MeshBuffers,
        index_count: u32,
    },
    Lines(Range<u32>),
    Markers(Range<u32>),
    Skybox(TextureHandle),
}

/// One frame in flight. Call [`WgpuFrame::finish`] to submit and present it;
/// dropping it discards everything recorded.
pub struct WgpuFrame<'a> {
    ctx: &'a mut Context,
    output: wgpu::SurfaceTexture,
    view: wgpu::TextureView,
    shader: ShaderHandle,
    bound: [Option<TextureHandle>; TEXTURE_UNITS as usize],
    lighting: LightingUniform,
    uniforms: Vec<DrawUniforms>,
    current_uniforms: Option<u32>,
    line_vertices: Vec<LineVertex>,
    markers: Vec<MarkerInstance>,
    view_proj: [[f32; 4]; 4],
    sky_inv_view_proj: [[f32; 4]; 4],
    commands: Vec<Command>,
}

impl<'a> WgpuFrame<'a> {
    pub(crate) fn new(ctx: &'a mut Context, output: wgpu::SurfaceTexture) -> Self {
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        Self {
            ctx,
            output,
            view,
            shader: ShaderHandle::PHONG,
            bound: [None; TEXTURE_UNITS as usize],
            lighting: LightingUniform::default(),
            uniforms: Vec::new(),
            current_uniforms: None,
            line_vertices: Vec::new(),
            markers: Vec::new(),
            view_proj: cgmath::Matrix4::<f32>::from_scale(1.0).into(),
            sky_inv_view_proj: cgmath::Matrix4::<f32>::from_scale(1.0).into(),
            commands: Vec::new(),
        }
    }

    /// Number of indexed draws recorded so far.
    pub fn mesh_draws(&self) -> usize {
        self.commands
            .iter()
            .filter(|c| matches!(c, Command::Mesh { .. }))
            .count()
    }

    /// Upload the frame's data, replay the recorded commands into one render
    /// pass, submit and present.
    pub fn finish(self) {
        let WgpuFrame {
            ctx,
            output,
            view,
            lighting,
            uniforms,
            line_vertices,
            markers,
            view_proj,
            sky_inv_view_proj,
            mut commands,
            ..
        } = self;

        ctx.lighting.write(&ctx.queue, &lighting);
        ctx.overlay.write(&ctx.queue, view_proj);
        ctx.skybox.write(&ctx.queue, sky_inv_view_proj);
        if !uniforms.is_empty() {
            ctx.draw_uniforms
                .reserve(&ctx.device, &ctx.pipelines.layouts.draw, uniforms.len() as u64);
            let bytes = ctx.draw_uniforms.pack(&uniforms);
            ctx.queue.write_buffer(&ctx.draw_uniforms.buffer, 0, &bytes);
        }

        commands.retain(|command| match command {
            Command::Mesh {
                diffuse, specular, ..
            } => match ctx.ensure_material_group(*diffuse, *specular) {
                Ok(()) => true,
                Err(e) => {
                    log::error!("dropping draw: {:#}", e);
                    false
                }
            },
            Command::Skybox(cube) => match ctx.ensure_skybox_group(*cube) {
                Ok(()) => true,
                Err(e) => {
                    log::error!("dropping skybox: {:#}", e);
                    false
                }
            },
            _ => true,
        });

        ctx.line_vertices
            .write(&ctx.device, &ctx.queue, bytemuck::cast_slice(&line_vertices));
        ctx.marker_instances
            .write(&ctx.device, &ctx.queue, bytemuck::cast_slice(&markers));

        let ctx: &Context = ctx;

        let mut encoder = ctx
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Render Encoder"),
            });
        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Render Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(ctx.clear_colour),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &ctx.depth_texture.view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                occlusion_query_set: None,
                timestamp_writes: None,
            });

            for command in &commands {
                match command {
                    Command::Mesh {
                        uniform_index,
                        diffuse,
                        specular,
                        mesh,
                        index_count,
                    } => {
                        let (Some(vertices), Some(indices), Some(material)) = (
                            ctx.buffer(mesh.vertex),
                            ctx.buffer(mesh.index),
                            ctx.material_groups.get(&(*diffuse, *specular)),
                        ) else {
                            continue;
                        };
                        let offset = *uniform_index * ctx.draw_uniforms.stride as u32;
                        pass.set_pipeline(&ctx.pipelines.phong);
                        pass.set_bind_group(0, &ctx.draw_uniforms.bind_group, &[offset]);
                        pass.set_bind_group(1, &ctx.lighting.bind_group, &[]);
                        pass.set_bind_group(2, material, &[]);
                        pass.set_vertex_buffer(0, vertices.slice(..));
                        pass.set_index_buffer(indices.slice(..), wgpu::IndexFormat::Uint32);
                        pass.draw_indexed(0..*index_count, 0, 0..1);
                    }
                    Command::Lines(range) => {
                        pass.set_pipeline(&ctx.pipelines.lines);
                        pass.set_bind_group(0, &ctx.overlay.bind_group, &[]);
                        pass.set_vertex_buffer(0, ctx.line_vertices.buffer.slice(..));
                        pass.draw(range.clone(), 0..1);
                    }
                    Command::Markers(range) => {
                        let (cube, cube_indices) = ctx.marker_cube;
                        let (Some(vertices), Some(indices)) =
                            (ctx.buffer(cube.vertex), ctx.buffer(cube.index))
                        else {
                            continue;
                        };
                        pass.set_pipeline(&ctx.pipelines.markers);
                        pass.set_bind_group(0, &ctx.overlay.bind_group, &[]);
                        pass.set_vertex_buffer(0, vertices.slice(..));
                        pass.set_vertex_buffer(1, ctx.marker_instances.buffer.slice(..));
                        pass.set_index_buffer(indices.slice(..), wgpu::IndexFormat::Uint32);
                        pass.draw_indexed(0..cube_indices, 0, range.clone());
                    }
                    Command::Skybox(cube) => {
                        let Some(texture_group) = ctx.skybox_groups.get(cube) else {
                            continue;
                        };
                        pass.set_pipeline(&ctx.pipelines.skybox);
                        pass.set_bind_group(0, &ctx.skybox.bind_group, &[]);
                        pass.set_bind_group(1, texture_group, &[]);
                        pass.draw(0..3, 0..1);
                    }
                }
            }
        }

        ctx.queue.submit(iter::once(encoder.finish()));
        output.present();
    }

    fn bound_unit(&self, unit: u32) -> Result<TextureHandle, NginError> {
        self.bound[unit as usize].ok_or_else(|| NginError::RenderBinding {
            unit,
            reason: "nothing bound".to_string(),
        })
    }
}

impl FrameEncoder for WgpuFrame<'_> {
    fn use_shader(&mut self, shader: ShaderHandle) {
        self.shader = shader;
    }

    fn set_lighting(&mut self, lighting: &LightingUniform) {
        self.lighting = *lighting;
    }

    fn bind_texture(&mut self, unit: u32, texture: &Texture) -> Result<(), NginError> {
        if unit >= TEXTURE_UNITS {
            return Err(NginError::RenderBinding {
                unit,
                reason: format!("only {} units exist", TEXTURE_UNITS),
            });
        }
        if !texture.is_valid() || self.ctx.texture(texture.handle).is_none() {
            return Err(NginError::RenderBinding {
                unit,
                reason: format!("{:?} is not an uploaded texture", texture.path),
            });
        }
        self.bound[unit as usize] = Some(texture.handle);
        Ok(())
    }

    fn unbind_texture(&mut self, unit: u32) {
        if let Some(slot) = self.bound.get_mut(unit as usize) {
            *slot = None;
        }
    }

    fn set_draw_uniforms(&mut self, uniforms: &DrawUniforms) {
        self.uniforms.push(*uniforms);
        self.current_uniforms = Some((self.uniforms.len() - 1) as u32);
    }

    fn draw_indexed(&mut self, mesh: &MeshBuffers, index_count: u32) -> Result<(), NginError> {
        if self.shader != ShaderHandle::PHONG {
            return Err(NginError::RenderBinding {
                unit: DIFFUSE_UNIT,
                reason: format!("no pipeline for {:?}", self.shader),
            });
        }
        let diffuse = self.bound_unit(DIFFUSE_UNIT)?;
        let specular = self.bound_unit(SPECULAR_UNIT)?;
        let Some(uniform_index) = self.current_uniforms.take() else {
            return Err(NginError::RenderBinding {
                unit: DIFFUSE_UNIT,
                reason: "draw uniforms were not set".to_string(),
            });
        };
        if self.ctx.buffer(mesh.vertex).is_none() || self.ctx.buffer(mesh.index).is_none() {
            return Err(NginError::RenderBinding {
                unit: DIFFUSE_UNIT,
                reason: format!("{:?} is not an uploaded mesh", mesh),
            });
        }
        self.commands.push(Command::Mesh {
            uniform_index,
            diffuse,
            specular,
            mesh: *mesh,
            index_count,
        });
        Ok(())
    }

    fn draw_lines(&mut self, view_proj: [[f32; 4]; 4], vertices: &[LineVertex]) {
        if vertices.is_empty() {
            return;
        }
        self.view_proj = view_proj;
        let start = self.line_vertices.len() as u32;
        self.line_vertices.extend_from_slice(vertices);
        self.commands
            .push(Command::Lines(start..self.line_vertices.len() as u32));
    }

    fn draw_light_markers(&mut self, view_proj: [[f32; 4]; 4], markers: &[MarkerInstance]) {
        if markers.is_empty() {
            return;
        }
        self.view_proj = view_proj;
        let start = self.markers.len() as u32;
        self.markers.extend_from_slice(markers);
        self.commands
            .push(Command::Markers(start..self.markers.len() as u32));
    }

    fn draw_skybox(
        &mut self,
        inv_view_proj: [[f32; 4]; 4],
        cube: TextureHandle,
    ) -> Result<(), NginError> {
        if self.ctx.cube_texture(cube).is_none() {
            return Err(NginError::RenderBinding {
                unit: 0,
                reason: format!("{:?} is not an uploaded cube map", cube),
            });
        }
        self.sky_inv_view_proj = inv_view_proj;
        self.commands.push(Command::Skybox(cube));
        Ok(())
    }
}
