//! Per-frame traversal of the registry.
//!
//! [`FrameRenderer::render`] draws every entity that carries both a transform
//! and a mesh, in registry order, with the scene's lights applied once up
//! front and the skybox, if there is one, behind everything.
//! [`FrameRenderer::render_overlay`] adds the editor grid, the gizmo of the
//! selected entity and the point light markers on top.

use std::time::Duration;

use cgmath::{Matrix, Matrix4, SquareMatrix, Vector4};
use instant::Instant;

use crate::{
    camera::{Camera, Projection},
    config::RendererConfig,
    data_structures::{
        components::{MaterialComponent, MeshComponent, TransformComponent},
        registry::{Entity, Registry},
        texture::Texture,
        transform::{model_matrix, world_position, world_transform},
    },
    error::NginError,
    gpu::{DrawUniforms, FrameEncoder, MaterialUniform},
    lighting::LightingUniform,
    overlay::{axis_gizmo, grid_lines, light_markers, LineVertex},
    resources::{skybox::Skybox, texture::FallbackTextures},
};

/// Texture units reset after every draw.
pub const TEXTURE_UNITS: u32 = 5;
pub const DIFFUSE_UNIT: u32 = 0;
pub const SPECULAR_UNIT: u32 = 1;

/// What one call to [`FrameRenderer::render`] did.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct FrameStats {
    pub draws: usize,
    pub skipped: usize,
    pub frame_time: Duration,
}

pub struct FrameRenderer {
    fallbacks: FallbackTextures,
    grid: Vec<LineVertex>,
    skybox: Option<Skybox>,
}

impl FrameRenderer {
    pub fn new(fallbacks: FallbackTextures, config: &RendererConfig) -> Self {
        Self {
            fallbacks,
            grid: grid_lines(config.grid_half_extent, config.grid_colour),
            skybox: None,
        }
    }

    pub fn with_skybox(mut self, skybox: Skybox) -> Self {
        self.skybox = Some(skybox);
        self
    }

    pub fn fallbacks(&self) -> &FallbackTextures {
        &self.fallbacks
    }

    pub fn skybox(&self) -> Option<&Skybox> {
        self.skybox.as_ref()
    }

    pub fn render(
        &self,
        registry: &Registry,
        camera: &Camera,
        projection: &Projection,
        frame: &mut dyn FrameEncoder,
    ) -> FrameStats {
        let start = Instant::now();
        let mut stats = FrameStats::default();

        frame.set_lighting(&LightingUniform::from_registry(registry));

        let view = camera.calc_matrix();
        let projection = projection.calc_matrix();
        if let Some(skybox) = &self.skybox {
            self.render_skybox(skybox, view, projection, frame);
        }
        for (entity, mesh) in registry.view::<MeshComponent>() {
            if !registry.has::<TransformComponent>(entity) {
                continue;
            }
            match self.draw_entity(registry, entity, mesh, camera, view, projection, frame) {
                Ok(()) => stats.draws += 1,
                Err(e) => {
                    log::error!("skipping draw of {:?}: {}", entity, e);
                    stats.skipped += 1;
                }
            }
            for unit in 0..TEXTURE_UNITS {
                frame.unbind_texture(unit);
            }
        }

        stats.frame_time = start.elapsed();
        stats
    }

    fn render_skybox(
        &self,
        skybox: &Skybox,
        view: Matrix4<f32>,
        projection: Matrix4<f32>,
        frame: &mut dyn FrameEncoder,
    ) {
        // the sky stays put when the camera moves
        let mut rotation_only = view;
        rotation_only.w = Vector4::new(0.0, 0.0, 0.0, 1.0);
        let Some(inv_view_proj) = (projection * rotation_only).invert() else {
            log::debug!("singular view projection, no skybox this frame");
            return;
        };
        if let Err(e) = frame.draw_skybox(inv_view_proj.into(), skybox.handle) {
            log::error!("skipping skybox: {}", e);
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn draw_entity(
        &self,
        registry: &Registry,
        entity: Entity,
        mesh: &MeshComponent,
        camera: &Camera,
        view: Matrix4<f32>,
        projection: Matrix4<f32>,
        frame: &mut dyn FrameEncoder,
    ) -> Result<(), NginError> {
        frame.use_shader(mesh.shader);

        let material = registry.get::<MaterialComponent>(entity);
        frame.bind_texture(DIFFUSE_UNIT, self.diffuse_of(material))?;
        frame.bind_texture(SPECULAR_UNIT, self.specular_of(material))?;

        let model = model_matrix(&world_transform(registry, entity));
        let normal_mat = (view * model)
            .invert()
            .map(|m| m.transpose())
            .unwrap_or_else(|| {
                log::debug!("{:?} has a singular model matrix", entity);
                Matrix4::identity()
            });

        frame.set_draw_uniforms(&DrawUniforms {
            model: model.into(),
            view: view.into(),
            projection: projection.into(),
            normal_mat: normal_mat.into(),
            view_pos: camera.position.into(),
            _padding: 0,
            material: MaterialUniform {
                shininess: material.map_or(MaterialComponent::DEFAULT_SHININESS, |m| m.shininess),
                _padding: [0.0; 3],
            },
        });
        frame.draw_indexed(&mesh.buffers, mesh.index_count)
    }

    fn diffuse_of<'a>(&'a self, material: Option<&'a MaterialComponent>) -> &'a Texture {
        material
            .and_then(|m| m.diffuse_textures.iter().find(|t| t.is_valid()))
            .unwrap_or(&self.fallbacks.diffuse)
    }

    fn specular_of<'a>(&'a self, material: Option<&'a MaterialComponent>) -> &'a Texture {
        material
            .map(|m| &m.specular_texture)
            .filter(|t| t.is_valid())
            .unwrap_or(&self.fallbacks.specular)
    }

    /// Grid, the gizmo of `selected` and point light markers.
    pub fn render_overlay(
        &self,
        registry: &Registry,
        camera: &Camera,
        projection: &Projection,
        selected: Option<Entity>,
        frame: &mut dyn FrameEncoder,
    ) {
        let view_proj: [[f32; 4]; 4] = (projection.calc_matrix() * camera.calc_matrix()).into();

        frame.draw_lines(view_proj, &self.grid);
        if let Some(entity) = selected.filter(|e| registry.has::<TransformComponent>(*e)) {
            frame.draw_lines(view_proj, &axis_gizmo(world_position(registry, entity), 1.0));
        }
        let markers = light_markers(registry);
        if !markers.is_empty() {
            frame.draw_light_markers(view_proj, &markers);
        }
    }
}

/// Rolling average of the frame time, refreshed once per second.
#[derive(Debug)]
pub struct FrameTimer {
    last: Instant,
    frames: u32,
    accumulated: Duration,
    average_ms: f64,
}

impl FrameTimer {
    pub fn new() -> Self {
        Self {
            last: Instant::now(),
            frames: 0,
            accumulated: Duration::ZERO,
            average_ms: 0.0,
        }
    }

    /// Call once per presented frame.
    pub fn tick(&mut self) {
        let now = Instant::now();
        self.record(now - self.last);
        self.last = now;
    }

    pub fn record(&mut self, frame_time: Duration) {
        self.frames += 1;
        self.accumulated += frame_time;
        if self.accumulated >= Duration::from_secs(1) {
            self.average_ms = self.accumulated.as_secs_f64() * 1000.0 / self.frames as f64;
            log::debug!("{:.3} ms/frame", self.average_ms);
            self.frames = 0;
            self.accumulated = Duration::ZERO;
        }
    }

    pub fn average_ms(&self) -> f64 {
        self.average_ms
    }
}

impl Default for FrameTimer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn average_is_published_after_a_second() {
        let mut timer = FrameTimer::new();
        for _ in 0..3 {
            timer.record(Duration::from_millis(250));
        }
        assert_eq!(timer.average_ms(), 0.0);
        timer.record(Duration::from_millis(250));
        assert!((timer.average_ms() - 250.0).abs() < 1e-9);
    }
}
