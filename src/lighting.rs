//! Gathers the light entities of a scene into the shader's lighting block.

use cgmath::{Deg, InnerSpace, Rad, Vector3};

use crate::data_structures::{
    components::{LightComponent, LightKind},
    registry::{Entity, Registry},
    transform::{world_rotation, world_transform, FORWARD},
};

/// Records per light kind the shader has room for.
pub const MAX_LIGHTS_PER_KIND: usize = 16;

/// Light entities by kind, each list in registry order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CollectedLights {
    pub directional: Vec<Entity>,
    pub point: Vec<Entity>,
    pub spot: Vec<Entity>,
}

impl CollectedLights {
    pub fn counts(&self) -> (usize, usize, usize) {
        (self.directional.len(), self.point.len(), self.spot.len())
    }
}

pub fn collect_lights(registry: &Registry) -> CollectedLights {
    let mut lights = CollectedLights::default();
    for (entity, light) in registry.view::<LightComponent>() {
        match light.kind {
            LightKind::Directional => lights.directional.push(entity),
            LightKind::Point => lights.point.push(entity),
            LightKind::Spot => lights.spot.push(entity),
        }
    }
    lights
}

#[repr(C)]
#[derive(Debug, Copy, Clone, Default, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct DirLightRaw {
    pub direction: [f32; 3],
    pub _padding0: f32,
    pub ambient: [f32; 3],
    pub _padding1: f32,
    pub diffuse: [f32; 3],
    pub _padding2: f32,
    pub specular: [f32; 3],
    pub _padding3: f32,
}

/// Attenuation terms ride in the fourth lane of each vec3.
#[repr(C)]
#[derive(Debug, Copy, Clone, Default, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct PointLightRaw {
    pub position: [f32; 3],
    pub constant: f32,
    pub ambient: [f32; 3],
    pub linear: f32,
    pub diffuse: [f32; 3],
    pub quadratic: f32,
    pub specular: [f32; 3],
    pub _padding: f32,
}

#[repr(C)]
#[derive(Debug, Copy, Clone, Default, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct SpotLightRaw {
    pub position: [f32; 3],
    pub constant: f32,
    pub direction: [f32; 3],
    pub linear: f32,
    pub ambient: [f32; 3],
    pub quadratic: f32,
    pub diffuse: [f32; 3],
    /// Cosine of the inner cone angle.
    pub cut_off: f32,
    pub specular: [f32; 3],
    pub outer_cut_off: f32,
}

/// The lighting uniform block. Counts come first, then the fixed-size arrays.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct LightingUniform {
    pub number_of_dir_lights: u32,
    pub number_of_point_lights: u32,
    pub number_of_spot_lights: u32,
    pub _padding: u32,
    pub dir_lights: [DirLightRaw; MAX_LIGHTS_PER_KIND],
    pub point_lights: [PointLightRaw; MAX_LIGHTS_PER_KIND],
    pub spot_lights: [SpotLightRaw; MAX_LIGHTS_PER_KIND],
}

impl Default for LightingUniform {
    fn default() -> Self {
        bytemuck::Zeroable::zeroed()
    }
}

fn clamped<'a>(kind: &str, entities: &'a [Entity]) -> &'a [Entity] {
    if entities.len() > MAX_LIGHTS_PER_KIND {
        log::warn!(
            "{} {} lights in the scene, only the first {} are used",
            entities.len(),
            kind,
            MAX_LIGHTS_PER_KIND
        );
        &entities[..MAX_LIGHTS_PER_KIND]
    } else {
        entities
    }
}

fn cos_deg(degrees: f32) -> f32 {
    Rad::from(Deg(degrees)).0.cos()
}

impl LightingUniform {
    pub fn pack(registry: &Registry, lights: &CollectedLights) -> Self {
        let mut uniform = Self::default();

        let directional = clamped("directional", &lights.directional);
        let point = clamped("point", &lights.point);
        let spot = clamped("spot", &lights.spot);
        uniform.number_of_dir_lights = directional.len() as u32;
        uniform.number_of_point_lights = point.len() as u32;
        uniform.number_of_spot_lights = spot.len() as u32;

        for (raw, &entity) in uniform.dir_lights.iter_mut().zip(directional) {
            let Some(light) = registry.get::<LightComponent>(entity) else {
                continue;
            };
            *raw = DirLightRaw {
                // TODO: derive a direction vector from the rotation instead of passing the angles
                direction: dir_light_direction(world_rotation(registry, entity)).into(),
                ambient: light.ambient.into(),
                diffuse: light.diffuse.into(),
                specular: light.specular.into(),
                ..Default::default()
            };
        }

        for (raw, &entity) in uniform.point_lights.iter_mut().zip(point) {
            let Some(light) = registry.get::<LightComponent>(entity) else {
                continue;
            };
            let world = world_transform(registry, entity);
            *raw = PointLightRaw {
                position: world.position.into(),
                constant: light.constant,
                ambient: light.ambient.into(),
                linear: light.linear,
                diffuse: light.diffuse.into(),
                quadratic: light.quadratic,
                specular: light.specular.into(),
                _padding: 0.0,
            };
        }

        for (raw, &entity) in uniform.spot_lights.iter_mut().zip(spot) {
            let Some(light) = registry.get::<LightComponent>(entity) else {
                continue;
            };
            let world = world_transform(registry, entity);
            *raw = SpotLightRaw {
                position: world.position.into(),
                constant: light.constant,
                direction: world.forward().into(),
                linear: light.linear,
                ambient: light.ambient.into(),
                quadratic: light.quadratic,
                diffuse: light.diffuse.into(),
                cut_off: cos_deg(light.cut_off),
                specular: light.specular.into(),
                outer_cut_off: cos_deg(light.outer_cut_off),
            };
        }

        uniform
    }

    pub fn from_registry(registry: &Registry) -> Self {
        Self::pack(registry, &collect_lights(registry))
    }
}

/// An unrotated directional light would upload a zero vector, which the
/// shader cannot normalise. It shines along [`FORWARD`] instead.
fn dir_light_direction(rotation: Vector3<f32>) -> Vector3<f32> {
    if rotation.magnitude2() < 1e-12 {
        FORWARD
    } else {
        rotation
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use cgmath::Vector3;

    use super::*;
    use crate::data_structures::components::TransformComponent;

    fn light(registry: &mut Registry, light: LightComponent, position: [f32; 3]) -> Entity {
        let e = registry.create();
        registry.insert(e, TransformComponent::from_position(position.into()));
        registry.insert(e, light);
        e
    }

    #[test]
    fn lights_are_partitioned_in_insertion_order() {
        let mut registry = Registry::new();
        let p0 = light(&mut registry, LightComponent::point(1.0, 0.1, 0.01), [1.0, 0.0, 0.0]);
        let d0 = light(&mut registry, LightComponent::directional(), [0.0; 3]);
        let p1 = light(&mut registry, LightComponent::point(1.0, 0.2, 0.02), [2.0, 0.0, 0.0]);
        let d1 = light(&mut registry, LightComponent::directional(), [0.0; 3]);
        let p2 = light(&mut registry, LightComponent::point(1.0, 0.3, 0.03), [3.0, 0.0, 0.0]);
        registry.create();

        let lights = collect_lights(&registry);
        assert_eq!(lights.counts(), (2, 3, 0));
        assert_eq!(lights.directional, vec![d0, d1]);
        assert_eq!(lights.point, vec![p0, p1, p2]);

        let uniform = LightingUniform::pack(&registry, &lights);
        assert_eq!(
            (
                uniform.number_of_dir_lights,
                uniform.number_of_point_lights,
                uniform.number_of_spot_lights
            ),
            (2, 3, 0)
        );
        assert_eq!(uniform.point_lights[1].position, [2.0, 0.0, 0.0]);
        assert_eq!(uniform.point_lights[2].linear, 0.3);
        assert_eq!(uniform.point_lights[3], PointLightRaw::default());
    }

    #[test]
    fn spot_lights_point_forward_with_cosine_cutoffs() {
        let mut registry = Registry::new();
        let spot = light(&mut registry, LightComponent::spot(60.0, 90.0), [0.0, 1.0, 0.0]);
        registry.get_mut::<TransformComponent>(spot).unwrap().rotation = Vector3::new(0.0, 180.0, 0.0);

        let uniform = LightingUniform::from_registry(&registry);
        let raw = uniform.spot_lights[0];
        assert_eq!(uniform.number_of_spot_lights, 1);
        assert_relative_eq!(raw.cut_off, 0.5, epsilon = 1e-6);
        assert_relative_eq!(raw.outer_cut_off, 0.0, epsilon = 1e-6);
        assert_relative_eq!(raw.direction[2], 1.0, epsilon = 1e-5);
        assert_eq!(raw.position, [0.0, 1.0, 0.0]);
    }

    #[test]
    fn unrotated_directional_light_shines_forward() {
        let mut registry = Registry::new();
        light(&mut registry, LightComponent::directional(), [0.0; 3]);
        let tilted = light(&mut registry, LightComponent::directional(), [0.0; 3]);
        registry.get_mut::<TransformComponent>(tilted).unwrap().rotation =
            Vector3::new(-45.0, 0.0, 0.0);

        let uniform = LightingUniform::from_registry(&registry);

        assert_eq!(uniform.dir_lights[0].direction, [0.0, 0.0, -1.0]);
        assert_eq!(uniform.dir_lights[1].direction, [-45.0, 0.0, 0.0]);
    }

    #[test]
    fn counts_are_clamped() {
        let mut registry = Registry::new();
        for i in 0..MAX_LIGHTS_PER_KIND + 3 {
            light(&mut registry, LightComponent::point(1.0, 0.0, 0.0), [i as f32, 0.0, 0.0]);
        }
        let uniform = LightingUniform::from_registry(&registry);
        assert_eq!(uniform.number_of_point_lights as usize, MAX_LIGHTS_PER_KIND);
        assert_eq!(uniform.point_lights[15].position, [15.0, 0.0, 0.0]);
    }

    #[test]
    fn block_layout_matches_the_shader() {
        assert_eq!(std::mem::size_of::<DirLightRaw>(), 64);
        assert_eq!(std::mem::size_of::<PointLightRaw>(), 64);
        assert_eq!(std::mem::size_of::<SpotLightRaw>(), 80);
        assert_eq!(std::mem::size_of::<LightingUniform>(), 16 + 16 * (64 + 64 + 80));
    }
}
