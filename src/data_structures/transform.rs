//! World-space transform resolution.
//!
//! A [`TransformComponent`] stores values relative to the transform it
//! references. Resolving an entity walks that reference chain through the
//! registry: positions and Euler rotations add up, scales multiply.

use cgmath::{Deg, ElementWise, InnerSpace, Matrix3, Matrix4, Quaternion, Rad, Vector3};

use crate::data_structures::{
    components::TransformComponent,
    registry::{Entity, Registry},
};

/// Forward direction of an unrotated entity.
pub const FORWARD: Vector3<f32> = Vector3::new(0.0, 0.0, -1.0);

/// Iterates an entity's transform and then each referenced ancestor.
///
/// Ends at a transform without a reference or at an ancestor that has no
/// transform. Never yields more items than the registry has entities.
pub struct TransformChain<'a> {
    registry: &'a Registry,
    next: Option<Entity>,
    remaining: usize,
}

impl<'a> TransformChain<'a> {
    pub fn new(registry: &'a Registry, entity: Entity) -> Self {
        Self {
            registry,
            next: Some(entity),
            remaining: registry.len(),
        }
    }
}

impl<'a> Iterator for TransformChain<'a> {
    type Item = &'a TransformComponent;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            if self.next.is_some() {
                log::error!("transform chain is longer than the registry, stopping the walk");
                self.next = None;
            }
            return None;
        }
        let transform = self.registry.get::<TransformComponent>(self.next?)?;
        self.remaining -= 1;
        self.next = transform.reference();
        Some(transform)
    }
}

pub fn world_position(registry: &Registry, entity: Entity) -> Vector3<f32> {
    TransformChain::new(registry, entity).fold(Vector3::new(0.0, 0.0, 0.0), |acc, t| acc + t.position)
}

/// Sum of the Euler angles (degrees) along the chain.
pub fn world_rotation(registry: &Registry, entity: Entity) -> Vector3<f32> {
    TransformChain::new(registry, entity).fold(Vector3::new(0.0, 0.0, 0.0), |acc, t| acc + t.rotation)
}

pub fn world_scale(registry: &Registry, entity: Entity) -> Vector3<f32> {
    TransformChain::new(registry, entity)
        .fold(Vector3::new(1.0, 1.0, 1.0), |acc, t| acc.mul_element_wise(t.scale))
}

/// Resolved world values of an entity.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct WorldTransform {
    pub position: Vector3<f32>,
    pub rotation: Vector3<f32>,
    pub scale: Vector3<f32>,
}

impl Default for WorldTransform {
    fn default() -> Self {
        Self {
            position: Vector3::new(0.0, 0.0, 0.0),
            rotation: Vector3::new(0.0, 0.0, 0.0),
            scale: Vector3::new(1.0, 1.0, 1.0),
        }
    }
}

impl WorldTransform {
    pub fn rotation_matrix(&self) -> Matrix3<f32> {
        Matrix3::from_angle_x(Deg(self.rotation.x))
            * Matrix3::from_angle_y(Deg(self.rotation.y))
            * Matrix3::from_angle_z(Deg(self.rotation.z))
    }

    /// `translate * rotateX * rotateY * rotateZ * scale`
    pub fn to_matrix(&self) -> Matrix4<f32> {
        Matrix4::from_translation(self.position)
            * Matrix4::from(self.rotation_matrix())
            * Matrix4::from_nonuniform_scale(self.scale.x, self.scale.y, self.scale.z)
    }

    /// [`FORWARD`] rotated into world space.
    pub fn forward(&self) -> Vector3<f32> {
        (self.rotation_matrix() * FORWARD).normalize()
    }
}

/// All three reductions in a single walk.
pub fn world_transform(registry: &Registry, entity: Entity) -> WorldTransform {
    TransformChain::new(registry, entity).fold(WorldTransform::default(), |acc, t| WorldTransform {
        position: acc.position + t.position,
        rotation: acc.rotation + t.rotation,
        scale: acc.scale.mul_element_wise(t.scale),
    })
}

pub fn model_matrix(world: &WorldTransform) -> Matrix4<f32> {
    world.to_matrix()
}

/// XYZ Euler angles in degrees such that
/// `rotateX(x) * rotateY(y) * rotateZ(z)` equals the rotation of `q`.
pub fn euler_xyz_from_quaternion(q: Quaternion<f32>) -> Vector3<f32> {
    let m = Matrix3::from(q.normalize());
    // m.c.r is column c, row r
    let sin_y = m.z.x.clamp(-1.0, 1.0);
    let (x, y, z) = if sin_y.abs() < 0.999_999 {
        ((-m.z.y).atan2(m.z.z), sin_y.asin(), (-m.y.x).atan2(m.x.x))
    } else {
        // gimbal lock, x and z rotate about the same axis
        (m.y.z.atan2(m.y.y), std::f32::consts::FRAC_PI_2.copysign(sin_y), 0.0)
    };
    Vector3::new(
        Deg::from(Rad(x)).0,
        Deg::from(Rad(y)).0,
        Deg::from(Rad(z)).0,
    )
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use cgmath::{Rotation3, SquareMatrix};

    use super::*;

    fn transform(position: [f32; 3], rotation: [f32; 3], scale: [f32; 3]) -> TransformComponent {
        TransformComponent::new(position.into(), rotation.into(), scale.into())
    }

    #[test]
    fn chain_reduces_sum_sum_product() {
        let mut registry = Registry::new();
        let root = registry.create();
        let mid = registry.create();
        let leaf = registry.create();
        registry.insert(root, transform([1.0, 2.0, 3.0], [10.0, 0.0, 0.0], [2.0, 2.0, 2.0]));
        registry.insert(mid, transform([1.0, 0.0, 0.0], [0.0, 20.0, 0.0], [3.0, 1.0, 1.0]));
        registry.insert(leaf, transform([0.0, 0.0, -1.0], [0.0, 0.0, 5.0], [1.0, 0.5, 4.0]));
        registry.attach_transform_parent(mid, root).unwrap();
        registry.attach_transform_parent(leaf, mid).unwrap();

        let world = world_transform(&registry, leaf);
        assert_eq!(world.position, Vector3::new(2.0, 2.0, 2.0));
        assert_eq!(world.rotation, Vector3::new(10.0, 20.0, 5.0));
        assert_eq!(world.scale, Vector3::new(6.0, 1.0, 8.0));

        assert_eq!(world_position(&registry, leaf), world.position);
        assert_eq!(world_rotation(&registry, leaf), world.rotation);
        assert_eq!(world_scale(&registry, leaf), world.scale);
        assert_eq!(world_position(&registry, root), Vector3::new(1.0, 2.0, 3.0));
    }

    #[test]
    fn entity_without_transform_is_identity() {
        let mut registry = Registry::new();
        let bare = registry.create();
        assert_eq!(world_transform(&registry, bare), WorldTransform::default());
        assert_eq!(model_matrix(&WorldTransform::default()), Matrix4::identity());
    }

    #[test]
    fn model_matrix_translates_after_scaling() {
        let world = WorldTransform {
            position: Vector3::new(1.0, 0.0, 0.0),
            rotation: Vector3::new(0.0, 0.0, 90.0),
            scale: Vector3::new(2.0, 2.0, 2.0),
        };
        let p = model_matrix(&world) * cgmath::Vector4::new(1.0, 0.0, 0.0, 1.0);
        assert_relative_eq!(p.x, 1.0, epsilon = 1e-5);
        assert_relative_eq!(p.y, 2.0, epsilon = 1e-5);
        assert_relative_eq!(p.z, 0.0, epsilon = 1e-5);
    }

    #[test]
    fn forward_follows_yaw() {
        let world = WorldTransform {
            rotation: Vector3::new(0.0, 90.0, 0.0),
            ..Default::default()
        };
        let f = world.forward();
        assert_relative_eq!(f.x, -1.0, epsilon = 1e-5);
        assert_relative_eq!(f.z, 0.0, epsilon = 1e-5);
    }

    #[test]
    fn quaternion_decomposes_into_xyz_degrees() {
        let q = Quaternion::from_angle_x(Deg(30.0))
            * Quaternion::from_angle_y(Deg(20.0))
            * Quaternion::from_angle_z(Deg(10.0));
        let euler = euler_xyz_from_quaternion(q);
        assert_relative_eq!(euler.x, 30.0, epsilon = 1e-3);
        assert_relative_eq!(euler.y, 20.0, epsilon = 1e-3);
        assert_relative_eq!(euler.z, 10.0, epsilon = 1e-3);
    }

    #[test]
    fn gimbal_lock_still_reproduces_the_rotation() {
        let q = Quaternion::from_angle_x(Deg(25.0)) * Quaternion::from_angle_y(Deg(90.0));
        let euler = euler_xyz_from_quaternion(q);
        let world = WorldTransform {
            rotation: euler,
            ..Default::default()
        };
        let expected = Matrix3::from(q);
        let actual = world.rotation_matrix();
        for (a, b) in [(actual.x, expected.x), (actual.y, expected.y), (actual.z, expected.z)] {
            assert_relative_eq!(a.x, b.x, epsilon = 1e-4);
            assert_relative_eq!(a.y, b.y, epsilon = 1e-4);
            assert_relative_eq!(a.z, b.z, epsilon = 1e-4);
        }
    }
}
