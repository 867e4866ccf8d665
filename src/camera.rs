use cgmath::{InnerSpace, Matrix4, Point3, Rad, Vector3, perspective};

#[rustfmt::skip]
pub const OPENGL_TO_WGPU_MATRIX: Matrix4<f32> = Matrix4::new(
    1.0, 0.0, 0.0, 0.0,
    0.0, 1.0, 0.0, 0.0,
    0.0, 0.0, 0.5, 0.0,
    0.0, 0.0, 0.5, 1.0,
);

/// Fly camera described by its position and two angles.
///
/// A yaw of -90 degrees with zero pitch looks down the negative Z axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Camera {
    pub position: Point3<f32>,
    pub yaw: Rad<f32>,
    pub pitch: Rad<f32>,
}

impl Camera {
    pub fn new<V: Into<Point3<f32>>, Y: Into<Rad<f32>>, P: Into<Rad<f32>>>(
        position: V,
        yaw: Y,
        pitch: P,
    ) -> Self {
        Self {
            position: position.into(),
            yaw: yaw.into(),
            pitch: pitch.into(),
        }
    }

    pub fn forward(&self) -> Vector3<f32> {
        let (sin_pitch, cos_pitch) = self.pitch.0.sin_cos();
        let (sin_yaw, cos_yaw) = self.yaw.0.sin_cos();
        Vector3::new(cos_pitch * cos_yaw, sin_pitch, cos_pitch * sin_yaw).normalize()
    }

    pub fn calc_matrix(&self) -> Matrix4<f32> {
        Matrix4::look_to_rh(self.position, self.forward(), Vector3::unit_y())
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Projection {
    aspect: f32,
    fovy: Rad<f32>,
    znear: f32,
    zfar: f32,
}

impl Projection {
    pub fn new<F: Into<Rad<f32>>>(width: u32, height: u32, fovy: F, znear: f32, zfar: f32) -> Self {
        Self {
            aspect: width.max(1) as f32 / height.max(1) as f32,
            fovy: fovy.into(),
            znear,
            zfar,
        }
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.aspect = width.max(1) as f32 / height.max(1) as f32;
    }

    pub fn set_fovy<F: Into<Rad<f32>>>(&mut self, fovy: F) {
        self.fovy = fovy.into();
    }

    pub fn calc_matrix(&self) -> Matrix4<f32> {
        OPENGL_TO_WGPU_MATRIX * perspective(self.fovy, self.aspect, self.znear, self.zfar)
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use cgmath::{Deg, Vector4};

    use super::*;

    #[test]
    fn default_orientation_looks_down_negative_z() {
        let camera = Camera::new((0.0, 0.0, 5.0), Deg(-90.0), Deg(0.0));
        let f = camera.forward();
        assert_relative_eq!(f.z, -1.0, epsilon = 1e-6);

        let origin = camera.calc_matrix() * Vector4::new(0.0, 0.0, 0.0, 1.0);
        assert_relative_eq!(origin.z, -5.0, epsilon = 1e-5);
    }

    #[test]
    fn depth_maps_to_zero_one() {
        let projection = Projection::new(800, 600, Deg(45.0), 0.1, 100.0);
        let near = projection.calc_matrix() * Vector4::new(0.0, 0.0, -0.1, 1.0);
        let far = projection.calc_matrix() * Vector4::new(0.0, 0.0, -100.0, 1.0);
        assert_relative_eq!(near.z / near.w, 0.0, epsilon = 1e-5);
        assert_relative_eq!(far.z / far.w, 1.0, epsilon = 1e-5);
    }
}
