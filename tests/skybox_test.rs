use approx::assert_relative_eq;
use cgmath::{Deg, Matrix4, Vector4};
use forward_ngin::{
    camera::{Camera, Projection},
    error::NginError,
    render::FrameRenderer,
    resources::{FallbackTextures, Skybox},
    scene::Scene,
};

use crate::common::test_utils::{
    test_config, write_skybox, write_triangle, Call, RecordingDevice, RecordingFrame, ScratchDir,
};

mod common;

fn sky_matrix(frame: &RecordingFrame) -> [[f32; 4]; 4] {
    let skies: Vec<_> = frame
        .calls
        .iter()
        .filter_map(|c| match c {
            Call::Skybox { inv_view_proj, .. } => Some(*inv_view_proj),
            _ => None,
        })
        .collect();
    assert_eq!(skies.len(), 1);
    skies[0]
}

#[test]
fn six_faces_become_one_cube_map() {
    let dir = ScratchDir::new("sky-load");
    let faces = write_skybox(&dir, 8);
    let mut device = RecordingDevice::new();

    let skybox = Skybox::load(&mut device, &faces).unwrap();

    assert_eq!(skybox.face_size, 8);
    assert_eq!(device.cubes, vec![("skybox".to_string(), 8)]);
    // cube maps do not take slots in the 2D arena
    assert!(device.textures.is_empty());
}

#[test]
fn missing_or_uneven_faces_are_rejected() {
    let dir = ScratchDir::new("sky-broken");
    let mut faces = write_skybox(&dir, 8);
    let mut device = RecordingDevice::new();

    faces[3] = dir.path().join("nowhere.png");
    let err = Skybox::load(&mut device, &faces).unwrap_err();
    assert!(matches!(
        err,
        NginError::TextureDecode { ref label, .. } if label.contains("nowhere.png")
    ));

    faces[3] = dir.write_png("wide.png", 16, 8, [0, 0, 0, 255]);
    assert!(Skybox::load(&mut device, &faces).is_err());
    assert!(device.cubes.is_empty());
}

#[test]
fn sky_is_drawn_before_meshes_and_ignores_camera_position() {
    let dir = ScratchDir::new("sky-render");
    let obj = write_triangle(&dir);
    let faces = write_skybox(&dir, 4);
    let config = test_config();
    let mut device = RecordingDevice::new();
    let mut scene = Scene::new();
    scene.load_model(&mut device, &obj, None).unwrap();
    let fallbacks = FallbackTextures::load(&mut device, &config).unwrap();
    let skybox = Skybox::load(&mut device, &faces).unwrap();
    let renderer = FrameRenderer::new(fallbacks, &config).with_skybox(skybox);
    let projection = Projection::new(800, 600, Deg(config.fov_degrees), config.near, config.far);

    let near = Camera::new([0.0, 2.0, 8.0], Deg(-90.0), Deg(0.0));
    let mut first = RecordingFrame::new();
    let stats = renderer.render(&scene.registry, &near, &projection, &mut first);

    assert_eq!(stats.draws, 1);
    assert_eq!(first.calls[0], Call::SetLighting);
    let Call::Skybox { cube, .. } = &first.calls[1] else {
        panic!("expected the skybox second, got {:?}", first.calls[1]);
    };
    assert_eq!(*cube, skybox.handle);
    let draw_index = first
        .calls
        .iter()
        .position(|c| matches!(c, Call::Draw { .. }))
        .unwrap();
    assert!(draw_index > 1);

    let far = Camera::new([-30.0, 5.0, 40.0], Deg(-90.0), Deg(0.0));
    let mut moved = RecordingFrame::new();
    renderer.render(&scene.registry, &far, &projection, &mut moved);
    let (a, b) = (sky_matrix(&first), sky_matrix(&moved));
    for (row_a, row_b) in a.iter().zip(&b) {
        for (x, y) in row_a.iter().zip(row_b) {
            assert_relative_eq!(*x, *y, epsilon = 1e-5);
        }
    }

    // the inverse maps the far plane centre straight down the view direction
    let centre = Matrix4::from(a) * Vector4::new(0.0, 0.0, 1.0, 1.0);
    let direction = centre.truncate() / centre.w;
    assert!(direction.z < 0.0);
    assert_relative_eq!(direction.x, 0.0, epsilon = 1e-3);
    assert_relative_eq!(direction.y, 0.0, epsilon = 1e-3);

    let turned = Camera::new([0.0, 2.0, 8.0], Deg(0.0), Deg(0.0));
    let mut rotated = RecordingFrame::new();
    renderer.render(&scene.registry, &turned, &projection, &mut rotated);
    assert_ne!(sky_matrix(&rotated), a);
}

#[test]
fn no_skybox_no_sky_call() {
    let config = test_config();
    let mut device = RecordingDevice::new();
    let fallbacks = FallbackTextures::load(&mut device, &config).unwrap();
    let renderer = FrameRenderer::new(fallbacks, &config);
    let camera = Camera::new(config.camera_position, Deg(-90.0), Deg(0.0));
    let projection = Projection::new(800, 600, Deg(config.fov_degrees), config.near, config.far);
    let mut frame = RecordingFrame::new();

    renderer.render(&Scene::new().registry, &camera, &projection, &mut frame);

    assert!(renderer.skybox().is_none());
    assert_eq!(frame.calls, vec![Call::SetLighting]);
}

#[test]
fn bundled_skybox_loads() {
    let config = test_config();
    let mut device = RecordingDevice::new();

    let faces = config.skybox_paths().unwrap();
    let skybox = Skybox::load(&mut device, &faces).unwrap();

    assert!(skybox.face_size > 0);
    assert_eq!(device.cubes.len(), 1);
}
