//! Renderer configuration.
//!
//! Everything that used to be a hard-coded constant in the render loop lives
//! here: where assets are found, the fallback textures, the projection and the
//! editor grid. [`RendererConfig::default`] reproduces the built-in values and
//! a TOML file can override any subset of them.

use std::path::{Path, PathBuf};

use anyhow::Context as _;
use serde::Deserialize;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct RendererConfig {
    /// Directory that relative asset names are resolved against.
    pub asset_root: PathBuf,
    /// Fallback bound to unit 0 when a mesh has no diffuse texture.
    pub missing_diffuse: PathBuf,
    /// Fallback bound to unit 1 when a mesh has no valid specular texture.
    pub missing_specular: PathBuf,
    pub fov_degrees: f32,
    pub near: f32,
    pub far: f32,
    pub clear_colour: [f64; 4],
    pub camera_position: [f32; 3],
    /// Grid lines are drawn from `-grid_half_extent` to `grid_half_extent` on both axes.
    pub grid_half_extent: i32,
    pub grid_colour: [f32; 3],
    /// Cube map faces in right, left, top, bottom, front, back order. `None`
    /// draws the clear colour behind the scene.
    pub skybox: Option<[PathBuf; 6]>,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            asset_root: PathBuf::from("assets"),
            missing_diffuse: PathBuf::from("textures/missing_texture_diffuse.png"),
            missing_specular: PathBuf::from("textures/missing_texture_specular.png"),
            fov_degrees: 45.0,
            near: 0.1,
            far: 100.0,
            clear_colour: [0.0, 0.0, 0.0, 1.0],
            camera_position: [0.0, 2.0, 8.0],
            grid_half_extent: 250,
            grid_colour: [1.0, 0.0, 0.0],
            skybox: Some(
                crate::resources::skybox::FACE_NAMES
                    .map(|face| PathBuf::from(format!("textures/skybox/{}.png", face))),
            ),
        }
    }
}

impl RendererConfig {
    pub fn from_toml_str(text: &str) -> anyhow::Result<Self> {
        let config = toml::from_str(text).context("renderer config is not valid TOML")?;
        Ok(config)
    }

    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("could not read renderer config {:?}", path))?;
        Self::from_toml_str(&text)
    }

    pub fn fallback_diffuse_path(&self) -> PathBuf {
        self.asset_root.join(&self.missing_diffuse)
    }

    pub fn fallback_specular_path(&self) -> PathBuf {
        self.asset_root.join(&self.missing_specular)
    }

    pub fn skybox_paths(&self) -> Option<[PathBuf; 6]> {
        self.skybox
            .as_ref()
            .map(|faces| faces.clone().map(|face| self.asset_root.join(face)))
    }

    pub fn clear_colour(&self) -> wgpu::Color {
        let [r, g, b, a] = self.clear_colour;
        wgpu::Color { r, g, b, a }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_toml_keeps_defaults() {
        let config = RendererConfig::from_toml_str(
            r#"
            fov_degrees = 60.0
            asset_root = "content"
            "#,
        )
        .unwrap();

        assert_eq!(config.fov_degrees, 60.0);
        assert_eq!(config.near, 0.1);
        assert_eq!(config.far, 100.0);
        assert_eq!(
            config.fallback_diffuse_path(),
            PathBuf::from("content").join("textures/missing_texture_diffuse.png")
        );
    }

    #[test]
    fn skybox_faces_resolve_against_the_asset_root() {
        let config = RendererConfig::from_toml_str(
            r#"
            asset_root = "content"
            skybox = ["px.jpg", "nx.jpg", "py.jpg", "ny.jpg", "pz.jpg", "nz.jpg"]
            "#,
        )
        .unwrap();
        let faces = config.skybox_paths().unwrap();
        assert_eq!(faces[0], PathBuf::from("content").join("px.jpg"));
        assert_eq!(faces[5], PathBuf::from("content").join("nz.jpg"));

        let default = RendererConfig::default().skybox_paths().unwrap();
        assert_eq!(default[2], PathBuf::from("assets/textures/skybox/top.png"));

        let none = RendererConfig {
            skybox: None,
            ..RendererConfig::default()
        };
        assert_eq!(none.skybox_paths(), None);
    }

    #[test]
    fn malformed_toml_is_an_error() {
        assert!(RendererConfig::from_toml_str("fov_degrees = \"wide\"").is_err());
    }
}
