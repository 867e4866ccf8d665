//! Six-face environment map drawn behind the scene.

use std::path::{Path, PathBuf};

use crate::{
    data_structures::texture::decode_rgba,
    error::NginError,
    gpu::{GpuDevice, TextureHandle},
};

/// Face order of a cube map and of [`crate::config::RendererConfig::skybox`].
pub const FACE_NAMES: [&str; 6] = ["right", "left", "top", "bottom", "front", "back"];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Skybox {
    /// Handle into the device's cube map arena.
    pub handle: TextureHandle,
    pub face_size: u32,
}

impl Skybox {
    /// Decode the six faces and upload them as one cube map. Every face must
    /// decode and all of them must be square and of the same size.
    pub fn load(device: &mut dyn GpuDevice, faces: &[PathBuf; 6]) -> Result<Self, NginError> {
        let mut images = Vec::with_capacity(faces.len());
        for path in faces {
            images.push(decode_face(path)?);
        }

        let size = images[0].width();
        for (path, image) in faces.iter().zip(&images) {
            if image.dimensions() != (size, size) {
                return Err(NginError::TextureDecode {
                    label: path.display().to_string(),
                    reason: format!(
                        "face is {}x{}, the skybox needs {}x{}",
                        image.width(),
                        image.height(),
                        size,
                        size
                    ),
                });
            }
        }

        let images: [image::RgbaImage; 6] =
            images.try_into().map_err(|_| NginError::TextureDecode {
                label: "skybox".to_string(),
                reason: "a cube map has six faces".to_string(),
            })?;
        let handle = device
            .create_cube_texture("skybox", &images)
            .map_err(|e| NginError::TextureDecode {
                label: "skybox".to_string(),
                reason: format!("{:#}", e),
            })?;
        log::info!("skybox ready, {}px faces", size);
        Ok(Self {
            handle,
            face_size: size,
        })
    }
}

fn decode_face(path: &Path) -> Result<image::RgbaImage, NginError> {
    let decode_error = |reason: String| NginError::TextureDecode {
        label: path.display().to_string(),
        reason,
    };
    let bytes = std::fs::read(path).map_err(|e| decode_error(e.to_string()))?;
    let hint = path.extension().and_then(|e| e.to_str());
    decode_rgba(&bytes, hint).map_err(|e| decode_error(e.to_string()))
}
