//! Textures.
//!
//! Two types live here. [`Texture`] is the value the engine passes around: it
//! names an image that was decoded and uploaded, and carries only an arena
//! handle into the device. Cloning it never duplicates or frees anything.
//! [`GpuTexture`] is the wgpu object the arena in
//! [`crate::context::Context`] owns, together with its view and sampler.

use std::path::PathBuf;

use image::GenericImageView;

use crate::gpu::TextureHandle;

/// Which material slot an image is meant for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TextureKind {
    Ambient,
    Diffuse,
    Specular,
    Normal,
    Height,
}

impl TextureKind {
    /// Material passes run in this order during import.
    pub const IMPORT_ORDER: [TextureKind; 5] = [
        TextureKind::Ambient,
        TextureKind::Diffuse,
        TextureKind::Specular,
        TextureKind::Height,
        TextureKind::Normal,
    ];

    /// Normal and height maps hold data, not colour, and are sampled linearly.
    pub fn is_linear(self) -> bool {
        matches!(self, TextureKind::Normal | TextureKind::Height)
    }

    pub fn format(self) -> wgpu::TextureFormat {
        if self.is_linear() {
            wgpu::TextureFormat::Rgba8Unorm
        } else {
            wgpu::TextureFormat::Rgba8UnormSrgb
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            TextureKind::Ambient => "ambient",
            TextureKind::Diffuse => "diffuse",
            TextureKind::Specular => "specular",
            TextureKind::Normal => "normal",
            TextureKind::Height => "height",
        }
    }
}

/// A decoded, uploaded image. Valid iff its handle is not
/// [`TextureHandle::INVALID`].
#[derive(Clone, Debug, PartialEq)]
pub struct Texture {
    pub handle: TextureHandle,
    pub width: u32,
    pub height: u32,
    pub format: wgpu::TextureFormat,
    pub kind: TextureKind,
    pub path: PathBuf,
}

impl Texture {
    pub fn invalid(kind: TextureKind) -> Self {
        Self {
            handle: TextureHandle::INVALID,
            width: 0,
            height: 0,
            format: kind.format(),
            kind,
            path: PathBuf::new(),
        }
    }

    pub fn is_valid(&self) -> bool {
        self.handle.is_valid()
    }
}

/// A GPU texture with a view and optional sampler.
#[derive(Debug)]
pub struct GpuTexture {
    #[allow(unused)]
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    pub sampler: Option<wgpu::Sampler>,
}

impl GpuTexture {
    /// Standard depth buffer texture format (32-bit float).
    pub const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

    /// Create a depth texture for depth-testing during rendering.
    ///
    /// `size` is [width, height] in pixels. Zero-sized surfaces get a 1x1 texture.
    pub fn create_depth_texture(device: &wgpu::Device, size: [u32; 2], label: &str) -> Self {
        let size = wgpu::Extent3d {
            width: size[0].max(1),
            height: size[1].max(1),
            depth_or_array_layers: 1,
        };
        let desc = wgpu::TextureDescriptor {
            label: Some(label),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: Self::DEPTH_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
            view_formats: &[Self::DEPTH_FORMAT],
        };
        let texture = device.create_texture(&desc);
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let sampler = Some(device.create_sampler(&wgpu::SamplerDescriptor {
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Nearest,
            compare: Some(wgpu::CompareFunction::LessEqual),
            lod_min_clamp: 0.0,
            lod_max_clamp: 100.0,
            ..Default::default()
        }));

        Self {
            texture,
            view,
            sampler,
        }
    }

    /// Upload an already decoded RGBA image.
    pub fn from_rgba(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        rgba: &image::RgbaImage,
        label: Option<&str>,
        format: wgpu::TextureFormat,
    ) -> Self {
        let dimensions = rgba.dimensions();
        let size = wgpu::Extent3d {
            width: dimensions.0,
            height: dimensions.1,
            depth_or_array_layers: 1,
        };
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label,
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });

        queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                aspect: wgpu::TextureAspect::All,
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
            },
            rgba,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(4 * dimensions.0),
                rows_per_image: Some(dimensions.1),
            },
            size,
        );

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let sampler = Some(create_default_sampler(device));

        Self {
            texture,
            view,
            sampler,
        }
    }

    /// Upload six equally sized square faces as a cube map with a
    /// [`wgpu::TextureViewDimension::Cube`] view. Faces are in layer order
    /// +X, -X, +Y, -Y, +Z, -Z.
    pub fn cube_from_rgba(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        faces: &[image::RgbaImage; 6],
        label: &str,
    ) -> Self {
        let face_size = faces[0].width();
        let format = wgpu::TextureFormat::Rgba8UnormSrgb;
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: wgpu::Extent3d {
                width: face_size,
                height: face_size,
                depth_or_array_layers: 6,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });

        for (layer, face) in faces.iter().enumerate() {
            queue.write_texture(
                wgpu::TexelCopyTextureInfo {
                    aspect: wgpu::TextureAspect::All,
                    texture: &texture,
                    mip_level: 0,
                    origin: wgpu::Origin3d {
                        x: 0,
                        y: 0,
                        z: layer as u32,
                    },
                },
                face,
                wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(4 * face_size),
                    rows_per_image: Some(face_size),
                },
                wgpu::Extent3d {
                    width: face_size,
                    height: face_size,
                    depth_or_array_layers: 1,
                },
            );
        }

        let view = texture.create_view(&wgpu::TextureViewDescriptor {
            label: Some(&format!("{} Cube View", label)),
            format: Some(format),
            dimension: Some(wgpu::TextureViewDimension::Cube),
            aspect: wgpu::TextureAspect::All,
            base_mip_level: 0,
            mip_level_count: Some(1),
            base_array_layer: 0,
            array_layer_count: Some(6),
            ..Default::default()
        });
        let sampler = Some(device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some(&format!("{} Sampler", label)),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        }));

        Self {
            texture,
            view,
            sampler,
        }
    }
}

/// Decode image file contents into RGBA8. `format` is an optional extension
/// or mime subtype hint ("png", "jpeg"); without it the format is guessed.
pub fn decode_rgba(bytes: &[u8], format: Option<&str>) -> anyhow::Result<image::RgbaImage> {
    let img = match format.and_then(image::ImageFormat::from_extension) {
        Some(fmt) => image::load_from_memory_with_format(bytes, fmt)?,
        None => image::load_from_memory(bytes)?,
    };
    let (width, height) = img.dimensions();
    if width == 0 || height == 0 {
        anyhow::bail!("image has no pixels");
    }
    Ok(img.to_rgba8())
}

pub fn create_default_sampler(device: &wgpu::Device) -> wgpu::Sampler {
    device.create_sampler(&wgpu::SamplerDescriptor {
        address_mode_u: wgpu::AddressMode::Repeat,
        address_mode_v: wgpu::AddressMode::Repeat,
        address_mode_w: wgpu::AddressMode::Repeat,
        mag_filter: wgpu::FilterMode::Linear,
        min_filter: wgpu::FilterMode::Linear,
        mipmap_filter: wgpu::FilterMode::Linear,
        ..Default::default()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let img = image::RgbaImage::from_pixel(width, height, image::Rgba([200, 10, 10, 255]));
        let mut bytes = Vec::new();
        image::DynamicImage::ImageRgba8(img)
            .write_to(&mut std::io::Cursor::new(&mut bytes), image::ImageFormat::Png)
            .unwrap();
        bytes
    }

    #[test]
    fn decodes_with_and_without_hint() {
        let bytes = png_bytes(3, 2);
        assert_eq!(decode_rgba(&bytes, Some("png")).unwrap().dimensions(), (3, 2));
        assert_eq!(decode_rgba(&bytes, None).unwrap().dimensions(), (3, 2));
    }

    #[test]
    fn garbage_is_a_decode_error() {
        assert!(decode_rgba(b"definitely not an image", None).is_err());
    }

    #[test]
    fn data_maps_are_linear() {
        assert_eq!(TextureKind::Normal.format(), wgpu::TextureFormat::Rgba8Unorm);
        assert_eq!(TextureKind::Diffuse.format(), wgpu::TextureFormat::Rgba8UnormSrgb);
        assert!(!Texture::invalid(TextureKind::Specular).is_valid());
    }
}
