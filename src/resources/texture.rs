use std::{
    collections::HashMap,
    path::{Component, Path, PathBuf},
};

use crate::{
    config::RendererConfig,
    data_structures::texture::{decode_rgba, Texture, TextureKind},
    error::NginError,
    gpu::GpuDevice,
    resources::source::EmbeddedImage,
};

/// Decoded textures keyed by file path.
///
/// Every distinct path is read, decoded and uploaded at most once. Failures
/// are remembered as invalid textures so a broken reference is not retried
/// each time a mesh names it. The key is the path alone: a file requested
/// under a second [`TextureKind`] reuses the first upload.
#[derive(Debug, Default)]
pub struct TextureCache {
    entries: HashMap<PathBuf, Texture>,
    decodes: usize,
}

impl TextureCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, path: &Path) -> Option<Texture> {
        self.entries.get(&cache_key(path)).cloned()
    }

    pub fn put(&mut self, path: impl AsRef<Path>, texture: Texture) {
        self.entries.insert(cache_key(path.as_ref()), texture);
    }

    /// Cached texture for `path`, decoding and uploading it on first use.
    /// Returns an invalid texture if the file cannot be used.
    pub fn load(&mut self, path: &Path, kind: TextureKind, device: &mut dyn GpuDevice) -> Texture {
        let path = &cache_key(path);
        if let Some(texture) = self.get(path) {
            return texture;
        }
        self.decodes += 1;
        let texture = match load_file(path, kind, device) {
            Ok(texture) => {
                log::debug!("loaded {} texture {:?}", kind.name(), path);
                texture
            }
            Err(e) => {
                log::warn!("{:#}", e);
                Texture {
                    path: path.to_path_buf(),
                    ..Texture::invalid(kind)
                }
            }
        };
        self.put(path, texture.clone());
        texture
    }

    /// How many distinct paths were decoded so far.
    pub fn decode_count(&self) -> usize {
        self.decodes
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// `./b.png` and `b.png` name the same file. `Path` already drops interior
/// `.` components but keeps a leading one. `..` is kept since it may cross a
/// symlink.
fn cache_key(path: &Path) -> PathBuf {
    path.components()
        .filter(|c| !matches!(c, Component::CurDir))
        .collect()
}

fn upload(
    device: &mut dyn GpuDevice,
    label: &str,
    rgba: &image::RgbaImage,
    kind: TextureKind,
    path: PathBuf,
) -> anyhow::Result<Texture> {
    let handle = device.create_texture(label, rgba, kind)?;
    Ok(Texture {
        handle,
        width: rgba.width(),
        height: rgba.height(),
        format: kind.format(),
        kind,
        path,
    })
}

fn load_file(path: &Path, kind: TextureKind, device: &mut dyn GpuDevice) -> anyhow::Result<Texture> {
    let decode_error = |reason: String| NginError::TextureDecode {
        label: path.display().to_string(),
        reason,
    };
    let bytes = std::fs::read(path).map_err(|e| decode_error(e.to_string()))?;
    let hint = path.extension().and_then(|e| e.to_str());
    let rgba = decode_rgba(&bytes, hint).map_err(|e| decode_error(e.to_string()))?;
    upload(device, &path.display().to_string(), &rgba, kind, path.to_path_buf())
}

/// Decode an image stored inside an asset. Embedded images bypass the cache.
pub fn decode_embedded(
    device: &mut dyn GpuDevice,
    name: &str,
    image: &EmbeddedImage,
    kind: TextureKind,
) -> Texture {
    let result = decode_rgba(&image.bytes, image.format_hint.as_deref())
        .map_err(|e| NginError::TextureDecode {
            label: name.to_string(),
            reason: e.to_string(),
        })
        .map_err(anyhow::Error::from)
        .and_then(|rgba| upload(device, name, &rgba, kind, PathBuf::from(name)));
    match result {
        Ok(texture) => texture,
        Err(e) => {
            log::warn!("embedded {} texture {}: {:#}", kind.name(), name, e);
            Texture::invalid(kind)
        }
    }
}

/// Textures bound in place of a missing diffuse or specular map.
#[derive(Clone, Debug, PartialEq)]
pub struct FallbackTextures {
    pub diffuse: Texture,
    pub specular: Texture,
}

impl FallbackTextures {
    /// Both files must decode; the renderer cannot start without them.
    pub fn load(device: &mut dyn GpuDevice, config: &RendererConfig) -> Result<Self, NginError> {
        let diffuse = Self::load_one(device, &config.fallback_diffuse_path(), TextureKind::Diffuse)?;
        let specular =
            Self::load_one(device, &config.fallback_specular_path(), TextureKind::Specular)?;
        log::info!("fallback textures ready");
        Ok(Self { diffuse, specular })
    }

    fn load_one(
        device: &mut dyn GpuDevice,
        path: &Path,
        kind: TextureKind,
    ) -> Result<Texture, NginError> {
        load_file(path, kind, device).map_err(|e| NginError::FallbackTexture {
            path: path.to_path_buf(),
            reason: format!("{:#}", e),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        data_structures::model::ModelVertex,
        gpu::{MeshBuffers, TextureHandle},
    };

    #[derive(Default)]
    struct CountingDevice {
        textures: u32,
    }

    impl GpuDevice for CountingDevice {
        fn create_mesh(
            &mut self,
            _label: &str,
            _vertices: &[ModelVertex],
            _indices: &[u32],
        ) -> anyhow::Result<MeshBuffers> {
            anyhow::bail!("no meshes here")
        }

        fn create_texture(
            &mut self,
            _label: &str,
            _image: &image::RgbaImage,
            _kind: TextureKind,
        ) -> anyhow::Result<TextureHandle> {
            self.textures += 1;
            Ok(TextureHandle(self.textures - 1))
        }

        fn create_cube_texture(
            &mut self,
            _label: &str,
            _faces: &[image::RgbaImage; 6],
        ) -> anyhow::Result<TextureHandle> {
            anyhow::bail!("no cube maps here")
        }
    }

    fn scratch(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "forward-ngin-cache-{}-{}",
            name,
            std::process::id()
        ));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn png_bytes() -> Vec<u8> {
        let mut bytes = std::io::Cursor::new(Vec::new());
        image::RgbaImage::from_pixel(2, 2, image::Rgba([0, 255, 0, 255]))
            .write_to(&mut bytes, image::ImageFormat::Png)
            .unwrap();
        bytes.into_inner()
    }

    #[test]
    fn leading_current_dir_shares_a_key() {
        let mut cache = TextureCache::new();
        let mut device = CountingDevice::default();

        let kind = TextureKind::Diffuse;
        let dotted = cache.load(Path::new("./no-such-tex.png"), kind, &mut device);
        let plain = cache.load(Path::new("no-such-tex.png"), kind, &mut device);

        assert_eq!(dotted, plain);
        assert_eq!(cache.decode_count(), 1);
        assert_eq!(cache.len(), 1);

        let texture = Texture {
            handle: TextureHandle(3),
            ..Texture::invalid(TextureKind::Specular)
        };
        cache.put("./spec.png", texture.clone());
        assert_eq!(cache.get(Path::new("spec.png")), Some(texture));
    }

    #[test]
    fn broken_file_is_cached_as_invalid() {
        let dir = scratch("broken");
        let path = dir.join("broken.png");
        std::fs::write(&path, b"not an image").unwrap();
        let mut cache = TextureCache::new();
        let mut device = CountingDevice::default();

        let first = cache.load(&path, TextureKind::Specular, &mut device);
        let second = cache.load(&path, TextureKind::Specular, &mut device);

        assert!(!first.is_valid());
        assert_eq!(first, second);
        assert_eq!(first.kind, TextureKind::Specular);
        assert_eq!(cache.decode_count(), 1);
        assert_eq!(device.textures, 0);
        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn embedded_images_decode_without_the_cache() {
        let mut device = CountingDevice::default();
        let image = EmbeddedImage {
            bytes: png_bytes(),
            format_hint: Some("png".to_string()),
        };

        let texture = decode_embedded(&mut device, "*0", &image, TextureKind::Diffuse);
        let garbage = EmbeddedImage {
            bytes: vec![1, 2, 3],
            format_hint: None,
        };
        let broken = decode_embedded(&mut device, "*1", &garbage, TextureKind::Diffuse);

        assert!(texture.is_valid());
        assert_eq!((texture.width, texture.height), (2, 2));
        assert_eq!(texture.path, PathBuf::from("*0"));
        assert!(!broken.is_valid());
        assert_eq!(device.textures, 1);
    }

    #[test]
    fn missing_fallback_is_fatal() {
        let mut device = CountingDevice::default();
        let config = RendererConfig {
            asset_root: PathBuf::from("no/such/asset/root"),
            ..RendererConfig::default()
        };

        let err = FallbackTextures::load(&mut device, &config).unwrap_err();

        let NginError::FallbackTexture { path, .. } = err else {
            panic!("unexpected error {:?}", err);
        };
        assert_eq!(path, config.fallback_diffuse_path());
    }
}
