//! Loading of external assets.
//!
//! `gltf` and `obj` parse files into a [`source::SourceScene`], `mesh` turns
//! source meshes into vertex data, `texture` decodes and caches images,
//! `skybox` uploads the environment cube map and `import` builds the entity
//! tree.

pub mod gltf;
pub mod import;
pub mod mesh;
pub mod obj;
pub mod skybox;
pub mod source;
pub mod texture;

pub use import::ModelImporter;
pub use skybox::Skybox;
pub use texture::{FallbackTextures, TextureCache};
