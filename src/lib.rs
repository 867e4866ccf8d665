//! forward-ngin
//!
//! A small forward-lit renderer built around an entity-component registry.
//! Models are imported into a tree of entities with parent-relative
//! transforms, materials and lights, and every frame the registry is walked
//! to emit one lit draw per mesh plus an editor overlay.
//!
//! High-level modules
//! - `data_structures`: registry, components, transform resolution, properties
//! - `resources`: asset parsing, mesh building, texture cache, model import
//! - `lighting`: gathers light entities into the shader's uniform block
//! - `render`: per-frame traversal and draw emission
//! - `overlay`: grid, gizmo and light marker geometry
//! - `gpu`: the device and frame encoder traits the core renders through
//! - `context` / `frame`: the wgpu implementations of those traits
//! - `pipelines`: render pipelines and their WGSL shaders
//! - `scene`: the editor scene and its view events
//! - `app`: a windowed viewer
//!

pub mod app;
pub mod camera;
pub mod config;
pub mod context;
pub mod data_structures;
pub mod error;
pub mod frame;
pub mod gpu;
pub mod lighting;
pub mod overlay;
pub mod pipelines;
pub mod render;
pub mod resources;
pub mod scene;

// Re-exports commonly used types for convenience in downstream code.
pub use cgmath;
pub use wgpu;
pub use winit::event::WindowEvent;

pub use app::run;
pub use config::RendererConfig;
pub use error::NginError;
pub use scene::Scene;

/// Initialise `env_logger`. Safe to call more than once.
pub fn init_logger() {
    if let Err(e) = env_logger::try_init() {
        log::warn!("Could not initialize logger: {}", e);
    }
}
