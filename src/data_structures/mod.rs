//! Engine data structures.
//!
//! - `registry` holds entities and their component tables
//! - `components` defines the records an entity can carry
//! - `transform` resolves parent-relative transforms into world space
//! - `properties` exposes component fields to the editor by name
//! - `model` holds the vertex formats shared by importer and pipelines
//! - `texture` holds texture values and the GPU texture wrapper

pub mod components;
pub mod model;
pub mod properties;
pub mod registry;
pub mod texture;
pub mod transform;
