//! The editor scene: a registry with a single root entity that every model
//! and light hangs under, the texture cache shared by all imports and the
//! queue of edits coming from the properties panel.

use std::{path::Path, str::FromStr};

use cgmath::Vector3;

use crate::{
    data_structures::{
        components::{LightComponent, RelationComponent, TagComponent, TransformComponent},
        properties::{set_binding, Binding, BindingValue, ViewEvent, CREATE_LIGHT_CUBE_EVENT},
        registry::{Entity, Registry},
    },
    error::NginError,
    gpu::GpuDevice,
    resources::{ModelImporter, TextureCache},
};

pub const SCENE_ROOT_NAME: &str = "scene root";
pub const LIGHT_CUBE_NAME: &str = "point light";

#[derive(Debug)]
pub struct Scene {
    pub registry: Registry,
    root: Entity,
    textures: TextureCache,
    pending: Vec<ViewEvent>,
    selected: Option<Entity>,
}

impl Scene {
    pub fn new() -> Self {
        let mut registry = Registry::new();
        let root = registry.create();
        registry.insert(root, TransformComponent::default());
        registry.insert(root, TagComponent::new(SCENE_ROOT_NAME));
        registry.insert(root, RelationComponent::default());
        Self {
            registry,
            root,
            textures: TextureCache::new(),
            pending: Vec::new(),
            selected: None,
        }
    }

    pub fn root(&self) -> Entity {
        self.root
    }

    pub fn textures(&self) -> &TextureCache {
        &self.textures
    }

    pub fn selected(&self) -> Option<Entity> {
        self.selected
    }

    /// Entity the properties panel edits. Unknown entities clear the selection.
    pub fn select(&mut self, entity: Option<Entity>) {
        self.selected = entity.filter(|e| self.registry.contains(*e));
    }

    /// Import a model below the scene root. See [`ModelImporter::import`].
    pub fn load_model(
        &mut self,
        device: &mut dyn GpuDevice,
        path: &Path,
        name: Option<&str>,
    ) -> Option<Entity> {
        let mut importer = ModelImporter::new(device, &mut self.textures);
        importer.import(&mut self.registry, path, self.root, name)
    }

    /// A light entity directly below the scene root.
    pub fn add_light(
        &mut self,
        name: &str,
        transform: TransformComponent,
        light: LightComponent,
    ) -> Entity {
        let entity = self.registry.create();
        self.registry.insert(entity, transform);
        self.registry.insert(entity, TagComponent::new(name));
        self.registry
            .insert(entity, RelationComponent::with_parent(self.root));
        self.registry.insert(entity, light);
        if let Err(e) = self.registry.attach_transform_parent(entity, self.root) {
            log::error!("{}", e);
        }
        self.registry.add_child(self.root, entity);
        entity
    }

    #[allow(clippy::too_many_arguments)]
    pub fn create_light_cube(
        &mut self,
        position: Vector3<f32>,
        ambient: Vector3<f32>,
        diffuse: Vector3<f32>,
        specular: Vector3<f32>,
        constant: f32,
        linear: f32,
        quadratic: f32,
    ) -> Entity {
        let light =
            LightComponent::point(constant, linear, quadratic).with_colors(ambient, diffuse, specular);
        let entity = self.add_light(
            LIGHT_CUBE_NAME,
            TransformComponent::from_position(position),
            light,
        );
        log::info!("created point light {:?} at {:?}", entity, position);
        entity
    }

    pub fn queue_view_event(&mut self, event: ViewEvent) {
        self.pending.push(event);
    }

    pub fn pending_events(&self) -> usize {
        self.pending.len()
    }

    /// Apply queued panel events in arrival order. Input events edit the
    /// selected entity. Events that fail are logged and dropped.
    /// Returns how many were applied.
    pub fn handle_view_events(&mut self) -> usize {
        let mut applied = 0;
        for event in std::mem::take(&mut self.pending) {
            match self.apply(event) {
                Ok(()) => applied += 1,
                Err(e) => log::error!("view event dropped: {}", e),
            }
        }
        applied
    }

    fn apply(&mut self, event: ViewEvent) -> Result<(), NginError> {
        match event {
            ViewEvent::Input {
                name,
                value_type,
                value,
            } => {
                let binding = Binding::from_str(&name)?;
                let Some(entity) = self.selected else {
                    return Err(NginError::Binding {
                        name,
                        reason: "no entity is selected".to_string(),
                    });
                };
                let value = BindingValue::parse(value_type, &value)?;
                set_binding(&mut self.registry, entity, binding, value)
            }
            ViewEvent::Button {
                name,
                vectors,
                floats,
            } if name == CREATE_LIGHT_CUBE_EVENT => {
                let (&[position, ambient, diffuse, specular, ..], &[constant, linear, quadratic, ..]) =
                    (vectors.as_slice(), floats.as_slice())
                else {
                    return Err(NginError::Binding {
                        name,
                        reason: format!(
                            "expected 4 vectors and 3 floats, got {} and {}",
                            vectors.len(),
                            floats.len()
                        ),
                    });
                };
                self.create_light_cube(
                    position, ambient, diffuse, specular, constant, linear, quadratic,
                );
                Ok(())
            }
            ViewEvent::Button { name, .. } => Err(NginError::Binding {
                name,
                reason: "unknown button".to_string(),
            }),
        }
    }
}

impl Default for Scene {
    fn default() -> Self {
        Self::new()
    }
}
