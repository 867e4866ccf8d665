//! Turns a parsed asset into entities.
//!
//! Every node becomes an entity with a transform relative to its parent
//! node, and every mesh becomes a child entity of its node carrying the
//! geometry and material. The result hangs below a single model root.

use std::path::Path;

use crate::{
    data_structures::{
        components::{
            MaterialComponent, MeshComponent, RelationComponent, TagComponent, TransformComponent,
        },
        registry::{Entity, Registry},
        texture::TextureKind,
        transform::euler_xyz_from_quaternion,
    },
    error::NginError,
    gpu::GpuDevice,
    resources::{
        mesh::build_vertices,
        source::{
            load_source_scene, SourceMaterial, SourceMesh, SourceNode, SourceScene, TextureRef,
        },
        texture::{decode_embedded, TextureCache},
    },
};

pub const DEFAULT_MODEL_NAME: &str = "default model";
pub const UNNAMED_NODE: &str = "unnamed node";
pub const UNNAMED_MESH: &str = "unnamed mesh";

pub struct ModelImporter<'a> {
    device: &'a mut dyn GpuDevice,
    textures: &'a mut TextureCache,
}

impl<'a> ModelImporter<'a> {
    pub fn new(device: &'a mut dyn GpuDevice, textures: &'a mut TextureCache) -> Self {
        Self { device, textures }
    }

    /// Import the asset at `asset_path` below `parent`.
    ///
    /// Returns the model root, or `None` if the asset could not be parsed or
    /// `parent` cannot hold children. In that case no entity is created.
    pub fn import(
        &mut self,
        registry: &mut Registry,
        asset_path: &Path,
        parent: Entity,
        model_name: Option<&str>,
    ) -> Option<Entity> {
        let scene = match load_source_scene(asset_path) {
            Ok(scene) => scene,
            Err(e) => {
                log::error!("import of {:?} failed: {:#}", asset_path, e);
                return None;
            }
        };
        let asset_dir = asset_path.parent().unwrap_or_else(|| Path::new(""));
        self.import_scene(registry, &scene, asset_dir, parent, model_name)
    }

    /// Like [`ModelImporter::import`] for an already parsed scene. Texture
    /// files are resolved relative to `asset_dir`.
    pub fn import_scene(
        &mut self,
        registry: &mut Registry,
        scene: &SourceScene,
        asset_dir: &Path,
        parent: Entity,
        model_name: Option<&str>,
    ) -> Option<Entity> {
        if scene.incomplete {
            log::error!("asset in {:?} is incomplete, nothing imported", asset_dir);
            return None;
        }
        let Some(root_node) = &scene.root else {
            log::error!("asset in {:?} has no root node, nothing imported", asset_dir);
            return None;
        };
        if !registry.has::<TransformComponent>(parent) {
            log::error!(
                "{}",
                NginError::InvalidParent(format!("{:?} has no transform to import under", parent))
            );
            return None;
        }

        let name = model_name.filter(|n| !n.is_empty()).unwrap_or(DEFAULT_MODEL_NAME);
        let model_root = Self::create_child(registry, parent, TransformComponent::default(), name);

        let mut import = SceneImport {
            scene,
            asset_dir,
            meshes: 0,
        };
        self.process_node(registry, &mut import, root_node, model_root);
        log::info!(
            "imported {:?} as {:?}: {} nodes, {} meshes",
            name,
            model_root,
            root_node.count(),
            import.meshes
        );
        Some(model_root)
    }

    /// New entity with a transform relative to `parent`, a tag and a relation.
    fn create_child(
        registry: &mut Registry,
        parent: Entity,
        transform: TransformComponent,
        name: &str,
    ) -> Entity {
        let entity = registry.create();
        registry.insert(entity, transform);
        registry.insert(entity, TagComponent::new(name));
        registry.insert(entity, RelationComponent::with_parent(parent));
        if let Err(e) = registry.attach_transform_parent(entity, parent) {
            // a fresh entity cannot close a cycle
            log::error!("{}", e);
        }
        registry.add_child(parent, entity);
        entity
    }

    fn process_node(
        &mut self,
        registry: &mut Registry,
        import: &mut SceneImport,
        node: &SourceNode,
        parent: Entity,
    ) {
        let transform = TransformComponent::new(
            node.translation,
            euler_xyz_from_quaternion(node.rotation),
            node.scale,
        );
        let name = node.name.as_deref().filter(|n| !n.is_empty()).unwrap_or(UNNAMED_NODE);
        let entity = Self::create_child(registry, parent, transform, name);

        let scene = import.scene;
        for &mesh_index in &node.meshes {
            match scene.meshes.get(mesh_index) {
                Some(mesh) => {
                    if self.process_mesh(registry, import, mesh, entity).is_some() {
                        import.meshes += 1;
                    }
                }
                None => log::warn!("node {:?} refers to missing mesh {}", name, mesh_index),
            }
        }

        for child in &node.children {
            self.process_node(registry, import, child, entity);
        }
    }

    fn process_mesh(
        &mut self,
        registry: &mut Registry,
        import: &SceneImport,
        mesh: &SourceMesh,
        parent: Entity,
    ) -> Option<Entity> {
        let name = mesh.name.as_deref().filter(|n| !n.is_empty()).unwrap_or(UNNAMED_MESH);
        let (vertices, indices) = match build_vertices(mesh) {
            Ok(geometry) => geometry,
            Err(e) => {
                log::warn!("skipping mesh {:?}: {:#}", name, e);
                return None;
            }
        };
        let buffers = match self.device.create_mesh(name, &vertices, &indices) {
            Ok(buffers) => buffers,
            Err(e) => {
                log::warn!("skipping mesh {:?}, upload failed: {:#}", name, e);
                return None;
            }
        };

        let entity = Self::create_child(registry, parent, TransformComponent::default(), name);

        let untextured = SourceMaterial::untextured();
        let material = match mesh.material {
            Some(index) => import.scene.materials.get(index).unwrap_or_else(|| {
                log::warn!("mesh {:?} refers to missing material {}", name, index);
                &untextured
            }),
            None => &untextured,
        };
        for kind in TextureKind::IMPORT_ORDER {
            self.extract_material(registry, import, entity, material, kind);
        }

        registry.insert(
            entity,
            MeshComponent {
                buffers,
                shader: self.device.default_shader(),
                index_count: indices.len() as u32,
                vertex_count: vertices.len() as u32,
                has_normal: mesh.normals.is_some(),
                has_texture: mesh.tex_coords.is_some(),
            },
        );
        Some(entity)
    }

    /// One material pass: base colour, shininess and the textures of `kind`.
    fn extract_material(
        &mut self,
        registry: &mut Registry,
        import: &SceneImport,
        entity: Entity,
        material: &SourceMaterial,
        kind: TextureKind,
    ) {
        let color = material.color(kind).unwrap_or_else(|| {
            log::error!(
                "{}, using white",
                NginError::MaterialExtraction {
                    material: material.name.clone(),
                    key: kind.name(),
                }
            );
            [1.0; 4]
        });

        let mut textures = Vec::new();
        let mut embedded = false;
        for texture_ref in material.textures_of(kind) {
            let texture = match texture_ref {
                TextureRef::Embedded(name) => match import.scene.embedded.get(name) {
                    Some(image) => {
                        embedded = true;
                        decode_embedded(self.device, name, image, kind)
                    }
                    None => {
                        log::warn!(
                            "material {:?} refers to missing embedded image {}",
                            material.name,
                            name
                        );
                        continue;
                    }
                },
                TextureRef::File(file) => {
                    self.textures.load(&import.asset_dir.join(file), kind, self.device)
                }
            };
            if texture.is_valid() {
                textures.push(texture);
            }
        }

        let Some(component) = registry.get_or_default::<MaterialComponent>(entity) else {
            return;
        };
        component.set_color(kind, color);
        component.shininess = material.shininess.unwrap_or(MaterialComponent::DEFAULT_SHININESS);
        component.is_embedded |= embedded;
        for texture in textures {
            component.assign(texture);
        }
    }
}

struct SceneImport<'s> {
    scene: &'s SourceScene,
    asset_dir: &'s Path,
    meshes: usize,
}
