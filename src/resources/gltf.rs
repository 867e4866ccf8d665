//! glTF / glb front-end.

use std::{collections::HashMap, path::{Path, PathBuf}};

use anyhow::Context as _;
use cgmath::{InnerSpace, Quaternion, Vector3, Vector4};

use crate::{
    data_structures::texture::TextureKind,
    error::NginError,
    resources::source::{
        EmbeddedImage, SourceMaterial, SourceMesh, SourceNode, SourceScene, TextureRef,
    },
};

pub fn load(path: &Path) -> anyhow::Result<SourceScene> {
    let bytes = std::fs::read(path).with_context(|| format!("could not read {:?}", path))?;
    let gltf = gltf::Gltf::from_slice(&bytes).map_err(|e| NginError::AssetParse {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    let base_dir = path.parent().unwrap_or_else(|| Path::new(""));

    let mut scene = SourceScene::default();

    // Load buffers
    let mut buffer_data: Vec<Vec<u8>> = Vec::new();
    for buffer in gltf.buffers() {
        match buffer.source() {
            gltf::buffer::Source::Bin => match gltf.blob.as_deref() {
                Some(blob) => buffer_data.push(blob.into()),
                None => {
                    log::warn!("{:?} refers to a binary chunk it does not contain", path);
                    scene.incomplete = true;
                    buffer_data.push(Vec::new());
                }
            },
            gltf::buffer::Source::Uri(uri) if uri.starts_with("data:") => {
                log::warn!("{:?}: inline data URIs are not supported", path);
                scene.incomplete = true;
                buffer_data.push(Vec::new());
            }
            gltf::buffer::Source::Uri(uri) => {
                let bin = std::fs::read(base_dir.join(uri)).map_err(|e| NginError::AssetParse {
                    path: path.to_path_buf(),
                    reason: format!("buffer {}: {}", uri, e),
                })?;
                buffer_data.push(bin);
            }
        }
    }

    // Images: embedded ones are copied out of their buffer view
    let mut image_refs: HashMap<usize, TextureRef> = HashMap::new();
    for image in gltf.images() {
        match image.source() {
            gltf::image::Source::View { view, mime_type } => {
                let start = view.offset();
                let end = start + view.length();
                let Some(bytes) = buffer_data
                    .get(view.buffer().index())
                    .and_then(|buffer| buffer.get(start..end))
                else {
                    log::warn!("image {} of {:?} points outside its buffer", image.index(), path);
                    continue;
                };
                let name = format!("*{}", image.index());
                scene.embedded.insert(
                    name.clone(),
                    EmbeddedImage {
                        bytes: bytes.to_vec(),
                        format_hint: mime_type.split('/').next_back().map(str::to_string),
                    },
                );
                image_refs.insert(image.index(), TextureRef::Embedded(name));
            }
            gltf::image::Source::Uri { uri, .. } if uri.starts_with("data:") => {
                log::warn!("image {} of {:?} is an inline data URI, skipping", image.index(), path);
            }
            gltf::image::Source::Uri { uri, .. } => {
                image_refs.insert(image.index(), TextureRef::File(PathBuf::from(uri)));
            }
        }
    }

    for material in gltf.materials() {
        scene.materials.push(to_source_material(&material, &image_refs));
    }

    // One source mesh per primitive; remember which belong to which glTF mesh
    let mut mesh_map: Vec<Vec<usize>> = Vec::new();
    for mesh in gltf.meshes() {
        let mut primitives = Vec::new();
        for primitive in mesh.primitives() {
            if primitive.mode() != gltf::mesh::Mode::Triangles {
                log::warn!(
                    "skipping primitive {} of mesh {:?}: only triangle lists are supported",
                    primitive.index(),
                    mesh.name()
                );
                continue;
            }
            primitives.push(scene.meshes.len());
            scene
                .meshes
                .push(read_primitive(&primitive, mesh.name(), &buffer_data));
        }
        mesh_map.push(primitives);
    }

    let gltf_scene = gltf.default_scene().or_else(|| gltf.scenes().next());
    scene.root = gltf_scene.map(|s| {
        let mut root = SourceNode::new(s.name().map(str::to_string));
        root.children = s.nodes().map(|n| to_source_node(&n, &mesh_map)).collect();
        root
    });

    Ok(scene)
}

fn to_source_material(
    material: &gltf::Material,
    images: &HashMap<usize, TextureRef>,
) -> SourceMaterial {
    let pbr = material.pbr_metallic_roughness();
    let mut textures = Vec::new();
    let mut push = |kind: TextureKind, image: gltf::Image| {
        if let Some(texture) = images.get(&image.index()) {
            textures.push((kind, texture.clone()));
        }
    };
    if let Some(info) = pbr.base_color_texture() {
        push(TextureKind::Diffuse, info.texture().source());
    }
    if let Some(normal) = material.normal_texture() {
        push(TextureKind::Normal, normal.texture().source());
    }
    if let Some(occlusion) = material.occlusion_texture() {
        push(TextureKind::Ambient, occlusion.texture().source());
    }

    SourceMaterial {
        name: material
            .name()
            .map(str::to_string)
            .unwrap_or_else(|| format!("material {}", material.index().unwrap_or(0))),
        ambient: None,
        diffuse: Some(pbr.base_color_factor()),
        // metallic-roughness materials carry no specular colour
        specular: None,
        shininess: None,
        textures,
    }
}

fn read_primitive(
    primitive: &gltf::Primitive,
    name: Option<&str>,
    buffers: &[Vec<u8>],
) -> SourceMesh {
    let reader = primitive.reader(|buffer| buffers.get(buffer.index()).map(Vec::as_slice));

    let positions: Vec<[f32; 3]> = reader
        .read_positions()
        .map(|p| p.collect())
        .unwrap_or_default();
    let normals: Option<Vec<[f32; 3]>> = reader.read_normals().map(|n| n.collect());
    let tex_coords: Option<Vec<[f32; 2]>> =
        reader.read_tex_coords(0).map(|t| t.into_f32().collect());

    // glTF stores tangents as vec4, the 4th component gives the bitangent's handedness
    let (tangents, bitangents) = match (reader.read_tangents(), &normals) {
        (Some(tangents), Some(normals)) => {
            let (t, b): (Vec<[f32; 3]>, Vec<[f32; 3]>) = tangents
                .zip(normals.iter())
                .map(|(tangent, normal)| -> ([f32; 3], [f32; 3]) {
                    let tangent: Vector4<f32> = tangent.into();
                    let normal: Vector3<f32> = (*normal).into();
                    let bitangent = normal.cross(tangent.truncate()) * tangent.w;
                    (tangent.truncate().into(), bitangent.into())
                })
                .unzip();
            (Some(t), Some(b))
        }
        _ => (None, None),
    };

    let indices = match reader.read_indices() {
        Some(indices) => indices.into_u32().collect(),
        None => (0..positions.len() as u32).collect(),
    };

    SourceMesh {
        name: name.map(str::to_string),
        positions,
        normals,
        tex_coords,
        tangents,
        bitangents,
        indices,
        material: primitive.material().index(),
    }
}

fn to_source_node(node: &gltf::Node, mesh_map: &[Vec<usize>]) -> SourceNode {
    let (translation, rotation, scale) = node.transform().decomposed();
    let [x, y, z, w] = rotation;
    let mut source = SourceNode::new(node.name().map(str::to_string));
    source.translation = translation.into();
    source.rotation = Quaternion::new(w, x, y, z).normalize();
    source.scale = scale.into();
    if let Some(mesh) = node.mesh() {
        source.meshes = mesh_map.get(mesh.index()).cloned().unwrap_or_default();
    }
    source.children = node
        .children()
        .map(|child| to_source_node(&child, mesh_map))
        .collect();
    source
}
