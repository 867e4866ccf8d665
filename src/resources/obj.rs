//! Wavefront obj/mtl front-end.

use std::path::{Path, PathBuf};

use crate::{
    data_structures::texture::TextureKind,
    error::NginError,
    resources::source::{SourceMaterial, SourceMesh, SourceNode, SourceScene, TextureRef},
};

pub fn load(path: &Path) -> anyhow::Result<SourceScene> {
    let (models, materials) = tobj::load_obj(
        path,
        &tobj::LoadOptions {
            triangulate: true,
            single_index: true,
            ..Default::default()
        },
    )
    .map_err(|e| NginError::AssetParse {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;

    let mut scene = SourceScene::default();
    scene.materials = match materials {
        Ok(materials) => materials.iter().map(to_source_material).collect(),
        Err(e) => {
            log::warn!("{:?}: no usable material library ({}), using defaults", path, e);
            Vec::new()
        }
    };

    let stem = path.file_stem().map(|s| s.to_string_lossy().into_owned());
    let mut root = SourceNode::new(stem);
    for (index, model) in models.into_iter().enumerate() {
        let mut node = SourceNode::new(Some(model.name.clone()).filter(|n| !n.is_empty()));
        node.meshes.push(index);
        root.children.push(node);
        scene.meshes.push(to_source_mesh(model));
    }
    scene.root = Some(root);

    Ok(scene)
}

fn to_source_mesh(model: tobj::Model) -> SourceMesh {
    let mesh = model.mesh;
    let positions = mesh
        .positions
        .chunks_exact(3)
        .map(|p| [p[0], p[1], p[2]])
        .collect();
    let normals = (!mesh.normals.is_empty())
        .then(|| mesh.normals.chunks_exact(3).map(|n| [n[0], n[1], n[2]]).collect());
    // obj puts v = 0 at the bottom of the image
    let tex_coords = (!mesh.texcoords.is_empty()).then(|| {
        mesh.texcoords
            .chunks_exact(2)
            .map(|t| [t[0], 1.0 - t[1]])
            .collect()
    });

    SourceMesh {
        name: Some(model.name).filter(|n| !n.is_empty()),
        positions,
        normals,
        tex_coords,
        tangents: None,
        bitangents: None,
        indices: mesh.indices,
        material: mesh.material_id,
    }
}

fn to_source_material(material: &tobj::Material) -> SourceMaterial {
    let rgba = |c: [f32; 3]| [c[0], c[1], c[2], 1.0];
    let mut textures = Vec::new();
    let mut push = |kind: TextureKind, file: Option<&String>| {
        if let Some(file) = file.filter(|f| !f.is_empty()) {
            textures.push((kind, TextureRef::File(PathBuf::from(file))));
        }
    };
    push(TextureKind::Ambient, material.ambient_texture.as_ref());
    push(TextureKind::Diffuse, material.diffuse_texture.as_ref());
    push(TextureKind::Specular, material.specular_texture.as_ref());
    // tobj files `map_bump`/`bump` as its normal texture; obj bump maps are height maps
    push(TextureKind::Height, material.normal_texture.as_ref());
    push(
        TextureKind::Normal,
        material
            .unknown_param
            .get("norm")
            .or_else(|| material.unknown_param.get("map_Kn")),
    );

    SourceMaterial {
        name: material.name.clone(),
        ambient: material.ambient.map(rgba),
        diffuse: material.diffuse.map(rgba),
        specular: material.specular.map(rgba),
        shininess: material.shininess,
        textures,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mtl_without_specular_leaves_it_unset() {
        let material = tobj::Material {
            name: "plain".to_string(),
            diffuse: Some([0.5, 0.5, 0.5]),
            diffuse_texture: Some("wood.png".to_string()),
            ..Default::default()
        };
        let source = to_source_material(&material);

        assert_eq!(source.diffuse, Some([0.5, 0.5, 0.5, 1.0]));
        assert_eq!(source.specular, None);
        assert_eq!(
            source.textures_of(TextureKind::Diffuse).collect::<Vec<_>>(),
            vec![&TextureRef::File(PathBuf::from("wood.png"))]
        );
    }

    #[test]
    fn bump_is_a_height_map_and_norm_a_normal_map() {
        let material = tobj::Material {
            name: "bumpy".to_string(),
            normal_texture: Some("bump.png".to_string()),
            unknown_param: [("norm".to_string(), "normal.png".to_string())]
                .into_iter()
                .collect(),
            ..Default::default()
        };
        let source = to_source_material(&material);

        assert_eq!(
            source.textures_of(TextureKind::Height).collect::<Vec<_>>(),
            vec![&TextureRef::File(PathBuf::from("bump.png"))]
        );
        assert_eq!(
            source.textures_of(TextureKind::Normal).collect::<Vec<_>>(),
            vec![&TextureRef::File(PathBuf::from("normal.png"))]
        );
    }

    #[test]
    fn texture_v_is_flipped() {
        let model = tobj::Model {
            mesh: tobj::Mesh {
                positions: vec![0.0; 9],
                texcoords: vec![0.0, 0.25, 1.0, 1.0, 0.5, 0.0],
                indices: vec![0, 1, 2],
                ..Default::default()
            },
            name: String::new(),
        };
        let mesh = to_source_mesh(model);

        assert_eq!(mesh.name, None);
        assert!(mesh.normals.is_none());
        assert_eq!(mesh.tex_coords.unwrap(), vec![[0.0, 0.75], [1.0, 0.0], [0.5, 1.0]]);
    }
}
