use cgmath::InnerSpace;

use crate::{
    data_structures::model::ModelVertex,
    resources::source::SourceMesh,
};

/// Flatten a source mesh into interleaved vertices and its triangle indices.
///
/// Tangents and bitangents are only filled in when the mesh has texture
/// coordinates. Sources without their own tangents get them computed from
/// the triangles.
pub fn build_vertices(mesh: &SourceMesh) -> anyhow::Result<(Vec<ModelVertex>, Vec<u32>)> {
    let count = mesh.positions.len();
    if count == 0 {
        anyhow::bail!("mesh has no vertices");
    }
    if mesh.indices.is_empty() {
        anyhow::bail!("mesh has no triangles");
    }
    if mesh.indices.len() % 3 != 0 {
        anyhow::bail!("{} indices do not form triangles", mesh.indices.len());
    }
    if let Some(bad) = mesh.indices.iter().find(|&&i| i as usize >= count) {
        anyhow::bail!("index {} out of range for {} vertices", bad, count);
    }

    let mut vertices: Vec<ModelVertex> = mesh
        .positions
        .iter()
        .enumerate()
        .map(|(i, position)| ModelVertex {
            position: *position,
            tex_coords: mesh
                .tex_coords
                .as_ref()
                .and_then(|t| t.get(i).copied())
                .unwrap_or_default(),
            normal: mesh
                .normals
                .as_ref()
                .and_then(|n| n.get(i).copied())
                .unwrap_or_default(),
            tangent: [0.0; 3],
            bitangent: [0.0; 3],
        })
        .collect();

    if mesh.tex_coords.is_some() {
        match (&mesh.tangents, &mesh.bitangents) {
            (Some(tangents), Some(bitangents))
                if tangents.len() == count && bitangents.len() == count =>
            {
                for (v, (t, b)) in vertices.iter_mut().zip(tangents.iter().zip(bitangents)) {
                    v.tangent = *t;
                    v.bitangent = *b;
                }
            }
            _ => compute_tangents(&mut vertices, &mesh.indices),
        }
    }

    Ok((vertices, mesh.indices.clone()))
}

/// Per-vertex tangent frame averaged over the triangles sharing the vertex.
/// Triangles with degenerate texture coordinates do not contribute.
pub fn compute_tangents(vertices: &mut [ModelVertex], indices: &[u32]) {
    let mut triangles_included = vec![0u32; vertices.len()];

    for c in indices.chunks_exact(3) {
        let [i0, i1, i2] = [c[0] as usize, c[1] as usize, c[2] as usize];
        let (v0, v1, v2) = (vertices[i0], vertices[i1], vertices[i2]);

        let pos0: cgmath::Vector3<f32> = v0.position.into();
        let pos1: cgmath::Vector3<f32> = v1.position.into();
        let pos2: cgmath::Vector3<f32> = v2.position.into();

        let uv0: cgmath::Vector2<f32> = v0.tex_coords.into();
        let uv1: cgmath::Vector2<f32> = v1.tex_coords.into();
        let uv2: cgmath::Vector2<f32> = v2.tex_coords.into();

        let delta_pos1 = pos1 - pos0;
        let delta_pos2 = pos2 - pos0;
        let delta_uv1 = uv1 - uv0;
        let delta_uv2 = uv2 - uv0;

        //     delta_pos1 = delta_uv1.x * T + delta_uv1.y * B
        //     delta_pos2 = delta_uv2.x * T + delta_uv2.y * B
        let det = delta_uv1.x * delta_uv2.y - delta_uv1.y * delta_uv2.x;
        if det.abs() <= f32::EPSILON {
            continue;
        }
        let r = 1.0 / det;
        let tangent = (delta_pos1 * delta_uv2.y - delta_pos2 * delta_uv1.y) * r;
        // flipped for right-handed normal maps in wgpu's texture space
        let bitangent = (delta_pos2 * delta_uv1.x - delta_pos1 * delta_uv2.x) * -r;

        for i in [i0, i1, i2] {
            let v = &mut vertices[i];
            v.tangent = (tangent + cgmath::Vector3::from(v.tangent)).into();
            v.bitangent = (bitangent + cgmath::Vector3::from(v.bitangent)).into();
            triangles_included[i] += 1;
        }
    }

    for (v, n) in vertices.iter_mut().zip(triangles_included) {
        if n == 0 {
            continue;
        }
        let tangent = cgmath::Vector3::from(v.tangent) / n as f32;
        let bitangent = cgmath::Vector3::from(v.bitangent) / n as f32;
        v.tangent = normalize_or_zero(tangent).into();
        v.bitangent = normalize_or_zero(bitangent).into();
    }
}

fn normalize_or_zero(v: cgmath::Vector3<f32>) -> cgmath::Vector3<f32> {
    if v.magnitude2() > 0.0 { v.normalize() } else { v }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn triangle() -> SourceMesh {
        SourceMesh {
            positions: vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]],
            normals: Some(vec![[0.0, 0.0, 1.0]; 3]),
            tex_coords: Some(vec![[0.0, 0.0], [1.0, 0.0], [0.0, 1.0]]),
            indices: vec![0, 1, 2],
            ..Default::default()
        }
    }

    #[test]
    fn tangents_follow_u() {
        let (vertices, indices) = build_vertices(&triangle()).unwrap();
        assert_eq!(indices, vec![0, 1, 2]);
        for v in &vertices {
            assert_eq!(v.tangent, [1.0, 0.0, 0.0]);
            assert_eq!(v.bitangent, [0.0, -1.0, 0.0]);
        }
    }

    #[test]
    fn no_tex_coords_no_tangents() {
        let mesh = SourceMesh {
            tex_coords: None,
            ..triangle()
        };
        let (vertices, _) = build_vertices(&mesh).unwrap();
        assert!(vertices.iter().all(|v| v.tangent == [0.0; 3] && v.tex_coords == [0.0; 2]));
    }

    #[test]
    fn bad_indices_are_rejected() {
        let mesh = SourceMesh {
            indices: vec![0, 1, 7],
            ..triangle()
        };
        assert!(build_vertices(&mesh).is_err());
        assert!(build_vertices(&SourceMesh::default()).is_err());
    }
}
