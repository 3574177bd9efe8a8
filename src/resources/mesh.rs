use wgpu::util::DeviceExt;

use crate::{data_structures::model, resources::obj::MeshData};

/**
 * Obj files don't come with tangents and bitangents so they have to be calculated for
 * normal maps to work correctly.
 *
 * Every triangle contributes its tangent frame to its three corners and the sums are
 * averaged. Triangles whose UVs collapse to a line carry no tangent information and
 * are skipped.
 */
pub fn compute_tangents(vertices: &mut [model::ModelVertex], indices: &[u32]) {
    let mut triangles_included = vec![0u32; vertices.len()];

    for c in indices.chunks_exact(3) {
        let [i0, i1, i2] = [c[0] as usize, c[1] as usize, c[2] as usize];
        if i0 >= vertices.len() || i1 >= vertices.len() || i2 >= vertices.len() {
            continue;
        }
        let v0 = vertices[i0];
        let v1 = vertices[i1];
        let v2 = vertices[i2];

        let pos0: cgmath::Vector3<_> = v0.position.into();
        let pos1: cgmath::Vector3<_> = v1.position.into();
        let pos2: cgmath::Vector3<_> = v2.position.into();

        let uv0: cgmath::Vector2<_> = v0.tex_coords.into();
        let uv1: cgmath::Vector2<_> = v1.tex_coords.into();
        let uv2: cgmath::Vector2<_> = v2.tex_coords.into();

        // Calculate the edges of the triangle
        let delta_pos1 = pos1 - pos0;
        let delta_pos2 = pos2 - pos0;

        // This will give us a direction to calculate the
        // tangent and bitangent
        let delta_uv1 = uv1 - uv0;
        let delta_uv2 = uv2 - uv0;

        // Solving the following system of equations will
        // give us the tangent and bitangent.
        //     delta_pos1 = delta_uv1.x * T + delta_uv1.y * B
        //     delta_pos2 = delta_uv2.x * T + delta_uv2.y * B
        let det = delta_uv1.x * delta_uv2.y - delta_uv1.y * delta_uv2.x;
        if det.abs() <= f32::EPSILON {
            continue;
        }
        let r = 1.0 / det;
        let tangent = (delta_pos1 * delta_uv2.y - delta_pos2 * delta_uv1.y) * r;
        // We flip the bitangent to enable right-handed normal
        // maps with wgpu texture coordinate system
        let bitangent = (delta_pos2 * delta_uv1.x - delta_pos1 * delta_uv2.x) * -r;

        for i in [i0, i1, i2] {
            let v = &mut vertices[i];
            v.tangent = (tangent + cgmath::Vector3::from(v.tangent)).into();
            v.bitangent = (bitangent + cgmath::Vector3::from(v.bitangent)).into();
            // Used to average the tangents/bitangents
            triangles_included[i] += 1;
        }
    }

    // Average the tangents/bitangents
    for (v, n) in vertices.iter_mut().zip(triangles_included) {
        if n == 0 {
            continue;
        }
        let denom = 1.0 / n as f32;
        v.tangent = (cgmath::Vector3::from(v.tangent) * denom).into();
        v.bitangent = (cgmath::Vector3::from(v.bitangent) * denom).into();
    }
}

/// Uploads one parsed mesh. `material` is its slot in the owning model's table.
pub fn upload_mesh(
    device: &wgpu::Device,
    data: &MeshData,
    material: Option<usize>,
    file_name: &str,
) -> model::Mesh {
    let mut vertices = data.vertices.clone();
    compute_tangents(&mut vertices, &data.indices);

    let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some(&format!("{file_name}:{} Vertex Buffer", data.name)),
        contents: bytemuck::cast_slice(&vertices),
        usage: wgpu::BufferUsages::VERTEX,
    });

    let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some(&format!("{file_name}:{} Index Buffer", data.name)),
        contents: bytemuck::cast_slice(&data.indices),
        usage: wgpu::BufferUsages::INDEX,
    });

    model::Mesh {
        name: data.name.clone(),
        vertex_buffer,
        index_buffer,
        num_elements: data.indices.len() as u32,
        material,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_structures::model::ModelVertex;

    fn vertex(position: [f32; 3], tex_coords: [f32; 2]) -> ModelVertex {
        ModelVertex {
            position,
            tex_coords,
            normal: [0.0, 0.0, 1.0],
            ..Default::default()
        }
    }

    #[test]
    fn tangent_follows_u_axis() {
        let mut vertices = vec![
            vertex([0.0, 0.0, 0.0], [0.0, 0.0]),
            vertex([1.0, 0.0, 0.0], [1.0, 0.0]),
            vertex([0.0, 1.0, 0.0], [0.0, 1.0]),
        ];
        compute_tangents(&mut vertices, &[0, 1, 2]);
        for v in &vertices {
            assert_eq!(v.tangent, [1.0, 0.0, 0.0]);
            assert_eq!(v.bitangent, [0.0, -1.0, 0.0]);
        }
    }

    #[test]
    fn degenerate_uvs_leave_tangents_zeroed() {
        let mut vertices = vec![
            vertex([0.0, 0.0, 0.0], [0.5, 0.5]),
            vertex([1.0, 0.0, 0.0], [0.5, 0.5]),
            vertex([0.0, 1.0, 0.0], [0.5, 0.5]),
            vertex([3.0, 3.0, 3.0], [0.0, 0.0]),
        ];
        compute_tangents(&mut vertices, &[0, 1, 2]);
        for v in &vertices {
            assert!(v.tangent.iter().all(|c| c.is_finite()));
            assert_eq!(v.tangent, [0.0; 3]);
        }
    }
}
