use glam::Vec3;

use crate::core::geometry::mesh::{Mesh, Quad};

pub fn is_triangle(fv: &Quad) -> bool {
    fv[3] == fv[0]
}

/// Area weighted face normal. The cross product of the diagonals also covers
/// degenerate quads, where it reduces to the triangle normal.
pub fn compute_normal(fv: &Quad, coord: &[Vec3]) -> Vec3 {
    let [a, b, c, d] = fv.map(|i| coord[i as usize]);
    (c - a).cross(d - b)
}

pub fn compute_normals(mesh: &mut Mesh) {
    mesh.vnorm.clear();
    mesh.vnorm.resize(mesh.coord.len(), Vec3::ZERO);

    for fv in &mesh.fvert {
        let normal = compute_normal(fv, &mesh.coord);
        let corners = if is_triangle(fv) { 3 } else { 4 };

        for &v in &fv[..corners] {
            mesh.vnorm[v as usize] += normal;
        }
    }

    for normal in &mut mesh.vnorm {
        *normal = normal.normalize_or_zero();
    }
}

/// Triangle list for the visible faces; quads are split along the 0-2 diagonal.
pub fn build_index_buffer(mesh: &Mesh) -> Vec<u32> {
    let mut indices = Vec::with_capacity(mesh.fvert.len() * 6);
    for (fv, &visible) in mesh.fvert.iter().zip(&mesh.face_mask) {
        if !visible {
            continue;
        }
        indices.extend_from_slice(&[fv[0], fv[1], fv[2]]);
        if !is_triangle(fv) {
            indices.extend_from_slice(&[fv[0], fv[2], fv[3]]);
        }
    }
    indices
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn degenerate_quad_normal_matches_triangle() {
        let coord = [Vec3::ZERO, Vec3::X, Vec3::Y];
        let n = compute_normal(&[0, 1, 2, 0], &coord);
        assert_eq!(n.normalize(), Vec3::Z);
    }

    #[test]
    fn triangles_emit_one_index_triple() {
        let mesh = Mesh::from_quads("tri", vec![Vec3::ZERO, Vec3::X, Vec3::Y], vec![[0, 1, 2, 0]]);
        assert_eq!(mesh.index_buffer, vec![0, 1, 2]);
        assert!(mesh.vnorm.iter().all(|n| *n == Vec3::Z));
    }
}
