use glam::Vec3;
use log::debug;

use crate::core::Mesh;
use crate::error::Result;

/// Options shared by the OBJ writer and the segmenter.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportConfig {
    /// Uniform geometry scale applied to the export copies.
    pub scale: f32,
    /// Add `offset` to every written vertex.
    pub feet_on_ground: bool,
    pub offset: Vec3,
    /// Write `vn` lines and reference them from faces.
    pub use_normals: bool,
    /// Export masked faces too instead of filtering them out.
    pub hidden_geom: bool,
    pub write_mtl: bool,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            scale: 1.0,
            feet_on_ground: false,
            offset: Vec3::ZERO,
            use_normals: true,
            hidden_geom: false,
            write_mtl: true,
        }
    }
}

impl ExportConfig {
    pub fn effective_offset(&self) -> Vec3 {
        if self.feet_on_ground {
            self.offset
        } else {
            Vec3::ZERO
        }
    }

    pub fn filter_masked_faces(&self) -> bool {
        !self.hidden_geom
    }
}

/// Clone every mesh for export: scale applied, masked faces dropped unless
/// `hidden_geom` asks for all geometry. The offset is left for the caller
/// to add per vertex.
pub fn prepare_meshes(meshes: &[Mesh], config: &ExportConfig) -> Result<Vec<Mesh>> {
    let mut prepared = Vec::with_capacity(meshes.len());
    for mesh in meshes {
        mesh.validate()?;
        let copy = if config.filter_masked_faces() {
            mesh.clone_for_export(config.scale, true)
        } else {
            mesh.unmasked().clone_for_export(config.scale, false)
        };
        debug!(
            "prepared {}: {} of {} vertices, {} faces",
            copy.name,
            copy.vertex_count(),
            mesh.vertex_count(),
            copy.face_count()
        );
        prepared.push(copy);
    }
    Ok(prepared)
}

/// Offset that lifts the lowest exported vertex (after scaling) onto y = 0.
/// With `hidden_geom` masked faces are exported too and count as well.
pub fn ground_offset(meshes: &[Mesh], config: &ExportConfig) -> Vec3 {
    let lowest = meshes
        .iter()
        .flat_map(|mesh| {
            let used = if config.filter_masked_faces() {
                visible_vertices(mesh)
            } else {
                mesh.referenced_vertices()
            };
            mesh.coord
                .iter()
                .zip(used)
                .filter(|(_, used)| *used)
                .map(|(co, _)| co.y * config.scale)
                .collect::<Vec<_>>()
        })
        .reduce(f32::min);

    match lowest {
        Some(min_y) => Vec3::new(0.0, -min_y, 0.0),
        None => Vec3::ZERO,
    }
}

fn visible_vertices(mesh: &Mesh) -> Vec<bool> {
    let mut used = vec![false; mesh.coord.len()];
    for (fv, &visible) in mesh.fvert.iter().zip(&mesh.face_mask) {
        if visible {
            for &v in fv {
                if let Some(slot) = used.get_mut(v as usize) {
                    *slot = true;
                }
            }
        }
    }
    used
}

/// File-name friendly version of `name`.
pub fn good_name(name: &str) -> String {
    let cleaned: String = name
        .trim()
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect();
    if cleaned.is_empty() {
        "untitled".to_string()
    } else {
        cleaned
    }
}
