use super::{process, Material};
use crate::error::{BodyMeshError, Result};
use glam::{Vec2, Vec3};

/// Four vertex (or UV) indices. Triangles repeat their first index in the last slot.
pub type Quad = [u32; 4];

pub const DEFAULT_GROUP: &str = "default-dummy-group";

#[derive(Debug, Clone, PartialEq)]
pub struct FaceGroup {
    pub name: String,
    pub idx: usize,
}

#[derive(Debug, Clone)]
pub struct Mesh {
    pub name: String,
    pub coord: Vec<Vec3>,         // Vertex positions, index is the vertex id
    pub vnorm: Vec<Vec3>,         // One smooth normal per vertex
    pub texco: Vec<Vec2>,         // UV coordinates, empty unless has_uv
    pub fvert: Vec<Quad>,         // Faces as vertex index quads
    pub fuvs: Vec<Quad>,          // Faces as UV index quads
    pub face_mask: Vec<bool>,     // true = face is visible / exported
    pub face_groups: Vec<FaceGroup>,
    pub group: Vec<usize>,        // Face group index of every face
    pub has_uv: bool,
    pub material: Material,
    pub index_buffer: Vec<u32>,   // Triangle list of the visible faces
}

impl Mesh {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            coord: Vec::new(),
            vnorm: Vec::new(),
            texco: Vec::new(),
            fvert: Vec::new(),
            fuvs: Vec::new(),
            face_mask: Vec::new(),
            face_groups: Vec::new(),
            group: Vec::new(),
            has_uv: false,
            material: Material::default(),
            index_buffer: Vec::new(),
        }
    }

    /// Build a UV-less mesh with every face in the default group, normals computed.
    pub fn from_quads(name: impl Into<String>, coord: Vec<Vec3>, fvert: Vec<Quad>) -> Self {
        let mut mesh = Mesh::new(name);
        let group = mesh.create_face_group(DEFAULT_GROUP);
        let groups = vec![group; fvert.len()];
        mesh.set_coords(coord);
        mesh.set_faces(fvert, None, groups);
        mesh.calc_normals();
        mesh.update_index_buffer();
        mesh
    }

    pub fn create_face_group(&mut self, name: impl Into<String>) -> usize {
        let idx = self.face_groups.len();
        self.face_groups.push(FaceGroup {
            name: name.into(),
            idx,
        });
        idx
    }

    pub fn face_group(&self, name: &str) -> Option<&FaceGroup> {
        self.face_groups.iter().find(|fg| fg.name == name)
    }

    pub fn set_coords(&mut self, coord: Vec<Vec3>) {
        self.coord = coord;
    }

    pub fn set_uvs(&mut self, texco: Vec<Vec2>) {
        self.texco = texco;
    }

    /// Replace the face list. Without `fuvs` the mesh has no UV mapping and
    /// every face gets a zero UV quad. All faces start visible.
    pub fn set_faces(&mut self, fvert: Vec<Quad>, fuvs: Option<Vec<Quad>>, groups: Vec<usize>) {
        let count = fvert.len();
        self.has_uv = fuvs.is_some();
        self.fuvs = fuvs.unwrap_or_else(|| vec![[0; 4]; count]);
        self.fvert = fvert;
        self.group = groups;
        self.face_mask = vec![true; count];
    }

    pub fn vertex_count(&self) -> usize {
        self.coord.len()
    }

    pub fn face_count(&self) -> usize {
        self.fvert.len()
    }

    pub fn visible_face_count(&self) -> usize {
        self.face_mask.iter().filter(|&&visible| visible).count()
    }

    pub fn change_face_mask(&mut self, mask: Vec<bool>) -> Result<()> {
        if mask.len() != self.fvert.len() {
            return Err(BodyMeshError::Precondition(format!(
                "mesh {}: face mask has {} entries for {} faces",
                self.name,
                mask.len(),
                self.fvert.len()
            )));
        }
        self.face_mask = mask;
        self.update_index_buffer();
        Ok(())
    }

    pub fn calc_normals(&mut self) {
        process::compute_normals(self);
    }

    pub fn update_index_buffer(&mut self) {
        self.index_buffer = process::build_index_buffer(self);
    }

    /// Flag per vertex, true when at least one face uses it.
    pub fn referenced_vertices(&self) -> Vec<bool> {
        let mut used = vec![false; self.coord.len()];
        for fv in &self.fvert {
            for &v in fv {
                if let Some(slot) = used.get_mut(v as usize) {
                    *slot = true;
                }
            }
        }
        used
    }

    /// Check the parallel-array and index-range invariants.
    pub fn validate(&self) -> Result<()> {
        self.check_topology()?;
        if self.vnorm.len() != self.coord.len() {
            return Err(BodyMeshError::Precondition(format!(
                "mesh {}: {} normals for {} vertices",
                self.name,
                self.vnorm.len(),
                self.coord.len()
            )));
        }
        Ok(())
    }

    /// Face arrays are parallel and every face index is in range.
    pub fn check_topology(&self) -> Result<()> {
        let faces = self.fvert.len();
        let parallel = [
            ("fuvs", self.fuvs.len()),
            ("face_mask", self.face_mask.len()),
            ("group", self.group.len()),
        ];
        for (field, len) in parallel {
            if len != faces {
                return Err(BodyMeshError::Precondition(format!(
                    "mesh {}: {} has {} entries for {} faces",
                    self.name, field, len, faces
                )));
            }
        }
        for (fn_idx, fv) in self.fvert.iter().enumerate() {
            if let Some(&v) = fv.iter().find(|&&v| v as usize >= self.coord.len()) {
                return Err(BodyMeshError::Precondition(format!(
                    "mesh {}: face {} references vertex {} but only {} exist",
                    self.name,
                    fn_idx,
                    v,
                    self.coord.len()
                )));
            }
        }
        if self.has_uv {
            for (fn_idx, fuv) in self.fuvs.iter().enumerate() {
                if let Some(&t) = fuv.iter().find(|&&t| t as usize >= self.texco.len()) {
                    return Err(BodyMeshError::Precondition(format!(
                        "mesh {}: face {} references uv {} but only {} exist",
                        self.name,
                        fn_idx,
                        t,
                        self.texco.len()
                    )));
                }
            }
        }
        if let Some(&g) = self.group.iter().find(|&&g| g >= self.face_groups.len()) {
            return Err(BodyMeshError::Precondition(format!(
                "mesh {}: face group {} does not exist",
                self.name, g
            )));
        }
        Ok(())
    }

    /// Export-local copy with `scale` applied. With `filter_masked` the copy
    /// only keeps visible faces and the vertices and UVs they reference,
    /// renumbered in their original relative order.
    pub fn clone_for_export(&self, scale: f32, filter_masked: bool) -> Mesh {
        let mut out = if filter_masked {
            self.filtered_copy()
        } else {
            self.clone()
        };
        for co in &mut out.coord {
            *co *= scale;
        }
        out
    }

    /// Copy with every face visible again (hidden geometry export).
    pub fn unmasked(&self) -> Mesh {
        let mut out = self.clone();
        out.face_mask = vec![true; out.fvert.len()];
        out.calc_normals();
        out.update_index_buffer();
        out
    }

    fn filtered_copy(&self) -> Mesh {
        let kept: Vec<usize> = (0..self.fvert.len())
            .filter(|&i| self.face_mask[i])
            .collect();

        let mut vert_map: Vec<Option<u32>> = vec![None; self.coord.len()];
        let mut uv_map: Vec<Option<u32>> = vec![None; self.texco.len()];
        for &f in &kept {
            for &v in &self.fvert[f] {
                vert_map[v as usize] = Some(0);
            }
            if self.has_uv {
                for &t in &self.fuvs[f] {
                    uv_map[t as usize] = Some(0);
                }
            }
        }

        let mut coord = Vec::new();
        let mut vnorm = Vec::new();
        for (old, slot) in vert_map.iter_mut().enumerate() {
            if slot.is_some() {
                *slot = Some(coord.len() as u32);
                coord.push(self.coord[old]);
                vnorm.push(self.vnorm.get(old).copied().unwrap_or(Vec3::ZERO));
            }
        }
        let mut texco = Vec::new();
        for (old, slot) in uv_map.iter_mut().enumerate() {
            if slot.is_some() {
                *slot = Some(texco.len() as u32);
                texco.push(self.texco[old]);
            }
        }

        let remap = |quad: &Quad, map: &[Option<u32>]| -> Quad {
            quad.map(|i| map[i as usize].unwrap_or(0))
        };
        let fvert: Vec<Quad> = kept.iter().map(|&f| remap(&self.fvert[f], &vert_map)).collect();
        let fuvs: Vec<Quad> = if self.has_uv {
            kept.iter().map(|&f| remap(&self.fuvs[f], &uv_map)).collect()
        } else {
            vec![[0; 4]; kept.len()]
        };

        let mut out = Mesh {
            name: self.name.clone(),
            coord,
            vnorm,
            texco,
            face_mask: vec![true; fvert.len()],
            group: kept.iter().map(|&f| self.group[f]).collect(),
            fvert,
            fuvs,
            face_groups: self.face_groups.clone(),
            has_uv: self.has_uv,
            material: self.material.clone(),
            index_buffer: Vec::new(),
        };
        out.update_index_buffer();
        out
    }

    /// Unit cube made of six quads, handy as a known closed surface.
    pub fn create_cube() -> Self {
        let coord = vec![
            Vec3::new(-1.0, -1.0, -1.0),
            Vec3::new(1.0, -1.0, -1.0),
            Vec3::new(1.0, 1.0, -1.0),
            Vec3::new(-1.0, 1.0, -1.0),
            Vec3::new(-1.0, -1.0, 1.0),
            Vec3::new(1.0, -1.0, 1.0),
            Vec3::new(1.0, 1.0, 1.0),
            Vec3::new(-1.0, 1.0, 1.0),
        ];

        #[rustfmt::skip]
        let fvert = vec![
            [0, 3, 2, 1], // Back
            [4, 5, 6, 7], // Front
            [1, 2, 6, 5], // Right
            [0, 4, 7, 3], // Left
            [3, 7, 6, 2], // Top
            [0, 1, 5, 4], // Bottom
        ];

        Mesh::from_quads("cube", coord, fvert)
    }
}
