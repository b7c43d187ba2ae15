use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use glam::{Vec2, Vec3};
use log::{debug, error, warn};

use crate::core::geometry::{Material, Mesh, Quad, DEFAULT_GROUP};
use crate::error::{BodyMeshError, Result};

/// Load a Wavefront OBJ file as a single smooth shaded mesh.
///
/// Normals in the file are ignored and recomputed; hard edges need duplicate
/// vertices. Materials are not read, see [`load_mtl`] for that.
pub fn load_obj(path: impl AsRef<Path>) -> Result<Mesh> {
    let path = path.as_ref();
    let name = path
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| "mesh".to_string());
    let file = File::open(path)?;
    parse_obj(BufReader::new(file), path, &name)
}

/// Parse OBJ text from any buffered reader. `path` is only used in errors.
pub fn parse_obj<R: BufRead>(reader: R, path: &Path, name: &str) -> Result<Mesh> {
    let mut mesh = Mesh::new(name);

    let mut verts: Vec<Vec3> = Vec::new();
    let mut uvs: Vec<Vec2> = Vec::new();
    let mut fverts: Vec<Quad> = Vec::new();
    let mut fuvs: Vec<Quad> = Vec::new();
    let mut groups: Vec<usize> = Vec::new();
    let mut has_uv = false;

    let mut face_groups: HashMap<String, usize> = HashMap::new();
    let mut current_group: Option<usize> = None;

    for (line_idx, line) in reader.lines().enumerate() {
        let line = line?;
        let line_no = line_idx + 1;
        let mut tokens = line.split_whitespace();
        let Some(command) = tokens.next() else {
            continue;
        };
        let args: Vec<&str> = tokens.collect();
        let fail = |message: String| BodyMeshError::Format {
            path: path.to_path_buf(),
            line: line_no,
            message,
        };

        match command {
            "v" => {
                let [x, y, z] = parse_floats::<3>(&args).map_err(fail)?;
                verts.push(Vec3::new(x, y, z));
            }
            "vt" => {
                let [u, v] = parse_floats::<2>(&args).map_err(fail)?;
                uvs.push(Vec2::new(u, v));
            }
            "f" => {
                let group = match current_group {
                    Some(group) => group,
                    None => *face_groups
                        .entry(DEFAULT_GROUP.to_string())
                        .or_insert_with(|| mesh.create_face_group(DEFAULT_GROUP)),
                };
                current_group = Some(group);

                let (fv, fuv, with_uv) = parse_face(&args).map_err(fail)?;
                has_uv |= with_uv;
                fverts.push(fv);
                fuvs.push(fuv);
                groups.push(group);
            }
            "g" => {
                let fg_name = args.first().copied().unwrap_or(DEFAULT_GROUP);
                let group = *face_groups
                    .entry(fg_name.to_string())
                    .or_insert_with(|| mesh.create_face_group(fg_name));
                current_group = Some(group);
            }
            "o" => {
                if let Some(obj_name) = args.first() {
                    mesh.name = obj_name.to_string();
                }
            }
            "usemtl" | "mtllib" | "vn" | "s" => {}
            _ if command.starts_with('#') => {}
            _ => warn!("{}:{}: ignoring '{}'", path.display(), line_no, command),
        }
    }

    mesh.set_coords(verts);
    mesh.set_uvs(uvs);
    mesh.set_faces(fverts, has_uv.then_some(fuvs), groups);
    mesh.check_topology()?;

    let stray: Vec<usize> = mesh
        .referenced_vertices()
        .iter()
        .enumerate()
        .filter(|(_, used)| !**used)
        .map(|(idx, _)| idx)
        .collect();
    if !stray.is_empty() {
        let err = BodyMeshError::LooseVertices {
            path: path.to_path_buf(),
            indices: stray,
        };
        error!("{}", err);
        return Err(err);
    }

    mesh.calc_normals();
    mesh.update_index_buffer();

    debug!(
        "loaded {} from {}: {} vertices, {} faces, {} uvs, {} groups",
        mesh.name,
        path.display(),
        mesh.vertex_count(),
        mesh.face_count(),
        mesh.texco.len(),
        mesh.face_groups.len()
    );
    Ok(mesh)
}

fn parse_floats<const N: usize>(args: &[&str]) -> std::result::Result<[f32; N], String> {
    if args.len() < N {
        return Err(format!("expected {} numbers, found {}", N, args.len()));
    }
    let mut out = [0.0; N];
    for (slot, token) in out.iter_mut().zip(args) {
        *slot = token
            .parse::<f32>()
            .map_err(|_| format!("invalid number '{}'", token))?;
    }
    Ok(out)
}

fn parse_index(token: &str) -> std::result::Result<u32, String> {
    match token.parse::<u32>() {
        Ok(idx) if idx >= 1 => Ok(idx - 1), // obj is 1 based
        _ => Err(format!("invalid index '{}'", token)),
    }
}

/// Vertex quad, uv quad and whether the face carried uv references.
fn parse_face(args: &[&str]) -> std::result::Result<(Quad, Quad, bool), String> {
    if args.len() != 3 && args.len() != 4 {
        return Err(format!(
            "faces need 3 or 4 vertices, found {}",
            args.len()
        ));
    }

    let mut v_indices = Vec::with_capacity(4);
    let mut uv_indices = Vec::with_capacity(4);
    for face_data in args {
        let mut info = face_data.split('/');
        v_indices.push(parse_index(info.next().unwrap_or(""))?);

        if let Some(uv) = info.next().filter(|uv| !uv.is_empty()) {
            uv_indices.push(parse_index(uv)?);
        }
    }

    if v_indices.len() == 3 {
        v_indices.push(v_indices[0]);
    }
    let with_uv = !uv_indices.is_empty();
    if uv_indices.len() == 3 {
        uv_indices.push(uv_indices[0]);
    }

    let fv = [v_indices[0], v_indices[1], v_indices[2], v_indices[3]];
    let fuv = if uv_indices.len() == 4 {
        [uv_indices[0], uv_indices[1], uv_indices[2], uv_indices[3]]
    } else {
        [0; 4]
    };
    Ok((fv, fuv, with_uv))
}

/// Read every material of an MTL library.
pub fn load_mtl(path: impl AsRef<Path>) -> Result<Vec<Material>> {
    let (materials, _) = tobj::load_mtl(path.as_ref())?;
    Ok(materials.into_iter().map(Material::from_tobj).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(text: &str) -> Result<Mesh> {
        parse_obj(text.as_bytes(), Path::new("test.obj"), "test")
    }

    #[test]
    fn triangles_become_degenerate_quads() {
        let mesh = parse("v 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 3\n").unwrap();
        assert_eq!(mesh.fvert, vec![[0, 1, 2, 0]]);
        assert!(!mesh.has_uv);
        assert_eq!(mesh.fuvs, vec![[0; 4]]);
    }

    #[test]
    fn loose_vertices_are_rejected_with_their_indices() {
        let err = parse("v 0 0 0\nv 1 0 0\nv 5 5 5\nv 0 1 0\nf 1 2 4\n").unwrap_err();
        match err {
            BodyMeshError::LooseVertices { indices, path } => {
                assert_eq!(indices, vec![2]);
                assert_eq!(path, Path::new("test.obj"));
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn uv_refs_switch_on_uvs_for_the_whole_mesh() {
        let text = "\
v 0 0 0
v 1 0 0
v 1 1 0
v 0 1 0
vt 0 0
vt 1 0
vt 1 1
f 1/1 2/2 3/3
f 1 3 4
";
        let mesh = parse(text).unwrap();
        assert!(mesh.has_uv);
        assert_eq!(mesh.fuvs, vec![[0, 1, 2, 0], [0, 0, 0, 0]]);
        assert_eq!(mesh.texco.len(), 3);
    }

    #[test]
    fn normal_refs_are_skipped() {
        let mesh = parse("v 0 0 0\nv 1 0 0\nv 0 1 0\nvn 0 0 1\nf 1//1 2//1 3//1\n").unwrap();
        assert!(!mesh.has_uv);
        assert_eq!(mesh.fvert, vec![[0, 1, 2, 0]]);
        assert_eq!(mesh.vnorm[0], Vec3::Z);
    }

    #[test]
    fn groups_and_object_name() {
        let text = "\
o body
v 0 0 0
v 1 0 0
v 1 1 0
v 0 1 0
f 1 2 3
g arm
f 1 3 4
g default-dummy-group
f 2 3 4
g arm
f 1 2 4
";
        let mesh = parse(text).unwrap();
        assert_eq!(mesh.name, "body");
        let names: Vec<&str> = mesh.face_groups.iter().map(|g| g.name.as_str()).collect();
        assert_eq!(names, vec!["default-dummy-group", "arm"]);
        assert_eq!(mesh.group, vec![0, 1, 0, 1]);
    }

    #[test]
    fn malformed_vertex_reports_line() {
        let err = parse("v 0 0 0\nv 1 zero 0\n").unwrap_err();
        match err {
            BodyMeshError::Format { line, .. } => assert_eq!(line, 2),
            other => panic!("unexpected error {other:?}"),
        }
        assert!(matches!(
            parse("v 0 0\n"),
            Err(BodyMeshError::Format { line: 1, .. })
        ));
    }

    #[test]
    fn polygons_and_bad_indices_are_format_errors() {
        let five = "v 0 0 0\nv 1 0 0\nv 1 1 0\nv 0 1 0\nv 2 2 0\nf 1 2 3 4 5\n";
        assert!(matches!(parse(five), Err(BodyMeshError::Format { line: 6, .. })));
        let zero = "v 0 0 0\nv 1 0 0\nv 0 1 0\nf 0 1 2\n";
        assert!(matches!(parse(zero), Err(BodyMeshError::Format { .. })));
    }

    #[test]
    fn out_of_range_face_is_a_precondition_error() {
        let text = "v 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 9\n";
        assert!(matches!(parse(text), Err(BodyMeshError::Precondition(_))));
    }

    #[test]
    fn missing_file_is_io_error() {
        assert!(matches!(
            load_obj("/nonexistent/dir/body.obj"),
            Err(BodyMeshError::Io(_))
        ));
    }
}
