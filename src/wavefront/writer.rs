use std::io::Write;
use std::path::Path;

use log::{debug, info};

use super::texture::TextureResolver;
use super::{write_atomic, write_atomic_all};
use crate::config::{good_name, prepare_meshes, ExportConfig};
use crate::core::geometry::{Material, Mesh};
use crate::error::Result;
use crate::util::format_g;

/// Write `meshes` as one OBJ file (plus an MTL library next to it when
/// `config.write_mtl`). Returns the vertical centering hint, the midpoint of
/// the lowest and highest written y coordinate.
///
/// Face line layout depends on the available channels:
/// ```text
/// f v/t/n ...   normals and uvs
/// f v//n ...    normals only
/// f v/t ...     uvs only
/// f v ...       positions only
/// ```
pub fn write_obj(
    path: impl AsRef<Path>,
    meshes: &[Mesh],
    config: &ExportConfig,
    textures: &mut dyn TextureResolver,
) -> Result<f32> {
    let path = path.as_ref();
    let meshes = prepare_meshes(meshes, config)?;
    let offset = config.effective_offset();
    let mtl_path = path.with_extension("mtl");

    let mut obj: Vec<u8> = Vec::new();
    writeln!(obj, "# bodymesh exported OBJ")?;
    writeln!(obj, "# meshes: {}", meshes.len())?;
    writeln!(obj)?;

    if config.write_mtl {
        let mtl_name = mtl_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        writeln!(obj, "mtllib {}", mtl_name)?;
    }

    // Vertices
    let mut y_range: Option<(f32, f32)> = None;
    for mesh in &meshes {
        for co in &mesh.coord {
            let co = *co + offset;
            writeln!(obj, "v {:.4} {:.4} {:.4}", co.x, co.y, co.z)?;
            y_range = Some(match y_range {
                Some((lo, hi)) => (lo.min(co.y), hi.max(co.y)),
                None => (co.y, co.y),
            });
        }
    }

    // Vertex normals
    if config.use_normals {
        for mesh in &meshes {
            for no in &mesh.vnorm {
                writeln!(obj, "vn {:.4} {:.4} {:.4}", no.x, no.y, no.z)?;
            }
        }
    }

    // UV vertices
    for mesh in &meshes {
        if mesh.has_uv {
            for uv in &mesh.texco {
                writeln!(obj, "vt {:.6} {:.6}", uv.x, uv.y)?;
            }
        }
    }

    // Faces
    let mut n_verts = 1;
    let mut n_tex_verts = 1;
    for mesh in &meshes {
        writeln!(obj, "usemtl {}", good_name(&mesh.material.name))?;
        writeln!(obj, "g {}", good_name(&mesh.name))?;
        write_faces(&mut obj, mesh, config.use_normals, n_verts, n_tex_verts)?;

        n_verts += mesh.coord.len() as u32;
        n_tex_verts += mesh.texco.len() as u32;
    }

    let mtl = if config.write_mtl {
        let mut mtl: Vec<u8> = Vec::new();
        writeln!(mtl, "# bodymesh exported MTL")?;
        writeln!(mtl, "# materials: {}", meshes.len())?;
        writeln!(mtl)?;
        for mesh in &meshes {
            write_material(&mut mtl, &mesh.material, textures)?;
        }
        Some(mtl)
    } else {
        None
    };

    // The library goes in first so `mtllib` never names a missing file
    match &mtl {
        Some(mtl) => {
            write_atomic_all(&[(mtl_path.as_path(), mtl.as_slice()), (path, obj.as_slice())])?;
            debug!("wrote {}", mtl_path.display());
        }
        None => write_atomic(path, &obj)?,
    }

    let centering = y_range.map_or(0.0, |(lo, hi)| (lo + hi) / 2.0);
    info!(
        "wrote {} ({} meshes, {} vertices), centering {:.4}",
        path.display(),
        meshes.len(),
        n_verts - 1,
        centering
    );
    Ok(centering)
}

fn write_faces(
    out: &mut impl Write,
    mesh: &Mesh,
    use_normals: bool,
    n_verts: u32,
    n_tex_verts: u32,
) -> Result<()> {
    for (fn_idx, fv) in mesh.fvert.iter().enumerate() {
        if !mesh.face_mask[fn_idx] {
            continue;
        }
        let fuv = &mesh.fuvs[fn_idx];

        write!(out, "f")?;
        for n in 0..4 {
            let v = fv[n] + n_verts;
            let t = fuv[n] + n_tex_verts;
            match (use_normals, mesh.has_uv) {
                (true, true) => write!(out, " {}/{}/{}", v, t, v)?,
                (true, false) => write!(out, " {}//{}", v, v)?,
                (false, true) => write!(out, " {}/{}", v, t)?,
                (false, false) => write!(out, " {}", v)?,
            }
        }
        writeln!(out)?;
    }
    Ok(())
}

/// One `newmtl` block. Opacity is written as 0 whenever a diffuse texture is
/// present so the texture alpha drives transparency.
pub fn write_material(
    out: &mut impl Write,
    mat: &Material,
    textures: &mut dyn TextureResolver,
) -> Result<()> {
    writeln!(out)?;
    writeln!(out, "newmtl {}", good_name(&mat.name))?;

    let diff = mat.diffuse_color;
    let spec = mat.specular_color;
    let alpha = if mat.diffuse_texture.is_some() {
        0.0
    } else {
        mat.opacity
    };
    writeln!(
        out,
        "Kd {} {} {}",
        format_g(diff.r, 4),
        format_g(diff.g, 4),
        format_g(diff.b, 4)
    )?;
    writeln!(
        out,
        "Ks {} {} {}",
        format_g(spec.r, 4),
        format_g(spec.g, 4),
        format_g(spec.b, 4)
    )?;
    writeln!(out, "d {}", format_g(alpha, 4))?;

    write_texture(out, "map_Kd", mat.diffuse_texture.as_deref(), textures)?;
    write_texture(out, "map_D", mat.diffuse_texture.as_deref(), textures)?;
    write_texture(out, "map_Ks", mat.specular_map_texture.as_deref(), textures)?;
    // Normal maps travel with the export but stay out of the MTL, some
    // importers read map_Disp / bump entries as opacity.
    if let Some(normal_map) = mat.normal_map_texture.as_deref() {
        textures.relocate(Path::new(normal_map))?;
    }
    Ok(())
}

fn write_texture(
    out: &mut impl Write,
    key: &str,
    texture: Option<&str>,
    textures: &mut dyn TextureResolver,
) -> Result<()> {
    let Some(texture) = texture else {
        return Ok(());
    };
    let new_path = textures.relocate(Path::new(texture))?;
    writeln!(out, "{} {}", key, new_path)?;
    Ok(())
}
