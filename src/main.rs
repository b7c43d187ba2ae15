use std::fs::File;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use log::{error, info, warn, LevelFilter};
use simplelog::{
    ColorChoice, CombinedLogger, Config, SharedLogger, TermLogger, TerminalMode, WriteLogger,
};

use bodymesh::config::ground_offset;
use bodymesh::segment::{indices_path, write_indices};
use bodymesh::wavefront::{load_mtl, KeepPaths, TextureFolder, TextureResolver};
use bodymesh::{
    create_clap_command, handle_clap_matches, load_obj, log_level, segment, write_obj,
    BodyPart, CliCommand, ExportConfig, JointMap, Mesh, Result,
};

fn init_logging(level: LevelFilter, log_file: Option<&PathBuf>) -> Result<()> {
    let mut loggers: Vec<Box<dyn SharedLogger>> = vec![TermLogger::new(
        level,
        Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    )];
    if let Some(path) = log_file {
        loggers.push(WriteLogger::new(level, Config::default(), File::create(path)?));
    }
    if CombinedLogger::init(loggers).is_err() {
        eprintln!("logger already initialized");
    }
    Ok(())
}

fn load_meshes(inputs: &[PathBuf]) -> Result<Vec<Mesh>> {
    inputs.iter().map(load_obj).collect()
}

fn ground(meshes: &[Mesh], config: &mut ExportConfig) {
    if config.feet_on_ground {
        config.offset = ground_offset(meshes, config);
        info!("feet on ground, offset y {:.4}", config.offset.y);
    }
}

fn run_inspect(input: &Path) -> Result<()> {
    let mesh = load_obj(input)?;
    info!(
        "{}: {} vertices, {} faces, {} uvs",
        mesh.name,
        mesh.vertex_count(),
        mesh.face_count(),
        if mesh.has_uv { mesh.texco.len() } else { 0 }
    );
    for group in &mesh.face_groups {
        let faces = mesh.group.iter().filter(|&&g| g == group.idx).count();
        info!("  group {} ({} faces)", group.name, faces);
    }
    Ok(())
}

fn run_export(
    inputs: &[PathBuf],
    output: &Path,
    mut config: ExportConfig,
    material: Option<&PathBuf>,
    copy_textures: bool,
    joints: Option<&PathBuf>,
) -> Result<()> {
    let mut meshes = load_meshes(inputs)?;
    if let Some(mtl) = material {
        let materials = load_mtl(mtl)?;
        if materials.is_empty() {
            warn!("{} holds no materials", mtl.display());
        }
        for (i, mesh) in meshes.iter_mut().enumerate() {
            if let Some(mat) = materials.get(i).or_else(|| materials.last()) {
                info!("{}: {}", mesh.name, mat);
                mesh.material = mat.clone();
            }
        }
    }
    ground(&meshes, &mut config);

    // Nothing is written unless segmentation succeeds
    let segmentation = match joints {
        Some(joints) => Some(segment(&meshes, &JointMap::load(joints)?, &config)?),
        None => None,
    };

    if copy_textures && !meshes.iter().any(|mesh| mesh.material.has_textures()) {
        warn!("--copy-textures given but no material references a texture");
    }
    let mut resolver: Box<dyn TextureResolver> = if copy_textures {
        let root = output.parent().map(Path::to_path_buf).unwrap_or_default();
        Box::new(TextureFolder::new(root))
    } else {
        Box::new(KeepPaths)
    };
    let centering = write_obj(output, &meshes, &config, resolver.as_mut())?;
    info!("centering {:.4}", centering);

    if let Some(segmentation) = segmentation {
        write_indices(indices_path(output), &segmentation)?;
    }
    Ok(())
}

fn run_segment(
    inputs: &[PathBuf],
    output: Option<&PathBuf>,
    joints: &Path,
    mut config: ExportConfig,
) -> Result<()> {
    let meshes = load_meshes(inputs)?;
    ground(&meshes, &mut config);
    let joints = JointMap::load(joints)?;
    let segmentation = segment(&meshes, &joints, &config)?;
    for part in BodyPart::ALL {
        info!("{:>10}: {}", part.label(), segmentation.group(part).len());
    }
    let target = match output {
        Some(path) => path.clone(),
        None => inputs
            .first()
            .map(|input| indices_path(input))
            .unwrap_or_else(|| PathBuf::from("bodyIndices")),
    };
    write_indices(target, &segmentation)
}

fn main() -> ExitCode {
    let matches = create_clap_command().get_matches();
    if let Err(e) = init_logging(log_level(&matches), matches.get_one::<PathBuf>("log-file")) {
        eprintln!("could not open log file: {}", e);
        return ExitCode::FAILURE;
    }

    let Some(command) = handle_clap_matches(&matches) else {
        error!("no command given");
        return ExitCode::FAILURE;
    };

    let result = match command {
        CliCommand::Inspect { input } => run_inspect(&input),
        CliCommand::Export {
            inputs,
            output,
            config,
            material,
            copy_textures,
            joints,
        } => run_export(
            &inputs,
            &output,
            config,
            material.as_ref(),
            copy_textures,
            joints.as_ref(),
        ),
        CliCommand::Segment {
            inputs,
            output,
            joints,
            config,
        } => run_segment(&inputs, output.as_ref(), &joints, config),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn bad_joint_file_leaves_no_export() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("body.obj");
        fs::write(&input, "v 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 3\n").unwrap();
        let joints = dir.path().join("joints.json");
        fs::write(&joints, "{\"Head Center\": [0, 1]}").unwrap();
        let output = dir.path().join("out").join("human.obj");
        fs::create_dir_all(output.parent().unwrap()).unwrap();

        let result = run_export(
            &[input],
            &output,
            ExportConfig::default(),
            None,
            false,
            Some(&joints),
        );
        assert!(result.is_err());
        assert!(!output.exists());
        assert!(!output.with_extension("mtl").exists());
        assert!(!indices_path(&output).exists());
    }
}
