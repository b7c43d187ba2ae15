use std::path::PathBuf;

use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use log::LevelFilter;

pub mod config;
pub mod core;
pub mod error;
pub mod segment;
pub mod util;
pub mod wavefront;

pub use config::ExportConfig;
pub use crate::core::geometry;
pub use crate::core::{Color, Material, Mesh};
pub use error::{BodyMeshError, Result};
pub use segment::{segment, BodyPart, JointMap, Segmentation};
pub use util::format_g;
pub use wavefront::{load_obj, write_obj};

/// What the command line asked for.
#[derive(Debug, Clone, PartialEq)]
pub enum CliCommand {
    Inspect {
        input: PathBuf,
    },
    Export {
        inputs: Vec<PathBuf>,
        output: PathBuf,
        config: ExportConfig,
        material: Option<PathBuf>,
        copy_textures: bool,
        joints: Option<PathBuf>,
    },
    Segment {
        inputs: Vec<PathBuf>,
        output: Option<PathBuf>,
        joints: PathBuf,
        config: ExportConfig,
    },
}

fn inputs_arg() -> Arg {
    Arg::new("inputs")
        .value_name("OBJ")
        .help("One or more .obj files, exported in the given order")
        .required(true)
        .num_args(1..)
        .value_parser(value_parser!(PathBuf))
}

fn geometry_args(cmd: Command) -> Command {
    cmd.arg(
        Arg::new("scale")
            .long("scale")
            .value_name("FACTOR")
            .help("Uniform scale applied to the exported geometry")
            .default_value("1.0")
            .value_parser(value_parser!(f32)),
    )
    .arg(
        Arg::new("feet-on-ground")
            .long("feet-on-ground")
            .help("Move the geometry up or down so its lowest point sits at y = 0")
            .action(ArgAction::SetTrue),
    )
    .arg(
        Arg::new("hidden-geom")
            .long("hidden-geom")
            .help("Also export faces hidden by the face mask")
            .action(ArgAction::SetTrue),
    )
}

pub fn create_clap_command() -> Command {
    Command::new("bodymesh")
        .about("Export body meshes to Wavefront OBJ/MTL and split them into body parts")
        .version(env!("CARGO_PKG_VERSION"))
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("More logging, repeat for trace output")
                .global(true)
                .action(ArgAction::Count),
        )
        .arg(
            Arg::new("log-file")
                .long("log-file")
                .value_name("FILE")
                .help("Also write the log to FILE")
                .global(true)
                .value_parser(value_parser!(PathBuf)),
        )
        .subcommand(
            Command::new("inspect")
                .about("Load an OBJ file and print a summary")
                .arg(
                    Arg::new("input")
                        .value_name("OBJ")
                        .required(true)
                        .value_parser(value_parser!(PathBuf)),
                ),
        )
        .subcommand(geometry_args(
            Command::new("export")
                .about("Write meshes as one OBJ file with an MTL library")
                .arg(inputs_arg())
                .arg(
                    Arg::new("output")
                        .short('o')
                        .long("output")
                        .value_name("FILE")
                        .help("Target .obj path, the .mtl goes next to it")
                        .required(true)
                        .value_parser(value_parser!(PathBuf)),
                )
                .arg(
                    Arg::new("no-normals")
                        .long("no-normals")
                        .help("Leave out vn lines")
                        .action(ArgAction::SetTrue),
                )
                .arg(
                    Arg::new("no-mtl")
                        .long("no-mtl")
                        .help("Do not write an MTL library")
                        .action(ArgAction::SetTrue),
                )
                .arg(
                    Arg::new("material")
                        .long("material")
                        .value_name("MTL")
                        .help("Material library; its materials are assigned to the meshes in order")
                        .value_parser(value_parser!(PathBuf)),
                )
                .arg(
                    Arg::new("copy-textures")
                        .long("copy-textures")
                        .help("Copy textures into a folder next to the OBJ")
                        .action(ArgAction::SetTrue),
                )
                .arg(
                    Arg::new("joints")
                        .long("joints")
                        .value_name("JSON")
                        .help("Joint positions; also writes the <name>Indices body part file")
                        .value_parser(value_parser!(PathBuf)),
                ),
        ))
        .subcommand(geometry_args(
            Command::new("segment")
                .about("Write only the body part index file")
                .arg(inputs_arg())
                .arg(
                    Arg::new("joints")
                        .long("joints")
                        .value_name("JSON")
                        .required(true)
                        .value_parser(value_parser!(PathBuf)),
                )
                .arg(
                    Arg::new("output")
                        .short('o')
                        .long("output")
                        .value_name("FILE")
                        .help("Defaults to <first input stem>Indices")
                        .value_parser(value_parser!(PathBuf)),
                ),
        ))
}

fn geometry_config(matches: &ArgMatches) -> ExportConfig {
    ExportConfig {
        scale: matches.get_one::<f32>("scale").copied().unwrap_or(1.0),
        feet_on_ground: matches.get_flag("feet-on-ground"),
        hidden_geom: matches.get_flag("hidden-geom"),
        ..Default::default()
    }
}

fn paths(matches: &ArgMatches, id: &str) -> Vec<PathBuf> {
    matches
        .get_many::<PathBuf>(id)
        .map(|values| values.cloned().collect())
        .unwrap_or_default()
}

pub fn handle_clap_matches(matches: &ArgMatches) -> Option<CliCommand> {
    match matches.subcommand() {
        Some(("inspect", sub)) => Some(CliCommand::Inspect {
            input: sub.get_one::<PathBuf>("input")?.clone(),
        }),
        Some(("export", sub)) => {
            let mut config = geometry_config(sub);
            config.use_normals = !sub.get_flag("no-normals");
            config.write_mtl = !sub.get_flag("no-mtl");
            Some(CliCommand::Export {
                inputs: paths(sub, "inputs"),
                output: sub.get_one::<PathBuf>("output")?.clone(),
                config,
                material: sub.get_one::<PathBuf>("material").cloned(),
                copy_textures: sub.get_flag("copy-textures"),
                joints: sub.get_one::<PathBuf>("joints").cloned(),
            })
        }
        Some(("segment", sub)) => Some(CliCommand::Segment {
            inputs: paths(sub, "inputs"),
            output: sub.get_one::<PathBuf>("output").cloned(),
            joints: sub.get_one::<PathBuf>("joints")?.clone(),
            config: geometry_config(sub),
        }),
        _ => None,
    }
}

pub fn log_level(matches: &ArgMatches) -> LevelFilter {
    match matches.get_count("verbose") {
        0 => LevelFilter::Info,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    }
}
