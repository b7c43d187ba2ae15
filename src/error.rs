use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum BodyMeshError {
    #[error("{}:{line}: {message}", path.display())]
    Format {
        path: PathBuf,
        line: usize,
        message: String,
    },

    #[error(
        "Error loading OBJ file {}: Contains loose vertices, not connected to a face ({indices:?})",
        path.display()
    )]
    LooseVertices { path: PathBuf, indices: Vec<usize> },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("MTL load error: {0}")]
    Mtl(#[from] tobj::LoadError),

    #[error("joint file error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("missing joint: {0:?}")]
    MissingJoint(String),

    #[error("precondition failed: {0}")]
    Precondition(String),
}

pub type Result<T> = std::result::Result<T, BodyMeshError>;
