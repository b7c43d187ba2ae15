mod mat;
mod mesh;
pub mod process;

pub use mat::Material;
pub use mesh::{FaceGroup, Mesh, Quad, DEFAULT_GROUP};
