//! Wavefront OBJ / MTL reading and writing.

mod parser;
mod texture;
mod writer;

use std::fs;
use std::path::{Path, PathBuf};

pub use parser::{load_mtl, load_obj, parse_obj};
pub use texture::{KeepPaths, TextureFolder, TextureResolver};
pub use writer::{write_material, write_obj};

use crate::error::Result;

/// Write `contents` next to `path` first and rename it into place, so a
/// failed export never leaves a truncated file behind.
pub(crate) fn write_atomic(path: &Path, contents: &[u8]) -> Result<()> {
    write_atomic_all(&[(path, contents)])
}

/// Stage every file as `<name>.tmp` before the first rename; renames run in
/// the given order. A failure removes whatever temporary files are left.
pub(crate) fn write_atomic_all(files: &[(&Path, &[u8])]) -> Result<()> {
    let tmps: Vec<PathBuf> = files.iter().map(|(path, _)| tmp_path(path)).collect();
    let cleanup = |from: usize| {
        for tmp in &tmps[from..] {
            let _ = fs::remove_file(tmp);
        }
    };

    for (tmp, (_, contents)) in tmps.iter().zip(files) {
        if let Err(err) = fs::write(tmp, contents) {
            cleanup(0);
            return Err(err.into());
        }
    }
    for (i, (tmp, (path, _))) in tmps.iter().zip(files).enumerate() {
        if let Err(err) = fs::rename(tmp, path) {
            cleanup(i);
            return Err(err.into());
        }
    }
    Ok(())
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}
