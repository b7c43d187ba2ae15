use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, warn};

use crate::error::Result;

/// Decides which path a material file embeds for a texture.
pub trait TextureResolver {
    fn relocate(&mut self, texture: &Path) -> Result<String>;
}

/// Embed texture paths exactly as the material holds them.
#[derive(Debug, Default, Clone, Copy)]
pub struct KeepPaths;

impl TextureResolver for KeepPaths {
    fn relocate(&mut self, texture: &Path) -> Result<String> {
        Ok(texture.to_string_lossy().into_owned())
    }
}

/// Copies textures into a folder beside the exported OBJ and embeds paths
/// relative to the OBJ. Each source file is copied once per export.
#[derive(Debug)]
pub struct TextureFolder {
    root: PathBuf,
    subdir: String,
    copied: HashMap<PathBuf, String>,
}

impl TextureFolder {
    pub const DEFAULT_SUBDIR: &'static str = "textures";

    /// `root` is the directory the OBJ is written to.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self::with_subdir(root, Self::DEFAULT_SUBDIR)
    }

    pub fn with_subdir(root: impl Into<PathBuf>, subdir: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            subdir: subdir.into(),
            copied: HashMap::new(),
        }
    }

    /// Absolute folder the textures land in.
    pub fn folder(&self) -> PathBuf {
        self.root.join(&self.subdir)
    }

    pub fn copied(&self) -> impl Iterator<Item = (&Path, &str)> {
        self.copied.iter().map(|(src, dst)| (src.as_path(), dst.as_str()))
    }

    fn unique_name(&self, texture: &Path) -> String {
        let file_name = texture
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "texture".to_string());
        let taken = |candidate: &str| {
            self.copied
                .values()
                .any(|embedded| embedded.rsplit('/').next() == Some(candidate))
        };
        if !taken(&file_name) {
            return file_name;
        }
        let stem = texture
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "texture".to_string());
        let ext = texture
            .extension()
            .map(|e| format!(".{}", e.to_string_lossy()))
            .unwrap_or_default();
        (1..)
            .map(|n| format!("{}_{}{}", stem, n, ext))
            .find(|candidate| !taken(candidate))
            .unwrap_or(file_name)
    }
}

impl TextureResolver for TextureFolder {
    fn relocate(&mut self, texture: &Path) -> Result<String> {
        if let Some(embedded) = self.copied.get(texture) {
            return Ok(embedded.clone());
        }

        let folder = self.folder();
        fs::create_dir_all(&folder)?;
        let name = self.unique_name(texture);
        let target = folder.join(&name);
        if target.as_path() == texture {
            warn!("texture {} already in place", texture.display());
        } else {
            fs::copy(texture, &target)?;
        }
        debug!("copied texture {} to {}", texture.display(), target.display());

        let embedded = format!("{}/{}", self.subdir, name);
        self.copied.insert(texture.to_path_buf(), embedded.clone());
        Ok(embedded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keep_paths_is_identity() {
        let mut keep = KeepPaths;
        assert_eq!(keep.relocate(Path::new("skin/young.png")).unwrap(), "skin/young.png");
    }

    #[test]
    fn folder_copies_once_and_dedupes_names() {
        let src = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        let a = src.path().join("a");
        let b = src.path().join("b");
        fs::create_dir_all(&a).unwrap();
        fs::create_dir_all(&b).unwrap();
        fs::write(a.join("skin.png"), b"first").unwrap();
        fs::write(b.join("skin.png"), b"second").unwrap();

        let mut folder = TextureFolder::new(out.path());
        let first = folder.relocate(&a.join("skin.png")).unwrap();
        let again = folder.relocate(&a.join("skin.png")).unwrap();
        let second = folder.relocate(&b.join("skin.png")).unwrap();

        assert_eq!(first, "textures/skin.png");
        assert_eq!(again, first);
        assert_eq!(second, "textures/skin_1.png");
        assert_eq!(fs::read(out.path().join("textures/skin_1.png")).unwrap(), b"second");
        assert_eq!(folder.copied().count(), 2);
    }

    #[test]
    fn missing_texture_is_io_error() {
        let out = tempfile::tempdir().unwrap();
        let mut folder = TextureFolder::new(out.path());
        assert!(folder.relocate(Path::new("/nonexistent/skin.png")).is_err());
    }
}
