//! Filesystem-backed resources.

use std::fs;
use std::path::{Component, Path, PathBuf};

use glaze_buffer::{percent_decode, ResourceLoader, ResourceWriter};
use glaze_core::{CodecError, ResourceNotFound, Result};

/// Loads and stores relative URIs inside one directory.
///
/// URIs are percent-decoded and must stay inside the root: absolute paths
/// and `..` components are refused.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryResources {
    root: PathBuf,
}

impl DirectoryResources {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Directory that contains `file`, e.g. the `.gltf` being parsed.
    pub fn beside(file: impl AsRef<Path>) -> Self {
        let parent = file.as_ref().parent().unwrap_or_else(|| Path::new("."));
        Self::new(parent)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_of(&self, uri: &str) -> Option<PathBuf> {
        let decoded = String::from_utf8(percent_decode(uri).ok()?).ok()?;
        let relative = Path::new(&decoded);
        let inside = relative
            .components()
            .all(|c| matches!(c, Component::Normal(_) | Component::CurDir));
        inside.then(|| self.root.join(relative))
    }
}

impl ResourceLoader for DirectoryResources {
    fn load(&self, uri: &str) -> std::result::Result<Vec<u8>, ResourceNotFound> {
        let path = self.path_of(uri).ok_or_else(|| ResourceNotFound::new(uri))?;
        fs::read(&path).map_err(|err| {
            tracing::debug!(target: "glaze", uri, error = %err, "resource load failed");
            ResourceNotFound::new(uri)
        })
    }
}

impl ResourceWriter for DirectoryResources {
    fn store(&mut self, uri: &str, bytes: &[u8]) -> Result<()> {
        let path = self.path_of(uri).ok_or_else(|| CodecError::ResourceWrite {
            uri: uri.to_string(),
            reason: "URI leaves the resource directory".into(),
        })?;
        let write = |path: &Path| -> std::io::Result<()> {
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(path, bytes)
        };
        write(&path).map_err(|err| CodecError::ResourceWrite {
            uri: uri.to_string(),
            reason: err.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("glaze-io-{name}-{}", std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        dir
    }

    #[test]
    fn test_store_then_load() {
        let dir = scratch("store");
        let mut res = DirectoryResources::new(&dir);
        res.store("textures/a%20b.bin", &[7, 8]).unwrap();
        assert!(dir.join("textures/a b.bin").exists());
        assert_eq!(res.load("textures/a%20b.bin").unwrap(), vec![7, 8]);
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_escaping_uris_refused() {
        let dir = scratch("escape");
        let mut res = DirectoryResources::new(&dir);
        assert!(res.load("../secret.bin").is_err());
        assert!(matches!(
            res.store("/etc/passwd", &[]),
            Err(CodecError::ResourceWrite { .. })
        ));
    }

    #[test]
    fn test_beside_file() {
        let res = DirectoryResources::beside("/models/scene.gltf");
        assert_eq!(res.root(), Path::new("/models"));
    }
}
