//! A filesystem-backed [`Loader`]: resolves `[Import]` paths relative to the
//! importing file's directory, the way a C include or the reference
//! implementation's `loadFile` does.
//!
//! Archive sources (`.cmod`/`.cjmod`) are named in spec.md §6 but reading a
//! zip-format archive is a thin collaborator concern the core treats as out
//! of scope (see `DESIGN.md`); paths ending in those extensions are reported
//! as [`LoadError::ArchiveUnsupported`] rather than silently treated as
//! plain text.

use crate::loader::{LoadError, Loader};
use std::path::{Path, PathBuf};

pub struct FsLoader {
    root: PathBuf,
}

impl FsLoader {
    /// `root` is the directory relative imports are resolved against when
    /// the importer itself has no directory component (e.g. the entry file).
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn resolve(&self, relative_path: &str, importer_context: &str) -> PathBuf {
        let importer_dir = Path::new(importer_context)
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or(&self.root);
        importer_dir.join(relative_path)
    }
}

impl Loader for FsLoader {
    fn load(&mut self, relative_path: &str, importer_context: &str) -> Result<String, LoadError> {
        if relative_path.ends_with(".cmod") || relative_path.ends_with(".cjmod") {
            return Err(LoadError::ArchiveUnsupported {
                path: relative_path.to_string(),
            });
        }
        let full_path = self.resolve(relative_path, importer_context);
        std::fs::read_to_string(&full_path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                LoadError::NotFound {
                    path: full_path.display().to_string(),
                }
            } else {
                LoadError::Io {
                    path: full_path.display().to_string(),
                    message: e.to_string(),
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loads_a_sibling_file_relative_to_the_importer() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("lib.chtl"), "[Template] @Style S {}").unwrap();
        let entry = dir.path().join("main.chtl");
        std::fs::write(&entry, "").unwrap();

        let mut loader = FsLoader::new(dir.path());
        let content = loader.load("lib.chtl", entry.to_str().unwrap()).unwrap();
        assert!(content.contains("@Style S"));
    }

    #[test]
    fn missing_file_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let mut loader = FsLoader::new(dir.path());
        let err = loader.load("ghost.chtl", "main.chtl").unwrap_err();
        assert!(matches!(err, LoadError::NotFound { .. }));
    }

    #[test]
    fn archive_paths_are_reported_as_unsupported() {
        let dir = tempfile::tempdir().unwrap();
        let mut loader = FsLoader::new(dir.path());
        let err = loader.load("lib.cmod", "main.chtl").unwrap_err();
        assert!(matches!(err, LoadError::ArchiveUnsupported { .. }));
    }
}
