//! Artifact stores.
//!
//! Generation never writes on its own; it hands every rendered artifact to
//! an [`ArtifactSink`]. [`DirectorySink`] writes under an output directory,
//! one subdirectory per target, replacing each file atomically.
//! [`MemorySink`] keeps everything in memory for tests and dry runs.

use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Component, Path, PathBuf};
use std::sync::Mutex;

use tempfile::NamedTempFile;

use crate::emit::Artifact;
use crate::error::{Error, Result};

/// Destination of rendered artifacts
pub trait ArtifactSink: Send + Sync {
    /// Store one artifact. Blocking; called from a blocking task.
    fn write(&self, artifact: &Artifact) -> Result<()>;
}

/// Path of an artifact relative to the store root: `<target>/<relative_path>`
pub fn artifact_path(artifact: &Artifact) -> Result<PathBuf> {
    let relative = &artifact.relative_path;
    let escapes = relative
        .components()
        .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
    if relative.as_os_str().is_empty() || escapes {
        return Err(Error::emit(format!(
            "{}: artifact path '{}' must stay inside the target directory",
            artifact.target,
            relative.display()
        )));
    }
    Ok(Path::new(artifact.target.as_str()).join(relative))
}

/// Writes artifacts below a root directory
#[derive(Debug, Clone)]
pub struct DirectorySink {
    root: PathBuf,
}

impl DirectorySink {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl ArtifactSink for DirectorySink {
    fn write(&self, artifact: &Artifact) -> Result<()> {
        let path = self.root.join(artifact_path(artifact)?);
        let parent = path
            .parent()
            .ok_or_else(|| Error::emit(format!("no parent directory for {}", path.display())))?;
        std::fs::create_dir_all(parent)?;

        // Same directory as the destination so the rename stays on one
        // filesystem
        let mut file = NamedTempFile::new_in(parent)?;
        file.write_all(artifact.contents.as_bytes())?;
        file.flush()?;
        file.persist(&path)?;
        log::debug!("wrote {}", path.display());
        Ok(())
    }
}

/// Keeps artifacts in memory, keyed by `<target>/<relative_path>`
#[derive(Debug, Default)]
pub struct MemorySink {
    files: Mutex<BTreeMap<PathBuf, String>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Contents stored at `path`
    pub fn get(&self, path: impl AsRef<Path>) -> Option<String> {
        self.files.lock().ok()?.get(path.as_ref()).cloned()
    }

    /// Every stored path, sorted
    pub fn paths(&self) -> Vec<PathBuf> {
        self.files
            .lock()
            .map(|files| files.keys().cloned().collect())
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.files.lock().map(|files| files.len()).unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ArtifactSink for MemorySink {
    fn write(&self, artifact: &Artifact) -> Result<()> {
        let path = artifact_path(artifact)?;
        let mut files = self
            .files
            .lock()
            .map_err(|_| Error::emit("artifact store lock poisoned"))?;
        files.insert(path, artifact.contents.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::templates::TargetFramework;
    use tempfile::tempdir;

    fn artifact(path: &str, contents: &str) -> Artifact {
        Artifact {
            target: TargetFramework::Slim,
            relative_path: PathBuf::from(path),
            contents: contents.to_string(),
        }
    }

    #[test]
    fn directory_sink_replaces_files() -> Result<()> {
        let dir = tempdir()?;
        let sink = DirectorySink::new(dir.path());
        sink.write(&artifact("config/routes.php", "<?php // one"))?;
        sink.write(&artifact("config/routes.php", "<?php // two"))?;

        let written = std::fs::read_to_string(dir.path().join("slim/config/routes.php"))?;
        assert_eq!(written, "<?php // two");
        let leftovers: Vec<_> = std::fs::read_dir(dir.path().join("slim/config"))?.collect();
        assert_eq!(leftovers.len(), 1);
        Ok(())
    }

    #[test]
    fn paths_must_stay_inside_the_target() {
        let sink = MemorySink::new();
        assert!(sink.write(&artifact("../escape.php", "")).is_err());
        assert!(sink.write(&artifact("/etc/passwd", "")).is_err());
        assert!(sink.write(&artifact("", "")).is_err());
        assert!(sink.is_empty());
    }

    #[test]
    fn memory_sink_keys_by_target() -> Result<()> {
        let sink = MemorySink::new();
        sink.write(&artifact("src/Handler/GetGameHandler.php", "<?php"))?;
        assert_eq!(sink.len(), 1);
        assert_eq!(
            sink.get("slim/src/Handler/GetGameHandler.php").as_deref(),
            Some("<?php")
        );
        assert_eq!(
            sink.paths(),
            vec![PathBuf::from("slim/src/Handler/GetGameHandler.php")]
        );
        Ok(())
    }
}
