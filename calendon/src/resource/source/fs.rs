//! [AssetSource] backed by the filesystem.

use chrono::{DateTime, Utc};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::trace;

use crate::log::TARGET_ASSETS;
use crate::resource::path::AssetPath;
use crate::resource::{AssetLoadError, AssetSource};

/// [AssetSource] reading files below a root asset directory.
///
/// An [AssetPath] maps onto the file at `root/<path>`. Missing files are reported as
/// [NotFound](AssetLoadError::NotFound), so a [list](super::list::AssetSourceList) can fall back
/// to other sources.
#[derive(Debug, Clone)]
pub struct FileSystemSource {
    root: PathBuf,
}

impl FileSystemSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
        }
    }

    #[inline]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Filesystem path an asset maps to.
    #[inline]
    pub fn file_path(&self, path: &AssetPath) -> PathBuf {
        self.root.join(path.to_path_buf())
    }

    fn map_io_error(path: &AssetPath, error: std::io::Error) -> AssetLoadError {
        match error.kind() {
            ErrorKind::NotFound => AssetLoadError::NotFound(path.clone()),
            _ => error.into(),
        }
    }
}

impl AssetSource for FileSystemSource {
    fn read(&self, path: &AssetPath) -> Result<Vec<u8>, AssetLoadError> {
        let file_path = self.file_path(path);
        let data = std::fs::read(&file_path)
            .map_err(|err| Self::map_io_error(path, err))?;
        trace!(target: TARGET_ASSETS, ?file_path, len = data.len(), "Read asset");
        Ok(data)
    }

    fn last_modified(&self, path: &AssetPath) -> Result<DateTime<Utc>, AssetLoadError> {
        let file_path = self.file_path(path);
        let modified = std::fs::metadata(&file_path)
            .and_then(|metadata| metadata.modified())
            .map_err(|err| Self::map_io_error(path, err))?;
        Ok(DateTime::<Utc>::from(modified))
    }
}
