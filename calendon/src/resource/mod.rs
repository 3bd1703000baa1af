//! Asset loading.
//!
//! Engine subsystems read raw asset bytes (shaders, sprite images, fonts) through the
//! [AssetSource] trait, addressing them with an [AssetPath]. Loading is synchronous and reads each
//! asset to completion.
//!
//! Sources provided by the engine live in [source]:
//!  * [FileSystemSource](source::fs::FileSystemSource) reads files below an asset directory.
//!  * [ConstantAssetSource](source::constant::ConstantAssetSource) serves static data embedded in
//!    the binary, such as the default shaders.
//!  * [AssetSourceList](source::list::AssetSourceList) tries several sources in priority order.

use chrono::{DateTime, Utc};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;

use crate::resource::path::AssetPath;

pub mod path;
pub mod source;

/// Error that can occur while reading asset data.
#[derive(Debug, Clone)]
pub enum AssetLoadError {
    /// There was no asset found at the given [path](AssetPath).
    NotFound(AssetPath),

    /// Some other error occurred while reading asset data.
    ReadError(Arc<dyn Error + Send + Sync + 'static>),
}

impl AssetLoadError {
    /// Convenience method for creating an [AssetLoadError::ReadError].
    #[inline]
    pub fn from_error(e: impl Error + Send + Sync + 'static) -> Self {
        Self::ReadError(Arc::new(e))
    }
}

impl<'a> From<&'a str> for AssetLoadError {
    #[inline]
    fn from(value: &'a str) -> Self {
        Self::ReadError(Box::<dyn Error + Send + Sync>::from(value).into())
    }
}

impl From<String> for AssetLoadError {
    #[inline]
    fn from(value: String) -> Self {
        Self::ReadError(Box::<dyn Error + Send + Sync>::from(value).into())
    }
}

impl From<std::io::Error> for AssetLoadError {
    #[inline]
    fn from(value: std::io::Error) -> Self {
        Self::ReadError(Arc::new(value))
    }
}

impl Display for AssetLoadError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound(path) => write!(f, "No asset found at path: '{path}'"),
            Self::ReadError(err) => Display::fmt(&err, f),
        }
    }
}

impl Error for AssetLoadError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::ReadError(err) => Some(err.as_ref()),
            _ => None,
        }
    }
}

/// Provider of raw asset bytes.
pub trait AssetSource: Send + Sync + 'static {
    /// Read the full contents of an asset.
    fn read(&self, path: &AssetPath) -> Result<Vec<u8>, AssetLoadError>;

    /// When the asset was last modified.
    fn last_modified(&self, path: &AssetPath) -> Result<DateTime<Utc>, AssetLoadError>;

    /// Read an asset as UTF-8 text.
    fn read_text(&self, path: &AssetPath) -> Result<String, AssetLoadError> {
        String::from_utf8(self.read(path)?)
            .map_err(AssetLoadError::from_error)
    }
}

impl<S: AssetSource + ?Sized> AssetSource for Box<S> {
    #[inline]
    fn read(&self, path: &AssetPath) -> Result<Vec<u8>, AssetLoadError> {
        (**self).read(path)
    }

    #[inline]
    fn last_modified(&self, path: &AssetPath) -> Result<DateTime<Utc>, AssetLoadError> {
        (**self).last_modified(path)
    }

    #[inline]
    fn read_text(&self, path: &AssetPath) -> Result<String, AssetLoadError> {
        (**self).read_text(path)
    }
}

impl<S: AssetSource + ?Sized> AssetSource for Arc<S> {
    #[inline]
    fn read(&self, path: &AssetPath) -> Result<Vec<u8>, AssetLoadError> {
        (**self).read(path)
    }

    #[inline]
    fn last_modified(&self, path: &AssetPath) -> Result<DateTime<Utc>, AssetLoadError> {
        (**self).last_modified(path)
    }

    #[inline]
    fn read_text(&self, path: &AssetPath) -> Result<String, AssetLoadError> {
        (**self).read_text(path)
    }
}
