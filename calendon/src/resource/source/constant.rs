use ahash::HashMap;
use chrono::{DateTime, Utc};

use crate::resource::path::AssetPath;
use crate::resource::{AssetLoadError, AssetSource};

/// [AssetSource] that contains static global data.
///
/// This source holds static byte references that never change, which is useful for embedding
/// assets in built binaries. The engine's default shaders are served this way. Constant assets
/// report the Unix epoch as their modification time.
#[derive(Debug, Default)]
pub struct ConstantAssetSource {
    raw: HashMap<AssetPath, &'static [u8]>,
}

impl ConstantAssetSource {
    /// Create a ConstantAssetSourceBuilder, used to build a ConstantAssetSource.
    #[inline]
    pub fn builder() -> ConstantAssetSourceBuilder {
        ConstantAssetSourceBuilder::default()
    }

    /// Whether an asset exists at `path`.
    #[inline]
    pub fn contains(&self, path: &AssetPath) -> bool {
        self.raw.contains_key(path)
    }
}

impl AssetSource for ConstantAssetSource {
    fn read(&self, path: &AssetPath) -> Result<Vec<u8>, AssetLoadError> {
        self.raw.get(path)
            .map(|data| data.to_vec())
            .ok_or_else(|| AssetLoadError::NotFound(path.clone()))
    }

    fn last_modified(&self, path: &AssetPath) -> Result<DateTime<Utc>, AssetLoadError> {
        if self.contains(path) {
            Ok(DateTime::<Utc>::UNIX_EPOCH)
        } else {
            Err(AssetLoadError::NotFound(path.clone()))
        }
    }
}

/// Builder pattern for [ConstantAssetSources](ConstantAssetSource).
#[derive(Debug, Default)]
pub struct ConstantAssetSourceBuilder {
    raw: HashMap<AssetPath, &'static [u8]>,
}

impl ConstantAssetSourceBuilder {
    /// Define an individual asset's static data.
    #[inline]
    pub fn asset(mut self, path: impl Into<AssetPath>, data: &'static [u8]) -> Self {
        self.raw.insert(path.into(), data);
        self
    }

    /// Build the [ConstantAssetSource].
    #[inline]
    pub fn build(self) -> ConstantAssetSource {
        ConstantAssetSource { raw: self.raw }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read() {
        let source = ConstantAssetSource::builder()
            .asset("a/b.txt", b"value")
            .build();
        assert_eq!(source.read(&"a/b.txt".into()).unwrap(), b"value");
        assert_eq!(source.read_text(&"/a//b.txt".into()).unwrap(), "value");
        assert_matches!(
            source.read(&"a/c.txt".into()),
            Err(AssetLoadError::NotFound(path)) => {
                assert_eq!(path.as_str(), "a/c.txt");
            }
        );
    }

    #[test]
    fn test_last_modified() {
        let source = ConstantAssetSource::builder()
            .asset("a", b"")
            .build();
        assert_eq!(source.last_modified(&"a".into()).unwrap(), DateTime::<Utc>::UNIX_EPOCH);
        assert_matches!(source.last_modified(&"b".into()), Err(AssetLoadError::NotFound(_)));
    }

    #[test]
    fn test_read_text_invalid_utf8() {
        let source = ConstantAssetSource::builder()
            .asset("bad", b"\xFF\xFE")
            .build();
        assert_matches!(source.read_text(&"bad".into()), Err(AssetLoadError::ReadError(_)));
    }
}
