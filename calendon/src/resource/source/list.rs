use chrono::{DateTime, Utc};

use crate::resource::path::AssetPath;
use crate::resource::{AssetLoadError, AssetSource};

/// [AssetSource] that wraps multiple sub-sources.
///
/// Sub-sources are tried in order, and the first one that has the asset wins. A sub-source
/// failing with anything other than [NotFound](AssetLoadError::NotFound) stops the search.
#[derive(Default)]
pub struct AssetSourceList {
    sources: Vec<Box<dyn AssetSource>>,
}

impl AssetSourceList {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a lower priority source.
    pub fn push(&mut self, source: impl AssetSource) {
        self.sources.push(Box::new(source));
    }

    /// Append a lower priority source, builder style.
    #[inline]
    pub fn with(mut self, source: impl AssetSource) -> Self {
        self.push(source);
        self
    }

    #[inline]
    pub fn len(&self) -> usize { self.sources.len() }

    #[inline]
    pub fn is_empty(&self) -> bool { self.sources.is_empty() }

    fn first_found<T>(
        &self,
        path: &AssetPath,
        f: impl Fn(&dyn AssetSource) -> Result<T, AssetLoadError>,
    ) -> Result<T, AssetLoadError> {
        for source in &self.sources {
            match f(source.as_ref()) {
                Ok(value) => return Ok(value),
                Err(AssetLoadError::NotFound(_)) => {},
                Err(e) => return Err(e),
            }
        }
        Err(AssetLoadError::NotFound(path.clone()))
    }
}

impl FromIterator<Box<dyn AssetSource>> for AssetSourceList {
    fn from_iter<T: IntoIterator<Item = Box<dyn AssetSource>>>(iter: T) -> Self {
        Self {
            sources: iter.into_iter().collect(),
        }
    }
}

impl AssetSource for AssetSourceList {
    fn read(&self, path: &AssetPath) -> Result<Vec<u8>, AssetLoadError> {
        self.first_found(path, |source| source.read(path))
    }

    fn last_modified(&self, path: &AssetPath) -> Result<DateTime<Utc>, AssetLoadError> {
        self.first_found(path, |source| source.last_modified(path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use rstest::rstest;

    use crate::resource::source::constant::ConstantAssetSource;

    struct FailingSource;

    impl AssetSource for FailingSource {
        fn read(&self, _path: &AssetPath) -> Result<Vec<u8>, AssetLoadError> {
            Err("disk on fire".into())
        }

        fn last_modified(&self, _path: &AssetPath) -> Result<DateTime<Utc>, AssetLoadError> {
            Err("disk on fire".into())
        }
    }

    fn list() -> AssetSourceList {
        AssetSourceList::new()
            .with(ConstantAssetSource::builder()
                .asset("shared", b"first")
                .asset("only_first", b"1")
                .build())
            .with(ConstantAssetSource::builder()
                .asset("shared", b"second")
                .asset("only_second", b"2")
                .build())
    }

    #[rstest]
    #[case::priority("shared", Some(b"first".as_slice()))]
    #[case::first("only_first", Some(b"1".as_slice()))]
    #[case::fallback("only_second", Some(b"2".as_slice()))]
    #[case::missing("nowhere", None)]
    fn test_read(#[case] path: &str, #[case] expected: Option<&[u8]>) {
        let result = list().read(&AssetPath::from(path));
        match expected {
            Some(data) => assert_eq!(result.unwrap(), data),
            None => assert_matches!(result, Err(AssetLoadError::NotFound(_))),
        }
    }

    #[test]
    fn test_error_stops_search() {
        let list = AssetSourceList::new()
            .with(FailingSource)
            .with(ConstantAssetSource::builder().asset("a", b"a").build());
        assert_matches!(list.read(&"a".into()), Err(AssetLoadError::ReadError(_)));
    }

    #[test]
    fn test_from_iter() {
        let sources: Vec<Box<dyn AssetSource>> = vec![
            Box::new(ConstantAssetSource::builder().asset("a", b"a").build()),
        ];
        let list: AssetSourceList = sources.into_iter().collect();
        assert_eq!(list.len(), 1);
        assert!(list.last_modified(&"a".into()).is_ok());
    }
}
