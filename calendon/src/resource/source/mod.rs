//! [AssetSources](super::AssetSource) provided by the engine.

pub mod constant;
pub mod fs;
pub mod list;

pub use constant::ConstantAssetSource;
pub use fs::FileSystemSource;
pub use list::AssetSourceList;
