//! 内存存储实现模块
//!
//! 用于测试和未配置数据库时运行：
//! - ConfigurationStore: InMemoryConfigurationStore
//! - AssetStore: InMemoryAssetStore

pub mod asset;
pub mod configuration;

pub use asset::*;
pub use configuration::*;
