//! ScanBridge 厂商配置模块
//!
//! 实现厂商配置的加载、校验，以及配置驱动的厂商适配器

pub mod adapter;
pub mod builtin;
pub mod loader;

// 导出主要类型
pub use adapter::ProfileAdapter;
pub use builtin::{builtin_profiles, BUILTIN_PROFILES_JSON};
pub use loader::{build_profile, ProfileSet};
