//! ScanBridge Core Library
//!
//! This crate provides the core abstractions and data structures for the
//! scan event normalization system.

pub mod error;
pub mod profile_meta;
pub mod symbology;
pub mod utils;

// 导出错误类型
pub use error::ScanError;

// 导出元数据类型，便于其他模块使用
pub use profile_meta::*;
pub use symbology::{apply_gs1_separator, Symbology, SymbologyTable, TypeToken, GROUP_SEPARATOR};

/// 厂商适配器接口 - 引擎与厂商差异的分离点
pub trait VendorAdapter: Send + Sync {
    /// 获取厂商配置
    fn profile(&self) -> &VendorProfile;

    /// 认领：片段的动作标识是否属于本厂商
    fn claim(&self, fragment: &RawFragment) -> bool;

    /// 拆解：从片段中取出数据、类型、长度或流式数据块
    fn extract(&self, fragment: &RawFragment) -> Result<FragmentParts, ScanError>;

    /// 获取厂商名称
    fn name(&self) -> &str {
        &self.profile().name
    }
}
