//! 内置厂商配置表
//!
//! 九个厂商的配置以数据形式随crate发布，新增厂商只需增加一条JSON

use scanbridge_core::ScanError;

use crate::loader::ProfileSet;

/// 内置配置JSON
pub const BUILTIN_PROFILES_JSON: &str = include_str!("../profiles/builtin.json");

/// 加载内置配置表
pub fn builtin_profiles() -> Result<ProfileSet, ScanError> {
    ProfileSet::from_json(BUILTIN_PROFILES_JSON)
}
