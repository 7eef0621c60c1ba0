//! 扫码归一化错误定义

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ScanError {
    /// 没有任何厂商配置认领该片段
    #[error("No matching profile for action '{source_id}'")]
    NoMatchingProfile { source_id: String },

    /// 载荷格式错误（长度越界、缺少必需字段等）
    #[error("Malformed payload for profile '{profile}': {reason}")]
    MalformedPayload { profile: String, reason: String },

    /// 流式缓冲区超过上限
    #[error("Assembly overflow on device '{device_id}': buffer exceeded {limit} bytes")]
    AssemblyOverflow { device_id: String, limit: usize },

    /// 两个配置声明了同一个动作标识
    #[error("Configuration conflict: action '{action}' claimed by both '{first}' and '{second}'")]
    ConfigurationConflict {
        action: String,
        first: String,
        second: String,
    },

    /// 配置定义本身无效
    #[error("Invalid profile: {0}")]
    InvalidProfile(String),
}

impl ScanError {
    /// 构造载荷错误
    pub fn malformed(profile: &str, reason: impl Into<String>) -> Self {
        ScanError::MalformedPayload {
            profile: profile.to_string(),
            reason: reason.into(),
        }
    }

    /// 加载期错误（拒绝启动）
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            ScanError::ConfigurationConflict { .. } | ScanError::InvalidProfile(_)
        )
    }

    /// 错误类别名，用于诊断输出
    pub fn kind(&self) -> &'static str {
        match self {
            ScanError::NoMatchingProfile { .. } => "no_matching_profile",
            ScanError::MalformedPayload { .. } => "malformed_payload",
            ScanError::AssemblyOverflow { .. } => "assembly_overflow",
            ScanError::ConfigurationConflict { .. } => "configuration_conflict",
            ScanError::InvalidProfile(_) => "invalid_profile",
        }
    }
}

impl From<serde_json::Error> for ScanError {
    fn from(e: serde_json::Error) -> Self {
        ScanError::InvalidProfile(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fatal_classification() {
        let conflict = ScanError::ConfigurationConflict {
            action: "a".to_string(),
            first: "x".to_string(),
            second: "y".to_string(),
        };
        assert!(conflict.is_fatal());
        assert!(!ScanError::malformed("x", "short").is_fatal());
        assert_eq!(
            ScanError::malformed("urovo", "length missing").to_string(),
            "Malformed payload for profile 'urovo': length missing"
        );
    }
}
