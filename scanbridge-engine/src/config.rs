//! 引擎配置
//!
//! 与厂商无关的运行参数，可由JSON提供，缺省字段取默认值

use scanbridge_core::ScanError;
use serde::{Deserialize, Serialize};

/// 引擎配置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// 配置未声明max_buffer时的流式缓冲上限（None表示不设上限）
    pub default_max_buffer: Option<usize>,
    /// 乱序重排窗口
    pub reorder_window: usize,
    /// 序列号模数
    pub sequence_modulo: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            default_max_buffer: Some(64 * 1024),
            reorder_window: 32,
            sequence_modulo: 1 << 16,
        }
    }
}

impl EngineConfig {
    pub fn from_json(json_str: &str) -> Result<Self, ScanError> {
        let config: Self = serde_json::from_str(json_str)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ScanError> {
        if self.reorder_window == 0 {
            return Err(ScanError::InvalidProfile(
                "reorder_window must be positive".to_string(),
            ));
        }
        if self.sequence_modulo as usize <= self.reorder_window {
            return Err(ScanError::InvalidProfile(
                "sequence_modulo must exceed reorder_window".to_string(),
            ));
        }
        if self.default_max_buffer == Some(0) {
            return Err(ScanError::InvalidProfile(
                "default_max_buffer must be positive".to_string(),
            ));
        }
        Ok(())
    }
}
