//! ScanBridge 归一化引擎
//!
//! 把各厂商扫码器投递的原始片段组装、分类为统一的规范扫码事件

pub mod config;
pub mod engine;
pub mod sink;

// 导出主要类型
pub use config::EngineConfig;
pub use engine::NormalizationEngine;
pub use sink::{CallbackSink, DiagnosticSink, EventSink, TracingDiagnostics};
