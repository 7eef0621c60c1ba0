//! 帧组装模块
//!
//! 按single-shot、multi-field、streamed三种模式把片段折叠为完整扫码

pub mod core;
pub mod pending;

pub use self::core::{AssemblyState, CompletedScan, FrameAssembler};
pub use self::pending::PendingAssembly;
