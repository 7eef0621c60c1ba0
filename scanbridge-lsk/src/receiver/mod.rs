//! 流式接收模块
//!
//! 提供串口数据块累积和结束符定界功能

pub mod buffer;
pub mod sync;

pub use buffer::{BufferOverflow, StreamBuffer};
pub use sync::FrameDelimiter;
