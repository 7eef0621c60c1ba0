//! 流式接收缓存实现
//!
//! 累积串口数据块，按结束符切分出完整的一次扫码

use bytes::{Buf, Bytes, BytesMut};
use scanbridge_core::utils::{bytes_to_hex, trim_leading_control, trim_trailing_control};
use tracing::trace;

use super::sync::FrameDelimiter;

/// 缓冲区超限
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferOverflow {
    /// 配置的上限
    pub limit: usize,
    /// 被丢弃的字节数
    pub discarded: usize,
}

/// 流式接收缓存
///
/// 用于累积数据块、搜索结束符、提取完整扫码
#[derive(Debug, Clone)]
pub struct StreamBuffer {
    /// 数据缓冲区
    buffer: BytesMut,
    /// 最大缓冲大小（None表示不设上限）
    max_size: Option<usize>,
    /// 帧定界器
    delimiter: Option<FrameDelimiter>,
}

impl StreamBuffer {
    /// 创建新的流式缓存
    ///
    /// # 参数
    /// - `max_size`: 无结束符时允许的最大缓冲字节数
    pub fn new(max_size: Option<usize>) -> Self {
        Self {
            buffer: BytesMut::new(),
            max_size,
            delimiter: None,
        }
    }

    /// 设置帧定界器
    pub fn set_delimiter(&mut self, delimiter: FrameDelimiter) {
        self.delimiter = Some(delimiter);
    }

    /// 追加接收数据
    pub fn append(&mut self, data: &[u8]) {
        trace!(chunk = %bytes_to_hex(data), "stream chunk appended");
        self.buffer.extend_from_slice(data);
    }

    /// 尝试提取下一次完整扫码
    ///
    /// 结束符之前的内容作为结果返回（去除首尾控制字符），结束符之后的
    /// 内容留作下一次扫码的开头。
    ///
    /// # 返回
    /// - `Ok(Some(frame))`: 找到结束符
    /// - `Ok(None)`: 数据不足，需要继续接收
    /// - `Err(BufferOverflow)`: 无结束符且超过上限，缓冲区已清空
    pub fn extract_next_frame(&mut self) -> Result<Option<Bytes>, BufferOverflow> {
        let Some(delimiter) = &self.delimiter else {
            return Ok(None);
        };

        if let Some(offset) = delimiter.search(&self.buffer) {
            let frame = self.buffer.split_to(offset).freeze();
            self.buffer.advance(delimiter.terminator().len());

            // 剩余数据开头的控制字符属于上一次扫码的尾部
            let leading = self
                .buffer
                .iter()
                .take_while(|b| b.is_ascii_control())
                .count();
            self.buffer.advance(leading);

            let start = frame.len() - trim_leading_control(&frame).len();
            let end = start + trim_trailing_control(&frame[start..]).len();
            return Ok(Some(frame.slice(start..end)));
        }

        if let Some(limit) = self.max_size {
            if self.buffer.len() > limit {
                let discarded = self.buffer.len();
                self.buffer.clear();
                return Err(BufferOverflow { limit, discarded });
            }
        }

        Ok(None)
    }

    /// 获取当前缓冲区长度
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// 检查缓冲区是否为空
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// 清空缓冲区
    pub fn clear(&mut self) {
        self.buffer.clear();
    }

    /// 查看缓冲区内容（不移除）
    pub fn peek(&self) -> &[u8] {
        &self.buffer
    }
}
