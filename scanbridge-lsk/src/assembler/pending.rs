//! 挂起组装状态
//!
//! 每个设备同一时刻至多一个，决定性片段到达时整体复位

use scanbridge_core::{DataPart, Payload};

use crate::receiver::StreamBuffer;

/// 挂起的组装
#[derive(Debug, Clone)]
pub struct PendingAssembly {
    /// 流式数据缓冲（streamed模式）
    pub buffer: StreamBuffer,
    /// 已到达但尚未配对的数据（multi-field模式）
    pub held_data: Option<DataPart>,
    /// 已到达但尚未配对的类型标记（multi-field模式）
    pub pending_type_token: Option<Payload>,
    /// 独立投递的字节长度（multi-field模式）
    pub pending_length: Option<usize>,
}

impl PendingAssembly {
    pub fn new(buffer: StreamBuffer) -> Self {
        Self {
            buffer,
            held_data: None,
            pending_type_token: None,
            pending_length: None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
            && self.held_data.is_none()
            && self.pending_type_token.is_none()
            && self.pending_length.is_none()
    }

    /// 数据与类型都已到达，且字节数据的长度已知
    pub fn is_complete(&self) -> bool {
        self.held_data.is_some() && self.pending_type_token.is_some() && !self.awaiting_length()
    }

    /// 持有未声明长度的字节数据，且尚未收到独立的长度字段
    pub fn awaiting_length(&self) -> bool {
        matches!(self.held_data, Some(DataPart::Bytes { length: None, .. }))
            && self.pending_length.is_none()
    }

    /// 取出已配对的数据、类型和长度，并清空挂起状态
    pub fn take_completed(&mut self) -> Option<(DataPart, Payload, Option<usize>)> {
        if !self.is_complete() {
            return None;
        }
        let data = self.held_data.take()?;
        let token = self.pending_type_token.take()?;
        Some((data, token, self.pending_length.take()))
    }

    pub fn clear(&mut self) {
        self.buffer.clear();
        self.held_data = None;
        self.pending_type_token = None;
        self.pending_length = None;
    }
}
