//! Frame Assembler 核心结构和基础方法
//!
//! 按厂商的组装模式把片段部件折叠为完整的一次扫码

use scanbridge_core::utils::decode_text;
use scanbridge_core::{
    DataPart, FragmentParts, FramingMode, Payload, ScanError, TextEncoding, VendorProfile,
};
use tracing::{debug, warn};

use super::pending::PendingAssembly;
use crate::receiver::{FrameDelimiter, StreamBuffer};

/// 设备组装状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssemblyState {
    Idle,
    Accumulating,
}

/// 组装完成的扫码（尚未分类）
#[derive(Debug, Clone, PartialEq)]
pub struct CompletedScan {
    pub text: String,
    pub type_token: Option<Payload>,
}

/// 扫码帧组装器
#[derive(Debug, Clone)]
pub struct FrameAssembler {
    device_id: String,
    profile: String,
    mode: FramingMode,
    encoding: TextEncoding,
    pending: PendingAssembly,
}

impl FrameAssembler {
    /// 为设备创建组装器
    ///
    /// # 参数
    /// - `device_id`: 设备标识
    /// - `profile`: 厂商配置
    /// - `default_max_buffer`: 配置未声明上限时使用的流式缓冲上限
    pub fn new(
        device_id: &str,
        profile: &VendorProfile,
        default_max_buffer: Option<usize>,
    ) -> Self {
        let mut buffer = StreamBuffer::new(profile.max_buffer.or(default_max_buffer));
        if let Some(terminator) = &profile.terminator {
            buffer.set_delimiter(FrameDelimiter::new(terminator.clone()));
        }

        Self {
            device_id: device_id.to_string(),
            profile: profile.name.clone(),
            mode: profile.framing_mode,
            encoding: profile.text_encoding,
            pending: PendingAssembly::new(buffer),
        }
    }

    pub fn profile(&self) -> &str {
        &self.profile
    }

    pub fn mode(&self) -> FramingMode {
        self.mode
    }

    pub fn pending(&self) -> &PendingAssembly {
        &self.pending
    }

    pub fn state(&self) -> AssemblyState {
        if self.pending.is_empty() {
            AssemblyState::Idle
        } else {
            AssemblyState::Accumulating
        }
    }

    /// 折叠一个片段的部件
    ///
    /// # 返回
    /// - `Ok(Some(scan))`: 本片段使一次扫码完整
    /// - `Ok(None)`: 仍在累积
    /// - `Err(ScanError)`: 片段无效（挂起状态不受影响）或流式缓冲超限（挂起状态已丢弃）
    pub fn push(&mut self, parts: FragmentParts) -> Result<Option<CompletedScan>, ScanError> {
        if parts.is_empty() {
            return Err(self.malformed("fragment carries no usable fields"));
        }

        match self.mode {
            FramingMode::SingleShot => self.push_single_shot(parts),
            FramingMode::MultiField => self.push_multi_field(parts),
            FramingMode::Streamed => self.push_streamed(parts),
        }
    }

    /// 不追加数据，重新检查流式缓冲中是否还有完整扫码
    pub fn poll(&mut self) -> Result<Option<CompletedScan>, ScanError> {
        match self.mode {
            FramingMode::Streamed => self.extract_streamed(),
            _ => Ok(None),
        }
    }

    /// 丢弃挂起的组装
    pub fn reset(&mut self) {
        if !self.pending.is_empty() {
            debug!(device = %self.device_id, profile = %self.profile, "pending assembly discarded");
        }
        self.pending.clear();
    }

    fn push_single_shot(
        &mut self,
        parts: FragmentParts,
    ) -> Result<Option<CompletedScan>, ScanError> {
        let Some(data) = parts.data else {
            return Err(self.malformed("single-shot fragment carries no barcode data"));
        };
        let text = self.resolve_text(data, parts.byte_length)?;
        Ok(Some(CompletedScan {
            text,
            type_token: parts.type_token,
        }))
    }

    fn push_multi_field(
        &mut self,
        parts: FragmentParts,
    ) -> Result<Option<CompletedScan>, ScanError> {
        if parts.chunk.is_some() {
            return Err(self.malformed("stream chunk delivered to a multi-field profile"));
        }

        // 数据和类型已齐但长度始终未到，下一次扫码的字段到达时放弃该次组装
        let abandoned = (parts.data.is_some() || parts.type_token.is_some())
            && self.pending.pending_type_token.is_some()
            && self.pending.awaiting_length();
        if abandoned {
            warn!(
                device = %self.device_id,
                profile = %self.profile,
                "byte payload abandoned without declared length"
            );
            self.pending.clear();
        }

        if let Some(length) = parts.byte_length {
            self.pending.pending_length = Some(length);
        }
        if let Some(token) = parts.type_token {
            self.pending.pending_type_token = Some(token);
        }
        if let Some(data) = parts.data {
            if self.pending.held_data.is_some() {
                warn!(
                    device = %self.device_id,
                    profile = %self.profile,
                    "unpaired barcode data replaced by a newer fragment"
                );
            }
            self.pending.held_data = Some(data);
        }

        match self.pending.take_completed() {
            Some((data, token, length)) => {
                // 决定性片段：挂起状态已整体复位，长度不会带入下一次扫码
                self.pending.clear();
                debug!(
                    device = %self.device_id,
                    profile = %self.profile,
                    "multi-field assembly completed"
                );
                let text = self.resolve_text(data, length)?;
                Ok(Some(CompletedScan {
                    text,
                    type_token: Some(token),
                }))
            }
            None if abandoned => Err(self.malformed("byte payload without declared length")),
            None => {
                debug!(
                    device = %self.device_id,
                    profile = %self.profile,
                    "multi-field assembly accumulating"
                );
                Ok(None)
            }
        }
    }

    fn push_streamed(&mut self, parts: FragmentParts) -> Result<Option<CompletedScan>, ScanError> {
        let Some(chunk) = parts.chunk else {
            return Err(self.malformed("streamed profile expects raw stream chunks"));
        };
        self.pending.buffer.append(&chunk);
        self.extract_streamed()
    }

    fn extract_streamed(&mut self) -> Result<Option<CompletedScan>, ScanError> {
        match self.pending.buffer.extract_next_frame() {
            Ok(Some(frame)) => {
                debug!(
                    device = %self.device_id,
                    profile = %self.profile,
                    remaining = self.pending.buffer.len(),
                    "terminator reached"
                );
                let text = decode_text(&frame, self.encoding).map_err(|e| self.malformed(e))?;
                Ok(Some(CompletedScan {
                    text,
                    type_token: None,
                }))
            }
            Ok(None) => Ok(None),
            Err(overflow) => {
                warn!(
                    device = %self.device_id,
                    profile = %self.profile,
                    discarded = overflow.discarded,
                    "stream buffer overflow, assembly discarded"
                );
                Err(ScanError::AssemblyOverflow {
                    device_id: self.device_id.clone(),
                    limit: overflow.limit,
                })
            }
        }
    }

    /// 解码数据部件；字节数据按声明长度截取
    fn resolve_text(
        &self,
        data: DataPart,
        fallback_length: Option<usize>,
    ) -> Result<String, ScanError> {
        match data {
            DataPart::Text(text) => Ok(text),
            DataPart::Bytes { raw, length } => {
                let length = length
                    .or(fallback_length)
                    .ok_or_else(|| self.malformed("byte payload without declared length"))?;
                if length > raw.len() {
                    return Err(self.malformed(format!(
                        "declared length {} exceeds buffer of {} bytes",
                        length,
                        raw.len()
                    )));
                }
                decode_text(&raw[..length], self.encoding).map_err(|e| self.malformed(e))
            }
        }
    }

    fn malformed(&self, reason: impl Into<String>) -> ScanError {
        ScanError::malformed(&self.profile, reason)
    }
}
