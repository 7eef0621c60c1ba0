//! 帧定界模块
//!
//! 在串口流中搜索结束符，确定一次扫码的边界

use scanbridge_core::utils::find_subsequence;

/// 帧定界器
#[derive(Debug, Clone)]
pub struct FrameDelimiter {
    terminator: Vec<u8>,
}

impl FrameDelimiter {
    /// 创建新的帧定界器
    pub fn new(terminator: Vec<u8>) -> Self {
        Self { terminator }
    }

    pub fn terminator(&self) -> &[u8] {
        &self.terminator
    }

    /// 在数据缓冲区中搜索结束符
    ///
    /// # 返回
    /// - `Some(offset)`: 找到结束符，返回首次出现的偏移量
    /// - `None`: 未找到结束符
    pub fn search(&self, buffer: &[u8]) -> Option<usize> {
        find_subsequence(buffer, &self.terminator)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_byte_terminator() {
        let delimiter = FrameDelimiter::new(vec![b'\n']);
        assert_eq!(delimiter.search(b"ABCDEF\n"), Some(6));
        assert_eq!(delimiter.search(b"ABCDEF"), None);
    }

    #[test]
    fn test_multi_byte_terminator() {
        let delimiter = FrameDelimiter::new(b"\r\n".to_vec());
        // 单独的\r不构成结束符
        assert_eq!(delimiter.search(b"AB\rCD\r\n"), Some(5));
    }

    #[test]
    fn test_multiple_terminators() {
        // 应返回第一个
        let delimiter = FrameDelimiter::new(vec![0x0D]);
        assert_eq!(delimiter.search(&[0x41, 0x0D, 0x42, 0x0D]), Some(1));
    }

    #[test]
    fn test_empty_terminator() {
        let delimiter = FrameDelimiter::new(vec![]);
        assert_eq!(delimiter.search(b"ABC"), None);
    }
}
