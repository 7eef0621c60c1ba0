//! 工具模块
//!
//! 提供控制字符处理和文本解码等常用函数

use crate::profile_meta::TextEncoding;
use crate::symbology::GROUP_SEPARATOR;

/// 将字节数组转换为十六进制字符串（用于诊断日志）
pub fn bytes_to_hex(bytes: &[u8]) -> String {
    hex::encode_upper(bytes)
}

/// 文本为空或全部为控制字符
pub fn is_blank_payload(text: &str) -> bool {
    text.chars().all(char::is_control)
}

/// 去除控制字符，保留GS1组分隔符
pub fn strip_control(text: &str) -> String {
    text.chars()
        .filter(|c| !c.is_control() || *c == GROUP_SEPARATOR)
        .collect()
}

/// 去除尾部的ASCII控制字节
pub fn trim_trailing_control(data: &[u8]) -> &[u8] {
    let end = data
        .iter()
        .rposition(|b| !b.is_ascii_control())
        .map_or(0, |pos| pos + 1);
    &data[..end]
}

/// 去除头部的ASCII控制字节
pub fn trim_leading_control(data: &[u8]) -> &[u8] {
    let start = data
        .iter()
        .position(|b| !b.is_ascii_control())
        .unwrap_or(data.len());
    &data[start..]
}

/// 按配置的编码解码字节载荷
pub fn decode_text(data: &[u8], encoding: TextEncoding) -> Result<String, String> {
    match encoding {
        TextEncoding::Utf8 => std::str::from_utf8(data)
            .map(str::to_string)
            .map_err(|e| format!("invalid UTF-8 at byte {}", e.valid_up_to())),
        TextEncoding::Latin1 => Ok(data.iter().map(|&b| b as char).collect()),
    }
}

/// 拆出AIM码制标识（"]" + 码制字符 + 修饰字符）
pub fn split_aim_prefix(text: &str) -> Option<(&str, &str)> {
    let bytes = text.as_bytes();
    if bytes.len() >= 3
        && bytes[0] == b']'
        && bytes[1].is_ascii_alphabetic()
        && bytes[2].is_ascii_alphanumeric()
    {
        Some(text.split_at(3))
    } else {
        None
    }
}

/// 字节序列搜索，返回首次出现的位置
pub fn find_subsequence(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() || haystack.len() < needle.len() {
        return None;
    }
    haystack.windows(needle.len()).position(|w| w == needle)
}
