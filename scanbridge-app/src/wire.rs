//! 回放文件格式
//!
//! 每行一个JSON对象，描述一次传输层投递；字节载荷以base64书写

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use scanbridge_core::{FieldKind, Payload, RawFragment};
use serde::Deserialize;
use thiserror::Error;

/// 回放行解析错误
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{0}")]
pub struct WireError(String);

/// 回放载荷：恰好给出 text、bytes、int、byte 之一
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WirePayload {
    text: Option<String>,
    bytes: Option<String>,
    length: Option<usize>,
    int: Option<i64>,
    byte: Option<i8>,
}

impl WirePayload {
    fn into_payload(self) -> Result<Payload, WireError> {
        let given = [
            self.text.is_some(),
            self.bytes.is_some(),
            self.int.is_some(),
            self.byte.is_some(),
        ]
        .iter()
        .filter(|g| **g)
        .count();
        if given != 1 {
            return Err(WireError(
                "payload must carry exactly one of text, bytes, int, byte".to_string(),
            ));
        }
        if self.length.is_some() && self.bytes.is_none() {
            return Err(WireError("length applies to bytes payloads only".to_string()));
        }

        if let Some(text) = self.text {
            return Ok(Payload::Text(text));
        }
        if let Some(encoded) = self.bytes {
            let data = STANDARD
                .decode(encoded.trim())
                .map_err(|e| WireError(format!("invalid base64 payload: {e}")))?;
            return Ok(Payload::bytes(data, self.length));
        }
        if let Some(value) = self.int {
            return Ok(Payload::Integer(value));
        }
        self.byte
            .map(Payload::Byte)
            .ok_or_else(|| WireError("empty payload".to_string()))
    }
}

/// 回放行
#[derive(Debug, Clone, Deserialize)]
pub struct WireFragment {
    pub source_id: String,
    #[serde(default)]
    pub device_id: Option<String>,
    pub field_kind: FieldKind,
    pub payload: WirePayload,
    #[serde(default)]
    pub companion_type: Option<WirePayload>,
    /// 序列号：给出时按序列号重排后再组装
    #[serde(default)]
    pub seq: Option<u32>,
}

impl WireFragment {
    /// 解析一行
    pub fn parse(line: &str) -> Result<Self, WireError> {
        serde_json::from_str(line).map_err(|e| WireError(format!("invalid replay line: {e}")))
    }

    /// 转换为原始片段，同时返回序列号
    pub fn into_fragment(self) -> Result<(Option<u32>, RawFragment), WireError> {
        let mut fragment =
            RawFragment::new(&self.source_id, self.field_kind, self.payload.into_payload()?);
        if let Some(device_id) = &self.device_id {
            fragment = fragment.on_device(device_id);
        }
        if let Some(companion) = self.companion_type {
            fragment = fragment.with_type(companion.into_payload()?);
        }
        Ok((self.seq, fragment))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_text_line_with_companion() {
        let wire = WireFragment::parse(
            r#"{"source_id": "android.intent.ACTION_DECODE_DATA", "field_kind": "barcode_text",
                "payload": {"text": "6901234567892"}, "companion_type": {"byte": 11}}"#,
        )
        .unwrap();
        let (seq, fragment) = wire.into_fragment().unwrap();

        assert_eq!(seq, None);
        assert_eq!(fragment.device_id, "android.intent.ACTION_DECODE_DATA");
        assert_eq!(fragment.payload, Payload::Text("6901234567892".to_string()));
        assert_eq!(fragment.companion_type, Some(Payload::Byte(11)));
    }

    #[test]
    fn test_parse_base64_chunk() {
        // "AB\r" -> QUIN
        let wire = WireFragment::parse(
            r#"{"source_id": "serial.scanner.DATA", "device_id": "com3", "seq": 7,
                "field_kind": "stream_chunk", "payload": {"bytes": "QUIN", "length": 3}}"#,
        )
        .unwrap();
        let (seq, fragment) = wire.into_fragment().unwrap();

        assert_eq!(seq, Some(7));
        assert_eq!(fragment.device_id, "com3");
        assert_eq!(fragment.field_kind, FieldKind::StreamChunk);
        assert_eq!(fragment.payload, Payload::bytes(b"AB\r".to_vec(), Some(3)));
    }

    #[test]
    fn test_reject_ambiguous_payload() {
        let wire = WireFragment::parse(
            r#"{"source_id": "x", "field_kind": "barcode_type", "payload": {"int": 1, "byte": 1}}"#,
        )
        .unwrap();
        assert!(wire.into_fragment().is_err());

        let wire = WireFragment::parse(
            r#"{"source_id": "x", "field_kind": "barcode_type", "payload": {"int": 1, "length": 1}}"#,
        )
        .unwrap();
        assert!(wire.into_fragment().is_err());
    }

    #[test]
    fn test_reject_bad_lines() {
        assert!(WireFragment::parse("not json").is_err());
        let unknown_kind = r#"{"source_id": "x", "field_kind": "nope", "payload": {"int": 1}}"#;
        assert!(WireFragment::parse(unknown_kind).is_err());

        let wire = WireFragment::parse(
            r#"{"source_id": "x", "field_kind": "stream_chunk", "payload": {"bytes": "***"}}"#,
        )
        .unwrap();
        assert!(wire.into_fragment().is_err());
    }
}
