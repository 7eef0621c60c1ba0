//! 配置驱动的厂商适配器
//!
//! 一个实现覆盖所有厂商：认领靠动作标识，拆解靠字段类别和载荷形态

use bytes::Bytes;
use scanbridge_core::{
    DataPart, FieldKind, FragmentParts, Payload, RawFragment, ScanError, VendorAdapter,
    VendorProfile,
};
use std::sync::Arc;

/// 厂商适配器
#[derive(Debug, Clone)]
pub struct ProfileAdapter {
    profile: Arc<VendorProfile>,
}

impl ProfileAdapter {
    pub fn new(profile: Arc<VendorProfile>) -> Self {
        Self { profile }
    }

    fn malformed(&self, reason: impl Into<String>) -> ScanError {
        ScanError::malformed(&self.profile.name, reason)
    }

    /// 字节载荷按声明长度截取；长度越界视为格式错误
    fn checked_bytes(&self, data: &Bytes, declared_length: Option<usize>) -> Result<(), ScanError> {
        match declared_length {
            Some(length) if length > data.len() => Err(self.malformed(format!(
                "declared length {} exceeds buffer of {} bytes",
                length,
                data.len()
            ))),
            _ => Ok(()),
        }
    }

    fn extract_type_token(&self, token: &Payload) -> Result<Payload, ScanError> {
        match token {
            Payload::Bytes { .. } => Err(self.malformed("type token must be a scalar or text")),
            other => Ok(other.clone()),
        }
    }

    fn extract_length(&self, payload: &Payload) -> Result<usize, ScanError> {
        let length = match payload {
            Payload::Integer(n) => usize::try_from(*n).ok(),
            Payload::Byte(b) => usize::try_from(*b).ok(),
            Payload::Text(s) => s.trim().parse::<usize>().ok(),
            Payload::Bytes { .. } => None,
        };
        length.ok_or_else(|| {
            self.malformed(format!("invalid byte count payload ({})", payload.shape()))
        })
    }
}

impl VendorAdapter for ProfileAdapter {
    fn profile(&self) -> &VendorProfile {
        &self.profile
    }

    fn claim(&self, fragment: &RawFragment) -> bool {
        self.profile.owns_action(&fragment.source_id)
    }

    fn extract(&self, fragment: &RawFragment) -> Result<FragmentParts, ScanError> {
        let mut parts = FragmentParts::default();

        match fragment.field_kind {
            FieldKind::BarcodeText => {
                parts.data = Some(match &fragment.payload {
                    Payload::Text(text) => DataPart::Text(text.clone()),
                    Payload::Bytes {
                        data,
                        declared_length,
                    } => {
                        self.checked_bytes(data, *declared_length)?;
                        DataPart::Bytes {
                            raw: data.clone(),
                            length: *declared_length,
                        }
                    }
                    other => {
                        return Err(self.malformed(format!(
                            "barcode text cannot be carried as {}",
                            other.shape()
                        )))
                    }
                });
                if let Some(token) = &fragment.companion_type {
                    parts.type_token = Some(self.extract_type_token(token)?);
                }
            }
            FieldKind::BarcodeType => {
                parts.type_token = Some(self.extract_type_token(&fragment.payload)?);
            }
            FieldKind::ByteCount => {
                parts.byte_length = Some(self.extract_length(&fragment.payload)?);
            }
            FieldKind::StreamChunk => {
                parts.chunk = Some(match &fragment.payload {
                    Payload::Bytes {
                        data,
                        declared_length: Some(length),
                    } => {
                        self.checked_bytes(data, Some(*length))?;
                        data.slice(..*length)
                    }
                    Payload::Bytes {
                        declared_length: None,
                        ..
                    } => return Err(self.malformed("stream chunk without declared length")),
                    Payload::Text(text) => Bytes::from(text.clone().into_bytes()),
                    other => {
                        return Err(self.malformed(format!(
                            "stream chunk cannot be carried as {}",
                            other.shape()
                        )))
                    }
                });
            }
        }

        Ok(parts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scanbridge_core::{FramingMode, SymbologyTable, TextEncoding, TokenKind};

    fn adapter() -> ProfileAdapter {
        ProfileAdapter::new(Arc::new(VendorProfile {
            name: "urovo".to_string(),
            actions: vec!["android.intent.ACTION_DECODE_DATA".to_string()],
            framing_mode: FramingMode::SingleShot,
            type_table: SymbologyTable::new(TokenKind::SignedByte),
            terminator: None,
            max_buffer: None,
            gs1_placeholder: Some('~'),
            text_encoding: TextEncoding::Utf8,
            strip_control: false,
            aim_prefix: false,
        }))
    }

    #[test]
    fn test_claim_by_action() {
        let adapter = adapter();
        assert!(adapter.claim(&RawFragment::text("android.intent.ACTION_DECODE_DATA", "1")));
        assert!(!adapter.claim(&RawFragment::text("android.intent.ACTION_OTHER", "1")));
    }

    #[test]
    fn test_extract_bytes_with_companion_type() {
        let fragment = RawFragment::new(
            "android.intent.ACTION_DECODE_DATA",
            FieldKind::BarcodeText,
            Payload::bytes(b"6901234567892\0\0\0".to_vec(), Some(13)),
        )
        .with_type(Payload::Byte(11));

        let parts = adapter().extract(&fragment).unwrap();
        assert_eq!(parts.type_token, Some(Payload::Byte(11)));
        match parts.data {
            Some(DataPart::Bytes { raw, length }) => {
                assert_eq!(length, Some(13));
                assert_eq!(raw.len(), 16);
            }
            other => panic!("unexpected data part: {other:?}"),
        }
    }

    #[test]
    fn test_declared_length_exceeding_buffer() {
        let fragment = RawFragment::new(
            "android.intent.ACTION_DECODE_DATA",
            FieldKind::BarcodeText,
            Payload::bytes(b"123".to_vec(), Some(8)),
        );
        let result = adapter().extract(&fragment);
        assert!(matches!(result, Err(ScanError::MalformedPayload { .. })));
    }

    #[test]
    fn test_stream_chunk_cut_to_declared_length() {
        let fragment = RawFragment::new(
            "android.intent.ACTION_DECODE_DATA",
            FieldKind::StreamChunk,
            Payload::bytes(b"AB\r\0\0".to_vec(), Some(3)),
        );
        let parts = adapter().extract(&fragment).unwrap();
        assert_eq!(parts.chunk.as_deref(), Some(&b"AB\r"[..]));

        let missing = RawFragment::new(
            "android.intent.ACTION_DECODE_DATA",
            FieldKind::StreamChunk,
            Payload::bytes(b"AB".to_vec(), None),
        );
        assert!(adapter().extract(&missing).is_err());
    }

    #[test]
    fn test_byte_count_rejects_negative() {
        let fragment = RawFragment::new(
            "android.intent.ACTION_DECODE_DATA",
            FieldKind::ByteCount,
            Payload::Integer(-1),
        );
        assert!(adapter().extract(&fragment).is_err());

        let fragment = RawFragment::new(
            "android.intent.ACTION_DECODE_DATA",
            FieldKind::ByteCount,
            Payload::Integer(12),
        );
        assert_eq!(adapter().extract(&fragment).unwrap().byte_length, Some(12));
    }

    #[test]
    fn test_scalar_barcode_text_rejected() {
        let fragment = RawFragment::new(
            "android.intent.ACTION_DECODE_DATA",
            FieldKind::BarcodeText,
            Payload::Integer(5),
        );
        assert!(adapter().extract(&fragment).is_err());
    }
}
