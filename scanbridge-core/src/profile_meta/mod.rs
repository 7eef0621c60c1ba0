//! 厂商配置与片段元数据模块
//!
//! 定义原始片段、厂商配置、片段拆解结果和规范扫码事件

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::symbology::{Symbology, SymbologyTable};

/// 片段字段类别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    BarcodeText,  // 条码内容
    BarcodeType,  // 条码类型
    ByteCount,    // 字节长度
    StreamChunk,  // 串口流式数据块
}

/// 片段载荷
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Text(String),
    Bytes {
        data: Bytes,
        declared_length: Option<usize>,
    },
    Integer(i64),
    Byte(i8),
}

impl Payload {
    /// 带声明长度的字节载荷
    pub fn bytes(data: impl Into<Bytes>, declared_length: Option<usize>) -> Self {
        Payload::Bytes {
            data: data.into(),
            declared_length,
        }
    }

    pub fn shape(&self) -> &'static str {
        match self {
            Payload::Text(_) => "text",
            Payload::Bytes { .. } => "bytes",
            Payload::Integer(_) => "integer",
            Payload::Byte(_) => "byte",
        }
    }
}

/// 原始片段：传输层每次投递产生一个，不可变，只被引擎消费一次
#[derive(Debug, Clone, PartialEq)]
pub struct RawFragment {
    pub source_id: String,
    pub device_id: String,
    pub field_kind: FieldKind,
    pub payload: Payload,
    /// 与数据同一次投递的类型标记（单次投递厂商）
    pub companion_type: Option<Payload>,
}

impl RawFragment {
    /// 创建片段，设备标识默认等于动作标识
    pub fn new(source_id: &str, field_kind: FieldKind, payload: Payload) -> Self {
        Self {
            source_id: source_id.to_string(),
            device_id: source_id.to_string(),
            field_kind,
            payload,
            companion_type: None,
        }
    }

    pub fn text(source_id: &str, text: &str) -> Self {
        Self::new(
            source_id,
            FieldKind::BarcodeText,
            Payload::Text(text.to_string()),
        )
    }

    pub fn type_token(source_id: &str, token: Payload) -> Self {
        Self::new(source_id, FieldKind::BarcodeType, token)
    }

    pub fn chunk(source_id: &str, chunk: &[u8]) -> Self {
        Self::new(
            source_id,
            FieldKind::StreamChunk,
            Payload::bytes(chunk.to_vec(), Some(chunk.len())),
        )
    }

    pub fn on_device(mut self, device_id: &str) -> Self {
        self.device_id = device_id.to_string();
        self
    }

    pub fn with_type(mut self, token: Payload) -> Self {
        self.companion_type = Some(token);
        self
    }
}

/// 帧组装模式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FramingMode {
    SingleShot,
    MultiField,
    Streamed,
}

/// 类型标记的表示方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenKind {
    SignedByte,
    SignedInt,
    Text,
}

/// 字节载荷的文本编码
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextEncoding {
    #[default]
    Utf8,
    Latin1,
}

/// 厂商配置定义（JSON形式，加载时校验）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileDefinition {
    pub name: String,
    pub actions: Vec<String>,
    pub framing_mode: FramingMode,
    #[serde(default = "default_token_kind")]
    pub token_kind: TokenKind,
    #[serde(default)]
    pub type_table: BTreeMap<String, Symbology>,
    #[serde(default, deserialize_with = "deserialize_terminator")]
    pub terminator: Option<Vec<u8>>,
    #[serde(default)]
    pub max_buffer: Option<usize>,
    #[serde(default = "default_gs1_placeholder")]
    pub gs1_placeholder: Option<char>,
    #[serde(default)]
    pub text_encoding: TextEncoding,
    #[serde(default)]
    pub strip_control: bool,
    /// 文本以AIM码制标识（如 "]C1"）开头时，以其作为类型标记
    #[serde(default)]
    pub aim_prefix: bool,
}

fn default_token_kind() -> TokenKind {
    TokenKind::Text
}

fn default_gs1_placeholder() -> Option<char> {
    Some('~')
}

/// 自定义反序列化：支持字符串，或数字/十六进制字符串数组
fn deserialize_terminator<'de, D>(deserializer: D) -> Result<Option<Vec<u8>>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::de::{self, Visitor};
    use std::fmt;

    struct TerminatorVisitor;

    impl<'de> Visitor<'de> for TerminatorVisitor {
        type Value = Option<Vec<u8>>;

        fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
            formatter.write_str("a string or an array of numbers or hex strings")
        }

        fn visit_none<E: de::Error>(self) -> Result<Self::Value, E> {
            Ok(None)
        }

        fn visit_unit<E: de::Error>(self) -> Result<Self::Value, E> {
            Ok(None)
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
            Ok(Some(v.as_bytes().to_vec()))
        }

        fn visit_seq<A>(self, mut seq: A) -> Result<Self::Value, A::Error>
        where
            A: serde::de::SeqAccess<'de>,
        {
            let mut vec = Vec::new();
            while let Some(value) = seq.next_element::<serde_json::Value>()? {
                match value {
                    serde_json::Value::Number(n) => match n.as_u64() {
                        Some(num) if num <= 0xFF => vec.push(num as u8),
                        _ => return Err(de::Error::custom("number out of range")),
                    },
                    serde_json::Value::String(s) => {
                        let s = s.trim();
                        let byte_val = if let Some(hex) =
                            s.strip_prefix("0x").or_else(|| s.strip_prefix("0X"))
                        {
                            u8::from_str_radix(hex, 16).map_err(|_| {
                                de::Error::custom(format!("invalid hex string: {s}"))
                            })?
                        } else {
                            s.parse::<u8>().map_err(|_| {
                                de::Error::custom(format!("invalid number string: {s}"))
                            })?
                        };
                        vec.push(byte_val);
                    }
                    _ => return Err(de::Error::custom("expected number or string")),
                }
            }
            Ok(Some(vec))
        }
    }

    deserializer.deserialize_any(TerminatorVisitor)
}

/// 厂商配置（启动时加载，运行期不变）
#[derive(Debug, Clone)]
pub struct VendorProfile {
    pub name: String,
    pub actions: Vec<String>,
    pub framing_mode: FramingMode,
    pub type_table: SymbologyTable,
    pub terminator: Option<Vec<u8>>,
    pub max_buffer: Option<usize>,
    pub gs1_placeholder: Option<char>,
    pub text_encoding: TextEncoding,
    pub strip_control: bool,
    pub aim_prefix: bool,
}

impl VendorProfile {
    /// 是否声明了该动作标识
    pub fn owns_action(&self, action: &str) -> bool {
        self.actions.iter().any(|a| a == action)
    }
}

/// 待解码的条码数据
#[derive(Debug, Clone, PartialEq)]
pub enum DataPart {
    Text(String),
    /// 字节数据；长度未内联时由组装器用挂起的字节长度截取
    Bytes { raw: Bytes, length: Option<usize> },
}

/// 单个片段拆出的部件
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FragmentParts {
    pub data: Option<DataPart>,
    pub type_token: Option<Payload>,
    pub byte_length: Option<usize>,
    pub chunk: Option<Bytes>,
}

impl FragmentParts {
    pub fn is_empty(&self) -> bool {
        self.data.is_none()
            && self.type_token.is_none()
            && self.byte_length.is_none()
            && self.chunk.is_none()
    }
}

/// 规范扫码事件：引擎唯一输出
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanonicalScanEvent {
    pub device_id: String,
    pub profile: String,
    pub text: String,
    pub symbology: Symbology,
}
