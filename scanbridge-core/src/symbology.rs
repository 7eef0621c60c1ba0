//! 码制分类表
//!
//! 厂商原生类型标记到规范码制的映射，纯查表，无状态

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;

use crate::profile_meta::{Payload, TokenKind};

/// ASCII组分隔符（GS1字段分隔）
pub const GROUP_SEPARATOR: char = '\u{1D}';

/// 规范码制
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Symbology {
    Code128,
    Gs1,
    Pdf417,
    DataMatrix,
    Ean,
    QrCode,
    Unknown,
}

impl Symbology {
    pub fn as_str(&self) -> &'static str {
        match self {
            Symbology::Code128 => "CODE128",
            Symbology::Gs1 => "GS1",
            Symbology::Pdf417 => "PDF417",
            Symbology::DataMatrix => "DATA_MATRIX",
            Symbology::Ean => "EAN",
            Symbology::QrCode => "QR_CODE",
            Symbology::Unknown => "UNKNOWN",
        }
    }
}

impl fmt::Display for Symbology {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Symbology {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "CODE128" => Ok(Symbology::Code128),
            "GS1" => Ok(Symbology::Gs1),
            "PDF417" => Ok(Symbology::Pdf417),
            "DATA_MATRIX" => Ok(Symbology::DataMatrix),
            "EAN" => Ok(Symbology::Ean),
            "QR_CODE" => Ok(Symbology::QrCode),
            "UNKNOWN" => Ok(Symbology::Unknown),
            other => Err(format!("Unknown symbology: {other}")),
        }
    }
}

/// 归一化后的类型标记
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeToken {
    Byte(i8),
    Int(i64),
    /// 小写形式
    Text(String),
}

/// 单个厂商的码制表
#[derive(Debug, Clone, PartialEq)]
pub struct SymbologyTable {
    kind: TokenKind,
    entries: HashMap<TypeToken, Symbology>,
}

impl SymbologyTable {
    pub fn new(kind: TokenKind) -> Self {
        Self {
            kind,
            entries: HashMap::new(),
        }
    }

    /// 从配置键值构建，键按声明的表示方式解析
    pub fn from_entries(
        kind: TokenKind,
        entries: &BTreeMap<String, Symbology>,
    ) -> Result<Self, String> {
        let mut table = Self::new(kind);
        for (key, symbology) in entries {
            let token = parse_key(kind, key)?;
            if let Some(previous) = table.entries.insert(token, *symbology) {
                if previous != *symbology {
                    return Err(format!(
                        "Type token '{key}' maps to both {previous} and {symbology}"
                    ));
                }
            }
        }
        Ok(table)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// 将载荷转换为本表的表示方式；无损转换不可行时返回None
    pub fn normalize(&self, token: &Payload) -> Option<TypeToken> {
        match (self.kind, token) {
            (TokenKind::SignedByte, Payload::Byte(b)) => Some(TypeToken::Byte(*b)),
            (TokenKind::SignedByte, Payload::Integer(i)) => {
                i8::try_from(*i).ok().map(TypeToken::Byte)
            }
            (TokenKind::SignedByte, Payload::Text(s)) => s.trim().parse().ok().map(TypeToken::Byte),
            (TokenKind::SignedInt, Payload::Integer(i)) => Some(TypeToken::Int(*i)),
            (TokenKind::SignedInt, Payload::Byte(b)) => Some(TypeToken::Int(i64::from(*b))),
            (TokenKind::SignedInt, Payload::Text(s)) => s.trim().parse().ok().map(TypeToken::Int),
            (TokenKind::Text, Payload::Text(s)) => Some(TypeToken::Text(s.trim().to_lowercase())),
            (TokenKind::Text, Payload::Integer(i)) => Some(TypeToken::Text(i.to_string())),
            (TokenKind::Text, Payload::Byte(b)) => Some(TypeToken::Text(b.to_string())),
            (_, Payload::Bytes { .. }) => None,
        }
    }

    /// 精确匹配分类，未映射的标记得到UNKNOWN
    pub fn classify(&self, token: Option<&Payload>) -> Symbology {
        token
            .and_then(|t| self.normalize(t))
            .and_then(|t| self.entries.get(&t).copied())
            .unwrap_or(Symbology::Unknown)
    }
}

fn parse_key(kind: TokenKind, key: &str) -> Result<TypeToken, String> {
    let key = key.trim();
    match kind {
        TokenKind::SignedByte => {
            if let Ok(b) = key.parse::<i8>() {
                return Ok(TypeToken::Byte(b));
            }
            // 0x80及以上按无符号书写时折算为有符号字节
            key.strip_prefix("0x")
                .or_else(|| key.strip_prefix("0X"))
                .and_then(|hex| u8::from_str_radix(hex, 16).ok())
                .map(|b| TypeToken::Byte(b as i8))
                .ok_or_else(|| format!("Invalid signed byte token: {key}"))
        }
        TokenKind::SignedInt => key
            .parse::<i64>()
            .map(TypeToken::Int)
            .map_err(|_| format!("Invalid integer token: {key}")),
        TokenKind::Text => {
            if key.is_empty() {
                Err("Empty text token".to_string())
            } else {
                Ok(TypeToken::Text(key.to_lowercase()))
            }
        }
    }
}

/// GS1码制：把占位符替换为真实的组分隔符
pub fn apply_gs1_separator(text: &str, symbology: Symbology, placeholder: Option<char>) -> String {
    match (symbology, placeholder) {
        (Symbology::Gs1, Some(p)) => text.replace(p, &GROUP_SEPARATOR.to_string()),
        _ => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(kind: TokenKind, entries: &[(&str, Symbology)]) -> SymbologyTable {
        let map = entries
            .iter()
            .map(|(k, v)| (k.to_string(), *v))
            .collect::<BTreeMap<_, _>>();
        SymbologyTable::from_entries(kind, &map).unwrap()
    }

    #[test]
    fn test_text_tokens_are_case_insensitive() {
        let t = table(TokenKind::Text, &[("LABEL-TYPE-CODE128", Symbology::Code128)]);
        assert_eq!(
            t.classify(Some(&Payload::Text("label-type-code128".to_string()))),
            Symbology::Code128
        );
        assert_eq!(
            t.classify(Some(&Payload::Text("Label-Type-Code128".to_string()))),
            Symbology::Code128
        );
    }

    #[test]
    fn test_signed_byte_tokens() {
        let t = table(
            TokenKind::SignedByte,
            &[("3", Symbology::Code128), ("0xFE", Symbology::QrCode)],
        );
        assert_eq!(t.classify(Some(&Payload::Byte(3))), Symbology::Code128);
        assert_eq!(t.classify(Some(&Payload::Byte(-2))), Symbology::QrCode);
        // 整数在字节范围内时可无损转换
        assert_eq!(t.classify(Some(&Payload::Integer(3))), Symbology::Code128);
        assert_eq!(t.classify(Some(&Payload::Integer(259))), Symbology::Unknown);
    }

    #[test]
    fn test_unmapped_and_missing_tokens() {
        let t = table(TokenKind::SignedInt, &[("1", Symbology::Ean)]);
        assert_eq!(t.classify(Some(&Payload::Integer(99))), Symbology::Unknown);
        assert_eq!(t.classify(None), Symbology::Unknown);
        assert_eq!(
            t.classify(Some(&Payload::bytes(vec![1u8], Some(1)))),
            Symbology::Unknown
        );
    }

    #[test]
    fn test_same_token_differs_across_tables() {
        let a = table(TokenKind::SignedByte, &[("3", Symbology::Code128)]);
        let b = table(TokenKind::SignedByte, &[("3", Symbology::Gs1)]);
        assert_eq!(a.classify(Some(&Payload::Byte(3))), Symbology::Code128);
        assert_eq!(b.classify(Some(&Payload::Byte(3))), Symbology::Gs1);
    }

    #[test]
    fn test_conflicting_keys_rejected() {
        let mut map = BTreeMap::new();
        map.insert("CODE".to_string(), Symbology::Code128);
        map.insert("code".to_string(), Symbology::Ean);
        assert!(SymbologyTable::from_entries(TokenKind::Text, &map).is_err());
    }

    #[test]
    fn test_gs1_substitution() {
        assert_eq!(
            apply_gs1_separator("01~21", Symbology::Gs1, Some('~')),
            "01\u{1D}21"
        );
        assert_eq!(
            apply_gs1_separator("01~21", Symbology::Code128, Some('~')),
            "01~21"
        );
        assert_eq!(apply_gs1_separator("01~21", Symbology::Gs1, None), "01~21");
    }

    #[test]
    fn test_symbology_parse_and_display() {
        assert_eq!("data_matrix".parse::<Symbology>(), Ok(Symbology::DataMatrix));
        assert_eq!(Symbology::QrCode.to_string(), "QR_CODE");
        assert_eq!(
            serde_json::to_string(&Symbology::Code128).unwrap(),
            "\"CODE128\""
        );
    }
}
