//! 厂商配置加载模块
//!
//! 解析JSON格式的配置定义，校验后生成运行期配置集合

use scanbridge_core::{
    FramingMode, ProfileDefinition, ScanError, SymbologyTable, VendorAdapter, VendorProfile,
};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

use crate::adapter::ProfileAdapter;

/// 已校验的厂商配置集合（保持配置顺序）
#[derive(Debug, Clone, Default)]
pub struct ProfileSet {
    profiles: Vec<Arc<VendorProfile>>,
}

impl ProfileSet {
    /// 从配置定义构建
    ///
    /// 两个配置声明同一动作标识时返回 `ConfigurationConflict`，拒绝启动
    pub fn from_definitions(definitions: Vec<ProfileDefinition>) -> Result<Self, ScanError> {
        let mut owners: HashMap<String, String> = HashMap::new();
        let mut profiles = Vec::with_capacity(definitions.len());

        for definition in definitions {
            let profile = build_profile(definition)?;

            if profiles
                .iter()
                .any(|p: &Arc<VendorProfile>| p.name == profile.name)
            {
                return Err(ScanError::InvalidProfile(format!(
                    "duplicate profile name '{}'",
                    profile.name
                )));
            }

            for action in &profile.actions {
                if let Some(first) = owners.get(action) {
                    if *first != profile.name {
                        return Err(ScanError::ConfigurationConflict {
                            action: action.clone(),
                            first: first.clone(),
                            second: profile.name.clone(),
                        });
                    }
                    continue;
                }
                owners.insert(action.clone(), profile.name.clone());
            }

            debug!(
                profile = %profile.name,
                mode = ?profile.framing_mode,
                tokens = profile.type_table.len(),
                "profile loaded"
            );
            profiles.push(Arc::new(profile));
        }

        info!(count = profiles.len(), "vendor profiles loaded");
        Ok(Self { profiles })
    }

    /// 解析配置定义JSON数组
    pub fn from_json(json_str: &str) -> Result<Self, ScanError> {
        let definitions: Vec<ProfileDefinition> = serde_json::from_str(json_str)
            .map_err(|e| ScanError::InvalidProfile(format!("Failed to parse profile JSON: {e}")))?;
        Self::from_definitions(definitions)
    }

    /// 从文件加载
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ScanError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| {
            ScanError::InvalidProfile(format!("Failed to read {}: {e}", path.display()))
        })?;
        Self::from_json(&json)
    }

    pub fn profiles(&self) -> &[Arc<VendorProfile>] {
        &self.profiles
    }

    pub fn get(&self, name: &str) -> Option<&Arc<VendorProfile>> {
        self.profiles.iter().find(|p| p.name == name)
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }

    /// 按配置顺序生成适配器
    pub fn adapters(&self) -> Vec<Arc<dyn VendorAdapter>> {
        self.profiles
            .iter()
            .map(|p| Arc::new(ProfileAdapter::new(Arc::clone(p))) as Arc<dyn VendorAdapter>)
            .collect()
    }
}

/// 校验单个配置定义
pub fn build_profile(definition: ProfileDefinition) -> Result<VendorProfile, ScanError> {
    let name = definition.name.trim().to_string();
    if name.is_empty() {
        return Err(ScanError::InvalidProfile("profile name is empty".to_string()));
    }
    let invalid = |reason: &str| ScanError::InvalidProfile(format!("{name}: {reason}"));

    if definition.actions.is_empty() || definition.actions.iter().any(|a| a.trim().is_empty()) {
        return Err(invalid("at least one non-empty action is required"));
    }

    match definition.framing_mode {
        FramingMode::Streamed => {
            if definition.terminator.as_ref().map_or(true, |t| t.is_empty()) {
                return Err(invalid("streamed profiles require a non-empty terminator"));
            }
            if definition.max_buffer == Some(0) {
                return Err(invalid("max_buffer must be positive"));
            }
        }
        _ => {
            if definition.terminator.is_some() || definition.max_buffer.is_some() {
                return Err(invalid("terminator and max_buffer apply to streamed profiles only"));
            }
        }
    }

    let type_table = SymbologyTable::from_entries(definition.token_kind, &definition.type_table)
        .map_err(|e| invalid(&e))?;

    Ok(VendorProfile {
        actions: definition.actions,
        framing_mode: definition.framing_mode,
        type_table,
        terminator: definition.terminator,
        max_buffer: definition.max_buffer,
        gs1_placeholder: definition.gs1_placeholder,
        text_encoding: definition.text_encoding,
        strip_control: definition.strip_control,
        aim_prefix: definition.aim_prefix,
        name,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use scanbridge_core::{Payload, Symbology};

    #[test]
    fn test_parse_profiles() {
        let set = ProfileSet::from_json(
            r#"[
                {"name": "a", "actions": ["a.scan"], "framing_mode": "single-shot",
                 "token_kind": "signed_byte", "type_table": {"3": "CODE128"}},
                {"name": "b", "actions": ["b.scan"], "framing_mode": "streamed", "terminator": "\n"}
            ]"#,
        )
        .unwrap();

        assert_eq!(set.len(), 2);
        let a = set.get("a").unwrap();
        assert_eq!(
            a.type_table.classify(Some(&Payload::Byte(3))),
            Symbology::Code128
        );
        assert_eq!(set.get("b").unwrap().terminator, Some(b"\n".to_vec()));
    }

    #[test]
    fn test_action_conflict() {
        let result = ProfileSet::from_json(
            r#"[
                {"name": "a", "actions": ["shared"], "framing_mode": "single-shot"},
                {"name": "b", "actions": ["shared"], "framing_mode": "multi-field"}
            ]"#,
        );
        assert_eq!(
            result.unwrap_err(),
            ScanError::ConfigurationConflict {
                action: "shared".to_string(),
                first: "a".to_string(),
                second: "b".to_string(),
            }
        );
    }

    #[test]
    fn test_streamed_requires_terminator() {
        let result = ProfileSet::from_json(
            r#"[{"name": "s", "actions": ["s"], "framing_mode": "streamed"}]"#,
        );
        assert!(matches!(result, Err(ScanError::InvalidProfile(_))));
    }

    #[test]
    fn test_terminator_rejected_outside_streamed() {
        let result = ProfileSet::from_json(
            r#"[{"name": "s", "actions": ["s"], "framing_mode": "single-shot", "terminator": "\n"}]"#,
        );
        assert!(matches!(result, Err(ScanError::InvalidProfile(_))));
    }

    #[test]
    fn test_bad_type_token() {
        let result = ProfileSet::from_json(
            r#"[{"name": "s", "actions": ["s"], "framing_mode": "single-shot",
                 "token_kind": "signed_byte", "type_table": {"999": "EAN"}}]"#,
        );
        assert!(matches!(result, Err(ScanError::InvalidProfile(_))));
    }

    #[test]
    fn test_duplicate_name() {
        let result = ProfileSet::from_json(
            r#"[
                {"name": "a", "actions": ["x"], "framing_mode": "single-shot"},
                {"name": "a", "actions": ["y"], "framing_mode": "single-shot"}
            ]"#,
        );
        assert!(matches!(result, Err(ScanError::InvalidProfile(_))));
    }

    #[test]
    fn test_adapters_keep_order() {
        let set = ProfileSet::from_json(
            r#"[
                {"name": "first", "actions": ["1"], "framing_mode": "single-shot"},
                {"name": "second", "actions": ["2"], "framing_mode": "single-shot"}
            ]"#,
        )
        .unwrap();
        let names: Vec<String> = set.adapters().iter().map(|a| a.name().to_string()).collect();
        assert_eq!(names, vec!["first", "second"]);
    }
}
