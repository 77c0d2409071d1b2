//! 国产品牌识别 - 业务能力层
//!
//! 只负责"判断一段文本是否指向国产品牌"能力，不关心流程。
//!
//! 注册表是数据而不是算法：内置缺省名单覆盖常见国产品牌（含拼音/
//! 英文名与中文名两种写法），调用方也可以用自定义名单或 TOML 文件
//! 替换。匹配是纯函数，流程层只在产地标注为"未知"时才调用它，
//! 不会覆盖生成结果中已有的"国产"/"进口"标注。

use serde::Deserialize;
use std::fs;
use std::path::Path;

use crate::error::{AppError, AppResult, ConfigError};

/// 内置国产品牌名片段（含别名）
pub const DEFAULT_BRAND_FRAGMENTS: &[&str] = &[
    "GigaDevice",
    "兆易创新",
    "WCH",
    "沁恒",
    "Fudan Micro",
    "复旦微电子",
    "Zhongying",
    "中颖电子",
    "SG Micro",
    "圣邦微电子",
    "LD",
    "LDO",
    "SG",
    "SGC",
    "APM",
    "AP",
    "BL",
    "BYD",
    "CETC",
    "CR Micro",
    "CR",
    "HuaDa",
    "HuaHong",
    "SGM",
    "BLD",
    "EUTECH",
    "EUTECH Micro",
    "3PEAK",
    "Chipsea",
    "Chipown",
];

/// TOML 注册表文件的结构
///
/// ```toml
/// fragments = ["GigaDevice", "兆易创新", "WCH"]
/// ```
#[derive(Debug, Deserialize)]
struct RegistryFile {
    fragments: Vec<String>,
}

/// 国产品牌注册表
#[derive(Debug, Clone)]
pub struct DomesticBrandRegistry {
    /// 小写化后的品牌名片段
    fragments: Vec<String>,
}

impl Default for DomesticBrandRegistry {
    fn default() -> Self {
        Self::new(DEFAULT_BRAND_FRAGMENTS.iter().copied())
    }
}

impl DomesticBrandRegistry {
    /// 用自定义片段名单创建注册表
    pub fn new<I, S>(fragments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let fragments = fragments
            .into_iter()
            .map(|f| f.into().trim().to_lowercase())
            .filter(|f| !f.is_empty())
            .collect();
        Self { fragments }
    }

    /// 从 TOML 文件加载注册表
    pub fn from_toml_file(path: impl AsRef<Path>) -> AppResult<Self> {
        let path = path.as_ref();
        let path_display = path.display().to_string();

        let content = fs::read_to_string(path)
            .map_err(|e| AppError::registry_read_failed(&path_display, e))?;
        let file: RegistryFile = toml::from_str(&content)
            .map_err(|e| AppError::registry_parse_failed(&path_display, e))?;

        let registry = Self::new(file.fragments);
        if registry.is_empty() {
            return Err(AppError::Config(ConfigError::RegistryEmpty {
                path: path_display,
            }));
        }
        Ok(registry)
    }

    /// 判断文本是否指向国产品牌
    ///
    /// 忽略大小写；任一注册片段是 `text` 的前缀或出现在其中即命中
    pub fn is_domestic(&self, text: &str) -> bool {
        let text = text.to_lowercase();
        self.fragments
            .iter()
            .any(|fragment| text.starts_with(fragment) || text.contains(fragment))
    }

    pub fn len(&self) -> usize {
        self.fragments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_matches_registered_fragment() {
        let registry = DomesticBrandRegistry::default();

        assert!(registry.is_domestic("GD32F103, GigaDevice"));
        assert!(registry.is_domestic("WCH CH32V307"));
        assert!(registry.is_domestic("圣邦微电子 SGM2036"));
    }

    #[test]
    fn test_no_fragment_returns_false() {
        let registry = DomesticBrandRegistry::new(["GigaDevice", "兆易创新"]);

        assert!(!registry.is_domestic("STM32F103C8T6"));
        assert!(!registry.is_domestic("Texas Instruments TPS5430"));
        assert!(!registry.is_domestic(""));
    }

    #[test]
    fn test_match_is_case_insensitive() {
        let registry = DomesticBrandRegistry::new(["GigaDevice"]);

        assert!(registry.is_domestic("gigadevice gd32"));
        assert!(registry.is_domestic("GIGADEVICE"));
    }

    #[test]
    fn test_matches_prefix_and_substring() {
        let registry = DomesticBrandRegistry::new(["Chipsea"]);

        // 前缀
        assert!(registry.is_domestic("Chipsea CS1237"));
        // 中间出现
        assert!(registry.is_domestic("ADC: chipsea cs1237"));
    }

    #[test]
    fn test_native_script_alias() {
        let registry = DomesticBrandRegistry::default();

        assert!(registry.is_domestic("兆易创新 GD32F103"));
        assert!(registry.is_domestic("沁恒微电子"));
    }

    #[test]
    fn test_custom_registry_replaces_default() {
        let registry = DomesticBrandRegistry::new(["MyBrand"]);

        assert!(registry.is_domestic("MYBRAND-001"));
        assert!(!registry.is_domestic("GigaDevice"));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_blank_fragments_are_dropped() {
        let registry = DomesticBrandRegistry::new(["", "  ", "WCH"]);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_from_toml_file() {
        let path = std::env::temp_dir().join("substitute_recommend_registry_test.toml");
        fs::write(&path, "fragments = [\"GigaDevice\", \"兆易创新\"]\n").unwrap();

        let registry = DomesticBrandRegistry::from_toml_file(&path).unwrap();
        assert_eq!(registry.len(), 2);
        assert!(registry.is_domestic("兆易创新"));

        let _ = fs::remove_file(&path);
    }

    #[test]
    fn test_from_toml_file_invalid() {
        let path = std::env::temp_dir().join("substitute_recommend_registry_bad.toml");
        fs::write(&path, "not valid toml [[[").unwrap();

        assert!(DomesticBrandRegistry::from_toml_file(&path).is_err());

        let _ = fs::remove_file(&path);
    }

    #[test]
    fn test_from_toml_file_empty_registry_rejected() {
        let path = std::env::temp_dir().join("substitute_recommend_registry_empty.toml");
        fs::write(&path, "fragments = []\n").unwrap();

        assert!(DomesticBrandRegistry::from_toml_file(&path).is_err());

        let _ = fs::remove_file(&path);
    }
}
