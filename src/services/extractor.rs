//! 结构化记录提取 - 业务能力层
//!
//! 只负责"从生成文本中提取推荐记录"能力，不关心流程。
//!
//! 生成式接口返回的文本不可信任：可能是裸 JSON，可能包在代码块里，
//! 可能混在说明文字中，也可能带有单引号、尾逗号等格式错误。本模块
//! 按"便宜的先试"的顺序依次尝试一组提取策略，任何一个策略命中即
//! 返回，全部失败时记录诊断并返回空列表——提取永远不会报错。

use regex::Regex;
use serde_json::Value;
use tracing::{debug, warn};

use crate::models::CandidateRecord;
use crate::utils::logging::truncate_text;

/// 提取策略：输入原始文本，命中则返回记录列表
type Strategy = fn(&str) -> Option<Vec<CandidateRecord>>;

/// 按顺序尝试的提取策略链
const STRATEGIES: &[(&str, Strategy)] = &[
    ("直接解析", parse_direct),
    ("代码块提取", parse_code_block),
    ("正则提取数组", parse_regex_array),
    ("首尾括号提取", parse_bracket_span),
    ("修复后重试", parse_with_repair),
];

/// 从生成文本中提取推荐记录
///
/// 永远返回一个列表：提取失败时返回空列表并记录警告，不会报错。
/// 提取成功后每条记录都会补全缺失字段，保证结构完整。
pub fn extract_candidates(raw: &str) -> Vec<CandidateRecord> {
    if raw.trim().is_empty() {
        warn!("生成结果为空响应");
        return Vec::new();
    }

    for (name, strategy) in STRATEGIES {
        if let Some(mut candidates) = strategy(raw) {
            debug!("提取策略 [{}] 命中，得到 {} 条记录", name, candidates.len());
            for candidate in &mut candidates {
                candidate.complete_defaults();
            }
            return candidates;
        }
    }

    warn!(
        "所有提取策略均失败，无法从响应中提取有效的 JSON 数组: {}",
        truncate_text(raw, 120)
    );
    Vec::new()
}

/// 解析一段文本为记录数组
///
/// 顶层必须是 JSON 数组，否则视为未命中
fn parse_array(text: &str) -> Option<Vec<CandidateRecord>> {
    let value: Value = serde_json::from_str(text).ok()?;
    if !value.is_array() {
        return None;
    }
    serde_json::from_value(value).ok()
}

/// 策略 1: 整段文本直接解析
fn parse_direct(raw: &str) -> Option<Vec<CandidateRecord>> {
    parse_array(raw.trim())
}

/// 策略 2: 提取代码块（可选 json 标记）中的内容
fn parse_code_block(raw: &str) -> Option<Vec<CandidateRecord>> {
    let re = Regex::new(r"```(?:json)?\s*\n?([\s\S]*?)\n?```").ok()?;
    let inner = re.captures(raw)?.get(1)?.as_str().trim();
    parse_array(inner)
}

/// 策略 3: 正则搜索第一个"对象数组"形状的片段
fn parse_regex_array(raw: &str) -> Option<Vec<CandidateRecord>> {
    let re = Regex::new(r"(?s)\[\s*\{.*\}\s*\]").ok()?;
    let span = re.find(raw)?.as_str();
    parse_array(span)
}

/// 策略 4: 截取第一个 `[` 到最后一个 `]` 之间的内容
fn parse_bracket_span(raw: &str) -> Option<Vec<CandidateRecord>> {
    let start = raw.find('[')?;
    let end = raw.rfind(']')?;
    if end <= start {
        return None;
    }
    parse_array(&raw[start..=end])
}

/// 策略 5: 修复常见格式错误后重试策略 3-4
///
/// 修复项：单引号替换为双引号，去掉 `}` / `]` 前的尾逗号
fn parse_with_repair(raw: &str) -> Option<Vec<CandidateRecord>> {
    let mut repaired = raw.replace('\'', "\"");
    if let Ok(re) = Regex::new(r",\s*\}") {
        repaired = re.replace_all(&repaired, "}").into_owned();
    }
    if let Ok(re) = Regex::new(r",\s*\]") {
        repaired = re.replace_all(&repaired, "]").into_owned();
    }
    parse_regex_array(&repaired).or_else(|| parse_bracket_span(&repaired))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::part::{
        PLACEHOLDER_DATASHEET, UNKNOWN_BRAND, UNKNOWN_CATEGORY, UNKNOWN_PACKAGE, UNKNOWN_PARAMETERS,
    };
    use crate::models::Provenance;

    #[test]
    fn test_extract_well_formed_array() {
        let raw = r#"[{"model":"GD32F103C8T6","brand":"GigaDevice"}]"#;
        let candidates = extract_candidates(raw);

        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].model, "GD32F103C8T6");
        assert_eq!(candidates[0].brand, "GigaDevice");
        assert_eq!(candidates[0].category, UNKNOWN_CATEGORY);
        assert_eq!(candidates[0].package, UNKNOWN_PACKAGE);
        assert_eq!(candidates[0].parameters, UNKNOWN_PARAMETERS);
        assert_eq!(candidates[0].provenance, Provenance::Unknown);
        assert_eq!(candidates[0].datasheet_url, PLACEHOLDER_DATASHEET);
    }

    #[test]
    fn test_extract_full_record_unchanged() {
        let raw = r#"[{"model":"SG1117-1.2","brand":"SG Micro/圣邦微电子","category":"LDO","package":"DPAK","parameters":"输入电压: 2.0-12V","type":"国产","datasheet":"https://www.sgmicro.com/datasheet"}]"#;
        let candidates = extract_candidates(raw);

        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].brand, "SG Micro/圣邦微电子");
        assert_eq!(candidates[0].category, "LDO");
        assert_eq!(candidates[0].provenance, Provenance::Domestic);
        assert_eq!(
            candidates[0].datasheet_url,
            "https://www.sgmicro.com/datasheet"
        );
    }

    #[test]
    fn test_extract_from_tagged_code_block() {
        let raw = "Here is the result:\n```json\n[{\"model\":\"X1\"}]\n```";
        let candidates = extract_candidates(raw);

        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].model, "X1");
    }

    #[test]
    fn test_extract_from_untagged_code_block() {
        let raw = "推荐如下：\n```\n[{\"model\":\"CH32V003\",\"brand\":\"WCH\"}]\n```\n以上。";
        let candidates = extract_candidates(raw);

        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].model, "CH32V003");
    }

    #[test]
    fn test_extract_array_embedded_in_prose() {
        let raw = "根据要求，推荐结果是 [{\"model\": \"GD25Q64\"}, {\"model\": \"BY25Q64\"}] 希望有帮助。";
        let candidates = extract_candidates(raw);

        assert_eq!(candidates.len(), 2);
        assert_eq!(candidates[0].model, "GD25Q64");
        assert_eq!(candidates[1].model, "BY25Q64");
    }

    #[test]
    fn test_extract_repairs_single_quotes() {
        let raw = "[{'model': 'SGM2036', 'brand': 'SGMICRO'}]";
        let candidates = extract_candidates(raw);

        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].model, "SGM2036");
    }

    #[test]
    fn test_extract_repairs_trailing_commas() {
        let raw = r#"[{"model": "CS5530", "brand": "Chipsea",}, ]"#;
        let candidates = extract_candidates(raw);

        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].model, "CS5530");
    }

    #[test]
    fn test_extract_empty_input_returns_empty() {
        assert!(extract_candidates("").is_empty());
        assert!(extract_candidates("   \n  ").is_empty());
    }

    #[test]
    fn test_extract_garbage_returns_empty() {
        assert!(extract_candidates("抱歉，我无法找到合适的替代方案。").is_empty());
        assert!(extract_candidates("{not valid json at all").is_empty());
    }

    #[test]
    fn test_extract_top_level_object_rejected() {
        // 顶层是对象而不是数组，所有策略都不应命中
        let raw = r#"{"model": "GD32F103C8T6"}"#;
        assert!(extract_candidates(raw).is_empty());
    }

    #[test]
    fn test_extract_empty_array() {
        let candidates = extract_candidates("[]");
        assert!(candidates.is_empty());
    }

    #[test]
    fn test_extract_never_panics_on_odd_input() {
        for raw in ["[", "]", "[]]", "```", "''", "[{]}", "”“[{}]"] {
            let _ = extract_candidates(raw);
        }
    }
}
