//! 目录搜索结果归一化 - 业务能力层
//!
//! 上游目录 API 的响应形状不可信任：可能是标准的 results 列表，
//! 可能把 part 直接挂在顶层，键也可能缺失或类型不对。本模块是
//! 唯一允许解释该响应形状的地方：先识别形状，再由对应的窄转换
//! 函数提取，识别不出的形状降级为空列表加一条诊断日志。
//! 绝不凭空编造条目。

use serde_json::Value;
use tracing::{debug, warn};

use crate::clients::CatalogSource;
use crate::models::CatalogHit;

/// 目录搜索服务
pub struct CatalogService<C> {
    client: C,
}

impl<C: CatalogSource> CatalogService<C> {
    /// 创建新的目录搜索服务
    pub fn new(client: C) -> Self {
        Self { client }
    }

    /// 查询替代元器件
    ///
    /// 尽力而为：传输失败或响应形状无法识别时返回空列表，
    /// 绝不向上抛错。返回条目保持上游顺序，最多 `limit` 条。
    pub async fn lookup(&self, query: &str, limit: usize) -> Vec<CatalogHit> {
        let data = match self.client.search(query, limit).await {
            Ok(data) => data,
            Err(e) => {
                warn!("目录搜索请求失败 ({}): {}", query, e);
                return Vec::new();
            }
        };

        let hits = normalize_response(&data, limit);
        if hits.is_empty() {
            debug!("目录搜索未能为 '{}' 找到替代元器件", query);
        } else {
            debug!("目录搜索为 '{}' 找到 {} 条替代元器件", query, hits.len());
        }
        hits
    }
}

/// 识别出的响应形状
enum ResponseShape<'a> {
    /// 标准形状：supSearchMpn.results[].part.similarParts[]
    ResultsList(&'a [Value]),
    /// 退化形状：supSearchMpn.part.similarParts[]
    DirectPart(&'a Value),
    /// 兜底形状：顶层任意对象值里带 parts 数组
    BareParts(Vec<&'a Value>),
    /// 无法识别
    Unrecognized,
}

fn detect_shape(data: &Value) -> ResponseShape<'_> {
    let Some(root) = data.as_object() else {
        return ResponseShape::Unrecognized;
    };

    match root.get("supSearchMpn") {
        Some(Value::Object(sup)) => {
            if let Some(Value::Array(results)) = sup.get("results") {
                return ResponseShape::ResultsList(results);
            }
            // results 不是列表时，尝试直接挂在顶层的 part
            if let Some(part @ Value::Object(_)) = sup.get("part") {
                return ResponseShape::DirectPart(part);
            }
            ResponseShape::Unrecognized
        }
        _ => {
            // supSearchMpn 缺失或不是对象，扫描顶层找疑似部件列表
            let parts: Vec<&Value> = root
                .values()
                .filter_map(|v| v.as_object())
                .filter_map(|obj| obj.get("parts"))
                .filter_map(|v| v.as_array())
                .flatten()
                .collect();
            if parts.is_empty() {
                ResponseShape::Unrecognized
            } else {
                ResponseShape::BareParts(parts)
            }
        }
    }
}

/// 把未经解释的响应归一化为替代件列表
pub fn normalize_response(data: &Value, limit: usize) -> Vec<CatalogHit> {
    let mut hits = match detect_shape(data) {
        ResponseShape::ResultsList(results) => hits_from_results_list(results),
        ResponseShape::DirectPart(part) => {
            warn!("目录搜索返回了非标准结构 (results 不是列表)");
            hits_from_part(part)
        }
        ResponseShape::BareParts(parts) => {
            warn!("目录搜索返回了非标准结构 (supSearchMpn 不是对象)");
            parts.iter().filter_map(|p| hit_from_similar(p)).collect()
        }
        ResponseShape::Unrecognized => {
            warn!("目录搜索返回了无法识别的结构，按无结果处理");
            Vec::new()
        }
    };

    hits.truncate(limit);
    hits
}

/// 标准形状的转换：逐层宽容提取，类型不对的节点直接跳过
fn hits_from_results_list(results: &[Value]) -> Vec<CatalogHit> {
    results
        .iter()
        .filter_map(|result| result.get("part"))
        .flat_map(hits_from_part)
        .collect()
}

fn hits_from_part(part: &Value) -> Vec<CatalogHit> {
    part.get("similarParts")
        .and_then(|v| v.as_array())
        .map(|similar_parts| {
            similar_parts
                .iter()
                .filter_map(hit_from_similar)
                .collect()
        })
        .unwrap_or_default()
}

/// 单条 similarPart 的转换
///
/// 型号缺失的条目没有回填价值，直接丢弃；名称和链接缺失则留空
fn hit_from_similar(similar: &Value) -> Option<CatalogHit> {
    let obj = similar.as_object()?;

    let mpn = obj.get("mpn").and_then(|v| v.as_str())?.trim();
    if mpn.is_empty() {
        return None;
    }

    Some(CatalogHit {
        alternate_mpn: mpn.to_string(),
        display_name: obj
            .get("name")
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string(),
        reference_url: obj
            .get("octopartUrl")
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_normalize_results_list_shape() {
        let data = json!({
            "supSearchMpn": {
                "hits": 2,
                "results": [
                    {
                        "part": {
                            "similarParts": [
                                {"name": "GD32F103C8T6 MCU", "mpn": "GD32F103C8T6", "octopartUrl": "https://octopart.com/a"},
                                {"name": "APM32F103C8T6 MCU", "mpn": "APM32F103C8T6", "octopartUrl": "https://octopart.com/b"}
                            ]
                        }
                    }
                ]
            }
        });

        let hits = normalize_response(&data, 10);
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].alternate_mpn, "GD32F103C8T6");
        assert_eq!(hits[0].display_name, "GD32F103C8T6 MCU");
        assert_eq!(hits[1].reference_url, "https://octopart.com/b");
    }

    #[test]
    fn test_normalize_direct_part_shape() {
        let data = json!({
            "supSearchMpn": {
                "results": "oops",
                "part": {
                    "similarParts": [
                        {"name": "CH32F103C8T6", "mpn": "CH32F103C8T6", "octopartUrl": "https://octopart.com/c"}
                    ]
                }
            }
        });

        let hits = normalize_response(&data, 10);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].alternate_mpn, "CH32F103C8T6");
    }

    #[test]
    fn test_normalize_bare_parts_shape() {
        let data = json!({
            "something": {
                "parts": [
                    {"name": "MM32F103", "mpn": "MM32F103CBT6"}
                ]
            }
        });

        let hits = normalize_response(&data, 10);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].alternate_mpn, "MM32F103CBT6");
        // 缺失的链接留空
        assert_eq!(hits[0].reference_url, "");
    }

    #[test]
    fn test_normalize_unrecognized_shapes() {
        assert!(normalize_response(&Value::Null, 10).is_empty());
        assert!(normalize_response(&json!([1, 2, 3]), 10).is_empty());
        assert!(normalize_response(&json!({"supSearchMpn": "nope"}), 10).is_empty());
        assert!(normalize_response(&json!({"supSearchMpn": {"results": 42}}), 10).is_empty());
    }

    #[test]
    fn test_normalize_skips_malformed_nodes() {
        let data = json!({
            "supSearchMpn": {
                "results": [
                    "not an object",
                    {"part": "not an object"},
                    {"part": {"similarParts": "not a list"}},
                    {"part": {"similarParts": [
                        "not an object",
                        {"name": "无型号条目"},
                        {"mpn": "  "},
                        {"mpn": "BY25Q64AS", "name": "BYD flash"}
                    ]}}
                ]
            }
        });

        let hits = normalize_response(&data, 10);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].alternate_mpn, "BY25Q64AS");
    }

    #[test]
    fn test_normalize_respects_limit_and_order() {
        let similar: Vec<Value> = (0..8)
            .map(|i| json!({"mpn": format!("PART-{}", i), "name": ""}))
            .collect();
        let data = json!({
            "supSearchMpn": { "results": [ {"part": {"similarParts": similar}} ] }
        });

        let hits = normalize_response(&data, 3);
        assert_eq!(hits.len(), 3);
        assert_eq!(hits[0].alternate_mpn, "PART-0");
        assert_eq!(hits[2].alternate_mpn, "PART-2");
    }

    // lookup 的传输失败路径在 tests/pipeline_test.rs 中覆盖
}
