use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ========== 字段缺省值 ==========
// 生成结果经常缺字段，补全后保证每条记录结构完整

pub const UNKNOWN_MODEL: &str = "未知型号";
pub const UNKNOWN_BRAND: &str = "未知品牌";
pub const UNKNOWN_CATEGORY: &str = "未知类别";
pub const UNKNOWN_PACKAGE: &str = "未知封装";
pub const UNKNOWN_PARAMETERS: &str = "参数未知";
pub const PLACEHOLDER_DATASHEET: &str = "https://www.example.com/datasheet";

/// 推荐方案的产地标注
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(from = "String")]
pub enum Provenance {
    /// 中国大陆本土品牌
    #[serde(rename = "国产")]
    Domestic,
    /// 国外品牌
    #[serde(rename = "进口")]
    Import,
    /// 未标注或无法识别
    #[default]
    #[serde(rename = "未知")]
    Unknown,
}

impl Provenance {
    /// 从生成结果中的标注文本解析，无法识别的标注一律视为未知
    pub fn from_label(label: &str) -> Self {
        match label.trim() {
            "国产" => Provenance::Domestic,
            "进口" => Provenance::Import,
            _ => Provenance::Unknown,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Provenance::Domestic => "国产",
            Provenance::Import => "进口",
            Provenance::Unknown => "未知",
        }
    }

    pub fn is_domestic(&self) -> bool {
        matches!(self, Provenance::Domestic)
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, Provenance::Unknown)
    }
}

impl From<String> for Provenance {
    fn from(label: String) -> Self {
        Provenance::from_label(&label)
    }
}

impl std::fmt::Display for Provenance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// 一条替代方案记录
///
/// 字段名与生成结果的 JSON 键保持一致（`type` / `datasheet`），
/// 这样生成结果数组可以直接反序列化为 `Vec<CandidateRecord>`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateRecord {
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub brand: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub package: String,
    #[serde(default)]
    pub parameters: String,
    #[serde(rename = "type", default)]
    pub provenance: Provenance,
    #[serde(rename = "datasheet", default)]
    pub datasheet_url: String,
}

impl Default for CandidateRecord {
    fn default() -> Self {
        Self {
            model: String::new(),
            brand: String::new(),
            category: String::new(),
            package: String::new(),
            parameters: String::new(),
            provenance: Provenance::Unknown,
            datasheet_url: String::new(),
        }
    }
}

impl CandidateRecord {
    /// 补全缺失字段
    ///
    /// 缺失或为空的字段填入固定缺省值，已有内容不会被覆盖
    pub fn complete_defaults(&mut self) {
        fill_if_empty(&mut self.model, UNKNOWN_MODEL);
        fill_if_empty(&mut self.brand, UNKNOWN_BRAND);
        fill_if_empty(&mut self.category, UNKNOWN_CATEGORY);
        fill_if_empty(&mut self.package, UNKNOWN_PACKAGE);
        fill_if_empty(&mut self.parameters, UNKNOWN_PARAMETERS);
        fill_if_empty(&mut self.datasheet_url, PLACEHOLDER_DATASHEET);
    }

    /// 判断该记录的型号是否与给定型号相同（忽略大小写）
    pub fn is_same_model(&self, mpn: &str) -> bool {
        self.model.trim().eq_ignore_ascii_case(mpn.trim())
    }
}

fn fill_if_empty(field: &mut String, default: &str) {
    if field.trim().is_empty() {
        *field = default.to_string();
    }
}

impl std::fmt::Display for CandidateRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} | {} | {} | {} [{}]",
            self.model, self.brand, self.category, self.package, self.provenance
        )
    }
}

/// 目录搜索返回的一条原始替代件
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogHit {
    pub alternate_mpn: String,
    pub display_name: String,
    pub reference_url: String,
}

impl std::fmt::Display for CatalogHit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "型号: {}, 名称: {}, 链接: {}",
            self.alternate_mpn, self.display_name, self.reference_url
        )
    }
}

/// 单个型号的推荐结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryResult {
    /// 原始查询型号
    pub query: String,
    /// 最多 3 条推荐记录
    pub candidates: Vec<CandidateRecord>,
    /// 是否满足"至少 3 条且含国产方案"的目标（尽力而为，不保证）
    pub policy_satisfied: bool,
    /// 完成时间
    pub completed_at: DateTime<Utc>,
}

impl QueryResult {
    pub fn has_domestic(&self) -> bool {
        self.candidates.iter().any(|c| c.provenance.is_domestic())
    }
}

/// 批量输入的一行元器件信息
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentInput {
    pub mpn: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
}

impl ComponentInput {
    pub fn from_mpn(mpn: impl Into<String>) -> Self {
        Self {
            mpn: mpn.into(),
            name: String::new(),
            description: String::new(),
        }
    }
}

/// 批量处理中单个条目的结果
///
/// 每个条目独立成败，一个条目的失败不影响其他条目
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchItem {
    pub input: ComponentInput,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<QueryResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl BatchItem {
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// 缓存条目
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry {
    pub query: String,
    pub result: QueryResult,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl CacheEntry {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }
}
