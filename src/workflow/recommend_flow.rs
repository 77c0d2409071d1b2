//! 单个型号的推荐流程 - 流程层
//!
//! 核心职责：定义"一个查询型号"的完整处理流程
//!
//! 流程顺序：
//! 1. 查缓存 → 命中即返回
//! 2. 目录搜索（尽力而为，失败继续）
//! 3. 首次生成 → 提取 → 过滤自引用
//! 4. 不足 3 条时用目录结果回填
//! 5. 识别国产方案 → 检查目标（≥3 条且含国产）
//! 6. 不达标时在重试预算内追加重点生成
//! 7. 截断到 3 条（生成结果优先于回填）→ 写缓存
//!
//! 目标是尽力而为：重试预算用尽后结果原样返回，
//! `QueryResult::policy_satisfied` 告知调用方是否达标。
//! 上游传输错误和提取失败都在本层吸收，唯一向调用方暴露的
//! 错误是空白查询型号。

use anyhow::Result;
use chrono::Utc;
use tracing::{debug, info, warn};

use crate::clients::{CatalogSource, GenerativeSource};
use crate::config::Config;
use crate::error::AppError;
use crate::models::part::UNKNOWN_BRAND;
use crate::models::{CandidateRecord, CatalogHit, Provenance, QueryResult};
use crate::services::{extract_candidates, CatalogService, DomesticBrandRegistry, RecommendCache};

/// 每个查询的目标推荐条数
const TARGET_COUNT: usize = 3;
/// 单次生成的 token 上限
const GENERATE_MAX_TOKENS: u32 = 1000;

const SYSTEM_PROMPT: &str = "你是一个精通中国电子元器件行业的专家，擅长为各种元器件寻找合适的替代方案，\
    尤其专注于中国大陆本土生产的国产元器件。始终以有效的JSON格式回复，不添加任何额外说明。";

/// 候选记录的来源，截断时生成结果优先于目录回填
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum CandidateOrigin {
    Generated,
    CatalogBackfill,
}

#[derive(Debug, Clone)]
struct RankedCandidate {
    record: CandidateRecord,
    origin: CandidateOrigin,
}

/// 推荐流程
///
/// - 编排单个型号的完整推荐流程
/// - 持有业务能力（目录归一化、提取、识别、缓存）
/// - 不关心批量，批量由编排层负责
pub struct RecommendFlow<G, C> {
    llm: G,
    catalog: CatalogService<C>,
    registry: DomesticBrandRegistry,
    cache: RecommendCache,
    catalog_limit: usize,
}

impl<G: GenerativeSource, C: CatalogSource> RecommendFlow<G, C> {
    /// 创建新的推荐流程
    pub fn new(
        llm: G,
        catalog_client: C,
        registry: DomesticBrandRegistry,
        cache: RecommendCache,
        config: &Config,
    ) -> Self {
        Self {
            llm,
            catalog: CatalogService::new(catalog_client),
            registry,
            cache,
            catalog_limit: config.catalog_limit,
        }
    }

    /// 缓存句柄（供调用方做清理和统计）
    pub fn cache(&self) -> &RecommendCache {
        &self.cache
    }

    /// 为一个型号解析替代方案
    ///
    /// # 参数
    /// - `mpn`: 查询型号
    ///
    /// # 返回
    /// 返回最多 3 条推荐；唯一的错误情形是空白型号
    pub async fn resolve(&self, mpn: &str) -> Result<QueryResult> {
        let mpn = mpn.trim();
        if mpn.is_empty() {
            return Err(AppError::empty_query().into());
        }

        // ========== 查缓存 ==========
        if let Some(cached) = self.cache.get(mpn) {
            info!("✓ 命中缓存: {}", mpn);
            return Ok(cached);
        }

        // ========== 目录搜索（尽力而为） ==========
        info!("🔍 查询替代方案: {}", mpn);
        let catalog_hits = self.catalog.lookup(mpn, self.catalog_limit).await;
        if catalog_hits.is_empty() {
            warn!("⚠️ 目录搜索未返回数据，将只依赖生成式推荐: {}", mpn);
        }

        // ========== 首次生成 + 提取 ==========
        let prompt = build_primary_prompt(mpn, &catalog_hits);
        let raw = self.generate_once(&prompt, "初次调用").await;

        let mut candidates: Vec<RankedCandidate> = Vec::new();
        push_candidates(
            &mut candidates,
            extract_candidates(&raw),
            CandidateOrigin::Generated,
            mpn,
        );

        // ========== 目录回填 ==========
        backfill_from_catalog(&mut candidates, &catalog_hits, mpn);

        // ========== 识别国产方案 ==========
        self.classify_unknown(&mut candidates);

        // ========== 重试预算内追加重点生成 ==========
        let retry_budget = TARGET_COUNT.saturating_sub(candidates.len());
        if !policy_met(&candidates) && retry_budget > 0 {
            warn!(
                "⚠️ 推荐结果不足或未包含国产方案，将追加最多 {} 次重点生成: {}",
                retry_budget, mpn
            );
            self.retry_generate(&mut candidates, mpn, retry_budget).await;
        }

        // ========== 收尾：截断、再识别、写缓存 ==========
        // 稳定排序：生成结果优先于目录回填，同来源保持先后顺序
        candidates.sort_by_key(|c| c.origin);
        candidates.truncate(TARGET_COUNT);
        self.classify_unknown(&mut candidates);

        let policy_satisfied = policy_met(&candidates);
        if !policy_satisfied {
            warn!(
                "⚠️ 已用尽重试预算，推荐结果未达到目标 (共 {} 条，国产 {} 条): {}",
                candidates.len(),
                candidates
                    .iter()
                    .filter(|c| c.record.provenance.is_domestic())
                    .count(),
                mpn
            );
        }

        let result = QueryResult {
            query: mpn.to_string(),
            candidates: candidates.into_iter().map(|c| c.record).collect(),
            policy_satisfied,
            completed_at: Utc::now(),
        };

        self.cache.put(mpn, result.clone());
        info!(
            "✓ 查询完成: {} ({} 条推荐, 达标: {})",
            mpn,
            result.candidates.len(),
            policy_satisfied
        );
        Ok(result)
    }

    /// 重试状态：每次重试独立走提取/过滤/去重/识别
    async fn retry_generate(
        &self,
        candidates: &mut Vec<RankedCandidate>,
        mpn: &str,
        retry_budget: usize,
    ) {
        for attempt in 1..=retry_budget {
            if policy_met(candidates) {
                break;
            }
            let needed = TARGET_COUNT.saturating_sub(candidates.len());
            if needed == 0 {
                break;
            }

            let prompt = build_retry_prompt(mpn, needed);
            let label = format!("重新调用，第 {} 次", attempt);
            let raw = self.generate_once(&prompt, &label).await;

            let extracted = extract_candidates(&raw);
            if extracted.is_empty() {
                warn!("重新调用第 {} 次未返回有效推荐: {}", attempt, mpn);
                continue;
            }

            push_candidates(candidates, extracted, CandidateOrigin::Generated, mpn);
            self.classify_unknown(candidates);
        }
    }

    /// 单次生成调用，传输错误在这里吸收为空响应
    async fn generate_once(&self, user_prompt: &str, call_label: &str) -> String {
        match self
            .llm
            .generate(SYSTEM_PROMPT, user_prompt, GENERATE_MAX_TOKENS)
            .await
        {
            Ok(text) => text,
            Err(e) => {
                warn!("生成调用失败 ({}): {}", call_label, e);
                String::new()
            }
        }
    }

    /// 对产地未知的候选做国产识别
    ///
    /// 只提升"未知"，绝不覆盖生成结果里已有的"国产"/"进口"标注
    fn classify_unknown(&self, candidates: &mut [RankedCandidate]) {
        for candidate in candidates {
            let record = &mut candidate.record;
            if record.provenance.is_unknown() {
                let text = format!("{} {}", record.model, record.brand);
                if self.registry.is_domestic(&text) {
                    debug!("识别为国产方案: {}", record.model);
                    record.provenance = Provenance::Domestic;
                }
            }
        }
    }
}

/// 目标判定：至少 3 条且含国产方案
fn policy_met(candidates: &[RankedCandidate]) -> bool {
    candidates.len() >= TARGET_COUNT
        && candidates
            .iter()
            .any(|c| c.record.provenance.is_domestic())
}

/// 追加候选：跳过与查询型号相同的记录和已有型号的重复记录
fn push_candidates(
    acc: &mut Vec<RankedCandidate>,
    records: Vec<CandidateRecord>,
    origin: CandidateOrigin,
    mpn: &str,
) {
    for record in records {
        if record.is_same_model(mpn) {
            debug!("过滤与查询型号相同的推荐: {}", record.model);
            continue;
        }
        if acc.iter().any(|c| c.record.is_same_model(&record.model)) {
            debug!("过滤重复推荐: {}", record.model);
            continue;
        }
        acc.push(RankedCandidate { record, origin });
    }
}

/// 回填状态：生成结果不足 3 条时用目录命中补足
///
/// 回填条目产地标注为"未知"（低置信），后续由识别步骤提升
fn backfill_from_catalog(
    acc: &mut Vec<RankedCandidate>,
    catalog_hits: &[CatalogHit],
    mpn: &str,
) {
    for hit in catalog_hits {
        if acc.len() >= TARGET_COUNT {
            break;
        }
        if hit.alternate_mpn.eq_ignore_ascii_case(mpn) {
            continue;
        }
        if acc
            .iter()
            .any(|c| c.record.is_same_model(&hit.alternate_mpn))
        {
            continue;
        }

        let mut record = CandidateRecord {
            model: hit.alternate_mpn.clone(),
            brand: hit
                .display_name
                .split_whitespace()
                .next()
                .unwrap_or(UNKNOWN_BRAND)
                .to_string(),
            datasheet_url: hit.reference_url.clone(),
            provenance: Provenance::Unknown,
            ..Default::default()
        };
        record.complete_defaults();

        debug!("目录回填: {}", record.model);
        acc.push(RankedCandidate {
            record,
            origin: CandidateOrigin::CatalogBackfill,
        });
    }
}

// ========== 提示词构造 ==========

/// 目录命中转为提示词上下文
fn build_catalog_context(catalog_hits: &[CatalogHit]) -> String {
    if catalog_hits.is_empty() {
        return "无目录搜索数据可用，请直接推荐替代元器件。\n".to_string();
    }

    let mut context = String::from("目录搜索提供的替代元器件数据：\n");
    for (i, hit) in catalog_hits.iter().enumerate() {
        context.push_str(&format!("{}. {}\n", i + 1, hit));
    }
    context
}

/// 首次生成的提示词：嵌入查询型号、目录上下文和全部硬性要求
fn build_primary_prompt(mpn: &str, catalog_hits: &[CatalogHit]) -> String {
    let context = build_catalog_context(catalog_hits);
    format!(
        r#"任务：你是一个专业的电子元器件顾问，专精于国产替代方案。以下是目录搜索提供的替代元器件数据，请结合这些数据为输入元器件推荐替代产品。推荐的替代方案必须与输入型号 {mpn} 不同（绝对不能推荐 {mpn} 或其变体，如 {mpn} 的不同封装）。

输入元器件型号：{mpn}

{context}
要求：
1. 必须推荐至少一种中国大陆本土品牌的替代方案（如 GigaDevice/兆易创新、WCH/沁恒、复旦微电子、中颖电子、圣邦微电子等）
2. 如果能找到多种中国大陆本土品牌的替代产品，优先推荐这些产品，推荐的国产方案数量越多越好
3. 如果实在找不到足够三种中国大陆本土品牌的产品，可以推荐国外品牌产品作为补充，但必须明确标注
4. 总共需要推荐 3 种性能相近的替代型号
5. 提供每种型号的品牌名称、封装信息和元器件类目（例如：MCU、DCDC、LDO、传感器、存储芯片等）
6. 根据元器件类型提供不同的关键参数：
   - 若是MCU/单片机：提供CPU内核、主频、程序存储容量、RAM大小、IO数量
   - 若是DCDC：提供输入电压范围、输出电压、最大输出电流、效率
   - 若是LDO：提供输入电压范围、输出电压、最大输出电流、压差
   - 若是存储器：提供容量、接口类型、读写速度
   - 若是传感器：提供测量范围、精度、接口类型
   - 其他类型提供对应的关键参数
7. 在每个推荐方案中明确标注是"国产"还是"进口"产品
8. 提供产品官网链接（若无真实链接，可提供示例链接，如 https://www.example.com/datasheet）
9. 推荐的型号不能与输入型号 {mpn} 相同
10. 必须严格返回以下 JSON 格式的结果，不允许添加任何额外说明、Markdown 格式或代码块标记（即不要使用 ```json 或其他标记），直接返回裸 JSON：
[
    {{"model": "SG1117-1.2", "brand": "SG Micro/圣邦微电子", "category": "LDO", "package": "DPAK", "parameters": "输入电压: 2.0-12V, 输出电压: 1.2V, 输出电流: 800mA, 压差: 1.1V", "type": "国产", "datasheet": "https://www.sgmicro.com/datasheet"}},
    {{"model": "GD32F103C8T6", "brand": "GigaDevice/兆易创新", "category": "MCU", "package": "LQFP48", "parameters": "CPU内核: ARM Cortex-M3, 主频: 72MHz, Flash: 64KB, RAM: 20KB, IO: 37", "type": "国产", "datasheet": "https://www.gigadevice.com/datasheet"}},
    {{"model": "MP2307DN", "brand": "MPS/芯源系统", "category": "DCDC", "package": "SOIC-8", "parameters": "输入电压: 4.75-23V, 输出电压: 0.925-20V, 输出电流: 3A, 效率: 95%", "type": "进口", "datasheet": "https://www.monolithicpower.com/datasheet"}}
]"#
    )
}

/// 重试的提示词：强调国产优先，只要求补足剩余条数
fn build_retry_prompt(mpn: &str, needed: usize) -> String {
    format!(
        r#"任务：为以下元器件推荐替代产品，推荐的替代方案必须与输入型号 {mpn} 不同（绝对不能推荐 {mpn} 或其变体，如 {mpn} 的不同封装）。
输入元器件型号：{mpn}

之前的推荐结果未包含国产方案或数量不足，请重新推荐，重点关注国产替代方案。

要求：
1. 必须推荐至少一种中国大陆本土品牌的替代方案（如 GigaDevice/兆易创新、WCH/沁恒、复旦微电子、中颖电子、圣邦微电子、3PEAK、Chipsea 等）
2. 优先推荐国产芯片，推荐的国产方案数量越多越好
3. 如果找不到足够的国产方案，可以补充进口方案，但必须明确标注
4. 总共推荐 {needed} 种替代方案
5. 提供每种型号的品牌名称、封装信息和元器件类目（例如：MCU、DCDC、LDO、传感器等）
6. 在每个推荐方案中明确标注是"国产"还是"进口"产品
7. 提供产品官网链接（若无真实链接，可提供示例链接）
8. 推荐的型号不能与输入型号 {mpn} 相同
9. 必须严格返回 JSON 数组格式的结果，不允许添加任何额外说明、Markdown 格式或代码块标记，直接返回裸 JSON：
[
    {{"model": "型号1", "brand": "品牌1", "category": "类别1", "package": "封装1", "parameters": "参数1", "type": "国产/进口", "datasheet": "链接1"}},
    {{"model": "型号2", "brand": "品牌2", "category": "类别2", "package": "封装2", "parameters": "参数2", "type": "国产/进口", "datasheet": "链接2"}}
]
10. 每个推荐项必须包含 "model"、"brand"、"category"、"package"、"parameters"、"type" 和 "datasheet" 七个字段
11. 如果无法找到合适的替代方案，返回空的 JSON 数组：[]"#
    )
}
