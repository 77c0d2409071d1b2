//! 批量处理器 - 编排层
//!
//! ## 职责
//!
//! 1. **去重**：按归一化型号去重，首次出现的行优先
//! 2. **失败隔离**：逐条调用推荐流程，单条报错只记入该条目
//! 3. **进度汇报**：每条完成后回调 `(完成比例, 可读标签)`
//! 4. **全局统计**：汇总成功/失败数并输出
//!
//! ## 设计特点
//!
//! - 条目之间相互独立，输出保持去重后的输入顺序
//! - 顺序处理，阻塞在每次生成/目录调用上
//! - 不做具体业务判断，向下委托 `RecommendFlow`

use tracing::{error, info, warn};

use crate::clients::{CatalogSource, GenerativeSource};
use crate::models::{BatchItem, ComponentInput};
use crate::services::RecommendCache;
use crate::workflow::RecommendFlow;

/// 批量处理器
pub struct BatchProcessor<G, C> {
    flow: RecommendFlow<G, C>,
}

/// 批量处理统计
#[derive(Debug, Default)]
struct BatchStats {
    success: usize,
    failed: usize,
}

impl<G: GenerativeSource, C: CatalogSource> BatchProcessor<G, C> {
    /// 创建新的批量处理器
    pub fn new(flow: RecommendFlow<G, C>) -> Self {
        Self { flow }
    }

    /// 推荐流程句柄
    pub fn flow(&self) -> &RecommendFlow<G, C> {
        &self.flow
    }

    /// 缓存句柄（供调用方做清理和统计）
    pub fn cache(&self) -> &RecommendCache {
        self.flow.cache()
    }

    /// 批量解析替代方案
    ///
    /// # 参数
    /// - `items`: 输入行（型号 + 可选名称/描述）
    /// - `on_progress`: 每条完成后的进度回调 `(完成比例, 标签)`
    ///
    /// # 返回
    /// 每个去重后的条目各返回一个 `BatchItem`，失败条目的
    /// `error` 字段被填充，不会中断整批处理
    pub async fn process_batch<F>(
        &self,
        items: Vec<ComponentInput>,
        mut on_progress: F,
    ) -> Vec<BatchItem>
    where
        F: FnMut(f64, &str),
    {
        let deduped = dedup_by_mpn(items);
        let total = deduped.len();

        if total == 0 {
            warn!("⚠️ 没有待处理的元器件，批量处理结束");
            return Vec::new();
        }

        log_batch_start(total);

        let mut results = Vec::with_capacity(total);
        let mut stats = BatchStats::default();

        for (index, input) in deduped.into_iter().enumerate() {
            let label = progress_label(index + 1, total, &input);
            info!("{}", label);

            match self.flow.resolve(&input.mpn).await {
                Ok(result) => {
                    stats.success += 1;
                    results.push(BatchItem {
                        input,
                        result: Some(result),
                        error: None,
                    });
                }
                Err(e) => {
                    // 单条失败只记入该条目，继续处理后面的条目
                    error!("处理元器件 {} 时出错: {}", input.mpn, e);
                    stats.failed += 1;
                    results.push(BatchItem {
                        input,
                        result: None,
                        error: Some(e.to_string()),
                    });
                }
            }

            on_progress((index + 1) as f64 / total as f64, &label);
        }

        log_batch_complete(&stats, total);
        results
    }
}

/// 按归一化型号去重，首次出现的行优先
fn dedup_by_mpn(items: Vec<ComponentInput>) -> Vec<ComponentInput> {
    let mut seen = std::collections::HashSet::new();
    items
        .into_iter()
        .filter(|item| seen.insert(item.mpn.trim().to_lowercase()))
        .collect()
}

/// 可读的进度标签
fn progress_label(current: usize, total: usize, input: &ComponentInput) -> String {
    if input.name.is_empty() {
        format!("处理 {}/{}: {}", current, total, input.mpn)
    } else {
        format!("处理 {}/{}: {} ({})", current, total, input.mpn, input.name)
    }
}

// ========== 日志辅助函数 ==========

fn log_batch_start(total: usize) {
    info!("{}", "=".repeat(60));
    info!("🚀 开始批量查询替代方案");
    info!("📋 去重后共 {} 个元器件", total);
    info!("{}", "=".repeat(60));
}

fn log_batch_complete(stats: &BatchStats, total: usize) {
    info!("\n{}", "=".repeat(60));
    info!("📊 批量处理完成统计");
    info!(
        "完成时间: {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    info!("✅ 成功: {}/{}", stats.success, total);
    info!("❌ 失败: {}", stats.failed);
    info!("{}", "=".repeat(60));
}
