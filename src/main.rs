use anyhow::Result;
use tracing::info;

use substitute_recommend::{
    BatchProcessor, ComponentInput, Config, DomesticBrandRegistry, LlmClient, NexarClient,
    RecommendCache, RecommendFlow,
};

#[tokio::main]
async fn main() -> Result<()> {
    // 初始化日志
    substitute_recommend::utils::logging::init();

    // 加载配置
    let config = Config::from_env();

    // 待查询的型号来自命令行参数
    let items: Vec<ComponentInput> = std::env::args()
        .skip(1)
        .map(ComponentInput::from_mpn)
        .collect();
    if items.is_empty() {
        eprintln!("用法: substitute_recommend <型号> [型号...]");
        return Ok(());
    }

    // 品牌注册表：优先使用配置文件，否则用内置名单
    let registry = match &config.brand_registry_file {
        Some(path) => DomesticBrandRegistry::from_toml_file(path)?,
        None => DomesticBrandRegistry::default(),
    };

    // 缓存：配置了快照文件则跨进程复用
    let ttl = chrono::Duration::hours(config.cache_ttl_hours);
    let cache = match &config.cache_file {
        Some(path) => RecommendCache::with_persistence(path, ttl),
        None => RecommendCache::with_ttl(ttl),
    };

    let flow = RecommendFlow::new(
        LlmClient::new(&config),
        NexarClient::new(&config),
        registry,
        cache,
        &config,
    );
    let processor = BatchProcessor::new(flow);

    let results = processor
        .process_batch(items, |fraction, label| {
            info!("[{:>5.1}%] {}", fraction * 100.0, label);
        })
        .await;

    // 输出结果
    for item in &results {
        println!("\n===== {} =====", item.input.mpn);
        match (&item.result, &item.error) {
            (Some(result), _) => {
                if result.candidates.is_empty() {
                    println!("未找到替代方案");
                    continue;
                }
                if !result.policy_satisfied {
                    println!("（注意：推荐结果未达到\"至少 3 条且含国产方案\"的目标）");
                }
                for (i, candidate) in result.candidates.iter().enumerate() {
                    println!("{}. {}", i + 1, candidate);
                    println!("   参数: {}", candidate.parameters);
                    println!("   资料: {}", candidate.datasheet_url);
                }
            }
            (None, Some(error)) => println!("查询失败: {}", error),
            (None, None) => println!("未找到替代方案"),
        }
    }

    let stats = processor.cache().stats();
    info!(
        "缓存统计: 命中 {} / 未命中 {} / 淘汰 {}",
        stats.hits, stats.misses, stats.evictions
    );

    Ok(())
}
