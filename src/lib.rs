//! # Substitute Recommend
//!
//! 一个为电子元器件推荐国产替代方案的 Rust 库
//!
//! ## 架构设计
//!
//! 本系统采用严格的四层架构：
//!
//! ### ① 传输层（Clients）
//! - `clients/` - 封装对上游服务的原始调用，只暴露能力
//! - `LlmClient` - OpenAI 兼容的生成式接口
//! - `NexarClient` - 目录搜索的 GraphQL 接口
//! - `GenerativeSource` / `CatalogSource` - 上游的抽象边界
//!
//! ### ② 业务能力层（Services）
//! - `services/` - 描述"我能做什么"，只处理单个查询
//! - `extractor` - 从生成文本中提取推荐记录
//! - `classifier` - 国产品牌识别
//! - `catalog_service` - 目录响应归一化
//! - `cache` - 带过期时间的推荐结果缓存
//!
//! ### ③ 流程层（Workflow）
//! - `workflow/` - 定义"一个型号"的完整推荐流程
//! - `RecommendFlow` - 流程编排（缓存 → 目录 → 生成 → 回填 → 重试）
//!
//! ### ④ 编排层（Orchestration）
//! - `orchestrator/batch_processor` - 批量处理器，去重、失败隔离、进度汇报
//!
//! ## 模块结构

pub mod clients;
pub mod config;
pub mod error;
pub mod models;
pub mod orchestrator;
pub mod services;
pub mod utils;
pub mod workflow;

// 重新导出常用类型
pub use clients::{CatalogSource, GenerativeSource, LlmClient, NexarClient};
pub use config::Config;
pub use error::{AppError, AppResult};
pub use models::{
    BatchItem, CandidateRecord, CatalogHit, ComponentInput, Provenance, QueryResult,
};
pub use orchestrator::BatchProcessor;
pub use services::{
    extract_candidates, CacheStats, CatalogService, DomesticBrandRegistry, RecommendCache,
};
pub use workflow::RecommendFlow;
