//! 编排层（Orchestration Layer）
//!
//! ## 职责
//!
//! 本层负责批量处理和进度汇报，是整个系统的"指挥中心"。
//!
//! ### `batch_processor` - 批量处理器
//! - 按型号去重（首次出现优先）
//! - 逐条调用推荐流程，单条失败不影响其他条目
//! - 每条完成后通过回调汇报进度
//! - 输出全局统计信息
//!
//! ## 层次关系
//!
//! ```text
//! orchestrator::BatchProcessor (处理 Vec<ComponentInput>)
//!     ↓
//! workflow::RecommendFlow (处理单个型号)
//!     ↓
//! services (能力层：extractor / classifier / catalog / cache)
//!     ↓
//! clients (传输层：LlmClient / NexarClient)
//! ```

pub mod batch_processor;

pub use batch_processor::BatchProcessor;
