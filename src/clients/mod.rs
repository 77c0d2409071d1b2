//! 客户端层
//!
//! 封装对两个上游服务的原始调用：
//! - `LlmClient` - OpenAI 兼容的生成式接口（DeepSeek 等）
//! - `NexarClient` - Nexar 目录搜索的 GraphQL 接口
//!
//! 两个 trait 是流程层与上游之间的唯一边界：上游随时可能失败或
//! 返回空/畸形内容，流程层通过 trait 调用并自行兜底，测试中则用
//! 脚本化的假实现替换真实客户端。

use anyhow::Result;
use serde_json::Value;

pub mod llm_client;
pub mod nexar_client;

pub use llm_client::LlmClient;
pub use nexar_client::NexarClient;

/// 生成式文本来源
///
/// 对上游 LLM 的抽象：给定系统提示词和用户提示词，返回原始文本。
/// 返回内容不保证是有效 JSON，调用方负责提取。
#[allow(async_fn_in_trait)]
pub trait GenerativeSource {
    async fn generate(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        max_tokens: u32,
    ) -> Result<String>;
}

/// 目录搜索来源
///
/// 对上游目录搜索 API 的抽象：返回未经解释的原始 JSON 结构，
/// 其形状不可信任，只允许 `CatalogService` 解释。
#[allow(async_fn_in_trait)]
pub trait CatalogSource {
    async fn search(&self, query: &str, limit: usize) -> Result<Value>;
}
