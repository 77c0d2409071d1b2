//! Nexar 目录搜索客户端
//!
//! 通过 GraphQL 查询 Nexar 的替代元器件数据。访问令牌使用
//! client_credentials 方式获取并在进程内缓存，过期前复用。

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use serde_json::{json, Value};
use std::sync::Mutex;
use tracing::{debug, warn};

use crate::clients::CatalogSource;
use crate::config::Config;

/// 查询替代元器件的 GraphQL 语句
const QUERY_ALTERNATIVE_PARTS: &str = r#"
query findAlternativeParts($q: String!, $limit: Int = 10) {
  supSearchMpn(q: $q, limit: $limit) {
    hits
    results {
      part {
        similarParts {
          name
          mpn
          octopartUrl
        }
      }
    }
  }
}
"#;

/// 令牌过期前的安全余量（秒）
const TOKEN_EXPIRY_MARGIN_SECS: i64 = 60;

struct CachedToken {
    access_token: String,
    expires_at: DateTime<Utc>,
}

/// Nexar API 客户端
pub struct NexarClient {
    http: reqwest::Client,
    api_url: String,
    identity_url: String,
    client_id: String,
    client_secret: String,
    token: Mutex<Option<CachedToken>>,
}

impl NexarClient {
    /// 创建新的目录搜索客户端
    pub fn new(config: &Config) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_url: config.nexar_api_url.clone(),
            identity_url: config.nexar_identity_url.clone(),
            client_id: config.nexar_client_id.clone(),
            client_secret: config.nexar_client_secret.clone(),
            token: Mutex::new(None),
        }
    }

    /// 获取访问令牌，优先复用缓存
    async fn access_token(&self) -> Result<String> {
        // 先查缓存（锁不能跨 await 持有）
        {
            let cached = self.token.lock().unwrap_or_else(|e| e.into_inner());
            if let Some(token) = cached.as_ref() {
                if Utc::now() < token.expires_at {
                    return Ok(token.access_token.clone());
                }
            }
        }

        debug!("获取新的 Nexar 访问令牌");

        let response: Value = self
            .http
            .post(&self.identity_url)
            .form(&[
                ("grant_type", "client_credentials"),
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("scope", "supply.domain"),
            ])
            .send()
            .await
            .context("请求访问令牌失败")?
            .error_for_status()
            .context("令牌端点返回错误状态")?
            .json()
            .await
            .context("令牌响应不是有效 JSON")?;

        let access_token = response
            .get("access_token")
            .and_then(|v| v.as_str())
            .context("令牌响应缺少 access_token 字段")?
            .to_string();
        let expires_in = response
            .get("expires_in")
            .and_then(|v| v.as_i64())
            .unwrap_or(3600);

        let expires_at =
            Utc::now() + Duration::seconds((expires_in - TOKEN_EXPIRY_MARGIN_SECS).max(0));

        let mut cached = self.token.lock().unwrap_or_else(|e| e.into_inner());
        *cached = Some(CachedToken {
            access_token: access_token.clone(),
            expires_at,
        });

        Ok(access_token)
    }
}

impl CatalogSource for NexarClient {
    /// 搜索替代元器件
    ///
    /// # 参数
    /// - `query`: 查询型号
    /// - `limit`: 返回条目上限
    ///
    /// # 返回
    /// 返回 GraphQL 响应中的 `data` 子结构（形状不做任何保证）
    async fn search(&self, query: &str, limit: usize) -> Result<Value> {
        let token = self.access_token().await?;

        let body = json!({
            "query": QUERY_ALTERNATIVE_PARTS,
            "variables": { "q": query, "limit": limit }
        });

        debug!("Nexar 搜索: {} (limit={})", query, limit);

        let response: Value = self
            .http
            .post(&self.api_url)
            .bearer_auth(token)
            .json(&body)
            .send()
            .await
            .context("目录搜索请求失败")?
            .error_for_status()
            .context("目录搜索返回错误状态")?
            .json()
            .await
            .context("目录搜索响应不是有效 JSON")?;

        // GraphQL 层面的错误不算传输成功
        if let Some(errors) = response.get("errors") {
            if !errors.is_null() {
                warn!("Nexar 返回 GraphQL 错误: {}", errors);
                anyhow::bail!("目录搜索返回 GraphQL 错误: {}", errors);
            }
        }

        Ok(response.get("data").cloned().unwrap_or(Value::Null))
    }
}
