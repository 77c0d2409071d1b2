//! 推荐结果缓存 - 业务能力层
//!
//! 以归一化后的查询型号为键（去首尾空白并小写化），同一个型号在
//! 不同会话里的重复查询共用一个条目。条目带过期时间，读取时惰性
//! 淘汰。生成式来源本身不具确定性，TTL 窗口内的缓存是重复查询
//! 获得稳定结果的唯一机制。
//!
//! 可选的 JSON 快照文件让缓存跨进程存活：写入走临时文件加原子
//! 改名，读取时坏掉的条目当作未命中直接丢弃。

use chrono::{Duration, Utc};
use serde_json::Value;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, warn};

use crate::error::{AppError, AppResult};
use crate::models::{CacheEntry, QueryResult};

/// 缺省缓存有效期（小时）
pub const DEFAULT_TTL_HOURS: i64 = 72;

/// 缓存命中统计
///
/// 由缓存自身持有，生命周期与缓存一致，不使用全局可变状态
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
}

struct CacheState {
    entries: HashMap<String, CacheEntry>,
    stats: CacheStats,
}

/// 推荐结果缓存
pub struct RecommendCache {
    state: Mutex<CacheState>,
    ttl: Duration,
    snapshot_path: Option<PathBuf>,
}

impl Default for RecommendCache {
    fn default() -> Self {
        Self::new()
    }
}

impl RecommendCache {
    /// 创建缺省有效期（72 小时）的内存缓存
    pub fn new() -> Self {
        Self::with_ttl(Duration::hours(DEFAULT_TTL_HOURS))
    }

    /// 创建自定义有效期的内存缓存
    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            state: Mutex::new(CacheState {
                entries: HashMap::new(),
                stats: CacheStats::default(),
            }),
            ttl,
            snapshot_path: None,
        }
    }

    /// 创建带快照文件的缓存，构造时尝试加载已有快照
    ///
    /// 快照不可读时按空缓存启动，坏掉的条目逐条丢弃，均不报错
    pub fn with_persistence(path: impl Into<PathBuf>, ttl: Duration) -> Self {
        let path = path.into();
        let entries = match load_snapshot(&path) {
            Ok(entries) => entries,
            Err(e) => {
                warn!("{}，按空缓存启动", e);
                HashMap::new()
            }
        };

        Self {
            state: Mutex::new(CacheState {
                entries,
                stats: CacheStats::default(),
            }),
            ttl,
            snapshot_path: Some(path),
        }
    }

    /// 归一化缓存键：去首尾空白并小写化
    pub fn normalize_key(query: &str) -> String {
        query.trim().to_lowercase()
    }

    fn state(&self) -> MutexGuard<'_, CacheState> {
        // 锁中毒时继续使用内部数据，缓存操作不会让数据处于中间态
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// 查询缓存
    ///
    /// 未存储或已过期都视为未命中，过期条目顺手淘汰
    pub fn get(&self, query: &str) -> Option<QueryResult> {
        let key = Self::normalize_key(query);
        let now = Utc::now();
        let mut state = self.state();

        let lookup = match state.entries.get(&key) {
            Some(entry) if entry.is_expired(now) => Some(None),
            Some(entry) => Some(Some(entry.result.clone())),
            None => None,
        };
        match lookup {
            Some(None) => {
                state.entries.remove(&key);
                state.stats.evictions += 1;
                state.stats.misses += 1;
                debug!("缓存条目已过期: {}", key);
                None
            }
            Some(Some(result)) => {
                state.stats.hits += 1;
                Some(result)
            }
            None => {
                state.stats.misses += 1;
                None
            }
        }
    }

    /// 写入缓存（使用缺省有效期），覆盖同键旧条目
    pub fn put(&self, query: &str, result: QueryResult) {
        self.put_with_ttl(query, result, self.ttl);
    }

    /// 写入缓存（自定义有效期）
    pub fn put_with_ttl(&self, query: &str, result: QueryResult, ttl: Duration) {
        let key = Self::normalize_key(query);
        let now = Utc::now();
        let entry = CacheEntry {
            query: key.clone(),
            result,
            created_at: now,
            expires_at: now + ttl,
        };

        let mut state = self.state();
        state.entries.insert(key, entry);
        self.persist(&state);
    }

    /// 清除所有已过期条目
    ///
    /// # 返回
    /// 返回清除的条目数；重复调用是幂等的
    pub fn sweep_expired(&self) -> usize {
        let now = Utc::now();
        let mut state = self.state();

        let before = state.entries.len();
        state.entries.retain(|_, entry| !entry.is_expired(now));
        let removed = before - state.entries.len();

        if removed > 0 {
            state.stats.evictions += removed as u64;
            self.persist(&state);
            debug!("清除了 {} 个过期缓存条目", removed);
        }
        removed
    }

    /// 清空缓存
    ///
    /// # 返回
    /// 返回清除的条目数
    pub fn clear_all(&self) -> usize {
        let mut state = self.state();
        let removed = state.entries.len();
        state.entries.clear();
        self.persist(&state);
        removed
    }

    /// 当前条目数（含尚未惰性淘汰的过期条目）
    pub fn len(&self) -> usize {
        self.state().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state().entries.is_empty()
    }

    /// 命中统计快照
    pub fn stats(&self) -> CacheStats {
        self.state().stats
    }

    /// 尽力写出快照，失败只记日志
    fn persist(&self, state: &CacheState) {
        let Some(path) = &self.snapshot_path else {
            return;
        };
        if let Err(e) = write_snapshot(path, &state.entries) {
            warn!("{}", e);
        }
    }
}

/// 加载快照文件
///
/// 整个文件解析失败时报错（调用方按空缓存处理）；
/// 单个条目坏掉只丢该条目
fn load_snapshot(path: &Path) -> AppResult<HashMap<String, CacheEntry>> {
    if !path.exists() {
        return Ok(HashMap::new());
    }
    let path_display = path.display().to_string();

    let content = fs::read_to_string(path)
        .map_err(|e| AppError::snapshot_read_failed(&path_display, e))?;
    let values: Vec<Value> = serde_json::from_str(&content)
        .map_err(|e| AppError::snapshot_parse_failed(&path_display, e))?;

    let mut entries = HashMap::new();
    for value in values {
        match serde_json::from_value::<CacheEntry>(value) {
            Ok(entry) => {
                entries.insert(entry.query.clone(), entry);
            }
            Err(e) => {
                warn!("缓存快照中有无法解析的条目，已丢弃: {}", e);
            }
        }
    }

    debug!("从快照加载了 {} 个缓存条目: {}", entries.len(), path_display);
    Ok(entries)
}

/// 写出快照文件：先写临时文件再原子改名，读取方不会看到写了一半的内容
fn write_snapshot(path: &Path, entries: &HashMap<String, CacheEntry>) -> AppResult<()> {
    let path_display = path.display().to_string();
    let values: Vec<&CacheEntry> = entries.values().collect();

    let content = serde_json::to_string_pretty(&values)
        .map_err(|e| AppError::snapshot_write_failed(&path_display, e))?;

    let tmp_path = path.with_extension("tmp");
    fs::write(&tmp_path, content).map_err(|e| AppError::snapshot_write_failed(&path_display, e))?;
    fs::rename(&tmp_path, path).map_err(|e| AppError::snapshot_write_failed(&path_display, e))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn sample_result(query: &str) -> QueryResult {
        QueryResult {
            query: query.to_string(),
            candidates: Vec::new(),
            policy_satisfied: false,
            completed_at: Utc::now(),
        }
    }

    #[test]
    fn test_put_get_roundtrip() {
        let cache = RecommendCache::new();
        let result = sample_result("STM32F103C8");

        cache.put("STM32F103C8", result.clone());
        assert_eq!(cache.get("STM32F103C8"), Some(result));
    }

    #[test]
    fn test_key_normalization_shares_entry() {
        let cache = RecommendCache::new();
        cache.put("  STM32F103C8  ", sample_result("STM32F103C8"));

        assert!(cache.get("stm32f103c8").is_some());
        assert!(cache.get("STM32F103C8").is_some());
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_put_overwrites_same_key() {
        let cache = RecommendCache::new();
        cache.put("GD32F103", sample_result("第一次"));
        let second = sample_result("第二次");
        cache.put("gd32f103", second.clone());

        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get("GD32F103"), Some(second));
    }

    #[test]
    fn test_expired_entry_is_miss_and_evicted() {
        let cache = RecommendCache::new();
        cache.put_with_ttl("GD32F103", sample_result("GD32F103"), Duration::seconds(-1));

        assert!(cache.get("GD32F103").is_none());
        // 惰性淘汰后条目消失
        assert_eq!(cache.len(), 0);
        assert_eq!(cache.stats().evictions, 1);
    }

    #[test]
    fn test_get_before_expiry_hits() {
        let cache = RecommendCache::new();
        cache.put_with_ttl("GD32F103", sample_result("GD32F103"), Duration::hours(1));

        assert!(cache.get("GD32F103").is_some());
    }

    #[test]
    fn test_sweep_expired() {
        let cache = RecommendCache::new();
        cache.put_with_ttl("A1", sample_result("A1"), Duration::seconds(-1));
        cache.put_with_ttl("A2", sample_result("A2"), Duration::seconds(-1));
        cache.put_with_ttl("B1", sample_result("B1"), Duration::hours(1));

        assert_eq!(cache.sweep_expired(), 2);
        assert_eq!(cache.len(), 1);
        // 幂等
        assert_eq!(cache.sweep_expired(), 0);
    }

    #[test]
    fn test_clear_all() {
        let cache = RecommendCache::new();
        cache.put("A1", sample_result("A1"));
        cache.put("A2", sample_result("A2"));

        assert_eq!(cache.clear_all(), 2);
        assert!(cache.is_empty());
        assert_eq!(cache.clear_all(), 0);
    }

    #[test]
    fn test_stats_counters() {
        let cache = RecommendCache::new();
        cache.put("A1", sample_result("A1"));

        cache.get("A1");
        cache.get("A1");
        cache.get("missing");

        let stats = cache.stats();
        assert_eq!(stats.hits, 2);
        assert_eq!(stats.misses, 1);
    }

    #[test]
    fn test_snapshot_roundtrip() {
        let path = std::env::temp_dir().join("substitute_recommend_cache_roundtrip.json");
        let _ = fs::remove_file(&path);

        {
            let cache = RecommendCache::with_persistence(&path, Duration::hours(1));
            cache.put("GD32F103", sample_result("GD32F103"));
        }

        let reloaded = RecommendCache::with_persistence(&path, Duration::hours(1));
        assert!(reloaded.get("GD32F103").is_some());

        let _ = fs::remove_file(&path);
    }

    #[test]
    fn test_corrupted_snapshot_starts_empty() {
        let path = std::env::temp_dir().join("substitute_recommend_cache_corrupt.json");
        fs::write(&path, "this is not json {{{{").unwrap();

        let cache = RecommendCache::with_persistence(&path, Duration::hours(1));
        assert!(cache.is_empty());

        let _ = fs::remove_file(&path);
    }

    #[test]
    fn test_corrupted_entry_is_dropped() {
        let path = std::env::temp_dir().join("substitute_recommend_cache_bad_entry.json");
        let good = CacheEntry {
            query: "gd32f103".to_string(),
            result: sample_result("gd32f103"),
            created_at: Utc::now(),
            expires_at: Utc::now() + Duration::hours(1),
        };
        let content = serde_json::to_string(&vec![
            serde_json::to_value(&good).unwrap(),
            serde_json::json!({"query": 42, "垃圾": true}),
        ])
        .unwrap();
        fs::write(&path, content).unwrap();

        let cache = RecommendCache::with_persistence(&path, Duration::hours(1));
        assert_eq!(cache.len(), 1);
        assert!(cache.get("GD32F103").is_some());

        let _ = fs::remove_file(&path);
    }
}
