use std::fmt;

/// 应用程序错误类型
#[derive(Debug)]
pub enum AppError {
    /// 业务逻辑错误
    Business(BusinessError),
    /// 配置错误
    Config(ConfigError),
    /// 缓存错误
    Cache(CacheError),
    /// 其他错误（用于包装第三方库错误）
    Other(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Business(e) => write!(f, "业务错误: {}", e),
            AppError::Config(e) => write!(f, "配置错误: {}", e),
            AppError::Cache(e) => write!(f, "缓存错误: {}", e),
            AppError::Other(msg) => write!(f, "错误: {}", msg),
        }
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AppError::Business(e) => Some(e),
            AppError::Config(e) => Some(e),
            AppError::Cache(e) => Some(e),
            AppError::Other(_) => None,
        }
    }
}

/// 业务逻辑错误
#[derive(Debug)]
pub enum BusinessError {
    /// 查询型号为空
    EmptyQuery,
}

impl fmt::Display for BusinessError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BusinessError::EmptyQuery => write!(f, "查询型号不能为空"),
        }
    }
}

impl std::error::Error for BusinessError {}

/// 配置错误
#[derive(Debug)]
pub enum ConfigError {
    /// 品牌注册表文件读取失败
    RegistryFileReadFailed {
        path: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// 品牌注册表文件解析失败
    RegistryFileParseFailed {
        path: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// 品牌注册表内容为空
    RegistryEmpty {
        path: String,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::RegistryFileReadFailed { path, source } => {
                write!(f, "读取品牌注册表失败 ({}): {}", path, source)
            }
            ConfigError::RegistryFileParseFailed { path, source } => {
                write!(f, "解析品牌注册表失败 ({}): {}", path, source)
            }
            ConfigError::RegistryEmpty { path } => {
                write!(f, "品牌注册表为空: {}", path)
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::RegistryFileReadFailed { source, .. }
            | ConfigError::RegistryFileParseFailed { source, .. } => {
                Some(source.as_ref() as &(dyn std::error::Error + 'static))
            }
            ConfigError::RegistryEmpty { .. } => None,
        }
    }
}

/// 缓存错误
#[derive(Debug)]
pub enum CacheError {
    /// 快照文件读取失败
    SnapshotReadFailed {
        path: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// 快照文件解析失败
    SnapshotParseFailed {
        path: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// 快照文件写入失败
    SnapshotWriteFailed {
        path: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl fmt::Display for CacheError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CacheError::SnapshotReadFailed { path, source } => {
                write!(f, "读取缓存快照失败 ({}): {}", path, source)
            }
            CacheError::SnapshotParseFailed { path, source } => {
                write!(f, "解析缓存快照失败 ({}): {}", path, source)
            }
            CacheError::SnapshotWriteFailed { path, source } => {
                write!(f, "写入缓存快照失败 ({}): {}", path, source)
            }
        }
    }
}

impl std::error::Error for CacheError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CacheError::SnapshotReadFailed { source, .. }
            | CacheError::SnapshotParseFailed { source, .. }
            | CacheError::SnapshotWriteFailed { source, .. } => {
                Some(source.as_ref() as &(dyn std::error::Error + 'static))
            }
        }
    }
}

// ========== 便捷构造函数 ==========

impl AppError {
    /// 创建查询为空错误
    pub fn empty_query() -> Self {
        AppError::Business(BusinessError::EmptyQuery)
    }

    /// 创建品牌注册表读取错误
    pub fn registry_read_failed(
        path: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        AppError::Config(ConfigError::RegistryFileReadFailed {
            path: path.into(),
            source: Box::new(source),
        })
    }

    /// 创建品牌注册表解析错误
    pub fn registry_parse_failed(
        path: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        AppError::Config(ConfigError::RegistryFileParseFailed {
            path: path.into(),
            source: Box::new(source),
        })
    }

    /// 创建缓存快照读取错误
    pub fn snapshot_read_failed(
        path: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        AppError::Cache(CacheError::SnapshotReadFailed {
            path: path.into(),
            source: Box::new(source),
        })
    }

    /// 创建缓存快照解析错误
    pub fn snapshot_parse_failed(
        path: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        AppError::Cache(CacheError::SnapshotParseFailed {
            path: path.into(),
            source: Box::new(source),
        })
    }

    /// 创建缓存快照写入错误
    pub fn snapshot_write_failed(
        path: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        AppError::Cache(CacheError::SnapshotWriteFailed {
            path: path.into(),
            source: Box::new(source),
        })
    }
}

// ========== Result 类型别名 ==========

/// 应用程序结果类型
pub type AppResult<T> = Result<T, AppError>;
