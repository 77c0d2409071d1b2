/// 程序配置文件
#[derive(Clone, Debug)]
pub struct Config {
    // --- LLM 配置 ---
    pub llm_api_key: String,
    pub llm_api_base_url: String,
    pub llm_model_name: String,
    // --- 目录搜索 API 配置 ---
    pub nexar_api_url: String,
    pub nexar_identity_url: String,
    pub nexar_client_id: String,
    pub nexar_client_secret: String,
    /// 目录搜索返回的最大条目数
    pub catalog_limit: usize,
    // --- 缓存配置 ---
    /// 缓存有效期（小时）
    pub cache_ttl_hours: i64,
    /// 缓存快照文件路径（为空则仅使用内存缓存）
    pub cache_file: Option<String>,
    // --- 其他 ---
    /// 国产品牌注册表 TOML 文件路径（为空则使用内置注册表）
    pub brand_registry_file: Option<String>,
    /// 是否显示详细日志
    pub verbose_logging: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            llm_api_key: String::new(),
            llm_api_base_url: "https://api.deepseek.com/v1".to_string(),
            llm_model_name: "deepseek-chat".to_string(),
            nexar_api_url: "https://api.nexar.com/graphql".to_string(),
            nexar_identity_url: "https://identity.nexar.com/connect/token".to_string(),
            nexar_client_id: String::new(),
            nexar_client_secret: String::new(),
            catalog_limit: 10,
            cache_ttl_hours: 72,
            cache_file: None,
            brand_registry_file: None,
            verbose_logging: false,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let default = Self::default();
        Self {
            llm_api_key: std::env::var("LLM_API_KEY")
                .or_else(|_| std::env::var("DEEPSEEK_API_KEY"))
                .unwrap_or(default.llm_api_key),
            llm_api_base_url: std::env::var("LLM_API_BASE_URL").unwrap_or(default.llm_api_base_url),
            llm_model_name: std::env::var("LLM_MODEL_NAME").unwrap_or(default.llm_model_name),
            nexar_api_url: std::env::var("NEXAR_API_URL").unwrap_or(default.nexar_api_url),
            nexar_identity_url: std::env::var("NEXAR_IDENTITY_URL")
                .unwrap_or(default.nexar_identity_url),
            nexar_client_id: std::env::var("NEXAR_CLIENT_ID").unwrap_or(default.nexar_client_id),
            nexar_client_secret: std::env::var("NEXAR_CLIENT_SECRET")
                .unwrap_or(default.nexar_client_secret),
            catalog_limit: std::env::var("CATALOG_LIMIT").ok().and_then(|v| v.parse().ok()).unwrap_or(default.catalog_limit),
            cache_ttl_hours: std::env::var("CACHE_TTL_HOURS").ok().and_then(|v| v.parse().ok()).unwrap_or(default.cache_ttl_hours),
            cache_file: std::env::var("CACHE_FILE").ok().filter(|v| !v.is_empty()),
            brand_registry_file: std::env::var("BRAND_REGISTRY_FILE").ok().filter(|v| !v.is_empty()),
            verbose_logging: std::env::var("VERBOSE_LOGGING").ok().and_then(|v| v.parse().ok()).unwrap_or(default.verbose_logging),
        }
    }
}
