/// 导入服务配置
///
/// # 环境变量
///
/// 所有配置项都可以通过环境变量覆盖：
///
/// | 环境变量 | 默认值 | 说明 |
/// |----------|--------|------|
/// | DATABASE_URL | postgres://localhost/catalog | PostgreSQL 连接串 |
/// | DB_MAX_CONNECTIONS | 5 | 连接池大小 |
/// | UPLOAD_DIR | ./uploads | 上传文件暂存目录 |
/// | SEARCH_INDEX_URL | (未设置) | 搜索索引服务地址，未设置时不通知 |
/// | LOG_LEVEL | info | 日志级别 |
/// | LOG_JSON | false | 是否输出 JSON 日志 |
/// | LOG_DIR | (未设置) | 文件日志目录 |
/// | ENVIRONMENT | development | 运行环境 |
///
/// # 示例
///
/// ```ignore
/// DATABASE_URL=postgres://catalog@db/catalog UPLOAD_DIR=/data/uploads catalog-import import menu menu.csv
/// ```
#[derive(Debug, Clone)]
pub struct Config {
    /// PostgreSQL 连接串
    pub database_url: String,
    /// 连接池最大连接数
    pub db_max_connections: u32,
    /// 上传文件目录
    pub upload_dir: String,
    /// 搜索索引服务地址
    pub search_index_url: Option<String>,
    /// 日志级别
    pub log_level: String,
    /// JSON 日志
    pub log_json: bool,
    /// 文件日志目录
    pub log_dir: Option<String>,
    /// 运行环境: development | staging | production
    pub environment: String,
}

impl Config {
    /// 从环境变量加载配置
    ///
    /// 如果环境变量未设置，使用默认值
    pub fn from_env() -> Self {
        Self {
            database_url: std::env::var("DATABASE_URL")
                .unwrap_or_else(|_| "postgres://localhost/catalog".into()),
            db_max_connections: std::env::var("DB_MAX_CONNECTIONS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(5),
            upload_dir: std::env::var("UPLOAD_DIR").unwrap_or_else(|_| "./uploads".into()),
            search_index_url: std::env::var("SEARCH_INDEX_URL")
                .ok()
                .filter(|v| !v.trim().is_empty()),
            log_level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".into()),
            log_json: std::env::var("LOG_JSON")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(false),
            log_dir: std::env::var("LOG_DIR").ok().filter(|v| !v.trim().is_empty()),
            environment: std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".into()),
        }
    }

    /// 使用自定义值覆盖部分配置
    ///
    /// 常用于测试场景
    pub fn with_overrides(database_url: impl Into<String>, upload_dir: impl Into<String>) -> Self {
        let mut config = Self::from_env();
        config.database_url = database_url.into();
        config.upload_dir = upload_dir.into();
        config
    }

    /// 是否为生产环境
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}
