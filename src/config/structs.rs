use serde::{Deserialize, Serialize};

/// 静态配置（启动时加载，运行期间只读）
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StaticConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub security: SecurityConfig,
    #[serde(default)]
    pub tasks: TasksConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl StaticConfig {
    /// 从 TOML 文件和环境变量加载配置
    ///
    /// 优先级：ENV > config.toml > 默认值
    /// ENV 前缀：STASH，分隔符：__
    /// 示例：STASH__SERVER__PORT=9000
    pub fn load() -> Self {
        Self::load_from("config.toml")
    }

    pub fn load_from(path: &str) -> Self {
        use config::{Config, Environment, File};

        let builder = Config::builder()
            // 1. 从 TOML 文件加载（可选）
            .add_source(File::with_name(path).required(false))
            // 2. 从环境变量覆盖
            .add_source(
                Environment::with_prefix("STASH")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            );

        match builder.build() {
            Ok(settings) => match settings.try_deserialize::<StaticConfig>() {
                Ok(config) => {
                    if std::path::Path::new(path).exists() {
                        eprintln!("[INFO] Configuration loaded from: {}", path);
                    }
                    config
                }
                Err(e) => {
                    eprintln!("[ERROR] Failed to deserialize config: {}", e);
                    Self::default()
                }
            },
            Err(e) => {
                eprintln!("[ERROR] Failed to build config: {}", e);
                Self::default()
            }
        }
    }

    /// 生成示例 TOML 配置文件
    pub fn generate_sample_config() -> String {
        let sample_config = Self::default();
        toml::to_string_pretty(&sample_config)
            .unwrap_or_else(|e| format!("Error generating sample config: {}", e))
    }

    /// 保存配置到 TOML 文件
    pub fn save_to_file<P: AsRef<std::path::Path>>(
        &self,
        path: P,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let content = toml::to_string_pretty(self)?;

        if let Some(parent) = path.as_ref().parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            std::fs::create_dir_all(parent)?;
        }

        std::fs::write(path, content)?;
        Ok(())
    }
}

/// 服务器配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_server_host")]
    pub host: String,
    #[serde(default = "default_server_port")]
    pub port: u16,
    /// 生成短链接时使用的对外地址
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_cpu_count")]
    pub cpu_count: usize,
    #[serde(default = "default_allowed_origins")]
    pub allowed_origins: Vec<String>,
}

/// 数据库连接配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_database_url")]
    pub database_url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// 连接池保留的最少空闲连接数
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
    #[serde(default = "default_retry_count")]
    pub retry_count: u32,
    #[serde(default = "default_retry_base_delay_ms")]
    pub retry_base_delay_ms: u64,
    #[serde(default = "default_retry_max_delay_ms")]
    pub retry_max_delay_ms: u64,
}

/// 上传与保留策略
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_upload_dir")]
    pub upload_dir: String,
    #[serde(default = "default_max_file_size_mb")]
    pub max_file_size_mb: u64,
    #[serde(default = "default_expiration_days")]
    pub expiration_days: i64,
    #[serde(default = "default_max_note_bytes")]
    pub max_note_bytes: usize,
}

impl StorageConfig {
    pub fn max_file_size_bytes(&self) -> u64 {
        self.max_file_size_mb.saturating_mul(1024 * 1024)
    }
}

/// 安全相关配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    /// 管理接口密钥，留空则禁用管理接口
    #[serde(default)]
    pub admin_secret: String,
    #[serde(default = "default_rate_limit_per_sec")]
    pub rate_limit_per_sec: u64,
    #[serde(default = "default_rate_limit_burst")]
    pub rate_limit_burst: u32,
}

/// 后台任务配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TasksConfig {
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,
    #[serde(default = "default_counter_queue_capacity")]
    pub counter_queue_capacity: usize,
}

/// 日志配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: String,
    #[serde(default)]
    pub file: Option<String>,
    #[serde(default = "default_max_backups")]
    pub max_backups: u32,
    #[serde(default = "default_enable_rotation")]
    pub enable_rotation: bool,
}

// ============================================================
// Default value functions for static config
// ============================================================

fn default_server_host() -> String {
    "127.0.0.1".to_string()
}

fn default_server_port() -> u16 {
    8080
}

fn default_base_url() -> String {
    "http://localhost:8080".to_string()
}

fn default_cpu_count() -> usize {
    num_cpus::get()
}

fn default_allowed_origins() -> Vec<String> {
    vec!["*".to_string()]
}

fn default_database_url() -> String {
    "sqlite://stashlink.db?mode=rwc".to_string()
}

fn default_max_connections() -> u32 {
    25
}

fn default_min_connections() -> u32 {
    5
}

fn default_retry_count() -> u32 {
    3
}

fn default_retry_base_delay_ms() -> u64 {
    100
}

fn default_retry_max_delay_ms() -> u64 {
    2000
}

fn default_upload_dir() -> String {
    "uploads".to_string()
}

fn default_max_file_size_mb() -> u64 {
    50
}

fn default_expiration_days() -> i64 {
    7
}

fn default_max_note_bytes() -> usize {
    1024 * 1024
}

fn default_rate_limit_per_sec() -> u64 {
    10
}

fn default_rate_limit_burst() -> u32 {
    10
}

fn default_sweep_interval_secs() -> u64 {
    3600
}

fn default_counter_queue_capacity() -> usize {
    1024
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "text".to_string()
}

fn default_max_backups() -> u32 {
    5
}

fn default_enable_rotation() -> bool {
    true
}

// ============================================================
// Default implementations
// ============================================================

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_server_host(),
            port: default_server_port(),
            base_url: default_base_url(),
            cpu_count: default_cpu_count(),
            allowed_origins: default_allowed_origins(),
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            database_url: default_database_url(),
            max_connections: default_max_connections(),
            min_connections: default_min_connections(),
            retry_count: default_retry_count(),
            retry_base_delay_ms: default_retry_base_delay_ms(),
            retry_max_delay_ms: default_retry_max_delay_ms(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            upload_dir: default_upload_dir(),
            max_file_size_mb: default_max_file_size_mb(),
            expiration_days: default_expiration_days(),
            max_note_bytes: default_max_note_bytes(),
        }
    }
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            admin_secret: String::new(),
            rate_limit_per_sec: default_rate_limit_per_sec(),
            rate_limit_burst: default_rate_limit_burst(),
        }
    }
}

impl Default for TasksConfig {
    fn default() -> Self {
        Self {
            sweep_interval_secs: default_sweep_interval_secs(),
            counter_queue_capacity: default_counter_queue_capacity(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            file: None,
            max_backups: default_max_backups(),
            enable_rotation: default_enable_rotation(),
        }
    }
}
