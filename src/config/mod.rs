// Configuration module entry point
// Loads layered configuration (file, environment, defaults) and builds runtime state

mod state;
mod types;

use std::net::SocketAddr;
use std::path::PathBuf;

// Re-export public types
pub use state::AppState;
pub use types::{
    Config, LoggingConfig, PerformanceConfig, RoutesConfig, ServerConfig, StorageConfig,
};

/// Config file looked up when no path is given on the command line
pub const DEFAULT_CONFIG_PATH: &str = "kwal.toml";

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 8081;
pub const DEFAULT_BASE_DIR: &str = "/shares/Public/Kwal/csv";
pub const DEFAULT_ALLOWED_FILES: [&str; 2] = ["light_patterns.csv", "light_colors.csv"];
pub const DEFAULT_MAX_UPLOAD_BYTES: u64 = 1_000_000;
pub const DEFAULT_SERVED_ROOTS: [&str; 2] = ["/csv", "/Kwal/csv"];
pub const DEFAULT_UPLOAD_PATH: &str = "/api/upload";
pub const DEFAULT_MOVE_PATH: &str = "/api/move";
pub const DEFAULT_ACCESS_LOG_FORMAT: &str = "combined";

/// `KWAL__<SECTION>__<KEY>` variables; list keys take comma-separated values
fn environment() -> config::Environment {
    config::Environment::with_prefix("KWAL")
        .separator("__")
        .try_parsing(true)
        .list_separator(",")
        .with_list_parse_key("storage.allowed_files")
        .with_list_parse_key("routes.served_roots")
}

impl Config {
    /// Load configuration from specified file path (extension optional)
    /// A missing file is not an error; defaults and `KWAL__*` environment
    /// variables still apply.
    pub fn load_from(config_path: &str) -> Result<Self, config::ConfigError> {
        Self::load_with_env(config_path, environment())
    }

    fn load_with_env(
        config_path: &str,
        env: config::Environment,
    ) -> Result<Self, config::ConfigError> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(config_path).required(false))
            .add_source(env)
            .set_default("server.host", DEFAULT_HOST)?
            .set_default("server.port", i64::from(DEFAULT_PORT))?
            .set_default("storage.base_dir", DEFAULT_BASE_DIR)?
            .set_default("storage.allowed_files", DEFAULT_ALLOWED_FILES.to_vec())?
            .set_default("storage.max_upload_bytes", DEFAULT_MAX_UPLOAD_BYTES)?
            .set_default("routes.served_roots", DEFAULT_SERVED_ROOTS.to_vec())?
            .set_default("routes.upload_path", DEFAULT_UPLOAD_PATH)?
            .set_default("routes.move_path", DEFAULT_MOVE_PATH)?
            .set_default("logging.access_log", true)?
            .set_default("logging.access_log_format", DEFAULT_ACCESS_LOG_FORMAT)?
            .set_default("performance.keep_alive_timeout", 75)?
            .set_default("performance.read_timeout", 30)?
            .set_default("performance.write_timeout", 30)?
            .build()?;

        settings.try_deserialize()
    }

    /// Build the default configuration rooted at `base_dir`, bypassing file
    /// and environment sources
    pub fn with_base_dir(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            server: ServerConfig {
                host: DEFAULT_HOST.to_string(),
                port: DEFAULT_PORT,
                workers: None,
            },
            storage: StorageConfig {
                base_dir: base_dir.into(),
                done_dir: None,
                history_dir: None,
                allowed_files: DEFAULT_ALLOWED_FILES.iter().map(ToString::to_string).collect(),
                max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            },
            routes: RoutesConfig {
                served_roots: DEFAULT_SERVED_ROOTS.iter().map(ToString::to_string).collect(),
                upload_path: DEFAULT_UPLOAD_PATH.to_string(),
                move_path: DEFAULT_MOVE_PATH.to_string(),
            },
            logging: LoggingConfig {
                access_log: false,
                access_log_format: DEFAULT_ACCESS_LOG_FORMAT.to_string(),
                access_log_file: None,
                error_log_file: None,
            },
            performance: PerformanceConfig {
                keep_alive_timeout: 75,
                read_timeout: 30,
                write_timeout: 30,
                max_connections: None,
            },
        }
    }

    pub fn get_socket_addr(&self) -> Result<SocketAddr, String> {
        format!("{}:{}", self.server.host, self.server.port)
            .parse()
            .map_err(|e| format!("Invalid address: {e}"))
    }

    /// Startup checks: the base directory must already exist
    pub fn validate(&self) -> Result<(), String> {
        if !self.storage.base_dir.is_dir() {
            return Err(format!(
                "{} does not exist",
                self.storage.base_dir.display()
            ));
        }
        if self.routes.served_roots.is_empty() {
            return Err("routes.served_roots must not be empty".to_string());
        }
        Ok(())
    }
}
