use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

/// Distinguishes runtime behavior for different stages of the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }
}

/// Top-level configuration for the screening service.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub questions: QuestionBankConfig,
    pub notifier: NotifierConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort)?;

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let dataset_path = env::var("APP_QUESTION_BANK")
            .ok()
            .map(|raw| raw.trim().to_string())
            .filter(|raw| !raw.is_empty())
            .map(PathBuf::from);

        let verify_timeout_ms = positive_var(
            "APP_VERIFY_TIMEOUT_MS",
            NotifierConfig::DEFAULT_VERIFY_TIMEOUT_MS,
        )?;
        let dedup_capacity = positive_var(
            "APP_NOTIFY_DEDUP_CAPACITY",
            NotifierConfig::DEFAULT_DEDUP_CAPACITY as u64,
        )?;

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            questions: QuestionBankConfig { dataset_path },
            notifier: NotifierConfig {
                verify_timeout: Duration::from_millis(verify_timeout_ms),
                dedup_capacity: dedup_capacity as usize,
            },
        })
    }
}

fn positive_var(name: &'static str, default: u64) -> Result<u64, ConfigError> {
    let raw = match env::var(name) {
        Ok(raw) => raw,
        Err(_) => return Ok(default),
    };

    match raw.trim().parse::<u64>() {
        Ok(value) if value > 0 => Ok(value),
        _ => Err(ConfigError::InvalidPositive { name, value: raw }),
    }
}

/// Settings controlling the HTTP server binding.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        if self.host.eq_ignore_ascii_case("localhost") {
            return Ok(SocketAddr::new(IpAddr::from([127, 0, 0, 1]), self.port));
        }

        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|source| ConfigError::InvalidHost { source })?;

        Ok(SocketAddr::new(ip, self.port))
    }
}

/// Tracing controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

/// Where the question bank is read from. `None` selects the bundled dataset.
#[derive(Debug, Clone, Default)]
pub struct QuestionBankConfig {
    pub dataset_path: Option<PathBuf>,
}

/// Bounds applied by each review notifier subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NotifierConfig {
    pub verify_timeout: Duration,
    pub dedup_capacity: usize,
}

impl NotifierConfig {
    pub const DEFAULT_VERIFY_TIMEOUT_MS: u64 = 2_000;
    pub const DEFAULT_DEDUP_CAPACITY: usize = 1_024;
}

impl Default for NotifierConfig {
    fn default() -> Self {
        Self {
            verify_timeout: Duration::from_millis(Self::DEFAULT_VERIFY_TIMEOUT_MS),
            dedup_capacity: Self::DEFAULT_DEDUP_CAPACITY,
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidPositive { name: &'static str, value: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidPositive { name, value } => {
                write!(f, "{name} must be a positive integer (got '{value}')")
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidPort | ConfigError::InvalidPositive { .. } => None,
            ConfigError::InvalidHost { source } => Some(source),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::{Mutex, OnceLock};

    fn env_guard() -> &'static Mutex<()> {
        static GUARD: OnceLock<Mutex<()>> = OnceLock::new();
        GUARD.get_or_init(|| Mutex::new(()))
    }

    fn reset_env() {
        for name in [
            "APP_ENV",
            "APP_HOST",
            "APP_PORT",
            "APP_LOG_LEVEL",
            "APP_QUESTION_BANK",
            "APP_VERIFY_TIMEOUT_MS",
            "APP_NOTIFY_DEDUP_CAPACITY",
        ] {
            env::remove_var(name);
        }
    }

    #[test]
    fn load_uses_defaults_when_env_missing() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        let config = AppConfig::load().expect("config loads with defaults");
        assert_eq!(config.environment, AppEnvironment::Development);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.telemetry.log_level, "info");
        assert!(config.questions.dataset_path.is_none());
        assert_eq!(config.notifier, NotifierConfig::default());
    }

    #[test]
    fn accepts_localhost_host() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("APP_HOST", "localhost");
        let config = AppConfig::load().expect("config loads");
        let addr = config.server.socket_addr().expect("localhost resolves");
        assert_eq!(addr, SocketAddr::new(IpAddr::from([127, 0, 0, 1]), 3000));
        reset_env();
    }

    #[test]
    fn reads_notifier_bounds_and_dataset_path() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("APP_VERIFY_TIMEOUT_MS", "250");
        env::set_var("APP_NOTIFY_DEDUP_CAPACITY", "16");
        env::set_var("APP_QUESTION_BANK", "/srv/banks/v3.json");

        let config = AppConfig::load().expect("config loads");
        assert_eq!(config.notifier.verify_timeout, Duration::from_millis(250));
        assert_eq!(config.notifier.dedup_capacity, 16);
        assert_eq!(
            config.questions.dataset_path,
            Some(PathBuf::from("/srv/banks/v3.json"))
        );
        reset_env();
    }

    #[test]
    fn rejects_zero_verify_timeout() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("APP_VERIFY_TIMEOUT_MS", "0");

        match AppConfig::load() {
            Err(ConfigError::InvalidPositive { name, .. }) => {
                assert_eq!(name, "APP_VERIFY_TIMEOUT_MS")
            }
            other => panic!("expected invalid positive error, got {other:?}"),
        }
        reset_env();
    }
}
