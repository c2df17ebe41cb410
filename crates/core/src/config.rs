use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::NaiveTime;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

use crate::languages::Language;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub analyzer: AnalyzerConfig,
    pub server: ServerConfig,
    pub restaurant: RestaurantConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub timeout_secs: u64,
}

/// Settings for the LLM that reads caller utterances.
#[derive(Clone, Debug)]
pub struct AnalyzerConfig {
    pub provider: AnalyzerProvider,
    pub api_key: Option<SecretString>,
    pub base_url: Option<String>,
    pub model: String,
    pub timeout_secs: u64,
    pub max_retries: u32,
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub bind_address: String,
    pub port: u16,
    pub health_check_port: u16,
    pub graceful_shutdown_secs: u64,
}

/// Booking rules for the restaurant this agent answers for.
#[derive(Clone, Debug)]
pub struct RestaurantConfig {
    pub name: String,
    pub default_language: Language,
    pub min_party_size: u32,
    pub max_party_size: u32,
    pub max_capacity: u32,
    pub capacity_buffer_percent: u32,
    pub reservation_duration_minutes: u32,
    pub overlap_window_minutes: u32,
    pub min_advance_hours: u32,
    pub service_windows: Vec<ServiceWindow>,
}

/// One stretch of service hours, half-open on the closing side.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceWindow {
    pub label: String,
    #[serde(deserialize_with = "deserialize_clock")]
    pub opens: NaiveTime,
    #[serde(deserialize_with = "deserialize_clock")]
    pub closes: NaiveTime,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalyzerProvider {
    Gemini,
    Deterministic,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub database_url: Option<String>,
    pub log_level: Option<String>,
    pub analyzer_provider: Option<AnalyzerProvider>,
    pub analyzer_api_key: Option<String>,
    pub analyzer_model: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig {
                url: "sqlite://reserva.db".to_string(),
                max_connections: 5,
                timeout_secs: 30,
            },
            analyzer: AnalyzerConfig {
                provider: AnalyzerProvider::Deterministic,
                api_key: None,
                base_url: Some("https://generativelanguage.googleapis.com".to_string()),
                model: "gemini-2.0-flash".to_string(),
                timeout_secs: 10,
                max_retries: 3,
            },
            server: ServerConfig {
                bind_address: "127.0.0.1".to_string(),
                port: 8080,
                health_check_port: 8081,
                graceful_shutdown_secs: 15,
            },
            restaurant: RestaurantConfig {
                name: "La Plaza".to_string(),
                default_language: Language::Es,
                min_party_size: 1,
                max_party_size: 20,
                max_capacity: 100,
                capacity_buffer_percent: 10,
                reservation_duration_minutes: 120,
                overlap_window_minutes: 30,
                min_advance_hours: 2,
                service_windows: vec![
                    ServiceWindow {
                        label: "lunch".to_string(),
                        opens: clock(13, 0),
                        closes: clock(15, 0),
                    },
                    ServiceWindow {
                        label: "dinner".to_string(),
                        opens: clock(19, 0),
                        closes: clock(23, 0),
                    },
                ],
            },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

fn clock(hour: u32, minute: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(hour, minute, 0).unwrap_or_default()
}

fn secret_value(value: String) -> SecretString {
    value.into()
}

impl std::str::FromStr for AnalyzerProvider {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "gemini" => Ok(Self::Gemini),
            "deterministic" => Ok(Self::Deterministic),
            other => Err(ConfigError::Validation(format!(
                "unsupported analyzer provider `{other}` (expected gemini|deterministic)"
            ))),
        }
    }
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected = options.config_path.unwrap_or_else(|| PathBuf::from("reserva.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(database) = patch.database {
            if let Some(url) = database.url {
                self.database.url = url;
            }
            if let Some(max_connections) = database.max_connections {
                self.database.max_connections = max_connections;
            }
            if let Some(timeout_secs) = database.timeout_secs {
                self.database.timeout_secs = timeout_secs;
            }
        }

        if let Some(analyzer) = patch.analyzer {
            if let Some(provider) = analyzer.provider {
                self.analyzer.provider = provider;
            }
            if let Some(api_key_value) = analyzer.api_key {
                self.analyzer.api_key = Some(secret_value(api_key_value));
            }
            if let Some(base_url) = analyzer.base_url {
                self.analyzer.base_url = Some(base_url);
            }
            if let Some(model) = analyzer.model {
                self.analyzer.model = model;
            }
            if let Some(timeout_secs) = analyzer.timeout_secs {
                self.analyzer.timeout_secs = timeout_secs;
            }
            if let Some(max_retries) = analyzer.max_retries {
                self.analyzer.max_retries = max_retries;
            }
        }

        if let Some(server) = patch.server {
            if let Some(bind_address) = server.bind_address {
                self.server.bind_address = bind_address;
            }
            if let Some(port) = server.port {
                self.server.port = port;
            }
            if let Some(health_check_port) = server.health_check_port {
                self.server.health_check_port = health_check_port;
            }
            if let Some(graceful_shutdown_secs) = server.graceful_shutdown_secs {
                self.server.graceful_shutdown_secs = graceful_shutdown_secs;
            }
        }

        if let Some(restaurant) = patch.restaurant {
            if let Some(name) = restaurant.name {
                self.restaurant.name = name;
            }
            if let Some(default_language) = restaurant.default_language {
                self.restaurant.default_language = default_language;
            }
            if let Some(min_party_size) = restaurant.min_party_size {
                self.restaurant.min_party_size = min_party_size;
            }
            if let Some(max_party_size) = restaurant.max_party_size {
                self.restaurant.max_party_size = max_party_size;
            }
            if let Some(max_capacity) = restaurant.max_capacity {
                self.restaurant.max_capacity = max_capacity;
            }
            if let Some(capacity_buffer_percent) = restaurant.capacity_buffer_percent {
                self.restaurant.capacity_buffer_percent = capacity_buffer_percent;
            }
            if let Some(reservation_duration_minutes) = restaurant.reservation_duration_minutes {
                self.restaurant.reservation_duration_minutes = reservation_duration_minutes;
            }
            if let Some(overlap_window_minutes) = restaurant.overlap_window_minutes {
                self.restaurant.overlap_window_minutes = overlap_window_minutes;
            }
            if let Some(min_advance_hours) = restaurant.min_advance_hours {
                self.restaurant.min_advance_hours = min_advance_hours;
            }
            if let Some(service_windows) = restaurant.service_windows {
                self.restaurant.service_windows = service_windows;
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("RESERVA_DATABASE_URL") {
            self.database.url = value;
        }
        if let Some(value) = read_env("RESERVA_DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections = parse_u32("RESERVA_DATABASE_MAX_CONNECTIONS", &value)?;
        }
        if let Some(value) = read_env("RESERVA_DATABASE_TIMEOUT_SECS") {
            self.database.timeout_secs = parse_u64("RESERVA_DATABASE_TIMEOUT_SECS", &value)?;
        }

        if let Some(value) = read_env("RESERVA_ANALYZER_PROVIDER") {
            self.analyzer.provider = value.parse()?;
        }
        // GEMINI_API_KEY is honored as a convenience alias.
        let api_key = read_env("RESERVA_ANALYZER_API_KEY").or_else(|| read_env("GEMINI_API_KEY"));
        if let Some(value) = api_key {
            self.analyzer.api_key = Some(secret_value(value));
        }
        if let Some(value) = read_env("RESERVA_ANALYZER_BASE_URL") {
            self.analyzer.base_url = Some(value);
        }
        if let Some(value) = read_env("RESERVA_ANALYZER_MODEL") {
            self.analyzer.model = value;
        }
        if let Some(value) = read_env("RESERVA_ANALYZER_TIMEOUT_SECS") {
            self.analyzer.timeout_secs = parse_u64("RESERVA_ANALYZER_TIMEOUT_SECS", &value)?;
        }
        if let Some(value) = read_env("RESERVA_ANALYZER_MAX_RETRIES") {
            self.analyzer.max_retries = parse_u32("RESERVA_ANALYZER_MAX_RETRIES", &value)?;
        }

        if let Some(value) = read_env("RESERVA_SERVER_BIND_ADDRESS") {
            self.server.bind_address = value;
        }
        if let Some(value) = read_env("RESERVA_SERVER_PORT") {
            self.server.port = parse_u16("RESERVA_SERVER_PORT", &value)?;
        }
        if let Some(value) = read_env("RESERVA_SERVER_HEALTH_CHECK_PORT") {
            self.server.health_check_port = parse_u16("RESERVA_SERVER_HEALTH_CHECK_PORT", &value)?;
        }
        if let Some(value) = read_env("RESERVA_SERVER_GRACEFUL_SHUTDOWN_SECS") {
            self.server.graceful_shutdown_secs =
                parse_u64("RESERVA_SERVER_GRACEFUL_SHUTDOWN_SECS", &value)?;
        }

        if let Some(value) = read_env("RESERVA_RESTAURANT_NAME") {
            self.restaurant.name = value;
        }
        if let Some(value) = read_env("RESERVA_RESTAURANT_DEFAULT_LANGUAGE") {
            self.restaurant.default_language =
                parse_language("RESERVA_RESTAURANT_DEFAULT_LANGUAGE", &value)?;
        }
        if let Some(value) = read_env("RESERVA_RESTAURANT_MIN_PARTY_SIZE") {
            self.restaurant.min_party_size =
                parse_u32("RESERVA_RESTAURANT_MIN_PARTY_SIZE", &value)?;
        }
        if let Some(value) = read_env("RESERVA_RESTAURANT_MAX_PARTY_SIZE") {
            self.restaurant.max_party_size =
                parse_u32("RESERVA_RESTAURANT_MAX_PARTY_SIZE", &value)?;
        }
        if let Some(value) = read_env("RESERVA_RESTAURANT_MAX_CAPACITY") {
            self.restaurant.max_capacity = parse_u32("RESERVA_RESTAURANT_MAX_CAPACITY", &value)?;
        }
        if let Some(value) = read_env("RESERVA_RESTAURANT_CAPACITY_BUFFER_PERCENT") {
            self.restaurant.capacity_buffer_percent =
                parse_u32("RESERVA_RESTAURANT_CAPACITY_BUFFER_PERCENT", &value)?;
        }
        if let Some(value) = read_env("RESERVA_RESTAURANT_RESERVATION_DURATION_MINUTES") {
            self.restaurant.reservation_duration_minutes =
                parse_u32("RESERVA_RESTAURANT_RESERVATION_DURATION_MINUTES", &value)?;
        }
        if let Some(value) = read_env("RESERVA_RESTAURANT_OVERLAP_WINDOW_MINUTES") {
            self.restaurant.overlap_window_minutes =
                parse_u32("RESERVA_RESTAURANT_OVERLAP_WINDOW_MINUTES", &value)?;
        }
        if let Some(value) = read_env("RESERVA_RESTAURANT_MIN_ADVANCE_HOURS") {
            self.restaurant.min_advance_hours =
                parse_u32("RESERVA_RESTAURANT_MIN_ADVANCE_HOURS", &value)?;
        }

        let log_level = read_env("RESERVA_LOGGING_LEVEL").or_else(|| read_env("RESERVA_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("RESERVA_LOGGING_FORMAT").or_else(|| read_env("RESERVA_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(database_url) = overrides.database_url {
            self.database.url = database_url;
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
        if let Some(provider) = overrides.analyzer_provider {
            self.analyzer.provider = provider;
        }
        if let Some(api_key) = overrides.analyzer_api_key {
            self.analyzer.api_key = Some(secret_value(api_key));
        }
        if let Some(model) = overrides.analyzer_model {
            self.analyzer.model = model;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_database(&self.database)?;
        validate_analyzer(&self.analyzer)?;
        validate_server(&self.server)?;
        validate_restaurant(&self.restaurant)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from("reserva.toml"), PathBuf::from("config/reserva.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next();
            let mut key = String::new();

            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(next) => key.push(next),
                    None => return Err(ConfigError::UnterminatedInterpolation),
                }
            }

            let value = env::var(&key)
                .map_err(|_| ConfigError::MissingEnvInterpolation { var: key.clone() })?;
            output.push_str(&value);
            continue;
        }

        output.push(ch);
    }

    Ok(output)
}

fn validate_database(database: &DatabaseConfig) -> Result<(), ConfigError> {
    let url = database.url.trim();
    let sqlite_url =
        url.starts_with("sqlite://") || url.starts_with("sqlite::") || url == ":memory:";
    if !sqlite_url {
        return Err(ConfigError::Validation(
            "database.url must be a sqlite URL (`sqlite://...`, `sqlite::...`, or `:memory:`)"
                .to_string(),
        ));
    }

    if database.max_connections == 0 {
        return Err(ConfigError::Validation(
            "database.max_connections must be greater than zero".to_string(),
        ));
    }

    if database.timeout_secs == 0 || database.timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "database.timeout_secs must be in range 1..=300".to_string(),
        ));
    }

    Ok(())
}

fn validate_analyzer(analyzer: &AnalyzerConfig) -> Result<(), ConfigError> {
    if analyzer.timeout_secs == 0 || analyzer.timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "analyzer.timeout_secs must be in range 1..=300".to_string(),
        ));
    }

    match analyzer.provider {
        AnalyzerProvider::Gemini => {
            let key_missing = analyzer
                .api_key
                .as_ref()
                .map(|value| value.expose_secret().trim().is_empty())
                .unwrap_or(true);
            if key_missing {
                return Err(ConfigError::Validation(
                    "analyzer.api_key is required for the gemini provider. Set RESERVA_ANALYZER_API_KEY or GEMINI_API_KEY, or switch analyzer.provider to `deterministic`".to_string()
                ));
            }
            let url_missing =
                analyzer.base_url.as_ref().map(|value| value.trim().is_empty()).unwrap_or(true);
            if url_missing {
                return Err(ConfigError::Validation(
                    "analyzer.base_url is required for the gemini provider".to_string(),
                ));
            }
        }
        AnalyzerProvider::Deterministic => {}
    }

    Ok(())
}

fn validate_server(server: &ServerConfig) -> Result<(), ConfigError> {
    if server.port == 0 {
        return Err(ConfigError::Validation("server.port must be greater than zero".to_string()));
    }

    if server.health_check_port == 0 {
        return Err(ConfigError::Validation(
            "server.health_check_port must be greater than zero".to_string(),
        ));
    }

    if server.port == server.health_check_port {
        return Err(ConfigError::Validation(
            "server.port and server.health_check_port must differ".to_string(),
        ));
    }

    if server.graceful_shutdown_secs == 0 {
        return Err(ConfigError::Validation(
            "server.graceful_shutdown_secs must be greater than zero".to_string(),
        ));
    }

    Ok(())
}

fn validate_restaurant(restaurant: &RestaurantConfig) -> Result<(), ConfigError> {
    if restaurant.name.trim().is_empty() {
        return Err(ConfigError::Validation("restaurant.name must not be empty".to_string()));
    }

    if restaurant.min_party_size == 0 {
        return Err(ConfigError::Validation(
            "restaurant.min_party_size must be greater than zero".to_string(),
        ));
    }

    if restaurant.max_party_size < restaurant.min_party_size {
        return Err(ConfigError::Validation(
            "restaurant.max_party_size must be at least restaurant.min_party_size".to_string(),
        ));
    }

    if restaurant.max_capacity == 0 {
        return Err(ConfigError::Validation(
            "restaurant.max_capacity must be greater than zero".to_string(),
        ));
    }

    if restaurant.capacity_buffer_percent >= 100 {
        return Err(ConfigError::Validation(
            "restaurant.capacity_buffer_percent must be below 100".to_string(),
        ));
    }

    if restaurant.reservation_duration_minutes == 0 {
        return Err(ConfigError::Validation(
            "restaurant.reservation_duration_minutes must be greater than zero".to_string(),
        ));
    }

    if restaurant.service_windows.is_empty() {
        return Err(ConfigError::Validation(
            "restaurant.service_windows must define at least one window".to_string(),
        ));
    }

    for window in &restaurant.service_windows {
        if window.opens >= window.closes {
            return Err(ConfigError::Validation(format!(
                "restaurant.service_windows `{}` must open before it closes",
                window.label
            )));
        }
    }

    let mut sorted = restaurant.service_windows.clone();
    sorted.sort_by_key(|window| window.opens);
    for pair in sorted.windows(2) {
        if pair[1].opens < pair[0].closes {
            return Err(ConfigError::Validation(format!(
                "restaurant.service_windows `{}` and `{}` overlap",
                pair[0].label, pair[1].label
            )));
        }
    }

    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let level = logging.level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ConfigError::Validation(
            "logging.level must be one of trace|debug|info|warn|error".to_string(),
        )),
    }
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_u16(key: &str, value: &str) -> Result<u16, ConfigError> {
    value.parse::<u16>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_u32(key: &str, value: &str) -> Result<u32, ConfigError> {
    value.parse::<u32>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_u64(key: &str, value: &str) -> Result<u64, ConfigError> {
    value.parse::<u64>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_language(key: &str, value: &str) -> Result<Language, ConfigError> {
    value.parse::<Language>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

/// Accepts `"HH:MM"` (and `"HH:MM:SS"`) clock strings in config files.
fn deserialize_clock<'de, D>(deserializer: D) -> Result<NaiveTime, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    NaiveTime::parse_from_str(&raw, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(&raw, "%H:%M:%S"))
        .map_err(|_| serde::de::Error::custom(format!("invalid clock time `{raw}` (use HH:MM)")))
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    database: Option<DatabasePatch>,
    analyzer: Option<AnalyzerPatch>,
    server: Option<ServerPatch>,
    restaurant: Option<RestaurantPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct DatabasePatch {
    url: Option<String>,
    max_connections: Option<u32>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct AnalyzerPatch {
    provider: Option<AnalyzerProvider>,
    api_key: Option<String>,
    base_url: Option<String>,
    model: Option<String>,
    timeout_secs: Option<u64>,
    max_retries: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
struct ServerPatch {
    bind_address: Option<String>,
    port: Option<u16>,
    health_check_port: Option<u16>,
    graceful_shutdown_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct RestaurantPatch {
    name: Option<String>,
    default_language: Option<Language>,
    min_party_size: Option<u32>,
    max_party_size: Option<u32>,
    max_capacity: Option<u32>,
    capacity_buffer_percent: Option<u32>,
    reservation_duration_minutes: Option<u32>,
    overlap_window_minutes: Option<u32>,
    min_advance_hours: Option<u32>,
    service_windows: Option<Vec<ServiceWindow>>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}

#[cfg(test)]
mod tests {
    use std::env;
    use std::fs;
    use std::io;
    use std::sync::{Mutex, OnceLock};

    use secrecy::ExposeSecret;
    use tempfile::TempDir;

    use super::{
        clock, AnalyzerProvider, AppConfig, ConfigError, ConfigOverrides, LoadOptions, LogFormat,
    };

    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

    fn env_lock() -> &'static Mutex<()> {
        ENV_LOCK.get_or_init(|| Mutex::new(()))
    }

    fn clear_vars(vars: &[&str]) {
        for var in vars {
            env::remove_var(var);
        }
    }

    fn ensure(condition: bool, message: &'static str) -> Result<(), String> {
        if condition {
            Ok(())
        } else {
            Err(message.to_string())
        }
    }

    #[test]
    fn file_load_supports_env_interpolation() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("TEST_ANALYZER_API_KEY", "AIza-from-env");

        let result = (|| -> Result<(), String> {
            let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
            let path = dir.path().join("reserva.toml");
            fs::write(
                &path,
                r#"
[analyzer]
provider = "gemini"
api_key = "${TEST_ANALYZER_API_KEY}"
"#,
            )
            .map_err(|err| err.to_string())?;

            let config =
                AppConfig::load(LoadOptions { config_path: Some(path), ..LoadOptions::default() })
                    .map_err(|err| format!("config load failed: {err}"))?;

            ensure(
                config
                    .analyzer
                    .api_key
                    .as_ref()
                    .map(|key| key.expose_secret() == "AIza-from-env")
                    .unwrap_or(false),
                "api key should be loaded from environment",
            )?;
            Ok(())
        })();

        clear_vars(&["TEST_ANALYZER_API_KEY"]);
        result
    }

    #[test]
    fn logging_env_aliases_are_supported() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("RESERVA_LOG_LEVEL", "warn");
        env::set_var("RESERVA_LOG_FORMAT", "pretty");

        let result = (|| -> Result<(), String> {
            let config = AppConfig::load(LoadOptions::default())
                .map_err(|err| format!("config load failed: {err}"))?;

            ensure(config.logging.level == "warn", "warning log level should be set from env var")?;
            ensure(
                matches!(config.logging.format, LogFormat::Pretty),
                "pretty logging format should be set from env var",
            )?;
            Ok(())
        })();

        clear_vars(&["RESERVA_LOG_LEVEL", "RESERVA_LOG_FORMAT"]);
        result
    }

    #[test]
    fn precedence_defaults_file_env_overrides() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("RESERVA_DATABASE_URL", "sqlite://from-env.db");
        env::set_var("RESERVA_RESTAURANT_MAX_PARTY_SIZE", "12");

        let result = (|| -> Result<(), String> {
            let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
            let path = dir.path().join("reserva.toml");
            fs::write(
                &path,
                r#"
[database]
url = "sqlite://from-file.db"

[restaurant]
name = "Casa Pepe"
max_party_size = 8

[logging]
level = "warn"
"#,
            )
            .map_err(|err| err.to_string())?;

            let config = AppConfig::load(LoadOptions {
                config_path: Some(path),
                overrides: ConfigOverrides {
                    database_url: Some("sqlite://from-override.db".to_string()),
                    log_level: Some("debug".to_string()),
                    ..ConfigOverrides::default()
                },
                ..LoadOptions::default()
            })
            .map_err(|err| format!("config load failed: {err}"))?;

            ensure(
                config.database.url == "sqlite://from-override.db",
                "override database url should win",
            )?;
            ensure(config.logging.level == "debug", "overridden log level should be debug")?;
            ensure(config.restaurant.name == "Casa Pepe", "file restaurant name should apply")?;
            ensure(
                config.restaurant.max_party_size == 12,
                "env max party size should win over file and defaults",
            )?;
            Ok(())
        })();

        clear_vars(&["RESERVA_DATABASE_URL", "RESERVA_RESTAURANT_MAX_PARTY_SIZE"]);
        result
    }

    #[test]
    fn service_windows_parse_from_clock_strings() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
        let path = dir.path().join("reserva.toml");
        fs::write(
            &path,
            r#"
[restaurant]
service_windows = [
  { label = "lunch", opens = "12:30", closes = "16:00" },
]
"#,
        )
        .map_err(|err| err.to_string())?;

        let config =
            AppConfig::load(LoadOptions { config_path: Some(path), ..LoadOptions::default() })
                .map_err(|err| format!("config load failed: {err}"))?;

        ensure(
            config.restaurant.service_windows.len() == 1,
            "file service windows should replace defaults",
        )?;
        ensure(
            config.restaurant.service_windows[0].opens == clock(12, 30),
            "opens should parse from HH:MM",
        )
    }

    #[test]
    fn gemini_without_key_fails_with_actionable_error() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("RESERVA_ANALYZER_PROVIDER", "gemini");

        let result = (|| -> Result<(), String> {
            let error = match AppConfig::load(LoadOptions::default()) {
                Ok(_) => {
                    return Err("expected validation failure but config load succeeded".to_string())
                }
                Err(error) => error,
            };
            let has_message = matches!(
                error,
                ConfigError::Validation(ref message) if message.contains("analyzer.api_key")
            );
            ensure(has_message, "validation failure should mention analyzer.api_key")
        })();

        clear_vars(&["RESERVA_ANALYZER_PROVIDER"]);
        result
    }

    #[test]
    fn inverted_service_window_is_rejected() -> Result<(), String> {
        let mut config = AppConfig::default();
        config.restaurant.service_windows[0].closes = clock(11, 0);
        let error = match config.validate() {
            Ok(()) => return Err("expected validation failure".to_string()),
            Err(error) => error,
        };
        ensure(
            matches!(error, ConfigError::Validation(ref message) if message.contains("lunch")),
            "error should name the offending window",
        )
    }

    #[test]
    fn secret_values_are_not_leaked_by_debug() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("GEMINI_API_KEY", "AIza-secret-value");

        let result = (|| -> Result<(), String> {
            let config = AppConfig::load(LoadOptions::default())
                .map_err(|err| format!("config load failed: {err}"))?;
            let debug = format!("{config:?}");

            ensure(
                !debug.contains("AIza-secret-value"),
                "debug output should not contain the api key",
            )?;
            ensure(
                matches!(config.analyzer.provider, AnalyzerProvider::Deterministic),
                "default analyzer provider should be deterministic",
            )?;
            Ok(())
        })();

        clear_vars(&["GEMINI_API_KEY"]);
        result
    }
}
