use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use reserva_core::config::{AppConfig, LoadOptions};
use secrecy::ExposeSecret;
use toml::Value;

pub fn run() -> String {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => return format!("config validation failed: {error}"),
    };

    let config_file_path = detect_config_path();
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());

    let mut lines = vec!["effective config (source precedence: env > file > default):".to_string()];

    let mut push = |key: &str, value: &str, env_keys: &[&str]| {
        lines.push(render_line(
            key,
            value,
            field_source(key, env_keys, config_file_doc.as_ref(), config_file_path.as_deref()),
        ));
    };

    push("database.url", &config.database.url, &["RESERVA_DATABASE_URL"]);
    push(
        "database.max_connections",
        &config.database.max_connections.to_string(),
        &["RESERVA_DATABASE_MAX_CONNECTIONS"],
    );
    push(
        "database.timeout_secs",
        &config.database.timeout_secs.to_string(),
        &["RESERVA_DATABASE_TIMEOUT_SECS"],
    );

    push(
        "analyzer.provider",
        &format!("{:?}", config.analyzer.provider),
        &["RESERVA_ANALYZER_PROVIDER"],
    );
    push("analyzer.model", &config.analyzer.model, &["RESERVA_ANALYZER_MODEL"]);
    push(
        "analyzer.base_url",
        config.analyzer.base_url.as_deref().unwrap_or("<unset>"),
        &["RESERVA_ANALYZER_BASE_URL"],
    );
    let api_key = match config.analyzer.api_key.as_ref() {
        Some(key) => redact_key(key.expose_secret()),
        None => "<unset>".to_string(),
    };
    push("analyzer.api_key", &api_key, &["RESERVA_ANALYZER_API_KEY", "GEMINI_API_KEY"]);

    push("server.bind_address", &config.server.bind_address, &["RESERVA_SERVER_BIND_ADDRESS"]);
    push("server.port", &config.server.port.to_string(), &["RESERVA_SERVER_PORT"]);
    push(
        "server.health_check_port",
        &config.server.health_check_port.to_string(),
        &["RESERVA_SERVER_HEALTH_CHECK_PORT"],
    );

    push("restaurant.name", &config.restaurant.name, &["RESERVA_RESTAURANT_NAME"]);
    push(
        "restaurant.default_language",
        config.restaurant.default_language.as_str(),
        &["RESERVA_RESTAURANT_DEFAULT_LANGUAGE"],
    );
    push(
        "restaurant.max_party_size",
        &config.restaurant.max_party_size.to_string(),
        &["RESERVA_RESTAURANT_MAX_PARTY_SIZE"],
    );
    push(
        "restaurant.max_capacity",
        &config.restaurant.max_capacity.to_string(),
        &["RESERVA_RESTAURANT_MAX_CAPACITY"],
    );
    push(
        "restaurant.min_advance_hours",
        &config.restaurant.min_advance_hours.to_string(),
        &["RESERVA_RESTAURANT_MIN_ADVANCE_HOURS"],
    );

    push("logging.level", &config.logging.level, &["RESERVA_LOGGING_LEVEL", "RESERVA_LOG_LEVEL"]);
    push(
        "logging.format",
        &format!("{:?}", config.logging.format),
        &["RESERVA_LOGGING_FORMAT", "RESERVA_LOG_FORMAT"],
    );

    lines.join("\n")
}

fn detect_config_path() -> Option<PathBuf> {
    let root = PathBuf::from("reserva.toml");
    if root.exists() {
        return Some(root);
    }

    let nested = PathBuf::from("config/reserva.toml");
    if nested.exists() {
        return Some(nested);
    }

    None
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    key_path: &str,
    env_keys: &[&str],
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    for env_key in env_keys {
        if env::var_os(env_key).is_some() {
            return format!("env ({env_key})");
        }
    }

    if let Some(doc) = config_file_doc {
        if contains_path(doc, key_path) {
            let file_path = config_file_path
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "config file".to_string());
            return format!("file ({file_path})");
        }
    }

    "default".to_string()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}

fn render_line(key: &str, value: &str, source: String) -> String {
    format!("- {key} = {value} (source: {source})")
}

fn redact_key(key: &str) -> String {
    let trimmed = key.trim();
    if trimmed.is_empty() {
        return "<empty>".to_string();
    }

    let prefix: String = trimmed.chars().take(4).collect();
    format!("{prefix}***")
}
