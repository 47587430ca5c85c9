use crate::app_config::{AppConfig, Environment};
use crate::ConfigError;

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the process.
///
/// Unlike [`load_app_config`], this does NOT load `.env` files.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// Decoupled from the real environment so it can be tested with a pure
/// `HashMap` lookup.
pub fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    use std::net::SocketAddr;

    let require = |var: &str| -> Result<String, ConfigError> {
        lookup(var)
            .ok()
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| ConfigError::MissingEnvVar(var.to_string()))
    };

    let optional = |var: &str| -> Option<String> {
        lookup(var).ok().filter(|v| !v.trim().is_empty())
    };

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let invalid = |var: &str, reason: String| ConfigError::InvalidEnvVar {
        var: var.to_string(),
        reason,
    };

    let parse_addr = |var: &str, default: &str| -> Result<SocketAddr, ConfigError> {
        or_default(var, default)
            .parse::<SocketAddr>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_u32 = |var: &str, default: &str| -> Result<u32, ConfigError> {
        or_default(var, default)
            .parse::<u32>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        or_default(var, default)
            .parse::<u64>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_usize = |var: &str, default: &str| -> Result<usize, ConfigError> {
        or_default(var, default)
            .parse::<usize>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let completion_api_key = require("OPENAI_API_KEY")?;

    let env = parse_environment(&or_default("BRANDSCOPE_ENV", "development"))?;
    let bind_addr = parse_addr("BRANDSCOPE_BIND_ADDR", "0.0.0.0:3000")?;
    let log_level = or_default("BRANDSCOPE_LOG_LEVEL", "info");

    let completion_base_url = or_default(
        "BRANDSCOPE_COMPLETION_BASE_URL",
        "https://api.openai.com/v1",
    )
    .trim_end_matches('/')
    .to_string();
    let completion_model = or_default("BRANDSCOPE_COMPLETION_MODEL", "gpt-4o-mini");
    let completion_timeout_secs = parse_u64("BRANDSCOPE_COMPLETION_TIMEOUT_SECS", "120")?;

    let request_timeout_secs = parse_u64("BRANDSCOPE_REQUEST_TIMEOUT_SECS", "30")?;
    let user_agent = or_default(
        "BRANDSCOPE_USER_AGENT",
        "brandscope/0.1 (storefront-intelligence)",
    );
    let nav_max_attempts = parse_u32("BRANDSCOPE_NAV_MAX_ATTEMPTS", "3")?;
    if nav_max_attempts == 0 {
        return Err(invalid(
            "BRANDSCOPE_NAV_MAX_ATTEMPTS",
            "must be at least 1".to_string(),
        ));
    }
    let nav_retry_delay_ms = parse_u64("BRANDSCOPE_NAV_RETRY_DELAY_MS", "2000")?;
    let access_denied_settle_ms = parse_u64("BRANDSCOPE_ACCESS_DENIED_SETTLE_MS", "5000")?;

    let image_api_base_url =
        optional("BRANDSCOPE_IMAGE_API_BASE_URL").map(|u| u.trim_end_matches('/').to_string());
    let image_api_client_id = optional("BRANDSCOPE_IMAGE_API_CLIENT_ID");
    let image_album_id = optional("BRANDSCOPE_IMAGE_ALBUM_ID");
    let image_max_pages = parse_usize("BRANDSCOPE_IMAGE_MAX_PAGES", "50")?;
    let image_max_retries = parse_u32("BRANDSCOPE_IMAGE_MAX_RETRIES", "3")?;
    let image_backoff_base_ms = parse_u64("BRANDSCOPE_IMAGE_BACKOFF_BASE_MS", "1000")?;

    Ok(AppConfig {
        env,
        bind_addr,
        log_level,
        completion_api_key,
        completion_base_url,
        completion_model,
        completion_timeout_secs,
        request_timeout_secs,
        user_agent,
        nav_max_attempts,
        nav_retry_delay_ms,
        access_denied_settle_ms,
        image_api_base_url,
        image_api_client_id,
        image_album_id,
        image_max_pages,
        image_max_retries,
        image_backoff_base_ms,
    })
}

fn parse_environment(s: &str) -> Result<Environment, ConfigError> {
    match s {
        "development" => Ok(Environment::Development),
        "test" => Ok(Environment::Test),
        "production" => Ok(Environment::Production),
        other => Err(ConfigError::InvalidEnvVar {
            var: "BRANDSCOPE_ENV".to_string(),
            reason: format!("unknown environment \"{other}\""),
        }),
    }
}
