use secrecy::Secret;
use service_core::config as core_config;
use service_core::error::AppError;
use std::env;
use std::time::Duration;

/// SiliconFlow's OpenAI-compatible chat completions endpoint.
pub const DEFAULT_COMPLETION_URL: &str = "https://api.siliconflow.cn/v1/chat/completions";

pub const DEFAULT_COMPLETION_MODEL: &str = "Qwen/Qwen2.5-7B-Instruct";

pub const DEFAULT_COMPLETION_TIMEOUT_SECS: u64 = 30;

const DEFAULT_ENVIRONMENT: &str = "development";

#[derive(Debug, Clone)]
pub struct AnalysisConfig {
    pub common: core_config::Config,
    /// Free-form deployment label (`development`, `staging`, `prod`...).
    pub environment: String,
    pub completion: CompletionConfig,
    pub cors: CorsConfig,
    pub otlp_endpoint: Option<String>,
}

#[derive(Debug, Clone)]
pub struct CompletionConfig {
    /// Absent keys are reported per request, never at startup.
    pub api_key: Option<Secret<String>>,
    pub api_url: String,
    pub model: String,
    pub timeout: Duration,
}

#[derive(Debug, Clone, Default)]
pub struct CorsConfig {
    /// `None` allows every origin.
    pub allowed_origin: Option<String>,
}

impl AnalysisConfig {
    pub fn load() -> Result<Self, AppError> {
        let mut common = core_config::Config::load()?;
        let environment = get_env("ENVIRONMENT", Some(DEFAULT_ENVIRONMENT), false)?;
        let is_prod = environment == "prod" || environment == "production";

        if let Some(port) = get_optional_env("PORT") {
            common.port = port.parse().map_err(|e| {
                AppError::ConfigError(anyhow::anyhow!("PORT must be a valid port number: {}", e))
            })?;
        }
        if let Some(level) = get_optional_env("LOG_LEVEL") {
            common.log_level = level;
        }

        let timeout_secs: u64 = get_env(
            "SILICONFLOW_TIMEOUT_SECS",
            Some(&DEFAULT_COMPLETION_TIMEOUT_SECS.to_string()),
            is_prod,
        )?
        .parse()
        .map_err(|e| {
            AppError::ConfigError(anyhow::anyhow!(
                "SILICONFLOW_TIMEOUT_SECS must be a whole number of seconds: {}",
                e
            ))
        })?;

        Ok(AnalysisConfig {
            common,
            environment,
            completion: CompletionConfig {
                api_key: get_optional_env("SILICONFLOW_API_KEY").map(Secret::new),
                api_url: get_env("SILICONFLOW_API_URL", Some(DEFAULT_COMPLETION_URL), is_prod)?,
                model: get_env("SILICONFLOW_MODEL", Some(DEFAULT_COMPLETION_MODEL), is_prod)?,
                timeout: Duration::from_secs(timeout_secs),
            },
            cors: CorsConfig {
                allowed_origin: parse_allowed_origin(get_optional_env("FRONTEND_URL")),
            },
            otlp_endpoint: get_optional_env("OTLP_ENDPOINT"),
        })
    }
}

/// `*` and blank values mean "any origin".
fn parse_allowed_origin(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty() && v != "*")
}

fn get_optional_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn get_env(key: &str, default: Option<&str>, is_prod: bool) -> Result<String, AppError> {
    match get_optional_env(key) {
        Some(val) => Ok(val),
        None => match default {
            Some(def) => Ok(def.to_string()),
            None if is_prod => Err(AppError::ConfigError(anyhow::anyhow!(
                "{} is required in production but not set",
                key
            ))),
            None => Err(AppError::ConfigError(anyhow::anyhow!(
                "{} is required but not set",
                key
            ))),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wildcard_origin_means_any() {
        assert_eq!(parse_allowed_origin(Some("*".to_string())), None);
        assert_eq!(parse_allowed_origin(Some("  ".to_string())), None);
        assert_eq!(parse_allowed_origin(None), None);
    }

    #[test]
    fn explicit_origin_is_kept() {
        assert_eq!(
            parse_allowed_origin(Some(" https://needs.example.com ".to_string())),
            Some("https://needs.example.com".to_string())
        );
    }

    #[test]
    fn missing_required_variable_is_a_config_error() {
        let err = get_env("ANALYSIS_TEST_SURELY_UNSET_VARIABLE", None, true).unwrap_err();
        assert!(matches!(err, AppError::ConfigError(_)));
        assert!(err.to_string().contains("required in production"));
    }

    #[test]
    fn default_applies_when_unset() {
        let value = get_env("ANALYSIS_TEST_SURELY_UNSET_VARIABLE", Some("fallback"), true).unwrap();
        assert_eq!(value, "fallback");
    }
}
