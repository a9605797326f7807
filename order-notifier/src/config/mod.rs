use chrono::FixedOffset;
use secrecy::Secret;
use service_core::config as core_config;
use service_core::error::AppError;
use std::env;
use std::str::FromStr;

pub const DEFAULT_TELEGRAM_API_BASE_URL: &str = "https://api.telegram.org";
pub const DEFAULT_TELEGRAM_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Clone)]
pub struct OrderNotifierConfig {
    pub common: core_config::Config,
    pub telegram: TelegramConfig,
    pub display: DisplayConfig,
}

#[derive(Debug, Clone)]
pub struct TelegramConfig {
    /// Missing credentials are not a startup error: the order endpoint
    /// reports them as a server misconfiguration per request.
    pub bot_token: Option<Secret<String>>,
    pub chat_id: Option<String>,
    pub api_base_url: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Default)]
pub struct DisplayConfig {
    /// Offset used when printing order times. `None` follows the host time
    /// zone, including its daylight-saving rules.
    pub utc_offset_minutes: Option<i32>,
}

impl DisplayConfig {
    pub fn fixed_offset(&self) -> Option<FixedOffset> {
        self.utc_offset_minutes
            .and_then(|minutes| minutes.checked_mul(60))
            .and_then(FixedOffset::east_opt)
    }
}

impl OrderNotifierConfig {
    pub fn load() -> Result<Self, AppError> {
        let common_config = core_config::Config::load()?;

        let utc_offset_minutes = match optional_env("DISPLAY_UTC_OFFSET_MINUTES") {
            Some(raw) => {
                let minutes: i32 = parse_value("DISPLAY_UTC_OFFSET_MINUTES", &raw)?;
                if minutes.checked_mul(60).and_then(FixedOffset::east_opt).is_none() {
                    return Err(AppError::ConfigError(anyhow::anyhow!(
                        "DISPLAY_UTC_OFFSET_MINUTES is out of range: {}",
                        minutes
                    )));
                }
                Some(minutes)
            }
            None => None,
        };

        Ok(OrderNotifierConfig {
            common: common_config,
            telegram: TelegramConfig {
                bot_token: optional_env("TELEGRAM_BOT_TOKEN").map(Secret::new),
                chat_id: optional_env("TELEGRAM_CHAT_ID"),
                api_base_url: optional_env("TELEGRAM_API_BASE_URL")
                    .unwrap_or_else(|| DEFAULT_TELEGRAM_API_BASE_URL.to_string()),
                timeout_secs: match optional_env("TELEGRAM_TIMEOUT_SECS") {
                    Some(raw) => parse_value("TELEGRAM_TIMEOUT_SECS", &raw)?,
                    None => DEFAULT_TELEGRAM_TIMEOUT_SECS,
                },
            },
            display: DisplayConfig { utc_offset_minutes },
        })
    }
}

/// Unset and empty variables are both treated as absent.
fn optional_env(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|val| val.trim().to_string())
        .filter(|val| !val.is_empty())
}

fn parse_value<T>(key: &str, raw: &str) -> Result<T, AppError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.parse().map_err(|e| {
        AppError::ConfigError(anyhow::anyhow!("{} has an invalid value '{}': {}", key, raw, e))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_display_offset_is_used_when_configured() {
        let display = DisplayConfig {
            utc_offset_minutes: Some(300),
        };

        assert_eq!(
            display.fixed_offset().map(|o| o.local_minus_utc()),
            Some(5 * 3600)
        );
    }

    #[test]
    fn unset_display_offset_follows_host_zone() {
        assert_eq!(DisplayConfig::default().fixed_offset(), None);
    }

    #[test]
    fn invalid_number_is_a_config_error() {
        let err = parse_value::<u64>("TELEGRAM_TIMEOUT_SECS", "ten").unwrap_err();

        assert!(matches!(err, AppError::ConfigError(_)));
        assert!(err.to_string().contains("TELEGRAM_TIMEOUT_SECS"));
    }
}
