//! Configuration types.

use secrecy::SecretString;

use crate::channels::WhatsAppConfig;
use crate::error::ConfigError;
use crate::flow::PhoneKeyFormat;
use crate::validation::{PhoneRules, ValidationRules, YearRange};

/// How inbound messages arrive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    /// WhatsApp Cloud API webhook server.
    Webhook,
    /// stdin/stdout REPL for local testing.
    Cli,
}

impl std::str::FromStr for RunMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "webhook" => Ok(Self::Webhook),
            "cli" => Ok(Self::Cli),
            other => Err(ConfigError::InvalidValue {
                key: "TANGO_BOT_MODE".to_string(),
                message: format!("expected `webhook` or `cli`, got `{other}`"),
            }),
        }
    }
}

/// Free-text extraction settings. Present only when an API key is set.
#[derive(Debug, Clone)]
pub struct ExtractionConfig {
    pub api_key: SecretString,
    pub model: String,
}

/// Bot configuration.
#[derive(Debug, Clone)]
pub struct BotConfig {
    pub mode: RunMode,
    pub port: u16,
    /// Required in webhook mode.
    pub whatsapp: Option<WhatsAppConfig>,
    pub secret_access_code: Option<SecretString>,
    pub phone_format: PhoneKeyFormat,
    pub rules: ValidationRules,
    pub require_teacher_password: bool,
    pub extraction: Option<ExtractionConfig>,
    /// Extraction confidence (0–100) below which the user is warned.
    pub min_confidence: u8,
}

impl BotConfig {
    /// Read the configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read the configuration through `lookup`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let parsed = |key: &str| -> Result<Option<u64>, ConfigError> {
            var(key)
                .map(|v| {
                    v.trim().parse::<u64>().map_err(|e| ConfigError::InvalidValue {
                        key: key.to_string(),
                        message: e.to_string(),
                    })
                })
                .transpose()
        };

        let mode = match var("TANGO_BOT_MODE") {
            Some(raw) => raw.parse()?,
            None => RunMode::Webhook,
        };
        let port = narrow("TANGO_BOT_PORT", parsed("TANGO_BOT_PORT")?.unwrap_or(8080))?;

        let whatsapp = match (
            var("WHATSAPP_TOKEN"),
            var("WHATSAPP_PHONE_NUMBER_ID"),
            var("WHATSAPP_VERIFY_TOKEN"),
        ) {
            (Some(token), Some(phone_number_id), Some(verify_token)) => Some(WhatsAppConfig {
                access_token: SecretString::from(token),
                phone_number_id,
                verify_token: SecretString::from(verify_token),
                api_version: var("WHATSAPP_API_VERSION").unwrap_or_else(|| "v21.0".to_string()),
            }),
            (token, phone_id, verify) if mode == RunMode::Webhook => {
                let missing = [
                    ("WHATSAPP_TOKEN", token.is_none()),
                    ("WHATSAPP_PHONE_NUMBER_ID", phone_id.is_none()),
                    ("WHATSAPP_VERIFY_TOKEN", verify.is_none()),
                ]
                .into_iter()
                .find(|(_, missing)| *missing)
                .map(|(key, _)| key)
                .unwrap_or("WHATSAPP_TOKEN");
                return Err(ConfigError::MissingEnvVar(missing.to_string()));
            }
            _ => None,
        };

        let defaults = ValidationRules::default();
        let years = YearRange {
            min: narrow("TANGO_MIN_YEAR", parsed("TANGO_MIN_YEAR")?.unwrap_or(defaults.years.min as u64))?,
            max: narrow("TANGO_MAX_YEAR", parsed("TANGO_MAX_YEAR")?.unwrap_or(defaults.years.max as u64))?,
        };
        if years.min > years.max {
            return Err(ConfigError::InvalidValue {
                key: "TANGO_MIN_YEAR".to_string(),
                message: format!("{} is after TANGO_MAX_YEAR {}", years.min, years.max),
            });
        }
        let phone = PhoneRules {
            min_digits: narrow(
                "TANGO_PHONE_MIN_DIGITS",
                parsed("TANGO_PHONE_MIN_DIGITS")?.unwrap_or(defaults.phone.min_digits as u64),
            )?,
            max_digits: narrow(
                "TANGO_PHONE_MAX_DIGITS",
                parsed("TANGO_PHONE_MAX_DIGITS")?.unwrap_or(defaults.phone.max_digits as u64),
            )?,
            required_prefix: var("TANGO_PHONE_PREFIX").unwrap_or(defaults.phone.required_prefix),
        };

        let phone_format = PhoneKeyFormat {
            country_code: var("TANGO_COUNTRY_CODE").unwrap_or_else(|| "54".to_string()),
            mobile_prefix: var("TANGO_MOBILE_PREFIX").unwrap_or_else(|| "9".to_string()),
        };

        let require_teacher_password = var("TANGO_REQUIRE_TEACHER_PASSWORD")
            .map(|v| matches!(v.trim().to_lowercase().as_str(), "1" | "true" | "yes"))
            .unwrap_or(false);

        let extraction = var("OPENAI_API_KEY").map(|key| ExtractionConfig {
            api_key: SecretString::from(key),
            model: var("OPENAI_MODEL").unwrap_or_else(|| "gpt-4o-mini".to_string()),
        });
        let min_confidence: u8 = narrow(
            "TANGO_MIN_CONFIDENCE",
            parsed("TANGO_MIN_CONFIDENCE")?.unwrap_or(60).min(100),
        )?;

        Ok(Self {
            mode,
            port,
            whatsapp,
            secret_access_code: var("TANGO_SECRET_ACCESS_CODE").map(SecretString::from),
            phone_format,
            rules: ValidationRules {
                years,
                phone,
                ..defaults
            },
            require_teacher_password,
            extraction,
            min_confidence,
        })
    }
}

/// Convert a parsed number into the field's integer type.
fn narrow<T: TryFrom<u64>>(key: &str, value: u64) -> Result<T, ConfigError> {
    T::try_from(value).map_err(|_| ConfigError::InvalidValue {
        key: key.to_string(),
        message: format!("{value} is out of range"),
    })
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use secrecy::ExposeSecret;

    use super::*;

    fn config(vars: &[(&str, &str)]) -> Result<BotConfig, ConfigError> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        BotConfig::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn cli_mode_needs_no_credentials() {
        let config = config(&[("TANGO_BOT_MODE", "cli")]).unwrap();
        assert_eq!(config.mode, RunMode::Cli);
        assert!(config.whatsapp.is_none());
        assert!(config.extraction.is_none());
        assert_eq!(config.rules, ValidationRules::default());
        assert_eq!(config.phone_format, PhoneKeyFormat::default());
        assert_eq!(config.min_confidence, 60);
        assert!(!config.require_teacher_password);
    }

    #[test]
    fn webhook_mode_requires_whatsapp_credentials() {
        let err = config(&[("WHATSAPP_TOKEN", "t")]).unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnvVar(ref key) if key == "WHATSAPP_PHONE_NUMBER_ID"));
    }

    #[test]
    fn webhook_mode_with_credentials() {
        let config = config(&[
            ("WHATSAPP_TOKEN", "token"),
            ("WHATSAPP_PHONE_NUMBER_ID", "1234"),
            ("WHATSAPP_VERIFY_TOKEN", "verify"),
            ("TANGO_BOT_PORT", "3000"),
            ("TANGO_SECRET_ACCESS_CODE", "milonga"),
        ])
        .unwrap();
        assert_eq!(config.mode, RunMode::Webhook);
        assert_eq!(config.port, 3000);
        let whatsapp = config.whatsapp.unwrap();
        assert_eq!(whatsapp.api_version, "v21.0");
        assert_eq!(whatsapp.access_token.expose_secret(), "token");
        assert_eq!(
            config.secret_access_code.unwrap().expose_secret(),
            "milonga"
        );
    }

    #[test]
    fn year_window_is_configurable() {
        let config = config(&[
            ("TANGO_BOT_MODE", "cli"),
            ("TANGO_MIN_YEAR", "2025"),
            ("TANGO_MAX_YEAR", "2035"),
        ])
        .unwrap();
        assert_eq!(config.rules.years, YearRange { min: 2025, max: 2035 });

        let inverted = config_err(&[
            ("TANGO_BOT_MODE", "cli"),
            ("TANGO_MIN_YEAR", "2031"),
            ("TANGO_MAX_YEAR", "2030"),
        ]);
        assert!(matches!(inverted, ConfigError::InvalidValue { .. }));
    }

    fn config_err(vars: &[(&str, &str)]) -> ConfigError {
        config(vars).unwrap_err()
    }

    #[test]
    fn invalid_values_are_reported() {
        assert!(matches!(
            config_err(&[("TANGO_BOT_MODE", "smoke-signals")]),
            ConfigError::InvalidValue { ref key, .. } if key == "TANGO_BOT_MODE"
        ));
        assert!(matches!(
            config_err(&[("TANGO_BOT_MODE", "cli"), ("TANGO_BOT_PORT", "99999")]),
            ConfigError::InvalidValue { ref key, .. } if key == "TANGO_BOT_PORT"
        ));
        assert!(matches!(
            config_err(&[("TANGO_BOT_MODE", "cli"), ("TANGO_PHONE_MIN_DIGITS", "eight")]),
            ConfigError::InvalidValue { ref key, .. } if key == "TANGO_PHONE_MIN_DIGITS"
        ));
    }

    #[test]
    fn extraction_enabled_by_api_key() {
        let config = config(&[
            ("TANGO_BOT_MODE", "cli"),
            ("OPENAI_API_KEY", "sk-test"),
            ("TANGO_MIN_CONFIDENCE", "75"),
            ("TANGO_REQUIRE_TEACHER_PASSWORD", "true"),
        ])
        .unwrap();
        let extraction = config.extraction.unwrap();
        assert_eq!(extraction.model, "gpt-4o-mini");
        assert_eq!(config.min_confidence, 75);
        assert!(config.require_teacher_password);
    }
}
