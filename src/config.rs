use crate::domain::models::RiskLevel;
use crate::domain::scoring::WorkloadSettings;
use crate::time_utils::Timezone;
use base64::{engine::general_purpose, Engine as _};
use std::{env, fmt::Display, str::FromStr};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("invalid value for {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
}

pub struct AppConfig {
    pub database_url: String,
    pub max_connections: u32,
    pub bind_addr: String,
    pub session_key: Vec<u8>,
    pub timezone: Timezone,
    pub cors_origin: Option<String>,
    pub workload: WorkloadSettings,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let database_url = env::var("DATABASE_URL").map_err(|_| ConfigError::Missing("DATABASE_URL"))?;

        let session_key_b64 = env::var("SESSION_KEY").map_err(|_| ConfigError::Missing("SESSION_KEY"))?;
        let session_key = general_purpose::STANDARD
            .decode(session_key_b64.trim())
            .map_err(|e| ConfigError::Invalid {
                key: "SESSION_KEY",
                reason: e.to_string(),
            })?;
        if session_key.len() < 32 {
            return Err(ConfigError::Invalid {
                key: "SESSION_KEY",
                reason: "decoded key must be at least 32 bytes".to_string(),
            });
        }

        let bind_addr = env::var("BIND_ADDR").unwrap_or_else(|_| {
            let port = env::var("PORT").unwrap_or_else(|_| "3000".to_string());
            format!("0.0.0.0:{}", port)
        });

        let tz_raw = env::var("APP_TIMEZONE").unwrap_or_else(|_| "UTC".to_string());
        let timezone = Timezone::parse(&tz_raw).ok_or_else(|| ConfigError::Invalid {
            key: "APP_TIMEZONE",
            reason: format!("unknown timezone {tz_raw:?}"),
        })?;

        Ok(Self {
            database_url,
            max_connections: try_load("DATABASE_MAX_CONNECTIONS", 10)?,
            bind_addr,
            session_key,
            timezone,
            cors_origin: env::var("CORS_ORIGIN").ok().filter(|v| !v.trim().is_empty()),
            workload: workload_settings()?,
        })
    }
}

fn workload_settings() -> Result<WorkloadSettings, ConfigError> {
    let defaults = WorkloadSettings::default();

    let alert_threshold = match env::var("WORKLOAD_ALERT_THRESHOLD") {
        Ok(raw) => raw.parse::<RiskLevel>().map_err(|e| ConfigError::Invalid {
            key: "WORKLOAD_ALERT_THRESHOLD",
            reason: e.to_string(),
        })?,
        Err(_) => defaults.alert_threshold,
    };

    let settings = WorkloadSettings {
        credit_scale: try_load("WORKLOAD_CREDIT_SCALE", defaults.credit_scale)?,
        default_credits: try_load("WORKLOAD_DEFAULT_CREDITS", defaults.default_credits)?,
        high_impact_weight: try_load("WORKLOAD_HIGH_IMPACT_WEIGHT", defaults.high_impact_weight)?,
        high_impact_critical_count: try_load(
            "WORKLOAD_HIGH_IMPACT_CRITICAL_COUNT",
            defaults.high_impact_critical_count,
        )?,
        moderate_min: try_load("WORKLOAD_MODERATE_MIN", defaults.moderate_min)?,
        critical_min: try_load("WORKLOAD_CRITICAL_MIN", defaults.critical_min)?,
        alert_threshold,
        summary_weeks: try_load("WORKLOAD_SUMMARY_WEEKS", defaults.summary_weeks)?,
    };
    validate(&settings)?;
    Ok(settings)
}

const MAX_CREDIT_SCALE: i64 = 100;
const MAX_MODULE_CREDITS: i32 = 30;

fn validate(settings: &WorkloadSettings) -> Result<(), ConfigError> {
    if !(1..=MAX_CREDIT_SCALE).contains(&settings.credit_scale) {
        return Err(ConfigError::Invalid {
            key: "WORKLOAD_CREDIT_SCALE",
            reason: format!("must be between 1 and {MAX_CREDIT_SCALE}"),
        });
    }
    if !(1..=MAX_MODULE_CREDITS).contains(&settings.default_credits) {
        return Err(ConfigError::Invalid {
            key: "WORKLOAD_DEFAULT_CREDITS",
            reason: format!("must be between 1 and {MAX_MODULE_CREDITS}"),
        });
    }
    if settings.high_impact_critical_count == 0 {
        return Err(ConfigError::Invalid {
            key: "WORKLOAD_HIGH_IMPACT_CRITICAL_COUNT",
            reason: "must be at least 1".to_string(),
        });
    }
    if settings.moderate_min > settings.critical_min {
        return Err(ConfigError::Invalid {
            key: "WORKLOAD_MODERATE_MIN",
            reason: "moderate threshold must not exceed critical threshold".to_string(),
        });
    }
    if settings.summary_weeks == 0 {
        return Err(ConfigError::Invalid {
            key: "WORKLOAD_SUMMARY_WEEKS",
            reason: "must be at least 1".to_string(),
        });
    }
    Ok(())
}

fn try_load<T>(key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr + Display,
    T::Err: Display,
{
    match env::var(key) {
        Ok(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
            key,
            reason: e.to_string(),
        }),
        Err(_) => {
            tracing::debug!("{key} not set, using default: {default}");
            Ok(default)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_pass_validation() {
        assert!(validate(&WorkloadSettings::default()).is_ok());
    }

    #[test]
    fn inverted_thresholds_are_rejected() {
        let settings = WorkloadSettings {
            moderate_min: 90,
            critical_min: 80,
            ..WorkloadSettings::default()
        };
        assert!(matches!(
            validate(&settings),
            Err(ConfigError::Invalid { key: "WORKLOAD_MODERATE_MIN", .. })
        ));
    }

    #[test]
    fn unset_keys_fall_back_to_defaults() {
        let value: i64 = try_load("WORKLOAD_TEST_UNSET_KEY_FOR_DEFAULTS", 7).unwrap();
        assert_eq!(value, 7);
    }

    #[test]
    fn degenerate_scoring_knobs_are_rejected() {
        let zero_count = WorkloadSettings {
            high_impact_critical_count: 0,
            ..WorkloadSettings::default()
        };
        assert!(matches!(
            validate(&zero_count),
            Err(ConfigError::Invalid { key: "WORKLOAD_HIGH_IMPACT_CRITICAL_COUNT", .. })
        ));

        for credit_scale in [0, -5, MAX_CREDIT_SCALE + 1, i64::MAX] {
            let settings = WorkloadSettings {
                credit_scale,
                ..WorkloadSettings::default()
            };
            assert!(matches!(
                validate(&settings),
                Err(ConfigError::Invalid { key: "WORKLOAD_CREDIT_SCALE", .. })
            ));
        }

        let too_many_credits = WorkloadSettings {
            default_credits: MAX_MODULE_CREDITS + 1,
            ..WorkloadSettings::default()
        };
        assert!(validate(&too_many_credits).is_err());
    }
}
