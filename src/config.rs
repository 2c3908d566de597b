use std::env;
use std::path::PathBuf;

use crate::error::AppError;

#[derive(Debug, Clone)]
pub struct Config {
    pub http_port: u16,
    pub log_level: String,
    pub fix_queue_size: usize,
    pub event_buffer_size: usize,
    pub nearby_radius_m: f64,
    pub fix_interval_secs: u64,
    pub min_fix_interval_secs: u64,
    pub settings_path: Option<PathBuf>,
    pub seed_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            http_port: 3000,
            log_level: "info".to_string(),
            fix_queue_size: 1024,
            event_buffer_size: 1024,
            nearby_radius_m: 200.0,
            fix_interval_secs: 10,
            min_fix_interval_secs: 5,
            settings_path: Some(PathBuf::from("bike-help-settings.json")),
            seed_path: None,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, AppError> {
        let _ = dotenvy::dotenv();

        let defaults = Self::default();

        Ok(Self {
            http_port: parse_or_default("HTTP_PORT", defaults.http_port)?,
            log_level: env::var("LOG_LEVEL").unwrap_or(defaults.log_level),
            fix_queue_size: parse_or_default("FIX_QUEUE_SIZE", defaults.fix_queue_size)?,
            event_buffer_size: parse_or_default("EVENT_BUFFER_SIZE", defaults.event_buffer_size)?,
            nearby_radius_m: parse_or_default("NEARBY_RADIUS_M", defaults.nearby_radius_m)?,
            fix_interval_secs: parse_or_default("FIX_INTERVAL_SECS", defaults.fix_interval_secs)?,
            min_fix_interval_secs: parse_or_default(
                "MIN_FIX_INTERVAL_SECS",
                defaults.min_fix_interval_secs,
            )?,
            settings_path: env::var("SETTINGS_PATH")
                .map(PathBuf::from)
                .ok()
                .or(defaults.settings_path),
            seed_path: env::var("SEED_PATH").ok().map(PathBuf::from),
        })
    }
}

fn parse_or_default<T>(key: &str, default: T) -> Result<T, AppError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw
            .parse::<T>()
            .map_err(|err| AppError::Internal(format!("invalid {key}: {err}"))),
        Err(_) => Ok(default),
    }
}
