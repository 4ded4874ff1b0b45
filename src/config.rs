use std::time::Duration;

use config::ConfigError;

use crate::alerts::AlertConfig;
use crate::pipeline::validate::ValidatorConfig;
use crate::store::supabase::SupabaseConfig;

#[derive(Debug, Clone)]
pub struct Config {
    pub xrpscan_api_url: String,
    pub xrpl_rpc_url: String,
    pub csv_output_path: String,
    /// When set, the pipeline reruns on this interval instead of exiting
    /// after one snapshot.
    pub run_interval: Option<Duration>,
    pub validator: ValidatorConfig,
    pub alerts: AlertConfig,
    /// Absent when no upload credentials are configured.
    pub supabase: Option<SupabaseConfig>,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = ValidatorConfig::default();
        let validator = ValidatorConfig {
            batch_size: parse_env("VALIDATOR_BATCH_SIZE", defaults.batch_size)?,
            max_retries: parse_env("VALIDATOR_MAX_RETRIES", defaults.max_retries)?,
            retry_delay: Duration::from_millis(parse_env(
                "VALIDATOR_RETRY_DELAY_MS",
                defaults.retry_delay.as_millis() as u64,
            )?),
            inter_batch_delay: Duration::from_millis(parse_env(
                "VALIDATOR_BATCH_PAUSE_MS",
                defaults.inter_batch_delay.as_millis() as u64,
            )?),
        };
        if validator.batch_size == 0 {
            return Err(ConfigError::Message(
                "VALIDATOR_BATCH_SIZE must be at least 1".to_string(),
            ));
        }

        let alert_defaults = AlertConfig::default();
        let alerts = AlertConfig {
            threshold_percent: parse_env(
                "ALERT_THRESHOLD_PERCENT",
                alert_defaults.threshold_percent,
            )?,
            threshold_xrp: parse_env("ALERT_THRESHOLD_XRP", alert_defaults.threshold_xrp)?,
            ..alert_defaults
        };

        let run_interval = match non_empty_var("RUN_INTERVAL_SECS") {
            Some(raw) => {
                let secs: u64 = raw
                    .trim()
                    .parse()
                    .map_err(|e| ConfigError::Message(format!("RUN_INTERVAL_SECS: {}", e)))?;
                Some(Duration::from_secs(secs))
            }
            None => None,
        };

        Ok(Self {
            xrpscan_api_url: env_or("XRPSCAN_API_URL", "https://api.xrpscan.com/api/v1"),
            xrpl_rpc_url: env_or("XRPL_RPC_URL", "https://s1.ripple.com:51234/"),
            csv_output_path: env_or("RICH_LIST_CSV_PATH", "rich_list.csv"),
            run_interval,
            validator,
            alerts,
            supabase: supabase_from_env()?,
        })
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn env_or(key: &str, default: &str) -> String {
    non_empty_var(key).unwrap_or_else(|| default.to_string())
}

fn parse_env<T>(key: &str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match non_empty_var(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| ConfigError::Message(format!("{}: {}", key, e))),
        None => Ok(default),
    }
}

/// The upload credentials come as a pair. Only one of them set is a
/// configuration mistake, not a disabled feature.
fn supabase_from_env() -> Result<Option<SupabaseConfig>, ConfigError> {
    let url = non_empty_var("SUPABASE_URL");
    let key = non_empty_var("SUPABASE_KEY");
    match (url, key) {
        (Some(url), Some(key)) => {
            let config = SupabaseConfig::new(url, key)
                .with_table(env_or("SUPABASE_TABLE", "xrpl_rich_list"));
            Ok(Some(config))
        }
        (None, None) => Ok(None),
        _ => Err(ConfigError::Message(
            "SUPABASE_URL and SUPABASE_KEY must be set together".to_string(),
        )),
    }
}
