// kotori-core/src/config.rs

use std::env;
use std::fmt::Display;
use std::str::FromStr;
use std::time::Duration;

use chrono::Duration as ChronoDuration;

use crate::Error;
use crate::history::HistoryConfig;
use crate::intervention::decider::InterventionMode;

/// Everything the intervention core needs, sourced from the environment with
/// defaults. Malformed integers fail startup; an unknown mode string does not
/// (it falls back to balanced, matching the decision pipeline's behavior).
#[derive(Debug, Clone)]
pub struct CoreConfig {
    pub mode: InterventionMode,
    pub cooldown_seconds: u64,
    pub trigger_keywords: Vec<String>,
    pub history: HistoryConfig,
    pub sweep_interval: Duration,
    pub ai_timeout: Duration,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            mode: InterventionMode::Balanced,
            cooldown_seconds: 300,
            trigger_keywords: Vec::new(),
            history: HistoryConfig::default(),
            sweep_interval: Duration::from_secs(3600),
            ai_timeout: Duration::from_secs(30),
        }
    }
}

fn env_parse<T>(key: &str, default: T) -> Result<T, Error>
where
    T: FromStr,
    T::Err: Display,
{
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|e| Error::Config(format!("{key}: {e}"))),
        Err(_) => Ok(default),
    }
}

impl CoreConfig {
    pub fn from_env() -> Result<Self, Error> {
        let defaults = Self::default();

        let mode = env::var("KOTORI_INTERVENTION_MODE")
            .map(|raw| InterventionMode::parse(&raw))
            .unwrap_or(defaults.mode);

        let cooldown_seconds = env_parse("KOTORI_COOLDOWN_SECONDS", defaults.cooldown_seconds)?;

        let trigger_keywords = env::var("KOTORI_TRIGGER_KEYWORDS")
            .map(|raw| parse_keyword_list(&raw))
            .unwrap_or_default();

        let cap: usize = env_parse("KOTORI_HISTORY_CAP", defaults.history.max_entries_per_channel)?;
        let ttl_minutes: i64 = env_parse(
            "KOTORI_MESSAGE_TTL_MINUTES",
            defaults.history.max_entry_age.num_minutes(),
        )?;
        let max_channels: usize = env_parse("KOTORI_MAX_CHANNELS", defaults.history.max_channels)?;
        let idle_hours: i64 = env_parse(
            "KOTORI_CHANNEL_IDLE_HOURS",
            defaults.history.channel_idle_cutoff.num_hours(),
        )?;

        if cap == 0 {
            return Err(Error::Config("KOTORI_HISTORY_CAP must be at least 1".into()));
        }
        if max_channels == 0 {
            return Err(Error::Config("KOTORI_MAX_CHANNELS must be at least 1".into()));
        }
        if ttl_minutes <= 0 {
            return Err(Error::Config("KOTORI_MESSAGE_TTL_MINUTES must be positive".into()));
        }
        if idle_hours <= 0 {
            return Err(Error::Config("KOTORI_CHANNEL_IDLE_HOURS must be positive".into()));
        }

        let sweep_secs: u64 = env_parse(
            "KOTORI_SWEEP_INTERVAL_SECONDS",
            defaults.sweep_interval.as_secs(),
        )?;
        let ai_timeout_secs: u64 =
            env_parse("KOTORI_AI_TIMEOUT_SECONDS", defaults.ai_timeout.as_secs())?;

        Ok(Self {
            mode,
            cooldown_seconds,
            trigger_keywords,
            history: HistoryConfig {
                max_entries_per_channel: cap,
                max_entry_age: ChronoDuration::minutes(ttl_minutes),
                max_channels,
                channel_idle_cutoff: ChronoDuration::hours(idle_hours),
            },
            sweep_interval: Duration::from_secs(sweep_secs),
            ai_timeout: Duration::from_secs(ai_timeout_secs),
        })
    }

    pub fn cooldown(&self) -> ChronoDuration {
        ChronoDuration::seconds(self.cooldown_seconds as i64)
    }
}

fn parse_keyword_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|k| k.trim().to_string())
        .filter(|k| !k.is_empty())
        .collect()
}
