//! Configuration types.

use std::path::PathBuf;
use std::time::Duration;

use crate::error::ConfigError;
use crate::flow::state::Timer;

/// Timing and logging configuration for the session flow.
#[derive(Debug, Clone)]
pub struct FlowConfig {
    /// Pause between a screen change and the assistant starting to type.
    pub presentation_delay: Duration,
    /// How long the assistant "types" before a reply lands.
    pub typing_delay: Duration,
    /// Pause between the closing line and the loading screen.
    pub handoff_delay: Duration,
    /// How long the rating confirmation stays up before returning home.
    pub rating_reset_delay: Duration,
    /// Simulated latency of the stub content generator.
    pub generation_delay: Duration,
    /// Upper bound on a single generation call.
    pub generation_timeout: Duration,
    /// Write logs to `orpheus.log` in this directory instead of stderr.
    pub log_dir: Option<PathBuf>,
}

impl Default for FlowConfig {
    fn default() -> Self {
        Self {
            presentation_delay: Duration::from_millis(500),
            typing_delay: Duration::from_millis(1500),
            handoff_delay: Duration::from_millis(2000),
            rating_reset_delay: Duration::from_millis(1500),
            generation_delay: Duration::from_millis(3000),
            generation_timeout: Duration::from_secs(30),
            log_dir: None,
        }
    }
}

impl FlowConfig {
    /// Build configuration from `ORPHEUS_*` environment variables, falling
    /// back to defaults for anything unset.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let millis = |key: &str, default: Duration| -> Result<Duration, ConfigError> {
            match lookup(key) {
                Some(raw) => parse_u64(key, &raw).map(Duration::from_millis),
                None => Ok(default),
            }
        };

        let generation_timeout = match lookup("ORPHEUS_GENERATION_TIMEOUT_SECS") {
            Some(raw) => Duration::from_secs(parse_u64("ORPHEUS_GENERATION_TIMEOUT_SECS", &raw)?),
            None => defaults.generation_timeout,
        };
        if generation_timeout.is_zero() {
            return Err(ConfigError::InvalidValue {
                key: "ORPHEUS_GENERATION_TIMEOUT_SECS".to_string(),
                message: "must be greater than zero".to_string(),
            });
        }

        Ok(Self {
            presentation_delay: millis("ORPHEUS_PRESENTATION_DELAY_MS", defaults.presentation_delay)?,
            typing_delay: millis("ORPHEUS_TYPING_DELAY_MS", defaults.typing_delay)?,
            handoff_delay: millis("ORPHEUS_HANDOFF_DELAY_MS", defaults.handoff_delay)?,
            rating_reset_delay: millis("ORPHEUS_RATING_RESET_DELAY_MS", defaults.rating_reset_delay)?,
            generation_delay: millis("ORPHEUS_GENERATION_DELAY_MS", defaults.generation_delay)?,
            generation_timeout,
            log_dir: lookup("ORPHEUS_LOG_DIR")
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .map(PathBuf::from),
        })
    }

    /// Delay before a scheduled timer fires.
    pub fn delay_for(&self, timer: Timer) -> Duration {
        match timer {
            Timer::AssistantTyping => self.presentation_delay,
            Timer::ReplyReady => self.typing_delay,
            Timer::Handoff => self.handoff_delay,
            Timer::RatingReset => self.rating_reset_delay,
        }
    }
}

fn parse_u64(key: &str, raw: &str) -> Result<u64, ConfigError> {
    raw.trim().parse().map_err(|e| ConfigError::InvalidValue {
        key: key.to_string(),
        message: format!("{raw:?} is not a whole number ({e})"),
    })
}
