//! Turns a context score into a yes/no intervention decision.
//!
//! Two-stage dampening: the score is scaled by the configured mode's
//! probability, then compared against a fresh uniform draw. Even a maximal
//! score under "passive" only intervenes 20% of the time, and no mode can
//! force an intervention when the score is zero.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use tracing::debug;

use crate::intervention::state::InterventionState;

/// Named aggressiveness setting. Controls the probability multiplier applied
/// to the context score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InterventionMode {
    None,
    Passive,
    #[default]
    Balanced,
    Active,
    Aggressive,
}

impl InterventionMode {
    /// Parse a mode string. Unknown strings fall back to `Balanced`; a bad
    /// config value must not fail the decision pipeline.
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "none" => Self::None,
            "passive" => Self::Passive,
            "balanced" => Self::Balanced,
            "active" => Self::Active,
            "aggressive" => Self::Aggressive,
            _ => Self::Balanced,
        }
    }

    /// Probability percentage applied to the score.
    pub fn probability(self) -> u8 {
        match self {
            Self::None => 0,
            Self::Passive => 20,
            Self::Balanced => 50,
            Self::Active => 70,
            Self::Aggressive => 90,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Passive => "passive",
            Self::Balanced => "balanced",
            Self::Active => "active",
            Self::Aggressive => "aggressive",
        }
    }
}

/// Uniform draw in [0, 100). Injectable so tests can feed fixed sequences.
pub trait RollSource: Send + Sync {
    fn roll(&self) -> f64;
}

/// Production roll source backed by the thread-local generator.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadRoll;

impl RollSource for ThreadRoll {
    fn roll(&self) -> f64 {
        rand::rng().random_range(0.0..100.0)
    }
}

pub struct InterventionDecider {
    state: Arc<InterventionState>,
    cooldown: Duration,
    roll_source: Arc<dyn RollSource>,
}

impl InterventionDecider {
    pub fn new(
        state: Arc<InterventionState>,
        cooldown: Duration,
        roll_source: Arc<dyn RollSource>,
    ) -> Self {
        Self {
            state,
            cooldown,
            roll_source,
        }
    }

    pub fn state(&self) -> &Arc<InterventionState> {
        &self.state
    }

    /// Decide whether to intervene in `channel_id` given the context score.
    /// Marks the intervention timestamp when returning true.
    ///
    /// The cooldown check runs before the random draw; a cooling channel
    /// never consumes randomness.
    pub fn decide(
        &self,
        channel_id: &str,
        score: u8,
        mode: InterventionMode,
        now: DateTime<Utc>,
    ) -> bool {
        if mode == InterventionMode::None {
            return false;
        }
        if self.state.cooldown_active(channel_id, self.cooldown, now) {
            debug!("decide: '{channel_id}' still cooling down");
            return false;
        }

        let threshold = f64::from(score) * f64::from(mode.probability()) / 100.0;
        let roll = self.roll_source.roll();
        debug!(
            "decide: '{channel_id}' score={score} mode={} threshold={threshold:.1} roll={roll:.1}",
            mode.as_str()
        );

        if roll < threshold {
            self.state.mark_intervened(channel_id, now);
            true
        } else {
            false
        }
    }
}
