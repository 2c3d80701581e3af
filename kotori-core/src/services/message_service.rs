use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use parking_lot::RwLock;
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::debug;

use crate::clock::Clock;
use crate::history::{HistoryEntry, HistoryStore};
use crate::intervention::decider::{InterventionDecider, InterventionMode};
use crate::intervention::scorer::{self, ScoreBreakdown};

/// How many history entries feed the scorer and the intervention prompt.
const CONTEXT_LIMIT: usize = 10;

/// An inbound chat message as the platform layer hands it to the core.
#[derive(Debug, Clone)]
pub struct IncomingMessage {
    pub channel_id: String,
    pub message_id: String,
    pub author_id: String,
    pub author_name: String,
    pub text: String,
    pub is_bot: bool,
    /// Mentioned the bot, or arrived in a DM. Direct addresses get a reply
    /// through the normal path and never go through the intervention roll.
    pub is_direct: bool,
    pub timestamp: DateTime<Utc>,
}

/// One line of prompt context handed to the response orchestrator.
#[derive(Debug, Clone)]
pub struct PromptLine {
    pub author: String,
    pub text: String,
}

/// Outcome of feeding one message through the pipeline.
#[derive(Debug, Clone)]
pub struct Decision {
    pub intervene: bool,
    /// Present whenever the scorer ran (not for bot/direct/invalid input).
    pub breakdown: Option<ScoreBreakdown>,
    /// Chronological context including the triggering message, only
    /// populated on a positive decision.
    pub prompt_context: Vec<PromptLine>,
}

impl Decision {
    fn skip() -> Self {
        Self {
            intervene: false,
            breakdown: None,
            prompt_context: Vec::new(),
        }
    }
}

/// Live counters and settings for the status command / HTTP status route.
#[derive(Debug, Clone, Serialize)]
pub struct StatusSnapshot {
    pub mode: String,
    pub cooldown_seconds: u64,
    pub trigger_keywords: Vec<String>,
    pub active_channels: usize,
    pub stored_messages: usize,
}

/// Ingests chat messages: appends them to history and runs the
/// score/decide sequence for messages eligible for an unprompted reply.
///
/// The append/score/decide/mark sequence is serialized per channel by a
/// per-key mutex so concurrent handler invocations cannot lose cooldown
/// updates or interleave evictions. The AI call happens elsewhere, after
/// the guard is released.
pub struct MessageService {
    history: Arc<HistoryStore>,
    decider: InterventionDecider,
    mode: RwLock<InterventionMode>,
    cooldown_seconds: u64,
    trigger_keywords: Vec<String>,
    clock: Arc<dyn Clock>,
    channel_guards: DashMap<String, Arc<Mutex<()>>>,
}

impl MessageService {
    pub fn new(
        history: Arc<HistoryStore>,
        decider: InterventionDecider,
        mode: InterventionMode,
        cooldown_seconds: u64,
        trigger_keywords: Vec<String>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            history,
            decider,
            mode: RwLock::new(mode),
            cooldown_seconds,
            trigger_keywords,
            clock,
            channel_guards: DashMap::new(),
        }
    }

    pub fn history(&self) -> &Arc<HistoryStore> {
        &self.history
    }

    pub fn mode(&self) -> InterventionMode {
        *self.mode.read()
    }

    /// Change the live intervention mode (admin command).
    pub fn set_mode(&self, mode: InterventionMode) {
        *self.mode.write() = mode;
    }

    /// Feed one message through the pipeline. Invalid input (missing ids) is
    /// a no-op decision, never an error; the bot staying quiet beats the bot
    /// crashing.
    pub async fn handle_message(&self, msg: IncomingMessage) -> Decision {
        if msg.channel_id.is_empty() || msg.message_id.is_empty() {
            debug!("handle_message: dropping message with missing ids");
            return Decision::skip();
        }

        let guard = self.guard_for(&msg.channel_id);
        let _held = guard.lock().await;

        let now = self.clock.now();

        // Context is captured before the candidate lands so the scorer sees
        // "the previous entry" as the one the gap rule expects.
        let context = self.history.recent(&msg.channel_id, CONTEXT_LIMIT, now);

        let entry = HistoryEntry {
            message_id: msg.message_id.clone(),
            author_id: msg.author_id.clone(),
            author_name: msg.author_name.clone(),
            text: msg.text.clone(),
            is_bot: msg.is_bot,
            timestamp: msg.timestamp,
        };
        self.history.append(&msg.channel_id, entry.clone(), now);

        if msg.is_bot || msg.is_direct {
            return Decision::skip();
        }

        let breakdown = scorer::score(&entry, &context, &self.trigger_keywords);
        let mode = self.mode();
        let intervene = self
            .decider
            .decide(&msg.channel_id, breakdown.score, mode, now);

        let prompt_context = if intervene {
            context
                .iter()
                .chain(std::iter::once(&entry))
                .map(|e| PromptLine {
                    author: e.author_name.clone(),
                    text: e.text.clone(),
                })
                .collect()
        } else {
            Vec::new()
        };

        Decision {
            intervene,
            breakdown: Some(breakdown),
            prompt_context,
        }
    }

    /// Clear a channel's history and cooldown. Returns whether any history
    /// existed.
    pub fn reset_channel(&self, channel_id: &str) -> bool {
        let removed = self.history.clear(channel_id);
        self.decider.state().reset_cooldown(channel_id);
        self.channel_guards.remove(channel_id);
        removed
    }

    pub fn status(&self) -> StatusSnapshot {
        StatusSnapshot {
            mode: self.mode().as_str().to_string(),
            cooldown_seconds: self.cooldown_seconds,
            trigger_keywords: self.trigger_keywords.clone(),
            active_channels: self.history.channel_count(),
            stored_messages: self.history.message_count(),
        }
    }

    /// Periodic cleanup pass; also drops guards for channels the history
    /// store no longer tracks.
    pub fn sweep(&self, now: DateTime<Utc>) -> usize {
        let removed = self.history.sweep(now);
        self.channel_guards
            .retain(|key, _| !self.history.recent(key, 1, now).is_empty());
        removed
    }

    fn guard_for(&self, channel_id: &str) -> Arc<Mutex<()>> {
        self.channel_guards
            .entry(channel_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }
}
