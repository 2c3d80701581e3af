use std::sync::Arc;

use tracing::{error, info};
use uuid::Uuid;

use kotori_ai::{AiClient, ChatMessage};

use crate::Error;
use crate::clock::Clock;
use crate::history::{HistoryEntry, HistoryStore};
use crate::intervention::state::InterventionState;
use crate::services::message_service::PromptLine;

const DEFAULT_PERSONA: &str = "You are Kotori, a friendly regular in this Discord server. \
You keep replies short, casual and on-topic, and you never mention being a bot unless asked.";

const INTERVENTION_NOTE: &str = "Nobody addressed you directly. You are chiming into an ongoing \
conversation on your own, so keep it light: one or two sentences reacting to what was just said.";

/// Builds the prompt for a reply and dispatches it to the AI backend.
///
/// Cooldown stays tied to interventions the users actually saw: the decider
/// marks the channel optimistically, and a failed AI call rolls that mark
/// back so the attempt does not burn the cooldown.
pub struct ResponseService {
    ai: AiClient,
    history: Arc<HistoryStore>,
    state: Arc<InterventionState>,
    clock: Arc<dyn Clock>,
    persona: String,
    bot_name: String,
}

impl ResponseService {
    pub fn new(
        ai: AiClient,
        history: Arc<HistoryStore>,
        state: Arc<InterventionState>,
        clock: Arc<dyn Clock>,
        bot_name: impl Into<String>,
        persona: Option<String>,
    ) -> Self {
        Self {
            ai,
            history,
            state,
            clock,
            persona: persona.unwrap_or_else(|| DEFAULT_PERSONA.to_string()),
            bot_name: bot_name.into(),
        }
    }

    /// Produce an unprompted interjection for `channel_id` from the decided
    /// prompt context (chronological, trigger message last).
    pub async fn intervene(
        &self,
        channel_id: &str,
        prompt_context: &[PromptLine],
    ) -> Result<String, Error> {
        let messages = self.build_messages(prompt_context, true);

        match self.ai.chat(messages).await {
            Ok(reply) => {
                info!("Intervening in '{channel_id}' via {}", self.ai.provider_name());
                self.record_reply(channel_id, &reply);
                Ok(reply)
            }
            Err(e) => {
                error!("AI call failed for intervention in '{channel_id}': {e:#}");
                // Failed attempt never reached the users; give the cooldown back.
                self.state.reset_cooldown(channel_id);
                Err(Error::Ai(e.to_string()))
            }
        }
    }

    /// Reply to a direct address (mention or DM). No intervention state is
    /// involved either way.
    pub async fn reply_direct(
        &self,
        channel_id: &str,
        prompt_context: &[PromptLine],
    ) -> Result<String, Error> {
        let messages = self.build_messages(prompt_context, false);

        match self.ai.chat(messages).await {
            Ok(reply) => {
                self.record_direct_reply(channel_id, &reply);
                Ok(reply)
            }
            Err(e) => {
                error!("AI call failed for direct reply in '{channel_id}': {e:#}");
                Err(Error::Ai(e.to_string()))
            }
        }
    }

    fn build_messages(&self, prompt_context: &[PromptLine], intervention: bool) -> Vec<ChatMessage> {
        let mut system = self.persona.clone();
        if intervention {
            system.push('\n');
            system.push_str(INTERVENTION_NOTE);
        }

        let transcript = prompt_context
            .iter()
            .map(|line| format!("{}: {}", line.author, line.text))
            .collect::<Vec<_>>()
            .join("\n");

        vec![
            ChatMessage::system(system),
            ChatMessage::user(format!("Recent channel messages:\n{transcript}")),
        ]
    }

    fn record_reply(&self, channel_id: &str, reply: &str) {
        let now = self.clock.now();
        self.append_bot_entry(channel_id, reply, now);
        // Refresh the mark to the moment the reply actually existed.
        self.state.mark_intervened(channel_id, now);
    }

    fn record_direct_reply(&self, channel_id: &str, reply: &str) {
        let now = self.clock.now();
        self.append_bot_entry(channel_id, reply, now);
    }

    fn append_bot_entry(&self, channel_id: &str, reply: &str, now: chrono::DateTime<chrono::Utc>) {
        self.history.append(
            channel_id,
            HistoryEntry {
                message_id: Uuid::new_v4().to_string(),
                author_id: self.bot_name.clone(),
                author_name: self.bot_name.clone(),
                text: reply.to_string(),
                is_bot: true,
                timestamp: now,
            },
            now,
        );
    }
}
