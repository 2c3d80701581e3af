// File: kotori-core/tests/service_tests.rs

use std::sync::Arc;
use std::time::Duration as StdDuration;

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use parking_lot::Mutex;

use kotori_ai::{AiClient, ChatMessage, ModelProvider};
use kotori_core::clock::Clock;
use kotori_core::history::{HistoryConfig, HistoryStore};
use kotori_core::intervention::{InterventionDecider, InterventionMode, InterventionState, RollSource};
use kotori_core::services::{IncomingMessage, MessageService, ResponseService};

/// Clock pinned to a settable instant.
struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    fn new(at: DateTime<Utc>) -> Self {
        Self { now: Mutex::new(at) }
    }

    fn set(&self, at: DateTime<Utc>) {
        *self.now.lock() = at;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock()
    }
}

/// Roll source returning a fixed value forever.
struct FixedRoll(f64);

impl RollSource for FixedRoll {
    fn roll(&self) -> f64 {
        self.0
    }
}

/// Provider that always succeeds or always fails.
struct ScriptedProvider {
    reply: Option<String>,
}

#[async_trait]
impl ModelProvider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn chat(&self, _messages: Vec<ChatMessage>) -> anyhow::Result<String> {
        match &self.reply {
            Some(text) => Ok(text.clone()),
            None => Err(anyhow::anyhow!("backend down")),
        }
    }
}

fn base_time() -> DateTime<Utc> {
    Utc.timestamp_opt(1_700_000_000, 0).unwrap()
}

fn message(channel: &str, id: &str, author: &str, text: &str, at: DateTime<Utc>) -> IncomingMessage {
    IncomingMessage {
        channel_id: channel.to_string(),
        message_id: id.to_string(),
        author_id: author.to_string(),
        author_name: author.to_string(),
        text: text.to_string(),
        is_bot: false,
        is_direct: false,
        timestamp: at,
    }
}

struct Fixture {
    service: MessageService,
    state: Arc<InterventionState>,
    history: Arc<HistoryStore>,
    clock: Arc<ManualClock>,
}

fn fixture(mode: InterventionMode, roll: f64, keywords: Vec<String>) -> Fixture {
    let history = Arc::new(HistoryStore::new(HistoryConfig::default()));
    let state = Arc::new(InterventionState::new());
    let clock = Arc::new(ManualClock::new(base_time()));
    let decider = InterventionDecider::new(
        state.clone(),
        Duration::seconds(300),
        Arc::new(FixedRoll(roll)),
    );
    let service = MessageService::new(
        history.clone(),
        decider,
        mode,
        300,
        keywords,
        clock.clone(),
    );
    Fixture {
        service,
        state,
        history,
        clock,
    }
}

#[tokio::test]
async fn keyword_question_with_guaranteed_roll_intervenes() {
    let f = fixture(InterventionMode::Balanced, 0.0, vec!["kotori".to_string()]);
    let t0 = base_time();

    let decision = f
        .service
        .handle_message(message("general", "m1", "alice", "hey kotori, what gives?", t0))
        .await;

    assert!(decision.intervene);
    let breakdown = decision.breakdown.expect("scorer ran");
    assert!(breakdown.score > 0);
    assert_eq!(f.state.last_intervention("general"), Some(t0));

    // Trigger message rides along as the last prompt line.
    assert_eq!(
        decision.prompt_context.last().map(|l| l.text.as_str()),
        Some("hey kotori, what gives?")
    );
}

#[tokio::test]
async fn bot_and_direct_messages_land_in_history_but_never_roll() {
    let f = fixture(InterventionMode::Aggressive, 0.0, vec!["kotori".to_string()]);
    let t0 = base_time();

    let mut from_bot = message("general", "m1", "kotori", "kotori speaking?", t0);
    from_bot.is_bot = true;
    let decision = f.service.handle_message(from_bot).await;
    assert!(!decision.intervene);
    assert!(decision.breakdown.is_none());

    let mut direct = message("general", "m2", "alice", "kotori, you there?", t0);
    direct.is_direct = true;
    let decision = f.service.handle_message(direct).await;
    assert!(!decision.intervene);

    assert_eq!(f.history.recent("general", 10, t0).len(), 2);
    assert_eq!(f.state.last_intervention("general"), None);
}

#[tokio::test]
async fn mode_none_short_circuits_everything() {
    let f = fixture(InterventionMode::None, 0.0, vec!["kotori".to_string()]);
    let decision = f
        .service
        .handle_message(message("general", "m1", "alice", "kotori??", base_time()))
        .await;
    assert!(!decision.intervene);
    assert_eq!(f.state.last_intervention("general"), None);
}

#[tokio::test]
async fn cooldown_blocks_until_reset_channel() {
    let f = fixture(InterventionMode::Balanced, 0.0, vec!["kotori".to_string()]);
    let t0 = base_time();

    let first = f
        .service
        .handle_message(message("general", "m1", "alice", "kotori help?", t0))
        .await;
    assert!(first.intervene);

    // Ten seconds later the channel is still cooling.
    let t1 = t0 + Duration::seconds(10);
    f.clock.set(t1);
    let second = f
        .service
        .handle_message(message("general", "m2", "alice", "kotori again?", t1))
        .await;
    assert!(!second.intervene);

    // Admin reset clears the cooldown; the very next decide may fire.
    assert!(f.service.reset_channel("general"));
    let third = f
        .service
        .handle_message(message("general", "m3", "alice", "kotori once more?", t1))
        .await;
    assert!(third.intervene);
}

#[tokio::test]
async fn invalid_input_is_a_silent_noop() {
    let f = fixture(InterventionMode::Balanced, 0.0, Vec::new());
    let t0 = base_time();

    let no_channel = f
        .service
        .handle_message(message("", "m1", "alice", "hello there?", t0))
        .await;
    assert!(!no_channel.intervene);
    assert!(no_channel.breakdown.is_none());

    let no_id = f
        .service
        .handle_message(message("general", "", "alice", "hello there?", t0))
        .await;
    assert!(!no_id.intervene);

    assert_eq!(f.history.channel_count(), 0);
}

#[tokio::test]
async fn live_mode_change_applies_to_next_message() {
    let f = fixture(InterventionMode::None, 0.0, vec!["kotori".to_string()]);
    let t0 = base_time();

    let quiet = f
        .service
        .handle_message(message("general", "m1", "alice", "kotori?", t0))
        .await;
    assert!(!quiet.intervene);

    f.service.set_mode(InterventionMode::Aggressive);
    assert_eq!(f.service.mode(), InterventionMode::Aggressive);

    let loud = f
        .service
        .handle_message(message("general", "m2", "alice", "kotori??", t0))
        .await;
    assert!(loud.intervene);
}

#[tokio::test]
async fn status_reports_live_counters() {
    let f = fixture(InterventionMode::Passive, 99.9, Vec::new());
    let t0 = base_time();

    f.service
        .handle_message(message("general", "m1", "alice", "first message", t0))
        .await;
    f.service
        .handle_message(message("random", "m2", "bob", "second message", t0))
        .await;

    let status = f.service.status();
    assert_eq!(status.mode, "passive");
    assert_eq!(status.cooldown_seconds, 300);
    assert_eq!(status.active_channels, 2);
    assert_eq!(status.stored_messages, 2);
}

#[tokio::test]
async fn failed_ai_call_rolls_back_the_cooldown_mark() {
    let f = fixture(InterventionMode::Balanced, 0.0, vec!["kotori".to_string()]);
    let t0 = base_time();

    let decision = f
        .service
        .handle_message(message("general", "m1", "alice", "kotori, thoughts?", t0))
        .await;
    assert!(decision.intervene);
    assert!(f.state.last_intervention("general").is_some());

    let ai = AiClient::new(
        Arc::new(ScriptedProvider { reply: None }),
        StdDuration::from_secs(5),
    );
    let responder = ResponseService::new(
        ai,
        f.history.clone(),
        f.state.clone(),
        f.clock.clone(),
        "kotori",
        None,
    );

    let err = responder
        .intervene("general", &decision.prompt_context)
        .await
        .unwrap_err();
    assert!(err.to_string().contains("backend down"));

    // The attempt never reached the channel; no cooldown is owed.
    assert_eq!(f.state.last_intervention("general"), None);
}

#[tokio::test]
async fn successful_intervention_records_the_bot_reply() {
    let f = fixture(InterventionMode::Balanced, 0.0, vec!["kotori".to_string()]);
    let t0 = base_time();

    let decision = f
        .service
        .handle_message(message("general", "m1", "alice", "kotori, thoughts?", t0))
        .await;
    assert!(decision.intervene);

    let ai = AiClient::new(
        Arc::new(ScriptedProvider {
            reply: Some("piyo!".to_string()),
        }),
        StdDuration::from_secs(5),
    );
    let responder = ResponseService::new(
        ai,
        f.history.clone(),
        f.state.clone(),
        f.clock.clone(),
        "kotori",
        None,
    );

    let reply = responder
        .intervene("general", &decision.prompt_context)
        .await
        .expect("scripted success");
    assert_eq!(reply, "piyo!");

    let recent = f.history.recent("general", 10, t0);
    assert_eq!(recent.len(), 2);
    let bot_entry = recent.last().unwrap();
    assert!(bot_entry.is_bot);
    assert_eq!(bot_entry.text, "piyo!");
    assert_eq!(f.state.last_intervention("general"), Some(t0));
}
