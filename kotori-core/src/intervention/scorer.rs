//! Heuristic "should the bot speak" scoring.
//!
//! Additive weighted signals, each rule evaluated independently, summed and
//! clamped to [0, 100]. The weights are tunable policy constants; this is not
//! a classifier and tolerates false positives by design.

use std::collections::HashSet;

use chrono::Duration;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::history::HistoryEntry;

pub const KEYWORD_POINTS: i32 = 70;
pub const QUESTION_POINTS: i32 = 40;
pub const ACTIVE_CONVERSATION_POINTS: i32 = 15;
pub const MULTI_USER_POINTS: i32 = 20;
pub const CONVERSATIONAL_GAP_POINTS: i32 = 10;
pub const SHORT_MESSAGE_PENALTY: i32 = -30;
pub const LONG_MESSAGE_POINTS: i32 = 20;

/// History must be at least this long before activity signals apply.
const ACTIVE_CONVERSATION_MIN_LEN: usize = 3;
/// Seconds of silence before the candidate that count as a lull worth filling.
const CONVERSATIONAL_GAP_SECONDS: i64 = 60;

const SHORT_MESSAGE_CHARS: usize = 5;
const LONG_MESSAGE_CHARS: usize = 100;

static INTERROGATIVE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(who|what|where|when|why|how)\b").expect("static interrogative pattern")
});

// The bot started life in Japanese guilds; question particles matter as much
// as question marks there.
const JA_INTERROGATIVES: &[&str] = &["誰", "何", "どこ", "いつ", "なぜ", "どうして", "ですか", "かな"];

/// A named signal that contributed to the score.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    KeywordMatch,
    QuestionForm,
    ActiveConversation,
    MultiUser,
    ConversationalGap,
    ShortMessage,
    LongMessage,
}

/// Score plus the signals that fired. Ephemeral; never persisted.
#[derive(Debug, Clone)]
pub struct ScoreBreakdown {
    pub score: u8,
    pub signals: Vec<Signal>,
}

impl ScoreBreakdown {
    pub fn fired(&self, signal: Signal) -> bool {
        self.signals.contains(&signal)
    }
}

/// Score a candidate message against the channel's recent history.
///
/// `history` holds the entries that preceded the candidate, oldest first; the
/// candidate itself must not be in it. Pure and deterministic; the random
/// dampening lives in the decider.
pub fn score(candidate: &HistoryEntry, history: &[HistoryEntry], keywords: &[String]) -> ScoreBreakdown {
    let mut total: i32 = 0;
    let mut signals = Vec::new();

    let lowered = candidate.text.to_lowercase();
    if keywords
        .iter()
        .any(|k| !k.is_empty() && lowered.contains(&k.to_lowercase()))
    {
        total += KEYWORD_POINTS;
        signals.push(Signal::KeywordMatch);
    }

    if is_question(&candidate.text) {
        total += QUESTION_POINTS;
        signals.push(Signal::QuestionForm);
    }

    if history.len() >= ACTIVE_CONVERSATION_MIN_LEN {
        total += ACTIVE_CONVERSATION_POINTS;
        signals.push(Signal::ActiveConversation);

        let authors: HashSet<&str> = history.iter().map(|e| e.author_id.as_str()).collect();
        if authors.len() >= 2 {
            total += MULTI_USER_POINTS;
            signals.push(Signal::MultiUser);
        }

        if let Some(previous) = history.last() {
            if candidate.timestamp - previous.timestamp
                > Duration::seconds(CONVERSATIONAL_GAP_SECONDS)
            {
                total += CONVERSATIONAL_GAP_POINTS;
                signals.push(Signal::ConversationalGap);
            }
        }
    }

    let chars = candidate.text.chars().count();
    if chars < SHORT_MESSAGE_CHARS {
        total += SHORT_MESSAGE_PENALTY;
        signals.push(Signal::ShortMessage);
    } else if chars > LONG_MESSAGE_CHARS {
        total += LONG_MESSAGE_POINTS;
        signals.push(Signal::LongMessage);
    }

    ScoreBreakdown {
        score: total.clamp(0, 100) as u8,
        signals,
    }
}

fn is_question(text: &str) -> bool {
    if text.contains('?') || text.contains('？') {
        return true;
    }
    if INTERROGATIVE.is_match(text) {
        return true;
    }
    JA_INTERROGATIVES.iter().any(|w| text.contains(w))
}
