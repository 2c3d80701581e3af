//! Prefix command dispatch. Anything that is not a known command falls
//! through to the normal message pipeline.

use kotori_core::intervention::InterventionMode;
use kotori_core::services::MessageService;

const PREFIX: &str = "!";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Mode(String),
    Reset,
    Status,
}

pub fn parse(text: &str) -> Option<Command> {
    let body = text.strip_prefix(PREFIX)?;
    let mut parts = body.split_whitespace();
    match parts.next()? {
        "mode" => Some(Command::Mode(parts.next().unwrap_or("").to_string())),
        "reset" => Some(Command::Reset),
        "status" => Some(Command::Status),
        _ => None,
    }
}

pub fn run(cmd: Command, service: &MessageService, channel_id: &str) -> String {
    match cmd {
        Command::Mode(raw) => {
            if raw.is_empty() {
                return format!("Current mode: {}", service.mode().as_str());
            }
            let mode = InterventionMode::parse(&raw);
            service.set_mode(mode);
            format!("Intervention mode set to {}", mode.as_str())
        }
        Command::Reset => {
            let removed = service.reset_channel(channel_id);
            if removed {
                "Channel history and cooldown cleared.".to_string()
            } else {
                "Nothing to clear, but the cooldown is reset.".to_string()
            }
        }
        Command::Status => {
            let s = service.status();
            format!(
                "mode={} cooldown={}s keywords=[{}] channels={} messages={}",
                s.mode,
                s.cooldown_seconds,
                s.trigger_keywords.join(", "),
                s.active_channels,
                s.stored_messages
            )
        }
    }
}
