use std::env;
use std::net::SocketAddr;
use std::sync::Arc;

use clap::Parser;
use dotenv::dotenv;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, fmt};

use kotori_ai::{AiClient, ProviderConfig, provider_from_config};
use kotori_core::clock::SystemClock;
use kotori_core::history::HistoryStore;
use kotori_core::intervention::{InterventionDecider, InterventionState, ThreadRoll};
use kotori_core::services::{IncomingMessage, MessageService, PromptLine, ResponseService};
use kotori_core::tasks::history_maintenance::spawn_history_sweep_task;
use kotori_core::{Clock, CoreConfig, Error};

mod commands;
mod discord;
mod http;

use discord::{DiscordGateway, DiscordMessageEvent};

#[derive(Parser, Debug, Clone)]
#[command(name = "kotori")]
#[command(author, version, about = "Kotori - a Discord bot that knows when to butt in")]
struct Args {
    /// Address for the health/status HTTP server
    #[arg(long, default_value = "127.0.0.1:8080")]
    http_addr: String,

    /// Optional .env file to load before reading configuration
    #[arg(long)]
    env_file: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    let args = Args::parse();

    match &args.env_file {
        Some(path) => {
            dotenv::from_filename(path)
                .map_err(|e| Error::Config(format!("env file '{path}': {e}")))?;
        }
        None => {
            dotenv().ok();
        }
    }

    fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = CoreConfig::from_env()?;
    let token = env::var("DISCORD_TOKEN")
        .map_err(|_| Error::Config("DISCORD_TOKEN must be set".into()))?;

    let http_addr: SocketAddr = env::var("KOTORI_HTTP_ADDR")
        .unwrap_or_else(|_| args.http_addr.clone())
        .parse()
        .map_err(|e| Error::Config(format!("http addr: {e}")))?;

    let provider_config = provider_config_from_env()?;
    let provider = provider_from_config(&provider_config)?;
    let ai = AiClient::new(provider, config.ai_timeout);
    info!(
        "AI backend: {} (model {})",
        provider_config.provider_type, provider_config.default_model
    );

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let history = Arc::new(HistoryStore::new(config.history.clone()));
    let state = Arc::new(InterventionState::new());
    let decider = InterventionDecider::new(state.clone(), config.cooldown(), Arc::new(ThreadRoll));

    let service = Arc::new(MessageService::new(
        history.clone(),
        decider,
        config.mode,
        config.cooldown_seconds,
        config.trigger_keywords.clone(),
        clock.clone(),
    ));

    let mut gateway = DiscordGateway::connect(&token).await?;

    let responder = Arc::new(ResponseService::new(
        ai,
        history,
        state,
        clock.clone(),
        gateway.bot_name.clone(),
        env::var("KOTORI_PERSONA").ok(),
    ));

    let _sweep_task = spawn_history_sweep_task(service.clone(), clock, config.sweep_interval);

    let http_state = http::AppState {
        service: service.clone(),
    };
    tokio::spawn(async move {
        if let Err(e) = http::serve(http_addr, http_state).await {
            error!("Status server exited: {e}");
        }
    });

    info!(
        "Kotori running: mode={}, cooldown={}s, {} keyword(s)",
        config.mode.as_str(),
        config.cooldown_seconds,
        config.trigger_keywords.len()
    );

    // One task per inbound message; per-channel ordering is enforced inside
    // the MessageService, not here.
    while let Some(event) = gateway.next_message_event().await {
        let service = service.clone();
        let responder = responder.clone();
        let http = gateway.http.clone();
        tokio::spawn(async move {
            if let Err(e) = handle_event(event, service, responder, http).await {
                error!("Message handling failed: {e}");
            }
        });
    }

    warn!("Gateway stream ended; shutting down");
    Ok(())
}

async fn handle_event(
    event: DiscordMessageEvent,
    service: Arc<MessageService>,
    responder: Arc<ResponseService>,
    http: Arc<twilight_http::Client>,
) -> Result<(), Error> {
    if !event.author_is_bot {
        if let Some(cmd) = commands::parse(&event.text) {
            let reply = commands::run(cmd, &service, &event.channel_id);
            return discord::send_message(&http, &event.channel_id, &reply).await;
        }
    }

    let is_direct = event.mentions_bot || event.is_dm;
    let decision = service
        .handle_message(IncomingMessage {
            channel_id: event.channel_id.clone(),
            message_id: event.message_id,
            author_id: event.author_id,
            author_name: event.author_name,
            text: event.text,
            is_bot: event.author_is_bot,
            is_direct,
            timestamp: event.timestamp,
        })
        .await;

    if decision.intervene {
        match responder
            .intervene(&event.channel_id, &decision.prompt_context)
            .await
        {
            Ok(reply) => discord::send_message(&http, &event.channel_id, &reply).await?,
            Err(e) => warn!("Dropped intervention in '{}': {e}", event.channel_id),
        }
    } else if is_direct && !event.author_is_bot {
        let context: Vec<PromptLine> = service
            .history()
            .recent(&event.channel_id, 10, chrono::Utc::now())
            .iter()
            .map(|e| PromptLine {
                author: e.author_name.clone(),
                text: e.text.clone(),
            })
            .collect();

        match responder.reply_direct(&event.channel_id, &context).await {
            Ok(reply) => discord::send_message(&http, &event.channel_id, &reply).await?,
            Err(e) => warn!("Dropped direct reply in '{}': {e}", event.channel_id),
        }
    }

    Ok(())
}

fn provider_config_from_env() -> Result<ProviderConfig, Error> {
    let provider_type = env::var("KOTORI_PROVIDER").unwrap_or_else(|_| "openai".to_string());

    let (key_var, default_model) = match provider_type.to_ascii_lowercase().as_str() {
        "gemini" => ("GEMINI_API_KEY", "gemini-1.5-flash"),
        _ => ("OPENAI_API_KEY", "gpt-4o-mini"),
    };

    let api_key =
        env::var(key_var).map_err(|_| Error::Config(format!("{key_var} must be set")))?;
    let model = env::var("KOTORI_MODEL").unwrap_or_else(|_| default_model.to_string());

    Ok(ProviderConfig::new(provider_type, api_key, model))
}
