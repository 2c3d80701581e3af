//! Twilight gateway plumbing: shard runners feed inbound messages over an
//! unbounded mpsc channel to the handler loop in `main`.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel};
use tokio::task::JoinHandle;
use tracing::{error, info, trace, warn};

use twilight_gateway::{
    self as gateway, Config, Event, EventTypeFlags, Intents, Shard, StreamExt as _,
};
use twilight_http::Client as HttpClient;
use twilight_http::client::ClientBuilder;
use twilight_model::gateway::payload::incoming::MessageCreate;
use twilight_model::id::Id;
use twilight_model::id::marker::{ChannelMarker, UserMarker};

use kotori_core::Error;

#[derive(Debug, Clone)]
pub struct DiscordMessageEvent {
    pub channel_id: String,
    pub message_id: String,
    pub author_id: String,
    pub author_name: String,
    pub author_is_bot: bool,
    pub mentions_bot: bool,
    pub is_dm: bool,
    pub text: String,
    pub timestamp: DateTime<Utc>,
}

pub struct DiscordGateway {
    pub http: Arc<HttpClient>,
    pub bot_name: String,
    rx: UnboundedReceiver<DiscordMessageEvent>,
    _shard_tasks: Vec<JoinHandle<()>>,
}

impl DiscordGateway {
    /// Identify against the REST API, start the recommended shard set, and
    /// return a handle the main loop can pull inbound messages from.
    pub async fn connect(token: &str) -> Result<Self, Error> {
        if token.is_empty() {
            return Err(Error::Config("Discord token is empty".into()));
        }

        let http = Arc::new(
            ClientBuilder::new()
                .token(token.to_string())
                .timeout(Duration::from_secs(30))
                .build(),
        );

        let me = http
            .current_user()
            .await
            .map_err(|e| Error::Platform(format!("current_user request failed: {e}")))?
            .model()
            .await
            .map_err(|e| Error::Platform(format!("current_user parse failed: {e}")))?;
        let bot_user_id = me.id;
        let bot_name = me.name.clone();
        info!("Connected to Discord as {} (ID={})", bot_name, bot_user_id);

        let config = Config::new(
            token.to_string(),
            Intents::GUILDS
                | Intents::GUILD_MESSAGES
                | Intents::DIRECT_MESSAGES
                | Intents::MESSAGE_CONTENT,
        );

        let shards = gateway::create_recommended(&http, config, |_, b| b.build())
            .await
            .map_err(|e| Error::Platform(format!("create_recommended error: {e}")))?;

        let (tx, rx) = unbounded_channel::<DiscordMessageEvent>();
        let mut shard_tasks = Vec::new();

        for shard in shards {
            let tx_for_shard = tx.clone();
            let handle = tokio::spawn(async move {
                shard_runner(shard, tx_for_shard, bot_user_id).await;
            });
            shard_tasks.push(handle);
        }

        Ok(Self {
            http,
            bot_name,
            rx,
            _shard_tasks: shard_tasks,
        })
    }

    pub async fn next_message_event(&mut self) -> Option<DiscordMessageEvent> {
        self.rx.recv().await
    }
}

async fn shard_runner(
    mut shard: Shard,
    tx: UnboundedSender<DiscordMessageEvent>,
    bot_user_id: Id<UserMarker>,
) {
    let shard_id = shard.id().number();
    info!("(ShardRunner) Shard {shard_id} started. Listening for events.");

    while let Some(item) = shard.next_event(EventTypeFlags::all()).await {
        match item {
            Ok(Event::Ready(ready)) => {
                info!("Shard {shard_id} => READY as {}", ready.user.name);
            }
            Ok(Event::MessageCreate(msg_create)) => {
                let msg: &MessageCreate = &msg_create;

                // Our own replies are written to history at send time.
                if msg.author.id == bot_user_id {
                    continue;
                }

                let mentions_bot = msg.mentions.iter().any(|m| m.id == bot_user_id);
                let timestamp = DateTime::from_timestamp_micros(msg.timestamp.as_micros())
                    .unwrap_or_else(Utc::now);

                let _ = tx.send(DiscordMessageEvent {
                    channel_id: msg.channel_id.to_string(),
                    message_id: msg.id.to_string(),
                    author_id: msg.author.id.to_string(),
                    author_name: msg.author.name.clone(),
                    author_is_bot: msg.author.bot,
                    mentions_bot,
                    is_dm: msg.guild_id.is_none(),
                    text: msg.content.clone(),
                    timestamp,
                });
            }
            Ok(event) => {
                trace!("Shard {shard_id} => unhandled event: {event:?}");
            }
            Err(err) => {
                error!("Shard {shard_id} => error receiving event: {err:?}");
            }
        }
    }

    warn!("(ShardRunner) Shard {shard_id} event loop ended.");
}

pub async fn send_message(http: &HttpClient, channel_id: &str, content: &str) -> Result<(), Error> {
    let channel_id_u64: u64 = channel_id
        .parse()
        .map_err(|_| Error::Platform(format!("Invalid channel ID: {channel_id}")))?;
    let channel_id = Id::<ChannelMarker>::new(channel_id_u64);

    http.create_message(channel_id)
        .content(content)
        .await
        .map_err(|e| Error::Platform(format!("Error sending Discord message: {e:?}")))?;

    Ok(())
}
