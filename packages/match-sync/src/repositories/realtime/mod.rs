pub mod message;
pub mod presence_state;

use std::time::Duration;

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot};
use tokio::time::{interval, timeout};
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};

use crate::config::BackendConfig;
use crate::models::presence::PresenceRecord;
use crate::repositories::errors::realtime_errors::RealtimeError;
use crate::repositories::realtime_repository::{
    ChangeFeed, ChannelHandle, PresenceFeed, RealtimeRepository, RecordChange,
};

use message::{
    postgres_changes_config, presence_config, PhoenixMessage, PRESENCE_DIFF, PRESENCE_STATE,
};
use presence_state::PresenceState;

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

const JOIN_REF: &str = "1";
const TRACK_REF: &str = "2";

/// Realtime transport over the Phoenix channel protocol. Each subscription
/// gets its own socket and background task; the task ends when its
/// [`ChannelHandle`] is closed or the socket drops.
pub struct PhoenixRealtimeRepository {
    endpoint: String,
    api_key: String,
    access_token: String,
    heartbeat_interval: Duration,
    join_timeout: Duration,
    feed_capacity: usize,
}

impl PhoenixRealtimeRepository {
    pub fn new(config: &BackendConfig) -> Self {
        Self {
            endpoint: config.realtime_endpoint(),
            api_key: config.anon_key.clone(),
            access_token: config.bearer_token().to_string(),
            heartbeat_interval: config.heartbeat_interval,
            join_timeout: config.join_timeout,
            feed_capacity: config.feed_capacity.max(1),
        }
    }

    fn socket_url(&self) -> String {
        format!(
            "{}/websocket?apikey={}&vsn=1.0.0",
            self.endpoint, self.api_key
        )
    }

    /// Connects and joins `topic`, returning the socket plus any frames that
    /// arrived ahead of the join reply.
    async fn attach(
        &self,
        topic: &str,
        config: serde_json::Value,
    ) -> Result<(Socket, Vec<PhoenixMessage>), RealtimeError> {
        let (mut socket, _) = timeout(self.join_timeout, connect_async(self.socket_url()))
            .await
            .map_err(|_| RealtimeError::Timeout)?
            .map_err(|e| RealtimeError::Connect(e.to_string()))?;

        let join = PhoenixMessage::join(topic, config, &self.access_token, JOIN_REF);
        send(&mut socket, &join).await?;

        let early = timeout(self.join_timeout, await_join_reply(&mut socket))
            .await
            .map_err(|_| RealtimeError::Timeout)??;

        info!("Attached to realtime channel {}", topic);
        Ok((socket, early))
    }

    async fn subscribe_changes(
        &self,
        topic: String,
        config: serde_json::Value,
    ) -> Result<ChangeFeed, RealtimeError> {
        let (socket, early) = self.attach(&topic, config).await?;
        let (sender, changes) = mpsc::channel(self.feed_capacity);
        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        tokio::spawn(run_channel(
            socket,
            topic.clone(),
            Router::Changes { sender },
            early,
            shutdown_rx,
            self.heartbeat_interval,
        ));

        Ok(ChangeFeed {
            changes,
            handle: ChannelHandle::new(&topic, shutdown_tx),
        })
    }
}

#[async_trait]
impl RealtimeRepository for PhoenixRealtimeRepository {
    async fn subscribe_match(&self, match_id: &str) -> Result<ChangeFeed, RealtimeError> {
        self.subscribe_changes(
            format!("realtime:match:{}", match_id),
            postgres_changes_config("UPDATE", Some(format!("id=eq.{}", match_id))),
        )
        .await
    }

    async fn subscribe_matches(&self) -> Result<ChangeFeed, RealtimeError> {
        self.subscribe_changes(
            "realtime:lobby".to_string(),
            postgres_changes_config("*", None),
        )
        .await
    }

    async fn join_presence(
        &self,
        match_id: &str,
        me: &PresenceRecord,
    ) -> Result<PresenceFeed, RealtimeError> {
        let topic = format!("realtime:presence:{}", match_id);
        let (mut socket, early) = self.attach(&topic, presence_config(&me.user_id)).await?;

        send(
            &mut socket,
            &PhoenixMessage::track(&topic, me, TRACK_REF, JOIN_REF),
        )
        .await?;
        debug!("Announced {} on {}", me.user_id, topic);

        let (sender, syncs) = mpsc::channel(self.feed_capacity);
        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        tokio::spawn(run_channel(
            socket,
            topic.clone(),
            Router::Presence {
                sender,
                state: PresenceState::new(),
            },
            early,
            shutdown_rx,
            self.heartbeat_interval,
        ));

        Ok(PresenceFeed {
            syncs,
            handle: ChannelHandle::new(&topic, shutdown_tx),
        })
    }
}

async fn send(socket: &mut Socket, message: &PhoenixMessage) -> Result<(), RealtimeError> {
    let text = serde_json::to_string(message).map_err(|e| RealtimeError::Protocol(e.to_string()))?;
    socket
        .send(Message::Text(text))
        .await
        .map_err(|e| RealtimeError::Connect(e.to_string()))
}

async fn await_join_reply(socket: &mut Socket) -> Result<Vec<PhoenixMessage>, RealtimeError> {
    let mut early = Vec::new();

    while let Some(frame) = socket.next().await {
        let text = match frame.map_err(|e| RealtimeError::Connect(e.to_string()))? {
            Message::Text(text) => text,
            Message::Close(_) => return Err(RealtimeError::Closed),
            _ => continue,
        };
        let message: PhoenixMessage =
            serde_json::from_str(&text).map_err(|e| RealtimeError::Protocol(e.to_string()))?;

        match message.reply_status(JOIN_REF) {
            Some("ok") => return Ok(early),
            Some(_) => return Err(RealtimeError::JoinRejected(message.reply_reason())),
            None => early.push(message),
        }
    }

    Err(RealtimeError::Closed)
}

/// Where a channel's frames go.
enum Router {
    Changes {
        sender: mpsc::Sender<RecordChange>,
    },
    Presence {
        sender: mpsc::Sender<Vec<PresenceRecord>>,
        state: PresenceState,
    },
}

impl Router {
    /// Returns `false` once the channel should stop: the server dropped it or
    /// nobody is reading any more.
    async fn dispatch(&mut self, message: PhoenixMessage) -> bool {
        if message.is_channel_failure() {
            warn!("Channel {} failed: {}", message.topic, message.event);
            return false;
        }

        match self {
            Router::Changes { sender } => match message.postgres_change() {
                Some(change) => sender.send(change).await.is_ok(),
                None => true,
            },
            Router::Presence { sender, state } => {
                match message.event.as_str() {
                    PRESENCE_STATE => state.apply_state(&message.payload),
                    PRESENCE_DIFF => state.apply_diff(&message.payload),
                    _ => return true,
                }
                sender.send(state.records()).await.is_ok()
            }
        }
    }
}

async fn run_channel(
    mut socket: Socket,
    topic: String,
    mut router: Router,
    early: Vec<PhoenixMessage>,
    mut shutdown: oneshot::Receiver<()>,
    heartbeat_interval: Duration,
) {
    for message in early {
        if !router.dispatch(message).await {
            return;
        }
    }

    let mut heartbeat = interval(heartbeat_interval);
    heartbeat.tick().await;
    let mut next_ref: u64 = 3;

    loop {
        tokio::select! {
            // Fires on an explicit close and when the handle is dropped.
            _ = &mut shutdown => {
                let leave = PhoenixMessage::leave(&topic, &next_ref.to_string(), JOIN_REF);
                if let Err(e) = send(&mut socket, &leave).await {
                    debug!("Leave for {} not delivered: {}", topic, e);
                }
                let _ = socket.close(None).await;
                info!("Detached from realtime channel {}", topic);
                break;
            }
            _ = heartbeat.tick() => {
                let beat = PhoenixMessage::heartbeat(&next_ref.to_string());
                next_ref += 1;
                if let Err(e) = send(&mut socket, &beat).await {
                    warn!("Heartbeat on {} failed: {}", topic, e);
                    break;
                }
            }
            frame = socket.next() => match frame {
                Some(Ok(Message::Text(text))) => {
                    match serde_json::from_str::<PhoenixMessage>(&text) {
                        Ok(message) => {
                            if !router.dispatch(message).await {
                                break;
                            }
                        }
                        Err(e) => warn!("Unreadable frame on {}: {}", topic, e),
                    }
                }
                Some(Ok(Message::Close(_))) | None => {
                    warn!("Realtime socket for {} closed", topic);
                    break;
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    warn!("Realtime socket for {} failed: {}", topic, e);
                    break;
                }
            }
        }
    }
}
