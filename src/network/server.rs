//! WebSocket Arcade Server
//!
//! Async WebSocket front end. Each connection identifies itself with
//! `hello`, then drives the wheel and shooting gallery through the shared
//! [`Arcade`]. Identity is taken at face value; authentication belongs to
//! whatever sits in front of this server.

use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{broadcast, mpsc, RwLock};
use tokio_tungstenite::{accept_async, tungstenite::Message};
use tracing::{debug, error, info, instrument, warn};

use crate::arcade::Arcade;
use crate::config::ArcadeConfig;
use crate::game::state::Shot;
use crate::game::weapon::WeaponProfile;
use crate::network::protocol::{ClientMessage, ErrorCode, ErrorReply, ServerMessage};
use crate::proof::commitment::PlayerId;

/// Server errors.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// Failed to bind to address.
    #[error("Failed to bind: {0}")]
    BindFailed(#[from] std::io::Error),

    /// WebSocket error.
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// Connection limit reached.
    #[error("Connection limit reached")]
    ConnectionLimitReached,
}

/// Connected client state.
struct ConnectedClient {
    /// Player identifier (after hello).
    player_id: Option<PlayerId>,
}

/// The arcade server.
pub struct ArcadeServer {
    /// Server configuration.
    config: ArcadeConfig,
    /// Game core.
    arcade: Arc<Arcade>,
    /// Connected clients.
    clients: Arc<RwLock<BTreeMap<SocketAddr, ConnectedClient>>>,
    /// Shutdown signal.
    shutdown_tx: broadcast::Sender<()>,
}

impl ArcadeServer {
    /// Create a new server around an arcade.
    pub fn new(config: ArcadeConfig, arcade: Arc<Arcade>) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);

        Self {
            config,
            arcade,
            clients: Arc::new(RwLock::new(BTreeMap::new())),
            shutdown_tx,
        }
    }

    /// Run the server.
    #[instrument(skip(self))]
    pub async fn run(&self) -> Result<(), ServerError> {
        let listener = TcpListener::bind(&self.config.bind_addr).await?;
        info!("Arcade server listening on {}", self.config.bind_addr);

        let mut shutdown_rx = self.shutdown_tx.subscribe();

        loop {
            tokio::select! {
                result = listener.accept() => {
                    match result {
                        Ok((stream, addr)) => {
                            let clients_count = self.clients.read().await.len();
                            if clients_count >= self.config.max_connections {
                                warn!("{}, rejecting {}", ServerError::ConnectionLimitReached, addr);
                                continue;
                            }

                            info!("New connection from {}", addr);
                            self.handle_connection(stream, addr);
                        }
                        Err(e) => {
                            error!("Accept error: {}", e);
                        }
                    }
                }
                _ = shutdown_rx.recv() => {
                    info!("Shutdown signal received");
                    break;
                }
            }
        }

        Ok(())
    }

    /// Handle a new WebSocket connection.
    fn handle_connection(&self, stream: TcpStream, addr: SocketAddr) {
        let clients = self.clients.clone();
        let arcade = self.arcade.clone();
        let version = self.config.version.clone();
        let mut shutdown_rx = self.shutdown_tx.subscribe();

        tokio::spawn(async move {
            let ws_stream = match accept_async(stream).await {
                Ok(ws) => ws,
                Err(e) => {
                    error!("WebSocket handshake failed for {}: {}", addr, e);
                    return;
                }
            };

            let (mut ws_sender, mut ws_receiver) = ws_stream.split();
            let (msg_tx, mut msg_rx) = mpsc::channel::<ServerMessage>(64);

            {
                let mut clients = clients.write().await;
                clients.insert(addr, ConnectedClient { player_id: None });
            }

            // Spawn message sender task
            let sender_task = tokio::spawn(async move {
                while let Some(msg) = msg_rx.recv().await {
                    let text = match msg.to_json() {
                        Ok(t) => t,
                        Err(e) => {
                            error!("Failed to serialize message: {}", e);
                            continue;
                        }
                    };
                    if ws_sender.send(Message::Text(text)).await.is_err() {
                        break;
                    }
                }
            });

            let mut player: Option<PlayerId> = None;

            loop {
                tokio::select! {
                    msg = ws_receiver.next() => {
                        match msg {
                            Some(Ok(Message::Text(text))) => {
                                let reply = match ClientMessage::from_json(&text) {
                                    Ok(client_msg) => {
                                        handle_client_message(&arcade, &version, &mut player, client_msg).await
                                    }
                                    Err(e) => {
                                        debug!("Invalid message from {}: {}", addr, e);
                                        ServerMessage::Error(ErrorReply::new(
                                            ErrorCode::InvalidInput,
                                            "Invalid message format",
                                        ))
                                    }
                                };

                                {
                                    let mut clients = clients.write().await;
                                    if let Some(client) = clients.get_mut(&addr) {
                                        client.player_id = player.clone();
                                    }
                                }

                                if msg_tx.send(reply).await.is_err() {
                                    break;
                                }
                            }
                            Some(Ok(Message::Binary(_))) => {
                                let _ = msg_tx.send(ServerMessage::Error(ErrorReply::new(
                                    ErrorCode::InvalidInput,
                                    "Binary frames are not supported",
                                ))).await;
                            }
                            Some(Ok(Message::Close(_))) | None => {
                                debug!("Client {} disconnected", addr);
                                break;
                            }
                            Some(Err(e)) => {
                                error!("WebSocket error for {}: {}", addr, e);
                                break;
                            }
                            _ => {}
                        }
                    }
                    _ = shutdown_rx.recv() => {
                        let _ = msg_tx.send(ServerMessage::Shutdown {
                            reason: "Server shutting down".to_string(),
                        }).await;
                        break;
                    }
                }
            }

            // Let queued replies drain before the socket drops.
            drop(msg_tx);
            let _ = sender_task.await;

            {
                let mut clients = clients.write().await;
                clients.remove(&addr);
            }

            info!("Client {} cleaned up", addr);
        });
    }

    /// Signal shutdown.
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(());
    }

    /// Get active connection count.
    pub async fn connection_count(&self) -> usize {
        self.clients.read().await.len()
    }

    /// Number of connections that have sent `hello`.
    pub async fn identified_count(&self) -> usize {
        let clients = self.clients.read().await;
        clients.values().filter(|c| c.player_id.is_some()).count()
    }

    /// Get active session count.
    pub async fn session_count(&self) -> usize {
        self.arcade.engine().registry().session_count().await
    }
}

/// Route one client message to the arcade and build the reply.
///
/// `player` is the connection's identity; it is set by `hello` and required
/// by every other message except `ping`.
pub async fn handle_client_message(
    arcade: &Arcade,
    server_version: &str,
    player: &mut Option<PlayerId>,
    msg: ClientMessage,
) -> ServerMessage {
    match msg {
        ClientMessage::Hello { player_id } => {
            if player_id.trim().is_empty() {
                return error_reply(ErrorCode::InvalidInput, "player_id must not be empty");
            }
            let id = PlayerId::new(player_id);
            let commitment = arcade.register(&id).await;
            info!(player = %id, "Player identified");
            *player = Some(id);
            ServerMessage::Welcome {
                server_version: server_version.to_string(),
                commitment,
            }
        }
        ClientMessage::Ping { timestamp } => ServerMessage::Pong {
            timestamp,
            server_time: SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .unwrap_or_default()
                .as_millis() as u64,
        },
        other => {
            let Some(id) = player.as_ref() else {
                return error_reply(ErrorCode::NotIdentified, "Send hello first");
            };
            handle_player_message(arcade, id, other).await
        }
    }
}

async fn handle_player_message(arcade: &Arcade, player: &PlayerId, msg: ClientMessage) -> ServerMessage {
    let reply = match msg {
        ClientMessage::SetClientSeed { client_seed } => arcade
            .set_client_seed(player, &client_seed)
            .await
            .map(ServerMessage::Commitment),
        ClientMessage::RotateSeed => arcade.rotate_seed(player).await.map(ServerMessage::Rotated),
        ClientMessage::Spin { client_seed } => arcade
            .spin_wheel(player, client_seed.as_deref())
            .await
            .map(ServerMessage::Spin),
        ClientMessage::StartMatch { level, weapon: name } => {
            let Some(weapon) = WeaponProfile::by_name(&name) else {
                return error_reply(ErrorCode::InvalidInput, format!("Unknown weapon {name}"));
            };
            arcade
                .start_match(player, level, weapon)
                .await
                .map(ServerMessage::MatchStarted)
        }
        ClientMessage::Shoot {
            session_id,
            x,
            y,
            entity_id_hint,
        } => {
            let shot = Shot { x, y, entity_id_hint };
            arcade
                .shoot(player, &session_id, &shot)
                .await
                .map(|result| ServerMessage::ShotResult { session_id, result })
        }
        ClientMessage::EndMatch { session_id } => arcade
            .end_match(player, &session_id)
            .await
            .map(ServerMessage::MatchEnded),
        ClientMessage::Collect { session_id } => arcade
            .collect_match(player, &session_id)
            .await
            .map(ServerMessage::Collected),
        ClientMessage::Hello { .. } | ClientMessage::Ping { .. } => {
            return error_reply(ErrorCode::InvalidInput, "Unexpected message");
        }
    };

    reply.unwrap_or_else(|e| {
        debug!(player = %player, "Request failed: {}", e);
        ServerMessage::Error(ErrorReply::from(&e))
    })
}

fn error_reply(code: ErrorCode, message: impl Into<String>) -> ServerMessage {
    ServerMessage::Error(ErrorReply::new(code, message))
}
