//! TCP client for booth terminals and admin panels
//!
//! Requests are fire-and-forget; everything the server sends back,
//! replies and pushes alike, arrives through [`Client::next_event`].

use std::net::SocketAddr;
use std::sync::Arc;

use ballotbox_core::{AdminReply, LoginReply, StateSnapshot, VoteReply};
use tokio::io::{ReadHalf, WriteHalf};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, RwLock};
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::frame::{read_frame, write_frame};
use crate::protocol::Message;

/// Connection state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Connected,
    Disconnected,
}

/// Event received from the server
#[derive(Debug, Clone)]
pub enum ClientEvent {
    LoginResult(LoginReply),
    VoteResult(VoteReply),
    AdminAuthResult(AdminReply),
    /// Answer to `requestInitialState`, also sent after a successful login
    InitialState(StateSnapshot),
    /// Full state pushed after every change
    StateUpdate(StateSnapshot),
    /// This booth may now cast one vote
    VoteAllowed,
    /// A request was refused
    Error { message: String },
    Pong,
    /// Server is shutting down
    ServerShutdown,
    /// Connection lost
    Disconnected,
}

/// Client handle for network operations
pub struct Client {
    state: Arc<RwLock<ClientState>>,
    event_rx: mpsc::Receiver<ClientEvent>,
    cmd_tx: mpsc::Sender<ClientCommand>,
}

struct ClientState {
    connection: ConnectionState,
    /// Most recent snapshot seen on this connection
    last_state: Option<StateSnapshot>,
}

enum ClientCommand {
    Send(Message),
    Disconnect,
}

impl Client {
    /// Connect to an election server
    pub async fn connect(addr: SocketAddr) -> Result<Self> {
        info!(addr = %addr, "Connecting to server");

        let stream = TcpStream::connect(addr).await?;
        let (reader, writer) = tokio::io::split(stream);

        let state = Arc::new(RwLock::new(ClientState {
            connection: ConnectionState::Connected,
            last_state: None,
        }));

        let (event_tx, event_rx) = mpsc::channel(64);
        let (cmd_tx, cmd_rx) = mpsc::channel(64);

        tokio::spawn(connection_task(
            reader,
            writer,
            state.clone(),
            event_tx,
            cmd_rx,
        ));

        Ok(Client {
            state,
            event_rx,
            cmd_tx,
        })
    }

    /// Get the next server event
    pub async fn next_event(&mut self) -> Option<ClientEvent> {
        self.event_rx.recv().await
    }

    async fn send(&self, msg: Message) -> Result<()> {
        self.cmd_tx
            .send(ClientCommand::Send(msg))
            .await
            .map_err(|_| Error::NotConnected)
    }

    pub async fn login(&self, username: &str, password: &str) -> Result<()> {
        self.send(Message::Login {
            username: Some(username.to_string()),
            password: Some(password.to_string()),
        })
        .await
    }

    pub async fn cast_vote(&self, room_id: &str, candidate_id: &str) -> Result<()> {
        self.send(Message::CastVote {
            candidate_id: candidate_id.to_string(),
            room_id: room_id.to_string(),
        })
        .await
    }

    pub async fn verify_admin_password(&self, password: &str) -> Result<()> {
        self.send(Message::VerifyAdminPassword {
            password: Some(password.to_string()),
        })
        .await
    }

    pub async fn pause_election(&self) -> Result<()> {
        self.send(Message::PauseElection).await
    }

    pub async fn resume_election(&self) -> Result<()> {
        self.send(Message::ResumeElection).await
    }

    pub async fn close_election(&self) -> Result<()> {
        self.send(Message::CloseElection).await
    }

    pub async fn disable_room(&self, room_id: &str) -> Result<()> {
        self.send(Message::DisableRoom {
            room_id: room_id.to_string(),
        })
        .await
    }

    pub async fn enable_room(&self, room_id: &str) -> Result<()> {
        self.send(Message::EnableRoom {
            room_id: room_id.to_string(),
        })
        .await
    }

    pub async fn allow_vote(&self, room_id: &str) -> Result<()> {
        self.send(Message::AllowVote {
            room_id: room_id.to_string(),
        })
        .await
    }

    pub async fn request_initial_state(&self) -> Result<()> {
        self.send(Message::RequestInitialState).await
    }

    /// Send a ping
    pub async fn ping(&self) -> Result<()> {
        self.send(Message::Ping).await
    }

    /// Disconnect from the server
    pub async fn disconnect(&self) {
        let _ = self.cmd_tx.send(ClientCommand::Disconnect).await;
    }

    /// Get current connection state
    pub async fn connection_state(&self) -> ConnectionState {
        self.state.read().await.connection
    }

    /// Latest snapshot received, if any
    pub async fn last_state(&self) -> Option<StateSnapshot> {
        self.state.read().await.last_state.clone()
    }
}

/// Main connection task
async fn connection_task(
    mut reader: ReadHalf<TcpStream>,
    mut writer: WriteHalf<TcpStream>,
    state: Arc<RwLock<ClientState>>,
    event_tx: mpsc::Sender<ClientEvent>,
    mut cmd_rx: mpsc::Receiver<ClientCommand>,
) {
    loop {
        tokio::select! {
            result = read_frame(&mut reader) => {
                match result {
                    Ok(msg) => {
                        handle_server_message(msg, &state, &event_tx).await;
                    }
                    Err(Error::ConnectionClosed) => {
                        debug!("Server closed connection");
                        break;
                    }
                    Err(e) => {
                        warn!(error = %e, "Read error");
                        break;
                    }
                }
            }

            cmd = cmd_rx.recv() => {
                match cmd {
                    Some(ClientCommand::Send(msg)) => {
                        if let Err(e) = write_frame(&mut writer, &msg).await {
                            warn!(error = %e, "Write error");
                            break;
                        }
                    }
                    Some(ClientCommand::Disconnect) | None => {
                        debug!("Disconnect requested");
                        break;
                    }
                }
            }
        }
    }

    state.write().await.connection = ConnectionState::Disconnected;
    let _ = event_tx.send(ClientEvent::Disconnected).await;
    info!("Disconnected from server");
}

/// Handle a message from the server
async fn handle_server_message(
    msg: Message,
    state: &Arc<RwLock<ClientState>>,
    event_tx: &mpsc::Sender<ClientEvent>,
) {
    let event = match msg {
        Message::LoginResult(reply) => ClientEvent::LoginResult(reply),
        Message::VoteResult(reply) => ClientEvent::VoteResult(reply),
        Message::AdminAuthResult(reply) => ClientEvent::AdminAuthResult(reply),
        Message::InitialState(snapshot) => {
            state.write().await.last_state = Some(snapshot.clone());
            ClientEvent::InitialState(snapshot)
        }
        Message::StateUpdate(snapshot) => {
            state.write().await.last_state = Some(snapshot.clone());
            ClientEvent::StateUpdate(snapshot)
        }
        Message::VoteAllowed => ClientEvent::VoteAllowed,
        Message::Error { message } => ClientEvent::Error { message },
        Message::Pong => ClientEvent::Pong,
        Message::ServerShutdown => ClientEvent::ServerShutdown,
        other => {
            debug!(message = ?other, "Ignoring unexpected message");
            return;
        }
    };
    let _ = event_tx.send(event).await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actor::ElectionHandle;
    use crate::server::{Server, ServerOptions};
    use ballotbox_core::{Database, Election, ElectionConfig};

    #[tokio::test]
    async fn test_client_ping() {
        let db = Database::open_in_memory().unwrap();
        let election = Election::new(db, ElectionConfig::default()).unwrap();
        let (handle, _join) = ElectionHandle::spawn(election).unwrap();

        let options = ServerOptions {
            port: 0,
            ..ServerOptions::default()
        };
        let server = Server::start(options, handle).await.unwrap();
        let addr = SocketAddr::from(([127, 0, 0, 1], server.addr().port()));

        let mut client = Client::connect(addr).await.unwrap();
        client.ping().await.unwrap();

        match client.next_event().await {
            Some(ClientEvent::Pong) => {}
            other => panic!("Expected Pong, got {:?}", other),
        }
        assert_eq!(client.connection_state().await, ConnectionState::Connected);

        client.disconnect().await;
        assert!(matches!(
            client.next_event().await,
            Some(ClientEvent::Disconnected)
        ));
        server.shutdown().await;
    }
}
