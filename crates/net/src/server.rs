//! TCP server for booth terminals and admin panels
//!
//! Every accepted connection gets its own session id and writer task.
//! Requests are forwarded to the election actor; state changes come back
//! through a [`StateObserver`] that fans a `stateUpdate` out to every
//! connected peer.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use ballotbox_core::{ElectionStatus, RoomStatus, SessionId, StateObserver, StateSnapshot};
use tokio::io::WriteHalf;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{broadcast, mpsc, RwLock};
use tracing::{debug, error, info, warn};

use crate::actor::ElectionHandle;
use crate::error::{Error, Result};
use crate::frame::{read_frame, write_frame};
use crate::protocol::Message;

/// Outbound queue depth per connection
const PEER_QUEUE: usize = 64;

/// How long a closing connection may take to flush its queue
const FLUSH_TIMEOUT: Duration = Duration::from_secs(1);

const ADMIN_REQUIRED: &str = "Admin authentication required";
const UNEXPECTED: &str = "An unexpected error occurred.";

/// Server tuning
#[derive(Debug, Clone)]
pub struct ServerOptions {
    pub port: u16,
    pub max_peers: usize,
    /// Refuse admin commands until the connection has verified the admin password
    pub require_admin_auth: bool,
    /// How often expired rate-limit windows are dropped
    pub sweep_interval: Duration,
}

impl Default for ServerOptions {
    fn default() -> Self {
        Self {
            port: crate::DEFAULT_PORT,
            max_peers: 64,
            require_admin_auth: true,
            sweep_interval: Duration::from_secs(60),
        }
    }
}

/// Connected peer state
struct Peer {
    tx: mpsc::Sender<Message>,
    is_admin: bool,
}

type Peers = Arc<RwLock<HashMap<SessionId, Peer>>>;

/// State shared by every connection task
struct Shared {
    peers: Peers,
    election: ElectionHandle,
    max_peers: usize,
    require_admin_auth: bool,
}

/// Pushes each new snapshot to every connected peer.
///
/// Runs on the election thread, so it takes the blocking lock and never
/// waits on a slow peer.
struct PeerBroadcaster {
    peers: Peers,
}

impl StateObserver for PeerBroadcaster {
    fn state_changed(&self, snapshot: &StateSnapshot) {
        let peers = self.peers.blocking_read();
        for (session, peer) in peers.iter() {
            if peer
                .tx
                .try_send(Message::StateUpdate(snapshot.clone()))
                .is_err()
            {
                debug!(session_id = %session, "Dropped state update for slow or closed peer");
            }
        }
    }
}

/// Election server handle
pub struct Server {
    addr: SocketAddr,
    peers: Peers,
    shutdown_tx: broadcast::Sender<()>,
}

impl Server {
    /// Bind and start serving the given election
    pub async fn start(options: ServerOptions, election: ElectionHandle) -> Result<Self> {
        let addr = SocketAddr::from(([0, 0, 0, 0], options.port));
        let listener = TcpListener::bind(addr).await?;
        let bound_addr = listener.local_addr()?;

        info!(addr = %bound_addr, max_peers = options.max_peers, "Server started");

        let (shutdown_tx, _) = broadcast::channel(1);
        let peers: Peers = Arc::new(RwLock::new(HashMap::new()));

        election
            .subscribe(Box::new(PeerBroadcaster {
                peers: peers.clone(),
            }))
            .await?;

        let shared = Arc::new(Shared {
            peers: peers.clone(),
            election: election.clone(),
            max_peers: options.max_peers,
            require_admin_auth: options.require_admin_auth,
        });

        tokio::spawn(accept_loop(listener, shared, shutdown_tx.clone()));
        tokio::spawn(sweep_task(
            election,
            options.sweep_interval,
            shutdown_tx.subscribe(),
        ));

        Ok(Server {
            addr: bound_addr,
            peers,
            shutdown_tx,
        })
    }

    /// Get the server's bound address
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Number of open connections
    pub async fn peer_count(&self) -> usize {
        self.peers.read().await.len()
    }

    /// Tell every peer we are going away, then stop accepting and close
    /// all connections
    pub async fn shutdown(&self) {
        {
            let peers = self.peers.read().await;
            for peer in peers.values() {
                let _ = peer.tx.try_send(Message::ServerShutdown);
            }
        }
        let _ = self.shutdown_tx.send(());
        info!("Server shutdown initiated");
    }
}

/// Accept incoming connections
async fn accept_loop(
    listener: TcpListener,
    shared: Arc<Shared>,
    shutdown_tx: broadcast::Sender<()>,
) {
    let mut shutdown_rx = shutdown_tx.subscribe();
    loop {
        tokio::select! {
            result = listener.accept() => {
                match result {
                    Ok((stream, addr)) => {
                        debug!(addr = %addr, "New connection");
                        tokio::spawn(handle_connection(
                            stream,
                            addr,
                            shared.clone(),
                            shutdown_tx.subscribe(),
                        ));
                    }
                    Err(e) => {
                        error!(error = %e, "Accept failed");
                    }
                }
            }
            _ = shutdown_rx.recv() => {
                info!("Accept loop shutting down");
                break;
            }
        }
    }
}

/// Register a new peer, refusing it when the server is full
async fn register_peer(shared: &Shared, session: SessionId, tx: mpsc::Sender<Message>) -> Result<()> {
    let mut peers = shared.peers.write().await;
    if peers.len() >= shared.max_peers {
        return Err(Error::ServerFull);
    }
    peers.insert(
        session,
        Peer {
            tx,
            is_admin: false,
        },
    );
    Ok(())
}

/// Handle a single client connection
async fn handle_connection(
    stream: TcpStream,
    addr: SocketAddr,
    shared: Arc<Shared>,
    mut shutdown_rx: broadcast::Receiver<()>,
) {
    let (mut reader, mut writer) = tokio::io::split(stream);
    let session = SessionId::new();
    let (tx, rx) = mpsc::channel(PEER_QUEUE);

    if let Err(e) = register_peer(&shared, session, tx.clone()).await {
        warn!(addr = %addr, error = %e, "Connection refused");
        let _ = write_frame(
            &mut writer,
            &Message::Error {
                message: e.to_string(),
            },
        )
        .await;
        return;
    }

    info!(addr = %addr, session_id = %session, "Peer connected");
    let writer_handle = tokio::spawn(writer_task(writer, rx));

    loop {
        tokio::select! {
            result = read_frame(&mut reader) => {
                match result {
                    Ok(msg) => {
                        if let Err(e) = handle_message(msg, session, &tx, &shared).await {
                            error!(session_id = %session, error = %e, "Request failed");
                            break;
                        }
                    }
                    Err(Error::ConnectionClosed) => {
                        debug!(session_id = %session, "Connection closed");
                        break;
                    }
                    Err(e) => {
                        warn!(session_id = %session, error = %e, "Read error");
                        break;
                    }
                }
            }
            _ = shutdown_rx.recv() => {
                debug!(session_id = %session, "Closing connection for shutdown");
                break;
            }
        }
    }

    // Cleanup
    shared.peers.write().await.remove(&session);
    drop(tx);
    let abort = writer_handle.abort_handle();
    if tokio::time::timeout(FLUSH_TIMEOUT, writer_handle).await.is_err() {
        abort.abort();
    }

    if let Err(e) = shared.election.disconnect(session).await {
        warn!(session_id = %session, error = %e, "Could not report disconnect");
    }

    info!(session_id = %session, "Peer disconnected");
}

/// Writer task - sends messages to the client
async fn writer_task(mut writer: WriteHalf<TcpStream>, mut rx: mpsc::Receiver<Message>) {
    while let Some(msg) = rx.recv().await {
        if let Err(e) = write_frame(&mut writer, &msg).await {
            debug!(error = %e, "Write failed");
            break;
        }
    }
}

async fn reply(tx: &mpsc::Sender<Message>, msg: Message) -> Result<()> {
    tx.send(msg).await.map_err(|_| Error::ConnectionClosed)
}

/// Turn a failed admin command into an `error` message for its sender
fn failure_message(error: &Error) -> String {
    match error {
        Error::Core(core) => core.decline_message().unwrap_or_else(|| UNEXPECTED.to_string()),
        _ => UNEXPECTED.to_string(),
    }
}

async fn is_admin(shared: &Shared, session: SessionId) -> bool {
    shared
        .peers
        .read()
        .await
        .get(&session)
        .is_some_and(|peer| peer.is_admin)
}

/// Handle an incoming message
///
/// Only an unusable connection or a stopped election is returned as an
/// error; everything else is answered on the connection.
async fn handle_message(
    msg: Message,
    session: SessionId,
    tx: &mpsc::Sender<Message>,
    shared: &Shared,
) -> Result<()> {
    if msg.is_admin_command() && shared.require_admin_auth && !is_admin(shared, session).await {
        warn!(security = true, session_id = %session, "Admin command from unauthenticated connection");
        return reply(
            tx,
            Message::Error {
                message: ADMIN_REQUIRED.to_string(),
            },
        )
        .await;
    }

    let election = &shared.election;
    let outcome = match msg {
        Message::Login { username, password } => {
            let result = election.login(username, password, session).await?;
            let success = result.success;
            reply(tx, Message::LoginResult(result)).await?;
            if success {
                let snapshot = election.snapshot().await?;
                reply(tx, Message::InitialState(snapshot)).await?;
            }
            Ok(())
        }
        Message::CastVote {
            candidate_id,
            room_id,
        } => {
            let result = election.cast_vote(room_id, candidate_id, session).await?;
            return reply(tx, Message::VoteResult(result)).await;
        }
        Message::VerifyAdminPassword { password } => {
            let result = election.verify_admin_password(password, session).await?;
            if result.success {
                if let Some(peer) = shared.peers.write().await.get_mut(&session) {
                    peer.is_admin = true;
                }
            }
            return reply(tx, Message::AdminAuthResult(result)).await;
        }
        Message::PauseElection => election.set_election_status(ElectionStatus::Paused).await,
        Message::ResumeElection => election.set_election_status(ElectionStatus::Running).await,
        Message::CloseElection => election.set_election_status(ElectionStatus::Closed).await,
        Message::DisableRoom { room_id } => {
            election.set_room_status(room_id, RoomStatus::Disabled).await
        }
        Message::EnableRoom { room_id } => {
            election.set_room_status(room_id, RoomStatus::Offline).await
        }
        Message::AllowVote { room_id } => match election.allow_vote(room_id).await {
            Ok(Some(target)) => {
                send_to_peer(shared, target, Message::VoteAllowed).await;
                Ok(())
            }
            Ok(None) => Ok(()),
            Err(e) => Err(e),
        },
        Message::RequestInitialState => {
            let snapshot = election.snapshot().await?;
            return reply(tx, Message::InitialState(snapshot)).await;
        }
        Message::Ping => return reply(tx, Message::Pong).await,
        other => {
            debug!(session_id = %session, message = ?other, "Ignoring unexpected message type");
            Ok(())
        }
    };

    match outcome {
        Ok(()) => Ok(()),
        Err(Error::ElectionStopped) => Err(Error::ElectionStopped),
        Err(e) => {
            if !matches!(&e, Error::Core(core) if core.decline_message().is_some()) {
                error!(session_id = %session, error = %e, "Admin command failed");
            }
            reply(
                tx,
                Message::Error {
                    message: failure_message(&e),
                },
            )
            .await
        }
    }
}

/// Queue a message for one peer without waiting on it
async fn send_to_peer(shared: &Shared, session: SessionId, msg: Message) {
    let peers = shared.peers.read().await;
    match peers.get(&session) {
        Some(peer) => {
            if peer.tx.try_send(msg).is_err() {
                debug!(session_id = %session, "Failed to queue message for peer");
            }
        }
        None => debug!(session_id = %session, "Target peer is gone"),
    }
}

/// Periodically drop expired rate-limit windows
async fn sweep_task(
    election: ElectionHandle,
    interval: Duration,
    mut shutdown_rx: broadcast::Receiver<()>,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                if election.sweep_rate_limits().await.is_err() {
                    break;
                }
            }
            _ = shutdown_rx.recv() => {
                debug!("Sweep task shutting down");
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ballotbox_core::{Database, Election, ElectionConfig};

    fn election() -> ElectionHandle {
        let db = Database::open_in_memory().unwrap();
        let election = Election::new(db, ElectionConfig::default()).unwrap();
        ElectionHandle::spawn(election).unwrap().0
    }

    #[tokio::test]
    async fn test_server_start() {
        let options = ServerOptions {
            port: 0,
            ..ServerOptions::default()
        };
        let server = Server::start(options, election()).await.unwrap();

        assert!(server.addr().port() > 0);
        assert_eq!(server.peer_count().await, 0);
        server.shutdown().await;
    }

    #[test]
    fn test_failure_message() {
        let decline: Error = ballotbox_core::Error::from(ballotbox_core::Decline::ElectionClosed).into();
        assert_eq!(failure_message(&decline), "The election is closed");
        assert_eq!(failure_message(&Error::NotConnected), UNEXPECTED);
    }
}
