//! End-to-end election flows over TCP

use std::net::SocketAddr;
use std::time::Duration;

use ballotbox_core::{Database, Election, ElectionConfig, ElectionStatus, RoomStatus, StateSnapshot};
use ballotbox_net::{Client, ClientEvent, ElectionHandle, Server, ServerOptions};
use tokio::time::timeout;

const ADMIN_PASSWORD: &str = "masterkey2024";

async fn start_server() -> Server {
    let db = Database::open_in_memory().unwrap();
    let election = Election::new(db, ElectionConfig::default()).unwrap();
    let (handle, _thread) = ElectionHandle::spawn(election).unwrap();

    let options = ServerOptions {
        port: 0,
        ..ServerOptions::default()
    };
    Server::start(options, handle).await.unwrap()
}

/// Connect and wait until the server has registered us
async fn connect(server: &Server) -> Client {
    let addr = SocketAddr::from(([127, 0, 0, 1], server.addr().port()));
    let mut client = Client::connect(addr).await.unwrap();
    client.ping().await.unwrap();
    wait_for(&mut client, |e| matches!(e, ClientEvent::Pong).then_some(())).await;
    client
}

/// Skip events until `pick` accepts one
async fn wait_for<T>(client: &mut Client, mut pick: impl FnMut(ClientEvent) -> Option<T>) -> T {
    timeout(Duration::from_secs(5), async {
        loop {
            match client.next_event().await {
                Some(event) => {
                    if let Some(value) = pick(event) {
                        return value;
                    }
                }
                None => panic!("event stream ended"),
            }
        }
    })
    .await
    .expect("timed out waiting for event")
}

async fn admin(server: &Server) -> Client {
    let mut client = connect(server).await;
    client.verify_admin_password(ADMIN_PASSWORD).await.unwrap();
    let reply = wait_for(&mut client, |e| match e {
        ClientEvent::AdminAuthResult(reply) => Some(reply),
        _ => None,
    })
    .await;
    assert!(reply.success);
    client
}

async fn login(client: &mut Client, username: &str, password: &str) -> ballotbox_core::LoginReply {
    client.login(username, password).await.unwrap();
    wait_for(client, |e| match e {
        ClientEvent::LoginResult(reply) => Some(reply),
        _ => None,
    })
    .await
}

async fn current_state(client: &mut Client) -> StateSnapshot {
    client.request_initial_state().await.unwrap();
    wait_for(client, |e| match e {
        ClientEvent::InitialState(snapshot) => Some(snapshot),
        _ => None,
    })
    .await
}

async fn error_message(client: &mut Client) -> String {
    wait_for(client, |e| match e {
        ClientEvent::Error { message } => Some(message),
        _ => None,
    })
    .await
}

#[tokio::test]
async fn booth_login_gets_room_and_initial_state() {
    let server = start_server().await;
    let mut booth = connect(&server).await;

    let reply = login(&mut booth, "booth1", "booth1MITC").await;
    assert!(reply.success);
    assert_eq!(reply.room.unwrap().id, "room1");

    let snapshot = wait_for(&mut booth, |e| match e {
        ClientEvent::InitialState(snapshot) => Some(snapshot),
        _ => None,
    })
    .await;
    assert_eq!(snapshot.room("room1").unwrap().status(), RoomStatus::Waiting);
    assert_eq!(snapshot.candidates.len(), 3);

    server.shutdown().await;
}

#[tokio::test]
async fn authorized_vote_is_counted_once() {
    let server = start_server().await;
    let mut admin = admin(&server).await;
    let mut booth = connect(&server).await;
    assert!(login(&mut booth, "booth1", "booth1MITC").await.success);

    let before = current_state(&mut admin).await;
    let candidate = before.candidates[0].clone();

    admin.allow_vote("room1").await.unwrap();
    wait_for(&mut booth, |e| matches!(e, ClientEvent::VoteAllowed).then_some(())).await;

    booth
        .cast_vote("room1", &candidate.id.to_string())
        .await
        .unwrap();
    let reply = wait_for(&mut booth, |e| match e {
        ClientEvent::VoteResult(reply) => Some(reply),
        _ => None,
    })
    .await;
    assert!(reply.success);

    booth
        .cast_vote("room1", &candidate.id.to_string())
        .await
        .unwrap();
    let second = wait_for(&mut booth, |e| match e {
        ClientEvent::VoteResult(reply) => Some(reply),
        _ => None,
    })
    .await;
    assert_eq!(
        second.message,
        "Room is not in voting mode. Current status: WAITING"
    );

    let after = current_state(&mut admin).await;
    assert_eq!(
        after.candidate(candidate.id).unwrap().votes,
        candidate.votes + 1
    );
    assert_eq!(after.room("room1").unwrap().status(), RoomStatus::Waiting);
    assert!(after.room("room1").unwrap().vote_start_time().is_none());

    server.shutdown().await;
}

#[tokio::test]
async fn vote_for_unknown_candidate_names_it() {
    let server = start_server().await;
    let mut admin = admin(&server).await;
    let mut booth = connect(&server).await;
    assert!(login(&mut booth, "booth1", "booth1MITC").await.success);

    admin.allow_vote("room1").await.unwrap();
    wait_for(&mut booth, |e| matches!(e, ClientEvent::VoteAllowed).then_some(())).await;

    booth.cast_vote("room1", "404").await.unwrap();
    let reply = wait_for(&mut booth, |e| match e {
        ClientEvent::VoteResult(reply) => Some(reply),
        _ => None,
    })
    .await;
    assert!(!reply.success);
    assert!(reply.message.contains("404"));

    server.shutdown().await;
}

#[tokio::test]
async fn admin_commands_require_authentication() {
    let server = start_server().await;
    let mut stranger = connect(&server).await;

    stranger.pause_election().await.unwrap();
    assert_eq!(
        error_message(&mut stranger).await,
        "Admin authentication required"
    );

    stranger.verify_admin_password("guess").await.unwrap();
    let reply = wait_for(&mut stranger, |e| match e {
        ClientEvent::AdminAuthResult(reply) => Some(reply),
        _ => None,
    })
    .await;
    assert_eq!(reply.message.as_deref(), Some("Invalid admin password."));

    let state = current_state(&mut stranger).await;
    assert_eq!(state.election_status, ElectionStatus::Running);

    server.shutdown().await;
}

#[tokio::test]
async fn disabled_booth_cannot_log_in() {
    let server = start_server().await;
    let mut admin = admin(&server).await;

    admin.disable_room("room1").await.unwrap();
    let state = wait_for(&mut admin, |e| match e {
        ClientEvent::StateUpdate(s) if s.room("room1")?.status() == RoomStatus::Disabled => Some(s),
        _ => None,
    })
    .await;
    assert_eq!(state.audit_log[0].action, "BOOTH DISABLED");

    let mut booth = connect(&server).await;
    let reply = login(&mut booth, "booth1", "booth1MITC").await;
    assert_eq!(
        reply.message.as_deref(),
        Some("This voting booth has been disabled by an administrator")
    );

    server.shutdown().await;
}

#[tokio::test]
async fn closed_election_stays_closed() {
    let server = start_server().await;
    let mut admin = admin(&server).await;

    admin.close_election().await.unwrap();
    wait_for(&mut admin, |e| match e {
        ClientEvent::StateUpdate(s) if s.election_status == ElectionStatus::Closed => Some(()),
        _ => None,
    })
    .await;

    admin.resume_election().await.unwrap();
    assert_eq!(error_message(&mut admin).await, "The election is closed");

    let mut booth = connect(&server).await;
    let reply = login(&mut booth, "booth2", "booth2MITC").await;
    assert_eq!(reply.message.as_deref(), Some("The election is closed"));

    assert_eq!(
        current_state(&mut admin).await.election_status,
        ElectionStatus::Closed
    );
    server.shutdown().await;
}

#[tokio::test]
async fn disconnect_takes_booth_offline() {
    let server = start_server().await;
    let mut admin = admin(&server).await;
    let mut booth = connect(&server).await;
    assert!(login(&mut booth, "booth3", "booth3MITC").await.success);

    admin.allow_vote("room3").await.unwrap();
    wait_for(&mut booth, |e| matches!(e, ClientEvent::VoteAllowed).then_some(())).await;

    booth.disconnect().await;
    let room = wait_for(&mut admin, |e| match e {
        ClientEvent::StateUpdate(s) => {
            let room = s.room("room3")?.clone();
            (room.status() == RoomStatus::Offline).then_some(room)
        }
        _ => None,
    })
    .await;
    assert!(room.vote_start_time().is_none());

    server.shutdown().await;
}

#[tokio::test]
async fn shutdown_is_announced() {
    let server = start_server().await;
    let mut booth = connect(&server).await;

    server.shutdown().await;
    wait_for(&mut booth, |e| matches!(e, ClientEvent::ServerShutdown).then_some(())).await;
    wait_for(&mut booth, |e| matches!(e, ClientEvent::Disconnected).then_some(())).await;
}
