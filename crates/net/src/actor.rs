//! Election actor
//!
//! The [`Election`] lives on a dedicated thread and is driven through a
//! command queue, so every action runs to completion before the next one
//! starts. Connection tasks talk to it through a cloneable
//! [`ElectionHandle`] and get their replies over oneshot channels.

use std::thread;

use ballotbox_core::{
    AdminReply, Election, ElectionStatus, LoginReply, RoomStatus, SessionId, StateObserver,
    StateSnapshot, Storage, VoteReply,
};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info};

use crate::error::{Error, Result};

/// Pending commands before senders start waiting
const COMMAND_QUEUE: usize = 256;

type CoreResult<T> = ballotbox_core::Result<T>;

enum Command {
    Login {
        username: Option<String>,
        password: Option<String>,
        session: SessionId,
        reply: oneshot::Sender<LoginReply>,
    },
    CastVote {
        room_id: String,
        candidate_id: String,
        session: SessionId,
        reply: oneshot::Sender<VoteReply>,
    },
    VerifyAdmin {
        password: Option<String>,
        session: SessionId,
        reply: oneshot::Sender<AdminReply>,
    },
    SetElectionStatus {
        status: ElectionStatus,
        reply: oneshot::Sender<CoreResult<()>>,
    },
    SetRoomStatus {
        room_id: String,
        status: RoomStatus,
        reply: oneshot::Sender<CoreResult<()>>,
    },
    AllowVote {
        room_id: String,
        reply: oneshot::Sender<CoreResult<Option<SessionId>>>,
    },
    Snapshot {
        reply: oneshot::Sender<StateSnapshot>,
    },
    Subscribe {
        observer: Box<dyn StateObserver>,
    },
    Disconnect {
        session: SessionId,
    },
    SweepRateLimits,
}

/// Cloneable handle to the election actor
#[derive(Clone)]
pub struct ElectionHandle {
    tx: mpsc::Sender<Command>,
}

impl ElectionHandle {
    /// Move the election onto its own thread.
    ///
    /// The thread exits once every handle has been dropped.
    pub fn spawn<S>(election: Election<S>) -> Result<(Self, thread::JoinHandle<()>)>
    where
        S: Storage + Send + 'static,
    {
        let (tx, rx) = mpsc::channel(COMMAND_QUEUE);
        let join = thread::Builder::new()
            .name("election".into())
            .spawn(move || run(election, rx))?;
        Ok((Self { tx }, join))
    }

    async fn request<T>(&self, make: impl FnOnce(oneshot::Sender<T>) -> Command) -> Result<T> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(make(reply))
            .await
            .map_err(|_| Error::ElectionStopped)?;
        rx.await.map_err(|_| Error::ElectionStopped)
    }

    async fn post(&self, command: Command) -> Result<()> {
        self.tx
            .send(command)
            .await
            .map_err(|_| Error::ElectionStopped)
    }

    pub async fn login(
        &self,
        username: Option<String>,
        password: Option<String>,
        session: SessionId,
    ) -> Result<LoginReply> {
        self.request(|reply| Command::Login {
            username,
            password,
            session,
            reply,
        })
        .await
    }

    pub async fn cast_vote(
        &self,
        room_id: String,
        candidate_id: String,
        session: SessionId,
    ) -> Result<VoteReply> {
        self.request(|reply| Command::CastVote {
            room_id,
            candidate_id,
            session,
            reply,
        })
        .await
    }

    pub async fn verify_admin_password(
        &self,
        password: Option<String>,
        session: SessionId,
    ) -> Result<AdminReply> {
        self.request(|reply| Command::VerifyAdmin {
            password,
            session,
            reply,
        })
        .await
    }

    pub async fn set_election_status(&self, status: ElectionStatus) -> Result<()> {
        self.request(|reply| Command::SetElectionStatus { status, reply })
            .await?
            .map_err(Error::from)
    }

    pub async fn set_room_status(&self, room_id: String, status: RoomStatus) -> Result<()> {
        self.request(|reply| Command::SetRoomStatus {
            room_id,
            status,
            reply,
        })
        .await?
        .map_err(Error::from)
    }

    /// Returns the session that should receive `voteAllowed`
    pub async fn allow_vote(&self, room_id: String) -> Result<Option<SessionId>> {
        self.request(|reply| Command::AllowVote { room_id, reply })
            .await?
            .map_err(Error::from)
    }

    pub async fn snapshot(&self) -> Result<StateSnapshot> {
        self.request(|reply| Command::Snapshot { reply }).await
    }

    pub async fn subscribe(&self, observer: Box<dyn StateObserver>) -> Result<()> {
        self.post(Command::Subscribe { observer }).await
    }

    pub async fn disconnect(&self, session: SessionId) -> Result<()> {
        self.post(Command::Disconnect { session }).await
    }

    pub async fn sweep_rate_limits(&self) -> Result<()> {
        self.post(Command::SweepRateLimits).await
    }
}

/// Actor loop; replies to callers that went away are dropped silently
fn run<S: Storage>(mut election: Election<S>, mut rx: mpsc::Receiver<Command>) {
    info!("Election actor started");

    while let Some(command) = rx.blocking_recv() {
        match command {
            Command::Login {
                username,
                password,
                session,
                reply,
            } => {
                let result = election.login(username.as_deref(), password.as_deref(), session);
                let _ = reply.send(result);
            }
            Command::CastVote {
                room_id,
                candidate_id,
                session,
                reply,
            } => {
                let _ = reply.send(election.cast_vote(&room_id, &candidate_id, session));
            }
            Command::VerifyAdmin {
                password,
                session,
                reply,
            } => {
                let _ = reply.send(election.verify_admin_password(password.as_deref(), session));
            }
            Command::SetElectionStatus { status, reply } => {
                let _ = reply.send(election.set_election_status(status));
            }
            Command::SetRoomStatus {
                room_id,
                status,
                reply,
            } => {
                let _ = reply.send(election.set_room_status(&room_id, status));
            }
            Command::AllowVote { room_id, reply } => {
                let result = election.allow_vote(&room_id);
                if let Err(e) = &result {
                    if e.decline_message().is_none() {
                        error!(error = %e, room_id = %room_id, "Failed to allow vote");
                    }
                }
                let _ = reply.send(result);
            }
            Command::Snapshot { reply } => {
                let _ = reply.send(election.snapshot());
            }
            Command::Subscribe { observer } => {
                election.add_observer(observer);
            }
            Command::Disconnect { session } => {
                election.handle_disconnect(session);
            }
            Command::SweepRateLimits => {
                election.sweep_rate_limits();
            }
        }
    }

    debug!("Election actor stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use ballotbox_core::{Database, ElectionConfig};
    use std::sync::{Arc, Mutex};

    fn spawn() -> (ElectionHandle, thread::JoinHandle<()>) {
        let db = Database::open_in_memory().unwrap();
        let election = Election::new(db, ElectionConfig::default()).unwrap();
        ElectionHandle::spawn(election).unwrap()
    }

    #[tokio::test]
    async fn test_commands_reach_election() {
        let (handle, _join) = spawn();
        let session = SessionId::new();

        let reply = handle
            .login(Some("booth1".into()), Some("booth1MITC".into()), session)
            .await
            .unwrap();
        assert!(reply.success);

        assert_eq!(
            handle.allow_vote("room1".into()).await.unwrap(),
            Some(session)
        );

        let snapshot = handle.snapshot().await.unwrap();
        assert_eq!(
            snapshot.room("room1").unwrap().status(),
            RoomStatus::VotingAllowed
        );
    }

    #[tokio::test]
    async fn test_declines_come_back_as_errors() {
        let (handle, _join) = spawn();
        handle
            .set_election_status(ElectionStatus::Closed)
            .await
            .unwrap();

        let err = handle
            .set_election_status(ElectionStatus::Running)
            .await
            .unwrap_err();
        match err {
            Error::Core(e) => assert_eq!(e.decline_message().as_deref(), Some("The election is closed")),
            other => panic!("Unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_subscribed_observer_sees_changes() {
        let (handle, _join) = spawn();
        let seen = Arc::new(Mutex::new(Vec::new()));

        let sink = seen.clone();
        handle
            .subscribe(Box::new(move |s: &StateSnapshot| {
                sink.lock().unwrap().push(s.election_status);
            }))
            .await
            .unwrap();
        handle
            .set_election_status(ElectionStatus::Paused)
            .await
            .unwrap();

        let seen = seen.lock().unwrap();
        assert_eq!(*seen, vec![ElectionStatus::Running, ElectionStatus::Paused]);
    }

    #[tokio::test]
    async fn test_thread_exits_when_handles_drop() {
        let (handle, join) = spawn();
        drop(handle);
        tokio::task::spawn_blocking(move || join.join().unwrap())
            .await
            .unwrap();
    }
}
