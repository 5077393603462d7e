//! Election state machine
//!
//! Owns the election-wide status, the booth registry, the candidate
//! registry and the in-memory audit view. Every public action runs to
//! completion on the caller's thread and ends by pushing a full
//! [`StateSnapshot`] to each subscribed [`StateObserver`].
//!
//! Domain rejections come back as declined replies; storage and other
//! internal failures are logged and replaced by a generic message.

use chrono::Utc;
use tracing::{debug, error, info, instrument, warn};

use crate::audit::AuditRecorder;
use crate::config::ElectionConfig;
use crate::error::{Decline, Error, LimitedAction, Result};
use crate::invariants;
use crate::models::{
    actions, AdminReply, Candidate, ElectionStatus, LoginReply, Room, RoomIdentity, RoomStatus,
    SessionId, StateSnapshot, VoteReply,
};
use crate::observer::StateObserver;
use crate::password::{looks_like_hash, verify_password, verify_stored};
use crate::rate_limit::RateLimiter;
use crate::registry::{CandidateRegistry, RoomRegistry};
use crate::storage::Storage;
use crate::validation::{sanitize, validate_username};

const LOGIN_FAILURE: &str = "An unexpected error occurred during login.";
const VOTE_FAILURE: &str = "An unexpected error occurred while casting the vote.";
const ADMIN_FAILURE: &str = "An unexpected error occurred during admin verification.";

pub struct Election<S: Storage> {
    storage: S,
    config: ElectionConfig,
    status: ElectionStatus,
    rooms: RoomRegistry,
    candidates: CandidateRegistry,
    audit: AuditRecorder,
    limiter: RateLimiter,
    observers: Vec<Box<dyn StateObserver>>,
}

impl<S: Storage> Election<S> {
    /// Build the election from static configuration and stored data
    #[instrument(skip_all)]
    pub fn new(storage: S, config: ElectionConfig) -> Result<Self> {
        let mut election = Self {
            rooms: RoomRegistry::new(config.build_rooms()),
            audit: AuditRecorder::new(config.audit_view_limit),
            storage,
            config,
            status: ElectionStatus::Running,
            candidates: CandidateRegistry::default(),
            limiter: RateLimiter::new(),
            observers: Vec::new(),
        };
        election.load_from_storage()?;

        info!(
            rooms = election.rooms.len(),
            candidates = election.candidates.len(),
            audit_entries = election.audit.len(),
            "Election state loaded"
        );
        Ok(election)
    }

    /// Return to the startup state: election running, every room offline
    /// and unbound, limiter empty, views reloaded from storage.
    pub fn reset(&mut self) -> Result<()> {
        self.status = ElectionStatus::Running;
        self.rooms = RoomRegistry::new(self.config.build_rooms());
        self.audit = AuditRecorder::new(self.config.audit_view_limit);
        self.limiter.clear();
        self.load_from_storage()?;
        self.notify();
        Ok(())
    }

    fn load_from_storage(&mut self) -> Result<()> {
        self.candidates = CandidateRegistry::new(self.storage.list_candidates()?);
        self.audit
            .load(self.storage.recent_audit(self.config.audit_view_limit)?);
        Ok(())
    }

    /// Register an observer; it immediately receives the current state
    pub fn subscribe<O: StateObserver + 'static>(&mut self, observer: O) {
        self.add_observer(Box::new(observer));
    }

    pub fn add_observer(&mut self, observer: Box<dyn StateObserver>) {
        observer.state_changed(&self.snapshot());
        self.observers.push(observer);
    }

    pub fn snapshot(&self) -> StateSnapshot {
        StateSnapshot {
            election_status: self.status,
            rooms: self.rooms.all().to_vec(),
            candidates: self.candidates.all().to_vec(),
            audit_log: self.audit.entries(),
        }
    }

    fn notify(&self) {
        let snapshot = self.snapshot();
        invariants::assert_room_list_invariants(&snapshot.rooms);
        invariants::assert_audit_view_invariants(&snapshot.audit_log, self.audit.limit());

        for observer in &self.observers {
            observer.state_changed(&snapshot);
        }
    }

    pub fn status(&self) -> ElectionStatus {
        self.status
    }

    pub fn room(&self, room_id: &str) -> Option<&Room> {
        self.rooms.get(room_id)
    }

    pub fn rooms(&self) -> &[Room] {
        self.rooms.all()
    }

    pub fn candidates(&self) -> &[Candidate] {
        self.candidates.all()
    }

    pub fn config(&self) -> &ElectionConfig {
        &self.config
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Persist an audit entry, then record it in the in-memory view
    fn log_action(&mut self, action: &str, details: &str) -> Result<()> {
        let entry = self.storage.append_audit(action, details)?;
        self.audit.record(entry);
        Ok(())
    }

    // ------------------------------------------------------------------
    // Booth login
    // ------------------------------------------------------------------

    pub fn login(
        &mut self,
        username: Option<&str>,
        password: Option<&str>,
        session: SessionId,
    ) -> LoginReply {
        match self.try_login(username, password, session) {
            Ok(room) => LoginReply::accepted(room),
            Err(Error::Declined(decline)) => LoginReply::declined(decline.to_string()),
            Err(e) => {
                error!(error = %e, session_id = %session, "Unexpected error during login");
                LoginReply::declined(LOGIN_FAILURE)
            }
        }
    }

    fn try_login(
        &mut self,
        username: Option<&str>,
        password: Option<&str>,
        session: SessionId,
    ) -> Result<RoomIdentity> {
        let key = format!("login_{}", session);
        if self.limiter.check(&key, self.config.rate_limits.login) {
            self.log_action(
                actions::LOGIN_RATE_LIMITED,
                &format!("Rate limit exceeded for session: {}", session),
            )?;
            warn!(security = true, session_id = %session, "Login rate limit exceeded");
            return Err(Decline::RateLimited(LimitedAction::Login).into());
        }

        if let Err(message) = validate_username(username) {
            warn!(security = true, session_id = %session, error = message, "Invalid username format in login attempt");
            return Err(Decline::InvalidInput(message.to_string()).into());
        }

        let username = sanitize(username);
        let password = sanitize(password);

        match self.status {
            ElectionStatus::Closed => {
                warn!(security = true, username = %username, "Login attempt during closed election");
                return Err(Decline::ElectionClosed.into());
            }
            ElectionStatus::Paused => {
                info!(username = %username, "Login attempt during paused election");
                return Err(Decline::ElectionPaused.into());
            }
            ElectionStatus::Running => {}
        }

        let Some(account) = self.config.find_booth(&username).cloned() else {
            self.log_action(
                actions::LOGIN_FAILED,
                &format!("Failed login attempt for username: {}", username),
            )?;
            warn!(security = true, username = %username, "Login attempt with non-existent username");
            return Err(Decline::InvalidCredentials.into());
        };

        if !verify_stored(&password, &account.password, &account.username) {
            self.log_action(
                actions::LOGIN_FAILED,
                &format!("Failed login attempt for username: {}", username),
            )?;
            error!(security = true, username = %username, "Login attempt with invalid password");
            return Err(Decline::InvalidCredentials.into());
        }

        let (target_status, target_name) = match self.rooms.get(&account.room_id) {
            Some(room) => (room.status(), room.name.clone()),
            None => {
                error!(
                    room_id = %account.room_id,
                    username = %username,
                    "Room configuration error during login"
                );
                return Err(Decline::RoomNotFound(account.room_id.clone()).into());
            }
        };

        if target_status == RoomStatus::Disabled {
            warn!(security = true, room_id = %account.room_id, username = %username, "Login attempt to disabled room");
            return Err(Decline::RoomDisabled.into());
        }

        // Nothing in memory changes until the entry is stored
        let entry = self.storage.append_audit(
            actions::LOGIN_SUCCESS,
            &format!("Room \"{}\" logged in successfully", target_name),
        )?;

        // A connection drives one booth; drop any other room it held
        if let Some(other) = self.rooms.find_by_session_mut(session) {
            if other.id != account.room_id {
                warn!(room_id = %other.id, session_id = %session, "Session moved to another booth");
                other.release_session();
                other.set_status(RoomStatus::Offline, Utc::now());
            }
        }

        let room = self
            .rooms
            .get_mut(&account.room_id)
            .ok_or_else(|| Decline::RoomNotFound(account.room_id.clone()))?;

        if let Some(previous) = room.bind_session(session) {
            if previous != session {
                warn!(
                    room_id = %room.id,
                    old_session = %previous,
                    new_session = %session,
                    "Room already had an active session; replacing it"
                );
            }
        }

        // Reconnecting booths keep VOTING_ALLOWED / PAUSED
        if room.status() == RoomStatus::Offline {
            room.set_status(RoomStatus::Waiting, Utc::now());
        }
        let identity = room.identity();

        self.audit.record(entry);
        info!(room_id = %identity.id, session_id = %session, "Room logged in");
        self.notify();
        Ok(identity)
    }

    // ------------------------------------------------------------------
    // Voting
    // ------------------------------------------------------------------

    pub fn cast_vote(&mut self, room_id: &str, candidate_id: &str, session: SessionId) -> VoteReply {
        match self.try_cast_vote(room_id, candidate_id, session) {
            Ok(()) => VoteReply::accepted(),
            Err(Error::Declined(decline)) => VoteReply::declined(decline.to_string()),
            Err(e) => {
                error!(error = %e, room_id, session_id = %session, "Unexpected error during vote casting");
                VoteReply::declined(VOTE_FAILURE)
            }
        }
    }

    fn try_cast_vote(&mut self, room_id: &str, candidate_id: &str, session: SessionId) -> Result<()> {
        let key = format!("vote_{}", session);
        if self.limiter.check(&key, self.config.rate_limits.vote) {
            self.log_action(
                actions::VOTE_RATE_LIMITED,
                &format!("Rate limit exceeded for room: {}", room_id),
            )?;
            warn!(security = true, room_id, session_id = %session, "Vote rate limit exceeded");
            return Err(Decline::RateLimited(LimitedAction::Vote).into());
        }

        let Some(room) = self.rooms.get(room_id) else {
            error!(room_id, session_id = %session, "Vote attempt for non-existent room");
            return Err(Decline::RoomNotFound(room_id.to_string()).into());
        };

        if room.session() != Some(session) {
            error!(
                security = true,
                room_id,
                expected_session = ?room.session(),
                actual_session = %session,
                "Unauthorized vote attempt"
            );
            return Err(Decline::Unauthorized.into());
        }

        if room.status() != RoomStatus::VotingAllowed {
            warn!(room_id, status = %room.status(), "Vote attempt when room not in voting mode");
            return Err(Decline::NotVoting(room.status()).into());
        }
        let room_name = room.name.clone();

        let Some(candidate) = self.candidates.find(candidate_id).cloned() else {
            error!(candidate_id, session_id = %session, "Vote attempt for invalid candidate");
            return Err(Decline::CandidateNotFound(candidate_id.to_string()).into());
        };

        // Tally and audit entry are stored together before memory changes
        let details = format!(
            "Room \"{}\" voted for candidate: {}",
            room_name,
            candidate.label()
        );
        let (stored, entry) = self
            .storage
            .record_vote(candidate.id, actions::VOTE_CAST, &details)?;
        if !stored {
            warn!(candidate_id = candidate.id, "Candidate missing from store; counted in memory only");
        }
        self.candidates.record_vote(candidate.id);
        self.rooms
            .set_status(room_id, RoomStatus::Waiting, Utc::now());
        self.audit.record(entry);

        info!(room_id, candidate_id = candidate.id, "Vote cast");
        self.notify();
        Ok(())
    }

    // ------------------------------------------------------------------
    // Admin
    // ------------------------------------------------------------------

    /// Check the admin password. Touches no voting state.
    pub fn verify_admin_password(&mut self, password: Option<&str>, session: SessionId) -> AdminReply {
        match self.try_verify_admin(password, session) {
            Ok(()) => AdminReply::accepted(),
            Err(Error::Declined(decline)) => AdminReply::declined(decline.to_string()),
            Err(e) => {
                error!(error = %e, session_id = %session, "Unexpected error during admin verification");
                AdminReply::declined(ADMIN_FAILURE)
            }
        }
    }

    fn try_verify_admin(&mut self, password: Option<&str>, session: SessionId) -> Result<()> {
        let key = format!("admin_{}", session);
        if self.limiter.check(&key, self.config.rate_limits.admin) {
            self.log_action(
                actions::ADMIN_RATE_LIMITED,
                &format!("Admin rate limit exceeded for session: {}", session),
            )?;
            self.notify();
            return Err(Decline::RateLimited(LimitedAction::Admin).into());
        }

        let password = sanitize(password);
        let valid = match self.config.admin_password_hash.as_deref() {
            Some(hash) if looks_like_hash(hash) => verify_password(&password, hash),
            _ => match self.config.legacy_admin_password.as_deref() {
                Some(legacy) => {
                    warn!("Admin is using a plain text password; configure admin_password_hash");
                    password == legacy
                }
                None => {
                    error!("No admin credential configured");
                    false
                }
            },
        };

        if valid {
            self.log_action(actions::ADMIN_LOGIN_SUCCESS, "Admin authentication successful")?;
            info!(session_id = %session, "Admin authenticated");
        } else {
            self.log_action(actions::ADMIN_LOGIN_FAILED, "Failed admin authentication attempt")?;
            warn!(security = true, session_id = %session, "Failed admin authentication attempt");
        }
        self.notify();

        if valid {
            Ok(())
        } else {
            Err(Decline::InvalidAdminPassword.into())
        }
    }

    /// Overwrite a room's status. Unknown rooms are declined.
    pub fn set_room_status(&mut self, room_id: &str, status: RoomStatus) -> Result<()> {
        let Some(room) = self.rooms.get(room_id) else {
            warn!(room_id, "Status change for unknown room");
            return Err(Decline::RoomNotFound(room_id.to_string()).into());
        };
        let previous = room.status();

        let audit = match (previous, status) {
            // Post-vote settle, already covered by the vote entry
            (RoomStatus::VotingAllowed, RoomStatus::Waiting) => None,
            (_, RoomStatus::Disabled) => Some((
                actions::BOOTH_DISABLED,
                format!("Voting Booth \"{}\" was disabled.", room.name),
            )),
            (RoomStatus::Disabled, RoomStatus::Offline) => Some((
                actions::BOOTH_ENABLED,
                format!("Voting Booth \"{}\" was enabled.", room.name),
            )),
            _ => None,
        };
        let entry = audit
            .map(|(action, details)| self.storage.append_audit(action, &details))
            .transpose()?;

        self.rooms.set_status(room_id, status, Utc::now());
        if let Some(entry) = entry {
            self.audit.record(entry);
        }
        debug!(room_id, from = %previous, to = %status, "Room status changed");

        self.notify();
        Ok(())
    }

    /// Authorize one vote in a room whose terminal is connected.
    ///
    /// Returns the session to notify, or `None` when no terminal is bound
    /// (nothing changes in that case).
    pub fn allow_vote(&mut self, room_id: &str) -> Result<Option<SessionId>> {
        match self.status {
            ElectionStatus::Closed => return Err(Decline::ElectionClosed.into()),
            ElectionStatus::Paused => return Err(Decline::ElectionPaused.into()),
            ElectionStatus::Running => {}
        }

        let session = self
            .rooms
            .get(room_id)
            .ok_or_else(|| Decline::RoomNotFound(room_id.to_string()))?
            .session();

        match session {
            Some(session) => {
                self.set_room_status(room_id, RoomStatus::VotingAllowed)?;
                info!(room_id, session_id = %session, "Vote allowed");
                Ok(Some(session))
            }
            None => {
                debug!(room_id, "Vote allowed for room without a terminal; ignoring");
                Ok(None)
            }
        }
    }

    /// Change the election-wide status. `Closed` is final.
    pub fn set_election_status(&mut self, status: ElectionStatus) -> Result<()> {
        if self.status == status {
            return Ok(());
        }
        if self.status.is_terminal() {
            warn!(requested = %status, "Election is closed; status change refused");
            return Err(Decline::ElectionClosed.into());
        }

        let (action, details) = match status {
            ElectionStatus::Paused => (actions::ELECTION_PAUSED, "The election was globally paused."),
            ElectionStatus::Running => (actions::ELECTION_RESUMED, "The election was globally resumed."),
            ElectionStatus::Closed => (
                actions::ELECTION_CLOSED,
                "The election was permanently closed. No further voting is possible.",
            ),
        };
        self.log_action(action, details)?;
        self.status = status;
        info!(status = %status, "Election status changed");

        self.notify();
        Ok(())
    }

    /// A transport connection went away
    pub fn handle_disconnect(&mut self, session: SessionId) {
        let Some(room) = self.rooms.find_by_session_mut(session) else {
            return;
        };

        room.set_status(RoomStatus::Offline, Utc::now());
        room.release_session();
        info!(room_id = %room.id, session_id = %session, "Room disconnected");
        self.notify();
    }

    /// Drop expired rate-limit windows
    pub fn sweep_rate_limits(&mut self) -> usize {
        let removed = self.limiter.sweep();
        if removed > 0 {
            debug!(removed, "Swept expired rate limit windows");
        }
        removed
    }
}
