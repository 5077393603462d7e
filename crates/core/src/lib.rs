//! Ballotbox Core Library
//!
//! Election state machine, security primitives, models, and storage for
//! the Ballotbox voting backend.

pub mod audit;
pub mod config;
pub mod election;
pub mod error;
pub mod invariants;
pub mod models;
pub mod observer;
pub mod password;
pub mod rate_limit;
pub mod registry;
pub mod storage;
pub mod validation;

pub use audit::{AuditRecorder, AUDIT_VIEW_LIMIT};
pub use config::{BoothAccount, ElectionConfig, RateLimits, RoomConfig};
pub use election::Election;
pub use error::{Decline, Error, LimitedAction, Result};
pub use models::*;
pub use observer::StateObserver;
pub use rate_limit::{RateLimitPolicy, RateLimiter};
pub use registry::{CandidateRegistry, RoomRegistry};
pub use storage::{AuditRepository, CandidateRepository, Database, Storage};
