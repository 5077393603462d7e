//! Ballotbox Network Library
//!
//! TCP transport between the election and its booth terminals and admin
//! panels.
//!
//! # Architecture
//!
//! - **Actor**: the election runs on its own thread behind an [`ElectionHandle`]
//! - **Server**: accepts connections, forwards requests, fans out state
//! - **Client**: connects a booth or admin panel to the server
//! - **Protocol**: Length-prefixed JSON messages
//!
//! # Usage
//!
//! ```ignore
//! let (handle, _thread) = ElectionHandle::spawn(election)?;
//! let server = Server::start(ServerOptions::default(), handle).await?;
//!
//! let mut client = Client::connect(server.addr()).await?;
//! client.login("booth1", "booth1MITC").await?;
//! while let Some(event) = client.next_event().await {
//!     match event {
//!         ClientEvent::VoteAllowed => { /* show the ballot */ }
//!         _ => {}
//!     }
//! }
//! ```

pub mod actor;
pub mod client;
pub mod error;
mod frame;
pub mod protocol;
pub mod server;

pub use actor::ElectionHandle;
pub use client::{Client, ClientEvent, ConnectionState};
pub use error::{Error, Result};
pub use protocol::Message;
pub use server::{Server, ServerOptions};

/// Default port for Ballotbox servers
pub const DEFAULT_PORT: u16 = 3001;
