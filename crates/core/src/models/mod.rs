//! Data models for Ballotbox

mod audit;
mod candidate;
mod election;
mod room;
mod session;

pub use audit::*;
pub use candidate::*;
pub use election::*;
pub use room::*;
pub use session::*;
