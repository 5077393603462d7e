//! State change subscription

use crate::models::StateSnapshot;

/// Receives the full public state after every mutating action.
///
/// Observers run synchronously on the thread that owns the election, so
/// implementations should hand the snapshot off rather than block.
pub trait StateObserver: Send {
    fn state_changed(&self, snapshot: &StateSnapshot);
}

impl<F> StateObserver for F
where
    F: Fn(&StateSnapshot) + Send,
{
    fn state_changed(&self, snapshot: &StateSnapshot) {
        self(snapshot)
    }
}
