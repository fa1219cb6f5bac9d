use std::sync::Arc;

use crate::entity::Instance;

/// Observer of a live entity instance.
///
/// The four notification hooks default to no-ops so implementations only
/// override what they care about. The two listenee hooks are bookkeeping:
/// the instance calls them symmetrically from `add_listener`,
/// `remove_listener` and `delete`, and most implementations maintain a set of
/// observed instances there. Holding the instance in that set keeps it — and
/// its identity-map entry — alive.
///
/// No ordering is guaranteed between listeners of one instance, and no
/// delivery ordering relative to storage commit beyond "the triggering call
/// was awaited first".
pub trait Listener: Send + Sync {
    /// The instance was updated in the backing store.
    fn updated(&self, _instance: &Arc<Instance>) {}

    /// The instance was deleted from the backing store. Fired exactly once;
    /// the instance unregisters every listener right after the fan-out.
    fn deleted(&self, _instance: &Arc<Instance>) {}

    /// `referrer` now holds a foreign key to `instance`.
    fn reference_added(&self, _instance: &Arc<Instance>, _referrer: &Arc<Instance>) {}

    /// `referrer` no longer holds a foreign key to `instance`.
    fn reference_removed(&self, _instance: &Arc<Instance>, _referrer: &Arc<Instance>) {}

    /// Bookkeeping: this listener was registered on `instance`.
    fn listenee_added(&self, _instance: &Arc<Instance>) {}

    /// Bookkeeping: this listener was unregistered from `instance`.
    fn listenee_removed(&self, _instance: &Arc<Instance>) {}
}
