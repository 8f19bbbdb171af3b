use async_trait::async_trait;

use crate::domain::{ConnectedIdentity, MemberSnapshot};

/// Subscription interface the gateway host dispatches into.
///
/// One method per consumed event kind, each taking immutable event data.
/// The host drives this from its own event loop; handlers keep whatever
/// state they need behind `&self`.
#[async_trait]
pub trait EventHandler: Send + Sync {
    /// Gateway connection established; `identity` is the logged-in bot user.
    async fn on_ready(&self, identity: &ConnectedIdentity);

    /// A member's state changed. `before` and `after` are snapshots of the
    /// same member around the change.
    async fn on_member_update(&self, before: &MemberSnapshot, after: &MemberSnapshot);
}
