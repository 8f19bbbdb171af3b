use std::{collections::HashSet, sync::Arc};

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::{
    domain::{ConnectedIdentity, MemberSnapshot, RoleId, UserId},
    events::EventHandler,
    messaging::{DirectMessenger, SendError},
};

/// Process-lifetime record of members already welcomed.
///
/// Injected by the host rather than held as ambient state. Append-only: an
/// id goes in at most once, only after a successful send. Never persisted,
/// so a restart can re-welcome a member who toggles the role again.
#[derive(Default)]
pub struct SentCache {
    inner: Mutex<HashSet<UserId>>,
}

impl SentCache {
    pub async fn contains(&self, id: UserId) -> bool {
        self.inner.lock().await.contains(&id)
    }
}

/// Edge detector for the watched role: true only on the 0→1 transition
/// between the two snapshots. Every other role change is ignored.
pub fn role_granted(watched: RoleId, before: &MemberSnapshot, after: &MemberSnapshot) -> bool {
    !before.has_role(watched) && after.has_role(watched)
}

/// Fixed welcome text, parameterized only by the member's display name.
pub fn build_welcome_dm(display_name: &str) -> String {
    format!(
        "👋 Hello **{display_name}**!\n\n\
         Your account is now **verified** ✅\n\n\
         To make sure you don't miss anything, please stay on this server — \
         this is where important announcements, events, and updates are shared.\n\n\
         Welcome aboard! 🎮"
    )
}

/// Sends a one-time welcome DM to any member who newly receives the watched
/// role. The whole program exists for this one rule.
pub struct RoleWatchNotifier {
    watched_role: RoleId,
    messenger: Arc<dyn DirectMessenger>,
    sent: Arc<SentCache>,
}

impl RoleWatchNotifier {
    pub fn new(
        watched_role: RoleId,
        messenger: Arc<dyn DirectMessenger>,
        sent: Arc<SentCache>,
    ) -> Self {
        Self {
            watched_role,
            messenger,
            sent,
        }
    }
}

#[async_trait]
impl EventHandler for RoleWatchNotifier {
    async fn on_ready(&self, identity: &ConnectedIdentity) {
        tracing::info!("connected as {} (id {})", identity.tag, identity.id.0);
    }

    async fn on_member_update(&self, before: &MemberSnapshot, after: &MemberSnapshot) {
        if !role_granted(self.watched_role, before, after) {
            return;
        }

        // Lock held across check, send, and insert so two updates for the
        // same member cannot both pass the already-sent check.
        let mut sent = self.sent.inner.lock().await;
        if sent.contains(&after.id) {
            return;
        }

        let text = build_welcome_dm(&after.display_name);
        match self.messenger.send_direct_message(after, &text).await {
            Ok(()) => {
                sent.insert(after.id);
                tracing::info!("welcome DM sent to {} ({})", after.display_name, after.id.0);
            }
            // Not recorded as sent: a later remove/re-add of the role will
            // try again.
            Err(SendError::Forbidden) => {
                tracing::warn!(
                    "cannot DM {} ({}): DMs closed",
                    after.display_name,
                    after.id.0
                );
            }
            Err(SendError::Other(detail)) => {
                tracing::error!(
                    "error while DMing {} ({}): {detail}",
                    after.display_name,
                    after.id.0
                );
            }
        }
    }
}
