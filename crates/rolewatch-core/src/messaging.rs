use async_trait::async_trait;

use crate::domain::MemberSnapshot;

/// Delivery failure classification for direct messages.
///
/// `Forbidden` is the recipient-side rejection (the member disallows DMs
/// from this sender); everything else is carried as `Other` with detail for
/// the logs. Neither is fatal and neither is retried.
#[derive(Debug, thiserror::Error)]
pub enum SendError {
    #[error("recipient does not accept direct messages")]
    Forbidden,

    #[error("{0}")]
    Other(String),
}

/// Outbound direct-message port.
///
/// Discord REST is the first implementation; the shape leaves room for other
/// platforms behind the same interface.
#[async_trait]
pub trait DirectMessenger: Send + Sync {
    async fn send_direct_message(
        &self,
        member: &MemberSnapshot,
        text: &str,
    ) -> Result<(), SendError>;
}
