/// Core error type.
///
/// Adapter crates map their specific errors into this type so the host can
/// handle failures consistently. Delivery failures are deliberately NOT here:
/// they are the `messaging::SendError` port type, inspected by the notifier
/// and never surfaced past it.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("config error: {0}")]
    Config(String),

    #[error("external error: {0}")]
    External(String),
}

pub type Result<T> = std::result::Result<T, Error>;
