use std::sync::Arc;

use rolewatch_core::{
    config::Config,
    notifier::{RoleWatchNotifier, SentCache},
};
use rolewatch_discord::{DiscordGateway, DiscordRest};

#[tokio::main]
async fn main() -> Result<(), rolewatch_core::Error> {
    rolewatch_core::logging::init("rolewatch")?;

    let cfg = Config::load()?;
    tracing::info!("watching role {}", cfg.watched_role.0);

    let messenger = Arc::new(DiscordRest::new(cfg.api_base.clone(), cfg.bot_token.clone()));
    let sent = Arc::new(SentCache::default());
    let notifier = Arc::new(RoleWatchNotifier::new(cfg.watched_role, messenger, sent));

    let gateway = DiscordGateway::new(cfg.gateway_url.clone(), cfg.bot_token.clone(), notifier);
    gateway
        .run()
        .await
        .map_err(|e| rolewatch_core::Error::External(format!("gateway loop failed: {e}")))?;

    Ok(())
}
