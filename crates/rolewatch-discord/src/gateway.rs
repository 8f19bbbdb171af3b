//! Gateway websocket client.
//!
//! Connects, identifies with the member intents, heartbeats, and dispatches
//! the consumed event kinds into an [`EventHandler`]. Events are handled one
//! at a time in arrival order, inline on the read task. A dropped connection
//! is answered with a fresh identify after a short pause; nothing here is
//! fatal once configuration has loaded.

use std::{sync::Arc, time::Duration};

use anyhow::{bail, ensure, Context};
use futures_util::{SinkExt, StreamExt};
use tokio::time::{interval, sleep, MissedTickBehavior};
use tokio_tungstenite::{connect_async, tungstenite::Message};

use rolewatch_core::{
    domain::{GuildId, UserId},
    events::EventHandler,
};

use crate::{cache::MemberCache, wire};

/// Pause before re-identifying after a dropped connection.
const RECONNECT_DELAY: Duration = Duration::from_secs(5);

pub struct DiscordGateway {
    url: String,
    token: String,
    handler: Arc<dyn EventHandler>,
}

impl DiscordGateway {
    pub fn new(url: impl Into<String>, token: impl Into<String>, handler: Arc<dyn EventHandler>) -> Self {
        Self {
            url: url.into(),
            token: token.into(),
            handler,
        }
    }

    /// Run the connect/dispatch loop. Does not return in normal operation.
    ///
    /// The member cache outlives individual connections: a reconnect
    /// re-seeds it from guild-create, and entries from the previous
    /// connection keep before-snapshots available in the meantime.
    pub async fn run(&self) -> anyhow::Result<()> {
        let mut cache = MemberCache::default();
        loop {
            match self.run_connection(&mut cache).await {
                Ok(()) => tracing::warn!("gateway connection closed, reconnecting"),
                Err(e) => tracing::warn!("gateway connection failed: {e:#}, reconnecting"),
            }
            sleep(RECONNECT_DELAY).await;
        }
    }

    async fn run_connection(&self, cache: &mut MemberCache) -> anyhow::Result<()> {
        let (ws, _) = connect_async(self.url.as_str())
            .await
            .context("gateway connect failed")?;
        let (mut write, mut read) = ws.split();

        // The gateway speaks first: HELLO carries the heartbeat interval.
        let first = read
            .next()
            .await
            .context("socket closed before hello")?
            .context("socket error before hello")?;
        let Message::Text(text) = first else {
            bail!("unexpected non-text frame before hello");
        };
        let frame: wire::GatewayFrame =
            serde_json::from_str(&text).context("unparseable hello frame")?;
        ensure!(
            frame.op == wire::opcode::HELLO,
            "expected hello, got op {}",
            frame.op
        );
        let hello: wire::Hello =
            serde_json::from_value(frame.d).context("bad hello payload")?;

        let identify = serde_json::json!({
            "op": wire::opcode::IDENTIFY,
            "d": {
                "token": self.token,
                "intents": wire::INTENTS,
                "properties": {
                    "os": std::env::consts::OS,
                    "browser": "rolewatch",
                    "device": "rolewatch",
                },
            },
        });
        write
            .send(Message::Text(identify.to_string()))
            .await
            .context("identify send failed")?;

        let mut last_seq: Option<u64> = None;
        let mut heartbeat = interval(Duration::from_millis(hello.heartbeat_interval));
        heartbeat.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The interval's first tick completes immediately, which the gateway
        // accepts as an early heartbeat.

        loop {
            tokio::select! {
                _ = heartbeat.tick() => {
                    let hb = serde_json::json!({ "op": wire::opcode::HEARTBEAT, "d": last_seq });
                    write
                        .send(Message::Text(hb.to_string()))
                        .await
                        .context("heartbeat send failed")?;
                }
                msg = read.next() => {
                    let Some(msg) = msg else {
                        return Ok(());
                    };
                    match msg.context("socket error")? {
                        Message::Text(text) => {
                            let frame: wire::GatewayFrame = match serde_json::from_str(&text) {
                                Ok(f) => f,
                                Err(e) => {
                                    tracing::debug!("skipping unparseable gateway frame: {e}");
                                    continue;
                                }
                            };
                            if let Some(s) = frame.s {
                                last_seq = Some(s);
                            }
                            match frame.op {
                                wire::opcode::DISPATCH => {
                                    self.dispatch(frame.t.as_deref(), frame.d, cache).await;
                                }
                                wire::opcode::HEARTBEAT => {
                                    let hb = serde_json::json!({ "op": wire::opcode::HEARTBEAT, "d": last_seq });
                                    write
                                        .send(Message::Text(hb.to_string()))
                                        .await
                                        .context("requested heartbeat send failed")?;
                                }
                                wire::opcode::RECONNECT => {
                                    tracing::warn!("gateway requested reconnect");
                                    return Ok(());
                                }
                                wire::opcode::INVALID_SESSION => {
                                    tracing::warn!("gateway invalidated the session");
                                    return Ok(());
                                }
                                wire::opcode::HEARTBEAT_ACK => {}
                                other => tracing::debug!("ignoring gateway op {other}"),
                            }
                        }
                        Message::Ping(data) => {
                            let _ = write.send(Message::Pong(data)).await;
                        }
                        Message::Close(_) => return Ok(()),
                        _ => {}
                    }
                }
            }
        }
    }

    /// Route one dispatch event. Payloads that fail to parse are logged and
    /// dropped; a malformed event must not take the connection down.
    async fn dispatch(&self, kind: Option<&str>, data: serde_json::Value, cache: &mut MemberCache) {
        match kind {
            Some("READY") => match serde_json::from_value::<wire::Ready>(data) {
                Ok(ready) => self.handler.on_ready(&ready.identity()).await,
                Err(e) => tracing::debug!("bad READY payload: {e}"),
            },
            Some("GUILD_CREATE") => match serde_json::from_value::<wire::GuildCreate>(data) {
                Ok(guild) => {
                    let gid = GuildId(guild.id);
                    for m in &guild.members {
                        cache.insert(gid, m.snapshot());
                    }
                    tracing::info!(
                        "guild {} available, {} members cached",
                        guild.id,
                        guild.members.len()
                    );
                }
                Err(e) => tracing::debug!("bad GUILD_CREATE payload: {e}"),
            },
            Some("GUILD_MEMBER_ADD") => match serde_json::from_value::<wire::MemberEvent>(data) {
                Ok(ev) => cache.insert(GuildId(ev.guild_id), ev.snapshot()),
                Err(e) => tracing::debug!("bad GUILD_MEMBER_ADD payload: {e}"),
            },
            Some("GUILD_MEMBER_REMOVE") => {
                match serde_json::from_value::<wire::MemberRemove>(data) {
                    Ok(ev) => cache.remove(GuildId(ev.guild_id), UserId(ev.user.id)),
                    Err(e) => tracing::debug!("bad GUILD_MEMBER_REMOVE payload: {e}"),
                }
            }
            Some("GUILD_MEMBER_UPDATE") => match serde_json::from_value::<wire::MemberEvent>(data) {
                Ok(ev) => {
                    let after = ev.snapshot();
                    // The wire has no before-state; the cache does. A member
                    // we have never seen is cached but not dispatched.
                    match cache.replace(GuildId(ev.guild_id), after.clone()) {
                        Some(before) => self.handler.on_member_update(&before, &after).await,
                        None => {}
                    }
                }
                Err(e) => tracing::debug!("bad GUILD_MEMBER_UPDATE payload: {e}"),
            },
            _ => {}
        }
    }
}
