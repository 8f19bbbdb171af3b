//! Gateway wire payloads — the subset this bot consumes.
//!
//! Snowflake ids arrive as decimal strings on the wire and are parsed into
//! `u64` during deserialization. Unknown fields are ignored throughout.

use std::collections::HashSet;

use serde::{Deserialize, Deserializer};

use rolewatch_core::domain::{ConnectedIdentity, MemberSnapshot, RoleId, UserId};

/// Gateway intents requested at identify: GUILDS for guild lifecycle and
/// member-list seeding, GUILD_MEMBERS for member add/remove/update.
pub const INTENTS: u64 = (1 << 0) | (1 << 1);

pub mod opcode {
    pub const DISPATCH: u8 = 0;
    pub const HEARTBEAT: u8 = 1;
    pub const IDENTIFY: u8 = 2;
    pub const RECONNECT: u8 = 7;
    pub const INVALID_SESSION: u8 = 9;
    pub const HELLO: u8 = 10;
    pub const HEARTBEAT_ACK: u8 = 11;
}

/// Outer gateway frame: opcode, payload, sequence number, dispatch type.
#[derive(Debug, Deserialize)]
pub struct GatewayFrame {
    pub op: u8,
    #[serde(default)]
    pub d: serde_json::Value,
    #[serde(default)]
    pub s: Option<u64>,
    #[serde(default)]
    pub t: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Hello {
    pub heartbeat_interval: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct User {
    #[serde(deserialize_with = "snowflake")]
    pub id: u64,
    pub username: String,
    #[serde(default)]
    pub global_name: Option<String>,
    #[serde(default)]
    pub discriminator: Option<String>,
}

impl User {
    /// Legacy `name#discriminator` tag, or the plain username once the
    /// account has migrated off discriminators.
    pub fn tag(&self) -> String {
        match self.discriminator.as_deref() {
            Some(d) if !d.is_empty() && d != "0" => format!("{}#{d}", self.username),
            _ => self.username.clone(),
        }
    }
}

/// Display name precedence: guild nickname, else global display name, else
/// username.
pub fn display_name(user: &User, nick: Option<&str>) -> String {
    nick.map(str::to_string)
        .or_else(|| user.global_name.clone())
        .unwrap_or_else(|| user.username.clone())
}

#[derive(Debug, Deserialize)]
pub struct Ready {
    pub user: User,
}

impl Ready {
    pub fn identity(&self) -> ConnectedIdentity {
        ConnectedIdentity {
            id: UserId(self.user.id),
            tag: self.user.tag(),
        }
    }
}

/// `GUILD_CREATE` with the embedded member list that seeds the cache.
#[derive(Debug, Deserialize)]
pub struct GuildCreate {
    #[serde(deserialize_with = "snowflake")]
    pub id: u64,
    #[serde(default)]
    pub members: Vec<GuildMember>,
}

/// Member object as nested in a guild payload (no guild id of its own).
#[derive(Debug, Deserialize)]
pub struct GuildMember {
    pub user: User,
    #[serde(default)]
    pub nick: Option<String>,
    #[serde(default, deserialize_with = "snowflake_list")]
    pub roles: Vec<u64>,
}

impl GuildMember {
    pub fn snapshot(&self) -> MemberSnapshot {
        snapshot(&self.user, self.nick.as_deref(), &self.roles)
    }
}

/// `GUILD_MEMBER_ADD` / `GUILD_MEMBER_UPDATE`: the member's new state plus
/// the guild it belongs to. The wire carries no before-state.
#[derive(Debug, Deserialize)]
pub struct MemberEvent {
    #[serde(deserialize_with = "snowflake")]
    pub guild_id: u64,
    pub user: User,
    #[serde(default)]
    pub nick: Option<String>,
    #[serde(default, deserialize_with = "snowflake_list")]
    pub roles: Vec<u64>,
}

impl MemberEvent {
    pub fn snapshot(&self) -> MemberSnapshot {
        snapshot(&self.user, self.nick.as_deref(), &self.roles)
    }
}

#[derive(Debug, Deserialize)]
pub struct MemberRemove {
    #[serde(deserialize_with = "snowflake")]
    pub guild_id: u64,
    pub user: User,
}

fn snapshot(user: &User, nick: Option<&str>, roles: &[u64]) -> MemberSnapshot {
    MemberSnapshot {
        id: UserId(user.id),
        display_name: display_name(user, nick),
        roles: roles.iter().copied().map(RoleId).collect::<HashSet<_>>(),
    }
}

fn snowflake<'de, D>(de: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(de)?;
    raw.parse::<u64>()
        .map_err(|_| serde::de::Error::custom(format!("invalid snowflake: {raw}")))
}

fn snowflake_list<'de, D>(de: D) -> Result<Vec<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Vec::<String>::deserialize(de)?;
    raw.iter()
        .map(|s| {
            s.parse::<u64>()
                .map_err(|_| serde::de::Error::custom(format!("invalid snowflake: {s}")))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn member_update_payload_parses() {
        let json = r#"{
            "guild_id": "400063",
            "roles": ["111", "999"],
            "nick": "Kara",
            "user": {
                "id": "42",
                "username": "kara_dev",
                "global_name": "Kara D.",
                "discriminator": "0"
            },
            "avatar": "ignored"
        }"#;

        let ev: MemberEvent = serde_json::from_str(json).unwrap();
        assert_eq!(ev.guild_id, 400063);

        let snap = ev.snapshot();
        assert_eq!(snap.id, UserId(42));
        assert_eq!(snap.display_name, "Kara");
        assert!(snap.roles.contains(&RoleId(999)));
        assert!(snap.roles.contains(&RoleId(111)));
        assert_eq!(snap.roles.len(), 2);
    }

    #[test]
    fn display_name_falls_back_global_then_username() {
        let mut user = User {
            id: 1,
            username: "kara_dev".to_string(),
            global_name: Some("Kara D.".to_string()),
            discriminator: None,
        };

        assert_eq!(display_name(&user, Some("Kara")), "Kara");
        assert_eq!(display_name(&user, None), "Kara D.");

        user.global_name = None;
        assert_eq!(display_name(&user, None), "kara_dev");
    }

    #[test]
    fn tag_keeps_legacy_discriminator_only() {
        let mut user = User {
            id: 1,
            username: "oldbot".to_string(),
            global_name: None,
            discriminator: Some("1234".to_string()),
        };
        assert_eq!(user.tag(), "oldbot#1234");

        user.discriminator = Some("0".to_string());
        assert_eq!(user.tag(), "oldbot");

        user.discriminator = None;
        assert_eq!(user.tag(), "oldbot");
    }

    #[test]
    fn bad_snowflake_is_a_parse_error() {
        let json = r#"{"guild_id": "not-a-number", "user": {"id": "1", "username": "u"}}"#;
        assert!(serde_json::from_str::<MemberRemove>(json).is_err());
    }

    #[test]
    fn frame_defaults_tolerate_missing_fields() {
        let frame: GatewayFrame = serde_json::from_str(r#"{"op": 11}"#).unwrap();
        assert_eq!(frame.op, opcode::HEARTBEAT_ACK);
        assert!(frame.s.is_none());
        assert!(frame.t.is_none());
        assert!(frame.d.is_null());
    }
}
