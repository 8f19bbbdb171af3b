use std::collections::HashSet;

/// Discord user id (numeric snowflake).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct UserId(pub u64);

/// Discord role id (numeric snowflake).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct RoleId(pub u64);

/// Discord guild id (numeric snowflake).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct GuildId(pub u64);

/// One member as observed at a single instant: identity, display name, and
/// the full set of roles held at that moment. The platform owns and mutates
/// members; this program only ever sees snapshots.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MemberSnapshot {
    pub id: UserId,
    pub display_name: String,
    pub roles: HashSet<RoleId>,
}

impl MemberSnapshot {
    pub fn has_role(&self, role: RoleId) -> bool {
        self.roles.contains(&role)
    }
}

/// The bot's own identity as reported by the gateway on ready.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConnectedIdentity {
    pub id: UserId,
    pub tag: String,
}
