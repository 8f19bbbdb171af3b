//! Member-state cache.
//!
//! Update events only carry the member's new state on the wire; the
//! before-snapshot comes from here. Seeded by guild-create member lists and
//! member-add events. Single writer: the gateway read task.

use std::collections::HashMap;

use rolewatch_core::domain::{GuildId, MemberSnapshot, UserId};

#[derive(Default)]
pub struct MemberCache {
    inner: HashMap<(GuildId, UserId), MemberSnapshot>,
}

impl MemberCache {
    pub fn insert(&mut self, guild: GuildId, snapshot: MemberSnapshot) {
        self.inner.insert((guild, snapshot.id), snapshot);
    }

    pub fn remove(&mut self, guild: GuildId, user: UserId) {
        self.inner.remove(&(guild, user));
    }

    /// Record `after` and return the snapshot it replaced, if any.
    pub fn replace(&mut self, guild: GuildId, after: MemberSnapshot) -> Option<MemberSnapshot> {
        self.inner.insert((guild, after.id), after)
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}
