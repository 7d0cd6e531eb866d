//! Group membership capability.

use std::convert::Infallible;
use std::error::Error;
use std::sync::Arc;

use ahash::{AHashMap, AHashSet};

/// Resolves a group id to the ids of its member users.
///
/// Implementations report lookup failures as `Err`; the resolver treats a
/// failed group as having no members.
pub trait GroupMembership {
    type Error: Error;

    fn members(&self, group_id: &str) -> Result<AHashSet<String>, Self::Error>;
}

impl<M: GroupMembership + ?Sized> GroupMembership for &M {
    type Error = M::Error;

    fn members(&self, group_id: &str) -> Result<AHashSet<String>, Self::Error> {
        (**self).members(group_id)
    }
}

impl<M: GroupMembership + ?Sized> GroupMembership for Arc<M> {
    type Error = M::Error;

    fn members(&self, group_id: &str) -> Result<AHashSet<String>, Self::Error> {
        (**self).members(group_id)
    }
}

/// In-memory membership table. Unknown groups have no members.
#[derive(Debug, Clone, Default)]
pub struct StaticMembership {
    groups: AHashMap<String, AHashSet<String>>,
}

impl StaticMembership {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_group<I, S>(mut self, group_id: &str, members: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.groups
            .entry(group_id.to_string())
            .or_default()
            .extend(members.into_iter().map(Into::into));
        self
    }
}

impl GroupMembership for StaticMembership {
    type Error = Infallible;

    fn members(&self, group_id: &str) -> Result<AHashSet<String>, Self::Error> {
        Ok(self.groups.get(group_id).cloned().unwrap_or_default())
    }
}
