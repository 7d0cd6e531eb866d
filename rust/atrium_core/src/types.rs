//! Domain types shared across atrium_core modules.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

/// Capability level granted to a user or group on a resource.
///
/// Totally ordered: `Read < Write < Manage`. Holding a role implies holding
/// every lower role on the same resource.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Read,
    Write,
    Manage,
}

impl Role {
    /// Does `self` satisfy `required`?
    #[inline]
    pub fn includes(self, required: Role) -> bool {
        self >= required
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Role::Read => "read",
            Role::Write => "write",
            Role::Manage => "manage",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single permission entry: the roles held by one user or one group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Permission {
    pub id: String,
    #[serde(default)]
    pub roles: BTreeSet<Role>,
}

impl Permission {
    pub fn new(id: impl Into<String>, roles: impl IntoIterator<Item = Role>) -> Self {
        Self {
            id: id.into(),
            roles: roles.into_iter().collect(),
        }
    }

    /// True if any held role includes `required`.
    pub fn grants(&self, required: Role) -> bool {
        grants(&self.roles, required)
    }
}

#[inline]
fn grants(roles: &BTreeSet<Role>, required: Role) -> bool {
    // BTreeSet is sorted, so the last role is the highest one held.
    roles.last().is_some_and(|highest| highest.includes(required))
}

/// Wire shape of [`Permissions`]; may contain duplicate ids.
#[derive(Debug, Default, Serialize, Deserialize)]
struct RawPermissions {
    #[serde(default)]
    users: Vec<Permission>,
    #[serde(default)]
    groups: Vec<Permission>,
}

/// User and group permissions of a single resource.
///
/// Holds at most one entry per user id and one per group id. Decoding merges
/// duplicate entries by role union.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RawPermissions", into = "RawPermissions")]
pub struct Permissions {
    users: BTreeMap<String, BTreeSet<Role>>,
    groups: BTreeMap<String, BTreeSet<Role>>,
}

impl From<RawPermissions> for Permissions {
    fn from(raw: RawPermissions) -> Self {
        let mut permissions = Permissions::default();
        for entry in raw.users {
            permissions
                .users
                .entry(entry.id)
                .or_default()
                .extend(entry.roles);
        }
        for entry in raw.groups {
            permissions
                .groups
                .entry(entry.id)
                .or_default()
                .extend(entry.roles);
        }
        permissions
    }
}

impl From<Permissions> for RawPermissions {
    fn from(permissions: Permissions) -> Self {
        RawPermissions {
            users: into_entries(permissions.users),
            groups: into_entries(permissions.groups),
        }
    }
}

fn into_entries(map: BTreeMap<String, BTreeSet<Role>>) -> Vec<Permission> {
    map.into_iter()
        .map(|(id, roles)| Permission { id, roles })
        .collect()
}

impl Permissions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style: grant `roles` to a user, merging with existing roles.
    pub fn with_user(mut self, user_id: &str, roles: impl IntoIterator<Item = Role>) -> Self {
        self.users
            .entry(user_id.to_string())
            .or_default()
            .extend(roles);
        self
    }

    /// Builder-style: grant `roles` to a group, merging with existing roles.
    pub fn with_group(mut self, group_id: &str, roles: impl IntoIterator<Item = Role>) -> Self {
        self.groups
            .entry(group_id.to_string())
            .or_default()
            .extend(roles);
        self
    }

    pub fn user_roles(&self, user_id: &str) -> Option<&BTreeSet<Role>> {
        self.users.get(user_id)
    }

    pub fn group_roles(&self, group_id: &str) -> Option<&BTreeSet<Role>> {
        self.groups.get(group_id)
    }

    /// Does the user directly hold `required` or higher?
    pub fn user_has_role(&self, user_id: &str, required: Role) -> bool {
        self.users
            .get(user_id)
            .is_some_and(|roles| grants(roles, required))
    }

    /// Does the group hold `required` or higher?
    pub fn group_has_role(&self, group_id: &str, required: Role) -> bool {
        self.groups
            .get(group_id)
            .is_some_and(|roles| grants(roles, required))
    }

    /// Users directly holding `required` or higher.
    pub fn users_with(&self, required: Role) -> impl Iterator<Item = &str> + '_ {
        self.users
            .iter()
            .filter(move |(_, roles)| grants(roles, required))
            .map(|(id, _)| id.as_str())
    }

    /// Groups holding `required` or higher.
    pub fn groups_with(&self, required: Role) -> impl Iterator<Item = &str> + '_ {
        self.groups
            .iter()
            .filter(move |(_, roles)| grants(roles, required))
            .map(|(id, _)| id.as_str())
    }

    pub fn user_permissions(&self) -> impl Iterator<Item = Permission> + '_ {
        self.users
            .iter()
            .map(|(id, roles)| Permission::new(id.clone(), roles.iter().copied()))
    }

    pub fn group_permissions(&self) -> impl Iterator<Item = Permission> + '_ {
        self.groups
            .iter()
            .map(|(id, roles)| Permission::new(id.clone(), roles.iter().copied()))
    }

    /// Replace the entries of every user named in `entries`.
    ///
    /// An entry with no roles removes the user.
    pub fn update_user_permissions(&mut self, entries: impl IntoIterator<Item = Permission>) {
        replace_entries(&mut self.users, entries);
    }

    /// Replace the entries of every group named in `entries`.
    ///
    /// An entry with no roles removes the group.
    pub fn update_group_permissions(&mut self, entries: impl IntoIterator<Item = Permission>) {
        replace_entries(&mut self.groups, entries);
    }

    /// Returns `true` if the user had an entry.
    pub fn remove_user_permission(&mut self, user_id: &str) -> bool {
        self.users.remove(user_id).is_some()
    }

    /// Returns `true` if the group had an entry.
    pub fn remove_group_permission(&mut self, group_id: &str) -> bool {
        self.groups.remove(group_id).is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty() && self.groups.is_empty()
    }
}

fn replace_entries(
    map: &mut BTreeMap<String, BTreeSet<Role>>,
    entries: impl IntoIterator<Item = Permission>,
) {
    for entry in entries {
        if entry.roles.is_empty() {
            map.remove(&entry.id);
        } else {
            map.insert(entry.id, entry.roles);
        }
    }
}

/// A permission-bearing entity: organization, project or collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resource {
    pub id: String,
    #[serde(default)]
    pub permissions: Permissions,
}

impl Resource {
    pub fn new(id: impl Into<String>, permissions: Permissions) -> Self {
        Self {
            id: id.into(),
            permissions,
        }
    }
}

/// A view: a resource that references exactly one collection.
///
/// The collection is looked up by id and never owned; deleting a view has no
/// effect on its collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct View {
    #[serde(flatten)]
    pub resource: Resource,
    pub collection_id: String,
}

impl View {
    pub fn new(
        id: impl Into<String>,
        collection_id: impl Into<String>,
        permissions: Permissions,
    ) -> Self {
        Self {
            resource: Resource::new(id, permissions),
            collection_id: collection_id.into(),
        }
    }

    pub fn id(&self) -> &str {
        &self.resource.id
    }

    pub fn permissions(&self) -> &Permissions {
        &self.resource.permissions
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_order_is_total() {
        assert!(Role::Read < Role::Write);
        assert!(Role::Write < Role::Manage);
        assert!(Role::Manage.includes(Role::Read));
        assert!(Role::Write.includes(Role::Write));
        assert!(!Role::Read.includes(Role::Write));
    }

    #[test]
    fn highest_role_implies_lower() {
        let perms = Permissions::new().with_user("alice", [Role::Manage]);
        assert!(perms.user_has_role("alice", Role::Read));
        assert!(perms.user_has_role("alice", Role::Write));
        assert!(perms.user_has_role("alice", Role::Manage));
        assert!(!perms.user_has_role("bob", Role::Read));
    }

    #[test]
    fn empty_roles_grant_nothing() {
        let entry = Permission::new("alice", []);
        assert!(!entry.grants(Role::Read));
    }

    #[test]
    fn decode_merges_duplicate_entries() {
        let json = r#"{
            "users":[{"id":"alice","roles":["read"]},{"id":"alice","roles":["manage"]}],
            "groups":[{"id":"eng","roles":["write"]}]
        }"#;
        let perms: Permissions = serde_json::from_str(json).unwrap();
        let roles = perms.user_roles("alice").unwrap();
        assert_eq!(roles.len(), 2);
        assert!(perms.user_has_role("alice", Role::Manage));
        assert!(perms.group_has_role("eng", Role::Write));
        assert!(!perms.group_has_role("eng", Role::Manage));
    }

    #[test]
    fn encode_lists_one_entry_per_id() {
        let perms = Permissions::new()
            .with_user("alice", [Role::Read])
            .with_user("alice", [Role::Write]);
        let value = serde_json::to_value(&perms).unwrap();
        let users = value["users"].as_array().unwrap();
        assert_eq!(users.len(), 1);
        assert_eq!(users[0]["roles"], serde_json::json!(["read", "write"]));
    }

    #[test]
    fn update_replaces_and_removes() {
        let mut perms = Permissions::new()
            .with_user("alice", [Role::Manage])
            .with_user("bob", [Role::Read]);

        perms.update_user_permissions([
            Permission::new("alice", [Role::Read]),
            Permission::new("bob", []),
            Permission::new("carol", [Role::Write]),
        ]);

        assert!(!perms.user_has_role("alice", Role::Write));
        assert!(perms.user_roles("bob").is_none());
        assert!(perms.user_has_role("carol", Role::Write));

        assert!(perms.remove_user_permission("carol"));
        assert!(!perms.remove_user_permission("carol"));
    }

    #[test]
    fn group_updates_are_independent_of_users() {
        let mut perms = Permissions::new()
            .with_user("eng", [Role::Read])
            .with_group("eng", [Role::Manage]);
        assert!(perms.remove_group_permission("eng"));
        assert!(perms.user_has_role("eng", Role::Read));
        perms.update_group_permissions([Permission::new("ops", [Role::Write])]);
        let groups: Vec<_> = perms.groups_with(Role::Read).collect();
        assert_eq!(groups, vec!["ops"]);
    }

    #[test]
    fn view_decodes_with_collection_reference() {
        let json = r#"{
            "id":"v1",
            "collectionId":"c1",
            "permissions":{"users":[{"id":"alice","roles":["read"]}]}
        }"#;
        let view: View = serde_json::from_str(json).unwrap();
        assert_eq!(view.id(), "v1");
        assert_eq!(view.collection_id, "c1");
        assert!(view.permissions().user_has_role("alice", Role::Read));
    }
}
