//! Access resolution across the organization → project → collection → view
//! hierarchy.
//!
//! The effective manager or reader set of a scope is the union, over every
//! resource in the scope (organization, project, collection and each view
//! bound to the collection), of the users and group members holding the
//! required role or higher. Absent organization or project means no
//! workspace is selected and resolves to the empty set.

pub mod membership;
pub mod workspace;

use ahash::AHashSet;
use tracing::{debug, warn};

use crate::scope::Scope;
use crate::types::{Permissions, Resource, Role, View};

pub use membership::{GroupMembership, StaticMembership};
pub use workspace::{load_scope, OwnedScopeSnapshot, ResourceStore, WorkspaceContext};

/// Borrowed, immutable view of one scope's resources for a single call.
///
/// Parent links are expressed by which slots are filled, never by references
/// between resources.
#[derive(Debug, Clone, Copy, Default)]
pub struct ScopeSnapshot<'a> {
    pub organization: Option<&'a Resource>,
    pub project: Option<&'a Resource>,
    pub collection: Option<&'a Resource>,
    /// Views bound to `collection`. Views referencing another collection are
    /// ignored.
    pub views: &'a [View],
}

impl<'a> ScopeSnapshot<'a> {
    pub fn new(
        organization: Option<&'a Resource>,
        project: Option<&'a Resource>,
        collection: Option<&'a Resource>,
        views: &'a [View],
    ) -> Self {
        Self {
            organization,
            project,
            collection,
            views,
        }
    }

    /// Both organization and project are present.
    pub fn is_workspace_selected(&self) -> bool {
        self.organization.is_some() && self.project.is_some()
    }

    /// The scope this snapshot describes, or `None` without a workspace.
    pub fn scope(&self) -> Option<Scope> {
        let organization = self.organization?;
        let project = self.project?;
        Some(match self.collection {
            Some(collection) => Scope::collection(&organization.id, &project.id, &collection.id),
            None => Scope::project(&organization.id, &project.id),
        })
    }

    /// Views whose collection reference matches this snapshot's collection.
    pub fn bound_views(&self) -> impl Iterator<Item = &'a View> + 'a {
        let collection_id = self.collection.map(|c| c.id.as_str());
        self.views
            .iter()
            .filter(move |view| Some(view.collection_id.as_str()) == collection_id)
    }

    /// Permissions of every resource contributing to access in this scope.
    pub fn permissions(&self) -> impl Iterator<Item = &'a Permissions> + 'a {
        [self.organization, self.project, self.collection]
            .into_iter()
            .flatten()
            .map(|resource| &resource.permissions)
            .chain(self.bound_views().map(View::permissions))
    }
}

/// Does `user_id` hold `role` or higher on `resource`, directly or through a
/// group?
pub fn has_role<M>(resource: &Resource, user_id: &str, role: Role, membership: &M) -> bool
where
    M: GroupMembership + ?Sized,
{
    let permissions = &resource.permissions;
    if permissions.user_has_role(user_id, role) {
        return true;
    }
    permissions
        .groups_with(role)
        .any(|group_id| group_members(membership, group_id).contains(user_id))
}

/// Members of `group_id`, or the empty set if the lookup fails.
fn group_members<M>(membership: &M, group_id: &str) -> AHashSet<String>
where
    M: GroupMembership + ?Sized,
{
    match membership.members(group_id) {
        Ok(members) => members,
        Err(e) => {
            warn!(group_id, error = %e, "group membership lookup failed, treating group as empty");
            AHashSet::new()
        }
    }
}

/// Computes manager and reader sets from caller-supplied snapshots.
///
/// Stateless apart from the injected membership capability; every call
/// recomputes from its inputs.
#[derive(Debug, Clone)]
pub struct AccessResolver<M> {
    membership: M,
}

impl<M: GroupMembership> AccessResolver<M> {
    pub fn new(membership: M) -> Self {
        Self { membership }
    }

    pub fn membership(&self) -> &M {
        &self.membership
    }

    /// Users holding MANAGE anywhere in the scope.
    pub fn resolve_managers(&self, snapshot: &ScopeSnapshot<'_>) -> AHashSet<String> {
        self.resolve(snapshot, Role::Manage)
    }

    /// Users holding READ or higher anywhere in the scope.
    pub fn resolve_readers(&self, snapshot: &ScopeSnapshot<'_>) -> AHashSet<String> {
        self.resolve(snapshot, Role::Read)
    }

    /// Users holding `role` or higher on any resource of the scope.
    ///
    /// Each distinct group is resolved once, however many resources grant it
    /// the role.
    pub fn resolve(&self, snapshot: &ScopeSnapshot<'_>, role: Role) -> AHashSet<String> {
        if !snapshot.is_workspace_selected() {
            debug!(%role, "no workspace selected, resolving to empty set");
            return AHashSet::new();
        }

        let mut users: AHashSet<String> = AHashSet::new();
        let mut groups: AHashSet<&str> = AHashSet::new();
        for permissions in snapshot.permissions() {
            users.extend(permissions.users_with(role).map(str::to_string));
            groups.extend(permissions.groups_with(role));
        }

        for group_id in groups {
            users.extend(group_members(&self.membership, group_id));
        }

        users
    }

    /// Single-user check equivalent to `resolve(snapshot, role).contains(user_id)`.
    pub fn has_role_in_scope(&self, snapshot: &ScopeSnapshot<'_>, user_id: &str, role: Role) -> bool {
        if !snapshot.is_workspace_selected() {
            return false;
        }
        [snapshot.organization, snapshot.project, snapshot.collection]
            .into_iter()
            .flatten()
            .chain(snapshot.bound_views().map(|view| &view.resource))
            .any(|resource| has_role(resource, user_id, role, &self.membership))
    }

    /// Does `user_id` hold `role` or higher on this single resource?
    pub fn has_role(&self, resource: &Resource, user_id: &str, role: Role) -> bool {
        has_role(resource, user_id, role, &self.membership)
    }
}
