//! Loading a scope snapshot for the selected workspace from a resource store.
//!
//! Store failures are logged and treated as missing resources. A requested
//! collection that cannot be loaded makes the whole snapshot unresolvable so
//! that access is denied instead of falling back to project-wide access.

use std::error::Error;

use tracing::{debug, warn};

use super::ScopeSnapshot;
use crate::types::{Resource, View};

/// Read access to resources and their permissions.
pub trait ResourceStore {
    type Error: Error;

    fn organization(&self, organization_id: &str) -> Result<Option<Resource>, Self::Error>;

    fn project(&self, project_id: &str) -> Result<Option<Resource>, Self::Error>;

    fn collection(&self, collection_id: &str) -> Result<Option<Resource>, Self::Error>;

    fn views_bound_to_collection(&self, collection_id: &str) -> Result<Vec<View>, Self::Error>;
}

/// The organization and project selected for the current request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkspaceContext {
    pub organization_id: Option<String>,
    pub project_id: Option<String>,
}

impl WorkspaceContext {
    pub fn new(organization_id: impl Into<String>, project_id: impl Into<String>) -> Self {
        Self {
            organization_id: Some(organization_id.into()),
            project_id: Some(project_id.into()),
        }
    }
}

/// Owned counterpart of [`ScopeSnapshot`], produced by [`load_scope`].
#[derive(Debug, Clone, Default)]
pub struct OwnedScopeSnapshot {
    pub organization: Option<Resource>,
    pub project: Option<Resource>,
    pub collection: Option<Resource>,
    pub views: Vec<View>,
}

impl OwnedScopeSnapshot {
    pub fn as_snapshot(&self) -> ScopeSnapshot<'_> {
        ScopeSnapshot::new(
            self.organization.as_ref(),
            self.project.as_ref(),
            self.collection.as_ref(),
            &self.views,
        )
    }
}

fn fetch<T, E: Error>(kind: &str, id: &str, result: Result<Option<T>, E>) -> Option<T> {
    match result {
        Ok(Some(value)) => Some(value),
        Ok(None) => {
            debug!(kind, id, "resource not found");
            None
        }
        Err(e) => {
            warn!(kind, id, error = %e, "resource lookup failed, treating as absent");
            None
        }
    }
}

/// Load the resources of `workspace` and, optionally, one collection with its
/// bound views.
pub fn load_scope<S>(
    store: &S,
    workspace: &WorkspaceContext,
    collection_id: Option<&str>,
) -> OwnedScopeSnapshot
where
    S: ResourceStore + ?Sized,
{
    let (Some(organization_id), Some(project_id)) = (
        workspace.organization_id.as_deref(),
        workspace.project_id.as_deref(),
    ) else {
        debug!("workspace not selected");
        return OwnedScopeSnapshot::default();
    };

    let Some(organization) = fetch(
        "organization",
        organization_id,
        store.organization(organization_id),
    ) else {
        return OwnedScopeSnapshot::default();
    };
    let Some(project) = fetch("project", project_id, store.project(project_id)) else {
        return OwnedScopeSnapshot::default();
    };

    let Some(collection_id) = collection_id else {
        return OwnedScopeSnapshot {
            organization: Some(organization),
            project: Some(project),
            collection: None,
            views: Vec::new(),
        };
    };

    let Some(collection) = fetch("collection", collection_id, store.collection(collection_id))
    else {
        return OwnedScopeSnapshot::default();
    };

    // Views only ever add access, so a failed lookup degrades to none.
    let views = match store.views_bound_to_collection(collection_id) {
        Ok(views) => views,
        Err(e) => {
            warn!(collection_id, error = %e, "view lookup failed, ignoring bound views");
            Vec::new()
        }
    };

    OwnedScopeSnapshot {
        organization: Some(organization),
        project: Some(project),
        collection: Some(collection),
        views,
    }
}
