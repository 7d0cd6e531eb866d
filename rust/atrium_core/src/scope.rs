//! Scopes: positions in the organization → project → collection hierarchy.
//!
//! A scope id is rendered as `org`, `org/project` or `org/project/collection`.
//! Scope `a` contains scope `b` when `a`'s segments are a prefix of `b`'s.

use std::fmt;
use std::str::FromStr;

use crate::error::AccessError;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Scope {
    organization_id: String,
    project_id: Option<String>,
    // Only ever set together with `project_id`.
    collection_id: Option<String>,
}

impl Scope {
    pub fn organization(organization_id: impl Into<String>) -> Self {
        Self {
            organization_id: organization_id.into(),
            project_id: None,
            collection_id: None,
        }
    }

    pub fn project(organization_id: impl Into<String>, project_id: impl Into<String>) -> Self {
        Self {
            organization_id: organization_id.into(),
            project_id: Some(project_id.into()),
            collection_id: None,
        }
    }

    pub fn collection(
        organization_id: impl Into<String>,
        project_id: impl Into<String>,
        collection_id: impl Into<String>,
    ) -> Self {
        Self {
            organization_id: organization_id.into(),
            project_id: Some(project_id.into()),
            collection_id: Some(collection_id.into()),
        }
    }

    pub fn organization_id(&self) -> &str {
        &self.organization_id
    }

    pub fn project_id(&self) -> Option<&str> {
        self.project_id.as_deref()
    }

    pub fn collection_id(&self) -> Option<&str> {
        self.collection_id.as_deref()
    }

    /// Is `other` this scope or one of its descendants?
    pub fn contains(&self, other: &Scope) -> bool {
        if self.organization_id != other.organization_id {
            return false;
        }
        match (&self.project_id, &other.project_id) {
            (None, _) => return true,
            (Some(_), None) => return false,
            (Some(mine), Some(theirs)) if mine != theirs => return false,
            _ => {}
        }
        match (&self.collection_id, &other.collection_id) {
            (None, _) => true,
            (Some(mine), Some(theirs)) => mine == theirs,
            (Some(_), None) => false,
        }
    }

    /// The enclosing scope, or `None` for an organization.
    pub fn parent(&self) -> Option<Scope> {
        match (&self.project_id, &self.collection_id) {
            (Some(project_id), Some(_)) => {
                Some(Scope::project(self.organization_id.clone(), project_id.clone()))
            }
            (Some(_), None) => Some(Scope::organization(self.organization_id.clone())),
            _ => None,
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.organization_id)?;
        if let Some(project_id) = &self.project_id {
            write!(f, "/{}", project_id)?;
        }
        if let Some(collection_id) = &self.collection_id {
            write!(f, "/{}", collection_id)?;
        }
        Ok(())
    }
}

impl FromStr for Scope {
    type Err = AccessError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split('/').collect();
        if parts.iter().any(|p| p.is_empty()) {
            return Err(AccessError::InvalidScope(format!("empty segment in {:?}", s)));
        }
        match parts.as_slice() {
            [org] => Ok(Scope::organization(*org)),
            [org, project] => Ok(Scope::project(*org, *project)),
            [org, project, collection] => Ok(Scope::collection(*org, *project, *collection)),
            _ => Err(AccessError::InvalidScope(format!(
                "expected at most 3 segments, got {} in {:?}",
                parts.len(),
                s
            ))),
        }
    }
}
