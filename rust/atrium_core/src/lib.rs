//! `atrium_core`: access resolution and access-checked query reuse.
//!
//! Resources form a hierarchy: organization → project → collection, with
//! views referencing (not owning) a collection. This crate computes who may
//! manage or read a scope of that hierarchy and decides when a cached query
//! result may be reused to answer another query.
//!
//! Modules:
//! - `types`: roles, permissions, resources, views
//! - `access`: manager/reader resolution, group membership, workspace loading
//! - `query`: immutable query values and the specificity relation
//! - `scope`: positions in the hierarchy, used as cache keys
//! - `cache`: scope-keyed result cache with access re-verification
//! - `config`: cache configuration
//! - `error`: error types
//!
//! Nothing here performs I/O. Resource stores, group directories and query
//! executors are supplied by the embedding service.

pub mod access;
pub mod cache;
pub mod config;
pub mod error;
pub mod query;
pub mod scope;
pub mod types;

pub use access::{AccessResolver, GroupMembership, ScopeSnapshot};
pub use cache::{Lookup, MissTicket, QueryCache, Registration};
pub use config::CacheConfig;
pub use error::{AccessError, Result};
pub use query::{is_more_specific_than, Query, QueryBuilder};
pub use scope::Scope;
pub use types::{Permission, Permissions, Resource, Role, View};
