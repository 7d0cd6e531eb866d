//! Immutable query descriptions and the "is at least as specific as" relation.
//!
//! `a.is_more_specific_than(&b)` holds when every constraint of `b` is matched
//! by an equal or narrower constraint of `a`, so `a`'s result set is a subset
//! of `b`'s. Pagination is ignored. Filters are opaque strings compared by
//! equality. The fulltext rule (`a` starts with `b`) assumes a search engine
//! that treats terms as prefix filters.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::error::{AccessError, Result};

/// A validated, immutable query. Absent fields are unconstrained.
///
/// `page` and `pageSize` are independent and carried along untouched; they
/// never take part in validation or containment.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "RawQuery")]
pub struct Query {
    #[serde(skip_serializing_if = "Option::is_none")]
    filters: Option<BTreeSet<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    collection_ids: Option<BTreeSet<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    document_ids: Option<BTreeSet<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    link_type_ids: Option<BTreeSet<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    fulltext: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    page: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    page_size: Option<u32>,
}

/// Wire shape before validation.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct RawQuery {
    filters: Option<BTreeSet<String>>,
    collection_ids: Option<BTreeSet<String>>,
    document_ids: Option<BTreeSet<String>>,
    link_type_ids: Option<BTreeSet<String>>,
    fulltext: Option<String>,
    page: Option<u32>,
    page_size: Option<u32>,
}

impl TryFrom<RawQuery> for Query {
    type Error = AccessError;

    fn try_from(raw: RawQuery) -> Result<Self> {
        let query = Query {
            filters: raw.filters,
            collection_ids: raw.collection_ids,
            document_ids: raw.document_ids,
            link_type_ids: raw.link_type_ids,
            fulltext: raw.fulltext,
            page: raw.page,
            page_size: raw.page_size,
        };
        query.validate()?;
        Ok(query)
    }
}

fn check_ids(field: &str, ids: &Option<BTreeSet<String>>) -> Result<()> {
    match ids {
        Some(ids) if ids.iter().any(String::is_empty) => Err(AccessError::MalformedQuery(format!(
            "{} contains an empty value",
            field
        ))),
        _ => Ok(()),
    }
}

impl Query {
    /// The unconstrained query: matches everything.
    pub fn all() -> Self {
        Self::default()
    }

    pub fn builder() -> QueryBuilder {
        QueryBuilder::default()
    }

    fn validate(&self) -> Result<()> {
        check_ids("filters", &self.filters)?;
        check_ids("collectionIds", &self.collection_ids)?;
        check_ids("documentIds", &self.document_ids)?;
        check_ids("linkTypeIds", &self.link_type_ids)?;
        Ok(())
    }

    pub fn filters(&self) -> Option<&BTreeSet<String>> {
        self.filters.as_ref()
    }

    pub fn collection_ids(&self) -> Option<&BTreeSet<String>> {
        self.collection_ids.as_ref()
    }

    pub fn document_ids(&self) -> Option<&BTreeSet<String>> {
        self.document_ids.as_ref()
    }

    pub fn link_type_ids(&self) -> Option<&BTreeSet<String>> {
        self.link_type_ids.as_ref()
    }

    pub fn fulltext(&self) -> Option<&str> {
        self.fulltext.as_deref()
    }

    pub fn page(&self) -> Option<u32> {
        self.page
    }

    pub fn page_size(&self) -> Option<u32> {
        self.page_size
    }

    /// Is this query's result set guaranteed to be contained in `other`'s?
    pub fn is_more_specific_than(&self, other: &Query) -> bool {
        narrows_set(&self.collection_ids, &other.collection_ids)
            && narrows_set(&self.document_ids, &other.document_ids)
            && narrows_set(&self.link_type_ids, &other.link_type_ids)
            && narrows_set(&self.filters, &other.filters)
            && narrows_fulltext(self.fulltext(), other.fulltext())
    }
}

/// `a ⊒ b`: see [`Query::is_more_specific_than`].
pub fn is_more_specific_than(a: &Query, b: &Query) -> bool {
    a.is_more_specific_than(b)
}

// An empty or absent constraint on the broader side constrains nothing.
fn narrows_set(narrow: &Option<BTreeSet<String>>, broad: &Option<BTreeSet<String>>) -> bool {
    match broad {
        Some(broad) if !broad.is_empty() => narrow
            .as_ref()
            .is_some_and(|narrow| narrow.is_superset(broad)),
        _ => true,
    }
}

fn narrows_fulltext(narrow: Option<&str>, broad: Option<&str>) -> bool {
    match broad {
        Some(broad) => narrow.is_some_and(|narrow| narrow.starts_with(broad)),
        None => true,
    }
}

/// Builds a [`Query`]; `build` validates.
#[derive(Debug, Clone, Default)]
pub struct QueryBuilder {
    raw: RawQuery,
}

fn to_set<I, S>(values: I) -> BTreeSet<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    values.into_iter().map(Into::into).collect()
}

impl QueryBuilder {
    pub fn filters<I, S>(mut self, filters: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.raw.filters = Some(to_set(filters));
        self
    }

    pub fn collection_ids<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.raw.collection_ids = Some(to_set(ids));
        self
    }

    pub fn document_ids<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.raw.document_ids = Some(to_set(ids));
        self
    }

    pub fn link_type_ids<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.raw.link_type_ids = Some(to_set(ids));
        self
    }

    pub fn fulltext(mut self, fulltext: impl Into<String>) -> Self {
        self.raw.fulltext = Some(fulltext.into());
        self
    }

    pub fn page(mut self, page: u32, page_size: u32) -> Self {
        self.raw.page = Some(page);
        self.raw.page_size = Some(page_size);
        self
    }

    pub fn page_size(mut self, page_size: u32) -> Self {
        self.raw.page_size = Some(page_size);
        self
    }

    pub fn build(self) -> Result<Query> {
        Query::try_from(self.raw)
    }
}

#[cfg(test)]
mod tests;
