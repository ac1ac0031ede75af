//! Filtered, sorted views over a page of entities.
use crate::model::{Entity, EntityStatus, ParseKindError, Scalar};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum StatusFilter {
    #[default]
    All,
    Only(EntityStatus),
}

impl StatusFilter {
    pub fn matches(&self, status: EntityStatus) -> bool {
        match self {
            StatusFilter::All => true,
            StatusFilter::Only(wanted) => *wanted == status,
        }
    }
}

impl FromStr for StatusFilter {
    type Err = ParseKindError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case("all") {
            return Ok(StatusFilter::All);
        }
        s.parse().map(StatusFilter::Only)
    }
}

impl fmt::Display for StatusFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatusFilter::All => f.write_str("all"),
            StatusFilter::Only(status) => status.fmt(f),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortKey {
    pub attribute: String,
    #[serde(default)]
    pub descending: bool,
}

impl SortKey {
    pub fn ascending(attribute: &str) -> Self {
        Self {
            attribute: attribute.to_string(),
            descending: false,
        }
    }

    pub fn descending(attribute: &str) -> Self {
        Self {
            attribute: attribute.to_string(),
            descending: true,
        }
    }
}

/// Filters applied together; unset fields do not filter.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Filters {
    #[serde(default)]
    pub status: Option<StatusFilter>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub search: Option<String>,
    #[serde(default)]
    pub sort: Option<SortKey>,
}

/// Which attributes the projector looks at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchFields {
    pub text: Vec<String>,
    pub category: String,
}

impl SearchFields {
    pub fn new<S: AsRef<str>>(text: &[S], category: &str) -> Self {
        Self {
            text: text.iter().map(|s| s.as_ref().to_string()).collect(),
            category: category.to_string(),
        }
    }
}

/// Derive the visible view of `entities`. Input order is kept among entries
/// that compare equal.
pub fn project(entities: &[Entity], filters: &Filters, fields: &SearchFields) -> Vec<Entity> {
    let needle = filters
        .search
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_lowercase);

    let mut view: Vec<Entity> = entities
        .iter()
        .filter(|e| filters.status.map_or(true, |f| f.matches(e.status)))
        .filter(|e| match filters.category.as_deref() {
            Some(category) => e
                .attr(&fields.category)
                .and_then(Scalar::text_form)
                .is_some_and(|v| v == category),
            None => true,
        })
        .filter(|e| match needle.as_deref() {
            Some(needle) => matches_search(e, needle, &fields.text),
            None => true,
        })
        .cloned()
        .collect();

    if let Some(key) = &filters.sort {
        // slice::sort_by is stable
        view.sort_by(|a, b| compare_by(a, b, key));
    }
    view
}

fn matches_search(entity: &Entity, needle: &str, fields: &[String]) -> bool {
    fields.iter().any(|field| {
        entity
            .attr(field)
            .and_then(Scalar::text_form)
            .is_some_and(|text| text.to_lowercase().contains(needle))
    })
}

// Missing or null values sort last in either direction.
fn compare_by(a: &Entity, b: &Entity, key: &SortKey) -> Ordering {
    let a = a.attr(&key.attribute).filter(|v| !v.is_null());
    let b = b.attr(&key.attribute).filter(|v| !v.is_null());
    match (a, b) {
        (Some(a), Some(b)) => {
            let ord = a.sort_cmp(b);
            if key.descending {
                ord.reverse()
            } else {
                ord
            }
        }
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}
