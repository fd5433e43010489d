//! Wire types for the page catalog API.

use serde::{Deserialize, Serialize};

/// A catalog record as the API returns it.
#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct CatalogRecord {
    pub id: String,
    pub email: String,
    pub url: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub locale: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub remixed_from: Option<String>,
}

/// The fields we write when creating or updating a record.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct CatalogFields {
    pub email: String,
    pub url: String,
    pub title: String,
    pub description: String,
    pub author: String,
    pub locale: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,
    /// Lineage pointer: a catalog record id when the parent is cataloged,
    /// otherwise the parent's raw URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remixed_from: Option<String>,
}

/// Search parameters. `email` narrows the match to one owner; lineage
/// lookups search by URL alone.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchFilter {
    pub email: Option<String>,
    pub url: String,
}

#[derive(Deserialize, Debug)]
pub struct SearchResponse {
    #[serde(default)]
    pub records: Vec<CatalogRecord>,
}

#[derive(Deserialize, Debug)]
pub struct CreateResponse {
    pub id: String,
}
