use serde::{Deserialize, Serialize};

/// Stable identifier of one catalog record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BeerId(pub i64);

/// One beer record as served by the remote catalog API. Only `id` and
/// `ebc` carry behavior in the core; the rest is display data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BeerSummary {
    pub id: BeerId,
    pub name: String,
    pub tagline: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub abv: Option<f64>,
    /// Brewing color in EBC units, when the record reports one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ebc: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

/// Identity of one fetched page. Page size is part of the key, so result
/// sets for different sizes never collide and never need invalidation
/// when the size changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PageKey {
    pub page: u32,
    pub per_page: u32,
}

impl PageKey {
    pub fn new(page: u32, per_page: u32) -> Self {
        Self { page, per_page }
    }
}

/// A fetched page. Immutable once stored: a refetch under the same key
/// replaces the whole value, never edits it in place.
#[derive(Debug, Clone, PartialEq)]
pub struct Page {
    pub key: PageKey,
    pub items: Vec<BeerSummary>,
    pub has_next: bool,
}

impl Page {
    /// A full page implies more may follow; a short or empty page is the
    /// terminal page.
    pub fn from_items(key: PageKey, items: Vec<BeerSummary>) -> Self {
        let has_next = items.len() as u32 == key.per_page;
        Self {
            key,
            items,
            has_next,
        }
    }
}
