use serde::{Deserialize, Serialize};

use crate::content::repo::SavedItem;

#[derive(Debug, Deserialize)]
pub struct CreateItemRequest {
    #[serde(default)]
    pub category: String,
    // The dashboard clients send the fine-grained kind as "type".
    #[serde(rename = "type", alias = "content_type", default)]
    pub content_type: String,
    pub external_id: Option<String>,
    #[serde(default)]
    pub title: String,
    pub description: Option<String>,
    #[serde(default)]
    pub user_notes: String,
    pub metadata: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateItemRequest {
    pub user_notes: Option<String>,
    pub metadata: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    #[serde(rename = "type")]
    pub content_type: Option<String>,
    #[serde(default = "default_page")]
    pub page: i64,
    #[serde(default = "default_limit")]
    pub limit: i64,
}

fn default_page() -> i64 {
    1
}
fn default_limit() -> i64 {
    20
}

pub const MAX_PAGE_SIZE: i64 = 50;

/// SQL offset for a 1-based page. Saturates instead of overflowing when a
/// client sends an absurd page number; the query then just returns no rows.
pub fn page_offset(page: i64, limit: i64) -> i64 {
    (page.max(1) - 1).saturating_mul(limit)
}

#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct PageMeta {
    pub page: i64,
    pub total_pages: i64,
    pub total_items: i64,
    pub has_next_page: bool,
    pub has_previous_page: bool,
}

impl PageMeta {
    pub fn compute(total_items: i64, page: i64, limit: i64) -> Self {
        let total_pages = if total_items == 0 {
            0
        } else {
            (total_items + limit - 1) / limit
        };
        Self {
            page,
            total_pages,
            total_items,
            has_next_page: page < total_pages,
            has_previous_page: page > 1,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ContentListResponse {
    pub success: bool,
    pub content: Vec<SavedItem>,
    pub pagination: PageMeta,
}

#[derive(Debug, Serialize)]
pub struct ItemResponse {
    pub success: bool,
    pub item: SavedItem,
}

#[derive(Debug, Serialize)]
pub struct DeletedItemResponse {
    pub success: bool,
    pub message: &'static str,
}

/// Fixed dashboard buckets; content types outside this set are dropped from
/// the bucketed view (curated categories, kept as-is).
#[derive(Debug, Default, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct StatsBuckets {
    pub meals: i64,
    pub journal_entries: i64,
    pub activities: i64,
    pub books: i64,
    pub drinks: i64,
    pub space_photos: i64,
    pub locations: i64,
    pub artworks: i64,
}

impl StatsBuckets {
    pub fn from_counts(counts: &[(String, i64)]) -> Self {
        let mut buckets = Self::default();
        for (content_type, n) in counts {
            match content_type.as_str() {
                "meal" => buckets.meals += n,
                "journal" => buckets.journal_entries += n,
                "activity" => buckets.activities += n,
                "book" => buckets.books += n,
                "drink" => buckets.drinks += n,
                "space" => buckets.space_photos += n,
                "location" => buckets.locations += n,
                "artwork" => buckets.artworks += n,
                _ => {}
            }
        }
        buckets
    }
}

#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub success: bool,
    #[serde(flatten)]
    pub stats: StatsBuckets,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forty_five_items_at_twenty_per_page() {
        let page1 = PageMeta::compute(45, 1, 20);
        assert_eq!(page1.total_pages, 3);
        assert_eq!(page1.total_items, 45);
        assert!(page1.has_next_page);
        assert!(!page1.has_previous_page);

        let page2 = PageMeta::compute(45, 2, 20);
        assert!(page2.has_next_page);
        assert!(page2.has_previous_page);

        let page3 = PageMeta::compute(45, 3, 20);
        assert!(!page3.has_next_page);
        assert!(page3.has_previous_page);
    }

    #[test]
    fn exact_multiple_has_no_phantom_page() {
        let meta = PageMeta::compute(40, 2, 20);
        assert_eq!(meta.total_pages, 2);
        assert!(!meta.has_next_page);
    }

    #[test]
    fn offset_saturates_on_absurd_page_numbers() {
        assert_eq!(page_offset(1, 20), 0);
        assert_eq!(page_offset(3, 20), 40);
        assert_eq!(page_offset(0, 20), 0);
        // i64::MAX pages must not overflow the multiplication.
        assert_eq!(page_offset(i64::MAX, 50), i64::MAX);
    }

    #[test]
    fn empty_collection() {
        let meta = PageMeta::compute(0, 1, 20);
        assert_eq!(meta.total_pages, 0);
        assert!(!meta.has_next_page);
        assert!(!meta.has_previous_page);
    }

    #[test]
    fn stats_bucket_mapping() {
        let counts = vec![
            ("meal".to_string(), 3),
            ("book".to_string(), 2),
            ("space".to_string(), 1),
            ("journal".to_string(), 4),
            ("podcast".to_string(), 7), // not a dashboard bucket
        ];
        let buckets = StatsBuckets::from_counts(&counts);
        assert_eq!(buckets.meals, 3);
        assert_eq!(buckets.books, 2);
        assert_eq!(buckets.space_photos, 1);
        assert_eq!(buckets.journal_entries, 4);
        // Unrecognized types are silently dropped from the bucketed view.
        let json = serde_json::to_string(&buckets).unwrap();
        assert!(!json.contains("podcast"));
    }

    #[test]
    fn stats_serialize_camel_case() {
        let json = serde_json::to_value(StatsBuckets::default()).unwrap();
        assert!(json.get("journalEntries").is_some());
        assert!(json.get("spacePhotos").is_some());
    }
}
