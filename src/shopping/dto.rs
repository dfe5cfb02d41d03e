use serde::{Deserialize, Serialize};

use crate::shopping::repo::ShoppingListItem;

/// The two checklist sections the list is split into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Section {
    Food,
    Drinks,
}

impl Section {
    pub fn as_str(self) -> &'static str {
        match self {
            Section::Food => "food",
            Section::Drinks => "drinks",
        }
    }
}

impl Default for Section {
    fn default() -> Self {
        Section::Food
    }
}

#[derive(Debug, Deserialize)]
pub struct AddItemRequest {
    #[serde(default)]
    pub section: Section,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub measure: String,
}

#[derive(Debug, Deserialize)]
pub struct ClearCheckedQuery {
    pub section: Option<Section>,
}

/// Items grouped by section, oldest first within each.
#[derive(Debug, Default, Serialize)]
pub struct GroupedList {
    pub food: Vec<ShoppingListItem>,
    pub drinks: Vec<ShoppingListItem>,
}

impl GroupedList {
    pub fn from_items(items: Vec<ShoppingListItem>) -> Self {
        let mut grouped = Self::default();
        for item in items {
            match item.section.as_str() {
                "drinks" => grouped.drinks.push(item),
                _ => grouped.food.push(item),
            }
        }
        grouped
    }
}

#[derive(Debug, Serialize)]
pub struct ListResponse {
    pub success: bool,
    pub list: GroupedList,
}

#[derive(Debug, Serialize)]
pub struct ItemResponse {
    pub success: bool,
    pub item: ShoppingListItem,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub duplicate: bool,
}

#[derive(Debug, Serialize)]
pub struct DeletedResponse {
    pub success: bool,
    pub message: &'static str,
}

#[derive(Debug, Serialize)]
pub struct ClearedResponse {
    pub success: bool,
    pub removed: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::OffsetDateTime;

    fn item(section: &str, name: &str) -> ShoppingListItem {
        ShoppingListItem {
            id: 1,
            user_id: 1,
            section: section.into(),
            name: name.into(),
            measure: String::new(),
            checked: false,
            created_at: OffsetDateTime::UNIX_EPOCH,
        }
    }

    #[test]
    fn section_parses_lowercase() {
        let s: Section = serde_json::from_str("\"drinks\"").unwrap();
        assert_eq!(s, Section::Drinks);
        assert!(serde_json::from_str::<Section>("\"snacks\"").is_err());
    }

    #[test]
    fn grouping_splits_by_section() {
        let grouped = GroupedList::from_items(vec![
            item("food", "Milk"),
            item("drinks", "Lime"),
            item("food", "Eggs"),
        ]);
        assert_eq!(grouped.food.len(), 2);
        assert_eq!(grouped.drinks.len(), 1);
    }

    #[test]
    fn duplicate_flag_is_omitted_when_false() {
        let body = serde_json::to_string(&ItemResponse {
            success: true,
            item: item("food", "Milk"),
            duplicate: false,
        })
        .unwrap();
        assert!(!body.contains("duplicate"));
    }
}
