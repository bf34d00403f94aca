//! The product category tree.
//!
//! Products store a sub-category name (`"냉장고"`). The storefront menu groups
//! those under five fixed parents.

use serde::Serialize;

/// A parent category and the sub-categories under it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryGroup {
    /// Parent key (`"kitchen"`).
    #[serde(rename = "parentCategory")]
    pub key: &'static str,
    /// Parent display name.
    #[serde(rename = "parentCategoryName")]
    pub name: &'static str,
    /// Sub-category names.
    pub sub_categories: &'static [&'static str],
}

/// Every parent category in menu order.
pub const CATEGORY_TREE: [CategoryGroup; 5] = [
    CategoryGroup {
        key: "tv_audio",
        name: "TV/오디오",
        sub_categories: &["TV", "오디오"],
    },
    CategoryGroup {
        key: "kitchen",
        name: "주방가전",
        sub_categories: &["냉장고", "전자렌지", "식기세척기"],
    },
    CategoryGroup {
        key: "living",
        name: "생활가전",
        sub_categories: &["세탁기", "청소기"],
    },
    CategoryGroup {
        key: "air",
        name: "에어컨/공기청정기",
        sub_categories: &["에어컨", "공기청정기", "정수기"],
    },
    CategoryGroup {
        key: "etc",
        name: "기타",
        sub_categories: &["안마의자", "PC"],
    },
];

/// Find the parent group of a sub-category.
#[must_use]
pub fn parent_of(sub_category: &str) -> Option<&'static CategoryGroup> {
    let wanted = sub_category.trim();
    CATEGORY_TREE
        .iter()
        .find(|group| group.sub_categories.contains(&wanted))
}

/// Look up a parent group by key.
#[must_use]
pub fn group(key: &str) -> Option<&'static CategoryGroup> {
    CATEGORY_TREE.iter().find(|group| group.key == key)
}

/// Whether `name` is a known sub-category.
#[must_use]
pub fn is_known_sub_category(name: &str) -> bool {
    parent_of(name).is_some()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parent_of() {
        assert_eq!(parent_of("냉장고").unwrap().key, "kitchen");
        assert_eq!(parent_of(" PC ").unwrap().name, "기타");
        assert!(parent_of("자동차").is_none());
    }

    #[test]
    fn test_sub_categories_are_unique() {
        let mut all: Vec<&str> = CATEGORY_TREE
            .iter()
            .flat_map(|group| group.sub_categories.iter().copied())
            .collect();
        let total = all.len();
        all.sort_unstable();
        all.dedup();
        assert_eq!(all.len(), total);
    }

    #[test]
    fn test_group_serializes_like_the_menu_api() {
        let json = serde_json::to_value(group("air").unwrap()).unwrap();
        assert_eq!(json["parentCategory"], "air");
        assert_eq!(json["parentCategoryName"], "에어컨/공기청정기");
        assert_eq!(json["subCategories"][2], "정수기");
    }
}
