use std::collections::BTreeMap;

use tracing::info;

use crate::types::{Item, Topic};

/// Bucket name for items matching no configured topic.
pub const UNCATEGORIZED: &str = "uncategorized";

/// Assign items to topics by keyword match against the case-folded
/// concatenation of title and summary. Multi-label: an item appears in every
/// topic it matches, and in `"uncategorized"` when it matches none. Within a
/// topic, items keep input order. Empty buckets are omitted.
pub fn classify(items: &[Item], topics: &[Topic]) -> BTreeMap<String, Vec<Item>> {
    let mut result: BTreeMap<String, Vec<Item>> = BTreeMap::new();

    for item in items {
        let search_text = format!("{} {}", item.title, item.summary);

        let mut matched = false;
        for topic in topics {
            if topic.matches(&search_text) {
                result
                    .entry(topic.name.clone())
                    .or_default()
                    .push(item.clone());
                matched = true;
            }
        }

        if !matched {
            result
                .entry(UNCATEGORIZED.to_string())
                .or_default()
                .push(item.clone());
        }
    }

    for (name, bucket) in &result {
        info!(topic = %name, items = bucket.len(), "classified");
    }

    result
}
