use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use chrono::Utc;
use tracing::info;

use crate::types::{truncate_chars, Item, Result};

/// Render a markdown report from classified items and write it to
/// `output_dir`. Pure formatting over the classifier's output; holds no
/// pipeline state.
pub fn write_report(
    classified: &BTreeMap<String, Vec<Item>>,
    output_dir: &Path,
    top_n: usize,
) -> Result<PathBuf> {
    std::fs::create_dir_all(output_dir)?;
    let now = Utc::now();
    let path = output_dir.join(format!("news_report_{}.md", now.format("%Y%m%d_%H%M%S")));

    let body = render(classified, top_n);
    std::fs::write(&path, body)?;
    info!(path = %path.display(), "report written");
    Ok(path)
}

fn render(classified: &BTreeMap<String, Vec<Item>>, top_n: usize) -> String {
    let now = Utc::now();
    let total: usize = classified.values().map(Vec::len).sum();
    let topic_names: Vec<&str> = classified.keys().map(String::as_str).collect();

    let mut out = String::new();
    let _ = writeln!(out, "# News Report");
    let _ = writeln!(out, "Generated: {}\n", now.format("%Y-%m-%d %H:%M:%S"));
    let _ = writeln!(out, "**Total Articles:** {}", total);
    let _ = writeln!(out, "**Topics:** {}\n", topic_names.join(", "));

    for (topic, items) in classified {
        let _ = writeln!(out, "## {}", topic);
        let _ = writeln!(out, "*{} articles*\n", items.len());

        // Most recent first within the report; undated items sink to the end.
        let mut sorted: Vec<&Item> = items.iter().collect();
        sorted.sort_by(|a, b| b.published_at.cmp(&a.published_at));

        for (i, item) in sorted.iter().take(top_n).enumerate() {
            let _ = writeln!(out, "### {}. {}", i + 1, item.title);
            let _ = writeln!(out, "**Source:** {}", item.source_name);
            let _ = writeln!(out, "**Link:** {}", item.url);
            if let Some(published) = item.published_at {
                let _ = writeln!(out, "**Published:** {}", published.format("%Y-%m-%d"));
            }
            if !item.summary.is_empty() {
                let _ = writeln!(out, "\n{}", truncate_chars(&item.summary, 200));
            }
            let _ = writeln!(out, "\n---\n");
        }
    }
    out
}
