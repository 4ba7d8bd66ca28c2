//! Format notebook trees and persist results for the terminal.

use crate::error::ApiError;
use crate::store::{BookmarkWrite, PersistOutcome, PersistReport};
use crate::tree::{NodeTree, TreeQuery};
use comfy_table::presets::{UTF8_BORDERS_ONLY, UTF8_FULL};
use comfy_table::Table;
use owo_colors::OwoColorize;

/// Format a section heading with bold/underline.
pub fn format_section_heading(title: &str) -> String {
    format!("{}", title.bold().underline())
}

/// Nodes in tree order, names indented by depth.
pub fn format_tree_text(tree: &NodeTree) -> String {
    let mut out = format!("{}\n\n", format_section_heading("Notebook"));
    if tree.is_empty() {
        out.push_str("  (no nodes)\n");
        return out;
    }
    let bookmarks = tree.bookmarks();
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec!["ID", "Name", "Syntax", "Tags", "Chars", "Bookmark"]);
    for id in tree.walk() {
        let Some(node) = tree.get(id) else {
            continue;
        };
        let indent = "  ".repeat(tree.depth(id).unwrap_or(0));
        table.add_row(vec![
            id.to_string(),
            format!("{}{}", indent, node.properties.name),
            node.properties.syntax.clone(),
            node.properties.tags.clone(),
            node.content.char_len().to_string(),
            if bookmarks.contains(&id) { "*" } else { "" }.to_string(),
        ]);
    }
    out.push_str(&format!("{}\n\n", table));
    out.push_str(&format!(
        "  Total nodes: {}  Bookmarks: {}\n",
        tree.len(),
        bookmarks.len()
    ));
    out
}

/// Nodes in tree order as a JSON array.
pub fn format_tree_json(tree: &NodeTree) -> Result<String, ApiError> {
    let bookmarks = tree.bookmarks();
    let nodes: Vec<serde_json::Value> = tree
        .walk()
        .into_iter()
        .filter_map(|id| tree.get(id))
        .map(|node| {
            serde_json::json!({
                "id": node.id,
                "parent": node.parent,
                "children": node.children,
                "properties": node.properties,
                "chars": node.content.char_len(),
                "anchors": node.content.anchors.len(),
                "bookmarked": bookmarks.contains(&node.id),
            })
        })
        .collect();
    Ok(serde_json::to_string_pretty(&nodes)?)
}

/// One-line summary plus a counter table for a persist call.
pub fn format_outcome(outcome: &PersistOutcome) -> String {
    match outcome {
        PersistOutcome::Declined => "Overwrite declined, nothing was written.".to_string(),
        PersistOutcome::Completed(report) => format_report(report),
    }
}

fn format_report(report: &PersistReport) -> String {
    let kind = if report.full_rebuild {
        "Wrote"
    } else {
        "Synced"
    };
    let mut out = format!("{} {}\n\n", kind, report.root.display());
    let mut table = Table::new();
    table.load_preset(UTF8_BORDERS_ONLY);
    table.set_header(vec!["Item", "Count"]);
    table.add_row(vec!["Node documents".to_string(), report.documents_written.to_string()]);
    table.add_row(vec!["Manifests".to_string(), report.manifests_written.to_string()]);
    if !report.full_rebuild {
        table.add_row(vec!["Directories removed".to_string(), report.directories_removed.to_string()]);
        table.add_row(vec!["Nodes moved".to_string(), report.nodes_moved.to_string()]);
    }
    if report.attachments_pruned > 0 {
        table.add_row(vec!["Attachments pruned".to_string(), report.attachments_pruned.to_string()]);
    }
    if let Some(bookmarks) = report.bookmarks {
        let state = match bookmarks {
            BookmarkWrite::Written => "written",
            BookmarkWrite::Cleared => "cleared",
            BookmarkWrite::Absent => "none",
        };
        table.add_row(vec!["Bookmarks".to_string(), state.to_string()]);
    }
    out.push_str(&table.to_string());
    out
}
