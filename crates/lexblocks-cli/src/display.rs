//! Vertical card display for assembled documents, related blocks, rule
//! evaluations and block listings.

use std::fmt::Write;

use lexblocks_assembly::AssemblyResult;
use lexblocks_core::{ActionState, Block, RuleEvaluation};

const MAX_LIST_ITEMS: usize = 10;
const MAX_CONTENT_CHARS: usize = 72;
/// Deeper levels indent no further.
const MAX_INDENT_STEPS: usize = 8;

// ── Public API ──

/// An assembled document with its blocks indented by level.
pub fn document_card(result: &AssemblyResult) -> String {
    let doc = &result.document;
    let mut out = String::new();

    let _ = writeln!(out, "=== {} ===", doc.title);
    let _ = writeln!(out, "{}", result.message);
    let _ = writeln!(out);

    let _ = writeln!(out, "Document");
    row(&mut out, "id", &doc.id);
    row(&mut out, "status", doc.status.as_str());
    if let Some(template_id) = &doc.template_id {
        row(&mut out, "template", template_id);
    }
    row(&mut out, "version", &doc.version.to_string());
    row(&mut out, "created_at", &doc.created_at.format("%Y-%m-%d %H:%M:%S").to_string());
    let _ = writeln!(out);

    if !doc.context.is_empty() {
        let _ = writeln!(out, "Context");
        for (key, value) in &doc.context {
            row(&mut out, key, &value.to_string());
        }
        let _ = writeln!(out);
    }

    let _ = writeln!(out, "Blocks ({})", result.blocks_included);
    for block in doc.ordered_blocks() {
        let indent = indentation(block.level);
        let _ = writeln!(out, "  {:>3}  {indent}{}", block.order, block.block_id);
        let _ = writeln!(out, "       {indent}{}", shorten(&block.content, MAX_CONTENT_CHARS));
    }
    let _ = writeln!(out);

    let _ = writeln!(out, "Assembly");
    row(&mut out, "blocks_included", &result.blocks_included.to_string());
    row(&mut out, "rules_applied", &result.rules_applied.to_string());
    if !result.unresolved_block_ids.is_empty() {
        row(&mut out, "unresolved", &result.unresolved_block_ids.join(", "));
    }
    out
}

/// Related blocks with their hop distance from `block_id`.
pub fn related_card(block_id: &str, depth: u32, distances: &[(String, u32)]) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "=== {block_id} ===");
    let _ = writeln!(out, "{} related within {depth} hops", distances.len());
    let _ = writeln!(out);
    list(&mut out, distances.iter().map(|(id, hops)| {
        format!("  {:<26} {hops} {}", id, if *hops == 1 { "hop" } else { "hops" })
    }));
    out
}

/// Per-rule outcomes followed by the resulting block selection and variables.
pub fn evaluation_card(evaluations: &[RuleEvaluation], state: &ActionState) -> String {
    let matched = evaluations.iter().filter(|e| e.matched).count();
    let mut out = String::new();
    let _ = writeln!(out, "=== Rules ===");
    let _ = writeln!(out, "{matched} of {} matched", evaluations.len());
    let _ = writeln!(out);

    let _ = writeln!(out, "Evaluations");
    for e in evaluations {
        let mark = if e.matched { "yes" } else { "no" };
        let _ = writeln!(out, "  {:<26} {:<4} {}", e.rule_id, mark, e.message);
    }
    let _ = writeln!(out);

    if !state.included_blocks.is_empty() {
        let _ = writeln!(out, "Included blocks");
        list(&mut out, state.included_blocks.iter().map(|id| format!("  {id}")));
        let _ = writeln!(out);
    }
    if !state.excluded_blocks.is_empty() {
        let _ = writeln!(out, "Excluded blocks");
        list(&mut out, state.excluded_blocks.iter().map(|id| format!("  {id}")));
        let _ = writeln!(out);
    }
    if !state.variables.is_empty() {
        let _ = writeln!(out, "Variables");
        for (key, value) in &state.variables {
            row(&mut out, key, &value.to_string());
        }
    }
    out
}

/// One line per block: id, type and title.
pub fn block_table(blocks: &[Block]) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{} blocks", blocks.len());
    for b in blocks {
        let indent = indentation(b.level);
        let _ = writeln!(out, "  {:<26} {:<10} {indent}{}", b.id, b.kind, b.title);
    }
    out
}

// ── Helpers ──

fn row(out: &mut String, name: &str, value: &str) {
    let _ = writeln!(out, "  {:<26} {}", name, value);
}

fn list(out: &mut String, lines: impl ExactSizeIterator<Item = String>) {
    let len = lines.len();
    for line in lines.take(MAX_LIST_ITEMS) {
        let _ = writeln!(out, "{line}");
    }
    if len > MAX_LIST_ITEMS {
        let _ = writeln!(out, "    ... and {} more", len - MAX_LIST_ITEMS);
    }
}

fn indentation(level: u32) -> String {
    "  ".repeat((level.saturating_sub(1) as usize).min(MAX_INDENT_STEPS))
}

/// First line of `text`, cut to `max` characters.
fn shorten(text: &str, max: usize) -> String {
    let first = text.lines().next().unwrap_or("");
    if first.chars().count() > max {
        let cut: String = first.chars().take(max - 3).collect();
        format!("{cut}...")
    } else if first.len() < text.trim_end().len() {
        format!("{first} ...")
    } else {
        first.to_string()
    }
}
