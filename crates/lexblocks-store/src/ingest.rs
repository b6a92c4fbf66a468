//! Statute text ingestion.
//!
//! Plain statute text is split into one `paragraph` block per heading line
//! (`§ 29 Persönliches Budget`) and one `absatz` block per numbered
//! subsection (`(1) ...`) inside it. Paragraphs list their Absätze as
//! children and every Absatz names its paragraph as parent, so importing the
//! blocks fills the relationship graph.
//!
//! Block ids derive from the law name: `SGB IX` § 29 Abs. 2 becomes
//! `sgb_ix_para29_abs2`.

use std::path::Path;
use std::sync::LazyLock;

use indexmap::IndexSet;
use lexblocks_core::{Block, BlockMetadata, BlockRelationships};
use regex::Regex;
use tracing::{debug, info, warn};

use crate::{CatalogSummary, MemoryStore, StoreError};

/// `§ 29 Title` at the start of a line. The title runs to the end of the line.
static PARAGRAPH_HEADING: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^[ \t]*§[ \t]*(\d+[a-z]?)[ \t]+([^\n]+)").expect("paragraph heading pattern")
});

/// `(1) ` at the start of a line.
static ABSATZ_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^[ \t]*\((\d+)\)\s+").expect("absatz marker pattern"));

const KEYWORDS: &[&str] = &[
    "teilhabe",
    "rehabilitation",
    "leistung",
    "budget",
    "persönliches budget",
    "antrag",
    "bescheid",
    "widerspruch",
    "behinderung",
    "pflegebedürftigkeit",
    "arbeitsleben",
];

const MAX_TAGS: usize = 5;

/// Splits the text of one law into blocks.
#[derive(Debug, Clone)]
pub struct StatuteParser {
    law: String,
    id_prefix: String,
}

impl StatuteParser {
    pub fn new(law: impl Into<String>) -> Self {
        let law = law.into();
        let id_prefix = law.trim().to_lowercase().replace(' ', "_");
        Self { law, id_prefix }
    }

    pub fn law(&self) -> &str {
        &self.law
    }

    pub fn paragraph_id(&self, number: &str) -> String {
        format!("{}_para{number}", self.id_prefix)
    }

    pub fn absatz_id(&self, number: &str, absatz: u32) -> String {
        format!("{}_para{number}_abs{absatz}", self.id_prefix)
    }

    /// Paragraph blocks, each followed by its Absatz blocks, in text order.
    ///
    /// Text before the first heading is ignored.
    pub fn parse(&self, text: &str) -> Vec<Block> {
        let headings: Vec<_> = PARAGRAPH_HEADING.captures_iter(text).collect();
        let mut blocks = Vec::new();

        for (i, caps) in headings.iter().enumerate() {
            let (Some(whole), Some(number), Some(title)) = (caps.get(0), caps.get(1), caps.get(2))
            else {
                continue;
            };
            let end = headings
                .get(i + 1)
                .and_then(|next| next.get(0))
                .map_or(text.len(), |m| m.start());
            let body = text[whole.end()..end].trim();
            let number = number.as_str();

            let absaetze = self.absatz_blocks(number, body);
            let children: Vec<String> = absaetze.iter().map(|b| b.id.clone()).collect();
            debug!(paragraph = number, absaetze = children.len(), "paragraph parsed");

            blocks.push(self.paragraph_block(number, title.as_str().trim(), body, children));
            blocks.extend(absaetze);
        }
        blocks
    }

    fn paragraph_block(&self, number: &str, title: &str, body: &str, children: Vec<String>) -> Block {
        let metadata = BlockMetadata {
            law: Some(self.law.clone()),
            paragraph: Some(number.to_string()),
            tags: extract_tags(&format!("{title} {body}")),
            ..Default::default()
        };
        Block::new(
            self.paragraph_id(number),
            "paragraph",
            format!("§ {number} {title}"),
            body,
            self.law.clone(),
        )
        .with_metadata(metadata)
        .with_relationships(BlockRelationships {
            children,
            ..Default::default()
        })
    }

    /// One block per `(n)` marker. A repeated number keeps its first occurrence.
    fn absatz_blocks(&self, number: &str, body: &str) -> Vec<Block> {
        let markers: Vec<_> = ABSATZ_MARKER.captures_iter(body).collect();
        let mut seen = IndexSet::new();
        let mut blocks = Vec::new();

        for (i, caps) in markers.iter().enumerate() {
            let (Some(whole), Some(n)) = (caps.get(0), caps.get(1)) else {
                continue;
            };
            let Ok(absatz) = n.as_str().parse::<u32>() else {
                continue;
            };
            if !seen.insert(absatz) {
                continue;
            }
            let end = markers
                .get(i + 1)
                .and_then(|next| next.get(0))
                .map_or(body.len(), |m| m.start());
            let content = body[whole.end()..end].trim();

            let metadata = BlockMetadata {
                law: Some(self.law.clone()),
                paragraph: Some(number.to_string()),
                absatz: Some(absatz),
                tags: extract_tags(content),
                ..Default::default()
            };
            blocks.push(
                Block::new(
                    self.absatz_id(number, absatz),
                    "absatz",
                    format!("§ {number} Abs. {absatz}"),
                    content,
                    self.law.clone(),
                )
                .with_level(2)
                .with_metadata(metadata)
                .with_relationships(BlockRelationships {
                    parent: Some(self.paragraph_id(number)),
                    ..Default::default()
                }),
            );
        }
        blocks
    }
}

/// Up to five known keywords found in `text`, in keyword order.
pub fn extract_tags(text: &str) -> IndexSet<String> {
    let lower = text.to_lowercase();
    KEYWORDS
        .iter()
        .filter(|k| lower.contains(*k))
        .take(MAX_TAGS)
        .map(|k| k.to_string())
        .collect()
}

/// Guess the law from its text.
pub fn detect_law(text: &str) -> Option<&'static str> {
    if text.contains("SGB IX") || text.contains("Sozialgesetzbuch") {
        Some("SGB IX")
    } else if text.contains("BGB") || text.contains("Bürgerliches Gesetzbuch") {
        Some("BGB")
    } else if text.contains("Grundgesetz") {
        Some("GG")
    } else {
        None
    }
}

/// Read and parse a statute file. Without `law`, the law is detected from the text.
pub fn parse_file(path: &Path, law: Option<&str>) -> Result<Vec<Block>, StoreError> {
    if !path.exists() {
        return Err(StoreError::TextNotFound(path.to_path_buf()));
    }
    let text = std::fs::read_to_string(path)?;
    let law = match law {
        Some(law) => law,
        None => detect_law(&text).ok_or_else(|| StoreError::UnknownLaw(path.to_path_buf()))?,
    };
    Ok(StatuteParser::new(law).parse(&text))
}

impl MemoryStore {
    /// Parse statute text and store the resulting blocks. Existing ids are
    /// skipped with a warning.
    pub fn ingest_text(&self, parser: &StatuteParser, text: &str) -> Result<CatalogSummary, StoreError> {
        self.ingest_blocks(parser.parse(text))
    }

    /// Store parsed blocks, nodes before edges.
    pub fn ingest_blocks(&self, blocks: Vec<Block>) -> Result<CatalogSummary, StoreError> {
        let offered = blocks.len();
        let skipped = self.create_blocks(blocks)?;
        for id in &skipped {
            warn!(block_id = %id, "block exists, skipping");
        }
        let summary = CatalogSummary {
            blocks: offered - skipped.len(),
            skipped: skipped.len(),
            ..Default::default()
        };
        info!(blocks = summary.blocks, skipped = summary.skipped, "statute text ingested");
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::GraphStore;

    const SGB9: &str = "\
Sozialgesetzbuch (SGB) Neuntes Buch (IX)

§ 29 Persönliches Budget
(1) Auf Antrag der Leistungsberechtigten werden Leistungen zur Teilhabe durch
die Leistungsform eines Persönlichen Budgets ausgeführt.
(2) Persönliche Budgets werden in der Regel als Geldleistung ausgeführt.
Nach § 8 bleibt das Wunschrecht unberührt.

§ 35a Ergänzende Leistungen
Die Leistungen werden ergänzt.

§ 8 Wunsch- und Wahlrecht
(1) Bei der Entscheidung über die Leistungen wird berechtigten Wünschen entsprochen.
";

    fn ids(blocks: &[Block]) -> Vec<&str> {
        blocks.iter().map(|b| b.id.as_str()).collect()
    }

    #[test]
    fn paragraphs_and_absaetze_in_text_order() {
        let blocks = StatuteParser::new("SGB IX").parse(SGB9);
        assert_eq!(
            ids(&blocks),
            [
                "sgb_ix_para29",
                "sgb_ix_para29_abs1",
                "sgb_ix_para29_abs2",
                "sgb_ix_para35a",
                "sgb_ix_para8",
                "sgb_ix_para8_abs1",
            ]
        );
    }

    #[test]
    fn paragraph_block_fields() {
        let blocks = StatuteParser::new("SGB IX").parse(SGB9);
        let p29 = &blocks[0];
        assert_eq!(p29.kind, "paragraph");
        assert_eq!(p29.title, "§ 29 Persönliches Budget");
        assert_eq!(p29.level, 1);
        assert_eq!(p29.source, "SGB IX");
        assert_eq!(p29.metadata.paragraph.as_deref(), Some("29"));
        assert_eq!(
            p29.relationships.children,
            ["sgb_ix_para29_abs1", "sgb_ix_para29_abs2"]
        );
        assert!(p29.content.starts_with("(1) Auf Antrag"));
        assert!(p29.content.ends_with("Wunschrecht unberührt."));
        // An inline "§ 8" reference is not a heading.
        assert_eq!(blocks.iter().filter(|b| b.id == "sgb_ix_para8").count(), 1);
    }

    #[test]
    fn absatz_block_fields() {
        let blocks = StatuteParser::new("SGB IX").parse(SGB9);
        let abs2 = &blocks[2];
        assert_eq!(abs2.kind, "absatz");
        assert_eq!(abs2.title, "§ 29 Abs. 2");
        assert_eq!(abs2.level, 2);
        assert_eq!(abs2.metadata.absatz, Some(2));
        assert_eq!(abs2.relationships.parent.as_deref(), Some("sgb_ix_para29"));
        assert!(abs2.content.starts_with("Persönliche Budgets"));
        assert!(!abs2.content.contains("(2)"));
    }

    #[test]
    fn paragraph_without_absaetze() {
        let blocks = StatuteParser::new("SGB IX").parse(SGB9);
        let p35a = blocks.iter().find(|b| b.id == "sgb_ix_para35a").unwrap();
        assert!(p35a.relationships.children.is_empty());
        assert_eq!(p35a.content, "Die Leistungen werden ergänzt.");
    }

    #[test]
    fn keyword_tags_are_capped() {
        let tags = extract_tags("Antrag auf Teilhabe am Arbeitsleben, Bescheid, Widerspruch, Rehabilitation");
        assert_eq!(tags.len(), MAX_TAGS);
        assert_eq!(tags.first().map(String::as_str), Some("teilhabe"));
        let blocks = StatuteParser::new("SGB IX").parse(SGB9);
        assert!(blocks[0].metadata.tags.contains("budget"));
    }

    #[test]
    fn text_without_headings_yields_nothing() {
        assert!(StatuteParser::new("SGB IX").parse("(1) Nur ein Absatz.").is_empty());
    }

    #[test]
    fn law_detection() {
        assert_eq!(detect_law(SGB9), Some("SGB IX"));
        assert_eq!(detect_law("Bürgerliches Gesetzbuch"), Some("BGB"));
        assert_eq!(detect_law("Grundgesetz für die Bundesrepublik"), Some("GG"));
        assert_eq!(detect_law("Satzung des Vereins"), None);
    }

    #[tokio::test]
    async fn ingested_blocks_are_linked_both_ways() {
        let store = MemoryStore::new();
        let summary = store
            .ingest_text(&StatuteParser::new("SGB IX"), SGB9)
            .unwrap();
        assert_eq!(summary.blocks, 6);
        assert_eq!(summary.skipped, 0);

        let rel = store.relationships("sgb_ix_para29").unwrap();
        assert_eq!(rel.children, ["sgb_ix_para29_abs1", "sgb_ix_para29_abs2"]);
        let rel = store.relationships("sgb_ix_para29_abs1").unwrap();
        assert_eq!(rel.parent.as_deref(), Some("sgb_ix_para29"));

        // Sibling Absätze meet through their paragraph.
        let near = store.traverse("sgb_ix_para29_abs1", 2).await.unwrap();
        assert!(near.contains("sgb_ix_para29"));
        assert!(near.contains("sgb_ix_para29_abs2"));
        assert!(!near.contains("sgb_ix_para8"));

        let again = store
            .ingest_text(&StatuteParser::new("SGB IX"), SGB9)
            .unwrap();
        assert_eq!((again.blocks, again.skipped), (0, 6));
    }

    fn data_dir() -> std::path::PathBuf {
        std::path::PathBuf::from(env!("CARGO_MANIFEST_DIR"))
            .join("..")
            .join("..")
            .join("data")
    }

    #[tokio::test]
    async fn statute_text_extends_a_loaded_catalog() {
        let store = MemoryStore::from_catalog_file(&data_dir().join("widerspruch.json")).unwrap();
        let before = store.block_count().unwrap();

        let blocks = parse_file(&data_dir().join("sgb9_budget.txt"), Some("SGB9")).unwrap();
        assert_eq!(blocks.len(), 9);
        let summary = store.ingest_blocks(blocks).unwrap();
        // § 8, § 29 and § 29 Abs. 1 and 2 are already in the catalog.
        assert_eq!(summary.skipped, 4);
        assert_eq!(store.block_count().unwrap(), before + summary.blocks);

        // New Absätze hang off the catalog's existing paragraph.
        let rel = store.relationships("sgb9_para29_abs3").unwrap();
        assert_eq!(rel.parent.as_deref(), Some("sgb9_para29"));
        let near = store.traverse("sgb9_para8", 1).await.unwrap();
        assert!(near.contains("sgb9_para8_abs1"));
        assert!(near.contains("sgb9_para8_abs2"));

        let p49 = store.relationships("sgb9_para49").unwrap();
        assert_eq!(p49.children, ["sgb9_para49_abs1"]);
    }

    #[test]
    fn file_parsing_detects_law() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("sgb9.txt");
        std::fs::write(&path, SGB9).unwrap();
        let blocks = parse_file(&path, None).unwrap();
        assert_eq!(blocks[0].id, "sgb_ix_para29");

        let blocks = parse_file(&path, Some("SGB XII")).unwrap();
        assert_eq!(blocks[0].id, "sgb_xii_para29");

        std::fs::write(&path, "§ 1 Zweck\nText").unwrap();
        assert!(matches!(parse_file(&path, None), Err(StoreError::UnknownLaw(_))));
        assert!(matches!(
            parse_file(&tmp.path().join("missing.txt"), None),
            Err(StoreError::TextNotFound(_))
        ));
    }
}
