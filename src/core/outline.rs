//! Document outline (bookmarks).
//!
//! `(bookmarks ("Title" "#page" children...) ...)`, where every child has
//! the same shape as its parent.

use super::error::{DjvuError, DjvuResult};
use super::expr::{Expr, ExprKind};
use super::record::{decode_prefix, RecordShape};

const BOOKMARKS: RecordShape = RecordShape::new("bookmarks", &[ExprKind::Symbol]);
const ENTRY: RecordShape = RecordShape::new("bookmark", &[ExprKind::String, ExprKind::String]);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutlineEntry {
    pub title: String,
    /// Usually `#<page number>` or `#<page id>`
    pub url: String,
    pub children: Vec<OutlineEntry>,
}

impl OutlineEntry {
    /// The 1-based page a `#NNN` url points at.
    pub fn page_number(&self) -> Option<usize> {
        self.url.strip_prefix('#')?.parse().ok()
    }

    /// Number of entries in this subtree, itself included.
    pub fn count(&self) -> usize {
        1 + self.children.iter().map(OutlineEntry::count).sum::<usize>()
    }

    fn decode(expr: &Expr<'_>) -> DjvuResult<Self> {
        let (record, rest) = decode_prefix(expr, &ENTRY)?;
        Ok(OutlineEntry {
            title: record.string(0)?,
            url: record.string(1)?,
            children: rest
                .map(|child| OutlineEntry::decode(&child))
                .collect::<DjvuResult<_>>()?,
        })
    }
}

/// Decodes a `bookmarks` form into its top-level entries.
pub fn decode_outline(expr: &Expr<'_>) -> DjvuResult<Vec<OutlineEntry>> {
    let (record, rest) = decode_prefix(expr, &BOOKMARKS)?;
    if !record.get(0)?.is_symbol_named("bookmarks") {
        return Err(DjvuError::malformed(
            BOOKMARKS.name,
            format!("unexpected head {}", record.get(0)?),
        ));
    }
    rest.map(|entry| OutlineEntry::decode(&entry)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::memory::MemoryEngine;
    use crate::core::reader::read;

    #[test]
    fn test_nested_outline() {
        let engine = MemoryEngine::new();
        let expr = read(
            &engine,
            r##"(bookmarks
                ("Introduction" "#1")
                ("Chapter 1" "#3"
                    ("Section 1.1" "#4")
                    ("Section 1.2" "#page7")))"##,
        )
        .unwrap();

        let outline = decode_outline(&expr).unwrap();
        assert_eq!(outline.len(), 2);
        assert_eq!(outline[0].title, "Introduction");
        assert_eq!(outline[0].page_number(), Some(1));
        assert_eq!(outline[1].children.len(), 2);
        assert_eq!(outline[1].count(), 3);
        assert_eq!(outline[1].children[1].page_number(), None);
    }

    #[test]
    fn test_malformed_outline() {
        let engine = MemoryEngine::new();
        for text in [
            "(contents (\"A\" \"#1\"))",
            "(bookmarks (\"A\"))",
            "(bookmarks (\"A\" \"#1\" leaf))",
        ] {
            let expr = read(&engine, text).unwrap();
            assert!(
                matches!(decode_outline(&expr), Err(DjvuError::MalformedRecord { .. })),
                "{} should be malformed",
                text
            );
        }
    }
}
