//! Hidden text layer of a page.
//!
//! Page text comes back as nested zones:
//!
//! ```text
//! (page 0 0 2550 3300
//!   (line 100 3000 900 3050
//!     (word 100 3000 400 3050 "Hello")
//!     (word 450 3000 900 3050 "world")))
//! ```
//!
//! Each zone is `(kind xmin ymin xmax ymax` followed by either one string or
//! one or more child zones. At the detail level of the query, zones carry
//! their text directly.

use super::error::{DjvuError, DjvuResult};
use super::expr::{Expr, ExprKind};
use super::record::{decode_prefix, decode_record, RecordShape};
use super::types::TextDetail;

/// Zone kinds are the text detail levels.
pub type ZoneKind = TextDetail;

const ZONE: RecordShape = RecordShape::new(
    "text zone",
    &[
        ExprKind::Symbol,
        ExprKind::Integer,
        ExprKind::Integer,
        ExprKind::Integer,
        ExprKind::Integer,
    ],
);

/// The page-level record returned for [`TextDetail::Page`] queries.
pub const PAGE_TEXT: RecordShape = RecordShape::new(
    "page text",
    &[
        ExprKind::Symbol,
        ExprKind::Integer,
        ExprKind::Integer,
        ExprKind::Integer,
        ExprKind::Integer,
        ExprKind::String,
    ],
);

/// A rectangle in page coordinates, origin at the bottom left.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Rect {
    pub xmin: i32,
    pub ymin: i32,
    pub xmax: i32,
    pub ymax: i32,
}

impl Rect {
    pub fn new(xmin: i32, ymin: i32, xmax: i32, ymax: i32) -> Self {
        Rect { xmin, ymin, xmax, ymax }
    }

    pub fn width(&self) -> i32 {
        self.xmax - self.xmin
    }

    pub fn height(&self) -> i32 {
        self.ymax - self.ymin
    }

    pub fn contains(&self, x: i32, y: i32) -> bool {
        x >= self.xmin && x <= self.xmax && y >= self.ymin && y <= self.ymax
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ZoneContent {
    Text(String),
    Zones(Vec<TextZone>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct TextZone {
    pub kind: ZoneKind,
    pub rect: Rect,
    pub content: ZoneContent,
}

impl TextZone {
    /// Decodes a zone and all of its children.
    pub fn decode(expr: &Expr<'_>) -> DjvuResult<Self> {
        let (record, rest) = decode_prefix(expr, &ZONE)?;

        let kind_name = record.symbol(0)?;
        let kind = kind_name
            .parse::<ZoneKind>()
            .map_err(|_| DjvuError::malformed(ZONE.name, format!("unknown zone kind {}", kind_name)))?;

        let rect = Rect::new(
            record.integer(1)?,
            record.integer(2)?,
            record.integer(3)?,
            record.integer(4)?,
        );

        let rest: Vec<Expr<'_>> = rest.collect();
        let content = match rest.as_slice() {
            [] => {
                return Err(DjvuError::malformed(
                    ZONE.name,
                    format!("{} zone has no content", kind),
                ));
            }
            [single] if single.is(ExprKind::String) => ZoneContent::Text(single.as_string()?),
            children => ZoneContent::Zones(
                children
                    .iter()
                    .map(|child| {
                        if child.is(ExprKind::List) {
                            TextZone::decode(child)
                        } else {
                            Err(DjvuError::malformed(
                                ZONE.name,
                                format!("{} zone mixes text and child zones", kind),
                            ))
                        }
                    })
                    .collect::<DjvuResult<_>>()?,
            ),
        };

        Ok(TextZone { kind, rect, content })
    }

    pub fn children(&self) -> &[TextZone] {
        match &self.content {
            ZoneContent::Zones(zones) => zones,
            ZoneContent::Text(_) => &[],
        }
    }

    /// The zone's text, children joined by their natural separator:
    /// nothing between characters, spaces between words and newlines
    /// between lines and larger zones.
    pub fn text(&self) -> String {
        match &self.content {
            ZoneContent::Text(text) => text.clone(),
            ZoneContent::Zones(zones) => {
                let mut out = String::new();
                for (index, zone) in zones.iter().enumerate() {
                    if index > 0 {
                        out.push_str(separator(zone.kind));
                    }
                    out.push_str(&zone.text());
                }
                out
            }
        }
    }

    /// Every zone of `kind` in this subtree, in reading order.
    pub fn zones_of(&self, kind: ZoneKind) -> Vec<&TextZone> {
        let mut found = Vec::new();
        self.collect_zones(kind, &mut found);
        found
    }

    fn collect_zones<'z>(&'z self, kind: ZoneKind, found: &mut Vec<&'z TextZone>) {
        if self.kind == kind {
            found.push(self);
        }
        for child in self.children() {
            child.collect_zones(kind, found);
        }
    }
}

fn separator(kind: ZoneKind) -> &'static str {
    match kind {
        ZoneKind::Char => "",
        ZoneKind::Word => " ",
        _ => "\n",
    }
}

/// Extracts the text of a page-level record
/// `(page xmin ymin xmax ymax "text")`.
pub fn full_text(expr: &Expr<'_>) -> DjvuResult<String> {
    decode_record(expr, &PAGE_TEXT)?.string(5)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::memory::MemoryEngine;
    use crate::core::reader::read;

    const NESTED: &str = r#"(page 0 0 2550 3300
        (line 100 3000 900 3050
            (word 100 3000 400 3050 "Hello")
            (word 450 3000 900 3050 "world"))
        (line 100 2900 500 2950
            (word 100 2900 500 2950 "again")))"#;

    #[test]
    fn test_full_text_record() {
        let engine = MemoryEngine::new();
        let expr = read(&engine, r#"(page 373 150 2190 3119 "Page text")"#).unwrap();
        assert_eq!(full_text(&expr).unwrap(), "Page text");
    }

    #[test]
    fn test_full_text_wrong_arity() {
        let engine = MemoryEngine::new();
        let expr = read(&engine, "(page 373 150 2190 3119)").unwrap();
        assert!(matches!(
            full_text(&expr),
            Err(DjvuError::MalformedRecord { .. })
        ));
    }

    #[test]
    fn test_nested_zones() {
        let engine = MemoryEngine::new();
        let zone = TextZone::decode(&read(&engine, NESTED).unwrap()).unwrap();

        assert_eq!(zone.kind, ZoneKind::Page);
        assert_eq!(zone.rect, Rect::new(0, 0, 2550, 3300));
        assert_eq!(zone.children().len(), 2);
        assert_eq!(zone.text(), "Hello world\nagain");

        let words: Vec<_> = zone.zones_of(ZoneKind::Word).iter().map(|w| w.text()).collect();
        assert_eq!(words, vec!["Hello", "world", "again"]);
        assert_eq!(zone.children()[0].rect.width(), 800);
    }

    #[test]
    fn test_characters_join_without_spaces() {
        let engine = MemoryEngine::new();
        let expr = read(
            &engine,
            r#"(word 0 0 20 10 (char 0 0 10 10 "o") (char 10 0 20 10 "k"))"#,
        )
        .unwrap();
        assert_eq!(TextZone::decode(&expr).unwrap().text(), "ok");
    }

    #[test]
    fn test_malformed_zones() {
        let engine = MemoryEngine::new();
        for text in [
            "(page 0 0 10 10)",
            "(page 0 0 10 \"10\" \"x\")",
            "(banner 0 0 10 10 \"x\")",
            "(line 0 0 10 10 \"x\" (word 0 0 1 1 \"y\"))",
            "(line 0 0 10 10 (word 0 0 1 1))",
        ] {
            let expr = read(&engine, text).unwrap();
            assert!(
                matches!(TextZone::decode(&expr), Err(DjvuError::MalformedRecord { .. })),
                "{} should be malformed",
                text
            );
        }
    }
}
