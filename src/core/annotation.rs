//! Document and page annotations.
//!
//! Annotations come back as a list of forms in the djvused syntax:
//!
//! ```text
//! ((background #ffffff)
//!  (zoom page)
//!  (metadata (Title "Manual") (Author "Someone"))
//!  (maparea "http://example.com" "Example" (rect 10 10 100 40) (border #ff0000)))
//! ```

use super::dump::dump_compact;
use super::error::{DjvuError, DjvuResult};
use super::expr::{Expr, ExprKind, ListExpr, ListIter};
use super::record::{decode_prefix, decode_record, RecordShape};

const SETTING: RecordShape = RecordShape::new("annotation setting", &[ExprKind::Symbol, ExprKind::Symbol]);
const ALIGN: RecordShape = RecordShape::new(
    "align",
    &[ExprKind::Symbol, ExprKind::Symbol, ExprKind::Symbol],
);
const XMP: RecordShape = RecordShape::new("xmp", &[ExprKind::Symbol, ExprKind::String]);
const METADATA: RecordShape = RecordShape::new("metadata", &[ExprKind::Symbol]);
const METADATA_ENTRY: RecordShape = RecordShape::new("metadata entry", &[ExprKind::Symbol, ExprKind::String]);
const MAPAREA: RecordShape = RecordShape::new("maparea", &[ExprKind::Symbol]);
const URL: RecordShape = RecordShape::new(
    "maparea url",
    &[ExprKind::Symbol, ExprKind::String, ExprKind::String],
);
const SHAPE: RecordShape = RecordShape::new("maparea shape", &[ExprKind::Symbol]);

/// Geometry of a hyperlink area.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShapeKind {
    Rect,
    Oval,
    Poly,
    Line,
    Text,
}

impl ShapeKind {
    fn from_name(name: &str) -> Option<Self> {
        match name {
            "rect" => Some(ShapeKind::Rect),
            "oval" => Some(ShapeKind::Oval),
            "poly" => Some(ShapeKind::Poly),
            "line" => Some(ShapeKind::Line),
            "text" => Some(ShapeKind::Text),
            _ => None,
        }
    }
}

/// An area shape with its integer coordinates.
///
/// `rect`, `oval` and `text` carry `x y width height`; `line` carries two
/// points and `poly` any number of points.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Shape {
    pub kind: ShapeKind,
    pub coords: Vec<i32>,
}

/// One `maparea` annotation.
#[derive(Debug, Clone, PartialEq)]
pub struct Hyperlink {
    pub url: String,
    /// Frame target, from the `(url "href" "target")` form
    pub target: Option<String>,
    pub comment: String,
    pub shape: Shape,
    /// Display options such as `(border #ff0000)`, printed compactly
    pub options: Vec<String>,
}

/// The annotation forms of a document or a page.
#[derive(Debug, Clone, Copy)]
pub struct Annotations<'a> {
    list: ListExpr<'a>,
}

impl<'a> Annotations<'a> {
    /// Wraps an annotation list. Nil is a list with no forms.
    pub fn new(expr: Expr<'a>) -> DjvuResult<Self> {
        let list = expr.as_list().map_err(|_| {
            DjvuError::malformed(
                "annotations",
                format!("expected a list, found {}", expr.kind()),
            )
        })?;
        Ok(Annotations { list })
    }

    pub fn expr(&self) -> Expr<'a> {
        self.list.expr()
    }

    /// Every top-level form.
    pub fn forms(&self) -> ListIter<'a> {
        self.list.iter()
    }

    /// Forms whose head is the symbol `name`.
    pub fn forms_named(&self, name: &'a str) -> impl Iterator<Item = Expr<'a>> + 'a {
        self.forms().filter(move |form| {
            form.as_list()
                .ok()
                .and_then(|list| list.first())
                .is_some_and(|head| head.is_symbol_named(name))
        })
    }

    fn setting(&self, name: &'a str) -> DjvuResult<Option<String>> {
        match self.forms_named(name).next() {
            Some(form) => Ok(Some(decode_record(&form, &SETTING)?.symbol(1)?)),
            None => Ok(None),
        }
    }

    /// Background color as `#RRGGBB`.
    pub fn background(&self) -> DjvuResult<Option<String>> {
        self.setting("background")
    }

    /// Initial zoom: `stretch`, `one2one`, `width`, `page` or `dNNN`.
    pub fn zoom(&self) -> DjvuResult<Option<String>> {
        self.setting("zoom")
    }

    /// Initial display mode: `color`, `bw`, `fore` or `back`.
    pub fn mode(&self) -> DjvuResult<Option<String>> {
        self.setting("mode")
    }

    pub fn horizontal_align(&self) -> DjvuResult<Option<String>> {
        self.align(1)
    }

    pub fn vertical_align(&self) -> DjvuResult<Option<String>> {
        self.align(2)
    }

    fn align(&self, field: usize) -> DjvuResult<Option<String>> {
        match self.forms_named("align").next() {
            Some(form) => Ok(Some(decode_record(&form, &ALIGN)?.symbol(field)?)),
            None => Ok(None),
        }
    }

    /// Key/value pairs from every `metadata` form, in order.
    pub fn metadata(&self) -> DjvuResult<Vec<(String, String)>> {
        let mut entries = Vec::new();
        for form in self.forms_named("metadata") {
            let (_, rest) = decode_prefix(&form, &METADATA)?;
            for entry in rest {
                let record = decode_record(&entry, &METADATA_ENTRY)?;
                entries.push((record.symbol(0)?, record.string(1)?));
            }
        }
        Ok(entries)
    }

    /// Value of one metadata key.
    pub fn metadata_value(&self, key: &str) -> DjvuResult<Option<String>> {
        Ok(self
            .metadata()?
            .into_iter()
            .find(|(name, _)| name == key)
            .map(|(_, value)| value))
    }

    /// The XMP packet, if any.
    pub fn xmp(&self) -> DjvuResult<Option<String>> {
        match self.forms_named("xmp").next() {
            Some(form) => Ok(Some(decode_record(&form, &XMP)?.string(1)?)),
            None => Ok(None),
        }
    }

    /// Every `maparea` form, decoded.
    pub fn hyperlinks(&self) -> DjvuResult<Vec<Hyperlink>> {
        self.forms_named("maparea")
            .map(|form| decode_hyperlink(&form))
            .collect()
    }
}

/// Decodes `(maparea URL COMMENT AREA OPTIONS...)`.
fn decode_hyperlink(form: &Expr<'_>) -> DjvuResult<Hyperlink> {
    let (_, mut rest) = decode_prefix(form, &MAPAREA)?;

    let url_expr = rest
        .next()
        .ok_or_else(|| DjvuError::malformed(MAPAREA.name, "missing url"))?;
    let (url, target) = match url_expr.kind() {
        ExprKind::String => (url_expr.as_string()?, None),
        ExprKind::List => {
            let record = decode_record(&url_expr, &URL)?;
            (record.string(1)?, Some(record.string(2)?))
        }
        other => {
            return Err(DjvuError::malformed(
                MAPAREA.name,
                format!("url must be a string or a url form, found {}", other),
            ));
        }
    };

    let comment = match rest.next() {
        Some(expr) if expr.is(ExprKind::String) => expr.as_string()?,
        Some(expr) => {
            return Err(DjvuError::malformed(
                MAPAREA.name,
                format!("comment must be a string, found {}", expr.kind()),
            ));
        }
        None => return Err(DjvuError::malformed(MAPAREA.name, "missing comment")),
    };

    let shape_expr = rest
        .next()
        .ok_or_else(|| DjvuError::malformed(MAPAREA.name, "missing area"))?;
    let shape = decode_shape(&shape_expr)?;

    let options = rest.map(|option| dump_compact(&option)).collect();

    Ok(Hyperlink {
        url,
        target,
        comment,
        shape,
        options,
    })
}

fn decode_shape(expr: &Expr<'_>) -> DjvuResult<Shape> {
    let (record, rest) = decode_prefix(expr, &SHAPE)?;
    let name = record.symbol(0)?;
    let kind = ShapeKind::from_name(&name)
        .ok_or_else(|| DjvuError::malformed(SHAPE.name, format!("unknown shape {}", name)))?;

    let coords = rest
        .map(|coord| {
            coord.as_integer().map_err(|_| {
                DjvuError::malformed(
                    SHAPE.name,
                    format!("{} coordinate must be an integer, found {}", name, coord.kind()),
                )
            })
        })
        .collect::<DjvuResult<Vec<i32>>>()?;

    let valid = match kind {
        ShapeKind::Rect | ShapeKind::Oval | ShapeKind::Text | ShapeKind::Line => coords.len() == 4,
        ShapeKind::Poly => coords.len() >= 6 && coords.len() % 2 == 0,
    };
    if !valid {
        return Err(DjvuError::malformed(
            SHAPE.name,
            format!("{} with {} coordinates", name, coords.len()),
        ));
    }

    Ok(Shape { kind, coords })
}
