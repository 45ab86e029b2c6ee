//! Decoding fixed-shape records out of lists.
//!
//! The engine encodes structured data as lists with a known layout, such as
//! `(page xmin ymin xmax ymax "text")`. A [`RecordShape`] names that layout
//! and [`decode_record`] checks it strictly: a wrong length or field variant
//! is a [`DjvuError::MalformedRecord`], never a partial result.

use smallvec::SmallVec;

use super::error::{DjvuError, DjvuResult};
use super::expr::{Expr, ExprKind, ListIter};

/// The expected layout of a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordShape {
    /// Used in error messages
    pub name: &'static str,
    /// Variant of each leading field, in order
    pub fields: &'static [ExprKind],
}

impl RecordShape {
    pub const fn new(name: &'static str, fields: &'static [ExprKind]) -> Self {
        RecordShape { name, fields }
    }

    pub const fn arity(&self) -> usize {
        self.fields.len()
    }
}

/// The checked fields of a record.
#[derive(Debug, Clone)]
pub struct Record<'a> {
    shape: RecordShape,
    fields: SmallVec<[Expr<'a>; 8]>,
}

impl<'a> Record<'a> {
    pub fn shape(&self) -> RecordShape {
        self.shape
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Field `index`. The shape has already been checked, so this only fails
    /// for an index beyond the shape.
    pub fn get(&self, index: usize) -> DjvuResult<Expr<'a>> {
        self.fields
            .get(index)
            .copied()
            .ok_or(DjvuError::IndexOutOfRange {
                index,
                length: self.fields.len(),
            })
    }

    pub fn integer(&self, index: usize) -> DjvuResult<i32> {
        self.get(index)?.as_integer()
    }

    pub fn float(&self, index: usize) -> DjvuResult<f64> {
        self.get(index)?.as_number()
    }

    pub fn string(&self, index: usize) -> DjvuResult<String> {
        self.get(index)?.as_string()
    }

    pub fn symbol(&self, index: usize) -> DjvuResult<String> {
        self.get(index)?.symbol_name()
    }

    pub fn iter(&self) -> impl Iterator<Item = Expr<'a>> + '_ {
        self.fields.iter().copied()
    }
}

/// Decodes a record that has exactly the fields of `shape`.
pub fn decode_record<'a>(expr: &Expr<'a>, shape: &RecordShape) -> DjvuResult<Record<'a>> {
    let (record, mut rest) = decode_prefix(expr, shape)?;
    if rest.next().is_some() {
        let length = expr.length()?;
        return Err(DjvuError::malformed(
            shape.name,
            format!("expected {} elements, found {}", shape.arity(), length),
        ));
    }
    Ok(record)
}

/// Decodes the leading fields of `shape` and hands back the remaining
/// elements for the caller to interpret.
pub fn decode_prefix<'a>(expr: &Expr<'a>, shape: &RecordShape) -> DjvuResult<(Record<'a>, ListIter<'a>)> {
    let list = expr.as_list().map_err(|_| {
        DjvuError::malformed(
            shape.name,
            format!("expected a list, found {}", expr.kind()),
        )
    })?;

    if list.terminator().is_some() {
        return Err(DjvuError::malformed(shape.name, "dotted list"));
    }

    let mut items = list.iter();
    let mut fields = SmallVec::new();

    for (index, &expected) in shape.fields.iter().enumerate() {
        let Some(item) = items.next() else {
            return Err(DjvuError::malformed(
                shape.name,
                format!("expected {} elements, found {}", shape.arity(), index),
            ));
        };
        if item.kind() != expected {
            return Err(DjvuError::malformed(
                shape.name,
                format!("field {}: expected {}, found {}", index, expected, item.kind()),
            ));
        }
        fields.push(item);
    }

    Ok((
        Record {
            shape: *shape,
            fields,
        },
        items,
    ))
}
