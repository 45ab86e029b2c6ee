//! Typed access to engine S-expressions.
//!
//! An [`Expr`] pairs a raw tagged pointer with the variant it was classified
//! as when it was wrapped. The classification happens exactly once:
//!
//! | low bits | variant                                          |
//! |----------|--------------------------------------------------|
//! | `00`     | list (pair, or nil as the empty list)            |
//! | `10`     | symbol                                           |
//! | `11`     | integer, value is the handle shifted right by 2  |
//! | `01`     | boxed object: string or float, asked of engine   |
//!
//! Accessors for a specific variant fail with
//! [`DjvuError::InvalidVariantAccess`] instead of reinterpreting the handle.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::ops::Deref;

use super::engine::{Engine, GcLock};
use super::error::{DjvuError, DjvuResult};
use super::handle::{RawExpr, RootHandle, TAG_INTEGER, TAG_OBJECT, TAG_PAIR, TAG_SYMBOL};

/// The five logical expression variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExprKind {
    List,
    Symbol,
    Integer,
    Float,
    String,
}

impl ExprKind {
    pub fn name(self) -> &'static str {
        match self {
            ExprKind::List => "list",
            ExprKind::Symbol => "symbol",
            ExprKind::Integer => "integer",
            ExprKind::Float => "float",
            ExprKind::String => "string",
        }
    }
}

impl fmt::Display for ExprKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Classifies a raw handle from its tag bits.
///
/// Object-tagged handles need the engine's string and float predicates. An
/// object that is neither is logged and reported as a float, the only other
/// object kind the engine creates; [`Expr::new`] rejects such handles.
pub fn classify(engine: &dyn Engine, raw: RawExpr) -> ExprKind {
    match raw.tag() {
        TAG_PAIR => ExprKind::List,
        TAG_SYMBOL => ExprKind::Symbol,
        TAG_INTEGER => ExprKind::Integer,
        _ if engine.is_string(raw) => ExprKind::String,
        _ if engine.is_float(raw) => ExprKind::Float,
        _ => {
            tracing::warn!(raw = ?raw, "object expression is neither a string nor a float");
            ExprKind::Float
        }
    }
}

fn is_foreign_object(engine: &dyn Engine, raw: RawExpr) -> bool {
    raw.tag() == TAG_OBJECT && !engine.is_string(raw) && !engine.is_float(raw)
}

/// A classified expression borrowed from the engine.
///
/// Valid for as long as the document or context that produced it.
#[derive(Clone, Copy)]
pub struct Expr<'a> {
    raw: RawExpr,
    kind: ExprKind,
    engine: &'a dyn Engine,
}

impl<'a> Expr<'a> {
    /// Wraps and classifies a raw handle.
    ///
    /// The dummy sentinel is not an expression and is rejected, as is an
    /// object the engine recognises as neither a string nor a float.
    pub fn new(engine: &'a dyn Engine, raw: RawExpr) -> DjvuResult<Self> {
        if raw.is_dummy() {
            return Err(DjvuError::InvalidHandle(
                "the dummy sentinel is not a resolved expression".to_string(),
            ));
        }
        if is_foreign_object(engine, raw) {
            return Err(DjvuError::InvalidHandle(format!(
                "{:?} is an object of unknown kind",
                raw
            )));
        }
        Ok(Self::classified(engine, raw))
    }

    pub(crate) fn classified(engine: &'a dyn Engine, raw: RawExpr) -> Self {
        Expr {
            raw,
            kind: classify(engine, raw),
            engine,
        }
    }

    /// The empty list.
    pub fn nil(engine: &'a dyn Engine) -> Self {
        Expr {
            raw: RawExpr::NIL,
            kind: ExprKind::List,
            engine,
        }
    }

    /// Builds an integer expression.
    pub fn integer(engine: &'a dyn Engine, value: i64) -> DjvuResult<Self> {
        let raw = RawExpr::checked_int(value).ok_or(DjvuError::IntegerOutOfRange(value))?;
        Ok(Expr {
            raw,
            kind: ExprKind::Integer,
            engine,
        })
    }

    /// Asks the engine to allocate a string expression.
    pub fn string(engine: &'a dyn Engine, text: &str) -> DjvuResult<OwnedExpr<'a>> {
        let raw = engine
            .new_string(text)
            .ok_or_else(|| DjvuError::InvalidHandle(format!("cannot allocate string {:?}", text)))?;
        Ok(OwnedExpr::new(Expr {
            raw,
            kind: ExprKind::String,
            engine,
        }))
    }

    /// Interns a symbol.
    pub fn symbol(engine: &'a dyn Engine, name: &str) -> DjvuResult<Self> {
        let raw = engine
            .intern(name)
            .ok_or_else(|| DjvuError::InvalidHandle(format!("cannot intern symbol {:?}", name)))?;
        Ok(Expr {
            raw,
            kind: ExprKind::Symbol,
            engine,
        })
    }

    pub fn float(engine: &'a dyn Engine, value: f64) -> OwnedExpr<'a> {
        OwnedExpr::new(Expr {
            raw: engine.new_float(value),
            kind: ExprKind::Float,
            engine,
        })
    }

    /// Builds a proper list from its elements.
    ///
    /// Collection is held off until the finished list is rooted, so the
    /// elements only need to stay reachable for the duration of the call.
    pub fn list<E: AsRef<Expr<'a>>>(engine: &'a dyn Engine, items: &[E]) -> OwnedExpr<'a> {
        let _lock = GcLock::new(engine);
        let raw = items
            .iter()
            .rev()
            .fold(RawExpr::NIL, |tail, item| engine.cons(item.as_ref().raw, tail));
        OwnedExpr::new(Expr {
            raw,
            kind: ExprKind::List,
            engine,
        })
    }

    pub fn raw(&self) -> RawExpr {
        self.raw
    }

    pub fn kind(&self) -> ExprKind {
        self.kind
    }

    pub fn engine(&self) -> &'a dyn Engine {
        self.engine
    }

    pub fn is_nil(&self) -> bool {
        self.raw.is_nil()
    }

    pub fn is(&self, kind: ExprKind) -> bool {
        self.kind == kind
    }

    fn expect(&self, expected: ExprKind) -> DjvuResult<()> {
        if self.kind == expected {
            Ok(())
        } else {
            Err(DjvuError::InvalidVariantAccess {
                expected,
                found: self.kind,
            })
        }
    }

    pub fn as_integer(&self) -> DjvuResult<i32> {
        self.expect(ExprKind::Integer)?;
        Ok(self.raw.int_value())
    }

    pub fn as_float(&self) -> DjvuResult<f64> {
        self.expect(ExprKind::Float)?;
        Ok(self.engine.float_value(self.raw))
    }

    /// Integers and floats both read as `f64`.
    pub fn as_number(&self) -> DjvuResult<f64> {
        match self.kind {
            ExprKind::Integer => Ok(self.raw.int_value() as f64),
            ExprKind::Float => Ok(self.engine.float_value(self.raw)),
            found => Err(DjvuError::InvalidVariantAccess {
                expected: ExprKind::Float,
                found,
            }),
        }
    }

    pub fn as_symbol(&self) -> DjvuResult<Symbol<'a>> {
        self.expect(ExprKind::Symbol)?;
        Ok(Symbol { expr: *self })
    }

    /// Name of a symbol expression.
    pub fn symbol_name(&self) -> DjvuResult<String> {
        self.as_symbol()?.name()
    }

    /// Copies the text of a string expression.
    pub fn as_string(&self) -> DjvuResult<String> {
        self.expect(ExprKind::String)?;
        StringExpr { expr: *self }.value()
    }

    pub fn as_string_expr(&self) -> DjvuResult<StringExpr<'a>> {
        self.expect(ExprKind::String)?;
        Ok(StringExpr { expr: *self })
    }

    pub fn as_list(&self) -> DjvuResult<ListExpr<'a>> {
        if self.kind != ExprKind::List {
            return Err(DjvuError::NotAList { found: self.kind });
        }
        Ok(ListExpr { expr: *self })
    }

    /// Number of elements, walking the pair links.
    pub fn length(&self) -> DjvuResult<usize> {
        Ok(self.as_list()?.len())
    }

    /// Element `index`, 0-based.
    pub fn nth(&self, index: usize) -> DjvuResult<Expr<'a>> {
        self.as_list()?.nth(index)
    }

    /// True if this is the symbol with the given name.
    ///
    /// Symbols are interned, so this compares handles.
    pub fn is_symbol_named(&self, name: &str) -> bool {
        self.kind == ExprKind::Symbol && self.engine.intern(name) == Some(self.raw)
    }

    /// Splits the expression into its variant for pattern matching.
    pub fn view(&self) -> ExprView<'a> {
        match self.kind {
            ExprKind::List => ExprView::List(ListExpr { expr: *self }),
            ExprKind::Symbol => ExprView::Symbol(Symbol { expr: *self }),
            ExprKind::Integer => ExprView::Integer(self.raw.int_value()),
            ExprKind::Float => ExprView::Float(self.engine.float_value(self.raw)),
            ExprKind::String => ExprView::String(StringExpr { expr: *self }),
        }
    }
}

impl PartialEq for Expr<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.raw == other.raw
    }
}

impl Eq for Expr<'_> {}

impl Hash for Expr<'_> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.raw.hash(state);
    }
}

impl fmt::Debug for Expr<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Expr")
            .field("kind", &self.kind)
            .field("raw", &self.raw)
            .finish()
    }
}

impl fmt::Display for Expr<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        super::dump::write_compact(f, self)
    }
}

impl<'a> AsRef<Expr<'a>> for Expr<'a> {
    fn as_ref(&self) -> &Expr<'a> {
        self
    }
}

/// An expression built on this side of the engine, kept alive until dropped.
///
/// Expressions returned by document queries belong to their document.
/// Expressions allocated by [`Expr::string`], [`Expr::float`],
/// [`Expr::list`] or the reader belong to nobody, so the engine's collector
/// could reclaim them; an `OwnedExpr` registers its value as a root and
/// releases the root on drop. Everything reachable from it stays valid in
/// the meantime, including `Expr` copies taken through `Deref`.
pub struct OwnedExpr<'a> {
    expr: Expr<'a>,
    root: Option<RootHandle>,
}

impl<'a> OwnedExpr<'a> {
    /// Roots `expr`. Immediates and symbols are never collected and need no
    /// root.
    pub fn new(expr: Expr<'a>) -> Self {
        let raw = expr.raw;
        let collectable = raw.tag() == TAG_OBJECT || raw.is_pair();
        let root = if collectable { expr.engine.root(raw) } else { None };
        OwnedExpr { expr, root }
    }

    pub fn expr(&self) -> Expr<'a> {
        self.expr
    }

    pub fn is_rooted(&self) -> bool {
        self.root.is_some()
    }
}

impl<'a> Deref for OwnedExpr<'a> {
    type Target = Expr<'a>;

    fn deref(&self) -> &Expr<'a> {
        &self.expr
    }
}

impl<'a> AsRef<Expr<'a>> for OwnedExpr<'a> {
    fn as_ref(&self) -> &Expr<'a> {
        &self.expr
    }
}

impl Clone for OwnedExpr<'_> {
    fn clone(&self) -> Self {
        OwnedExpr::new(self.expr)
    }
}

impl Drop for OwnedExpr<'_> {
    fn drop(&mut self) {
        if let Some(root) = self.root.take() {
            self.expr.engine.unroot(root);
        }
    }
}

impl PartialEq for OwnedExpr<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.expr == other.expr
    }
}

impl fmt::Debug for OwnedExpr<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.expr, f)
    }
}

impl fmt::Display for OwnedExpr<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.expr, f)
    }
}

/// An expression split by variant.
#[derive(Debug, Clone, Copy)]
pub enum ExprView<'a> {
    List(ListExpr<'a>),
    Symbol(Symbol<'a>),
    Integer(i32),
    Float(f64),
    String(StringExpr<'a>),
}

/// An interned symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Symbol<'a> {
    expr: Expr<'a>,
}

impl<'a> Symbol<'a> {
    pub fn name(&self) -> DjvuResult<String> {
        self.expr
            .engine
            .symbol_name(self.expr.raw)
            .ok_or_else(|| DjvuError::InvalidHandle("symbol has no name".to_string()))
    }

    pub fn expr(&self) -> Expr<'a> {
        self.expr
    }
}

impl<'a> TryFrom<Expr<'a>> for Symbol<'a> {
    type Error = DjvuError;

    fn try_from(expr: Expr<'a>) -> DjvuResult<Self> {
        expr.as_symbol()
    }
}

/// A string whose text lives in engine memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StringExpr<'a> {
    expr: Expr<'a>,
}

impl<'a> StringExpr<'a> {
    /// Copies the text out. Invalid UTF-8 is replaced, never borrowed.
    pub fn value(&self) -> DjvuResult<String> {
        self.expr
            .engine
            .string_value(self.expr.raw)
            .ok_or_else(|| DjvuError::InvalidHandle("string expression has no text".to_string()))
    }

    pub fn expr(&self) -> Expr<'a> {
        self.expr
    }
}

impl<'a> TryFrom<Expr<'a>> for StringExpr<'a> {
    type Error = DjvuError;

    fn try_from(expr: Expr<'a>) -> DjvuResult<Self> {
        expr.as_string_expr()
    }
}

/// A list: a chain of pairs ending in nil (or, for a dotted list, another
/// non-pair value).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListExpr<'a> {
    expr: Expr<'a>,
}

impl<'a> ListExpr<'a> {
    /// Counts pairs until the first non-pair link.
    pub fn len(&self) -> usize {
        let engine = self.expr.engine;
        let mut cursor = self.expr.raw;
        let mut length = 0;
        while cursor.is_pair() {
            length += 1;
            cursor = engine.cdr(cursor);
        }
        length
    }

    pub fn is_empty(&self) -> bool {
        !self.expr.raw.is_pair()
    }

    /// Element `index`, walking `index` links from the head.
    pub fn nth(&self, index: usize) -> DjvuResult<Expr<'a>> {
        let engine = self.expr.engine;
        let mut cursor = self.expr.raw;
        for _ in 0..index {
            if !cursor.is_pair() {
                break;
            }
            cursor = engine.cdr(cursor);
        }
        if !cursor.is_pair() {
            return Err(DjvuError::IndexOutOfRange {
                index,
                length: self.len(),
            });
        }
        Ok(Expr::classified(engine, engine.car(cursor)))
    }

    pub fn first(&self) -> Option<Expr<'a>> {
        self.iter().next()
    }

    pub fn iter(&self) -> ListIter<'a> {
        ListIter {
            cursor: self.expr.raw,
            engine: self.expr.engine,
        }
    }

    /// The value ending a dotted list, `None` for a proper list.
    pub fn terminator(&self) -> Option<Expr<'a>> {
        let engine = self.expr.engine;
        let mut cursor = self.expr.raw;
        while cursor.is_pair() {
            cursor = engine.cdr(cursor);
        }
        if cursor.is_nil() {
            None
        } else {
            Some(Expr::classified(engine, cursor))
        }
    }

    pub fn expr(&self) -> Expr<'a> {
        self.expr
    }
}

impl<'a> TryFrom<Expr<'a>> for ListExpr<'a> {
    type Error = DjvuError;

    fn try_from(expr: Expr<'a>) -> DjvuResult<Self> {
        expr.as_list()
    }
}

impl<'a> IntoIterator for ListExpr<'a> {
    type Item = Expr<'a>;
    type IntoIter = ListIter<'a>;

    fn into_iter(self) -> ListIter<'a> {
        self.iter()
    }
}

/// Iterator over the elements of a list.
pub struct ListIter<'a> {
    cursor: RawExpr,
    engine: &'a dyn Engine,
}

impl<'a> Iterator for ListIter<'a> {
    type Item = Expr<'a>;

    fn next(&mut self) -> Option<Expr<'a>> {
        if !self.cursor.is_pair() {
            return None;
        }
        let item = self.engine.car(self.cursor);
        self.cursor = self.engine.cdr(self.cursor);
        Some(Expr::classified(self.engine, item))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::memory::MemoryEngine;

    #[test]
    fn test_classify_by_tag() {
        let engine = MemoryEngine::new();
        assert_eq!(classify(&engine, RawExpr::NIL), ExprKind::List);
        assert_eq!(classify(&engine, RawExpr::from_int(-7)), ExprKind::Integer);

        let sym = engine.intern("page").unwrap();
        assert_eq!(classify(&engine, sym), ExprKind::Symbol);

        let text = engine.new_string("hello").unwrap();
        assert_eq!(classify(&engine, text), ExprKind::String);

        let num = engine.new_float(2.5);
        assert_eq!(classify(&engine, num), ExprKind::Float);

        let pair = engine.cons(sym, RawExpr::NIL);
        assert_eq!(classify(&engine, pair), ExprKind::List);
    }

    #[test]
    fn test_dummy_is_rejected() {
        let engine = MemoryEngine::new();
        assert!(matches!(
            Expr::new(&engine, RawExpr::DUMMY),
            Err(DjvuError::InvalidHandle(_))
        ));
    }

    #[test]
    fn test_wrong_variant_access() {
        let engine = MemoryEngine::new();
        let text = Expr::string(&engine, "x").unwrap();

        match text.as_integer() {
            Err(DjvuError::InvalidVariantAccess { expected, found }) => {
                assert_eq!(expected, ExprKind::Integer);
                assert_eq!(found, ExprKind::String);
            }
            other => panic!("Expected InvalidVariantAccess, got {:?}", other),
        }
        assert!(text.as_float().is_err());
        assert!(text.symbol_name().is_err());
        assert!(matches!(
            text.length(),
            Err(DjvuError::NotAList { found: ExprKind::String })
        ));
    }

    #[test]
    fn test_list_walk() {
        let engine = MemoryEngine::new();
        let text = Expr::string(&engine, "hi").unwrap();
        let items = [
            Expr::symbol(&engine, "word").unwrap(),
            Expr::integer(&engine, 10).unwrap(),
            *text,
        ];
        let list = Expr::list(&engine, &items);

        assert_eq!(list.length().unwrap(), 3);
        assert_eq!(list.nth(0).unwrap().symbol_name().unwrap(), "word");
        assert_eq!(list.nth(1).unwrap().as_integer().unwrap(), 10);
        assert_eq!(list.nth(2).unwrap().as_string().unwrap(), "hi");
        assert!(matches!(
            list.nth(3),
            Err(DjvuError::IndexOutOfRange { index: 3, length: 3 })
        ));

        let collected: Vec<_> = list.as_list().unwrap().iter().map(|e| e.kind()).collect();
        assert_eq!(
            collected,
            vec![ExprKind::Symbol, ExprKind::Integer, ExprKind::String]
        );
    }

    #[test]
    fn test_empty_list() {
        let engine = MemoryEngine::new();
        let nil = Expr::nil(&engine);
        assert_eq!(nil.length().unwrap(), 0);
        assert!(nil.as_list().unwrap().is_empty());
        assert!(matches!(
            nil.nth(0),
            Err(DjvuError::IndexOutOfRange { index: 0, length: 0 })
        ));
    }

    #[test]
    fn test_dotted_list_terminator() {
        let engine = MemoryEngine::new();
        let a = engine.intern("a").unwrap();
        let dotted = engine.cons(a, RawExpr::from_int(5));
        let list = Expr::new(&engine, dotted).unwrap().as_list().unwrap();

        assert_eq!(list.len(), 1);
        assert_eq!(list.terminator().unwrap().as_integer().unwrap(), 5);
    }

    #[test]
    fn test_symbols_compare_by_identity() {
        let engine = MemoryEngine::new();
        let first = Expr::symbol(&engine, "failed").unwrap();
        let second = Expr::symbol(&engine, "failed").unwrap();
        assert_eq!(first, second);
        assert!(first.is_symbol_named("failed"));
        assert!(!first.is_symbol_named("stopped"));
    }

    #[test]
    fn test_view_matches_kind() {
        let engine = MemoryEngine::new();
        let value = Expr::float(&engine, 0.25);
        match value.view() {
            ExprView::Float(v) => assert_eq!(v, 0.25),
            other => panic!("Expected float view, got {:?}", other),
        }
        assert_eq!(value.as_number().unwrap(), 0.25);
        assert_eq!(Expr::integer(&engine, 4).unwrap().as_number().unwrap(), 4.0);
    }

    #[test]
    fn test_foreign_object_is_rejected() {
        let engine = MemoryEngine::new();
        let foreign = RawExpr::from_bits((999 << 2) | TAG_OBJECT);

        assert_eq!(classify(&engine, foreign), ExprKind::Float);
        assert!(matches!(
            Expr::new(&engine, foreign),
            Err(DjvuError::InvalidHandle(_))
        ));
        assert!(Expr::new(&engine, engine.new_float(1.5)).is_ok());
    }

    #[test]
    fn test_built_values_are_rooted_until_dropped() {
        let engine = MemoryEngine::new();
        let text = Expr::string(&engine, "kept").unwrap();
        let number = Expr::float(&engine, 0.5);
        assert!(text.is_rooted());
        assert_eq!(engine.root_count(), 2);

        // The element array is a temporary; only `text` and the list remain
        let list = Expr::list(&engine, &[text.clone(), number]);
        assert!(!engine.is_gc_locked());
        assert_eq!(engine.root_count(), 2);

        drop(text);
        assert_eq!(engine.root_count(), 1);
        assert_eq!(list.nth(0).unwrap().as_string().unwrap(), "kept");
        assert_eq!(list.nth(1).unwrap().as_float().unwrap(), 0.5);

        // Immediates and symbols need no root
        assert!(!OwnedExpr::new(Expr::integer(&engine, 1).unwrap()).is_rooted());
        assert!(!OwnedExpr::new(Expr::symbol(&engine, "s").unwrap()).is_rooted());

        drop(list);
        assert_eq!(engine.root_count(), 0);
    }

    #[test]
    fn test_integer_out_of_range() {
        let engine = MemoryEngine::new();
        assert!(matches!(
            Expr::integer(&engine, 1 << 40),
            Err(DjvuError::IntegerOutOfRange(_))
        ));
    }
}
