//! Builds engine expressions from their textual form.
//!
//! The inverse of [`dump`](super::dump::dump): anything printed there reads
//! back to the same structure.

use super::engine::{Engine, GcLock};
use super::error::{DjvuError, DjvuResult};
use super::expr::{Expr, OwnedExpr};
use super::handle::RawExpr;
use super::lexer::{Lexer, Token};

/// Deepest list nesting the reader accepts.
pub const MAX_DEPTH: usize = 512;

/// Recursive-descent reader over a [`Lexer`].
pub struct Reader<'e, 'a> {
    engine: &'e dyn Engine,
    lexer: Lexer<'a>,
    depth: usize,
}

impl<'e, 'a> Reader<'e, 'a> {
    pub fn new(engine: &'e dyn Engine, text: &'a str) -> Self {
        Reader {
            engine,
            lexer: Lexer::new(text),
            depth: 0,
        }
    }

    /// Reads the next expression, `None` at end of input.
    ///
    /// Collection stays suspended while the tree is built and the result is
    /// rooted before the lock is let go.
    pub fn next_expr(&mut self) -> DjvuResult<Option<OwnedExpr<'e>>> {
        let _lock = GcLock::new(self.engine);
        match self.lexer.get_object()? {
            Token::EOF => Ok(None),
            token => {
                let raw = self.read_from(token)?;
                Ok(Some(OwnedExpr::new(Expr::classified(self.engine, raw))))
            }
        }
    }

    fn read_from(&mut self, token: Token) -> DjvuResult<RawExpr> {
        match token {
            Token::ListStart => {
                if self.depth >= MAX_DEPTH {
                    return Err(self.syntax_error("nesting too deep"));
                }
                self.depth += 1;
                let list = self.read_list();
                self.depth -= 1;
                list
            }
            Token::Integer(value) => {
                RawExpr::checked_int(value).ok_or(DjvuError::IntegerOutOfRange(value))
            }
            Token::Float(value) => Ok(self.engine.new_float(value)),
            Token::String(text) => self.engine.new_string(&text).ok_or_else(|| {
                self.syntax_error("string contains a NUL byte")
            }),
            Token::Symbol(name) => self.engine.intern(&name).ok_or_else(|| {
                self.syntax_error("symbol contains a NUL byte")
            }),
            Token::ListEnd => Err(self.syntax_error("unexpected ')'")),
            Token::Dot => Err(self.syntax_error("unexpected '.'")),
            Token::EOF => Err(self.syntax_error("unexpected end of input")),
        }
    }

    /// Reads the rest of a list after its opening parenthesis.
    fn read_list(&mut self) -> DjvuResult<RawExpr> {
        let mut items = Vec::new();
        let mut tail = RawExpr::NIL;

        loop {
            match self.lexer.get_object()? {
                Token::ListEnd => break,
                Token::Dot => {
                    if items.is_empty() {
                        return Err(self.syntax_error("'.' before the first element"));
                    }
                    let token = self.lexer.get_object()?;
                    tail = self.read_from(token)?;
                    if self.lexer.get_object()? != Token::ListEnd {
                        return Err(self.syntax_error("expected ')' after dotted tail"));
                    }
                    break;
                }
                Token::EOF => return Err(self.syntax_error("unterminated list")),
                token => items.push(self.read_from(token)?),
            }
        }

        Ok(items
            .into_iter()
            .rev()
            .fold(tail, |rest, item| self.engine.cons(item, rest)))
    }

    fn syntax_error(&self, detail: &str) -> DjvuError {
        DjvuError::Syntax {
            offset: self.lexer.offset(),
            detail: detail.to_string(),
        }
    }
}

/// Reads exactly one expression from `text`.
pub fn read<'e>(engine: &'e dyn Engine, text: &str) -> DjvuResult<OwnedExpr<'e>> {
    let mut reader = Reader::new(engine, text);
    let expr = reader
        .next_expr()?
        .ok_or_else(|| reader.syntax_error("no expression"))?;

    if reader.lexer.get_object()? != Token::EOF {
        return Err(reader.syntax_error("trailing input after expression"));
    }
    Ok(expr)
}

/// Reads every top-level expression in `text`.
pub fn read_all<'e>(engine: &'e dyn Engine, text: &str) -> DjvuResult<Vec<OwnedExpr<'e>>> {
    let mut reader = Reader::new(engine, text);
    let mut exprs = Vec::new();
    while let Some(expr) = reader.next_expr()? {
        exprs.push(expr);
    }
    Ok(exprs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::expr::ExprKind;
    use crate::core::memory::MemoryEngine;

    #[test]
    fn test_read_atoms() {
        let engine = MemoryEngine::new();
        assert_eq!(read(&engine, "42").unwrap().as_integer().unwrap(), 42);
        assert_eq!(read(&engine, "-1.5").unwrap().as_float().unwrap(), -1.5);
        assert_eq!(read(&engine, "\"hi\"").unwrap().as_string().unwrap(), "hi");
        assert_eq!(read(&engine, "word").unwrap().symbol_name().unwrap(), "word");
        assert!(read(&engine, "()").unwrap().is_nil());
    }

    #[test]
    fn test_read_nested_list() {
        let engine = MemoryEngine::new();
        let expr = read(&engine, "(A (B 1) \"C\")").unwrap();

        assert_eq!(expr.length().unwrap(), 3);
        assert_eq!(expr.nth(0).unwrap().symbol_name().unwrap(), "A");
        let inner = expr.nth(1).unwrap();
        assert_eq!(inner.kind(), ExprKind::List);
        assert_eq!(inner.nth(1).unwrap().as_integer().unwrap(), 1);
        assert_eq!(expr.nth(2).unwrap().as_string().unwrap(), "C");
    }

    #[test]
    fn test_read_dotted_pair() {
        let engine = MemoryEngine::new();
        let expr = read(&engine, "(a b . 3)").unwrap();
        let list = expr.as_list().unwrap();
        assert_eq!(list.len(), 2);
        assert_eq!(list.terminator().unwrap().as_integer().unwrap(), 3);
    }

    #[test]
    fn test_syntax_errors() {
        let engine = MemoryEngine::new();
        for bad in ["(a b", ")", "(. a)", "(a . b c)", "", "a b"] {
            assert!(
                matches!(read(&engine, bad), Err(DjvuError::Syntax { .. })),
                "{:?} should not read",
                bad
            );
        }
    }

    #[test]
    fn test_integer_range_is_checked() {
        let engine = MemoryEngine::new();
        assert!(read(&engine, "536870911").is_ok());
        assert!(matches!(
            read(&engine, "536870912"),
            Err(DjvuError::IntegerOutOfRange(536870912))
        ));
        assert!(read(&engine, "-536870912").is_ok());
    }

    #[test]
    fn test_read_all_and_gc_lock() {
        let engine = MemoryEngine::new();
        let exprs = read_all(&engine, "(background #ffffff) (zoom page)").unwrap();
        assert_eq!(exprs.len(), 2);
        assert_eq!(exprs[1].nth(1).unwrap().symbol_name().unwrap(), "page");
        assert!(!engine.is_gc_locked());
        assert_eq!(engine.root_count(), 2);

        drop(exprs);
        assert_eq!(engine.root_count(), 0);
    }

    #[test]
    fn test_nesting_limit() {
        let engine = MemoryEngine::new();
        let nested = format!("{}{}", "(".repeat(MAX_DEPTH), ")".repeat(MAX_DEPTH));
        assert!(read(&engine, &nested).is_ok());

        let deeper = format!("{}{}", "(".repeat(MAX_DEPTH + 1), ")".repeat(MAX_DEPTH + 1));
        assert!(matches!(
            read(&engine, &deeper),
            Err(DjvuError::Syntax { ref detail, .. }) if detail == "nesting too deep"
        ));

        // Unbalanced runs fail cleanly instead of exhausting the stack
        assert!(matches!(
            read(&engine, &"(".repeat(100_000)),
            Err(DjvuError::Syntax { .. })
        ));
        assert!(!engine.is_gc_locked());
    }
}
