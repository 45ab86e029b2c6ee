//! Printing expressions back to text.
//!
//! Output always re-reads to the same structure: strings are escaped,
//! symbols that would read as something else are `|quoted|`, and floats keep
//! their decimal point. NaN and the infinities print as `+nan.0`, `+inf.0`
//! and `-inf.0`.

use std::fmt::{self, Write};

use super::expr::{Expr, ExprView, ListExpr};
use super::lexer::{
    looks_like_float, looks_like_integer, non_finite_float, INFINITY_SPELLING, NAN_SPELLING,
    NEG_INFINITY_SPELLING,
};

const INDENT: &str = "  ";

/// Pretty-prints an expression, one nested list per line.
///
/// A list holding only atoms stays on one line; a list with nested lists
/// puts every element after the first on its own line, indented one level
/// deeper than the list itself.
pub fn dump(expr: &Expr<'_>) -> String {
    let mut out = String::new();
    // Writing into a String cannot fail
    let _ = write_indented(&mut out, expr, 0);
    out
}

/// Prints an expression on a single line.
pub fn dump_compact(expr: &Expr<'_>) -> String {
    let mut out = String::new();
    let _ = write_expr(&mut out, expr);
    out
}

/// `Display` support for [`Expr`].
pub(crate) fn write_compact(f: &mut fmt::Formatter<'_>, expr: &Expr<'_>) -> fmt::Result {
    write_expr(f, expr)
}

fn write_indented<W: Write>(out: &mut W, expr: &Expr<'_>, depth: usize) -> fmt::Result {
    let list = match expr.view() {
        ExprView::List(list) if !list.is_empty() => list,
        _ => return write_expr(out, expr),
    };

    if is_flat(&list) {
        return write_expr(out, expr);
    }

    out.write_char('(')?;
    for (index, item) in list.iter().enumerate() {
        if index > 0 {
            out.write_char('\n')?;
            for _ in 0..=depth {
                out.write_str(INDENT)?;
            }
        }
        write_indented(out, &item, depth + 1)?;
    }
    if let Some(tail) = list.terminator() {
        out.write_str(" . ")?;
        write_expr(out, &tail)?;
    }
    out.write_char(')')
}

/// True when no element is a non-empty list.
fn is_flat(list: &ListExpr<'_>) -> bool {
    list.iter()
        .all(|item| !matches!(item.view(), ExprView::List(inner) if !inner.is_empty()))
}

fn write_expr<W: Write>(out: &mut W, expr: &Expr<'_>) -> fmt::Result {
    match expr.view() {
        ExprView::List(list) => {
            out.write_char('(')?;
            for (index, item) in list.iter().enumerate() {
                if index > 0 {
                    out.write_char(' ')?;
                }
                write_expr(out, &item)?;
            }
            if let Some(tail) = list.terminator() {
                out.write_str(" . ")?;
                write_expr(out, &tail)?;
            }
            out.write_char(')')
        }
        ExprView::Integer(value) => write!(out, "{}", value),
        ExprView::Float(value) => write_float(out, value),
        ExprView::String(text) => {
            let value = text.value().unwrap_or_else(|err| {
                tracing::warn!(raw = ?expr.raw(), error = %err, "cannot read string, printing it empty");
                String::new()
            });
            write_string(out, &value)
        }
        ExprView::Symbol(symbol) => {
            let name = symbol.name().unwrap_or_else(|err| {
                tracing::warn!(raw = ?expr.raw(), error = %err, "cannot read symbol name, printing it empty");
                String::new()
            });
            write_symbol(out, &name)
        }
    }
}

fn write_float<W: Write>(out: &mut W, value: f64) -> fmt::Result {
    if value.is_nan() {
        out.write_str(NAN_SPELLING)
    } else if value == f64::INFINITY {
        out.write_str(INFINITY_SPELLING)
    } else if value == f64::NEG_INFINITY {
        out.write_str(NEG_INFINITY_SPELLING)
    } else {
        write!(out, "{:?}", value)
    }
}

fn write_string<W: Write>(out: &mut W, text: &str) -> fmt::Result {
    out.write_char('"')?;
    for ch in text.chars() {
        match ch {
            '"' => out.write_str("\\\"")?,
            '\\' => out.write_str("\\\\")?,
            '\n' => out.write_str("\\n")?,
            '\t' => out.write_str("\\t")?,
            '\r' => out.write_str("\\r")?,
            c if (c as u32) < 0x20 || c == '\x7f' => write!(out, "\\{:03o}", c as u32)?,
            c => out.write_char(c)?,
        }
    }
    out.write_char('"')
}

fn write_symbol<W: Write>(out: &mut W, name: &str) -> fmt::Result {
    if !needs_quoting(name) {
        return out.write_str(name);
    }
    out.write_char('|')?;
    for ch in name.chars() {
        if ch == '|' || ch == '\\' {
            out.write_char('\\')?;
        }
        out.write_char(ch)?;
    }
    out.write_char('|')
}

fn needs_quoting(name: &str) -> bool {
    name.is_empty()
        || name == "."
        || looks_like_integer(name)
        || looks_like_float(name)
        || non_finite_float(name).is_some()
        || name
            .chars()
            .any(|c| c.is_whitespace() || c.is_control() || "()\";|\\".contains(c))
}
