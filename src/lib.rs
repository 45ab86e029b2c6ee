//! # djvu-x: safe bindings to a DjVu decoding engine
//!
//! djvu-x wraps the `ddjvuapi` surface of DjVuLibre behind owned, borrow-checked
//! wrappers and decodes the engine's S-expressions (annotations, hidden text,
//! outlines) into typed Rust values.
//!
//! ## Quick Start
//!
//! ```rust
//! use djvu_x::{Context, Document, DocumentFixture, MemoryEngine, PageFixture, TextDetail};
//!
//! let file = tempfile::NamedTempFile::new()?;
//! let engine = MemoryEngine::new();
//! engine.add_document(
//!     file.path(),
//!     DocumentFixture::new().with_page(PageFixture::new(2550, 3300).with_text(
//!         TextDetail::Page,
//!         r#"(page 0 0 2550 3300 "Hello")"#,
//!     )),
//! );
//!
//! let context = Context::new(&engine, "quick-start")?;
//! let document = Document::open(&context, file.path())?;
//! let page = document.page(0)?;
//! assert_eq!(page.full_text()?.as_deref(), Some("Hello"));
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Architecture
//!
//! - **Engine** ([`Engine`]): the seam to the decoder. [`MemoryEngine`] runs
//!   scripted documents in-process; `NativeEngine` (feature `djvulibre`)
//!   forwards to libdjvulibre.
//! - **Expressions** ([`Expr`]): tagged-pointer values classified once and
//!   read through checked accessors. Values built or read on this side are
//!   [`OwnedExpr`]s, kept safe from the engine's collector until dropped.
//! - **Decode wait** ([`DecodeWait`]): turns the engine's asynchronous jobs
//!   into blocking calls, optionally bounded by a timeout or cancel flag.
//! - **Wrappers** ([`Context`], [`Document`], [`Page`]): released on drop,
//!   pages before documents before contexts.

pub mod core;

// Re-export main types for convenience
pub use core::{
    Annotations, Artifact, Context, ContextOptions, DecodeWait, DjvuError, DjvuResult, Document,
    DocumentFixture, DocumentType, Engine, Expr, ExprKind, ExprView, JobStatus, ListExpr,
    MemoryEngine, Message, OpenOptions, OutlineEntry, Outcome, OwnedExpr, Page, PageFixture,
    PageRotation, PageType, RawExpr, TextDetail, TextZone, WaitOptions,
};

#[cfg(feature = "djvulibre")]
pub use core::NativeEngine;
