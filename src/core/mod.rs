pub mod annotation;
pub mod context;
pub mod document;
pub mod dump;
pub mod engine;
pub mod error;
pub mod expr;
pub mod handle;
pub mod lexer;
pub mod memory;
pub mod message;
pub mod options;
pub mod outline;
pub mod page;
pub mod reader;
pub mod record;
pub mod text;
pub mod types;
pub mod wait;

#[cfg(feature = "djvulibre")]
pub mod native;

pub use annotation::{Annotations, Hyperlink, Shape, ShapeKind};
pub use context::Context;
pub use document::Document;
pub use dump::{dump, dump_compact};
pub use engine::{Engine, GcLock};
pub use error::{DjvuError, DjvuResult};
pub use expr::{classify, Expr, ExprKind, ExprView, ListExpr, ListIter, OwnedExpr, StringExpr, Symbol};
pub use handle::{ContextHandle, DocumentHandle, PageHandle, RawExpr, RootHandle};
pub use lexer::{Lexer, Token};
pub use memory::{Artifact, DocumentFixture, MemoryEngine, Outcome, PageFixture, Released};
pub use message::{pump, Message};
pub use options::{ContextOptions, OpenOptions, WaitOptions};
pub use outline::{decode_outline, OutlineEntry};
pub use page::Page;
pub use reader::{read, read_all, Reader};
pub use record::{decode_prefix, decode_record, Record, RecordShape};
pub use text::{full_text, Rect, TextZone, ZoneContent, ZoneKind};
pub use types::{DocumentType, JobStatus, PageRotation, PageType, TextDetail};
pub use wait::{wait_for_job, wait_for_result, DecodeWait};

#[cfg(feature = "djvulibre")]
pub use native::NativeEngine;
