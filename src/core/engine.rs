//! The seam between the binding layer and a decoding engine.

use std::path::Path;

use super::handle::{ContextHandle, DocumentHandle, PageHandle, RawExpr, RootHandle};
use super::message::Message;
use super::types::{DocumentType, JobStatus, PageRotation, PageType, TextDetail};

/// Primitives a DjVu decoding engine provides.
///
/// This mirrors the `ddjvuapi` / `miniexp` surface one call per method.
/// Implementations are used from a single thread per context; methods take
/// `&self` so an engine can be shared by every context it serves.
///
/// Queries that return a [`RawExpr`] answer [`RawExpr::DUMMY`] while the
/// artifact is still being decoded, [`RawExpr::NIL`] when there is no data and
/// the `failed` / `stopped` symbols when the job behind it ended badly.
pub trait Engine {
    /// Version string of the underlying library.
    fn version(&self) -> String;

    // ==================== Contexts & messages ====================

    fn create_context(&self, name: &str) -> Option<ContextHandle>;

    fn release_context(&self, context: ContextHandle);

    fn set_cache_size(&self, context: ContextHandle, bytes: u64);

    /// Blocks until at least one message is queued on the context.
    fn wait_message(&self, context: ContextHandle);

    /// Copies out and removes the oldest queued message, if any.
    fn pop_message(&self, context: ContextHandle) -> Option<Message>;

    // ==================== Documents ====================

    /// Starts decoding a document. Returns immediately.
    fn open_document(&self, context: ContextHandle, path: &Path, cache: bool) -> Option<DocumentHandle>;

    fn document_status(&self, document: DocumentHandle) -> JobStatus;

    fn release_document(&self, document: DocumentHandle);

    fn document_type(&self, document: DocumentHandle) -> DocumentType;

    fn page_count(&self, document: DocumentHandle) -> usize;

    fn file_count(&self, document: DocumentHandle) -> usize;

    fn document_annotations(&self, document: DocumentHandle, compat: bool) -> RawExpr;

    fn page_annotations(&self, document: DocumentHandle, page: usize) -> RawExpr;

    fn page_text(&self, document: DocumentHandle, page: usize, detail: TextDetail) -> RawExpr;

    fn outline(&self, document: DocumentHandle) -> RawExpr;

    /// A `djvudump`-style description of the whole document, optionally as
    /// JSON. `None` until the document is decoded.
    fn document_dump(&self, document: DocumentHandle, json: bool) -> Option<String>;

    // ==================== Pages ====================

    fn create_page(&self, document: DocumentHandle, page: usize) -> Option<PageHandle>;

    fn page_status(&self, page: PageHandle) -> JobStatus;

    fn release_page(&self, page: PageHandle);

    fn page_width(&self, page: PageHandle) -> i32;

    fn page_height(&self, page: PageHandle) -> i32;

    fn page_resolution(&self, page: PageHandle) -> i32;

    fn page_gamma(&self, page: PageHandle) -> f64;

    fn page_version(&self, page: PageHandle) -> i32;

    fn page_type(&self, page: PageHandle) -> PageType;

    fn page_rotation(&self, page: PageHandle) -> PageRotation;

    fn set_page_rotation(&self, page: PageHandle, rotation: PageRotation);

    fn page_initial_rotation(&self, page: PageHandle) -> PageRotation;

    // ==================== Expressions ====================

    /// Secondary predicate for object-tagged expressions.
    fn is_string(&self, expr: RawExpr) -> bool;

    /// Secondary predicate for object-tagged expressions.
    fn is_float(&self, expr: RawExpr) -> bool;

    /// Copies the text of a string expression out of engine memory.
    fn string_value(&self, expr: RawExpr) -> Option<String>;

    fn float_value(&self, expr: RawExpr) -> f64;

    fn symbol_name(&self, expr: RawExpr) -> Option<String>;

    /// First element of a pair, nil for anything else.
    fn car(&self, expr: RawExpr) -> RawExpr;

    /// Rest of a pair, nil for anything else.
    fn cdr(&self, expr: RawExpr) -> RawExpr;

    /// Interns a symbol. `None` if the name cannot cross the C boundary.
    fn intern(&self, name: &str) -> Option<RawExpr>;

    /// Allocates a string expression. `None` if the text contains NUL.
    fn new_string(&self, text: &str) -> Option<RawExpr>;

    fn new_float(&self, value: f64) -> RawExpr;

    fn cons(&self, car: RawExpr, cdr: RawExpr) -> RawExpr;

    /// Suspends engine garbage collection while expressions are being built.
    fn acquire_gc_lock(&self) {}

    fn release_gc_lock(&self) {}

    /// Keeps `expr` reachable for the collector until [`Engine::unroot`].
    ///
    /// Engines that never collect return `None`.
    fn root(&self, _expr: RawExpr) -> Option<RootHandle> {
        None
    }

    fn unroot(&self, _root: RootHandle) {}
}

/// Holds the engine GC lock for its lifetime.
pub struct GcLock<'e> {
    engine: &'e dyn Engine,
}

impl<'e> GcLock<'e> {
    pub fn new(engine: &'e dyn Engine) -> Self {
        engine.acquire_gc_lock();
        GcLock { engine }
    }
}

impl Drop for GcLock<'_> {
    fn drop(&mut self) {
        self.engine.release_gc_lock();
    }
}
