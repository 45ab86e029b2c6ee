use std::path::{Path, PathBuf};

use super::annotation::Annotations;
use super::context::Context;
use super::engine::Engine;
use super::error::{DjvuError, DjvuResult};
use super::expr::Expr;
use super::handle::DocumentHandle;
use super::options::OpenOptions;
use super::outline::{decode_outline, OutlineEntry};
use super::page::Page;
use super::types::{DocumentType, TextDetail};
use super::wait::DecodeWait;

/// An open DjVu document.
///
/// This is the main entry point for reading documents. Opening blocks until
/// the engine has decoded the document directory, so page counts and types
/// are available immediately afterwards. Everything else (annotations, page
/// text, pages) is decoded on demand through the same wait.
///
/// The document borrows its context and is released on [`Document::close`]
/// or on drop.
pub struct Document<'c> {
    context: &'c Context<'c>,
    handle: Option<DocumentHandle>,
    path: PathBuf,
    options: OpenOptions,
}

impl<'c> Document<'c> {
    /// Opens a document with the default options.
    ///
    /// # Example
    /// ```no_run
    /// use djvu_x::{Context, Document, MemoryEngine};
    ///
    /// let engine = MemoryEngine::new();
    /// let context = Context::new(&engine, "viewer").unwrap();
    /// let document = Document::open(&context, "book.djvu").unwrap();
    /// println!("{} pages", document.page_count().unwrap());
    /// ```
    pub fn open(context: &'c Context<'c>, path: impl AsRef<Path>) -> DjvuResult<Self> {
        Self::open_with(context, path, &OpenOptions::default())
    }

    /// Opens a document and waits until it is decoded.
    ///
    /// If the decode fails or stops, the document job is released before the
    /// error is returned. The context stays with the caller.
    pub fn open_with(context: &'c Context<'c>, path: impl AsRef<Path>, options: &OpenOptions) -> DjvuResult<Self> {
        let path = path.as_ref();

        if path.as_os_str().is_empty() {
            return Err(DjvuError::Generic("document path is empty".to_string()));
        }

        if !path.exists() {
            return Err(DjvuError::FileNotFound(path.to_path_buf()));
        }

        let engine = context.engine();
        let handle = engine
            .open_document(context.handle()?, path, options.cache)
            .ok_or_else(|| {
                DjvuError::InvalidHandle(format!("cannot create a document for {}", path.display()))
            })?;

        // Owned from here on, so an early return releases the job
        let document = Document {
            context,
            handle: Some(handle),
            path: path.to_path_buf(),
            options: options.clone(),
        };

        document
            .waiter(format!("document {}", path.display()))
            .job_status(|| engine.document_status(handle))?;

        tracing::debug!(
            path = %path.display(),
            pages = engine.page_count(handle),
            "document decoded"
        );

        Ok(document)
    }

    fn waiter(&self, job: impl Into<String>) -> DecodeWait<'c> {
        DecodeWait::new(self.context, job).with_options(self.options.wait.clone())
    }

    pub fn context(&self) -> &'c Context<'c> {
        self.context
    }

    pub(crate) fn engine(&self) -> &'c dyn Engine {
        self.context.engine()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub(crate) fn options(&self) -> &OpenOptions {
        &self.options
    }

    /// The live handle, or `InvalidHandle` once closed.
    pub fn handle(&self) -> DjvuResult<DocumentHandle> {
        self.handle.ok_or_else(|| {
            DjvuError::InvalidHandle(format!("document {} is closed", self.path.display()))
        })
    }

    pub fn document_type(&self) -> DjvuResult<DocumentType> {
        Ok(self.engine().document_type(self.handle()?))
    }

    pub fn page_count(&self) -> DjvuResult<usize> {
        Ok(self.engine().page_count(self.handle()?))
    }

    /// Number of component files. Equals the page count for most documents;
    /// indirect and bundled documents may carry shared files as well.
    pub fn file_count(&self) -> DjvuResult<usize> {
        Ok(self.engine().file_count(self.handle()?))
    }

    /// Fails with `IndexOutOfRange` unless `index` is a valid page index.
    pub(crate) fn check_page_index(&self, index: usize) -> DjvuResult<()> {
        let length = self.page_count()?;
        if index >= length {
            return Err(DjvuError::IndexOutOfRange { index, length });
        }
        Ok(())
    }

    /// Document-wide annotations.
    ///
    /// With `compat` set and no document-wide annotations present, the engine
    /// falls back to the shared annotation chunk of older documents.
    pub fn annotations(&self, compat: bool) -> DjvuResult<Option<Annotations<'_>>> {
        let handle = self.handle()?;
        let engine = self.engine();
        self.waiter("document annotations")
            .result(|| engine.document_annotations(handle, compat))?
            .map(Annotations::new)
            .transpose()
    }

    /// Annotations of page `index`, 0-based.
    pub fn page_annotations(&self, index: usize) -> DjvuResult<Option<Annotations<'_>>> {
        self.check_page_index(index)?;
        let handle = self.handle()?;
        let engine = self.engine();
        self.waiter(format!("annotations of page {}", index))
            .result(|| engine.page_annotations(handle, index))?
            .map(Annotations::new)
            .transpose()
    }

    /// The text layer of page `index` down to `detail`, undecoded.
    pub fn page_text(&self, index: usize, detail: TextDetail) -> DjvuResult<Option<Expr<'_>>> {
        self.check_page_index(index)?;
        let handle = self.handle()?;
        let engine = self.engine();
        self.waiter(format!("text of page {}", index))
            .result(|| engine.page_text(handle, index, detail))
    }

    /// The outline as an expression, `None` when there are no bookmarks.
    pub fn outline_expr(&self) -> DjvuResult<Option<Expr<'_>>> {
        let handle = self.handle()?;
        let engine = self.engine();
        self.waiter("outline").result(|| engine.outline(handle))
    }

    /// The decoded outline; empty when there are no bookmarks.
    pub fn outline(&self) -> DjvuResult<Vec<OutlineEntry>> {
        match self.outline_expr()? {
            Some(expr) => decode_outline(&expr),
            None => Ok(Vec::new()),
        }
    }

    /// A `djvudump`-style description of the document's chunk structure,
    /// as plain text or as JSON. `None` when the engine has nothing to report.
    pub fn dump(&self, json: bool) -> DjvuResult<Option<String>> {
        Ok(self.engine().document_dump(self.handle()?, json))
    }

    /// Opens page `index`, 0-based, and waits for it to decode.
    pub fn page(&self, index: usize) -> DjvuResult<Page<'_>> {
        Page::open(self, index)
    }

    /// Releases the document. Safe to call more than once.
    pub fn close(&mut self) {
        if let Some(handle) = self.handle.take() {
            self.engine().release_document(handle);
            tracing::debug!(path = %self.path.display(), "document released");
        }
    }
}

impl Drop for Document<'_> {
    fn drop(&mut self) {
        self.close();
    }
}

impl std::fmt::Debug for Document<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Document")
            .field("path", &self.path)
            .field("handle", &self.handle)
            .finish()
    }
}
