use super::annotation::Annotations;
use super::document::Document;
use super::dump::dump;
use super::engine::Engine;
use super::error::{DjvuError, DjvuResult};
use super::handle::PageHandle;
use super::text::{full_text, TextZone};
use super::types::{PageRotation, PageType, TextDetail};
use super::wait::DecodeWait;

/// A single page of a document.
///
/// Opening a page starts the engine's page job and waits for it, after which
/// the page geometry is known. Text and annotations are queried through the
/// owning document and decoded on demand.
///
/// The page borrows its document and is released on [`Page::close`] or on
/// drop.
pub struct Page<'d> {
    document: &'d Document<'d>,
    handle: Option<PageHandle>,
    index: usize,
}

impl<'d> Page<'d> {
    /// Opens page `index`, 0-based.
    pub fn open(document: &'d Document<'d>, index: usize) -> DjvuResult<Self> {
        document.check_page_index(index)?;

        let engine = document.engine();
        let handle = engine
            .create_page(document.handle()?, index)
            .ok_or_else(|| DjvuError::InvalidHandle(format!("cannot create page {}", index)))?;

        // Owned from here on, so an early return releases the job
        let page = Page {
            document,
            handle: Some(handle),
            index,
        };

        page.waiter(format!("page {}", index))
            .job_status(|| engine.page_status(handle))?;

        tracing::debug!(page = index, "page decoded");
        Ok(page)
    }

    fn waiter(&self, job: impl Into<String>) -> DecodeWait<'d> {
        DecodeWait::new(self.document.context(), job)
            .with_options(self.document.options().wait.clone())
    }

    fn engine(&self) -> &'d dyn Engine {
        self.document.engine()
    }

    /// The page index, 0-based.
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn document(&self) -> &'d Document<'d> {
        self.document
    }

    /// The live handle, or `InvalidHandle` once closed.
    pub fn handle(&self) -> DjvuResult<PageHandle> {
        self.handle
            .ok_or_else(|| DjvuError::InvalidHandle(format!("page {} is closed", self.index)))
    }

    /// Width in pixels at the page's own resolution, before rotation.
    pub fn width(&self) -> DjvuResult<i32> {
        Ok(self.engine().page_width(self.handle()?))
    }

    /// Height in pixels at the page's own resolution, before rotation.
    pub fn height(&self) -> DjvuResult<i32> {
        Ok(self.engine().page_height(self.handle()?))
    }

    /// Resolution in dots per inch.
    pub fn resolution(&self) -> DjvuResult<i32> {
        Ok(self.engine().page_resolution(self.handle()?))
    }

    pub fn gamma(&self) -> DjvuResult<f64> {
        Ok(self.engine().page_gamma(self.handle()?))
    }

    /// Version of the DjVu format the page was encoded with.
    pub fn version(&self) -> DjvuResult<i32> {
        Ok(self.engine().page_version(self.handle()?))
    }

    pub fn page_type(&self) -> DjvuResult<PageType> {
        Ok(self.engine().page_type(self.handle()?))
    }

    pub fn rotation(&self) -> DjvuResult<PageRotation> {
        Ok(self.engine().page_rotation(self.handle()?))
    }

    pub fn set_rotation(&mut self, rotation: PageRotation) -> DjvuResult<()> {
        self.engine().set_page_rotation(self.handle()?, rotation);
        Ok(())
    }

    /// Rotation stored in the file.
    pub fn initial_rotation(&self) -> DjvuResult<PageRotation> {
        Ok(self.engine().page_initial_rotation(self.handle()?))
    }

    /// The text layer down to `detail`, decoded into zones.
    ///
    /// `None` when the page has no hidden text.
    pub fn text(&self, detail: TextDetail) -> DjvuResult<Option<TextZone>> {
        self.document
            .page_text(self.index, detail)?
            .map(|expr| TextZone::decode(&expr))
            .transpose()
    }

    /// The whole text of the page as one string.
    ///
    /// Reads the page-level record `(page xmin ymin xmax ymax "text")`; any
    /// other shape is a `MalformedRecord` error.
    pub fn full_text(&self) -> DjvuResult<Option<String>> {
        self.document
            .page_text(self.index, TextDetail::Page)?
            .map(|expr| full_text(&expr))
            .transpose()
    }

    pub fn annotations(&self) -> DjvuResult<Option<Annotations<'d>>> {
        self.document.page_annotations(self.index)
    }

    /// The text layer down to `detail`, pretty-printed.
    pub fn text_dump(&self, detail: TextDetail) -> DjvuResult<Option<String>> {
        Ok(self
            .document
            .page_text(self.index, detail)?
            .map(|expr| dump(&expr)))
    }

    /// Releases the page. Safe to call more than once.
    pub fn close(&mut self) {
        if let Some(handle) = self.handle.take() {
            self.engine().release_page(handle);
            tracing::debug!(page = self.index, "page released");
        }
    }
}

impl Drop for Page<'_> {
    fn drop(&mut self) {
        self.close();
    }
}

impl std::fmt::Debug for Page<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Page")
            .field("index", &self.index)
            .field("handle", &self.handle)
            .finish()
    }
}
