//! A pure-Rust engine over an in-process expression heap.
//!
//! Expressions use the same tagged encoding as the native engine: heap slot
//! `i` becomes `((i + 1) << 2) | tag`, so nil and the dummy sentinel never
//! collide with a live value. Documents are scripted with
//! [`DocumentFixture`]s registered under a path; their decode jobs advance one
//! step each time a context's queue is pumped.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::path::{Path, PathBuf};

use rustc_hash::FxHashMap;

use super::engine::Engine;
use super::handle::{
    ContextHandle, DocumentHandle, PageHandle, RawExpr, RootHandle, TAG_OBJECT, TAG_PAIR, TAG_SYMBOL,
};
use super::message::Message;
use super::reader;
use super::types::{DocumentType, JobStatus, PageRotation, PageType, TextDetail};
use super::wait::{FAILED_SYMBOL, STOPPED_SYMBOL};

/// A resource released through the engine, in release order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Released {
    Context(ContextHandle),
    Document(DocumentHandle),
    Page(PageHandle),
}

/// What a query for a decoded artifact eventually answers.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Artifact {
    /// No data: nil
    #[default]
    Empty,
    /// An expression in textual form, read when first queried
    Value(String),
    /// The `failed` status symbol
    Failed,
    /// The `stopped` status symbol
    Stopped,
}

impl Artifact {
    pub fn value(text: impl Into<String>) -> Self {
        Artifact::Value(text.into())
    }
}

/// Terminal state of a scripted job.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Outcome {
    #[default]
    Ok,
    /// Fails, posting the message as an engine error if there is one
    Failed(Option<String>),
    Stopped,
}

/// A scripted page.
#[derive(Debug, Clone)]
pub struct PageFixture {
    pub width: i32,
    pub height: i32,
    pub resolution: i32,
    pub gamma: f64,
    pub version: i32,
    pub page_type: PageType,
    pub initial_rotation: PageRotation,
    /// Pumps before the page job reaches its outcome
    pub steps: usize,
    pub outcome: Outcome,
    pub annotations: Artifact,
    pub text: FxHashMap<TextDetail, Artifact>,
}

impl Default for PageFixture {
    fn default() -> Self {
        PageFixture {
            width: 2550,
            height: 3300,
            resolution: 300,
            gamma: 2.2,
            version: 25,
            page_type: PageType::Bitonal,
            initial_rotation: PageRotation::Rotate0,
            steps: 1,
            outcome: Outcome::Ok,
            annotations: Artifact::Empty,
            text: FxHashMap::default(),
        }
    }
}

impl PageFixture {
    pub fn new(width: i32, height: i32) -> Self {
        PageFixture {
            width,
            height,
            ..Default::default()
        }
    }

    pub fn with_text(mut self, detail: TextDetail, text: impl Into<String>) -> Self {
        self.text.insert(detail, Artifact::Value(text.into()));
        self
    }

    pub fn with_text_artifact(mut self, detail: TextDetail, artifact: Artifact) -> Self {
        self.text.insert(detail, artifact);
        self
    }

    pub fn with_annotations(mut self, text: impl Into<String>) -> Self {
        self.annotations = Artifact::Value(text.into());
        self
    }

    pub fn with_resolution(mut self, dpi: i32) -> Self {
        self.resolution = dpi;
        self
    }

    pub fn with_rotation(mut self, rotation: PageRotation) -> Self {
        self.initial_rotation = rotation;
        self
    }

    pub fn with_steps(mut self, steps: usize) -> Self {
        self.steps = steps;
        self
    }

    pub fn with_outcome(mut self, outcome: Outcome) -> Self {
        self.outcome = outcome;
        self
    }
}

/// A scripted document.
#[derive(Debug, Clone)]
pub struct DocumentFixture {
    pub doc_type: DocumentType,
    /// Component files; the page count when `None`
    pub file_count: Option<usize>,
    pub pages: Vec<PageFixture>,
    /// Pumps before the document job reaches its outcome
    pub steps: usize,
    pub outcome: Outcome,
    /// Extra pumps after the document is decoded before artifacts resolve
    pub artifact_delay: usize,
    pub annotations: Artifact,
    pub outline: Artifact,
    /// Answer to a plain text structure dump
    pub dump: Option<String>,
    /// Answer to a JSON structure dump
    pub json_dump: Option<String>,
}

impl Default for DocumentFixture {
    fn default() -> Self {
        DocumentFixture {
            doc_type: DocumentType::Bundled,
            file_count: None,
            pages: Vec::new(),
            steps: 2,
            outcome: Outcome::Ok,
            artifact_delay: 0,
            annotations: Artifact::Empty,
            outline: Artifact::Empty,
            dump: None,
            json_dump: None,
        }
    }
}

impl DocumentFixture {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page(mut self, page: PageFixture) -> Self {
        self.pages.push(page);
        self
    }

    /// Appends `count` default pages.
    pub fn with_pages(mut self, count: usize) -> Self {
        self.pages
            .extend(std::iter::repeat_with(PageFixture::default).take(count));
        self
    }

    pub fn with_type(mut self, doc_type: DocumentType) -> Self {
        self.doc_type = doc_type;
        self
    }

    pub fn with_steps(mut self, steps: usize) -> Self {
        self.steps = steps;
        self
    }

    pub fn with_outcome(mut self, outcome: Outcome) -> Self {
        self.outcome = outcome;
        self
    }

    pub fn with_artifact_delay(mut self, pumps: usize) -> Self {
        self.artifact_delay = pumps;
        self
    }

    pub fn with_annotations(mut self, text: impl Into<String>) -> Self {
        self.annotations = Artifact::Value(text.into());
        self
    }

    pub fn with_annotations_artifact(mut self, artifact: Artifact) -> Self {
        self.annotations = artifact;
        self
    }

    pub fn with_outline(mut self, text: impl Into<String>) -> Self {
        self.outline = Artifact::Value(text.into());
        self
    }

    pub fn with_dump(mut self, text: impl Into<String>) -> Self {
        self.dump = Some(text.into());
        self
    }

    pub fn with_json_dump(mut self, text: impl Into<String>) -> Self {
        self.json_dump = Some(text.into());
        self
    }
}

#[derive(Debug, Clone)]
enum HeapCell {
    Pair(RawExpr, RawExpr),
    Str(String),
    Float(f64),
}

/// Progress of one scripted job.
#[derive(Debug)]
struct Job {
    ticks: usize,
    steps: usize,
    outcome: Outcome,
    reported: bool,
}

impl Job {
    fn new(steps: usize, outcome: Outcome) -> Self {
        Job {
            ticks: 0,
            steps,
            outcome,
            reported: false,
        }
    }

    fn status(&self) -> JobStatus {
        if self.ticks < self.steps {
            if self.ticks == 0 {
                JobStatus::NotStarted
            } else {
                JobStatus::Started
            }
        } else {
            match self.outcome {
                Outcome::Ok => JobStatus::Ok,
                Outcome::Failed(_) => JobStatus::Failed,
                Outcome::Stopped => JobStatus::Stopped,
            }
        }
    }

    /// The message announcing the terminal status, once.
    fn report(&mut self, done: Message) -> Option<Message> {
        if self.reported || !self.status().is_terminal() {
            return None;
        }
        self.reported = true;
        Some(match &self.outcome {
            Outcome::Ok => done,
            Outcome::Failed(reason) => Message::Error {
                message: reason.clone().unwrap_or_else(|| "decoding failed".to_string()),
                function: None,
                filename: None,
                line: 0,
            },
            Outcome::Stopped => Message::Info("decoding stopped".to_string()),
        })
    }

    fn advance(&mut self, done: Message) -> Option<Message> {
        self.ticks = self.ticks.saturating_add(1);
        if self.status().is_terminal() {
            return self.report(done);
        }
        let percent = (self.ticks.saturating_mul(100) / self.steps.max(1)).min(100);
        Some(Message::Progress {
            status: JobStatus::Started,
            percent: percent as i32,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum ArtifactKey {
    Annotations,
    Outline,
    PageAnnotations(usize),
    PageText(usize, TextDetail),
}

struct ContextState {
    messages: VecDeque<Message>,
    cache_size: Option<u64>,
}

struct DocumentState {
    context: ContextHandle,
    fixture: DocumentFixture,
    job: Job,
    cache: FxHashMap<ArtifactKey, RawExpr>,
}

struct PageState {
    document: DocumentHandle,
    index: usize,
    job: Job,
    rotation: PageRotation,
}

#[derive(Default)]
struct State {
    heap: Vec<HeapCell>,
    symbols: Vec<String>,
    symbol_ids: FxHashMap<String, usize>,
    fixtures: FxHashMap<PathBuf, DocumentFixture>,
    contexts: FxHashMap<ContextHandle, ContextState>,
    documents: FxHashMap<DocumentHandle, DocumentState>,
    pages: FxHashMap<PageHandle, PageState>,
    last_handle: usize,
    released: Vec<Released>,
    pump_count: usize,
    fail_next_context: bool,
    gc_lock_depth: usize,
    roots: FxHashMap<RootHandle, RawExpr>,
}

impl State {
    fn next_handle(&mut self) -> usize {
        self.last_handle += 1;
        self.last_handle
    }

    fn alloc(&mut self, cell: HeapCell, tag: usize) -> RawExpr {
        self.heap.push(cell);
        RawExpr::from_bits((self.heap.len() << 2) | tag)
    }

    fn cell(&self, expr: RawExpr, tag: usize) -> Option<&HeapCell> {
        if expr.tag() != tag {
            return None;
        }
        let slot = (expr.bits() >> 2).checked_sub(1)?;
        self.heap.get(slot)
    }

    fn intern(&mut self, name: &str) -> RawExpr {
        let slot = match self.symbol_ids.get(name) {
            Some(&slot) => slot,
            None => {
                self.symbols.push(name.to_string());
                let slot = self.symbols.len() - 1;
                self.symbol_ids.insert(name.to_string(), slot);
                slot
            }
        };
        RawExpr::from_bits(((slot + 1) << 2) | TAG_SYMBOL)
    }

    fn post(&mut self, context: ContextHandle, message: Message) {
        if let Some(state) = self.contexts.get_mut(&context) {
            state.messages.push_back(message);
        }
    }

    fn is_idle(&self, context: ContextHandle) -> bool {
        self.contexts
            .get(&context)
            .is_some_and(|state| state.messages.is_empty())
    }

    /// Advances every job living in the context by one step.
    fn tick(&mut self, context: ContextHandle) {
        let mut posted = Vec::new();

        for document in self.documents.values_mut() {
            if document.context == context {
                posted.extend(document.job.advance(Message::DocInfo));
            }
        }

        let documents = &self.documents;
        for page in self.pages.values_mut() {
            let owned = documents
                .get(&page.document)
                .is_some_and(|document| document.context == context);
            if owned {
                posted.extend(page.job.advance(Message::PageInfo));
            }
        }

        if let Some(state) = self.contexts.get_mut(&context) {
            state.messages.extend(posted);
        }
    }

    fn page_fixture(&self, page: PageHandle) -> Option<&PageFixture> {
        let state = self.pages.get(&page)?;
        self.documents
            .get(&state.document)?
            .fixture
            .pages
            .get(state.index)
    }
}

/// How an artifact query resolves at this moment.
enum Lookup {
    Pending,
    Resolved(RawExpr),
    Status(&'static str, Option<String>),
    Read(String),
}

/// An engine that keeps everything in process memory.
///
/// Not thread-safe; like a native context it is driven from one thread.
#[derive(Default)]
pub struct MemoryEngine {
    state: RefCell<State>,
}

impl MemoryEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the document answered for `path`.
    pub fn add_document(&self, path: impl Into<PathBuf>, fixture: DocumentFixture) {
        self.state.borrow_mut().fixtures.insert(path.into(), fixture);
    }

    /// Queues a message on a context as if the engine had posted it.
    pub fn post_message(&self, context: ContextHandle, message: Message) {
        self.state.borrow_mut().post(context, message);
    }

    /// Number of blocking waits performed.
    pub fn pump_count(&self) -> usize {
        self.state.borrow().pump_count
    }

    /// Every release so far, in order.
    pub fn released(&self) -> Vec<Released> {
        self.state.borrow().released.clone()
    }

    pub fn cache_size(&self, context: ContextHandle) -> Option<u64> {
        self.state
            .borrow()
            .contexts
            .get(&context)
            .and_then(|state| state.cache_size)
    }

    /// Makes the next context creation fail.
    pub fn fail_next_context(&self) {
        self.state.borrow_mut().fail_next_context = true;
    }

    /// Number of contexts, documents and pages not yet released.
    pub fn live_resources(&self) -> usize {
        let state = self.state.borrow();
        state.contexts.len() + state.documents.len() + state.pages.len()
    }

    pub fn is_gc_locked(&self) -> bool {
        self.state.borrow().gc_lock_depth > 0
    }

    /// Number of expressions currently registered as roots.
    pub fn root_count(&self) -> usize {
        self.state.borrow().roots.len()
    }

    fn lookup(&self, document: DocumentHandle, key: ArtifactKey) -> RawExpr {
        let decision = {
            let state = self.state.borrow();
            let Some(doc) = state.documents.get(&document) else {
                return RawExpr::NIL;
            };

            match doc.job.status() {
                JobStatus::NotStarted | JobStatus::Started => Lookup::Pending,
                JobStatus::Failed => Lookup::Status(FAILED_SYMBOL, None),
                JobStatus::Stopped | JobStatus::Unexpected(_) => Lookup::Status(STOPPED_SYMBOL, None),
                JobStatus::Ok if doc.job.ticks < doc.job.steps.saturating_add(doc.fixture.artifact_delay) => {
                    Lookup::Pending
                }
                JobStatus::Ok => match doc.cache.get(&key) {
                    Some(&cached) => Lookup::Resolved(cached),
                    None => match artifact_for(&doc.fixture, key) {
                        Artifact::Empty => Lookup::Resolved(RawExpr::NIL),
                        Artifact::Failed => Lookup::Status(
                            FAILED_SYMBOL,
                            Some(format!("cannot decode {:?}", key)),
                        ),
                        Artifact::Stopped => Lookup::Status(STOPPED_SYMBOL, None),
                        Artifact::Value(text) => Lookup::Read(text.clone()),
                    },
                },
            }
        };

        match decision {
            Lookup::Pending => RawExpr::DUMMY,
            Lookup::Resolved(raw) => raw,
            Lookup::Status(symbol, reason) => self.status_symbol(document, symbol, reason),
            Lookup::Read(text) => match reader::read(self, &text) {
                Ok(expr) => {
                    let raw = expr.raw();
                    if let Some(doc) = self.state.borrow_mut().documents.get_mut(&document) {
                        doc.cache.insert(key, raw);
                    }
                    raw
                }
                Err(err) => self.status_symbol(document, FAILED_SYMBOL, Some(err.to_string())),
            },
        }
    }

    fn status_symbol(&self, document: DocumentHandle, symbol: &str, reason: Option<String>) -> RawExpr {
        let mut state = self.state.borrow_mut();
        if let Some(message) = reason {
            if let Some(context) = state.documents.get(&document).map(|doc| doc.context) {
                state.post(
                    context,
                    Message::Error {
                        message,
                        function: None,
                        filename: None,
                        line: 0,
                    },
                );
            }
        }
        state.intern(symbol)
    }

    fn page_property<T>(&self, page: PageHandle, read: impl FnOnce(&PageFixture) -> T) -> Option<T> {
        self.state.borrow().page_fixture(page).map(read)
    }
}

fn artifact_for(fixture: &DocumentFixture, key: ArtifactKey) -> &Artifact {
    const EMPTY: &Artifact = &Artifact::Empty;
    match key {
        ArtifactKey::Annotations => &fixture.annotations,
        ArtifactKey::Outline => &fixture.outline,
        ArtifactKey::PageAnnotations(index) => fixture
            .pages
            .get(index)
            .map_or(EMPTY, |page| &page.annotations),
        ArtifactKey::PageText(index, detail) => fixture
            .pages
            .get(index)
            .and_then(|page| page.text.get(&detail))
            .unwrap_or(EMPTY),
    }
}

impl Engine for MemoryEngine {
    fn version(&self) -> String {
        concat!("djvu-x memory engine ", env!("CARGO_PKG_VERSION")).to_string()
    }

    fn create_context(&self, name: &str) -> Option<ContextHandle> {
        let mut state = self.state.borrow_mut();
        if std::mem::take(&mut state.fail_next_context) {
            return None;
        }
        let handle = ContextHandle::from_raw(state.next_handle())?;
        state.contexts.insert(
            handle,
            ContextState {
                messages: VecDeque::new(),
                cache_size: None,
            },
        );
        tracing::trace!(context = name, ?handle, "memory context created");
        Some(handle)
    }

    fn release_context(&self, context: ContextHandle) {
        let mut state = self.state.borrow_mut();
        if state.contexts.remove(&context).is_some() {
            state.released.push(Released::Context(context));
        }
    }

    fn set_cache_size(&self, context: ContextHandle, bytes: u64) {
        if let Some(state) = self.state.borrow_mut().contexts.get_mut(&context) {
            state.cache_size = Some(bytes);
        }
    }

    fn wait_message(&self, context: ContextHandle) {
        let mut state = self.state.borrow_mut();
        if !state.contexts.contains_key(&context) {
            return;
        }
        state.pump_count += 1;

        if state.is_idle(context) {
            state.tick(context);
        }
        // A real engine would block here; an idle queue gets a heartbeat
        if state.is_idle(context) {
            state.post(context, Message::Info("idle".to_string()));
        }
    }

    fn pop_message(&self, context: ContextHandle) -> Option<Message> {
        let mut state = self.state.borrow_mut();
        let message = state.contexts.get_mut(&context)?.messages.pop_front();
        if message.is_none() {
            // Work done in the background shows up on the next pump
            state.tick(context);
        }
        message
    }

    fn open_document(&self, context: ContextHandle, path: &Path, cache: bool) -> Option<DocumentHandle> {
        let mut state = self.state.borrow_mut();
        if !state.contexts.contains_key(&context) {
            return None;
        }

        let fixture = state.fixtures.get(path).cloned().unwrap_or_else(|| {
            DocumentFixture::new()
                .with_steps(1)
                .with_outcome(Outcome::Failed(Some(format!("cannot open {}", path.display()))))
        });

        let handle = DocumentHandle::from_raw(state.next_handle())?;
        tracing::trace!(path = %path.display(), cache, ?handle, "memory document created");

        let job = Job::new(fixture.steps, fixture.outcome.clone());
        state.documents.insert(
            handle,
            DocumentState {
                context,
                fixture,
                job,
                cache: FxHashMap::default(),
            },
        );
        Some(handle)
    }

    fn document_status(&self, document: DocumentHandle) -> JobStatus {
        let mut state = self.state.borrow_mut();
        let Some(doc) = state.documents.get_mut(&document) else {
            return JobStatus::Failed;
        };
        let status = doc.job.status();
        let context = doc.context;
        if let Some(message) = doc.job.report(Message::DocInfo) {
            state.post(context, message);
        }
        status
    }

    fn release_document(&self, document: DocumentHandle) {
        let mut state = self.state.borrow_mut();
        if state.documents.remove(&document).is_some() {
            state.released.push(Released::Document(document));
        }
    }

    fn document_type(&self, document: DocumentHandle) -> DocumentType {
        let state = self.state.borrow();
        match state.documents.get(&document) {
            Some(doc) if doc.job.status() == JobStatus::Ok => doc.fixture.doc_type,
            _ => DocumentType::Unknown,
        }
    }

    fn page_count(&self, document: DocumentHandle) -> usize {
        let state = self.state.borrow();
        match state.documents.get(&document) {
            Some(doc) if doc.job.status() == JobStatus::Ok => doc.fixture.pages.len(),
            _ => 0,
        }
    }

    fn file_count(&self, document: DocumentHandle) -> usize {
        let state = self.state.borrow();
        match state.documents.get(&document) {
            Some(doc) if doc.job.status() == JobStatus::Ok => {
                doc.fixture.file_count.unwrap_or(doc.fixture.pages.len())
            }
            _ => 0,
        }
    }

    fn document_annotations(&self, document: DocumentHandle, _compat: bool) -> RawExpr {
        self.lookup(document, ArtifactKey::Annotations)
    }

    fn page_annotations(&self, document: DocumentHandle, page: usize) -> RawExpr {
        self.lookup(document, ArtifactKey::PageAnnotations(page))
    }

    fn page_text(&self, document: DocumentHandle, page: usize, detail: TextDetail) -> RawExpr {
        self.lookup(document, ArtifactKey::PageText(page, detail))
    }

    fn document_dump(&self, document: DocumentHandle, json: bool) -> Option<String> {
        let state = self.state.borrow();
        let doc = state.documents.get(&document)?;
        if doc.job.status() != JobStatus::Ok {
            return None;
        }
        if json {
            doc.fixture.json_dump.clone()
        } else {
            doc.fixture.dump.clone()
        }
    }

    fn outline(&self, document: DocumentHandle) -> RawExpr {
        self.lookup(document, ArtifactKey::Outline)
    }

    fn create_page(&self, document: DocumentHandle, page: usize) -> Option<PageHandle> {
        let mut state = self.state.borrow_mut();
        let fixture = state.documents.get(&document)?.fixture.pages.get(page)?;
        let job = Job::new(fixture.steps, fixture.outcome.clone());
        let rotation = fixture.initial_rotation;

        let handle = PageHandle::from_raw(state.next_handle())?;
        state.pages.insert(
            handle,
            PageState {
                document,
                index: page,
                job,
                rotation,
            },
        );
        Some(handle)
    }

    fn page_status(&self, page: PageHandle) -> JobStatus {
        let mut state = self.state.borrow_mut();
        let Some(page_state) = state.pages.get_mut(&page) else {
            return JobStatus::Failed;
        };
        let status = page_state.job.status();
        let message = page_state.job.report(Message::PageInfo);
        let document = page_state.document;

        if let Some(message) = message {
            if let Some(context) = state.documents.get(&document).map(|doc| doc.context) {
                state.post(context, message);
            }
        }
        status
    }

    fn release_page(&self, page: PageHandle) {
        let mut state = self.state.borrow_mut();
        if state.pages.remove(&page).is_some() {
            state.released.push(Released::Page(page));
        }
    }

    fn page_width(&self, page: PageHandle) -> i32 {
        self.page_property(page, |p| p.width).unwrap_or(0)
    }

    fn page_height(&self, page: PageHandle) -> i32 {
        self.page_property(page, |p| p.height).unwrap_or(0)
    }

    fn page_resolution(&self, page: PageHandle) -> i32 {
        self.page_property(page, |p| p.resolution).unwrap_or(0)
    }

    fn page_gamma(&self, page: PageHandle) -> f64 {
        self.page_property(page, |p| p.gamma).unwrap_or(2.2)
    }

    fn page_version(&self, page: PageHandle) -> i32 {
        self.page_property(page, |p| p.version).unwrap_or(0)
    }

    fn page_type(&self, page: PageHandle) -> PageType {
        self.page_property(page, |p| p.page_type).unwrap_or_default()
    }

    fn page_rotation(&self, page: PageHandle) -> PageRotation {
        self.state
            .borrow()
            .pages
            .get(&page)
            .map(|state| state.rotation)
            .unwrap_or_default()
    }

    fn set_page_rotation(&self, page: PageHandle, rotation: PageRotation) {
        if let Some(state) = self.state.borrow_mut().pages.get_mut(&page) {
            state.rotation = rotation;
        }
    }

    fn page_initial_rotation(&self, page: PageHandle) -> PageRotation {
        self.page_property(page, |p| p.initial_rotation)
            .unwrap_or_default()
    }

    fn is_string(&self, expr: RawExpr) -> bool {
        matches!(self.state.borrow().cell(expr, TAG_OBJECT), Some(HeapCell::Str(_)))
    }

    fn is_float(&self, expr: RawExpr) -> bool {
        matches!(self.state.borrow().cell(expr, TAG_OBJECT), Some(HeapCell::Float(_)))
    }

    fn string_value(&self, expr: RawExpr) -> Option<String> {
        match self.state.borrow().cell(expr, TAG_OBJECT) {
            Some(HeapCell::Str(text)) => Some(text.clone()),
            _ => None,
        }
    }

    fn float_value(&self, expr: RawExpr) -> f64 {
        match self.state.borrow().cell(expr, TAG_OBJECT) {
            Some(HeapCell::Float(value)) => *value,
            _ => 0.0,
        }
    }

    fn symbol_name(&self, expr: RawExpr) -> Option<String> {
        if expr.tag() != TAG_SYMBOL {
            return None;
        }
        let slot = (expr.bits() >> 2).checked_sub(1)?;
        self.state.borrow().symbols.get(slot).cloned()
    }

    fn car(&self, expr: RawExpr) -> RawExpr {
        match self.state.borrow().cell(expr, TAG_PAIR) {
            Some(HeapCell::Pair(car, _)) => *car,
            _ => RawExpr::NIL,
        }
    }

    fn cdr(&self, expr: RawExpr) -> RawExpr {
        match self.state.borrow().cell(expr, TAG_PAIR) {
            Some(HeapCell::Pair(_, cdr)) => *cdr,
            _ => RawExpr::NIL,
        }
    }

    fn intern(&self, name: &str) -> Option<RawExpr> {
        if name.contains('\0') {
            return None;
        }
        Some(self.state.borrow_mut().intern(name))
    }

    fn new_string(&self, text: &str) -> Option<RawExpr> {
        if text.contains('\0') {
            return None;
        }
        Some(
            self.state
                .borrow_mut()
                .alloc(HeapCell::Str(text.to_string()), TAG_OBJECT),
        )
    }

    fn new_float(&self, value: f64) -> RawExpr {
        self.state
            .borrow_mut()
            .alloc(HeapCell::Float(value), TAG_OBJECT)
    }

    fn cons(&self, car: RawExpr, cdr: RawExpr) -> RawExpr {
        self.state
            .borrow_mut()
            .alloc(HeapCell::Pair(car, cdr), TAG_PAIR)
    }

    fn acquire_gc_lock(&self) {
        self.state.borrow_mut().gc_lock_depth += 1;
    }

    fn release_gc_lock(&self) {
        let mut state = self.state.borrow_mut();
        state.gc_lock_depth = state.gc_lock_depth.saturating_sub(1);
    }

    fn root(&self, expr: RawExpr) -> Option<RootHandle> {
        let mut state = self.state.borrow_mut();
        let root = RootHandle::from_raw(state.next_handle())?;
        state.roots.insert(root, expr);
        Some(root)
    }

    fn unroot(&self, root: RootHandle) {
        self.state.borrow_mut().roots.remove(&root);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_heap_values_never_collide_with_sentinels() {
        let engine = MemoryEngine::new();
        let pair = engine.cons(RawExpr::NIL, RawExpr::NIL);
        let sym = engine.intern("a").unwrap();
        let text = engine.new_string("b").unwrap();

        for raw in [pair, sym, text] {
            assert!(!raw.is_nil());
            assert!(!raw.is_dummy());
        }
        assert!(pair.is_pair());
        assert_eq!(sym.tag(), TAG_SYMBOL);
        assert_eq!(text.tag(), TAG_OBJECT);
    }

    #[test]
    fn test_interning_is_stable() {
        let engine = MemoryEngine::new();
        let first = engine.intern("word").unwrap();
        let other = engine.intern("line").unwrap();
        assert_eq!(engine.intern("word"), Some(first));
        assert_ne!(first, other);
        assert_eq!(engine.symbol_name(first).as_deref(), Some("word"));
        assert_eq!(engine.intern("a\0b"), None);
    }

    #[test]
    fn test_car_cdr_of_non_pairs_are_nil() {
        let engine = MemoryEngine::new();
        let sym = engine.intern("x").unwrap();
        assert_eq!(engine.car(sym), RawExpr::NIL);
        assert_eq!(engine.cdr(RawExpr::NIL), RawExpr::NIL);
        assert_eq!(engine.car(RawExpr::from_int(3)), RawExpr::NIL);
    }

    #[test]
    fn test_document_job_advances_per_pump() {
        let engine = MemoryEngine::new();
        engine.add_document("/doc.djvu", DocumentFixture::new().with_steps(4).with_pages(3));
        let ctx = engine.create_context("test").unwrap();
        let doc = engine.open_document(ctx, Path::new("/doc.djvu"), true).unwrap();
        let pump = || {
            engine.wait_message(ctx);
            while engine.pop_message(ctx).is_some() {}
        };

        assert_eq!(engine.document_status(doc), JobStatus::NotStarted);
        assert_eq!(engine.page_count(doc), 0);

        pump();
        assert_eq!(engine.document_status(doc), JobStatus::Started);
        pump();
        pump();
        assert_eq!(engine.document_status(doc), JobStatus::Ok);
        assert_eq!(engine.page_count(doc), 3);
    }

    #[test]
    fn test_unknown_path_fails_with_message() {
        let engine = MemoryEngine::new();
        let ctx = engine.create_context("test").unwrap();
        let doc = engine.open_document(ctx, Path::new("/missing.djvu"), true).unwrap();

        engine.wait_message(ctx);
        assert_eq!(engine.document_status(doc), JobStatus::Failed);

        let messages: Vec<_> = std::iter::from_fn(|| engine.pop_message(ctx)).collect();
        assert!(messages.iter().any(Message::is_error));
    }

    #[test]
    fn test_artifact_pending_then_read() {
        let engine = MemoryEngine::new();
        engine.add_document(
            "/doc.djvu",
            DocumentFixture::new()
                .with_steps(0)
                .with_artifact_delay(1)
                .with_annotations("((background #ffffff))"),
        );
        let ctx = engine.create_context("test").unwrap();
        let doc = engine.open_document(ctx, Path::new("/doc.djvu"), true).unwrap();

        assert_eq!(engine.document_annotations(doc, true), RawExpr::DUMMY);
        engine.wait_message(ctx);

        let first = engine.document_annotations(doc, true);
        assert!(first.is_pair());
        // Cached: same handle on every query
        assert_eq!(engine.document_annotations(doc, true), first);
        assert_eq!(engine.outline(doc), RawExpr::NIL);
    }

    #[test]
    fn test_dump_needs_a_decoded_document() {
        let engine = MemoryEngine::new();
        engine.add_document(
            "/doc.djvu",
            DocumentFixture::new()
                .with_steps(1)
                .with_dump("FORM:DJVM [120]")
                .with_json_dump("{\"form\":\"DJVM\"}"),
        );
        let ctx = engine.create_context("test").unwrap();
        let doc = engine.open_document(ctx, Path::new("/doc.djvu"), true).unwrap();

        assert_eq!(engine.document_dump(doc, false), None);
        engine.wait_message(ctx);
        assert_eq!(engine.document_dump(doc, false).as_deref(), Some("FORM:DJVM [120]"));
        assert_eq!(engine.document_dump(doc, true).as_deref(), Some("{\"form\":\"DJVM\"}"));
    }

    #[test]
    fn test_roots_are_tracked() {
        let engine = MemoryEngine::new();
        let text = engine.new_string("x").unwrap();
        let first = engine.root(text).unwrap();
        let second = engine.root(text).unwrap();
        assert_ne!(first, second);
        assert_eq!(engine.root_count(), 2);

        engine.unroot(first);
        engine.unroot(first);
        assert_eq!(engine.root_count(), 1);
    }

    #[test]
    fn test_release_is_recorded_once() {
        let engine = MemoryEngine::new();
        let ctx = engine.create_context("test").unwrap();
        engine.release_context(ctx);
        engine.release_context(ctx);
        assert_eq!(engine.released(), vec![Released::Context(ctx)]);
        assert_eq!(engine.live_resources(), 0);
    }
}
