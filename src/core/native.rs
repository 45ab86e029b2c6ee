//! The engine backed by libdjvulibre.
//!
//! Handles are the library's own pointers; expressions are its `miniexp_t`
//! values, passed through untouched. Helpers that the C headers only define
//! inline (`miniexp_car`, `miniexp_cdr`, document and page status and
//! release) are expressed here in terms of exported functions.

use std::ffi::{c_char, c_int, c_ulong, CStr, CString};
use std::path::Path;

use djvulibre_sys as sys;

use super::engine::Engine;
use super::handle::{ContextHandle, DocumentHandle, PageHandle, RawExpr, RootHandle};
use super::message::Message;
use super::types::{DocumentType, JobStatus, PageRotation, PageType, TextDetail};

/// The process-wide libdjvulibre engine.
///
/// The library keeps no global state beyond its contexts, so there is
/// nothing to initialise; contexts are the unit of isolation.
pub struct NativeEngine {
    _private: (),
}

static ENGINE: NativeEngine = NativeEngine { _private: () };

impl NativeEngine {
    pub fn get() -> &'static NativeEngine {
        &ENGINE
    }
}

fn context_ptr(handle: ContextHandle) -> *mut sys::ddjvu_context_t {
    handle.as_raw() as *mut sys::ddjvu_context_t
}

fn document_ptr(handle: DocumentHandle) -> *mut sys::ddjvu_document_t {
    handle.as_raw() as *mut sys::ddjvu_document_t
}

fn page_ptr(handle: PageHandle) -> *mut sys::ddjvu_page_t {
    handle.as_raw() as *mut sys::ddjvu_page_t
}

fn to_miniexp(expr: RawExpr) -> sys::miniexp_t {
    expr.bits() as sys::miniexp_t
}

fn from_miniexp(expr: sys::miniexp_t) -> RawExpr {
    RawExpr::from_bits(expr as usize)
}

/// Copies a C string out of engine memory.
///
/// # Safety
/// `ptr` must be null or point to a NUL-terminated string that stays valid
/// for the duration of the call.
unsafe fn copy_str(ptr: *const c_char) -> Option<String> {
    if ptr.is_null() {
        return None;
    }
    // SAFETY: non-null and NUL-terminated per the caller's contract
    Some(unsafe { CStr::from_ptr(ptr) }.to_string_lossy().into_owned())
}

fn detail_keyword(detail: TextDetail) -> Option<CString> {
    CString::new(detail.as_str()).ok()
}

/// Copies a queued message out of the engine.
///
/// # Safety
/// `msg` must be the non-null result of `ddjvu_message_peek`, not yet popped.
unsafe fn convert_message(msg: *const sys::ddjvu_message_t) -> Message {
    // SAFETY: every union member starts with `m_any`, whose tag selects the
    // member that is valid to read
    unsafe {
        let tag = (*msg).m_any.tag;
        match tag {
            sys::DDJVU_ERROR => {
                let m = (*msg).m_error;
                Message::Error {
                    message: copy_str(m.message).unwrap_or_default(),
                    function: copy_str(m.function),
                    filename: copy_str(m.filename),
                    line: m.lineno,
                }
            }
            sys::DDJVU_INFO => Message::Info(copy_str((*msg).m_info.message).unwrap_or_default()),
            sys::DDJVU_NEWSTREAM => {
                let m = (*msg).m_newstream;
                Message::NewStream {
                    stream_id: m.streamid,
                    name: copy_str(m.name),
                    url: copy_str(m.url),
                }
            }
            sys::DDJVU_DOCINFO => Message::DocInfo,
            sys::DDJVU_PAGEINFO => Message::PageInfo,
            sys::DDJVU_RELAYOUT => Message::Relayout,
            sys::DDJVU_REDISPLAY => Message::Redisplay,
            sys::DDJVU_CHUNK => Message::Chunk(copy_str((*msg).m_chunk.chunkid).unwrap_or_default()),
            sys::DDJVU_THUMBNAIL => Message::Thumbnail {
                page: (*msg).m_thumbnail.pagenum,
            },
            sys::DDJVU_PROGRESS => {
                let m = (*msg).m_progress;
                Message::Progress {
                    status: JobStatus::from_raw(m.status),
                    percent: m.percent,
                }
            }
            other => Message::Info(format!("unknown engine message {}", other)),
        }
    }
}

impl Engine for NativeEngine {
    fn version(&self) -> String {
        // SAFETY: returns a static string
        unsafe { copy_str(sys::ddjvu_get_version_string()) }.unwrap_or_default()
    }

    fn create_context(&self, name: &str) -> Option<ContextHandle> {
        let name = CString::new(name).ok()?;
        // SAFETY: `name` outlives the call; the library copies it
        let ctx = unsafe { sys::ddjvu_context_create(name.as_ptr()) };
        ContextHandle::from_raw(ctx as usize)
    }

    fn release_context(&self, context: ContextHandle) {
        // SAFETY: the handle is live and released exactly once by its owner
        unsafe { sys::ddjvu_context_release(context_ptr(context)) }
    }

    fn set_cache_size(&self, context: ContextHandle, bytes: u64) {
        let bytes = c_ulong::try_from(bytes).unwrap_or(c_ulong::MAX);
        // SAFETY: live context handle
        unsafe { sys::ddjvu_cache_set_size(context_ptr(context), bytes) }
    }

    fn wait_message(&self, context: ContextHandle) {
        // SAFETY: live context handle; the message stays queued
        unsafe {
            sys::ddjvu_message_wait(context_ptr(context));
        }
    }

    fn pop_message(&self, context: ContextHandle) -> Option<Message> {
        let ctx = context_ptr(context);
        // SAFETY: live context handle; the peeked message is copied before it
        // is popped
        unsafe {
            let msg = sys::ddjvu_message_peek(ctx);
            if msg.is_null() {
                return None;
            }
            let message = convert_message(msg);
            sys::ddjvu_message_pop(ctx);
            Some(message)
        }
    }

    fn open_document(&self, context: ContextHandle, path: &Path, cache: bool) -> Option<DocumentHandle> {
        let filename = CString::new(path.to_string_lossy().as_bytes()).ok()?;
        // SAFETY: live context handle; `filename` outlives the call
        let doc = unsafe {
            sys::ddjvu_document_create_by_filename_utf8(context_ptr(context), filename.as_ptr(), cache as c_int)
        };
        DocumentHandle::from_raw(doc as usize)
    }

    fn document_status(&self, document: DocumentHandle) -> JobStatus {
        // SAFETY: live document handle
        let raw = unsafe { sys::ddjvu_job_status(sys::ddjvu_document_job(document_ptr(document))) };
        JobStatus::from_raw(raw)
    }

    fn release_document(&self, document: DocumentHandle) {
        // SAFETY: live document handle, released exactly once
        unsafe { sys::ddjvu_job_release(sys::ddjvu_document_job(document_ptr(document))) }
    }

    fn document_type(&self, document: DocumentHandle) -> DocumentType {
        // SAFETY: live document handle
        DocumentType::from_raw(unsafe { sys::ddjvu_document_get_type(document_ptr(document)) })
    }

    fn page_count(&self, document: DocumentHandle) -> usize {
        // SAFETY: live document handle
        let count = unsafe { sys::ddjvu_document_get_pagenum(document_ptr(document)) };
        usize::try_from(count).unwrap_or(0)
    }

    fn file_count(&self, document: DocumentHandle) -> usize {
        // SAFETY: live document handle
        let count = unsafe { sys::ddjvu_document_get_filenum(document_ptr(document)) };
        usize::try_from(count).unwrap_or(0)
    }

    fn document_annotations(&self, document: DocumentHandle, compat: bool) -> RawExpr {
        // SAFETY: live document handle
        from_miniexp(unsafe { sys::ddjvu_document_get_anno(document_ptr(document), compat as c_int) })
    }

    fn page_annotations(&self, document: DocumentHandle, page: usize) -> RawExpr {
        let Ok(pageno) = c_int::try_from(page) else {
            return RawExpr::NIL;
        };
        // SAFETY: live document handle
        from_miniexp(unsafe { sys::ddjvu_document_get_pageanno(document_ptr(document), pageno) })
    }

    fn page_text(&self, document: DocumentHandle, page: usize, detail: TextDetail) -> RawExpr {
        let Ok(pageno) = c_int::try_from(page) else {
            return RawExpr::NIL;
        };
        let Some(keyword) = detail_keyword(detail) else {
            return RawExpr::NIL;
        };
        // SAFETY: live document handle; `keyword` outlives the call
        from_miniexp(unsafe { sys::ddjvu_document_get_pagetext(document_ptr(document), pageno, keyword.as_ptr()) })
    }

    fn outline(&self, document: DocumentHandle) -> RawExpr {
        // SAFETY: live document handle
        from_miniexp(unsafe { sys::ddjvu_document_get_outline(document_ptr(document)) })
    }

    fn document_dump(&self, document: DocumentHandle, json: bool) -> Option<String> {
        // SAFETY: live document handle; the returned string is ours to free
        unsafe {
            let text = sys::ddjvu_document_get_dump(document_ptr(document), json as c_int);
            let dump = copy_str(text);
            if !text.is_null() {
                sys::free(text.cast());
            }
            dump
        }
    }

    fn create_page(&self, document: DocumentHandle, page: usize) -> Option<PageHandle> {
        let pageno = c_int::try_from(page).ok()?;
        // SAFETY: live document handle
        let ptr = unsafe { sys::ddjvu_page_create_by_pageno(document_ptr(document), pageno) };
        PageHandle::from_raw(ptr as usize)
    }

    fn page_status(&self, page: PageHandle) -> JobStatus {
        // SAFETY: live page handle
        let raw = unsafe { sys::ddjvu_job_status(sys::ddjvu_page_job(page_ptr(page))) };
        JobStatus::from_raw(raw)
    }

    fn release_page(&self, page: PageHandle) {
        // SAFETY: live page handle, released exactly once
        unsafe { sys::ddjvu_job_release(sys::ddjvu_page_job(page_ptr(page))) }
    }

    fn page_width(&self, page: PageHandle) -> i32 {
        // SAFETY: live page handle
        unsafe { sys::ddjvu_page_get_width(page_ptr(page)) }
    }

    fn page_height(&self, page: PageHandle) -> i32 {
        // SAFETY: live page handle
        unsafe { sys::ddjvu_page_get_height(page_ptr(page)) }
    }

    fn page_resolution(&self, page: PageHandle) -> i32 {
        // SAFETY: live page handle
        unsafe { sys::ddjvu_page_get_resolution(page_ptr(page)) }
    }

    fn page_gamma(&self, page: PageHandle) -> f64 {
        // SAFETY: live page handle
        unsafe { sys::ddjvu_page_get_gamma(page_ptr(page)) }
    }

    fn page_version(&self, page: PageHandle) -> i32 {
        // SAFETY: live page handle
        unsafe { sys::ddjvu_page_get_version(page_ptr(page)) }
    }

    fn page_type(&self, page: PageHandle) -> PageType {
        // SAFETY: live page handle
        PageType::from_raw(unsafe { sys::ddjvu_page_get_type(page_ptr(page)) })
    }

    fn page_rotation(&self, page: PageHandle) -> PageRotation {
        // SAFETY: live page handle
        PageRotation::from_raw(unsafe { sys::ddjvu_page_get_rotation(page_ptr(page)) })
    }

    fn set_page_rotation(&self, page: PageHandle, rotation: PageRotation) {
        // SAFETY: live page handle
        unsafe { sys::ddjvu_page_set_rotation(page_ptr(page), rotation.as_raw()) }
    }

    fn page_initial_rotation(&self, page: PageHandle) -> PageRotation {
        // SAFETY: live page handle
        PageRotation::from_raw(unsafe { sys::ddjvu_page_get_initial_rotation(page_ptr(page)) })
    }

    fn is_string(&self, expr: RawExpr) -> bool {
        // SAFETY: the predicate accepts any expression value
        unsafe { sys::miniexp_stringp(to_miniexp(expr)) != 0 }
    }

    fn is_float(&self, expr: RawExpr) -> bool {
        // SAFETY: the predicate accepts any expression value
        unsafe { sys::miniexp_floatnump(to_miniexp(expr)) != 0 }
    }

    fn string_value(&self, expr: RawExpr) -> Option<String> {
        if !self.is_string(expr) {
            return None;
        }
        // SAFETY: a string expression; its text lives as long as the
        // expression and is copied before returning
        unsafe { copy_str(sys::miniexp_to_str(to_miniexp(expr))) }
    }

    fn float_value(&self, expr: RawExpr) -> f64 {
        // SAFETY: returns 0 for non-numbers
        unsafe { sys::miniexp_to_double(to_miniexp(expr)) }
    }

    fn symbol_name(&self, expr: RawExpr) -> Option<String> {
        // SAFETY: returns null for non-symbols; names are interned for the
        // life of the process
        unsafe { copy_str(sys::miniexp_to_name(to_miniexp(expr))) }
    }

    fn car(&self, expr: RawExpr) -> RawExpr {
        if !expr.is_pair() {
            return RawExpr::NIL;
        }
        // SAFETY: a non-nil pair points at two consecutive miniexp_t slots
        from_miniexp(unsafe { *(expr.bits() as *const sys::miniexp_t) })
    }

    fn cdr(&self, expr: RawExpr) -> RawExpr {
        if !expr.is_pair() {
            return RawExpr::NIL;
        }
        // SAFETY: a non-nil pair points at two consecutive miniexp_t slots
        from_miniexp(unsafe { *(expr.bits() as *const sys::miniexp_t).add(1) })
    }

    fn intern(&self, name: &str) -> Option<RawExpr> {
        let name = CString::new(name).ok()?;
        // SAFETY: `name` outlives the call; the library copies it
        Some(from_miniexp(unsafe { sys::miniexp_symbol(name.as_ptr()) }))
    }

    fn new_string(&self, text: &str) -> Option<RawExpr> {
        let text = CString::new(text).ok()?;
        // SAFETY: `text` outlives the call; the library copies it
        Some(from_miniexp(unsafe { sys::miniexp_string(text.as_ptr()) }))
    }

    fn new_float(&self, value: f64) -> RawExpr {
        // SAFETY: allocates a new number
        from_miniexp(unsafe { sys::miniexp_floatnum(value) })
    }

    fn cons(&self, car: RawExpr, cdr: RawExpr) -> RawExpr {
        // SAFETY: both halves are expression values
        from_miniexp(unsafe { sys::miniexp_cons(to_miniexp(car), to_miniexp(cdr)) })
    }

    fn acquire_gc_lock(&self) {
        // SAFETY: nil is always a valid argument
        unsafe {
            sys::minilisp_acquire_gc_lock(sys::miniexp_nil);
        }
    }

    fn release_gc_lock(&self) {
        // SAFETY: paired with a previous acquire
        unsafe {
            sys::minilisp_release_gc_lock(sys::miniexp_nil);
        }
    }

    fn root(&self, expr: RawExpr) -> Option<RootHandle> {
        // SAFETY: a fresh minivar is registered with the collector and its
        // slot is writable until it is freed
        unsafe {
            let var = sys::minivar_alloc();
            if var.is_null() {
                return None;
            }
            *sys::minivar_pointer(var) = to_miniexp(expr);
            RootHandle::from_raw(var as usize)
        }
    }

    fn unroot(&self, root: RootHandle) {
        // SAFETY: allocated by `root` and freed exactly once by its owner
        unsafe { sys::minivar_free(root.as_raw() as *mut sys::minivar_t) }
    }
}
