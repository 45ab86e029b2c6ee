//! Raw FFI bindings to the DjVuLibre `ddjvuapi.h` and `miniexp.h` interfaces.
//!
//! Only the subset used by `djvu-x` is declared. Functions that the C headers
//! define as `static inline` (job status and release for documents and pages,
//! `miniexp_car` / `miniexp_cdr`) have no exported symbol and are not listed.
#![allow(non_upper_case_globals)]
#![allow(non_camel_case_types)]
#![allow(non_snake_case)]

use libc::{c_char, c_double, c_int, c_uint, c_ulong, c_void};

// Opaque handle types
#[repr(C)]
pub struct ddjvu_context_t {
    _private: [u8; 0],
}

#[repr(C)]
pub struct ddjvu_document_t {
    _private: [u8; 0],
}

#[repr(C)]
pub struct ddjvu_page_t {
    _private: [u8; 0],
}

#[repr(C)]
pub struct ddjvu_job_t {
    _private: [u8; 0],
}

/// A collector root owned by the caller (`minivar_t`).
#[repr(C)]
pub struct minivar_t {
    _private: [u8; 0],
}

/// Strings returned by the library are `malloc`ed and released with this.
pub use libc::free;

/// `miniexp_t` is a tagged pointer, never dereferenced through this type.
pub type miniexp_t = *mut c_void;

pub const miniexp_nil: miniexp_t = 0 as miniexp_t;
pub const miniexp_dummy: miniexp_t = 2 as miniexp_t;

// ==================== Enumerations ====================

pub type ddjvu_status_t = c_uint;
pub const DDJVU_JOB_NOTSTARTED: ddjvu_status_t = 0;
pub const DDJVU_JOB_STARTED: ddjvu_status_t = 1;
pub const DDJVU_JOB_OK: ddjvu_status_t = 2;
pub const DDJVU_JOB_FAILED: ddjvu_status_t = 3;
pub const DDJVU_JOB_STOPPED: ddjvu_status_t = 4;

pub type ddjvu_message_tag_t = c_uint;
pub const DDJVU_ERROR: ddjvu_message_tag_t = 0;
pub const DDJVU_INFO: ddjvu_message_tag_t = 1;
pub const DDJVU_NEWSTREAM: ddjvu_message_tag_t = 2;
pub const DDJVU_DOCINFO: ddjvu_message_tag_t = 3;
pub const DDJVU_PAGEINFO: ddjvu_message_tag_t = 4;
pub const DDJVU_RELAYOUT: ddjvu_message_tag_t = 5;
pub const DDJVU_REDISPLAY: ddjvu_message_tag_t = 6;
pub const DDJVU_CHUNK: ddjvu_message_tag_t = 7;
pub const DDJVU_THUMBNAIL: ddjvu_message_tag_t = 8;
pub const DDJVU_PROGRESS: ddjvu_message_tag_t = 9;

pub type ddjvu_document_type_t = c_uint;
pub const DDJVU_DOCTYPE_UNKNOWN: ddjvu_document_type_t = 0;
pub const DDJVU_DOCTYPE_SINGLEPAGE: ddjvu_document_type_t = 1;
pub const DDJVU_DOCTYPE_BUNDLED: ddjvu_document_type_t = 2;
pub const DDJVU_DOCTYPE_INDIRECT: ddjvu_document_type_t = 3;
pub const DDJVU_DOCTYPE_OLD_BUNDLED: ddjvu_document_type_t = 4;
pub const DDJVU_DOCTYPE_OLD_INDEXED: ddjvu_document_type_t = 5;

pub type ddjvu_page_type_t = c_uint;
pub const DDJVU_PAGETYPE_UNKNOWN: ddjvu_page_type_t = 0;
pub const DDJVU_PAGETYPE_BITONAL: ddjvu_page_type_t = 1;
pub const DDJVU_PAGETYPE_PHOTO: ddjvu_page_type_t = 2;
pub const DDJVU_PAGETYPE_COMPOUND: ddjvu_page_type_t = 3;

pub type ddjvu_page_rotation_t = c_uint;
pub const DDJVU_ROTATE_0: ddjvu_page_rotation_t = 0;
pub const DDJVU_ROTATE_90: ddjvu_page_rotation_t = 1;
pub const DDJVU_ROTATE_180: ddjvu_page_rotation_t = 2;
pub const DDJVU_ROTATE_270: ddjvu_page_rotation_t = 3;

// ==================== Messages ====================

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct ddjvu_message_any_t {
    pub tag: ddjvu_message_tag_t,
    pub context: *mut ddjvu_context_t,
    pub document: *mut ddjvu_document_t,
    pub page: *mut ddjvu_page_t,
    pub job: *mut ddjvu_job_t,
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct ddjvu_message_error_t {
    pub any: ddjvu_message_any_t,
    pub message: *const c_char,
    pub function: *const c_char,
    pub filename: *const c_char,
    pub lineno: c_int,
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct ddjvu_message_info_t {
    pub any: ddjvu_message_any_t,
    pub message: *const c_char,
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct ddjvu_message_newstream_t {
    pub any: ddjvu_message_any_t,
    pub streamid: c_int,
    pub name: *const c_char,
    pub url: *const c_char,
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct ddjvu_message_chunk_t {
    pub any: ddjvu_message_any_t,
    pub chunkid: *const c_char,
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct ddjvu_message_thumbnail_t {
    pub any: ddjvu_message_any_t,
    pub pagenum: c_int,
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct ddjvu_message_progress_t {
    pub any: ddjvu_message_any_t,
    pub status: ddjvu_status_t,
    pub percent: c_int,
}

/// Every member starts with `ddjvu_message_any_t`, so `m_any.tag` selects the
/// member to read.
#[repr(C)]
#[derive(Clone, Copy)]
pub union ddjvu_message_t {
    pub m_any: ddjvu_message_any_t,
    pub m_error: ddjvu_message_error_t,
    pub m_info: ddjvu_message_info_t,
    pub m_newstream: ddjvu_message_newstream_t,
    pub m_chunk: ddjvu_message_chunk_t,
    pub m_thumbnail: ddjvu_message_thumbnail_t,
    pub m_progress: ddjvu_message_progress_t,
}

unsafe extern "C" {
    // ==================== Library ====================
    pub fn ddjvu_get_version_string() -> *const c_char;

    // ==================== Context API ====================
    pub fn ddjvu_context_create(programname: *const c_char) -> *mut ddjvu_context_t;
    pub fn ddjvu_context_release(context: *mut ddjvu_context_t);
    pub fn ddjvu_cache_set_size(context: *mut ddjvu_context_t, cachesize: c_ulong);

    // ==================== Message Queue ====================
    pub fn ddjvu_message_wait(context: *mut ddjvu_context_t) -> *mut ddjvu_message_t;
    pub fn ddjvu_message_peek(context: *mut ddjvu_context_t) -> *mut ddjvu_message_t;
    pub fn ddjvu_message_pop(context: *mut ddjvu_context_t);

    // ==================== Jobs ====================
    pub fn ddjvu_document_job(document: *mut ddjvu_document_t) -> *mut ddjvu_job_t;
    pub fn ddjvu_page_job(page: *mut ddjvu_page_t) -> *mut ddjvu_job_t;
    pub fn ddjvu_job_status(job: *mut ddjvu_job_t) -> ddjvu_status_t;
    pub fn ddjvu_job_release(job: *mut ddjvu_job_t);

    // ==================== Document API ====================
    pub fn ddjvu_document_create_by_filename_utf8(
        context: *mut ddjvu_context_t,
        filename: *const c_char,
        cache: c_int,
    ) -> *mut ddjvu_document_t;
    pub fn ddjvu_document_get_type(document: *mut ddjvu_document_t) -> ddjvu_document_type_t;
    pub fn ddjvu_document_get_pagenum(document: *mut ddjvu_document_t) -> c_int;
    pub fn ddjvu_document_get_filenum(document: *mut ddjvu_document_t) -> c_int;
    pub fn ddjvu_document_get_anno(document: *mut ddjvu_document_t, compat: c_int) -> miniexp_t;
    pub fn ddjvu_document_get_pageanno(document: *mut ddjvu_document_t, pageno: c_int) -> miniexp_t;
    pub fn ddjvu_document_get_pagetext(
        document: *mut ddjvu_document_t,
        pageno: c_int,
        maxdetail: *const c_char,
    ) -> miniexp_t;
    pub fn ddjvu_document_get_outline(document: *mut ddjvu_document_t) -> miniexp_t;
    pub fn ddjvu_document_get_dump(document: *mut ddjvu_document_t, json: c_int) -> *mut c_char;

    // ==================== Page API ====================
    pub fn ddjvu_page_create_by_pageno(document: *mut ddjvu_document_t, pageno: c_int) -> *mut ddjvu_page_t;
    pub fn ddjvu_page_get_width(page: *mut ddjvu_page_t) -> c_int;
    pub fn ddjvu_page_get_height(page: *mut ddjvu_page_t) -> c_int;
    pub fn ddjvu_page_get_resolution(page: *mut ddjvu_page_t) -> c_int;
    pub fn ddjvu_page_get_gamma(page: *mut ddjvu_page_t) -> c_double;
    pub fn ddjvu_page_get_version(page: *mut ddjvu_page_t) -> c_int;
    pub fn ddjvu_page_get_type(page: *mut ddjvu_page_t) -> ddjvu_page_type_t;
    pub fn ddjvu_page_get_rotation(page: *mut ddjvu_page_t) -> ddjvu_page_rotation_t;
    pub fn ddjvu_page_set_rotation(page: *mut ddjvu_page_t, rot: ddjvu_page_rotation_t);
    pub fn ddjvu_page_get_initial_rotation(page: *mut ddjvu_page_t) -> ddjvu_page_rotation_t;

    // ==================== Minilisp ====================
    pub fn miniexp_stringp(p: miniexp_t) -> c_int;
    pub fn miniexp_to_str(p: miniexp_t) -> *const c_char;
    pub fn miniexp_string(s: *const c_char) -> miniexp_t;
    pub fn miniexp_floatnump(p: miniexp_t) -> c_int;
    pub fn miniexp_to_double(p: miniexp_t) -> c_double;
    pub fn miniexp_floatnum(x: c_double) -> miniexp_t;
    pub fn miniexp_symbol(name: *const c_char) -> miniexp_t;
    pub fn miniexp_to_name(p: miniexp_t) -> *const c_char;
    pub fn miniexp_cons(car: miniexp_t, cdr: miniexp_t) -> miniexp_t;
    pub fn minilisp_acquire_gc_lock(p: miniexp_t) -> miniexp_t;
    pub fn minilisp_release_gc_lock(p: miniexp_t) -> miniexp_t;
    pub fn minivar_alloc() -> *mut minivar_t;
    pub fn minivar_free(v: *mut minivar_t);
    pub fn minivar_pointer(v: *mut minivar_t) -> *mut miniexp_t;
}
