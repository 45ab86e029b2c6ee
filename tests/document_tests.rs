//! Document and page lifecycle tests
//!
//! Every test scripts its documents on a MemoryEngine, so nothing here needs
//! libdjvulibre.


use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::time::Duration;

use djvu_x::core::*;
use test_utils::*;

// ============================================================================
// Document Loading Tests
// ============================================================================

#[test]
fn test_document_load_basic() {
    let engine = MemoryEngine::new();
    let file = register(&engine, sample_document());
    let context = Context::new(&engine, "load").unwrap();

    let document = Document::open(&context, file.path()).unwrap();

    assert_eq!(document.page_count().unwrap(), 3);
    assert_eq!(document.file_count().unwrap(), 3);
    assert_eq!(document.document_type().unwrap(), DocumentType::Bundled);
    assert_eq!(document.path(), file.path());
    assert!(engine.pump_count() >= 1, "opening should pump the message queue");
}

#[test]
fn test_document_load_slow_job() {
    let engine = MemoryEngine::new();
    let file = register(&engine, DocumentFixture::new().with_pages(1).with_steps(25));
    let context = Context::new(&engine, "slow").unwrap();

    let document = Document::open(&context, file.path()).unwrap();
    assert_eq!(document.page_count().unwrap(), 1);
}

#[test]
fn test_document_file_count_differs_from_pages() {
    let engine = MemoryEngine::new();
    let mut fixture = DocumentFixture::new()
        .with_pages(2)
        .with_type(DocumentType::Indirect);
    fixture.file_count = Some(4);
    let file = register(&engine, fixture);
    let context = Context::new(&engine, "files").unwrap();

    let document = Document::open(&context, file.path()).unwrap();
    assert_eq!(document.document_type().unwrap(), DocumentType::Indirect);
    assert_eq!(document.page_count().unwrap(), 2);
    assert_eq!(document.file_count().unwrap(), 4);
}

#[test]
fn test_document_structure_dump() {
    let engine = MemoryEngine::new();
    let fixture = sample_document()
        .with_dump(STRUCTURE)
        .with_json_dump(STRUCTURE_JSON);
    let file = register(&engine, fixture);
    let context = Context::new(&engine, "structure").unwrap();

    let mut document = Document::open(&context, file.path()).unwrap();
    assert_eq!(document.dump(false).unwrap().as_deref(), Some(STRUCTURE));
    assert_eq!(document.dump(true).unwrap().as_deref(), Some(STRUCTURE_JSON));

    document.close();
    assert!(matches!(document.dump(false), Err(DjvuError::InvalidHandle(_))));
}

#[test]
fn test_document_without_structure_dump() {
    let engine = MemoryEngine::new();
    let file = register(&engine, sample_document());
    let context = Context::new(&engine, "structure").unwrap();

    let document = Document::open(&context, file.path()).unwrap();
    assert_eq!(document.dump(false).unwrap(), None);
}

#[test]
fn test_document_missing_file() {
    let engine = MemoryEngine::new();
    let context = Context::new(&engine, "missing").unwrap();

    let result = Document::open(&context, "/definitely/not/here.djvu");
    assert!(matches!(result, Err(DjvuError::FileNotFound(_))));
    // Only the context was ever created
    assert_eq!(engine.live_resources(), 1);
    assert!(engine.released().is_empty());
}

#[test]
fn test_document_empty_path() {
    let engine = MemoryEngine::new();
    let context = Context::new(&engine, "empty").unwrap();

    assert!(matches!(
        Document::open(&context, ""),
        Err(DjvuError::Generic(_))
    ));
}

#[test]
fn test_document_decode_failure_releases_job() {
    let engine = MemoryEngine::new();
    let file = unregistered_file();
    let context = Context::new(&engine, "failure").unwrap();

    match Document::open(&context, file.path()) {
        Err(DjvuError::DecodeFailed { job, reason }) => {
            assert!(job.starts_with("document "));
            let reason = reason.expect("engine error should be carried");
            assert!(reason.contains("cannot open"), "unexpected reason {}", reason);
        }
        other => panic!("expected DecodeFailed, got {:?}", other),
    }

    let released = engine.released();
    assert_eq!(released.len(), 1);
    assert!(matches!(released[0], Released::Document(_)));
    // The context stays with the caller
    assert!(context.is_open());
    assert_eq!(engine.live_resources(), 1);
}

#[test]
fn test_document_decode_stopped() {
    let engine = MemoryEngine::new();
    let file = register(
        &engine,
        DocumentFixture::new().with_pages(1).with_outcome(Outcome::Stopped),
    );
    let context = Context::new(&engine, "stopped").unwrap();

    assert!(matches!(
        Document::open(&context, file.path()),
        Err(DjvuError::DecodeStopped { .. })
    ));
    assert_eq!(engine.live_resources(), 1);
}

#[test]
fn test_document_open_times_out() {
    let engine = MemoryEngine::new();
    let file = register(&engine, DocumentFixture::new().with_steps(usize::MAX));
    let context = Context::new(&engine, "timeout").unwrap();

    let options = OpenOptions::default().with_wait(
        WaitOptions::default()
            .with_timeout(Duration::from_millis(20))
            .with_poll_interval(Duration::from_millis(1)),
    );

    match Document::open_with(&context, file.path(), &options) {
        Err(DjvuError::Timeout { waited, .. }) => assert!(waited >= Duration::from_millis(20)),
        other => panic!("expected Timeout, got {:?}", other),
    }
    // Bounded waits never block on the engine
    assert_eq!(engine.pump_count(), 0);
    assert_eq!(engine.live_resources(), 1);
}

#[test]
fn test_document_open_cancelled() {
    let engine = MemoryEngine::new();
    let file = register(&engine, DocumentFixture::new().with_steps(usize::MAX));
    let context = Context::new(&engine, "cancel").unwrap();

    let options = OpenOptions::default()
        .with_wait(WaitOptions::default().with_cancel(Arc::new(AtomicBool::new(true))));

    assert!(matches!(
        Document::open_with(&context, file.path(), &options),
        Err(DjvuError::Cancelled { .. })
    ));
    assert_eq!(engine.live_resources(), 1);
}

// ============================================================================
// Release Tests
// ============================================================================

#[test]
fn test_release_order_is_reverse_of_acquisition() {
    let engine = MemoryEngine::new();
    let file = register(&engine, sample_document());

    let (context_handle, document_handle, page_handle);
    {
        let context = Context::new(&engine, "order").unwrap();
        let document = Document::open(&context, file.path()).unwrap();
        let page = document.page(0).unwrap();

        context_handle = context.handle().unwrap();
        document_handle = document.handle().unwrap();
        page_handle = page.handle().unwrap();
    }

    assert_eq!(
        engine.released(),
        vec![
            Released::Page(page_handle),
            Released::Document(document_handle),
            Released::Context(context_handle),
        ]
    );
    assert_eq!(engine.live_resources(), 0);
}

#[test]
fn test_document_close_is_idempotent() {
    let engine = MemoryEngine::new();
    let file = register(&engine, sample_document());
    let context = Context::new(&engine, "close").unwrap();

    let mut document = Document::open(&context, file.path()).unwrap();
    let handle = document.handle().unwrap();
    document.close();
    document.close();

    assert!(matches!(document.page_count(), Err(DjvuError::InvalidHandle(_))));
    assert!(matches!(document.outline(), Err(DjvuError::InvalidHandle(_))));
    drop(document);

    assert_eq!(engine.released(), vec![Released::Document(handle)]);
}

#[test]
fn test_page_close_is_idempotent() {
    let engine = MemoryEngine::new();
    let file = register(&engine, sample_document());
    let context = Context::new(&engine, "close").unwrap();
    let document = Document::open(&context, file.path()).unwrap();

    let mut page = document.page(1).unwrap();
    let handle = page.handle().unwrap();
    page.close();
    page.close();

    assert!(matches!(page.width(), Err(DjvuError::InvalidHandle(_))));
    drop(page);
    assert_eq!(engine.released(), vec![Released::Page(handle)]);
}

// ============================================================================
// Page Tests
// ============================================================================

#[test]
fn test_page_properties() {
    let engine = MemoryEngine::new();
    let file = register(&engine, sample_document());
    let context = Context::new(&engine, "props").unwrap();
    let document = Document::open(&context, file.path()).unwrap();

    let page = document.page(1).unwrap();
    assert_eq!(page.index(), 1);
    assert_eq!(page.width().unwrap(), 1700);
    assert_eq!(page.height().unwrap(), 2200);
    assert_eq!(page.resolution().unwrap(), 200);
    assert_eq!(page.version().unwrap(), 25);
    assert_eq!(page.page_type().unwrap(), PageType::Bitonal);
    assert!((page.gamma().unwrap() - 2.2).abs() < f64::EPSILON);
    assert_eq!(page.initial_rotation().unwrap(), PageRotation::Rotate90);
    assert_eq!(page.rotation().unwrap().degrees(), 90);
}

#[test]
fn test_page_set_rotation() {
    let engine = MemoryEngine::new();
    let file = register(&engine, sample_document());
    let context = Context::new(&engine, "rotate").unwrap();
    let document = Document::open(&context, file.path()).unwrap();

    let mut page = document.page(1).unwrap();
    page.set_rotation(PageRotation::Rotate180).unwrap();

    assert_eq!(page.rotation().unwrap(), PageRotation::Rotate180);
    assert_eq!(page.initial_rotation().unwrap(), PageRotation::Rotate90);
}

#[test]
fn test_page_index_out_of_range() {
    let engine = MemoryEngine::new();
    let file = register(&engine, sample_document());
    let context = Context::new(&engine, "range").unwrap();
    let document = Document::open(&context, file.path()).unwrap();

    assert!(matches!(
        document.page(3),
        Err(DjvuError::IndexOutOfRange { index: 3, length: 3 })
    ));
    assert!(matches!(
        document.page_text(7, TextDetail::Page),
        Err(DjvuError::IndexOutOfRange { index: 7, length: 3 })
    ));
    assert!(matches!(
        document.page_annotations(3),
        Err(DjvuError::IndexOutOfRange { .. })
    ));
}

#[test]
fn test_page_decode_failure() {
    let engine = MemoryEngine::new();
    let file = register(
        &engine,
        DocumentFixture::new().with_page(
            PageFixture::default().with_outcome(Outcome::Failed(Some("broken page".to_string()))),
        ),
    );
    let context = Context::new(&engine, "page-failure").unwrap();
    let document = Document::open(&context, file.path()).unwrap();

    match document.page(0) {
        Err(DjvuError::DecodeFailed { job, reason }) => {
            assert_eq!(job, "page 0");
            assert_eq!(reason.as_deref(), Some("broken page"));
        }
        other => panic!("expected DecodeFailed, got {:?}", other),
    }

    assert!(matches!(engine.released().as_slice(), [Released::Page(_)]));
    // The document survives a failed page
    assert_eq!(document.page_count().unwrap(), 1);
}

// ============================================================================
// Text Tests
// ============================================================================

#[test]
fn test_page_full_text() {
    let engine = MemoryEngine::new();
    let file = register(&engine, sample_document());
    let context = Context::new(&engine, "text").unwrap();
    let document = Document::open(&context, file.path()).unwrap();

    let page = document.page(0).unwrap();
    assert_eq!(page.full_text().unwrap().as_deref(), Some("Page text"));
    assert_eq!(
        page.text_dump(TextDetail::Page).unwrap().as_deref(),
        Some(PAGE_TEXT)
    );
}

#[test]
fn test_page_text_zones() {
    let engine = MemoryEngine::new();
    let file = register(&engine, sample_document());
    let context = Context::new(&engine, "zones").unwrap();
    let document = Document::open(&context, file.path()).unwrap();

    let page = document.page(0).unwrap();
    let zone = page.text(TextDetail::Word).unwrap().expect("page has text");

    assert_eq!(zone.kind, ZoneKind::Page);
    assert_eq!(zone.text(), "Hello world\nagain");
    assert_eq!(zone.zones_of(ZoneKind::Line).len(), 2);
    assert_eq!(zone.zones_of(ZoneKind::Word).len(), 3);
}

#[test]
fn test_page_without_text() {
    let engine = MemoryEngine::new();
    let file = register(&engine, sample_document());
    let context = Context::new(&engine, "no-text").unwrap();
    let document = Document::open(&context, file.path()).unwrap();

    let page = document.page(2).unwrap();
    assert!(page.text(TextDetail::Word).unwrap().is_none());
    assert!(page.full_text().unwrap().is_none());
    assert!(document.page_text(2, TextDetail::Char).unwrap().is_none());
}

#[test]
fn test_page_text_wrong_arity_is_malformed() {
    let engine = MemoryEngine::new();
    let file = register(
        &engine,
        DocumentFixture::new()
            .with_page(PageFixture::default().with_text(TextDetail::Page, "(page 373 150 2190 3119)")),
    );
    let context = Context::new(&engine, "arity").unwrap();
    let document = Document::open(&context, file.path()).unwrap();

    let page = document.page(0).unwrap();
    assert_malformed(page.full_text());
}

#[test]
fn test_page_text_artifact_failure() {
    let engine = MemoryEngine::new();
    let file = register(
        &engine,
        DocumentFixture::new().with_page(
            PageFixture::default()
                .with_text_artifact(TextDetail::Page, Artifact::Failed)
                .with_text_artifact(TextDetail::Word, Artifact::Stopped),
        ),
    );
    let context = Context::new(&engine, "artifact").unwrap();
    let document = Document::open(&context, file.path()).unwrap();

    match document.page_text(0, TextDetail::Page) {
        Err(DjvuError::DecodeFailed { job, reason }) => {
            assert_eq!(job, "text of page 0");
            assert!(reason.is_some());
        }
        other => panic!("expected DecodeFailed, got {:?}", other),
    }
    assert!(matches!(
        document.page_text(0, TextDetail::Word),
        Err(DjvuError::DecodeStopped { .. })
    ));
}

#[test]
fn test_delayed_artifact_pumps_until_ready() {
    let engine = MemoryEngine::new();
    let file = register(
        &engine,
        sample_document().with_artifact_delay(5),
    );
    let context = Context::new(&engine, "delay").unwrap();
    let document = Document::open(&context, file.path()).unwrap();

    let before = engine.pump_count();
    let text = document.page_text(0, TextDetail::Page).unwrap().expect("text");
    assert!(engine.pump_count() > before);
    assert_eq!(full_text(&text).unwrap(), "Page text");
}

// ============================================================================
// Annotation & Outline Tests
// ============================================================================

#[test]
fn test_document_annotations() {
    let engine = MemoryEngine::new();
    let file = register(&engine, sample_document());
    let context = Context::new(&engine, "anno").unwrap();
    let document = Document::open(&context, file.path()).unwrap();

    let anno = document.annotations(true).unwrap().expect("annotations");
    assert_eq!(anno.background().unwrap().as_deref(), Some("#ffffff"));
    assert_eq!(anno.zoom().unwrap().as_deref(), Some("width"));
    assert_eq!(anno.mode().unwrap().as_deref(), Some("color"));
    assert_eq!(anno.metadata_value("Year").unwrap().as_deref(), Some("2004"));

    let links = anno.hyperlinks().unwrap();
    assert_eq!(links.len(), 1);
    assert_eq!(links[0].url, "#2");
    assert_eq!(links[0].comment, "Next page");
    assert_eq!(links[0].shape.kind, ShapeKind::Rect);
    assert_eq!(links[0].shape.coords, vec![0, 0, 100, 50]);
}

#[test]
fn test_page_annotations() {
    let engine = MemoryEngine::new();
    let file = register(&engine, sample_document());
    let context = Context::new(&engine, "page-anno").unwrap();
    let document = Document::open(&context, file.path()).unwrap();

    let first = document.page(0).unwrap();
    let anno = first.annotations().unwrap().expect("page annotations");
    let links = anno.hyperlinks().unwrap();
    assert_eq!(links[0].url, "http://example.com");
    assert_eq!(links[0].shape.kind, ShapeKind::Oval);

    let second = document.page(1).unwrap();
    assert!(second.annotations().unwrap().is_none());
}

#[test]
fn test_document_outline() {
    let engine = MemoryEngine::new();
    let file = register(&engine, sample_document());
    let context = Context::new(&engine, "outline").unwrap();
    let document = Document::open(&context, file.path()).unwrap();

    let outline = document.outline().unwrap();
    assert_eq!(outline.len(), 2);
    assert_eq!(outline[0].title, "Cover");
    assert_eq!(outline[1].children[0].title, "Part one");
    assert_eq!(outline[1].children[0].page_number(), Some(3));
    assert_eq!(outline.iter().map(OutlineEntry::count).sum::<usize>(), 3);
}

#[test]
fn test_document_without_outline() {
    let engine = MemoryEngine::new();
    let file = register(&engine, DocumentFixture::new().with_pages(1));
    let context = Context::new(&engine, "no-outline").unwrap();
    let document = Document::open(&context, file.path()).unwrap();

    assert!(document.outline().unwrap().is_empty());
    assert!(document.outline_expr().unwrap().is_none());
    assert!(document.annotations(false).unwrap().is_none());
}
