use std::cell::RefCell;

use super::engine::Engine;
use super::error::{DjvuError, DjvuResult};
use super::handle::ContextHandle;
use super::message;
use super::options::ContextOptions;

/// An engine context: the unit of isolation for documents and their
/// message queue.
///
/// Documents borrow the context they were opened in, so the borrow checker
/// keeps the release order (pages, documents, then the context). The native
/// context is released exactly once, on [`Context::close`] or on drop.
pub struct Context<'e> {
    engine: &'e dyn Engine,
    handle: Option<ContextHandle>,
    name: String,
    last_error: RefCell<Option<String>>,
}

impl<'e> Context<'e> {
    /// Creates a context with the given program name.
    pub fn new(engine: &'e dyn Engine, name: &str) -> DjvuResult<Self> {
        Self::with_options(engine, &ContextOptions::default().with_name(name))
    }

    pub fn with_options(engine: &'e dyn Engine, options: &ContextOptions) -> DjvuResult<Self> {
        let name = options.resolved_name();
        let handle = engine
            .create_context(&name)
            .ok_or_else(|| DjvuError::InvalidHandle(format!("failed to create context {}", name)))?;

        if let Some(bytes) = options.cache_size {
            engine.set_cache_size(handle, bytes);
        }

        tracing::debug!(context = %name, "context created");

        Ok(Context {
            engine,
            handle: Some(handle),
            name,
            last_error: RefCell::new(None),
        })
    }

    pub fn engine(&self) -> &'e dyn Engine {
        self.engine
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The live handle, or `InvalidHandle` once closed.
    pub fn handle(&self) -> DjvuResult<ContextHandle> {
        self.handle
            .ok_or_else(|| DjvuError::InvalidHandle(format!("context {} is closed", self.name)))
    }

    pub fn is_open(&self) -> bool {
        self.handle.is_some()
    }

    /// Processes pending engine messages. See [`message::pump`].
    pub fn pump(&self, blocking: bool) -> usize {
        message::pump(self, blocking)
    }

    pub(crate) fn record_error(&self, message: String) {
        *self.last_error.borrow_mut() = Some(message);
    }

    /// The most recent engine error message, cleared on read.
    pub fn take_last_error(&self) -> Option<String> {
        self.last_error.borrow_mut().take()
    }

    /// Releases the context. Safe to call more than once.
    pub fn close(&mut self) {
        if let Some(handle) = self.handle.take() {
            self.engine.release_context(handle);
            tracing::debug!(context = %self.name, "context released");
        }
    }
}

impl Drop for Context<'_> {
    fn drop(&mut self) {
        self.close();
    }
}

impl std::fmt::Debug for Context<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("name", &self.name)
            .field("handle", &self.handle)
            .finish()
    }
}
