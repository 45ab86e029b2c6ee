//! Configuration for contexts, documents and decode waits.

use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::time::Duration;

/// Settings applied when a context is created.
#[derive(Debug, Clone, Default)]
pub struct ContextOptions {
    /// Program name given to the engine. Defaults to one derived from the
    /// process id.
    pub name: Option<String>,

    /// Decoded-page cache size in bytes. Engine default when `None`.
    pub cache_size: Option<u64>,
}

impl ContextOptions {
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_cache_size(mut self, bytes: u64) -> Self {
        self.cache_size = Some(bytes);
        self
    }

    pub(crate) fn resolved_name(&self) -> String {
        self.name
            .clone()
            .unwrap_or_else(|| format!("djvu-x-{}", std::process::id()))
    }
}

/// How long, and how, a decode wait may block.
///
/// The default blocks on the engine until the job resolves. Setting a
/// timeout or a cancel flag switches to non-blocking pumps with a sleep of
/// `poll_interval` between polls, so the limit can be checked.
#[derive(Debug, Clone)]
pub struct WaitOptions {
    pub timeout: Option<Duration>,
    pub poll_interval: Duration,
    pub cancel: Option<Arc<AtomicBool>>,
}

impl Default for WaitOptions {
    fn default() -> Self {
        WaitOptions {
            timeout: None,
            poll_interval: Duration::from_millis(5),
            cancel: None,
        }
    }
}

impl WaitOptions {
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Cancels the wait once the flag is set, from any thread.
    pub fn with_cancel(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }

    pub fn is_bounded(&self) -> bool {
        self.timeout.is_some() || self.cancel.is_some()
    }
}

/// Settings applied when a document is opened.
#[derive(Debug, Clone)]
pub struct OpenOptions {
    /// Let the engine cache decoded pages.
    pub cache: bool,

    /// Applied to the open itself and to every artifact query on the document.
    pub wait: WaitOptions,
}

impl Default for OpenOptions {
    fn default() -> Self {
        OpenOptions {
            cache: true,
            wait: WaitOptions::default(),
        }
    }
}

impl OpenOptions {
    pub fn with_cache(mut self, cache: bool) -> Self {
        self.cache = cache;
        self
    }

    pub fn with_wait(mut self, wait: WaitOptions) -> Self {
        self.wait = wait;
        self
    }
}
