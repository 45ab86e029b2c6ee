//! Engine notifications and the message pump.
//!
//! The engine advances decode jobs while its messages are being processed,
//! so every wait in this crate is built on [`pump`].

use super::context::Context;
use super::types::JobStatus;

/// A message copied out of the engine queue.
///
/// All text is owned; nothing here points into engine memory.
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    /// The engine hit an error while decoding
    Error {
        message: String,
        function: Option<String>,
        filename: Option<String>,
        line: i32,
    },

    /// Informational text
    Info(String),

    /// The engine requests data for a stream it cannot read itself
    NewStream {
        stream_id: i32,
        name: Option<String>,
        url: Option<String>,
    },

    /// Basic document information is available
    DocInfo,

    /// Basic page information is available
    PageInfo,

    /// The page layout changed
    Relayout,

    /// The page should be redrawn
    Redisplay,

    /// A chunk of data was decoded
    Chunk(String),

    /// A thumbnail became available
    Thumbnail { page: i32 },

    /// Decoding progress of a job
    Progress { status: JobStatus, percent: i32 },
}

impl Message {
    pub fn is_error(&self) -> bool {
        matches!(self, Message::Error { .. })
    }
}

/// Processes pending messages on a context.
///
/// With `blocking` set this first waits until the engine has posted at least
/// one message, which can take an unbounded amount of time. Every queued
/// message is then drained. Error messages are logged and remembered on the
/// context so a following decode failure can report them.
///
/// Returns the number of messages processed.
pub fn pump(context: &Context<'_>, blocking: bool) -> usize {
    let Ok(handle) = context.handle() else {
        return 0;
    };
    let engine = context.engine();

    if blocking {
        engine.wait_message(handle);
    }

    let mut processed = 0;
    while let Some(message) = engine.pop_message(handle) {
        processed += 1;
        match &message {
            Message::Error {
                message,
                filename,
                line,
                ..
            } => {
                tracing::warn!(
                    context = %context.name(),
                    file = filename.as_deref().unwrap_or(""),
                    line,
                    "engine error: {}",
                    message
                );
                context.record_error(message.clone());
            }
            Message::Info(text) => {
                tracing::debug!(context = %context.name(), "engine info: {}", text);
            }
            Message::Progress { status, percent } => {
                tracing::trace!(context = %context.name(), ?status, percent, "decode progress");
            }
            other => {
                tracing::trace!(context = %context.name(), message = ?other, "engine message");
            }
        }
    }

    processed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::memory::MemoryEngine;

    #[test]
    fn test_pump_drains_queue_and_records_errors() {
        let engine = MemoryEngine::new();
        let context = Context::new(&engine, "pump-test").unwrap();
        let handle = context.handle().unwrap();

        engine.post_message(handle, Message::Info("starting".to_string()));
        engine.post_message(
            handle,
            Message::Error {
                message: "bad chunk".to_string(),
                function: None,
                filename: Some("DjVuFile.cpp".to_string()),
                line: 42,
            },
        );

        assert_eq!(pump(&context, false), 2);
        assert_eq!(pump(&context, false), 0);
        assert_eq!(context.take_last_error().as_deref(), Some("bad chunk"));
        assert_eq!(context.take_last_error(), None);
    }

    #[test]
    fn test_blocking_pump_waits_for_a_message() {
        let engine = MemoryEngine::new();
        let context = Context::new(&engine, "pump-test").unwrap();

        // The memory engine posts a heartbeat when asked to wait on an idle queue
        assert!(pump(&context, true) >= 1);
        assert_eq!(engine.pump_count(), 1);
    }
}
