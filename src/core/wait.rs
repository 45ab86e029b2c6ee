//! Blocking waits over the engine's asynchronous decode jobs.
//!
//! The engine decodes incrementally and answers queries for artifacts that
//! do not exist yet with the dummy sentinel. [`DecodeWait`] turns that into a
//! single call with three outcomes: a value, `None` for no data, or an error
//! for a failed or stopped job.
//!
//! Like the progressive loader's retry loop, this retries the same query
//! after each round of loading. Unlike it there is no retry limit: a pump
//! only returns once the engine has made progress.

use std::sync::atomic::Ordering;
use std::time::Instant;

use super::context::Context;
use super::error::{DjvuError, DjvuResult};
use super::expr::Expr;
use super::handle::RawExpr;
use super::options::WaitOptions;
use super::types::JobStatus;

/// Symbol the engine returns for an artifact whose job failed.
pub const FAILED_SYMBOL: &str = "failed";
/// Symbol the engine returns for an artifact whose job was stopped.
pub const STOPPED_SYMBOL: &str = "stopped";

/// A wait on one job of a context.
pub struct DecodeWait<'a> {
    context: &'a Context<'a>,
    job: String,
    options: WaitOptions,
}

impl<'a> DecodeWait<'a> {
    /// A wait that blocks on the engine until the job resolves.
    ///
    /// `job` names the job in errors and logs.
    pub fn new(context: &'a Context<'a>, job: impl Into<String>) -> Self {
        DecodeWait {
            context,
            job: job.into(),
            options: WaitOptions::default(),
        }
    }

    pub fn with_options(mut self, options: WaitOptions) -> Self {
        self.options = options;
        self
    }

    pub fn job(&self) -> &str {
        &self.job
    }

    /// Polls `fetch` until it stops answering the dummy sentinel.
    ///
    /// Each dummy answer is followed by one message pump and another call to
    /// `fetch`. Nil resolves to `Ok(None)`. The `failed` and `stopped` status
    /// symbols become [`DjvuError::DecodeFailed`] and
    /// [`DjvuError::DecodeStopped`].
    pub fn result<F>(&self, mut fetch: F) -> DjvuResult<Option<Expr<'a>>>
    where
        F: FnMut() -> RawExpr,
    {
        let engine = self.context.engine();
        let started = Instant::now();
        self.discard_stale_error();

        let mut polls = 0usize;
        let mut raw = fetch();
        while raw.is_dummy() {
            self.pump(started)?;
            polls += 1;
            raw = fetch();
        }

        tracing::trace!(job = %self.job, polls, "result resolved");

        if raw.is_nil() {
            return Ok(None);
        }

        if is_status_symbol(self.context, raw, FAILED_SYMBOL) {
            return Err(self.failed());
        }

        if is_status_symbol(self.context, raw, STOPPED_SYMBOL) {
            return Err(DjvuError::DecodeStopped {
                job: self.job.clone(),
            });
        }

        Ok(Some(Expr::classified(engine, raw)))
    }

    /// Polls a job status until it reaches a terminal value.
    ///
    /// `Ok` succeeds; `Failed`, `Stopped` and any undocumented status fail.
    pub fn job_status<F>(&self, mut status: F) -> DjvuResult<()>
    where
        F: FnMut() -> JobStatus,
    {
        let started = Instant::now();
        self.discard_stale_error();

        loop {
            match status() {
                JobStatus::Ok => {
                    tracing::trace!(job = %self.job, "job finished");
                    return Ok(());
                }
                JobStatus::Failed => return Err(self.failed()),
                JobStatus::Stopped => {
                    return Err(DjvuError::DecodeStopped {
                        job: self.job.clone(),
                    });
                }
                JobStatus::Unexpected(raw) => {
                    return Err(DjvuError::UnexpectedStatus {
                        job: self.job.clone(),
                        status: raw,
                    });
                }
                JobStatus::NotStarted | JobStatus::Started => self.pump(started)?,
            }
        }
    }

    /// One pump step. Blocking unless the wait is bounded.
    fn pump(&self, started: Instant) -> DjvuResult<()> {
        // A closed context would never deliver another message
        self.context.handle()?;

        if !self.options.is_bounded() {
            self.context.pump(true);
            return Ok(());
        }

        if let Some(flag) = &self.options.cancel {
            if flag.load(Ordering::Acquire) {
                tracing::debug!(job = %self.job, "wait cancelled");
                return Err(DjvuError::Cancelled {
                    job: self.job.clone(),
                });
            }
        }

        if let Some(timeout) = self.options.timeout {
            let waited = started.elapsed();
            if waited >= timeout {
                tracing::debug!(job = %self.job, ?waited, "wait timed out");
                return Err(DjvuError::Timeout {
                    job: self.job.clone(),
                    waited,
                });
            }
        }

        if self.context.pump(false) == 0 {
            std::thread::sleep(self.options.poll_interval);
        }

        Ok(())
    }

    fn failed(&self) -> DjvuError {
        // The engine queues its error message alongside the status change
        self.context.pump(false);
        let reason = self.context.take_last_error();
        tracing::debug!(job = %self.job, reason = reason.as_deref().unwrap_or(""), "decode failed");
        DjvuError::DecodeFailed {
            job: self.job.clone(),
            reason,
        }
    }

    fn discard_stale_error(&self) {
        if let Some(stale) = self.context.take_last_error() {
            tracing::trace!(job = %self.job, "discarding earlier engine error: {}", stale);
        }
    }
}

/// True if `raw` is the interned status symbol `name`.
fn is_status_symbol(context: &Context<'_>, raw: RawExpr, name: &str) -> bool {
    context.engine().intern(name) == Some(raw)
}

/// Blocks until `fetch` resolves. See [`DecodeWait::result`].
pub fn wait_for_result<'a, F>(context: &'a Context<'a>, job: &str, fetch: F) -> DjvuResult<Option<Expr<'a>>>
where
    F: FnMut() -> RawExpr,
{
    DecodeWait::new(context, job).result(fetch)
}

/// Blocks until `status` is terminal. See [`DecodeWait::job_status`].
pub fn wait_for_job<F>(context: &Context<'_>, job: &str, status: F) -> DjvuResult<()>
where
    F: FnMut() -> JobStatus,
{
    DecodeWait::new(context, job).job_status(status)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::engine::Engine;
    use crate::core::memory::MemoryEngine;
    use std::cell::Cell;

    #[test]
    fn test_immediate_value() {
        let engine = MemoryEngine::new();
        let context = Context::new(&engine, "wait").unwrap();
        let value = RawExpr::from_int(9);

        let result = wait_for_result(&context, "value", || value).unwrap();
        assert_eq!(result.unwrap().as_integer().unwrap(), 9);
        assert_eq!(engine.pump_count(), 0);
    }

    #[test]
    fn test_dummy_pumps_then_refetches() {
        let engine = MemoryEngine::new();
        let context = Context::new(&engine, "wait").unwrap();
        let calls = Cell::new(0);

        let result = wait_for_result(&context, "late value", || {
            calls.set(calls.get() + 1);
            if calls.get() < 3 {
                RawExpr::DUMMY
            } else {
                RawExpr::from_int(1)
            }
        })
        .unwrap();

        assert!(result.is_some());
        assert_eq!(calls.get(), 3);
        assert_eq!(engine.pump_count(), 2);
    }

    #[test]
    fn test_nil_is_absent_not_error() {
        let engine = MemoryEngine::new();
        let context = Context::new(&engine, "wait").unwrap();
        let result = wait_for_result(&context, "nothing", || RawExpr::NIL).unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn test_status_symbols_fail() {
        let engine = MemoryEngine::new();
        let context = Context::new(&engine, "wait").unwrap();
        let failed = engine.intern("failed").unwrap();
        let stopped = engine.intern("stopped").unwrap();

        match wait_for_result(&context, "annotations", || failed) {
            Err(DjvuError::DecodeFailed { job, .. }) => assert_eq!(job, "annotations"),
            other => panic!("Expected DecodeFailed, got {:?}", other),
        }
        assert!(matches!(
            wait_for_result(&context, "annotations", || stopped),
            Err(DjvuError::DecodeStopped { .. })
        ));
    }

    #[test]
    fn test_other_symbols_are_values() {
        let engine = MemoryEngine::new();
        let context = Context::new(&engine, "wait").unwrap();
        let page = engine.intern("page").unwrap();
        let result = wait_for_result(&context, "symbol", || page).unwrap().unwrap();
        assert_eq!(result.symbol_name().unwrap(), "page");
    }

    #[test]
    fn test_job_status_outcomes() {
        let engine = MemoryEngine::new();
        let context = Context::new(&engine, "wait").unwrap();

        let steps = Cell::new(0);
        wait_for_job(&context, "document", || {
            steps.set(steps.get() + 1);
            if steps.get() < 4 {
                JobStatus::Started
            } else {
                JobStatus::Ok
            }
        })
        .unwrap();
        assert_eq!(engine.pump_count(), 3);

        assert!(matches!(
            wait_for_job(&context, "document", || JobStatus::Stopped),
            Err(DjvuError::DecodeStopped { .. })
        ));
        assert!(matches!(
            wait_for_job(&context, "document", || JobStatus::Unexpected(9)),
            Err(DjvuError::UnexpectedStatus { status: 9, .. })
        ));
    }

    #[test]
    fn test_timeout_bounds_the_wait() {
        let engine = MemoryEngine::new();
        let context = Context::new(&engine, "wait").unwrap();
        let options = WaitOptions::default()
            .with_timeout(std::time::Duration::from_millis(20))
            .with_poll_interval(std::time::Duration::from_millis(1));

        let result = DecodeWait::new(&context, "never")
            .with_options(options)
            .result(|| RawExpr::DUMMY);

        assert!(matches!(result, Err(DjvuError::Timeout { .. })));
        // Bounded waits never block inside the engine
        assert_eq!(engine.pump_count(), 0);
    }

    #[test]
    fn test_cancel_flag_stops_the_wait() {
        use std::sync::Arc;
        use std::sync::atomic::AtomicBool;

        let engine = MemoryEngine::new();
        let context = Context::new(&engine, "wait").unwrap();
        let flag = Arc::new(AtomicBool::new(false));
        let options = WaitOptions::default().with_cancel(flag.clone());

        let polls = Cell::new(0);
        let result = DecodeWait::new(&context, "cancelled")
            .with_options(options)
            .result(|| {
                polls.set(polls.get() + 1);
                if polls.get() == 3 {
                    flag.store(true, Ordering::Release);
                }
                RawExpr::DUMMY
            });

        assert!(matches!(result, Err(DjvuError::Cancelled { .. })));
        assert_eq!(polls.get(), 3);
    }
}
