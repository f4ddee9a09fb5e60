//! Scoped enrichment.
//!
//! Tags pushed with [`push`] apply to every write issued on the current thread
//! until the returned [`ScopeGuard`] is dropped. Scopes nest: the merged view
//! returned by [`current`] lets inner frames shadow outer ones on name
//! collisions. For async code, [`FutureExt::with_log_scope`] activates a frame
//! only while the wrapped future is being polled, so tags follow the task
//! rather than the worker thread it happens to run on.
//!
//! # Example
//!
//! ```
//! use structured_log_facade::core::{scope, LogContext};
//!
//! {
//!     let _outer = scope::push(LogContext::new().with_field("RequestId", "r-1"));
//!     let _inner = scope::push(LogContext::new().with_field("Step", "charge"));
//!     assert_eq!(scope::current().len(), 2);
//! }
//! assert!(scope::current().is_empty());
//! ```

use super::log_context::{FieldValue, LogContext};
use std::cell::RefCell;
use std::future::Future;
use std::marker::PhantomData;
use std::pin::Pin;
use std::task::{Context, Poll};

thread_local! {
    static SCOPE_STACK: RefCell<Vec<LogContext>> = const { RefCell::new(Vec::new()) };
}

/// Removes its frame (and anything pushed after it) when dropped.
///
/// The guard is tied to the thread that created it.
#[must_use = "the scope ends as soon as the guard is dropped"]
pub struct ScopeGuard {
    depth: usize,
    _not_send: PhantomData<*const ()>,
}

impl Drop for ScopeGuard {
    fn drop(&mut self) {
        // try_with: the thread-local may already be gone during thread teardown
        let _ = SCOPE_STACK.try_with(|stack| {
            if let Ok(mut stack) = stack.try_borrow_mut() {
                stack.truncate(self.depth);
            }
        });
    }
}

/// Push a frame of tags onto the current thread's scope stack.
pub fn push(frame: LogContext) -> ScopeGuard {
    let depth = SCOPE_STACK.with(|stack| {
        let mut stack = stack.borrow_mut();
        let depth = stack.len();
        stack.push(frame);
        depth
    });
    ScopeGuard {
        depth,
        _not_send: PhantomData,
    }
}

/// Push a single tag.
pub fn push_property(name: impl Into<String>, value: impl Into<FieldValue>) -> ScopeGuard {
    push(LogContext::new().with_field(name, value))
}

/// Run `f` with `frame` active.
pub fn with_scope<R>(frame: LogContext, f: impl FnOnce() -> R) -> R {
    let _guard = push(frame);
    f()
}

/// Snapshot of all active frames, inner frames shadowing outer ones.
pub fn current() -> LogContext {
    SCOPE_STACK.with(|stack| {
        let stack = stack.borrow();
        let mut merged = LogContext::new();
        for frame in stack.iter() {
            merged.overlay(frame);
        }
        merged
    })
}

/// Number of frames currently pushed on this thread.
pub fn depth() -> usize {
    SCOPE_STACK.with(|stack| stack.borrow().len())
}

/// Attach scoped tags to a future.
pub trait FutureExt: Future {
    /// Run this future with `frame` active during every poll.
    ///
    /// Tags active on the calling thread when this is called are captured as
    /// well, so a future built inside a scope keeps that scope's tags after it
    /// is moved to another task or thread.
    fn with_log_scope(self, frame: LogContext) -> LogScopeFuture<Self>
    where
        Self: Sized,
    {
        let mut captured = current();
        captured.overlay(&frame);
        LogScopeFuture {
            inner: self,
            frame: captured,
        }
    }
}

impl<F: Future> FutureExt for F {}

#[pin_project::pin_project]
pub struct LogScopeFuture<F> {
    #[pin]
    inner: F,
    frame: LogContext,
}

impl<F: Future> Future for LogScopeFuture<F> {
    type Output = F::Output;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.project();
        let _guard = push(this.frame.clone());
        this.inner.poll(cx)
    }
}
