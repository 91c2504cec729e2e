//! Interception hooks.
//!
//! An interceptor is bound to a proxy together with its target. The dispatch
//! core calls `before_invoke` ahead of every target call and `after_invoke`
//! once the target returns, failed or not. Hooks receive no method identity
//! or arguments.

use std::fmt;

use parking_lot::Mutex;

use crate::error::BoxError;

/// Result of an interceptor hook
pub type HookResult = Result<(), BoxError>;

/// Hooks run around every proxied call.
///
/// Implementations must tolerate concurrent calls: one interceptor may be
/// shared by many proxies and invoked from many threads.
pub trait Interceptor: Send + Sync {
    /// Called before the target method.
    ///
    /// An error aborts the call; neither the target nor `after_invoke` runs.
    fn before_invoke(&self) -> HookResult {
        Ok(())
    }

    /// Called after the target method returned or failed.
    fn after_invoke(&self) -> HookResult {
        Ok(())
    }
}

/// Interceptor whose hooks do nothing
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopInterceptor;

impl Interceptor for NoopInterceptor {}

/// Interceptor that logs each hook at info level
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingInterceptor;

impl Interceptor for TracingInterceptor {
    fn before_invoke(&self) -> HookResult {
        tracing::info!("Before invoking method");
        Ok(())
    }

    fn after_invoke(&self) -> HookResult {
        tracing::info!("After invoking method");
        Ok(())
    }
}

/// A hook call observed by [`RecordingInterceptor`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookEvent {
    /// `before_invoke` ran
    Before,
    /// `after_invoke` ran
    After,
}

#[derive(Debug, thiserror::Error)]
#[error("{0}")]
struct HookRejected(String);

/// Interceptor that records the hooks it sees, optionally failing one of them
#[derive(Default)]
pub struct RecordingInterceptor {
    events: Mutex<Vec<HookEvent>>,
    fail_before: Option<String>,
    fail_after: Option<String>,
}

impl RecordingInterceptor {
    /// Create a recorder whose hooks always succeed
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `before_invoke` fail with `message`
    pub fn fail_before(mut self, message: &str) -> Self {
        self.fail_before = Some(message.to_string());
        self
    }

    /// Make `after_invoke` fail with `message`
    pub fn fail_after(mut self, message: &str) -> Self {
        self.fail_after = Some(message.to_string());
        self
    }

    /// Hook calls seen so far, in order
    pub fn events(&self) -> Vec<HookEvent> {
        self.events.lock().clone()
    }

    /// Count of calls to one hook
    pub fn count(&self, event: HookEvent) -> usize {
        self.events.lock().iter().filter(|e| **e == event).count()
    }

    /// Forget recorded events
    pub fn clear(&self) {
        self.events.lock().clear();
    }

    fn record(&self, event: HookEvent, failure: &Option<String>) -> HookResult {
        self.events.lock().push(event);
        match failure {
            Some(message) => Err(Box::new(HookRejected(message.clone()))),
            None => Ok(()),
        }
    }
}

impl Interceptor for RecordingInterceptor {
    fn before_invoke(&self) -> HookResult {
        self.record(HookEvent::Before, &self.fail_before)
    }

    fn after_invoke(&self) -> HookResult {
        self.record(HookEvent::After, &self.fail_after)
    }
}

impl fmt::Debug for RecordingInterceptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecordingInterceptor")
            .field("events", &self.events.lock().len())
            .field("fail_before", &self.fail_before)
            .field("fail_after", &self.fail_after)
            .finish()
    }
}
