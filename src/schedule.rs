//! Scripted delays and cancellable background tasks.
//!
//! A [`Script`] is a finite list of `(delay, payload)` steps played in order;
//! a [`ScheduledTask`] owns the spawned task so the whole sequence can be
//! aborted at any suspension point.

use std::future::Future;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::debug;

/// One step: wait `delay` after the previous step, then emit `payload`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptStep<T> {
    pub delay: Duration,
    pub payload: T,
}

/// Finite, ordered sequence of delayed payloads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Script<T> {
    steps: Vec<ScriptStep<T>>,
}

impl<T> Default for Script<T> {
    fn default() -> Self {
        Self { steps: Vec::new() }
    }
}

impl<T> Script<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a step `delay` after the previous one.
    pub fn then(mut self, delay: Duration, payload: T) -> Self {
        self.steps.push(ScriptStep { delay, payload });
        self
    }

    /// First payload immediately, each following one `gap` later.
    pub fn evenly_spaced(gap: Duration, payloads: impl IntoIterator<Item = T>) -> Self {
        let steps = payloads
            .into_iter()
            .enumerate()
            .map(|(i, payload)| ScriptStep {
                delay: if i == 0 { Duration::ZERO } else { gap },
                payload,
            })
            .collect();
        Self { steps }
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Offset of the last step from the start.
    pub fn total_duration(&self) -> Duration {
        self.steps.iter().map(|s| s.delay).sum()
    }

    pub fn steps(&self) -> &[ScriptStep<T>] {
        &self.steps
    }

    /// Sleep through each step and hand its payload to `emit`, in order.
    pub async fn play<F, Fut>(self, mut emit: F)
    where
        F: FnMut(T) -> Fut,
        Fut: Future<Output = ()>,
    {
        for step in self.steps {
            if !step.delay.is_zero() {
                tokio::time::sleep(step.delay).await;
            }
            emit(step.payload).await;
        }
    }
}

/// A spawned background sequence that can be aborted.
#[derive(Debug)]
pub struct ScheduledTask {
    label: &'static str,
    handle: JoinHandle<()>,
}

impl ScheduledTask {
    pub fn spawn<F>(label: &'static str, future: F) -> Self
    where
        F: Future<Output = ()> + Send + 'static,
    {
        debug!(task = label, "Scheduled task started");
        Self {
            label,
            handle: tokio::spawn(future),
        }
    }

    pub fn label(&self) -> &'static str {
        self.label
    }

    /// Abort the task. Steps not yet emitted never run.
    pub fn cancel(&self) {
        if !self.handle.is_finished() {
            debug!(task = self.label, "Scheduled task cancelled");
        }
        self.handle.abort();
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Wait for the task to end, whether it completed or was cancelled.
    pub async fn join(self) {
        if let Err(e) = self.handle.await {
            if e.is_panic() {
                tracing::error!(task = self.label, error = %e, "Scheduled task panicked");
            }
        }
    }
}
