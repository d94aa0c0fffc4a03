//! Progress callback registry.

use std::collections::HashMap;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use ridgeline_core::download::{JobId, ProgressEvent};
use ridgeline_core::ports::{ProgressCallback, Subscription};
use tracing::warn;

type Entries = HashMap<JobId, Vec<(u64, ProgressCallback)>>;

/// Callbacks keyed by job id.
///
/// Subscriptions are independent of the job record, so a caller may
/// subscribe before `start` and keep its subscription across pause and
/// resume. Cancelling a job drops its subscribers.
#[derive(Default)]
pub(super) struct Subscribers {
    next_id: AtomicU64,
    entries: Mutex<Entries>,
}

impl Subscribers {
    fn entries(&self) -> MutexGuard<'_, Entries> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(super) fn subscribe(self: &Arc<Self>, job_id: &JobId, callback: ProgressCallback) -> Subscription {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.entries()
            .entry(job_id.clone())
            .or_default()
            .push((id, callback));

        let registry = Arc::downgrade(self);
        let job_id = job_id.clone();
        Subscription::new(move || {
            if let Some(registry) = registry.upgrade() {
                registry.unsubscribe(&job_id, id);
            }
        })
    }

    fn unsubscribe(&self, job_id: &JobId, id: u64) {
        let mut entries = self.entries();
        if let Some(callbacks) = entries.get_mut(job_id) {
            callbacks.retain(|(existing, _)| *existing != id);
            if callbacks.is_empty() {
                entries.remove(job_id);
            }
        }
    }

    pub(super) fn clear(&self, job_id: &JobId) {
        self.entries().remove(job_id);
    }

    /// Invoke every callback of the event's job, in registration order.
    ///
    /// The registry lock is released before callbacks run. A panicking
    /// callback is logged and skipped.
    pub(super) fn notify(&self, event: &ProgressEvent) {
        let callbacks: Vec<ProgressCallback> = self
            .entries()
            .get(&event.job_id)
            .map(|list| list.iter().map(|(_, cb)| Arc::clone(cb)).collect())
            .unwrap_or_default();

        for callback in callbacks {
            if catch_unwind(AssertUnwindSafe(|| callback(event))).is_err() {
                warn!(
                    target: "ridgeline.download",
                    job_id = %event.job_id,
                    phase = %event.phase,
                    "Progress callback panicked"
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ridgeline_core::download::{JobStatus, Phase};
    use std::sync::atomic::AtomicUsize;

    fn event(job: &str) -> ProgressEvent {
        ProgressEvent {
            job_id: JobId::new(job),
            phase: Phase::Tiles,
            status: JobStatus::Running,
            downloaded_bytes: None,
            total_bytes: None,
            percent: None,
            message: None,
        }
    }

    fn counter() -> (Arc<AtomicUsize>, ProgressCallback) {
        let count = Arc::new(AtomicUsize::new(0));
        let inner = Arc::clone(&count);
        (
            count,
            Arc::new(move |_: &ProgressEvent| {
                inner.fetch_add(1, Ordering::SeqCst);
            }),
        )
    }

    #[test]
    fn events_reach_only_their_job() {
        let subs = Arc::new(Subscribers::default());
        let (a, cb_a) = counter();
        let (b, cb_b) = counter();
        let _sub_a = subs.subscribe(&JobId::new("a"), cb_a);
        let _sub_b = subs.subscribe(&JobId::new("b"), cb_b);

        subs.notify(&event("a"));
        subs.notify(&event("a"));

        assert_eq!(a.load(Ordering::SeqCst), 2);
        assert_eq!(b.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn unsubscribe_stops_delivery() {
        let subs = Arc::new(Subscribers::default());
        let (count, cb) = counter();
        let sub = subs.subscribe(&JobId::new("a"), cb);

        subs.notify(&event("a"));
        sub.unsubscribe();
        subs.notify(&event("a"));

        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    fn panicking(_: &ProgressEvent) {
        panic!("subscriber bug");
    }

    #[test]
    fn panicking_callback_does_not_starve_others() {
        let subs = Arc::new(Subscribers::default());
        let _bad = subs.subscribe(&JobId::new("a"), Arc::new(panicking));
        let (count, cb) = counter();
        let _good = subs.subscribe(&JobId::new("a"), cb);

        subs.notify(&event("a"));
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }
}
