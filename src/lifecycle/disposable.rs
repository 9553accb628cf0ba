//! Disposable lifecycle tracking.
//!
//! A [`DisposableBase`] owns the timers, interval loops, event subscriptions
//! and child resources registered through it, and tears all of them down in
//! one idempotent [`dispose`](DisposableBase::dispose) call.

use std::future::Future;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, warn};

use crate::error::{CacheError, Result};
use crate::lifecycle::events::{EventHandler, EventSource, ListenerId};

/// Identifies a timeout or interval registered on a [`DisposableBase`].
pub type TimerId = u64;

// == Disposable Trait ==
/// A component with an explicit, idempotent teardown.
pub trait Disposable: Send + Sync {
    /// Releases everything the component owns. Calling it again is a no-op.
    fn dispose(&self) -> Result<()>;

    fn is_disposed(&self) -> bool;
}

struct Subscription {
    subject: Arc<dyn EventSource>,
    event: String,
    id: ListenerId,
}

#[derive(Default)]
struct Tracked {
    disposed: bool,
    next_timer: TimerId,
    timers: Vec<(TimerId, JoinHandle<()>)>,
    intervals: Vec<(TimerId, JoinHandle<()>)>,
    listeners: Vec<Subscription>,
    children: Vec<Arc<dyn Disposable>>,
}

impl Tracked {
    fn next_id(&mut self) -> TimerId {
        self.next_timer += 1;
        self.next_timer
    }
}

/// Number of live resources a [`DisposableBase`] is tracking.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TrackedCounts {
    /// Pending timeouts (fired ones are not counted)
    pub timers: usize,
    pub intervals: usize,
    pub listeners: usize,
    pub children: usize,
}

// == Disposable Base ==
/// Ownership tracker for background work and nested resources.
///
/// Registration fails with [`CacheError::Disposed`] once disposed. Dropping
/// a base that was never disposed disposes it.
pub struct DisposableBase {
    name: String,
    state: Mutex<Tracked>,
}

impl DisposableBase {
    /// Creates a tracker; `name` only appears in logs.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            state: Mutex::new(Tracked::default()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_disposed(&self) -> bool {
        self.state.lock().disposed
    }

    /// Fails with [`CacheError::Disposed`] once disposed.
    pub fn assert_not_disposed(&self) -> Result<()> {
        if self.is_disposed() {
            Err(CacheError::Disposed)
        } else {
            Ok(())
        }
    }

    // == Timers ==
    /// Runs `task` once after `delay` on the current tokio runtime.
    pub fn set_timeout<F, Fut>(&self, delay: Duration, task: F) -> Result<TimerId>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let mut state = self.state.lock();
        if state.disposed {
            return Err(CacheError::Disposed);
        }
        let runtime = Handle::try_current().map_err(|_| CacheError::NoRuntime)?;

        let handle = runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            task().await;
        });

        state.timers.retain(|(_, timer)| !timer.is_finished());
        let id = state.next_id();
        state.timers.push((id, handle));
        Ok(id)
    }

    /// Runs `task` every `period`, first run one period from now.
    ///
    /// A tick is delayed, not doubled up, when a run overruns the period.
    pub fn set_interval<F, Fut>(&self, period: Duration, mut task: F) -> Result<TimerId>
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        if period.is_zero() {
            return Err(CacheError::InvalidArgument(
                "interval period must be greater than zero".to_string(),
            ));
        }

        let mut state = self.state.lock();
        if state.disposed {
            return Err(CacheError::Disposed);
        }
        let runtime = Handle::try_current().map_err(|_| CacheError::NoRuntime)?;

        let handle = runtime.spawn(async move {
            let start = tokio::time::Instant::now() + period;
            let mut ticker = tokio::time::interval_at(start, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                task().await;
            }
        });

        let id = state.next_id();
        state.intervals.push((id, handle));
        Ok(id)
    }

    /// Cancels a pending timeout. Returns whether it was tracked.
    pub fn clear_timeout(&self, id: TimerId) -> bool {
        let mut state = self.state.lock();
        cancel(&mut state.timers, id)
    }

    /// Stops an interval. Returns whether it was tracked.
    pub fn clear_interval(&self, id: TimerId) -> bool {
        let mut state = self.state.lock();
        cancel(&mut state.intervals, id)
    }

    // == Event Listeners ==
    /// Subscribes `handler` to `event` on `subject`; disposal unsubscribes it.
    pub fn add_event_listener(
        &self,
        subject: Arc<dyn EventSource>,
        event: &str,
        handler: EventHandler,
    ) -> Result<ListenerId> {
        let mut state = self.state.lock();
        if state.disposed {
            return Err(CacheError::Disposed);
        }

        let id = subject.add_listener(event, handler);
        state.listeners.push(Subscription {
            subject,
            event: event.to_string(),
            id,
        });
        Ok(id)
    }

    // == Children ==
    /// Registers a nested resource disposed along with this one.
    pub fn add_disposable(&self, child: Arc<dyn Disposable>) -> Result<()> {
        let mut state = self.state.lock();
        if state.disposed {
            return Err(CacheError::Disposed);
        }
        state.children.push(child);
        Ok(())
    }

    pub fn tracked_counts(&self) -> TrackedCounts {
        let state = self.state.lock();
        TrackedCounts {
            timers: state.timers.iter().filter(|(_, t)| !t.is_finished()).count(),
            intervals: state.intervals.len(),
            listeners: state.listeners.len(),
            children: state.children.len(),
        }
    }

    // == Dispose ==
    /// Tears down everything tracked, in registration order.
    ///
    /// Timers and intervals are aborted, listeners removed from their
    /// subjects, then children disposed. A failing (or panicking) child does
    /// not stop the others; failures are returned together as
    /// [`CacheError::DisposeFailed`]. Calls after the first return `Ok(())`.
    pub fn dispose(&self) -> Result<()> {
        // Claim disposal under the lock so concurrent registrations fail
        // instead of slipping in behind the teardown.
        let (timers, intervals, listeners, children) = {
            let mut state = self.state.lock();
            if state.disposed {
                return Ok(());
            }
            state.disposed = true;
            (
                std::mem::take(&mut state.timers),
                std::mem::take(&mut state.intervals),
                std::mem::take(&mut state.listeners),
                std::mem::take(&mut state.children),
            )
        };

        for (_, handle) in timers.iter().chain(intervals.iter()) {
            handle.abort();
        }

        for sub in &listeners {
            if !sub.subject.remove_listener(&sub.event, sub.id) {
                debug!(owner = %self.name, event = %sub.event, "listener already removed");
            }
        }

        let mut failures = Vec::new();
        for (index, child) in children.iter().enumerate() {
            match catch_unwind(AssertUnwindSafe(|| child.dispose())) {
                Ok(Ok(())) => {}
                Ok(Err(err)) => failures.push(format!("child {}: {}", index, err)),
                Err(_) => failures.push(format!("child {}: panicked during dispose", index)),
            }
        }

        debug!(
            owner = %self.name,
            timers = timers.len(),
            intervals = intervals.len(),
            listeners = listeners.len(),
            children = children.len(),
            "disposed"
        );

        if failures.is_empty() {
            Ok(())
        } else {
            warn!(owner = %self.name, failures = failures.len(), "disposal completed with failures");
            Err(CacheError::DisposeFailed(failures))
        }
    }
}

fn cancel(handles: &mut Vec<(TimerId, JoinHandle<()>)>, id: TimerId) -> bool {
    match handles.iter().position(|(tracked, _)| *tracked == id) {
        Some(pos) => {
            handles.remove(pos).1.abort();
            true
        }
        None => false,
    }
}

impl Disposable for DisposableBase {
    fn dispose(&self) -> Result<()> {
        DisposableBase::dispose(self)
    }

    fn is_disposed(&self) -> bool {
        DisposableBase::is_disposed(self)
    }
}

impl Drop for DisposableBase {
    fn drop(&mut self) {
        if let Err(err) = DisposableBase::dispose(self) {
            warn!(owner = %self.name, error = %err, "dispose on drop failed");
        }
    }
}

impl std::fmt::Debug for DisposableBase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DisposableBase")
            .field("name", &self.name)
            .field("disposed", &self.is_disposed())
            .field("tracked", &self.tracked_counts())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lifecycle::EventEmitter;
    use serde_json::Value;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    struct Child {
        name: &'static str,
        log: Arc<Mutex<Vec<&'static str>>>,
        fail: bool,
        disposed: AtomicBool,
    }

    impl Child {
        fn new(name: &'static str, log: &Arc<Mutex<Vec<&'static str>>>, fail: bool) -> Arc<Self> {
            Arc::new(Self {
                name,
                log: log.clone(),
                fail,
                disposed: AtomicBool::new(false),
            })
        }
    }

    impl Disposable for Child {
        fn dispose(&self) -> Result<()> {
            self.log.lock().push(self.name);
            self.disposed.store(true, Ordering::SeqCst);
            if self.fail {
                Err(CacheError::InvalidArgument(format!("{} refused", self.name)))
            } else {
                Ok(())
            }
        }

        fn is_disposed(&self) -> bool {
            self.disposed.load(Ordering::SeqCst)
        }
    }

    struct PanickingChild;

    impl Disposable for PanickingChild {
        fn dispose(&self) -> Result<()> {
            panic!("child blew up");
        }

        fn is_disposed(&self) -> bool {
            false
        }
    }

    fn counting_handler() -> (EventHandler, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let seen = calls.clone();
        (
            Arc::new(move |_: &Value| {
                seen.fetch_add(1, Ordering::SeqCst);
            }),
            calls,
        )
    }

    #[tokio::test]
    async fn test_timeout_fires() {
        let base = DisposableBase::new("test");
        let fired = Arc::new(AtomicBool::new(false));
        let flag = fired.clone();

        base.set_timeout(Duration::from_millis(20), move || async move {
            flag.store(true, Ordering::SeqCst);
        })
        .unwrap();

        tokio::time::sleep(Duration::from_millis(80)).await;
        assert!(fired.load(Ordering::SeqCst));
        assert_eq!(base.tracked_counts().timers, 0);
    }

    #[tokio::test]
    async fn test_dispose_cancels_pending_timeout() {
        let base = DisposableBase::new("test");
        let fired = Arc::new(AtomicBool::new(false));
        let flag = fired.clone();

        base.set_timeout(Duration::from_millis(50), move || async move {
            flag.store(true, Ordering::SeqCst);
        })
        .unwrap();
        base.dispose().unwrap();

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(!fired.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_interval_runs_until_disposed() {
        let base = DisposableBase::new("test");
        let ticks = Arc::new(AtomicUsize::new(0));
        let counter = ticks.clone();

        base.set_interval(Duration::from_millis(20), move || {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
            }
        })
        .unwrap();

        tokio::time::sleep(Duration::from_millis(110)).await;
        base.dispose().unwrap();
        let after_dispose = ticks.load(Ordering::SeqCst);
        assert!(after_dispose >= 2, "expected several ticks, got {}", after_dispose);

        tokio::time::sleep(Duration::from_millis(80)).await;
        assert_eq!(ticks.load(Ordering::SeqCst), after_dispose);
    }

    #[tokio::test]
    async fn test_clear_interval() {
        let base = DisposableBase::new("test");
        let id = base
            .set_interval(Duration::from_secs(60), || async {})
            .unwrap();

        assert_eq!(base.tracked_counts().intervals, 1);
        assert!(base.clear_interval(id));
        assert!(!base.clear_interval(id));
        assert_eq!(base.tracked_counts().intervals, 0);
    }

    #[tokio::test]
    async fn test_clear_timeout() {
        let base = DisposableBase::new("test");
        let id = base
            .set_timeout(Duration::from_secs(60), || async {})
            .unwrap();

        assert!(base.clear_timeout(id));
        assert_eq!(base.tracked_counts().timers, 0);
    }

    #[tokio::test]
    async fn test_zero_interval_rejected() {
        let base = DisposableBase::new("test");
        let result = base.set_interval(Duration::ZERO, || async {});
        assert!(matches!(result, Err(CacheError::InvalidArgument(_))));
    }

    #[test]
    fn test_timers_need_runtime() {
        let base = DisposableBase::new("test");
        assert_eq!(
            base.set_timeout(Duration::from_millis(1), || async {}),
            Err(CacheError::NoRuntime)
        );
    }

    #[test]
    fn test_dispose_removes_listeners() {
        let base = DisposableBase::new("test");
        let emitter = Arc::new(EventEmitter::new());
        let (handler, calls) = counting_handler();

        base.add_event_listener(emitter.clone(), "invalidate", handler)
            .unwrap();
        emitter.emit("invalidate", &Value::Null);
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        base.dispose().unwrap();

        assert_eq!(emitter.listener_count("invalidate"), 0);
        emitter.emit("invalidate", &Value::Null);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_children_disposed_in_order_despite_failure() {
        let base = DisposableBase::new("test");
        let log = Arc::new(Mutex::new(Vec::new()));
        let first = Child::new("first", &log, false);
        let second = Child::new("second", &log, true);
        let third = Child::new("third", &log, false);

        base.add_disposable(first.clone()).unwrap();
        base.add_disposable(second.clone()).unwrap();
        base.add_disposable(third.clone()).unwrap();

        let result = base.dispose();

        assert_eq!(*log.lock(), vec!["first", "second", "third"]);
        assert!(third.is_disposed());
        match result {
            Err(CacheError::DisposeFailed(failures)) => {
                assert_eq!(failures.len(), 1);
                assert!(failures[0].contains("second refused"));
            }
            other => panic!("expected DisposeFailed, got {:?}", other),
        }
        assert!(base.is_disposed());
        assert_eq!(base.tracked_counts(), TrackedCounts::default());
    }

    #[test]
    fn test_panicking_child_is_recorded() {
        let base = DisposableBase::new("test");
        let log = Arc::new(Mutex::new(Vec::new()));
        let after = Child::new("after", &log, false);

        base.add_disposable(Arc::new(PanickingChild)).unwrap();
        base.add_disposable(after.clone()).unwrap();

        let result = base.dispose();

        assert!(matches!(result, Err(CacheError::DisposeFailed(ref f)) if f.len() == 1));
        assert!(after.is_disposed());
    }

    #[tokio::test]
    async fn test_dispose_is_idempotent_and_blocks_registration() {
        let base = DisposableBase::new("test");
        let log = Arc::new(Mutex::new(Vec::new()));
        let child = Child::new("child", &log, false);
        base.add_disposable(child).unwrap();

        base.dispose().unwrap();
        base.dispose().unwrap();

        assert_eq!(log.lock().len(), 1, "children disposed once");
        assert_eq!(base.assert_not_disposed(), Err(CacheError::Disposed));
        assert_eq!(
            base.set_timeout(Duration::from_millis(1), || async {}),
            Err(CacheError::Disposed)
        );
        assert_eq!(
            base.set_interval(Duration::from_millis(1), || async {}),
            Err(CacheError::Disposed)
        );
        let (handler, _) = counting_handler();
        assert_eq!(
            base.add_event_listener(Arc::new(EventEmitter::new()), "x", handler),
            Err(CacheError::Disposed)
        );
        assert_eq!(
            base.add_disposable(Child::new("late", &log, false)),
            Err(CacheError::Disposed)
        );
        assert_eq!(base.assert_not_disposed().unwrap_err().to_string(), "Object has been disposed");
    }

    #[test]
    fn test_drop_disposes_children() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let child = Child::new("child", &log, false);
        {
            let base = DisposableBase::new("test");
            base.add_disposable(child.clone()).unwrap();
        }
        assert!(child.is_disposed());
    }

    #[test]
    fn test_nested_base_as_child() {
        let outer = DisposableBase::new("outer");
        let inner = Arc::new(DisposableBase::new("inner"));
        outer.add_disposable(inner.clone()).unwrap();

        outer.dispose().unwrap();

        assert!(Disposable::is_disposed(inner.as_ref()));
    }
}
