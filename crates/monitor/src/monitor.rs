//! The process-wide usage monitor.
//!
//! [`UsageMonitor`] sits in the invocation chain and keeps a live registry of
//! what every thread is executing. Registration before a call is best-effort:
//! any failure there is logged at `debug` and the call proceeds untracked.
//! Bookkeeping after a call runs from a drop guard, so it happens on normal
//! return, on error, and while a panic unwinds.
//!
//! Each `start()` and `stop()` opens a new activation with its own counters.
//! A call holds the activation it registered under, so it never pops frames
//! from, or counts into, a later one.

use crate::frame::Frame;
use crate::invocation::Invocation;
use crate::report::UsageReport;
use crate::thread::ThreadIdentity;
use arc_swap::ArcSwap;
use chrono::{DateTime, TimeZone, Utc};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use tracing::{debug, info, warn};
use tundra_domain::elapsed_between;
use tundra_ports::{
    InvokeProcessor, InvokeStateProvider, Next, PipelineRenderer, ServiceCall, SnapshotCodable,
};

const STOPPED: i64 = 0;

/// Counters for one `start()`..`stop()` span.
#[derive(Debug, Default)]
struct Activation {
    epoch: u64,
    invocations: AtomicU64,
    errors: AtomicU64,
}

impl Activation {
    const fn new(epoch: u64) -> Self {
        Self {
            epoch,
            invocations: AtomicU64::new(0),
            errors: AtomicU64::new(0),
        }
    }
}

/// Live registry of in-flight service calls, keyed by thread.
///
/// Installing the monitor in a [`ProcessorChain`](crate::ProcessorChain) and
/// activating it are separate steps. An installed monitor that is stopped
/// passes every call through untouched; `start()` and `stop()` only switch
/// the bookkeeping on and off.
pub struct UsageMonitor {
    state_provider: Arc<dyn InvokeStateProvider>,
    renderer: Arc<dyn PipelineRenderer>,
    registry: DashMap<u64, Arc<Invocation>>,
    started_at_millis: AtomicI64,
    activation: ArcSwap<Activation>,
    lifecycle: Mutex<()>,
}

impl UsageMonitor {
    /// Build a stopped monitor.
    #[must_use]
    pub fn new(
        state_provider: Arc<dyn InvokeStateProvider>,
        renderer: Arc<dyn PipelineRenderer>,
    ) -> Self {
        Self {
            state_provider,
            renderer,
            registry: DashMap::new(),
            started_at_millis: AtomicI64::new(STOPPED),
            activation: ArcSwap::from_pointee(Activation::default()),
            lifecycle: Mutex::new(()),
        }
    }

    /// Start tracking calls. Returns false if already started.
    ///
    /// Counters and the registry are reset, so every activation begins from
    /// zero.
    pub fn start(&self) -> bool {
        let _lifecycle = self.lifecycle.lock();
        if self.is_started() {
            return false;
        }

        let epoch = self.renew();
        let now = Utc::now().timestamp_millis().max(1);
        self.started_at_millis.store(now, Ordering::Release);

        info!(epoch, "usage monitor started");
        true
    }

    /// Stop tracking calls and drop all state. Returns false if already stopped.
    pub fn stop(&self) -> bool {
        let _lifecycle = self.lifecycle.lock();
        if !self.is_started() {
            return false;
        }

        self.started_at_millis.store(STOPPED, Ordering::Release);
        let dropped = self.registry.len();
        let epoch = self.renew();

        info!(epoch, dropped_invocations = dropped, "usage monitor stopped");
        true
    }

    /// Swap in fresh counters and drop the registry. Caller holds `lifecycle`.
    fn renew(&self) -> u64 {
        let epoch = self.activation.load().epoch + 1;
        self.activation.store(Arc::new(Activation::new(epoch)));
        self.registry.clear();
        epoch
    }

    /// True while calls are being tracked.
    #[must_use]
    pub fn is_started(&self) -> bool {
        self.started_at_millis.load(Ordering::Acquire) != STOPPED
    }

    /// When the current activation began.
    #[must_use]
    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        match self.started_at_millis.load(Ordering::Acquire) {
            STOPPED => None,
            millis => Utc.timestamp_millis_opt(millis).single(),
        }
    }

    /// Calls registered since the last start.
    #[must_use]
    pub fn total_invocations(&self) -> u64 {
        self.activation.load().invocations.load(Ordering::Acquire)
    }

    /// Registered calls that returned an error or panicked since the last start.
    #[must_use]
    pub fn total_errors(&self) -> u64 {
        self.activation.load().errors.load(Ordering::Acquire)
    }

    /// Number of threads with at least one tracked call.
    #[must_use]
    pub fn tracked_threads(&self) -> usize {
        self.registry.len()
    }

    /// True when the given thread has an entry in the registry.
    #[must_use]
    pub fn is_tracking(&self, thread: &ThreadIdentity) -> bool {
        self.registry.contains_key(&thread.number())
    }

    /// Wrap one call: register it, run the rest of the chain, clean up.
    ///
    /// The result of `next` is returned unchanged. Panics from `next` keep
    /// unwinding after the bookkeeping ran and count as errors.
    pub fn process<E>(&self, call: &mut ServiceCall<'_>, next: Next<'_, E>) -> Result<(), E> {
        // Stays set only if `next` unwinds.
        let mut guard = CallGuard {
            monitor: self,
            registration: self.register(call),
            failed: true,
        };
        let result = next.proceed(call);
        guard.failed = result.is_err();
        drop(guard);
        result
    }

    fn register(&self, call: &ServiceCall<'_>) -> Option<Registration> {
        let activation = self.activation.load_full();
        if !self.is_started() {
            return None;
        }

        let state = match self.state_provider.current() {
            Ok(state) => state,
            Err(error) => {
                debug!(service = %call.service.name, %error, "usage registration skipped");
                return None;
            },
        };

        let frame = Arc::new(Frame::capture(
            call.service,
            call.pipeline,
            state,
            Arc::clone(&self.renderer),
        ));
        let thread = ThreadIdentity::current();
        let key = thread.number();
        self.registry
            .entry(key)
            .or_insert_with(|| Arc::new(Invocation::new(thread)))
            .push(Arc::clone(&frame));

        let registration = Registration {
            key,
            activation,
            frame,
        };
        if !self.is_current(&registration) {
            // Stopped or restarted while registering: undo, the entry belongs
            // to no live epoch.
            self.pop(&registration);
            return None;
        }

        // A stop landing after the check bumps counters nobody reads anymore.
        registration
            .activation
            .invocations
            .fetch_add(1, Ordering::AcqRel);
        Some(registration)
    }

    fn is_current(&self, registration: &Registration) -> bool {
        self.activation.load().epoch == registration.activation.epoch
    }

    fn complete(&self, registration: &Registration, failed: bool) {
        if !self.is_current(registration) {
            return;
        }
        self.pop(registration);
        if failed {
            registration.activation.errors.fetch_add(1, Ordering::AcqRel);
        }
    }

    fn pop(&self, registration: &Registration) {
        if let Entry::Occupied(entry) = self.registry.entry(registration.key) {
            entry.get().pop(&registration.frame);
            if entry.get().is_empty() {
                entry.remove();
            }
        }
    }

    /// Snapshot the monitor.
    ///
    /// The registry keeps moving while the report is built; each invocation
    /// is captured consistently, the set of invocations is best-effort.
    /// Vacant entries found along the way are evicted.
    pub fn report(&self) -> UsageReport {
        let now = Utc::now();
        let started_at = self.started_at();
        let activation = self.activation.load_full();

        let mut live = Vec::with_capacity(self.registry.len());
        let mut vacant = Vec::new();
        for entry in &self.registry {
            if entry.value().is_empty() {
                vacant.push(*entry.key());
            } else {
                live.push(Arc::clone(entry.value()));
            }
        }

        for key in vacant {
            if self
                .registry
                .remove_if(&key, |_, invocation| invocation.is_empty())
                .is_some()
            {
                warn!(thread = key, "evicted vacant invocation from usage registry");
            }
        }

        let mut current: Vec<_> = live
            .iter()
            .filter_map(|invocation| invocation.report_at(now))
            .collect();
        current.sort_by_key(|invocation| invocation.started_at);

        UsageReport {
            started: started_at.is_some(),
            started_at,
            uptime: started_at.map(|start| elapsed_between(start, now)),
            generated_at: now,
            total_invocations: activation.invocations.load(Ordering::Acquire),
            total_errors: activation.errors.load(Ordering::Acquire),
            current_length: current.len(),
            current,
        }
    }

    #[cfg(test)]
    pub(crate) fn insert_vacant(&self, thread: ThreadIdentity) {
        self.registry
            .insert(thread.number(), Arc::new(Invocation::new(thread)));
    }
}

impl<E> InvokeProcessor<E> for UsageMonitor {
    fn process(&self, call: &mut ServiceCall<'_>, next: Next<'_, E>) -> Result<(), E> {
        Self::process(self, call, next)
    }
}

impl SnapshotCodable for UsageMonitor {
    type Snapshot = UsageReport;
    const KIND: &'static str = "usage_monitor";

    fn snapshot(&self) -> UsageReport {
        self.report()
    }
}

impl fmt::Debug for UsageMonitor {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("UsageMonitor")
            .field("started_at", &self.started_at())
            .field("epoch", &self.activation.load().epoch)
            .field("total_invocations", &self.total_invocations())
            .field("total_errors", &self.total_errors())
            .field("tracked_threads", &self.tracked_threads())
            .finish_non_exhaustive()
    }
}

struct Registration {
    key: u64,
    activation: Arc<Activation>,
    frame: Arc<Frame>,
}

struct CallGuard<'a> {
    monitor: &'a UsageMonitor,
    registration: Option<Registration>,
    failed: bool,
}

impl Drop for CallGuard<'_> {
    fn drop(&mut self) {
        if let Some(registration) = self.registration.take() {
            self.monitor.complete(&registration, self.failed);
        }
    }
}
