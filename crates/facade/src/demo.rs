//! Synthetic nested workload for exercising a monitor.
//!
//! Each worker thread binds its own invoke state and calls a chain of nested
//! services. The innermost service parks until the report has been captured,
//! so the report always shows every worker in flight at full depth.

use parking_lot::{Condvar, Mutex};
use std::sync::Arc;
use std::sync::mpsc::{self, Sender};
use std::thread;
use std::time::Duration;
use tracing::{debug, info};
use tundra_adapters::ThreadLocalInvokeState;
use tundra_domain::{InvokeState, Pipeline, ServiceDescriptor};
use tundra_monitor::{ProcessorChain, UsageMonitor, UsageReport};
use tundra_ports::{ServiceCall, SharedProcessor};
use tundra_shared::{ErrorCode, ErrorEnvelope, Result};

const MAX_THREADS: usize = 256;
const MAX_DEPTH: usize = 64;
const READY_TIMEOUT: Duration = Duration::from_secs(10);
const DEMO_PACKAGE: &str = "TundraDemo";

/// Shape of the demo workload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DemoOptions {
    /// Worker threads.
    pub threads: usize,
    /// Nested services per worker.
    pub depth: usize,
    /// How long to keep every worker in flight before capturing the report.
    pub hold: Duration,
    /// Make the innermost service fail.
    pub fail: bool,
}

impl Default for DemoOptions {
    fn default() -> Self {
        Self {
            threads: 2,
            depth: 3,
            hold: Duration::from_millis(50),
            fail: false,
        }
    }
}

impl DemoOptions {
    fn validate(&self) -> Result<()> {
        check_range("threads", self.threads, MAX_THREADS)?;
        check_range("depth", self.depth, MAX_DEPTH)
    }
}

/// What the demo observed.
#[derive(Debug, Clone)]
pub struct DemoOutcome {
    /// Report captured while every worker was parked in its innermost call.
    pub report: UsageReport,
    /// Workers whose outermost call succeeded.
    pub succeeded: usize,
    /// Workers whose outermost call failed.
    pub failed: usize,
    /// Monitor invocation counter after all workers finished.
    pub total_invocations: u64,
    /// Monitor error counter after all workers finished.
    pub total_errors: u64,
}

/// Run the workload against `monitor`, starting it if needed.
pub fn run_demo(monitor: &Arc<UsageMonitor>, options: &DemoOptions) -> Result<DemoOutcome> {
    options.validate()?;
    monitor.start();

    let chain = ProcessorChain::<ErrorEnvelope>::new();
    let processor: SharedProcessor<ErrorEnvelope> = Arc::<UsageMonitor>::clone(monitor);
    chain.register(processor);

    let services = demo_services(options.depth)?;
    let states = (0..options.threads)
        .map(|worker| {
            InvokeState::parse(
                format!("demo-session-{worker}"),
                format!("demo-user-{worker}"),
            )
        })
        .collect::<std::result::Result<Vec<_>, _>>()?;

    info!(
        threads = options.threads,
        depth = options.depth,
        fail = options.fail,
        "demo workload starting"
    );

    let gate = Gate::default();
    let (ready_tx, ready_rx) = mpsc::channel();
    let (report, outcomes) = thread::scope(|scope| {
        let mut handles = Vec::with_capacity(options.threads);
        let mut spawn_error = None;
        for (worker, state) in states.into_iter().enumerate() {
            let parked = Parked {
                ready: ready_tx.clone(),
                gate: &gate,
                fail: options.fail,
            };
            let (chain, services) = (&chain, services.as_slice());
            let spawned = thread::Builder::new()
                .name(format!("demo-worker-{worker}"))
                .spawn_scoped(scope, move || {
                    ThreadLocalInvokeState::scope(state, || {
                        descend(chain, services, 1, worker, &parked)
                    })
                });
            match spawned {
                Ok(handle) => handles.push(handle),
                Err(error) => {
                    spawn_error = Some(error);
                    break;
                },
            }
        }

        let mut ready = 0;
        while ready < handles.len() {
            if ready_rx.recv_timeout(READY_TIMEOUT).is_err() {
                break;
            }
            ready += 1;
        }
        debug!(ready, spawned = handles.len(), "demo workers in flight");
        if spawn_error.is_none() && ready == handles.len() {
            thread::sleep(options.hold);
        }

        let report = monitor.report();
        gate.open();

        let outcomes: Vec<Result<()>> = handles
            .into_iter()
            .map(|handle| handle.join().unwrap_or_else(|_| Err(worker_panicked())))
            .collect();
        match spawn_error {
            Some(error) => Err(ErrorEnvelope::unexpected(
                ErrorCode::new("demo", "spawn_failed"),
                format!("failed to spawn demo worker: {error}"),
                tundra_shared::ErrorClass::Retriable,
            )),
            None => Ok((report, outcomes)),
        }
    })?;

    let failed = outcomes.iter().filter(|outcome| outcome.is_err()).count();
    let outcome = DemoOutcome {
        report,
        succeeded: outcomes.len() - failed,
        failed,
        total_invocations: monitor.total_invocations(),
        total_errors: monitor.total_errors(),
    };
    info!(
        succeeded = outcome.succeeded,
        failed = outcome.failed,
        "demo workload finished"
    );
    Ok(outcome)
}

/// Service descriptors for each nesting level, outermost first.
pub fn demo_services(depth: usize) -> Result<Vec<ServiceDescriptor>> {
    (1..=depth)
        .map(|level| {
            ServiceDescriptor::parse(format!("tundra.demo:level{level}"), DEMO_PACKAGE)
                .map_err(ErrorEnvelope::from)
        })
        .collect()
}

fn descend(
    chain: &ProcessorChain<ErrorEnvelope>,
    services: &[ServiceDescriptor],
    level: usize,
    worker: usize,
    parked: &Parked<'_>,
) -> Result<()> {
    let Some((service, deeper)) = services.split_first() else {
        return parked.wait();
    };
    let mut pipeline = Pipeline::new().with("worker", worker).with("level", level);
    chain.call(service, &mut pipeline, &|_: &mut ServiceCall<'_>| -> Result<()> {
        descend(chain, deeper, level + 1, worker, parked)
    })
}

struct Parked<'a> {
    ready: Sender<()>,
    gate: &'a Gate,
    fail: bool,
}

impl Parked<'_> {
    fn wait(&self) -> Result<()> {
        // The receiver only disappears once the report has been taken.
        let _ = self.ready.send(());
        self.gate.wait();
        if self.fail {
            return Err(ErrorEnvelope::expected(
                ErrorCode::new("demo", "failure"),
                "innermost demo service failed on request",
            ));
        }
        Ok(())
    }
}

#[derive(Default)]
struct Gate {
    open: Mutex<bool>,
    opened: Condvar,
}

impl Gate {
    fn open(&self) {
        *self.open.lock() = true;
        self.opened.notify_all();
    }

    fn wait(&self) {
        let mut open = self.open.lock();
        while !*open {
            self.opened.wait(&mut open);
        }
    }
}

fn worker_panicked() -> ErrorEnvelope {
    ErrorEnvelope::invariant(
        ErrorCode::new("demo", "worker_panicked"),
        "demo worker panicked",
    )
}

fn check_range(name: &'static str, value: usize, max: usize) -> Result<()> {
    if (1..=max).contains(&value) {
        return Ok(());
    }
    Err(ErrorEnvelope::expected(
        ErrorCode::new("demo", "invalid_options"),
        format!("{name} must be between 1 and {max} (got {value})"),
    )
    .with_metadata("option", name))
}
