//! The service invocation chain.
//!
//! Every service call passes through an ordered list of [`InvokeProcessor`]s
//! before reaching its [`ServiceHandler`]. Each processor receives a [`Next`]
//! continuation and decides when to hand control onwards; `Next::proceed`
//! consumes the continuation, so a processor delegates at most once.

use std::sync::Arc;
use tundra_domain::{Pipeline, ServiceDescriptor};

/// Outcome flags a chain may inspect or update while a call runs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ServiceStatus {
    completed: bool,
    failed: bool,
}

impl ServiceStatus {
    /// Fresh status for a call that has not run yet.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            completed: false,
            failed: false,
        }
    }

    /// Record that the service returned normally.
    pub const fn mark_completed(&mut self) {
        self.completed = true;
        self.failed = false;
    }

    /// Record that the service returned an error.
    pub const fn mark_failed(&mut self) {
        self.completed = true;
        self.failed = true;
    }

    /// True once the service has returned, successfully or not.
    #[must_use]
    pub const fn is_completed(&self) -> bool {
        self.completed
    }

    /// True when the service returned an error.
    #[must_use]
    pub const fn is_failed(&self) -> bool {
        self.failed
    }
}

/// One service call as seen by the chain.
#[derive(Debug)]
pub struct ServiceCall<'a> {
    /// Service being invoked.
    pub service: &'a ServiceDescriptor,
    /// Input document; services may mutate it in place.
    pub pipeline: &'a mut Pipeline,
    /// Status shared with the rest of the chain.
    pub status: &'a mut ServiceStatus,
}

impl<'a> ServiceCall<'a> {
    /// Bundle the parts of a call.
    pub const fn new(
        service: &'a ServiceDescriptor,
        pipeline: &'a mut Pipeline,
        status: &'a mut ServiceStatus,
    ) -> Self {
        Self {
            service,
            pipeline,
            status,
        }
    }
}

/// The service body at the end of the chain.
pub trait ServiceHandler<E>: Send + Sync {
    /// Execute the service.
    fn invoke(&self, call: &mut ServiceCall<'_>) -> Result<(), E>;
}

impl<E, F> ServiceHandler<E> for F
where
    F: Fn(&mut ServiceCall<'_>) -> Result<(), E> + Send + Sync,
{
    fn invoke(&self, call: &mut ServiceCall<'_>) -> Result<(), E> {
        self(call)
    }
}

/// A link in the invocation chain, consulted before and after every call.
///
/// Implementations must call `next.proceed(call)` to let the service run and
/// should return its result unchanged unless they deliberately replace it.
pub trait InvokeProcessor<E>: Send + Sync {
    /// Wrap one call.
    fn process(&self, call: &mut ServiceCall<'_>, next: Next<'_, E>) -> Result<(), E>;
}

/// Shared handle to a processor installed in a chain.
pub type SharedProcessor<E> = Arc<dyn InvokeProcessor<E>>;

/// Continuation over the remainder of the chain.
pub struct Next<'a, E> {
    processors: &'a [SharedProcessor<E>],
    handler: &'a dyn ServiceHandler<E>,
}

impl<'a, E> Next<'a, E> {
    /// Continuation that runs `processors` in order, then `handler`.
    #[must_use]
    pub fn new(processors: &'a [SharedProcessor<E>], handler: &'a dyn ServiceHandler<E>) -> Self {
        Self {
            processors,
            handler,
        }
    }

    /// Number of processors still ahead of the handler.
    #[must_use]
    pub const fn remaining(&self) -> usize {
        self.processors.len()
    }

    /// Hand the call to the rest of the chain.
    pub fn proceed(self, call: &mut ServiceCall<'_>) -> Result<(), E> {
        match self.processors.split_first() {
            Some((head, rest)) => head.process(
                call,
                Next {
                    processors: rest,
                    handler: self.handler,
                },
            ),
            None => self.handler.invoke(call),
        }
    }
}

impl<E> std::fmt::Debug for Next<'_, E> {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("Next")
            .field("remaining", &self.processors.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Trace(Mutex<Vec<String>>);

    impl Trace {
        fn push(&self, entry: impl Into<String>) {
            if let Ok(mut entries) = self.0.lock() {
                entries.push(entry.into());
            }
        }

        fn entries(&self) -> Vec<String> {
            self.0.lock().map(|entries| entries.clone()).unwrap_or_default()
        }
    }

    struct Tagging {
        tag: &'static str,
        trace: Arc<Trace>,
    }

    impl InvokeProcessor<String> for Tagging {
        fn process(&self, call: &mut ServiceCall<'_>, next: Next<'_, String>) -> Result<(), String> {
            self.trace.push(format!("{}:before", self.tag));
            let result = next.proceed(call);
            self.trace.push(format!("{}:after", self.tag));
            result
        }
    }

    #[test]
    fn proceed_runs_processors_in_order_then_handler() -> Result<(), Box<dyn std::error::Error>> {
        let trace = Arc::new(Trace::default());
        let processors: Vec<SharedProcessor<String>> = vec![
            Arc::new(Tagging {
                tag: "outer",
                trace: Arc::clone(&trace),
            }),
            Arc::new(Tagging {
                tag: "inner",
                trace: Arc::clone(&trace),
            }),
        ];
        let handler_trace = Arc::clone(&trace);
        let handler = move |call: &mut ServiceCall<'_>| -> Result<(), String> {
            handler_trace.push("handler");
            call.pipeline.insert("seen", true);
            Ok(())
        };

        let service = ServiceDescriptor::parse("ns:foo", "Pkg")?;
        let mut pipeline = Pipeline::new();
        let mut status = ServiceStatus::new();
        let mut call = ServiceCall::new(&service, &mut pipeline, &mut status);

        let next = Next::new(&processors, &handler);
        assert_eq!(next.remaining(), 2);
        next.proceed(&mut call)?;

        assert_eq!(
            trace.entries(),
            ["outer:before", "inner:before", "handler", "inner:after", "outer:after"]
        );
        assert_eq!(pipeline.get("seen").and_then(|seen| seen.as_bool()), Some(true));
        Ok(())
    }

    #[test]
    fn handler_errors_pass_through_unchanged() -> Result<(), Box<dyn std::error::Error>> {
        let handler = |_: &mut ServiceCall<'_>| -> Result<(), String> { Err("boom".to_string()) };
        let service = ServiceDescriptor::parse("ns:foo", "Pkg")?;
        let mut pipeline = Pipeline::new();
        let mut status = ServiceStatus::new();
        let mut call = ServiceCall::new(&service, &mut pipeline, &mut status);

        let result = Next::new(&[], &handler).proceed(&mut call);
        assert_eq!(result, Err("boom".to_string()));
        Ok(())
    }

    #[test]
    fn status_flags_track_outcome() {
        let mut status = ServiceStatus::new();
        assert!(!status.is_completed());
        status.mark_failed();
        assert!(status.is_completed() && status.is_failed());
        status.mark_completed();
        assert!(status.is_completed() && !status.is_failed());
    }
}
