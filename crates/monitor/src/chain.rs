//! Ordered processor registry that drives service calls.

use arc_swap::ArcSwap;
use std::fmt;
use std::sync::Arc;
use tundra_domain::{Pipeline, ServiceDescriptor};
use tundra_ports::{Next, ServiceCall, ServiceHandler, ServiceStatus, SharedProcessor};

/// The invocation chain: installed processors, outermost first.
///
/// Calls read a snapshot of the processor list without locking; registration
/// publishes a new list. A call that is already running keeps the list it
/// started with.
pub struct ProcessorChain<E> {
    processors: ArcSwap<Vec<SharedProcessor<E>>>,
}

impl<E> ProcessorChain<E> {
    /// Chain with no processors.
    #[must_use]
    pub fn new() -> Self {
        Self {
            processors: ArcSwap::from_pointee(Vec::new()),
        }
    }

    /// Append `processor`. Returns false if it is already installed.
    pub fn register(&self, processor: SharedProcessor<E>) -> bool {
        let mut added = false;
        self.processors.rcu(|current| {
            added = !current.iter().any(|held| Arc::ptr_eq(held, &processor));
            let mut next = Vec::clone(current);
            if added {
                next.push(Arc::clone(&processor));
            }
            next
        });
        added
    }

    /// Remove `processor`. Returns false if it was not installed.
    pub fn unregister(&self, processor: &SharedProcessor<E>) -> bool {
        let mut removed = false;
        self.processors.rcu(|current| {
            let next: Vec<_> = current
                .iter()
                .filter(|held| !Arc::ptr_eq(held, processor))
                .cloned()
                .collect();
            removed = next.len() != current.len();
            next
        });
        removed
    }

    /// Number of installed processors.
    #[must_use]
    pub fn len(&self) -> usize {
        self.processors.load().len()
    }

    /// True when no processors are installed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.processors.load().is_empty()
    }

    /// Run `call` through every processor and then `handler`.
    ///
    /// The call's status is marked completed or failed once the handler
    /// returns.
    pub fn invoke(&self, call: &mut ServiceCall<'_>, handler: &dyn ServiceHandler<E>) -> Result<(), E> {
        let processors = self.processors.load_full();
        let terminal = Terminal(handler);
        Next::new(&processors, &terminal).proceed(call)
    }

    /// Invoke `service` with `pipeline` under a fresh status.
    pub fn call(
        &self,
        service: &ServiceDescriptor,
        pipeline: &mut Pipeline,
        handler: &dyn ServiceHandler<E>,
    ) -> Result<(), E> {
        let mut status = ServiceStatus::new();
        let mut call = ServiceCall::new(service, pipeline, &mut status);
        self.invoke(&mut call, handler)
    }
}

impl<E> Default for ProcessorChain<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> fmt::Debug for ProcessorChain<E> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("ProcessorChain")
            .field("processors", &self.len())
            .finish()
    }
}

struct Terminal<'a, E>(&'a dyn ServiceHandler<E>);

impl<E> ServiceHandler<E> for Terminal<'_, E> {
    fn invoke(&self, call: &mut ServiceCall<'_>) -> Result<(), E> {
        let result = self.0.invoke(call);
        if result.is_ok() {
            call.status.mark_completed();
        } else {
            call.status.mark_failed();
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tundra_ports::InvokeProcessor;

    struct Counting(std::sync::atomic::AtomicUsize);

    impl InvokeProcessor<String> for Counting {
        fn process(&self, call: &mut ServiceCall<'_>, next: Next<'_, String>) -> Result<(), String> {
            self.0.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            next.proceed(call)
        }
    }

    #[test]
    fn register_is_idempotent_per_processor() {
        let chain = ProcessorChain::<String>::new();
        let processor: SharedProcessor<String> =
            Arc::new(Counting(std::sync::atomic::AtomicUsize::new(0)));

        assert!(chain.register(Arc::clone(&processor)));
        assert!(!chain.register(Arc::clone(&processor)));
        assert_eq!(chain.len(), 1);
        assert!(chain.unregister(&processor));
        assert!(!chain.unregister(&processor));
        assert!(chain.is_empty());
    }

    #[test]
    fn invoke_marks_status() -> Result<(), Box<dyn std::error::Error>> {
        let chain = ProcessorChain::<String>::new();
        let service = ServiceDescriptor::parse("ns:foo", "Pkg")?;
        let mut pipeline = Pipeline::new();
        let mut status = ServiceStatus::new();

        let failing = |_: &mut ServiceCall<'_>| -> Result<(), String> { Err("nope".to_string()) };
        let mut call = ServiceCall::new(&service, &mut pipeline, &mut status);
        assert_eq!(chain.invoke(&mut call, &failing), Err("nope".to_string()));
        assert!(status.is_failed());
        Ok(())
    }
}
