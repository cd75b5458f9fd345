//! Fan-out observer that dispatches to multiple backends.
//!
//! Lets a deployment record to tracing logs and a metrics exporter at the
//! same time without the engine knowing about either.
use crate::observability::traits::{Observer, ObserverEvent, ObserverMetric};

/// Dispatches events and metrics to all inner observers.
pub struct MultiObserver {
    observers: Vec<Box<dyn Observer>>,
}

impl MultiObserver {
    /// Create from a list of observers. If the list is empty the result
    /// behaves like a noop.
    pub fn new(observers: Vec<Box<dyn Observer>>) -> Self {
        Self { observers }
    }
}

impl Observer for MultiObserver {
    fn record_event(&self, event: &ObserverEvent) {
        for obs in &self.observers {
            obs.record_event(event);
        }
    }

    fn record_metric(&self, metric: &ObserverMetric) {
        for obs in &self.observers {
            obs.record_metric(metric);
        }
    }

    fn flush(&self) {
        for obs in &self.observers {
            obs.flush();
        }
    }

    fn name(&self) -> &str {
        "multi"
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    use crate::observability::multi::MultiObserver;
    use crate::observability::traits::*;

    /// Test observer that counts calls via shared atomic counters.
    struct CountingObserver {
        events: Arc<AtomicUsize>,
        metrics: Arc<AtomicUsize>,
        flushes: Arc<AtomicUsize>,
    }

    impl CountingObserver {
        fn new() -> (Self, Arc<AtomicUsize>, Arc<AtomicUsize>, Arc<AtomicUsize>) {
            let events = Arc::new(AtomicUsize::new(0));
            let metrics = Arc::new(AtomicUsize::new(0));
            let flushes = Arc::new(AtomicUsize::new(0));
            (
                Self {
                    events: events.clone(),
                    metrics: metrics.clone(),
                    flushes: flushes.clone(),
                },
                events,
                metrics,
                flushes,
            )
        }
    }

    impl Observer for CountingObserver {
        fn record_event(&self, _event: &ObserverEvent) {
            self.events.fetch_add(1, Ordering::SeqCst);
        }

        fn record_metric(&self, _metric: &ObserverMetric) {
            self.metrics.fetch_add(1, Ordering::SeqCst);
        }

        fn flush(&self) {
            self.flushes.fetch_add(1, Ordering::SeqCst);
        }

        fn name(&self) -> &str {
            "counting"
        }
    }

    #[test]
    fn name_is_multi() {
        assert_eq!(MultiObserver::new(vec![]).name(), "multi");
    }

    #[test]
    fn empty_multi_behaves_like_noop() {
        let obs = MultiObserver::new(vec![]);
        obs.record_event(&ObserverEvent::ExecutionStart { code_bytes: 1 });
        obs.record_metric(&ObserverMetric::ActiveContexts(1));
        obs.flush();
    }

    #[test]
    fn dispatches_to_all_backends() {
        let (a, a_events, a_metrics, a_flushes) = CountingObserver::new();
        let (b, b_events, b_metrics, b_flushes) = CountingObserver::new();
        let multi = MultiObserver::new(vec![Box::new(a), Box::new(b)]);

        multi.record_event(&ObserverEvent::ExecutionStart { code_bytes: 1 });
        multi.record_event(&ObserverEvent::ExecutionEnd {
            status: "success".into(),
            duration: Duration::from_millis(1),
        });
        multi.record_metric(&ObserverMetric::ActiveContexts(2));
        multi.flush();

        assert_eq!(a_events.load(Ordering::SeqCst), 2);
        assert_eq!(b_events.load(Ordering::SeqCst), 2);
        assert_eq!(a_metrics.load(Ordering::SeqCst), 1);
        assert_eq!(b_metrics.load(Ordering::SeqCst), 1);
        assert_eq!(a_flushes.load(Ordering::SeqCst), 1);
        assert_eq!(b_flushes.load(Ordering::SeqCst), 1);
    }
}
