use dxf_core::{MetricsBackend, StartFailure};
use dxf_model::{Slots, TaskType};
use prometheus::{IntCounter, IntCounterVec, IntGauge, Opts, Registry, proto::MetricFamily};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MetricsError {
    #[error("failed to register metric: {0}")]
    Register(#[from] prometheus::Error),
}

#[derive(Clone)]
pub struct PrometheusMetrics {
    registry: Registry,
    started: IntCounterVec,
    exited: IntCounterVec,
    available: IntGauge,
    preempted: IntCounter,
    start_failures: IntCounterVec,
    recover_failures: IntCounter,
}

impl PrometheusMetrics {
    pub fn new() -> Result<Self, MetricsError> {
        Self::with_registry(Registry::new())
    }

    /// Register the collectors on an existing registry.
    pub fn with_registry(registry: Registry) -> Result<Self, MetricsError> {
        let started = IntCounterVec::new(
            Opts::new("dxf_executors_started_total", "Task executors started"),
            &["task_type"],
        )?;
        let exited = IntCounterVec::new(
            Opts::new("dxf_executors_exited_total", "Task executors exited"),
            &["task_type"],
        )?;
        let available = IntGauge::new("dxf_available_slots", "Idle CPU slots on this node")?;
        let preempted = IntCounter::new(
            "dxf_preempted_executors_total",
            "Executors canceled to make room for more important tasks",
        )?;
        let start_failures = IntCounterVec::new(
            Opts::new(
                "dxf_executor_start_failures_total",
                "Task executors that could not be started",
            ),
            &["task_type", "reason"],
        )?;
        let recover_failures = IntCounter::new(
            "dxf_meta_recover_failures_total",
            "Node identity recoveries that exhausted their retries",
        )?;

        registry.register(Box::new(started.clone()))?;
        registry.register(Box::new(exited.clone()))?;
        registry.register(Box::new(available.clone()))?;
        registry.register(Box::new(preempted.clone()))?;
        registry.register(Box::new(start_failures.clone()))?;
        registry.register(Box::new(recover_failures.clone()))?;

        Ok(Self {
            registry,
            started,
            exited,
            available,
            preempted,
            start_failures,
            recover_failures,
        })
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn gather(&self) -> Vec<MetricFamily> {
        self.registry.gather()
    }
}

impl MetricsBackend for PrometheusMetrics {
    fn executor_started(&self, task_type: &TaskType) {
        self.started.with_label_values(&[task_type.as_str()]).inc();
    }

    fn executor_exited(&self, task_type: &TaskType) {
        self.exited.with_label_values(&[task_type.as_str()]).inc();
    }

    fn available_slots(&self, slots: Slots) {
        self.available.set(slots as i64);
    }

    fn preempted(&self, evicted: usize) {
        self.preempted.inc_by(evicted as u64);
    }

    fn start_failed(&self, task_type: &TaskType, reason: StartFailure) {
        self.start_failures
            .with_label_values(&[task_type.as_str(), reason.as_str()])
            .inc();
    }

    fn meta_recover_failed(&self) {
        self.recover_failures.inc();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use prometheus::{Encoder, TextEncoder};

    fn render(metrics: &PrometheusMetrics) -> String {
        let mut buf = Vec::new();
        TextEncoder::new()
            .encode(&metrics.gather(), &mut buf)
            .unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn records_executor_lifecycle() {
        let metrics = PrometheusMetrics::new().unwrap();
        let import = TaskType::from("import");

        metrics.executor_started(&import);
        metrics.executor_started(&import);
        metrics.executor_exited(&import);
        metrics.available_slots(5);
        metrics.preempted(2);

        assert_eq!(metrics.started.with_label_values(&["import"]).get(), 2);
        assert_eq!(metrics.exited.with_label_values(&["import"]).get(), 1);
        assert_eq!(metrics.available.get(), 5);
        assert_eq!(metrics.preempted.get(), 2);
    }

    #[test]
    fn start_failures_are_labelled_by_reason() {
        let metrics = PrometheusMetrics::new().unwrap();
        metrics.start_failed(&TaskType::from("backfill"), StartFailure::InitFatal);
        metrics.meta_recover_failed();

        let text = render(&metrics);
        assert!(text.contains(
            r#"dxf_executor_start_failures_total{reason="init_fatal",task_type="backfill"} 1"#
        ));
        assert!(text.contains("dxf_meta_recover_failures_total 1"));
    }

    #[test]
    fn double_registration_fails() {
        let registry = Registry::new();
        assert!(PrometheusMetrics::with_registry(registry.clone()).is_ok());
        assert!(matches!(
            PrometheusMetrics::with_registry(registry),
            Err(MetricsError::Register(_))
        ));
    }
}
