//! Health tracking for the extraction service.
//!
//! Real traffic feeds a bounded, time-windowed outcome buffer; `classify`
//! combines its error rate with a one-off latency probe. Neither signal
//! decides alone: a single slow probe is at worst `Degraded`, while a
//! sustained error rate is an `Outage` without probing at all.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use serde::Serialize;
use tokio::time::Instant;
use tracing::{error, info, warn};

use crate::analysis::extractor::SkillExtractor;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceStatus {
    Operational,
    Degraded,
    Outage,
}

#[derive(Debug, Clone)]
pub struct HealthSettings {
    /// Samples older than this are ignored.
    pub window: Duration,
    /// At most this many recent samples are kept.
    pub capacity: usize,
    /// Error rate strictly above this is an outage.
    pub error_rate_threshold: f64,
    pub probe_timeout: Duration,
    /// Probe latency strictly above this is degraded.
    pub degraded_latency: Duration,
}

impl Default for HealthSettings {
    fn default() -> Self {
        Self {
            window: Duration::from_secs(300),
            capacity: 50,
            error_rate_threshold: 0.30,
            probe_timeout: Duration::from_secs(10),
            degraded_latency: Duration::from_secs(3),
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct HealthSample {
    at: Instant,
    success: bool,
}

/// Outcome of a status check, as exposed on the status endpoint.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HealthReport {
    pub status: ServiceStatus,
    pub error_rate: f64,
    pub probe_latency_ms: Option<u64>,
    pub reason: Option<String>,
}

impl HealthReport {
    fn outage(error_rate: f64, reason: String) -> Self {
        Self {
            status: ServiceStatus::Outage,
            error_rate,
            probe_latency_ms: None,
            reason: Some(reason),
        }
    }
}

#[derive(Debug)]
pub struct HealthTracker {
    settings: HealthSettings,
    samples: Mutex<VecDeque<HealthSample>>,
}

impl HealthTracker {
    pub fn new(settings: HealthSettings) -> Self {
        let capacity = settings.capacity.max(1);
        Self {
            settings: HealthSettings { capacity, ..settings },
            samples: Mutex::new(VecDeque::with_capacity(capacity)),
        }
    }

    /// Locks the buffer and drops samples that fell out of the time window.
    fn current_samples(&self) -> MutexGuard<'_, VecDeque<HealthSample>> {
        let mut samples = self.samples.lock().unwrap_or_else(PoisonError::into_inner);
        let now = Instant::now();
        while samples
            .front()
            .is_some_and(|sample| now.duration_since(sample.at) > self.settings.window)
        {
            samples.pop_front();
        }
        samples
    }

    pub fn record_call(&self, success: bool) {
        let mut samples = self.current_samples();
        samples.push_back(HealthSample {
            at: Instant::now(),
            success,
        });
        while samples.len() > self.settings.capacity {
            samples.pop_front();
        }
    }

    /// Failures over total samples in the window; 0.0 when there is no traffic.
    pub fn error_rate(&self) -> f64 {
        let samples = self.current_samples();
        if samples.is_empty() {
            return 0.0;
        }
        let failures = samples.iter().filter(|sample| !sample.success).count();
        failures as f64 / samples.len() as f64
    }

    pub fn sample_count(&self) -> usize {
        self.current_samples().len()
    }

    /// Classifies the extraction service:
    /// initialization failure or elevated error rate short-circuit to `Outage`,
    /// otherwise a timed probe decides between `Operational`, `Degraded` and `Outage`.
    pub async fn classify(&self, extractor: &dyn SkillExtractor) -> HealthReport {
        if let Err(e) = extractor.initialize().await {
            error!("Extraction status: OUTAGE (initialization failed: {e})");
            return HealthReport::outage(self.error_rate(), format!("initialization failed: {e}"));
        }

        let error_rate = self.error_rate();
        if error_rate > self.settings.error_rate_threshold {
            error!(
                "Extraction status: OUTAGE (error rate {:.0}%)",
                error_rate * 100.0
            );
            return HealthReport::outage(
                error_rate,
                format!("error rate {:.0}% over recent calls", error_rate * 100.0),
            );
        }

        let started = Instant::now();
        let probe = tokio::time::timeout(self.settings.probe_timeout, extractor.probe()).await;
        let latency = started.elapsed();

        let failure = match probe {
            Ok(Ok(())) => None,
            Ok(Err(e)) => Some(format!("probe failed: {e}")),
            Err(_) => Some(format!(
                "probe timed out after {}s",
                self.settings.probe_timeout.as_secs()
            )),
        };

        if let Some(reason) = failure {
            error!("Extraction status: OUTAGE ({reason})");
            self.record_call(false);
            return HealthReport::outage(self.error_rate(), reason);
        }

        let probe_latency_ms = Some(latency.as_millis() as u64);
        if latency > self.settings.degraded_latency {
            warn!(
                "Extraction status: DEGRADED (latency {:.2}s)",
                latency.as_secs_f64()
            );
            return HealthReport {
                status: ServiceStatus::Degraded,
                error_rate,
                probe_latency_ms,
                reason: Some(format!("slow probe ({:.2}s)", latency.as_secs_f64())),
            };
        }

        info!(
            "Extraction status: OPERATIONAL (latency {:.2}s, error rate {:.0}%)",
            latency.as_secs_f64(),
            error_rate * 100.0
        );
        HealthReport {
            status: ServiceStatus::Operational,
            error_rate,
            probe_latency_ms,
            reason: None,
        }
    }
}

impl Default for HealthTracker {
    fn default() -> Self {
        Self::new(HealthSettings::default())
    }
}
