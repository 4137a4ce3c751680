use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use thiserror::Error;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use domain::common::error::ApiError;
use domain::mapping::{self, ResourceTelemetry};
use domain::snapshot::{Sample, SnapshotBuilder, SnapshotError};
use domain::telemetry::entity::Resource;
use ports::secondary::appliance_api::ApplianceApi;

use crate::registry::SnapshotStore;

/// Tuning knobs for one collection cycle.
#[derive(Debug, Clone)]
pub struct CollectorConfig {
    /// Per-request timeout; expiry surfaces as a transport error.
    pub request_timeout: Duration,
    /// Budget for the whole per-resource fan-out. Unfinished resources
    /// are degraded when it expires.
    pub cycle_deadline: Duration,
    /// Concurrent per-resource fetches.
    pub max_concurrent_resources: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleReport {
    pub resources: usize,
    pub degraded: usize,
    pub samples: usize,
}

#[derive(Debug, Error)]
pub enum CycleError {
    /// Credentials rejected; the scheduler must stop polling.
    #[error("fatal API error: {0}")]
    Fatal(ApiError),
    /// Resource enumeration failed; the cycle is aborted and the
    /// previous snapshot stays published.
    #[error("resource enumeration failed: {0}")]
    Enumeration(ApiError),
}

#[derive(Debug, Error)]
enum ResourceFetchError {
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error("sample mapping failed: {0}")]
    Mapping(#[from] SnapshotError),
}

/// Runs polling cycles against the appliance and publishes snapshots.
///
/// Degradation is all-or-nothing per resource: one failed telemetry
/// group drops every sample of that resource for the cycle and leaves
/// all other resources untouched.
pub struct Collector {
    api: Arc<dyn ApplianceApi>,
    store: Arc<SnapshotStore>,
    config: CollectorConfig,
}

impl Collector {
    #[must_use]
    pub fn new(
        api: Arc<dyn ApplianceApi>,
        store: Arc<SnapshotStore>,
        config: CollectorConfig,
    ) -> Self {
        Self { api, store, config }
    }

    /// One complete cycle: enumerate, fan out, map, publish.
    ///
    /// `Err` means nothing was published this cycle.
    pub async fn run_cycle(&self) -> Result<CycleReport, CycleError> {
        let started_at = SystemTime::now();
        let timeout = self.config.request_timeout;

        match call(timeout, self.api.ping()).await {
            Ok(()) => {}
            Err(e) if e.is_fatal() => return Err(CycleError::Fatal(e)),
            Err(e) => tracing::warn!(error = %e, "appliance ping failed, continuing"),
        }

        let mut builder = SnapshotBuilder::new(started_at);

        match call(timeout, self.api.api_version()).await {
            Ok(version) => match mapping::map_api_version(&version, started_at) {
                Ok(sample) => {
                    if let Err(e) = builder.push(sample) {
                        tracing::warn!(error = %e, "api version sample rejected");
                    }
                }
                Err(e) => tracing::warn!(error = %e, "api version sample rejected"),
            },
            Err(e) if e.is_fatal() => return Err(CycleError::Fatal(e)),
            Err(e) => tracing::warn!(error = %e, "api version fetch failed, continuing"),
        }

        let resources = match call(timeout, self.api.resource_list()).await {
            Ok(resources) => resources,
            Err(e) if e.is_fatal() => return Err(CycleError::Fatal(e)),
            Err(e) => return Err(CycleError::Enumeration(e)),
        };
        let total = resources.len();

        let mut pending: HashMap<u64, String> =
            resources.iter().map(|r| (r.id, r.name.clone())).collect();

        let semaphore = Arc::new(Semaphore::new(self.config.max_concurrent_resources.max(1)));
        let mut tasks = JoinSet::new();
        for resource in resources {
            let api = Arc::clone(&self.api);
            let semaphore = Arc::clone(&semaphore);
            tasks.spawn(async move {
                let _permit = semaphore.acquire_owned().await;
                let result = fetch_resource(&api, &resource, timeout, started_at).await;
                (resource, result)
            });
        }

        let mut fatal: Option<ApiError> = None;
        let deadline = tokio::time::sleep(self.config.cycle_deadline);
        tokio::pin!(deadline);

        loop {
            tokio::select! {
                () = &mut deadline => {
                    tasks.abort_all();
                    while tasks.join_next().await.is_some() {}
                    for (_, name) in pending.drain() {
                        tracing::warn!(resource = %name, "cycle deadline exceeded, degrading resource");
                        builder.mark_degraded(name, "cycle deadline exceeded");
                    }
                    break;
                }
                joined = tasks.join_next() => {
                    let Some(joined) = joined else { break };
                    match joined {
                        Ok((resource, Ok(samples))) => {
                            pending.remove(&resource.id);
                            match builder.extend(samples) {
                                Ok(()) => builder.mark_ok(resource.name),
                                Err(e) => {
                                    tracing::warn!(
                                        resource = %resource.name,
                                        error = %e,
                                        "duplicate series, degrading resource"
                                    );
                                    builder.mark_degraded(resource.name, e.to_string());
                                }
                            }
                        }
                        Ok((resource, Err(e))) => {
                            pending.remove(&resource.id);
                            if let ResourceFetchError::Api(api_err) = &e {
                                if api_err.is_fatal() && fatal.is_none() {
                                    fatal = Some(api_err.clone());
                                    tasks.abort_all();
                                }
                            }
                            tracing::warn!(
                                resource = %resource.name,
                                error = %e,
                                "resource fetch failed, degrading resource"
                            );
                            builder.mark_degraded(resource.name, e.to_string());
                        }
                        Err(e) if e.is_cancelled() => {}
                        Err(e) => tracing::error!(error = %e, "resource task failed"),
                    }
                }
            }
        }

        if let Some(e) = fatal {
            return Err(CycleError::Fatal(e));
        }

        let snapshot = builder.finish();
        let report = CycleReport {
            resources: total,
            degraded: snapshot.degraded_count(),
            samples: snapshot.samples.len(),
        };
        self.store.publish(snapshot);
        tracing::info!(
            resources = report.resources,
            degraded = report.degraded,
            samples = report.samples,
            "collection cycle published"
        );
        Ok(report)
    }
}

/// Bounds one API call; expiry maps to a transport error so the
/// resource degrades like any other network failure.
async fn call<T>(
    timeout: Duration,
    fut: impl Future<Output = Result<T, ApiError>>,
) -> Result<T, ApiError> {
    match tokio::time::timeout(timeout, fut).await {
        Ok(result) => result,
        Err(_) => Err(ApiError::Transport(format!(
            "request timed out after {}ms",
            timeout.as_millis()
        ))),
    }
}

/// Fetches every telemetry group of one resource and maps it to
/// samples. The first failure wins; remaining groups are not fetched.
async fn fetch_resource(
    api: &Arc<dyn ApplianceApi>,
    resource: &Resource,
    timeout: Duration,
    at: SystemTime,
) -> Result<Vec<Sample>, ResourceFetchError> {
    let id = resource.id;
    let telemetry = ResourceTelemetry {
        parameters: call(timeout, api.parameter_list(id)).await?,
        points: call(timeout, api.parameter_data(id)).await?,
        anomalies: call(timeout, api.anomaly_list(id)).await?,
        attacks: call(timeout, api.attack_list(id)).await?,
        geo: call(timeout, api.geo_ratio(id)).await?,
        protocol: call(timeout, api.protocol_ratio(id)).await?,
        ip_blocks: call(timeout, api.new_ip_blocks(id)).await?,
    };
    Ok(mapping::map_resource(resource, &telemetry, at)?)
}
