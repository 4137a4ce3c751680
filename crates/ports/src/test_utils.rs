//! Shared test doubles for the appliance API port.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use domain::common::error::ApiError;
use domain::mapping::ResourceTelemetry;
use domain::telemetry::entity::{
    Anomaly, ApiVersion, Attack, GeoRatio, IpBlockPoint, MeasuredParameter, ParameterPoint,
    ProtocolPoint, Resource,
};

use crate::secondary::appliance_api::{ApiFuture, ApplianceApi};

/// One port operation, for scripting failures and delays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ApiOp {
    Ping,
    ApiVersion,
    ResourceList,
    ParameterList,
    ParameterData,
    AnomalyList,
    AttackList,
    GeoRatio,
    ProtocolRatio,
    NewIpBlocks,
}

type CallKey = (ApiOp, Option<u64>);

/// Scripted in-memory appliance.
///
/// Seed it with resources and their telemetry, then inject failures or
/// delays per (operation, resource). Every call is recorded for
/// assertions. Delays run on tokio time, so tests can drive them with
/// `tokio::time::pause`.
pub struct MockAppliance {
    version: ApiVersion,
    resources: Vec<Resource>,
    telemetry: HashMap<u64, ResourceTelemetry>,
    failures: HashMap<CallKey, ApiError>,
    delays: HashMap<CallKey, Duration>,
    calls: Mutex<Vec<CallKey>>,
}

impl Default for MockAppliance {
    fn default() -> Self {
        Self::new()
    }
}

impl MockAppliance {
    #[must_use]
    pub fn new() -> Self {
        Self {
            version: ApiVersion {
                version: "2.3.1".to_string(),
                mode: "client".to_string(),
            },
            resources: Vec::new(),
            telemetry: HashMap::new(),
            failures: HashMap::new(),
            delays: HashMap::new(),
            calls: Mutex::new(Vec::new()),
        }
    }

    #[must_use]
    pub fn with_resource(mut self, resource: Resource, telemetry: ResourceTelemetry) -> Self {
        self.telemetry.insert(resource.id, telemetry);
        self.resources.push(resource);
        self
    }

    /// Fails every call of `op` (scoped to one resource if given).
    #[must_use]
    pub fn with_failure(mut self, op: ApiOp, resource_id: Option<u64>, error: ApiError) -> Self {
        self.failures.insert((op, resource_id), error);
        self
    }

    /// Delays every call of `op` before responding.
    #[must_use]
    pub fn with_delay(mut self, op: ApiOp, resource_id: Option<u64>, delay: Duration) -> Self {
        self.delays.insert((op, resource_id), delay);
        self
    }

    #[must_use]
    pub fn calls(&self) -> Vec<CallKey> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    async fn gate(&self, op: ApiOp, resource_id: Option<u64>) -> Result<(), ApiError> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push((op, resource_id));
        }
        if let Some(delay) = self.delays.get(&(op, resource_id)) {
            tokio::time::sleep(*delay).await;
        }
        match self.failures.get(&(op, resource_id)) {
            Some(error) => Err(error.clone()),
            None => Ok(()),
        }
    }

    fn telemetry_of(&self, resource_id: u64) -> Result<&ResourceTelemetry, ApiError> {
        self.telemetry
            .get(&resource_id)
            .ok_or(ApiError::NotFound { resource_id })
    }
}

impl ApplianceApi for MockAppliance {
    fn ping(&self) -> ApiFuture<'_, ()> {
        Box::pin(async move { self.gate(ApiOp::Ping, None).await })
    }

    fn api_version(&self) -> ApiFuture<'_, ApiVersion> {
        Box::pin(async move {
            self.gate(ApiOp::ApiVersion, None).await?;
            Ok(self.version.clone())
        })
    }

    fn resource_list(&self) -> ApiFuture<'_, Vec<Resource>> {
        Box::pin(async move {
            self.gate(ApiOp::ResourceList, None).await?;
            Ok(self.resources.clone())
        })
    }

    fn parameter_list(&self, resource_id: u64) -> ApiFuture<'_, Vec<MeasuredParameter>> {
        Box::pin(async move {
            self.gate(ApiOp::ParameterList, Some(resource_id)).await?;
            Ok(self.telemetry_of(resource_id)?.parameters.clone())
        })
    }

    fn parameter_data(&self, resource_id: u64) -> ApiFuture<'_, Vec<ParameterPoint>> {
        Box::pin(async move {
            self.gate(ApiOp::ParameterData, Some(resource_id)).await?;
            Ok(self.telemetry_of(resource_id)?.points.clone())
        })
    }

    fn anomaly_list(&self, resource_id: u64) -> ApiFuture<'_, Vec<Anomaly>> {
        Box::pin(async move {
            self.gate(ApiOp::AnomalyList, Some(resource_id)).await?;
            Ok(self.telemetry_of(resource_id)?.anomalies.clone())
        })
    }

    fn attack_list(&self, resource_id: u64) -> ApiFuture<'_, Vec<Attack>> {
        Box::pin(async move {
            self.gate(ApiOp::AttackList, Some(resource_id)).await?;
            Ok(self.telemetry_of(resource_id)?.attacks.clone())
        })
    }

    fn geo_ratio(&self, resource_id: u64) -> ApiFuture<'_, Vec<GeoRatio>> {
        Box::pin(async move {
            self.gate(ApiOp::GeoRatio, Some(resource_id)).await?;
            Ok(self.telemetry_of(resource_id)?.geo.clone())
        })
    }

    fn protocol_ratio(&self, resource_id: u64) -> ApiFuture<'_, Vec<ProtocolPoint>> {
        Box::pin(async move {
            self.gate(ApiOp::ProtocolRatio, Some(resource_id)).await?;
            Ok(self.telemetry_of(resource_id)?.protocol.clone())
        })
    }

    fn new_ip_blocks(&self, resource_id: u64) -> ApiFuture<'_, Vec<IpBlockPoint>> {
        Box::pin(async move {
            self.gate(ApiOp::NewIpBlocks, Some(resource_id)).await?;
            Ok(self.telemetry_of(resource_id)?.ip_blocks.clone())
        })
    }
}

/// A minimal resource for tests.
#[must_use]
pub fn test_resource(id: u64, name: &str) -> Resource {
    Resource {
        id,
        name: name.to_string(),
        group: "default".to_string(),
        internal_ip: "10.0.0.1".to_string(),
        external_ip: None,
        redirection_method: "bgp".to_string(),
    }
}
