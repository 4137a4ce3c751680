use std::future::Future;
use std::pin::Pin;

use domain::common::error::ApiError;
use domain::telemetry::entity::{
    Anomaly, ApiVersion, Attack, GeoRatio, IpBlockPoint, MeasuredParameter, ParameterPoint,
    ProtocolPoint, Resource,
};

pub type ApiFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, ApiError>> + Send + 'a>>;

/// Secondary port for the appliance management API.
///
/// Uses `Pin<Box<dyn Future>>` return types (instead of RPITIT) so the
/// trait is dyn-compatible and can be shared as `Arc<dyn ApplianceApi>`.
///
/// Windowed operations (`parameter_data`, `anomaly_list`,
/// `protocol_ratio`, `new_ip_blocks`) query the last five minutes; the
/// window is a wire-level detail the adapter derives from its clock.
/// Callers bound each operation with their own timeout.
pub trait ApplianceApi: Send + Sync {
    /// Transport liveness probe. Advisory: the collector logs a failure
    /// and carries on.
    fn ping(&self) -> ApiFuture<'_, ()>;

    /// API server version and mode.
    fn api_version(&self) -> ApiFuture<'_, ApiVersion>;

    /// All resources of the configured client, in appliance order.
    fn resource_list(&self) -> ApiFuture<'_, Vec<Resource>>;

    /// Measured-parameter instances configured for one resource.
    fn parameter_list(&self, resource_id: u64) -> ApiFuture<'_, Vec<MeasuredParameter>>;

    /// Measured-parameter data points for one resource.
    fn parameter_data(&self, resource_id: u64) -> ApiFuture<'_, Vec<ParameterPoint>>;

    /// Anomalies detected on one resource.
    fn anomaly_list(&self, resource_id: u64) -> ApiFuture<'_, Vec<Anomaly>>;

    /// Active attacks on one resource.
    fn attack_list(&self, resource_id: u64) -> ApiFuture<'_, Vec<Attack>>;

    /// Inbound traffic share per origin country.
    fn geo_ratio(&self, resource_id: u64) -> ApiFuture<'_, Vec<GeoRatio>>;

    /// Per-minute protocol breakdown of clean traffic.
    fn protocol_ratio(&self, resource_id: u64) -> ApiFuture<'_, Vec<ProtocolPoint>>;

    /// Per-minute newly-blocked-IP counts.
    fn new_ip_blocks(&self, resource_id: u64) -> ApiFuture<'_, Vec<IpBlockPoint>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    struct DummyApi;
    impl ApplianceApi for DummyApi {
        fn ping(&self) -> ApiFuture<'_, ()> {
            Box::pin(async { Ok(()) })
        }
        fn api_version(&self) -> ApiFuture<'_, ApiVersion> {
            Box::pin(async {
                Ok(ApiVersion {
                    version: "0.0.0".to_string(),
                    mode: "client".to_string(),
                })
            })
        }
        fn resource_list(&self) -> ApiFuture<'_, Vec<Resource>> {
            Box::pin(async { Ok(vec![]) })
        }
        fn parameter_list(&self, _resource_id: u64) -> ApiFuture<'_, Vec<MeasuredParameter>> {
            Box::pin(async { Ok(vec![]) })
        }
        fn parameter_data(&self, _resource_id: u64) -> ApiFuture<'_, Vec<ParameterPoint>> {
            Box::pin(async { Ok(vec![]) })
        }
        fn anomaly_list(&self, _resource_id: u64) -> ApiFuture<'_, Vec<Anomaly>> {
            Box::pin(async { Ok(vec![]) })
        }
        fn attack_list(&self, _resource_id: u64) -> ApiFuture<'_, Vec<Attack>> {
            Box::pin(async { Ok(vec![]) })
        }
        fn geo_ratio(&self, _resource_id: u64) -> ApiFuture<'_, Vec<GeoRatio>> {
            Box::pin(async { Ok(vec![]) })
        }
        fn protocol_ratio(&self, _resource_id: u64) -> ApiFuture<'_, Vec<ProtocolPoint>> {
            Box::pin(async { Ok(vec![]) })
        }
        fn new_ip_blocks(&self, _resource_id: u64) -> ApiFuture<'_, Vec<IpBlockPoint>> {
            Box::pin(async { Ok(vec![]) })
        }
    }

    #[test]
    fn appliance_api_is_dyn_compatible() {
        let api: Box<dyn ApplianceApi> = Box::new(DummyApi);
        let _ = api;
    }
}
