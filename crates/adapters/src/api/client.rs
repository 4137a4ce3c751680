//! HTTP adapter for the appliance management API.
//!
//! Speaks signed JSON over HTTP(S): one POST per method, the
//! `ClientAuth` block in the body, the method's simple arguments
//! concatenated in declaration order into the signature. Windowed
//! endpoints query the last five minutes. No retries here; the next
//! scheduled cycle is the retry.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use chrono::Utc;
use serde::Serialize;
use serde::de::DeserializeOwned;

use domain::common::error::ApiError;
use domain::telemetry::entity::{
    Anomaly, ApiVersion, Attack, GeoRatio, IpBlockPoint, MeasuredParameter, ParameterPoint,
    ProtocolPoint, Resource,
};
use ports::secondary::appliance_api::{ApiFuture, ApplianceApi};

use super::auth;
use super::dto::{
    AnomalyDto, ApiVersionDto, AttackDto, GeoRatioDto, IpBlockPointDto, ParameterDto,
    ParameterPointDto, ProtocolPointDto, ResourceDto,
};

/// Window queried by the per-minute endpoints.
const QUERY_WINDOW: Duration = Duration::from_secs(5 * 60);

/// Anomaly listing page size; the appliance caps at 1000.
const ANOMALY_LIST_LIMIT: u32 = 1000;

/// Safety net behind the collector's per-request timeouts.
const CLIENT_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone)]
pub struct KdpApiConfig {
    /// Base URL of the management API, e.g. `https://kdp.example.com/api`.
    pub url: String,
    pub client_id: u64,
    pub user_id: u64,
    pub secret_key: String,
    /// 10 for English, 77 for Russian. Metric label text follows it.
    pub locale_id: u32,
}

pub struct KdpApiClient {
    http: reqwest::Client,
    config: KdpApiConfig,
}

#[derive(Serialize)]
struct Envelope<'a, P: Serialize> {
    auth: &'a auth::ClientAuth,
    #[serde(flatten)]
    params: P,
}

#[derive(Serialize)]
struct NoParams {}

#[derive(Serialize)]
struct ClientScope {
    client_id: u64,
    locale_id: u32,
}

#[derive(Serialize)]
struct ResourceScope {
    client_id: u64,
    locale_id: u32,
    resource_id: u64,
}

#[derive(Serialize)]
struct ParameterDataScope {
    client_id: u64,
    resource_id: u64,
    start_time: String,
    end_time: String,
}

#[derive(Serialize)]
struct WindowScope {
    client_id: u64,
    locale_id: u32,
    resource_id: u64,
    start: String,
    end: String,
}

#[derive(Serialize)]
struct AnomalyScope {
    client_id: u64,
    locale_id: u32,
    resource_id: u64,
    start: String,
    end: String,
    limit: u32,
    offset: u32,
}

#[derive(Serialize)]
struct IpBlocksScope {
    client_id: u64,
    resource_id: u64,
    start_time: String,
    end_time: String,
}

impl KdpApiClient {
    pub fn new(config: KdpApiConfig) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .timeout(CLIENT_TIMEOUT)
            .user_agent(concat!("kdp-exporter/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ApiError::Transport(format!("HTTP client init failed: {e}")))?;
        Ok(Self { http, config })
    }

    /// For tests or advanced transport configuration.
    #[must_use]
    pub fn with_client(http: reqwest::Client, config: KdpApiConfig) -> Self {
        Self { http, config }
    }

    /// Current five-minute window as the appliance's
    /// `YYYY-MM-DD hh:mm:ss` UTC strings.
    fn window(&self) -> (String, String) {
        let end = Utc::now();
        let start = end
            - chrono::Duration::from_std(QUERY_WINDOW).unwrap_or(chrono::Duration::zero());
        let fmt = "%Y-%m-%d %H:%M:%S";
        (
            start.format(fmt).to_string(),
            end.format(fmt).to_string(),
        )
    }

    async fn call<P, T>(
        &self,
        method: &'static str,
        simple_args: String,
        params: P,
        resource_id: Option<u64>,
    ) -> Result<T, ApiError>
    where
        P: Serialize,
        T: DeserializeOwned,
    {
        let unix_time = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or_default();
        let auth = auth::client_auth(
            self.config.client_id,
            self.config.user_id,
            method,
            &simple_args,
            &self.config.secret_key,
            unix_time,
        );
        let url = format!("{}/{method}", self.config.url.trim_end_matches('/'));

        tracing::debug!(method, "calling appliance API");
        let response = self
            .http
            .post(&url)
            .json(&Envelope {
                auth: &auth,
                params,
            })
            .send()
            .await
            .map_err(|e| ApiError::Transport(format!("{method}: {e}")))?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::Auth(format!("{method} returned {status}: {body}")));
        }
        if status == reqwest::StatusCode::NOT_FOUND {
            if let Some(resource_id) = resource_id {
                return Err(ApiError::NotFound { resource_id });
            }
            return Err(ApiError::Transport(format!("{method} returned HTTP 404")));
        }
        if !status.is_success() {
            return Err(ApiError::Transport(format!(
                "{method} returned HTTP {status}"
            )));
        }

        response
            .json::<T>()
            .await
            .map_err(|e| ApiError::schema(method, e))
    }

    async fn do_ping(&self) -> Result<(), ApiError> {
        let result: i64 = self
            .call("ping", String::new(), NoParams {}, None)
            .await?;
        if result == 1 {
            Ok(())
        } else {
            Err(ApiError::Transport(format!(
                "ping returned {result}, appliance unavailable"
            )))
        }
    }

    async fn do_api_version(&self) -> Result<ApiVersion, ApiError> {
        let dto: ApiVersionDto = self
            .call("get_api_version", String::new(), NoParams {}, None)
            .await?;
        Ok(dto.into())
    }

    async fn do_resource_list(&self) -> Result<Vec<Resource>, ApiError> {
        let KdpApiConfig {
            client_id,
            locale_id,
            ..
        } = self.config;
        let dtos: Vec<ResourceDto> = self
            .call(
                "client_resource_list",
                format!("{client_id}{locale_id}"),
                ClientScope {
                    client_id,
                    locale_id,
                },
                None,
            )
            .await?;
        Ok(dtos.into_iter().map(Resource::from).collect())
    }

    async fn do_parameter_list(
        &self,
        resource_id: u64,
    ) -> Result<Vec<MeasuredParameter>, ApiError> {
        let KdpApiConfig {
            client_id,
            locale_id,
            ..
        } = self.config;
        let dtos: Vec<ParameterDto> = self
            .call(
                "get_measured_parameter_list",
                format!("{client_id}{locale_id}{resource_id}"),
                ResourceScope {
                    client_id,
                    locale_id,
                    resource_id,
                },
                Some(resource_id),
            )
            .await?;
        Ok(dtos.into_iter().map(MeasuredParameter::from).collect())
    }

    async fn do_parameter_data(&self, resource_id: u64) -> Result<Vec<ParameterPoint>, ApiError> {
        let client_id = self.config.client_id;
        let (start_time, end_time) = self.window();
        let dtos: Vec<ParameterPointDto> = self
            .call(
                "get_measured_parameter_data",
                format!("{client_id}{resource_id}{start_time}{end_time}"),
                ParameterDataScope {
                    client_id,
                    resource_id,
                    start_time,
                    end_time,
                },
                Some(resource_id),
            )
            .await?;
        dtos.into_iter().map(ParameterPoint::try_from).collect()
    }

    async fn do_anomaly_list(&self, resource_id: u64) -> Result<Vec<Anomaly>, ApiError> {
        let KdpApiConfig {
            client_id,
            locale_id,
            ..
        } = self.config;
        let (start, end) = self.window();
        let dtos: Vec<AnomalyDto> = self
            .call(
                "get_resource_anomaly_list",
                format!("{client_id}{locale_id}{resource_id}{start}{end}{ANOMALY_LIST_LIMIT}0"),
                AnomalyScope {
                    client_id,
                    locale_id,
                    resource_id,
                    start,
                    end,
                    limit: ANOMALY_LIST_LIMIT,
                    offset: 0,
                },
                Some(resource_id),
            )
            .await?;
        dtos.into_iter().map(Anomaly::try_from).collect()
    }

    async fn do_attack_list(&self, resource_id: u64) -> Result<Vec<Attack>, ApiError> {
        // The appliance only exposes a client-wide listing; filtering
        // per resource happens here so the port stays resource-scoped.
        let KdpApiConfig {
            client_id,
            locale_id,
            ..
        } = self.config;
        let dtos: Vec<AttackDto> = self
            .call(
                "attack_active_list",
                format!("{client_id}{locale_id}"),
                ClientScope {
                    client_id,
                    locale_id,
                },
                Some(resource_id),
            )
            .await?;
        let attacks = dtos
            .into_iter()
            .map(Attack::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(attacks
            .into_iter()
            .filter(|a| a.resource_id == resource_id)
            .collect())
    }

    async fn do_geo_ratio(&self, resource_id: u64) -> Result<Vec<GeoRatio>, ApiError> {
        let KdpApiConfig {
            client_id,
            locale_id,
            ..
        } = self.config;
        let dtos: Vec<GeoRatioDto> = self
            .call(
                "get_resource_geo_ratio",
                format!("{client_id}{locale_id}{resource_id}"),
                ResourceScope {
                    client_id,
                    locale_id,
                    resource_id,
                },
                Some(resource_id),
            )
            .await?;
        dtos.into_iter().map(GeoRatio::try_from).collect()
    }

    async fn do_protocol_ratio(&self, resource_id: u64) -> Result<Vec<ProtocolPoint>, ApiError> {
        let KdpApiConfig {
            client_id,
            locale_id,
            ..
        } = self.config;
        let (start, end) = self.window();
        let dtos: Vec<ProtocolPointDto> = self
            .call(
                "get_protocol_ratio",
                format!("{client_id}{locale_id}{resource_id}{start}{end}"),
                WindowScope {
                    client_id,
                    locale_id,
                    resource_id,
                    start,
                    end,
                },
                Some(resource_id),
            )
            .await?;
        dtos.into_iter().map(ProtocolPoint::try_from).collect()
    }

    async fn do_new_ip_blocks(&self, resource_id: u64) -> Result<Vec<IpBlockPoint>, ApiError> {
        let client_id = self.config.client_id;
        let (start_time, end_time) = self.window();
        let dtos: Vec<IpBlockPointDto> = self
            .call(
                "get_resource_new_ip_blocks",
                format!("{client_id}{resource_id}{start_time}{end_time}"),
                IpBlocksScope {
                    client_id,
                    resource_id,
                    start_time,
                    end_time,
                },
                Some(resource_id),
            )
            .await?;
        dtos.into_iter().map(IpBlockPoint::try_from).collect()
    }
}

impl ApplianceApi for KdpApiClient {
    fn ping(&self) -> ApiFuture<'_, ()> {
        Box::pin(self.do_ping())
    }

    fn api_version(&self) -> ApiFuture<'_, ApiVersion> {
        Box::pin(self.do_api_version())
    }

    fn resource_list(&self) -> ApiFuture<'_, Vec<Resource>> {
        Box::pin(self.do_resource_list())
    }

    fn parameter_list(&self, resource_id: u64) -> ApiFuture<'_, Vec<MeasuredParameter>> {
        Box::pin(self.do_parameter_list(resource_id))
    }

    fn parameter_data(&self, resource_id: u64) -> ApiFuture<'_, Vec<ParameterPoint>> {
        Box::pin(self.do_parameter_data(resource_id))
    }

    fn anomaly_list(&self, resource_id: u64) -> ApiFuture<'_, Vec<Anomaly>> {
        Box::pin(self.do_anomaly_list(resource_id))
    }

    fn attack_list(&self, resource_id: u64) -> ApiFuture<'_, Vec<Attack>> {
        Box::pin(self.do_attack_list(resource_id))
    }

    fn geo_ratio(&self, resource_id: u64) -> ApiFuture<'_, Vec<GeoRatio>> {
        Box::pin(self.do_geo_ratio(resource_id))
    }

    fn protocol_ratio(&self, resource_id: u64) -> ApiFuture<'_, Vec<ProtocolPoint>> {
        Box::pin(self.do_protocol_ratio(resource_id))
    }

    fn new_ip_blocks(&self, resource_id: u64) -> ApiFuture<'_, Vec<IpBlockPoint>> {
        Box::pin(self.do_new_ip_blocks(resource_id))
    }
}
