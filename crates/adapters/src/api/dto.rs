//! Wire representations of management API responses.
//!
//! The appliance is loose with scalar types: numeric fields arrive as
//! JSON numbers or as quoted strings depending on the endpoint.
//! [`RawNumber`] absorbs both; conversion into domain entities is where
//! closed-set values (line type, anomaly color, state) get validated.

use domain::common::error::ApiError;
use domain::telemetry::entity::{
    Anomaly, AnomalyColor, AnomalyState, ApiVersion, Attack, GeoRatio, IpBlockPoint,
    MeasuredParameter, ParameterPoint, ProtocolPoint, ProtocolShare, Resource, TrafficSide,
};
use serde::Deserialize;

/// A number that may arrive quoted.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RawNumber {
    Num(f64),
    Text(String),
}

impl RawNumber {
    pub fn to_f64(&self, field: &str) -> Result<f64, ApiError> {
        match self {
            Self::Num(n) => Ok(*n),
            Self::Text(s) => s
                .trim()
                .parse()
                .map_err(|_| ApiError::schema(field, s)),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ApiVersionDto {
    pub version: String,
    pub mode: String,
}

impl From<ApiVersionDto> for ApiVersion {
    fn from(dto: ApiVersionDto) -> Self {
        Self {
            version: dto.version,
            mode: dto.mode,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ResourceDto {
    pub id: u64,
    pub name: String,
    pub group: String,
    pub internal_ip: String,
    pub external_ip: Option<String>,
    pub redirection_method_name: String,
}

impl From<ResourceDto> for Resource {
    fn from(dto: ResourceDto) -> Self {
        Self {
            id: dto.id,
            name: dto.name,
            group: dto.group,
            internal_ip: dto.internal_ip,
            external_ip: dto.external_ip,
            redirection_method: dto.redirection_method_name,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ParameterDto {
    pub id: u64,
    pub short_name: String,
    pub direction: i32,
}

impl From<ParameterDto> for MeasuredParameter {
    fn from(dto: ParameterDto) -> Self {
        Self {
            id: dto.id,
            short_name: dto.short_name,
            direction: dto.direction,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ParameterPointDto {
    pub unit_check_id: u64,
    pub timestamp: i64,
    #[serde(rename = "type")]
    pub line_type: i64,
    pub value: Option<RawNumber>,
    pub threshold: RawNumber,
    pub mult1: RawNumber,
    pub mult2: RawNumber,
}

impl TryFrom<ParameterPointDto> for ParameterPoint {
    type Error = ApiError;

    fn try_from(dto: ParameterPointDto) -> Result<Self, ApiError> {
        Ok(Self {
            unit_check_id: dto.unit_check_id,
            timestamp: dto.timestamp,
            side: TrafficSide::from_raw(dto.line_type)?,
            value: dto
                .value
                .map(|v| v.to_f64("parameter_data.value"))
                .transpose()?,
            threshold: dto.threshold.to_f64("parameter_data.threshold")?,
            mult1: dto.mult1.to_f64("parameter_data.mult1")?,
            mult2: dto.mult2.to_f64("parameter_data.mult2")?,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct AnomalyDto {
    pub id: u64,
    pub color: i64,
    pub state: String,
    pub measured_parameter_short_name: String,
    pub max_point_value: RawNumber,
    pub max_point_percentage: RawNumber,
}

impl TryFrom<AnomalyDto> for Anomaly {
    type Error = ApiError;

    fn try_from(dto: AnomalyDto) -> Result<Self, ApiError> {
        Ok(Self {
            id: dto.id,
            color: AnomalyColor::from_raw(dto.color)?,
            state: AnomalyState::from_raw(&dto.state)?,
            parameter: dto.measured_parameter_short_name,
            max_point_value: dto.max_point_value.to_f64("anomaly.max_point_value")?,
            max_point_percentage: dto
                .max_point_percentage
                .to_f64("anomaly.max_point_percentage")?,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct AttackDto {
    pub attack_id: u64,
    pub attack_type: String,
    pub resource_id: u64,
    pub max_point_value_bps: RawNumber,
    pub max_point_value_pps: RawNumber,
    pub max_point_value_rps: RawNumber,
}

impl TryFrom<AttackDto> for Attack {
    type Error = ApiError;

    fn try_from(dto: AttackDto) -> Result<Self, ApiError> {
        Ok(Self {
            attack_id: dto.attack_id,
            attack_type: dto.attack_type,
            resource_id: dto.resource_id,
            max_bps: dto.max_point_value_bps.to_f64("attack.max_point_value_bps")?,
            max_pps: dto.max_point_value_pps.to_f64("attack.max_point_value_pps")?,
            max_rps: dto.max_point_value_rps.to_f64("attack.max_point_value_rps")?,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct GeoRatioDto {
    pub country: String,
    pub value: RawNumber,
}

impl TryFrom<GeoRatioDto> for GeoRatio {
    type Error = ApiError;

    fn try_from(dto: GeoRatioDto) -> Result<Self, ApiError> {
        Ok(Self {
            value: dto.value.to_f64("geo_ratio.value")?,
            country: dto.country,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct ProtocolElementDto {
    pub protocol: String,
    pub value: RawNumber,
}

#[derive(Debug, Deserialize)]
pub struct ProtocolPointDto {
    pub timestamp: String,
    pub elements: Vec<ProtocolElementDto>,
}

impl TryFrom<ProtocolPointDto> for ProtocolPoint {
    type Error = ApiError;

    fn try_from(dto: ProtocolPointDto) -> Result<Self, ApiError> {
        let shares = dto
            .elements
            .into_iter()
            .map(|e| {
                Ok(ProtocolShare {
                    value: e.value.to_f64("protocol_ratio.value")?,
                    protocol: e.protocol,
                })
            })
            .collect::<Result<Vec<_>, ApiError>>()?;
        Ok(Self {
            timestamp: dto.timestamp,
            shares,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct IpBlockPointDto {
    pub timestamp: String,
    pub new_ip_blocks: RawNumber,
}

impl TryFrom<IpBlockPointDto> for IpBlockPoint {
    type Error = ApiError;

    fn try_from(dto: IpBlockPointDto) -> Result<Self, ApiError> {
        Ok(Self {
            new_ip_blocks: dto.new_ip_blocks.to_f64("new_ip_blocks.new_ip_blocks")?,
            timestamp: dto.timestamp,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_number_accepts_both_encodings() {
        let quoted: RawNumber = serde_json::from_str(r#""42.5""#).unwrap();
        assert_eq!(quoted.to_f64("f").unwrap(), 42.5);
        let bare: RawNumber = serde_json::from_str("42.5").unwrap();
        assert_eq!(bare.to_f64("f").unwrap(), 42.5);
    }

    #[test]
    fn raw_number_rejects_garbage_with_the_raw_value() {
        let bad: RawNumber = serde_json::from_str(r#""n/a""#).unwrap();
        let err = bad.to_f64("geo_ratio.value").unwrap_err();
        assert!(err.to_string().contains("n/a"));
    }

    #[test]
    fn parameter_point_validates_the_line_type() {
        let json = r#"{
            "unit_check_id": 7, "timestamp": 1700000000, "type": 1,
            "value": "10", "threshold": "100", "mult1": "1.5", "mult2": "3"
        }"#;
        let dto: ParameterPointDto = serde_json::from_str(json).unwrap();
        let err = ParameterPoint::try_from(dto).unwrap_err();
        assert!(matches!(err, ApiError::Schema { .. }));
    }

    #[test]
    fn parameter_point_keeps_nil_values() {
        let json = r#"{
            "unit_check_id": 7, "timestamp": 1700000000, "type": 2,
            "value": null, "threshold": 100, "mult1": 1.5, "mult2": 3
        }"#;
        let dto: ParameterPointDto = serde_json::from_str(json).unwrap();
        let point = ParameterPoint::try_from(dto).unwrap();
        assert_eq!(point.side, TrafficSide::Clean);
        assert!(point.value.is_none());
    }

    #[test]
    fn anomaly_color_outside_the_closed_set_fails_conversion() {
        let json = r#"{
            "id": 5, "color": 1, "state": "active",
            "measured_parameter_short_name": "SYN packets",
            "max_point_value": "4000", "max_point_percentage": "150"
        }"#;
        let dto: AnomalyDto = serde_json::from_str(json).unwrap();
        let err = Anomaly::try_from(dto).unwrap_err();
        assert!(err.to_string().contains("anomaly.color"));
    }

    #[test]
    fn resource_dto_maps_redirection_method() {
        let json = r#"{
            "id": 3, "name": "web", "group": "prod",
            "internal_ip": "1.1.1.2-1.1.1.4, 1.1.1.7 . . . (+12)",
            "external_ip": null, "redirection_method_name": "bgp"
        }"#;
        let dto: ResourceDto = serde_json::from_str(json).unwrap();
        let resource = Resource::from(dto);
        assert_eq!(resource.redirection_method, "bgp");
        assert!(resource.external_ip.is_none());
    }
}
