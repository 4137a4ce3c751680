//! Typed representations of the appliance's API responses.
//!
//! The management API hands back loosely-typed nested objects; the
//! adapter converts them into these entities at the boundary, so the
//! rest of the pipeline never sees raw JSON. Closed-set enumerations
//! (`TrafficSide`, `AnomalyColor`, `AnomalyState`) reject out-of-domain
//! raw values with a schema violation instead of coercing them.

use crate::common::error::ApiError;

/// API server version and operating mode (`client`/`admin`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiVersion {
    pub version: String,
    pub mode: String,
}

/// A protected entity under DDoS mitigation, from `client_resource_list`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resource {
    pub id: u64,
    pub name: String,
    pub group: String,
    /// Internal address ranges, pre-rendered by the appliance
    /// (e.g. `1.1.1.2-1.1.1.4, 1.1.1.7 . . . (+12)`).
    pub internal_ip: String,
    /// External ranges; the appliance may return nil.
    pub external_ip: Option<String>,
    /// Traffic redirection method (`bgp`/`dns`).
    pub redirection_method: String,
}

/// Which side of the scrubbing pipeline a measurement was taken on.
///
/// The API encodes this as an integer line type: `2` is traffic after
/// cleaning, `0` is traffic as it arrives. No other value is legal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TrafficSide {
    Clean,
    Dirty,
}

impl TrafficSide {
    pub fn from_raw(raw: i64) -> Result<Self, ApiError> {
        match raw {
            2 => Ok(Self::Clean),
            0 => Ok(Self::Dirty),
            other => Err(ApiError::schema("parameter_data.type", other)),
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Clean => "clean",
            Self::Dirty => "dirty",
        }
    }
}

/// Anomaly severity color. The upstream documentation names green (0),
/// yellow (1) and red (2), but only 0 and 2 are ever observed in
/// practice; whether 1 is a legitimately unused value or an encoding
/// gap is unresolved upstream, so anything outside {0, 2} is treated as
/// a schema violation rather than guessed at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AnomalyColor {
    Green,
    Red,
}

impl AnomalyColor {
    pub fn from_raw(raw: i64) -> Result<Self, ApiError> {
        match raw {
            0 => Ok(Self::Green),
            2 => Ok(Self::Red),
            other => Err(ApiError::schema("anomaly.color", other)),
        }
    }

    /// Exported label value: the raw numeric code, as the original
    /// exporter emitted it.
    #[must_use]
    pub fn as_label(self) -> &'static str {
        match self {
            Self::Green => "0",
            Self::Red => "2",
        }
    }
}

/// Whether an anomaly is still ongoing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AnomalyState {
    Active,
    Recent,
}

impl AnomalyState {
    pub fn from_raw(raw: &str) -> Result<Self, ApiError> {
        match raw {
            "active" => Ok(Self::Active),
            "recent" => Ok(Self::Recent),
            other => Err(ApiError::schema("anomaly.state", other)),
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Recent => "recent",
        }
    }
}

/// One configured measured-parameter instance, from
/// `get_measured_parameter_list`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MeasuredParameter {
    pub id: u64,
    /// Stable English short name, the join key into the metric catalog
    /// (e.g. `Incoming traffic in bps`).
    pub short_name: String,
    /// Threshold crossing direction: `1` up, `-1` down.
    pub direction: i32,
}

/// One data point of a measured parameter, from
/// `get_measured_parameter_data`.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterPoint {
    /// Joins to [`MeasuredParameter::id`].
    pub unit_check_id: u64,
    /// Unix timestamp of the point.
    pub timestamp: i64,
    pub side: TrafficSide,
    /// The measured value; the appliance returns nil for gaps.
    pub value: Option<f64>,
    /// Detection profile at this point.
    pub threshold: f64,
    /// "Attention" level multiplier.
    pub mult1: f64,
    /// "Alarm" level multiplier.
    pub mult2: f64,
}

/// One detected anomaly, from `get_resource_anomaly_list`.
#[derive(Debug, Clone, PartialEq)]
pub struct Anomaly {
    pub id: u64,
    pub color: AnomalyColor,
    pub state: AnomalyState,
    /// Short name of the measured parameter the anomaly was detected on.
    pub parameter: String,
    /// Parameter value at the anomaly's peak.
    pub max_point_value: f64,
    /// Percent deviation from the detection profile at the peak.
    pub max_point_percentage: f64,
}

/// One active attack, from `attack_active_list`.
#[derive(Debug, Clone, PartialEq)]
pub struct Attack {
    pub attack_id: u64,
    pub attack_type: String,
    pub resource_id: u64,
    /// Peak incoming traffic since attack start, bits/s.
    pub max_bps: f64,
    /// Peak incoming traffic since attack start, packets/s.
    pub max_pps: f64,
    /// Peak HTTP request rate since attack start.
    pub max_rps: f64,
}

/// Share of inbound traffic originating from one country over the last
/// five minutes, from `get_resource_geo_ratio`.
#[derive(Debug, Clone, PartialEq)]
pub struct GeoRatio {
    pub country: String,
    pub value: f64,
}

/// Protocol share of clean traffic for one country-minute, from
/// `get_protocol_ratio`.
#[derive(Debug, Clone, PartialEq)]
pub struct ProtocolShare {
    pub protocol: String,
    pub value: f64,
}

/// Per-minute protocol breakdown point.
///
/// Timestamps are `YYYY-MM-DD hh:mm:ss` strings; that format orders
/// lexicographically, which is how "latest point" is chosen.
#[derive(Debug, Clone, PartialEq)]
pub struct ProtocolPoint {
    pub timestamp: String,
    pub shares: Vec<ProtocolShare>,
}

/// Newly blocked IP count for one minute, from
/// `get_resource_new_ip_blocks`.
#[derive(Debug, Clone, PartialEq)]
pub struct IpBlockPoint {
    pub timestamp: String,
    pub new_ip_blocks: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn traffic_side_accepts_only_declared_codes() {
        assert_eq!(TrafficSide::from_raw(2).unwrap(), TrafficSide::Clean);
        assert_eq!(TrafficSide::from_raw(0).unwrap(), TrafficSide::Dirty);
        assert!(matches!(
            TrafficSide::from_raw(1),
            Err(ApiError::Schema { .. })
        ));
        assert!(matches!(
            TrafficSide::from_raw(-1),
            Err(ApiError::Schema { .. })
        ));
    }

    #[test]
    fn color_one_is_a_schema_violation() {
        assert_eq!(AnomalyColor::from_raw(0).unwrap(), AnomalyColor::Green);
        assert_eq!(AnomalyColor::from_raw(2).unwrap(), AnomalyColor::Red);
        let err = AnomalyColor::from_raw(1).unwrap_err();
        assert!(err.to_string().contains("anomaly.color"), "got: {err}");
    }

    #[test]
    fn color_label_is_the_raw_code() {
        assert_eq!(AnomalyColor::Green.as_label(), "0");
        assert_eq!(AnomalyColor::Red.as_label(), "2");
    }

    #[test]
    fn anomaly_state_parsing() {
        assert_eq!(
            AnomalyState::from_raw("active").unwrap(),
            AnomalyState::Active
        );
        assert_eq!(
            AnomalyState::from_raw("recent").unwrap(),
            AnomalyState::Recent
        );
        assert!(AnomalyState::from_raw("finished").is_err());
    }

    #[test]
    fn protocol_timestamps_order_lexicographically() {
        let a = "2024-03-01 10:04:00";
        let b = "2024-03-01 10:05:00";
        assert!(a < b);
    }
}
