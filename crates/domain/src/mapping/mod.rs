//! Pure mapping from appliance telemetry to snapshot samples.
//!
//! One polling cycle hands each resource's raw telemetry groups to
//! [`map_resource`], which joins, aggregates and labels them against
//! the catalog. No I/O here; schema validation already happened at the
//! adapter boundary, so these functions only shape valid entities.
//!
//! The appliance reports every time point inside the query window.
//! A snapshot holds at most one sample per series, so windows collapse:
//! the latest point wins for measured parameters, protocol ratios and
//! IP-block counts, and anomaly peaks collapse to the maximum per
//! label set.

use std::collections::BTreeMap;
use std::time::SystemTime;

use crate::catalog::{self, ParameterFamily};
use crate::snapshot::{Sample, SnapshotError};
use crate::telemetry::entity::{
    Anomaly, ApiVersion, Attack, GeoRatio, IpBlockPoint, MeasuredParameter, ParameterPoint,
    ProtocolPoint, Resource, TrafficSide,
};

/// Everything fetched for one resource in one cycle.
#[derive(Debug, Clone, Default)]
pub struct ResourceTelemetry {
    pub parameters: Vec<MeasuredParameter>,
    pub points: Vec<ParameterPoint>,
    pub anomalies: Vec<Anomaly>,
    pub attacks: Vec<Attack>,
    pub geo: Vec<GeoRatio>,
    pub protocol: Vec<ProtocolPoint>,
    pub ip_blocks: Vec<IpBlockPoint>,
}

/// The cycle-level API info sample, value fixed at 1.
pub fn map_api_version(v: &ApiVersion, at: SystemTime) -> Result<Sample, SnapshotError> {
    Sample::new(
        &catalog::API_VERSION,
        vec![v.version.clone(), v.mode.clone()],
        1.0,
        at,
    )
}

/// The inventory info sample for one resource, value fixed at 1.
pub fn map_resource_info(r: &Resource, at: SystemTime) -> Result<Sample, SnapshotError> {
    Sample::new(
        &catalog::CLIENT_RESOURCE,
        vec![
            r.name.clone(),
            r.group.clone(),
            r.internal_ip.clone(),
            r.external_ip.clone().unwrap_or_default(),
            r.redirection_method.clone(),
        ],
        1.0,
        at,
    )
}

/// Maps one resource's telemetry into samples. All-or-nothing: any
/// error means the caller degrades the resource and keeps none of its
/// samples.
pub fn map_resource(
    resource: &Resource,
    telemetry: &ResourceTelemetry,
    at: SystemTime,
) -> Result<Vec<Sample>, SnapshotError> {
    let mut out = Vec::new();
    out.push(map_resource_info(resource, at)?);
    map_measured_parameters(resource, telemetry, at, &mut out)?;
    map_geo_ratio(resource, &telemetry.geo, at, &mut out)?;
    map_protocol_ratio(resource, &telemetry.protocol, at, &mut out)?;
    map_ip_blocks(resource, &telemetry.ip_blocks, at, &mut out)?;
    map_anomalies(resource, &telemetry.anomalies, at, &mut out)?;
    map_attacks(resource, &telemetry.attacks, at, &mut out)?;
    Ok(out)
}

fn map_measured_parameters(
    resource: &Resource,
    telemetry: &ResourceTelemetry,
    at: SystemTime,
    out: &mut Vec<Sample>,
) -> Result<(), SnapshotError> {
    // Latest point per (family, traffic side), joined through
    // unit_check_id. Points with a nil value are gaps and are skipped.
    let mut latest: BTreeMap<(usize, TrafficSide), (i32, &ParameterPoint)> = BTreeMap::new();
    for param in &telemetry.parameters {
        let Some(family_idx) = family_index(&param.short_name) else {
            // Parameters without a declared family are ignored, as the
            // original exporter did.
            continue;
        };
        for point in &telemetry.points {
            if point.unit_check_id != param.id || point.value.is_none() {
                continue;
            }
            let key = (family_idx, point.side);
            let newer = latest
                .get(&key)
                .is_none_or(|(_, held)| point.timestamp > held.timestamp);
            if newer {
                latest.insert(key, (param.direction, point));
            }
        }
    }

    for ((family_idx, side), (direction, point)) in latest {
        let family: &'static ParameterFamily = &catalog::MEASURED_FAMILIES[family_idx];
        let labels = || vec![resource.name.clone(), side.as_str().to_string()];
        // `value.is_none()` points were filtered above.
        let value = point.value.unwrap_or_default();
        out.push(Sample::new(&family.value, labels(), value, at)?);
        out.push(Sample::new(
            &family.direction,
            labels(),
            f64::from(direction),
            at,
        )?);
        out.push(Sample::new(&family.threshold, labels(), point.threshold, at)?);
        out.push(Sample::new(&family.mult1, labels(), point.mult1, at)?);
        out.push(Sample::new(&family.mult2, labels(), point.mult2, at)?);
    }
    Ok(())
}

fn family_index(short_name: &str) -> Option<usize> {
    catalog::MEASURED_FAMILIES
        .iter()
        .position(|f| f.short_name == short_name)
}

fn map_geo_ratio(
    resource: &Resource,
    geo: &[GeoRatio],
    at: SystemTime,
    out: &mut Vec<Sample>,
) -> Result<(), SnapshotError> {
    // Last entry wins should the appliance repeat a country.
    let mut by_country: BTreeMap<&str, f64> = BTreeMap::new();
    for entry in geo {
        by_country.insert(&entry.country, entry.value);
    }
    for (country, value) in by_country {
        out.push(Sample::new(
            &catalog::RESOURCE_GEO_RATIO_PRC,
            vec![resource.name.clone(), country.to_string()],
            value,
            at,
        )?);
    }
    Ok(())
}

fn map_protocol_ratio(
    resource: &Resource,
    points: &[ProtocolPoint],
    at: SystemTime,
    out: &mut Vec<Sample>,
) -> Result<(), SnapshotError> {
    // Timestamps are 'YYYY-MM-DD hh:mm:ss', so lexicographic max is the
    // newest minute.
    let Some(point) = points.iter().max_by(|a, b| a.timestamp.cmp(&b.timestamp)) else {
        return Ok(());
    };
    let mut by_protocol: BTreeMap<&str, f64> = BTreeMap::new();
    for share in &point.shares {
        by_protocol.insert(&share.protocol, share.value);
    }
    for (protocol, value) in by_protocol {
        out.push(Sample::new(
            &catalog::RESOURCE_PROTOCOL_RATIO_PRC,
            vec![resource.name.clone(), protocol.to_string()],
            value,
            at,
        )?);
    }
    Ok(())
}

fn map_ip_blocks(
    resource: &Resource,
    points: &[IpBlockPoint],
    at: SystemTime,
    out: &mut Vec<Sample>,
) -> Result<(), SnapshotError> {
    let Some(point) = points.iter().max_by(|a, b| a.timestamp.cmp(&b.timestamp)) else {
        return Ok(());
    };
    out.push(Sample::new(
        &catalog::RESOURCE_NEW_IP_BLOCKS_COUNT,
        vec![resource.name.clone()],
        point.new_ip_blocks,
        at,
    )?);
    Ok(())
}

fn map_anomalies(
    resource: &Resource,
    anomalies: &[Anomaly],
    at: SystemTime,
    out: &mut Vec<Sample>,
) -> Result<(), SnapshotError> {
    // Two anomalies of one (parameter, state, color) collapse to the
    // worse peak.
    let mut peaks: BTreeMap<(&str, &str, &str), (f64, f64)> = BTreeMap::new();
    for anomaly in anomalies {
        let key = (
            anomaly.parameter.as_str(),
            anomaly.state.as_str(),
            anomaly.color.as_label(),
        );
        let entry = peaks
            .entry(key)
            .or_insert((f64::NEG_INFINITY, f64::NEG_INFINITY));
        entry.0 = entry.0.max(anomaly.max_point_value);
        entry.1 = entry.1.max(anomaly.max_point_percentage);
    }
    for ((parameter, state, color), (max_value, max_percent)) in peaks {
        let labels = || {
            vec![
                resource.name.clone(),
                parameter.to_string(),
                state.to_string(),
                color.to_string(),
            ]
        };
        out.push(Sample::new(
            &catalog::RESOURCE_ANOMALY_MAX_VALUE,
            labels(),
            max_value,
            at,
        )?);
        out.push(Sample::new(
            &catalog::RESOURCE_ANOMALY_MAX_PERCENT,
            labels(),
            max_percent,
            at,
        )?);
    }
    Ok(())
}

fn map_attacks(
    resource: &Resource,
    attacks: &[Attack],
    at: SystemTime,
    out: &mut Vec<Sample>,
) -> Result<(), SnapshotError> {
    for attack in attacks {
        let labels = || {
            vec![
                resource.name.clone(),
                attack.attack_id.to_string(),
                attack.attack_type.clone(),
            ]
        };
        out.push(Sample::new(
            &catalog::RESOURCE_ATTACK_INCOMING_TRAFFIC_BPS,
            labels(),
            attack.max_bps,
            at,
        )?);
        out.push(Sample::new(
            &catalog::RESOURCE_ATTACK_INCOMING_TRAFFIC_PPS,
            labels(),
            attack.max_pps,
            at,
        )?);
        out.push(Sample::new(
            &catalog::RESOURCE_ATTACK_HTTP_RATE,
            labels(),
            attack.max_rps,
            at,
        )?);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::telemetry::entity::{AnomalyColor, AnomalyState, ProtocolShare};

    fn resource() -> Resource {
        Resource {
            id: 42,
            name: "web".to_string(),
            group: "prod".to_string(),
            internal_ip: "10.0.0.1-10.0.0.4".to_string(),
            external_ip: None,
            redirection_method: "bgp".to_string(),
        }
    }

    fn find<'a>(samples: &'a [Sample], metric: &str, labels: &[&str]) -> Option<&'a Sample> {
        samples.iter().find(|s| {
            s.descriptor.name == metric
                && s.labels.values().iter().map(String::as_str).eq(labels.iter().copied())
        })
    }

    fn point(id: u64, ts: i64, side: TrafficSide, value: Option<f64>) -> ParameterPoint {
        ParameterPoint {
            unit_check_id: id,
            timestamp: ts,
            side,
            value,
            threshold: 100.0,
            mult1: 1.5,
            mult2: 3.0,
        }
    }

    #[test]
    fn latest_point_wins_per_side() {
        let telemetry = ResourceTelemetry {
            parameters: vec![MeasuredParameter {
                id: 7,
                short_name: "Incoming traffic in bps".to_string(),
                direction: 1,
            }],
            points: vec![
                point(7, 100, TrafficSide::Clean, Some(11_000.0)),
                point(7, 160, TrafficSide::Clean, Some(12_345.0)),
                point(7, 160, TrafficSide::Dirty, Some(99_000.0)),
            ],
            ..Default::default()
        };
        let samples = map_resource(&resource(), &telemetry, SystemTime::UNIX_EPOCH).unwrap();

        let clean = find(&samples, "kdp_incoming_traffic_bps", &["web", "clean"]).unwrap();
        assert_eq!(clean.value, 12_345.0);
        let dirty = find(&samples, "kdp_incoming_traffic_bps", &["web", "dirty"]).unwrap();
        assert_eq!(dirty.value, 99_000.0);

        // All five derived series materialize for each side.
        for suffix in ["", "_direction", "_threshold", "_mult1", "_mult2"] {
            let name = format!("kdp_incoming_traffic_bps{suffix}");
            assert!(find(&samples, &name, &["web", "clean"]).is_some(), "{name}");
        }
        let dir = find(&samples, "kdp_incoming_traffic_bps_direction", &["web", "clean"]).unwrap();
        assert_eq!(dir.value, 1.0);
    }

    #[test]
    fn nil_value_points_are_gaps() {
        let telemetry = ResourceTelemetry {
            parameters: vec![MeasuredParameter {
                id: 7,
                short_name: "SYN packets".to_string(),
                direction: 1,
            }],
            points: vec![
                point(7, 100, TrafficSide::Clean, Some(500.0)),
                point(7, 160, TrafficSide::Clean, None),
            ],
            ..Default::default()
        };
        let samples = map_resource(&resource(), &telemetry, SystemTime::UNIX_EPOCH).unwrap();
        // The newer gap does not shadow the older real reading.
        let s = find(&samples, "kdp_syn_packets", &["web", "clean"]).unwrap();
        assert_eq!(s.value, 500.0);
    }

    #[test]
    fn undeclared_parameters_are_ignored() {
        let telemetry = ResourceTelemetry {
            parameters: vec![MeasuredParameter {
                id: 9,
                short_name: "DNS amplification".to_string(),
                direction: 1,
            }],
            points: vec![point(9, 100, TrafficSide::Clean, Some(5.0))],
            ..Default::default()
        };
        let samples = map_resource(&resource(), &telemetry, SystemTime::UNIX_EPOCH).unwrap();
        // Only the inventory info sample remains.
        assert_eq!(samples.len(), 1);
        assert_eq!(samples[0].descriptor.name, "kdp_client_resource");
    }

    #[test]
    fn anomaly_peaks_collapse_to_the_maximum() {
        let anomaly = |value: f64, percent: f64| Anomaly {
            id: 1,
            color: AnomalyColor::Red,
            state: AnomalyState::Active,
            parameter: "SYN packets".to_string(),
            max_point_value: value,
            max_point_percentage: percent,
        };
        let telemetry = ResourceTelemetry {
            anomalies: vec![anomaly(1_000.0, 150.0), anomaly(4_000.0, 90.0)],
            ..Default::default()
        };
        let samples = map_resource(&resource(), &telemetry, SystemTime::UNIX_EPOCH).unwrap();

        let labels = ["web", "SYN packets", "active", "2"];
        let value = find(&samples, "kdp_resource_anomaly_max_value", &labels).unwrap();
        assert_eq!(value.value, 4_000.0);
        let percent = find(&samples, "kdp_resource_anomaly_max_percent", &labels).unwrap();
        assert_eq!(percent.value, 150.0);
    }

    #[test]
    fn attack_http_rate_uses_request_rate() {
        let telemetry = ResourceTelemetry {
            attacks: vec![Attack {
                attack_id: 314,
                attack_type: "SYN flood".to_string(),
                resource_id: 42,
                max_bps: 1e9,
                max_pps: 2e6,
                max_rps: 50_000.0,
            }],
            ..Default::default()
        };
        let samples = map_resource(&resource(), &telemetry, SystemTime::UNIX_EPOCH).unwrap();

        let labels = ["web", "314", "SYN flood"];
        let rate = find(&samples, "kdp_resource_attack_http_rate", &labels).unwrap();
        assert_eq!(rate.value, 50_000.0);
        let bps = find(&samples, "kdp_resource_attack_incoming_traffic_bps", &labels).unwrap();
        assert_eq!(bps.value, 1e9);
    }

    #[test]
    fn protocol_and_ip_blocks_use_the_newest_minute() {
        let telemetry = ResourceTelemetry {
            protocol: vec![
                ProtocolPoint {
                    timestamp: "2024-03-01 10:04:00".to_string(),
                    shares: vec![ProtocolShare {
                        protocol: "udp".to_string(),
                        value: 90.0,
                    }],
                },
                ProtocolPoint {
                    timestamp: "2024-03-01 10:05:00".to_string(),
                    shares: vec![ProtocolShare {
                        protocol: "tcp".to_string(),
                        value: 80.0,
                    }],
                },
            ],
            ip_blocks: vec![
                IpBlockPoint {
                    timestamp: "2024-03-01 10:04:00".to_string(),
                    new_ip_blocks: 3.0,
                },
                IpBlockPoint {
                    timestamp: "2024-03-01 10:05:00".to_string(),
                    new_ip_blocks: 8.0,
                },
            ],
            ..Default::default()
        };
        let samples = map_resource(&resource(), &telemetry, SystemTime::UNIX_EPOCH).unwrap();

        assert!(find(&samples, "kdp_resource_protocol_ratio_prc", &["web", "tcp"]).is_some());
        assert!(find(&samples, "kdp_resource_protocol_ratio_prc", &["web", "udp"]).is_none());
        let blocks = find(&samples, "kdp_resource_new_ip_blocks_count", &["web"]).unwrap();
        assert_eq!(blocks.value, 8.0);
    }

    #[test]
    fn api_version_sample_is_an_info_gauge() {
        let v = ApiVersion {
            version: "2.3.1".to_string(),
            mode: "client".to_string(),
        };
        let s = map_api_version(&v, SystemTime::UNIX_EPOCH).unwrap();
        assert_eq!(s.descriptor.name, "kdp_api_version");
        assert_eq!(s.value, 1.0);
        assert_eq!(s.labels.values(), ["2.3.1", "client"]);
    }

    #[test]
    fn every_sample_matches_its_descriptor_arity() {
        let telemetry = ResourceTelemetry {
            geo: vec![GeoRatio {
                country: "Germany".to_string(),
                value: 42.5,
            }],
            ..Default::default()
        };
        let samples = map_resource(&resource(), &telemetry, SystemTime::UNIX_EPOCH).unwrap();
        for s in &samples {
            assert_eq!(s.labels.values().len(), s.descriptor.label_names.len());
        }
    }
}
