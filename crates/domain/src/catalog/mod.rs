//! Static metric catalog.
//!
//! Every series the exporter can emit is declared here, once, as a
//! `'static` descriptor. The measured-parameter grid (ten base
//! measurements, five derived series each) is generated from one
//! declarative table instead of fifty hand-written blocks; samples
//! reference descriptors by `&'static` pointer so the mapping layer can
//! never invent a series the catalog does not declare.

/// How a family's value behaves over time. The appliance only reports
/// instantaneous readings, so everything in the catalog is a gauge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Gauge,
    Counter,
}

impl ValueKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Gauge => "gauge",
            Self::Counter => "counter",
        }
    }
}

/// One metric family: name, help text and the exact label names every
/// sample of the family must carry.
#[derive(Debug)]
pub struct MetricDescriptor {
    pub name: &'static str,
    pub help: &'static str,
    pub value_kind: ValueKind,
    pub label_names: &'static [&'static str],
}

impl PartialEq for MetricDescriptor {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for MetricDescriptor {}

impl std::hash::Hash for MetricDescriptor {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.name.hash(state);
    }
}

/// The five derived series of one measured parameter, keyed by the
/// stable English `short_name` the appliance reports for it.
#[derive(Debug)]
pub struct ParameterFamily {
    pub short_name: &'static str,
    pub value: MetricDescriptor,
    pub direction: MetricDescriptor,
    pub threshold: MetricDescriptor,
    pub mult1: MetricDescriptor,
    pub mult2: MetricDescriptor,
}

impl ParameterFamily {
    /// Family members in exposition order.
    #[must_use]
    pub fn descriptors(&'static self) -> [&'static MetricDescriptor; 5] {
        [
            &self.value,
            &self.direction,
            &self.threshold,
            &self.mult1,
            &self.mult2,
        ]
    }
}

const PARAMETER_LABELS: &[&str] = &["resource", "type"];

macro_rules! parameter_families {
    ($({ $base:literal, $short:literal, $subject:literal, $unit:literal }),+ $(,)?) => {
        /// The measured-parameter grid: base measurement × derived series.
        pub static MEASURED_FAMILIES: &[ParameterFamily] = &[
            $(ParameterFamily {
                short_name: $short,
                value: MetricDescriptor {
                    name: concat!("kdp_", $base),
                    help: concat!($subject, ". ", $unit, "."),
                    value_kind: ValueKind::Gauge,
                    label_names: PARAMETER_LABELS,
                },
                direction: MetricDescriptor {
                    name: concat!("kdp_", $base, "_direction"),
                    help: concat!($subject, ". Direction."),
                    value_kind: ValueKind::Gauge,
                    label_names: PARAMETER_LABELS,
                },
                threshold: MetricDescriptor {
                    name: concat!("kdp_", $base, "_threshold"),
                    help: concat!($subject, ". Threshold."),
                    value_kind: ValueKind::Gauge,
                    label_names: PARAMETER_LABELS,
                },
                mult1: MetricDescriptor {
                    name: concat!("kdp_", $base, "_mult1"),
                    help: concat!($subject, ". Mult1."),
                    value_kind: ValueKind::Gauge,
                    label_names: PARAMETER_LABELS,
                },
                mult2: MetricDescriptor {
                    name: concat!("kdp_", $base, "_mult2"),
                    help: concat!($subject, ". Mult2."),
                    value_kind: ValueKind::Gauge,
                    label_names: PARAMETER_LABELS,
                },
            }),+
        ];
    };
}

parameter_families! {
    { "ip_rate", "Number of IPs",
      "Number of IP addresses", "IPs/min" },
    { "syn_packets", "SYN packets",
      "Number of incoming TCP packets with SYN flag", "pps" },
    { "syn_rating", "SYN rating",
      "SYN rating", "times" },
    { "incoming_traffic_bps", "Incoming traffic in bps",
      "Incoming traffic speed in bits per second", "bps" },
    { "incoming_traffic_pps", "Incoming traffic in pps",
      "Incoming traffic speed in packets per second", "pps" },
    { "outgoing_traffic_bps", "Outgoing traffic in bps",
      "Outgoing traffic speed in bits per second", "bps" },
    { "outgoing_traffic_pps", "Outgoing traffic in pps",
      "Outgoing traffic speed in packets per second", "pps" },
    { "incoming_icmp_traffic_pps", "Incoming ICMP traffic",
      "Incoming ICMP traffic speed in packets per second", "pps" },
    { "incoming_tcp_traffic_pps", "Incoming TCP traffic",
      "Incoming TCP traffic speed in packets per second", "pps" },
    { "http_hits_rate", "HTTP. Requests",
      "HTTP. Number of requests", "hits/sec" },
}

pub static API_VERSION: MetricDescriptor = MetricDescriptor {
    name: "kdp_api_version",
    help: "Version of KDP API",
    value_kind: ValueKind::Gauge,
    label_names: &["version", "mode"],
};

pub static CLIENT_RESOURCE: MetricDescriptor = MetricDescriptor {
    name: "kdp_client_resource",
    help: "Client resources",
    value_kind: ValueKind::Gauge,
    label_names: &[
        "name",
        "group",
        "internal_ip",
        "external_ip",
        "redirection_method",
    ],
};

pub static RESOURCE_GEO_RATIO_PRC: MetricDescriptor = MetricDescriptor {
    name: "kdp_resource_geo_ratio_prc",
    help: "Requests by Country. Ratio.",
    value_kind: ValueKind::Gauge,
    label_names: &["name", "country"],
};

pub static RESOURCE_PROTOCOL_RATIO_PRC: MetricDescriptor = MetricDescriptor {
    name: "kdp_resource_protocol_ratio_prc",
    help: "Protocols in clean traffic. Ratio.",
    value_kind: ValueKind::Gauge,
    label_names: &["name", "protocol"],
};

pub static RESOURCE_NEW_IP_BLOCKS_COUNT: MetricDescriptor = MetricDescriptor {
    name: "kdp_resource_new_ip_blocks_count",
    help: "Count of new IP blocked. Count.",
    value_kind: ValueKind::Gauge,
    label_names: &["name"],
};

pub static RESOURCE_ANOMALY_MAX_VALUE: MetricDescriptor = MetricDescriptor {
    name: "kdp_resource_anomaly_max_value",
    help: "Anomaly. Value of measured parameter in a max point.",
    value_kind: ValueKind::Gauge,
    label_names: &["name", "parameter", "state", "color"],
};

pub static RESOURCE_ANOMALY_MAX_PERCENT: MetricDescriptor = MetricDescriptor {
    name: "kdp_resource_anomaly_max_percent",
    help: "Anomaly. Percent of deviation in measured parameter.",
    value_kind: ValueKind::Gauge,
    label_names: &["name", "parameter", "state", "color"],
};

pub static RESOURCE_ATTACK_INCOMING_TRAFFIC_BPS: MetricDescriptor = MetricDescriptor {
    name: "kdp_resource_attack_incoming_traffic_bps",
    help: "Anomaly. Incoming traffic during anomaly. bps.",
    value_kind: ValueKind::Gauge,
    label_names: &["name", "attack_id", "attack_type"],
};

pub static RESOURCE_ATTACK_INCOMING_TRAFFIC_PPS: MetricDescriptor = MetricDescriptor {
    name: "kdp_resource_attack_incoming_traffic_pps",
    help: "Anomaly. Incoming traffic during anomaly. pps.",
    value_kind: ValueKind::Gauge,
    label_names: &["name", "attack_id", "attack_type"],
};

pub static RESOURCE_ATTACK_HTTP_RATE: MetricDescriptor = MetricDescriptor {
    name: "kdp_resource_attack_http_rate",
    help: "Anomaly. HTTP requests rate during anomaly. hits/s.",
    value_kind: ValueKind::Gauge,
    label_names: &["name", "attack_id", "attack_type"],
};

/// Every descriptor in exposition order. `/metrics` emits families in
/// this order, which makes serialization deterministic.
#[must_use]
pub fn all() -> Vec<&'static MetricDescriptor> {
    let mut out: Vec<&'static MetricDescriptor> = vec![&API_VERSION, &CLIENT_RESOURCE];
    for family in MEASURED_FAMILIES {
        out.extend(family.descriptors());
    }
    out.extend([
        &RESOURCE_GEO_RATIO_PRC,
        &RESOURCE_PROTOCOL_RATIO_PRC,
        &RESOURCE_NEW_IP_BLOCKS_COUNT,
        &RESOURCE_ANOMALY_MAX_VALUE,
        &RESOURCE_ANOMALY_MAX_PERCENT,
        &RESOURCE_ATTACK_INCOMING_TRAFFIC_BPS,
        &RESOURCE_ATTACK_INCOMING_TRAFFIC_PPS,
        &RESOURCE_ATTACK_HTTP_RATE,
    ]);
    out
}

/// Find the family a measured parameter belongs to by its appliance
/// short name. Unknown short names get no metrics (parameters the
/// appliance adds later are ignored until declared here).
#[must_use]
pub fn family_for_short_name(short_name: &str) -> Option<&'static ParameterFamily> {
    MEASURED_FAMILIES.iter().find(|f| f.short_name == short_name)
}
