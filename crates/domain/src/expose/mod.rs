//! Prometheus text exposition format 0.0.4.
//!
//! Serializes a snapshot deterministically: families appear in catalog
//! order, samples within a family are sorted by label values, and label
//! pairs are sorted by label name. The same snapshot always encodes to
//! identical bytes. Families with no samples are omitted entirely.

use std::collections::HashMap;

use crate::catalog;
use crate::snapshot::{Sample, Snapshot};

/// Content type to serve alongside the encoded body.
pub const CONTENT_TYPE: &str = "text/plain; version=0.0.4";

/// Encodes the snapshot's samples as text format 0.0.4.
#[must_use]
pub fn encode(snapshot: &Snapshot) -> String {
    let mut by_family: HashMap<&'static str, Vec<&Sample>> = HashMap::new();
    for sample in &snapshot.samples {
        by_family
            .entry(sample.descriptor.name)
            .or_default()
            .push(sample);
    }

    let mut out = String::new();
    for descriptor in catalog::all() {
        let Some(samples) = by_family.get_mut(descriptor.name) else {
            continue;
        };
        out.push_str("# HELP ");
        out.push_str(descriptor.name);
        out.push(' ');
        out.push_str(&escape_help(descriptor.help));
        out.push('\n');
        out.push_str("# TYPE ");
        out.push_str(descriptor.name);
        out.push(' ');
        out.push_str(descriptor.value_kind.as_str());
        out.push('\n');

        samples.sort_by(|a, b| a.labels.values().cmp(b.labels.values()));
        for sample in samples.iter() {
            write_sample_line(&mut out, sample);
        }
    }
    out
}

fn write_sample_line(out: &mut String, sample: &Sample) {
    out.push_str(sample.descriptor.name);
    out.push('{');

    // Pairs sorted by label name, independent of declaration order.
    let mut pairs: Vec<(&str, &str)> = sample
        .descriptor
        .label_names
        .iter()
        .copied()
        .zip(sample.labels.values().iter().map(String::as_str))
        .collect();
    pairs.sort_by_key(|(name, _)| *name);

    for (i, (name, value)) in pairs.iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        out.push_str(name);
        out.push_str("=\"");
        out.push_str(&escape_label_value(value));
        out.push('"');
    }
    out.push_str("} ");
    out.push_str(&format_value(sample.value));
    out.push('\n');
}

fn escape_label_value(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => escaped.push_str("\\\\"),
            '"' => escaped.push_str("\\\""),
            '\n' => escaped.push_str("\\n"),
            other => escaped.push(other),
        }
    }
    escaped
}

fn escape_help(help: &str) -> String {
    let mut escaped = String::with_capacity(help.len());
    for c in help.chars() {
        match c {
            '\\' => escaped.push_str("\\\\"),
            '\n' => escaped.push_str("\\n"),
            other => escaped.push(other),
        }
    }
    escaped
}

fn format_value(value: f64) -> String {
    if value == f64::INFINITY {
        "+Inf".to_string()
    } else if value == f64::NEG_INFINITY {
        "-Inf".to_string()
    } else if value.is_nan() {
        "NaN".to_string()
    } else {
        // Rust's f64 Display prints integral values without a trailing
        // `.0`, which matches the text format's canonical rendering.
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::SnapshotBuilder;
    use std::time::SystemTime;

    fn snapshot_with(samples: Vec<Sample>) -> Snapshot {
        let mut b = SnapshotBuilder::new(SystemTime::UNIX_EPOCH);
        b.extend(samples).unwrap();
        b.finish()
    }

    fn sample(descriptor: &'static catalog::MetricDescriptor, values: &[&str], v: f64) -> Sample {
        Sample::new(
            descriptor,
            values.iter().map(|s| s.to_string()).collect(),
            v,
            SystemTime::UNIX_EPOCH,
        )
        .unwrap()
    }

    #[test]
    fn families_with_no_samples_are_omitted() {
        let snap = snapshot_with(vec![sample(
            &catalog::RESOURCE_NEW_IP_BLOCKS_COUNT,
            &["web"],
            3.0,
        )]);
        let text = encode(&snap);
        assert_eq!(
            text,
            "# HELP kdp_resource_new_ip_blocks_count Count of new IP blocked. Count.\n\
             # TYPE kdp_resource_new_ip_blocks_count gauge\n\
             kdp_resource_new_ip_blocks_count{name=\"web\"} 3\n"
        );
        assert!(!text.contains("kdp_api_version"));
    }

    #[test]
    fn integral_values_render_without_fraction() {
        assert_eq!(format_value(12_345.0), "12345");
        assert_eq!(format_value(0.5), "0.5");
        assert_eq!(format_value(-7.0), "-7");
        assert_eq!(format_value(f64::INFINITY), "+Inf");
        assert_eq!(format_value(f64::NEG_INFINITY), "-Inf");
        assert_eq!(format_value(f64::NAN), "NaN");
    }

    #[test]
    fn label_pairs_are_sorted_by_name() {
        // Declaration order is name,country; output must be sorted.
        let snap = snapshot_with(vec![sample(
            &catalog::RESOURCE_GEO_RATIO_PRC,
            &["web", "Germany"],
            42.5,
        )]);
        let text = encode(&snap);
        assert!(
            text.contains("kdp_resource_geo_ratio_prc{country=\"Germany\",name=\"web\"} 42.5"),
            "{text}"
        );
    }

    #[test]
    fn samples_within_a_family_are_sorted() {
        let snap = snapshot_with(vec![
            sample(&catalog::RESOURCE_GEO_RATIO_PRC, &["web", "Germany"], 2.0),
            sample(&catalog::RESOURCE_GEO_RATIO_PRC, &["mail", "France"], 1.0),
        ]);
        let text = encode(&snap);
        let mail = text.find("name=\"mail\"").unwrap();
        let web = text.find("name=\"web\"").unwrap();
        assert!(mail < web);
    }

    #[test]
    fn label_values_are_escaped() {
        let snap = snapshot_with(vec![sample(
            &catalog::RESOURCE_GEO_RATIO_PRC,
            &["a\"b\\c\nd", "DE"],
            1.0,
        )]);
        let text = encode(&snap);
        assert!(text.contains(r#"name="a\"b\\c\nd""#), "{text}");
    }

    #[test]
    fn encoding_is_idempotent() {
        let snap = snapshot_with(vec![
            sample(&catalog::API_VERSION, &["2.3.1", "client"], 1.0),
            sample(&catalog::RESOURCE_GEO_RATIO_PRC, &["web", "Germany"], 2.0),
            sample(&catalog::RESOURCE_NEW_IP_BLOCKS_COUNT, &["web"], 9.0),
        ]);
        assert_eq!(encode(&snap), encode(&snap));
    }

    #[test]
    fn families_follow_catalog_order() {
        let snap = snapshot_with(vec![
            sample(&catalog::RESOURCE_NEW_IP_BLOCKS_COUNT, &["web"], 9.0),
            sample(&catalog::API_VERSION, &["2.3.1", "client"], 1.0),
        ]);
        let text = encode(&snap);
        let version = text.find("kdp_api_version").unwrap();
        let blocks = text.find("kdp_resource_new_ip_blocks_count").unwrap();
        assert!(version < blocks);
    }
}
