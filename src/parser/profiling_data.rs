//! Profiling data parser.
//!
//! Parses the JSON produced by the capture side (GPU slices, groups and
//! hardware counters) into the typed model, and validates it before any
//! metric is computed.

use super::schema::{Counter, GpuSlices, Group, ProfilingData, Slice};
use crate::utils::config::{COUNTER_SECTION_NAMES, SLICE_SECTION_NAMES};
use crate::utils::error::{ParseError, ProfileError};
use log::{debug, warn};
use serde::Deserialize;
use std::collections::HashSet;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// Slice as found in capture output
///
/// Timestamps are signed there, so negative values have to be
/// rejected explicitly rather than wrapped.
#[derive(Debug, Clone, Deserialize)]
struct RawSlice {
    #[serde(alias = "groupId")]
    group_id: i32,

    #[serde(default)]
    depth: i32,

    #[serde(alias = "timestamp")]
    ts: i64,

    #[serde(alias = "duration")]
    dur: i64,
}

impl TryFrom<RawSlice> for Slice {
    type Error = ProfileError;

    fn try_from(raw: RawSlice) -> Result<Self, Self::Error> {
        let ts = u64::try_from(raw.ts).map_err(|_| {
            ProfileError::InvalidProfilingData(format!(
                "slice of group {} has negative timestamp {}",
                raw.group_id, raw.ts
            ))
        })?;
        let dur = u64::try_from(raw.dur).map_err(|_| {
            ProfileError::InvalidProfilingData(format!(
                "slice of group {} at {} has negative duration {}",
                raw.group_id, raw.ts, raw.dur
            ))
        })?;
        Ok(Slice::new(raw.group_id, raw.depth, ts, dur))
    }
}

/// Parse raw profiling data JSON
///
/// **Public** - main entry point for parsing
///
/// Accepts both the nested layout
/// `{"slices": {"slices": [...], "groups": [...]}, "counters": [...]}`
/// and the flat layout
/// `{"slices": [...], "groups": [...], "counters": [...]}`.
///
/// # Errors
/// * `ParseError::JsonError` - Invalid JSON structure
/// * `ParseError::InvalidFormat` - Not an object
/// * `ParseError::InvalidData` - Well-formed JSON describing inconsistent traces
pub fn parse_profiling_data(raw: &serde_json::Value) -> Result<ProfilingData, ParseError> {
    let obj = raw.as_object().ok_or_else(|| {
        ParseError::InvalidFormat("Profiling data must be a JSON object".to_string())
    })?;

    let (slice_values, group_values) = extract_slice_section(obj);

    let raw_slices: Vec<RawSlice> = match slice_values {
        Some(value) => serde_json::from_value(value.clone())?,
        None => Vec::new(),
    };
    let groups: Vec<Group> = match group_values {
        Some(value) => serde_json::from_value(value.clone())?,
        None => Vec::new(),
    };
    let slices = raw_slices
        .into_iter()
        .map(Slice::try_from)
        .collect::<Result<Vec<_>, _>>()?;

    let counters = extract_counters(obj)?;

    debug!(
        "Parsed {} slices, {} groups, {} counters",
        slices.len(),
        groups.len(),
        counters.len()
    );

    let slices = GpuSlices { slices, groups };
    validate_profiling_data(&slices, &counters)?;

    Ok(ProfilingData { slices, counters })
}

/// Read and parse a profiling data JSON file
///
/// **Public** - used by the compute command
pub fn read_profiling_data(input_path: impl AsRef<Path>) -> Result<ProfilingData, ParseError> {
    let input_path = input_path.as_ref();

    debug!("Reading profiling data from: {}", input_path.display());

    let file = File::open(input_path)?;
    let raw: serde_json::Value = serde_json::from_reader(BufReader::new(file))?;

    parse_profiling_data(&raw)
}

/// Locate the slice and group arrays
///
/// **Private** - internal helper for parse_profiling_data
fn extract_slice_section(
    obj: &serde_json::Map<String, serde_json::Value>,
) -> (Option<&serde_json::Value>, Option<&serde_json::Value>) {
    let section = SLICE_SECTION_NAMES.iter().find_map(|field| obj.get(*field));

    match section {
        Some(serde_json::Value::Object(nested)) => {
            debug!("Slice section is nested");
            (nested.get("slices"), nested.get("groups"))
        }
        Some(value @ serde_json::Value::Array(_)) => (Some(value), obj.get("groups")),
        Some(other) => {
            warn!("Ignoring slice section of unexpected type: {}", other);
            (None, obj.get("groups"))
        }
        None => {
            warn!("No GPU slices found in profiling data");
            (None, obj.get("groups"))
        }
    }
}

/// Extract the counter list
///
/// **Private** - internal helper for parse_profiling_data
fn extract_counters(
    obj: &serde_json::Map<String, serde_json::Value>,
) -> Result<Vec<Counter>, ParseError> {
    match COUNTER_SECTION_NAMES.iter().find_map(|field| obj.get(*field)) {
        Some(value) => Ok(serde_json::from_value(value.clone())?),
        None => {
            warn!("No hardware counters found in profiling data");
            Ok(Vec::new())
        }
    }
}

/// Validate slices, groups and counters
///
/// **Public** - run by `compute_counters` before any aggregation
///
/// # Errors
/// `ProfileError::InvalidProfilingData` when
/// * two groups share an id
/// * a slice's end timestamp overflows
/// * a counter's timestamps and values differ in length
/// * a counter's timestamps are not strictly increasing
/// * a counter value is NaN or infinite
pub fn validate_profiling_data(slices: &GpuSlices, counters: &[Counter]) -> Result<(), ProfileError> {
    let mut seen = HashSet::with_capacity(slices.groups.len());
    for group in &slices.groups {
        if !seen.insert(group.id) {
            return Err(ProfileError::InvalidProfilingData(format!(
                "duplicate group id {}",
                group.id
            )));
        }
    }

    for slice in &slices.slices {
        if slice.ts.checked_add(slice.dur).is_none() {
            return Err(ProfileError::InvalidProfilingData(format!(
                "slice of group {} at {} with duration {} ends past the timeline",
                slice.group_id, slice.ts, slice.dur
            )));
        }
    }

    for counter in counters {
        validate_counter(counter)?;
    }

    Ok(())
}

fn validate_counter(counter: &Counter) -> Result<(), ProfileError> {
    if counter.timestamps.len() != counter.values.len() {
        return Err(ProfileError::InvalidProfilingData(format!(
            "counter '{}' has {} timestamps but {} values",
            counter.name,
            counter.timestamps.len(),
            counter.values.len()
        )));
    }

    if let Some(i) = counter.timestamps.windows(2).position(|w| w[0] >= w[1]) {
        return Err(ProfileError::InvalidProfilingData(format!(
            "counter '{}' timestamps are not strictly increasing at index {} ({} -> {})",
            counter.name,
            i + 1,
            counter.timestamps[i],
            counter.timestamps[i + 1]
        )));
    }

    if let Some(i) = counter.values.iter().position(|v| !v.is_finite()) {
        return Err(ProfileError::InvalidProfilingData(format!(
            "counter '{}' has non-finite value at index {}",
            counter.name, i
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::schema::AggregationOperator;
    use serde_json::json;

    #[test]
    fn test_parse_nested_layout() {
        let raw = json!({
            "slices": {
                "slices": [{"groupId": 1, "depth": 0, "ts": 0, "dur": 10}],
                "groups": [{"id": 1, "commandIndex": [0, 2]}]
            },
            "counters": [
                {"name": "ALU", "unit": "%", "timestamps": [0, 10], "values": [0.0, 50.0]}
            ]
        });

        let data = parse_profiling_data(&raw).unwrap();
        assert_eq!(data.slices.slices, vec![Slice::new(1, 0, 0, 10)]);
        assert_eq!(data.slices.groups[0].command_index.to_string(), "0,2");
        assert_eq!(data.counters.len(), 1);
        assert_eq!(
            data.counters[0].operator,
            AggregationOperator::TimeWeightedAverage
        );
    }

    #[test]
    fn test_parse_flat_layout() {
        let raw = json!({
            "slices": [{"group_id": 4, "timestamp": 5, "duration": 5}],
            "groups": [{"group_id": 4, "command_index": [3]}],
            "gpu_counters": []
        });

        let data = parse_profiling_data(&raw).unwrap();
        assert_eq!(data.slices.slices, vec![Slice::new(4, 0, 5, 5)]);
        assert_eq!(data.slices.groups[0].id, 4);
        assert!(data.counters.is_empty());
    }

    #[test]
    fn test_parse_rejects_non_object() {
        let result = parse_profiling_data(&json!([1, 2, 3]));
        assert!(matches!(result, Err(ParseError::InvalidFormat(_))));
    }

    #[test]
    fn test_parse_rejects_negative_duration() {
        let raw = json!({
            "slices": [{"groupId": 1, "ts": 10, "dur": -5}],
            "groups": [{"id": 1, "commandIndex": [0]}]
        });

        let result = parse_profiling_data(&raw);
        assert!(matches!(
            result,
            Err(ParseError::InvalidData(ProfileError::InvalidProfilingData(_)))
        ));
    }

    #[test]
    fn test_validate_duplicate_groups() {
        let slices = GpuSlices {
            slices: vec![],
            groups: vec![Group::new(1, vec![0]), Group::new(1, vec![1])],
        };
        assert!(validate_profiling_data(&slices, &[]).is_err());
    }

    #[test]
    fn test_validate_slice_overflow() {
        let slices = GpuSlices {
            slices: vec![Slice::new(1, 0, u64::MAX, 1)],
            groups: vec![Group::new(1, vec![0])],
        };
        assert!(validate_profiling_data(&slices, &[]).is_err());
    }

    #[test]
    fn test_validate_counter_shapes() {
        let slices = GpuSlices::default();
        let op = AggregationOperator::Summation;

        let mismatched = Counter::new("c", "", vec![0, 10], vec![1.0], op);
        assert!(validate_profiling_data(&slices, &[mismatched]).is_err());

        let unordered = Counter::new("c", "", vec![0, 10, 10], vec![1.0, 2.0, 3.0], op);
        let err = validate_profiling_data(&slices, &[unordered]).unwrap_err();
        assert!(err.to_string().contains("strictly increasing"));

        let nan = Counter::new("c", "", vec![0, 10], vec![0.0, f64::NAN], op);
        assert!(validate_profiling_data(&slices, &[nan]).is_err());

        let good = Counter::new("c", "", vec![0, 10, 20], vec![0.0, 1.0, 2.0], op);
        assert!(validate_profiling_data(&slices, &[good]).is_ok());
    }
}
