use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Patient identifier as issued by the data source
pub type PatientId = String;

/// Number of point clusters (and guide colors) the viewer distinguishes
pub const CLUSTER_COUNT: usize = 4;

/// Cluster index, always in `0..CLUSTER_COUNT`
pub type ClusterId = u8;

/// Display color per cluster, `0xRRGGBB`
pub const CLUSTER_PALETTE: [u32; CLUSTER_COUNT] = [0xff5370, 0x82aaff, 0xc3e88d, 0xffcb6b];

/// Metric assumed for point records that do not name one
pub const DEFAULT_METRIC: &str = "activation_ms";

/// Free-form note attached to a patient
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatientNote {
    pub title: String,
    pub body: String,
    /// Absolute world anchor
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub anchor: Option<Vec3Record>,
    /// Anchor relative to the model bounds, each component in -1..1
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rel: Option<Vec3Record>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Vec3Record {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

/// A patient record as listed by the data source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Patient {
    pub id: PatientId,
    pub name: String,
    pub study_date: String,
    /// Model reference: absolute URL, root-relative path or bare file name
    pub model_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<Vec<PatientNote>>,
}

/// A measured point on the heart surface
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeartPoint {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub cluster: ClusterId,
    pub metric: String,
    pub value: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub segment: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phase: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<String>,
}

impl HeartPoint {
    pub fn position(&self) -> [f64; 3] {
        [self.x, self.y, self.z]
    }
}

/// Map a loosely typed point record into a [`HeartPoint`].
///
/// Missing or non-numeric coordinates and values become `0.0`, a missing metric becomes
/// [`DEFAULT_METRIC`], and `phase`/`time` of the wrong type are dropped. Records whose
/// cluster is not an integer in `0..CLUSTER_COUNT` are rejected.
pub fn map_point(raw: &Value) -> Option<HeartPoint> {
    let number = |key: &str| raw.get(key).and_then(Value::as_f64).unwrap_or(0.0);

    let cluster = raw.get("cluster").and_then(Value::as_u64)?;
    if cluster as usize >= CLUSTER_COUNT {
        return None;
    }

    let metric = match raw.get("metric") {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Null) | None => DEFAULT_METRIC.to_string(),
        Some(other) => other.to_string(),
    };

    Some(HeartPoint {
        x: number("x"),
        y: number("y"),
        z: number("z"),
        cluster: cluster as ClusterId,
        metric,
        value: number("value"),
        segment: raw.get("segment").and_then(Value::as_str).map(str::to_string),
        phase: raw.get("phase").and_then(Value::as_f64),
        time: raw.get("time").and_then(Value::as_str).map(str::to_string),
    })
}

/// Map a list of loosely typed point records, skipping rejected entries
pub fn map_points(raw: &[Value]) -> Vec<HeartPoint> {
    raw.iter().filter_map(map_point).collect()
}
