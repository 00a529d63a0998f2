use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Vendor ids arrive as JSON numbers, but some exports quote them.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum VendorId {
    Number(u64),
    Text(String),
}

impl std::fmt::Display for VendorId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VendorId::Number(id) => write!(f, "{}", id),
            VendorId::Text(id) => f.write_str(id),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct VendorMap {
    pub polyline: Option<String>,
    pub summary_polyline: Option<String>,
}

impl VendorMap {
    /// The full-resolution polyline when present, otherwise the summary one.
    pub fn encoded(&self) -> Option<&str> {
        self.polyline
            .as_deref()
            .filter(|s| !s.is_empty())
            .or_else(|| self.summary_polyline.as_deref().filter(|s| !s.is_empty()))
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct VendorActivity {
    pub id: VendorId,
    pub name: Option<String>,
    #[serde(default)]
    pub distance: f64,
    #[serde(default)]
    pub moving_time: f64,
    #[serde(default)]
    pub elapsed_time: f64,
    #[serde(default)]
    pub total_elevation_gain: f64,
    #[serde(rename = "type")]
    pub activity_type: Option<String>,
    pub sport_type: Option<String>,
    pub start_date: Option<DateTime<Utc>>,
    pub average_speed: Option<f64>,
    pub max_speed: Option<f64>,
    pub has_heartrate: Option<bool>,
    pub average_heartrate: Option<f64>,
    pub max_heartrate: Option<f64>,
    pub average_cadence: Option<f64>,
    pub average_watts: Option<f64>,
    pub map: Option<VendorMap>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct VendorLap {
    #[serde(default)]
    pub elapsed_time: f64,
    #[serde(default)]
    pub moving_time: f64,
    #[serde(default)]
    pub distance: f64,
    pub start_date: Option<DateTime<Utc>>,
    pub average_speed: Option<f64>,
    pub max_speed: Option<f64>,
    pub average_heartrate: Option<f64>,
    pub max_heartrate: Option<f64>,
    pub average_cadence: Option<f64>,
    pub average_watts: Option<f64>,
    pub max_watts: Option<f64>,
    pub total_elevation_gain: Option<f64>,
    pub calories: Option<f64>,
    pub start_index: Option<usize>,
    pub end_index: Option<usize>,
    pub lap_index: Option<u32>,
}

/// Per-channel sample arrays as delivered by the vendor stream endpoint.
/// A missing channel is an empty vector; a `null` sample is `None`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StreamSet {
    pub time: Vec<Option<f64>>,
    pub latlng: Vec<Option<(f64, f64)>>,
    pub altitude: Vec<Option<f64>>,
    pub distance: Vec<Option<f64>>,
    pub heartrate: Vec<Option<f64>>,
    pub velocity: Vec<Option<f64>>,
    pub cadence: Vec<Option<f64>>,
    pub watts: Vec<Option<f64>>,
    pub grade: Vec<Option<f64>>,
    pub temperature: Vec<Option<f64>>,
    pub moving: Vec<Option<bool>>,
}

impl StreamSet {
    /// Length of the longest channel.
    pub fn len(&self) -> usize {
        [
            self.time.len(),
            self.latlng.len(),
            self.altitude.len(),
            self.distance.len(),
            self.heartrate.len(),
            self.velocity.len(),
            self.cadence.len(),
            self.watts.len(),
            self.grade.len(),
            self.temperature.len(),
            self.moving.len(),
        ]
        .into_iter()
        .max()
        .unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Stores the raw samples of a named channel. Returns `false` when the
    /// channel name is not one this model tracks.
    pub fn insert_channel(&mut self, name: &str, samples: &[Value]) -> bool {
        match name {
            "time" => self.time = numbers(samples),
            "latlng" => self.latlng = samples.iter().map(coordinate).collect(),
            "altitude" => self.altitude = numbers(samples),
            "distance" => self.distance = numbers(samples),
            "heartrate" => self.heartrate = numbers(samples),
            "velocity" | "velocity_smooth" => self.velocity = numbers(samples),
            "cadence" => self.cadence = numbers(samples),
            "watts" => self.watts = numbers(samples),
            "grade" | "grade_smooth" => self.grade = numbers(samples),
            "temperature" | "temp" => self.temperature = numbers(samples),
            "moving" => self.moving = samples.iter().map(flag).collect(),
            _ => return false,
        }
        true
    }
}

fn numbers(samples: &[Value]) -> Vec<Option<f64>> {
    samples.iter().map(Value::as_f64).collect()
}

fn coordinate(sample: &Value) -> Option<(f64, f64)> {
    let pair = sample.as_array()?;
    match pair.as_slice() {
        [lat, lng, ..] => {
            let (lat, lng) = (lat.as_f64()?, lng.as_f64()?);
            (lat.abs() <= 90.0 && lng.abs() <= 180.0).then_some((lat, lng))
        }
        _ => None,
    }
}

fn flag(sample: &Value) -> Option<bool> {
    match sample {
        Value::Bool(b) => Some(*b),
        other => other.as_f64().map(|v| v != 0.0),
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawStreams {
    Tagged(Vec<TaggedStream>),
    Keyed(BTreeMap<String, RawChannel>),
}

#[derive(Deserialize)]
struct TaggedStream {
    #[serde(rename = "type")]
    kind: String,
    data: Vec<Value>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawChannel {
    Wrapped { data: Vec<Value> },
    Bare(Vec<Value>),
}

impl<'de> Deserialize<'de> for StreamSet {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = RawStreams::deserialize(deserializer)?;
        let channels: Vec<(String, Vec<Value>)> = match raw {
            RawStreams::Tagged(streams) => streams.into_iter().map(|s| (s.kind, s.data)).collect(),
            RawStreams::Keyed(map) => map
                .into_iter()
                .map(|(name, channel)| match channel {
                    RawChannel::Wrapped { data } | RawChannel::Bare(data) => (name, data),
                })
                .collect(),
        };

        let mut set = StreamSet::default();
        for (name, data) in channels {
            if !set.insert_channel(&name, &data) {
                tracing::debug!("Ignoring unknown stream channel: {}", name);
            }
        }
        Ok(set)
    }
}
