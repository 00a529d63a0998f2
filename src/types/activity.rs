use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Trackpoint {
    /// Seconds since the activity start.
    pub time_offset: Option<f64>,
    pub timestamp: Option<DateTime<Utc>>,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    pub altitude: Option<f64>,
    /// Cumulative distance in meters.
    pub distance: Option<f64>,
    pub heart_rate: Option<u16>,
    /// Instantaneous speed in m/s.
    pub speed: Option<f64>,
    pub cadence: Option<u16>,
    pub power: Option<u16>,
    pub grade: Option<f64>,
    pub temperature: Option<f32>,
    pub moving: Option<bool>,
}

impl Trackpoint {
    pub fn coordinate(&self) -> Option<(f64, f64)> {
        Some((self.lat?, self.lng?))
    }
}

/// A contiguous range of an activity's trackpoints. `start_index` and
/// `end_index` are inclusive and index into `Activity::trackpoints`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Lap {
    pub lap_index: u32,
    pub start_time: Option<DateTime<Utc>>,
    pub elapsed_time: f64,
    pub moving_time: f64,
    pub distance: f64,
    pub average_speed: Option<f64>,
    pub max_speed: Option<f64>,
    pub average_heartrate: Option<f64>,
    pub max_heartrate: Option<f64>,
    pub average_cadence: Option<f64>,
    pub average_watts: Option<f64>,
    pub max_watts: Option<f64>,
    pub total_elevation_gain: Option<f64>,
    pub calories: Option<f64>,
    pub start_index: usize,
    pub end_index: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivitySource {
    VendorApi,
    File,
}

impl ActivitySource {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActivitySource::VendorApi => "vendor_api",
            ActivitySource::File => "file",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Activity {
    pub id: String,
    pub name: String,
    pub sport: String,
    pub source: ActivitySource,
    pub distance: f64,
    pub moving_time: f64,
    pub elapsed_time: f64,
    pub total_elevation_gain: f64,
    pub start_date: Option<DateTime<Utc>>,
    pub average_speed: Option<f64>,
    pub max_speed: Option<f64>,
    pub average_heartrate: Option<f64>,
    pub max_heartrate: Option<f64>,
    pub average_cadence: Option<f64>,
    pub average_watts: Option<f64>,
    pub polyline: Option<String>,
    pub laps: Vec<Lap>,
    pub trackpoints: Vec<Trackpoint>,
}

impl Activity {
    /// The trackpoints covered by `lap`, or `None` if its range does not lie
    /// inside this activity.
    pub fn lap_points(&self, lap: &Lap) -> Option<&[Trackpoint]> {
        if lap.start_index > lap.end_index {
            return None;
        }
        self.trackpoints.get(lap.start_index..=lap.end_index)
    }

    pub fn coordinates(&self) -> Vec<(f64, f64)> {
        self.trackpoints
            .iter()
            .filter_map(Trackpoint::coordinate)
            .collect()
    }

    pub fn has_heart_rate(&self) -> bool {
        self.trackpoints.iter().any(|p| p.heart_rate.is_some()) || self.average_heartrate.is_some()
    }

    pub fn has_power(&self) -> bool {
        self.trackpoints.iter().any(|p| p.power.is_some()) || self.average_watts.is_some()
    }
}
