mod tcx;

use chrono::{DateTime, Utc};

use crate::error::ParseError;
use crate::pipeline::stats;
use crate::types::activity::{Lap, Trackpoint};

pub use tcx::TcxParser;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    Tcx,
}

impl FileFormat {
    pub fn from_filename(filename: &str) -> Option<Self> {
        let ext = filename.rsplit('.').next()?.to_lowercase();
        match ext.as_str() {
            "tcx" => Some(FileFormat::Tcx),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FileFormat::Tcx => "tcx",
        }
    }
}

pub trait Parser {
    fn parse(&self, bytes: &[u8]) -> Result<ParsedFile, ParseError>;
}

pub fn parse(bytes: &[u8], format: FileFormat) -> Result<ParsedFile, ParseError> {
    match format {
        FileFormat::Tcx => TcxParser.parse(bytes),
    }
}

/// One activity as written in the file, before flattening.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedFile {
    pub sport: String,
    pub id: Option<String>,
    pub notes: Option<String>,
    pub laps: Vec<ParsedLap>,
}

/// A lap with the aggregates the document declares. These are trusted as-is.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedLap {
    pub start_time: Option<DateTime<Utc>>,
    pub total_time: Option<f64>,
    pub distance: Option<f64>,
    pub max_speed: Option<f64>,
    pub average_speed: Option<f64>,
    pub calories: Option<f64>,
    pub average_heartrate: Option<f64>,
    pub max_heartrate: Option<f64>,
    pub average_cadence: Option<f64>,
    pub trackpoints: Vec<ParsedTrackpoint>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedTrackpoint {
    pub time: Option<DateTime<Utc>>,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    pub altitude: Option<f64>,
    pub distance: Option<f64>,
    pub heart_rate: Option<f64>,
    pub cadence: Option<f64>,
    pub speed: Option<f64>,
    pub power: Option<f64>,
}

/// Canonical laps and the single trackpoint sequence they index into.
#[derive(Debug, Clone, Default)]
pub struct FlattenedFile {
    pub start_date: Option<DateTime<Utc>>,
    pub laps: Vec<Lap>,
    pub trackpoints: Vec<Trackpoint>,
}

impl ParsedFile {
    /// The activity start: the `Id` timestamp when it is one, else the first
    /// lap start, else the first timed trackpoint.
    pub fn start_date(&self) -> Option<DateTime<Utc>> {
        self.id
            .as_deref()
            .and_then(|id| id.trim().parse::<DateTime<Utc>>().ok())
            .or_else(|| self.laps.iter().find_map(|lap| lap.start_time))
            .or_else(|| {
                self.laps
                    .iter()
                    .flat_map(|lap| &lap.trackpoints)
                    .find_map(|point| point.time)
            })
    }

    pub fn trackpoint_count(&self) -> usize {
        self.laps.iter().map(|lap| lap.trackpoints.len()).sum()
    }

    pub fn flatten(&self) -> FlattenedFile {
        let start_date = self.start_date();
        let mut trackpoints = Vec::with_capacity(self.trackpoint_count());
        let mut laps = Vec::with_capacity(self.laps.len());

        for (idx, parsed) in self.laps.iter().enumerate() {
            let start_index = trackpoints.len();
            trackpoints.extend(parsed.trackpoints.iter().map(|p| p.to_canonical(start_date)));

            if parsed.trackpoints.is_empty() {
                tracing::debug!("Lap {} has no trackpoints; keeping it out of the lap list", idx + 1);
                continue;
            }

            let end_index = trackpoints.len() - 1;
            laps.push(parsed.to_lap(idx as u32 + 1, start_index, &trackpoints[start_index..=end_index]));
        }

        FlattenedFile {
            start_date,
            laps,
            trackpoints,
        }
    }
}

impl ParsedLap {
    /// Declared total time, else the span of the lap's timestamps.
    pub fn elapsed_time(&self) -> f64 {
        self.total_time
            .filter(|t| *t >= 0.0)
            .or_else(|| {
                let first = self.trackpoints.iter().find_map(|p| p.time)?;
                let last = self.trackpoints.iter().rev().find_map(|p| p.time)?;
                Some((last - first).num_milliseconds() as f64 / 1000.0)
            })
            .unwrap_or(0.0)
            .max(0.0)
    }

    /// Declared distance, else the span of the lap's cumulative distances.
    pub fn distance(&self) -> f64 {
        self.distance
            .filter(|d| *d >= 0.0)
            .or_else(|| {
                let first = self.trackpoints.iter().find_map(|p| p.distance)?;
                let last = self.trackpoints.iter().rev().find_map(|p| p.distance)?;
                Some((last - first).abs())
            })
            .unwrap_or(0.0)
    }

    fn to_lap(&self, lap_index: u32, start_index: usize, points: &[Trackpoint]) -> Lap {
        let elapsed_time = self.elapsed_time();
        let distance = self.distance();
        let has_altitude = points.iter().any(|p| p.altitude.is_some());
        let power = || points.iter().map(|p| p.power.map(f64::from));

        Lap {
            lap_index,
            start_time: self.start_time,
            elapsed_time,
            moving_time: elapsed_time,
            distance,
            average_speed: self
                .average_speed
                .or_else(|| stats::average_speed(distance, elapsed_time)),
            max_speed: self.max_speed,
            average_heartrate: self.average_heartrate,
            max_heartrate: self.max_heartrate,
            average_cadence: self.average_cadence,
            average_watts: stats::positive_mean(power()),
            max_watts: stats::positive_max(power()),
            total_elevation_gain: has_altitude
                .then(|| stats::elevation_gain(points.iter().map(|p| p.altitude))),
            calories: self.calories,
            start_index,
            end_index: start_index + points.len() - 1,
        }
    }
}

impl ParsedTrackpoint {
    fn to_canonical(&self, start_date: Option<DateTime<Utc>>) -> Trackpoint {
        let time_offset = match (self.time, start_date) {
            (Some(time), Some(start)) => Some((time - start).num_milliseconds() as f64 / 1000.0),
            _ => None,
        };

        Trackpoint {
            time_offset,
            timestamp: self.time,
            lat: self.lat,
            lng: self.lng,
            altitude: self.altitude,
            distance: self.distance,
            heart_rate: self.heart_rate.and_then(stats::to_reading),
            speed: self.speed,
            cadence: self.cadence.and_then(stats::to_reading),
            power: self.power.and_then(stats::to_reading),
            grade: None,
            temperature: None,
            moving: None,
        }
    }
}
