use chrono::{DateTime, Utc};

use crate::error::ParseError;
use crate::pipeline::parse::{self, FileFormat, FlattenedFile, ParsedFile, ParsedLap};
use crate::pipeline::{polyline, segment, stats, streams};
use crate::types::activity::{Activity, ActivitySource, Lap, Trackpoint};
use crate::types::vendor::{StreamSet, VendorActivity, VendorLap, VendorMap};

/// The two ways an activity reaches the pipeline.
#[derive(Debug, Clone)]
pub enum ActivityInput {
    VendorApi {
        detail: VendorActivity,
        laps: Vec<VendorLap>,
        streams: Option<StreamSet>,
    },
    File(ParsedFile),
}

pub fn aggregate(input: ActivityInput) -> Activity {
    match input {
        ActivityInput::VendorApi {
            detail,
            laps,
            streams: stream_set,
        } => from_vendor(detail, &laps, stream_set.as_ref()),
        ActivityInput::File(parsed) => from_file(&parsed),
    }
}

pub fn aggregate_file(bytes: &[u8], format: FileFormat) -> Result<Activity, ParseError> {
    let parsed = parse::parse(bytes, format)?;
    Ok(aggregate(ActivityInput::File(parsed)))
}

fn from_file(parsed: &ParsedFile) -> Activity {
    let FlattenedFile {
        start_date,
        laps,
        trackpoints,
    } = parsed.flatten();

    let distance: f64 = parsed.laps.iter().map(ParsedLap::distance).sum();
    let elapsed_time: f64 = parsed.laps.iter().map(ParsedLap::elapsed_time).sum();

    // Summed over the whole sequence so a climb spanning a lap boundary counts once.
    let total_elevation_gain = stats::elevation_gain(trackpoints.iter().map(|p| p.altitude));

    let max_speed = stats::positive_max(laps.iter().map(|lap| lap.max_speed))
        .or_else(|| stats::positive_max(trackpoints.iter().map(|p| p.speed)));
    let max_heartrate = stats::positive_max(trackpoints.iter().map(|p| p.heart_rate.map(f64::from)))
        .or_else(|| stats::positive_max(laps.iter().map(|lap| lap.max_heartrate)));

    let id = parsed
        .id
        .clone()
        .filter(|id| !id.is_empty())
        .or_else(|| start_date.map(|start| start.to_rfc3339()))
        .unwrap_or_default();
    let name = parsed
        .notes
        .clone()
        .filter(|notes| !notes.is_empty())
        .unwrap_or_else(|| default_name(&parsed.sport));

    tracing::info!(
        "Aggregated file activity {} ({} laps, {} trackpoints, {:.0} m)",
        id,
        laps.len(),
        trackpoints.len(),
        distance
    );

    Activity {
        id,
        name,
        sport: parsed.sport.clone(),
        source: ActivitySource::File,
        distance,
        moving_time: elapsed_time,
        elapsed_time,
        total_elevation_gain,
        start_date,
        average_speed: stats::average_speed(distance, elapsed_time),
        max_speed,
        average_heartrate: positive_mean_of(&trackpoints, |p| p.heart_rate),
        max_heartrate,
        average_cadence: positive_mean_of(&trackpoints, |p| p.cadence),
        average_watts: positive_mean_of(&trackpoints, |p| p.power),
        polyline: encode_route(&trackpoints),
        laps,
        trackpoints,
    }
}

fn from_vendor(detail: VendorActivity, laps: &[VendorLap], stream_set: Option<&StreamSet>) -> Activity {
    let mut trackpoints = stream_set.map(streams::normalize).unwrap_or_default();
    if let Some(start) = detail.start_date {
        for point in &mut trackpoints {
            point.timestamp = point.time_offset.and_then(|offset| offset_timestamp(start, offset));
        }
    }

    let laps = convert_vendor_laps(laps, &trackpoints, detail.start_date);
    let polyline = detail
        .map
        .as_ref()
        .and_then(VendorMap::encoded)
        .and_then(validated_polyline)
        .or_else(|| encode_route(&trackpoints));

    let sport = detail
        .activity_type
        .clone()
        .or_else(|| detail.sport_type.clone())
        .unwrap_or_default();
    let id = detail.id.to_string();
    let heart_rate_recorded = detail.has_heartrate != Some(false);

    tracing::info!(
        "Aggregated vendor activity {} ({} laps, {} trackpoints)",
        id,
        laps.len(),
        trackpoints.len()
    );

    Activity {
        name: detail.name.clone().unwrap_or_else(|| default_name(&sport)),
        sport,
        source: ActivitySource::VendorApi,
        distance: detail.distance.max(0.0),
        moving_time: detail.moving_time.max(0.0),
        elapsed_time: detail.elapsed_time.max(0.0),
        total_elevation_gain: detail.total_elevation_gain.max(0.0),
        start_date: detail.start_date,
        average_speed: detail
            .average_speed
            .or_else(|| stats::average_speed(detail.distance, detail.moving_time)),
        max_speed: detail
            .max_speed
            .or_else(|| stats::positive_max(trackpoints.iter().map(|p| p.speed))),
        average_heartrate: detail
            .average_heartrate
            .or_else(|| positive_mean_of(&trackpoints, |p| p.heart_rate))
            .filter(|_| heart_rate_recorded),
        max_heartrate: detail
            .max_heartrate
            .or_else(|| stats::positive_max(trackpoints.iter().map(|p| p.heart_rate.map(f64::from))))
            .filter(|_| heart_rate_recorded),
        average_cadence: detail
            .average_cadence
            .or_else(|| positive_mean_of(&trackpoints, |p| p.cadence)),
        average_watts: detail
            .average_watts
            .or_else(|| positive_mean_of(&trackpoints, |p| p.power)),
        id,
        polyline,
        laps,
        trackpoints,
    }
}

/// Converts vendor laps into index ranges over `points`. Laps without indices
/// are placed by their start time; laps that cannot be placed inside the
/// sequence are dropped, and a lap that overlaps its predecessor is trimmed.
/// Power and climb of a trimmed lap are taken from the range it keeps.
fn convert_vendor_laps(
    laps: &[VendorLap],
    points: &[Trackpoint],
    activity_start: Option<DateTime<Utc>>,
) -> Vec<Lap> {
    let mut placed: Vec<(u32, usize, usize, &VendorLap)> = Vec::with_capacity(laps.len());

    for (idx, lap) in laps.iter().enumerate() {
        let lap_index = lap.lap_index.unwrap_or(idx as u32 + 1);
        let range = match (lap.start_index, lap.end_index) {
            (Some(start), Some(end)) => Some((start, end)),
            _ => time_window(lap, activity_start)
                .and_then(|(from, to)| segment::indices_for_time_range(points, from, to)),
        };

        match range.filter(|&(start, end)| start <= end && end < points.len()) {
            Some((start_index, end_index)) => placed.push((lap_index, start_index, end_index, lap)),
            None => tracing::warn!(
                "Dropping lap {}: range {:?} does not fit {} trackpoints",
                lap_index,
                range,
                points.len()
            ),
        }
    }

    placed.sort_by_key(|&(_, start_index, _, _)| start_index);

    let mut ordered: Vec<Lap> = Vec::with_capacity(placed.len());
    for (lap_index, mut start_index, end_index, lap) in placed {
        let mut trimmed = false;
        if let Some(prev) = ordered.last() {
            if start_index <= prev.end_index {
                if end_index <= prev.end_index {
                    tracing::warn!("Dropping lap {}: fully overlaps lap {}", lap_index, prev.lap_index);
                    continue;
                }
                tracing::debug!("Trimming lap {} to start after lap {}", lap_index, prev.lap_index);
                start_index = prev.end_index + 1;
                trimmed = true;
            }
        }
        ordered.push(vendor_lap(lap, lap_index, &points[start_index..=end_index], start_index, end_index, trimmed));
    }

    ordered
}

fn vendor_lap(
    lap: &VendorLap,
    lap_index: u32,
    lap_points: &[Trackpoint],
    start_index: usize,
    end_index: usize,
    trimmed: bool,
) -> Lap {
    let derived_watts = positive_mean_of(lap_points, |p| p.power);
    let derived_max_watts = stats::positive_max(lap_points.iter().map(|p| p.power.map(f64::from)));
    let derived_gain = lap_points
        .iter()
        .any(|p| p.altitude.is_some())
        .then(|| stats::elevation_gain(lap_points.iter().map(|p| p.altitude)));

    // Declared values describe the untrimmed lap.
    let pick = |declared: Option<f64>, derived: Option<f64>| {
        if trimmed {
            derived.or(declared)
        } else {
            declared.or(derived)
        }
    };

    Lap {
        lap_index,
        start_time: lap.start_date,
        elapsed_time: lap.elapsed_time.max(0.0),
        moving_time: lap.moving_time.max(0.0),
        distance: lap.distance.max(0.0),
        average_speed: lap.average_speed,
        max_speed: lap.max_speed,
        average_heartrate: lap.average_heartrate,
        max_heartrate: lap.max_heartrate,
        average_cadence: lap.average_cadence,
        average_watts: pick(lap.average_watts, derived_watts),
        max_watts: pick(lap.max_watts, derived_max_watts),
        total_elevation_gain: pick(lap.total_elevation_gain, derived_gain),
        calories: lap.calories,
        start_index,
        end_index,
    }
}

fn time_window(lap: &VendorLap, activity_start: Option<DateTime<Utc>>) -> Option<(f64, f64)> {
    let from = (lap.start_date? - activity_start?).num_milliseconds() as f64 / 1000.0;
    Some((from, from + lap.elapsed_time.max(0.0)))
}

fn validated_polyline(encoded: &str) -> Option<String> {
    match polyline::decode_default(encoded) {
        Ok(coords) if !coords.is_empty() => Some(encoded.to_string()),
        Ok(_) => None,
        Err(err) => {
            tracing::warn!("Discarding vendor polyline: {}", err);
            None
        }
    }
}

fn encode_route(points: &[Trackpoint]) -> Option<String> {
    let coords: Vec<(f64, f64)> = points.iter().filter_map(Trackpoint::coordinate).collect();
    if coords.is_empty() {
        return None;
    }
    Some(polyline::encode_default(&coords))
}

fn positive_mean_of<F>(points: &[Trackpoint], reading: F) -> Option<f64>
where
    F: Fn(&Trackpoint) -> Option<u16>,
{
    stats::positive_mean(points.iter().map(|p| reading(p).map(f64::from)))
}

fn offset_timestamp(start: DateTime<Utc>, offset_seconds: f64) -> Option<DateTime<Utc>> {
    let millis = (offset_seconds * 1000.0).round();
    if !millis.is_finite() {
        return None;
    }
    start.checked_add_signed(chrono::Duration::milliseconds(millis as i64))
}

fn default_name(sport: &str) -> String {
    if sport.is_empty() {
        "Activity".to_string()
    } else {
        format!("{} activity", sport)
    }
}
