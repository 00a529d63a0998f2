use serde::{Deserialize, Serialize};

use crate::error::SegmentError;
use crate::types::activity::{Activity, Lap, Trackpoint};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SegmentSpan {
    /// Meters between the two endpoints.
    pub distance: f64,
    /// Seconds between the two endpoints.
    pub duration: f64,
}

/// Distance and duration between two trackpoint indices. The indices may be
/// given in either order; a field missing on either endpoint counts as zero.
pub fn resolve(
    points: &[Trackpoint],
    start_index: usize,
    end_index: usize,
) -> Result<SegmentSpan, SegmentError> {
    let start = checked(points, start_index)?;
    let end = checked(points, end_index)?;

    let distance = match (start.distance, end.distance) {
        (Some(a), Some(b)) => (b - a).abs(),
        _ => 0.0,
    };
    let duration = match (start.time_offset, end.time_offset) {
        (Some(a), Some(b)) => (b - a).abs(),
        _ => 0.0,
    };

    Ok(SegmentSpan { distance, duration })
}

/// Maps a time window (seconds since start) onto the first and last trackpoint
/// indices whose offsets fall inside it.
pub fn indices_for_time_range(
    points: &[Trackpoint],
    start_offset: f64,
    end_offset: f64,
) -> Option<(usize, usize)> {
    let mut first = None;
    let mut last = None;

    for (idx, point) in points.iter().enumerate() {
        let Some(offset) = point.time_offset else {
            continue;
        };
        if offset < start_offset || offset > end_offset {
            continue;
        }
        if first.is_none() {
            first = Some(idx);
        }
        last = Some(idx);
    }

    Some((first?, last?))
}

impl Activity {
    pub fn lap_span(&self, lap: &Lap) -> Result<SegmentSpan, SegmentError> {
        resolve(&self.trackpoints, lap.start_index, lap.end_index)
    }
}

fn checked(points: &[Trackpoint], index: usize) -> Result<&Trackpoint, SegmentError> {
    points.get(index).ok_or(SegmentError::IndexOutOfRange {
        index,
        len: points.len(),
    })
}
