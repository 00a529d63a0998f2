use crate::pipeline::stats::to_reading;
use crate::types::activity::Trackpoint;
use crate::types::vendor::StreamSet;

/// Zips independently indexed channels into trackpoints. The result is as long
/// as the longest channel; a channel that is shorter, or holds `null` at an
/// index, leaves that field empty. Nothing is interpolated or carried forward.
pub fn normalize(streams: &StreamSet) -> Vec<Trackpoint> {
    let len = streams.len();
    let mut points = Vec::with_capacity(len);

    for i in 0..len {
        let (lat, lng) = match at(&streams.latlng, i) {
            Some((lat, lng)) => (Some(lat), Some(lng)),
            None => (None, None),
        };

        points.push(Trackpoint {
            time_offset: at(&streams.time, i),
            timestamp: None,
            lat,
            lng,
            altitude: at(&streams.altitude, i),
            distance: at(&streams.distance, i),
            heart_rate: at(&streams.heartrate, i).and_then(to_reading),
            speed: at(&streams.velocity, i),
            cadence: at(&streams.cadence, i).and_then(to_reading),
            power: at(&streams.watts, i).and_then(to_reading),
            grade: at(&streams.grade, i),
            temperature: at(&streams.temperature, i).map(|t| t as f32),
            moving: at(&streams.moving, i),
        });
    }

    points
}

fn at<T: Copy>(channel: &[Option<T>], index: usize) -> Option<T> {
    channel.get(index).copied().flatten()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ragged_channels_leave_fields_absent() {
        let streams = StreamSet {
            time: vec![Some(0.0), Some(1.0), Some(2.0)],
            altitude: vec![Some(10.0), Some(20.0)],
            ..Default::default()
        };

        let points = normalize(&streams);
        assert_eq!(points.len(), 3);
        assert_eq!(points[1].altitude, Some(20.0));
        assert_eq!(points[2].time_offset, Some(2.0));
        assert_eq!(points[2].altitude, None);
    }

    #[test]
    fn longest_channel_sets_length() {
        let streams = StreamSet {
            time: vec![Some(0.0)],
            heartrate: vec![Some(101.0), Some(102.0), None, Some(104.0)],
            latlng: vec![Some((1.0, 2.0)), None],
            moving: vec![Some(true)],
            ..Default::default()
        };

        let points = normalize(&streams);
        assert_eq!(points.len(), 4);
        assert_eq!(points[0].coordinate(), Some((1.0, 2.0)));
        assert_eq!(points[0].moving, Some(true));
        assert_eq!(points[1].lat, None);
        assert_eq!(points[1].time_offset, None);
        assert_eq!(points[2].heart_rate, None);
        assert_eq!(points[3].heart_rate, Some(104));
    }

    #[test]
    fn empty_streams_yield_no_points() {
        assert!(normalize(&StreamSet::default()).is_empty());
    }

    #[test]
    fn negative_power_is_not_a_reading() {
        let streams = StreamSet {
            watts: vec![Some(-5.0), Some(250.4)],
            ..Default::default()
        };
        let points = normalize(&streams);
        assert_eq!(points[0].power, None);
        assert_eq!(points[1].power, Some(250));
    }
}
