/// Sum of the positive steps between successive altitude readings. Points
/// without an altitude are skipped, so a climb across a gap still counts.
pub fn elevation_gain<I>(altitudes: I) -> f64
where
    I: IntoIterator<Item = Option<f64>>,
{
    let mut gain = 0.0;
    let mut previous: Option<f64> = None;

    for altitude in altitudes.into_iter().flatten() {
        if let Some(prev) = previous {
            let delta = altitude - prev;
            if delta > 0.0 {
                gain += delta;
            }
        }
        previous = Some(altitude);
    }

    gain
}

/// Mean over strictly positive readings. Zero means "sensor idle" for heart
/// rate, cadence and power, so it must not drag the average down.
pub fn positive_mean<I>(values: I) -> Option<f64>
where
    I: IntoIterator<Item = Option<f64>>,
{
    let mut sum = 0.0;
    let mut count = 0usize;
    for value in values.into_iter().flatten().filter(|v| *v > 0.0) {
        sum += value;
        count += 1;
    }

    if count > 0 {
        Some(sum / count as f64)
    } else {
        None
    }
}

pub fn positive_max<I>(values: I) -> Option<f64>
where
    I: IntoIterator<Item = Option<f64>>,
{
    values
        .into_iter()
        .flatten()
        .filter(|v| *v > 0.0)
        .fold(None, |max, v| Some(max.map_or(v, |m: f64| m.max(v))))
}

/// Meters per second, undefined when no time elapsed.
pub fn average_speed(distance_m: f64, time_s: f64) -> Option<f64> {
    if time_s > 0.0 && distance_m.is_finite() {
        Some(distance_m / time_s)
    } else {
        None
    }
}

pub fn pace_seconds_per_km(distance_m: f64, time_s: f64) -> Option<f64> {
    if distance_m > 0.0 && time_s > 0.0 {
        Some(time_s / (distance_m / 1000.0))
    } else {
        None
    }
}

/// Converts a raw sensor sample to an integer reading (bpm, rpm, watts).
/// Negative or non-finite samples are not readings.
pub fn to_reading(value: f64) -> Option<u16> {
    if value.is_finite() && value >= 0.0 && value <= u16::MAX as f64 {
        Some(value.round() as u16)
    } else {
        None
    }
}

pub fn format_duration(duration_seconds: u64) -> String {
    let hours = duration_seconds / 3600;
    let minutes = (duration_seconds % 3600) / 60;
    let seconds = duration_seconds % 60;
    if hours > 0 {
        format!("{}:{:02}:{:02}", hours, minutes, seconds)
    } else {
        format!("{:02}:{:02}", minutes, seconds)
    }
}

pub fn format_pace(seconds_per_km: f64) -> String {
    let total = seconds_per_km.round() as u64;
    format!("{}:{:02} /km", total / 60, total % 60)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gain_sums_only_climbs() {
        let altitudes = [100.0, 105.0, 103.0, 110.0].map(Some);
        assert_eq!(elevation_gain(altitudes), 12.0);
    }

    #[test]
    fn gain_bridges_missing_altitudes() {
        let altitudes = [Some(100.0), None, Some(104.0), None];
        assert_eq!(elevation_gain(altitudes), 4.0);
        assert_eq!(elevation_gain(Vec::<Option<f64>>::new()), 0.0);
    }

    #[test]
    fn averages_ignore_zero_and_absent_readings() {
        let hr = [Some(0.0), Some(120.0), None, Some(140.0)];
        assert_eq!(positive_mean(hr), Some(130.0));
        assert_eq!(positive_max(hr), Some(140.0));
        assert_eq!(positive_mean([Some(0.0), None]), None);
        assert_eq!(positive_max([Some(0.0), None]), None);
    }

    #[test]
    fn speed_and_pace_need_nonzero_inputs() {
        assert_eq!(average_speed(1200.0, 0.0), None);
        assert_eq!(average_speed(1200.0, 400.0), Some(3.0));
        assert_eq!(pace_seconds_per_km(0.0, 100.0), None);
        assert_eq!(pace_seconds_per_km(2000.0, 600.0), Some(300.0));
    }

    #[test]
    fn formats_durations_and_pace() {
        assert_eq!(format_duration(59), "00:59");
        assert_eq!(format_duration(3725), "1:02:05");
        assert_eq!(format_pace(305.4), "5:05 /km");
    }
}
