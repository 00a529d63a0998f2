use chrono::{DateTime, Utc};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::error::ParseError;
use crate::pipeline::parse::{ParsedFile, ParsedLap, ParsedTrackpoint, Parser};

pub struct TcxParser;

impl Parser for TcxParser {
    fn parse(&self, bytes: &[u8]) -> Result<ParsedFile, ParseError> {
        let mut reader = Reader::from_reader(bytes);
        reader.trim_text(true);

        let mut state = TcxState::default();
        let mut buf = Vec::new();

        loop {
            match reader.read_event_into(&mut buf) {
                Ok(Event::Start(e)) => {
                    let name = local_name(e.local_name().as_ref())?;
                    state.open(&name, &e)?;
                    state.path.push(name);
                }
                Ok(Event::Empty(e)) => {
                    let name = local_name(e.local_name().as_ref())?;
                    state.open(&name, &e)?;
                    state.close(&name);
                }
                Ok(Event::Text(e)) => {
                    let text = e
                        .unescape()
                        .map_err(|e| ParseError::MalformedDocument(e.to_string()))?;
                    state.text(&text);
                }
                Ok(Event::CData(e)) => {
                    let raw = e.into_inner();
                    let text = std::str::from_utf8(&raw)
                        .map_err(|e| ParseError::MalformedDocument(e.to_string()))?;
                    state.text(text);
                }
                Ok(Event::End(e)) => {
                    let name = local_name(e.local_name().as_ref())?;
                    state.path.pop();
                    state.close(&name);
                }
                Ok(Event::Eof) => break,
                Err(e) => {
                    return Err(ParseError::MalformedDocument(format!(
                        "not well-formed at byte {}: {}",
                        reader.buffer_position(),
                        e
                    )))
                }
                _ => {}
            }
            buf.clear();
        }

        if let Some(open) = state.path.last() {
            return Err(ParseError::MalformedDocument(format!(
                "unexpected end of document inside <{}>",
                open
            )));
        }

        let file = state
            .finish()
            .ok_or_else(|| ParseError::MalformedDocument("no Activity element".to_string()))?;

        tracing::debug!(
            "Parsed TCX activity ({} laps, {} trackpoints)",
            file.laps.len(),
            file.trackpoint_count()
        );

        Ok(file)
    }
}

#[derive(Default)]
struct TcxState {
    path: Vec<String>,
    activity: Option<ParsedFile>,
    in_activity: bool,
    activity_done: bool,
    lap: Option<ParsedLap>,
    point: Option<ParsedTrackpoint>,
}

impl TcxState {
    fn open(&mut self, name: &str, e: &BytesStart) -> Result<(), ParseError> {
        match name {
            // Only the first activity of a multi-activity file is read.
            "Activity" if !self.activity_done && !self.in_activity => {
                self.in_activity = true;
                self.activity = Some(ParsedFile {
                    sport: attribute(e, "Sport")?.unwrap_or_default(),
                    ..Default::default()
                });
            }
            "Lap" if self.in_activity => {
                self.lap = Some(ParsedLap {
                    start_time: attribute(e, "StartTime")?.and_then(|s| parse_time(&s)),
                    ..Default::default()
                });
            }
            "Trackpoint" if self.lap.is_some() => {
                self.point = Some(ParsedTrackpoint::default());
            }
            _ => {}
        }
        Ok(())
    }

    fn close(&mut self, name: &str) {
        match name {
            "Trackpoint" => {
                if let (Some(point), Some(lap)) = (self.point.take(), self.lap.as_mut()) {
                    lap.trackpoints.push(point);
                }
            }
            "Lap" => {
                if let (Some(lap), Some(activity)) = (self.lap.take(), self.activity.as_mut()) {
                    activity.laps.push(lap);
                }
            }
            "Activity" if self.in_activity => {
                self.in_activity = false;
                self.activity_done = true;
            }
            _ => {}
        }
    }

    fn text(&mut self, text: &str) {
        if !self.in_activity {
            return;
        }
        let Some(current) = self.path.last().map(String::as_str) else {
            return;
        };
        let parent = self
            .path
            .len()
            .checked_sub(2)
            .and_then(|idx| self.path.get(idx))
            .map(String::as_str)
            .unwrap_or("");

        if let Some(point) = self.point.as_mut() {
            match (parent, current) {
                (_, "Time") => point.time = parse_time(text),
                ("Position", "LatitudeDegrees") => point.lat = number(text),
                ("Position", "LongitudeDegrees") => point.lng = number(text),
                (_, "AltitudeMeters") => point.altitude = number(text),
                (_, "DistanceMeters") => point.distance = number(text),
                ("HeartRateBpm", "Value") => point.heart_rate = number(text),
                (_, "Cadence") => point.cadence = number(text),
                (_, "RunCadence") if point.cadence.is_none() => point.cadence = number(text),
                (_, "Speed") => point.speed = number(text),
                (_, "Watts") => point.power = number(text),
                _ => {}
            }
        } else if let Some(lap) = self.lap.as_mut() {
            match (parent, current) {
                ("Lap", "TotalTimeSeconds") => lap.total_time = number(text),
                ("Lap", "DistanceMeters") => lap.distance = number(text),
                ("Lap", "MaximumSpeed") => lap.max_speed = number(text),
                ("Lap", "Calories") => lap.calories = number(text),
                ("Lap", "Cadence") => lap.average_cadence = number(text),
                ("AverageHeartRateBpm", "Value") => lap.average_heartrate = number(text),
                ("MaximumHeartRateBpm", "Value") => lap.max_heartrate = number(text),
                (_, "AvgSpeed") => lap.average_speed = number(text),
                _ => {}
            }
        } else if let Some(activity) = self.activity.as_mut() {
            match (parent, current) {
                ("Activity", "Id") => activity.id = Some(text.trim().to_string()),
                ("Activity", "Notes") => activity.notes = Some(text.trim().to_string()),
                _ => {}
            }
        }
    }

    fn finish(self) -> Option<ParsedFile> {
        self.activity
    }
}

fn local_name(raw: &[u8]) -> Result<String, ParseError> {
    std::str::from_utf8(raw)
        .map(str::to_string)
        .map_err(|e| ParseError::MalformedDocument(e.to_string()))
}

fn attribute(e: &BytesStart, key: &str) -> Result<Option<String>, ParseError> {
    for attr in e.attributes() {
        let attr = attr.map_err(|e| ParseError::MalformedDocument(e.to_string()))?;
        if attr.key.local_name().as_ref() == key.as_bytes() {
            let value = attr
                .unescape_value()
                .map_err(|e| ParseError::MalformedDocument(e.to_string()))?;
            return Ok(Some(value.into_owned()));
        }
    }
    Ok(None)
}

fn number(text: &str) -> Option<f64> {
    text.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

fn parse_time(text: &str) -> Option<DateTime<Utc>> {
    text.trim().parse::<DateTime<Utc>>().ok()
}
